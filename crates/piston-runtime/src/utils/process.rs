//! Platform process plumbing: detached spawning and termination.

use anyhow::Result;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x00000200;

/// Spawn-time options shared by the std and tokio command types.
pub trait PistonCommandExt {
    /// No console window on Windows. No-op elsewhere.
    fn suppress_console(&mut self) -> &mut Self;

    /// Run the child in its own session (unix) or process group (Windows) so it
    /// outlives the launcher. Pipes stay usable.
    fn detach(&mut self) -> &mut Self;
}

impl PistonCommandExt for std::process::Command {
    fn suppress_console(&mut self) -> &mut Self {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.creation_flags(CREATE_NO_WINDOW);
        }
        self
    }

    fn detach(&mut self) -> &mut Self {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.creation_flags(CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            unsafe {
                self.pre_exec(|| {
                    libc::setsid();
                    Ok(())
                });
            }
        }
        self
    }
}

impl PistonCommandExt for tokio::process::Command {
    fn suppress_console(&mut self) -> &mut Self {
        #[cfg(windows)]
        {
            self.creation_flags(CREATE_NO_WINDOW);
        }
        self
    }

    fn detach(&mut self) -> &mut Self {
        #[cfg(windows)]
        {
            // No DETACHED_PROCESS: it would break stdout/stderr piping
            self.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }
        #[cfg(unix)]
        {
            unsafe {
                self.pre_exec(|| {
                    libc::setsid();
                    Ok(())
                });
            }
        }
        self
    }
}

/// Ask `pid` to terminate (SIGTERM on unix)
#[cfg(unix)]
pub fn terminate(pid: u32) -> Result<()> {
    use anyhow::Context;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).context("PID out of range")?;
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        // Already gone
        Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(e).context("Failed to send SIGTERM"),
    }
}

/// Kill `pid` and its child tree via taskkill
#[cfg(windows)]
pub fn terminate(pid: u32) -> Result<()> {
    use anyhow::Context;

    let output = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .suppress_console()
        .output()
        .context("Failed to execute taskkill")?;

    if !output.status.success() {
        anyhow::bail!(
            "Failed to kill process: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(())
}

/// Quote an argument for a copy-pasteable log line
pub(crate) fn quote_arg(s: &str) -> String {
    if s.is_empty() {
        return "\"\"".to_string();
    }
    if s.chars().any(|c| c.is_whitespace() || c == '"') {
        let esc = s.replace('\\', "\\\\").replace('"', "\\\"");
        return format!("\"{}\"", esc);
    }
    s.to_string()
}
