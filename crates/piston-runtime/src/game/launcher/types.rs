/// Core types for game launching
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::broadcast;

/// The player the game is launched as
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub name: String,
    pub uuid: String,
    pub access_token: String,
    /// "msa", "mojang" or "legacy"
    pub user_type: String,
    /// Xbox User ID (MSA accounts only)
    pub xuid: Option<String>,
    /// Authentication server the account belongs to, if not the official one
    pub authority: Option<String>,
}

/// Server to join directly after the game starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTarget {
    pub host: String,
    pub port: Option<u16>,
}

/// Authentication proxy agent injected as `-javaagent`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YggdrasilAgent {
    /// Path to the agent jar
    pub jar: PathBuf,
    /// Authentication server root URL
    pub server: String,
    /// Server metadata, passed base64-encoded so the agent skips its own fetch
    #[serde(default)]
    pub prefetched: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub fullscreen: bool,
}

/// Everything needed to launch one installed version
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaunchOptions {
    /// Version id to launch, overriding `configured_version`
    pub version: Option<String>,

    /// Version id configured for the instance
    pub configured_version: Option<String>,

    /// Data root holding `versions/`, `libraries/` and `assets/`
    pub root: PathBuf,

    /// Instance game directory (working directory of the process)
    pub game_dir: PathBuf,

    pub user: UserProfile,

    /// Java executable
    pub java_path: PathBuf,

    pub server: Option<ServerTarget>,

    pub yggdrasil_agent: Option<YggdrasilAgent>,

    /// Minimum heap in MiB
    pub min_memory: Option<u32>,

    /// Maximum heap in MiB
    pub max_memory: Option<u32>,

    /// Extra JVM arguments, inserted before the main class
    pub extra_jvm_args: Vec<String>,

    /// Extra game arguments, appended last
    pub extra_mc_args: Vec<String>,

    pub resolution: Option<Resolution>,

    pub hide_launcher: bool,

    pub show_log: bool,

    /// Skip jar and library diagnosis before launching
    pub skip_assets_check: bool,

    /// Overrides the supervisor's launcher name
    pub launcher_name: Option<String>,

    /// Overrides the supervisor's launcher brand/version
    pub launcher_brand: Option<String>,
}

impl LaunchOptions {
    /// Id to launch: the explicit override, else the configured version
    pub fn version_id(&self) -> Option<&str> {
        self.version
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| {
                self.configured_version
                    .as_deref()
                    .filter(|v| !v.trim().is_empty())
            })
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    /// Natives directory for a version
    pub fn natives_dir(&self, version_id: &str) -> PathBuf {
        self.versions_dir()
            .join(version_id)
            .join(format!("{}-natives", version_id))
    }

    /// Game directory, defaulting to the data root
    pub fn working_dir(&self) -> &Path {
        if self.game_dir.as_os_str().is_empty() {
            &self.root
        } else {
            &self.game_dir
        }
    }
}

/// Launch attempt phases. `Preflight` is skipped when assets are not checked;
/// `Failed` can follow any phase before `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LaunchPhase {
    Resolving,
    Preflight,
    Spawning,
    Running,
    Exited,
    Failed,
}

/// A launch attempt entering a new phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseChange {
    /// Per-supervisor attempt number, starting at 1
    pub attempt: u64,
    pub version_id: Option<String>,
    pub phase: LaunchPhase,
    /// Set from `Running` on
    pub pid: Option<u32>,
}

/// Lifecycle events of one launched process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LaunchEvent {
    Started { pid: u32 },
    WindowReady { pid: u32 },
    Stdout { pid: u32, text: String },
    Stderr { pid: u32, text: String },
    Exited(ExitReport),
}

impl LaunchEvent {
    pub fn pid(&self) -> u32 {
        match self {
            LaunchEvent::Started { pid }
            | LaunchEvent::WindowReady { pid }
            | LaunchEvent::Stdout { pid, .. }
            | LaunchEvent::Stderr { pid, .. } => *pid,
            LaunchEvent::Exited(report) => report.pid,
        }
    }
}

/// Final report for an exited process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitReport {
    pub pid: u32,
    pub code: Option<i32>,
    /// Terminating signal (unix only)
    pub signal: Option<i32>,
    /// Crash report text, inline from stdout or read back from the report file
    pub crash_report: Option<String>,
    pub crash_report_location: Option<String>,
    pub duration_ms: u64,
    /// Everything the process wrote to stderr
    pub error_log: String,
    pub options: LaunchOptions,
}

impl ExitReport {
    /// Normal exit with code 0 and no crash report
    pub fn is_clean(&self) -> bool {
        self.code == Some(0) && self.crash_report.is_none() && self.crash_report_location.is_none()
    }
}

/// A process between spawn and observed exit
#[derive(Debug, Clone)]
pub struct GameProcess {
    pub pid: u32,
    pub version_id: String,
    pub game_dir: PathBuf,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub(crate) started: Instant,
    pub(crate) events: broadcast::Sender<LaunchEvent>,
}

impl GameProcess {
    /// New receiver for this process' remaining events
    pub fn subscribe(&self) -> broadcast::Receiver<LaunchEvent> {
        self.events.subscribe()
    }
}

/// Returned by a successful launch
#[derive(Debug)]
pub struct LaunchHandle {
    pub pid: u32,
    /// Matches [`PhaseChange::attempt`]
    pub attempt: u64,
    pub version_id: String,
    /// Receives every event from `Started` on
    pub events: broadcast::Receiver<LaunchEvent>,
    pub(crate) sender: broadcast::Sender<LaunchEvent>,
}

impl LaunchHandle {
    /// Additional receiver; only sees events sent after this call
    pub fn subscribe(&self) -> broadcast::Receiver<LaunchEvent> {
        self.sender.subscribe()
    }

    /// Wait for the `Exited` event, discarding everything else
    pub async fn wait(mut self) -> Option<ExitReport> {
        loop {
            match self.events.recv().await {
                Ok(LaunchEvent::Exited(report)) => return Some(report),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("[launch] pid {} event receiver lagged by {}", self.pid, n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_override_wins() {
        let mut options = LaunchOptions {
            configured_version: Some("1.20.1".to_string()),
            ..Default::default()
        };
        assert_eq!(options.version_id(), Some("1.20.1"));

        options.version = Some("1.20.1-forge-47.2.0".to_string());
        assert_eq!(options.version_id(), Some("1.20.1-forge-47.2.0"));

        options.version = Some("  ".to_string());
        assert_eq!(options.version_id(), Some("1.20.1"));

        options.configured_version = None;
        assert_eq!(options.version_id(), None);
    }

    #[test]
    fn layout_under_root() {
        let options = LaunchOptions {
            root: PathBuf::from("/data"),
            ..Default::default()
        };
        assert_eq!(options.libraries_dir(), PathBuf::from("/data/libraries"));
        assert_eq!(
            options.natives_dir("1.20.1"),
            PathBuf::from("/data/versions/1.20.1/1.20.1-natives")
        );
        assert_eq!(options.working_dir(), Path::new("/data"));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: LaunchOptions = serde_json::from_value(serde_json::json!({
            "version": "1.20.1",
            "root": "/data",
            "javaPath": "/usr/bin/java",
            "user": {"name": "Steve", "uuid": "u", "accessToken": "t", "userType": "msa"},
            "maxMemory": 4096
        }))
        .unwrap();
        assert_eq!(options.user.name, "Steve");
        assert_eq!(options.max_memory, Some(4096));
        assert!(!options.skip_assets_check);
        assert!(options.extra_jvm_args.is_empty());
    }

    #[test]
    fn event_serializes_tagged() {
        let json = serde_json::to_value(LaunchEvent::Stdout {
            pid: 7,
            text: "hi".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "stdout");
        assert_eq!(json["pid"], 7);
    }

    #[test]
    fn phase_change_serializes_camel_case() {
        let json = serde_json::to_value(PhaseChange {
            attempt: 2,
            version_id: Some("1.20.1".to_string()),
            phase: LaunchPhase::Running,
            pid: Some(42),
        })
        .unwrap();
        assert_eq!(json["phase"], "running");
        assert_eq!(json["versionId"], "1.20.1");
        assert_eq!(json["pid"], 42);
    }
}
