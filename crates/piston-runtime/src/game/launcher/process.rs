/// Launch supervision: resolve, preflight, spawn and watch a game process
use crate::game::launcher::{
    arguments::{build_command_arguments, ArgumentContext},
    classpath::{build_classpath, OsType},
    config::SupervisorConfig,
    crash::{normalize_crash_report_location, StdoutScanner},
    encoding::{decode_chunk, encoding_for_label, DefaultEncodingDetector, EncodingDetector},
    error::LaunchError,
    java::validate_java_path,
    preflight::{run_preflight, NoRepair, PreflightRepair},
    registry::ProcessRegistry,
    types::{
        ExitReport, GameProcess, LaunchEvent, LaunchHandle, LaunchOptions, LaunchPhase,
        PhaseChange, UserProfile,
    },
    version_parser::{resolve_version, ResolvedVersion},
};
use crate::utils::process::{quote_arg, terminate, PistonCommandExt};
use anyhow::{Context, Result};
use encoding_rs::Encoding;
use futures::future::BoxFuture;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Revalidates the account before launch and returns the profile to launch with.
pub trait AccountRefresher: Send + Sync {
    fn refresh<'a>(&'a self, user: &'a UserProfile) -> BoxFuture<'a, Result<UserProfile>>;
}

/// Owns the running-process registry and drives each launch attempt through
/// resolving, preflight, spawning and exit.
pub struct LaunchSupervisor {
    config: SupervisorConfig,
    registry: ProcessRegistry,
    detector: Arc<dyn EncodingDetector>,
    repair: Arc<dyn PreflightRepair>,
    refresher: Option<Arc<dyn AccountRefresher>>,
    fallback_encoding: &'static Encoding,
    phases: broadcast::Sender<PhaseChange>,
    attempts: AtomicU64,
}

impl LaunchSupervisor {
    pub fn new(
        config: SupervisorConfig,
        registry: ProcessRegistry,
        detector: Arc<dyn EncodingDetector>,
        repair: Arc<dyn PreflightRepair>,
        refresher: Option<Arc<dyn AccountRefresher>>,
    ) -> Self {
        let fallback_encoding = encoding_for_label(&config.fallback_encoding);
        let (phases, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            config,
            registry,
            detector,
            repair,
            refresher,
            fallback_encoding,
            phases,
            attempts: AtomicU64::new(0),
        }
    }

    /// Default config, BOM/UTF-8 detection and no repair
    pub fn with_defaults() -> Self {
        Self::new(
            SupervisorConfig::default(),
            ProcessRegistry::new(),
            Arc::new(DefaultEncodingDetector),
            Arc::new(NoRepair),
            None,
        )
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Phase changes of every launch attempt started after this call
    pub fn phases(&self) -> broadcast::Receiver<PhaseChange> {
        self.phases.subscribe()
    }

    /// Launch the version named by `options` and return a handle whose
    /// receiver sees every event from `Started` on.
    pub async fn launch(&self, options: LaunchOptions) -> Result<LaunchHandle, LaunchError> {
        let phases = PhaseNotifier {
            sender: self.phases.clone(),
            attempt: self.attempts.fetch_add(1, Ordering::Relaxed) + 1,
            version_id: options.version_id().map(str::to_string),
        };

        let result = self.attempt(options, &phases).await;
        if let Err(ref e) = result {
            log::error!("[launch] Attempt {} failed: {}", phases.attempt, e);
            phases.set(LaunchPhase::Failed, None);
        }
        result
    }

    async fn attempt(
        &self,
        options: LaunchOptions,
        phases: &PhaseNotifier,
    ) -> Result<LaunchHandle, LaunchError> {
        log::info!("[launch] Resolving {:?}", options.version_id());
        phases.set(LaunchPhase::Resolving, None);
        let version = self.resolve(&options).await?;

        let mut options = options;
        if let Some(ref refresher) = self.refresher {
            log::debug!("[launch] Refreshing user {}", options.user.name);
            options.user = refresher
                .refresh(&options.user)
                .await
                .map_err(LaunchError::UserStatusRefreshFailed)?;
        }

        if options.skip_assets_check {
            log::debug!("[launch] Skipping preflight for {}", version.id);
        } else {
            log::info!("[launch] Preflight for {}", version.id);
            phases.set(LaunchPhase::Preflight, None);
            run_preflight(&version, &options.root, self.repair.as_ref(), OsType::current())
                .await
                .context("Preflight failed")?;
        }

        phases.set(LaunchPhase::Spawning, None);
        let java = validate_java_path(&options.java_path)?;
        let args = self.build_arguments(&options, &version)?;

        log::info!("[launch] Spawning {}", version.id);
        self.spawn(options, version, java, args, phases.clone()).await
    }

    /// Resolve and validate like `launch`, without preflight or spawning
    pub async fn generate_arguments(
        &self,
        options: &LaunchOptions,
    ) -> Result<Vec<String>, LaunchError> {
        let version = self.resolve(options).await?;
        validate_java_path(&options.java_path)?;
        self.build_arguments(options, &version)
    }

    /// Stop a running process. Returns whether it was registered; unknown
    /// pids are ignored.
    pub async fn kill(&self, pid: u32) -> bool {
        match self.registry.unregister(pid).await {
            Some(process) => {
                log::info!("[launch] Killing {} (PID {})", process.version_id, pid);
                if let Err(e) = terminate(pid) {
                    log::warn!("[launch] Failed to terminate PID {}: {:#}", pid, e);
                }
                true
            }
            None => {
                log::debug!("[launch] kill: PID {} is not running", pid);
                false
            }
        }
    }

    async fn resolve(&self, options: &LaunchOptions) -> Result<ResolvedVersion, LaunchError> {
        let id = options
            .version_id()
            .ok_or(LaunchError::NoVersionInstalled {
                version: None,
                source: None,
            })?;

        resolve_version(id, &options.root)
            .await
            .map_err(|e| LaunchError::NoVersionInstalled {
                version: Some(id.to_string()),
                source: Some(e),
            })
    }

    fn build_arguments(
        &self,
        options: &LaunchOptions,
        version: &ResolvedVersion,
    ) -> Result<Vec<String>, LaunchError> {
        let os = OsType::current();
        let classpath = build_classpath(
            &version.libraries,
            &options.libraries_dir(),
            &version.jar_path(&options.root),
            os,
        )
        .context("Failed to build classpath")?;
        let natives_dir = options.natives_dir(&version.id);

        let ctx = ArgumentContext {
            options,
            version,
            config: &self.config,
            classpath: &classpath,
            natives_dir: &natives_dir,
            os,
        };
        Ok(build_command_arguments(&ctx))
    }

    async fn spawn(
        &self,
        options: LaunchOptions,
        version: ResolvedVersion,
        java: PathBuf,
        args: Vec<String>,
        phases: PhaseNotifier,
    ) -> Result<LaunchHandle, LaunchError> {
        let game_dir = options.working_dir().to_path_buf();
        if !game_dir.exists() {
            tokio::fs::create_dir_all(&game_dir)
                .await
                .with_context(|| format!("Failed to create game directory {:?}", game_dir))?;
        } else if !game_dir.is_dir() {
            return Err(anyhow::anyhow!(
                "Game directory path exists but is not a directory: {:?}",
                game_dir
            )
            .into());
        }

        log::info!(
            "Exec command: {} {}",
            quote_arg(&java.to_string_lossy()),
            args.iter().map(|a| quote_arg(a)).collect::<Vec<_>>().join(" ")
        );

        // First receiver exists before the process does
        let (sender, events) = broadcast::channel(self.config.event_capacity.max(1));

        let mut command = tokio::process::Command::new(&java);
        command
            .args(&args)
            .current_dir(&game_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .suppress_console()
            .detach();

        let mut child = command.spawn().context("Failed to spawn game process")?;
        let pid = child
            .id()
            .ok_or_else(|| anyhow::anyhow!("Failed to get process ID"))?;
        log::info!("Game process started with PID: {}", pid);

        let process = GameProcess {
            pid,
            version_id: version.id.clone(),
            game_dir: game_dir.clone(),
            started_at: chrono::Utc::now(),
            started: Instant::now(),
            events: sender.clone(),
        };
        let started = process.started;
        self.registry.register(process).await;
        let _ = sender.send(LaunchEvent::Started { pid });
        phases.set(LaunchPhase::Running, Some(pid));

        let scanner = Arc::new(Mutex::new(StdoutScanner::new()));
        let error_log = Arc::new(Mutex::new(String::new()));
        let buffer_size = self.config.read_buffer_size.max(1);
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(read_stdout(
                stdout,
                pid,
                sender.clone(),
                scanner.clone(),
                self.detector.clone(),
                self.fallback_encoding,
                buffer_size,
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(read_stderr(
                stderr,
                pid,
                sender.clone(),
                error_log.clone(),
                self.detector.clone(),
                self.fallback_encoding,
                buffer_size,
            )));
        }

        let watcher = ExitWatcher {
            pid,
            started,
            registry: self.registry.clone(),
            detector: self.detector.clone(),
            fallback_encoding: self.fallback_encoding,
            sender: sender.clone(),
            phases: phases.clone(),
            scanner,
            error_log,
            drain_timeout: self.config.output_drain_timeout(),
            options,
        };
        tokio::spawn(async move {
            let status = child.wait().await;
            watcher.finish(status, readers).await;
        });

        Ok(LaunchHandle {
            pid,
            attempt: phases.attempt,
            version_id: version.id,
            events,
            sender,
        })
    }
}

/// Publishes the phases of one launch attempt
#[derive(Clone)]
struct PhaseNotifier {
    sender: broadcast::Sender<PhaseChange>,
    attempt: u64,
    version_id: Option<String>,
}

impl PhaseNotifier {
    fn set(&self, phase: LaunchPhase, pid: Option<u32>) {
        log::debug!("[launch] Attempt {} -> {:?}", self.attempt, phase);
        let _ = self.sender.send(PhaseChange {
            attempt: self.attempt,
            version_id: self.version_id.clone(),
            phase,
            pid,
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Option<usize> {
    match reader.read(buf).await {
        Ok(0) => None,
        Ok(n) => Some(n),
        Err(e) => {
            log::warn!("[launch] Output read failed: {}", e);
            None
        }
    }
}

async fn read_stdout<R: AsyncRead + Unpin>(
    mut stdout: R,
    pid: u32,
    sender: broadcast::Sender<LaunchEvent>,
    scanner: Arc<Mutex<StdoutScanner>>,
    detector: Arc<dyn EncodingDetector>,
    fallback: &'static Encoding,
    buffer_size: usize,
) {
    let mut buf = vec![0u8; buffer_size];

    while let Some(n) = read_chunk(&mut stdout, &mut buf).await {
        let text = decode_chunk(detector.as_ref(), &buf[..n], fallback);
        if lock(&scanner).feed(&text).window_ready {
            log::info!("[launch] PID {} window ready", pid);
            let _ = sender.send(LaunchEvent::WindowReady { pid });
        }
        let _ = sender.send(LaunchEvent::Stdout { pid, text });
    }

    if lock(&scanner).finish().window_ready {
        let _ = sender.send(LaunchEvent::WindowReady { pid });
    }
}

async fn read_stderr<R: AsyncRead + Unpin>(
    mut stderr: R,
    pid: u32,
    sender: broadcast::Sender<LaunchEvent>,
    error_log: Arc<Mutex<String>>,
    detector: Arc<dyn EncodingDetector>,
    fallback: &'static Encoding,
    buffer_size: usize,
) {
    let mut buf = vec![0u8; buffer_size];

    while let Some(n) = read_chunk(&mut stderr, &mut buf).await {
        let text = decode_chunk(detector.as_ref(), &buf[..n], fallback);
        lock(&error_log).push_str(&text);
        let _ = sender.send(LaunchEvent::Stderr { pid, text });
    }
}

struct ExitWatcher {
    pid: u32,
    started: Instant,
    registry: ProcessRegistry,
    detector: Arc<dyn EncodingDetector>,
    fallback_encoding: &'static Encoding,
    sender: broadcast::Sender<LaunchEvent>,
    phases: PhaseNotifier,
    scanner: Arc<Mutex<StdoutScanner>>,
    error_log: Arc<Mutex<String>>,
    drain_timeout: Duration,
    options: LaunchOptions,
}

impl ExitWatcher {
    async fn finish(self, status: std::io::Result<ExitStatus>, mut readers: Vec<JoinHandle<()>>) {
        let pid = self.pid;
        let (code, signal) = match status {
            Ok(status) => {
                if status.success() {
                    log::info!("Game process (PID {}) exited successfully", pid);
                } else {
                    log::error!("Game process (PID {}) exited with error: {}", pid, status);
                }
                (status.code(), exit_signal(&status))
            }
            Err(e) => {
                log::error!("Failed to wait for game process (PID {}): {}", pid, e);
                (None, None)
            }
        };

        // Descendants may keep the pipes open long after the game is gone
        let drained = tokio::time::timeout(self.drain_timeout, async {
            for reader in readers.iter_mut() {
                if let Err(e) = reader.await {
                    log::warn!("[launch] Output reader for PID {} failed: {}", pid, e);
                }
            }
        })
        .await
        .is_ok();
        if !drained {
            log::warn!(
                "[launch] Output of PID {} still open {:?} after exit, detaching readers",
                pid,
                self.drain_timeout
            );
            for reader in &readers {
                reader.abort();
            }
        }

        let mut scanner = std::mem::take(&mut *lock(&self.scanner));
        if !drained {
            scanner.finish();
        }
        let error_log = std::mem::take(&mut *lock(&self.error_log));

        let (inline_report, location) = scanner.into_crash();
        let location = location.map(|l| normalize_crash_report_location(&l));
        let crash_report = match (inline_report, location.as_deref()) {
            (Some(report), _) => Some(report),
            (None, Some(path)) => self.read_crash_report(path).await,
            (None, None) => None,
        };

        let report = ExitReport {
            pid,
            code,
            signal,
            crash_report,
            crash_report_location: location,
            duration_ms: self.started.elapsed().as_millis() as u64,
            error_log,
            options: self.options,
        };

        self.registry.unregister(pid).await;
        log::info!(
            "[launch] PID {} exited after {} ms (code {:?})",
            pid,
            report.duration_ms,
            report.code
        );
        self.phases.set(LaunchPhase::Exited, Some(pid));
        let _ = self.sender.send(LaunchEvent::Exited(report));
    }

    async fn read_crash_report(&self, path: &str) -> Option<String> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Some(decode_chunk(
                self.detector.as_ref(),
                &bytes,
                self.fallback_encoding,
            )),
            Err(e) => {
                log::warn!("[launch] Could not read crash report {}: {}", path, e);
                None
            }
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
