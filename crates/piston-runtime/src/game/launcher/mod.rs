/// Game launcher: version resolution, argument building and process supervision
pub mod arguments;
pub mod classpath;
pub mod config;
pub mod crash;
pub mod encoding;
pub mod error;
pub mod java;
pub mod preflight;
pub mod process;
pub mod registry;
pub mod types;
pub mod version_parser;

// Re-export commonly used types
pub use arguments::{build_command_arguments, build_game_arguments, build_jvm_arguments, substitute_variables, ArgumentContext};
pub use classpath::{build_classpath, maven_to_path, OsType};
pub use config::SupervisorConfig;
pub use crash::normalize_crash_report_location;
pub use encoding::{DefaultEncodingDetector, EncodingDetector};
pub use error::{LaunchError, LaunchErrorKind};
pub use java::validate_java_path;
pub use preflight::{NoRepair, PreflightRepair};
pub use process::{AccountRefresher, LaunchSupervisor};
pub use registry::ProcessRegistry;
pub use types::{
    ExitReport, GameProcess, LaunchEvent, LaunchHandle, LaunchOptions, LaunchPhase, PhaseChange,
    Resolution, ServerTarget, UserProfile, YggdrasilAgent,
};
pub use version_parser::{
    load_version_chain, parse_version_json, resolve_version, Argument, Arguments, Library,
    ResolvedVersion, VersionManifest,
};
