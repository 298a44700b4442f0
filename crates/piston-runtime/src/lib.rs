//! Version resolution, installation orchestration and launch supervision for
//! a modded Minecraft launcher.
//!
//! [`VersionOrchestrator`] turns a requested runtime (base version plus
//! optional loader and cosmetic layers) into the id of an installed version,
//! and [`LaunchSupervisor`] starts that version as a detached process and
//! streams its lifecycle as [`LaunchEvent`]s.

pub mod game;
pub mod utils;

pub use game::installer::{
    InstallSide, Installers, LocalVersionHeader, LocalVersionStore, OrchestratorConfig,
    ResolutionError, RuntimeVersions, VersionOrchestrator,
};
pub use game::launcher::{
    ExitReport, LaunchError, LaunchErrorKind, LaunchEvent, LaunchHandle, LaunchOptions,
    LaunchPhase, LaunchSupervisor, PhaseChange, ProcessRegistry, SupervisorConfig,
};
pub use game::metadata::{CatalogSource, HttpCatalogSource, MetadataCache};
