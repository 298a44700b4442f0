pub mod installer;
pub mod launcher;
pub mod metadata;

// Re-export commonly used types
pub use installer::{
    InstallSide, LocalVersionHeader, LocalVersionStore, ResolutionError, RuntimeVersions,
    VersionOrchestrator,
};
pub use launcher::{LaunchError, LaunchEvent, LaunchHandle, LaunchOptions, LaunchSupervisor};
pub use metadata::{CatalogSource, HttpCatalogSource, MetadataCache};
