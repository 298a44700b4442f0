use super::types::RuntimeComponent;

/// Failure of one resolution step. Every variant names what was being resolved.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("Failed to install {component}")]
    InstallFailed {
        component: RuntimeComponent,
        #[source]
        source: anyhow::Error,
    },

    #[error("Catalog {key} unavailable")]
    CatalogUnavailable {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to refresh local version {id}")]
    RefreshFailed {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Timed out resolving {component}")]
    Timeout { component: RuntimeComponent },
}

impl ResolutionError {
    /// Component being installed, when the failure belongs to an installer step
    pub fn component(&self) -> Option<RuntimeComponent> {
        match self {
            ResolutionError::InstallFailed { component, .. }
            | ResolutionError::Timeout { component } => Some(*component),
            _ => None,
        }
    }
}
