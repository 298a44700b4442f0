use serde::Serialize;
use std::path::PathBuf;

/// Discriminator for [`LaunchError`], serialized the way the UI layer keys its messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LaunchErrorKind {
    #[serde(rename = "launchNoVersionInstalled")]
    NoVersionInstalled,
    #[serde(rename = "launchNoProperJava")]
    NoProperJava,
    #[serde(rename = "launchInvalidJavaPath")]
    InvalidJavaPath,
    #[serde(rename = "launchJavaNoPermission")]
    JavaNoPermission,
    #[serde(rename = "launchUserStatusRefreshFailed")]
    UserStatusRefreshFailed,
    #[serde(rename = "launchGeneralException")]
    GeneralException,
}

impl LaunchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LaunchErrorKind::NoVersionInstalled => "launchNoVersionInstalled",
            LaunchErrorKind::NoProperJava => "launchNoProperJava",
            LaunchErrorKind::InvalidJavaPath => "launchInvalidJavaPath",
            LaunchErrorKind::JavaNoPermission => "launchJavaNoPermission",
            LaunchErrorKind::UserStatusRefreshFailed => "launchUserStatusRefreshFailed",
            LaunchErrorKind::GeneralException => "launchGeneralException",
        }
    }
}

impl std::fmt::Display for LaunchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("No installed version to launch: {version:?}")]
    NoVersionInstalled {
        version: Option<String>,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("No Java executable configured")]
    NoProperJava,

    #[error("Java executable not found: {path:?}")]
    InvalidJavaPath { path: PathBuf },

    #[error("Java executable is not executable: {path:?}")]
    JavaNoPermission { path: PathBuf },

    #[error("Failed to refresh user status")]
    UserStatusRefreshFailed(#[source] anyhow::Error),

    #[error(transparent)]
    General(#[from] anyhow::Error),
}

impl LaunchError {
    pub fn kind(&self) -> LaunchErrorKind {
        match self {
            LaunchError::NoVersionInstalled { .. } => LaunchErrorKind::NoVersionInstalled,
            LaunchError::NoProperJava => LaunchErrorKind::NoProperJava,
            LaunchError::InvalidJavaPath { .. } => LaunchErrorKind::InvalidJavaPath,
            LaunchError::JavaNoPermission { .. } => LaunchErrorKind::JavaNoPermission,
            LaunchError::UserStatusRefreshFailed(_) => LaunchErrorKind::UserStatusRefreshFailed,
            LaunchError::General(_) => LaunchErrorKind::GeneralException,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_serialize_to_tags() {
        let json = serde_json::to_string(&LaunchErrorKind::NoProperJava).unwrap();
        assert_eq!(json, "\"launchNoProperJava\"");
        assert_eq!(
            LaunchError::General(anyhow::anyhow!("boom")).kind().as_str(),
            "launchGeneralException"
        );
    }

    #[test]
    fn general_keeps_the_chain() {
        let inner = anyhow::anyhow!("disk full").context("writing natives");
        let err = LaunchError::from(inner);
        assert_eq!(err.to_string(), "writing natives");
        assert!(format!("{:#}", anyhow::Error::from(err)).contains("disk full"));
    }
}
