use crate::game::metadata::{ForgeInstallerArtifact, LabyModManifest, MinecraftVersionEntry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Progress reporter trait for resolution steps
/// Implementations forward updates to the UI/notification system
pub trait ProgressReporter: Send + Sync {
    /// Start a new step with optional total steps
    fn start_step(&self, name: &str, total_steps: Option<u32>);

    /// Set a short status message
    fn set_message(&self, message: &str);

    /// Mark operation as complete
    fn done(&self, success: bool, message: Option<&str>);
}

/// A progress reporter that does nothing (silent).
/// Useful for background verification or tests.
pub struct SilentProgressReporter;

impl ProgressReporter for SilentProgressReporter {
    fn start_step(&self, _name: &str, _total_steps: Option<u32>) {}
    fn set_message(&self, _message: &str) {}
    fn done(&self, _success: bool, _message: Option<&str>) {}
}

pub fn silent_reporter() -> Arc<dyn ProgressReporter> {
    Arc::new(SilentProgressReporter)
}

/// Requested runtime: a base version plus optional loader/cosmetic layers.
///
/// Empty strings are treated as "not requested".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeVersions {
    pub minecraft: String,
    pub forge: Option<String>,
    pub neo_forged: Option<String>,
    pub fabric_loader: Option<String>,
    pub quilt_loader: Option<String>,
    pub optifine: Option<String>,
    pub laby_mod: Option<String>,
}

fn requested(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl RuntimeVersions {
    pub fn new(minecraft: impl Into<String>) -> Self {
        Self {
            minecraft: minecraft.into(),
            ..Default::default()
        }
    }

    pub fn with_forge(mut self, version: impl Into<String>) -> Self {
        self.forge = Some(version.into());
        self
    }

    pub fn with_neo_forged(mut self, version: impl Into<String>) -> Self {
        self.neo_forged = Some(version.into());
        self
    }

    pub fn with_fabric(mut self, version: impl Into<String>) -> Self {
        self.fabric_loader = Some(version.into());
        self
    }

    pub fn with_quilt(mut self, version: impl Into<String>) -> Self {
        self.quilt_loader = Some(version.into());
        self
    }

    pub fn with_optifine(mut self, version: impl Into<String>) -> Self {
        self.optifine = Some(version.into());
        self
    }

    pub fn with_laby_mod(mut self, version: impl Into<String>) -> Self {
        self.laby_mod = Some(version.into());
        self
    }

    pub fn forge(&self) -> Option<&str> {
        requested(&self.forge)
    }

    pub fn neo_forged(&self) -> Option<&str> {
        requested(&self.neo_forged)
    }

    pub fn fabric_loader(&self) -> Option<&str> {
        requested(&self.fabric_loader)
    }

    pub fn quilt_loader(&self) -> Option<&str> {
        requested(&self.quilt_loader)
    }

    pub fn optifine(&self) -> Option<&str> {
        requested(&self.optifine)
    }

    pub fn laby_mod(&self) -> Option<&str> {
        requested(&self.laby_mod)
    }
}

/// Which half of a base version to install. Client and server artifacts are
/// installed independently even for the same version id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallSide {
    #[default]
    Client,
    Server,
}

impl InstallSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallSide::Client => "client",
            InstallSide::Server => "server",
        }
    }
}

impl std::fmt::Display for InstallSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Each family the orchestrator can dispatch to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeComponent {
    Minecraft,
    Forge,
    NeoForge,
    Optifine,
    Fabric,
    Quilt,
    LabyMod,
}

impl RuntimeComponent {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeComponent::Minecraft => "minecraft",
            RuntimeComponent::Forge => "forge",
            RuntimeComponent::NeoForge => "neoforge",
            RuntimeComponent::Optifine => "optifine",
            RuntimeComponent::Fabric => "fabric",
            RuntimeComponent::Quilt => "quilt",
            RuntimeComponent::LabyMod => "labymod",
        }
    }
}

impl std::fmt::Display for RuntimeComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Installer requests
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseInstallRequest {
    pub minecraft: String,
    /// Catalog entry, `None` when the catalog does not list `minecraft`
    pub entry: Option<MinecraftVersionEntry>,
    pub side: InstallSide,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeInstallRequest {
    pub minecraft: String,
    pub version: String,
    pub installer: Option<ForgeInstallerArtifact>,
    pub side: InstallSide,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeoForgeInstallRequest {
    pub minecraft: String,
    pub version: String,
    pub side: InstallSide,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptifineInstallRequest {
    pub minecraft: String,
    /// Edition code, e.g. "HD_U"
    pub edition: String,
    /// Patch label, e.g. "I6"
    pub patch: String,
    /// Forge-branch artifact to layer on; `None` installs atop the base version
    pub inherit_from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FabricInstallRequest {
    pub minecraft: String,
    pub loader: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuiltInstallRequest {
    pub minecraft: String,
    pub loader: String,
}

#[derive(Debug, Clone)]
pub struct LabyModInstallRequest {
    pub minecraft: String,
    pub manifest: Arc<LabyModManifest>,
}

// ============================================================================
// OptiFine version strings
// ============================================================================

/// Strip a leading base-version prefix from an OptiFine version string.
///
/// `"1.20.1_HD_U_I6"` with `"1.20.1"` gives `"_HD_U_I6"`; strings without the
/// prefix are returned unchanged.
pub fn normalize_optifine(optifine: &str, minecraft: &str) -> String {
    optifine
        .strip_prefix(minecraft)
        .unwrap_or(optifine)
        .to_string()
}

/// OptiFine version split into edition code and patch label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptifineVersion {
    pub edition: String,
    pub patch: String,
}

impl OptifineVersion {
    /// Split at the last `_`: `"HD_U_I6"` gives edition `"HD_U"`, patch `"I6"`.
    /// Separator underscores left over from normalization are dropped.
    pub fn parse(normalized: &str) -> Self {
        let trimmed = normalized.trim_start_matches('_');
        match trimmed.rfind('_') {
            Some(idx) => Self {
                edition: trimmed[..idx].to_string(),
                patch: trimmed[idx + 1..].to_string(),
            },
            None => Self {
                edition: String::new(),
                patch: trimmed.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_leading_base_version() {
        assert_eq!(normalize_optifine("1.20.1_HD_U_I6", "1.20.1"), "_HD_U_I6");
        assert_eq!(normalize_optifine("HD_U_I6", "1.20.1"), "HD_U_I6");
        // Only a leading prefix counts
        assert_eq!(normalize_optifine("HD_U_1.20.1", "1.20.1"), "HD_U_1.20.1");
    }

    #[test]
    fn optifine_parse_splits_at_last_underscore() {
        let v = OptifineVersion::parse("HD_U_I6");
        assert_eq!(v.edition, "HD_U");
        assert_eq!(v.patch, "I6");

        let v = OptifineVersion::parse("_HD_U_I6");
        assert_eq!(v.edition, "HD_U");
        assert_eq!(v.patch, "I6");

        let v = OptifineVersion::parse("HD_U_G9_pre2");
        assert_eq!(v.edition, "HD_U_G9");
        assert_eq!(v.patch, "pre2");
    }

    #[test]
    fn blank_fields_are_not_requested() {
        let runtime = RuntimeVersions {
            minecraft: "1.20.1".to_string(),
            forge: Some("  ".to_string()),
            fabric_loader: Some("0.15.7".to_string()),
            ..Default::default()
        };
        assert_eq!(runtime.forge(), None);
        assert_eq!(runtime.fabric_loader(), Some("0.15.7"));
    }

    #[test]
    fn runtime_versions_camel_case_json() {
        let runtime: RuntimeVersions = serde_json::from_str(
            r#"{"minecraft":"1.20.1","neoForged":"47.1.79","labyMod":"4.1.0"}"#,
        )
        .unwrap();
        assert_eq!(runtime.neo_forged(), Some("47.1.79"));
        assert_eq!(runtime.laby_mod(), Some("4.1.0"));
        assert_eq!(runtime.quilt_loader(), None);
    }

    #[test]
    fn install_side_display() {
        assert_eq!(InstallSide::Client.to_string(), "client");
        assert_eq!(InstallSide::Server.to_string(), "server");
        assert_eq!(InstallSide::default(), InstallSide::Client);
    }
}
