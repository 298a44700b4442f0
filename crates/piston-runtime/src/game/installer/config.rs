//! Centralized resolution settings.
//! URL constants are the defaults for [`CatalogEndpoints`]; both config structs
//! deserialize with defaults so callers can load partial JSON.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const REQUEST_TIMEOUT_SECS: u64 = 120;

pub fn current_timeout() -> Duration {
    Duration::from_secs(REQUEST_TIMEOUT_SECS)
}

// URL Constants
pub const VANILLA_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";
pub const FORGE_MAVEN_URL: &str = "https://maven.minecraftforge.net/";
pub const NEOFORGE_MAVEN_URL: &str = "https://maven.neoforged.net/releases/";
pub const LABYMOD_MANIFEST_URL: &str =
    "https://releases.r2.labymod.net/api/v1/manifest/production/latest.json";

// Metadata cache keys
pub const MINECRAFT_CATALOG_KEY: &str = "minecraft";
pub const LABYMOD_MANIFEST_KEY: &str = "labymod";

pub fn forge_catalog_key(minecraft: &str) -> String {
    format!("forge/{}", minecraft)
}

pub fn neoforge_catalog_key(minecraft: &str) -> String {
    format!("neoforged/{}", minecraft)
}

/// Base URLs used by [`crate::game::metadata::HttpCatalogSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogEndpoints {
    pub minecraft_manifest: String,
    /// Maven root, must end with '/'
    pub forge_maven: String,
    /// Maven root, must end with '/'
    pub neoforge_maven: String,
    pub labymod_manifest: String,
}

impl Default for CatalogEndpoints {
    fn default() -> Self {
        Self {
            minecraft_manifest: VANILLA_MANIFEST_URL.to_string(),
            forge_maven: FORGE_MAVEN_URL.to_string(),
            neoforge_maven: NEOFORGE_MAVEN_URL.to_string(),
            labymod_manifest: LABYMOD_MANIFEST_URL.to_string(),
        }
    }
}

/// Knobs for [`crate::game::installer::VersionOrchestrator`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Upper bound for a single catalog fetch or installer call.
    /// `None` waits forever.
    #[serde(with = "optional_secs")]
    pub step_timeout: Option<Duration>,
}

mod optional_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_keys_include_base_version() {
        assert_eq!(forge_catalog_key("1.20.1"), "forge/1.20.1");
        assert_eq!(neoforge_catalog_key("1.21.1"), "neoforged/1.21.1");
    }

    #[test]
    fn orchestrator_config_from_partial_json() {
        let cfg: OrchestratorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.step_timeout, None);

        let cfg: OrchestratorConfig = serde_json::from_str(r#"{"step_timeout": 30}"#).unwrap();
        assert_eq!(cfg.step_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn endpoints_override_single_field() {
        let cfg: CatalogEndpoints =
            serde_json::from_str(r#"{"forge_maven": "http://localhost/maven/"}"#).unwrap();
        assert_eq!(cfg.forge_maven, "http://localhost/maven/");
        assert_eq!(cfg.minecraft_manifest, VANILLA_MANIFEST_URL);
    }
}
