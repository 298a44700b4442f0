use serde::{Deserialize, Serialize};

/// Mojang version manifest (v2)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinecraftVersionList {
    pub latest: LatestVersions,
    pub versions: Vec<MinecraftVersionEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

/// One installable base version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinecraftVersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub release_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
}

impl MinecraftVersionList {
    pub fn find(&self, id: &str) -> Option<&MinecraftVersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }
}

/// Location of a Forge installer jar inside the Forge maven
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeInstallerArtifact {
    /// Maven-relative path, e.g. `net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-installer.jar`
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeVersionEntry {
    pub mcversion: String,
    /// Forge version without the Minecraft prefix (e.g. "47.2.0")
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer: Option<ForgeInstallerArtifact>,
}

/// Forge versions available for a single base version
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgeVersionList {
    pub minecraft: String,
    pub versions: Vec<ForgeVersionEntry>,
}

impl ForgeVersionList {
    pub fn find(&self, version: &str) -> Option<&ForgeVersionEntry> {
        self.versions.iter().find(|v| v.version == version)
    }
}

/// NeoForge versions available for a single base version
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NeoForgeVersionList {
    pub minecraft: String,
    pub versions: Vec<String>,
}

impl NeoForgeVersionList {
    pub fn find(&self, version: &str) -> Option<&str> {
        self.versions
            .iter()
            .find(|v| v.as_str() == version)
            .map(|v| v.as_str())
    }
}

/// LabyMod production manifest. Only the fields the launcher inspects are
/// typed; the rest is forwarded untouched to the installer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabyModManifest {
    #[serde(default)]
    pub commit_reference: String,
    #[serde(default)]
    pub labymod_version: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ============================================================================
// Raw maven-metadata.xml shape (Forge and NeoForge publish the same layout)
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct MavenMetadataXml {
    pub versioning: MavenVersioning,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MavenVersioning {
    pub versions: MavenVersionList,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MavenVersionList {
    #[serde(default)]
    pub version: Vec<String>,
}
