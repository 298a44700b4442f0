//! Local version headers: what has already been assembled on disk.

use crate::game::launcher::version_parser::{load_version_chain, VersionManifest};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Summary of a previously assembled version. Empty loader fields mean the
/// component is not part of the artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalVersionHeader {
    pub id: String,
    pub minecraft: String,
    pub forge: String,
    pub neo_forged: String,
    pub fabric: String,
    pub quilt: String,
    pub optifine: String,
    pub laby_mod: String,
}

impl LocalVersionHeader {
    pub fn new(id: impl Into<String>, minecraft: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            minecraft: minecraft.into(),
            ..Default::default()
        }
    }

    /// A base version with no loader or cosmetic layer
    pub fn is_plain(&self) -> bool {
        self.forge.is_empty()
            && self.neo_forged.is_empty()
            && self.fabric.is_empty()
            && self.quilt.is_empty()
            && self.optifine.is_empty()
            && self.laby_mod.is_empty()
    }
}

/// Ordered collection of local headers.
pub trait LocalVersionStore: Send + Sync {
    /// First header (in store order) matching `predicate`
    fn find(&self, predicate: &dyn Fn(&LocalVersionHeader) -> bool)
        -> Option<LocalVersionHeader>;

    /// Revalidate the local files of `id`. Never changes the header's identity.
    fn refresh<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Make a freshly installed version visible to later lookups. The
    /// default only revalidates, for stores that learn about ids on their own.
    fn record<'a>(&'a self, header: LocalVersionHeader) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.refresh(&header.id).await })
    }
}

/// Store backed by a plain vector, for callers that track headers themselves.
#[derive(Default)]
pub struct InMemoryVersionStore {
    headers: RwLock<Vec<LocalVersionHeader>>,
}

impl InMemoryVersionStore {
    pub fn new(headers: Vec<LocalVersionHeader>) -> Self {
        Self {
            headers: RwLock::new(headers),
        }
    }

    /// Add a header, replacing any existing header with the same id in place
    pub fn insert(&self, header: LocalVersionHeader) {
        let mut headers = self.headers.write().unwrap_or_else(|e| e.into_inner());
        match headers.iter_mut().find(|h| h.id == header.id) {
            Some(existing) => *existing = header,
            None => headers.push(header),
        }
    }

    pub fn headers(&self) -> Vec<LocalVersionHeader> {
        self.headers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl LocalVersionStore for InMemoryVersionStore {
    fn find(
        &self,
        predicate: &dyn Fn(&LocalVersionHeader) -> bool,
    ) -> Option<LocalVersionHeader> {
        let headers = self.headers.read().unwrap_or_else(|e| e.into_inner());
        headers.iter().find(|h| predicate(h)).cloned()
    }

    fn refresh<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if self.find(&|h| h.id == id).is_none() {
                anyhow::bail!("Unknown local version: {}", id);
            }
            Ok(())
        })
    }

    fn record<'a>(&'a self, header: LocalVersionHeader) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.insert(header);
            Ok(())
        })
    }
}

/// Store that derives headers from `<root>/versions/<id>/<id>.json`.
pub struct DirectoryVersionStore {
    root: PathBuf,
    headers: RwLock<Vec<LocalVersionHeader>>,
}

impl DirectoryVersionStore {
    /// Scan `root/versions` and build the initial header list
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            root: root.into(),
            headers: RwLock::new(Vec::new()),
        };
        store.rescan().await?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Re-read every version directory. Unparseable versions are skipped.
    pub async fn rescan(&self) -> Result<usize> {
        let versions_dir = self.root.join("versions");
        let mut found: Vec<LocalVersionHeader> = Vec::new();

        if versions_dir.exists() {
            let mut ids = Vec::new();
            let mut rd = tokio::fs::read_dir(&versions_dir)
                .await
                .with_context(|| format!("Failed to read {:?}", versions_dir))?;
            while let Some(entry) = rd.next_entry().await? {
                if entry.file_type().await?.is_dir() {
                    ids.push(entry.file_name().to_string_lossy().to_string());
                }
            }
            ids.sort();

            for id in ids {
                match self.read_header(&id).await {
                    Ok(header) => found.push(header),
                    Err(e) => log::warn!("Skipping local version {}: {:#}", id, e),
                }
            }
        }

        let count = found.len();
        *self.headers.write().unwrap_or_else(|e| e.into_inner()) = found;
        log::info!("Local version store: {} versions under {:?}", count, versions_dir);
        Ok(count)
    }

    async fn read_header(&self, id: &str) -> Result<LocalVersionHeader> {
        let chain = load_version_chain(id, &self.root).await?;
        Ok(header_from_chain(id, &chain))
    }

    pub fn headers(&self) -> Vec<LocalVersionHeader> {
        self.headers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl LocalVersionStore for DirectoryVersionStore {
    fn find(
        &self,
        predicate: &dyn Fn(&LocalVersionHeader) -> bool,
    ) -> Option<LocalVersionHeader> {
        let headers = self.headers.read().unwrap_or_else(|e| e.into_inner());
        headers.iter().find(|h| predicate(h)).cloned()
    }

    fn refresh<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let header = self
                .read_header(id)
                .await
                .with_context(|| format!("Failed to refresh local version {}", id))?;

            let mut headers = self.headers.write().unwrap_or_else(|e| e.into_inner());
            if !headers.iter().any(|h| h.id == id) {
                headers.push(header);
            }
            Ok(())
        })
    }

    fn record<'a>(&'a self, header: LocalVersionHeader) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let on_disk = self
                .read_header(&header.id)
                .await
                .with_context(|| format!("Installed version {} is not readable", header.id))?;
            if on_disk != header {
                log::debug!(
                    "Recording {} as requested ({:?}), disk layout reads as {:?}",
                    header.id,
                    header,
                    on_disk
                );
            }

            let mut headers = self.headers.write().unwrap_or_else(|e| e.into_inner());
            match headers.iter_mut().find(|h| h.id == header.id) {
                Some(existing) => *existing = header,
                None => headers.push(header),
            }
            Ok(())
        })
    }
}

/// Derive a header from a loaded chain (child first) by classifying the
/// library coordinates each layer contributed.
pub fn header_from_chain(id: &str, chain: &[VersionManifest]) -> LocalVersionHeader {
    let minecraft = chain
        .last()
        .map(|m| m.id.clone())
        .unwrap_or_else(|| id.to_string());
    let mut header = LocalVersionHeader::new(id, minecraft.clone());

    for library in chain.iter().flat_map(|m| m.libraries.iter()) {
        let mut parts = library.name.split(':');
        let (Some(group), Some(artifact), Some(version)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let strip_mc = |v: &str| {
            v.strip_prefix(&format!("{}-", minecraft))
                .unwrap_or(v)
                .to_string()
        };

        match (group, artifact) {
            ("net.minecraftforge", "forge") | ("net.minecraftforge", "fmlloader") => {
                if header.forge.is_empty() {
                    header.forge = strip_mc(version);
                }
            }
            ("net.neoforged", "neoforge") | ("net.neoforged", "forge") => {
                if header.neo_forged.is_empty() {
                    header.neo_forged = strip_mc(version);
                }
            }
            ("net.fabricmc", "fabric-loader") => header.fabric = version.to_string(),
            ("org.quiltmc", "quilt-loader") => header.quilt = version.to_string(),
            ("optifine", "OptiFine") => {
                header.optifine = version
                    .strip_prefix(&format!("{}_", minecraft))
                    .unwrap_or(version)
                    .to_string();
            }
            (g, _) if g.starts_with("net.labymod") => {
                if header.laby_mod.is_empty() {
                    header.laby_mod = version.to_string();
                }
            }
            _ => {}
        }
    }

    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::launcher::version_parser::{manifest_path, Library};
    use tempfile::TempDir;

    fn manifest(id: &str, parent: Option<&str>, libs: &[&str]) -> VersionManifest {
        VersionManifest {
            id: id.to_string(),
            inherits_from: parent.map(|p| p.to_string()),
            main_class: Some("Main".to_string()),
            libraries: libs
                .iter()
                .map(|n| Library {
                    name: n.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn write(root: &Path, m: &VersionManifest) {
        let path = manifest_path(root, &m.id);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_string(m).unwrap()).unwrap();
    }

    #[test]
    fn classifies_forge_and_optifine_layers() {
        let chain = vec![
            manifest(
                "1.20.1-forge-47.2.0-OptiFine_HD_U_I6",
                Some("1.20.1-forge-47.2.0"),
                &["optifine:OptiFine:1.20.1_HD_U_I6"],
            ),
            manifest(
                "1.20.1-forge-47.2.0",
                Some("1.20.1"),
                &["net.minecraftforge:fmlloader:1.20.1-47.2.0"],
            ),
            manifest("1.20.1", None, &["com.mojang:brigadier:1.1.8"]),
        ];

        let header = header_from_chain("1.20.1-forge-47.2.0-OptiFine_HD_U_I6", &chain);
        assert_eq!(header.minecraft, "1.20.1");
        assert_eq!(header.forge, "47.2.0");
        assert_eq!(header.optifine, "HD_U_I6");
        assert!(header.fabric.is_empty());
        assert!(!header.is_plain());
    }

    #[test]
    fn classifies_fabric_and_quilt() {
        let fabric = header_from_chain(
            "fabric-loader-0.15.7-1.20.1",
            &[
                manifest("fabric-loader-0.15.7-1.20.1", Some("1.20.1"), &["net.fabricmc:fabric-loader:0.15.7"]),
                manifest("1.20.1", None, &[]),
            ],
        );
        assert_eq!(fabric.fabric, "0.15.7");

        let quilt = header_from_chain(
            "quilt-loader-0.23.1-1.20.1",
            &[
                manifest("quilt-loader-0.23.1-1.20.1", Some("1.20.1"), &["org.quiltmc:quilt-loader:0.23.1"]),
                manifest("1.20.1", None, &[]),
            ],
        );
        assert_eq!(quilt.quilt, "0.23.1");
    }

    #[test]
    fn plain_base_version() {
        let header = header_from_chain("1.20.1", &[manifest("1.20.1", None, &[])]);
        assert!(header.is_plain());
        assert_eq!(header.id, "1.20.1");
        assert_eq!(header.minecraft, "1.20.1");
    }

    #[tokio::test]
    async fn in_memory_refresh_rejects_unknown_ids() {
        let store = InMemoryVersionStore::new(vec![LocalVersionHeader::new("1.20.1", "1.20.1")]);
        assert!(store.refresh("1.20.1").await.is_ok());
        assert!(store.refresh("1.19.2").await.is_err());

        store.insert(LocalVersionHeader::new("1.19.2", "1.19.2"));
        assert!(store.refresh("1.19.2").await.is_ok());
        assert_eq!(store.headers().len(), 2);
    }

    #[tokio::test]
    async fn directory_store_scans_and_refreshes() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), &manifest("1.20.1", None, &[]));
        write(
            dir.path(),
            &manifest("neoforge-21.1.65", Some("1.21.1"), &["net.neoforged:neoforge:21.1.65"]),
        );
        write(dir.path(), &manifest("1.21.1", None, &[]));
        // Broken parent chain is skipped
        write(dir.path(), &manifest("broken", Some("missing"), &[]));

        let store = DirectoryVersionStore::open(dir.path()).await.unwrap();
        assert_eq!(store.headers().len(), 3);

        let neo = store.find(&|h| h.neo_forged == "21.1.65").unwrap();
        assert_eq!(neo.id, "neoforge-21.1.65");
        assert_eq!(neo.minecraft, "1.21.1");

        assert!(store.refresh("1.20.1").await.is_ok());
        std::fs::remove_dir_all(dir.path().join("versions").join("1.20.1")).unwrap();
        assert!(store.refresh("1.20.1").await.is_err());
    }

    #[tokio::test]
    async fn in_memory_record_makes_installs_visible() {
        let store = InMemoryVersionStore::default();
        let mut fabric = LocalVersionHeader::new("fabric-loader-0.15.7-1.20.1", "1.20.1");
        fabric.fabric = "0.15.7".to_string();

        store.record(fabric.clone()).await.unwrap();
        assert_eq!(store.find(&|h| h.fabric == "0.15.7"), Some(fabric));
        assert!(store.refresh("fabric-loader-0.15.7-1.20.1").await.is_ok());
    }

    #[tokio::test]
    async fn directory_record_requires_files_and_keeps_identity() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), &manifest("1.20.1", None, &[]));
        let store = DirectoryVersionStore::open(dir.path()).await.unwrap();

        let mut forge = LocalVersionHeader::new("1.20.1-forge-47.2.0", "1.20.1");
        forge.forge = "47.2.0".to_string();
        // Nothing written yet
        assert!(store.record(forge.clone()).await.is_err());
        assert!(store.find(&|h| h.forge == "47.2.0").is_none());

        write(
            dir.path(),
            &manifest("1.20.1-forge-47.2.0", Some("1.20.1"), &["net.minecraftforge:forge:1.20.1-47.2.0-universal"]),
        );
        store.record(forge.clone()).await.unwrap();
        assert!(store.refresh("1.20.1-forge-47.2.0").await.is_ok());
        // Refresh revalidates without re-deriving the recorded header
        assert_eq!(store.find(&|h| h.id == "1.20.1-forge-47.2.0"), Some(forge));
    }
}
