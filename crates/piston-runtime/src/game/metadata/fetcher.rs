use super::types::{
    ForgeInstallerArtifact, ForgeVersionEntry, ForgeVersionList, LabyModManifest,
    MavenMetadataXml, MinecraftVersionList, NeoForgeVersionList,
};
use crate::game::installer::config::{current_timeout, CatalogEndpoints};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;

const FORGE_GAV: &str = "net/minecraftforge/forge";
const NEOFORGE_GAV: &str = "net/neoforged/neoforge";

/// Remote source of installable-version catalogs.
pub trait CatalogSource: Send + Sync {
    /// Every base version Mojang publishes
    fn minecraft_versions(&self) -> BoxFuture<'_, Result<MinecraftVersionList>>;

    /// Forge builds targeting `minecraft`
    fn forge_versions<'a>(&'a self, minecraft: &'a str) -> BoxFuture<'a, Result<ForgeVersionList>>;

    /// NeoForge builds targeting `minecraft`
    fn neoforge_versions<'a>(
        &'a self,
        minecraft: &'a str,
    ) -> BoxFuture<'a, Result<NeoForgeVersionList>>;

    /// Global LabyMod manifest (not keyed by base version)
    fn labymod_manifest(&self) -> BoxFuture<'_, Result<LabyModManifest>>;
}

/// [`CatalogSource`] backed by the official HTTP endpoints.
pub struct HttpCatalogSource {
    client: reqwest::Client,
    endpoints: CatalogEndpoints,
}

impl HttpCatalogSource {
    pub fn new(endpoints: CatalogEndpoints) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(current_timeout())
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &CatalogEndpoints {
        &self.endpoints
    }

    /// GET `url` with a short exponential backoff between attempts
    async fn get_text(&self, url: &str) -> Result<String> {
        const MAX_RETRIES: u32 = 3;
        const INITIAL_BACKOFF_MS: u64 = 250;

        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                log::info!(
                    "Retrying {} (attempt {}/{}) after {}ms...",
                    url,
                    attempt + 1,
                    MAX_RETRIES,
                    backoff
                );
                tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
            }

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        log::warn!("HTTP {} from {}", status, url);
                        last_error = Some(anyhow::anyhow!("HTTP {} from {}", status, url));
                        // Client errors will not get better by retrying
                        if status.is_client_error() {
                            break;
                        }
                        continue;
                    }
                    return response
                        .text()
                        .await
                        .with_context(|| format!("Failed to read response body from {}", url));
                }
                Err(e) => {
                    log::warn!("Failed to GET {}: {}", url, e);
                    last_error = Some(anyhow::Error::new(e).context(format!("GET {}", url)));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("Failed to fetch {} after {} attempts", url, MAX_RETRIES)))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).with_context(|| format!("Failed to parse JSON from {}", url))
    }

    async fn get_maven_versions(&self, maven_root: &str, gav: &str) -> Result<Vec<String>> {
        let url = format!("{}{}/maven-metadata.xml", maven_root, gav);
        let xml = self.get_text(&url).await?;
        let parsed: MavenMetadataXml = serde_xml_rs::from_str(&xml)
            .with_context(|| format!("Failed to parse maven metadata from {}", url))?;
        Ok(parsed.versioning.versions.version)
    }

    async fn fetch_minecraft_versions(&self) -> Result<MinecraftVersionList> {
        let list: MinecraftVersionList = self.get_json(&self.endpoints.minecraft_manifest).await?;
        log::info!("Fetched {} Minecraft versions", list.versions.len());
        Ok(list)
    }

    async fn fetch_forge_versions(&self, minecraft: &str) -> Result<ForgeVersionList> {
        let all = self
            .get_maven_versions(&self.endpoints.forge_maven, FORGE_GAV)
            .await?;
        let list = forge_versions_for(minecraft, &all);
        log::info!("Forge: {} - {} versions", minecraft, list.versions.len());
        Ok(list)
    }

    async fn fetch_neoforge_versions(&self, minecraft: &str) -> Result<NeoForgeVersionList> {
        let all = self
            .get_maven_versions(&self.endpoints.neoforge_maven, NEOFORGE_GAV)
            .await?;
        let list = neoforge_versions_for(minecraft, &all);
        log::info!("NeoForge: {} - {} versions", minecraft, list.versions.len());
        Ok(list)
    }
}

impl CatalogSource for HttpCatalogSource {
    fn minecraft_versions(&self) -> BoxFuture<'_, Result<MinecraftVersionList>> {
        Box::pin(self.fetch_minecraft_versions())
    }

    fn forge_versions<'a>(&'a self, minecraft: &'a str) -> BoxFuture<'a, Result<ForgeVersionList>> {
        Box::pin(self.fetch_forge_versions(minecraft))
    }

    fn neoforge_versions<'a>(
        &'a self,
        minecraft: &'a str,
    ) -> BoxFuture<'a, Result<NeoForgeVersionList>> {
        Box::pin(self.fetch_neoforge_versions(minecraft))
    }

    fn labymod_manifest(&self) -> BoxFuture<'_, Result<LabyModManifest>> {
        Box::pin(self.get_json(&self.endpoints.labymod_manifest))
    }
}

/// Forge maven versions look like "1.20.1-47.2.0"; keep the ones for
/// `minecraft` and strip the prefix.
pub(crate) fn forge_versions_for(minecraft: &str, maven_versions: &[String]) -> ForgeVersionList {
    let prefix = format!("{}-", minecraft);
    let versions = maven_versions
        .iter()
        .filter_map(|full| {
            let version = full.strip_prefix(&prefix)?;
            Some(ForgeVersionEntry {
                mcversion: minecraft.to_string(),
                version: version.to_string(),
                installer: Some(ForgeInstallerArtifact {
                    path: format!("{}/{}/forge-{}-installer.jar", FORGE_GAV, full, full),
                    sha1: None,
                }),
            })
        })
        .collect();

    ForgeVersionList {
        minecraft: minecraft.to_string(),
        versions,
    }
}

/// NeoForge drops the leading "1." of the base version: 1.20.4 -> 20.4.x,
/// 1.21 -> 21.0.x
pub(crate) fn neoforge_prefix(minecraft: &str) -> Option<String> {
    let rest = minecraft.strip_prefix("1.")?;
    let mut parts = rest.split('.');
    let major = parts.next().filter(|p| !p.is_empty())?;
    let minor = parts.next().unwrap_or("0");
    Some(format!("{}.{}.", major, minor))
}

pub(crate) fn neoforge_versions_for(
    minecraft: &str,
    maven_versions: &[String],
) -> NeoForgeVersionList {
    let versions = match neoforge_prefix(minecraft) {
        Some(prefix) => maven_versions
            .iter()
            .filter(|v| v.starts_with(&prefix))
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    NeoForgeVersionList {
        minecraft: minecraft.to_string(),
        versions,
    }
}
