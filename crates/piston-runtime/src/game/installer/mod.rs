pub mod config;
pub mod core;
pub mod error;
pub mod store;
pub mod types;


pub use self::core::{BaseInstaller, DynModloaderInstaller, Installers, ModloaderInstaller};
pub use config::{CatalogEndpoints, OrchestratorConfig};
pub use error::ResolutionError;
pub use store::{DirectoryVersionStore, InMemoryVersionStore, LocalVersionHeader, LocalVersionStore};
pub use types::{
    normalize_optifine, silent_reporter, BaseInstallRequest, FabricInstallRequest,
    ForgeInstallRequest, InstallSide, LabyModInstallRequest, NeoForgeInstallRequest,
    OptifineInstallRequest, OptifineVersion, ProgressReporter, QuiltInstallRequest,
    RuntimeComponent, RuntimeVersions, SilentProgressReporter,
};

use crate::game::metadata::{
    CatalogSource, ForgeVersionList, LabyModManifest, MetadataCache, MinecraftVersionList,
    NeoForgeVersionList,
};
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;

/// Turns a requested [`RuntimeVersions`] into the id of an installed,
/// launchable version, reusing local versions where possible.
pub struct VersionOrchestrator {
    store: Arc<dyn LocalVersionStore>,
    cache: Arc<MetadataCache>,
    catalog: Arc<dyn CatalogSource>,
    installers: Installers,
    config: OrchestratorConfig,
    reporter: Arc<dyn ProgressReporter>,
}

impl VersionOrchestrator {
    pub fn new(
        store: Arc<dyn LocalVersionStore>,
        cache: Arc<MetadataCache>,
        catalog: Arc<dyn CatalogSource>,
        installers: Installers,
        config: OrchestratorConfig,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            store,
            cache,
            catalog,
            installers,
            config,
            reporter,
        }
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    /// Resolve `runtime` to an installed version id, installing whatever is
    /// missing. Precedence: optifine or forge branch, then fabric, quilt,
    /// labymod, and finally the plain base version.
    pub async fn install(
        &self,
        runtime: &RuntimeVersions,
        side: InstallSide,
        force_reinstall_base_jar: bool,
    ) -> Result<String, ResolutionError> {
        log::info!(
            "[install] Resolving {:?} (side={}, force={})",
            runtime,
            side,
            force_reinstall_base_jar
        );
        self.reporter
            .start_step(&format!("Resolving Minecraft {}", runtime.minecraft), None);

        match self.resolve(runtime, side, force_reinstall_base_jar).await {
            Ok(id) => {
                log::info!("[install] Resolved {} -> {}", runtime.minecraft, id);
                self.reporter.done(true, Some(&id));
                Ok(id)
            }
            Err(e) => {
                let cause = std::error::Error::source(&e)
                    .map(|s| format!(": {:#}", s))
                    .unwrap_or_default();
                log::error!("[install] Resolution failed: {}{}", e, cause);
                self.reporter.done(false, Some(&e.to_string()));
                Err(e)
            }
        }
    }

    async fn resolve(
        &self,
        runtime: &RuntimeVersions,
        side: InstallSide,
        force: bool,
    ) -> Result<String, ResolutionError> {
        let minecraft = runtime.minecraft.as_str();

        self.ensure_base(minecraft, side, force).await?;

        let forge_branch = if let Some(forge) = runtime.forge() {
            Some(self.ensure_forge(minecraft, forge, side).await?)
        } else if let Some(neo) = runtime.neo_forged() {
            Some(self.ensure_neoforge(minecraft, neo, side).await?)
        } else {
            None
        };

        if let Some(optifine) = runtime.optifine() {
            return self
                .ensure_optifine(runtime, optifine, forge_branch)
                .await;
        }

        if let Some(id) = forge_branch {
            return Ok(id);
        }

        if let Some(loader) = runtime.fabric_loader() {
            return self.ensure_fabric(minecraft, loader).await;
        }

        if let Some(loader) = runtime.quilt_loader() {
            return self.ensure_quilt(minecraft, loader).await;
        }

        if let Some(laby) = runtime.laby_mod() {
            return self.ensure_labymod(minecraft, laby).await;
        }

        Ok(minecraft.to_string())
    }

    async fn ensure_base(
        &self,
        minecraft: &str,
        side: InstallSide,
        force: bool,
    ) -> Result<(), ResolutionError> {
        let component = RuntimeComponent::Minecraft;
        self.reporter
            .set_message(&format!("Checking Minecraft {}", minecraft));

        if !force {
            // Any artifact built on this base proves the base is present
            let local = self
                .store
                .find(&|h| h.minecraft == minecraft && h.is_plain())
                .or_else(|| self.store.find(&|h| h.minecraft == minecraft));
            if let Some(header) = local {
                log::debug!("[install] Local base version {} found", header.id);
                return self.refresh(component, &header.id).await;
            }
        }

        let catalog: Arc<MinecraftVersionList> = self
            .fetch_catalog(component, config::MINECRAFT_CATALOG_KEY, || {
                self.catalog.minecraft_versions()
            })
            .await?;
        let entry = catalog.find(minecraft).cloned();
        if entry.is_none() {
            log::warn!(
                "[install] {} not in the version catalog, installing by id",
                minecraft
            );
        }

        let request = BaseInstallRequest {
            minecraft: minecraft.to_string(),
            entry,
            side,
        };
        self.reporter
            .set_message(&format!("Installing Minecraft {}", minecraft));
        self.run_installer(component, self.installers.minecraft.install(&request))
            .await?;
        self.record(component, LocalVersionHeader::new(minecraft, minecraft))
            .await
    }

    async fn ensure_forge(
        &self,
        minecraft: &str,
        forge: &str,
        side: InstallSide,
    ) -> Result<String, ResolutionError> {
        let component = RuntimeComponent::Forge;
        let local = self.store.find(&|h| {
            h.minecraft == minecraft && h.forge == forge && h.optifine.is_empty()
        });
        if let Some(header) = local {
            self.refresh(component, &header.id).await?;
            return Ok(header.id);
        }

        let key = config::forge_catalog_key(minecraft);
        let catalog: Arc<ForgeVersionList> = self
            .fetch_catalog(component, &key, || self.catalog.forge_versions(minecraft))
            .await?;
        let installer = match catalog.find(forge) {
            Some(entry) => entry.installer.clone(),
            None => {
                log::warn!("[install] Forge {} not listed for {}", forge, minecraft);
                None
            }
        };

        let request = ForgeInstallRequest {
            minecraft: minecraft.to_string(),
            version: forge.to_string(),
            installer,
            side,
        };
        self.reporter
            .set_message(&format!("Installing Forge {}", forge));
        let id = self
            .run_installer(component, self.installers.forge.install(&request))
            .await?;
        let mut header = LocalVersionHeader::new(id.clone(), minecraft);
        header.forge = forge.to_string();
        self.record(component, header).await?;
        Ok(id)
    }

    async fn ensure_neoforge(
        &self,
        minecraft: &str,
        neo: &str,
        side: InstallSide,
    ) -> Result<String, ResolutionError> {
        let component = RuntimeComponent::NeoForge;
        let local = self.store.find(&|h| {
            h.minecraft == minecraft && h.neo_forged == neo && h.optifine.is_empty()
        });
        if let Some(header) = local {
            self.refresh(component, &header.id).await?;
            return Ok(header.id);
        }

        let key = config::neoforge_catalog_key(minecraft);
        let catalog: Arc<NeoForgeVersionList> = self
            .fetch_catalog(component, &key, || self.catalog.neoforge_versions(minecraft))
            .await?;
        let version = match catalog.find(neo) {
            Some(v) => v.to_string(),
            None => {
                log::warn!("[install] NeoForge {} not listed for {}", neo, minecraft);
                neo.to_string()
            }
        };

        let request = NeoForgeInstallRequest {
            minecraft: minecraft.to_string(),
            version,
            side,
        };
        self.reporter
            .set_message(&format!("Installing NeoForge {}", neo));
        let id = self
            .run_installer(component, self.installers.neoforge.install(&request))
            .await?;
        let mut header = LocalVersionHeader::new(id.clone(), minecraft);
        header.neo_forged = neo.to_string();
        self.record(component, header).await?;
        Ok(id)
    }

    async fn ensure_optifine(
        &self,
        runtime: &RuntimeVersions,
        optifine: &str,
        forge_branch: Option<String>,
    ) -> Result<String, ResolutionError> {
        let component = RuntimeComponent::Optifine;
        let minecraft = runtime.minecraft.as_str();
        let normalized = normalize_optifine(optifine, minecraft);
        let wanted = normalized.trim_start_matches('_');
        let forge = runtime.forge();
        let neo = if forge.is_none() { runtime.neo_forged() } else { None };

        let local = self.store.find(&|h| {
            h.minecraft == minecraft
                && !h.optifine.is_empty()
                && h.optifine.trim_start_matches('_') == wanted
                && h.forge == forge.unwrap_or_default()
                && h.neo_forged == neo.unwrap_or_default()
        });
        if let Some(header) = local {
            self.refresh(component, &header.id).await?;
            return Ok(header.id);
        }

        let parsed = OptifineVersion::parse(&normalized);
        let request = OptifineInstallRequest {
            minecraft: minecraft.to_string(),
            edition: parsed.edition,
            patch: parsed.patch,
            inherit_from: forge_branch,
        };
        self.reporter
            .set_message(&format!("Installing OptiFine {}", wanted));
        let id = self
            .run_installer(component, self.installers.optifine.install(&request))
            .await?;
        let header = LocalVersionHeader {
            optifine: wanted.to_string(),
            forge: forge.unwrap_or_default().to_string(),
            neo_forged: neo.unwrap_or_default().to_string(),
            ..LocalVersionHeader::new(id.clone(), minecraft)
        };
        self.record(component, header).await?;
        Ok(id)
    }

    async fn ensure_fabric(&self, minecraft: &str, loader: &str) -> Result<String, ResolutionError> {
        let component = RuntimeComponent::Fabric;
        let local = self
            .store
            .find(&|h| h.minecraft == minecraft && h.fabric == loader);
        if let Some(header) = local {
            self.refresh(component, &header.id).await?;
            return Ok(header.id);
        }

        let request = FabricInstallRequest {
            minecraft: minecraft.to_string(),
            loader: loader.to_string(),
        };
        self.reporter
            .set_message(&format!("Installing Fabric {}", loader));
        let id = self
            .run_installer(component, self.installers.fabric.install(&request))
            .await?;
        let mut header = LocalVersionHeader::new(id.clone(), minecraft);
        header.fabric = loader.to_string();
        self.record(component, header).await?;
        Ok(id)
    }

    async fn ensure_quilt(&self, minecraft: &str, loader: &str) -> Result<String, ResolutionError> {
        let component = RuntimeComponent::Quilt;
        let local = self
            .store
            .find(&|h| h.minecraft == minecraft && h.quilt == loader);
        if let Some(header) = local {
            self.refresh(component, &header.id).await?;
            return Ok(header.id);
        }

        let request = QuiltInstallRequest {
            minecraft: minecraft.to_string(),
            loader: loader.to_string(),
        };
        self.reporter
            .set_message(&format!("Installing Quilt {}", loader));
        let id = self
            .run_installer(component, self.installers.quilt.install(&request))
            .await?;
        let mut header = LocalVersionHeader::new(id.clone(), minecraft);
        header.quilt = loader.to_string();
        self.record(component, header).await?;
        Ok(id)
    }

    async fn ensure_labymod(&self, minecraft: &str, laby: &str) -> Result<String, ResolutionError> {
        let component = RuntimeComponent::LabyMod;
        let local = self
            .store
            .find(&|h| h.minecraft == minecraft && h.laby_mod == laby);
        if let Some(header) = local {
            self.refresh(component, &header.id).await?;
            return Ok(header.id);
        }

        let manifest: Arc<LabyModManifest> = self
            .fetch_catalog(component, config::LABYMOD_MANIFEST_KEY, || {
                self.catalog.labymod_manifest()
            })
            .await?;

        let request = LabyModInstallRequest {
            minecraft: minecraft.to_string(),
            manifest,
        };
        self.reporter
            .set_message(&format!("Installing LabyMod {}", laby));
        let id = self
            .run_installer(component, self.installers.labymod.install(&request))
            .await?;
        let mut header = LocalVersionHeader::new(id.clone(), minecraft);
        header.laby_mod = laby.to_string();
        self.record(component, header).await?;
        Ok(id)
    }

    async fn refresh(&self, component: RuntimeComponent, id: &str) -> Result<(), ResolutionError> {
        log::debug!("[install] Refreshing local version {}", id);
        self.bounded(component, async {
            self.store
                .refresh(id)
                .await
                .map_err(|source| ResolutionError::RefreshFailed {
                    id: id.to_string(),
                    source,
                })
        })
        .await
    }

    /// Register what an installer just produced so the next resolution of
    /// the same request is a local hit
    async fn record(
        &self,
        component: RuntimeComponent,
        header: LocalVersionHeader,
    ) -> Result<(), ResolutionError> {
        log::debug!("[install] Recording installed version {}", header.id);
        let id = header.id.clone();
        self.bounded(component, async {
            self.store
                .record(header)
                .await
                .map_err(|source| ResolutionError::RefreshFailed { id, source })
        })
        .await
    }

    async fn fetch_catalog<T, F, Fut>(
        &self,
        component: RuntimeComponent,
        key: &str,
        fetcher: F,
    ) -> Result<Arc<T>, ResolutionError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.bounded(component, async {
            self.cache
                .get_or_fetch(key, fetcher)
                .await
                .map_err(|source| ResolutionError::CatalogUnavailable {
                    key: key.to_string(),
                    source,
                })
        })
        .await
    }

    async fn run_installer<T, Fut>(
        &self,
        component: RuntimeComponent,
        install: Fut,
    ) -> Result<T, ResolutionError>
    where
        Fut: Future<Output = Result<T>>,
    {
        log::info!("[install] Running {} installer", component);
        self.bounded(component, async {
            install
                .await
                .map_err(|source| ResolutionError::InstallFailed { component, source })
        })
        .await
    }

    /// Apply the configured step timeout, if any
    async fn bounded<T, Fut>(&self, component: RuntimeComponent, step: Fut) -> Result<T, ResolutionError>
    where
        Fut: Future<Output = Result<T, ResolutionError>>,
    {
        match self.config.step_timeout {
            Some(limit) => match tokio::time::timeout(limit, step).await {
                Ok(result) => result,
                Err(_) => {
                    log::warn!("[install] {} step exceeded {:?}", component, limit);
                    Err(ResolutionError::Timeout { component })
                }
            },
            None => step.await,
        }
    }
}
