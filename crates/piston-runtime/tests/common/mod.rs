#![allow(dead_code)]

use anyhow::Result;
use futures::future::BoxFuture;
use piston_runtime::game::installer::{
    BaseInstallRequest, BaseInstaller, FabricInstallRequest, ForgeInstallRequest,
    InMemoryVersionStore, Installers, LabyModInstallRequest, LocalVersionHeader,
    LocalVersionStore, ModloaderInstaller, NeoForgeInstallRequest, OptifineInstallRequest,
    OrchestratorConfig, QuiltInstallRequest, VersionOrchestrator,
};
use piston_runtime::game::installer::types::silent_reporter;
use piston_runtime::game::metadata::{
    CatalogSource, ForgeInstallerArtifact, ForgeVersionEntry, ForgeVersionList, LabyModManifest,
    LatestVersions, MetadataCache, MinecraftVersionEntry, MinecraftVersionList,
    NeoForgeVersionList,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Catalog that serves fixed data and counts every fetch
#[derive(Default)]
pub struct CountingCatalog {
    pub fetches: AtomicUsize,
}

impl CountingCatalog {
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl CatalogSource for CountingCatalog {
    fn minecraft_versions(&self) -> BoxFuture<'_, Result<MinecraftVersionList>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(MinecraftVersionList {
                latest: LatestVersions::default(),
                versions: ["1.20.1", "1.21.1"]
                    .iter()
                    .map(|id| MinecraftVersionEntry {
                        id: id.to_string(),
                        version_type: "release".to_string(),
                        url: format!("https://example.invalid/{}.json", id),
                        time: String::new(),
                        release_time: String::new(),
                        sha1: None,
                    })
                    .collect(),
            })
        })
    }

    fn forge_versions<'a>(&'a self, minecraft: &'a str) -> BoxFuture<'a, Result<ForgeVersionList>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(ForgeVersionList {
                minecraft: minecraft.to_string(),
                versions: vec![ForgeVersionEntry {
                    mcversion: minecraft.to_string(),
                    version: "47.2.0".to_string(),
                    installer: Some(ForgeInstallerArtifact {
                        path: format!(
                            "net/minecraftforge/forge/{0}-47.2.0/forge-{0}-47.2.0-installer.jar",
                            minecraft
                        ),
                        sha1: None,
                    }),
                }],
            })
        })
    }

    fn neoforge_versions<'a>(
        &'a self,
        minecraft: &'a str,
    ) -> BoxFuture<'a, Result<NeoForgeVersionList>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(NeoForgeVersionList {
                minecraft: minecraft.to_string(),
                versions: vec!["21.1.65".to_string()],
            })
        })
    }

    fn labymod_manifest(&self) -> BoxFuture<'_, Result<LabyModManifest>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::from_value(serde_json::json!({
                "commitReference": "c0ffee",
                "labymodVersion": "4.1.0"
            }))?)
        })
    }
}

/// Store wrapper counting refreshes
pub struct CountingStore {
    pub inner: InMemoryVersionStore,
    pub refreshes: AtomicUsize,
}

impl CountingStore {
    pub fn new(headers: Vec<LocalVersionHeader>) -> Self {
        Self {
            inner: InMemoryVersionStore::new(headers),
            refreshes: AtomicUsize::new(0),
        }
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl LocalVersionStore for CountingStore {
    fn find(
        &self,
        predicate: &dyn Fn(&LocalVersionHeader) -> bool,
    ) -> Option<LocalVersionHeader> {
        self.inner.find(predicate)
    }

    fn refresh<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.inner.refresh(id)
    }

    fn record<'a>(&'a self, header: LocalVersionHeader) -> BoxFuture<'a, Result<()>> {
        self.inner.record(header)
    }
}

/// Installers that record their calls and register what they "assembled"
/// in the store, like real installers writing a version directory would.
pub struct FakeInstallers {
    pub store: Arc<CountingStore>,
    pub calls: Mutex<Vec<String>>,
    pub optifine_requests: Mutex<Vec<OptifineInstallRequest>>,
    pub forge_requests: Mutex<Vec<ForgeInstallRequest>>,
}

impl FakeInstallers {
    pub fn new(store: Arc<CountingStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            calls: Mutex::new(Vec::new()),
            optifine_requests: Mutex::new(Vec::new()),
            forge_requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String, header: LocalVersionHeader) -> String {
        self.calls.lock().unwrap().push(call);
        let id = header.id.clone();
        self.store.inner.insert(header);
        id
    }

    pub fn installers(self: &Arc<Self>) -> Installers {
        Installers {
            minecraft: Arc::new(Base(self.clone())),
            forge: Arc::new(Forge(self.clone())),
            neoforge: Arc::new(NeoForge(self.clone())),
            optifine: Arc::new(Optifine(self.clone())),
            fabric: Arc::new(Fabric(self.clone())),
            quilt: Arc::new(Quilt(self.clone())),
            labymod: Arc::new(LabyMod(self.clone())),
        }
    }
}

pub struct Base(Arc<FakeInstallers>);
pub struct Forge(Arc<FakeInstallers>);
pub struct NeoForge(Arc<FakeInstallers>);
pub struct Optifine(Arc<FakeInstallers>);
pub struct Fabric(Arc<FakeInstallers>);
pub struct Quilt(Arc<FakeInstallers>);
pub struct LabyMod(Arc<FakeInstallers>);

impl BaseInstaller for Base {
    fn install<'a>(&'a self, request: &'a BaseInstallRequest) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.0.record(
                format!("minecraft:{}:{}", request.minecraft, request.side),
                LocalVersionHeader::new(request.minecraft.clone(), request.minecraft.clone()),
            );
            Ok(())
        })
    }
}

impl ModloaderInstaller for Forge {
    type Request = ForgeInstallRequest;

    fn install<'a>(&'a self, request: &'a ForgeInstallRequest) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.0.forge_requests.lock().unwrap().push(request.clone());
            let mut header = LocalVersionHeader::new(
                format!("{}-forge-{}", request.minecraft, request.version),
                request.minecraft.clone(),
            );
            header.forge = request.version.clone();
            Ok(self.0.record(format!("forge:{}", request.version), header))
        })
    }
}

impl ModloaderInstaller for NeoForge {
    type Request = NeoForgeInstallRequest;

    fn install<'a>(&'a self, request: &'a NeoForgeInstallRequest) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let mut header = LocalVersionHeader::new(
                format!("neoforge-{}", request.version),
                request.minecraft.clone(),
            );
            header.neo_forged = request.version.clone();
            Ok(self.0.record(format!("neoforge:{}", request.version), header))
        })
    }
}

impl ModloaderInstaller for Optifine {
    type Request = OptifineInstallRequest;

    fn install<'a>(&'a self, request: &'a OptifineInstallRequest) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.0.optifine_requests.lock().unwrap().push(request.clone());
            let optifine = format!("{}_{}", request.edition, request.patch);
            let base = request
                .inherit_from
                .clone()
                .unwrap_or_else(|| request.minecraft.clone());
            let mut header =
                LocalVersionHeader::new(format!("{}-OptiFine_{}", base, optifine), request.minecraft.clone());
            if let Some(parent) = request.inherit_from.as_deref() {
                if let Some(forge) = self.0.store.inner.find(&|h| h.id == parent) {
                    header.forge = forge.forge;
                    header.neo_forged = forge.neo_forged;
                }
            }
            header.optifine = optifine.clone();
            Ok(self.0.record(format!("optifine:{}", optifine), header))
        })
    }
}

impl ModloaderInstaller for Fabric {
    type Request = FabricInstallRequest;

    fn install<'a>(&'a self, request: &'a FabricInstallRequest) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let mut header = LocalVersionHeader::new(
                format!("fabric-loader-{}-{}", request.loader, request.minecraft),
                request.minecraft.clone(),
            );
            header.fabric = request.loader.clone();
            Ok(self.0.record(format!("fabric:{}", request.loader), header))
        })
    }
}

impl ModloaderInstaller for Quilt {
    type Request = QuiltInstallRequest;

    fn install<'a>(&'a self, request: &'a QuiltInstallRequest) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let mut header = LocalVersionHeader::new(
                format!("quilt-loader-{}-{}", request.loader, request.minecraft),
                request.minecraft.clone(),
            );
            header.quilt = request.loader.clone();
            Ok(self.0.record(format!("quilt:{}", request.loader), header))
        })
    }
}

impl ModloaderInstaller for LabyMod {
    type Request = LabyModInstallRequest;

    fn install<'a>(&'a self, request: &'a LabyModInstallRequest) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let mut header = LocalVersionHeader::new(
                format!("{}-labymod", request.minecraft),
                request.minecraft.clone(),
            );
            header.laby_mod = request.manifest.labymod_version.clone();
            Ok(self.0.record(format!("labymod:{}", header.laby_mod), header))
        })
    }
}

pub struct World {
    pub store: Arc<CountingStore>,
    pub catalog: Arc<CountingCatalog>,
    pub installers: Arc<FakeInstallers>,
    pub orchestrator: VersionOrchestrator,
}

pub fn world(headers: Vec<LocalVersionHeader>) -> World {
    init_logging();
    let store = Arc::new(CountingStore::new(headers));
    let catalog = Arc::new(CountingCatalog::default());
    let installers = FakeInstallers::new(store.clone());
    let orchestrator = VersionOrchestrator::new(
        store.clone(),
        Arc::new(MetadataCache::new()),
        catalog.clone(),
        installers.installers(),
        OrchestratorConfig::default(),
        silent_reporter(),
    );
    World {
        store,
        catalog,
        installers,
        orchestrator,
    }
}

pub fn header(id: &str, minecraft: &str) -> LocalVersionHeader {
    LocalVersionHeader::new(id, minecraft)
}
