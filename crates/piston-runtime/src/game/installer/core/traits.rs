use crate::game::installer::types::{
    BaseInstallRequest, FabricInstallRequest, ForgeInstallRequest, LabyModInstallRequest,
    NeoForgeInstallRequest, OptifineInstallRequest, QuiltInstallRequest,
};
use anyhow::Result;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Installs a base version in place (its artifact id is the version id).
pub trait BaseInstaller: Send + Sync {
    fn install<'a>(&'a self, request: &'a BaseInstallRequest) -> BoxFuture<'a, Result<()>>;
}

/// Trait for modloader installers.
/// Each loader family (Forge, Fabric, ...) has its own request shape and
/// returns the id of the artifact it assembled. Installers are expected to be
/// atomic: a failed install leaves no partial version behind.
pub trait ModloaderInstaller: Send + Sync {
    type Request: Send + Sync;

    fn install<'a>(&'a self, request: &'a Self::Request) -> BoxFuture<'a, Result<String>>;
}

pub type DynModloaderInstaller<R> = Arc<dyn ModloaderInstaller<Request = R>>;

/// Every installer the orchestrator can dispatch to.
#[derive(Clone)]
pub struct Installers {
    pub minecraft: Arc<dyn BaseInstaller>,
    pub forge: DynModloaderInstaller<ForgeInstallRequest>,
    pub neoforge: DynModloaderInstaller<NeoForgeInstallRequest>,
    pub optifine: DynModloaderInstaller<OptifineInstallRequest>,
    pub fabric: DynModloaderInstaller<FabricInstallRequest>,
    pub quilt: DynModloaderInstaller<QuiltInstallRequest>,
    pub labymod: DynModloaderInstaller<LabyModInstallRequest>,
}
