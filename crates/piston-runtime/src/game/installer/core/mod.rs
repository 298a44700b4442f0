pub mod traits;

pub use traits::{BaseInstaller, DynModloaderInstaller, Installers, ModloaderInstaller};
