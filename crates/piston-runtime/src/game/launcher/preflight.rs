//! Pre-launch diagnosis of the game jar and libraries, with repair hooks.

use crate::game::launcher::classpath::OsType;
use crate::game::launcher::version_parser::{Library, ResolvedVersion};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use sha1::{Digest, Sha1};
use std::path::Path;

/// Fixes what diagnosis found. Implementations typically wrap the installer.
pub trait PreflightRepair: Send + Sync {
    /// Re-download the jar of `version` (missing or failing its checksum)
    fn reinstall_base<'a>(
        &'a self,
        version: &'a ResolvedVersion,
        root: &'a Path,
    ) -> BoxFuture<'a, Result<()>>;

    /// Download the given libraries into `<root>/libraries`
    fn install_libraries<'a>(
        &'a self,
        libraries: &'a [Library],
        root: &'a Path,
    ) -> BoxFuture<'a, Result<()>>;
}

/// Repair that can't fix anything: any finding fails the launch.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRepair;

impl PreflightRepair for NoRepair {
    fn reinstall_base<'a>(
        &'a self,
        version: &'a ResolvedVersion,
        root: &'a Path,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            anyhow::bail!(
                "Game jar for {} is missing or corrupt: {:?}",
                version.id,
                version.jar_path(root)
            )
        })
    }

    fn install_libraries<'a>(
        &'a self,
        libraries: &'a [Library],
        _root: &'a Path,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let names: Vec<&str> = libraries.iter().map(|l| l.name.as_str()).collect();
            anyhow::bail!("Missing libraries: {}", names.join(", "))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JarStatus {
    Ok,
    Missing,
    Corrupt,
}

pub async fn file_sha1(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;
    let mut hasher = Sha1::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Whether `path` exists and, when `expected` is known, hashes to it
async fn file_matches(path: &Path, expected: Option<&str>) -> Result<JarStatus> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(JarStatus::Missing);
    }
    match expected.filter(|s| !s.is_empty()) {
        Some(expected) => {
            let actual = file_sha1(path).await?;
            if actual.eq_ignore_ascii_case(expected) {
                Ok(JarStatus::Ok)
            } else {
                log::warn!(
                    "[launch] Checksum mismatch for {:?}: expected {}, got {}",
                    path,
                    expected,
                    actual
                );
                Ok(JarStatus::Corrupt)
            }
        }
        None => Ok(JarStatus::Ok),
    }
}

pub async fn diagnose_jar(version: &ResolvedVersion, root: &Path) -> Result<JarStatus> {
    let expected = version.client_jar.as_ref().and_then(|a| a.sha1.as_deref());
    file_matches(&version.jar_path(root), expected).await
}

/// Applicable classpath libraries that are missing or fail their checksum
pub async fn diagnose_libraries(
    version: &ResolvedVersion,
    root: &Path,
    os: OsType,
) -> Result<Vec<Library>> {
    let libraries_dir = root.join("libraries");
    let mut missing = Vec::new();

    for library in &version.libraries {
        if !library.applies_to(os) || library.is_native() {
            continue;
        }
        let (path, sha1) = library.artifact_path()?;
        match file_matches(&libraries_dir.join(&path), sha1.as_deref()).await? {
            JarStatus::Ok => {}
            status => {
                log::debug!("[launch] Library {} is {:?}", library.name, status);
                missing.push(library.clone());
            }
        }
    }

    Ok(missing)
}

/// Diagnose jar and libraries concurrently, repairing each as needed.
/// The first error from either branch aborts.
pub async fn run_preflight(
    version: &ResolvedVersion,
    root: &Path,
    repair: &dyn PreflightRepair,
    os: OsType,
) -> Result<()> {
    let jar = async {
        let status = diagnose_jar(version, root).await?;
        if status != JarStatus::Ok {
            log::info!("[launch] Game jar {:?}, reinstalling {}", status, version.jar);
            repair
                .reinstall_base(version, root)
                .await
                .context("Failed to repair game jar")?;
        }
        Ok::<_, anyhow::Error>(())
    };

    let libraries = async {
        let missing = diagnose_libraries(version, root, os).await?;
        if !missing.is_empty() {
            log::info!("[launch] Installing {} missing libraries", missing.len());
            repair
                .install_libraries(&missing, root)
                .await
                .context("Failed to repair libraries")?;
        }
        Ok::<_, anyhow::Error>(())
    };

    tokio::try_join!(jar, libraries)?;
    Ok(())
}
