//! `versions/<id>/<id>.json` manifests and `inheritsFrom` resolution

use crate::game::launcher::arguments::split_preserving_quotes;
use crate::game::launcher::classpath::{maven_to_path, OsType};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One manifest file, before its parents are merged in
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VersionManifest {
    pub id: String,
    pub main_class: Option<String>,
    pub inherits_from: Option<String>,
    /// Version whose jar is launched, when it is not the chain root
    pub jar: Option<String>,
    pub arguments: Option<Arguments>,
    /// Pre-1.13 single-line game arguments
    pub minecraft_arguments: Option<String>,
    pub libraries: Vec<Library>,
    /// Keyed by side: "client", "server", ...
    pub downloads: HashMap<String, Artifact>,
    pub asset_index: Option<AssetIndexRef>,
    /// Legacy assets id
    pub assets: Option<String>,
    #[serde(rename = "type")]
    pub version_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Argument>,
    #[serde(default)]
    pub jvm: Vec<Argument>,
}

/// A plain string, or a value guarded by rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    Simple(String),
    Conditional { rules: Vec<Rule>, value: ArgumentValue },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Single(String),
    Multiple(Vec<String>),
}

impl ArgumentValue {
    pub fn parts(&self) -> Vec<&str> {
        match self {
            ArgumentValue::Single(s) => vec![s.as_str()],
            ArgumentValue::Multiple(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<HashMap<String, bool>>,
}

impl Rule {
    fn matches(&self, os: OsType, features: &HashMap<String, bool>) -> bool {
        let os_ok = self.os.as_ref().map_or(true, |rule| {
            rule.name.as_deref().map_or(true, |name| name == os.as_str())
                && rule
                    .arch
                    .as_deref()
                    .map_or(true, |arch| arch == std::env::consts::ARCH)
        });
        let features_ok = self.features.as_ref().map_or(true, |wanted| {
            wanted
                .iter()
                .all(|(key, value)| features.get(key).copied().unwrap_or(false) == *value)
        });
        os_ok && features_ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OsRule {
    pub name: Option<String>,
    pub arch: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Library {
    /// `group:artifact:version[:classifier]`
    pub name: String,
    pub downloads: Option<LibraryDownloads>,
    pub url: Option<String>,
    pub rules: Option<Vec<Rule>>,
    /// Legacy per-OS natives classifier map
    pub natives: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryDownloads {
    pub artifact: Option<Artifact>,
    pub classifiers: Option<HashMap<String, Artifact>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Artifact {
    pub path: Option<String>,
    pub url: Option<String>,
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetIndexRef {
    pub id: String,
}

impl Library {
    /// Allowed on `os` with no optional features enabled
    pub fn applies_to(&self, os: OsType) -> bool {
        self.rules
            .as_deref()
            .map_or(true, |rules| rules_allow(rules, os, &HashMap::new()))
    }

    /// Legacy natives-only entry, extracted rather than put on the classpath
    pub fn is_native(&self) -> bool {
        self.natives.is_some()
            || matches!(self.name.split(':').nth(3), Some(c) if c.starts_with("natives-"))
    }

    /// Path under `libraries/`, plus the expected sha1 when the manifest has one
    pub fn artifact_path(&self) -> Result<(String, Option<String>)> {
        let listed = self
            .downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .and_then(|a| a.path.clone().map(|path| (path, a.sha1.clone())));
        match listed {
            Some(found) => Ok(found),
            None => Ok((maven_to_path(&self.name)?, None)),
        }
    }
}

/// Last matching rule decides; with no match the entry is disallowed.
pub fn rules_allow(rules: &[Rule], os: OsType, features: &HashMap<String, bool>) -> bool {
    rules.iter().fold(false, |allowed, rule| {
        if rule.matches(os, features) {
            rule.action == RuleAction::Allow
        } else {
            allowed
        }
    })
}

/// A manifest with its whole `inheritsFrom` chain folded in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedVersion {
    pub id: String,
    /// Chain root, i.e. the base game version
    pub minecraft_version: String,
    /// `id` first, root last
    pub inheritances: Vec<String>,
    pub main_class: String,
    pub jar: String,
    pub arguments: Arguments,
    pub libraries: Vec<Library>,
    pub client_jar: Option<Artifact>,
    /// Assets id for `${assets_index_name}`
    pub assets: Option<String>,
    pub version_type: Option<String>,
}

impl ResolvedVersion {
    pub fn jar_path(&self, root: &Path) -> PathBuf {
        manifest_path(root, &self.jar).with_extension("jar")
    }

    pub fn assets_id(&self) -> Option<&str> {
        self.assets.as_deref()
    }
}

pub fn manifest_path(root: &Path, version_id: &str) -> PathBuf {
    root.join("versions")
        .join(version_id)
        .join(format!("{}.json", version_id))
}

pub async fn parse_version_json(path: &Path) -> Result<VersionManifest> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
}

/// Manifests from `version_id` up to the chain root, child first.
pub async fn load_version_chain(version_id: &str, root: &Path) -> Result<Vec<VersionManifest>> {
    let mut chain: Vec<VersionManifest> = Vec::new();
    let mut next = Some(version_id.to_string());

    while let Some(id) = next {
        if chain.iter().any(|m| m.id == id) {
            anyhow::bail!("Circular inheritsFrom chain at {}", id);
        }
        let path = manifest_path(root, &id);
        if !path.exists() {
            anyhow::bail!("Version manifest not found: {:?}", path);
        }
        log::debug!("[launch] Loading manifest {}", id);
        let manifest = parse_version_json(&path).await?;
        next = manifest.inherits_from.clone();
        chain.push(manifest);
    }

    Ok(chain)
}

pub async fn resolve_version(version_id: &str, root: &Path) -> Result<ResolvedVersion> {
    let chain = load_version_chain(version_id, root).await?;
    let inheritances: Vec<String> = chain.iter().map(|m| m.id.clone()).collect();
    let minecraft_version = inheritances
        .last()
        .cloned()
        .unwrap_or_else(|| version_id.to_string());

    let merged = chain
        .into_iter()
        .rev()
        .reduce(merge_manifests)
        .map(convert_legacy_arguments)
        .with_context(|| format!("Empty version chain for {}", version_id))?;

    let main_class = merged
        .main_class
        .with_context(|| format!("{} has no main class", version_id))?;
    let assets = merged.asset_index.map(|a| a.id).or(merged.assets);
    let mut downloads = merged.downloads;

    Ok(ResolvedVersion {
        id: version_id.to_string(),
        jar: merged.jar.unwrap_or_else(|| minecraft_version.clone()),
        minecraft_version,
        inheritances,
        main_class,
        arguments: merged.arguments.unwrap_or_default(),
        libraries: merged.libraries,
        client_jar: downloads.remove("client"),
        assets,
        version_type: merged.version_type,
    })
}

/// Move `minecraftArguments` into `arguments.game`, ahead of anything there
fn convert_legacy_arguments(mut manifest: VersionManifest) -> VersionManifest {
    if let Some(legacy) = manifest.minecraft_arguments.take() {
        let args = manifest.arguments.get_or_insert_with(Arguments::default);
        let mut game: Vec<Argument> = split_preserving_quotes(&legacy)
            .into_iter()
            .map(Argument::Simple)
            .collect();
        game.append(&mut args.game);
        args.game = game;
    }
    manifest
}

/// Layer `child` over `parent`. Scalars from the child win; argument lists
/// append; child libraries go first so loader-patched artifacts shadow the
/// vanilla ones.
pub(crate) fn merge_manifests(parent: VersionManifest, child: VersionManifest) -> VersionManifest {
    let mut parent = convert_legacy_arguments(parent);
    let mut child = child;

    // Legacy loader manifests repeat the full argument line
    if child.minecraft_arguments.is_some() {
        child = convert_legacy_arguments(child);
        if let Some(args) = parent.arguments.as_mut() {
            args.game.clear();
        }
    }

    let arguments = match (parent.arguments, child.arguments) {
        (Some(mut base), Some(extra)) => {
            base.game.extend(extra.game);
            base.jvm.extend(extra.jvm);
            Some(base)
        }
        (base, extra) => extra.or(base),
    };

    let mut libraries = child.libraries;
    libraries.extend(parent.libraries);

    let mut downloads = parent.downloads;
    downloads.extend(child.downloads);

    VersionManifest {
        id: child.id,
        main_class: child.main_class.or(parent.main_class),
        inherits_from: None,
        jar: child.jar.or(parent.jar),
        arguments,
        minecraft_arguments: None,
        libraries,
        downloads,
        asset_index: child.asset_index.or(parent.asset_index),
        assets: child.assets.or(parent.assets),
        version_type: child.version_type.or(parent.version_type),
    }
}
