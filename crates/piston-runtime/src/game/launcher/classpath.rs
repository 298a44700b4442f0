/// Classpath construction for Minecraft launcher
use crate::game::launcher::version_parser::Library;
use anyhow::Result;
use std::path::Path;

/// Operating system types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsType {
    Windows,
    MacOS,
    Linux,
}

impl OsType {
    /// Detect the current OS
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            OsType::Windows
        } else if cfg!(target_os = "macos") {
            OsType::MacOS
        } else {
            OsType::Linux
        }
    }

    /// Get the OS name as a string (for rule matching)
    pub fn as_str(&self) -> &'static str {
        match self {
            OsType::Windows => "windows",
            OsType::Linux => "linux",
            OsType::MacOS => "osx",
        }
    }

    /// Get the classpath separator for this OS
    pub fn classpath_separator(&self) -> &'static str {
        match self {
            OsType::Windows => ";",
            _ => ":",
        }
    }
}

/// Build the classpath: every applicable non-native library followed by the
/// game jar. Entries are not checked for existence here; preflight owns that.
pub fn build_classpath(
    libraries: &[Library],
    libraries_dir: &Path,
    game_jar: &Path,
    os: OsType,
) -> Result<String> {
    let mut entries: Vec<String> = Vec::new();

    for library in libraries {
        if !library.applies_to(os) || library.is_native() {
            continue;
        }

        let (relative, _) = library.artifact_path()?;
        let full_path = libraries_dir.join(&relative);
        if !full_path.exists() {
            log::debug!("Classpath entry not on disk yet: {:?}", full_path);
        }

        let entry = full_path.to_string_lossy().to_string();
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    entries.push(game_jar.to_string_lossy().to_string());

    Ok(entries.join(os.classpath_separator()))
}

/// Convert Maven coordinates to file path
/// Format: group:artifact:version[:classifier][@extension]
/// Example: "com.google.guava:guava:21.0" -> "com/google/guava/guava/21.0/guava-21.0.jar"
pub fn maven_to_path(coords: &str) -> Result<String> {
    let (coords, extension) = match coords.split_once('@') {
        Some((c, ext)) => (c, ext),
        None => (coords, "jar"),
    };

    let parts: Vec<&str> = coords.split(':').collect();
    if parts.len() < 3 {
        anyhow::bail!("Invalid Maven coordinates: {}", coords);
    }

    let group = parts[0].replace('.', "/");
    let artifact = parts[1];
    let version = parts[2];

    let filename = match parts.get(3) {
        Some(classifier) => format!("{}-{}-{}.{}", artifact, version, classifier, extension),
        None => format!("{}-{}.{}", artifact, version, extension),
    };

    Ok(format!("{}/{}/{}/{}", group, artifact, version, filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maven_to_path_simple() {
        let path = maven_to_path("com.google.guava:guava:21.0").unwrap();
        assert_eq!(path, "com/google/guava/guava/21.0/guava-21.0.jar");
    }

    #[test]
    fn test_maven_to_path_with_classifier() {
        let path = maven_to_path("org.lwjgl:lwjgl:3.3.1:natives-windows").unwrap();
        assert_eq!(
            path,
            "org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1-natives-windows.jar"
        );
    }

    #[test]
    fn test_maven_to_path_with_extension() {
        let path = maven_to_path("de.oceanlabs.mcp:mcp_config:1.20.1@zip").unwrap();
        assert_eq!(
            path,
            "de/oceanlabs/mcp/mcp_config/1.20.1/mcp_config-1.20.1.zip"
        );
    }

    #[test]
    fn test_maven_to_path_invalid() {
        assert!(maven_to_path("not-a-coordinate").is_err());
    }

    #[test]
    fn test_classpath_separator() {
        assert_eq!(OsType::Windows.classpath_separator(), ";");
        assert_eq!(OsType::Linux.classpath_separator(), ":");
        assert_eq!(OsType::MacOS.classpath_separator(), ":");
    }

    #[test]
    fn classpath_skips_natives_and_ends_with_game_jar() {
        let libs = vec![
            Library {
                name: "com.mojang:brigadier:1.1.8".to_string(),
                ..Default::default()
            },
            Library {
                name: "org.lwjgl:lwjgl:3.3.1:natives-linux".to_string(),
                ..Default::default()
            },
            Library {
                name: "com.mojang:brigadier:1.1.8".to_string(),
                ..Default::default()
            },
        ];
        let cp = build_classpath(
            &libs,
            Path::new("/data/libraries"),
            Path::new("/data/versions/1.20.1/1.20.1.jar"),
            OsType::Linux,
        )
        .unwrap();
        let entries: Vec<&str> = cp.split(':').collect();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].ends_with("brigadier-1.1.8.jar"));
        assert!(entries[1].ends_with("1.20.1.jar"));
    }
}
