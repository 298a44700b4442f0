use crate::game::launcher::error::LaunchError;
use std::path::{Path, PathBuf};

/// Check that `java_path` names a runnable Java executable and return the
/// path to spawn. Bare names like `java` are looked up on `PATH`.
pub fn validate_java_path(java_path: &Path) -> Result<PathBuf, LaunchError> {
    if java_path.as_os_str().is_empty() || java_path.to_string_lossy().trim().is_empty() {
        return Err(LaunchError::NoProperJava);
    }

    let resolved = if java_path.exists() {
        java_path.to_path_buf()
    } else {
        match which::which(java_path) {
            Ok(found) => found,
            Err(_) => {
                return Err(LaunchError::InvalidJavaPath {
                    path: java_path.to_path_buf(),
                })
            }
        }
    };

    if !is_executable(&resolved) {
        return Err(LaunchError::JavaNoPermission { path: resolved });
    }

    log::debug!("[launch] Java executable: {:?}", resolved);
    Ok(resolved)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::launcher::error::LaunchErrorKind;
    use tempfile::TempDir;

    #[test]
    fn empty_path_is_no_proper_java() {
        let err = validate_java_path(Path::new("")).unwrap_err();
        assert_eq!(err.kind(), LaunchErrorKind::NoProperJava);
    }

    #[test]
    fn missing_path_is_invalid() {
        let dir = TempDir::new().unwrap();
        let err = validate_java_path(&dir.path().join("bin").join("java")).unwrap_err();
        assert_eq!(err.kind(), LaunchErrorKind::InvalidJavaPath);
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_file_is_no_permission() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let java = dir.path().join("java");
        std::fs::write(&java, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o644)).unwrap();
        let err = validate_java_path(&java).unwrap_err();
        assert_eq!(err.kind(), LaunchErrorKind::JavaNoPermission);

        std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(validate_java_path(&java).unwrap(), java);
    }

    #[cfg(unix)]
    #[test]
    fn bare_name_resolves_on_path() {
        // `sh` stands in for `java`; every unix test host has it
        assert!(validate_java_path(Path::new("sh")).is_ok());
    }
}
