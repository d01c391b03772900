/*
 * Locates the folders file for the application.
 *
 * A path given explicitly by the caller always wins. Otherwise a `Folders.ini`
 * placed next to the running executable is used (portable installs keep their
 * configuration beside the program), and failing that the file lives in the
 * user's local configuration directory as determined by `path_utils`.
 *
 * It uses a trait-based approach (`ConfigManagerOperations`) so front ends can
 * be tested against fixed locations. The concrete implementation
 * (`CoreConfigManager`) queries the running executable and the platform
 * directories.
 */
use crate::core::path_utils;
use std::path::{Path, PathBuf};

pub const FOLDERS_FILE_NAME: &str = "Folders.ini";

#[derive(Debug)]
pub enum ConfigError {
    NoProjectDirectory,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoProjectDirectory => {
                write!(f, "Could not determine a configuration directory for the folders file")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

pub type Result<T> = std::result::Result<T, ConfigError>;

pub trait ConfigManagerOperations: Send + Sync {
    fn resolve_folders_file(&self, app_name: &str, explicit: Option<&Path>) -> Result<PathBuf>;
}

/*
 * Applies the lookup order given the candidate directories.
 * `portable_dir` is only used when it already contains the folders file.
 */
fn choose_folders_file(
    explicit: Option<&Path>,
    portable_dir: Option<&Path>,
    config_dir: impl FnOnce() -> Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        log::debug!("CoreConfigManager: Using folders file given by the caller: {path:?}");
        return Ok(path.to_path_buf());
    }

    if let Some(dir) = portable_dir {
        let candidate = dir.join(FOLDERS_FILE_NAME);
        if candidate.is_file() {
            log::debug!("CoreConfigManager: Using portable folders file {candidate:?}");
            return Ok(candidate);
        }
        log::trace!("CoreConfigManager: No portable folders file at {candidate:?}");
    }

    let dir = config_dir().ok_or(ConfigError::NoProjectDirectory)?;
    let candidate = dir.join(FOLDERS_FILE_NAME);
    log::debug!("CoreConfigManager: Using folders file in config directory: {candidate:?}");
    Ok(candidate)
}

pub struct CoreConfigManager {}

impl CoreConfigManager {
    pub fn new() -> Self {
        CoreConfigManager {}
    }
}

impl Default for CoreConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManagerOperations for CoreConfigManager {
    fn resolve_folders_file(&self, app_name: &str, explicit: Option<&Path>) -> Result<PathBuf> {
        log::trace!("CoreConfigManager: Resolving folders file for app '{app_name}'");
        let executable_dir = match std::env::current_exe() {
            Ok(exe) => exe.parent().map(Path::to_path_buf),
            Err(e) => {
                log::warn!("CoreConfigManager: Unable to locate the running executable: {e}");
                None
            }
        };
        choose_folders_file(explicit, executable_dir.as_deref(), || {
            path_utils::get_base_app_config_local_dir(app_name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    // Test helper standing in for CoreConfigManager with fixed directories.
    struct TestConfigManager {
        portable_dir: PathBuf,
        config_dir: Option<PathBuf>,
    }

    impl ConfigManagerOperations for TestConfigManager {
        fn resolve_folders_file(
            &self,
            _app_name: &str,
            explicit: Option<&Path>,
        ) -> Result<PathBuf> {
            choose_folders_file(explicit, Some(&self.portable_dir), || {
                self.config_dir.clone()
            })
        }
    }

    #[test]
    fn test_explicit_path_wins() {
        // Arrange
        let portable = tempdir().unwrap();
        fs::write(portable.path().join(FOLDERS_FILE_NAME), "").unwrap();
        let manager = TestConfigManager {
            portable_dir: portable.path().to_path_buf(),
            config_dir: None,
        };
        let explicit = PathBuf::from("/somewhere/else.ini");

        // Act
        let resolved = manager.resolve_folders_file("AnyApp", Some(&explicit)).unwrap();

        // Assert
        assert_eq!(resolved, explicit);
    }

    #[test]
    fn test_portable_file_is_preferred_when_present() {
        let portable = tempdir().unwrap();
        let config = tempdir().unwrap();
        fs::write(portable.path().join(FOLDERS_FILE_NAME), "").unwrap();
        let manager = TestConfigManager {
            portable_dir: portable.path().to_path_buf(),
            config_dir: Some(config.path().to_path_buf()),
        };

        let resolved = manager.resolve_folders_file("AnyApp", None).unwrap();

        assert_eq!(resolved, portable.path().join(FOLDERS_FILE_NAME));
    }

    #[test]
    fn test_config_dir_used_without_portable_file() {
        let portable = tempdir().unwrap();
        let config = tempdir().unwrap();
        let manager = TestConfigManager {
            portable_dir: portable.path().to_path_buf(),
            config_dir: Some(config.path().to_path_buf()),
        };

        let resolved = manager.resolve_folders_file("AnyApp", None).unwrap();

        assert_eq!(resolved, config.path().join(FOLDERS_FILE_NAME));
    }

    #[test]
    fn test_no_config_dir_is_an_error() {
        let portable = tempdir().unwrap();
        let manager = TestConfigManager {
            portable_dir: portable.path().to_path_buf(),
            config_dir: None,
        };

        let result = manager.resolve_folders_file("AnyApp", None);

        assert!(matches!(result, Err(ConfigError::NoProjectDirectory)));
    }

    #[test]
    fn test_core_config_manager_honours_explicit_path() {
        let manager = CoreConfigManager::new();
        let explicit = PathBuf::from("custom/Folders.ini");
        let resolved = manager.resolve_folders_file("AnyApp", Some(&explicit)).unwrap();
        assert_eq!(resolved, explicit);
    }
}
