/*
 * This module provides utility functions for path manipulation. It covers the
 * two path concerns of the launcher: expanding `%NAME%` environment variable
 * references found in the folders file and turning the result into an absolute,
 * lexically normalized path, plus locating the application's per-user local
 * configuration directory.
 */
use directories::ProjectDirs;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/*
 * Errors produced while expanding and normalizing a path value.
 * These never touch the filesystem; they describe values that cannot be a path
 * at all.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathExpansionError {
    Empty,
    InvalidCharacter { path: String, character: char },
}

impl std::fmt::Display for PathExpansionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathExpansionError::Empty => write!(f, "The path is empty after expansion."),
            PathExpansionError::InvalidCharacter { path, character } => {
                write!(f, "Illegal character {character:?} in path: {path}")
            }
        }
    }
}

impl std::error::Error for PathExpansionError {}

pub type Result<T> = std::result::Result<T, PathExpansionError>;

#[cfg(windows)]
const INVALID_PATH_CHARS: &[char] = &['\0', '<', '>', '"', '|', '?', '*'];
#[cfg(not(windows))]
const INVALID_PATH_CHARS: &[char] = &['\0'];

// Launch placeholders; never looked up, so they reach launch resolution intact.
const RESERVED_VARIABLES: &[&str] = &["FILEPATH", "FOLDERPATH"];

/*
 * Expands environment variable references and resolves paths against a base
 * directory.
 *
 * Variables are written `%NAME%`. Lookups consult the explicit overrides first
 * and then the process environment. References to undefined variables are left
 * in place verbatim. `%FILEPATH%` and `%FOLDERPATH%` are reserved and always
 * left in place, even if the environment defines them, so they can be
 * substituted later for the folder and file being launched.
 */
#[derive(Debug, Clone)]
pub struct PathExpander {
    base_dir: PathBuf,
    variables: HashMap<String, String>,
}

impl PathExpander {
    /*
     * Creates an expander resolving relative paths against `base_dir`.
     * A relative `base_dir` is itself anchored at the current directory when
     * one is available.
     */
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let base_dir = if base_dir.is_absolute() {
            normalize_lexically(&base_dir)
        } else {
            match std::env::current_dir() {
                Ok(cwd) => normalize_lexically(&cwd.join(&base_dir)),
                Err(e) => {
                    log::warn!(
                        "PathExpander: Could not anchor relative base dir {base_dir:?}: {e}"
                    );
                    base_dir
                }
            }
        };
        PathExpander {
            base_dir,
            variables: HashMap::new(),
        }
    }

    pub fn from_current_dir() -> io::Result<Self> {
        Ok(PathExpander::new(std::env::current_dir()?))
    }

    /// Adds a variable that takes precedence over the process environment.
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn lookup(&self, name: &str) -> Option<String> {
        if RESERVED_VARIABLES.contains(&name) || name.contains(['=', '\0']) {
            return None;
        }
        if let Some(value) = self.variables.get(name) {
            return Some(value.clone());
        }
        std::env::var(name).ok()
    }

    /*
     * Replaces every `%NAME%` whose variable is defined with its value.
     * When a reference is undefined its opening `%` is kept and scanning resumes
     * at the closing `%`, which may itself open the next reference
     * (`%UNDEFINED%HOME%` expands the `%HOME%` part).
     */
    pub fn expand_variables(&self, value: &str) -> String {
        let mut expanded = String::with_capacity(value.len());
        let mut rest = value;

        while let Some(start) = rest.find('%') {
            expanded.push_str(&rest[..start]);
            let after_open = &rest[start + 1..];
            let Some(end) = after_open.find('%') else {
                expanded.push_str(&rest[start..]);
                rest = "";
                break;
            };

            let name = &after_open[..end];
            let resolved = if name.is_empty() {
                None
            } else {
                self.lookup(name)
            };
            match resolved {
                Some(variable_value) => {
                    expanded.push_str(&variable_value);
                    rest = &after_open[end + 1..];
                }
                None => {
                    expanded.push('%');
                    rest = after_open;
                }
            }
        }
        expanded.push_str(rest);
        expanded
    }

    /*
     * Expands variables in `value` and converts the result to an absolute,
     * normalized path. Relative results are joined onto the base directory.
     * `.` and `..` components are resolved lexically; the path does not need to
     * exist.
     */
    pub fn to_absolute_expanded_path(&self, value: &str) -> Result<PathBuf> {
        let expanded = self.expand_variables(value);
        self.to_absolute_path(&expanded)
    }

    /*
     * Converts an already expanded value to an absolute, normalized path,
     * for values that must not go through a second round of expansion.
     */
    pub fn to_absolute_path(&self, value: &str) -> Result<PathBuf> {
        absolute_path_in(&self.base_dir, value)
    }
}

/*
 * Converts an expanded value to an absolute, normalized path, joining relative
 * values onto `base_dir`. Rejects empty values and characters no path may hold.
 */
pub fn absolute_path_in(base_dir: &Path, value: &str) -> Result<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PathExpansionError::Empty);
    }
    if let Some(character) = trimmed.chars().find(|c| INVALID_PATH_CHARS.contains(c)) {
        return Err(PathExpansionError::InvalidCharacter {
            path: trimmed.to_string(),
            character,
        });
    }

    let candidate = Path::new(trimmed);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base_dir.join(candidate)
    };
    let normalized = normalize_lexically(&joined);
    log::trace!("PathExpander: Resolved '{value}' to {normalized:?}");
    Ok(normalized)
}

/*
 * Resolves `.` and `..` components without consulting the filesystem.
 * `..` never climbs above the root or prefix.
 */
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push(component.as_os_str());
                }
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/*
 * Retrieves the application's primary local configuration directory.
 * This function determines the platform-specific path for local (non-roaming)
 * application configuration data and ensures the directory exists, creating it
 * if necessary.
 *
 * Returns `None` if the directory could not be determined or created.
 */
pub fn get_base_app_config_local_dir(app_name: &str) -> Option<PathBuf> {
    log::trace!("PathUtils: Attempting to get base app config local dir for '{app_name}'");
    ProjectDirs::from("", "", app_name).and_then(|proj_dirs| {
        let config_path = proj_dirs.config_local_dir();
        if !config_path.exists() {
            if let Err(e) = fs::create_dir_all(config_path) {
                log::error!(
                    "PathUtils: Failed to create base app config directory {config_path:?}: {e}"
                );
                return None;
            }
            log::debug!("PathUtils: Created base app config directory: {config_path:?}");
        } else {
            log::trace!("PathUtils: Base app config directory already exists: {config_path:?}");
        }
        Some(config_path.to_path_buf())
    })
}
