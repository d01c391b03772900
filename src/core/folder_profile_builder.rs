/*
 * The in-progress form of a folder while its section is being read.
 *
 * `FolderDraft` mirrors `Folder` with every field optional. The reader opens a
 * draft on each section header, routes that section's `key = value` lines to
 * `apply`, and calls `finalize` when the section ends. Errors are returned as
 * `ReadErrorKind` values; the reader attaches the file, line and line number.
 *
 * `executable` and `workingdirectory` may refer to `%FOLDERPATH%` and
 * `%FILEPATH%`. Since `path` can appear after them, they are kept in expanded
 * text form (already checked to be valid paths) and resolved during
 * finalization: to a fixed path, or to a per-file template when they use
 * `%FILEPATH%`.
 */
use super::folder::{
    FILEPATH_PLACEHOLDER, FOLDERPATH_PLACEHOLDER, Folder, LaunchPath, default_parameters,
};
use super::folders_file_reader::ReadErrorKind;
use super::path_utils::{PathExpander, PathExpansionError};
use std::collections::BTreeSet;
use std::path::PathBuf;

pub const KEY_PATH: &str = "path";
pub const KEY_EXECUTABLE: &str = "executable";
pub const KEY_EXTENSIONS: &str = "extensions";
pub const KEY_PARAMETERS: &str = "parameters";
pub const KEY_WORKING_DIRECTORY: &str = "workingdirectory";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderDraft {
    name: String,
    path: Option<PathBuf>,
    executable: Option<String>,
    extensions: Option<BTreeSet<String>>,
    parameters: Option<String>,
    working_directory: Option<String>,
}

impl FolderDraft {
    pub fn new(name: impl Into<String>) -> Self {
        FolderDraft {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /*
     * Applies one `key = value` line to the draft.
     * Keys are matched case-insensitively; a key given twice in one section
     * keeps the last value.
     */
    pub fn apply(
        &mut self,
        key: &str,
        value: &str,
        expander: &PathExpander,
    ) -> Result<(), ReadErrorKind> {
        let normalized_key = key.to_lowercase();
        let already_set = match normalized_key.as_str() {
            KEY_PATH => {
                let path = self.read_folder_path(value, expander)?;
                self.path.replace(path).is_some()
            }
            KEY_EXECUTABLE => {
                let executable = self.read_launch_path(KEY_EXECUTABLE, value, expander)?;
                self.executable.replace(executable).is_some()
            }
            KEY_EXTENSIONS => {
                let extensions = self.read_extensions(value)?;
                self.extensions.replace(extensions).is_some()
            }
            KEY_PARAMETERS => self.parameters.replace(value.to_string()).is_some(),
            KEY_WORKING_DIRECTORY => {
                let working_directory =
                    self.read_launch_path(KEY_WORKING_DIRECTORY, value, expander)?;
                self.working_directory.replace(working_directory).is_some()
            }
            _ => {
                return Err(ReadErrorKind::UnknownKey {
                    folder: self.name.clone(),
                    key: key.to_string(),
                });
            }
        };

        if already_set {
            log::warn!(
                "FolderDraft: Option '{normalized_key}' given more than once for folder '{}'; the last value wins.",
                self.name
            );
        }
        Ok(())
    }

    fn read_folder_path(&self, value: &str, expander: &PathExpander) -> Result<PathBuf, ReadErrorKind> {
        if value.is_empty() {
            return Err(self.empty_value(KEY_PATH));
        }
        let path = expander
            .to_absolute_expanded_path(value)
            .map_err(|source| self.invalid_path(KEY_PATH, source))?;
        let text = path.to_string_lossy();
        self.reject_placeholder(KEY_PATH, &text, FILEPATH_PLACEHOLDER)?;
        self.reject_placeholder(KEY_PATH, &text, FOLDERPATH_PLACEHOLDER)?;
        Ok(path)
    }

    /*
     * Expands and validates an `executable` or `workingdirectory` value.
     * The returned text still contains its placeholders; validation stands the
     * base directory in for them so malformed values fail on their own line.
     */
    fn read_launch_path(
        &self,
        key: &str,
        value: &str,
        expander: &PathExpander,
    ) -> Result<String, ReadErrorKind> {
        if value.is_empty() {
            return Err(self.empty_value(key));
        }
        let expanded = expander.expand_variables(value);
        let base_dir = expander.base_dir().to_string_lossy();
        let probe = expanded
            .replace(FILEPATH_PLACEHOLDER, &base_dir)
            .replace(FOLDERPATH_PLACEHOLDER, &base_dir);
        expander
            .to_absolute_path(&probe)
            .map_err(|source| self.invalid_path(key, source))?;
        Ok(expanded)
    }

    fn reject_placeholder(
        &self,
        key: &str,
        expanded: &str,
        placeholder: &'static str,
    ) -> Result<(), ReadErrorKind> {
        if expanded.contains(placeholder) {
            return Err(ReadErrorKind::PlaceholderNotAllowed {
                folder: self.name.clone(),
                key: key.to_string(),
                placeholder,
            });
        }
        Ok(())
    }

    /*
     * Splits a comma separated list, trims each entry and adds the leading dot
     * where missing. Case is preserved and duplicates collapse.
     */
    fn read_extensions(&self, value: &str) -> Result<BTreeSet<String>, ReadErrorKind> {
        let extensions: BTreeSet<String> = value
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| {
                if token.starts_with('.') {
                    token.to_string()
                } else {
                    format!(".{token}")
                }
            })
            .collect();

        if extensions.is_empty() {
            return Err(self.empty_value(KEY_EXTENSIONS));
        }
        Ok(extensions)
    }

    fn empty_value(&self, key: &str) -> ReadErrorKind {
        ReadErrorKind::EmptyValue {
            folder: self.name.clone(),
            key: key.to_string(),
        }
    }

    fn invalid_path(&self, key: &str, source: PathExpansionError) -> ReadErrorKind {
        ReadErrorKind::InvalidPath {
            folder: self.name.clone(),
            key: key.to_string(),
            source,
        }
    }

    /*
     * Validates required options and applies defaults, producing the immutable
     * folder. `%FOLDERPATH%` is replaced with the folder path in `executable`
     * and `workingdirectory`; values without `%FILEPATH%` are then made
     * absolute, the others become per-file templates. `parameters` defaults to
     * the quoted file path placeholder and `workingdirectory` to the directory
     * containing the executable.
     */
    pub fn finalize(self, expander: &PathExpander) -> Result<Folder, ReadErrorKind> {
        let Some(path) = self.path.clone() else {
            return Err(self.missing(KEY_PATH));
        };
        let Some(executable) = self.executable.as_deref() else {
            return Err(self.missing(KEY_EXECUTABLE));
        };

        let folder_path = path.to_string_lossy();
        let resolve = |key: &str, value: &str| -> Result<LaunchPath, ReadErrorKind> {
            let value = value.replace(FOLDERPATH_PLACEHOLDER, &folder_path);
            if value.contains(FILEPATH_PLACEHOLDER) {
                return Ok(LaunchPath::PerFile {
                    template: value,
                    base_dir: expander.base_dir().to_path_buf(),
                });
            }
            expander
                .to_absolute_path(&value)
                .map(LaunchPath::Fixed)
                .map_err(|source| self.invalid_path(key, source))
        };

        let executable = resolve(KEY_EXECUTABLE, executable)?;
        let working_directory = match self.working_directory.as_deref() {
            Some(value) => Some(resolve(KEY_WORKING_DIRECTORY, value)?),
            None => executable.as_fixed().map(|executable| {
                LaunchPath::Fixed(
                    executable
                        .parent()
                        .map(PathBuf::from)
                        .unwrap_or_else(|| executable.to_path_buf()),
                )
            }),
        };
        let FolderDraft {
            name,
            extensions,
            parameters,
            ..
        } = self;

        Ok(Folder::new(
            name,
            path,
            executable,
            extensions.unwrap_or_default(),
            parameters.unwrap_or_else(default_parameters),
            working_directory,
        ))
    }

    fn missing(&self, field: &'static str) -> ReadErrorKind {
        ReadErrorKind::MissingRequiredField {
            folder: self.name.clone(),
            field,
        }
    }
}
