/*
 * This module defines the validated launch profile (`Folder`) produced by the
 * folders file reader, and the on-demand listing of the files it launches.
 *
 * Listing is non-recursive and lazy: `Folder::list_files` checks the directory
 * and returns a `FolderFiles` iterator that walks it with `walkdir`, keeping only
 * regular files whose extension is in the folder's extension set. Every call
 * re-queries the filesystem.
 */
use super::path_utils::{self, PathExpansionError};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/*
 * Errors raised while listing a folder's files.
 * These are reported whole to the caller, one folder at a time.
 */
#[derive(Debug)]
pub enum FolderError {
    Io { path: PathBuf, source: io::Error },
    Walk(walkdir::Error),
    NotADirectory(PathBuf),
}

impl From<walkdir::Error> for FolderError {
    fn from(err: walkdir::Error) -> Self {
        FolderError::Walk(err)
    }
}

impl std::fmt::Display for FolderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FolderError::Io { path, source } => write!(f, "Unable to read {path:?}: {source}"),
            FolderError::Walk(e) => write!(f, "Directory listing error: {e}"),
            FolderError::NotADirectory(p) => write!(f, "Not a directory: {p:?}"),
        }
    }
}

impl std::error::Error for FolderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FolderError::Io { source, .. } => Some(source),
            FolderError::Walk(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FolderError>;

pub const FILEPATH_PLACEHOLDER: &str = "%FILEPATH%";
pub const FOLDERPATH_PLACEHOLDER: &str = "%FOLDERPATH%";

/*
 * Parameters used when a folder does not specify any: the file path, quoted so
 * paths with spaces reach the application as a single argument.
 */
pub fn default_parameters() -> String {
    format!("\"{FILEPATH_PLACEHOLDER}\"")
}

/*
 * Where an `executable` or `workingdirectory` points.
 * Most values are known once the folder is read. A value referring to
 * `%FILEPATH%` is kept as a template, with `%FOLDERPATH%` already replaced,
 * and made absolute against `base_dir` for each launched file.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchPath {
    Fixed(PathBuf),
    PerFile { template: String, base_dir: PathBuf },
}

impl LaunchPath {
    /// The path, when it does not depend on the launched file.
    pub fn as_fixed(&self) -> Option<&Path> {
        match self {
            LaunchPath::Fixed(path) => Some(path),
            LaunchPath::PerFile { .. } => None,
        }
    }

    pub fn resolve(&self, file_path: &Path) -> std::result::Result<PathBuf, PathExpansionError> {
        match self {
            LaunchPath::Fixed(path) => Ok(path.clone()),
            LaunchPath::PerFile { template, base_dir } => {
                let substituted =
                    template.replace(FILEPATH_PLACEHOLDER, &file_path.to_string_lossy());
                path_utils::absolute_path_in(base_dir, &substituted)
            }
        }
    }
}

// Serialized as the path, or as the template text for per-file values.
impl Serialize for LaunchPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            LaunchPath::Fixed(path) => path.serialize(serializer),
            LaunchPath::PerFile { template, .. } => serializer.serialize_str(template),
        }
    }
}

/*
 * One validated launch profile from the folders file.
 * Immutable once built; only the reader constructs it, after applying
 * defaults, so every field is always populated.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Folder {
    name: String,
    path: PathBuf,
    executable: LaunchPath,
    extensions: BTreeSet<String>,
    parameters: String,
    working_directory: Option<LaunchPath>,
}

impl Folder {
    pub(crate) fn new(
        name: String,
        path: PathBuf,
        executable: LaunchPath,
        extensions: BTreeSet<String>,
        parameters: String,
        working_directory: Option<LaunchPath>,
    ) -> Self {
        Folder {
            name,
            path,
            executable,
            extensions,
            parameters,
            working_directory,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn executable(&self) -> &LaunchPath {
        &self.executable
    }

    /// Normalized extensions, each starting with `.`. Empty means no filter.
    pub fn extensions(&self) -> &BTreeSet<String> {
        &self.extensions
    }

    pub fn parameters(&self) -> &str {
        &self.parameters
    }

    /*
     * `None` only when the executable depends on the launched file and no
     * working directory was given: the executable's directory is then used,
     * once it is resolved.
     */
    pub fn working_directory(&self) -> Option<&LaunchPath> {
        self.working_directory.as_ref()
    }

    /*
     * Decides whether a file belongs in this folder's listing based on its
     * extension (see `dotted_extension`). Comparison is case-insensitive on
     * platforms whose default filesystems are.
     */
    pub fn matches_extension(&self, file_path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let Some(file_name) = file_path.file_name() else {
            return false;
        };
        let file_name = file_name.to_string_lossy();
        let Some(dotted) = dotted_extension(&file_name) else {
            return false;
        };
        if cfg!(any(windows, target_os = "macos")) {
            self.extensions
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(dotted))
        } else {
            self.extensions.contains(dotted)
        }
    }

    /*
     * Lists the files of this folder, non-recursively.
     * Fails immediately when `path` is missing or not a directory; later I/O
     * errors are yielded as `Err` items by the returned iterator.
     */
    pub fn list_files(&self) -> Result<FolderFiles<'_>> {
        let metadata = fs::metadata(&self.path).map_err(|source| FolderError::Io {
            path: self.path.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(FolderError::NotADirectory(self.path.clone()));
        }
        log::debug!(
            "Folder: Listing files of '{}' in {:?} (extensions: {:?})",
            self.name,
            self.path,
            self.extensions
        );

        let walker = WalkDir::new(&self.path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .into_iter();
        Ok(FolderFiles {
            folder: self,
            walker,
        })
    }
}

/*
 * The text from the last `.` of a file name, dot included, so a name such as
 * `.nes` has the extension `.nes`. A trailing `.` is no extension.
 */
fn dotted_extension(file_name: &str) -> Option<&str> {
    let dot = file_name.rfind('.')?;
    let extension = &file_name[dot..];
    (extension.len() > 1).then_some(extension)
}

/*
 * A file found in a folder's directory.
 * Holds a borrowed back-reference to its folder for lookups (launching needs
 * the executable and parameters) and the absolute file path.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderFile<'a> {
    folder: &'a Folder,
    path: PathBuf,
}

impl<'a> FolderFile<'a> {
    pub fn folder(&self) -> &'a Folder {
        self.folder
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/*
 * Lazy, finite, non-restartable sequence of the files in one folder.
 * Order follows the directory listing.
 */
pub struct FolderFiles<'a> {
    folder: &'a Folder,
    walker: walkdir::IntoIter,
}

impl<'a> Iterator for FolderFiles<'a> {
    type Item = Result<FolderFile<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(FolderError::from(e))),
            };

            let file_type = entry.file_type();
            let is_file = file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }
            if !self.folder.matches_extension(entry.path()) {
                log::trace!("Folder: Skipping {:?}, extension not listed.", entry.path());
                continue;
            }

            return Some(Ok(FolderFile {
                folder: self.folder,
                path: entry.into_path(),
            }));
        }
    }
}
