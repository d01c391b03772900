/*
 * Reads the folders file: a section-based `key = value` text file in which each
 * `[name]` section describes one folder to browse and the application used to
 * launch its files.
 *
 * `FoldersFileReader` drives `ConfigLineScanner` over the text, keeps at most one
 * `FolderDraft` open, enforces that folder names are present and unique and
 * emits the finished folders in file order. Reading is all-or-nothing: the
 * first offending line aborts the read with a `FoldersFileReadError` that names
 * the file, the line number, the line text and the reason.
 *
 * All per-read state lives in a `ReadSession` that is created for every call and
 * dropped when it returns, so a reader can be reused freely, including after a
 * failed read.
 */
use super::config_scanner::{ConfigLine, ConfigLineScanner, ScannedLine};
use super::folder::Folder;
use super::folder_profile_builder::FolderDraft;
use super::path_utils::{PathExpander, PathExpansionError};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

const BYTE_ORDER_MARK: char = '\u{feff}';

/*
 * The reason a folders file could not be read.
 * Messages are phrased for display next to the offending line.
 */
#[derive(Debug)]
pub enum ReadErrorKind {
    Io(io::Error),
    Syntax,
    EmptyName,
    EmptyKey,
    DuplicateName(String),
    MissingRequiredField {
        folder: String,
        field: &'static str,
    },
    UnknownKey {
        folder: String,
        key: String,
    },
    EmptyValue {
        folder: String,
        key: String,
    },
    InvalidPath {
        folder: String,
        key: String,
        source: PathExpansionError,
    },
    PlaceholderNotAllowed {
        folder: String,
        key: String,
        placeholder: &'static str,
    },
}

impl std::fmt::Display for ReadErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadErrorKind::Io(e) => write!(f, "Unable to read the folders file: {e}"),
            ReadErrorKind::Syntax => write!(f, "Invalid syntax."),
            ReadErrorKind::EmptyName => write!(f, "Empty folder name."),
            ReadErrorKind::EmptyKey => write!(f, "Empty folder option name."),
            ReadErrorKind::DuplicateName(name) => write!(f, "Duplicate folder name: {name}"),
            ReadErrorKind::MissingRequiredField { folder, field } => {
                write!(f, "Expected '{field} = value' option for folder: {folder}")
            }
            ReadErrorKind::UnknownKey { folder, key } => {
                write!(f, "Unknown folder option '{key}' for folder: {folder}")
            }
            ReadErrorKind::EmptyValue { folder, key } => {
                write!(f, "Option '{key}' cannot be empty for folder: {folder}")
            }
            ReadErrorKind::InvalidPath {
                folder,
                key,
                source,
            } => write!(
                f,
                "Unable to read '{key}' option for folder {folder}: {source}"
            ),
            ReadErrorKind::PlaceholderNotAllowed {
                folder,
                key,
                placeholder,
            } => write!(
                f,
                "Option '{key}' cannot use {placeholder} for folder: {folder}"
            ),
        }
    }
}

/*
 * A failed read, located in the source file.
 * `line_number` is 1-based; it is 0 when the failure happened before any line
 * was read (e.g. the file could not be opened).
 */
#[derive(Debug)]
pub struct FoldersFileReadError {
    file_path: PathBuf,
    line: String,
    line_number: usize,
    kind: ReadErrorKind,
}

impl FoldersFileReadError {
    fn new(file_path: &Path, line: &str, line_number: usize, kind: ReadErrorKind) -> Self {
        FoldersFileReadError {
            file_path: file_path.to_path_buf(),
            line: line.to_string(),
            line_number,
            kind,
        }
    }

    fn io(file_path: &Path, err: io::Error) -> Self {
        FoldersFileReadError::new(file_path, "", 0, ReadErrorKind::Io(err))
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Text of the offending line, without its line ending.
    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn kind(&self) -> &ReadErrorKind {
        &self.kind
    }

    /// The reason alone, without location.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl std::fmt::Display for FoldersFileReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line_number == 0 {
            write!(f, "{}: {}", self.file_path.display(), self.kind)
        } else {
            write!(
                f,
                "{}:{}: {}",
                self.file_path.display(),
                self.line_number,
                self.kind
            )
        }
    }
}

impl std::error::Error for FoldersFileReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ReadErrorKind::Io(e) => Some(e),
            ReadErrorKind::InvalidPath { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FoldersFileReadError>;

/*
 * Defines the operations for reading a folders file.
 * Front ends depend on this trait so they can be exercised against an
 * in-memory implementation.
 */
pub trait FoldersFileReaderOperations: Send + Sync {
    fn read(&self, file_path: &Path) -> Result<Vec<Folder>>;
}

/*
 * The concrete folders file reader.
 * Holds configuration only: the expander that resolves `%VARIABLES%` and
 * relative paths (against the current directory by default).
 */
#[derive(Debug, Clone)]
pub struct FoldersFileReader {
    expander: PathExpander,
}

impl FoldersFileReader {
    pub fn new(expander: PathExpander) -> Self {
        FoldersFileReader { expander }
    }

    /// Reader resolving relative paths against the process' current directory.
    pub fn from_current_dir() -> io::Result<Self> {
        Ok(FoldersFileReader::new(PathExpander::from_current_dir()?))
    }

    /*
     * Reads folders from any byte source. `file_path` is only used to label
     * errors. Invalid UTF-8 is replaced rather than rejected, and a leading
     * byte-order mark is skipped.
     */
    pub fn read_from<R: Read>(&self, mut source: R, file_path: &Path) -> Result<Vec<Folder>> {
        let mut bytes = Vec::new();
        source
            .read_to_end(&mut bytes)
            .map_err(|e| FoldersFileReadError::io(file_path, e))?;
        let text = String::from_utf8_lossy(&bytes);
        let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(&text);
        self.read_str(text, file_path)
    }

    pub fn read_str(&self, text: &str, file_path: &Path) -> Result<Vec<Folder>> {
        log::trace!("FoldersFileReader: Reading folders from {file_path:?}");
        let mut session = ReadSession::new(file_path, &self.expander);
        for scanned in ConfigLineScanner::new(text) {
            session.handle_line(scanned)?;
        }
        let folders = session.finish()?;
        log::debug!(
            "FoldersFileReader: Read {} folder(s) from {file_path:?}.",
            folders.len()
        );
        Ok(folders)
    }
}

impl FoldersFileReaderOperations for FoldersFileReader {
    fn read(&self, file_path: &Path) -> Result<Vec<Folder>> {
        let file = File::open(file_path).map_err(|e| FoldersFileReadError::io(file_path, e))?;
        self.read_from(BufReader::new(file), file_path)
    }
}

/*
 * The draft being filled, with the location of its section header so
 * finalization errors can point at the folder they belong to.
 */
struct OpenDraft {
    draft: FolderDraft,
    header_line: String,
    header_line_number: usize,
}

/*
 * State of one read. `current` is `None` while idle (before the first section
 * or after a blank line) and `Some` while inside a folder section.
 */
struct ReadSession<'a> {
    file_path: &'a Path,
    expander: &'a PathExpander,
    seen_names: HashSet<String>,
    current: Option<OpenDraft>,
    folders: Vec<Folder>,
}

impl<'a> ReadSession<'a> {
    fn new(file_path: &'a Path, expander: &'a PathExpander) -> Self {
        ReadSession {
            file_path,
            expander,
            seen_names: HashSet::new(),
            current: None,
            folders: Vec::new(),
        }
    }

    fn error_at(&self, scanned: &ScannedLine, kind: ReadErrorKind) -> FoldersFileReadError {
        FoldersFileReadError::new(self.file_path, scanned.text, scanned.number, kind)
    }

    fn handle_line(&mut self, scanned: ScannedLine) -> Result<()> {
        match scanned.kind {
            ConfigLine::Blank => self.finalize_current(),
            ConfigLine::Section(name) => {
                self.finalize_current()?;
                self.open_folder(&scanned, name)
            }
            ConfigLine::KeyValue { key, value } => {
                if key.is_empty() {
                    return Err(self.error_at(&scanned, ReadErrorKind::EmptyKey));
                }
                let Some(open) = self.current.as_mut() else {
                    log::debug!(
                        "FoldersFileReader: Ignoring option '{key}' outside of any folder at line {}.",
                        scanned.number
                    );
                    return Ok(());
                };
                if let Err(kind) = open.draft.apply(key, value, self.expander) {
                    return Err(self.error_at(&scanned, kind));
                }
                Ok(())
            }
            ConfigLine::Unknown => Err(self.error_at(&scanned, ReadErrorKind::Syntax)),
        }
    }

    fn open_folder(&mut self, scanned: &ScannedLine, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(self.error_at(scanned, ReadErrorKind::EmptyName));
        }
        if !self.seen_names.insert(name.to_string()) {
            return Err(self.error_at(scanned, ReadErrorKind::DuplicateName(name.to_string())));
        }
        log::trace!(
            "FoldersFileReader: Opening folder '{name}' at line {}.",
            scanned.number
        );
        self.current = Some(OpenDraft {
            draft: FolderDraft::new(name),
            header_line: scanned.text.to_string(),
            header_line_number: scanned.number,
        });
        Ok(())
    }

    fn finalize_current(&mut self) -> Result<()> {
        let Some(open) = self.current.take() else {
            return Ok(());
        };
        match open.draft.finalize(self.expander) {
            Ok(folder) => {
                log::trace!("FoldersFileReader: Finished folder '{}'.", folder.name());
                self.folders.push(folder);
                Ok(())
            }
            Err(kind) => Err(FoldersFileReadError::new(
                self.file_path,
                &open.header_line,
                open.header_line_number,
                kind,
            )),
        }
    }

    fn finish(mut self) -> Result<Vec<Folder>> {
        self.finalize_current()?;
        Ok(self.folders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::folder::LaunchPath;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::tempdir;

    const FILE: &str = "Folders.ini";

    fn reader_in(dir: &Path) -> FoldersFileReader {
        FoldersFileReader::new(PathExpander::new(dir))
    }

    fn read(text: &str) -> Result<Vec<Folder>> {
        reader_in(&std::env::temp_dir()).read_str(text, Path::new(FILE))
    }

    fn expect_error(text: &str) -> FoldersFileReadError {
        match read(text) {
            Ok(folders) => panic!("Expected a read error, got {} folder(s)", folders.len()),
            Err(e) => e,
        }
    }

    #[test]
    fn test_end_to_end_single_folder_with_defaults() {
        // Arrange
        let dir = tempdir().unwrap();
        let reader = reader_in(dir.path());
        let text = "[Retro]\npath = ./roms\nexecutable = ./bin/emu.exe\nextensions = nes\n";

        // Act
        let folders = reader.read_str(text, Path::new(FILE)).unwrap();

        // Assert
        assert_eq!(folders.len(), 1);
        let folder = &folders[0];
        assert_eq!(folder.name(), "Retro");
        assert_eq!(folder.path(), dir.path().join("roms"));
        assert_eq!(
            folder.executable().as_fixed(),
            Some(dir.path().join("bin").join("emu.exe").as_path())
        );
        assert!(folder.path().is_absolute());
        let expected: BTreeSet<String> = [".nes".to_string()].into_iter().collect();
        assert_eq!(folder.extensions(), &expected);
        assert_eq!(folder.parameters(), "\"%FILEPATH%\"");
        assert_eq!(
            folder.working_directory().and_then(LaunchPath::as_fixed),
            Some(dir.path().join("bin").as_path())
        );
    }

    #[test]
    fn test_all_options_are_read() {
        let dir = tempdir().unwrap();
        let reader = reader_in(dir.path());
        let text = "[Arcade]\n\
                    PATH = roms/arcade\n\
                    Executable = emu/mame.exe\n\
                    extensions = zip, .7z , ROM\n\
                    parameters = -skip_gameinfo \"%FILEPATH%\"\n\
                    workingdirectory = emu\n";

        let folders = reader.read_str(text, Path::new(FILE)).unwrap();

        let folder = &folders[0];
        let expected: BTreeSet<String> = [".zip", ".7z", ".ROM"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(folder.extensions(), &expected);
        assert_eq!(folder.parameters(), "-skip_gameinfo \"%FILEPATH%\"");
        assert_eq!(
            folder.working_directory().and_then(LaunchPath::as_fixed),
            Some(dir.path().join("emu").as_path())
        );
    }

    #[test]
    fn test_folders_keep_file_order() {
        let text = "[Zeta]\npath = z\nexecutable = z.exe\n\n\n\
                    [Alpha]\npath = a\nexecutable = a.exe\n\
                    [Mid]\npath = m\nexecutable = m.exe";

        let folders = read(text).unwrap();

        let names: Vec<&str> = folders.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_empty_input_yields_no_folders() {
        assert!(read("").unwrap().is_empty());
        assert!(read("\n   \n\t\n").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let text = "[A]\npath = a\nexecutable = a.exe\n\n[B]\npath = b\nexecutable = b.exe\n\n[A]\n";

        let error = expect_error(text);

        assert!(matches!(error.kind(), ReadErrorKind::DuplicateName(name) if name == "A"));
        assert_eq!(error.line_number(), 9);
        assert_eq!(error.line(), "[A]");
        assert_eq!(error.message(), "Duplicate folder name: A");
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let text = "[a]\npath = a\nexecutable = a.exe\n[A]\npath = a\nexecutable = a.exe";
        assert_eq!(read(text).unwrap().len(), 2);
    }

    #[test]
    fn test_syntax_error_reports_line_number() {
        let text = "[A]\npath = a\nfoo\nexecutable = a.exe";

        let error = expect_error(text);

        assert!(matches!(error.kind(), ReadErrorKind::Syntax));
        assert_eq!(error.line_number(), 3);
        assert_eq!(error.line(), "foo");
        assert_eq!(error.file_path(), Path::new(FILE));
        assert_eq!(error.to_string(), "Folders.ini:3: Invalid syntax.");
    }

    #[test]
    fn test_syntax_error_before_any_section() {
        let error = expect_error("foo");
        assert!(matches!(error.kind(), ReadErrorKind::Syntax));
        assert_eq!(error.line_number(), 1);
    }

    #[test]
    fn test_empty_section_name_is_rejected() {
        let error = expect_error("\n[  ]\npath = a");
        assert!(matches!(error.kind(), ReadErrorKind::EmptyName));
        assert_eq!(error.line_number(), 2);
    }

    #[test]
    fn test_empty_key_is_rejected_even_outside_a_folder() {
        let error = expect_error(" = value\n[A]\npath = a\nexecutable = a.exe");
        assert!(matches!(error.kind(), ReadErrorKind::EmptyKey));
        assert_eq!(error.line_number(), 1);
    }

    #[test]
    fn test_key_value_before_any_section_is_ignored() {
        let text = "path = ignored\nunknown = also ignored\n[A]\npath = a\nexecutable = a.exe";

        let folders = read(text).unwrap();

        assert_eq!(folders.len(), 1);
        assert!(folders[0].path().ends_with("a"));
    }

    #[test]
    fn test_key_value_after_blank_line_is_ignored() {
        // The blank line closes the folder, so the trailing option belongs to none.
        let text = "[A]\npath = a\nexecutable = a.exe\n\nparameters = -x";

        let folders = read(text).unwrap();

        assert_eq!(folders[0].parameters(), "\"%FILEPATH%\"");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let error = expect_error("[A]\npath = a\nemulator = x");
        assert!(matches!(
            error.kind(),
            ReadErrorKind::UnknownKey { key, .. } if key == "emulator"
        ));
        assert_eq!(error.line_number(), 3);
    }

    #[test]
    fn test_missing_executable_points_at_section_header() {
        let text = "[A]\npath = a\n\n[B]\npath = b\nexecutable = b.exe";

        let error = expect_error(text);

        match error.kind() {
            ReadErrorKind::MissingRequiredField { folder, field } => {
                assert_eq!(folder, "A");
                assert_eq!(*field, "executable");
            }
            other => panic!("Expected MissingRequiredField, got {other:?}"),
        }
        assert_eq!(error.line_number(), 1);
        assert_eq!(error.line(), "[A]");
    }

    #[test]
    fn test_missing_path_detected_at_end_of_input() {
        let text = "[A]\npath = a\nexecutable = a.exe\n[B]\nexecutable = b.exe";

        let error = expect_error(text);

        assert!(matches!(
            error.kind(),
            ReadErrorKind::MissingRequiredField { folder, field: "path" } if folder == "B"
        ));
        assert_eq!(error.line_number(), 4);
    }

    #[test]
    fn test_empty_value_is_rejected() {
        let error = expect_error("[A]\npath =\nexecutable = a.exe");
        assert!(matches!(
            error.kind(),
            ReadErrorKind::EmptyValue { key, .. } if key == "path"
        ));
        assert_eq!(error.line_number(), 2);
    }

    #[test]
    fn test_environment_variables_are_expanded() {
        let dir = tempdir().unwrap();
        let variable = format!("FOLDER_LAUNCHER_GAMES_{}", rand::random::<u64>());
        let games = dir.path().join("games");
        let reader = FoldersFileReader::new(
            PathExpander::new(dir.path()).with_variable(variable.clone(), games.to_string_lossy()),
        );
        let text = format!("[A]\npath = %{variable}%/nes\nexecutable = %{variable}%/../emu.exe");

        let folders = reader.read_str(&text, Path::new(FILE)).unwrap();

        assert_eq!(folders[0].path(), games.join("nes"));
        assert_eq!(
            folders[0].executable().as_fixed(),
            Some(dir.path().join("emu.exe").as_path())
        );
    }

    #[test]
    fn test_read_from_file_handles_bom_and_crlf() -> std::result::Result<(), Box<dyn std::error::Error>> {
        // Arrange
        let dir = tempdir()?;
        let file_path = dir.path().join(FILE);
        fs::write(
            &file_path,
            "\u{feff}[Retro]\r\npath = roms\r\nexecutable = emu.exe\r\n",
        )?;
        let reader = reader_in(dir.path());

        // Act
        let folders = reader.read(&file_path)?;

        // Assert
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].name(), "Retro");
        assert_eq!(
            folders[0].executable().as_fixed(),
            Some(dir.path().join("emu.exe").as_path())
        );
        Ok(())
    }

    #[test]
    fn test_read_from_tolerates_invalid_utf8() {
        let bytes: &[u8] = b"[Retro \xE9]\npath = roms\nexecutable = emu.exe\n";
        let folders = reader_in(&std::env::temp_dir())
            .read_from(bytes, Path::new(FILE))
            .unwrap();
        assert_eq!(folders[0].name(), "Retro \u{fffd}");
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.ini");

        let error = reader_in(dir.path()).read(&missing).unwrap_err();

        assert!(matches!(error.kind(), ReadErrorKind::Io(e) if e.kind() == io::ErrorKind::NotFound));
        assert_eq!(error.line_number(), 0);
        assert_eq!(error.file_path(), missing);
    }

    #[test]
    fn test_reader_is_reusable_after_failure() {
        let reader = reader_in(&std::env::temp_dir());
        let text = "[A]\npath = a\nexecutable = a.exe";

        assert!(reader.read_str("[A]\nfoo", Path::new(FILE)).is_err());
        let first = reader.read_str(text, Path::new(FILE)).unwrap();
        let second = reader.read_str(text, Path::new(FILE)).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_folder_of_directly_runnable_files() {
        // Arrange
        let dir = tempdir().unwrap();
        let reader = reader_in(dir.path());
        let text = "[PC]\npath = games\nexecutable = %FILEPATH%\n";

        // Act
        let folders = reader.read_str(text, Path::new(FILE)).unwrap();

        // Assert
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].path(), dir.path().join("games"));
        assert!(matches!(
            folders[0].executable(),
            LaunchPath::PerFile { template, .. } if template == "%FILEPATH%"
        ));
        assert_eq!(folders[0].working_directory(), None);
    }

    #[test]
    fn test_filepath_in_folder_path_is_rejected() {
        let error = expect_error("[PC]\npath = %FILEPATH%\nexecutable = run.exe");

        assert!(matches!(
            error.kind(),
            ReadErrorKind::PlaceholderNotAllowed { key, placeholder: "%FILEPATH%", .. } if key == "path"
        ));
        assert_eq!(error.line_number(), 2);
    }
}
