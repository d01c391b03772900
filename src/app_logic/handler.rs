use crate::core::{
    ConfigError, ConfigManagerOperations, Folder, FolderError, FoldersFileReadError,
    FoldersFileReaderOperations, LaunchCommand, LaunchError,
};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const APP_NAME: &str = "FolderLauncher";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherCommand {
    ListFolders,
    ListFiles { folder: String },
    ShowLaunchCommand { folder: String, file: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug)]
pub enum HandlerError {
    Config(ConfigError),
    Read(FoldersFileReadError),
    UnknownFolder(String),
    FileNotFound { folder: String, file: String },
    Listing { folder: String, source: FolderError },
    Launch(LaunchError),
    Output(io::Error),
    Json(serde_json::Error),
}

impl From<ConfigError> for HandlerError {
    fn from(err: ConfigError) -> Self {
        HandlerError::Config(err)
    }
}

impl From<FoldersFileReadError> for HandlerError {
    fn from(err: FoldersFileReadError) -> Self {
        HandlerError::Read(err)
    }
}

impl From<LaunchError> for HandlerError {
    fn from(err: LaunchError) -> Self {
        HandlerError::Launch(err)
    }
}

impl From<io::Error> for HandlerError {
    fn from(err: io::Error) -> Self {
        HandlerError::Output(err)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::Json(err)
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerError::Config(e) => write!(f, "{e}"),
            HandlerError::Read(e) => write!(f, "{}", describe_read_error(e)),
            HandlerError::UnknownFolder(name) => write!(f, "No folder named '{name}'."),
            HandlerError::FileNotFound { folder, file } => {
                write!(f, "No file '{file}' listed in folder '{folder}'.")
            }
            HandlerError::Listing { folder, source } => {
                write!(f, "Error loading files of folder '{folder}': {source}")
            }
            HandlerError::Launch(e) => write!(f, "{e}"),
            HandlerError::Output(e) => write!(f, "Unable to write output: {e}"),
            HandlerError::Json(e) => write!(f, "Unable to serialize output: {e}"),
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HandlerError::Config(e) => Some(e),
            HandlerError::Read(e) => Some(e),
            HandlerError::Listing { source, .. } => Some(source),
            HandlerError::Launch(e) => Some(e),
            HandlerError::Output(e) => Some(e),
            HandlerError::Json(e) => Some(e),
            _ => None,
        }
    }
}

/*
 * Formats a folders file error the way it is shown to the user: where the
 * problem is, what it is, the offending line, and how to recover.
 */
pub fn describe_read_error(error: &FoldersFileReadError) -> String {
    if error.line_number() == 0 {
        return format!("{}\n{}", error.file_path().display(), error.message());
    }
    format!(
        "{}\nError at line {}: {}\n\n{}\n\nEdit the file and run the command again.",
        error.file_path().display(),
        error.line_number(),
        error.message(),
        error.line()
    )
}

#[derive(Serialize)]
struct FileEntry<'a> {
    name: String,
    path: &'a Path,
}

/*
 * The launcher's application logic, independent of any particular front end.
 * It locates and reads the folders file through its injected dependencies and
 * renders the requested view to a writer.
 */
pub struct LauncherLogic {
    config_manager: Arc<dyn ConfigManagerOperations>,
    reader: Arc<dyn FoldersFileReaderOperations>,
    folders_file_override: Option<PathBuf>,
}

impl LauncherLogic {
    pub fn new(
        config_manager: Arc<dyn ConfigManagerOperations>,
        reader: Arc<dyn FoldersFileReaderOperations>,
        folders_file_override: Option<PathBuf>,
    ) -> Self {
        LauncherLogic {
            config_manager,
            reader,
            folders_file_override,
        }
    }

    pub fn folders_file(&self) -> Result<PathBuf, HandlerError> {
        Ok(self
            .config_manager
            .resolve_folders_file(APP_NAME, self.folders_file_override.as_deref())?)
    }

    pub fn load_folders(&self) -> Result<Vec<Folder>, HandlerError> {
        let path = self.folders_file()?;
        log::debug!("LauncherLogic: Loading folders from {path:?}");
        let folders = self.reader.read(&path).inspect_err(|e| {
            log::error!("LauncherLogic: Failed to read folders file: {e}");
        })?;
        log::info!(
            "LauncherLogic: Loaded {} folder(s) from {path:?}",
            folders.len()
        );
        Ok(folders)
    }

    pub fn run(
        &self,
        command: &LauncherCommand,
        format: OutputFormat,
        out: &mut dyn Write,
    ) -> Result<(), HandlerError> {
        let folders = self.load_folders()?;
        match command {
            LauncherCommand::ListFolders => write_folders(&folders, format, out),
            LauncherCommand::ListFiles { folder } => {
                let folder = find_folder(&folders, folder)?;
                write_files(folder, format, out)
            }
            LauncherCommand::ShowLaunchCommand { folder, file } => {
                let folder = find_folder(&folders, folder)?;
                let launch = launch_command_for(folder, file)?;
                write_launch_command(&launch, format, out)
            }
        }
    }
}

fn find_folder<'a>(folders: &'a [Folder], name: &str) -> Result<&'a Folder, HandlerError> {
    folders
        .iter()
        .find(|folder| folder.name() == name)
        .ok_or_else(|| HandlerError::UnknownFolder(name.to_string()))
}

fn listing_error(folder: &Folder, source: FolderError) -> HandlerError {
    HandlerError::Listing {
        folder: folder.name().to_string(),
        source,
    }
}

/*
 * Finds a listed file by file name, or by path relative to the folder.
 * Only files that pass the folder's extension filter can be launched.
 */
fn launch_command_for(folder: &Folder, file: &str) -> Result<LaunchCommand, HandlerError> {
    let wanted = folder.path().join(file);
    for entry in folder.list_files().map_err(|e| listing_error(folder, e))? {
        let entry = entry.map_err(|e| listing_error(folder, e))?;
        if entry.file_name() == file || entry.path() == wanted {
            return Ok(LaunchCommand::for_file(&entry)?);
        }
    }
    Err(HandlerError::FileNotFound {
        folder: folder.name().to_string(),
        file: file.to_string(),
    })
}

fn write_folders(
    folders: &[Folder],
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<(), HandlerError> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, folders)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            for folder in folders {
                writeln!(out, "{}\t{}", folder.name(), folder.path().display())?;
            }
        }
    }
    Ok(())
}

fn write_files(folder: &Folder, format: OutputFormat, out: &mut dyn Write) -> Result<(), HandlerError> {
    let files = folder
        .list_files()
        .map_err(|e| listing_error(folder, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| listing_error(folder, e))?;

    match format {
        OutputFormat::Json => {
            let entries: Vec<FileEntry> = files
                .iter()
                .map(|file| FileEntry {
                    name: file.file_name(),
                    path: file.path(),
                })
                .collect();
            serde_json::to_writer_pretty(&mut *out, &entries)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            for file in &files {
                writeln!(out, "{}", file.path().display())?;
            }
        }
    }
    Ok(())
}

fn write_launch_command(
    launch: &LaunchCommand,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<(), HandlerError> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, launch)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            writeln!(out, "Executable: {}", launch.executable.display())?;
            writeln!(out, "Parameters: {}", launch.arguments)?;
            writeln!(
                out,
                "Working Directory: {}",
                launch.working_directory.display()
            )?;
        }
    }
    Ok(())
}
