/*
 * Resolves how a file would be launched: which executable, with which argument
 * string, from which working directory. Nothing is spawned here.
 *
 * `%FOLDERPATH%` is already resolved when a folder is read, so per-file work
 * is limited to `%FILEPATH%`: it becomes the file's absolute path in
 * `parameters` and in any executable or working directory template, which are
 * then made absolute. Without a working directory, the directory of the
 * resolved executable is used.
 */
use super::folder::{FILEPATH_PLACEHOLDER, FOLDERPATH_PLACEHOLDER, FolderFile, LaunchPath};
use super::path_utils::PathExpansionError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug)]
pub enum LaunchError {
    InvalidPath {
        file: PathBuf,
        key: &'static str,
        source: PathExpansionError,
    },
}

impl std::fmt::Display for LaunchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchError::InvalidPath { file, key, source } => {
                write!(f, "Unable to resolve '{key}' for {file:?}: {source}")
            }
        }
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaunchError::InvalidPath { source, .. } => Some(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, LaunchError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchCommand {
    pub executable: PathBuf,
    // Passed to the program as a single raw command-line string.
    pub arguments: String,
    pub working_directory: PathBuf,
}

fn resolve_for(path: &LaunchPath, file_path: &Path, key: &'static str) -> Result<PathBuf> {
    path.resolve(file_path).map_err(|source| LaunchError::InvalidPath {
        file: file_path.to_path_buf(),
        key,
        source,
    })
}

impl LaunchCommand {
    pub fn for_file(file: &FolderFile<'_>) -> Result<LaunchCommand> {
        let folder = file.folder();
        let file_path = file.path();
        let arguments = folder
            .parameters()
            .replace(FILEPATH_PLACEHOLDER, &file_path.to_string_lossy())
            .replace(FOLDERPATH_PLACEHOLDER, &folder.path().to_string_lossy());

        let executable = resolve_for(folder.executable(), file_path, "executable")?;
        let working_directory = match folder.working_directory() {
            Some(working_directory) => {
                resolve_for(working_directory, file_path, "workingdirectory")?
            }
            None => executable
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| executable.clone()),
        };

        let command = LaunchCommand {
            executable,
            arguments,
            working_directory,
        };
        log::debug!(
            "LaunchCommand: Resolved {:?} for folder '{}': {:?}",
            file_path,
            folder.name(),
            command
        );
        Ok(command)
    }

    /*
     * Builds a `Command` ready to be spawned by the caller. Arguments are split
     * on whitespace, honouring double quotes, the way a Windows command line
     * is usually tokenized.
     */
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .args(split_arguments(&self.arguments))
            .current_dir(&self.working_directory);
        command
    }
}

/*
 * Splits a command-line string into arguments. Double quotes group text
 * containing whitespace and are removed; there is no escape character.
 */
pub fn split_arguments(arguments: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in arguments.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    result.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        result.push(current);
    }
    result
}
