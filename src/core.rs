/*
 * This module consolidates the platform-agnostic core of the launcher: reading
 * and validating the folders file (`FoldersFileReader`), the resulting `Folder`
 * records and their file listings, resolving launch commands, and locating the
 * folders file on disk. It re-exports the types front ends work with.
 */
pub mod config;
pub mod config_scanner;
pub mod folder;
pub mod folder_profile_builder;
pub mod folders_file_reader;
pub mod launch;
pub mod path_utils;

// Re-export the folder model
pub use folder::{Folder, FolderError, FolderFile, FolderFiles, LaunchPath};

// Re-export reader related items
pub use folders_file_reader::{
    FoldersFileReadError, FoldersFileReader, FoldersFileReaderOperations, ReadErrorKind,
};

pub use launch::{LaunchCommand, LaunchError};
pub use path_utils::{PathExpander, PathExpansionError};

// Re-export config related items
pub use config::{ConfigError, ConfigManagerOperations, CoreConfigManager, FOLDERS_FILE_NAME};
