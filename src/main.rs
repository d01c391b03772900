// src/main.rs

use clap::{ArgAction, Parser, Subcommand};
use folder_launcher::app_logic::{
    HandlerError, LauncherCommand, LauncherLogic, OutputFormat, describe_read_error,
};
use folder_launcher::core::{CoreConfigManager, FoldersFileReader};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Lists launch folders and the files they can open
#[derive(Parser)]
#[command(name = "folder_launcher")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reads a Folders.ini file and shows what each folder would launch")]
struct Cli {
    /// Folders file to read instead of the default location
    #[arg(long, global = true)]
    folders_file: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured folders
    Folders,

    /// List the files of a folder that match its extensions
    Files {
        /// Folder name, as written in its [section] header
        folder: String,
    },

    /// Show how a file of a folder would be launched
    Command {
        /// Folder name, as written in its [section] header
        folder: String,

        /// File name, or path relative to the folder
        file: String,
    },
}

impl From<Commands> for LauncherCommand {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Folders => LauncherCommand::ListFolders,
            Commands::Files { folder } => LauncherCommand::ListFiles { folder },
            Commands::Command { folder, file } => {
                LauncherCommand::ShowLaunchCommand { folder, file }
            }
        }
    }
}

fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = TermLogger::init(
        level_for(cli.verbose),
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logger: {e}");
    }
    log::debug!("Main: Starting folder_launcher");

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let reader = match FoldersFileReader::from_current_dir() {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("Unable to determine the current directory: {e}");
            return ExitCode::FAILURE;
        }
    };
    let logic = LauncherLogic::new(
        Arc::new(CoreConfigManager::new()),
        Arc::new(reader),
        cli.folders_file,
    );

    let command = LauncherCommand::from(cli.command);
    let stdout = io::stdout();
    match logic.run(&command, format, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(HandlerError::Read(e)) => {
            // Already includes the file, line and recovery hint.
            eprintln!("{}", describe_read_error(&e));
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("Main: Command failed: {e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
