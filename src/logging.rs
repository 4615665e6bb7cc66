//! Diagnostic logging initialization.
//!
//! Session output (the job log) goes through `SessionEvent`s; this module only
//! wires the `log` facade used for diagnostics. While the TUI owns the terminal
//! diagnostics go to a file.

use std::fs::File;
use std::path::PathBuf;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Destination for log output.
pub enum LogDestination {
    /// Write to this file, truncating it.
    File(PathBuf),
    /// Write to stderr.
    Terminal,
    /// Keep diagnostics off entirely.
    #[cfg_attr(not(feature = "tui"), allow(dead_code))]
    Discard,
}

/// Initialize the global logger. Safe to call more than once; later calls no-op.
pub fn initialize(destination: LogDestination, verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::File(path) => match create_file_logger(path, level, config) {
            Some(file_logger) => vec![file_logger],
            None => return,
        },
        LogDestination::Terminal => vec![TermLogger::new(
            level,
            config,
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )],
        LogDestination::Discard => return,
    };

    let _ = CombinedLogger::init(loggers);
}

/// `<cache dir>/vote-console/vote-console.log`, creating the directory.
#[cfg_attr(not(feature = "tui"), allow(dead_code))]
pub fn default_log_path() -> Option<PathBuf> {
    let dir = dirs::cache_dir()?.join("vote-console");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join("vote-console.log"))
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        // HTTP stack internals are noise at debug level.
        .add_filter_allow_str("vote_console")
        .build()
}

fn create_file_logger(
    path: PathBuf,
    level: LevelFilter,
    config: Config,
) -> Option<Box<WriteLogger<File>>> {
    match File::create(&path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", path, err);
            None
        }
    }
}
