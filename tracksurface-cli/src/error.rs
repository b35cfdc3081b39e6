//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Failed to read the input track file
    FileRead { path: String, error: std::io::Error },
    /// A `--points` argument could not be parsed
    InvalidPoints(String),
    /// The ingestion job finished in the failed state
    Processing(String),
    /// Surface classification failed outside the job pipeline
    Lookup(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        if let CliError::InvalidPoints(_) = self {
            eprintln!();
            eprintln!("Points are semicolon-separated lon,lat pairs, for example:");
            eprintln!("  --points \"147.32,-42.88;147.33,-42.89\"");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::FileRead { path, error } => {
                write!(f, "Failed to read track file '{}': {}", path, error)
            }
            CliError::InvalidPoints(msg) => write!(f, "Invalid --points value: {}", msg),
            CliError::Processing(msg) => write!(f, "Track processing failed: {}", msg),
            CliError::Lookup(msg) => write!(f, "Surface classification failed: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::FileRead { error, .. } => Some(error),
            _ => None,
        }
    }
}
