//! Error handling for textpipe.
//! Defines the error type shared by every component and the handler used by the
//! binary to turn errors into exit statuses.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Exit status for errors caused by invalid input or configuration.
pub const EXIT_USER_ERROR: i32 = 1;

/// Exit status for unexpected internal failures.
pub const EXIT_INTERNAL_ERROR: i32 = 2;

/// Custom error types for textpipe operations.
///
/// This enum represents all possible errors that can occur while resolving
/// components, reading configuration and transforming files.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid arguments, unknown component names or malformed configuration
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    /// The source path given on the command line does not exist
    #[error("The given source path '{source_path}' does not exist.")]
    SourceNotFoundError { source_path: String },

    /// The target directory is missing and could not be created
    #[error("The target path '{target_path}' does not exist and could not be created: {source}.")]
    TargetDirectoryError {
        target_path: String,
        #[source]
        source: io::Error,
    },

    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// Directory traversal failed
    #[error("Walk error: {0}.")]
    WalkError(#[from] walkdir::Error),

    /// The extension allow-list could not be compiled
    #[error("Extension filter error: {0}.")]
    ExtensionFilterError(#[from] globset::Error),

    /// The input is not a well-formed XML document
    #[error("XML parse error: {0}.")]
    ParseError(#[from] xmltree::ParseError),

    /// The transformed document could not be serialized
    #[error("XML write error: {0}.")]
    WriteError(#[from] xml::writer::Error),

    /// Any failure while transforming a single file, with the file that failed
    #[error("Failed to transform '{}': {source}", .path.display())]
    TransformError {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps `self` as the cause of a failed transformation of `path`.
    pub fn in_transform<P: Into<PathBuf>>(self, path: P) -> Self {
        Error::TransformError { path: path.into(), source: Box::new(self) }
    }

    /// Whether the error was caused by the user's input rather than by an
    /// unexpected failure.
    pub fn is_user_error(&self) -> bool {
        match self {
            Error::ConfigError(_)
            | Error::SourceNotFoundError { .. }
            | Error::TargetDirectoryError { .. }
            | Error::ExtensionFilterError(_) => true,
            Error::TransformError { source, .. } => source.is_user_error(),
            _ => false,
        }
    }

    /// The process exit status matching this error.
    pub fn exit_code(&self) -> i32 {
        if self.is_user_error() {
            EXIT_USER_ERROR
        } else {
            EXIT_INTERNAL_ERROR
        }
    }
}

/// Convenience type alias for Results with [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// Recognised errors are printed with a usage hint and exit with
/// [`EXIT_USER_ERROR`]. Anything else is logged with its full cause chain and
/// exits with [`EXIT_INTERNAL_ERROR`].
pub fn default_error_handler(err: Error) -> ! {
    if err.is_user_error() {
        eprintln!("Error: {err}");
        eprintln!("Run 'textpipe --help' for usage.");
    } else {
        log::error!("Unexpected error: {err:?}");
        eprintln!("Unexpected error: {err}");
        let mut cause = std::error::Error::source(&err);
        while let Some(inner) = cause {
            eprintln!("  caused by: {inner}");
            cause = inner.source();
        }
    }
    std::process::exit(err.exit_code());
}
