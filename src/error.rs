//! Error taxonomy shared by every component.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Local repository path does not exist.
    #[error("repository path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    /// Path exists but is not a Git working copy.
    #[error("not a valid git repository: {}", .0.display())]
    InvalidRepository(PathBuf),

    /// Credential or permission failure while talking to a remote.
    #[error("authentication failed, check that your SSH key or credentials grant access to this repository: {0}")]
    Authentication(String),

    /// Any other failure reported by the git toolchain.
    #[error("git {command} failed: {message}")]
    Command { command: String, message: String },

    /// Malformed or unwritable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify a failed git CLI invocation by its stderr.
    pub fn from_command(command: &str, stderr: &str) -> Self {
        let stderr = stderr.trim();
        if stderr.contains("Permission denied") || stderr.to_lowercase().contains("authentication") {
            Error::Authentication(stderr.to_string())
        } else {
            Error::Command {
                command: command.to_string(),
                message: stderr.to_string(),
            }
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication(_))
    }
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        match (err.code(), err.class()) {
            (git2::ErrorCode::Auth, _) | (_, git2::ErrorClass::Ssh) => {
                Error::Authentication(err.message().to_string())
            }
            _ => Error::Command {
                command: "libgit2".to_string(),
                message: err.message().to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
