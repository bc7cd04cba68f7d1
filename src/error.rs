use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// What was sitting at a destination path when a link could not be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    /// A symbolic link, dangling or not. Never backed up automatically.
    Symlink,
    /// A regular file, directory or anything else that is not a link.
    Other,
}

impl fmt::Display for Occupant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Occupant::Symlink => write!(f, "a symlink"),
            Occupant::Other => write!(f, "a file or directory"),
        }
    }
}

/// Errors raised while linking dotfiles into place.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("link target {} does not exist", .path.display())]
    TargetNotFound { path: PathBuf },

    #[error("destination {} is already occupied by {occupant}", .path.display())]
    DestinationConflict { path: PathBuf, occupant: Occupant },

    #[error("app '{name}' is not defined in the configuration")]
    UnknownApp { name: String },

    #[error("failed to back up {}", .path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("filesystem error at {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors raised while reading, validating or writing the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file at {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file at {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("failed to write config file at {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(String),

    #[error("{field} directory {} does not exist", .path.display())]
    MissingDirectory { field: &'static str, path: PathBuf },
}
