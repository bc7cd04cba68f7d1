use std::ffi::OsString;
use std::path::PathBuf;

use tracing::debug;

/// Decides whether an app counts as installed by looking for its executable.
#[cfg_attr(test, mockall::automock)]
pub trait Probe {
    /// Returns the full path of `name` when it is an executable, `None` otherwise.
    fn probe(&self, name: &str) -> Option<PathBuf>;
}

/// Looks executables up on the command search path.
///
/// Names containing a path separator are checked as-is instead of searched.
#[derive(Debug, Clone, Default)]
pub struct PathProbe {
    search_path: Option<OsString>,
}

impl PathProbe {
    /// Probe against the process `PATH`, read at lookup time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe against an explicit, `PATH`-formatted list of directories.
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self { search_path: Some(search_path.into()) }
    }
}

impl Probe for PathProbe {
    fn probe(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }

        let search_path = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"));
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));

        let found = which::which_in(name, search_path, cwd).ok();
        debug!(app = name, found = ?found, "probed executable");
        found
    }
}
