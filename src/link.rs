use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{LinkError, Occupant};

/// Creates a symlink at `dest` pointing at `target`.
///
/// Nothing is touched on failure: a missing `target` yields
/// [`LinkError::TargetNotFound`], and an existing `dest` (including a dangling
/// link) yields [`LinkError::DestinationConflict`] tagged with what occupies it.
pub fn symlink(target: &Path, dest: &Path) -> Result<(), LinkError> {
    if !target.exists() {
        return Err(LinkError::TargetNotFound { path: target.to_path_buf() });
    }

    match create_link(target, dest) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            Err(LinkError::DestinationConflict {
                path: dest.to_path_buf(),
                occupant: occupant_of(dest),
            })
        }
        Err(err) => Err(LinkError::Io { path: dest.to_path_buf(), source: err }),
    }
}

/// Classifies whatever currently sits at `path`.
pub fn occupant_of(path: &Path) -> Occupant {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => Occupant::Symlink,
        _ => Occupant::Other,
    }
}

/// True when `path` is a symlink whose stored target is exactly `target`.
pub fn points_to(path: &Path, target: &Path) -> bool {
    fs::read_link(path).map_or(false, |existing| existing == target)
}

/// Expands `$VAR` and `${VAR}` against the process environment.
///
/// Undefined variables expand to the empty string.
pub fn expand_env(raw: &str) -> String {
    shellexpand::env_with_context_no_errors(raw, |var: &str| {
        Some(std::env::var(var).unwrap_or_default())
    })
    .into_owned()
}

/// Resolves where `filename` should be linked.
///
/// An explicit override wins and has its variables expanded; otherwise the
/// file lands in `dest_dir` with a leading dot.
pub fn resolve_destination(dest_dir: &Path, filename: &str, override_dest: Option<&str>) -> PathBuf {
    match override_dest {
        Some(raw) => PathBuf::from(expand_env(raw)),
        None => dest_dir.join(format!(".{}", filename)),
    }
}

#[cfg(unix)]
fn create_link(target: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, dest)
}

#[cfg(windows)]
fn create_link(target: &Path, dest: &Path) -> io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, dest)
    } else {
        std::os::windows::fs::symlink_file(target, dest)
    }
}
