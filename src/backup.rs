use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use anyhow::{anyhow, Result};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::LinkError;

/// Moves whatever occupies a destination out of the way.
#[cfg_attr(test, mockall::automock)]
pub trait Backup {
    /// Frees `path`, returning where its previous content went.
    fn backup(&self, path: &Path) -> Result<PathBuf, LinkError>;
}

/// Keeps backups as `<original path>.<unix seconds>`, mirroring each
/// original's absolute path below a single directory.
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn next_free_path(&self, mirror: &Path) -> PathBuf {
        let mut timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        loop {
            let candidate = versioned(mirror, timestamp);
            if fs::symlink_metadata(&candidate).is_err() {
                return candidate;
            }
            timestamp += 1;
        }
    }
}

impl Backup for BackupStore {
    fn backup(&self, path: &Path) -> Result<PathBuf, LinkError> {
        let to_backup_error = |source: io::Error| LinkError::Backup { path: path.to_path_buf(), source };

        let mirror = mirror_path(path, &self.dir).map_err(to_backup_error)?;
        if let Some(parent) = mirror.parent() {
            fs::create_dir_all(parent).map_err(|source| LinkError::Backup {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let backup_path = self.next_free_path(&mirror);
        move_path(path, &backup_path).map_err(to_backup_error)?;

        info!(from = %path.display(), to = %backup_path.display(), "backed up existing destination");
        Ok(backup_path)
    }
}

/// Where backups of `original` live inside `backup_dir`, without the version suffix.
///
/// Every original gets its own slot, so two destinations sharing a file name
/// never see each other's backups.
pub fn mirror_path(original: &Path, backup_dir: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(original)?;
    let mut mirror = backup_dir.to_path_buf();
    for component in absolute.components() {
        if let Component::Normal(part) = component {
            mirror.push(part);
        }
    }

    if mirror == backup_dir {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"));
    }
    Ok(mirror)
}

/// Inverse of [`mirror_path`] for a versioned backup entry.
fn original_of(backup: &Path, backup_dir: &Path) -> Option<(PathBuf, u64)> {
    let relative = backup.strip_prefix(backup_dir).ok()?;
    let name = relative.file_name()?.to_str()?;
    let (stem, version) = split_version(name)?;
    let original = Path::new("/").join(relative.with_file_name(stem));
    Some((original, version))
}

fn versioned(mirror: &Path, timestamp: u64) -> PathBuf {
    let mut name = OsString::from(mirror.as_os_str());
    name.push(format!(".{}", timestamp));
    PathBuf::from(name)
}

fn split_version(name: &str) -> Option<(&str, u64)> {
    let (stem, version) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    version.parse::<u64>().ok().map(|version| (stem, version))
}

/// Renames `from` to `to`, copying then removing when they sit on different filesystems.
pub fn move_path(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
            debug!(from = %from.display(), to = %to.display(), "rename crosses devices, copying instead");
            copy_then_remove(from, to)
        }
        other => other,
    }
}

pub(crate) fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(from)?;

    if meta.file_type().is_symlink() {
        copy_link(from, to)?;
        return fs::remove_file(from);
    }
    if meta.is_file() {
        fs::copy(from, to)?;
        return fs::remove_file(from);
    }

    for entry in WalkDir::new(from) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry.path().strip_prefix(from).map_err(io::Error::other)?;
        let target = to.join(relative);

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            copy_link(entry.path(), &target)?;
        } else if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    fs::remove_dir_all(from)
}

#[cfg(unix)]
fn copy_link(from: &Path, to: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(from)?, to)
}

#[cfg(windows)]
fn copy_link(from: &Path, to: &Path) -> io::Result<()> {
    let target = fs::read_link(from)?;
    if fs::metadata(from).map(|m| m.is_dir()).unwrap_or(false) {
        std::os::windows::fs::symlink_dir(target, to)
    } else {
        std::os::windows::fs::symlink_file(target, to)
    }
}

pub fn find_latest_backup(original: &Path, backup_dir: &Path) -> Result<PathBuf> {
    find_all_backup_versions(original, backup_dir)?
        .into_iter()
        .max_by_key(|(ver, _)| *ver)
        .map(|(_, path)| path)
        .ok_or_else(|| anyhow!("No backups found for {}", original.display()))
}

pub fn find_all_backup_versions(original: &Path, backup_dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let mirror = mirror_path(original, backup_dir)?;
    let filename = mirror.file_name()
        .ok_or_else(|| anyhow!("Invalid file path"))?
        .to_string_lossy()
        .into_owned();

    let mut versions = Vec::new();

    let slot = match mirror.parent() {
        Some(dir) if dir.is_dir() => dir,
        _ => return Ok(versions),
    };

    for entry in fs::read_dir(slot)? {
        let path = entry?.path();

        if let Some(backup_name) = path.file_name() {
            let backup_name = backup_name.to_string_lossy();

            if let Some((name, timestamp)) = split_version(&backup_name) {
                if name == filename {
                    versions.push((timestamp, path));
                }
            }
        }
    }

    versions.sort_by_key(|(timestamp, _)| *timestamp);

    Ok(versions)
}

/// Every backup below `backup_dir` as `(original path, version, backup path)`,
/// sorted by original path. Backed-up directories are reported once.
pub fn list_all_backups(backup_dir: &Path) -> Result<Vec<(PathBuf, u64, PathBuf)>> {
    let mut backups = Vec::new();
    if !backup_dir.is_dir() {
        return Ok(backups);
    }

    let mut walker = WalkDir::new(backup_dir).min_depth(1).sort_by_file_name().into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry?;
        if let Some((original, version)) = original_of(entry.path(), backup_dir) {
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            backups.push((original, version, entry.path().to_path_buf()));
        }
    }

    Ok(backups)
}
