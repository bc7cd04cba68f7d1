use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Result};
use std::thread_local;

#[cfg(test)]
use std::sync::atomic::{AtomicU64, Ordering};

thread_local! {
    static TEST_HOME_DIR: std::cell::RefCell<Option<PathBuf>> = const { std::cell::RefCell::new(None) };
    static TEST_BACKUP_DIR: std::cell::RefCell<Option<PathBuf>> = const { std::cell::RefCell::new(None) };
}

#[cfg(test)]
static NEXT_TEST_ID: AtomicU64 = AtomicU64::new(1);

#[cfg(test)]
pub fn next_test_id() -> u64 {
    NEXT_TEST_ID.fetch_add(1, Ordering::SeqCst)
}

#[cfg(test)]
pub fn set_test_home_dir(path: Option<PathBuf>) {
    TEST_HOME_DIR.with(|dir| {
        *dir.borrow_mut() = path;
    });
}

#[cfg(test)]
pub fn set_test_backup_dir(path: Option<PathBuf>) {
    TEST_BACKUP_DIR.with(|dir| {
        *dir.borrow_mut() = path;
    });
}

pub fn get_home_dir() -> Result<PathBuf> {
    if let Some(home) = TEST_HOME_DIR.with(|dir| dir.borrow().clone()) {
        return Ok(home);
    }

    env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow!("Could not determine home directory"))
}

/// Location of moved-aside destinations. Not created until the first backup.
pub fn get_backup_dir() -> Result<PathBuf> {
    if let Some(backup) = TEST_BACKUP_DIR.with(|dir| dir.borrow().clone()) {
        return Ok(backup);
    }

    Ok(get_home_dir()?.join(".local/share/dotfiles-linker/backup"))
}

pub fn ensure_parent_dirs(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Renders `path` relative to the home directory as `~/...` when possible.
pub fn display_path(path: &Path) -> String {
    match get_home_dir() {
        Ok(home) => match path.strip_prefix(&home) {
            Ok(rel) if rel.as_os_str().is_empty() => "~".to_string(),
            Ok(rel) => format!("~/{}", rel.display()),
            Err(_) => path.display().to_string(),
        },
        Err(_) => path.display().to_string(),
    }
}
