use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

use crate::backup::{find_all_backup_versions, find_latest_backup, list_all_backups, move_path, Backup, BackupStore};
use crate::colorize;
use crate::config::{get_config_path, initialize_config, load_config, Config};
use crate::error::LinkError;
use crate::fs_utils::{display_path, get_backup_dir, get_home_dir};
use crate::installer::{InstallReport, Installer, PlannedLink};
use crate::link;
use crate::probe::{PathProbe, Probe};

pub fn resolve_config_path(config: Option<&Path>) -> Result<PathBuf> {
    match config {
        Some(path) => Ok(path.to_path_buf()),
        None => get_config_path(),
    }
}

fn requested_or_all(config: &Config, apps: &[String]) -> Vec<String> {
    if apps.is_empty() {
        config.app_names()
    } else {
        apps.to_vec()
    }
}

pub fn symlink_apps(config_path: &Path, apps: &[String], keep_going: bool) -> Result<InstallReport> {
    let config = load_config(config_path)?;
    let backups = BackupStore::new(get_backup_dir()?);
    run_symlink(&config, apps, keep_going, PathProbe::new(), backups)
}

pub fn run_symlink<P: Probe, B: Backup>(
    config: &Config,
    apps: &[String],
    keep_going: bool,
    probe: P,
    backup: B,
) -> Result<InstallReport> {
    let apps = requested_or_all(config, apps);
    let installer = Installer::new(config, probe, backup);

    println!("{} {}",
        colorize::header("Linking dotfiles from"),
        colorize::path(display_path(&config.root)));

    let mut report = InstallReport::default();
    let mut failed: Vec<(String, LinkError)> = Vec::new();

    for app in &apps {
        let linked_before = report.linked.len();
        let backups_before = report.backups.len();
        let result = installer.symlink_app(app, &mut report);
        print_progress(&report, linked_before, backups_before);

        if let Err(err) = result {
            println!("  {} {} ({})", colorize::error("Failed:"), colorize::app(app), err);
            if !keep_going {
                print_report(&report);
                return Err(anyhow::Error::new(err).context(format!("Failed to link dotfiles for {}", app)));
            }
            failed.push((app.clone(), err));
        }
    }

    print_report(&report);

    if !failed.is_empty() {
        let names: Vec<&str> = failed.iter().map(|(app, _)| app.as_str()).collect();
        return Err(anyhow!("{} app(s) failed to link: {}", failed.len(), names.join(", ")));
    }

    Ok(report)
}

fn print_progress(report: &InstallReport, linked_from: usize, backups_from: usize) {
    for backed_up in &report.backups[backups_from..] {
        println!("  {} {} {} {}",
            colorize::warning("Backed up:"),
            colorize::path(display_path(&backed_up.original)),
            colorize::info("to"),
            colorize::path(display_path(&backed_up.backup)));
    }
    for linked in &report.linked[linked_from..] {
        println!("  {} [{}] {}",
            colorize::success("Linked:"),
            colorize::app(&linked.app),
            colorize::link(display_path(&linked.source), display_path(&linked.dest)));
    }
}

fn print_report(report: &InstallReport) {
    println!("\n{}", colorize::header("Summary:"));
    println!("  {} {}", colorize::success("Files linked:"), colorize::highlight(report.linked.len()));
    if !report.backups.is_empty() {
        println!("  {} {}", colorize::warning("Files backed up:"), colorize::highlight(report.backups.len()));
    }
    if !report.skipped.is_empty() {
        println!("  {} {}",
            colorize::warning("Skipped (not installed):"),
            colorize::app(report.skipped.join(", ")));
    }
}

/// State of one destination relative to the file it should link to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileState {
    Linked,
    Missing,
    SourceMissing,
    ForeignLink(PathBuf),
    Occupied,
}

pub fn file_state(planned: &PlannedLink) -> FileState {
    if !planned.source.exists() {
        return FileState::SourceMissing;
    }

    match fs::symlink_metadata(&planned.dest) {
        Err(_) => FileState::Missing,
        Ok(meta) if meta.file_type().is_symlink() => {
            if link::points_to(&planned.dest, &planned.source) {
                FileState::Linked
            } else {
                let target = fs::read_link(&planned.dest).unwrap_or_default();
                FileState::ForeignLink(target)
            }
        }
        Ok(_) => FileState::Occupied,
    }
}

pub fn status_apps(config_path: &Path, apps: &[String]) -> Result<()> {
    let config = load_config(config_path)?;
    run_status(&config, apps, PathProbe::new(), &get_backup_dir()?)
}

pub fn run_status<P: Probe>(config: &Config, apps: &[String], probe: P, backup_dir: &Path) -> Result<()> {
    let installer = Installer::new(config, probe, BackupStore::new(backup_dir));

    println!("{} {}",
        colorize::header("Dotfiles Status"),
        colorize::info(format!("(root: {})", display_path(&config.root))));

    let mut linked_count = 0;
    let mut missing_count = 0;
    let mut conflict_count = 0;

    for app in requested_or_all(config, apps) {
        let installed = installer.is_installed(&app);
        match &installed {
            Some(bin) => println!("\n{} {}", colorize::app(&app), colorize::info(format!("({})", bin.display()))),
            None => println!("\n{} {}", colorize::app(&app), colorize::warning("(not installed)")),
        }
        if installed.is_none() && config.app(&app).is_none() {
            continue;
        }

        let planned = installer.plan(&app)?;

        for file in &planned {
            let dest = display_path(&file.dest);
            match file_state(file) {
                FileState::Linked => {
                    println!("  {} {} {}", colorize::success("✓"), colorize::path(dest), colorize::success("Linked"));
                    linked_count += 1;
                }
                FileState::Missing => {
                    println!("  {} {} {}", colorize::error("✗"), colorize::path(dest), colorize::error("Not linked"));
                    missing_count += 1;
                }
                FileState::SourceMissing => {
                    println!("  {} {} {} {}",
                        colorize::error("✗"),
                        colorize::path(dest),
                        colorize::error("Source missing:"),
                        colorize::path(display_path(&file.source)));
                    missing_count += 1;
                }
                FileState::ForeignLink(target) => {
                    println!("  {} {} {} {}",
                        colorize::warning("!"),
                        colorize::path(dest),
                        colorize::warning("Links elsewhere:"),
                        colorize::path(target.display()));
                    conflict_count += 1;
                }
                FileState::Occupied => {
                    println!("  {} {} {}",
                        colorize::warning("!"),
                        colorize::path(dest),
                        colorize::warning("Occupied by a file or directory (will be backed up)"));
                    conflict_count += 1;
                }
            }

            let backups = find_all_backup_versions(&file.dest, backup_dir)?;
            if !backups.is_empty() {
                println!("      {} {}", colorize::info("backups:"), colorize::highlight(backups.len()));
            }
        }
    }

    println!("\n{}", colorize::header("Summary:"));
    println!("  {} {}", colorize::success("Linked:"), colorize::highlight(linked_count));
    println!("  {} {}", colorize::error("Not linked:"), colorize::highlight(missing_count));
    println!("  {} {}", colorize::warning("Conflicts:"), colorize::highlight(conflict_count));

    Ok(())
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UnlinkSummary {
    pub removed: usize,
    pub restored: usize,
    pub skipped: usize,
}

pub fn unlink_apps(config_path: &Path, apps: &[String]) -> Result<UnlinkSummary> {
    let config = load_config(config_path)?;
    run_unlink(&config, apps, &get_backup_dir()?)
}

/// Removes links that point into the dotfiles root and puts the newest backup back.
pub fn run_unlink(config: &Config, apps: &[String], backup_dir: &Path) -> Result<UnlinkSummary> {
    let backups = BackupStore::new(backup_dir);
    let installer = Installer::new(config, PathProbe::new(), backups);
    let mut summary = UnlinkSummary::default();

    println!("{}", colorize::header("Unlinking dotfiles..."));

    for app in requested_or_all(config, apps) {
        for file in installer.plan(&app)? {
            let dest = display_path(&file.dest);

            if !link::points_to(&file.dest, &file.source) {
                debug!(dest = %file.dest.display(), "not linked to the dotfiles root, leaving it");
                if fs::symlink_metadata(&file.dest).is_ok() {
                    println!("  {} {} (not linked by us)", colorize::warning("Skipped:"), colorize::path(dest));
                }
                summary.skipped += 1;
                continue;
            }

            fs::remove_file(&file.dest)
                .with_context(|| format!("Failed to remove link {}", file.dest.display()))?;
            summary.removed += 1;

            match find_latest_backup(&file.dest, backup_dir) {
                Ok(backup_path) => {
                    move_path(&backup_path, &file.dest).with_context(|| {
                        format!("Failed to restore backup {} to {}", backup_path.display(), file.dest.display())
                    })?;
                    summary.restored += 1;
                    println!("  {} {} (restored backup)", colorize::info("Unlinked:"), colorize::path(dest));
                }
                Err(_) => {
                    println!("  {} {}", colorize::info("Unlinked:"), colorize::path(dest));
                }
            }
        }
    }

    println!("\n{}", colorize::header("Summary:"));
    println!("  {} {}", colorize::success("Links removed:"), colorize::highlight(summary.removed));
    if summary.restored > 0 {
        println!("  {} {}", colorize::success("Backups restored:"), colorize::highlight(summary.restored));
    }
    if summary.skipped > 0 {
        println!("  {} {}", colorize::warning("Files skipped:"), colorize::highlight(summary.skipped));
    }

    Ok(summary)
}

/// Lists backups, optionally only those of `file`. Relative paths are taken
/// relative to the home directory.
pub fn list_backups(file: Option<&Path>) -> Result<()> {
    let backup_dir = get_backup_dir()?;

    if !backup_dir.exists() {
        println!("{}", colorize::warning("No backups found"));
        return Ok(());
    }

    if let Some(file) = file {
        let file_path = if file.is_absolute() { file.to_path_buf() } else { get_home_dir()?.join(file) };
        let shown = display_path(&file_path);
        let versions = find_all_backup_versions(&file_path, &backup_dir)?;

        if versions.is_empty() {
            println!("{} {}", colorize::warning("No backups found for"), colorize::path(shown));
            return Ok(());
        }

        println!("{} {}:", colorize::header("Backup versions for"), colorize::path(shown));
        for (version, path) in versions {
            println!("  {} - {} ({})",
                colorize::timestamp(version),
                colorize::path(path.strip_prefix(&backup_dir).unwrap_or(&path).display()),
                colorize::info(format_version(version)));
        }
        return Ok(());
    }

    println!("{}", colorize::header("All backups:"));
    let backups = list_all_backups(&backup_dir)?;

    if backups.is_empty() {
        println!("{}", colorize::warning("No backups found"));
    }

    for (original, version, path) in backups {
        let suffix = if path.is_dir() { "/" } else { "" };
        println!("  {}{} {} ({})",
            colorize::path(display_path(&original)),
            suffix,
            colorize::timestamp(version),
            colorize::info(format_version(version)));
    }

    Ok(())
}

fn format_version(version: u64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp(version as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| version.to_string())
}

pub fn clear_backups(force: bool) -> Result<()> {
    let backup_dir = get_backup_dir()?;
    let shown = display_path(&backup_dir);

    if !backup_dir.exists() {
        println!("{} {}", colorize::warning("No backups directory found at"), colorize::path(shown));
        return Ok(());
    }

    if !force {
        println!("{} {}",
            colorize::warning("Warning: This will permanently delete all backups in"),
            colorize::path(&shown));
        println!("{}", colorize::warning("Are you sure you want to continue? (yes/no)"));

        let mut confirmation = String::new();
        std::io::stdin().read_line(&mut confirmation)?;

        if confirmation.trim().to_lowercase() != "yes" {
            println!("{}", colorize::warning("Backup clearing cancelled."));
            return Ok(());
        }
    }

    println!("{} {}...", colorize::info("Clearing backups in"), colorize::path(shown));
    fs::remove_dir_all(&backup_dir)
        .with_context(|| format!("Failed to remove backup directory {}", backup_dir.display()))?;

    println!("{}", colorize::success("All backups cleared."));
    Ok(())
}

pub fn init_config(config_path: &Path, root: &Path, dest: Option<&Path>) -> Result<()> {
    let root = root
        .canonicalize()
        .with_context(|| format!("Dotfiles root {} does not exist", root.display()))?;

    if config_path.exists() {
        warn!(path = %config_path.display(), "overwriting existing config");
    }

    let config = initialize_config(config_path, &root, dest)?;
    println!("{} {}", colorize::success("Configuration file created at"), colorize::path(display_path(config_path)));
    println!("  {} {}", colorize::info("root:"), colorize::path(display_path(&config.root)));
    println!("  {} {}", colorize::info("dest:"), colorize::path(display_path(&config.dest)));
    Ok(())
}
