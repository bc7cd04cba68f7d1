//! Links each requested app's dotfiles from the source tree into place.
//!
//! Apps are handled strictly in request order, one file at a time. An app
//! whose executable cannot be found is skipped untouched. A destination
//! occupied by a real file or directory is backed up and the link retried
//! once; a destination that is already a symlink is never clobbered.

use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::backup::Backup;
use crate::config::Config;
use crate::error::{LinkError, Occupant};
use crate::fs_utils::ensure_parent_dirs;
use crate::link;
use crate::probe::Probe;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedFile {
    pub app: String,
    pub source: PathBuf,
    pub dest: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackedUpFile {
    pub original: PathBuf,
    pub backup: PathBuf,
}

/// Outcome of a single installation run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Requested apps whose executable was not found, in request order.
    pub skipped: Vec<String>,
    pub linked: Vec<LinkedFile>,
    pub backups: Vec<BackedUpFile>,
}

/// A resolved source/destination pair for one file of an app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLink {
    pub filename: String,
    pub source: PathBuf,
    pub dest: PathBuf,
}

pub struct Installer<'a, P, B> {
    config: &'a Config,
    probe: P,
    backup: B,
}

impl<'a, P: Probe, B: Backup> Installer<'a, P, B> {
    pub fn new(config: &'a Config, probe: P, backup: B) -> Self {
        Self { config, probe, backup }
    }

    /// Links every requested app, stopping at the first unrecoverable error.
    pub fn symlink<S: AsRef<str>>(&self, apps: &[S]) -> Result<InstallReport, LinkError> {
        let mut report = InstallReport::default();
        for app in apps {
            self.symlink_app(app.as_ref(), &mut report)?;
        }
        Ok(report)
    }

    /// Links a single app, recording the outcome in `report`.
    ///
    /// Links made before a failing file stay in place and are already recorded.
    pub fn symlink_app(&self, app: &str, report: &mut InstallReport) -> Result<(), LinkError> {
        if self.probe.probe(app).is_none() {
            info!(app, "not installed, skipping");
            report.skipped.push(app.to_string());
            return Ok(());
        }

        for planned in self.plan(app)? {
            self.link_file(&planned, report)?;
            report.linked.push(LinkedFile {
                app: app.to_string(),
                source: planned.source,
                dest: planned.dest,
            });
        }

        Ok(())
    }

    /// Resolves every file of `app` without touching the filesystem.
    pub fn plan(&self, app: &str) -> Result<Vec<PlannedLink>, LinkError> {
        let spec = self
            .config
            .app(app)
            .ok_or_else(|| LinkError::UnknownApp { name: app.to_string() })?;

        Ok(spec
            .files
            .iter()
            .map(|filename| PlannedLink {
                filename: filename.clone(),
                source: self.config.root.join(filename),
                dest: link::resolve_destination(&self.config.dest, filename, spec.dest_override(filename)),
            })
            .collect())
    }

    fn link_file(&self, planned: &PlannedLink, report: &mut InstallReport) -> Result<(), LinkError> {
        let PlannedLink { filename, source, dest } = planned;
        debug!(file = %filename, source = %source.display(), dest = %dest.display(), "linking");

        // A missing source must leave the destination side untouched.
        if !source.exists() {
            return Err(LinkError::TargetNotFound { path: source.clone() });
        }
        ensure_parent_dirs(dest).map_err(|err| LinkError::Io { path: dest.clone(), source: err })?;

        match link::symlink(source, dest) {
            Err(LinkError::DestinationConflict { path, occupant: Occupant::Other }) => {
                let backup = self.backup.backup(&path)?;
                report.backups.push(BackedUpFile { original: path, backup });
                link::symlink(source, dest)
            }
            Err(err @ LinkError::DestinationConflict { occupant: Occupant::Symlink, .. }) => {
                warn!(dest = %dest.display(), "destination is already a symlink, leaving it alone");
                Err(err)
            }
            other => other,
        }
    }

    pub fn is_installed(&self, app: &str) -> Option<PathBuf> {
        self.probe.probe(app)
    }
}
