use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::symlink as os_symlink;
use std::path::{Path, PathBuf};
use anyhow::Result;
use tempfile::{tempdir, TempDir};

use crate::backup::{find_all_backup_versions, mirror_path, BackupStore};
use crate::commands::{clear_backups, file_state, init_config, list_backups, run_status, run_symlink, run_unlink, FileState};
use crate::config::{load_config, AppSpec, Config};
use crate::fs_utils::{get_backup_dir, next_test_id, set_test_backup_dir, set_test_home_dir};
use crate::installer::PlannedLink;
use crate::probe::MockProbe;

struct TestEnv {
    temp_dir: TempDir,
    home: PathBuf,
    backup_dir: PathBuf,
    config: Config,
}

fn setup_test_env() -> Result<TestEnv> {
    let test_id = next_test_id();

    let temp_dir = tempdir()?;
    let home = temp_dir.path().join(format!("home_{}", test_id));
    let root = temp_dir.path().join("dotfiles");
    let backup_dir = temp_dir.path().join(format!("backup_{}", test_id));
    fs::create_dir_all(&home)?;
    fs::create_dir_all(&root)?;

    set_test_home_dir(Some(home.clone()));
    set_test_backup_dir(Some(backup_dir.clone()));

    fs::write(root.join("vimrc"), "set nocompatible")?;
    fs::write(root.join("gitconfig"), "[user]")?;
    fs::write(root.join("tmux.conf"), "set -g mouse on")?;

    let mut apps = BTreeMap::new();
    apps.insert("vim".to_string(), AppSpec { files: vec!["vimrc".to_string()], ..Default::default() });
    apps.insert("git".to_string(), AppSpec { files: vec!["gitconfig".to_string()], ..Default::default() });
    apps.insert("tmux".to_string(), AppSpec { files: vec!["tmux.conf".to_string()], ..Default::default() });

    let config = Config { root, dest: home.clone(), apps };
    Ok(TestEnv { temp_dir, home, backup_dir, config })
}

fn cleanup_test_env() {
    set_test_home_dir(None);
    set_test_backup_dir(None);
}

fn probe_without(missing: &'static str) -> MockProbe {
    let mut probe = MockProbe::new();
    probe.expect_probe().returning(move |name| {
        if name == missing { None } else { Some(PathBuf::from(format!("/usr/bin/{}", name))) }
    });
    probe
}

fn is_link_to(path: &Path, target: &Path) -> bool {
    fs::read_link(path).map(|t| t == target).unwrap_or(false)
}

#[test]
fn test_symlink_all_configured_apps() -> Result<()> {
    let env = setup_test_env()?;

    let report = run_symlink(&env.config, &[], false, probe_without("tmux"), BackupStore::new(&env.backup_dir))?;

    assert_eq!(report.skipped, vec!["tmux".to_string()]);
    assert!(is_link_to(&env.home.join(".vimrc"), &env.config.root.join("vimrc")));
    assert!(is_link_to(&env.home.join(".gitconfig"), &env.config.root.join("gitconfig")));
    assert!(fs::symlink_metadata(env.home.join(".tmux.conf")).is_err());

    cleanup_test_env();
    Ok(())
}

#[test]
fn test_symlink_backs_up_existing_file() -> Result<()> {
    let env = setup_test_env()?;
    fs::write(env.home.join(".vimrc"), "# old vimrc")?;

    let apps = vec!["vim".to_string()];
    let report = run_symlink(&env.config, &apps, false, probe_without(""), BackupStore::new(&env.backup_dir))?;

    assert_eq!(report.backups.len(), 1);
    assert!(is_link_to(&env.home.join(".vimrc"), &env.config.root.join("vimrc")));
    let versions = find_all_backup_versions(&env.home.join(".vimrc"), &env.backup_dir)?;
    assert_eq!(versions.len(), 1);
    assert_eq!(fs::read_to_string(&versions[0].1)?, "# old vimrc");

    cleanup_test_env();
    Ok(())
}

#[test]
fn test_symlink_stops_at_first_failing_app() -> Result<()> {
    let env = setup_test_env()?;
    os_symlink(env.temp_dir.path().join("elsewhere"), env.home.join(".gitconfig"))?;

    let apps = vec!["git".to_string(), "vim".to_string()];
    let result = run_symlink(&env.config, &apps, false, probe_without(""), BackupStore::new(&env.backup_dir));

    assert!(result.is_err());
    assert!(format!("{:#}", result.unwrap_err()).contains("git"));
    assert!(fs::symlink_metadata(env.home.join(".vimrc")).is_err(), "vim is never reached");

    cleanup_test_env();
    Ok(())
}

#[test]
fn test_symlink_failure_keeps_earlier_apps_linked() -> Result<()> {
    let env = setup_test_env()?;
    fs::write(env.home.join(".vimrc"), "# old vimrc")?;
    os_symlink(env.temp_dir.path().join("elsewhere"), env.home.join(".tmux.conf"))?;

    let apps = vec!["vim".to_string(), "tmux".to_string(), "git".to_string()];
    let err = run_symlink(&env.config, &apps, false, probe_without(""), BackupStore::new(&env.backup_dir)).unwrap_err();

    assert!(format!("{:#}", err).contains("tmux"));
    assert!(is_link_to(&env.home.join(".vimrc"), &env.config.root.join("vimrc")));
    assert_eq!(find_all_backup_versions(&env.home.join(".vimrc"), &env.backup_dir)?.len(), 1);
    assert!(fs::symlink_metadata(env.home.join(".gitconfig")).is_err());

    cleanup_test_env();
    Ok(())
}

#[test]
fn test_symlink_keep_going_links_remaining_apps() -> Result<()> {
    let env = setup_test_env()?;
    os_symlink(env.temp_dir.path().join("elsewhere"), env.home.join(".gitconfig"))?;

    let apps = vec!["git".to_string(), "vim".to_string()];
    let result = run_symlink(&env.config, &apps, true, probe_without(""), BackupStore::new(&env.backup_dir));

    let err = result.unwrap_err();
    assert!(err.to_string().contains("1 app(s) failed"));
    assert!(is_link_to(&env.home.join(".vimrc"), &env.config.root.join("vimrc")));
    assert!(!env.backup_dir.exists(), "a conflicting symlink is never backed up");

    cleanup_test_env();
    Ok(())
}

#[test]
fn test_file_state() -> Result<()> {
    let env = setup_test_env()?;
    let planned = |name: &str, dest: &str| PlannedLink {
        filename: name.to_string(),
        source: env.config.root.join(name),
        dest: env.home.join(dest),
    };

    assert_eq!(file_state(&planned("vimrc", ".vimrc")), FileState::Missing);
    assert_eq!(file_state(&planned("absent", ".absent")), FileState::SourceMissing);

    os_symlink(env.config.root.join("vimrc"), env.home.join(".vimrc"))?;
    assert_eq!(file_state(&planned("vimrc", ".vimrc")), FileState::Linked);

    os_symlink("/etc/hosts", env.home.join(".gitconfig"))?;
    assert_eq!(file_state(&planned("gitconfig", ".gitconfig")), FileState::ForeignLink(PathBuf::from("/etc/hosts")));

    fs::write(env.home.join(".tmux.conf"), "local")?;
    assert_eq!(file_state(&planned("tmux.conf", ".tmux.conf")), FileState::Occupied);

    cleanup_test_env();
    Ok(())
}

#[test]
fn test_status_runs_for_known_apps_and_rejects_unknown() -> Result<()> {
    let env = setup_test_env()?;

    run_status(&env.config, &[], probe_without("git"), &env.backup_dir)?;
    assert!(run_status(&env.config, &["emacs".to_string()], probe_without(""), &env.backup_dir).is_err());

    cleanup_test_env();
    Ok(())
}

#[test]
fn test_status_reports_uninstalled_unknown_app() -> Result<()> {
    let env = setup_test_env()?;

    let apps = vec!["vim".to_string(), "doge".to_string()];
    run_status(&env.config, &apps, probe_without("doge"), &env.backup_dir)?;

    cleanup_test_env();
    Ok(())
}

#[test]
fn test_unlink_removes_links_and_restores_backups() -> Result<()> {
    let env = setup_test_env()?;
    fs::write(env.home.join(".vimrc"), "# old vimrc")?;
    fs::write(env.home.join(".tmux.conf"), "# not ours")?;

    let apps = vec!["vim".to_string(), "git".to_string()];
    run_symlink(&env.config, &apps, false, probe_without(""), BackupStore::new(&env.backup_dir))?;

    let summary = run_unlink(&env.config, &[], &env.backup_dir)?;

    assert_eq!(summary.removed, 2);
    assert_eq!(summary.restored, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(fs::read_to_string(env.home.join(".vimrc"))?, "# old vimrc");
    assert!(fs::symlink_metadata(env.home.join(".gitconfig")).is_err());
    assert_eq!(fs::read_to_string(env.home.join(".tmux.conf"))?, "# not ours");
    assert!(find_all_backup_versions(&env.home.join(".vimrc"), &env.backup_dir)?.is_empty());

    cleanup_test_env();
    Ok(())
}

#[test]
fn test_unlink_restores_the_matching_backup_for_shared_file_names() -> Result<()> {
    let mut env = setup_test_env()?;
    fs::write(env.config.root.join("ignore"), "*.o")?;
    for (app, dir) in [("aa", "a"), ("bb", "b")] {
        let dest = env.home.join(dir).join("ignore");
        fs::create_dir_all(dest.parent().unwrap())?;
        fs::write(&dest, format!("ORIGINAL {}", dir.to_uppercase()))?;

        let mut spec = AppSpec { files: vec!["ignore".to_string()], ..Default::default() };
        spec.dest.insert("ignore".to_string(), dest.display().to_string());
        env.config.apps.insert(app.to_string(), spec);
    }

    let apps = vec!["aa".to_string(), "bb".to_string()];
    let report = run_symlink(&env.config, &apps, false, probe_without(""), BackupStore::new(&env.backup_dir))?;
    assert_eq!(report.backups.len(), 2);

    let summary = run_unlink(&env.config, &["aa".to_string()], &env.backup_dir)?;

    assert_eq!(summary.restored, 1);
    assert_eq!(fs::read_to_string(env.home.join("a/ignore"))?, "ORIGINAL A");
    assert!(is_link_to(&env.home.join("b/ignore"), &env.config.root.join("ignore")));
    let b_versions = find_all_backup_versions(&env.home.join("b/ignore"), &env.backup_dir)?;
    assert_eq!(b_versions.len(), 1);
    assert_eq!(fs::read_to_string(&b_versions[0].1)?, "ORIGINAL B");

    run_unlink(&env.config, &["bb".to_string()], &env.backup_dir)?;
    assert_eq!(fs::read_to_string(env.home.join("b/ignore"))?, "ORIGINAL B");

    cleanup_test_env();
    Ok(())
}

#[test]
fn test_list_and_clear_backups() -> Result<()> {
    let env = setup_test_env()?;

    list_backups(None)?;

    let slot = mirror_path(&env.home.join(".vimrc"), &env.backup_dir)?;
    fs::create_dir_all(slot.parent().unwrap())?;
    fs::write(format!("{}.1678886400", slot.display()), "old")?;
    list_backups(None)?;
    list_backups(Some(Path::new(".vimrc")))?;
    list_backups(Some(&env.home.join(".vimrc")))?;
    list_backups(Some(Path::new(".zshrc")))?;

    clear_backups(true)?;
    assert!(!get_backup_dir()?.exists());
    clear_backups(true)?;

    cleanup_test_env();
    Ok(())
}

#[test]
fn test_init_config() -> Result<()> {
    let env = setup_test_env()?;
    let config_path = env.home.join(".dotfiles-linkerrc.yaml");

    init_config(&config_path, &env.config.root, None)?;

    let config = load_config(&config_path)?;
    assert_eq!(config.root, env.config.root.canonicalize()?);
    assert_eq!(config.dest, env.home);
    assert!(config.apps.is_empty());

    assert!(init_config(&config_path, &env.temp_dir.path().join("missing"), None).is_err());

    cleanup_test_env();
    Ok(())
}
