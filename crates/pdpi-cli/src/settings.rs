//! Settings discovery shared by all commands

use anyhow::{Context, Result};
use pdpi_core::config::SETTINGS_FILE_NAME;
use pdpi_core::{InstallLayout, Settings};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::args::Args;

/// Settings together with the file they came from
#[derive(Debug, Clone, Default)]
pub struct LoadedSettings {
    /// Parsed settings (defaults when no file was found)
    pub settings: Settings,
    /// File the settings were read from
    pub source: Option<PathBuf>,
}

impl LoadedSettings {
    /// Installation layout: `--root`, then `paths.root`, then the
    /// directory of the executable
    pub fn layout(&self, args: &Args) -> InstallLayout {
        let root = args
            .root
            .clone()
            .or_else(|| self.settings.paths.root.as_ref().map(PathBuf::from))
            .unwrap_or_else(InstallLayout::executable_dir);
        InstallLayout::with_paths(root, &self.settings.paths)
    }
}

/// Root used for locating the settings file itself
fn lookup_root(args: &Args) -> PathBuf {
    args.root.clone().unwrap_or_else(InstallLayout::executable_dir)
}

/// Candidate settings files, in search order
pub fn search_paths(args: &Args) -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SETTINGS_FILE_NAME)];
    paths.push(InstallLayout::from_root(lookup_root(args)).config_dir().join(SETTINGS_FILE_NAME));
    if let Some(dir) = user_config_dir() {
        paths.push(dir.join(SETTINGS_FILE_NAME));
    }
    paths
}

/// Per-user configuration directory
pub fn user_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "penguin-dpi").map(|d| d.config_dir().to_path_buf())
}

/// First existing settings file: `--config`, then the search paths
pub fn find_config_file(args: &Args) -> Option<PathBuf> {
    if let Some(path) = &args.config {
        return Some(path.clone());
    }
    search_paths(args).into_iter().find(|p| p.is_file())
}

/// Load settings; an explicit `--config` must exist, otherwise defaults apply
pub fn load(args: &Args) -> Result<LoadedSettings> {
    match find_config_file(args) {
        Some(path) => load_file(&path),
        None => {
            debug!("No settings file found, using defaults");
            Ok(LoadedSettings::default())
        }
    }
}

/// Load and validate one settings file
pub fn load_file(path: &Path) -> Result<LoadedSettings> {
    let settings = Settings::load(path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    settings
        .validate()
        .with_context(|| format!("Invalid settings in {}", path.display()))?;
    debug!(path = %path.display(), "Loaded settings");
    Ok(LoadedSettings {
        settings,
        source: Some(path.to_path_buf()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_explicit_config_must_exist() {
        let args = Args::parse_from(["penguin-dpi", "-c", "/nonexistent/penguin-dpi.toml", "list"]);
        assert!(load(&args).is_err());
    }

    #[test]
    fn test_settings_from_root_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::from_root(dir.path());
        std::fs::create_dir_all(layout.config_dir()).unwrap();
        std::fs::write(
            layout.config_dir().join(SETTINGS_FILE_NAME),
            "[supervisor]\ndefault_strategy = 3\n",
        )
        .unwrap();

        let root = dir.path().display().to_string();
        let args = Args::parse_from(["penguin-dpi", "--root", root.as_str(), "list"]);
        let paths = search_paths(&args);
        assert_eq!(paths[1], layout.config_dir().join(SETTINGS_FILE_NAME));

        let loaded = load_file(&paths[1]).unwrap();
        assert_eq!(loaded.settings.supervisor.default_strategy, 3);
        assert_eq!(loaded.layout(&args), layout);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[supervisor]\nmonitor_interval_secs = 0\n").unwrap();
        assert!(load_file(&path).is_err());
    }

    #[test]
    fn test_layout_prefers_cli_root() {
        let mut loaded = LoadedSettings::default();
        loaded.settings.paths.root = Some("/from/settings".into());

        let args = Args::parse_from(["penguin-dpi", "list"]);
        assert_eq!(loaded.layout(&args).root(), Path::new("/from/settings"));

        let args = Args::parse_from(["penguin-dpi", "--root", "/from/cli", "list"]);
        assert_eq!(loaded.layout(&args).root(), Path::new("/from/cli"));
    }
}
