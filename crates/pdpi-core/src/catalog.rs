//! Strategy catalog
//!
//! One `.ini` file describes one strategy:
//!
//! ```text
//! [General (ALT)]
//! executable = {ZAPRET}\winws.exe
//! args = --wf-tcp=80,443;
//!     --filter-tcp=443 --hostlist={BLACKLIST}\list-general.txt;
//!     --dpi-desync=fake,split2
//! ```
//!
//! Everything after `args` is one argument line: continuation lines are
//! concatenated and `;` separators become spaces. Files that do not yield
//! both an executable and arguments are skipped.

use crate::error::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// File extension of strategy definition files
pub const STRATEGY_FILE_EXTENSION: &str = "ini";

/// Name used when a file has no `[Name]` line
pub const UNNAMED_STRATEGY: &str = "Unknown";

/// One selectable strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyProfile {
    /// Display name
    pub name: String,
    /// Executable template (may contain placeholder tokens)
    pub executable: String,
    /// Argument template (may contain placeholder tokens)
    pub args: String,
    /// File the profile was read from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl StrategyProfile {
    /// Create a profile directly
    pub fn new(
        name: impl Into<String>,
        executable: impl Into<String>,
        args: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            args: args.into(),
            source: None,
        }
    }

    /// Parse the contents of one strategy file
    ///
    /// `origin` only labels the error when the file is incomplete.
    pub fn parse(origin: &str, content: &str) -> Result<Self> {
        let mut name = UNNAMED_STRATEGY.to_string();
        let mut executable = String::new();
        let mut args = String::new();
        let mut in_args = false;

        for line in content.lines() {
            let line = line.trim();

            if line.len() >= 2 && line.starts_with('[') && line.ends_with(']') {
                name = line[1..line.len() - 1].to_string();
            } else if let Some(value) = line
                .strip_prefix("executable")
                .and_then(|_| value_after_eq(line))
            {
                executable = value.to_string();
            } else if line.starts_with("args") {
                in_args = true;
                if let Some(value) = value_after_eq(line) {
                    args.push_str(value);
                }
            } else if in_args && !line.is_empty() {
                args.push_str(line);
            }
        }

        let args = args.replace(';', " ").trim().to_string();

        match (executable.is_empty(), args.is_empty()) {
            (false, false) => Ok(Self {
                name,
                executable,
                args,
                source: None,
            }),
            (true, _) => Err(Error::config_parse(origin, "missing 'executable=' value")),
            (false, true) => Err(Error::config_parse(origin, "missing 'args=' value")),
        }
    }

    /// Read and parse one strategy file
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let content = String::from_utf8_lossy(&bytes);
        let mut profile = Self::parse(&path.display().to_string(), &content)?;
        profile.source = Some(path.to_path_buf());
        Ok(profile)
    }
}

/// Trimmed text after the first `=`, if the line has one
fn value_after_eq(line: &str) -> Option<&str> {
    line.split_once('=').map(|(_, value)| value.trim())
}

/// Ordered, immutable set of strategies
///
/// Rebuilt in full on every load and shared as `Arc<StrategyCatalog>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StrategyCatalog {
    profiles: Vec<StrategyProfile>,
}

impl StrategyCatalog {
    /// Load every `*.ini` file in `dir` (not recursive), sorted by file name
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| Error::StrategiesDir {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|path| is_strategy_file(path))
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut profiles = Vec::with_capacity(files.len());
        for path in files {
            match StrategyProfile::from_file(&path) {
                Ok(profile) => {
                    debug!(name = %profile.name, file = %path.display(), "Loaded strategy");
                    profiles.push(profile);
                }
                Err(e @ Error::ConfigParse { .. }) => debug!("{e}"),
                Err(e) => warn!(file = %path.display(), error = %e, "Failed to read strategy file"),
            }
        }

        info!(count = profiles.len(), dir = %dir.display(), "Loaded strategy catalog");
        Ok(Self { profiles })
    }

    /// Build a catalog from already parsed profiles, keeping their order
    pub fn from_profiles(profiles: Vec<StrategyProfile>) -> Self {
        Self { profiles }
    }

    /// Wrap in an `Arc` for sharing
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Profile at `index`
    pub fn get(&self, index: usize) -> Option<&StrategyProfile> {
        self.profiles.get(index)
    }

    /// Profile at `index`, or `InvalidIndex`
    pub fn require(&self, index: usize) -> Result<&StrategyProfile> {
        self.get(index).ok_or(Error::InvalidIndex {
            index,
            len: self.len(),
        })
    }

    /// Number of strategies
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the catalog has no strategies
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Iterate profiles in catalog order
    pub fn iter(&self) -> std::slice::Iter<'_, StrategyProfile> {
        self.profiles.iter()
    }

    /// Display names in catalog order
    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }

    /// Index of the first strategy named `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.profiles.iter().position(|p| p.name == name)
    }

    /// `index` if valid, otherwise 0
    pub fn clamp_index(&self, index: usize) -> usize {
        if index < self.len() {
            index
        } else {
            0
        }
    }
}

impl<'a> IntoIterator for &'a StrategyCatalog {
    type Item = &'a StrategyProfile;
    type IntoIter = std::slice::Iter<'a, StrategyProfile>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn is_strategy_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(STRATEGY_FILE_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let content = "[General]\nexecutable = {ZAPRET}\\winws.exe\nargs = --wf-tcp=80,443\n";
        let profile = StrategyProfile::parse("general.ini", content).unwrap();
        assert_eq!(profile.name, "General");
        assert_eq!(profile.executable, "{ZAPRET}\\winws.exe");
        assert_eq!(profile.args, "--wf-tcp=80,443");
    }

    #[test]
    fn test_parse_multiline_args() {
        let content = "\
[Discord]
executable=winws.exe
args=--wf-udp=443;
  --filter-udp=443 --hostlist=list.txt;

  --dpi-desync=fake
";
        let profile = StrategyProfile::parse("discord.ini", content).unwrap();
        assert_eq!(
            profile.args,
            "--wf-udp=443 --filter-udp=443 --hostlist=list.txt --dpi-desync=fake"
        );
    }

    #[test]
    fn test_parse_continuation_concatenates_without_separator() {
        let content = "executable=a.exe\nargs=--one\n--two\n";
        let profile = StrategyProfile::parse("x.ini", content).unwrap();
        assert_eq!(profile.args, "--one--two");
    }

    #[test]
    fn test_parse_last_name_wins() {
        let content = "[First]\n[Second]\nexecutable=a.exe\nargs=--x\n";
        let profile = StrategyProfile::parse("x.ini", content).unwrap();
        assert_eq!(profile.name, "Second");
    }

    #[test]
    fn test_parse_default_name() {
        let profile = StrategyProfile::parse("x.ini", "executable=a.exe\nargs=--x").unwrap();
        assert_eq!(profile.name, UNNAMED_STRATEGY);
    }

    #[test]
    fn test_parse_args_key_without_value() {
        let content = "executable=a.exe\nargs\n--first;\n--second\n";
        let profile = StrategyProfile::parse("x.ini", content).unwrap();
        assert_eq!(profile.args, "--first --second");
    }

    #[test]
    fn test_parse_value_keeps_later_equals() {
        let content = "executable = C:\\a=b\\winws.exe\nargs = --hostlist=x.txt\n";
        let profile = StrategyProfile::parse("x.ini", content).unwrap();
        assert_eq!(profile.executable, "C:\\a=b\\winws.exe");
        assert_eq!(profile.args, "--hostlist=x.txt");
    }

    #[test]
    fn test_parse_missing_executable() {
        let err = StrategyProfile::parse("bad.ini", "[Bad]\nargs=--x\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_missing_args() {
        let err = StrategyProfile::parse("bad.ini", "[Bad]\nexecutable=a.exe\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_args_only_separators() {
        let err = StrategyProfile::parse("bad.ini", "executable=a.exe\nargs=;;;\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = StrategyCatalog::from_profiles(vec![
            StrategyProfile::new("A", "exe1", "args1"),
            StrategyProfile::new("B", "exe2", "args2"),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(1).unwrap().executable, "exe2");
        assert_eq!(catalog.position("B"), Some(1));
        assert_eq!(catalog.position("C"), None);
        assert_eq!(catalog.names(), vec!["A", "B"]);
        assert!(matches!(
            catalog.require(2),
            Err(Error::InvalidIndex { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_clamp_index() {
        let catalog = StrategyCatalog::from_profiles(vec![StrategyProfile::new("A", "e", "a")]);
        assert_eq!(catalog.clamp_index(0), 0);
        assert_eq!(catalog.clamp_index(5), 0);
        assert_eq!(StrategyCatalog::default().clamp_index(3), 0);
    }
}
