//! Installation layout and placeholder expansion
//!
//! Strategy files refer to the bundled tool and list directories through
//! symbolic tokens so the same files work wherever the program is unpacked.

use crate::config::PathsConfig;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};

/// Token expanded to the tool (winws) directory
pub const TOOL_DIR_TOKEN: &str = "{ZAPRET}";
/// Token expanded to the blacklist directory
pub const BLACKLIST_DIR_TOKEN: &str = "{BLACKLIST}";

/// Absolute directories derived from the installation root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
    program_dir: PathBuf,
    tool_dir: PathBuf,
    blacklist_dir: PathBuf,
    strategies_dir: PathBuf,
    config_dir: PathBuf,
}

impl InstallLayout {
    /// Build the default layout under `root`
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        Self::with_paths(root, &PathsConfig::default())
    }

    /// Build a layout under `root` using the directory names from `paths`
    pub fn with_paths(root: impl Into<PathBuf>, paths: &PathsConfig) -> Self {
        let root = root.into();
        let program_dir = root.join(&paths.program_dir);
        Self {
            tool_dir: program_dir.join(&paths.tool_dir),
            blacklist_dir: program_dir.join(&paths.blacklist_dir),
            strategies_dir: program_dir.join(&paths.strategies_dir),
            config_dir: program_dir.join(&paths.config_dir),
            program_dir,
            root,
        }
    }

    /// Layout rooted at the directory of the running executable
    pub fn discover() -> Self {
        Self::from_root(Self::executable_dir())
    }

    /// Directory containing the running executable, or `.` when unknown
    pub fn executable_dir() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Installation root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `Program` directory under the root
    pub fn program_dir(&self) -> &Path {
        &self.program_dir
    }

    /// Directory holding the strategy executable; also its working directory
    pub fn tool_dir(&self) -> &Path {
        &self.tool_dir
    }

    /// Directory holding host lists and IP sets
    pub fn blacklist_dir(&self) -> &Path {
        &self.blacklist_dir
    }

    /// Directory scanned for strategy definition files
    pub fn strategies_dir(&self) -> &Path {
        &self.strategies_dir
    }

    /// Directory holding bundled configuration
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

/// Expands placeholder tokens in executable and argument templates
///
/// The replacement table and its regex are computed once; `resolve` is a
/// single pass and takes `&self`, so one resolver can be shared freely.
#[derive(Debug, Clone)]
pub struct PathResolver {
    replacements: Vec<(&'static str, String)>,
    pattern: Regex,
}

impl PathResolver {
    /// Create a resolver for the given layout
    pub fn new(layout: &InstallLayout) -> Self {
        let replacements = vec![
            (TOOL_DIR_TOKEN, layout.tool_dir().display().to_string()),
            (BLACKLIST_DIR_TOKEN, layout.blacklist_dir().display().to_string()),
        ];

        let alternation = replacements
            .iter()
            .map(|(token, _)| regex::escape(token))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&alternation).expect("escaped literal alternation is a valid regex");

        Self {
            replacements,
            pattern,
        }
    }

    /// Replace every known token in `template`; other text is unchanged
    pub fn resolve(&self, template: &str) -> String {
        self.pattern
            .replace_all(template, |caps: &Captures<'_>| {
                let token = &caps[0];
                self.replacements
                    .iter()
                    .find(|(t, _)| *t == token)
                    .map_or_else(|| token.to_string(), |(_, value)| value.clone())
            })
            .into_owned()
    }

    /// Token and expansion pairs this resolver applies
    pub fn replacements(&self) -> impl Iterator<Item = (&str, &str)> {
        self.replacements
            .iter()
            .map(|(token, value)| (*token, value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> InstallLayout {
        InstallLayout::from_root("/opt/penguin")
    }

    #[test]
    fn test_layout_directories() {
        let layout = layout();
        let program = Path::new("/opt/penguin").join("Program");
        assert_eq!(layout.program_dir(), program);
        assert_eq!(layout.tool_dir(), program.join("Zapret"));
        assert_eq!(layout.blacklist_dir(), program.join("Blacklist"));
        assert_eq!(layout.strategies_dir(), program.join("Strateg"));
        assert_eq!(layout.config_dir(), program.join("Config"));
    }

    #[test]
    fn test_layout_custom_names() {
        let paths = PathsConfig {
            strategies_dir: "profiles".to_string(),
            ..PathsConfig::default()
        };
        let layout = InstallLayout::with_paths("/srv", &paths);
        assert_eq!(layout.strategies_dir(), Path::new("/srv").join("Program").join("profiles"));
    }

    #[test]
    fn test_resolve_tokens() {
        let resolver = PathResolver::new(&layout());
        let tool = layout().tool_dir().display().to_string();
        let lists = layout().blacklist_dir().display().to_string();

        assert_eq!(resolver.resolve("{ZAPRET}/winws.exe"), format!("{tool}/winws.exe"));
        assert_eq!(
            resolver.resolve("--hostlist={BLACKLIST}/a.txt --ipset={BLACKLIST}/b.txt"),
            format!("--hostlist={lists}/a.txt --ipset={lists}/b.txt")
        );
    }

    #[test]
    fn test_resolve_passthrough() {
        let resolver = PathResolver::new(&layout());
        assert_eq!(resolver.resolve("--wf-tcp=80,443"), "--wf-tcp=80,443");
        assert_eq!(resolver.resolve("{UNKNOWN}/x"), "{UNKNOWN}/x");
        assert_eq!(resolver.resolve("{zapret}"), "{zapret}");
        assert_eq!(resolver.resolve(""), "");
    }

    #[test]
    fn test_resolve_is_single_pass() {
        // A replacement value containing a token must not be expanded again.
        let layout = InstallLayout::from_root("/{BLACKLIST}");
        let resolver = PathResolver::new(&layout);
        let resolved = resolver.resolve("{ZAPRET}");
        assert_eq!(resolved, layout.tool_dir().display().to_string());
    }

    #[test]
    fn test_replacements() {
        let layout = layout();
        let resolver = PathResolver::new(&layout);
        let tool = layout.tool_dir().display().to_string();
        let lists = layout.blacklist_dir().display().to_string();
        let pairs: Vec<_> = resolver.replacements().collect();
        assert_eq!(
            pairs,
            vec![(TOOL_DIR_TOKEN, tool.as_str()), (BLACKLIST_DIR_TOKEN, lists.as_str())]
        );
    }
}
