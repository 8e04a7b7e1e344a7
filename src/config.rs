use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// What the filter blocks. Resolved once when the filter is built and
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlockConfig {
    /// Cancel every update-check request outright.
    pub all: bool,
    /// Answer core-platform update checks with an empty result.
    pub core: bool,
    /// Marker filenames whose presence in an item's install directory marks
    /// it as a development checkout and blocks its updates.
    pub files: Vec<String>,
    /// Plugin identifiers (`dir/file.php`) to block explicitly.
    pub plugins: HashSet<String>,
    /// Theme slugs to block explicitly.
    pub themes: HashSet<String>,
}

impl Default for BlockConfig {
    fn default() -> Self {
        BlockConfig {
            all: false,
            core: false,
            files: vec![".git".into(), ".svn".into(), ".hg".into()],
            plugins: HashSet::new(),
            themes: HashSet::new(),
        }
    }
}

/// Where the host keeps installed plugins and themes. Identifiers resolve to
/// install directories relative to these roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    pub plugins_root: PathBuf,
    pub themes_root: PathBuf,
}

impl InstallPaths {
    pub fn new(plugins_root: impl Into<PathBuf>, themes_root: impl Into<PathBuf>) -> Self {
        InstallPaths {
            plugins_root: plugins_root.into(),
            themes_root: themes_root.into(),
        }
    }

    /// Install directory of a plugin identified as `dir/file.php`.
    ///
    /// Single-file plugins (`hello.php`) live directly in the plugins root
    /// and have no directory of their own; marker probes do not apply to
    /// them, so this returns `None`.
    pub fn plugin_dir(&self, identifier: &str) -> Option<PathBuf> {
        let dir = Path::new(identifier).parent()?;
        if dir.as_os_str().is_empty() {
            return None;
        }
        Some(self.plugins_root.join(dir))
    }

    /// Install directory of a theme identified by slug.
    pub fn theme_dir(&self, slug: &str) -> PathBuf {
        self.themes_root.join(slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BlockConfig::default();
        assert!(!config.all);
        assert!(!config.core);
        assert_eq!(config.files, vec![".git", ".svn", ".hg"]);
        assert!(config.plugins.is_empty());
        assert!(config.themes.is_empty());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: BlockConfig =
            serde_json::from_str(r#"{ "plugins": ["foo/foo.php"] }"#).unwrap();
        assert!(!config.all);
        assert_eq!(config.files, vec![".git", ".svn", ".hg"]);
        assert!(config.plugins.contains("foo/foo.php"));
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        assert!(serde_json::from_str::<BlockConfig>(r#"{ "blocked": true }"#).is_err());
    }

    #[test]
    fn test_plugin_dir() {
        let paths = InstallPaths::new("/srv/wp-content/plugins", "/srv/wp-content/themes");
        assert_eq!(
            paths.plugin_dir("foo/foo.php").unwrap(),
            PathBuf::from("/srv/wp-content/plugins/foo")
        );
        assert!(paths.plugin_dir("hello.php").is_none());
    }

    #[test]
    fn test_theme_dir() {
        let paths = InstallPaths::new("/p", "/t");
        assert_eq!(paths.theme_dir("twentyfourteen"), PathBuf::from("/t/twentyfourteen"));
    }
}
