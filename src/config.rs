//! Configuration management for stencilfmt.
//!
//! [`Config`] holds the five layout options of a run. Values come from, in
//! increasing priority:
//! - `stencilfmt.toml` / `.stencilfmt.toml` in the home directory
//! - the same files in every directory from the filesystem root down to the
//!   template being formatted
//! - command-line flags
//!
//! Each file only overrides the keys it sets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Names looked up in each directory; a dotfile wins over the plain name.
const CONFIG_FILE_NAMES: &[&str] = &["stencilfmt.toml", ".stencilfmt.toml"];

/// `$HOME`, or `%USERPROFILE%` on Windows.
fn home_dir() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .iter()
        .find_map(|var| std::env::var_os(var))
        .map(PathBuf::from)
}

fn default_tab_width() -> usize {
    4
}
fn default_print_width() -> usize {
    80
}

/// Formatting options for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Columns per indentation level (default: 4)
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,

    /// Indent with a tab character instead of spaces (default: false)
    #[serde(default)]
    pub use_tabs: bool,

    /// Width at which logic tags and block bodies wrap (default: 80)
    #[serde(default = "default_print_width")]
    pub print_width: usize,

    /// Re-quote string literals with `'` instead of `"` (default: false)
    #[serde(default)]
    pub single_quote: bool,

    /// Return the laid-out text without the final whitespace pass (default: false)
    #[serde(default)]
    pub preserve_newlines: bool,
}

/// One config file's contents; `None` marks a key the file leaves alone.
#[derive(Debug, Clone, Default, Deserialize)]
struct PartialConfig {
    pub tab_width: Option<usize>,
    pub use_tabs: Option<bool>,
    pub print_width: Option<usize>,
    pub single_quote: Option<bool>,
    pub preserve_newlines: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tab_width: 4,
            use_tabs: false,
            print_width: 80,
            single_quote: false,
            preserve_newlines: false,
        }
    }
}

impl Config {
    const MAX_TAB_WIDTH: usize = 16;
    /// Minimum reasonable print width (must fit at least a short tag)
    const MIN_PRINT_WIDTH: usize = 20;
    const MAX_PRINT_WIDTH: usize = 1000;

    /// Describe the first out-of-range option, if any.
    #[must_use]
    pub fn validate(&self) -> Option<String> {
        if self.tab_width == 0 {
            return Some("tab_width must be at least 1".to_string());
        }
        if self.tab_width > Self::MAX_TAB_WIDTH {
            return Some(format!(
                "tab_width {} exceeds maximum of {}",
                self.tab_width,
                Self::MAX_TAB_WIDTH
            ));
        }
        if self.print_width < Self::MIN_PRINT_WIDTH {
            return Some(format!(
                "print_width {} is below minimum of {}",
                self.print_width,
                Self::MIN_PRINT_WIDTH
            ));
        }
        if self.print_width > Self::MAX_PRINT_WIDTH {
            return Some(format!(
                "print_width {} exceeds maximum of {}",
                self.print_width,
                Self::MAX_PRINT_WIDTH
            ));
        }
        None
    }

    /// Text written for one indentation level.
    #[must_use]
    pub fn indent_unit(&self) -> String {
        if self.use_tabs {
            "\t".to_string()
        } else {
            " ".repeat(self.tab_width)
        }
    }

    /// Quote character used when re-emitting string literals.
    #[must_use]
    pub fn quote_char(&self) -> char {
        if self.single_quote {
            '\''
        } else {
            '"'
        }
    }

    /// Read one config file on top of the defaults.
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::default();
        config.apply_partial(&read_partial(path)?);
        Ok(config)
    }

    fn apply_partial(&mut self, partial: &PartialConfig) {
        if let Some(v) = partial.tab_width {
            self.tab_width = v;
        }
        if let Some(v) = partial.use_tabs {
            self.use_tabs = v;
        }
        if let Some(v) = partial.print_width {
            self.print_width = v;
        }
        if let Some(v) = partial.single_quote {
            self.single_quote = v;
        }
        if let Some(v) = partial.preserve_newlines {
            self.preserve_newlines = v;
        }
    }

    /// Config files that apply to `start_path`, lowest priority first.
    ///
    /// `start_path` may be a template or a directory; a path that does not
    /// exist falls back to the working directory.
    #[must_use]
    pub fn discover_config_files(start_path: &Path) -> Vec<PathBuf> {
        let start_dir = if start_path.is_file() {
            start_path.parent().map(Path::to_path_buf)
        } else if start_path.is_dir() {
            Some(start_path.to_path_buf())
        } else {
            std::env::current_dir().ok()
        };
        let mut ancestors: Vec<PathBuf> = start_dir
            .iter()
            .flat_map(|dir| dir.ancestors().map(Path::to_path_buf))
            .collect();
        ancestors.reverse();

        let mut found: Vec<PathBuf> = Vec::new();
        for dir in home_dir().into_iter().chain(ancestors) {
            for candidate in CONFIG_FILE_NAMES.iter().map(|name| dir.join(name)) {
                if candidate.is_file() && !found.contains(&candidate) {
                    found.push(candidate);
                }
            }
        }
        found
    }

    /// Merge every discovered config file over the defaults.
    ///
    /// A file that cannot be read or parsed is logged and skipped.
    #[must_use]
    pub fn from_discovered_files(start_path: &Path) -> Self {
        let mut config = Self::default();
        for path in Self::discover_config_files(start_path) {
            match read_partial(&path) {
                Ok(partial) => {
                    log::debug!("using config file {}", path.display());
                    config.apply_partial(&partial);
                }
                Err(e) => log::warn!("skipping config file {}: {e}", path.display()),
            }
        }
        config
    }
}

fn read_partial(path: &Path) -> anyhow::Result<PartialConfig> {
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}
