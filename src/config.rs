//! Project configuration module.
//!
//! Handles loading, validating, and merging the `comic.toml` file at the
//! project root. Stock defaults are serialized to a TOML table and the user's
//! file is merged on top, so a project only needs the keys it overrides.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! series = "Untitled Series"
//! issue = 1
//!
//! [metadata]                 # Free-form fields copied into ComicInfo.xml
//! Writer = "Jane Doe"
//!
//! [style]
//! prefix = "Professional comic book illustration, ..."
//! technical = "Portrait orientation, 2:3 aspect ratio, ..."
//!
//! [paths]
//! pages = "pages"            # Page directories (p01, cover, bonus1, ...)
//! assets = "assets"          # Prompt fragments live in assets/prompts/<kind>s/
//! output = "renders/issue_01"
//!
//! [render]
//! model = "nano-banana-pro-preview"
//! poll_interval_secs = 30
//! api_key_env = "GEMINI_API_KEY"
//! api_base = "https://generativelanguage.googleapis.com/v1beta"
//!
//! [page]
//! width = 1325               # Composition canvas in CSS pixels
//! height = 2050
//! ```
//!
//! Unknown keys are rejected to catch typos early, except inside
//! `[metadata]`, which is free-form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "comic.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `comic.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Series title, used for the archive name and ComicInfo `<Series>`.
    pub series: String,
    /// Issue number.
    pub issue: u32,
    /// Extra metadata fields emitted into the packaged metadata document.
    pub metadata: BTreeMap<String, toml::Value>,
    /// Prompt wrapping applied to every resolved panel prompt.
    pub style: StyleConfig,
    /// Project-relative directories.
    pub paths: PathsConfig,
    /// Batch render settings.
    pub render: RenderConfig,
    /// Composition canvas size.
    pub page: PageConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            series: "Untitled Series".to_string(),
            issue: 1,
            metadata: BTreeMap::new(),
            style: StyleConfig::default(),
            paths: PathsConfig::default(),
            render: RenderConfig::default(),
            page: PageConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page.width == 0 || self.page.height == 0 {
            return Err(ConfigError::Validation(
                "page.width and page.height must be non-zero".into(),
            ));
        }
        if self.render.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "render.poll_interval_secs must be non-zero".into(),
            ));
        }
        for (key, value) in [
            ("paths.pages", &self.paths.pages),
            ("paths.assets", &self.paths.assets),
            ("paths.output", &self.paths.output),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }

    pub fn pages_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.paths.pages)
    }

    pub fn assets_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.paths.assets)
    }

    pub fn output_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.paths.output)
    }
}

/// Style prefix and technical suffix wrapped around every prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleConfig {
    pub prefix: String,
    pub technical: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            prefix: "Professional comic book illustration, clean ink lines, high-detail cel \
                     shading, vibrant digital colors."
                .to_string(),
            technical: "Portrait orientation, 2:3 aspect ratio, 6.625 x 10.25 inch comic book \
                        page layout, narrative storytelling, dramatic lighting, clear character \
                        silhouette."
                .to_string(),
        }
    }
}

/// Project-relative paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub pages: String,
    pub assets: String,
    pub output: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            pages: "pages".to_string(),
            assets: "assets".to_string(),
            output: "renders/issue_01".to_string(),
        }
    }
}

/// Batch render settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Model used when `render --model` is not given.
    pub model: String,
    /// Fixed wait between job status checks.
    pub poll_interval_secs: u64,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Base URL of the generation API.
    pub api_base: String,
}

impl RenderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            model: "nano-banana-pro-preview".to_string(),
            poll_interval_secs: 30,
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

/// Composition canvas in CSS pixels (6.625 x 10.25 inches at 200 px/in).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            width: 1325,
            height: 2050,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ProjectConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `comic.toml` from the project root as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load the project config, falling back to stock defaults when no file exists.
pub fn load_config(root: &Path) -> Result<ProjectConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: ProjectConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Render a metadata value as plain text (strings unquoted).
pub fn metadata_text(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Returns a fully-commented stock `comic.toml`.
///
/// Written by `init` and printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# Comic Factory Project Configuration
# ===================================
# All settings are optional. Values shown below are the defaults.
# Unknown keys cause an error (except inside [metadata]).

series = "Untitled Series"
issue = 1

# ---------------------------------------------------------------------------
# Free-form metadata, copied verbatim into ComicInfo.xml when packaging.
# ---------------------------------------------------------------------------
[metadata]
# Writer = "Jane Doe"
# Penciller = "Nano Banana"

# ---------------------------------------------------------------------------
# Prompt style: every panel prompt becomes "<prefix> <prompt> <technical>".
# ---------------------------------------------------------------------------
[style]
prefix = "Professional comic book illustration, clean ink lines, high-detail cel shading, vibrant digital colors."
technical = "Portrait orientation, 2:3 aspect ratio, 6.625 x 10.25 inch comic book page layout, narrative storytelling, dramatic lighting, clear character silhouette."

# ---------------------------------------------------------------------------
# Paths, relative to the project root.
# ---------------------------------------------------------------------------
[paths]
pages = "pages"
assets = "assets"
output = "renders/issue_01"

# ---------------------------------------------------------------------------
# Batch rendering
# ---------------------------------------------------------------------------
[render]
model = "nano-banana-pro-preview"
# Seconds between job status checks.
poll_interval_secs = 30
# Environment variable holding the API key.
api_key_env = "GEMINI_API_KEY"
api_base = "https://generativelanguage.googleapis.com/v1beta"

# ---------------------------------------------------------------------------
# Composition canvas (CSS pixels)
# ---------------------------------------------------------------------------
[page]
width = 1325
height = 2050
"##
}
