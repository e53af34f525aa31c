//! Generator configuration.
//!
//! Handles loading, validating, and merging the generator's `config.toml`.
//! Stock defaults are the base layer; a user file overrides only the keys it
//! names, and unknown keys are rejected to catch typos early.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! disabled = false          # Skip every build (logged, not an error)
//! profiles = []             # Deployment profiles; "cloud" enables commit + push
//!
//! [api]
//! uri = "http://localhost:8080"
//! username = ""
//! password = ""             # Prefer PODCAST_SITE_API_PASSWORD
//! timeout_secs = 30
//!
//! [output]
//! items = "build/items"     # Final item staging (bundle)
//! pages = "build/pages"     # Page staging
//! git_clone = "build/site"  # Version-controlled publish clone
//!
//! [templates]
//! static_assets = "static"
//! # page_chrome = "templates/index.html"
//! # year = "templates/year.html"
//! # default_episode_photo = "static/assets/images/default.jpg"
//!
//! [sql]
//! database = "podcasts.db"
//! load_podcasts = "SELECT ... FROM podcast"
//!
//! [processing]
//! max_processes = 4         # Artwork download workers (omit for auto = CPU cores)
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Profile name that turns a build into a publishing build.
pub const PUBLISH_PROFILE: &str = "cloud";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Generator configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Administrative kill switch. A disabled build is a logged no-op.
    pub disabled: bool,
    /// Active deployment profiles.
    pub profiles: Vec<String>,
    /// Remote API holding artwork and produced audio.
    pub api: ApiConfig,
    /// Output directory tree.
    pub output: OutputConfig,
    /// Page templates and bundled assets.
    pub templates: TemplatesConfig,
    /// Record store connection and queries.
    pub sql: SqlConfig,
    /// Parallel artwork acquisition settings.
    pub processing: ProcessingConfig,
}

impl SiteConfig {
    /// Validate config values are usable before a build starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let uri = self.api.uri.trim();
        if !(uri.starts_with("http://") || uri.starts_with("https://")) {
            return Err(ConfigError::Validation(
                "api.uri must be an http(s) URL".into(),
            ));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "api.timeout_secs must be non-zero".into(),
            ));
        }
        let dirs = [
            ("output.items", &self.output.items),
            ("output.pages", &self.output.pages),
            ("output.git_clone", &self.output.git_clone),
        ];
        for (key, dir) in dirs {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if self.output.items == self.output.pages
            || self.output.items == self.output.git_clone
            || self.output.pages == self.output.git_clone
        {
            return Err(ConfigError::Validation(
                "output.items, output.pages and output.git_clone must be distinct".into(),
            ));
        }
        if self.sql.load_podcasts.trim().is_empty() {
            return Err(ConfigError::Validation(
                "sql.load_podcasts must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Whether the active profiles ask for the output to be committed and pushed.
    pub fn publish_enabled(&self) -> bool {
        self.profiles
            .iter()
            .any(|p| p.eq_ignore_ascii_case(PUBLISH_PROFILE))
    }

    /// Base URI of the remote API without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.api.uri.trim().trim_end_matches('/')
    }
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    /// Per-request timeout for token and artwork calls.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:8080".to_string(),
            username: String::new(),
            password: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Output directory tree.
///
/// `pages` and `items` are reset at the start of every build; `git_clone`
/// keeps only its `.git` metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub items: PathBuf,
    pub pages: PathBuf,
    pub git_clone: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            items: PathBuf::from("build/items"),
            pages: PathBuf::from("build/pages"),
            git_clone: PathBuf::from("build/site"),
        }
    }
}

/// Template and asset locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Index page template. The builtin chrome is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_chrome: Option<PathBuf>,
    /// Per-year page template. The builtin year page is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<PathBuf>,
    /// Directory copied verbatim into the published bundle.
    pub static_assets: PathBuf,
    /// Replacement for the bundled default episode artwork.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_episode_photo: Option<PathBuf>,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            page_chrome: None,
            year: None,
            static_assets: PathBuf::from("static"),
            default_episode_photo: None,
        }
    }
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SqlConfig {
    /// SQLite database file.
    pub database: PathBuf,
    /// Query returning one row per episode. Columns are mapped by name.
    pub load_podcasts: String,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("podcasts.db"),
            load_podcasts: DEFAULT_LOAD_PODCASTS.to_string(),
        }
    }
}

const DEFAULT_LOAD_PODCASTS: &str = "SELECT id, uid, title, date, description, notes, \
     transcript, podbean_media_uri, podbean_photo_uri FROM podcast";

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel artwork workers.
    /// When absent, defaults to the number of CPU cores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, never less than one
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
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

/// Load config from the given file, merged over stock defaults.
///
/// A missing file yields the stock defaults. The result is validated.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = if path.exists() {
        let content = fs::read_to_string(path)?;
        let overlay: toml::Value = toml::from_str(&content)?;
        merge_toml(base, overlay)
    } else {
        base
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Podcast Site Generator Configuration
# =====================================
# Every key is optional; the values below are the defaults.

# Skip every build. The generator logs and exits cleanly.
disabled = false

# Deployment profiles. Include "cloud" to commit and push the generated site.
profiles = []

[api]
# Base URI of the podcast API (token, artwork, produced audio).
uri = "http://localhost:8080"
username = ""
# Prefer the PODCAST_SITE_API_PASSWORD environment variable.
password = ""
# Per-request timeout in seconds.
timeout_secs = 30

[output]
# Final item staging: static assets plus staged pages, copied into the clone.
items = "build/items"
# Page staging: podcasts.json, index.html, year pages, episode-photos/.
pages = "build/pages"
# Working copy of the site repository. Everything except .git is replaced.
git_clone = "build/site"

[templates]
# Directory copied verbatim into the published site.
static_assets = "static"
# Optional upon templates. The builtin pages are used when omitted.
# page_chrome = "templates/index.html"
# year = "templates/year.html"
# Optional replacement for the bundled default episode artwork.
# default_episode_photo = "static/assets/images/default.jpg"

[sql]
# SQLite database holding the podcast table.
database = "podcasts.db"
# Columns are mapped by name: id, uid, title, date (epoch ms), description,
# notes, transcript, podbean_media_uri, podbean_photo_uri.
load_podcasts = "SELECT id, uid, title, date, description, notes, transcript, podbean_media_uri, podbean_photo_uri FROM podcast"

[processing]
# Maximum parallel artwork downloads (omit for auto = CPU cores).
# max_processes = 4
"##
}
