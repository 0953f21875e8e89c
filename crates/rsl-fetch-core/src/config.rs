//! Configuration loading and validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Consecutive non-saving pages that end a run.
pub const DEFAULT_FAILURE_LIMIT: u32 = 5;

/// Page ceiling used by `--all` until the real page count is known.
pub const ALL_PAGES_CEILING: usize = 500;

/// Decoded payloads at or below this size are treated as placeholders.
pub const MIN_IMAGE_BYTES: usize = 5000;

/// Page ceiling when neither `--pages` nor `--all` is given.
pub const DEFAULT_PAGE_LIMIT: usize = 20;

pub const DEFAULT_VIEWER_BASE: &str = "https://viewer.rsl.ru/ru";

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Top-level rsl-fetch configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Path to Chrome/Chromium binary (auto-detected if omitted).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<String>,

    /// Run in headless mode (default: true).
    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Navigation timeout in ms (default: 20000).
    #[serde(default = "default_browser_timeout")]
    pub timeout_ms: u64,

    /// Pause after each page navigation in ms (default: 2000).
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Pause after the first navigation, before reading the description (default: 3000).
    #[serde(default = "default_first_page_settle_ms")]
    pub first_page_settle_ms: u64,

    /// Pause after scrolling the preview sidebar (default: 2000).
    #[serde(default = "default_settle_ms")]
    pub scroll_settle_ms: u64,

    /// Pause after opening the info panel (default: 2000).
    #[serde(default = "default_settle_ms")]
    pub info_click_settle_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            user_agent: default_user_agent(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            timeout_ms: default_browser_timeout(),
            settle_ms: default_settle_ms(),
            first_page_settle_ms: default_first_page_settle_ms(),
            scroll_settle_ms: default_settle_ms(),
            info_click_settle_ms: default_settle_ms(),
        }
    }
}

impl BrowserConfig {
    /// The configured Chrome binary, if it exists on disk. `None` means auto-detect.
    pub fn usable_chrome_path(&self) -> Option<&str> {
        self.chrome_path
            .as_deref()
            .filter(|path| Path::new(path).exists())
    }
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

fn default_viewport_width() -> u32 {
    1920
}

fn default_viewport_height() -> u32 {
    1080
}

fn default_browser_timeout() -> u64 {
    20_000
}

fn default_settle_ms() -> u64 {
    2000
}

fn default_first_page_settle_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Viewer root; the book ID is appended as a path segment.
    #[serde(default = "default_viewer_base")]
    pub viewer_base: String,

    #[serde(default = "default_pages")]
    pub default_pages: usize,

    #[serde(default = "default_all_pages_ceiling")]
    pub all_pages_ceiling: usize,

    #[serde(default = "default_failure_limit")]
    pub failure_limit: u32,

    #[serde(default = "default_min_image_bytes")]
    pub min_image_bytes: usize,

    /// Pause between page iterations in ms (default: 800).
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Directory the book folder is created in (default: current directory).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            viewer_base: default_viewer_base(),
            default_pages: default_pages(),
            all_pages_ceiling: default_all_pages_ceiling(),
            failure_limit: default_failure_limit(),
            min_image_bytes: default_min_image_bytes(),
            page_delay_ms: default_page_delay_ms(),
            output_dir: None,
        }
    }
}

fn default_viewer_base() -> String {
    DEFAULT_VIEWER_BASE.into()
}

fn default_pages() -> usize {
    DEFAULT_PAGE_LIMIT
}

fn default_all_pages_ceiling() -> usize {
    ALL_PAGES_CEILING
}

fn default_failure_limit() -> u32 {
    DEFAULT_FAILURE_LIMIT
}

fn default_min_image_bytes() -> usize {
    MIN_IMAGE_BYTES
}

fn default_page_delay_ms() -> u64 {
    800
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "rsl_fetch_browser=debug").
    #[serde(default)]
    pub filters: Vec<String>,

    /// Output target: "stderr" (default) or "stdout".
    #[serde(default = "default_log_output")]
    pub output: String,
}

fn default_log_format() -> String {
    "plain".into()
}

fn default_log_output() -> String {
    "stderr".into()
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    })
    .into_owned()
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(crate::error::RslFetchError::Io)?;

        // Substitute ${ENV_VAR} references before parsing
        let substituted = substitute_env_vars(&raw);

        let config: Config = json5::from_str(&substituted)
            .map_err(|e| crate::error::RslFetchError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Resolve the default config file path.
    pub fn config_path() -> PathBuf {
        data_dir().join("config.json")
    }

    /// Browser settings, falling back to defaults.
    pub fn browser(&self) -> BrowserConfig {
        self.browser.clone().unwrap_or_default()
    }

    /// Fetch settings, falling back to defaults.
    pub fn fetch(&self) -> FetchConfig {
        self.fetch.clone().unwrap_or_default()
    }

    /// Directory the book folder is created in.
    pub fn output_dir(&self) -> PathBuf {
        self.fetch
            .as_ref()
            .and_then(|f| f.output_dir.as_ref())
            .map(|d| {
                let expanded = shellexpand::tilde(d);
                PathBuf::from(expanded.as_ref())
            })
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Validate config, returning (warnings, errors).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        let browser = self.browser();
        if browser.viewport_width == 0 || browser.viewport_height == 0 {
            errors.push("Browser viewport dimensions cannot be 0".to_string());
        }
        if browser.timeout_ms == 0 {
            errors.push("Browser navigation timeout cannot be 0".to_string());
        }
        if let Some(path) = &browser.chrome_path {
            if browser.usable_chrome_path().is_none() {
                warnings.push(format!("Chrome binary not found at {path}; falling back to auto-detect"));
            }
        }

        let fetch = self.fetch();
        if fetch.failure_limit == 0 {
            errors.push("Fetch failure_limit cannot be 0".to_string());
        }
        if fetch.all_pages_ceiling == 0 {
            errors.push("Fetch all_pages_ceiling cannot be 0".to_string());
        }
        if fetch.default_pages == 0 {
            errors.push("Fetch default_pages cannot be 0".to_string());
        }
        if !fetch.viewer_base.starts_with("http://") && !fetch.viewer_base.starts_with("https://") {
            errors.push(format!(
                "Fetch viewer_base must be an http(s) URL: {}",
                fetch.viewer_base
            ));
        }
        if fetch.min_image_bytes == 0 {
            warnings.push("Fetch min_image_bytes is 0; placeholder images will be saved".to_string());
        }

        (warnings, errors)
    }
}

/// Base directory for rsl-fetch data: `~/.rsl_fetch/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rsl_fetch")
}
