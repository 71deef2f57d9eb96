//! Application configuration for Broadsheet.
//!
//! User config lives at `~/.broadsheet/broadsheet.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BroadsheetError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "broadsheet.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".broadsheet";

/// Retention never deletes the newest two dated directories.
pub const MIN_KEEP_ISSUES: usize = 2;

// ---------------------------------------------------------------------------
// Config structs (matching broadsheet.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Content API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Archive directory settings.
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Edition resolution settings.
    #[serde(default)]
    pub edition: EditionConfig,

    /// Book ordering.
    #[serde(default)]
    pub books: BooksConfig,
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Content API root; `/search` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Maximum records requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Pause before every page request after the first.
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,

    /// Per-request timeout.
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,

    /// Record fields requested with `show-fields`.
    #[serde(default = "default_show_fields")]
    pub show_fields: Vec<String>,

    /// Tag categories requested with `show-tags`.
    #[serde(default = "default_show_tags")]
    pub show_tags: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay(),
            timeout_secs: default_api_timeout(),
            show_fields: default_show_fields(),
            show_tags: default_show_tags(),
        }
    }
}

fn default_base_url() -> String {
    "https://content.guardianapis.com".into()
}
fn default_api_key_env() -> String {
    "GUARDIAN_API_KEY".into()
}
fn default_page_size() -> u32 {
    200
}
fn default_page_delay() -> u64 {
    1000
}
fn default_api_timeout() -> u64 {
    20
}
fn default_show_fields() -> Vec<String> {
    [
        "body",
        "byline",
        "headline",
        "newspaperPageNumber",
        "publication",
        "shortUrl",
        "standfirst",
        "thumbnail",
        "wordcount",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_show_tags() -> Vec<String> {
    ["newspaper-book-section", "newspaper-book", "tone"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// `[archive]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Root holding one `YYYY-MM-DD` directory per issue.
    #[serde(default = "default_archive_dir")]
    pub dir: String,

    /// How many dated directories survive retention (at least two).
    #[serde(default = "default_keep_issues")]
    pub keep_issues: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dir: default_archive_dir(),
            keep_issues: default_keep_issues(),
        }
    }
}

fn default_archive_dir() -> String {
    "~/broadsheet-archive".into()
}
fn default_keep_issues() -> usize {
    MIN_KEEP_ISSUES
}

/// How the edition date is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    /// Trust the process clock.
    Clock,
    /// Cross-check the clock against the date printed on the edition's contents page.
    Scrape,
}

impl std::str::FromStr for Resolution {
    type Err = BroadsheetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "clock" => Ok(Self::Clock),
            "scrape" => Ok(Self::Scrape),
            other => Err(BroadsheetError::config(format!(
                "unknown resolution '{other}': expected 'clock' or 'scrape'"
            ))),
        }
    }
}

/// `[edition]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditionConfig {
    /// Edition resolution strategy.
    #[serde(default = "default_resolution")]
    pub resolution: Resolution,

    /// Offset of the publication's civil time from UTC, in minutes.
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// `paper_name` written for the standard (Monday–Saturday) edition.
    #[serde(default = "default_standard_paper")]
    pub standard_paper: String,

    /// `paper_name` written for the secondary (Sunday) edition.
    #[serde(default = "default_secondary_paper")]
    pub secondary_paper: String,

    /// Contents page of the current standard edition.
    #[serde(default = "default_standard_reference")]
    pub standard_reference_url: String,

    /// Contents page of the current secondary edition.
    #[serde(default = "default_secondary_reference")]
    pub secondary_reference_url: String,

    /// CSS selector for the printed date on a contents page.
    #[serde(default = "default_date_selector")]
    pub printed_date_selector: String,

    /// Timeout for reference page requests.
    #[serde(default = "default_reference_timeout")]
    pub reference_timeout_secs: u64,
}

impl Default for EditionConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            utc_offset_minutes: 0,
            standard_paper: default_standard_paper(),
            secondary_paper: default_secondary_paper(),
            standard_reference_url: default_standard_reference(),
            secondary_reference_url: default_secondary_reference(),
            printed_date_selector: default_date_selector(),
            reference_timeout_secs: default_reference_timeout(),
        }
    }
}

fn default_resolution() -> Resolution {
    Resolution::Clock
}
fn default_standard_paper() -> String {
    "guardian".into()
}
fn default_secondary_paper() -> String {
    "observer".into()
}
fn default_standard_reference() -> String {
    "https://www.theguardian.com/theguardian".into()
}
fn default_secondary_reference() -> String {
    "https://www.theguardian.com/theobserver".into()
}
fn default_date_selector() -> String {
    "div.fc-container__header__description".into()
}
fn default_reference_timeout() -> u64 {
    10
}

/// `[books]` section: the known books of each day's paper, in reading order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BooksConfig {
    /// Monday to Friday.
    #[serde(default = "default_weekday_books")]
    pub weekday: Vec<String>,

    /// Saturday's heavier paper.
    #[serde(default = "default_saturday_books")]
    pub saturday: Vec<String>,

    /// Sunday's secondary edition.
    #[serde(default = "default_sunday_books")]
    pub sunday: Vec<String>,

    /// Book always placed last in a standard edition.
    #[serde(default = "default_standard_trailing")]
    pub standard_trailing: String,

    /// Book always placed last in a secondary edition.
    #[serde(default = "default_secondary_trailing")]
    pub secondary_trailing: String,
}

impl Default for BooksConfig {
    fn default() -> Self {
        Self {
            weekday: default_weekday_books(),
            saturday: default_saturday_books(),
            sunday: default_sunday_books(),
            standard_trailing: default_standard_trailing(),
            secondary_trailing: default_secondary_trailing(),
        }
    }
}

fn default_weekday_books() -> Vec<String> {
    ["theguardian/mainsection", "theguardian/g2"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_saturday_books() -> Vec<String> {
    [
        "theguardian/mainsection",
        "theguardian/theguide",
        "theguardian/guardianreview",
        "theguardian/weekend",
        "theguardian/travel",
        "theguardian/cook",
        "theguardian/family",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_sunday_books() -> Vec<String> {
    ["theobserver/news", "theobserver/review", "theobserver/magazine"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_standard_trailing() -> String {
    "theguardian/sport".into()
}
fn default_secondary_trailing() -> String {
    "theobserver/sport".into()
}

// ---------------------------------------------------------------------------
// Issue config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for one pipeline run, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct IssueConfig {
    /// Content API settings.
    pub api: ApiConfig,
    /// API key, already resolved from the environment.
    pub api_key: String,
    /// Archive root (expanded, absolute or relative to the working directory).
    pub archive_dir: PathBuf,
    /// Dated directories kept by retention.
    pub keep_issues: usize,
    /// Edition resolution settings.
    pub edition: EditionConfig,
    /// Book ordering.
    pub books: BooksConfig,
}

impl IssueConfig {
    /// Build a run config from the file config and an already-resolved API key.
    pub fn new(config: &AppConfig, api_key: impl Into<String>) -> Self {
        Self {
            api: config.api.clone(),
            api_key: api_key.into(),
            archive_dir: expand_home(&config.archive.dir),
            keep_issues: config.archive.keep_issues.max(MIN_KEEP_ISSUES),
            edition: config.edition.clone(),
            books: config.books.clone(),
        }
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.broadsheet/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BroadsheetError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.broadsheet/broadsheet.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BroadsheetError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        BroadsheetError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BroadsheetError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BroadsheetError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BroadsheetError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject values the pipeline cannot work with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.api.page_size == 0 {
        return Err(BroadsheetError::config("api.page_size must be at least 1"));
    }

    url::Url::parse(&config.api.base_url).map_err(|e| {
        BroadsheetError::config(format!("invalid api.base_url '{}': {e}", config.api.base_url))
    })?;

    if config.edition.utc_offset_minutes.abs() >= 24 * 60 {
        return Err(BroadsheetError::config(
            "edition.utc_offset_minutes must be within one day of UTC",
        ));
    }

    if config.books.standard_trailing.is_empty() || config.books.secondary_trailing.is_empty() {
        return Err(BroadsheetError::config("trailing book ids must not be empty"));
    }

    Ok(())
}

/// Read the content API key from the env var named in the config.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.api.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(BroadsheetError::config(format!(
            "content API key not found. Set the {var_name} environment variable."
        ))),
    }
}
