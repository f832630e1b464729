//! Application configuration for Contenize.
//!
//! User config lives at `~/.contenize/contenize.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ContenizeError, Result};
use crate::types::Channel;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "contenize.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".contenize";

// ---------------------------------------------------------------------------
// Config structs (matching contenize.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Generative model settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// PDF report page geometry.
    #[serde(default)]
    pub report: ReportConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Where plan files and reports are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Channels used when a brief does not list any.
    #[serde(default = "default_channels")]
    pub channels: Vec<Channel>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            channels: default_channels(),
        }
    }
}

fn default_output_dir() -> String {
    "contenize-out".into()
}
fn default_channels() -> Vec<Channel> {
    vec![
        Channel::LinkedinPost,
        Channel::Twitter,
        Channel::BlogPost,
        Channel::EmailNewsletter,
    ]
}

/// `[gemini]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for plan generation and slice revision.
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Model used for illustrations.
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Let the text model consult Google Search while researching the brand.
    #[serde(default = "default_true")]
    pub search_grounding: bool,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            timeout_secs: default_timeout_secs(),
            search_grounding: true,
        }
    }
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_text_model() -> String {
    "gemini-3-pro-preview".into()
}
fn default_image_model() -> String {
    "gemini-2.5-flash-image".into()
}
fn default_timeout_secs() -> u64 {
    180
}
fn default_true() -> bool {
    true
}

/// `[report]` section. All lengths are millimetres, font sizes points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_page_width")]
    pub page_width: f32,
    #[serde(default = "default_page_height")]
    pub page_height: f32,
    /// Left/right margin.
    #[serde(default = "default_margin")]
    pub margin: f32,
    /// Baseline of the first line on every page.
    #[serde(default = "default_top")]
    pub top: f32,
    /// Content must not extend below this line.
    #[serde(default = "default_content_bottom")]
    pub content_bottom: f32,
    /// Baseline of the page footer.
    #[serde(default = "default_footer_baseline")]
    pub footer_baseline: f32,
    /// X position of values in labelled fields.
    #[serde(default = "default_value_x")]
    pub value_x: f32,
    /// Line advance as a multiple of the font size.
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            page_width: default_page_width(),
            page_height: default_page_height(),
            margin: default_margin(),
            top: default_top(),
            content_bottom: default_content_bottom(),
            footer_baseline: default_footer_baseline(),
            value_x: default_value_x(),
            line_spacing: default_line_spacing(),
        }
    }
}

fn default_page_width() -> f32 {
    210.0
}
fn default_page_height() -> f32 {
    297.0
}
fn default_margin() -> f32 {
    20.0
}
fn default_top() -> f32 {
    25.0
}
fn default_content_bottom() -> f32 {
    275.0
}
fn default_footer_baseline() -> f32 {
    287.0
}
fn default_value_x() -> f32 {
    65.0
}
fn default_line_spacing() -> f32 {
    // 10pt text advances ~5mm per line.
    1.4173
}

// ---------------------------------------------------------------------------
// GenAI settings (runtime, resolved once from config + environment)
// ---------------------------------------------------------------------------

/// Immutable, process-wide settings for the generative model client.
///
/// Resolved once at startup and injected into the client; components never
/// read the environment themselves.
#[derive(Clone)]
pub struct GenAiSettings {
    pub api_key: String,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub timeout: Duration,
    pub search_grounding: bool,
}

impl std::fmt::Debug for GenAiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAiSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("timeout", &self.timeout)
            .field("search_grounding", &self.search_grounding)
            .finish()
    }
}

impl GenAiSettings {
    /// Build settings from the config, reading the API key from its env var.
    pub fn resolve(config: &AppConfig) -> Result<Self> {
        let api_key = read_api_key(config)?;
        Ok(Self::with_api_key(config, api_key))
    }

    /// Build settings with an explicit key (tests, alternate key sources).
    pub fn with_api_key(config: &AppConfig, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into().trim().to_string(),
            base_url: config.gemini.base_url.trim_end_matches('/').to_string(),
            text_model: config.gemini.text_model.clone(),
            image_model: config.gemini.image_model.clone(),
            timeout: Duration::from_secs(config.gemini.timeout_secs),
            search_grounding: config.gemini.search_grounding,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.contenize/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ContenizeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.contenize/contenize.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| ContenizeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ContenizeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ContenizeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ContenizeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ContenizeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    read_api_key(config).map(|_| ())
}

fn read_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.gemini.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(ContenizeError::config(format!(
            "Gemini API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://aistudio.google.com/apikey"
        ))),
    }
}
