use crate::validate::UploadKind;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Headless page behaviors for a book library.
#[derive(Parser, Debug, Clone)]
#[command(name = "shelf-ui")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "SHELF_UI_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a default config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },

    /// Run the upload validator against a local file.
    Validate {
        /// File to check.
        path: PathBuf,
        /// Upload the file would be used for.
        #[arg(short, long, value_enum, default_value = "document")]
        kind: UploadKind,
    },

    /// Drive a simulated upload and log its progress.
    Simulate {
        /// File names to show in the upload list.
        #[arg(short, long, num_args = 1.., default_values_t = vec!["book.pdf".to_string()])]
        files: Vec<String>,
        /// Signal completion after this many seconds.
        #[arg(long, conflicts_with = "fail_after")]
        complete_after: Option<u64>,
        /// Signal failure after this many seconds.
        #[arg(long)]
        fail_after: Option<u64>,
        /// Failure reason shown to the user.
        #[arg(long, default_value = "The server rejected the upload")]
        reason: String,
    },

    /// Animate a statistics counter and print its final text.
    Count {
        /// Value to count up to.
        target: u64,
    },
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upload validation limits.
    #[serde(default)]
    pub upload: UploadConfig,

    /// Simulated progress timing.
    #[serde(default)]
    pub progress: ProgressConfig,

    /// Toast notifications.
    #[serde(default)]
    pub toast: ToastConfig,

    /// Counter animation.
    #[serde(default)]
    pub counter: CounterConfig,

    /// Live search.
    #[serde(default)]
    pub search: SearchConfig,

    /// Scroll handling.
    #[serde(default)]
    pub scroll: ScrollConfig,

    /// Server endpoints.
    #[serde(default)]
    pub endpoints: EndpointConfig,
}

/// Upload validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum document size in megabytes.
    #[serde(default = "default_document_max_mb")]
    pub document_max_mb: u64,

    /// Accepted document MIME types.
    #[serde(default = "default_document_types")]
    pub document_types: Vec<String>,

    /// Maximum cover image size in megabytes.
    #[serde(default = "default_cover_max_mb")]
    pub cover_max_mb: u64,

    /// Accepted cover MIME types.
    #[serde(default = "default_cover_types")]
    pub cover_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            document_max_mb: default_document_max_mb(),
            document_types: default_document_types(),
            cover_max_mb: default_cover_max_mb(),
            cover_types: default_cover_types(),
        }
    }
}

fn default_document_max_mb() -> u64 {
    50
}

fn default_document_types() -> Vec<String> {
    vec!["application/pdf".to_string()]
}

fn default_cover_max_mb() -> u64 {
    5
}

fn default_cover_types() -> Vec<String> {
    ["image/jpeg", "image/png", "image/gif", "image/webp"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Simulated progress configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Shortest delay between ticks in milliseconds.
    #[serde(default = "default_tick_min_ms")]
    pub tick_min_ms: u64,

    /// Longest delay between ticks in milliseconds.
    #[serde(default = "default_tick_max_ms")]
    pub tick_max_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick_min_ms: default_tick_min_ms(),
            tick_max_ms: default_tick_max_ms(),
        }
    }
}

fn default_tick_min_ms() -> u64 {
    200
}

fn default_tick_max_ms() -> u64 {
    500
}

/// Toast configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToastConfig {
    /// Auto-dismiss delay in milliseconds.
    #[serde(default = "default_toast_duration_ms")]
    pub duration_ms: u64,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_toast_duration_ms(),
        }
    }
}

fn default_toast_duration_ms() -> u64 {
    5000
}

impl ToastConfig {
    /// Auto-dismiss delay.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Counter animation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Animation length in milliseconds.
    #[serde(default = "default_counter_duration_ms")]
    pub duration_ms: u64,

    /// Exponent `k` of the `1 - (1 - p)^k` ease-out curve.
    #[serde(default = "default_ease_exponent")]
    pub ease_exponent: i32,

    /// Delay between frames in milliseconds.
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_counter_duration_ms(),
            ease_exponent: default_ease_exponent(),
            frame_ms: default_frame_ms(),
        }
    }
}

fn default_counter_duration_ms() -> u64 {
    2000
}

fn default_ease_exponent() -> i32 {
    3
}

fn default_frame_ms() -> u64 {
    16 // ~60fps
}

/// Live search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiet period before filtering runs, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    300
}

/// Scroll handling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Minimum spacing between handled scroll events, in milliseconds.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,

    /// Offset in pixels past which the back-to-top button shows.
    #[serde(default = "default_back_to_top_offset")]
    pub back_to_top_offset: u32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle_ms(),
            back_to_top_offset: default_back_to_top_offset(),
        }
    }
}

fn default_throttle_ms() -> u64 {
    100
}

fn default_back_to_top_offset() -> u32 {
    300
}

/// Server endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL prepended to relative endpoint paths.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Favorite toggle endpoint (JSON body).
    #[serde(default = "default_favorite_toggle")]
    pub favorite_toggle: String,

    /// Favorite removal endpoint (form body).
    #[serde(default = "default_favorite_remove")]
    pub favorite_remove: String,

    /// Category deletion form action.
    #[serde(default = "default_category_delete")]
    pub category_delete: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            favorite_toggle: default_favorite_toggle(),
            favorite_remove: default_favorite_remove(),
            category_delete: default_category_delete(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_favorite_toggle() -> String {
    "/api/favorites/toggle".to_string()
}

fn default_favorite_remove() -> String {
    "/favorites".to_string()
}

fn default_category_delete() -> String {
    "/admin/categories/delete".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl EndpointConfig {
    /// Resolve an endpoint path against the base URL.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &PathBuf) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::UiError::Config(format!("Failed to read config file: {}", e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            crate::error::UiError::Config(format!("Failed to parse config file: {}", e))
        })?;
        config.check()?;
        Ok(config)
    }

    /// Reject settings the behaviors cannot run with.
    pub fn check(&self) -> crate::error::Result<()> {
        if self.progress.tick_min_ms == 0 || self.progress.tick_min_ms > self.progress.tick_max_ms {
            return Err(crate::error::UiError::Config(
                "progress.tick_min_ms must be > 0 and <= tick_max_ms".to_string(),
            ));
        }
        if self.counter.frame_ms == 0 || self.counter.ease_exponent < 1 {
            return Err(crate::error::UiError::Config(
                "counter.frame_ms must be > 0 and counter.ease_exponent >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("shelf-ui.toml"),
            PathBuf::from("config.toml"),
            dirs::config_dir()
                .map(|p| p.join("shelf-ui").join("config.toml"))
                .unwrap_or_default(),
        ];

        candidates.into_iter().find(|p| p.exists())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# shelf-ui configuration

[upload]
document_max_mb = 50
document_types = ["application/pdf"]
cover_max_mb = 5
cover_types = ["image/jpeg", "image/png", "image/gif", "image/webp"]

[progress]
# Randomized delay between simulated progress ticks
tick_min_ms = 200
tick_max_ms = 500

[toast]
duration_ms = 5000

[counter]
duration_ms = 2000
ease_exponent = 3
frame_ms = 16

[search]
debounce_ms = 300

[scroll]
throttle_ms = 100
back_to_top_offset = 300

[endpoints]
base_url = "http://localhost:8080"
favorite_toggle = "/api/favorites/toggle"
favorite_remove = "/favorites"
category_delete = "/admin/categories/delete"
timeout_seconds = 30
"#
        .to_string()
    }
}
