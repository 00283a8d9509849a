use serde::Deserialize;

/// Main configuration structure for Cloudsweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub deleter: DeleterConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetConfig>,
}

impl Config {
    /// Looks up a deduplication target by name
    pub fn target(&self, name: &str) -> Option<&TargetConfig> {
        self.targets.iter().find(|t| t.name == name)
    }
}

/// Remote API connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RemoteConfig {
    /// Base URL of the RPC API (e.g. "https://api.dropboxapi.com/2/")
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// File holding the bearer token, used when the variable is unset
    #[serde(default)]
    pub token_file: Option<String>,

    /// Retries for rate-limited or 5xx responses
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential retry backoff (milliseconds)
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay: u64,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token_env: default_token_env(),
            token_file: None,
            max_retries: default_max_retries(),
            retry_base_delay: default_retry_base_delay(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Folder to list recursively ("" is the account root)
    #[serde(default)]
    pub root_path: String,

    /// Persist a checkpoint every N file entries
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            root_path: String::new(),
            checkpoint_interval: default_checkpoint_interval(),
        }
    }
}

/// Batch delete configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeleterConfig {
    /// Paths per delete request (remote maximum is 1000)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Delay between async job status polls (milliseconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Delay between chunk submissions (milliseconds)
    #[serde(default = "default_inter_batch_delay")]
    pub inter_batch_delay: u64,

    /// Delay after a failed chunk submission (milliseconds)
    #[serde(default = "default_error_backoff")]
    pub error_backoff: u64,

    /// Status polls before an async chunk is reported as timed out
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Chunks allowed in flight at once
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for DeleterConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            poll_interval: default_poll_interval(),
            inter_batch_delay: default_inter_batch_delay(),
            error_backoff: default_error_backoff(),
            max_poll_attempts: default_max_poll_attempts(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Directory that receives plan files
    #[serde(default = "default_plan_dir")]
    pub plan_dir: String,

    /// Rows shown in "largest" style listings
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

/// Which member of a duplicate group is kept once the rules have narrowed it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeepStrategy {
    #[default]
    Lexicographic,
    ShortestPath,
    EarliestModified,
}

/// A named deduplication target
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetConfig {
    /// Name used on the command line (e.g. "camera-uploads")
    pub name: String,

    /// Only duplicates under these prefixes are deleted (empty = anywhere)
    #[serde(default)]
    pub prefixes: Vec<String>,

    /// Prefer keeping a copy under these prefixes, tried in order
    #[serde(default)]
    pub prefer_under: Vec<String>,

    /// Prefer keeping a copy whose path contains these fragments, tried in order
    #[serde(default)]
    pub prefer_containing: Vec<String>,

    /// Prefer keeping a copy outside all of these prefixes
    #[serde(default)]
    pub avoid_under: Vec<String>,

    /// Final tie-break
    #[serde(default)]
    pub keep: KeepStrategy,
}

fn default_api_base() -> String {
    "https://api.dropboxapi.com/2/".to_string()
}

fn default_token_env() -> String {
    "DROPBOX_TOKEN".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    60
}

fn default_checkpoint_interval() -> usize {
    10_000
}

fn default_chunk_size() -> usize {
    1000
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_inter_batch_delay() -> u64 {
    2000
}

fn default_error_backoff() -> u64 {
    5000
}

fn default_max_poll_attempts() -> u32 {
    600
}

fn default_max_in_flight() -> usize {
    1
}

fn default_plan_dir() -> String {
    ".".to_string()
}

fn default_top_n() -> usize {
    100
}
