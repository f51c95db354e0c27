use serde::Deserialize;

/// Main configuration structure for Driftnet
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub storage: StorageConfig,
    /// URLs inserted into the frontier before any worker starts
    #[serde(default)]
    pub seeds: Vec<String>,
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of workers to start
    pub workers: usize,

    /// Number of budgeted iterations each worker may spend
    #[serde(rename = "fetch-budget")]
    pub fetch_budget: u32,

    /// Number of seed URLs each worker claims from the frontier
    #[serde(rename = "initial-seeds")]
    pub initial_seeds: usize,

    /// Iterations between batched writes to the shared stores
    #[serde(rename = "flush-interval")]
    pub flush_interval: u32,

    /// The pending URL buffer must grow beyond this before a mid-run flush writes it
    #[serde(rename = "min-flush-batch")]
    pub min_flush_batch: usize,

    /// Pause after each budgeted iteration (milliseconds)
    #[serde(rename = "iteration-delay-ms", default = "default_iteration_delay_ms")]
    pub iteration_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 100,
            fetch_budget: 50,
            initial_seeds: 5,
            flush_interval: 100,
            min_flush_batch: 5,
            iteration_delay_ms: default_iteration_delay_ms(),
        }
    }
}

/// HTTP fetch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

/// Storage locations
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database holding the URL frontier
    #[serde(rename = "frontier-path")]
    pub frontier_path: String,

    /// Path to the SQLite database holding extracted page records
    #[serde(rename = "pages-path")]
    pub pages_path: String,
}

fn default_iteration_delay_ms() -> u64 {
    330
}

fn default_user_agent() -> String {
    format!("driftnet/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_redirects() -> usize {
    10
}
