use serde::Deserialize;
use std::fmt;

/// Main configuration structure for Craft-Spider
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub fetcher: FetcherConfig,

    #[serde(default)]
    pub indexer: IndexerConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// One entry per crawl target
    #[serde(default, rename = "project")]
    pub projects: Vec<ProjectConfig>,
}

/// Where crawl state and downloaded content live
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory; each project gets `<root>/<lang>/<name>-crawler`
    #[serde(rename = "root-dir", default = "default_root_dir")]
    pub root_dir: String,

    /// Persisted files smaller than this many bytes count as incomplete fetches
    #[serde(rename = "min-file-size", default = "default_min_file_size")]
    pub min_file_size: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            min_file_size: default_min_file_size(),
        }
    }
}

/// HTTP fetch behaviour shared by every project
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts per URL, including the first one
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the second attempt; doubles for each attempt after that
    #[serde(rename = "base-delay-ms", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Browser user agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

/// Search index the crawler forwards documents to
#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_index_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_index_name")]
    pub index: String,

    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_index_endpoint(),
            index: default_index_name(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Worker pool timing knobs
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// How long an idle worker waits on the work queue before refilling
    #[serde(rename = "dequeue-timeout-ms", default = "default_dequeue_timeout_ms")]
    pub dequeue_timeout_ms: u64,

    /// Interval between progress reports
    #[serde(rename = "monitor-interval-ms", default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,

    /// Upper bound on URLs held by the in-memory work queue
    #[serde(rename = "queue-capacity", default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            dequeue_timeout_ms: default_dequeue_timeout_ms(),
            monitor_interval_ms: default_monitor_interval_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// A single crawl target as written in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    pub name: String,

    pub homepage: String,

    #[serde(default)]
    pub language: Language,

    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Optional `[min, max]` delay in milliseconds before each fetch
    #[serde(rename = "delay-ms", default)]
    pub delay_ms: Option<(u64, u64)>,

    /// Paths joined onto the homepage when the frontier runs thin
    #[serde(rename = "seed-paths", default)]
    pub seed_paths: Vec<String>,
}

/// Content language; selects the text-processing pipeline and directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Cn,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Cn => "cn",
        }
    }

    /// Directory under the output root holding this language's projects
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Cn => "zh",
        }
    }

    /// Filename suffix for processed content
    pub fn processed_suffix(&self) -> &'static str {
        match self {
            Self::En => "e",
            Self::Cn => "c",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_root_dir() -> String {
    "./crawler".to_string()
}

fn default_min_file_size() -> u64 {
    1024
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/133.0.6943.127 Safari/537.36"
        .to_string()
}

fn default_accept_language() -> String {
    "zh-CN,zh;q=0.9,en-US;q=0.8,en;q=0.7".to_string()
}

fn default_true() -> bool {
    true
}

fn default_index_endpoint() -> String {
    "http://localhost:9200".to_string()
}

fn default_index_name() -> String {
    "search_craft".to_string()
}

fn default_dequeue_timeout_ms() -> u64 {
    10_000
}

fn default_monitor_interval_ms() -> u64 {
    5_000
}

fn default_queue_capacity() -> usize {
    1_000
}

fn default_max_pages() -> usize {
    100
}

fn default_threads() -> usize {
    4
}
