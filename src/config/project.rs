//! Resolved, immutable description of one crawl target

use crate::config::types::{Language, OutputConfig, ProjectConfig};
use crate::url::{normalize_url, registrable_domain};
use crate::ConfigError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// One crawl target, built once at configuration load and never mutated
#[derive(Debug, Clone)]
pub struct Project {
    /// Project identifier, also used for the on-disk directory name
    pub name: String,

    /// Normalized homepage; the frontier is seeded with it
    pub base_url: Url,

    /// Domain boundary for link discovery
    pub domain: String,

    pub language: Language,

    /// Hard ceiling on persisted pages
    pub max_pages: usize,

    /// Number of concurrent workers
    pub threads: usize,

    /// Optional random delay range applied before every fetch
    pub delay: Option<(Duration, Duration)>,

    /// Extra seed URLs used when the frontier runs thin
    pub seed_urls: Vec<String>,

    /// `<root>/<lang>/<name>-crawler`
    pub dir: PathBuf,
}

impl Project {
    /// Builds a project from its config entry
    ///
    /// The config is expected to have passed validation already; a homepage
    /// that still fails to parse is reported as `ConfigError::InvalidUrl`.
    pub fn from_config(entry: &ProjectConfig, output: &OutputConfig) -> Result<Self, ConfigError> {
        let base_url = normalize_url(&entry.homepage).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid homepage '{}': {}", entry.homepage, e))
        })?;

        let domain = registrable_domain(&base_url).ok_or_else(|| {
            ConfigError::InvalidUrl(format!("Homepage '{}' has no host", entry.homepage))
        })?;

        let seed_urls = entry
            .seed_paths
            .iter()
            .filter_map(|path| base_url.join(path).ok())
            .map(|url| url.to_string())
            .collect();

        let dir = Path::new(&output.root_dir)
            .join(entry.language.dir_name())
            .join(format!("{}-crawler", entry.name));

        Ok(Self {
            name: entry.name.clone(),
            base_url,
            domain,
            language: entry.language,
            max_pages: entry.max_pages,
            threads: entry.threads,
            delay: entry
                .delay_ms
                .map(|(min, max)| (Duration::from_millis(min), Duration::from_millis(max))),
            seed_urls,
            dir,
        })
    }

    /// The homepage as a frontier entry
    pub fn base_url_str(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn queue_file(&self) -> PathBuf {
        self.dir.join("queue.txt")
    }

    pub fn crawled_file(&self) -> PathBuf {
        self.dir.join("crawled.txt")
    }

    pub fn blocked_log(&self) -> PathBuf {
        self.dir.join("blocked.log")
    }

    pub fn error_log(&self) -> PathBuf {
        self.dir.join("error.log")
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.dir.join("downloads")
    }
}
