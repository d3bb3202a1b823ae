//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - HTML parsing and link extraction
//! - The per-project spider and its worker pool
//! - Running every configured project concurrently

mod coordinator;
mod fetcher;
mod parser;
mod queue;
mod retry;
mod spider;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, fetch_policy, FetchError, FetchResult, Fetcher};
pub use parser::{parse_html, LinkExtractor, ParsedPage};
pub use queue::{Dequeue, WorkQueue};
pub use retry::{RetryError, RetryPolicy};
pub use spider::{PageOutcome, Spider, SpiderParts};

use crate::config::{resolve_projects, Config, Project};
use crate::index::build_indexer;
use crate::output::CrawlSummary;
use crate::storage::{open_store, FrontierStore};
use crate::{ConfigError, Result, SpiderError};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Options for a crawl invocation
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Discard saved frontiers before starting
    pub fresh: bool,

    /// Only run these projects; empty means all
    pub projects: Vec<String>,
}

/// Outcome of running several projects
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub summaries: Vec<CrawlSummary>,
    pub failures: Vec<(String, SpiderError)>,
}

/// Picks the projects named in `names`, or all of them if `names` is empty
pub fn select_projects(projects: Vec<Project>, names: &[String]) -> Result<Vec<Project>> {
    if names.is_empty() {
        return Ok(projects);
    }

    if let Some(unknown) = names
        .iter()
        .find(|name| !projects.iter().any(|p| &p.name == *name))
    {
        return Err(ConfigError::Validation(format!("Unknown project '{}'", unknown)).into());
    }

    Ok(projects
        .into_iter()
        .filter(|p| names.contains(&p.name))
        .collect())
}

/// Deletes a project's saved frontier so the next boot starts from the seed
pub fn reset_project(project: &Project) -> Result<()> {
    tracing::info!("[{}] Discarding saved frontier", project.name);
    open_store(project).reset()?;
    Ok(())
}

/// Runs every selected project concurrently
///
/// Projects are independent: one project's fatal error is recorded in the
/// report while the others keep going.
pub async fn run_crawl(config: &Config, options: &RunOptions) -> Result<CrawlReport> {
    let projects = select_projects(resolve_projects(config)?, &options.projects)?;

    let indexer = build_indexer(&config.indexer)?;
    if let Err(e) = indexer.prepare().await {
        tracing::warn!("Search index unavailable, documents may not be indexed: {}", e);
    }

    let mut report = CrawlReport::default();
    let mut tasks = JoinSet::new();

    for project in projects {
        let name = project.name.clone();
        if options.fresh {
            if let Err(e) = reset_project(&project) {
                tracing::error!("[{}] Failed to reset: {}", name, e);
                report.failures.push((name, e));
                continue;
            }
        }

        let parts = match SpiderParts::from_config(&project, config, Arc::clone(&indexer)) {
            Ok(parts) => parts,
            Err(e) => {
                report.failures.push((name, e));
                continue;
            }
        };
        let spider = match Spider::new(project, parts) {
            Ok(spider) => spider,
            Err(e) => {
                tracing::error!("[{}] Failed to start: {}", name, e);
                report.failures.push((name, e));
                continue;
            }
        };

        let coordinator = Coordinator::new(spider, &config.scheduler);
        tasks.spawn(async move { (name, coordinator.run().await) });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(summary))) => report.summaries.push(summary),
            Ok((name, Err(e))) => {
                tracing::error!("[{}] Crawl aborted: {}", name, e);
                report.failures.push((name, e));
            }
            Err(e) => report
                .failures
                .push(("<task>".to_string(), SpiderError::Task(e.to_string()))),
        }
    }

    report.summaries.sort_by(|a, b| a.project.cmp(&b.project));
    Ok(report)
}

/// Runs a complete crawl of every configured project
pub async fn crawl(config: Config) -> Result<CrawlReport> {
    run_crawl(&config, &RunOptions::default()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn projects() -> Vec<Project> {
        let config = parse_config(
            r#"
[[project]]
name = "a"
homepage = "https://a.test/"

[[project]]
name = "b"
homepage = "https://b.test/"
"#,
        )
        .unwrap();
        resolve_projects(&config).unwrap()
    }

    #[test]
    fn test_select_all_projects() {
        assert_eq!(select_projects(projects(), &[]).unwrap().len(), 2);
    }

    #[test]
    fn test_select_named_project() {
        let selected = select_projects(projects(), &["b".to_string()]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "b");
    }

    #[test]
    fn test_select_unknown_project() {
        let err = select_projects(projects(), &["zzz".to_string()]).unwrap_err();
        assert!(err.to_string().contains("zzz"));
    }
}
