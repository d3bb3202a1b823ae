use crate::config::types::{Config, FetcherConfig, IndexerConfig, ProjectConfig, SchedulerConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Upper bound on workers per project
const MAX_THREADS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_output_config(&config.output)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_indexer_config(&config.indexer)?;
    validate_scheduler_config(&config.scheduler)?;
    validate_projects(&config.projects)?;
    Ok(())
}

fn validate_output_config(config: &crate::config::types::OutputConfig) -> Result<(), ConfigError> {
    if config.root_dir.is_empty() {
        return Err(ConfigError::Validation(
            "root_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "fetcher max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_indexer_config(config: &IndexerConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid indexer endpoint: {}", e)))?;

    if config.index.is_empty() {
        return Err(ConfigError::Validation(
            "indexer index name cannot be empty".to_string(),
        ));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "indexer max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    Ok(())
}

fn validate_scheduler_config(config: &SchedulerConfig) -> Result<(), ConfigError> {
    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(
            "queue_capacity must be >= 1".to_string(),
        ));
    }

    if config.monitor_interval_ms < 1 || config.dequeue_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "scheduler intervals must be >= 1ms".to_string(),
        ));
    }

    Ok(())
}

/// Validates project entries
fn validate_projects(projects: &[ProjectConfig]) -> Result<(), ConfigError> {
    if projects.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[project]] must be configured".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for project in projects {
        validate_project(project)?;

        if !names.insert(project.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate project name '{}'",
                project.name
            )));
        }
    }

    Ok(())
}

fn validate_project(project: &ProjectConfig) -> Result<(), ConfigError> {
    validate_project_name(&project.name)?;

    let url = Url::parse(&project.homepage).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid homepage '{}': {}", project.homepage, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Homepage '{}' must use HTTP or HTTPS",
            project.homepage
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Homepage '{}' has no host",
            project.homepage
        )));
    }

    if project.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "Project '{}': max_pages must be >= 1",
            project.name
        )));
    }

    if project.threads < 1 || project.threads > MAX_THREADS {
        return Err(ConfigError::Validation(format!(
            "Project '{}': threads must be between 1 and {}, got {}",
            project.name, MAX_THREADS, project.threads
        )));
    }

    if let Some((min, max)) = project.delay_ms {
        if min > max {
            return Err(ConfigError::Validation(format!(
                "Project '{}': delay range [{}, {}] is inverted",
                project.name, min, max
            )));
        }
    }

    Ok(())
}

/// Project names become directory names, so keep them filesystem-safe
fn validate_project_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "project name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "project name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            name
        )));
    }

    Ok(())
}
