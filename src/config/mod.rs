//! Configuration module for Craft-Spider
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and resolving each `[[project]]` entry into an immutable [`Project`].
//!
//! # Example
//!
//! ```no_run
//! use craft_spider::config::{load_config, resolve_projects};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("spider.toml")).unwrap();
//! for project in resolve_projects(&config).unwrap() {
//!     println!("{} -> {}", project.name, project.base_url);
//! }
//! ```

mod parser;
mod project;
mod types;
mod validation;

// Re-export types
pub use project::Project;
pub use types::{
    Config, FetcherConfig, IndexerConfig, Language, OutputConfig, ProjectConfig, SchedulerConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config, resolve_projects,
};
