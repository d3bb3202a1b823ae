//! Append-only block and error logs
//!
//! Each line is `<rfc3339 timestamp>|<url>|<detail>`.

use crate::config::Project;
use crate::output::traits::{OutputError, OutputResult};
use chrono::{SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Block and error logs of one project
#[derive(Debug)]
pub struct CrawlLog {
    blocked_path: PathBuf,
    error_path: PathBuf,
    // Serializes appends from concurrent workers
    write_lock: Mutex<()>,
}

impl CrawlLog {
    pub fn new(blocked_path: PathBuf, error_path: PathBuf) -> Self {
        Self {
            blocked_path,
            error_path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn for_project(project: &Project) -> Self {
        Self::new(project.blocked_log(), project.error_log())
    }

    pub fn blocked_path(&self) -> &Path {
        &self.blocked_path
    }

    pub fn error_path(&self) -> &Path {
        &self.error_path
    }

    /// Records a URL the server refused with `status_code`
    pub fn append_blocked(&self, url: &str, status_code: u16) -> OutputResult<()> {
        self.append(&self.blocked_path, url, &status_code.to_string())
    }

    /// Records a URL that failed for any other reason
    pub fn append_error(&self, url: &str, message: &str) -> OutputResult<()> {
        self.append(&self.error_path, url, message)
    }

    fn append(&self, path: &Path, url: &str, detail: &str) -> OutputResult<()> {
        let line = format_line(url, detail);
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let write_err = |source: std::io::Error| OutputError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(write_err)?;
        file.write_all(line.as_bytes()).map_err(write_err)
    }
}

/// One log line, newline-terminated; line breaks in `detail` are flattened
fn format_line(url: &str, detail: &str) -> String {
    let detail = detail.replace(['\n', '\r'], " ");
    format!(
        "{}|{}|{}\n",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        url,
        detail
    )
}

/// Counts the entries of a log file; a missing file has none
pub fn count_entries(path: &Path) -> usize {
    std::fs::read_to_string(path)
        .map(|content| content.lines().filter(|l| !l.trim().is_empty()).count())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_line() {
        let line = format_line("https://a.test/", "HTTP 500\nbody");
        let parts: Vec<&str> = line.trim_end().split('|').collect();

        assert_eq!(parts.len(), 3);
        assert!(chrono::DateTime::parse_from_rfc3339(parts[0]).is_ok());
        assert_eq!(parts[1], "https://a.test/");
        assert_eq!(parts[2], "HTTP 500 body");
    }

    #[test]
    fn test_append_blocked_and_error() {
        let dir = TempDir::new().unwrap();
        let log = CrawlLog::new(dir.path().join("blocked.log"), dir.path().join("error.log"));

        log.append_blocked("https://a.test/", 403).unwrap();
        log.append_blocked("https://a.test/x", 429).unwrap();
        log.append_error("https://a.test/y", "timeout").unwrap();

        let blocked = std::fs::read_to_string(log.blocked_path()).unwrap();
        assert!(blocked.lines().next().unwrap().ends_with("|https://a.test/|403"));
        assert_eq!(count_entries(log.blocked_path()), 2);
        assert_eq!(count_entries(log.error_path()), 1);
    }

    #[test]
    fn test_count_missing_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(count_entries(&dir.path().join("missing.log")), 0);
    }
}
