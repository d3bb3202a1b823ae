//! Filesystem content sink
//!
//! Pages land in the project's `downloads/` directory as
//! `<stem>_org.txt` plus `<stem>_e.txt` or `<stem>_c.txt`, where the stem
//! is derived from the URL.

use crate::config::Project;
use crate::output::traits::{ContentKind, ContentSink, OutputError, OutputResult};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Longest stem kept, in characters
const MAX_STEM_CHARS: usize = 150;

const ORIGINAL_SUFFIX: &str = "_org.txt";

const PROCESSED_SUFFIXES: &[&str] = &["_e.txt", "_c.txt"];

/// Builds a filesystem-safe file stem from a URL
///
/// The scheme is dropped, characters that are unsafe in filenames become
/// `_`, the result is cut to 150 characters, and runs of `_` collapse.
///
/// # Examples
///
/// ```
/// use craft_spider::output::file_stem;
///
/// assert_eq!(file_stem("https://example.com/a/b?c=1&d"), "example.com_a_b_c=1_d");
/// ```
pub fn file_stem(url: &str) -> String {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    let replaced: String = without_scheme
        .chars()
        .map(|c| match c {
            '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' | '&' | '\u{200b}' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(MAX_STEM_CHARS)
        .collect();

    let mut stem = String::with_capacity(replaced.len());
    for c in replaced.trim_end_matches('_').chars() {
        if c == '_' && stem.ends_with('_') {
            continue;
        }
        stem.push(c);
    }
    stem
}

/// Content sink writing text files into one directory
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
    min_file_size: u64,
}

impl FileSink {
    /// Creates a sink
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory the files go into (created on first write)
    /// * `min_file_size` - Files below this many bytes are not counted and
    ///   are removed by cleanup
    pub fn new(dir: PathBuf, min_file_size: u64) -> Self {
        Self { dir, min_file_size }
    }

    pub fn for_project(project: &Project, min_file_size: u64) -> Self {
        Self::new(project.downloads_dir(), min_file_size)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a rendition of `url` is written to
    pub fn path_for(&self, url: &str, kind: ContentKind) -> PathBuf {
        self.dir
            .join(format!("{}_{}.txt", file_stem(url), kind.suffix()))
    }

    /// Lists `(path, size)` of every `.txt` file; missing directory is empty
    fn text_files(&self) -> OutputResult<Vec<(PathBuf, u64)>> {
        let scan_err = |source: std::io::Error| OutputError::Scan {
            path: self.dir.clone(),
            source,
        };

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(scan_err(e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(scan_err)?;
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "txt") {
                continue;
            }
            let metadata = entry.metadata().map_err(scan_err)?;
            if metadata.is_file() {
                files.push((path, metadata.len()));
            }
        }
        Ok(files)
    }
}

impl ContentSink for FileSink {
    fn write(&self, url: &str, content: &str, kind: ContentKind) -> OutputResult<PathBuf> {
        let path = self.path_for(url, kind);
        let write_err = |source: std::io::Error| OutputError::Write {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(write_err)?;
        fs::write(&path, content).map_err(write_err)?;

        tracing::debug!("Wrote {} ({} bytes)", path.display(), content.len());
        Ok(path)
    }

    fn count_persisted(&self) -> OutputResult<usize> {
        Ok(self
            .text_files()?
            .into_iter()
            .filter(|(path, size)| is_original(path) && *size >= self.min_file_size)
            .count())
    }

    /// A page's processed rendition goes with its original: both are removed
    /// when the original is undersized and both stay when it is not. Files
    /// without an original are judged by their own size.
    fn clean_small_files(&self) -> OutputResult<usize> {
        let files = self.text_files()?;

        let mut small_pages = HashSet::new();
        let mut full_pages = HashSet::new();
        for (path, size) in &files {
            if let Some((stem, true)) = page_stem(path) {
                if *size < self.min_file_size {
                    small_pages.insert(stem.to_string());
                } else {
                    full_pages.insert(stem.to_string());
                }
            }
        }

        let mut removed = 0;
        for (path, size) in files {
            let undersized = match page_stem(&path) {
                Some((stem, _)) if small_pages.contains(stem) => true,
                Some((stem, _)) if full_pages.contains(stem) => false,
                _ => size < self.min_file_size,
            };
            if !undersized {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!("Removed small file {} ({} bytes)", path.display(), size);
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(OutputError::Write { path, source }),
            }
        }
        Ok(removed)
    }
}

fn is_original(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(ORIGINAL_SUFFIX))
}

/// The page stem of a rendition and whether it is the original
fn page_stem(path: &Path) -> Option<(&str, bool)> {
    let name = path.file_name()?.to_str()?;
    if let Some(stem) = name.strip_suffix(ORIGINAL_SUFFIX) {
        return Some((stem, true));
    }
    PROCESSED_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .map(|stem| (stem, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Language;
    use tempfile::TempDir;

    #[test]
    fn test_file_stem_rules() {
        assert_eq!(file_stem("https://example.com/"), "example.com");
        assert_eq!(file_stem("http://example.com/a//b"), "example.com_a_b");
        assert_eq!(
            file_stem("https://example.com/q?x=\"1\"&y=<2>|*"),
            "example.com_q_x=_1_y=_2"
        );
        assert_eq!(file_stem("https://example.com/a\u{200b}b"), "example.com_a_b");
    }

    #[test]
    fn test_file_stem_truncates() {
        let long = format!("https://example.com/{}", "a".repeat(400));
        let stem = file_stem(&long);
        assert_eq!(stem.chars().count(), MAX_STEM_CHARS);
        assert!(stem.starts_with("example.com_aaa"));
    }

    #[test]
    fn test_write_both_renditions() {
        let dir = TempDir::new().unwrap();
        let sink = FileSink::new(dir.path().join("downloads"), 0);

        let org = sink
            .write("https://example.com/a", "<html>a</html>", ContentKind::Original)
            .unwrap();
        let processed = sink
            .write("https://example.com/a", "a", ContentKind::Processed(Language::En))
            .unwrap();

        assert!(org.ends_with("example.com_a_org.txt"));
        assert!(processed.ends_with("example.com_a_e.txt"));
        assert_eq!(fs::read_to_string(org).unwrap(), "<html>a</html>");
        assert_eq!(sink.count_persisted().unwrap(), 1);
    }

    #[test]
    fn test_rewrite_overwrites() {
        let dir = TempDir::new().unwrap();
        let sink = FileSink::new(dir.path().to_path_buf(), 0);
        sink.write("https://example.com/", "one", ContentKind::Original)
            .unwrap();
        let path = sink
            .write("https://example.com/", "two", ContentKind::Original)
            .unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "two");
        assert_eq!(sink.count_persisted().unwrap(), 1);
    }

    #[test]
    fn test_count_ignores_small_files() {
        let dir = TempDir::new().unwrap();
        let sink = FileSink::new(dir.path().to_path_buf(), 10);
        sink.write("https://example.com/big", &"x".repeat(20), ContentKind::Original)
            .unwrap();
        sink.write("https://example.com/small", "x", ContentKind::Original)
            .unwrap();

        assert_eq!(sink.count_persisted().unwrap(), 1);
    }

    #[test]
    fn test_clean_small_files_removes_pairs() {
        let dir = TempDir::new().unwrap();
        let sink = FileSink::new(dir.path().to_path_buf(), 10);
        let big = "https://example.com/big";
        let small = "https://example.com/small";
        let orphan = "https://example.com/orphan";
        let processed = ContentKind::Processed(Language::Cn);

        sink.write(big, &"x".repeat(20), ContentKind::Original).unwrap();
        sink.write(big, "x", processed).unwrap();
        sink.write(small, "x", ContentKind::Original).unwrap();
        sink.write(small, &"x".repeat(20), processed).unwrap();
        sink.write(orphan, "x", processed).unwrap();

        assert_eq!(sink.clean_small_files().unwrap(), 3);
        assert!(sink.path_for(big, ContentKind::Original).exists());
        assert!(sink.path_for(big, processed).exists());
        assert!(!sink.path_for(small, ContentKind::Original).exists());
        assert!(!sink.path_for(small, processed).exists());
        assert!(!sink.path_for(orphan, processed).exists());
    }

    #[test]
    fn test_missing_dir_counts_zero() {
        let dir = TempDir::new().unwrap();
        let sink = FileSink::new(dir.path().join("nope"), 0);
        assert_eq!(sink.count_persisted().unwrap(), 0);
        assert_eq!(sink.clean_small_files().unwrap(), 0);
    }
}
