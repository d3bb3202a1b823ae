//! Newline-delimited text file frontier backend
//!
//! Each project keeps `queue.txt` and `crawled.txt`, one URL per line. The
//! files are plain enough to edit by hand between runs.

use crate::config::Project;
use crate::storage::traits::{FrontierStore, StorageError, StorageResult};
use crate::storage::FrontierState;
use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Frontier backend storing the two sets as text files
#[derive(Debug, Clone)]
pub struct FileFrontierStore {
    queue_path: PathBuf,
    crawled_path: PathBuf,
    seed: String,
}

impl FileFrontierStore {
    /// Creates a store for the given file pair
    ///
    /// # Arguments
    ///
    /// * `queue_path` - File holding the queued set
    /// * `crawled_path` - File holding the crawled set
    /// * `seed` - URL queued when the files do not exist yet
    pub fn new(queue_path: PathBuf, crawled_path: PathBuf, seed: impl Into<String>) -> Self {
        Self {
            queue_path,
            crawled_path,
            seed: seed.into(),
        }
    }

    /// Creates the store for a project's standard file layout
    pub fn for_project(project: &Project) -> Self {
        Self::new(
            project.queue_file(),
            project.crawled_file(),
            project.base_url_str(),
        )
    }

    pub fn queue_path(&self) -> &Path {
        &self.queue_path
    }

    pub fn crawled_path(&self) -> &Path {
        &self.crawled_path
    }

    /// Writes the seeded files if either one is missing
    fn ensure_initialized(&self) -> StorageResult<()> {
        if !self.queue_path.exists() {
            tracing::info!("Creating frontier file {}", self.queue_path.display());
            write_set_atomic(&self.queue_path, [self.seed.as_str()].into_iter())?;
        }
        if !self.crawled_path.exists() {
            write_set_atomic(&self.crawled_path, std::iter::empty())?;
        }
        Ok(())
    }
}

impl FrontierStore for FileFrontierStore {
    fn load(&self) -> StorageResult<FrontierState> {
        self.ensure_initialized()?;
        let queued = read_set(&self.queue_path)?;
        let crawled = read_set(&self.crawled_path)?;
        Ok(FrontierState::from_sets(queued, crawled))
    }

    fn load_queued(&self) -> StorageResult<HashSet<String>> {
        self.ensure_initialized()?;
        read_set(&self.queue_path)
    }

    fn save(&self, state: &FrontierState) -> StorageResult<()> {
        // Crawled goes first: a crash between the two writes leaves a URL in
        // both files, which `load` resolves in favour of crawled.
        write_set_atomic(
            &self.crawled_path,
            sorted(state.crawled()).into_iter(),
        )?;
        write_set_atomic(&self.queue_path, sorted(state.queued()).into_iter())?;
        Ok(())
    }

    fn reset(&self) -> StorageResult<()> {
        for path in [&self.queue_path, &self.crawled_path] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(StorageError::Write {
                        path: path.clone(),
                        source,
                    })
                }
            }
        }
        Ok(())
    }
}

fn sorted(set: &HashSet<String>) -> Vec<&str> {
    let mut urls: Vec<&str> = set.iter().map(String::as_str).collect();
    urls.sort_unstable();
    urls
}

/// Reads one URL per line, skipping blanks
fn read_set(path: &Path) -> StorageResult<HashSet<String>> {
    let content = fs::read_to_string(path).map_err(|source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Writes to a sibling temp file, syncs, then renames over the target
fn write_set_atomic<'a>(path: &Path, urls: impl Iterator<Item = &'a str>) -> StorageResult<()> {
    let write_err = |source: std::io::Error| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let result = (|| {
        let mut file = fs::File::create(&tmp_path)?;
        for url in urls {
            file.write_all(url.as_bytes())?;
            file.write_all(b"\n")?;
        }
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(source) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_err(source));
    }

    Ok(())
}
