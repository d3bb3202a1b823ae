//! Per-project crawl unit
//!
//! A `Spider` owns everything one project needs to crawl a page: the
//! frontier and its durable store, the fetcher, the link extractor, the
//! content sink, the text processor and the indexer. Workers share one
//! spider and call [`Spider::crawl_page`] concurrently.

use crate::config::{Config, Project};
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::parser::LinkExtractor;
use crate::crawler::retry::RetryPolicy;
use crate::index::{build_indexer, index_policy, IndexDocument, IndexError, Indexer};
use crate::output::{open_sink, ContentKind, ContentSink, CrawlLog};
use crate::process::{BasicTextProcessor, TextProcessor};
use crate::state::PageState;
use crate::storage::{open_store, FrontierState, FrontierStore};
use crate::{Result, SpiderError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use url::Url;

/// What happened to one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Persisted and marked crawled
    Crawled { links_added: usize },

    /// Refused by the server
    Blocked { status_code: u16 },

    /// Failed permanently or ran out of attempts
    Failed,

    /// Not attempted: already handled, or the budget was reached
    Skipped,
}

/// Collaborators a spider is assembled from
pub struct SpiderParts {
    pub store: Box<dyn FrontierStore>,
    pub fetcher: Fetcher,
    pub sink: Arc<dyn ContentSink>,
    pub processor: Arc<dyn TextProcessor>,
    pub indexer: Arc<dyn Indexer>,
    pub index_policy: RetryPolicy<IndexError>,
}

impl SpiderParts {
    /// The standard file-backed parts for a project
    pub fn from_config(
        project: &Project,
        config: &Config,
        indexer: Arc<dyn Indexer>,
    ) -> Result<Self> {
        Ok(Self {
            store: Box::new(open_store(project)),
            fetcher: Fetcher::new(&config.fetcher)?,
            sink: Arc::new(open_sink(project, config.output.min_file_size)),
            processor: Arc::new(BasicTextProcessor::new()),
            indexer,
            index_policy: index_policy(&config.indexer),
        })
    }
}

/// Frontier plus the URLs that failed during this run
///
/// Failed URLs are not re-queued when rediscovered and not reseeded until
/// the next run.
#[derive(Debug)]
struct Frontier {
    state: FrontierState,
    failed: HashSet<String>,
}

/// Crawl unit of one project
pub struct Spider {
    project: Project,
    store: Box<dyn FrontierStore>,
    frontier: Mutex<Frontier>,
    fetcher: Fetcher,
    extractor: LinkExtractor,
    sink: Arc<dyn ContentSink>,
    processor: Arc<dyn TextProcessor>,
    indexer: Arc<dyn Indexer>,
    index_policy: RetryPolicy<IndexError>,
    log: CrawlLog,
    crawled_count: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    blocked: AtomicUsize,
}

impl Spider {
    /// Boots a spider: loads the frontier and counts persisted pages
    ///
    /// If the budget is already spent the queued set is cleared.
    pub fn new(project: Project, parts: SpiderParts) -> Result<Self> {
        let state = parts.store.load()?;
        let crawled_count = parts.sink.count_persisted()?;

        tracing::info!(
            "[{}] Loaded frontier: {} queued, {} crawled, {} persisted",
            project.name,
            state.queued().len(),
            state.crawled().len(),
            crawled_count
        );

        let spider = Self {
            extractor: LinkExtractor::for_project(&project),
            log: CrawlLog::for_project(&project),
            project,
            store: parts.store,
            frontier: Mutex::new(Frontier {
                state,
                failed: HashSet::new(),
            }),
            fetcher: parts.fetcher,
            sink: parts.sink,
            processor: parts.processor,
            indexer: parts.indexer,
            index_policy: parts.index_policy,
            crawled_count: AtomicUsize::new(crawled_count),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            blocked: AtomicUsize::new(0),
        };

        spider.finish()?;
        Ok(spider)
    }

    /// Boots a spider with the standard parts and the configured indexer
    pub fn from_config(project: Project, config: &Config) -> Result<Self> {
        let indexer = build_indexer(&config.indexer)?;
        let parts = SpiderParts::from_config(&project, config, indexer)?;
        Self::new(project, parts)
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Persisted pages counted against the budget
    pub fn crawled_count(&self) -> usize {
        self.crawled_count.load(Ordering::SeqCst)
    }

    pub fn budget_reached(&self) -> bool {
        self.crawled_count() >= self.project.max_pages
    }

    /// Pages still allowed before the budget is reached
    pub fn remaining_budget(&self) -> usize {
        self.project.max_pages.saturating_sub(self.crawled_count())
    }

    pub fn pages_succeeded(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst)
    }

    pub fn pages_failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn pages_blocked(&self) -> usize {
        self.blocked.load(Ordering::SeqCst)
    }

    /// A copy of the current frontier
    pub fn frontier(&self) -> Result<FrontierState> {
        Ok(self.lock()?.state.clone())
    }

    pub fn queued_len(&self) -> Result<usize> {
        Ok(self.lock()?.state.queued().len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Frontier>> {
        self.frontier
            .lock()
            .map_err(|e| SpiderError::LockPoisoned(e.to_string()))
    }

    /// Recomputes the budget count from the content sink
    ///
    /// The count never decreases during a run.
    pub fn refresh_count(&self) -> Result<usize> {
        let persisted = self.sink.count_persisted()?;
        let previous = self.crawled_count.fetch_max(persisted, Ordering::SeqCst);
        Ok(previous.max(persisted))
    }

    /// Crawls one URL end to end
    ///
    /// On success the original and processed renditions are written, the
    /// page is offered to the indexer, its same-domain links are queued and
    /// only then is the URL moved to crawled. On failure the URL leaves the
    /// queue and is logged. Only frontier persistence errors are returned.
    pub async fn crawl_page(&self, worker: &str, url: &str) -> Result<PageOutcome> {
        if self.budget_reached() {
            return Ok(PageOutcome::Skipped);
        }

        let queued = {
            let frontier = self.lock()?;
            if frontier.state.is_crawled(url) || frontier.failed.contains(url) {
                return Ok(PageOutcome::Skipped);
            }
            frontier.state.queued().len()
        };

        let state = PageState::Pending.transition(PageState::Fetching)?;
        tracing::info!(
            "[{}] {} now crawling {} | queued {} | crawled {}",
            self.project.name,
            worker,
            url,
            queued,
            self.crawled_count()
        );

        self.polite_delay().await;

        let page_url = match Url::parse(url) {
            Ok(page_url) => page_url,
            Err(e) => {
                self.log_error(url, &format!("invalid URL: {}", e));
                return self.record_failure(url, state, PageOutcome::Failed);
            }
        };

        match self.fetcher.fetch(&page_url).await {
            FetchResult::Success {
                final_url, body, ..
            } => {
                if let Err(e) = self.persist(url, &body).await {
                    tracing::error!("[{}] Failed to persist {}: {}", self.project.name, url, e);
                    self.log_error(url, &e.to_string());
                    return self.record_failure(url, state, PageOutcome::Failed);
                }

                let base = Url::parse(&final_url).unwrap_or(page_url);
                let links = self.extractor.extract(&base, &body);
                let state = state.transition(PageState::Succeeded)?;
                let links_added = self.commit_success(url, links)?;

                self.succeeded.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(
                    "[{}] {} {} with {} new links",
                    self.project.name,
                    state,
                    url,
                    links_added
                );
                Ok(PageOutcome::Crawled { links_added })
            }
            FetchResult::Blocked { status_code } => {
                tracing::warn!(
                    "[{}] Blocked on {} (HTTP {})",
                    self.project.name,
                    url,
                    status_code
                );
                if let Err(e) = self.log.append_blocked(url, status_code) {
                    tracing::warn!("[{}] Could not write block log: {}", self.project.name, e);
                }
                self.blocked.fetch_add(1, Ordering::SeqCst);
                self.record_failure(url, state, PageOutcome::Blocked { status_code })
            }
            FetchResult::Failed { error, attempts } => {
                tracing::warn!(
                    "[{}] Failed {} after {} attempt(s): {}",
                    self.project.name,
                    url,
                    attempts,
                    error
                );
                self.log_error(url, &format!("{} (attempts: {})", error, attempts));
                self.record_failure(url, state, PageOutcome::Failed)
            }
        }
    }

    async fn polite_delay(&self) {
        if let Some((min, max)) = self.project.delay {
            let millis = fastrand::u64(min.as_millis() as u64..=max.as_millis() as u64);
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    /// Writes both renditions, indexes, and refreshes the budget count
    async fn persist(&self, url: &str, body: &str) -> Result<()> {
        let language = self.project.language;
        self.sink.write(url, body, ContentKind::Original)?;

        let processed = self.processor.process(body, language);
        self.sink
            .write(url, &processed, ContentKind::Processed(language))?;

        self.index(url, body, &processed).await;
        self.refresh_count()?;
        Ok(())
    }

    /// Offers a page to the indexer; failures are only logged
    async fn index(&self, url: &str, body: &str, processed: &str) {
        let document = IndexDocument::new(url, body, processed, self.project.language);
        let result = self
            .index_policy
            .run(|_| self.indexer.index(&document))
            .await;

        if let Err(e) = result {
            tracing::warn!(
                "[{}] Indexing {} failed after {} attempt(s): {}",
                self.project.name,
                url,
                e.attempts,
                e.error
            );
        }
    }

    /// Marks `url` crawled and merges its links, then persists the frontier
    fn commit_success(&self, url: &str, links: HashSet<String>) -> Result<usize> {
        let mut frontier = self.lock()?;
        frontier.state.mark_crawled(url);

        let mut added = 0;
        if self.budget_reached() {
            frontier.state.clear_queued();
        } else {
            for link in links {
                if !frontier.failed.contains(&link) && frontier.state.enqueue(&link) {
                    added += 1;
                }
            }
        }

        self.save(&frontier.state)?;
        Ok(added)
    }

    fn record_failure(
        &self,
        url: &str,
        state: PageState,
        outcome: PageOutcome,
    ) -> Result<PageOutcome> {
        state.transition(PageState::Failed)?;
        if outcome == PageOutcome::Failed {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }

        let mut frontier = self.lock()?;
        frontier.failed.insert(url.to_string());
        if frontier.state.drop_queued(url) {
            self.save(&frontier.state)?;
        }
        Ok(outcome)
    }

    fn log_error(&self, url: &str, message: &str) {
        if let Err(e) = self.log.append_error(url, message) {
            tracing::warn!("[{}] Could not write error log: {}", self.project.name, e);
        }
    }

    /// Persists the frontier, retrying once before giving up
    fn save(&self, state: &FrontierState) -> Result<()> {
        if let Err(first) = self.store.save(state) {
            tracing::warn!(
                "[{}] Saving frontier failed, retrying: {}",
                self.project.name,
                first
            );
            self.store.save(state)?;
        }
        Ok(())
    }

    /// URLs to hand to the work queue
    ///
    /// Re-reads the durable queued set so URLs added by hand mid-run are
    /// picked up, tops the frontier up with seed URLs when it runs thin,
    /// and reseeds the homepage when nothing is queued and the homepage
    /// has neither been crawled nor failed this run.
    pub fn refill_candidates(&self) -> Result<Vec<String>> {
        let mut frontier = self.lock()?;
        if self.budget_reached() {
            return Ok(Vec::new());
        }

        let mut changed = false;
        let durable = self.store.load_queued()?;
        for url in durable {
            if !frontier.failed.contains(&url) && frontier.state.enqueue(&url) {
                changed = true;
            }
        }

        if frontier.state.queued().len() < self.project.max_pages / 2 {
            for seed in &self.project.seed_urls {
                if !frontier.failed.contains(seed) && frontier.state.enqueue(seed) {
                    tracing::debug!("[{}] Seeding {}", self.project.name, seed);
                    changed = true;
                }
            }
        }

        let home = self.project.base_url_str();
        if frontier.state.queued().is_empty()
            && !frontier.state.is_crawled(home)
            && !frontier.failed.contains(home)
        {
            tracing::info!("[{}] Frontier empty, reseeding {}", self.project.name, home);
            frontier.state.enqueue(home);
            changed = true;
        }

        if changed {
            self.save(&frontier.state)?;
        }

        let mut candidates: Vec<String> = frontier
            .state
            .queued()
            .iter()
            .filter(|url| !frontier.failed.contains(*url))
            .cloned()
            .collect();
        candidates.sort_unstable();
        Ok(candidates)
    }

    /// Clears the queued set once the budget is spent
    pub fn finish(&self) -> Result<()> {
        if !self.budget_reached() {
            return Ok(());
        }
        let mut frontier = self.lock()?;
        if !frontier.state.queued().is_empty() {
            tracing::info!(
                "[{}] Budget of {} pages reached, clearing queue",
                self.project.name,
                self.project.max_pages
            );
            frontier.state.clear_queued();
            self.save(&frontier.state)?;
        }
        Ok(())
    }

    /// Removes persisted files below the size threshold
    pub fn clean_small_files(&self) -> Result<usize> {
        let removed = self.sink.clean_small_files()?;
        if removed > 0 {
            tracing::info!(
                "[{}] Removed {} undersized file(s)",
                self.project.name,
                removed
            );
        }
        Ok(removed)
    }
}
