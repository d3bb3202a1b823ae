//! Crawler coordinator - worker pool for one project
//!
//! This module runs a project's crawl to completion:
//! - Filling the in-memory work queue from the frontier
//! - Running N workers that dequeue and crawl URLs concurrently
//! - A monitor that reports progress and tops the queue up
//! - Stopping on budget or when the frontier is exhausted
//! - A final cleanup pass over undersized files

use crate::config::SchedulerConfig;
use crate::crawler::queue::{Dequeue, WorkQueue};
use crate::crawler::spider::Spider;
use crate::output::CrawlSummary;
use crate::{Result, SpiderError};
use chrono::{SecondsFormat, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Main crawler coordinator structure
pub struct Coordinator {
    spider: Arc<Spider>,
    queue: Arc<WorkQueue>,
    dequeue_timeout: Duration,
    monitor_interval: Duration,
}

impl Coordinator {
    /// Creates a coordinator around a booted spider
    pub fn new(spider: Spider, scheduler: &SchedulerConfig) -> Self {
        Self {
            spider: Arc::new(spider),
            queue: Arc::new(WorkQueue::new(scheduler.queue_capacity)),
            dequeue_timeout: Duration::from_millis(scheduler.dequeue_timeout_ms),
            monitor_interval: Duration::from_millis(scheduler.monitor_interval_ms),
        }
    }

    pub fn spider(&self) -> &Spider {
        &self.spider
    }

    /// Runs the crawl until the budget is reached or the frontier is exhausted
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - The run finished
    /// * `Err(SpiderError)` - A worker hit a fatal error (frontier could not
    ///   be persisted); the other workers were stopped
    pub async fn run(&self) -> Result<CrawlSummary> {
        let started = Utc::now();
        let project = self.spider.project().name.clone();
        let threads = self.spider.project().threads.max(1);

        tracing::info!(
            "[{}] Starting crawl of {} with {} worker(s), budget {} pages",
            project,
            self.spider.project().base_url,
            threads,
            self.spider.project().max_pages
        );

        let exhausted = Arc::new(AtomicBool::new(false));
        if self.spider.budget_reached() {
            self.queue.close();
        } else {
            refill(&self.spider, &self.queue)?;
        }

        let mut workers = JoinSet::new();
        for id in 1..=threads {
            let worker = Worker {
                name: format!("{}-{}", project, id),
                spider: Arc::clone(&self.spider),
                queue: Arc::clone(&self.queue),
                dequeue_timeout: self.dequeue_timeout,
                exhausted: Arc::clone(&exhausted),
            };
            workers.spawn(worker.run());
        }

        let monitor = tokio::spawn(monitor(
            Arc::clone(&self.spider),
            Arc::clone(&self.queue),
            self.monitor_interval,
        ));

        let mut first_error = None;
        while let Some(joined) = workers.join_next().await {
            let error = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(e) => SpiderError::Task(e.to_string()),
            };
            tracing::error!("[{}] Worker stopped: {}", project, error);
            self.queue.close();
            first_error.get_or_insert(error);
        }

        self.queue.close();
        if let Err(e) = monitor.await {
            tracing::warn!("[{}] Monitor task failed: {}", project, e);
        }

        if let Some(error) = first_error {
            return Err(error);
        }

        self.spider.finish()?;
        let removed_small_files = self.spider.clean_small_files()?;
        self.spider.refresh_count()?;

        let finished = Utc::now();
        let summary = CrawlSummary {
            project: project.clone(),
            started_at: started.to_rfc3339_opts(SecondsFormat::Secs, true),
            finished_at: finished.to_rfc3339_opts(SecondsFormat::Secs, true),
            duration_seconds: (finished - started).num_seconds().max(0) as u64,
            crawled_count: self.spider.crawled_count(),
            max_pages: self.spider.project().max_pages,
            pages_succeeded: self.spider.pages_succeeded(),
            pages_failed: self.spider.pages_failed(),
            pages_blocked: self.spider.pages_blocked(),
            queued_remaining: self.spider.queued_len()?,
            exhausted: exhausted.load(Ordering::SeqCst),
            removed_small_files,
        };

        tracing::info!(
            "[{}] Crawl finished: {} / {} pages in {}s",
            project,
            summary.crawled_count,
            summary.max_pages,
            summary.duration_seconds
        );
        Ok(summary)
    }
}

/// Hands the spider's refill candidates to the queue
fn refill(spider: &Spider, queue: &WorkQueue) -> Result<usize> {
    let candidates = spider.refill_candidates()?;
    let added = queue.push_many(candidates);
    if added > 0 {
        tracing::debug!("[{}] Refilled {} URL(s)", spider.project().name, added);
    }
    Ok(added)
}

struct Worker {
    name: String,
    spider: Arc<Spider>,
    queue: Arc<WorkQueue>,
    dequeue_timeout: Duration,
    exhausted: Arc<AtomicBool>,
}

impl Worker {
    async fn run(self) -> Result<()> {
        tracing::debug!("{} started", self.name);

        loop {
            if self.spider.budget_reached() {
                self.queue.close();
                break;
            }

            match self.queue.pop_timeout(self.dequeue_timeout).await {
                Dequeue::Closed => break,
                Dequeue::Item(url) => {
                    let result = self.spider.crawl_page(&self.name, &url).await;
                    self.queue.complete(&url);
                    result?;
                }
                Dequeue::Empty => {
                    // Nothing pending or in flight before the refill, nothing
                    // added by it, and no activity since: the frontier is done.
                    let idle = self.queue.idle_generation();
                    let added = refill(&self.spider, &self.queue)?;
                    if added == 0 && idle.is_some_and(|g| self.queue.idle_since(g)) {
                        tracing::info!(
                            "[{}] Frontier exhausted",
                            self.spider.project().name
                        );
                        self.exhausted.store(true, Ordering::SeqCst);
                        self.queue.close();
                        break;
                    }
                }
            }
        }

        tracing::debug!("{} stopped", self.name);
        Ok(())
    }
}

/// Periodic progress report and queue top-up
async fn monitor(spider: Arc<Spider>, queue: Arc<WorkQueue>, interval: Duration) {
    loop {
        tokio::select! {
            _ = queue.closed() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let crawled = spider.crawled_count();
        tracing::info!(
            project = %spider.project().name,
            crawled,
            max_pages = spider.project().max_pages,
            queued = queue.len(),
            in_flight = queue.in_flight(),
            "Progress"
        );

        if spider.budget_reached() {
            queue.close();
            break;
        }

        if queue.len() < spider.remaining_budget().saturating_mul(2) {
            if let Err(e) = refill(&spider, &queue) {
                tracing::warn!("[{}] Monitor refill failed: {}", spider.project().name, e);
            }
        }
    }
}
