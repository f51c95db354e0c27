//! Crawl worker: the per-slot fetch, extract, enqueue loop
//!
//! Each worker owns a private stack of domain-roots, a visited set, and
//! pending-flush buffers for page records, newly seen URLs and the URLs it
//! attempted. Nothing here is
//! shared with other workers; coordination happens only through the
//! frontier and page stores.
//!
//! # Loop
//!
//! 1. Pop the most recently queued domain-root
//! 2. Skip it if the frontier already has it discovered
//! 3. Fetch it, then mark it discovered whatever the outcome. A root
//!    reached by following links has no frontier row yet, so the popped
//!    and final URLs are also inserted and marked again at the next flush
//! 4. On success, extract; queue new domain-roots and buffer the record
//!    and child URLs
//! 5. On a non-success status, clear the URL's retry flag
//! 6. Spend one unit of budget, unless the fetch failed in transport
//! 7. Every `flush_interval` iterations, flush the buffers

use crate::config::CrawlerConfig;
use crate::crawler::extractor::Extractor;
use crate::crawler::fetcher::{fetch_url, FetchedPage};
use crate::state::WorkerState;
use crate::storage::{FrontierStore, PageRecord, PageStore};
use crate::url::domain_root;
use crate::{ConfigError, DriftnetError};
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Shared collaborators handed to every worker
#[derive(Clone)]
pub struct CrawlContext {
    pub frontier: Arc<dyn FrontierStore>,
    pub pages: Arc<dyn PageStore>,
    pub client: Client,
    pub extractor: Arc<dyn Extractor>,
}

/// Per-worker tuning, taken from the crawler configuration
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub initial_seeds: usize,
    pub fetch_budget: u32,
    pub flush_interval: u32,
    pub min_flush_batch: usize,
    pub iteration_delay: Duration,
}

impl TryFrom<&CrawlerConfig> for WorkerSettings {
    type Error = ConfigError;

    fn try_from(config: &CrawlerConfig) -> Result<Self, Self::Error> {
        if config.flush_interval == 0 {
            return Err(ConfigError::Validation(
                "flush_interval must be >= 1, got 0".to_string(),
            ));
        }

        Ok(Self {
            initial_seeds: config.initial_seeds,
            fetch_budget: config.fetch_budget,
            flush_interval: config.flush_interval,
            min_flush_batch: config.min_flush_batch,
            iteration_delay: Duration::from_millis(config.iteration_delay_ms),
        })
    }
}

/// What happened to one popped domain-root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitOutcome {
    /// Already discovered in the frontier; not fetched
    Skipped,
    /// No response received
    TransportFailure,
    /// Response received with a status other than success
    NonSuccessStatus(u16),
    /// Success status, but the document could not be extracted
    ExtractionFailure,
    /// Page extracted; `queued` new domain-roots were pushed
    Extracted { queued: usize },
}

impl VisitOutcome {
    /// Returns true if this outcome spends one unit of the run budget
    pub fn consumes_budget(&self) -> bool {
        !matches!(self, Self::Skipped | Self::TransportFailure)
    }
}

/// Summary of a finished worker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker: usize,
    pub seeds: usize,
    pub iterations: u64,
    pub pages_crawled: u64,
    pub records_produced: u64,
    pub skipped: u64,
    pub transport_failures: u64,
    pub extraction_failures: u64,
    pub status_failures: u64,
    pub flushes: u64,
}

/// A single crawl worker
pub struct Worker {
    id: usize,
    ctx: CrawlContext,
    settings: WorkerSettings,
    state: WorkerState,
    budget: u32,

    /// Domain-roots awaiting fetch; popped from the end
    queue: Vec<String>,
    /// Mirror of `queue` for membership checks
    queued: HashSet<String>,
    visited: HashSet<String>,

    pending_pages: Vec<PageRecord>,
    pending_urls: HashSet<String>,
    /// URLs this worker fetched or tried to; persisted as discovered
    attempted: HashSet<String>,

    report: WorkerReport,
}

impl Worker {
    /// Creates a worker in the `Seeding` state
    pub fn new(id: usize, ctx: CrawlContext, settings: WorkerSettings) -> Self {
        let budget = settings.fetch_budget;
        Self {
            id,
            ctx,
            settings,
            state: WorkerState::Seeding,
            budget,
            queue: Vec::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            pending_pages: Vec::new(),
            pending_urls: HashSet::new(),
            attempted: HashSet::new(),
            report: WorkerReport {
                worker: id,
                ..Default::default()
            },
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn remaining_budget(&self) -> u32 {
        self.budget
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    fn transition(&mut self, next: WorkerState) -> Result<(), DriftnetError> {
        if !self.state.can_transition_to(next) {
            return Err(DriftnetError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!(worker = self.id, "{} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Claims the initial seed batch from the frontier
    ///
    /// Moves to `Running` if anything was claimed, otherwise straight to
    /// `Done`. Returns the number of seeds claimed.
    pub fn seed(&mut self) -> Result<usize, DriftnetError> {
        let seeds = self.ctx.frontier.claim_seeds(self.settings.initial_seeds)?;
        self.report.seeds = seeds.len();

        if seeds.is_empty() {
            tracing::info!(worker = self.id, "No seeds available, nothing to crawl");
            self.finish()?;
            return Ok(0);
        }

        tracing::debug!(worker = self.id, seeds = seeds.len(), "Claimed seeds");
        for seed in seeds {
            self.enqueue(seed);
        }
        self.transition(WorkerState::Running)?;

        Ok(self.report.seeds)
    }

    /// Runs the worker to completion
    ///
    /// Seeds first if that has not happened yet. Transport, extraction and
    /// status failures are contained here; only store failures are returned.
    pub async fn run(mut self) -> Result<WorkerReport, DriftnetError> {
        if self.state == WorkerState::Seeding {
            self.seed()?;
        }

        while self.state == WorkerState::Running && self.budget > 0 && !self.queue.is_empty() {
            self.step().await?;
        }

        if !self.state.is_terminal() {
            self.finish()?;
        }

        tracing::info!(
            worker = self.id,
            pages = self.report.pages_crawled,
            records = self.report.records_produced,
            iterations = self.report.iterations,
            flushes = self.report.flushes,
            "Crawled {} urls",
            self.report.pages_crawled
        );

        Ok(self.report)
    }

    /// Performs one loop iteration; returns `None` when the queue is empty
    pub async fn step(&mut self) -> Result<Option<VisitOutcome>, DriftnetError> {
        let Some(url) = self.pop() else {
            return Ok(None);
        };
        self.report.iterations += 1;

        let outcome = self.visit(&url).await?;

        if outcome.consumes_budget() {
            self.budget = self.budget.saturating_sub(1);
            if !self.settings.iteration_delay.is_zero() {
                tokio::time::sleep(self.settings.iteration_delay).await;
            }
        }

        let flush_due = self
            .report
            .iterations
            .checked_rem(u64::from(self.settings.flush_interval))
            == Some(0);
        if flush_due {
            self.checkpoint()?;
        }

        Ok(Some(outcome))
    }

    /// Fetches one domain-root and records the outcome
    async fn visit(&mut self, url: &str) -> Result<VisitOutcome, DriftnetError> {
        if self.ctx.frontier.is_discovered(url)? {
            tracing::debug!(worker = self.id, url, "Skipped due to duplicate");
            self.report.skipped += 1;
            return Ok(VisitOutcome::Skipped);
        }

        let fetched = fetch_url(&self.ctx.client, url).await;

        // Recorded before anything else so no other worker claims it as a seed
        let popped: HashSet<String> = [url.to_string()].into_iter().collect();
        self.ctx.frontier.mark_discovered(&popped)?;
        self.visited.insert(url.to_string());
        self.attempted.insert(url.to_string());

        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(worker = self.id, url, kind = e.kind(), "Transport failure: {}", e);
                self.report.transport_failures += 1;
                return Ok(VisitOutcome::TransportFailure);
            }
        };
        self.attempted.insert(page.final_url.clone());

        tracing::info!(
            worker = self.id,
            url,
            status = page.status_code,
            queue = self.queue.len(),
            budget = self.budget,
            "Crawling"
        );

        if !page.is_success() {
            self.ctx.frontier.set_retry_allowed(url, false)?;
            self.report.status_failures += 1;
            return Ok(VisitOutcome::NonSuccessStatus(page.status_code));
        }

        self.report.pages_crawled += 1;
        Ok(self.absorb(url, &page))
    }

    /// Extracts a successfully fetched page into the worker's buffers
    fn absorb(&mut self, url: &str, page: &FetchedPage) -> VisitOutcome {
        if let Some(root) = Url::parse(&page.final_url)
            .ok()
            .and_then(|final_url| domain_root(&final_url))
        {
            self.visited.insert(root);
        }

        let extraction = match self.ctx.extractor.extract(page, &self.visited) {
            Ok(extraction) => extraction,
            Err(e) => {
                tracing::warn!(worker = self.id, url, "Error while extracting data: {}", e);
                self.report.extraction_failures += 1;
                return VisitOutcome::ExtractionFailure;
            }
        };

        let mut queued = 0;
        for root in &extraction.child_domain_roots {
            if self.enqueue(root.clone()) {
                queued += 1;
            }
        }

        self.pending_urls
            .extend(extraction.child_urls.iter().cloned());
        self.pending_pages.push(extraction.to_page_record(url));
        self.report.records_produced += 1;

        VisitOutcome::Extracted { queued }
    }

    /// Pushes a domain-root unless it is already queued or visited
    fn enqueue(&mut self, root: String) -> bool {
        if self.visited.contains(&root) || self.queued.contains(&root) {
            return false;
        }
        self.queued.insert(root.clone());
        self.queue.push(root);
        true
    }

    fn pop(&mut self) -> Option<String> {
        let url = self.queue.pop()?;
        self.queued.remove(&url);
        Some(url)
    }

    /// Mid-run flush; the URL buffer is held back while it is small
    fn checkpoint(&mut self) -> Result<(), DriftnetError> {
        self.transition(WorkerState::Flushing)?;
        self.flush(false)?;
        self.transition(WorkerState::Running)
    }

    /// Final flush; writes whatever is left regardless of size
    fn finish(&mut self) -> Result<(), DriftnetError> {
        self.transition(WorkerState::Done)?;
        self.flush(true)
    }

    fn flush(&mut self, unconditional: bool) -> Result<(), DriftnetError> {
        let mut wrote = false;

        if !self.pending_pages.is_empty() {
            self.ctx.pages.insert_pages(&self.pending_pages).map_err(|e| {
                tracing::error!(worker = self.id, "Failed to flush page records: {}", e);
                e
            })?;
            tracing::debug!(
                worker = self.id,
                records = self.pending_pages.len(),
                "Flushed page records"
            );
            self.pending_pages.clear();
            wrote = true;
        }

        let urls_ready = unconditional || self.pending_urls.len() > self.settings.min_flush_batch;
        if urls_ready && !self.pending_urls.is_empty() {
            self.ctx
                .frontier
                .insert_if_absent(&self.pending_urls)
                .map_err(|e| {
                    tracing::error!(worker = self.id, "Failed to flush frontier URLs: {}", e);
                    e
                })?;
            tracing::debug!(
                worker = self.id,
                urls = self.pending_urls.len(),
                "Flushed frontier URLs"
            );
            self.pending_urls.clear();
            wrote = true;
        }

        if !self.attempted.is_empty() {
            // Insert first: mark_discovered leaves absent URLs alone
            self.ctx
                .frontier
                .insert_if_absent(&self.attempted)
                .and_then(|_| self.ctx.frontier.mark_discovered(&self.attempted))
                .map_err(|e| {
                    tracing::error!(worker = self.id, "Failed to flush attempted URLs: {}", e);
                    e
                })?;
            tracing::debug!(
                worker = self.id,
                urls = self.attempted.len(),
                "Recorded attempted URLs as discovered"
            );
            self.attempted.clear();
            wrote = true;
        }

        if wrote {
            self.report.flushes += 1;
        }

        Ok(())
    }
}
