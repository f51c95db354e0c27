//! Crawler coordinator - starts the worker pool and waits for it
//!
//! The coordinator opens both stores, writes any bootstrap seeds into the
//! frontier, then builds and seeds every worker before any of them starts
//! fetching. Workers run as independent tasks and are joined at the end.

use crate::config::{validate, validate_seeds, Config};
use crate::crawler::extractor::{Extractor, HtmlExtractor};
use crate::crawler::fetcher::build_http_client;
use crate::crawler::worker::{CrawlContext, Worker, WorkerReport, WorkerSettings};
use crate::storage::{open_frontier, open_pages, FrontierStore, PageStore};
use crate::DriftnetError;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Totals for a finished crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub workers: Vec<WorkerReport>,
    pub bootstrapped: usize,
    pub elapsed: Duration,
}

impl CrawlReport {
    pub fn pages_crawled(&self) -> u64 {
        self.workers.iter().map(|w| w.pages_crawled).sum()
    }

    pub fn records_produced(&self) -> u64 {
        self.workers.iter().map(|w| w.records_produced).sum()
    }

    pub fn iterations(&self) -> u64 {
        self.workers.iter().map(|w| w.iterations).sum()
    }

    pub fn failures(&self) -> u64 {
        self.workers
            .iter()
            .map(|w| w.transport_failures + w.extraction_failures + w.status_failures)
            .sum()
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    frontier: Arc<dyn FrontierStore>,
    pages: Arc<dyn PageStore>,
    extractor: Arc<dyn Extractor>,
    extra_seeds: Vec<String>,
}

impl Coordinator {
    /// Creates a coordinator backed by the SQLite stores named in `config`
    pub fn new(config: Config) -> Result<Self, DriftnetError> {
        let frontier = open_frontier(Path::new(&config.storage.frontier_path))?;
        let pages = open_pages(Path::new(&config.storage.pages_path))?;

        tracing::info!(
            "Opened frontier at {} and page store at {}",
            config.storage.frontier_path,
            config.storage.pages_path
        );

        Ok(Self::with_stores(config, Arc::new(frontier), Arc::new(pages)))
    }

    /// Creates a coordinator over already-open stores
    pub fn with_stores(
        config: Config,
        frontier: Arc<dyn FrontierStore>,
        pages: Arc<dyn PageStore>,
    ) -> Self {
        Self {
            config,
            frontier,
            pages,
            extractor: Arc::new(HtmlExtractor::default()),
            extra_seeds: Vec::new(),
        }
    }

    /// Replaces the page extractor used by every worker
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Adds seed URLs on top of those in the configuration
    pub fn with_seeds(mut self, seeds: Vec<String>) -> Self {
        self.extra_seeds = seeds;
        self
    }

    /// Inserts bootstrap seeds into the frontier; known URLs are left alone
    fn bootstrap(&self) -> Result<usize, DriftnetError> {
        let seeds: HashSet<String> = self
            .config
            .seeds
            .iter()
            .chain(self.extra_seeds.iter())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if seeds.is_empty() {
            return Ok(0);
        }

        self.frontier.insert_if_absent(&seeds)?;
        tracing::info!("Bootstrapped frontier with {} seed URLs", seeds.len());

        Ok(seeds.len())
    }

    /// Runs the crawl to completion
    ///
    /// Workers are seeded one after another so each claims a disjoint batch,
    /// then all run concurrently. Every worker is joined before returning;
    /// if any failed, the first failure is returned.
    pub async fn run(self) -> Result<CrawlReport, DriftnetError> {
        let started = Instant::now();

        // Stores may be handed in directly, bypassing load_config
        validate(&self.config)?;
        validate_seeds(&self.extra_seeds)?;
        let settings = WorkerSettings::try_from(&self.config.crawler)?;

        let bootstrapped = self.bootstrap()?;

        let ctx = CrawlContext {
            frontier: self.frontier.clone(),
            pages: self.pages.clone(),
            client: build_http_client(&self.config.fetch)?,
            extractor: self.extractor.clone(),
        };

        tracing::info!(
            "Starting {} workers (budget {}, {} seeds each)",
            self.config.crawler.workers,
            settings.fetch_budget,
            settings.initial_seeds
        );

        let mut handles = Vec::with_capacity(self.config.crawler.workers);
        for id in 0..self.config.crawler.workers {
            let mut worker = Worker::new(id, ctx.clone(), settings.clone());
            worker.seed()?;
            handles.push((id, tokio::spawn(worker.run())));
        }

        let mut reports = Vec::with_capacity(handles.len());
        let mut first_error = None;

        for (id, handle) in handles {
            let outcome = handle.await.map_err(|e| DriftnetError::WorkerPanicked {
                worker: id,
                message: e.to_string(),
            });

            match outcome.and_then(|result| result) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::error!(worker = id, "Worker failed: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        let report = CrawlReport {
            workers: reports,
            bootstrapped,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            "Crawl complete: {} pages fetched, {} records stored, {} failures in {:.1}s",
            report.pages_crawled(),
            report.records_produced(),
            report.failures(),
            report.elapsed.as_secs_f64()
        );

        Ok(report)
    }
}

/// Opens the configured stores and runs a crawl
pub async fn run_crawl(config: Config) -> Result<CrawlReport, DriftnetError> {
    Coordinator::new(config)?.run().await
}
