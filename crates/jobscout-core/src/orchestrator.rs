use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::DocumentBackend;
use crate::keywords::{KeywordSet, default_keywords, extract_keywords};
use crate::sites::{FetchOutcome, SiteAdapter, build_site_list, records_from_outcome};
use crate::{Config, CoreError, JobRecord, MAX_JOBS_PER_SITE, Platform};

/// How one platform fared within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformStatus {
    /// Postings were parsed from the page.
    Found(usize),
    /// The page loaded but had no recognisable postings.
    Empty,
    /// Network, status, parse or task failure.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformOutcome {
    pub platform: Platform,
    pub status: PlatformStatus,
    /// Records this platform added to the run, placeholders included.
    pub contributed: usize,
    pub elapsed: Duration,
}

/// Everything one scrape run produced.
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub keywords: KeywordSet,
    pub outcomes: Vec<PlatformOutcome>,
    /// Concatenated records in platform order. Not deduplicated.
    pub jobs: Vec<JobRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub found: usize,
    pub empty: usize,
    pub failed: usize,
}

impl ScrapeReport {
    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for outcome in &self.outcomes {
            match outcome.status {
                PlatformStatus::Found(_) => summary.found += 1,
                PlatformStatus::Empty => summary.empty += 1,
                PlatformStatus::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }
}

/// Drives one resume through extraction, keyword matching and every
/// enabled job board.
pub struct ScrapeOrchestrator {
    backend: Arc<dyn DocumentBackend>,
    sites: Vec<Arc<dyn SiteAdapter>>,
    client: reqwest::Client,
    timeout: Duration,
    politeness_delay: Duration,
    fallback_records: bool,
}

impl ScrapeOrchestrator {
    /// Build an orchestrator over the built-in job boards.
    pub fn new(config: &Config, backend: Arc<dyn DocumentBackend>) -> Result<Self, CoreError> {
        let sites = build_site_list(config);
        Self::with_sites(config, backend, sites)
    }

    /// Build an orchestrator over an explicit list of adapters, visited in
    /// the order given.
    pub fn with_sites(
        config: &Config,
        backend: Arc<dyn DocumentBackend>,
        sites: Vec<Arc<dyn SiteAdapter>>,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            backend,
            sites,
            client: config.build_client()?,
            timeout: config.request_timeout(),
            politeness_delay: config.politeness_delay(),
            fallback_records: config.fallback_records,
        })
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.sites.iter().map(|s| s.platform()).collect()
    }

    /// Extract keywords from a resume, substituting the defaults when the
    /// document yields none.
    pub async fn extract_keywords(&self, path: &Path) -> Result<KeywordSet, CoreError> {
        let backend = Arc::clone(&self.backend);
        let owned: PathBuf = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || backend.extract_text(&owned)).await?;

        let text = text.unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "text extraction failed");
            String::new()
        });

        let keywords = extract_keywords(&text);
        if keywords.is_empty() {
            tracing::warn!(path = %path.display(), "no keywords found, using defaults");
            return Ok(default_keywords());
        }
        tracing::debug!(path = %path.display(), keywords = %keywords.joined(), "extracted keywords");
        Ok(keywords)
    }

    /// Query every site in order, sleeping after each one. `limit` is capped
    /// at [`MAX_JOBS_PER_SITE`].
    pub async fn scrape(&self, keywords: &KeywordSet, location: &str, limit: usize) -> ScrapeReport {
        let limit = limit.min(MAX_JOBS_PER_SITE);
        let terms: Arc<[String]> = keywords.to_query_terms().into();
        let location: Arc<str> = Arc::from(location);
        let mut outcomes = Vec::with_capacity(self.sites.len());
        let mut jobs = Vec::new();

        for site in &self.sites {
            let platform = site.platform();
            let start = Instant::now();

            let handle = {
                let site = Arc::clone(site);
                let terms = Arc::clone(&terms);
                let location = Arc::clone(&location);
                let client = self.client.clone();
                let timeout = self.timeout;
                tokio::spawn(async move {
                    site.fetch(&terms, &location, limit, &client, timeout).await
                })
            };

            let (status, records) = match handle.await {
                Ok(outcome) => {
                    let status = match &outcome {
                        FetchOutcome::Found(records) => PlatformStatus::Found(records.len().min(limit)),
                        FetchOutcome::Empty { .. } => PlatformStatus::Empty,
                        FetchOutcome::Failed { reason, .. } => PlatformStatus::Failed(reason.clone()),
                    };
                    let records = records_from_outcome(
                        site.as_ref(),
                        &outcome,
                        &terms,
                        &location,
                        limit,
                        self.fallback_records,
                    );
                    (status, records)
                }
                Err(e) => {
                    tracing::error!(platform = %platform, error = %e, "site task aborted");
                    (PlatformStatus::Failed(e.to_string()), Vec::new())
                }
            };

            tracing::info!(
                platform = %platform,
                status = ?status,
                contributed = records.len(),
                "platform done"
            );
            outcomes.push(PlatformOutcome {
                platform,
                status,
                contributed: records.len(),
                elapsed: start.elapsed(),
            });
            jobs.extend(records);

            if !self.politeness_delay.is_zero() {
                tokio::time::sleep(self.politeness_delay).await;
            }
        }

        ScrapeReport {
            keywords: keywords.clone(),
            outcomes,
            jobs,
        }
    }

    /// Extract keywords from `resume_path` and scrape every site for them.
    pub async fn run(
        &self,
        resume_path: &Path,
        location: &str,
        jobs_per_site: usize,
    ) -> Result<ScrapeReport, CoreError> {
        let keywords = self.extract_keywords(resume_path).await?;
        Ok(self.scrape(&keywords, location, jobs_per_site).await)
    }
}
