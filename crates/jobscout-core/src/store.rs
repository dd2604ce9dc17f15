//! Persistence seam for the scrape pipeline.
//!
//! Every write made on behalf of a run carries that run's id, and the store
//! rejects it with [`StoreError::Superseded`] once a newer run has claimed the
//! resume. This keeps a slow, stale run from overwriting the status or
//! listings of a fresh re-scrape.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{JobListing, JobRecord, ResumeDocument, ScrapeStatus};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("resume {0} not found")]
    NotFound(i64),
    #[error("run {run_id} for resume {resume_id} was superseded by a newer run")]
    Superseded { resume_id: i64, run_id: String },
    #[error("resume {resume_id} cannot move from {from} to {to}")]
    InvalidTransition {
        resume_id: i64,
        from: ScrapeStatus,
        to: ScrapeStatus,
    },
}

/// Storage operations the scrape task needs.
///
/// Implementations must be safe to share between worker tasks; the calls are
/// short and synchronous.
pub trait ScrapeStore: Send + Sync {
    /// Claim the resume for a new run: status becomes pending, `run_id` is
    /// recorded as current and the previous result message is cleared.
    fn enqueue_run(&self, resume_id: i64, run_id: &str) -> Result<(), StoreError>;

    /// Move the resume to processing for `run_id`. Allowed from pending, and
    /// from failed so a retry can re-enter.
    fn begin_run(&self, resume_id: i64, run_id: &str) -> Result<ResumeDocument, StoreError>;

    /// Overwrite the resume's keyword string.
    fn record_keywords(&self, resume_id: i64, run_id: &str, keywords: &str)
    -> Result<(), StoreError>;

    /// Persist listings, skipping any link already stored for this resume.
    /// Returns the number of rows created.
    fn insert_jobs(
        &self,
        resume_id: i64,
        run_id: &str,
        records: &[JobRecord],
    ) -> Result<usize, StoreError>;

    fn complete_run(&self, resume_id: i64, run_id: &str, message: &str) -> Result<(), StoreError>;

    fn fail_run(&self, resume_id: i64, run_id: &str, message: &str) -> Result<(), StoreError>;

    /// Mark listings scraped before `cutoff` inactive. Returns how many changed.
    fn deactivate_stale(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
}

/// Check that `run_id` still owns `doc`.
pub fn ensure_current(doc: &ResumeDocument, run_id: &str) -> Result<(), StoreError> {
    if doc.run_id.as_deref() == Some(run_id) {
        Ok(())
    } else {
        Err(StoreError::Superseded {
            resume_id: doc.id,
            run_id: run_id.to_string(),
        })
    }
}

/// Whether a resume may move from `from` to `to` within a run.
pub fn transition_allowed(from: ScrapeStatus, to: ScrapeStatus) -> bool {
    use ScrapeStatus::*;
    matches!(
        (from, to),
        (Pending, Processing)
            | (Failed, Processing)
            | (Processing, Completed)
            | (Processing, Failed)
    )
}

#[derive(Default)]
struct MemoryInner {
    resumes: HashMap<i64, ResumeDocument>,
    jobs: Vec<JobListing>,
    next_resume_id: i64,
    next_job_id: i64,
}

/// A `ScrapeStore` held entirely in memory. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_resume(&self, file_path: &Path) -> Result<ResumeDocument, StoreError> {
        let mut inner = self.lock()?;
        inner.next_resume_id += 1;
        let doc = ResumeDocument {
            id: inner.next_resume_id,
            file_path: file_path.to_path_buf(),
            uploaded_at: Utc::now(),
            keywords: String::new(),
            status: ScrapeStatus::Pending,
            result: String::new(),
            run_id: None,
        };
        inner.resumes.insert(doc.id, doc.clone());
        Ok(doc)
    }

    pub fn get_resume(&self, resume_id: i64) -> Result<ResumeDocument, StoreError> {
        let inner = self.lock()?;
        inner
            .resumes
            .get(&resume_id)
            .cloned()
            .ok_or(StoreError::NotFound(resume_id))
    }

    pub fn jobs_for(&self, resume_id: i64) -> Result<Vec<JobListing>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .jobs
            .iter()
            .filter(|j| j.resume_id == resume_id)
            .cloned()
            .collect())
    }

    /// Backdate every listing of a resume. Lets tests exercise the sweep.
    pub fn backdate_jobs(&self, resume_id: i64, scraped_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        for job in inner.jobs.iter_mut().filter(|j| j.resume_id == resume_id) {
            job.scraped_at = scraped_at;
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>, StoreError> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Database(format!("lock poisoned: {e}")))
    }

    fn with_current<T>(
        &self,
        resume_id: i64,
        run_id: &str,
        f: impl FnOnce(&mut ResumeDocument) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut inner = self.lock()?;
        let doc = inner
            .resumes
            .get_mut(&resume_id)
            .ok_or(StoreError::NotFound(resume_id))?;
        ensure_current(doc, run_id)?;
        f(doc)
    }

    fn transition(
        &self,
        resume_id: i64,
        run_id: &str,
        to: ScrapeStatus,
        message: Option<&str>,
    ) -> Result<ResumeDocument, StoreError> {
        self.with_current(resume_id, run_id, |doc| {
            if !transition_allowed(doc.status, to) {
                return Err(StoreError::InvalidTransition {
                    resume_id,
                    from: doc.status,
                    to,
                });
            }
            doc.status = to;
            if let Some(message) = message {
                doc.result = message.to_string();
            }
            Ok(doc.clone())
        })
    }
}

impl ScrapeStore for MemoryStore {
    fn enqueue_run(&self, resume_id: i64, run_id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let doc = inner
            .resumes
            .get_mut(&resume_id)
            .ok_or(StoreError::NotFound(resume_id))?;
        doc.status = ScrapeStatus::Pending;
        doc.run_id = Some(run_id.to_string());
        doc.result.clear();
        Ok(())
    }

    fn begin_run(&self, resume_id: i64, run_id: &str) -> Result<ResumeDocument, StoreError> {
        self.transition(resume_id, run_id, ScrapeStatus::Processing, None)
    }

    fn record_keywords(
        &self,
        resume_id: i64,
        run_id: &str,
        keywords: &str,
    ) -> Result<(), StoreError> {
        self.with_current(resume_id, run_id, |doc| {
            doc.keywords = keywords.to_string();
            Ok(())
        })
    }

    fn insert_jobs(
        &self,
        resume_id: i64,
        run_id: &str,
        records: &[JobRecord],
    ) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let doc = inner
            .resumes
            .get(&resume_id)
            .ok_or(StoreError::NotFound(resume_id))?;
        ensure_current(doc, run_id)?;

        let mut created = 0;
        for record in records {
            let exists = inner
                .jobs
                .iter()
                .any(|j| j.resume_id == resume_id && j.link == record.link);
            if exists {
                continue;
            }
            inner.next_job_id += 1;
            let listing = JobListing {
                id: inner.next_job_id,
                resume_id,
                title: record.title.clone(),
                company: record.company.clone(),
                platform: record.platform,
                link: record.link.clone(),
                location: record.location.clone(),
                description: None,
                scraped_at: Utc::now(),
                is_active: true,
            };
            inner.jobs.push(listing);
            created += 1;
        }
        Ok(created)
    }

    fn complete_run(&self, resume_id: i64, run_id: &str, message: &str) -> Result<(), StoreError> {
        self.transition(resume_id, run_id, ScrapeStatus::Completed, Some(message))
            .map(|_| ())
    }

    fn fail_run(&self, resume_id: i64, run_id: &str, message: &str) -> Result<(), StoreError> {
        self.transition(resume_id, run_id, ScrapeStatus::Failed, Some(message))
            .map(|_| ())
    }

    fn deactivate_stale(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let mut changed = 0;
        for job in inner
            .jobs
            .iter_mut()
            .filter(|j| j.is_active && j.scraped_at < cutoff)
        {
            job.is_active = false;
            changed += 1;
        }
        Ok(changed)
    }
}
