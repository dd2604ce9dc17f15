//! One attempt of a scrape run, with the status bookkeeping around it.

use std::sync::Arc;

use thiserror::Error;

use crate::orchestrator::{ScrapeOrchestrator, ScrapeReport};
use crate::store::{ScrapeStore, StoreError};
use crate::CoreError;

/// A request to scrape listings for one stored resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub resume_id: i64,
    pub location: String,
    pub jobs_per_site: usize,
}

/// Shared dependencies of every attempt.
#[derive(Clone)]
pub struct TaskContext {
    pub orchestrator: Arc<ScrapeOrchestrator>,
    pub store: Arc<dyn ScrapeStore>,
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl TaskError {
    /// Whether another attempt could succeed.
    ///
    /// A missing resume, a run that lost its claim and an illegal status
    /// change will not fix themselves; storage hiccups and aborted runs might.
    pub fn is_retryable(&self) -> bool {
        match self {
            TaskError::Store(StoreError::Database(_)) => true,
            TaskError::Store(
                StoreError::NotFound(_)
                | StoreError::Superseded { .. }
                | StoreError::InvalidTransition { .. },
            ) => false,
            TaskError::Core(_) => true,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, TaskError::Store(StoreError::Superseded { .. }))
    }
}

/// What a successful attempt stored.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub jobs_created: usize,
    pub report: ScrapeReport,
}

/// Run one attempt for `request` under `run_id`.
///
/// On failure the resume is marked failed with an `Error: …` message, unless
/// the run no longer owns it or it does not exist.
pub async fn run_scrape_attempt(
    ctx: &TaskContext,
    request: &ScrapeRequest,
    run_id: &str,
) -> Result<AttemptOutcome, TaskError> {
    let result = attempt(ctx, request, run_id).await;

    if let Err(e) = &result {
        let owned_elsewhere = matches!(
            e,
            TaskError::Store(StoreError::NotFound(_) | StoreError::Superseded { .. })
        );
        if !owned_elsewhere {
            let message = format!("Error: {e}");
            if let Err(store_err) = ctx.store.fail_run(request.resume_id, run_id, &message) {
                tracing::warn!(
                    resume_id = request.resume_id,
                    run_id,
                    error = %store_err,
                    "could not record failure"
                );
            }
        }
    }

    result
}

async fn attempt(
    ctx: &TaskContext,
    request: &ScrapeRequest,
    run_id: &str,
) -> Result<AttemptOutcome, TaskError> {
    let resume_id = request.resume_id;
    let doc = ctx.store.begin_run(resume_id, run_id)?;
    tracing::info!(resume_id, run_id, path = %doc.file_path.display(), "scrape started");

    let keywords = ctx.orchestrator.extract_keywords(&doc.file_path).await?;
    ctx.store.record_keywords(resume_id, run_id, &keywords.joined())?;

    let report = ctx
        .orchestrator
        .scrape(&keywords, &request.location, request.jobs_per_site)
        .await;

    let jobs_created = ctx.store.insert_jobs(resume_id, run_id, &report.jobs)?;
    ctx.store.complete_run(
        resume_id,
        run_id,
        &format!("Successfully scraped {jobs_created} jobs"),
    )?;

    let summary = report.summary();
    tracing::info!(
        resume_id,
        run_id,
        jobs_created,
        found = summary.found,
        empty = summary.empty,
        failed = summary.failed,
        "scrape completed"
    );

    Ok(AttemptOutcome {
        jobs_created,
        report,
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::backend::{BackendError, DocumentBackend};
    use crate::sites::SiteAdapter;
    use crate::sites::mock::MockSite;
    use crate::store::MemoryStore;
    use crate::{Config, Platform, ScrapeStatus};

    struct Text(&'static str);

    impl DocumentBackend for Text {
        fn extract_text(&self, _path: &Path) -> Result<String, BackendError> {
            Ok(self.0.to_string())
        }
    }

    fn context(store: Arc<MemoryStore>) -> TaskContext {
        let config = Config {
            politeness_delay_ms: 0,
            ..Config::default()
        };
        let sites: Vec<Arc<dyn SiteAdapter>> = vec![
            Arc::new(MockSite::found(Platform::LinkedIn, 2)),
            Arc::new(MockSite::empty(Platform::RemoteOk)),
        ];
        let orchestrator =
            ScrapeOrchestrator::with_sites(&config, Arc::new(Text("Rust backend, 3 years")), sites)
                .unwrap();
        TaskContext {
            orchestrator: Arc::new(orchestrator),
            store,
        }
    }

    fn request(resume_id: i64) -> ScrapeRequest {
        ScrapeRequest {
            resume_id,
            location: "India".into(),
            jobs_per_site: 2,
        }
    }

    #[tokio::test]
    async fn successful_attempt_completes_resume() {
        let store = Arc::new(MemoryStore::new());
        let doc = store.create_resume(Path::new("cv.pdf")).unwrap();
        store.enqueue_run(doc.id, "run-1").unwrap();
        let ctx = context(store.clone());

        let outcome = run_scrape_attempt(&ctx, &request(doc.id), "run-1").await.unwrap();

        // Two found, plus two placeholders sharing one search link.
        assert_eq!(outcome.jobs_created, 3);
        assert_eq!(outcome.report.jobs.len(), 4);
        let doc = store.get_resume(doc.id).unwrap();
        assert_eq!(doc.status, ScrapeStatus::Completed);
        assert_eq!(doc.result, "Successfully scraped 3 jobs");
        assert_eq!(doc.keywords, "backend, rust, 3 years experience");
    }

    #[tokio::test]
    async fn rerun_with_same_links_creates_no_duplicates() {
        let store = Arc::new(MemoryStore::new());
        let doc = store.create_resume(Path::new("cv.pdf")).unwrap();
        let ctx = context(store.clone());

        store.enqueue_run(doc.id, "run-1").unwrap();
        run_scrape_attempt(&ctx, &request(doc.id), "run-1").await.unwrap();
        store.enqueue_run(doc.id, "run-2").unwrap();
        let second = run_scrape_attempt(&ctx, &request(doc.id), "run-2").await.unwrap();

        assert_eq!(second.jobs_created, 0);
        assert_eq!(store.jobs_for(doc.id).unwrap().len(), 3);
        assert_eq!(
            store.get_resume(doc.id).unwrap().result,
            "Successfully scraped 0 jobs"
        );
    }

    #[tokio::test]
    async fn missing_resume_is_terminal() {
        let store = Arc::new(MemoryStore::new());
        let ctx = context(store);

        let err = run_scrape_attempt(&ctx, &request(99), "run-1").await.unwrap_err();
        assert!(matches!(err, TaskError::Store(StoreError::NotFound(99))));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn stale_run_leaves_newer_run_untouched() {
        let store = Arc::new(MemoryStore::new());
        let doc = store.create_resume(Path::new("cv.pdf")).unwrap();
        store.enqueue_run(doc.id, "old").unwrap();
        store.enqueue_run(doc.id, "new").unwrap();
        let ctx = context(store.clone());

        let err = run_scrape_attempt(&ctx, &request(doc.id), "old").await.unwrap_err();
        assert!(err.is_superseded());
        assert!(!err.is_retryable());

        let doc = store.get_resume(doc.id).unwrap();
        assert_eq!(doc.status, ScrapeStatus::Pending);
        assert_eq!(doc.run_id.as_deref(), Some("new"));
    }

    #[test]
    fn classification() {
        assert!(TaskError::Store(StoreError::Database("locked".into())).is_retryable());
        assert!(
            !TaskError::Store(StoreError::InvalidTransition {
                resume_id: 1,
                from: ScrapeStatus::Completed,
                to: ScrapeStatus::Processing,
            })
            .is_retryable()
        );
    }
}
