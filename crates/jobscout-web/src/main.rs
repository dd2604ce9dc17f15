use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use jobscout_core::{
    QueueConfig, ScrapeOrchestrator, ScrapeQueue, ScrapeRequest, ScrapeStatus, TaskContext,
    config_file, maintenance,
};
use jobscout_ingest::ResumeExtractor;
use jobscout_store::SqliteStore;

mod handlers;
mod models;
mod state;
mod upload;

use state::AppState;

const DEFAULT_ADDR: &str = "0.0.0.0:5002";
const DEFAULT_DB: &str = "jobscout.db";
const SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

fn router(state: Arc<AppState>) -> Router {
    // Resumes are small; 16MB is plenty.
    let body_limit = axum::extract::DefaultBodyLimit::max(16 * 1024 * 1024);

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/resumes", post(handlers::resumes::create))
        .route("/resumes/{id}", get(handlers::resumes::get_resume))
        .route("/resumes/{id}/rescrape", post(handlers::resumes::rescrape))
        .route("/jobs", get(handlers::jobs::list))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Queue a fresh run for every resume a previous process left pending or
/// processing. The location they were submitted with is not stored, so the
/// configured default is used.
async fn requeue_unfinished(state: &AppState) -> anyhow::Result<usize> {
    let mut count = 0;
    for doc in state.store.list_resumes()? {
        if !matches!(doc.status, ScrapeStatus::Pending | ScrapeStatus::Processing) {
            continue;
        }
        let run_id = state
            .queue
            .submit(ScrapeRequest {
                resume_id: doc.id,
                location: state.config.location.clone(),
                jobs_per_site: state.config.jobs_per_site,
            })
            .await?;
        tracing::info!(resume_id = doc.id, run_id = %run_id, "requeued unfinished scrape");
        count += 1;
    }
    Ok(count)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,jobscout=debug".into()),
        )
        .with(fmt::layer())
        .init();

    let mut config = config_file::load_config().to_config();
    if let Ok(location) = std::env::var("JOBSCOUT_LOCATION") {
        config.location = location;
    }
    let db_path = std::env::var("JOBSCOUT_DB")
        .ok()
        .map(PathBuf::from)
        .or_else(|| config.db_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB));

    let store = Arc::new(SqliteStore::open(&db_path)?);
    tracing::info!(db = %db_path.display(), "database opened");

    let orchestrator = ScrapeOrchestrator::new(&config, Arc::new(ResumeExtractor))?;
    let ctx = TaskContext {
        orchestrator: Arc::new(orchestrator),
        store: store.clone(),
    };

    let cancel = CancellationToken::new();
    let queue = ScrapeQueue::new(ctx, QueueConfig::from_config(&config), cancel.clone(), None);
    let sweeper = maintenance::spawn_sweeper(
        store.clone(),
        SWEEP_INTERVAL,
        config.stale_after(),
        cancel.clone(),
    );

    let state = Arc::new(AppState {
        store,
        queue,
        config,
    });
    let requeued = requeue_unfinished(&state).await?;
    if requeued > 0 {
        tracing::info!(requeued, "resumed scrapes from the previous run");
    }
    let app = router(Arc::clone(&state));

    let addr: SocketAddr = std::env::var("JOBSCOUT_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutting down");
            }
        })
        .await?;

    // The router is gone, so this is the last reference. Queued runs drain
    // before the workers are cancelled.
    match Arc::try_unwrap(state) {
        Ok(state) => state.queue.shutdown().await,
        Err(_) => tracing::warn!("queue still shared at shutdown, abandoning queued runs"),
    }
    cancel.cancel();
    let _ = sweeper.await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::path::Path;
    use std::pin::Pin;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use jobscout_core::{
        BackendError, Config, DocumentBackend, FetchOutcome, JobRecord, Platform, ScrapeStore,
        SiteAdapter,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    const BOUNDARY: &str = "jobscout-test-boundary";

    struct FixedText;

    impl DocumentBackend for FixedText {
        fn extract_text(&self, _path: &Path) -> Result<String, BackendError> {
            Ok("Python backend developer".into())
        }
    }

    struct StubBoard;

    impl SiteAdapter for StubBoard {
        fn platform(&self) -> Platform {
            Platform::Naukri
        }

        fn fetch<'a>(
            &'a self,
            _keywords: &'a [String],
            location: &'a str,
            limit: usize,
            _client: &'a reqwest::Client,
            _timeout: Duration,
        ) -> Pin<Box<dyn Future<Output = FetchOutcome> + Send + 'a>> {
            Box::pin(async move {
                let records = (0..limit)
                    .map(|i| JobRecord {
                        title: format!("Backend Developer {i}"),
                        company: "Acme".into(),
                        link: format!("https://naukri.test/job/{i}"),
                        platform: Platform::Naukri,
                        location: location.to_string(),
                    })
                    .collect();
                FetchOutcome::Found(records)
            })
        }

        fn fallback_records(&self, _: &[String], _: &str, _: usize) -> Vec<JobRecord> {
            Vec::new()
        }
    }

    struct TestApp {
        app: Router,
        state: Arc<AppState>,
        _dir: tempfile::TempDir,
        upload_dir: PathBuf,
    }

    fn test_app() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().join("uploads");
        let config = Config {
            politeness_delay_ms: 0,
            upload_dir: upload_dir.clone(),
            location: "Remote".into(),
            ..Config::default()
        };
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let sites: Vec<Arc<dyn SiteAdapter>> = vec![Arc::new(StubBoard)];
        let orchestrator =
            ScrapeOrchestrator::with_sites(&config, Arc::new(FixedText), sites).unwrap();
        let ctx = TaskContext {
            orchestrator: Arc::new(orchestrator),
            store: store.clone(),
        };
        let queue = ScrapeQueue::new(
            ctx,
            QueueConfig::from_config(&config),
            CancellationToken::new(),
            None,
        );
        let state = Arc::new(AppState {
            store,
            queue,
            config,
        });
        TestApp {
            app: router(Arc::clone(&state)),
            state,
            _dir: dir,
            upload_dir,
        }
    }

    fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, filename, data) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match filename {
                Some(f) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(data.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/resumes")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn wait_for_completion(app: &Router, id: i64) -> Value {
        for _ in 0..200 {
            let (status, body) = send(app, get(&format!("/resumes/{id}"))).await;
            assert_eq!(status, StatusCode::OK);
            if body["status"] == "completed" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("resume {id} never completed");
    }

    #[tokio::test]
    async fn upload_queues_scrape_and_lists_jobs() {
        let t = test_app();
        let (status, body) = send(
            &t.app,
            multipart(&[
                ("resume", Some("cv.pdf"), "%PDF-1.4 fake"),
                ("location", None, "Pune"),
            ]),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "pending");
        assert!(body["run_id"].is_string());
        let id = body["id"].as_i64().unwrap();

        let resume = wait_for_completion(&t.app, id).await;
        assert_eq!(resume["result"], "Successfully scraped 2 jobs");
        assert_eq!(
            resume["keywords"],
            serde_json::json!(["backend", "developer", "python"])
        );

        let (status, jobs) = send(&t.app, get(&format!("/jobs?resume_id={id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(jobs["count"], 2);
        assert_eq!(jobs["jobs"][0]["platform"], "naukri");
        assert_eq!(jobs["jobs"][0]["location"], "Pune");

        let saved: Vec<_> = std::fs::read_dir(&t.upload_dir).unwrap().collect();
        assert_eq!(saved.len(), 1);
    }

    #[tokio::test]
    async fn rescrape_issues_a_new_run() {
        let t = test_app();
        let (_, body) = send(&t.app, multipart(&[("resume", Some("cv.docx"), "PK\x03\x04")])).await;
        let id = body["id"].as_i64().unwrap();
        let first_run = body["run_id"].as_str().unwrap().to_string();
        wait_for_completion(&t.app, id).await;

        let (status, body) = send(&t.app, post(&format!("/resumes/{id}/rescrape?location=Delhi"))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_ne!(body["run_id"].as_str().unwrap(), first_run);

        let resume = wait_for_completion(&t.app, id).await;
        assert_eq!(resume["run_id"], body["run_id"]);
        // Same links as the first run, so nothing new is stored.
        assert_eq!(resume["result"], "Successfully scraped 0 jobs");
    }

    #[tokio::test]
    async fn unsupported_upload_is_rejected() {
        let t = test_app();
        let (status, body) = send(&t.app, multipart(&[("resume", Some("cv.txt"), "python")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("PDF or DOCX"));

        let (status, _) = send(&t.app, multipart(&[("location", None, "Pune")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!t.upload_dir.exists());
    }

    #[tokio::test]
    async fn unknown_resume_is_404() {
        let t = test_app();
        let (status, _) = send(&t.app, get("/resumes/41")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&t.app, post("/resumes/41/rescrape")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn jobs_rejects_unknown_platform() {
        let t = test_app();
        let (status, _) = send(&t.app, get("/jobs?platform=monster")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, body) = send(&t.app, get("/jobs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let t = test_app();
        let (status, body) = send(&t.app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn rescrape_rejects_out_of_range_limit() {
        let t = test_app();
        let doc = t.state.store.create_resume(Path::new("cv.pdf")).unwrap();

        for limit in ["0", "51", "18446744073709551615"] {
            let uri = format!("/resumes/{}/rescrape?jobs_per_site={limit}", doc.id);
            let (status, body) = send(&t.app, post(&uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "jobs_per_site={limit}");
            assert!(body["error"].as_str().unwrap().contains("between 1 and 50"));
        }
        assert!(t.state.store.get_resume(doc.id).unwrap().run_id.is_none());
    }

    #[tokio::test]
    async fn unfinished_resumes_are_requeued_on_startup() {
        let t = test_app();
        let stranded = t.state.store.create_resume(Path::new("cv.pdf")).unwrap();
        t.state.store.enqueue_run(stranded.id, "lost-run").unwrap();
        t.state.store.begin_run(stranded.id, "lost-run").unwrap();

        assert_eq!(requeue_unfinished(&t.state).await.unwrap(), 1);
        let resume = wait_for_completion(&t.app, stranded.id).await;
        assert_ne!(resume["run_id"], "lost-run");
        assert_eq!(resume["result"], "Successfully scraped 2 jobs");

        assert_eq!(requeue_unfinished(&t.state).await.unwrap(), 0);
    }
}
