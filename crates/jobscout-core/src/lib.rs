use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod backend;
pub mod config_file;
pub mod keywords;
pub mod maintenance;
pub mod orchestrator;
pub mod queue;
pub mod sites;
pub mod store;
pub mod task;

// Re-export for convenience
pub use backend::{BackendError, DocumentBackend};
pub use keywords::{KeywordSet, default_keywords, extract_keywords};
pub use orchestrator::{
    PlatformOutcome, PlatformStatus, ReportSummary, ScrapeOrchestrator, ScrapeReport,
};
pub use queue::{QueueConfig, QueueError, ScrapeQueue, TaskReport, TaskStatus};
pub use sites::{FetchOutcome, SiteAdapter};
pub use store::{MemoryStore, ScrapeStore, StoreError};
pub use task::{AttemptOutcome, ScrapeRequest, TaskContext, TaskError, run_scrape_attempt};

/// Sentinel stored when a listing does not name its employer.
pub const UNKNOWN_COMPANY: &str = "N/A";

/// Upper bound on listings requested from a single board per run.
pub const MAX_JOBS_PER_SITE: usize = 50;

/// Browser-like User-Agent sent with every job-board request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// A supported job board. The declaration order is the order in which a
/// scrape run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    LinkedIn,
    Internshala,
    WeWorkRemotely,
    RemoteOk,
    Naukri,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::LinkedIn,
        Platform::Internshala,
        Platform::WeWorkRemotely,
        Platform::RemoteOk,
        Platform::Naukri,
    ];

    /// Human-readable name, as the job board brands itself.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::LinkedIn => "LinkedIn",
            Platform::Internshala => "Internshala",
            Platform::WeWorkRemotely => "WeWorkRemotely",
            Platform::RemoteOk => "RemoteOK",
            Platform::Naukri => "Naukri",
        }
    }

    /// Storage tag: the display name lowercased with spaces removed.
    pub fn tag(&self) -> &'static str {
        match self {
            Platform::LinkedIn => "linkedin",
            Platform::Internshala => "internshala",
            Platform::WeWorkRemotely => "weworkremotely",
            Platform::RemoteOk => "remoteok",
            Platform::Naukri => "naukri",
        }
    }

    /// Whether `name` refers to this platform (tag or display name, any case).
    pub fn matches(&self, name: &str) -> bool {
        normalize_tag(name) == self.tag()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = normalize_tag(s);
        Platform::ALL
            .into_iter()
            .find(|p| p.tag() == tag)
            .ok_or_else(|| CoreError::UnknownPlatform(s.to_string()))
    }
}

fn normalize_tag(name: &str) -> String {
    name.to_lowercase().replace(' ', "")
}

/// One job posting as produced by a site adapter, before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub link: String,
    pub platform: Platform,
    pub location: String,
}

impl JobRecord {
    /// The platform tag written to storage.
    pub fn platform_tag(&self) -> &'static str {
        self.platform.tag()
    }
}

/// Lifecycle of a resume's scrape run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ScrapeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeStatus::Pending => "pending",
            ScrapeStatus::Processing => "processing",
            ScrapeStatus::Completed => "completed",
            ScrapeStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ScrapeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScrapeStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ScrapeStatus::Pending),
            "processing" => Ok(ScrapeStatus::Processing),
            "completed" => Ok(ScrapeStatus::Completed),
            "failed" => Ok(ScrapeStatus::Failed),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

/// An uploaded resume and the bookkeeping of its most recent scrape run.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeDocument {
    pub id: i64,
    pub file_path: PathBuf,
    pub uploaded_at: DateTime<Utc>,
    /// Comma-joined keywords from the latest run. Overwritten, never merged.
    pub keywords: String,
    pub status: ScrapeStatus,
    /// Human-readable outcome or error message.
    pub result: String,
    /// Identifier of the run that currently owns this resume.
    pub run_id: Option<String>,
}

/// A persisted job listing.
#[derive(Debug, Clone, Serialize)]
pub struct JobListing {
    pub id: i64,
    pub resume_id: i64,
    pub title: String,
    pub company: String,
    pub platform: Platform,
    pub link: String,
    pub location: String,
    pub description: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
    #[error("unknown scrape status: {0}")]
    UnknownStatus(String),
}

/// Runtime configuration for the scrape pipeline and its worker pool.
#[derive(Debug, Clone)]
pub struct Config {
    /// Location passed to every job board when the trigger does not name one.
    pub location: String,
    pub jobs_per_site: usize,
    pub request_timeout_secs: u64,
    /// Pause after each platform within a run.
    pub politeness_delay_ms: u64,
    pub user_agent: String,
    /// Fabricate placeholder listings pointing at the search page when a
    /// board yields nothing or fails.
    pub fallback_records: bool,
    /// Platforms to skip, by tag or display name.
    pub disabled_sites: Vec<String>,
    pub num_workers: usize,
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    pub db_path: Option<PathBuf>,
    pub upload_dir: PathBuf,
    /// Listings older than this are deactivated by the maintenance sweep.
    pub stale_after_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            location: "India".to_string(),
            jobs_per_site: 2,
            request_timeout_secs: 10,
            politeness_delay_ms: 1000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fallback_records: true,
            disabled_sites: vec![],
            num_workers: 2,
            max_attempts: 3,
            retry_delay_secs: 60,
            db_path: None,
            upload_dir: PathBuf::from("uploads"),
            stale_after_days: 30,
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.stale_after_days))
    }

    pub fn is_site_enabled(&self, platform: Platform) -> bool {
        !self.disabled_sites.iter().any(|d| platform.matches(d))
    }

    /// Build the shared HTTP client used by every site adapter.
    pub fn build_client(&self) -> Result<reqwest::Client, CoreError> {
        let client = reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.request_timeout())
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;
        Ok(client)
    }
}
