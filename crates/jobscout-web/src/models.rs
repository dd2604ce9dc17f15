use chrono::{DateTime, Utc};
use jobscout_core::{JobListing, ResumeDocument, ScrapeStatus};
use serde::{Deserialize, Serialize};

// ── Resume DTOs ─────────────────────────────────────────────────────────

/// Returned when a scrape has been queued.
#[derive(Debug, Serialize)]
pub struct SubmittedJson {
    pub id: i64,
    pub run_id: String,
    pub status: ScrapeStatus,
}

#[derive(Debug, Serialize)]
pub struct ResumeJson {
    pub id: i64,
    pub uploaded_at: DateTime<Utc>,
    pub status: ScrapeStatus,
    pub result: String,
    pub keywords: Vec<String>,
    pub run_id: Option<String>,
}

impl From<&ResumeDocument> for ResumeJson {
    fn from(doc: &ResumeDocument) -> Self {
        let keywords = doc
            .keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            id: doc.id,
            uploaded_at: doc.uploaded_at,
            status: doc.status,
            result: doc.result.clone(),
            keywords,
            run_id: doc.run_id.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RescrapeParams {
    pub location: Option<String>,
    pub jobs_per_site: Option<usize>,
}

// ── Job listing DTOs ────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct JobsQuery {
    pub resume_id: Option<i64>,
    pub platform: Option<String>,
    pub location: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct JobJson {
    pub id: i64,
    pub resume_id: i64,
    pub title: String,
    pub company: String,
    /// Storage tag, e.g. `weworkremotely`.
    pub platform: &'static str,
    pub platform_name: &'static str,
    pub link: String,
    pub location: String,
    pub scraped_at: DateTime<Utc>,
    pub is_active: bool,
}

impl From<&JobListing> for JobJson {
    fn from(job: &JobListing) -> Self {
        Self {
            id: job.id,
            resume_id: job.resume_id,
            title: job.title.clone(),
            company: job.company.clone(),
            platform: job.platform.tag(),
            platform_name: job.platform.display_name(),
            link: job.link.clone(),
            location: job.location.clone(),
            scraped_at: job.scraped_at,
            is_active: job.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobsJson {
    pub count: usize,
    pub jobs: Vec<JobJson>,
}

#[derive(Debug, Serialize)]
pub struct ErrorJson {
    pub error: String,
}
