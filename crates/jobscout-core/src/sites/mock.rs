use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{FetchOutcome, SiteAdapter};
use crate::{JobRecord, Platform};

/// A canned site adapter for orchestrator and queue tests.
pub struct MockSite {
    platform: Platform,
    outcome: FetchOutcome,
    panics: bool,
    delay: Duration,
    call_count: AtomicUsize,
    last_keywords: Mutex<Vec<String>>,
}

impl MockSite {
    pub fn new(platform: Platform, outcome: FetchOutcome) -> Self {
        Self {
            platform,
            outcome,
            panics: false,
            delay: Duration::ZERO,
            call_count: AtomicUsize::new(0),
            last_keywords: Mutex::new(Vec::new()),
        }
    }

    pub fn found(platform: Platform, n: usize) -> Self {
        Self::new(platform, FetchOutcome::Found(sample_records(platform, n)))
    }

    pub fn empty(platform: Platform) -> Self {
        Self::new(
            platform,
            FetchOutcome::Empty {
                search_url: format!("https://{}.test/search", platform.tag()),
            },
        )
    }

    pub fn failing(platform: Platform) -> Self {
        Self::new(
            platform,
            FetchOutcome::Failed {
                search_url: format!("https://{}.test/search", platform.tag()),
                reason: "HTTP 503 Service Unavailable".into(),
            },
        )
    }

    /// An adapter whose fetch panics inside the spawned task.
    pub fn panicking(platform: Platform) -> Self {
        Self {
            panics: true,
            ..Self::empty(platform)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_keywords(&self) -> Vec<String> {
        self.last_keywords.lock().unwrap().clone()
    }
}

pub fn sample_records(platform: Platform, n: usize) -> Vec<JobRecord> {
    (0..n)
        .map(|i| JobRecord {
            title: format!("{} role {i}", platform.display_name()),
            company: "Acme".into(),
            link: format!("https://{}.test/jobs/{i}", platform.tag()),
            platform,
            location: "India".into(),
        })
        .collect()
}

impl SiteAdapter for MockSite {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn fetch<'a>(
        &'a self,
        keywords: &'a [String],
        _location: &'a str,
        _limit: usize,
        _client: &'a reqwest::Client,
        _timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = FetchOutcome> + Send + 'a>> {
        Box::pin(async move {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            *self.last_keywords.lock().unwrap() = keywords.to_vec();
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.panics {
                panic!("mock site {} exploded", self.platform);
            }
            self.outcome.clone()
        })
    }

    fn fallback_records(
        &self,
        _keywords: &[String],
        location: &str,
        limit: usize,
    ) -> Vec<JobRecord> {
        let record = JobRecord {
            title: "Placeholder".into(),
            company: self.platform.display_name().into(),
            link: format!("https://{}.test/search", self.platform.tag()),
            platform: self.platform,
            location: location.to_string(),
        };
        vec![record; limit]
    }
}
