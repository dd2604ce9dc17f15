//! Job-board adapters.
//!
//! Every board is described declaratively by a [`SiteProfile`] (URL
//! template, query assembly, CSS selectors, link and location rules) and
//! fetched by the single generic [`ProfileAdapter`]. Adapters never raise:
//! network, status and parse problems come back as [`FetchOutcome::Failed`],
//! and a page with no recognisable postings as [`FetchOutcome::Empty`].

pub mod internshala;
pub mod linkedin;
#[cfg(test)]
pub(crate) mod mock;
pub mod naukri;
pub mod remoteok;
pub mod weworkremotely;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};

use crate::{Config, JobRecord, Platform, UNKNOWN_COMPANY};

/// Result of querying one job board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// At least one posting was parsed.
    Found(Vec<JobRecord>),
    /// The page loaded but contained no recognisable postings.
    Empty { search_url: String },
    /// The request or the parse failed.
    Failed { search_url: String, reason: String },
}

impl FetchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, FetchOutcome::Found(_))
    }

    pub fn search_url(&self) -> Option<&str> {
        match self {
            FetchOutcome::Found(_) => None,
            FetchOutcome::Empty { search_url } | FetchOutcome::Failed { search_url, .. } => {
                Some(search_url)
            }
        }
    }
}

/// A job board that can be searched for postings.
pub trait SiteAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Search the board for `keywords` near `location`, returning at most
    /// `limit` postings.
    fn fetch<'a>(
        &'a self,
        keywords: &'a [String],
        location: &'a str,
        limit: usize,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = FetchOutcome> + Send + 'a>>;

    /// Placeholder postings pointing at the board's search page, used when a
    /// fetch finds nothing or fails.
    fn fallback_records(&self, keywords: &[String], location: &str, limit: usize)
    -> Vec<JobRecord>;
}

/// Flatten a fetch outcome into records.
///
/// `Found` records are truncated to `limit`. `Empty` and `Failed` produce
/// exactly `limit` fallback records when `synthesize` is set, otherwise none.
pub fn records_from_outcome(
    site: &dyn SiteAdapter,
    outcome: &FetchOutcome,
    keywords: &[String],
    location: &str,
    limit: usize,
    synthesize: bool,
) -> Vec<JobRecord> {
    match outcome {
        FetchOutcome::Found(records) => records.iter().take(limit).cloned().collect(),
        FetchOutcome::Empty { .. } | FetchOutcome::Failed { .. } if synthesize => {
            site.fallback_records(keywords, location, limit)
        }
        _ => Vec::new(),
    }
}

/// How keywords are folded into the search URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStyle {
    /// Keywords joined by spaces and form-encoded (`+` for spaces).
    Form,
    /// Each keyword has spaces replaced by hyphens and is percent-encoded;
    /// the pieces are joined by `separator`.
    Slug { separator: &'static str },
}

/// Where a posting's link comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    /// `href` of the first element matching this selector inside the card.
    Selector(&'static str),
    /// `href` of the title element itself.
    TitleElement,
}

/// How a scraped `href` becomes an absolute URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRule {
    AsIs,
    /// Always prepend the profile's base URL.
    Prefix,
    /// Keep `http…` links, prepend the base URL to everything else.
    AbsoluteOrPrefix,
}

/// Where a posting's location comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationRule {
    /// The location the caller searched for.
    Requested,
    Fixed(&'static str),
}

impl LocationRule {
    fn resolve(&self, requested: &str) -> String {
        match self {
            LocationRule::Requested => requested.to_string(),
            LocationRule::Fixed(loc) => (*loc).to_string(),
        }
    }
}

/// Declarative description of one job board.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub platform: Platform,
    /// Scheme and host, without a trailing slash.
    pub base_url: String,
    /// Path and query appended to `base_url`; `{query}` and `{location}`
    /// are substituted.
    pub path_template: &'static str,
    pub query_style: QueryStyle,
    /// How many leading keywords go into the query.
    pub keyword_count: usize,
    pub card_selector: &'static str,
    pub title_selector: &'static str,
    pub company_selector: Option<&'static str>,
    pub link_source: LinkSource,
    pub link_rule: LinkRule,
    pub record_location: LocationRule,
    /// Title for placeholder postings; `{keywords}` is the first two
    /// keywords joined by a space.
    pub fallback_title: &'static str,
    pub fallback_location: LocationRule,
}

impl SiteProfile {
    /// Point the profile at a different host (mirrors, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Assemble the search query from the leading keywords.
    pub fn build_query(&self, keywords: &[String]) -> String {
        let leading = &keywords[..keywords.len().min(self.keyword_count)];
        match self.query_style {
            QueryStyle::Form => {
                let joined = leading.join(" ");
                form_encode(&joined)
            }
            QueryStyle::Slug { separator } => leading
                .iter()
                .map(|k| urlencoding::encode(&k.replace(' ', "-")).into_owned())
                .collect::<Vec<_>>()
                .join(separator),
        }
    }

    /// The full search URL for these keywords and location.
    pub fn search_url(&self, keywords: &[String], location: &str) -> String {
        let path = self
            .path_template
            .replace("{query}", &self.build_query(keywords))
            .replace("{location}", &form_encode(location));
        format!("{}{}", self.base_url, path)
    }

    fn resolve_link(&self, href: &str) -> String {
        match self.link_rule {
            LinkRule::AsIs => href.to_string(),
            LinkRule::Prefix => format!("{}{}", self.base_url, href),
            LinkRule::AbsoluteOrPrefix if href.starts_with("http") => href.to_string(),
            LinkRule::AbsoluteOrPrefix => format!("{}{}", self.base_url, href),
        }
    }

    fn fallback_title_for(&self, keywords: &[String]) -> String {
        let leading = keywords[..keywords.len().min(2)].join(" ");
        let title = self.fallback_title.replace("{keywords}", &leading);
        // Collapse the gap left by an empty keyword list.
        title.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Percent-encode for a query string, using `+` for spaces.
fn form_encode(s: &str) -> String {
    urlencoding::encode(s).replace("%20", "+")
}

/// Parse a search results page into postings.
///
/// At most `limit` cards are inspected. Cards without a title or a link are
/// skipped; a missing company becomes [`UNKNOWN_COMPANY`]. Returns `Err` only
/// if one of the profile's selectors is malformed.
pub fn parse_listings(
    profile: &SiteProfile,
    html: &str,
    location: &str,
    limit: usize,
) -> Result<Vec<JobRecord>, String> {
    let card_sel = parse_selector(profile.card_selector)?;
    let title_sel = parse_selector(profile.title_selector)?;
    let company_sel = profile.company_selector.map(parse_selector).transpose()?;
    let link_sel = match profile.link_source {
        LinkSource::Selector(s) => Some(parse_selector(s)?),
        LinkSource::TitleElement => None,
    };

    let document = Html::parse_document(html);
    let mut records = Vec::new();

    for card in document.select(&card_sel).take(limit) {
        let Some(title_el) = card.select(&title_sel).next() else {
            continue;
        };
        let title = element_text(&title_el);
        if title.is_empty() {
            continue;
        }

        let link_el = match &link_sel {
            Some(sel) => card.select(sel).next(),
            None => Some(title_el),
        };
        let Some(href) = link_el
            .and_then(|el| el.value().attr("href"))
            .map(str::trim)
            .filter(|h| !h.is_empty())
        else {
            continue;
        };

        let company = company_sel
            .as_ref()
            .and_then(|sel| card.select(sel).next())
            .map(|el| element_text(&el))
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());

        records.push(JobRecord {
            title,
            company,
            link: profile.resolve_link(href),
            platform: profile.platform,
            location: profile.record_location.resolve(location),
        });
    }

    Ok(records)
}

fn parse_selector(s: &str) -> Result<Selector, String> {
    Selector::parse(s).map_err(|e| format!("invalid selector {s:?}: {e}"))
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The generic adapter that drives a [`SiteProfile`].
pub struct ProfileAdapter {
    profile: SiteProfile,
    user_agent: String,
}

impl ProfileAdapter {
    pub fn new(profile: SiteProfile, user_agent: impl Into<String>) -> Self {
        Self {
            profile,
            user_agent: user_agent.into(),
        }
    }

    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn fetch_inner(
        &self,
        search_url: &str,
        location: &str,
        limit: usize,
        client: &reqwest::Client,
        timeout: Duration,
    ) -> Result<Vec<JobRecord>, String> {
        let resp = client
            .get(search_url)
            .header("User-Agent", &self.user_agent)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err("rate limited (HTTP 429)".to_string());
        }
        if !status.is_success() {
            return Err(format!("HTTP {}", status));
        }

        let body = resp.text().await.map_err(|e| e.to_string())?;
        let profile = self.profile.clone();
        let location = location.to_string();

        // Parse in spawn_blocking to avoid !Send scraper types in async context
        tokio::task::spawn_blocking(move || parse_listings(&profile, &body, &location, limit))
            .await
            .map_err(|e| e.to_string())?
    }
}

impl SiteAdapter for ProfileAdapter {
    fn platform(&self) -> Platform {
        self.profile.platform
    }

    fn fetch<'a>(
        &'a self,
        keywords: &'a [String],
        location: &'a str,
        limit: usize,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = FetchOutcome> + Send + 'a>> {
        Box::pin(async move {
            let search_url = self.profile.search_url(keywords, location);
            tracing::info!(platform = %self.profile.platform, url = %search_url, "searching");

            match self
                .fetch_inner(&search_url, location, limit, client, timeout)
                .await
            {
                Ok(records) if records.is_empty() => {
                    tracing::debug!(platform = %self.profile.platform, "no postings parsed");
                    FetchOutcome::Empty { search_url }
                }
                Ok(mut records) => {
                    records.truncate(limit);
                    FetchOutcome::Found(records)
                }
                Err(reason) => {
                    tracing::warn!(platform = %self.profile.platform, error = %reason, "search failed");
                    FetchOutcome::Failed { search_url, reason }
                }
            }
        })
    }

    fn fallback_records(
        &self,
        keywords: &[String],
        location: &str,
        limit: usize,
    ) -> Vec<JobRecord> {
        let record = JobRecord {
            title: self.profile.fallback_title_for(keywords),
            company: self.profile.platform.display_name().to_string(),
            link: self.profile.search_url(keywords, location),
            platform: self.profile.platform,
            location: self.profile.fallback_location.resolve(location),
        };
        vec![record; limit]
    }
}

/// The built-in profile for a platform.
pub fn profile_for(platform: Platform) -> SiteProfile {
    match platform {
        Platform::LinkedIn => linkedin::profile(),
        Platform::Internshala => internshala::profile(),
        Platform::WeWorkRemotely => weworkremotely::profile(),
        Platform::RemoteOk => remoteok::profile(),
        Platform::Naukri => naukri::profile(),
    }
}

/// Build the enabled site adapters in platform order.
pub fn build_site_list(config: &Config) -> Vec<Arc<dyn SiteAdapter>> {
    Platform::ALL
        .into_iter()
        .filter(|p| config.is_site_enabled(*p))
        .map(|p| {
            Arc::new(ProfileAdapter::new(profile_for(p), config.user_agent.clone()))
                as Arc<dyn SiteAdapter>
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn adapter(platform: Platform, base: &str) -> ProfileAdapter {
        ProfileAdapter::new(
            profile_for(platform).with_base_url(base),
            crate::DEFAULT_USER_AGENT,
        )
    }

    #[test]
    fn build_site_list_respects_order_and_disabled() {
        let config = Config {
            disabled_sites: vec!["naukri".into()],
            ..Config::default()
        };
        let platforms: Vec<_> = build_site_list(&config)
            .iter()
            .map(|s| s.platform())
            .collect();
        assert_eq!(
            platforms,
            vec![
                Platform::LinkedIn,
                Platform::Internshala,
                Platform::WeWorkRemotely,
                Platform::RemoteOk
            ]
        );
    }

    #[test]
    fn fallback_records_are_complete_and_exact_count() {
        for platform in Platform::ALL {
            let site = adapter(platform, "https://example.test");
            let records = site.fallback_records(&kw(&["python", "developer", "intern"]), "India", 3);
            assert_eq!(records.len(), 3, "{platform}");
            for r in &records {
                assert!(!r.title.is_empty());
                assert!(!r.company.is_empty());
                assert!(!r.link.is_empty());
                assert!(!r.location.is_empty());
                assert_eq!(r.platform, platform);
                assert!(r.link.starts_with("https://example.test"));
            }
        }
    }

    #[test]
    fn fallback_title_without_keywords_is_trimmed() {
        let site = adapter(Platform::WeWorkRemotely, "https://example.test");
        let records = site.fallback_records(&[], "India", 1);
        assert_eq!(records[0].title, "Remote Position");
    }

    #[test]
    fn records_from_outcome_truncates_found() {
        let site = adapter(Platform::Naukri, "https://example.test");
        let record = JobRecord {
            title: "Dev".into(),
            company: "Acme".into(),
            link: "https://example.test/1".into(),
            platform: Platform::Naukri,
            location: "India".into(),
        };
        let outcome = FetchOutcome::Found(vec![record.clone(), record.clone(), record]);
        let records = records_from_outcome(&site, &outcome, &kw(&["go"]), "India", 2, true);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn records_from_outcome_respects_synthesize_flag() {
        let site = adapter(Platform::Naukri, "https://example.test");
        let outcome = FetchOutcome::Failed {
            search_url: "https://example.test/go-jobs".into(),
            reason: "boom".into(),
        };
        let keywords = kw(&["go"]);
        assert_eq!(
            records_from_outcome(&site, &outcome, &keywords, "India", 2, true).len(),
            2
        );
        assert!(records_from_outcome(&site, &outcome, &keywords, "India", 2, false).is_empty());
    }

    #[test]
    fn parse_listings_rejects_bad_selector() {
        let mut profile = profile_for(Platform::LinkedIn);
        profile.card_selector = "div[";
        assert!(parse_listings(&profile, "<html></html>", "India", 2).is_err());
    }

    #[test]
    fn parse_listings_caps_cards_at_limit() {
        let profile = profile_for(Platform::WeWorkRemotely);
        let card = r#"<li class="feature"><a href="/remote-jobs/x"><span class="title">Dev</span><span class="company">Acme</span></a></li>"#;
        let html = format!("<ul>{}</ul>", card.repeat(5));
        let records = parse_listings(&profile, &html, "India", 2).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn unreachable_host_yields_failed_outcome() {
        // Port 9 (discard) on loopback is not expected to serve HTTP.
        let site = adapter(Platform::LinkedIn, "http://127.0.0.1:9");
        let client = reqwest::Client::new();
        let keywords = kw(&["python"]);
        let outcome = site
            .fetch(&keywords, "India", 2, &client, Duration::from_secs(2))
            .await;
        match &outcome {
            FetchOutcome::Failed { search_url, .. } => {
                assert!(search_url.starts_with("http://127.0.0.1:9/jobs/search"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        let records = records_from_outcome(&site, &outcome, &keywords, "India", 2, true);
        assert_eq!(records.len(), 2);
    }
}
