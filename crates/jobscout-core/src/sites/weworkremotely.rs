//! We Work Remotely search. Every posting is reported as remote.

use super::{LinkRule, LinkSource, LocationRule, QueryStyle, SiteProfile};
use crate::Platform;

pub const BASE_URL: &str = "https://weworkremotely.com";

pub fn profile() -> SiteProfile {
    SiteProfile {
        platform: Platform::WeWorkRemotely,
        base_url: BASE_URL.to_string(),
        path_template: "/remote-jobs/search?term={query}",
        query_style: QueryStyle::Form,
        keyword_count: 2,
        card_selector: "li.feature",
        title_selector: "span.title",
        company_selector: Some("span.company"),
        link_source: LinkSource::Selector("a"),
        link_rule: LinkRule::Prefix,
        record_location: LocationRule::Fixed("Remote"),
        fallback_title: "Remote {keywords} Position",
        fallback_location: LocationRule::Fixed("Remote"),
    }
}
