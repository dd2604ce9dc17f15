//! Remote OK listings, laid out as table rows.

use super::{LinkRule, LinkSource, LocationRule, QueryStyle, SiteProfile};
use crate::Platform;

pub const BASE_URL: &str = "https://remoteok.com";

pub fn profile() -> SiteProfile {
    SiteProfile {
        platform: Platform::RemoteOk,
        base_url: BASE_URL.to_string(),
        path_template: "/remote-{query}-jobs",
        query_style: QueryStyle::Slug { separator: "+" },
        keyword_count: 2,
        card_selector: "tr.job",
        title_selector: "h2[itemprop=title]",
        company_selector: Some("h3[itemprop=name]"),
        link_source: LinkSource::Selector("a.preventLink"),
        link_rule: LinkRule::Prefix,
        record_location: LocationRule::Fixed("Remote"),
        fallback_title: "Remote {keywords} Developer",
        fallback_location: LocationRule::Fixed("Remote"),
    }
}
