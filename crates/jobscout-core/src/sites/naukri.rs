//! Naukri job tuples. The title anchor carries the link, which may be either
//! absolute or site-relative.

use super::{LinkRule, LinkSource, LocationRule, QueryStyle, SiteProfile};
use crate::Platform;

pub const BASE_URL: &str = "https://www.naukri.com";

pub fn profile() -> SiteProfile {
    SiteProfile {
        platform: Platform::Naukri,
        base_url: BASE_URL.to_string(),
        path_template: "/{query}-jobs",
        query_style: QueryStyle::Slug { separator: "-" },
        keyword_count: 2,
        card_selector: "article.jobTuple",
        title_selector: "a.title",
        company_selector: Some("a.subTitle"),
        link_source: LinkSource::TitleElement,
        link_rule: LinkRule::AbsoluteOrPrefix,
        record_location: LocationRule::Requested,
        fallback_title: "{keywords} Job",
        fallback_location: LocationRule::Requested,
    }
}
