//! Internshala internship listings. Links on the page are site-relative.

use super::{LinkRule, LinkSource, LocationRule, QueryStyle, SiteProfile};
use crate::Platform;

pub const BASE_URL: &str = "https://internshala.com";

pub fn profile() -> SiteProfile {
    SiteProfile {
        platform: Platform::Internshala,
        base_url: BASE_URL.to_string(),
        path_template: "/internships/{query}-internship",
        query_style: QueryStyle::Slug { separator: "-" },
        keyword_count: 2,
        card_selector: "div.individual_internship",
        title_selector: "h3.heading_4_5",
        company_selector: Some("p.company_name"),
        link_source: LinkSource::Selector("a.view_detail_button"),
        link_rule: LinkRule::Prefix,
        record_location: LocationRule::Requested,
        fallback_title: "{keywords} Internship",
        fallback_location: LocationRule::Fixed("India"),
    }
}
