//! LinkedIn public job search, filtered to entry-level postings.

use super::{LinkRule, LinkSource, LocationRule, QueryStyle, SiteProfile};
use crate::Platform;

pub const BASE_URL: &str = "https://www.linkedin.com";

pub fn profile() -> SiteProfile {
    SiteProfile {
        platform: Platform::LinkedIn,
        base_url: BASE_URL.to_string(),
        path_template: "/jobs/search?keywords={query}&location={location}&f_E=2",
        query_style: QueryStyle::Form,
        keyword_count: 3,
        card_selector: "div.base-card",
        title_selector: "h3.base-search-card__title",
        company_selector: Some("h4.base-search-card__subtitle"),
        link_source: LinkSource::Selector("a.base-card__full-link"),
        link_rule: LinkRule::AsIs,
        record_location: LocationRule::Requested,
        fallback_title: "{keywords} Internship",
        fallback_location: LocationRule::Requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sites::parse_listings;

    const PAGE: &str = r#"
        <ul class="jobs-search__results-list">
          <li><div class="base-card">
            <a class="base-card__full-link" href="https://www.linkedin.com/jobs/view/111"></a>
            <h3 class="base-search-card__title">
              Python Developer Intern
            </h3>
            <h4 class="base-search-card__subtitle"><a>Acme Corp</a></h4>
          </div></li>
          <li><div class="base-card">
            <a class="base-card__full-link" href="https://www.linkedin.com/jobs/view/222"></a>
            <h3 class="base-search-card__title">Backend Engineer</h3>
          </div></li>
          <li><div class="base-card">
            <h3 class="base-search-card__title">No link here</h3>
          </div></li>
        </ul>"#;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn search_url_uses_three_keywords_and_location() {
        let url = profile().search_url(&kw(&["python", "developer", "intern", "sql"]), "New Delhi");
        assert_eq!(
            url,
            "https://www.linkedin.com/jobs/search?keywords=python+developer+intern&location=New+Delhi&f_E=2"
        );
    }

    #[test]
    fn parses_cards_with_absolute_links() {
        let records = parse_listings(&profile(), PAGE, "India", 10).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Python Developer Intern");
        assert_eq!(records[0].company, "Acme Corp");
        assert_eq!(records[0].link, "https://www.linkedin.com/jobs/view/111");
        assert_eq!(records[0].location, "India");
        assert_eq!(records[0].platform, Platform::LinkedIn);
    }

    #[test]
    fn missing_company_becomes_sentinel() {
        let records = parse_listings(&profile(), PAGE, "India", 10).unwrap();
        assert_eq!(records[1].company, crate::UNKNOWN_COMPANY);
    }

    #[test]
    fn limit_applies_to_cards_inspected() {
        let records = parse_listings(&profile(), PAGE, "India", 1).unwrap();
        assert_eq!(records.len(), 1);
    }
}
