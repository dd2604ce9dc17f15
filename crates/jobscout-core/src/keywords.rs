//! Vocabulary-based keyword extraction from resume text.
//!
//! Matching is plain substring containment over the lowercased text, so
//! short terms such as `go` or `ai` also hit inside longer words. Presence is
//! binary: there is no weighting or frequency counting.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Languages, frameworks and platform terms.
pub const TECH_KEYWORDS: &[&str] = &[
    "python",
    "java",
    "javascript",
    "react",
    "node",
    "django",
    "flask",
    "sql",
    "mysql",
    "postgresql",
    "mongodb",
    "aws",
    "azure",
    "docker",
    "kubernetes",
    "machine learning",
    "data science",
    "ai",
    "backend",
    "frontend",
    "fullstack",
    "devops",
    "cloud",
    "api",
    "rest",
    "graphql",
    "typescript",
    "angular",
    "vue",
    "spring",
    "android",
    "ios",
    "swift",
    "kotlin",
    "c++",
    "c#",
    ".net",
    "php",
    "ruby",
    "go",
    "rust",
    "scala",
];

/// Role names.
pub const JOB_TITLES: &[&str] = &[
    "software engineer",
    "developer",
    "data scientist",
    "data analyst",
    "product manager",
    "designer",
    "devops",
    "sre",
    "machine learning",
    "backend",
    "frontend",
    "full stack",
    "mobile developer",
    "intern",
];

/// Substituted by the orchestrator when a resume yields no keywords.
pub const DEFAULT_KEYWORDS: &[&str] = &["python", "developer", "intern"];

static EXPERIENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\+?\s*years?").unwrap());

/// Keywords extracted from one resume.
///
/// Vocabulary terms are kept sorted; the synthesized experience tag is held
/// apart so it can be ordered after them when building queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    terms: BTreeSet<String>,
    experience: Option<String>,
}

impl KeywordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, term: impl Into<String>) {
        self.terms.insert(term.into());
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.experience.is_none()
    }

    pub fn len(&self) -> usize {
        self.terms.len() + usize::from(self.experience.is_some())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.terms.contains(tag) || self.experience.as_deref() == Some(tag)
    }

    /// The `"<N> years experience"` tag, if the text mentioned one.
    pub fn experience(&self) -> Option<&str> {
        self.experience.as_deref()
    }

    /// All tags, vocabulary terms first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.terms
            .iter()
            .map(String::as_str)
            .chain(self.experience.as_deref())
    }

    /// Ordered keyword list handed to site adapters.
    pub fn to_query_terms(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }

    /// Comma-joined form stored on the resume.
    pub fn joined(&self) -> String {
        self.iter().collect::<Vec<_>>().join(", ")
    }
}

impl<S: Into<String>> FromIterator<S> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = KeywordSet::new();
        for term in iter {
            set.insert(term);
        }
        set
    }
}

/// The fallback query used when a resume yields no keywords.
pub fn default_keywords() -> KeywordSet {
    DEFAULT_KEYWORDS.iter().copied().collect()
}

/// Extract vocabulary keywords and the first years-of-experience mention.
pub fn extract_keywords(text: &str) -> KeywordSet {
    let lowered = text.to_lowercase();
    let mut set = KeywordSet::new();

    for term in TECH_KEYWORDS.iter().chain(JOB_TITLES) {
        if lowered.contains(term) {
            set.insert(*term);
        }
    }

    set.experience = EXPERIENCE_RE
        .captures(&lowered)
        .map(|caps| format!("{} years experience", &caps[1]));

    set
}
