use ca_core::SourceName;

pub mod drishti;
pub mod gktoday;

/// How a source's candidate URLs are enumerated.
#[derive(Debug, Clone)]
pub enum TraversalKind {
    /// Page-by-page link discovery from the site root, following
    /// resolved "next page" URLs.
    Paginated,
    /// One index page per day, walking backward from today.
    Calendar {
        /// Path under the base URL that the day index lives at.
        index_path: String,
        /// strftime pattern for the day segment, e.g. `%d-%m-%Y`.
        date_format: String,
    },
}

/// Per-source descriptor driving the shared runner: base URL, traversal
/// variant, and the selector tables the extractor and traversal consult.
/// One descriptor per site replaces per-site scraper copies.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub name: SourceName,
    pub base_url: String,
    pub traversal: TraversalKind,
    /// Index-page article containers, tried in order (paginated variant).
    pub container_selectors: Vec<String>,
    /// Substrings a detail URL path must contain (calendar variant).
    pub link_path_allow: Vec<String>,
    /// Detail-page title selectors, first match wins.
    pub title_selectors: Vec<String>,
    /// Detail-page main-content selectors, first non-empty match wins.
    pub content_selectors: Vec<String>,
    /// Explicit date-labeled element, consulted before the metadata and
    /// free-text fallbacks.
    pub date_selector: Option<String>,
}

pub fn all_sources() -> Vec<SourceSpec> {
    vec![gktoday::spec(), drishti::spec()]
}

pub fn spec_for(name: SourceName) -> SourceSpec {
    match name {
        SourceName::GkToday => gktoday::spec(),
        SourceName::Drishti => drishti::spec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_every_source() {
        let sources = all_sources();
        assert_eq!(sources.len(), 2);
        for name in [SourceName::GkToday, SourceName::Drishti] {
            assert!(sources.iter().any(|s| s.name == name));
            assert_eq!(spec_for(name).name, name);
        }
    }

    #[test]
    fn test_specs_have_content_fallback_chains() {
        for spec in all_sources() {
            assert!(!spec.content_selectors.is_empty());
            assert!(!spec.title_selectors.is_empty());
            assert!(spec.base_url.starts_with("https://"));
        }
    }
}
