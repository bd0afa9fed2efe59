use ca_core::SourceName;

use super::{SourceSpec, TraversalKind};

/// DrishtiIAS groups its daily analysis under one index page per day, so
/// traversal walks the calendar backward instead of following pagination.
pub fn spec() -> SourceSpec {
    SourceSpec {
        name: SourceName::Drishti,
        base_url: "https://www.drishtiias.com".to_string(),
        traversal: TraversalKind::Calendar {
            index_path: "current-affairs-news-analysis-editorials/news-analysis".to_string(),
            date_format: "%d-%m-%Y".to_string(),
        },
        container_selectors: vec![],
        link_path_allow: vec![
            "/daily-news-analysis/".to_string(),
            "/daily-updates/".to_string(),
        ],
        title_selectors: vec![
            "h1#dynamic-title".to_string(),
            "h1.content-title".to_string(),
            "h1".to_string(),
        ],
        content_selectors: vec![
            ".article-detail".to_string(),
            ".detail-content".to_string(),
        ],
        date_selector: Some("ul.actions li.date".to_string()),
    }
}
