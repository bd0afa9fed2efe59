use ca_core::SourceName;

use super::{SourceSpec, TraversalKind};

/// GKToday publishes a WordPress-style paginated feed; article cards sit
/// in varying container markup depending on the page template, hence the
/// long fallback chain.
pub fn spec() -> SourceSpec {
    SourceSpec {
        name: SourceName::GkToday,
        base_url: "https://www.gktoday.in".to_string(),
        traversal: TraversalKind::Paginated,
        container_selectors: vec![
            "article".to_string(),
            ".post".to_string(),
            ".news-item".to_string(),
            "div[class*=\"post\"]".to_string(),
            ".entry".to_string(),
            ".article".to_string(),
            ".type-post".to_string(),
            ".blog-post".to_string(),
        ],
        link_path_allow: vec![],
        title_selectors: vec![
            "h1.entry-title".to_string(),
            "h1.post-title".to_string(),
            "h1".to_string(),
        ],
        content_selectors: vec![
            ".post-content".to_string(),
            ".entry-content".to_string(),
            "article".to_string(),
            ".single-post-content".to_string(),
            ".content".to_string(),
            "main".to_string(),
        ],
        date_selector: None,
    }
}
