use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifies which site produced an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceName {
    GkToday,
    Drishti,
}

impl SourceName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceName::GkToday => "GKToday",
            SourceName::Drishti => "DrishtiIAS",
        }
    }

    /// Shorthand used on the CLI and in API payloads.
    pub fn cli_name(&self) -> &'static str {
        match self {
            SourceName::GkToday => "gktoday",
            SourceName::Drishti => "drishti",
        }
    }

    pub fn parse_cli_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "gktoday" => Some(SourceName::GkToday),
            "drishti" | "drishtiias" => Some(SourceName::Drishti),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Paragraph,
    List,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Paragraph => "paragraph",
            SectionKind::List => "list",
        }
    }

    pub fn from_str(kind: &str) -> Self {
        match kind {
            "list" => SectionKind::List,
            _ => SectionKind::Paragraph,
        }
    }
}

/// One heading-delimited block of an article. `kind` is `List` iff
/// `bullets` is non-empty; bullet order is its position in the vec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSection {
    pub heading: String,
    pub body_text: String,
    pub kind: SectionKind,
    pub bullets: Vec<String>,
}

impl ArticleSection {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            body_text: String::new(),
            kind: SectionKind::Paragraph,
            bullets: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.body_text.trim().is_empty() && self.bullets.is_empty()
    }
}

/// One normalized harvested article. `url` is the canonical absolute URL
/// and the sole natural key: re-discovering the same URL must never
/// create a second row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub intro: String,
    pub image_url: Option<String>,
    /// Date string exactly as scraped ("N/A" when nothing was found).
    pub published_date_raw: String,
    /// Parsed calendar date; `None` when the raw string was unparsable.
    pub published_date: Option<NaiveDate>,
    pub importance_rating: Option<String>,
    pub source: SourceName,
    pub sections: Vec<ArticleSection>,
    pub scraped_at: DateTime<Utc>,
}

/// Summary of one Source Runner execution. Not persisted; handed back to
/// the orchestrator and folded into the combined report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub success: bool,
    pub articles_scraped: usize,
    pub articles_skipped: usize,
    pub errors: Vec<String>,
    pub runtime_seconds: f64,
}

impl RunReport {
    pub fn failed(error: impl Into<String>, runtime_seconds: f64) -> Self {
        Self {
            success: false,
            articles_scraped: 0,
            articles_skipped: 0,
            errors: vec![error.into()],
            runtime_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_name_round_trip() {
        for source in [SourceName::GkToday, SourceName::Drishti] {
            assert_eq!(SourceName::parse_cli_name(source.cli_name()), Some(source));
        }
        assert_eq!(SourceName::parse_cli_name("DRISHTI"), Some(SourceName::Drishti));
        assert_eq!(SourceName::parse_cli_name("unknown"), None);
    }

    #[test]
    fn test_section_emptiness() {
        let mut section = ArticleSection::new("Background");
        assert!(section.is_empty());
        section.bullets.push("a point".to_string());
        assert!(!section.is_empty());
    }
}
