use ca_core::{Article, ArticleSection, SectionKind};
use chrono::{DateTime, NaiveDate, Utc};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::sources::SourceSpec;
use crate::text;

const INTRO_MAX_CHARS: usize = 500;
const MIN_PARAGRAPH_CHARS: usize = 10;
const MIN_BULLET_CHARS: usize = 5;

/// Classes marking navigation/metadata blocks that must not leak into
/// section bodies.
const SKIP_CLASSES: [&str; 6] = [
    "next-post",
    "tags-new",
    "starRating",
    "actions",
    "navigation",
    "pagination",
];

/// Turns one fetched detail page into an `Article`. Best-effort by
/// contract: a missing title or date degrades to a sentinel instead of
/// failing the candidate.
pub struct Extractor<'a> {
    spec: &'a SourceSpec,
}

impl<'a> Extractor<'a> {
    pub fn new(spec: &'a SourceSpec) -> Self {
        Self { spec }
    }

    pub fn extract(&self, html: &str, url: &str) -> Article {
        let doc = Html::parse_document(html);

        let title = self
            .spec
            .title_selectors
            .iter()
            .filter_map(|s| select_first(&doc, s))
            .map(|el| text::clean_text(&el.text().collect::<String>()))
            .find(|t| !t.is_empty())
            .unwrap_or_else(|| "N/A".to_string());

        let container = self.find_content_container(&doc);
        let (intro, sections) = container
            .map(extract_sections)
            .unwrap_or_else(|| (String::new(), Vec::new()));

        let (published_date_raw, published_date) = self.extract_date(&doc, container, url);

        debug!(url, %title, sections = sections.len(), "extracted article");

        Article {
            url: url.to_string(),
            title,
            intro,
            image_url: extract_image(&doc, url),
            published_date_raw,
            published_date,
            importance_rating: extract_importance(&doc),
            source: self.spec.name,
            sections,
            scraped_at: Utc::now(),
        }
    }

    /// Ordered selector chain, first non-empty match wins; otherwise the
    /// single largest text-bearing `div` stands in for "main content".
    fn find_content_container<'b>(&self, doc: &'b Html) -> Option<ElementRef<'b>> {
        for selector in &self.spec.content_selectors {
            if let Some(el) = select_first(doc, selector) {
                if el.text().any(|t| !t.trim().is_empty()) {
                    return Some(el);
                }
            }
        }
        let div = Selector::parse("div").ok()?;
        doc.select(&div)
            .max_by_key(|el| el.text().map(str::len).sum::<usize>())
    }

    /// Fallback chain: date-labeled element, machine-readable metadata,
    /// free-text pattern match, canonical-URL date segment. First success
    /// wins; otherwise the raw field is the "N/A" sentinel.
    fn extract_date(
        &self,
        doc: &Html,
        container: Option<ElementRef<'_>>,
        url: &str,
    ) -> (String, Option<NaiveDate>) {
        if let Some(selector) = &self.spec.date_selector {
            if let Some(el) = select_first(doc, selector) {
                let raw = text::clean_text(&el.text().collect::<String>());
                if !raw.is_empty() && raw != "N/A" {
                    let parsed = text::parse_date(&raw);
                    return (raw, parsed);
                }
            }
        }

        for selector in [
            "meta[property=\"article:published_time\"]",
            "meta[name=\"date\"]",
            "meta[name=\"publish-date\"]",
        ] {
            if let Some(content) = select_first(doc, selector).and_then(|el| el.value().attr("content")) {
                if let Some(date) = parse_meta_date(content) {
                    return (text::format_date(date), Some(date));
                }
            }
        }

        let body_text = match container {
            Some(c) => c.text().collect::<String>(),
            None => doc.root_element().text().collect::<String>(),
        };
        if let Some(date) = text::find_date_in_text(&body_text) {
            return (text::format_date(date), Some(date));
        }

        let canonical = select_first(doc, "link[rel=\"canonical\"]")
            .and_then(|el| el.value().attr("href"))
            .unwrap_or(url);
        if let Some(date) = text::date_from_url(canonical) {
            return (text::format_date(date), Some(date));
        }

        ("N/A".to_string(), None)
    }
}

fn parse_meta_date(content: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(content)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| text::parse_date(content))
}

/// Walks the container in document order. Headings `h2`-`h5` open a new
/// section; paragraphs and list items accumulate into the pending one,
/// which is flushed when the next heading starts or the content ends.
/// Content before the first heading lands in a catch-all section with an
/// empty heading. Empty sections are dropped.
fn extract_sections(container: ElementRef<'_>) -> (String, Vec<ArticleSection>) {
    let selector = Selector::parse("h2, h3, h4, h5, p, ul, ol").expect("static selector");
    let mut intro = String::new();
    let mut sections = Vec::new();
    let mut current = ArticleSection::new("");

    for el in container.select(&selector) {
        // Nested lists are folded into their parent list's bullets;
        // matching them again here would double-count.
        if has_li_ancestor(el) || has_skip_class(el) {
            continue;
        }
        match el.value().name() {
            "h2" | "h3" | "h4" | "h5" => {
                flush(&mut sections, current);
                current = ArticleSection::new(text::clean_text(&el.text().collect::<String>()));
            }
            "p" => {
                let paragraph = text::clean_text(&el.text().collect::<String>());
                if paragraph.len() <= MIN_PARAGRAPH_CHARS {
                    continue;
                }
                if intro.is_empty() {
                    intro = paragraph.chars().take(INTRO_MAX_CHARS).collect();
                }
                if !current.body_text.is_empty() {
                    current.body_text.push(' ');
                }
                current.body_text.push_str(&paragraph);
            }
            "ul" | "ol" => {
                for li in child_elements(el, "li") {
                    let item = text::clean_text(&li_own_text(li));
                    if item.len() > MIN_BULLET_CHARS {
                        current.bullets.push(item);
                        for nested in child_elements(li, "ul").chain(child_elements(li, "ol")) {
                            for nested_li in child_elements(nested, "li") {
                                let sub = text::clean_text(&nested_li.text().collect::<String>());
                                if sub.len() > MIN_BULLET_CHARS {
                                    // Flattened with a visual indent, not
                                    // modeled as nested structure.
                                    current.bullets.push(format!("  • {}", sub));
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
    flush(&mut sections, current);

    (intro, sections)
}

fn flush(sections: &mut Vec<ArticleSection>, mut section: ArticleSection) {
    if section.is_empty() {
        return;
    }
    section.kind = if section.bullets.is_empty() {
        SectionKind::Paragraph
    } else {
        SectionKind::List
    };
    sections.push(section);
}

/// True when the element or any ancestor carries a skip class, so that
/// content nested inside a navigation block is excluded along with it.
fn has_skip_class(el: ElementRef<'_>) -> bool {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .any(|e| e.value().classes().any(|c| SKIP_CLASSES.contains(&c)))
}

fn has_li_ancestor(el: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == "li")
}

fn child_elements<'b>(
    el: ElementRef<'b>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'b>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(move |c| c.value().name() == name)
}

/// Text of a list item excluding any nested list subtree.
fn li_own_text(li: ElementRef<'_>) -> String {
    let mut out = String::new();
    for child in li.children() {
        if let Some(el) = ElementRef::wrap(child) {
            if matches!(el.value().name(), "ul" | "ol") {
                continue;
            }
            for piece in el.text() {
                out.push_str(piece);
            }
        } else if let Some(piece) = child.value().as_text() {
            out.push_str(piece);
        }
    }
    out
}

fn extract_importance(doc: &Html) -> Option<String> {
    select_first(doc, ".starRating")?;
    let checked = Selector::parse(".starRating span.checked").ok()?;
    Some(format!("{}/5", doc.select(&checked).count()))
}

fn extract_image(doc: &Html, page_url: &str) -> Option<String> {
    if let Some(src) = select_first(doc, "img.content-img").and_then(|el| el.value().attr("src")) {
        return resolve_url(page_url, src);
    }
    let img = Selector::parse("img").ok()?;
    for el in doc.select(&img) {
        let Some(src) = el.value().attr("src") else {
            continue;
        };
        let lower = src.to_lowercase();
        if ["facebook", "twitter", "pixel", "track"].iter().any(|skip| lower.contains(skip)) {
            continue;
        }
        if lower.contains("analysis") || lower.contains("content") {
            return resolve_url(page_url, src);
        }
    }
    None
}

pub(crate) fn select_first<'b>(doc: &'b Html, selector: &str) -> Option<ElementRef<'b>> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector).next()
}

/// Resolve an href to absolute form against the page it came from.
/// Mandatory before de-duplication so relative and absolute spellings of
/// one URL can't be treated as distinct.
pub(crate) fn resolve_url(base: &str, href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    Url::parse(base).ok()?.join(href).ok().map(|u| u.to_string())
}
