use std::collections::HashSet;

use ca_core::Result;
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::extract::{resolve_url, select_first};
use crate::fetch::Fetcher;
use crate::sources::{SourceSpec, TraversalKind};

/// Index-page containers with these classes are navigation chrome, not
/// article cards.
const SKIP_CONTAINER_CLASSES: [&str; 7] = [
    "nav",
    "navigation",
    "pagination",
    "page-numbers",
    "nav-links",
    "sidebar",
    "widget",
];

/// Hrefs containing these are taxonomy/navigation, never detail pages.
const SKIP_HREF_SEGMENTS: [&str; 4] = ["/page/", "/tag/", "/category/", "/author/"];

/// Per-source strategy enumerating candidate detail URLs, one batch per
/// index page (or per day). Candidates are resolved to absolute form and
/// de-duplicated across the whole run before they are yielded.
pub enum Traversal {
    Paginated(PaginatedTraversal),
    Calendar(CalendarTraversal),
}

impl Traversal {
    pub fn new(spec: &SourceSpec, max_pages: usize, max_days: usize) -> Self {
        match &spec.traversal {
            TraversalKind::Paginated => {
                Traversal::Paginated(PaginatedTraversal::new(spec.clone(), max_pages))
            }
            TraversalKind::Calendar {
                index_path,
                date_format,
            } => Traversal::Calendar(CalendarTraversal::new(
                spec.clone(),
                index_path.clone(),
                date_format.clone(),
                max_days,
            )),
        }
    }

    /// `Ok(None)` means the traversal is exhausted. An empty batch means
    /// this page/day had nothing new and the caller should keep going.
    pub async fn next_batch(&mut self, fetcher: &Fetcher) -> Result<Option<Vec<String>>> {
        match self {
            Traversal::Paginated(t) => t.next_batch(fetcher).await,
            Traversal::Calendar(t) => t.next_batch(fetcher).await,
        }
    }
}

/// Page-by-page link discovery starting at the site root, following the
/// resolved "next page" URL until none is found or the ceiling is hit.
pub struct PaginatedTraversal {
    spec: SourceSpec,
    next_url: Option<String>,
    pages_fetched: usize,
    max_pages: usize,
    seen: HashSet<String>,
}

impl PaginatedTraversal {
    fn new(spec: SourceSpec, max_pages: usize) -> Self {
        let next_url = Some(spec.base_url.clone());
        Self {
            spec,
            next_url,
            pages_fetched: 0,
            max_pages,
            seen: HashSet::new(),
        }
    }

    async fn next_batch(&mut self, fetcher: &Fetcher) -> Result<Option<Vec<String>>> {
        if self.pages_fetched >= self.max_pages {
            return Ok(None);
        }
        let Some(page_url) = self.next_url.take() else {
            return Ok(None);
        };
        self.pages_fetched += 1;
        info!(url = %page_url, page = self.pages_fetched, "scraping feed page");

        let html = match fetcher.fetch(&page_url).await {
            Ok(html) => html,
            Err(e) if e.is_fetch_failure() => {
                // Without the page there is no next-page link to follow.
                warn!(url = %page_url, error = %e, "feed page unavailable, ending traversal");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let doc = Html::parse_document(&html);

        let mut batch = Vec::new();
        for link in discover_feed_links(&doc, &self.spec, &page_url) {
            if self.seen.insert(link.clone()) {
                batch.push(link);
            }
        }
        if batch.is_empty() {
            warn!(url = %page_url, "no candidate articles found on page");
        }

        self.next_url = find_next_page_url(&doc, &self.spec.base_url);
        Ok(Some(batch))
    }
}

/// Day-by-day calendar indexing, walking a fixed number of days backward
/// from today.
pub struct CalendarTraversal {
    spec: SourceSpec,
    index_path: String,
    date_format: String,
    days_checked: usize,
    max_days: usize,
    seen: HashSet<String>,
}

impl CalendarTraversal {
    fn new(spec: SourceSpec, index_path: String, date_format: String, max_days: usize) -> Self {
        Self {
            spec,
            index_path,
            date_format,
            days_checked: 0,
            max_days,
            seen: HashSet::new(),
        }
    }

    async fn next_batch(&mut self, fetcher: &Fetcher) -> Result<Option<Vec<String>>> {
        if self.days_checked >= self.max_days {
            return Ok(None);
        }
        let date = Utc::now().date_naive() - chrono::Duration::days(self.days_checked as i64);
        self.days_checked += 1;

        let page_url = format!(
            "{}/{}/{}",
            self.spec.base_url.trim_end_matches('/'),
            self.index_path,
            date.format(&self.date_format)
        );
        info!(url = %page_url, day = self.days_checked, "checking day index");

        let html = match fetcher.fetch(&page_url).await {
            Ok(html) => html,
            Err(e) if e.is_fetch_failure() => {
                // A missing day is normal (holidays); keep walking back.
                warn!(url = %page_url, error = %e, "day index unavailable, skipping");
                return Ok(Some(Vec::new()));
            }
            Err(e) => return Err(e),
        };
        let doc = Html::parse_document(&html);

        let mut batch = Vec::new();
        for link in discover_index_links(&doc, &self.spec, &page_url) {
            if self.seen.insert(link.clone()) {
                batch.push(link);
            }
        }
        debug!(url = %page_url, candidates = batch.len(), "day index scanned");
        Ok(Some(batch))
    }
}

/// Candidate links on a paginated feed page: structural containers first,
/// generic link-pattern scan as the last resort.
fn discover_feed_links(doc: &Html, spec: &SourceSpec, page_url: &str) -> Vec<String> {
    let mut containers: Vec<ElementRef<'_>> = Vec::new();
    for selector_str in &spec.container_selectors {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for el in doc.select(&selector) {
            if is_navigation_chrome(el) {
                continue;
            }
            if containers.iter().any(|c| c.id() == el.id()) {
                continue;
            }
            containers.push(el);
        }
    }

    let mut links: Vec<String> = containers
        .iter()
        .filter_map(|container| best_link_in_container(*container, page_url))
        .collect();

    if links.is_empty() {
        debug!("no containers matched, falling back to link-pattern scan");
        links = fallback_link_scan(doc, spec, page_url);
    }
    links
}

fn is_navigation_chrome(el: ElementRef<'_>) -> bool {
    el.value().classes().any(|class| {
        let lower = class.to_lowercase();
        SKIP_CONTAINER_CLASSES.iter().any(|skip| lower.contains(skip))
    })
}

/// Ordered link strategies within one article card; first href that looks
/// like a detail page and carries a real title wins.
fn best_link_in_container(container: ElementRef<'_>, page_url: &str) -> Option<String> {
    const LINK_SELECTORS: [&str; 5] = [
        "h1 a, h2 a, h3 a",
        ".entry-title a",
        ".post-title a",
        "a[rel=\"bookmark\"]",
        "a",
    ];
    for selector_str in LINK_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for link in container.select(&selector) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let lower = href.to_lowercase();
            if SKIP_HREF_SEGMENTS.iter().any(|skip| lower.contains(skip)) {
                continue;
            }
            let title: String = link.text().collect::<String>().trim().to_string();
            if title.len() <= 5 {
                continue;
            }
            if let Some(absolute) = resolve_url(page_url, href) {
                return Some(absolute);
            }
        }
    }
    None
}

/// Last-resort discovery: any same-host link with a year-ish path segment
/// that isn't pagination or a feed.
fn fallback_link_scan(doc: &Html, spec: &SourceSpec, page_url: &str) -> Vec<String> {
    let Ok(anchor) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let mut links = Vec::new();
    for el in doc.select(&anchor) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Some(absolute) = resolve_url(page_url, href) else {
            continue;
        };
        let lower = absolute.to_lowercase();
        if !absolute.starts_with(&spec.base_url) || !absolute.contains("/20") {
            continue;
        }
        if lower.contains("/page/")
            || ["feed", "rss", "atom", "json"].iter().any(|x| lower.contains(x))
        {
            continue;
        }
        links.push(absolute);
    }
    links
}

/// Next-page resolution: numbered pagination, then rel=next style links,
/// then a generic `/page/N/` href scan.
fn find_next_page_url(doc: &Html, base_url: &str) -> Option<String> {
    if let Ok(selector) = Selector::parse(".page-numbers") {
        let mut current = None;
        let mut highest = 1u32;
        for el in doc.select(&selector) {
            let label = el.text().collect::<String>().trim().to_string();
            let Ok(number) = label.parse::<u32>() else {
                continue;
            };
            if el.value().classes().any(|c| c == "current") {
                current = Some(number);
            } else if number > highest {
                highest = number;
            }
        }
        if let Some(current) = current {
            if current < highest {
                return Some(format!(
                    "{}/page/{}/",
                    base_url.trim_end_matches('/'),
                    current + 1
                ));
            }
        }
    }

    for selector_str in [".next.page-numbers", "a.next", "a.next-posts", "a[rel=\"next\"]"] {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for el in doc.select(&selector) {
            if el.value().name() != "a" {
                continue;
            }
            if let Some(href) = el.value().attr("href") {
                return resolve_url(base_url, href);
            }
        }
    }

    if let Ok(selector) = Selector::parse("a[href]") {
        for el in doc.select(&selector) {
            let Some(href) = el.value().attr("href") else {
                continue;
            };
            if let Some(rest) = href.split("/page/").nth(1) {
                if href.ends_with('/') {
                    if let Ok(number) = rest.trim_end_matches('/').parse::<u32>() {
                        if number > 1 {
                            return resolve_url(base_url, href);
                        }
                    }
                }
            }
        }
    }
    None
}

/// Candidate links on a calendar day index: heading-anchored links first,
/// then links inside the content body, filtered to known detail paths.
fn discover_index_links(doc: &Html, spec: &SourceSpec, page_url: &str) -> Vec<String> {
    let mut links = Vec::new();

    for selector_str in ["h1#dynamic-title a", "h1 a", "h2 a", "h3 a"] {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for el in doc.select(&selector) {
            push_allowed_link(&mut links, el, spec, page_url, 0);
        }
    }

    for container_selector in &spec.content_selectors {
        if let Some(container) = select_first(doc, container_selector) {
            let Ok(anchor) = Selector::parse("a[href]") else {
                continue;
            };
            for el in container.select(&anchor) {
                // Body links need meaningful text to count as articles.
                push_allowed_link(&mut links, el, spec, page_url, 10);
            }
        }
    }
    links
}

fn push_allowed_link(
    links: &mut Vec<String>,
    el: ElementRef<'_>,
    spec: &SourceSpec,
    page_url: &str,
    min_title_len: usize,
) {
    let Some(href) = el.value().attr("href") else {
        return;
    };
    if !spec.link_path_allow.is_empty()
        && !spec.link_path_allow.iter().any(|p| href.contains(p.as_str()))
    {
        return;
    }
    if min_title_len > 0 {
        let title = el.text().collect::<String>().trim().to_string();
        if title.len() <= min_title_len {
            return;
        }
    }
    if let Some(absolute) = resolve_url(page_url, href) {
        if !links.contains(&absolute) {
            links.push(absolute);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources;

    fn feed_page() -> &'static str {
        r#"
        <html><body>
          <article class="post">
            <h2><a href="/election-commission-reforms-2025/">Election Commission Reforms</a></h2>
            <p>Teaser</p>
          </article>
          <article class="post">
            <h2><a href="https://www.gktoday.in/monsoon-outlook-2025/">Monsoon Outlook Released</a></h2>
          </article>
          <div class="post navigation"><a href="/page/2/">2</a></div>
          <div class="page-numbers"><span class="page-numbers current">1</span>
            <a class="page-numbers" href="/page/2/">2</a>
            <a class="page-numbers" href="/page/3/">3</a></div>
        </body></html>
        "#
    }

    #[test]
    fn test_discover_feed_links_resolves_and_skips_navigation() {
        let spec = sources::gktoday::spec();
        let doc = Html::parse_document(feed_page());
        let links = discover_feed_links(&doc, &spec, "https://www.gktoday.in");
        assert_eq!(
            links,
            vec![
                "https://www.gktoday.in/election-commission-reforms-2025/",
                "https://www.gktoday.in/monsoon-outlook-2025/",
            ]
        );
    }

    #[test]
    fn test_next_page_from_numbered_pagination() {
        let doc = Html::parse_document(feed_page());
        assert_eq!(
            find_next_page_url(&doc, "https://www.gktoday.in"),
            Some("https://www.gktoday.in/page/2/".to_string())
        );
    }

    #[test]
    fn test_next_page_from_rel_next() {
        let html = r#"<html><body><a rel="next" href="/page/5/">older</a></body></html>"#;
        let doc = Html::parse_document(html);
        assert_eq!(
            find_next_page_url(&doc, "https://www.gktoday.in"),
            Some("https://www.gktoday.in/page/5/".to_string())
        );
    }

    #[test]
    fn test_next_page_generic_scan_ignores_page_one() {
        let html = r#"<html><body>
            <a href="https://www.gktoday.in/page/1/">first</a>
            <a href="https://www.gktoday.in/page/7/">older</a>
        </body></html>"#;
        let doc = Html::parse_document(html);
        assert_eq!(
            find_next_page_url(&doc, "https://www.gktoday.in"),
            Some("https://www.gktoday.in/page/7/".to_string())
        );
    }

    #[test]
    fn test_no_next_page() {
        let doc = Html::parse_document("<html><body><p>done</p></body></html>");
        assert_eq!(find_next_page_url(&doc, "https://www.gktoday.in"), None);
    }

    #[test]
    fn test_fallback_link_scan_when_no_containers_match() {
        let html = r#"<html><body>
            <div><a href="https://www.gktoday.in/2025/some-story/">A long enough title</a></div>
            <div><a href="https://www.gktoday.in/feed/">feed</a></div>
            <div><a href="https://elsewhere.com/2025/other/">offsite</a></div>
        </body></html>"#;
        let mut spec = sources::gktoday::spec();
        spec.container_selectors = vec![".card".to_string()];
        let doc = Html::parse_document(html);
        let links = discover_feed_links(&doc, &spec, "https://www.gktoday.in");
        assert_eq!(links, vec!["https://www.gktoday.in/2025/some-story/"]);
    }

    #[test]
    fn test_discover_index_links_filters_to_detail_paths() {
        let html = r#"<html><body>
          <h1 id="dynamic-title"><a href="/daily-updates/daily-news-analysis/topic-one">Topic One</a></h1>
          <div class="article-detail">
            <a href="/daily-news-analysis/topic-two">Topic Two With Long Title</a>
            <a href="/daily-news-analysis/topic-two">Topic Two With Long Title</a>
            <a href="/about-us">About Us Page Link Text</a>
            <a href="/daily-updates/short">ab</a>
          </div>
        </body></html>"#;
        let spec = sources::drishti::spec();
        let doc = Html::parse_document(html);
        let links = discover_index_links(&doc, &spec, "https://www.drishtiias.com/x");
        assert_eq!(
            links,
            vec![
                "https://www.drishtiias.com/daily-updates/daily-news-analysis/topic-one",
                "https://www.drishtiias.com/daily-news-analysis/topic-two",
            ]
        );
    }
}
