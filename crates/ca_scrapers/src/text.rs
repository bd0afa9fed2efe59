use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

lazy_static! {
    static ref DISALLOWED: Regex = Regex::new(r#"[^\w\s\-.,;:()\[\]/&%@#$+=<>?!'"°•]"#).unwrap();
    static ref LEADING_BOILERPLATE: Regex =
        Regex::new(r"(?i)^\s*(source|read more|also read)\s*[:\-]\s*").unwrap();
    static ref TRAILING_BOILERPLATE: Regex =
        Regex::new(r"(?i)\s*(read more|also read)\s*[:\-]?\s*\.*\s*$").unwrap();
    static ref ORDINAL: Regex = Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").unwrap();
    static ref DAY_MONTH_YEAR: Regex = Regex::new(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+(January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sept?|Oct|Nov|Dec)[a-z]*\.?,?\s+(\d{4})\b"
    )
    .unwrap();
    static ref MONTH_DAY_YEAR: Regex = Regex::new(
        r"(?i)\b(January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sept?|Oct|Nov|Dec)[a-z]*\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b"
    )
    .unwrap();
    static ref ISO_DATE: Regex = Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap();
    static ref NUMERIC_DATE: Regex = Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{4})\b").unwrap();
    static ref URL_YMD: Regex = Regex::new(r"/(\d{4})/(\d{1,2})/(\d{1,2})(?:/|$)").unwrap();
    static ref URL_DMY: Regex = Regex::new(r"/(\d{1,2})-(\d{1,2})-(\d{4})(?:/|$)").unwrap();
}

/// Fixed, idempotent normalization applied to every extracted text
/// field: collapse whitespace runs, strip characters outside the
/// whitelist, strip leading/trailing boilerplate fragments.
pub fn clean_text(text: &str) -> String {
    let stripped = DISALLOWED.replace_all(text, "");
    let mut cleaned = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    loop {
        let next = TRAILING_BOILERPLATE
            .replace(&LEADING_BOILERPLATE.replace(&cleaned, ""), "")
            .trim()
            .to_string();
        if next == cleaned {
            break;
        }
        cleaned = next;
    }
    cleaned
}

fn month_number(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?.to_lowercase();
    MONTHS
        .iter()
        .position(|m| m[..3].to_lowercase() == prefix)
        .map(|i| i as u32 + 1)
}

/// Canonical raw-date shape, e.g. "May 2, 2025".
pub fn format_date(date: NaiveDate) -> String {
    use chrono::Datelike;
    format!(
        "{} {}, {}",
        MONTHS[date.month0() as usize],
        date.day(),
        date.year()
    )
}

/// Parse an already-isolated date string across the calendar formats the
/// sources use.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = ORDINAL.replace_all(raw.trim(), "$1");
    let formats = [
        "%B %d, %Y", "%b %d, %Y", "%B %d %Y", "%d %B, %Y", "%d %B %Y", "%d %b %Y", "%Y-%m-%d",
        "%d/%m/%Y", "%d-%m-%Y",
    ];
    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(cleaned.as_ref(), fmt) {
            return Some(date);
        }
    }
    find_date_in_text(&cleaned)
}

/// Free-text pattern match over multiple calendar formats; first match
/// wins. Numeric slash/dash dates are read day-first, which is what the
/// Indian sources publish.
pub fn find_date_in_text(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = DAY_MONTH_YEAR.captures(text) {
        let day = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(caps) = MONTH_DAY_YEAR.captures(text) {
        let month = month_number(&caps[1])?;
        let day = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(caps) = ISO_DATE.captures(text) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(caps) = NUMERIC_DATE.captures(text) {
        let day = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

/// Date segment in a canonical URL, `/2025/01/29/` or `/29-01-2025/`.
pub fn date_from_url(url: &str) -> Option<NaiveDate> {
    if let Some(caps) = URL_YMD.captures(url) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(caps) = URL_DMY.captures(url) {
        let day = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_collapses_and_strips() {
        assert_eq!(clean_text("  hello \n\t world  "), "hello world");
        assert_eq!(clean_text("temp 25°C — fine"), "temp 25°C fine");
    }

    #[test]
    fn test_clean_text_strips_boilerplate() {
        assert_eq!(clean_text("Source: PIB The cabinet approved it."), "PIB The cabinet approved it.");
        assert_eq!(clean_text("The cabinet approved it. Read more"), "The cabinet approved it.");
    }

    #[test]
    fn test_clean_text_is_idempotent() {
        let once = clean_text("Source:  India   signed the pact.  Read more...");
        assert_eq!(clean_text(&once), once);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 29).unwrap();
        for raw in [
            "January 29, 2025",
            "Jan 29, 2025",
            "29 January 2025",
            "29th January, 2025",
            "2025-01-29",
            "29/01/2025",
        ] {
            assert_eq!(parse_date(raw), Some(expected), "failed for {raw}");
        }
        assert_eq!(parse_date("No date"), None);
    }

    #[test]
    fn test_find_date_in_text_first_match_wins() {
        let text = "Posted on 3 May, 2025 and updated 4 May, 2025";
        assert_eq!(find_date_in_text(text), NaiveDate::from_ymd_opt(2025, 5, 3));
    }

    #[test]
    fn test_date_from_url() {
        assert_eq!(
            date_from_url("https://example.com/2025/01/29/some-article/"),
            NaiveDate::from_ymd_opt(2025, 1, 29)
        );
        assert_eq!(
            date_from_url("https://example.com/news-analysis/29-01-2025"),
            NaiveDate::from_ymd_opt(2025, 1, 29)
        );
        assert_eq!(date_from_url("https://example.com/about/"), None);
    }

    #[test]
    fn test_format_date_round_trip() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
        assert_eq!(format_date(date), "May 2, 2025");
        assert_eq!(parse_date(&format_date(date)), Some(date));
    }
}
