//! Content-validity heuristic
//!
//! A 200 response is not proof of a live source: parked domains, registrar
//! landing pages and CDN error pages all answer 200. The validator applies a
//! fixed sequence of rules to the response; the first decisive rule wins.
//!
//! 1. status other than 200 fails
//! 2. JSON responses pass iff they parse to a non-empty object or array
//! 3. the body (capped) is decoded and lower-cased
//! 4. no `<html` marker fails
//! 5. more base64-looking tokens than the limit fails
//! 6. a whitelist phrase passes
//! 7. a blacklist phrase fails
//! 8. anything else passes

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

use crate::classify::clean_name;
use crate::config::FilterConfig;
use crate::probe::decode::decode_body;

static BASE64_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9+/]{20,}={0,2}").expect("Invalid regex pattern"));

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("Invalid selector"));

/// Why a page passed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    Json,
    Whitelisted,
    Default,
}

/// Why a probe failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    /// Transport-level failure, labelled by error kind
    Network(&'static str),
    Status(u16),
    InvalidJson,
    EmptyJson,
    NotHtml,
    Base64Noise,
    Blacklisted(String),
}

impl FailReason {
    /// Short label used for tallies and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(kind) => kind,
            Self::Status(_) => "status",
            Self::InvalidJson => "invalid_json",
            Self::EmptyJson => "empty_json",
            Self::NotHtml => "not_html",
            Self::Base64Noise => "base64_noise",
            Self::Blacklisted(_) => "blacklisted",
        }
    }
}

/// Outcome of one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass(PassReason),
    Fail(FailReason),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass(_))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass(reason) => write!(f, "pass ({reason:?})"),
            Self::Fail(FailReason::Status(code)) => write!(f, "fail (status {code})"),
            Self::Fail(FailReason::Blacklisted(phrase)) => write!(f, "fail (blacklisted: {phrase})"),
            Self::Fail(reason) => write!(f, "fail ({})", reason.kind()),
        }
    }
}

/// The parts of an HTTP response the heuristic looks at
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Verdict plus the page title when one was requested and found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub verdict: Verdict,
    pub title: Option<String>,
}

/// Applies the content rules to fetched pages
#[derive(Debug, Clone)]
pub struct ContentValidator {
    whitelist: Vec<String>,
    blacklist: Vec<String>,
    base64_token_limit: usize,
    max_body_bytes: usize,
}

impl ContentValidator {
    pub fn new(filter: &FilterConfig, max_body_bytes: usize) -> Self {
        Self {
            whitelist: lowercase_phrases(&filter.whitelist),
            blacklist: lowercase_phrases(&filter.blacklist),
            base64_token_limit: filter.base64_token_limit,
            max_body_bytes,
        }
    }

    /// Run the rules over a page; with `want_title`, also extract `<title>`
    pub fn assess(&self, page: &PageSnapshot, want_title: bool) -> Assessment {
        if page.status != 200 {
            return Assessment::verdict(Verdict::Fail(FailReason::Status(page.status)));
        }

        if page.content_type.to_ascii_lowercase().contains("json") {
            return Assessment::verdict(judge_json(&page.body));
        }

        let capped = &page.body[..page.body.len().min(self.max_body_bytes)];
        let decoded = decode_body(capped, &page.content_type);
        let text = decoded.text.to_lowercase();

        let verdict = self.judge_html(&text);
        let title = if want_title && verdict.is_pass() {
            extract_title(&decoded.text)
        } else {
            None
        };

        Assessment { verdict, title }
    }

    fn judge_html(&self, text: &str) -> Verdict {
        if !text.contains("<html") {
            return Verdict::Fail(FailReason::NotHtml);
        }

        if self.exceeds_base64_limit(text) {
            return Verdict::Fail(FailReason::Base64Noise);
        }

        if self.whitelist.iter().any(|phrase| text.contains(phrase.as_str())) {
            return Verdict::Pass(PassReason::Whitelisted);
        }

        if let Some(phrase) = self.blacklist.iter().find(|phrase| text.contains(phrase.as_str())) {
            return Verdict::Fail(FailReason::Blacklisted(phrase.clone()));
        }

        Verdict::Pass(PassReason::Default)
    }

    /// Counting stops as soon as the limit is passed
    fn exceeds_base64_limit(&self, text: &str) -> bool {
        BASE64_TOKEN
            .find_iter(text)
            .take(self.base64_token_limit.saturating_add(1))
            .count()
            > self.base64_token_limit
    }
}

impl Assessment {
    fn verdict(verdict: Verdict) -> Self {
        Self {
            verdict,
            title: None,
        }
    }
}

fn judge_json(body: &[u8]) -> Verdict {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) if !map.is_empty() => Verdict::Pass(PassReason::Json),
        Ok(Value::Array(items)) if !items.is_empty() => Verdict::Pass(PassReason::Json),
        Ok(_) => Verdict::Fail(FailReason::EmptyJson),
        Err(_) => Verdict::Fail(FailReason::InvalidJson),
    }
}

fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let title = document.select(&TITLE_SELECTOR).next()?;
    let cleaned = clean_name(&title.text().collect::<String>());
    (!cleaned.is_empty()).then_some(cleaned)
}

fn lowercase_phrases(phrases: &[String]) -> Vec<String> {
    phrases
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> ContentValidator {
        let filter = FilterConfig {
            whitelist: vec!["小说".to_string(), "Chapter".to_string()],
            blacklist: vec!["Buy This Domain".to_string(), "错误".to_string()],
            base64_token_limit: 200,
        };
        ContentValidator::new(&filter, 100_000)
    }

    fn html(body: &str) -> PageSnapshot {
        PageSnapshot {
            status: 200,
            content_type: "text/html; charset=utf-8".to_string(),
            body: body.as_bytes().to_vec(),
        }
    }

    fn json(body: &str) -> PageSnapshot {
        PageSnapshot {
            status: 200,
            content_type: "application/json".to_string(),
            body: body.as_bytes().to_vec(),
        }
    }

    fn verdict(page: &PageSnapshot) -> Verdict {
        validator().assess(page, false).verdict
    }

    #[test]
    fn test_non_200_fails_regardless_of_body() {
        let mut page = html("<html>小说</html>");
        page.status = 404;
        assert_eq!(verdict(&page), Verdict::Fail(FailReason::Status(404)));

        page.status = 204;
        assert_eq!(verdict(&page), Verdict::Fail(FailReason::Status(204)));
    }

    #[test]
    fn test_json_rules() {
        assert_eq!(verdict(&json("{}")), Verdict::Fail(FailReason::EmptyJson));
        assert_eq!(verdict(&json("[]")), Verdict::Fail(FailReason::EmptyJson));
        assert_eq!(verdict(&json("42")), Verdict::Fail(FailReason::EmptyJson));
        assert_eq!(verdict(&json(r#"{"a":1}"#)), Verdict::Pass(PassReason::Json));
        assert_eq!(verdict(&json("[1]")), Verdict::Pass(PassReason::Json));
        assert_eq!(verdict(&json("{oops")), Verdict::Fail(FailReason::InvalidJson));
    }

    #[test]
    fn test_json_branch_is_terminal() {
        // Would be blacklisted as HTML; the JSON branch never looks at phrases.
        let page = json(r#"{"html":"<html>buy this domain</html>"}"#);
        assert_eq!(verdict(&page), Verdict::Pass(PassReason::Json));
    }

    #[test]
    fn test_not_html_fails() {
        assert_eq!(verdict(&html("plain text 小说")), Verdict::Fail(FailReason::NotHtml));
    }

    #[test]
    fn test_html_marker_is_case_insensitive() {
        assert_eq!(
            verdict(&html("<HTML><body>hello</body></HTML>")),
            Verdict::Pass(PassReason::Default)
        );
    }

    #[test]
    fn test_whitelist_beats_blacklist() {
        let page = html("<html>Buy this domain! 最新小说</html>");
        assert_eq!(verdict(&page), Verdict::Pass(PassReason::Whitelisted));
    }

    #[test]
    fn test_blacklist_fails() {
        let page = html("<html><h1>BUY THIS DOMAIN</h1></html>");
        assert_eq!(
            verdict(&page),
            Verdict::Fail(FailReason::Blacklisted("buy this domain".to_string()))
        );
    }

    #[test]
    fn test_base64_noise_threshold() {
        let token = "QUJDREVGR0hJSktMTU5PUFFSU1RVVldY";
        let noisy = format!("<html>小说 {}</html>", vec![token; 201].join(" "));
        assert_eq!(verdict(&html(&noisy)), Verdict::Fail(FailReason::Base64Noise));

        let borderline = format!("<html>小说 {}</html>", vec![token; 200].join(" "));
        assert_eq!(verdict(&html(&borderline)), Verdict::Pass(PassReason::Whitelisted));
    }

    #[test]
    fn test_body_cap_limits_inspection() {
        let filter = FilterConfig {
            whitelist: vec![],
            blacklist: vec!["parked".to_string()],
            base64_token_limit: 200,
        };
        let validator = ContentValidator::new(&filter, 64);
        let body = format!("<html>{}parked</html>", " ".repeat(100));
        let assessment = validator.assess(&html(&body), false);
        assert_eq!(assessment.verdict, Verdict::Pass(PassReason::Default));
    }

    #[test]
    fn test_gbk_page_is_matched_after_decoding() {
        let (bytes, _, _) = encoding_rs::GBK.encode("<html><body>页面错误</body></html>");
        let page = PageSnapshot {
            status: 200,
            content_type: "text/html".to_string(),
            body: bytes.into_owned(),
        };
        assert_eq!(
            verdict(&page),
            Verdict::Fail(FailReason::Blacklisted("错误".to_string()))
        );
    }

    #[test]
    fn test_title_extraction() {
        let page = html("<html><head><title> 【笔趣阁】最新小说 </title></head></html>");
        let assessment = validator().assess(&page, true);
        assert!(assessment.verdict.is_pass());
        assert_eq!(assessment.title.as_deref(), Some("笔趣阁 最新小说"));

        let assessment = validator().assess(&page, false);
        assert!(assessment.title.is_none());
    }

    #[test]
    fn test_no_title_on_failure() {
        let page = html("<html><head><title>Buy this domain</title></head></html>");
        let assessment = validator().assess(&page, true);
        assert!(!assessment.verdict.is_pass());
        assert!(assessment.title.is_none());
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::Fail(FailReason::Status(503)).to_string(), "fail (status 503)");
        assert_eq!(Verdict::Fail(FailReason::NotHtml).to_string(), "fail (not_html)");
    }
}
