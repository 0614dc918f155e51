//! Page fetching for URL submissions.
//!
//! A title that parses as a URL is fetched and reduced to a headline plus a
//! short body: the first `<h1>` (else `<title>`) and every `<p>` with more
//! than 30 characters of text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Longest title kept, in characters
pub const MAX_TITLE_CHARS: usize = 200;

/// Longest body kept, in characters
pub const MAX_TEXT_CHARS: usize = 1000;

/// Paragraphs at or under this length are navigation noise
const MIN_PARAGRAPH_CHARS: usize = 30;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ScrapeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0} while fetching page")]
    Status(u16),

    #[error("Page has no headline")]
    NoTitle,
}

/// Headline and body extracted from a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedPage {
    pub title: String,
    pub text: String,
}

/// True when `s` has both a scheme and a host.
pub fn is_url(s: &str) -> bool {
    match reqwest::Url::parse(s.trim()) {
        Ok(url) => url.host_str().map(|h| !h.is_empty()).unwrap_or(false),
        Err(_) => false,
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn element_text(el: scraper::ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Pull the headline and body out of an HTML document.
pub fn extract_page(html: &str) -> Result<ScrapedPage, ScrapeError> {
    let document = Html::parse_document(html);
    // Static selectors, these parses cannot fail
    let h1 = Selector::parse("h1").map_err(|_| ScrapeError::NoTitle)?;
    let title_tag = Selector::parse("title").map_err(|_| ScrapeError::NoTitle)?;
    let paragraph = Selector::parse("p").map_err(|_| ScrapeError::NoTitle)?;

    let title = document
        .select(&h1)
        .next()
        .or_else(|| document.select(&title_tag).next())
        .map(element_text)
        .filter(|t| !t.is_empty())
        .ok_or(ScrapeError::NoTitle)?;

    let text = document
        .select(&paragraph)
        .map(element_text)
        .filter(|p| p.chars().count() > MIN_PARAGRAPH_CHARS)
        .collect::<Vec<_>>()
        .join(" ");

    Ok(ScrapedPage {
        title: truncate_chars(&title, MAX_TITLE_CHARS),
        text: truncate_chars(&text, MAX_TEXT_CHARS),
    })
}

/// Fetches a page and extracts its headline and body.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ScrapedPage, ScrapeError>;
}

/// Real fetcher over HTTP
pub struct HttpPageFetcher {
    http: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0")
            .build()
            .context("Failed to build scraper HTTP client")?;

        Ok(Self { http })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<ScrapedPage, ScrapeError> {
        debug!("Fetching page: {}", url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ScrapeError::Status(response.status().as_u16()));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        extract_page(&html)
    }
}

/// Fake fetcher for testing, serving canned HTML per URL
#[derive(Default)]
pub struct FakePageFetcher {
    pages: HashMap<String, String>,
    fetched: Mutex<Vec<String>>,
}

impl FakePageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PageFetcher for FakePageFetcher {
    async fn fetch(&self, url: &str) -> Result<ScrapedPage, ScrapeError> {
        self.fetched
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        match self.pages.get(url) {
            Some(html) => extract_page(html),
            None => Err(ScrapeError::Status(404)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://news.example.com/story/1"));
        assert!(is_url("http://localhost:8080"));
        assert!(!is_url("Scientists discover water on Mars"));
        assert!(!is_url("mailto:editor@example.com"));
        assert!(!is_url("news.example.com/story"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_extract_prefers_h1() {
        let html = r#"<html><head><title>Site | Story</title></head>
            <body><h1> Real Headline </h1>
            <p>short</p>
            <p>This paragraph is long enough to be kept in the body.</p>
            <p>And this one as well, it has plenty of characters.</p>
            </body></html>"#;

        let page = extract_page(html).unwrap();
        assert_eq!(page.title, "Real Headline");
        assert_eq!(
            page.text,
            "This paragraph is long enough to be kept in the body. And this one as well, it has plenty of characters."
        );
    }

    #[test]
    fn test_extract_falls_back_to_title_tag() {
        let html = "<html><head><title>Only Title</title></head><body></body></html>";
        let page = extract_page(html).unwrap();
        assert_eq!(page.title, "Only Title");
        assert!(page.text.is_empty());
    }

    #[test]
    fn test_extract_without_headline_fails() {
        let html = "<html><body><p>no headline anywhere on this particular page</p></body></html>";
        assert!(matches!(extract_page(html), Err(ScrapeError::NoTitle)));
    }

    #[test]
    fn test_extract_caps_lengths() {
        let long_title = "T".repeat(500);
        let long_para = "word ".repeat(400);
        let html = format!("<h1>{}</h1><p>{}</p>", long_title, long_para);

        let page = extract_page(&html).unwrap();
        assert_eq!(page.title.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(page.text.chars().count(), MAX_TEXT_CHARS);
    }

    #[tokio::test]
    async fn test_fake_fetcher_unknown_url_fails() {
        let fetcher = FakePageFetcher::new().with_page("https://a.example", "<h1>A</h1>");
        assert!(fetcher.fetch("https://a.example").await.is_ok());
        assert!(matches!(
            fetcher.fetch("https://b.example").await,
            Err(ScrapeError::Status(404))
        ));
        assert_eq!(fetcher.fetched().len(), 2);
    }
}
