//! Image Scraper: fetches one picmix page and pulls out its featured image.
//!
//! The scraper never returns `Err`. Every fetch ends in exactly one
//! [`ScrapeOutcome`]:
//!
//! - [`ScrapeOutcome::Found`] when the selector matched an element with a `src`,
//! - [`ScrapeOutcome::NoImage`] when the page loaded but nothing usable matched,
//! - [`ScrapeOutcome::Failed`] when the request or body read failed.

use async_trait::async_trait;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::links::ExtractedLink;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScrapedImage {
    pub image_url: String,
    pub alt_text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScrapeOutcome {
    Found(ScrapedImage),
    NoImage,
    Failed(ScrapeError),
}

impl ScrapeOutcome {
    pub fn image(&self) -> Option<&ScrapedImage> {
        match self {
            Self::Found(image) => Some(image),
            Self::NoImage | Self::Failed(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Found(_) => "found",
            Self::NoImage => "no_image",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ScrapeError {
    #[error("could not build http client: {0}")]
    Client(String),
    #[error("invalid image selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },
    #[error("request to `{url}` failed: {reason}")]
    Request { url: String, reason: String },
    #[error("could not read response body from `{url}`: {reason}")]
    Body { url: String, reason: String },
}

#[async_trait]
pub trait ImageScraper: Send + Sync {
    async fn scrape(&self, link: &ExtractedLink) -> ScrapeOutcome;
}

pub struct HttpImageScraper {
    client: reqwest::Client,
    selector: Selector,
    selector_source: String,
    default_alt_text: String,
}

impl HttpImageScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|error| ScrapeError::Client(error.to_string()))?;
        let selector = parse_selector(&config.image_selector)?;

        Ok(Self {
            client,
            selector,
            selector_source: config.image_selector.clone(),
            default_alt_text: config.default_alt_text.clone(),
        })
    }

    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|error| ScrapeError::Request {
                url: url.to_owned(),
                reason: error.to_string(),
            })?;

        response
            .text()
            .await
            .map_err(|error| ScrapeError::Body { url: url.to_owned(), reason: error.to_string() })
    }
}

#[async_trait]
impl ImageScraper for HttpImageScraper {
    async fn scrape(&self, link: &ExtractedLink) -> ScrapeOutcome {
        let body = match self.fetch(link.as_str()).await {
            Ok(body) => body,
            Err(error) => {
                warn!(
                    event_name = "scrape.fetch_failed",
                    url = %link,
                    error = %error,
                    "error extracting image"
                );
                return ScrapeOutcome::Failed(error);
            }
        };

        debug!(
            event_name = "scrape.selector_check",
            url = %link,
            selector = %self.selector_source,
            "checking selector"
        );
        let outcome = extract_image(&body, &self.selector, &self.default_alt_text);
        match &outcome {
            ScrapeOutcome::Found(image) => info!(
                event_name = "scrape.image_found",
                url = %link,
                image_url = %image.image_url,
                "found image url"
            ),
            _ => info!(event_name = "scrape.image_missing", url = %link, "no image on page"),
        }
        outcome
    }
}

pub fn parse_selector(source: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(source).map_err(|error| ScrapeError::Selector {
        selector: source.to_owned(),
        reason: error.to_string(),
    })
}

/// Applies `selector` to `html` and reads the first match.
///
/// A missing or empty `alt` falls back to `default_alt_text`; a missing or
/// empty `src` counts as no image.
pub fn extract_image(html: &str, selector: &Selector, default_alt_text: &str) -> ScrapeOutcome {
    let document = Html::parse_document(html);
    let Some(element) = document.select(selector).next() else {
        return ScrapeOutcome::NoImage;
    };

    let Some(image_url) = element.value().attr("src").filter(|src| !src.is_empty()) else {
        return ScrapeOutcome::NoImage;
    };
    let alt_text = element
        .value()
        .attr("alt")
        .filter(|alt| !alt.is_empty())
        .unwrap_or(default_alt_text);

    ScrapeOutcome::Found(ScrapedImage {
        image_url: image_url.to_owned(),
        alt_text: alt_text.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{
        extract_image, parse_selector, HttpImageScraper, ImageScraper, ScrapeError, ScrapeOutcome,
        ScrapedImage,
    };
    use crate::config::{ScraperConfig, DEFAULT_ALT_TEXT, DEFAULT_IMAGE_SELECTOR, DEFAULT_USER_AGENT};
    use crate::links::ExtractedLink;

    const PAGE_WITH_IMAGE: &str = r#"
        <html><body>
          <img src="https://cdn.example/logo.png" alt="logo">
          <div id="pPic">
            <a href="/x"><img src="https://cdn.example/img.png" alt="Sunset"></a>
            <img src="https://cdn.example/second.png" alt="Second">
          </div>
        </body></html>
    "#;

    fn default_config() -> ScraperConfig {
        ScraperConfig {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            image_selector: DEFAULT_IMAGE_SELECTOR.to_owned(),
            default_alt_text: DEFAULT_ALT_TEXT.to_owned(),
        }
    }

    fn extract(html: &str) -> ScrapeOutcome {
        let selector = parse_selector(DEFAULT_IMAGE_SELECTOR).expect("selector");
        extract_image(html, &selector, DEFAULT_ALT_TEXT)
    }

    #[test]
    fn takes_first_image_inside_container() {
        assert_eq!(
            extract(PAGE_WITH_IMAGE),
            ScrapeOutcome::Found(ScrapedImage {
                image_url: "https://cdn.example/img.png".to_owned(),
                alt_text: "Sunset".to_owned(),
            })
        );
    }

    #[test]
    fn missing_alt_uses_placeholder() {
        let outcome = extract(r#"<div id="pPic"><img src="https://cdn.example/a.gif"></div>"#);
        assert_eq!(outcome.image().map(|image| image.alt_text.as_str()), Some("Picmix Image"));

        let outcome =
            extract(r#"<div id="pPic"><img src="https://cdn.example/a.gif" alt=""></div>"#);
        assert_eq!(outcome.image().map(|image| image.alt_text.as_str()), Some("Picmix Image"));
    }

    #[test]
    fn selector_miss_is_no_image() {
        assert_eq!(
            extract(r#"<img src="https://cdn.example/elsewhere.png">"#),
            ScrapeOutcome::NoImage
        );
        assert_eq!(extract("not html at all"), ScrapeOutcome::NoImage);
    }

    #[test]
    fn image_without_src_is_no_image() {
        assert_eq!(extract(r#"<div id="pPic"><img alt="ghost"></div>"#), ScrapeOutcome::NoImage);
    }

    #[test]
    fn invalid_selector_is_reported() {
        assert!(matches!(parse_selector("div[[["), Err(ScrapeError::Selector { .. })));
    }

    #[tokio::test]
    async fn fetches_page_with_browser_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/abc123"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_WITH_IMAGE))
            .expect(1)
            .mount(&server)
            .await;

        let scraper = HttpImageScraper::new(&default_config()).expect("scraper");
        let link = ExtractedLink::new(format!("{}/abc123", server.uri()));

        let outcome = scraper.scrape(&link).await;

        assert_eq!(outcome.label(), "found");
        assert_eq!(
            outcome.image().map(|image| image.image_url.as_str()),
            Some("https://cdn.example/img.png")
        );
    }

    #[tokio::test]
    async fn page_without_container_is_no_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/empty"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
            .mount(&server)
            .await;

        let scraper = HttpImageScraper::new(&default_config()).expect("scraper");
        let outcome = scraper.scrape(&ExtractedLink::new(format!("{}/empty", server.uri()))).await;

        assert_eq!(outcome, ScrapeOutcome::NoImage);
    }

    #[tokio::test]
    async fn error_status_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string(PAGE_WITH_IMAGE))
            .mount(&server)
            .await;

        let scraper = HttpImageScraper::new(&default_config()).expect("scraper");
        let outcome = scraper.scrape(&ExtractedLink::new(format!("{}/gone", server.uri()))).await;

        assert!(matches!(outcome, ScrapeOutcome::Failed(ScrapeError::Request { .. })));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_failure() {
        let scraper = HttpImageScraper::new(&default_config()).expect("scraper");
        let outcome = scraper.scrape(&ExtractedLink::new("http://127.0.0.1:1/abc")).await;

        assert!(matches!(outcome, ScrapeOutcome::Failed(_)));
        assert_eq!(outcome.image(), None);
    }
}
