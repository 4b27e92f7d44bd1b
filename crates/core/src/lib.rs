//! Domain core for the picmix relay: configuration, link extraction and the
//! page scraper. Nothing here knows about Slack.

pub mod config;
pub mod links;
pub mod scrape;

pub use links::{extract_links, ExtractedLink};
pub use scrape::{HttpImageScraper, ImageScraper, ScrapeError, ScrapeOutcome, ScrapedImage};
