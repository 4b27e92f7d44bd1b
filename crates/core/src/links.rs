use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

const PICMIX_LINK_PATTERN: &str = r"(?i)https?://(?:www\.)?picmix\.com/\S+";

static PICMIX_LINK: OnceLock<Regex> = OnceLock::new();

fn picmix_link_regex() -> &'static Regex {
    PICMIX_LINK.get_or_init(|| {
        Regex::new(PICMIX_LINK_PATTERN).unwrap_or_else(|error| {
            unreachable!("picmix link pattern is a compile-time constant: {error}")
        })
    })
}

/// A picmix URL lifted verbatim out of a message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExtractedLink(String);

impl ExtractedLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExtractedLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns every picmix link in `text`, in order of appearance.
///
/// Repeated URLs are kept; each occurrence gets its own scrape and reply.
pub fn extract_links(text: &str) -> Vec<ExtractedLink> {
    picmix_link_regex()
        .find_iter(text)
        .map(|found| ExtractedLink::new(found.as_str()))
        .collect()
}
