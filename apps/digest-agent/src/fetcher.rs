use std::error::Error;
use std::time::Duration as StdDuration;

use rss::Channel;
use tracing::{debug, instrument};
use url::Url;

use digest_core::Article;

/// HTTP timeout for fetching feeds
const FETCH_TIMEOUT_SECS: u64 = 30;

/// Create a shared HTTP client with configured timeout
pub fn create_http_client() -> Result<reqwest::Client, Box<dyn Error + Send + Sync>> {
    reqwest::Client::builder()
        .timeout(StdDuration::from_secs(FETCH_TIMEOUT_SECS))
        .build()
        .map_err(|e| e.into())
}

/// Split a pasted feed list into URLs: one per line, trimmed, blanks dropped.
pub fn parse_feed_list(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extract the domain/host from a URL string for log fields.
/// Returns "unknown" if the URL cannot be parsed.
fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Fetch one feed URL and parse its entries in native order. The payload is
/// tried as RSS first, then as Atom.
#[instrument(skip(client, url), fields(feed_domain = %extract_domain(url)))]
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<Article>, Box<dyn Error + Send + Sync>> {
    let content = client.get(url).send().await?.bytes().await?;

    if let Ok(channel) = Channel::read_from(&content[..]) {
        let articles = parse_rss_channel(&channel);
        debug!(count = articles.len(), "Fetched RSS feed");
        return Ok(articles);
    }

    match atom_syndication::Feed::read_from(&content[..]) {
        Ok(feed) => {
            let articles = parse_atom_feed(&feed);
            debug!(count = articles.len(), "Fetched Atom feed");
            Ok(articles)
        }
        Err(e) => Err(format!("'{}' is neither RSS nor Atom: {}", url, e).into()),
    }
}

/// Map RSS items to articles. Every field defaults to empty text; the body
/// comes from `<description>`, falling back to `<content:encoded>` for feeds
/// that only fill the latter.
fn parse_rss_channel(channel: &Channel) -> Vec<Article> {
    channel
        .items()
        .iter()
        .map(|item| Article {
            title: item.title().unwrap_or_default().to_string(),
            link: item.link().unwrap_or_default().to_string(),
            summary: item
                .description()
                .or_else(|| item.content())
                .unwrap_or_default()
                .to_string(),
            published: item.pub_date().unwrap_or_default().to_string(),
        })
        .collect()
}

/// Map Atom entries to articles, with `<summary>` falling back to the
/// `<content>` body. The publication timestamp is carried as opaque text.
fn parse_atom_feed(feed: &atom_syndication::Feed) -> Vec<Article> {
    feed.entries()
        .iter()
        .map(|entry| Article {
            title: entry.title().to_string(),
            link: entry
                .links()
                .first()
                .map(|l| l.href().to_string())
                .unwrap_or_default(),
            summary: entry
                .summary()
                .map(|s| s.to_string())
                .or_else(|| {
                    entry
                        .content()
                        .and_then(|c| c.value().map(|v| v.to_string()))
                })
                .unwrap_or_default(),
            published: entry
                .published()
                .map(|d| d.to_rfc3339())
                .unwrap_or_default(),
        })
        .collect()
}
