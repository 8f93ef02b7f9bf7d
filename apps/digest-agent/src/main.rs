use std::error::Error;

use chrono::Utc;
use tracing::{info, warn};

use digest_agent::fetcher;
use digest_core::{init_logging, summarize_batch, Article};
use telegram_client::TelegramClient;

// --- Configuration Constants ---
const DEFAULT_FEEDS: &[&str] = &[
    "https://rss.nytimes.com/services/xml/rss/nyt/World.xml",
    "https://feeds.bbci.co.uk/news/world/rss.xml",
];
const DEFAULT_MAX_ARTICLES: usize = 30;
const MAX_ARTICLES_LIMIT: usize = 200;
const DEFAULT_MAX_MESSAGES: usize = 5;
const MAX_MESSAGES_LIMIT: usize = 20;

/// Read a positive integer from the environment, clamped to a sane range.
fn env_limit(name: &str, default: usize, max: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
        .clamp(1, max)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    init_logging();

    let feeds_input =
        std::env::var("RSS_FEEDS").unwrap_or_else(|_| DEFAULT_FEEDS.join("\n"));
    let urls = fetcher::parse_feed_list(&feeds_input);
    let max_articles = env_limit("MAX_ARTICLES", DEFAULT_MAX_ARTICLES, MAX_ARTICLES_LIMIT);
    let max_messages = env_limit("MAX_MESSAGES", DEFAULT_MAX_MESSAGES, MAX_MESSAGES_LIMIT);

    if urls.is_empty() {
        warn!("No feed URLs configured, set RSS_FEEDS to at least one RSS URL");
        return Ok(());
    }

    info!(feeds = urls.len(), max_articles, "Starting digest agent");

    // One client serves both the feed fetches and the Telegram sends.
    let http_client = fetcher::create_http_client()?;

    // 1. Fetch entries from every feed, in the order the URLs were given.
    // A dead feed only loses its own entries.
    let mut all_articles: Vec<Article> = Vec::new();
    for url in &urls {
        info!(url = %url, "Fetching feed");
        match fetcher::fetch_feed(&http_client, url).await {
            Ok(mut articles) => {
                info!(url = %url, count = articles.len(), "Found entries");
                all_articles.append(&mut articles);
            }
            Err(e) => warn!(url = %url, error = %e, "Failed to fetch feed"),
        }
    }

    if all_articles.is_empty() {
        warn!("No articles found, check your RSS URLs");
        return Ok(());
    }

    // 2. Build the digest. The returned batch is the single state object
    // handed from the fetch step to the dispatch step.
    let digest = summarize_batch(all_articles, max_articles);
    info!(count = digest.len(), "Fetched and summarized articles");

    render_preview(&digest);

    // 3. Dispatch, but only when both credentials are present.
    match TelegramClient::from_env(http_client) {
        Some(telegram) => {
            let sent = telegram.send_digest(&digest, max_messages).await;
            info!(sent, "Sent message(s) to Telegram");
        }
        None => {
            warn!("Telegram bot token and chat ID are both required, skipping send")
        }
    }

    Ok(())
}

/// Render the summarized batch to stdout as a markdown digest, one numbered
/// section per article.
fn render_preview(articles: &[Article]) {
    println!("# Digest for {}", Utc::now().format("%Y-%m-%d"));
    for (i, article) in articles.iter().enumerate() {
        let title = if article.title.is_empty() {
            "Untitled article"
        } else {
            article.title.as_str()
        };
        println!();
        println!("## {}. {}", i + 1, title);
        if !article.published.is_empty() {
            println!("Published: {}", article.published);
        }
        if article.summary.is_empty() {
            println!("No summary available.");
        } else {
            println!("{}", article.summary);
        }
        if !article.link.is_empty() {
            println!("[Read more]({})", article.link);
        }
    }
    println!();
}
