use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// Character budget for the extractive summary of a single article.
pub const SUMMARY_MAX_CHARS: usize = 300;
/// Character budget for summary plus related-articles annotation combined.
const COMBINED_MAX_CHARS: usize = 350;
/// How many history entries to rank as candidate context.
pub const DEFAULT_TOP_K: usize = 3;
/// How many related titles the annotation lists at most.
const MAX_RELATED_TITLES: usize = 2;
/// How many leading sentences the extractive summary keeps.
const SUMMARY_SENTENCES: usize = 3;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());
// A sentence ends at terminal punctuation followed by whitespace. The
// punctuation stays with the preceding sentence, the whitespace is consumed.
static SENTENCE_BOUNDARY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

// --- Shared Types ---

/// One feed entry as it moves through the pipeline. For freshly fetched
/// entries `summary` holds the raw feed body; once the entry is in the batch
/// history it holds the finalized digest summary instead, and all later
/// similarity comparisons run against that.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Article {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published: String,
}

// --- Shared Logging ---

/// Initialize structured logging with JSON format in production (when RUST_LOG is set),
/// or pretty format for local development.
pub fn init_logging() {
    let is_production = std::env::var("RUST_LOG").is_ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if is_production {
        let _ = fmt()
            .with_env_filter(filter)
            .json()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }
}

// --- Tokenizer ---

/// Distinct lowercase word tokens of `text`. A token is a maximal `\w+` run;
/// everything else is a delimiter and dropped.
pub fn tokenize(text: &str) -> HashSet<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

// --- Similarity Scorer ---

/// Token-overlap score between two texts, `|Ta ∩ Tb| / (|Ta| + |Tb|)`.
///
/// This is deliberately not the Jaccard index: the denominator is the sum of
/// both set sizes, so the score is bounded by 0.5 for nonempty inputs and
/// identical texts score exactly 0.5. Either side empty scores 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let ta = tokenize(a);
    let tb = tokenize(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let common = ta.intersection(&tb).count();
    common as f64 / (ta.len() + tb.len()) as f64
}

// --- Extractive Summarizer ---

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for boundary in SENTENCE_BOUNDARY_RE.find_iter(text) {
        // The terminal punctuation is a single ASCII byte, keep it attached.
        sentences.push(&text[start..boundary.start() + 1]);
        start = boundary.end();
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// First few sentences of `text`, truncated to a character budget.
///
/// Keeps the first three sentences joined by single spaces. When the result
/// runs past `max_chars` it is cut at exactly `max_chars` characters, trailing
/// whitespace is stripped, and a `"..."` marker is appended, so the output may
/// be up to `max_chars + 3` characters long.
pub fn summarize_text(text: &str, max_chars: usize) -> String {
    if text.is_empty() {
        return String::new();
    }

    let summary = split_sentences(text.trim())
        .into_iter()
        .take(SUMMARY_SENTENCES)
        .collect::<Vec<_>>()
        .join(" ");

    if summary.chars().count() > max_chars {
        let truncated: String = summary.chars().take(max_chars).collect();
        return format!("{}...", truncated.trim_end());
    }
    summary
}

// --- History-Aware Summary Builder ---

/// Summarize `article` and, when the running history holds sufficiently
/// similar entries, append a short annotation naming the closest ones.
///
/// History entries are scored against `title + " " + summary` of the current
/// article, the `top_k` best with nonzero score are kept as context, and up to
/// two of their non-empty titles go into a `"Related to: ..."` suffix. The
/// suffix is dropped when it would push the combined text past the overall
/// budget, and also when every context title is empty.
pub fn build_rag_summary(article: &Article, history: &[Article], top_k: usize) -> String {
    let current_text = format!("{} {}", article.title, article.summary);

    let mut scores: Vec<(f64, &Article)> = history
        .iter()
        .map(|h| {
            let hist_text = format!("{} {}", h.title, h.summary);
            (similarity(&current_text, &hist_text), h)
        })
        .collect();

    // Stable sort keeps history order on equal scores, which makes the
    // annotation order deterministic.
    scores.sort_by(|a, b| b.0.total_cmp(&a.0));

    let context: Vec<&Article> = scores
        .into_iter()
        .take(top_k)
        .filter(|(score, _)| *score > 0.0)
        .map(|(_, h)| h)
        .collect();

    let base_summary = summarize_text(&article.summary, SUMMARY_MAX_CHARS);

    if context.is_empty() {
        return base_summary;
    }

    let related_titles: Vec<&str> = context
        .iter()
        .filter(|h| !h.title.is_empty())
        .take(MAX_RELATED_TITLES)
        .map(|h| h.title.as_str())
        .collect();

    if related_titles.is_empty() {
        // Context made of untitled entries would leave a bare "Related to: "
        // marker, so the annotation is suppressed entirely.
        return base_summary;
    }

    let annotation = format!("Related to: {}", related_titles.join("; "));
    let separator_len = 3;
    if base_summary.chars().count() + annotation.chars().count() + separator_len
        < COMBINED_MAX_CHARS
    {
        return format!("{} | {}", base_summary, annotation);
    }

    base_summary
}

// --- Batch Pipeline ---

/// Run every entry through the summary builder in arrival order, growing the
/// history as it goes. Each history record carries the computed summary, not
/// the raw body, so later entries compare against finalized text. The input is
/// capped at `max_articles` before any summarization happens.
pub fn summarize_batch(mut entries: Vec<Article>, max_articles: usize) -> Vec<Article> {
    entries.truncate(max_articles);

    let mut history: Vec<Article> = Vec::with_capacity(entries.len());
    for article in &entries {
        let digest_summary = build_rag_summary(article, &history, DEFAULT_TOP_K);
        history.push(Article {
            title: article.title.clone(),
            link: article.link.clone(),
            summary: digest_summary,
            published: article.published.clone(),
        });
    }

    debug!(count = history.len(), "Summarized article batch");
    history
}

// --- Message Formatting ---

/// Compose the outbound message body for one article: a title segment, then
/// summary and link segments when present, joined by blank lines.
pub fn format_message(article: &Article) -> String {
    let title = if article.title.is_empty() {
        "No title"
    } else {
        article.title.as_str()
    };

    let mut parts = vec![format!("Title: {}", title)];
    if !article.summary.is_empty() {
        parts.push(format!("Summary: {}", article.summary));
    }
    if !article.link.is_empty() {
        parts.push(format!("Link: {}", article.link));
    }
    parts.join("\n\n")
}
