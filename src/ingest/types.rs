// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Options forwarded verbatim to the fetcher (e.g. `limit`, `show`).
pub type FetchOptions = serde_json::Map<String, serde_json::Value>;

/// One comment or submission as returned by the source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Item {
    pub id: String,
    pub created_utc: i64, // unix seconds, source clock
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub subreddit: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Comment text.
    #[serde(default)]
    pub body: Option<String>,
    /// Submission text.
    #[serde(default)]
    pub selftext: Option<String>,
}

/// Which listing a stream polls. Decides the fetch operation, the text field
/// the pattern runs against and the name of the match event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Comment,
    Submission,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Comment => "comment",
            ItemKind::Submission => "submission",
        }
    }

    /// The field pattern matching looks at: `body` for comments, `selftext` for submissions.
    pub fn text_of(self, item: &Item) -> Option<&str> {
        match self {
            ItemKind::Comment => item.body.as_deref(),
            ItemKind::Submission => item.selftext.as_deref(),
        }
    }

    pub async fn fetch(
        self,
        fetcher: &dyn Fetcher,
        scope: &str,
        opts: &FetchOptions,
    ) -> Result<Vec<Item>> {
        match self {
            ItemKind::Comment => fetcher.fetch_new_comments(scope, opts).await,
            ItemKind::Submission => fetcher.fetch_new_submissions(scope, opts).await,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote content source. `RedditClient` is the HTTP implementation; tests
/// supply scripted doubles.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_new_comments(&self, scope: &str, opts: &FetchOptions) -> Result<Vec<Item>>;
    async fn fetch_new_submissions(&self, scope: &str, opts: &FetchOptions)
        -> Result<Vec<Item>>;
    fn name(&self) -> &'static str {
        "fetcher"
    }
}

/// Span and capture groups of a successful pattern match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub matched: String,
    pub start: usize,
    pub end: usize,
    /// Capture groups 1..n; `None` for groups that did not participate.
    pub groups: Vec<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched {
    pub item: Item,
    pub matched: MatchResult,
}

/// Everything a stream delivers, in tick order.
#[derive(Debug)]
pub enum StreamEvent {
    /// Raw fetch result of a successful tick.
    Batch(Vec<Item>),
    /// Items of the tick that survived dedup and the recency filter, before pattern matching.
    NewItems(Vec<Item>),
    Comment(Matched),
    Submission(Matched),
    /// A tick whose fetch failed. Polling continues.
    Error(crate::error::FetchError),
}

impl StreamEvent {
    /// Event name as used in logs (`batch`, `new_items`, `comment`, `submission`, `error`).
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Batch(_) => "batch",
            StreamEvent::NewItems(_) => "new_items",
            StreamEvent::Comment(_) => ItemKind::Comment.as_str(),
            StreamEvent::Submission(_) => ItemKind::Submission.as_str(),
            StreamEvent::Error(_) => "error",
        }
    }

    pub(crate) fn matched(kind: ItemKind, m: Matched) -> Self {
        match kind {
            ItemKind::Comment => StreamEvent::Comment(m),
            ItemKind::Submission => StreamEvent::Submission(m),
        }
    }

    /// The match payload if this is a kind-named match event.
    pub fn as_match(&self) -> Option<&Matched> {
        match self {
            StreamEvent::Comment(m) | StreamEvent::Submission(m) => Some(m),
            _ => None,
        }
    }
}
