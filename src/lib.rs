// src/lib.rs
//! Push streams of new Reddit comments and submissions.
//!
//! ```ignore
//! let stream = reddit_stream::RedditStream::new(reddit_stream::RedditClient::from_env()?).with_drift(2);
//! let mut sink = stream.comment_stream("rust", StreamOptions::new().pattern("(?i)tokio"))?;
//! while let Some(ev) = sink.recv().await {
//!     if let StreamEvent::Comment(m) = ev {
//!         println!("{}: {}", m.item.id, m.matched.matched);
//!     }
//! }
//! ```

pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod stream;

// ---- Re-exports for stable public API ----
pub use crate::error::{FetchError, StreamError};
pub use crate::ingest::providers::{RedditClient, RedditClientConfig};
pub use crate::ingest::scheduler::{EventSink, PollHandle};
pub use crate::ingest::types::{
    FetchOptions, Fetcher, Item, ItemKind, MatchResult, Matched, StreamEvent,
};
pub use crate::stream::{PatternSpec, RedditStream, StreamOptions};
