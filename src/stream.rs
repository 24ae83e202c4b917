//! # Stream facade
//! Opens comment and submission streams over any [`Fetcher`].
//!
//! Each opened stream gets its own session (start time taken at open, empty
//! dedup cache) and its own poll task. Every successful tick is pushed through
//! dedup → recency → pattern and the results land on the returned
//! [`EventSink`] in this order: `Batch`, `NewItems`, then one `Comment` /
//! `Submission` per match.
//!
//! Startup caveat: items are kept when `created_utc >= start - drift`. With a
//! drift larger than the poll interval, items the source stamped just before
//! that cutoff are still dropped at startup; drift is static and never measured.

use crate::error::StreamError;
use crate::ingest::scheduler::{self, EventSink, PollConfig, DEFAULT_RATE};
use crate::ingest::types::{FetchOptions, Fetcher, ItemKind};
use crate::ingest::{Pattern, StreamSession};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_SCOPE: &str = "all";
pub const MIN_SCOPE_LEN: usize = 2;

/// Pattern given either as source text or as an already compiled regex.
#[derive(Debug, Clone)]
pub enum PatternSpec {
    Text(String),
    Compiled(Regex),
}

impl From<&str> for PatternSpec {
    fn from(s: &str) -> Self {
        PatternSpec::Text(s.to_string())
    }
}

impl From<String> for PatternSpec {
    fn from(s: String) -> Self {
        PatternSpec::Text(s)
    }
}

impl From<Regex> for PatternSpec {
    fn from(re: Regex) -> Self {
        PatternSpec::Compiled(re)
    }
}

impl PatternSpec {
    fn compile(self) -> Result<Pattern, StreamError> {
        match self {
            PatternSpec::Text(src) => Pattern::new(&src),
            PatternSpec::Compiled(re) => Ok(Pattern::from(re)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Poll interval; 1000 ms when unset.
    pub rate: Option<Duration>,
    /// Match-all when unset.
    pub pattern: Option<PatternSpec>,
    /// Forwarded verbatim to the fetcher.
    pub extra: FetchOptions,
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rate(mut self, rate: Duration) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<PatternSpec>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

pub fn validate_scope(scope: &str) -> Result<(), StreamError> {
    if scope.chars().count() < MIN_SCOPE_LEN {
        return Err(StreamError::InvalidScope {
            scope: scope.to_string(),
            min: MIN_SCOPE_LEN,
        });
    }
    Ok(())
}

fn resolve_rate(rate: Option<Duration>) -> Result<Duration, StreamError> {
    match rate {
        None => Ok(DEFAULT_RATE),
        Some(r) if r.is_zero() => Err(StreamError::InvalidRate),
        Some(r) => Ok(r),
    }
}

/// Entry point: wraps a fetcher and opens streams over it.
#[derive(Clone)]
pub struct RedditStream {
    fetcher: Arc<dyn Fetcher>,
    drift: i64,
}

impl RedditStream {
    pub fn new<F: Fetcher + 'static>(fetcher: F) -> Self {
        Self::from_arc(Arc::new(fetcher))
    }

    pub fn from_arc(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher, drift: 0 }
    }

    /// Seconds the source clock lags the local clock. Negative values are
    /// rejected when a stream is opened.
    pub fn with_drift(mut self, drift_secs: i64) -> Self {
        self.drift = drift_secs;
        self
    }

    pub fn drift(&self) -> i64 {
        self.drift
    }

    /// Start polling new comments of `scope`. Must be called inside a Tokio runtime.
    pub fn comment_stream(&self, scope: &str, opts: StreamOptions) -> Result<EventSink, StreamError> {
        self.open(ItemKind::Comment, scope, opts)
    }

    /// Start polling new submissions of `scope`. Must be called inside a Tokio runtime.
    pub fn submission_stream(
        &self,
        scope: &str,
        opts: StreamOptions,
    ) -> Result<EventSink, StreamError> {
        self.open(ItemKind::Submission, scope, opts)
    }

    pub fn comment_stream_all(&self) -> Result<EventSink, StreamError> {
        self.comment_stream(DEFAULT_SCOPE, StreamOptions::default())
    }

    pub fn submission_stream_all(&self) -> Result<EventSink, StreamError> {
        self.submission_stream(DEFAULT_SCOPE, StreamOptions::default())
    }

    pub fn open(
        &self,
        kind: ItemKind,
        scope: &str,
        opts: StreamOptions,
    ) -> Result<EventSink, StreamError> {
        validate_scope(scope)?;
        if self.drift < 0 {
            return Err(StreamError::InvalidDrift { drift: self.drift });
        }
        let rate = resolve_rate(opts.rate)?;
        let pattern = match opts.pattern {
            Some(spec) => spec.compile()?,
            None => Pattern::default(),
        };

        let mut session = StreamSession::new(kind, self.drift, pattern);
        tracing::info!(
            target: "stream",
            %kind,
            scope,
            rate_ms = rate.as_millis() as u64,
            drift = self.drift,
            start_time = session.start_time(),
            "opening stream"
        );

        let label = scope.to_string();
        let sink = scheduler::start_polling(
            PollConfig { rate },
            Arc::clone(&self.fetcher),
            kind,
            scope.to_string(),
            opts.extra,
            move |batch, out| {
                let stats = session.process_batch(batch, |ev| {
                    out.emit(ev);
                });
                tracing::debug!(
                    target: "stream",
                    %kind,
                    scope = %label,
                    fetched = stats.fetched,
                    deduped = stats.deduped,
                    stale = stats.stale,
                    matched = stats.matched,
                    "stream tick"
                );
            },
        );
        Ok(sink)
    }
}
