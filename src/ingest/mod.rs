// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod scheduler;
pub mod types;

use crate::error::StreamError;
use crate::ingest::types::{Item, ItemKind, MatchResult, Matched, StreamEvent};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashSet;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("stream_ticks_total", "Poll ticks whose fetch succeeded.");
        describe_counter!("stream_fetch_errors_total", "Poll ticks whose fetch failed.");
        describe_counter!(
            "stream_provider_errors_total",
            "Reddit HTTP fetches that failed after retries."
        );
        describe_counter!(
            "stream_items_fetched_total",
            "Items returned by the fetcher, before dedup."
        );
        describe_counter!(
            "stream_dedup_total",
            "Items dropped because the previous batch already had them."
        );
        describe_counter!(
            "stream_stale_total",
            "Items dropped because they predate stream start minus drift."
        );
        describe_counter!("stream_matches_total", "Items that matched the pattern.");
        describe_histogram!("stream_fetch_ms", "Fetch round trip in milliseconds.");
        describe_gauge!("stream_last_tick_ts", "Unix ts of the last successful tick.");
    });
}

/// Keep an item iff it was created no earlier than `start_time - drift`.
pub fn is_recent(item: &Item, start_time: i64, drift: i64) -> bool {
    item.created_utc >= start_time.saturating_sub(drift)
}

/// Regex applied to the kind-specific text field. `Pattern::default()` matches everything.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(src: &str) -> Result<Self, StreamError> {
        Regex::new(src)
            .map(Pattern)
            .map_err(|source| StreamError::InvalidPattern {
                pattern: src.to_string(),
                source,
            })
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// A missing text field never matches, not even the match-all default.
    pub fn match_text(&self, text: Option<&str>) -> Option<MatchResult> {
        let text = text?;
        let caps = self.0.captures(text)?;
        let whole = caps.get(0)?;
        Some(MatchResult {
            matched: whole.as_str().to_string(),
            start: whole.start(),
            end: whole.end(),
            groups: caps
                .iter()
                .skip(1)
                .map(|g| g.map(|m| m.as_str().to_string()))
                .collect(),
        })
    }
}

impl Default for Pattern {
    fn default() -> Self {
        // empty regex matches at offset 0 of any input
        Pattern(Regex::new("").expect("empty regex compiles"))
    }
}

impl From<Regex> for Pattern {
    fn from(re: Regex) -> Self {
        Pattern(re)
    }
}

pub fn match_item(kind: ItemKind, item: &Item, pattern: &Pattern) -> Option<MatchResult> {
    pattern.match_text(kind.text_of(item))
}

/// Per-stream state: fixed start time, drift allowance and the previous raw batch.
#[derive(Debug)]
pub struct StreamSession {
    kind: ItemKind,
    start_time: i64,
    drift: i64,
    pattern: Pattern,
    previous: HashSet<String>,
}

/// Counts for one processed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub fetched: usize,
    pub deduped: usize,
    pub stale: usize,
    pub matched: usize,
}

impl StreamSession {
    /// New session starting now (wall clock).
    pub fn new(kind: ItemKind, drift: i64, pattern: Pattern) -> Self {
        Self::with_start_time(kind, chrono::Utc::now().timestamp(), drift, pattern)
    }

    pub fn with_start_time(kind: ItemKind, start_time: i64, drift: i64, pattern: Pattern) -> Self {
        Self {
            kind,
            start_time,
            drift,
            pattern,
            previous: HashSet::new(),
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub fn drift(&self) -> i64 {
        self.drift
    }

    /// Drop items whose id was in the previous batch, then remember the whole
    /// new batch (not the diff) for the next call.
    pub fn dedupe(&mut self, batch: &[Item]) -> Vec<Item> {
        let diff = batch
            .iter()
            .filter(|it| !self.previous.contains(&it.id))
            .cloned()
            .collect();
        self.previous = batch.iter().map(|it| it.id.clone()).collect();
        diff
    }

    /// Run dedup, recency and pattern matching over one raw batch and hand the
    /// resulting events to `emit` in order: `NewItems` first, then one
    /// kind-named event per match.
    pub fn process_batch<F>(&mut self, batch: &[Item], mut emit: F) -> TickStats
    where
        F: FnMut(StreamEvent),
    {
        let fresh = self.dedupe(batch);
        let deduped = batch.len() - fresh.len();

        let recent: Vec<Item> = fresh
            .into_iter()
            .filter(|it| is_recent(it, self.start_time, self.drift))
            .collect();
        let stale = batch.len() - deduped - recent.len();

        let matches: Vec<Matched> = recent
            .iter()
            .filter_map(|it| {
                match_item(self.kind, it, &self.pattern).map(|matched| Matched {
                    item: it.clone(),
                    matched,
                })
            })
            .collect();
        let matched = matches.len();

        emit(StreamEvent::NewItems(recent));
        for m in matches {
            emit(StreamEvent::matched(self.kind, m));
        }

        counter!("stream_items_fetched_total").increment(batch.len() as u64);
        counter!("stream_dedup_total").increment(deduped as u64);
        counter!("stream_stale_total").increment(stale as u64);
        counter!("stream_matches_total").increment(matched as u64);

        TickStats {
            fetched: batch.len(),
            deduped,
            stale,
            matched,
        }
    }
}
