// tests/common/mod.rs
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use reddit_stream::{EventSink, FetchOptions, Fetcher, Item, ItemKind, StreamEvent};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub enum Step {
    Ok(Vec<Item>),
    Fail(&'static str),
}

/// Plays back a script of batches; after the script runs out the last
/// successful batch is returned again (the source keeps listing it).
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Step>>,
    last: Mutex<Vec<Item>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    seen: Mutex<Vec<(ItemKind, String, FetchOptions)>>,
    delay: Option<Duration>,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        })
    }

    pub fn slow(script: Vec<Step>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            delay: Some(delay),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of fetches observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<(ItemKind, String, FetchOptions)> {
        self.seen.lock().clone()
    }

    async fn next(&self, kind: ItemKind, scope: &str, opts: &FetchOptions) -> Result<Vec<Item>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push((kind, scope.to_string(), opts.clone()));
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let step = self.script.lock().pop_front();
        match step {
            Some(Step::Ok(batch)) => {
                *self.last.lock() = batch.clone();
                Ok(batch)
            }
            Some(Step::Fail(msg)) => Err(anyhow!(msg)),
            None => Ok(self.last.lock().clone()),
        }
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch_new_comments(&self, scope: &str, opts: &FetchOptions) -> Result<Vec<Item>> {
        self.next(ItemKind::Comment, scope, opts).await
    }

    async fn fetch_new_submissions(&self, scope: &str, opts: &FetchOptions) -> Result<Vec<Item>> {
        self.next(ItemKind::Submission, scope, opts).await
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn comment(id: &str, created_utc: i64, body: &str) -> Item {
    Item {
        id: id.into(),
        created_utc,
        body: Some(body.into()),
        ..Default::default()
    }
}

pub fn submission(id: &str, created_utc: i64, selftext: &str) -> Item {
    Item {
        id: id.into(),
        created_utc,
        title: Some(format!("title {id}")),
        selftext: Some(selftext.into()),
        ..Default::default()
    }
}

fn starts_tick(ev: &StreamEvent) -> bool {
    matches!(ev, StreamEvent::Batch(_) | StreamEvent::Error(_))
}

/// Events of the first `n` ticks, one Vec per tick. Waits for tick `n + 1`
/// to begin so the last tick is known to be complete.
pub async fn ticks(sink: &mut EventSink, n: usize) -> Vec<Vec<StreamEvent>> {
    let mut out: Vec<Vec<StreamEvent>> = Vec::new();
    loop {
        let ev = tokio::time::timeout(Duration::from_secs(5), sink.recv())
            .await
            .expect("timed out waiting for stream events")
            .expect("stream closed early");
        if starts_tick(&ev) {
            if out.len() == n {
                return out;
            }
            out.push(Vec::new());
        }
        out.last_mut()
            .expect("first event starts a tick")
            .push(ev);
    }
}

pub fn match_ids(tick: &[StreamEvent]) -> Vec<String> {
    tick.iter()
        .filter_map(StreamEvent::as_match)
        .map(|m| m.item.id.clone())
        .collect()
}

pub fn new_item_ids(tick: &[StreamEvent]) -> Vec<String> {
    tick.iter()
        .find_map(|ev| match ev {
            StreamEvent::NewItems(items) => Some(items.iter().map(|i| i.id.clone()).collect()),
            _ => None,
        })
        .unwrap_or_default()
}
