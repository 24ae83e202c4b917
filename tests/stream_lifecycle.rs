// tests/stream_lifecycle.rs
mod common;

use common::*;
use reddit_stream::{RedditStream, StreamEvent, StreamOptions};
use std::time::Duration;

fn opts(ms: u64) -> StreamOptions {
    StreamOptions::new().rate(Duration::from_millis(ms))
}

#[tokio::test]
async fn stop_abandons_in_flight_fetch_and_issues_no_more() {
    let f = ScriptedFetcher::slow(
        vec![Step::Ok(vec![comment("a", now() + 10, "x")])],
        Duration::from_millis(200),
    );
    let mut sink = RedditStream::from_arc(f.clone())
        .comment_stream("all", opts(10))
        .unwrap();

    // wait until the first fetch is in flight
    tokio::time::timeout(Duration::from_secs(2), async {
        while f.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    sink.stop();
    assert!(sink.handle().is_stopped());
    sink.shutdown().await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(f.calls(), 1);
    // abandoned: no batch, no pipeline output; channel closes after the task exits
    assert!(sink.recv().await.is_none());
}

#[tokio::test]
async fn stop_between_ticks_keeps_delivered_events_readable() {
    let f = ScriptedFetcher::new(vec![Step::Ok(vec![comment("a", now() + 10, "x")])]);
    let mut sink = RedditStream::from_arc(f.clone())
        .comment_stream("all", opts(50))
        .unwrap();

    let first = tokio::time::timeout(Duration::from_secs(2), sink.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(first, StreamEvent::Batch(_)));

    let handle = sink.handle();
    handle.stop();
    sink.shutdown().await;
    let calls = f.calls();

    let mut rest = Vec::new();
    while let Some(ev) = sink.recv().await {
        rest.push(ev);
    }
    // the first tick's pipeline ran before stop took effect
    assert!(rest
        .iter()
        .any(|ev| matches!(ev, StreamEvent::Comment(m) if m.item.id == "a")));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(f.calls(), calls);
}

#[tokio::test]
async fn dropping_the_sink_stops_polling() {
    let f = ScriptedFetcher::new(vec![]);
    let sink = RedditStream::from_arc(f.clone())
        .comment_stream("all", opts(10))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(sink);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let calls = f.calls();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(f.calls(), calls);
}

#[tokio::test]
async fn slow_fetches_never_overlap() {
    // fetch takes longer than the rate: ticks are delayed, not run concurrently
    let f = ScriptedFetcher::slow(vec![], Duration::from_millis(40));
    let mut sink = RedditStream::from_arc(f.clone())
        .comment_stream("all", opts(5))
        .unwrap();
    let t = ticks(&mut sink, 3).await;
    sink.shutdown().await;

    assert_eq!(t.len(), 3);
    assert_eq!(f.max_in_flight(), 1);
}
