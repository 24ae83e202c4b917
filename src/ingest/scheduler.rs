// src/ingest/scheduler.rs
use crate::error::FetchError;
use crate::ingest::types::{FetchOptions, Fetcher, Item, ItemKind, StreamEvent};
use metrics::{counter, gauge, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_RATE: Duration = Duration::from_millis(1000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    pub rate: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { rate: DEFAULT_RATE }
    }
}

/// Sending half handed to the batch hook.
#[derive(Debug, Clone)]
pub struct Emitter {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl Emitter {
    /// Returns false once the sink has been dropped.
    pub fn emit(&self, ev: StreamEvent) -> bool {
        self.tx.send(ev).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Cloneable stop switch for a running poll task.
#[derive(Debug, Clone)]
pub struct PollHandle {
    stop_tx: Arc<watch::Sender<bool>>,
}

impl PollHandle {
    /// No fetch is issued after this returns. A fetch already in flight is
    /// abandoned: its result is dropped and its pipeline does not run.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }
}

/// The live stream returned to callers: receive events, stop polling.
/// Dropping the sink stops the poll task as well.
#[derive(Debug)]
pub struct EventSink {
    rx: mpsc::UnboundedReceiver<StreamEvent>,
    handle: PollHandle,
    task: Option<JoinHandle<()>>,
}

impl EventSink {
    /// Next event, or `None` after the poll task has exited and the queue is drained.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<StreamEvent> {
        self.rx.try_recv().ok()
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    pub fn handle(&self) -> PollHandle {
        self.handle.clone()
    }

    /// Stop polling and wait for the task to exit. Events already queued stay
    /// readable through `recv`.
    pub async fn shutdown(&mut self) {
        self.handle.stop();
        let Some(task) = self.task.take() else {
            return;
        };
        if let Err(e) = task.await {
            if e.is_panic() {
                tracing::error!(target: "stream", error = ?e, "poll task panicked");
            }
        }
    }
}

/// Spawn the interval poller. Every successful tick emits `Batch` with the raw
/// result and then runs `on_batch` on the same task; a failed tick emits
/// `Error` and skips the hook. Ticks never overlap: a slow tick delays the next.
pub fn start_polling<F>(
    cfg: PollConfig,
    fetcher: Arc<dyn Fetcher>,
    kind: ItemKind,
    scope: String,
    opts: FetchOptions,
    mut on_batch: F,
) -> EventSink
where
    F: FnMut(&[Item], &Emitter) + Send + 'static,
{
    crate::ingest::ensure_metrics_described();

    let (tx, rx) = mpsc::unbounded_channel();
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let emitter = Emitter { tx };

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cfg.rate);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *stop_rx.borrow() || emitter.is_closed() {
                break;
            }
            tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                _ = ticker.tick() => {}
            }

            let t0 = Instant::now();
            let res = tokio::select! {
                biased;
                _ = stop_rx.changed() => {
                    tracing::debug!(target: "stream", %kind, %scope, "stop during fetch; abandoning it");
                    break;
                }
                res = kind.fetch(fetcher.as_ref(), &scope, &opts) => res,
            };
            histogram!("stream_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

            match res {
                Ok(batch) => {
                    counter!("stream_ticks_total").increment(1);
                    gauge!("stream_last_tick_ts").set(chrono::Utc::now().timestamp() as f64);
                    tracing::trace!(target: "stream", %kind, %scope, items = batch.len(), "poll tick");

                    emitter.emit(StreamEvent::Batch(batch.clone()));
                    on_batch(&batch, &emitter);
                }
                Err(e) => {
                    tracing::warn!(target: "stream", error = ?e, provider = fetcher.name(), %kind, %scope, "fetch failed");
                    counter!("stream_fetch_errors_total").increment(1);
                    emitter.emit(StreamEvent::Error(FetchError {
                        kind,
                        scope: scope.clone(),
                        source: e,
                    }));
                }
            }
        }
        tracing::info!(target: "stream", %kind, %scope, "poller stopped");
    });

    EventSink {
        rx,
        handle: PollHandle {
            stop_tx: Arc::new(stop_tx),
        },
        task: Some(task),
    }
}
