//! Long-running subscriber that turns cover requests into resolutions.
//!
//! Each valid request is resolved on its own task so a slow catalog never
//! delays receipt of the next message. Tasks are tracked in a `JoinSet`:
//! finished ones are reaped while the loop runs (so panics get logged), and
//! the remainder are drained when the worker stops.
//!
//! A subscription stream that ends (broker restart, dropped connection) is
//! replaced by a fresh one after an exponential backoff. Only shutdown stops
//! the worker once it has subscribed.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::task::{JoinError, JoinSet};
use tracing::Instrument;

use crate::channel::{CoverLookupRequest, CoverSubscriber, PayloadStream};
use crate::cover::{CoverOutcome, CoverResolver};

pub const RESUBSCRIBE_INITIAL: Duration = Duration::from_millis(500);
pub const RESUBSCRIBE_MAX: Duration = Duration::from_secs(30);

/// Counters for one worker run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub received: u64,
    pub malformed: u64,
    pub resolved: u64,
    pub not_found: u64,
    pub failed: u64,
    pub panicked: u64,
    pub resubscribed: u64,
}

pub struct CoverWorker {
    subscriber: Arc<dyn CoverSubscriber>,
    resolver: Arc<CoverResolver>,
    backoff: (Duration, Duration),
}

impl CoverWorker {
    pub fn new(subscriber: Arc<dyn CoverSubscriber>, resolver: Arc<CoverResolver>) -> Self {
        Self {
            subscriber,
            resolver,
            backoff: (RESUBSCRIBE_INITIAL, RESUBSCRIBE_MAX),
        }
    }

    /// Delay before the first resubscribe attempt, doubling per failure up to `max`.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.backoff = (initial, max.max(initial));
        self
    }

    /// Spawn [`CoverWorker::run`] onto the current runtime.
    pub fn spawn<F>(self, shutdown: F) -> tokio::task::JoinHandle<WorkerStats>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(self.run(shutdown))
    }

    /// Listen until `shutdown` completes, then wait for in-flight resolutions.
    ///
    /// A failed initial subscription is logged and ends the run; it never propagates to the host process.
    pub async fn run<F>(self, shutdown: F) -> WorkerStats
    where
        F: Future<Output = ()> + Send,
    {
        let mut stats = WorkerStats::default();
        let mut stream = match self.subscriber.subscribe().await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "failed to subscribe to cover channel");
                return stats;
            }
        };

        let mut tasks: JoinSet<CoverOutcome> = JoinSet::new();
        tokio::pin!(shutdown);
        'listen: loop {
            loop {
                tokio::select! {
                    _ = shutdown.as_mut() => {
                        tracing::info!(in_flight = tasks.len(), "cover worker shutting down");
                        break 'listen;
                    }
                    Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                        record(&mut stats, joined);
                    }
                    message = stream.next() => match message {
                        Some(payload) => self.dispatch(&payload, &mut tasks, &mut stats),
                        None => {
                            tracing::warn!("cover channel closed, resubscribing");
                            break;
                        }
                    },
                }
            }
            match self.resubscribe(&mut shutdown, &mut tasks, &mut stats).await {
                Some(fresh) => stream = fresh,
                None => {
                    tracing::info!(in_flight = tasks.len(), "cover worker shutting down");
                    break;
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            record(&mut stats, joined);
        }
        tracing::info!(?stats, "cover worker stopped");
        stats
    }

    /// Retry `subscribe` with backoff, still reaping tasks. `None` means shutdown fired first.
    async fn resubscribe<F>(
        &self,
        shutdown: &mut Pin<&mut F>,
        tasks: &mut JoinSet<CoverOutcome>,
        stats: &mut WorkerStats,
    ) -> Option<PayloadStream>
    where
        F: Future<Output = ()>,
    {
        let (mut delay, max) = self.backoff;
        loop {
            let pause = tokio::time::sleep(delay);
            tokio::pin!(pause);
            loop {
                tokio::select! {
                    _ = shutdown.as_mut() => return None,
                    Some(joined) = tasks.join_next(), if !tasks.is_empty() => record(stats, joined),
                    _ = &mut pause => break,
                }
            }
            let attempt = tokio::select! {
                _ = shutdown.as_mut() => return None,
                attempt = self.subscriber.subscribe() => attempt,
            };
            match attempt {
                Ok(stream) => {
                    stats.resubscribed += 1;
                    tracing::info!("resubscribed to cover channel");
                    return Some(stream);
                }
                Err(e) => {
                    delay = (delay * 2).min(max);
                    tracing::warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "resubscribe failed");
                }
            }
        }
    }

    fn dispatch(&self, payload: &str, tasks: &mut JoinSet<CoverOutcome>, stats: &mut WorkerStats) {
        stats.received += 1;
        let request = match CoverLookupRequest::from_payload(payload) {
            Ok(request) => request,
            Err(e) => {
                stats.malformed += 1;
                tracing::error!(error = %e, payload, "error processing message");
                return;
            }
        };
        let resolver = Arc::clone(&self.resolver);
        let span = tracing::info_span!("cover", book_id = %request.id);
        tasks.spawn(async move { resolver.resolve(&request).await }.instrument(span));
    }
}

fn record(stats: &mut WorkerStats, joined: Result<CoverOutcome, JoinError>) {
    match joined {
        Ok(CoverOutcome::Direct(_)) | Ok(CoverOutcome::ByIsbn(_)) => stats.resolved += 1,
        Ok(CoverOutcome::NotFound) => stats.not_found += 1,
        Ok(CoverOutcome::Failed) => stats.failed += 1,
        Err(e) => {
            stats.panicked += 1;
            tracing::error!(error = %e, "cover resolution task aborted");
        }
    }
}
