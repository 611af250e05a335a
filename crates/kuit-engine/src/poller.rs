//! Reconciliation poller.
//!
//! Repeatedly fetches a remote collection and applies a predicate until it
//! yields a key or the deadline elapses. Fetch failures count as "no match
//! yet"; only deadline expiry ends the loop, so callers see found/not found
//! and never an error.

use kuit_common::error::ApiError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PollReport<K> {
    pub found: Option<K>,
    pub attempts: u32,
    /// Fetches that succeeded without a match.
    pub misses: u32,
    /// Fetches that failed and were retried.
    pub fetch_errors: u32,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct Poller {
    deadline: Duration,
    interval: Duration,
}

impl Poller {
    pub fn new(deadline: Duration, interval: Duration) -> Self {
        Self { deadline, interval }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn with_deadline(self, deadline: Duration) -> Self {
        Self { deadline, ..self }
    }

    pub async fn poll<C, K, F, Fut, P>(&self, fetch: F, predicate: P) -> Option<K>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<C, ApiError>>,
        P: FnMut(&C) -> Option<K>,
    {
        self.poll_with_report(fetch, predicate).await.found
    }

    /// Like [`Poller::poll`], also reporting how the time was spent.
    ///
    /// At least one fetch is made even with a zero deadline. The first match
    /// in the collection's own order wins.
    pub async fn poll_with_report<C, K, F, Fut, P>(
        &self,
        mut fetch: F,
        mut predicate: P,
    ) -> PollReport<K>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<C, ApiError>>,
        P: FnMut(&C) -> Option<K>,
    {
        let started = Instant::now();
        let mut report = PollReport {
            found: None,
            attempts: 0,
            misses: 0,
            fetch_errors: 0,
            elapsed: Duration::ZERO,
        };

        loop {
            report.attempts += 1;
            match fetch().await {
                Ok(collection) => {
                    if let Some(key) = predicate(&collection) {
                        report.found = Some(key);
                        break;
                    }
                    report.misses += 1;
                    debug!("Poll attempt {}: no match yet", report.attempts);
                }
                Err(e) => {
                    report.fetch_errors += 1;
                    warn!("Poll attempt {}: fetch failed: {}", report.attempts, e);
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= self.deadline {
                break;
            }
            sleep(self.interval.min(self.deadline - elapsed)).await;
        }

        report.elapsed = started.elapsed();
        if report.found.is_some() {
            debug!(
                "Poll matched after {} attempt(s) in {:?}",
                report.attempts, report.elapsed
            );
        } else {
            info!(
                "Poll gave up after {:?}: {} attempt(s), {} miss(es), {} fetch error(s)",
                report.elapsed, report.attempts, report.misses, report.fetch_errors
            );
        }
        report
    }
}
