//! Bounded fan-out for read-only provider queries

use futures_util::stream::{self, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Outcome of one fanned-out task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<T> {
    Finished(T),
    TimedOut,
}

/// Runs tasks with at most `max_in_flight` pending at once, each under its
/// own timeout.
///
/// Results come back in completion order tagged with the input index. On
/// cancellation no further tasks start and tasks still in flight are
/// dropped rather than awaited.
#[derive(Debug, Clone, Copy)]
pub struct FanOut {
    max_in_flight: usize,
    task_timeout: Duration,
}

impl FanOut {
    pub fn new(max_in_flight: usize, task_timeout: Duration) -> Self {
        Self {
            max_in_flight: max_in_flight.max(1),
            task_timeout,
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub fn task_timeout(&self) -> Duration {
        self.task_timeout
    }

    pub async fn run<I, F, Fut, T>(
        &self,
        items: I,
        cancel: &CancellationToken,
        mut task: F,
    ) -> Vec<(usize, TaskOutcome<T>)>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = T>,
    {
        let timeout = self.task_timeout;
        let pending = items.into_iter().enumerate().map(|(index, item)| {
            let fut = task(item);
            async move {
                match tokio::time::timeout(timeout, fut).await {
                    Ok(value) => (index, TaskOutcome::Finished(value)),
                    Err(_) => (index, TaskOutcome::TimedOut),
                }
            }
        });

        let mut results = stream::iter(pending).buffer_unordered(self.max_in_flight);
        let mut collected = Vec::new();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(completed = collected.len(), "fan-out cancelled");
                    break;
                }
                next = results.next() => match next {
                    Some(outcome) => collected.push(outcome),
                    None => break,
                },
            }
        }
        collected
    }
}

impl Default for FanOut {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(10))
    }
}
