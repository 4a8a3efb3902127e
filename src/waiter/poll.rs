use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};

use super::status::Observation;

/// Anything that can report the current status of one remote job.
#[allow(async_fn_in_trait)]
pub trait StatusSource {
    type Record: Observation;
    type Error;

    /// Query the remote side once.
    async fn fetch(&mut self) -> Result<Self::Record, Self::Error>;
}

/// Fixed-interval polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Pause between two consecutive polls.
    pub interval: Duration,
    /// Total number of polls allowed, the first one included.
    pub max_attempts: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            max_attempts: 240,
        }
    }
}

impl WaitPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Upper bound on the time spent sleeping before a timeout is reported.
    pub fn budget(&self) -> Duration {
        self.interval
            .saturating_mul(self.max_attempts.saturating_sub(1))
    }
}

/// A terminal record together with how long it took to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct Waited<R> {
    pub record: R,
    pub attempts: u32,
    pub elapsed: Duration,
}

#[derive(Debug, Error)]
pub enum WaitError<E> {
    /// The budget ran out while the job was still moving.
    #[error(
        "still {} after {attempts} polls",
        last_status.as_deref().unwrap_or("unobserved")
    )]
    Timeout {
        attempts: u32,
        last_status: Option<String>,
    },
    /// The status query itself failed.
    #[error("status query failed: {0}")]
    Source(#[source] E),
}

/// Polls a [`StatusSource`] until it reports a terminal record.
///
/// The first poll happens immediately. Between polls the waiter sleeps for
/// `policy.interval`; it never sleeps after the last allowed poll. Errors from
/// the source end the wait on the spot.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsyncJobWaiter {
    pub policy: WaitPolicy,
}

impl AsyncJobWaiter {
    pub fn new(policy: WaitPolicy) -> Self {
        Self { policy }
    }

    pub async fn wait<S: StatusSource>(
        &self,
        source: &mut S,
    ) -> Result<Waited<S::Record>, WaitError<S::Error>> {
        self.wait_observed(source, |_, _| {}).await
    }

    /// Same as [`wait`](Self::wait), calling `on_poll(attempt, record)` after every poll.
    pub async fn wait_observed<S, F>(
        &self,
        source: &mut S,
        mut on_poll: F,
    ) -> Result<Waited<S::Record>, WaitError<S::Error>>
    where
        S: StatusSource,
        F: FnMut(u32, &S::Record),
    {
        let started = Instant::now();
        let max = self.policy.max_attempts;
        let mut last_status = None;

        for attempt in 1..=max {
            let record = source.fetch().await.map_err(WaitError::Source)?;
            on_poll(attempt, &record);

            if record.is_terminal() {
                tracing::debug!(attempt, status = %record.status_label(), "terminal status observed");
                return Ok(Waited {
                    record,
                    attempts: attempt,
                    elapsed: started.elapsed(),
                });
            }

            let label = record.status_label();
            tracing::trace!(attempt, max, status = %label, "not terminal yet");
            last_status = Some(label);

            if attempt < max {
                sleep(self.policy.interval).await;
            }
        }

        tracing::warn!(attempts = max, status = ?last_status, "gave up waiting");
        Err(WaitError::Timeout {
            attempts: max,
            last_status,
        })
    }
}
