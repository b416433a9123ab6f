//! Wait - Poll an object until it reaches a target status
//!
//! `StateChangeConf` drives a refresh function that reports the current
//! object and its status. Asynchronous cloud operations (creation,
//! start/stop, deletion) are awaited this way.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum WaitError<E> {
    #[error("timeout after {timeout:?} waiting for status {expected:?} (last status: {last_state})")]
    Timeout {
        last_state: String,
        expected: Vec<String>,
        timeout: Duration,
    },

    #[error("unexpected status '{state}', wanted one of {expected:?}")]
    UnexpectedState { state: String, expected: Vec<String> },

    #[error("object not found after {checks} checks")]
    NotFound { checks: u32 },

    #[error("{0}")]
    Refresh(E),
}

#[derive(Debug, Clone)]
pub struct StateChangeConf {
    /// Empty pending accepts any non-target status while waiting
    pub pending: Vec<String>,
    /// Empty target means "wait until the object is gone"
    pub target: Vec<String>,
    pub timeout: Duration,
    /// Wait before the first refresh
    pub delay: Duration,
    pub poll_interval: Duration,
    /// Consecutive not-found results tolerated while a target is expected.
    /// With an empty target, the number of consecutive not-found results
    /// needed before the object counts as gone.
    pub not_found_checks: u32,
}

impl StateChangeConf {
    pub fn new(pending: &[&str], target: &[&str], timeout: Duration) -> Self {
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            timeout,
            delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(3),
            not_found_checks: 20,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    /// Poll `refresh` until the status is in `target`.
    ///
    /// `refresh` yields `Some((object, status))`, or `None` when the object
    /// does not exist. With an empty target, `Ok(None)` means it was not
    /// found `not_found_checks` times in a row.
    pub async fn wait_for_state<T, E, F, Fut>(&self, mut refresh: F) -> Result<Option<T>, WaitError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<(T, String)>, E>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut last_state = String::new();
        let mut not_found = 0u32;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay.min(self.timeout)).await;
        }

        loop {
            match refresh().await.map_err(WaitError::Refresh)? {
                None => {
                    not_found += 1;
                    if self.target.is_empty() {
                        if not_found >= self.not_found_checks.max(1) {
                            return Ok(None);
                        }
                        log::debug!("object not found ({}/{})", not_found, self.not_found_checks);
                    } else if not_found > self.not_found_checks {
                        return Err(WaitError::NotFound { checks: not_found });
                    }
                }
                Some((object, status)) => {
                    not_found = 0;
                    if self.target.iter().any(|t| *t == status) {
                        return Ok(Some(object));
                    }
                    if !self.pending.is_empty() && !self.pending.iter().any(|p| *p == status) {
                        return Err(WaitError::UnexpectedState {
                            state: status,
                            expected: self.target.clone(),
                        });
                    }
                    log::debug!("waiting for {:?}, current status '{}'", self.target, status);
                    last_state = status;
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(WaitError::Timeout {
                    last_state,
                    expected: self.target.clone(),
                    timeout: self.timeout,
                });
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}
