//! Bounded retry with a fixed delay
//!
//! Sleeping goes through [`Sleeper`] so tests can count delays instead of
//! waiting on the wall clock.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Something that can wait
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock sleeper backed by tokio's timer
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Result of running an operation under a [`RetryPolicy`]
#[derive(Debug)]
pub enum Attempted<T, E> {
    /// An attempt produced a value
    Done(T),
    /// Every attempt came back empty or failed
    Exhausted { last_error: Option<E> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(150),
        }
    }
}

impl RetryPolicy {
    /// Run `attempt` until it yields `Ok(Some(_))` or attempts run out
    ///
    /// `Ok(None)` means "nothing yet" and is retried like an error. The delay
    /// is only slept between attempts.
    pub async fn run<T, E, F, Fut>(&self, sleeper: &dyn Sleeper, mut attempt: F) -> Attempted<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let mut last_error = None;
        for n in 0..self.max_attempts {
            if n > 0 {
                sleeper.sleep(self.delay).await;
            }
            match attempt(n).await {
                Ok(Some(value)) => return Attempted::Done(value),
                Ok(None) => {}
                Err(e) => last_error = Some(e),
            }
        }
        Attempted::Exhausted { last_error }
    }
}
