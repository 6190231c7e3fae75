// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Execution Retrier
//!
//! Runs any fallible operation with a bounded number of attempts and a
//! quadratic backoff between them: after failed attempt `n` the retrier waits
//! `n² × unit` before trying again, and never waits after the last attempt.
//!
//! The retrier knows nothing about what it runs. The wait goes through the
//! [`Sleeper`] trait so tests can observe backoffs without sleeping.

use crate::domain::errors::{BackupError, Result};
use log::warn;
use std::sync::Arc;
use std::time::Duration;

/// Blocks the calling thread.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// The real thing: `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// One "time unit" of the quadratic schedule.
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt.saturating_mul(attempt)
    }
}

/// Bounded retry wrapper shared by every restore-side external call.
#[derive(Clone)]
pub struct Retrier {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl Retrier {
    pub fn new(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { policy, sleeper }
    }

    /// Runs `op` until it succeeds or the attempts run out.
    ///
    /// On exhaustion the error names `operation` and the attempt count and
    /// carries the last underlying failure.
    pub fn run<T, F>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts => {
                    let backoff = self.policy.backoff(attempt);
                    warn!(
                        "Attempt {}/{} for {} failed: {}. Retrying in {:?}...",
                        attempt, max_attempts, operation, e, backoff
                    );
                    self.sleeper.sleep(backoff);
                    attempt += 1;
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{} for {} failed: {}. Giving up.",
                        attempt, max_attempts, operation, e
                    );
                    return Err(BackupError::RetryExhausted {
                        operation: operation.to_string(),
                        attempts: max_attempts,
                        source: Box::new(e),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSleeper;
    use std::cell::Cell;

    fn transient(n: u32) -> BackupError {
        BackupError::ProcessError {
            program: "pg_restore".into(),
            status: "exit status: 1".into(),
            output: format!("connection reset #{}", n),
        }
    }

    /// Fails `failures` times, then succeeds; returns (result, calls, sleeps).
    fn run_with_failures(failures: u32) -> (Result<&'static str>, u32, Vec<Duration>) {
        let sleeper = Arc::new(RecordingSleeper::default());
        let retrier = Retrier::new(RetryPolicy::default(), sleeper.clone());
        let calls = Cell::new(0u32);

        let result = retrier.run("restore tenant_data.dump", || {
            calls.set(calls.get() + 1);
            if calls.get() <= failures {
                Err(transient(calls.get()))
            } else {
                Ok("done")
            }
        });
        let sleeps = sleeper.sleeps.lock().unwrap().clone();
        (result, calls.get(), sleeps)
    }

    #[test]
    fn test_first_attempt_success_does_not_sleep() {
        let (result, calls, sleeps) = run_with_failures(0);
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls, 1);
        assert!(sleeps.is_empty());
    }

    #[test]
    fn test_recovers_after_transient_failures() {
        let (result, calls, sleeps) = run_with_failures(2);
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls, 3);
        assert_eq!(sleeps, vec![Duration::from_secs(1), Duration::from_secs(4)]);
    }

    #[test]
    fn test_exhaustion_is_capped_at_three_calls() {
        let (result, calls, sleeps) = run_with_failures(10);
        assert_eq!(calls, 3);
        // 1² and 2² units, nothing after the final attempt.
        assert_eq!(sleeps, vec![Duration::from_secs(1), Duration::from_secs(4)]);

        match result {
            Err(BackupError::RetryExhausted {
                operation,
                attempts,
                source,
            }) => {
                assert_eq!(operation, "restore tenant_data.dump");
                assert_eq!(attempts, 3);
                assert!(source.to_string().contains("connection reset #3"));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_unit_and_attempts() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let policy = RetryPolicy {
            max_attempts: 4,
            backoff_unit: Duration::from_millis(10),
        };
        let retrier = Retrier::new(policy, sleeper.clone());
        let result: Result<()> = retrier.run("probe", || Err(transient(0)));
        assert!(result.is_err());
        assert_eq!(
            *sleeper.sleeps.lock().unwrap(),
            vec![
                Duration::from_millis(10),
                Duration::from_millis(40),
                Duration::from_millis(90)
            ]
        );
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let policy = RetryPolicy {
            max_attempts: 0,
            backoff_unit: Duration::from_secs(1),
        };
        let calls = Cell::new(0);
        let result: Result<()> = Retrier::new(policy, sleeper).run("once", || {
            calls.set(calls.get() + 1);
            Err(transient(1))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
