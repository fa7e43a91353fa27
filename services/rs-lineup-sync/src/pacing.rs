//!
//! src/pacing.rs  Andrew Belles  Sept 14th, 2025
//!
//! Spaces out outbound catalog calls so a long lineup stays under the
//! catalog's rate limit
//!

use std::time::{Duration, Instant};

use tokio::time::sleep;

/// How long to hold a task back before it may call out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingPolicy {
    /// Sleep the full interval before every task
    Fixed(Duration),
    /// Sleep only what is left of the interval since the previous task
    MinInterval(Duration),
}

impl PacingPolicy {
    pub fn interval(&self) -> Duration {
        match self {
            PacingPolicy::Fixed(d) | PacingPolicy::MinInterval(d) => *d
        }
    }
}

/// Serialization point for outbound catalog calls. Tasks pass the gate one
/// at a time; the mutex is held across the sleep so two callers can never
/// be released together.
#[derive(Debug)]
pub struct Pacer {
    policy: PacingPolicy,
    state: tokio::sync::Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(policy: PacingPolicy) -> Self {
        Self { policy, state: tokio::sync::Mutex::new(None) }
    }

    pub fn policy(&self) -> PacingPolicy {
        self.policy
    }

    pub async fn wait(&self) {
        let mut last = self.state.lock().await;
        match self.policy {
            PacingPolicy::Fixed(interval) => {
                if !interval.is_zero() {
                    sleep(interval).await;
                }
            }
            PacingPolicy::MinInterval(interval) => {
                if let Some(prev) = *last {
                    let elapsed = prev.elapsed();
                    if elapsed < interval {
                        sleep(interval - elapsed).await;
                    }
                }
            }
        }
        *last = Some(Instant::now());
    }
}
