//! Poll-with-timeout.
//!
//! [`poll_until`] repeatedly runs a probe until it yields a value or the
//! configured `max_wait` elapses. It never retries a failing probe: a probe
//! error ends the poll immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

/// How often to probe and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between two probes
    pub interval: Duration,
    /// Total time budget, measured from the first probe
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(30 * 60),
        }
    }
}

impl PollConfig {
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }
}

/// Result of [`poll_until`].
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    /// The probe produced a value.
    Satisfied(T),
    /// `max_wait` elapsed first.
    TimedOut { elapsed: Duration, attempts: u32 },
}

impl<T> PollOutcome<T> {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, PollOutcome::Satisfied(_))
    }

    pub fn satisfied(self) -> Option<T> {
        match self {
            PollOutcome::Satisfied(v) => Some(v),
            PollOutcome::TimedOut { .. } => None,
        }
    }
}

/// Run `probe` every `config.interval` until it returns `Ok(Some(_))`.
///
/// The probe always runs at least once, and once more at the deadline, so a
/// zero `max_wait` degenerates to a single check.
///
/// # Arguments
/// * `config` - Interval and time budget
/// * `label` - What is being waited for, for logging
/// * `probe` - `Ok(Some(v))` when satisfied, `Ok(None)` to keep waiting
pub async fn poll_until<F, Fut, T, E>(
    config: &PollConfig,
    label: &str,
    mut probe: F,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        if let Some(value) = probe().await? {
            debug!(
                waiting_for = %label,
                attempts = attempts,
                elapsed_ms = start.elapsed().as_millis(),
                "condition satisfied"
            );
            return Ok(PollOutcome::Satisfied(value));
        }

        let elapsed = start.elapsed();
        if elapsed >= config.max_wait {
            warn!(
                waiting_for = %label,
                attempts = attempts,
                elapsed_ms = elapsed.as_millis(),
                "gave up waiting"
            );
            return Ok(PollOutcome::TimedOut { elapsed, attempts });
        }

        let remaining = config.max_wait - elapsed;
        tokio::time::sleep(config.interval.min(remaining)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> PollConfig {
        PollConfig::new(Duration::from_millis(5), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn satisfied_on_first_probe() {
        let outcome = poll_until(&fast(), "ready", || async { Ok::<_, ()>(Some(7)) })
            .await
            .unwrap();
        assert_eq!(outcome, PollOutcome::Satisfied(7));
    }

    #[tokio::test]
    async fn keeps_probing_until_satisfied() {
        let calls = AtomicU32::new(0);
        let outcome = poll_until(&fast(), "third time", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok::<_, ()>((n == 3).then_some(n)) }
        })
        .await
        .unwrap();
        assert_eq!(outcome, PollOutcome::Satisfied(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_budget_probes_exactly_once() {
        let calls = AtomicU32::new(0);
        let config = PollConfig::new(Duration::from_millis(5), Duration::ZERO);
        let outcome = poll_until(&config, "never", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<Option<()>, ()>(None) }
        })
        .await
        .unwrap();
        assert!(matches!(outcome, PollOutcome::TimedOut { attempts: 1, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn times_out_after_max_wait() {
        let config = PollConfig::new(Duration::from_millis(10), Duration::from_millis(50));
        let outcome = poll_until(&config, "never", || async { Ok::<Option<()>, ()>(None) })
            .await
            .unwrap();
        let PollOutcome::TimedOut { elapsed, attempts } = outcome else {
            panic!("expected timeout")
        };
        assert!(elapsed >= Duration::from_millis(50));
        assert!(attempts >= 2);
        assert!(!PollOutcome::<()>::TimedOut { elapsed, attempts }.is_satisfied());
    }

    #[tokio::test]
    async fn probe_error_stops_polling() {
        let calls = AtomicU32::new(0);
        let result = poll_until(&fast(), "failing", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<Option<()>, _>("status unavailable") }
        })
        .await;
        assert_eq!(result.unwrap_err(), "status unavailable");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn satisfied_accessor() {
        assert_eq!(PollOutcome::Satisfied(1).satisfied(), Some(1));
        let timed_out: PollOutcome<i32> = PollOutcome::TimedOut {
            elapsed: Duration::ZERO,
            attempts: 1,
        };
        assert_eq!(timed_out.satisfied(), None);
    }
}
