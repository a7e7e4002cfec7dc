//! Randomized timers.
//!
//! Spreading check-ins over a window keeps a fleet of clients from hitting
//! the server in lockstep. All timers draw from one process-wide generator,
//! seeded once from the clock mixed with OS entropy.

use std::sync::OnceLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Sleep;

static SCHEDULER_RNG: OnceLock<Mutex<StdRng>> = OnceLock::new();

fn scheduler_rng() -> &'static Mutex<StdRng> {
    SCHEDULER_RNG.get_or_init(|| {
        let clock = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Mutex::new(StdRng::seed_from_u64(clock ^ rand::random::<u64>()))
    })
}

/// Seed the scheduler's generator. Every other function here does this on
/// first use; calling it at startup just makes the point explicit.
pub fn init_scheduler() {
    scheduler_rng();
}

/// `base` shifted by a uniform offset in `[-fuzz/2, fuzz/2]`, never below
/// zero. A zero `fuzz` returns `base` unchanged.
pub fn fuzzy_duration(base: Duration, fuzz: Duration) -> Duration {
    if fuzz.is_zero() {
        return base;
    }
    let fuzz_nanos = u64::try_from(fuzz.as_nanos()).unwrap_or(u64::MAX);
    let offset = scheduler_rng().lock().gen_range(0..=fuzz_nanos);
    base.saturating_add(Duration::from_nanos(offset))
        .saturating_sub(fuzz / 2)
}

/// A timer that fires after `fuzzy_duration(base, fuzz)`.
pub fn fuzzy_after(base: Duration, fuzz: Duration) -> Sleep {
    tokio::time::sleep(fuzzy_duration(base, fuzz))
}

/// Suspend the current task for `fuzzy_duration(base, fuzz)`.
pub async fn fuzzy_sleep(base: Duration, fuzz: Duration) {
    fuzzy_after(base, fuzz).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fuzzy_duration_range() {
        init_scheduler();
        let d = Duration::from_secs(60);
        for _ in 0..1000 {
            let f = fuzzy_duration(d, d);
            assert!(f >= d / 2, "{f:?} < {:?}", d / 2);
            assert!(f <= d + d / 2, "{f:?} > {:?}", d + d / 2);
        }
    }

    #[test]
    fn test_zero_fuzz_is_exact() {
        let d = Duration::from_millis(1234);
        assert_eq!(fuzzy_duration(d, Duration::ZERO), d);
    }

    #[test]
    fn test_clamped_at_zero() {
        for _ in 0..100 {
            let f = fuzzy_duration(Duration::ZERO, Duration::from_secs(10));
            assert!(f <= Duration::from_secs(5));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fuzzy_sleep_elapses() {
        let start = tokio::time::Instant::now();
        fuzzy_sleep(Duration::from_secs(10), Duration::from_secs(2)).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(9));
        assert!(elapsed <= Duration::from_secs(12));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn prop_fuzzy_duration_bounds(base_ms in 0u64..1_000_000, fuzz_ms in 0u64..1_000_000) {
            let base = Duration::from_millis(base_ms);
            let fuzz = Duration::from_millis(fuzz_ms);
            let f = fuzzy_duration(base, fuzz);
            prop_assert!(f >= base.saturating_sub(fuzz / 2));
            prop_assert!(f <= base + fuzz - fuzz / 2);
        }
    }
}
