use std::{sync::Arc, time::Instant};

/// A trait for time sources that return a monotonic timestamp.
///
/// This abstraction allows you to plug in a real monotonic timer or a mocked
/// time source in tests. Expiry in [`ExpiringMap`] and the interval checks in
/// [`AdmissionGate`] are computed purely from differences between two
/// readings, so the origin is irrelevant as long as it is fixed.
///
/// The unit is expected to be **milliseconds**.
///
/// # Example
///
/// ```
/// use primegate::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource<u64> for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
///
/// [`ExpiringMap`]: crate::ExpiringMap
/// [`AdmissionGate`]: crate::AdmissionGate
pub trait TimeSource<T> {
    /// Returns the current time in milliseconds since the source's origin.
    fn current_millis(&self) -> T;
}

impl<S, T> TimeSource<T> for Arc<S>
where
    S: TimeSource<T> + ?Sized,
{
    fn current_millis(&self) -> T {
        (**self).current_millis()
    }
}

/// A monotonic time source that returns the milliseconds elapsed since the
/// clock was constructed.
///
/// Clones share the same origin, so readings taken from any clone are
/// directly comparable. Wall-clock adjustments (NTP, daylight savings) never
/// move it backward.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Constructs a clock whose origin (t = 0) is the moment of the call.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource<u64> for MonotonicClock {
    fn current_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Manually advanced time source shared between a test and the component
/// under test.
#[cfg(test)]
#[derive(Clone, Debug, Default)]
pub(crate) struct MockTime {
    millis: Arc<portable_atomic::AtomicU64>,
}

#[cfg(test)]
impl MockTime {
    pub(crate) fn advance(&self, millis: u64) {
        self.millis
            .fetch_add(millis, portable_atomic::Ordering::Relaxed);
    }
}

#[cfg(test)]
impl TimeSource<u64> for MockTime {
    fn current_millis(&self) -> u64 {
        self.millis.load(portable_atomic::Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    #[test]
    fn monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let t1 = clock.current_millis();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = clock.current_millis();

        assert!(t2 >= t1 + 4, "expected ~5ms to elapse, got {}", t2 - t1);
    }

    #[test]
    fn clones_share_origin() {
        let clock = MonotonicClock::new();
        std::thread::sleep(Duration::from_millis(3));
        let copy = clock;
        assert!(copy.current_millis() >= 2);
    }
}
