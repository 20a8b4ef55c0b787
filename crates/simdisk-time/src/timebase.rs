use std::fmt;
use std::time::{Duration, Instant};

pub const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// A point on the simulator's clock, in milliseconds since the device was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct VirtualTime(f64);

impl VirtualTime {
    pub const ZERO: Self = Self(0.0);

    pub fn from_millis(ms: f64) -> Self {
        Self(ms)
    }

    pub fn as_millis(self) -> f64 {
        self.0
    }

    /// Adds `ms` milliseconds.
    pub fn add_millis(self, ms: f64) -> Self {
        Self(self.0 + ms)
    }

    /// Milliseconds from `earlier` to `self`, clamped at zero.
    pub fn millis_since(self, earlier: Self) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }

    pub fn max(self, other: Self) -> Self {
        if other.0 > self.0 {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}ms", self.0)
    }
}

/// Fixed mapping between host instants and [`VirtualTime`].
///
/// `virtual = (now - origin)` in milliseconds. Instants before `origin` map to
/// [`VirtualTime::ZERO`], so the mapping is non-decreasing for any sequence of host readings.
#[derive(Debug, Clone, Copy)]
pub struct TimeBase {
    origin: Instant,
}

impl TimeBase {
    pub fn new(origin: Instant) -> Self {
        Self { origin }
    }

    pub fn to_virtual(&self, now: Instant) -> VirtualTime {
        let elapsed = now.saturating_duration_since(self.origin);
        VirtualTime(elapsed.as_nanos() as f64 / NANOS_PER_MILLI)
    }

    /// Host instant at which the virtual clock reads `time`.
    ///
    /// Fractional nanoseconds round up so the returned instant is never earlier than `time`.
    pub fn to_real(&self, time: VirtualTime) -> Instant {
        self.origin + millis_to_duration_ceil(time.0)
    }

    /// Real delay from `now` until the virtual clock reaches `target`.
    ///
    /// Returns [`Duration::ZERO`] when `target` is already due. Otherwise the delay is derived
    /// from a single nanosecond count rounded up, so any positive delay is at least 1ns.
    pub fn delay_until(&self, target: VirtualTime, now: Instant) -> Duration {
        let delta_ms = target.0 - self.to_virtual(now).0;
        if delta_ms.is_nan() || delta_ms <= 0.0 {
            return Duration::ZERO;
        }
        millis_to_duration_ceil(delta_ms).max(Duration::from_nanos(1))
    }
}

fn millis_to_duration_ceil(ms: f64) -> Duration {
    if ms.is_nan() || ms <= 0.0 {
        return Duration::ZERO;
    }
    let nanos = (ms * NANOS_PER_MILLI).ceil();
    if nanos >= u64::MAX as f64 {
        return Duration::from_nanos(u64::MAX);
    }
    Duration::from_nanos(nanos as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn origin_maps_to_zero() {
        let origin = Instant::now();
        let tb = TimeBase::new(origin);
        assert_eq!(tb.to_virtual(origin), VirtualTime::ZERO);
    }

    #[test]
    fn to_virtual_is_in_milliseconds() {
        let origin = Instant::now();
        let tb = TimeBase::new(origin);
        let t = tb.to_virtual(origin + Duration::from_micros(2_500));
        assert_eq!(t.as_millis(), 2.5);
    }

    #[test]
    fn instants_before_origin_clamp_to_zero() {
        let earlier = Instant::now();
        let tb = TimeBase::new(earlier + Duration::from_millis(10));
        assert_eq!(tb.to_virtual(earlier), VirtualTime::ZERO);
    }

    #[test]
    fn to_real_inverts_to_virtual() {
        let origin = Instant::now();
        let tb = TimeBase::new(origin);
        let real = tb.to_real(VirtualTime::from_millis(12.25));
        assert_eq!(real - origin, Duration::from_micros(12_250));
        assert_eq!(tb.to_virtual(real).as_millis(), 12.25);
    }

    #[test]
    fn delay_until_due_target_is_zero() {
        let origin = Instant::now();
        let tb = TimeBase::new(origin);
        let now = origin + Duration::from_millis(3);
        assert_eq!(tb.delay_until(VirtualTime::from_millis(3.0), now), Duration::ZERO);
        assert_eq!(tb.delay_until(VirtualTime::from_millis(1.0), now), Duration::ZERO);
    }

    #[test]
    fn delay_until_keeps_sub_nanosecond_delays_positive() {
        let origin = Instant::now();
        let tb = TimeBase::new(origin);
        let now = origin + Duration::from_millis(1);
        // 0.4ns after `now`: a truncating conversion would produce a zero-length wait.
        let target = VirtualTime::from_millis(1.0000004);
        assert_eq!(tb.delay_until(target, now), Duration::from_nanos(1));
    }

    #[test]
    fn delay_until_spanning_whole_seconds_is_exact() {
        let origin = Instant::now();
        let tb = TimeBase::new(origin);
        let delay = tb.delay_until(VirtualTime::from_millis(1_999.5), origin);
        assert_eq!(delay, Duration::new(1, 999_500_000));
    }

    proptest! {
        #[test]
        fn to_virtual_is_monotonic(
            mut offsets in prop::collection::vec(0u64..10_000_000_000, 1..64)
        ) {
            let origin = Instant::now();
            let tb = TimeBase::new(origin);
            offsets.sort_unstable();
            let mut last = VirtualTime::ZERO;
            for nanos in offsets {
                let t = tb.to_virtual(origin + Duration::from_nanos(nanos));
                prop_assert!(t >= last, "{t} < {last}");
                last = t;
            }
        }

        #[test]
        fn waiting_out_delay_reaches_target(
            now_ns in 0u64..1_000_000_000,
            ahead_ns in 1u64..1_000_000_000
        ) {
            let origin = Instant::now();
            let tb = TimeBase::new(origin);
            let now = origin + Duration::from_nanos(now_ns);
            let target = VirtualTime::from_millis((now_ns + ahead_ns) as f64 / NANOS_PER_MILLI);
            let delay = tb.delay_until(target, now);
            prop_assert!(delay > Duration::ZERO);
            prop_assert!(tb.to_virtual(now + delay) >= target);
        }
    }
}
