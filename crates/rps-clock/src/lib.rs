//! Fixed-rate simulation clock decoupling logical ticks from the render loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::trace;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Errors emitted when configuring a [`FixedLoop`].
#[derive(Debug, Error, PartialEq)]
pub enum ClockError {
    /// The tick rate cannot produce a usable tick duration.
    #[error("invalid tick rate {0}: must be finite, positive and yield a non-zero tick")]
    InvalidRate(f64),
}

/// Monotonic time reference consumed by the fixed loop.
pub trait TimeSource {
    /// Offset from an arbitrary epoch; must never go backwards.
    fn now(&self) -> Duration;
}

/// Wall-clock time source backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Explicitly advanced time source for tests and deterministic replays.
#[derive(Debug, Default)]
pub struct ManualTime {
    offset_ns: AtomicU64,
}

impl ManualTime {
    /// Create a manual time source at offset zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let delta = u64::try_from(delta.as_nanos()).unwrap_or(u64::MAX);
        let _ = self
            .offset_ns
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(delta))
            });
    }

    /// Jump to an absolute offset. Callers are responsible for monotonicity.
    pub fn set(&self, offset: Duration) {
        let offset = u64::try_from(offset.as_nanos()).unwrap_or(u64::MAX);
        self.offset_ns.store(offset, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.offset_ns.load(Ordering::SeqCst))
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Target invoked once per logical tick by [`FixedLoop::poll_tickable`].
pub trait Tickable {
    fn tick(&mut self);
}

/// Terminal state of the most recent poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Less than one tick of budget remains.
    #[default]
    Idle,
    /// The per-poll cap stopped catch-up with at least one tick still pending.
    Capped,
}

/// Accumulates wall time and spends it in fixed-duration ticks.
#[derive(Debug)]
pub struct FixedLoop<T: TimeSource = MonotonicTime> {
    time: T,
    last_poll: Duration,
    current_poll: Duration,
    accumulated_nanos: i64,
    tick_nanos: i64,
    rate: f64,
    blend: f64,
    state: LoopState,
}

impl FixedLoop<MonotonicTime> {
    /// Create a loop ticking `rate` times per second of wall time.
    pub fn new(rate: f64) -> Result<Self, ClockError> {
        Self::with_time_source(rate, MonotonicTime::new())
    }
}

impl<T: TimeSource> FixedLoop<T> {
    /// Create a loop reading time from `time`.
    pub fn with_time_source(rate: f64, time: T) -> Result<Self, ClockError> {
        let tick_nanos = tick_nanos_for(rate)?;
        let now = time.now();
        Ok(Self {
            time,
            last_poll: now,
            current_poll: now,
            accumulated_nanos: 0,
            tick_nanos,
            rate,
            blend: 0.0,
            state: LoopState::Idle,
        })
    }

    /// Change the tick rate. Pending budget is kept, so the next poll may run
    /// more or fewer ticks than usual.
    pub fn set_rate(&mut self, rate: f64) -> Result<(), ClockError> {
        self.tick_nanos = tick_nanos_for(rate)?;
        self.rate = rate;
        self.refresh_blend();
        Ok(())
    }

    /// Drop any pending catch-up and resynchronise with the time source.
    pub fn reset(&mut self) {
        let now = self.time.now();
        self.last_poll = now;
        self.current_poll = now;
        self.accumulated_nanos = 0;
        self.blend = 0.0;
        self.state = LoopState::Idle;
    }

    /// Fractional progress toward the next tick, in `[0, 1)`.
    #[must_use]
    pub fn blend(&self) -> f64 {
        self.blend
    }

    /// Configured ticks per second.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Duration of one logical tick.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_nanos(self.tick_nanos.unsigned_abs())
    }

    /// Terminal state of the last poll.
    #[must_use]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Borrow the underlying time source.
    #[must_use]
    pub fn time_source(&self) -> &T {
        &self.time
    }

    /// Account for elapsed time and run `on_tick` once per whole tick of
    /// budget, at most `max_ticks` times. Budget beyond the cap is kept for
    /// later polls. Returns the number of ticks run.
    pub fn poll<F: FnMut()>(&mut self, max_ticks: u32, mut on_tick: F) -> u32 {
        self.current_poll = self.time.now();
        let elapsed = self.current_poll.saturating_sub(self.last_poll);
        self.last_poll = self.current_poll;
        let elapsed_nanos = i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX);
        self.accumulated_nanos = self.accumulated_nanos.saturating_add(elapsed_nanos);

        let mut ticks = 0u32;
        while self.accumulated_nanos >= self.tick_nanos && ticks < max_ticks {
            self.accumulated_nanos -= self.tick_nanos;
            on_tick();
            ticks += 1;
        }

        self.state = if self.accumulated_nanos >= self.tick_nanos {
            LoopState::Capped
        } else {
            LoopState::Idle
        };
        self.refresh_blend();

        if self.state == LoopState::Capped {
            trace!(
                ticks,
                max_ticks,
                pending_ticks = self.accumulated_nanos / self.tick_nanos,
                "fixed loop hit per-poll tick cap"
            );
        }
        ticks
    }

    /// [`FixedLoop::poll`] driving a [`Tickable`] target.
    pub fn poll_tickable<K: Tickable + ?Sized>(&mut self, max_ticks: u32, target: &mut K) -> u32 {
        self.poll(max_ticks, || target.tick())
    }

    fn refresh_blend(&mut self) {
        // Capped polls still report a fraction so interpolation never overshoots.
        let partial = self.accumulated_nanos.rem_euclid(self.tick_nanos);
        self.blend = partial as f64 / self.tick_nanos as f64;
    }
}

fn tick_nanos_for(rate: f64) -> Result<i64, ClockError> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(ClockError::InvalidRate(rate));
    }
    let nanos = (NANOS_PER_SECOND / rate).round();
    if !(1.0..=i64::MAX as f64).contains(&nanos) {
        return Err(ClockError::InvalidRate(rate));
    }
    Ok(nanos as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_loop(rate: f64) -> FixedLoop<ManualTime> {
        FixedLoop::with_time_source(rate, ManualTime::new()).expect("valid rate")
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn construction_starts_with_zero_blend() {
        for rate in [0.5, 1.0, 45.0, 60.0, 144.0, 10_000.0] {
            let fixed = manual_loop(rate);
            assert_eq!(fixed.blend(), 0.0);
            assert_eq!(fixed.state(), LoopState::Idle);
        }
    }

    #[test]
    fn rejects_unusable_rates() {
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 3.0e9, 1.0e-12] {
            assert!(
                matches!(
                    FixedLoop::with_time_source(rate, ManualTime::new()),
                    Err(ClockError::InvalidRate(_))
                ),
                "rate {rate} should be rejected"
            );
        }
        let mut fixed = manual_loop(30.0);
        assert!(fixed.set_rate(0.0).is_err());
        assert_eq!(fixed.rate(), 30.0);
    }

    #[test]
    fn tick_duration_is_rounded_reciprocal() {
        assert_eq!(manual_loop(50.0).tick_duration(), Duration::from_millis(20));
        assert_eq!(manual_loop(3.0).tick_duration(), Duration::from_nanos(333_333_333));
        assert_eq!(manual_loop(1.5e9).tick_duration(), Duration::from_nanos(1));
    }

    #[test]
    fn five_and_a_half_ticks_run_five_and_leave_half() {
        let mut fixed = manual_loop(50.0);
        fixed.time_source().advance(Duration::from_millis(110));
        let mut calls = 0;
        let ran = fixed.poll(1000, || calls += 1);
        assert_eq!(ran, 5);
        assert_eq!(calls, 5);
        assert!(approx_eq(fixed.blend(), 0.5), "blend {}", fixed.blend());
        assert_eq!(fixed.state(), LoopState::Idle);
    }

    #[test]
    fn cap_bounds_work_and_keeps_backlog() {
        let mut fixed = manual_loop(100.0);
        fixed.time_source().advance(Duration::from_millis(1_005));
        let mut calls = 0;
        assert_eq!(fixed.poll(8, || calls += 1), 8);
        assert_eq!(calls, 8);
        assert_eq!(fixed.state(), LoopState::Capped);
        assert!(fixed.blend() >= 0.0 && fixed.blend() < 1.0);

        // No new time passes; the backlog drains over later polls.
        let mut total = calls;
        while fixed.state() == LoopState::Capped {
            let ran = fixed.poll(8, || total += 1);
            assert!(ran <= 8);
        }
        assert_eq!(total, 100);
        assert!(approx_eq(fixed.blend(), 0.5));
    }

    #[test]
    fn zero_cap_only_updates_blend() {
        let mut fixed = manual_loop(10.0);
        fixed.time_source().advance(Duration::from_millis(250));
        let mut calls = 0;
        assert_eq!(fixed.poll(0, || calls += 1), 0);
        assert_eq!(calls, 0);
        assert_eq!(fixed.state(), LoopState::Capped);
        assert!(approx_eq(fixed.blend(), 0.5));
    }

    #[test]
    fn cumulative_ticks_match_floor_of_elapsed() {
        let mut fixed = manual_loop(45.0);
        let tick = fixed.tick_duration().as_nanos() as u64;
        let steps_ns = [3_000_000u64, 17_500_000, 250_000, 40_000_000, 9_999_999, 1, 123_456_789];
        let mut total_ns = 0u64;
        let mut calls = 0u64;
        for step in steps_ns {
            fixed.time_source().advance(Duration::from_nanos(step));
            total_ns += step;
            fixed.poll(u32::MAX, || calls += 1);
        }
        assert_eq!(calls, total_ns / tick);
        let expected_blend = (total_ns % tick) as f64 / tick as f64;
        assert!(approx_eq(fixed.blend(), expected_blend));
    }

    #[test]
    fn reset_discards_pending_time() {
        let mut fixed = manual_loop(50.0);
        fixed.time_source().advance(Duration::from_millis(500));
        fixed.poll(2, || {});
        assert_eq!(fixed.state(), LoopState::Capped);

        fixed.reset();
        assert_eq!(fixed.blend(), 0.0);
        assert_eq!(fixed.state(), LoopState::Idle);

        let mut calls = 0;
        fixed.time_source().advance(Duration::from_millis(19));
        fixed.poll(100, || calls += 1);
        assert_eq!(calls, 0);
        fixed.time_source().advance(Duration::from_millis(1));
        fixed.poll(100, || calls += 1);
        assert_eq!(calls, 1);
    }

    #[test]
    fn set_rate_keeps_accumulated_budget() {
        let mut fixed = manual_loop(10.0);
        fixed.time_source().advance(Duration::from_millis(90));
        assert_eq!(fixed.poll(100, || {}), 0);
        assert!(approx_eq(fixed.blend(), 0.9));

        fixed.set_rate(100.0).expect("valid rate");
        let mut calls = 0;
        fixed.poll(100, || calls += 1);
        assert_eq!(calls, 9);
        assert_eq!(fixed.blend(), 0.0);
    }

    #[test]
    fn tickable_targets_are_driven_like_closures() {
        struct Counter(u32);
        impl Tickable for Counter {
            fn tick(&mut self) {
                self.0 += 1;
            }
        }

        let time = std::sync::Arc::new(ManualTime::new());
        let mut fixed =
            FixedLoop::with_time_source(20.0, std::sync::Arc::clone(&time)).expect("valid rate");
        let mut counter = Counter(0);
        time.advance(Duration::from_millis(175));
        assert_eq!(fixed.poll_tickable(10, &mut counter), 3);
        assert_eq!(counter.0, 3);
    }

    #[test]
    fn manual_time_advances_and_sets() {
        let time = ManualTime::new();
        assert_eq!(time.now(), Duration::ZERO);
        time.advance(Duration::from_millis(3));
        assert_eq!(time.now(), Duration::from_millis(3));
        time.set(Duration::from_secs(2));
        assert_eq!(time.now(), Duration::from_secs(2));
    }

    #[test]
    fn monotonic_time_never_goes_backwards() {
        let time = MonotonicTime::new();
        let a = time.now();
        let b = time.now();
        assert!(b >= a);
    }
}
