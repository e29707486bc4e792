//! The adaptive delay engine.
//!
//! All three variants block until a tick deadline computed from the request,
//! re-sampling the raw counter every iteration and picking the cheapest
//! mechanism that cannot overshoot the remaining time. There is no iteration
//! cap: an enormous request loops until its deadline.

use crate::caps::{ticks_for_micros, TimerCaps};

/// OS primitives the delay policies are written against.
///
/// The real implementation lives in [`crate::os`]; tests substitute a fake
/// that advances a virtual counter per action, which makes the band
/// selection deterministic.
pub(crate) trait SleepOps {
    /// Raw monotonic tick sample. Never suspend-adjusted: a suspended
    /// [`crate::Ticker`] must not stretch an in-progress delay.
    fn raw_ticks(&self) -> u64;
    /// Coarse OS sleep: 1 ms nominal, 1-2 ms actual wake latency.
    fn coarse_sleep(&self);
    /// One-shot 500 us high-resolution wait. Returns `false` when the timer
    /// could not be armed or waited on; the caller falls back to spinning
    /// for that iteration.
    fn high_res_wait(&self) -> bool;
    /// Spin/yield hint for the final sub-millisecond sliver.
    fn spin(&self);
}

/// The under-biased variant skips requests at or below this entirely.
pub(crate) const SKIP_SHORT_MICROS: u64 = 4_000;

/// Blocks for at least `micros`, as exactly as possible: coarse sleep while
/// more than 2 ms remain, the 500 us high-resolution wait (if available)
/// down to 1 ms, then spinning. Never returns early; overshoot is bounded
/// by the coarse granularity (~2 ms) without the high-resolution timer and
/// is sub-millisecond with it.
pub(crate) fn sleep_accurate(ops: &impl SleepOps, caps: &TimerCaps, micros: u64) {
    let start = ops.raw_ticks();
    let deadline = start.saturating_add(ticks_for_micros(caps.freq, micros));
    let mut now = start;
    while now < deadline {
        let remaining = deadline - now;
        if remaining > caps.two_ms_ticks {
            ops.coarse_sleep();
        } else if caps.high_res_timer && remaining > caps.one_ms_ticks {
            if !ops.high_res_wait() {
                ops.spin();
            }
        } else {
            ops.spin();
        }
        now = ops.raw_ticks();
    }
}

/// Blocks for at least `micros` without ever spinning, trading accuracy for
/// idle CPU: the final sliver is slept through, so the variant can oversleep
/// by 0.5-1 ms with the high-resolution timer and by 1-2 ms without it.
pub(crate) fn sleep_over_biased(ops: &impl SleepOps, caps: &TimerCaps, micros: u64) {
    let start = ops.raw_ticks();
    let deadline = start.saturating_add(ticks_for_micros(caps.freq, micros));
    let mut now = start;
    while now < deadline {
        if !caps.high_res_timer || deadline - now > caps.two_ms_ticks {
            ops.coarse_sleep();
        } else if !ops.high_res_wait() {
            ops.coarse_sleep();
        }
        now = ops.raw_ticks();
    }
}

/// Returns immediately for requests of [`SKIP_SHORT_MICROS`] or less (zero
/// syscalls), otherwise coarse-sleeps against a deadline shortened by that
/// amount, under-sleeping by roughly 2-3 ms. For callers that prefer "close
/// enough, fast" over "exact, possibly late".
pub(crate) fn sleep_under_biased(ops: &impl SleepOps, caps: &TimerCaps, micros: u64) {
    if micros <= SKIP_SHORT_MICROS {
        return;
    }
    let start = ops.raw_ticks();
    let deadline = start.saturating_add(ticks_for_micros(caps.freq, micros - SKIP_SHORT_MICROS));
    let mut now = start;
    while now < deadline {
        ops.coarse_sleep();
        now = ops.raw_ticks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// 10 MHz, a typical performance-counter rate.
    const FREQ: u64 = 10_000_000;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Action {
        Coarse,
        HighRes,
        Spin,
    }

    /// Virtual-counter ops: each action advances time by a fixed, realistic
    /// tick cost, and the log keeps the remaining-at-decision value so band
    /// selection can be asserted exactly.
    struct FakeOps {
        now: RefCell<u64>,
        log: RefCell<Vec<(Action, u64)>>,
        deadline: RefCell<u64>,
        coarse_ticks: u64,
        high_res_ticks: u64,
        spin_ticks: u64,
        arm_fails: bool,
    }

    impl FakeOps {
        fn new() -> Self {
            Self {
                now: RefCell::new(7), // nonzero start, nothing aligns
                log: RefCell::new(Vec::new()),
                deadline: RefCell::new(0),
                coarse_ticks: 15_000,  // 1.5 ms
                high_res_ticks: 7_000, // 0.7 ms
                spin_ticks: 10,        // 1 us
                arm_fails: false,
            }
        }

        fn record(&self, action: Action) {
            let remaining = self.deadline.borrow().saturating_sub(*self.now.borrow());
            self.log.borrow_mut().push((action, remaining));
        }

        fn run(&self, f: impl Fn(&Self, &TimerCaps, u64), caps: &TimerCaps, micros: u64) -> u64 {
            let start = *self.now.borrow();
            *self.deadline.borrow_mut() = start + ticks_for_micros(caps.freq, micros);
            f(self, caps, micros);
            *self.now.borrow() - start
        }

        fn actions(&self) -> Vec<Action> {
            self.log.borrow().iter().map(|(a, _)| *a).collect()
        }
    }

    impl SleepOps for FakeOps {
        fn raw_ticks(&self) -> u64 {
            *self.now.borrow()
        }

        fn coarse_sleep(&self) {
            self.record(Action::Coarse);
            *self.now.borrow_mut() += self.coarse_ticks;
        }

        fn high_res_wait(&self) -> bool {
            if self.arm_fails {
                return false;
            }
            self.record(Action::HighRes);
            *self.now.borrow_mut() += self.high_res_ticks;
            true
        }

        fn spin(&self) {
            self.record(Action::Spin);
            *self.now.borrow_mut() += self.spin_ticks;
        }
    }

    #[test]
    fn accurate_never_returns_before_the_deadline() {
        let caps = TimerCaps::with_high_res(FREQ, true);
        for micros in [1, 300, 1_500, 5_000, 40_000] {
            let ops = FakeOps::new();
            let elapsed = ops.run(|o, c, u| sleep_accurate(o, c, u), &caps, micros);
            assert!(elapsed >= ticks_for_micros(FREQ, micros), "{micros} us");
        }
    }

    #[test]
    fn accurate_picks_the_mechanism_by_remaining_band() {
        let caps = TimerCaps::with_high_res(FREQ, true);
        let ops = FakeOps::new();
        // 10.5 ms: the coarse phase (1.5 ms per wake) bottoms out at 1.5 ms
        // remaining, inside the high-res band.
        ops.run(|o, c, u| sleep_accurate(o, c, u), &caps, 10_500);
        for (action, remaining) in ops.log.borrow().iter() {
            match action {
                Action::Coarse => assert!(*remaining > caps.two_ms_ticks),
                Action::HighRes => {
                    assert!(*remaining > caps.one_ms_ticks && *remaining <= caps.two_ms_ticks)
                }
                Action::Spin => assert!(*remaining <= caps.one_ms_ticks),
            }
        }
        let actions = ops.actions();
        assert!(actions.contains(&Action::Coarse));
        assert!(actions.contains(&Action::HighRes));
        assert!(actions.contains(&Action::Spin));
    }

    #[test]
    fn accurate_degrades_to_coarse_plus_spin_without_the_high_res_timer() {
        let caps = TimerCaps::with_high_res(FREQ, false);
        let ops = FakeOps::new();
        ops.run(|o, c, u| sleep_accurate(o, c, u), &caps, 10_000);
        let actions = ops.actions();
        assert!(!actions.contains(&Action::HighRes));
        assert!(actions.contains(&Action::Coarse));
        assert!(actions.contains(&Action::Spin));
    }

    #[test]
    fn accurate_spins_through_a_failed_high_res_arm() {
        let caps = TimerCaps::with_high_res(FREQ, true);
        let mut ops = FakeOps::new();
        ops.arm_fails = true;
        let elapsed = ops.run(|o, c, u| sleep_accurate(o, c, u), &caps, 5_000);
        assert!(elapsed >= ticks_for_micros(FREQ, 5_000));
        assert!(!ops.actions().contains(&Action::HighRes));
    }

    #[test]
    fn over_biased_never_spins() {
        for high_res in [true, false] {
            let caps = TimerCaps::with_high_res(FREQ, high_res);
            let ops = FakeOps::new();
            let elapsed = ops.run(|o, c, u| sleep_over_biased(o, c, u), &caps, 10_000);
            assert!(elapsed >= ticks_for_micros(FREQ, 10_000));
            assert!(!ops.actions().contains(&Action::Spin));
        }
    }

    #[test]
    fn over_biased_sleeps_through_the_final_sliver() {
        let caps = TimerCaps::with_high_res(FREQ, true);
        let ops = FakeOps::new();
        // 2.1 ms: one coarse sleep would land in the high-res band, and the
        // sub-millisecond tail must still be slept, not spun.
        ops.run(|o, c, u| sleep_over_biased(o, c, u), &caps, 2_100);
        for (action, remaining) in ops.log.borrow().iter() {
            if *remaining <= caps.two_ms_ticks {
                assert_eq!(*action, Action::HighRes);
            }
        }
    }

    #[test]
    fn over_biased_without_high_res_uses_only_coarse_sleep() {
        let caps = TimerCaps::with_high_res(FREQ, false);
        let ops = FakeOps::new();
        ops.run(|o, c, u| sleep_over_biased(o, c, u), &caps, 6_000);
        assert!(ops.actions().iter().all(|a| *a == Action::Coarse));
    }

    #[test]
    fn under_biased_skips_short_requests_entirely() {
        let caps = TimerCaps::with_high_res(FREQ, true);
        for micros in [0, 1, 2_000, SKIP_SHORT_MICROS] {
            let ops = FakeOps::new();
            let elapsed = ops.run(|o, c, u| sleep_under_biased(o, c, u), &caps, micros);
            assert_eq!(elapsed, 0, "{micros} us");
            assert!(ops.actions().is_empty());
        }
    }

    #[test]
    fn under_biased_stops_short_of_the_nominal_deadline() {
        let caps = TimerCaps::with_high_res(FREQ, true);
        let ops = FakeOps::new();
        let elapsed = ops.run(|o, c, u| sleep_under_biased(o, c, u), &caps, 20_000);
        let shortened = ticks_for_micros(FREQ, 20_000 - SKIP_SHORT_MICROS);
        assert!(elapsed >= shortened);
        // The only overshoot past the shortened deadline is one coarse wake.
        assert!(elapsed < shortened + ops.coarse_ticks);
        assert!(elapsed < ticks_for_micros(FREQ, 20_000));
        assert!(ops.actions().iter().all(|a| *a == Action::Coarse));
    }
}
