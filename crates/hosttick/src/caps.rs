/// Delay-engine capabilities, fixed at [`crate::Ticker`] construction.
///
/// The 1 ms / 2 ms thresholds are the band edges of the adaptive loop:
/// above 2 ms of remaining time a coarse OS sleep is safe, between 1 ms and
/// 2 ms the 500 us high-resolution wait is, and below that only spinning
/// avoids an overshoot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimerCaps {
    pub freq: u64,
    pub one_ms_ticks: u64,
    pub two_ms_ticks: u64,
    /// Whether the OS exposes a sub-millisecond one-shot waitable timer.
    pub high_res_timer: bool,
}

impl TimerCaps {
    pub(crate) fn detect(freq: u64) -> Self {
        Self::with_high_res(freq, crate::os::high_res_timer_available())
    }

    pub(crate) fn with_high_res(freq: u64, high_res_timer: bool) -> Self {
        Self {
            freq,
            one_ms_ticks: ticks_for_micros(freq, 1_000),
            two_ms_ticks: ticks_for_micros(freq, 2_000),
            high_res_timer,
        }
    }
}

/// Converts a microsecond request into counter ticks, rounding down. The
/// 128-bit intermediate keeps enormous requests from overflowing; such
/// requests are honored, not truncated.
#[inline]
pub(crate) fn ticks_for_micros(freq: u64, micros: u64) -> u64 {
    ((micros as u128 * freq as u128) / 1_000_000) as u64
}
