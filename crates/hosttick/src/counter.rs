use tracing::debug;

use crate::error::Result;

/// Monotonic counter source, selected once when a [`crate::Ticker`] is
/// created.
///
/// The selection is an explicit value rather than a swappable function so an
/// unavailable counter surfaces as [`crate::TimeError::CounterUnavailable`]
/// at initialization instead of as undefined behavior later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterSource {
    /// The Windows performance counter (`QueryPerformanceCounter`).
    #[cfg(windows)]
    PerformanceCounter,
    /// The std monotonic clock, reported as nanosecond ticks (1 GHz).
    #[cfg(not(windows))]
    Monotonic,
}

impl CounterSource {
    /// Probes for a counter and returns it together with its tick frequency.
    pub(crate) fn probe() -> Result<(Self, u64)> {
        let (source, freq) = crate::os::probe_counter()?;
        debug!(?source, cycles_per_sec = freq, "monotonic counter selected");
        Ok((source, freq))
    }

    /// Current raw tick count. Never suspend-adjusted.
    #[inline]
    pub(crate) fn sample(self) -> u64 {
        match self {
            #[cfg(windows)]
            CounterSource::PerformanceCounter => crate::os::raw_ticks(),
            #[cfg(not(windows))]
            CounterSource::Monotonic => crate::os::raw_ticks(),
        }
    }
}

/// Timestamp-counter sample for low-overhead relative profiling.
///
/// Runs at an uncalibrated, CPU-defined rate: it is not synchronized with
/// [`crate::Ticker::now`] / [`crate::Ticker::frequency`] and must never be
/// mixed with cycle-count arithmetic.
#[inline]
pub fn profiling_ticks() -> u64 {
    #[cfg(target_arch = "x86_64")]
    return unsafe { core::arch::x86_64::_rdtsc() };

    #[cfg(target_arch = "x86")]
    return unsafe { core::arch::x86::_rdtsc() };

    #[cfg(target_arch = "aarch64")]
    return {
        let ticks: u64;
        unsafe { core::arch::asm!("mrs {}, cntvct_el0", out(reg) ticks) };
        ticks
    };

    #[cfg(not(any(
        target_arch = "x86_64",
        target_arch = "x86",
        target_arch = "aarch64"
    )))]
    crate::os::raw_ticks()
}
