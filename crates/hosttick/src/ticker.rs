use std::sync::{Mutex, OnceLock, PoisonError};

use tracing::debug;

use crate::caps::TimerCaps;
use crate::counter::CounterSource;
use crate::error::Result;
use crate::os::HostOps;
use crate::sleep;
use crate::suspend::SuspendState;

static GLOBAL: OnceLock<Result<Ticker>> = OnceLock::new();

/// The timing facade for an emulation loop: suspend-aware cycle counting
/// plus the three delay variants.
///
/// Intended to be driven from one thread (the frame loop); the suspend state
/// is behind a mutex so stray calls from other threads stay defined, but the
/// delay variants block the calling thread for their full duration and
/// cannot be interrupted.
#[derive(Debug)]
pub struct Ticker {
    source: CounterSource,
    caps: TimerCaps,
    suspend: Mutex<SuspendState>,
}

impl Ticker {
    /// Probes the monotonic counter and the high-resolution timer
    /// capability. An absent counter is reported here, once.
    pub fn new() -> Result<Self> {
        let (source, freq) = CounterSource::probe()?;
        let caps = TimerCaps::detect(freq);
        debug!(
            high_res_timer = caps.high_res_timer,
            "timer capabilities probed"
        );
        Ok(Self {
            source,
            caps,
            suspend: Mutex::new(SuspendState::new()),
        })
    }

    /// Process-wide instance. The first call performs the probe; a probe
    /// failure is cached, so every later call observes the same error.
    pub fn global() -> Result<&'static Ticker> {
        GLOBAL
            .get_or_init(Ticker::new)
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Current cycle count: monotone non-decreasing, frozen while timing is
    /// disabled, with suspended intervals excluded after resume.
    pub fn now(&self) -> u64 {
        let raw = self.source.sample();
        self.suspend
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .observed(raw)
    }

    /// Tick frequency of [`Ticker::now`], in cycles per second. Non-zero.
    pub fn frequency(&self) -> u64 {
        self.caps.freq
    }

    /// The counter backing [`Ticker::now`].
    pub fn counter_source(&self) -> CounterSource {
        self.source
    }

    /// Whether the sub-millisecond waitable-timer path is available. Without
    /// it the accurate and over-biased variants degrade to coarse sleep.
    pub fn has_high_res_timer(&self) -> bool {
        self.caps.high_res_timer
    }

    /// Freezes (`false`) or resumes (`true`) the observed cycle count, so
    /// time spent paused does not count as elapsed. Idempotent in both
    /// directions.
    pub fn set_timing_enabled(&self, enabled: bool) {
        let raw = self.source.sample();
        let mut state = self.suspend.lock().unwrap_or_else(PoisonError::into_inner);
        if enabled {
            state.unfreeze(raw);
        } else {
            state.freeze(raw);
        }
    }

    /// Blocks for at least `micros` microseconds, as exactly as possible.
    /// Overshoot is sub-millisecond with the high-resolution timer and up to
    /// ~2 ms without it; the final sliver busy-spins.
    ///
    /// Coarse wakeups inside only track their nominal 1 ms while a
    /// [`crate::raise_timer_resolution`] session is active.
    pub fn sleep_accurate(&self, micros: u64) {
        sleep::sleep_accurate(&HostOps, &self.caps, micros);
    }

    /// Blocks for at least `micros` microseconds without ever spinning; may
    /// oversleep by 0.5-1 ms (1-2 ms without the high-resolution timer).
    pub fn sleep_over_biased(&self, micros: u64) {
        sleep::sleep_over_biased(&HostOps, &self.caps, micros);
    }

    /// Returns immediately for requests of 4 ms or less (zero syscalls);
    /// longer requests under-sleep by roughly 2-3 ms. For latency-sensitive
    /// callers that prefer "close enough, fast" over "exact, possibly late".
    pub fn sleep_under_biased(&self, micros: u64) {
        sleep::sleep_under_biased(&HostOps, &self.caps, micros);
    }
}
