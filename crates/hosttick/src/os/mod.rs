//! Real OS primitives behind the counter, the delay engine and the timer
//! resolution toggle.

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub(crate) use self::windows::*;

#[cfg(not(windows))]
mod fallback;
#[cfg(not(windows))]
pub(crate) use self::fallback::*;

use crate::sleep::SleepOps;

/// Zero-sized [`SleepOps`] over the real primitives.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HostOps;

impl SleepOps for HostOps {
    #[inline]
    fn raw_ticks(&self) -> u64 {
        raw_ticks()
    }

    fn coarse_sleep(&self) {
        coarse_sleep();
    }

    fn high_res_wait(&self) -> bool {
        high_res_wait()
    }

    #[inline]
    fn spin(&self) {
        spin();
    }
}
