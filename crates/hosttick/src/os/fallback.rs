//! Portable primitives: the std monotonic clock with nanosecond ticks, and
//! nanosleep-backed sleeps, which are reliably sub-millisecond on the
//! platforms that take this path.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::counter::CounterSource;
use crate::error::Result;

const NANOS_PER_SEC: u64 = 1_000_000_000;

static ANCHOR: OnceLock<Instant> = OnceLock::new();

#[inline]
fn anchor() -> Instant {
    *ANCHOR.get_or_init(Instant::now)
}

pub(crate) fn probe_counter() -> Result<(CounterSource, u64)> {
    anchor();
    Ok((CounterSource::Monotonic, NANOS_PER_SEC))
}

#[inline]
pub(crate) fn raw_ticks() -> u64 {
    anchor().elapsed().as_nanos() as u64
}

pub(crate) fn coarse_sleep() {
    std::thread::sleep(Duration::from_millis(1));
}

pub(crate) fn high_res_timer_available() -> bool {
    true
}

pub(crate) fn high_res_wait() -> bool {
    std::thread::sleep(Duration::from_micros(500));
    true
}

#[inline]
pub(crate) fn spin() {
    std::hint::spin_loop();
}

/// Nothing to grant: there is no process-global scheduler period to lower
/// here, so the session only tracks pairing.
#[derive(Debug)]
pub(crate) struct ResolutionGrant;

pub(crate) fn grant_min_resolution() -> ResolutionGrant {
    ResolutionGrant
}

pub(crate) fn revoke_min_resolution(_grant: ResolutionGrant) {}
