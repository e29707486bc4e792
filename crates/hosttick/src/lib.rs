//! Host-side high-resolution timing and sub-millisecond sleep for a
//! real-time emulation loop.
//!
//! The emulation loop measures elapsed host time as **cycles** of a monotonic
//! counter ([`Ticker::now`] / [`Ticker::frequency`]), may freeze the observed
//! count while the application itself is paused
//! ([`Ticker::set_timing_enabled`]), and burns off frame slack through three
//! blocking delay variants with different accuracy/CPU-cost trade-offs.
//!
//! Sub-millisecond sleep accuracy on a scheduler whose default granularity is
//! 1-15 ms comes from choosing, on every iteration of the deadline loop,
//! between a coarse 1 ms OS sleep, a 500 us high-resolution waitable timer
//! (where the OS has one) and a spin hint, based on how much time remains.
//! [`raise_timer_resolution`] / [`restore_timer_resolution`] bracket a
//! timing-sensitive session so the coarse sleeps actually track their nominal
//! granularity.
//!
//! None of this is hard real time: the variants minimize drift on a
//! best-effort basis, and each documents its over/under-sleep bound.

mod caps;
mod counter;
mod error;
mod os;
mod resolution;
mod sleep;
mod suspend;
mod ticker;

pub use counter::{profiling_ticks, CounterSource};
pub use error::{Result, TimeError};
pub use resolution::{raise_timer_resolution, restore_timer_resolution};
pub use ticker::Ticker;
