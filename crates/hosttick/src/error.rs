use thiserror::Error;

pub type Result<T> = std::result::Result<T, TimeError>;

/// Unified error type for the timing subsystem.
///
/// A missing high-resolution waitable timer is deliberately *not* an error:
/// it is a recorded capability and the delay variants degrade to coarser
/// mechanisms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The OS exposes no monotonic high-resolution counter. Nothing in the
    /// crate works without one, so initialization reports it once and loudly
    /// instead of leaving a silently dead subsystem behind.
    #[error("no monotonic high-resolution counter available")]
    CounterUnavailable,

    /// A timer-resolution session is already active; the raise/restore pair
    /// does not nest.
    #[error("timer resolution already raised; restore the active session first")]
    ResolutionAlreadyRaised,
}
