/// Tracks counted time that must be excluded from the externally observed
/// cycle count because the consumer explicitly suspended timing.
///
/// Pure arithmetic over raw counter samples: the caller supplies every
/// sample, so the logic is deterministic under test. Samples are assumed
/// monotone non-decreasing (the counter sources guarantee this).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SuspendState {
    /// Total raw ticks excluded by completed suspensions.
    adjustment: u64,
    /// Raw sample taken when the current suspension began, if suspended.
    suspended_at: Option<u64>,
}

impl SuspendState {
    pub(crate) const fn new() -> Self {
        Self {
            adjustment: 0,
            suspended_at: None,
        }
    }

    /// Freezes the observed count at `raw`. No-op while already suspended.
    pub(crate) fn freeze(&mut self, raw: u64) {
        if self.suspended_at.is_none() {
            self.suspended_at = Some(raw);
        }
    }

    /// Resumes counting, permanently excluding the frozen interval.
    /// No-op while not suspended.
    pub(crate) fn unfreeze(&mut self, raw: u64) {
        if let Some(frozen) = self.suspended_at.take() {
            self.adjustment += raw.saturating_sub(frozen);
        }
    }

    /// Observed tick count for the raw sample `raw`: constant while
    /// suspended, `raw - adjustment` otherwise. Continuous across both
    /// freeze and unfreeze boundaries.
    pub(crate) fn observed(&self, raw: u64) -> u64 {
        match self.suspended_at {
            Some(frozen) => frozen - self.adjustment,
            None => raw - self.adjustment,
        }
    }
}
