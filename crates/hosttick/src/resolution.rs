//! Process-wide timer-resolution raise/restore.

use std::sync::{Mutex, PoisonError};

use crate::error::{Result, TimeError};
use crate::os;

static SESSION: Mutex<Option<os::ResolutionGrant>> = Mutex::new(None);

/// Requests the minimum global timer period the OS supports, for the
/// duration of a timing-sensitive session.
///
/// A rejected OS request is not an error: it is recorded and the paired
/// [`restore_timer_resolution`] becomes a no-op. Raising twice without an
/// intervening restore is rejected with
/// [`TimeError::ResolutionAlreadyRaised`].
///
/// With the `ntdll-resolution` feature an even finer period (usually 0.5 ms)
/// is requested through undocumented ntdll calls after the documented raise;
/// it is off by default because it distorts audio on some setups.
pub fn raise_timer_resolution() -> Result<()> {
    let mut session = SESSION.lock().unwrap_or_else(PoisonError::into_inner);
    if session.is_some() {
        return Err(TimeError::ResolutionAlreadyRaised);
    }
    *session = Some(os::grant_min_resolution());
    Ok(())
}

/// Undoes exactly what [`raise_timer_resolution`] granted, in reverse order.
/// Safe to call without an active session or after a failed raise.
pub fn restore_timer_resolution() {
    let grant = SESSION
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(grant) = grant {
        os::revoke_min_resolution(grant);
    }
}
