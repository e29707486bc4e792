//! Win32 timing primitives: performance counter, coarse `Sleep`, the
//! high-resolution waitable timer and the global timer-period toggle.

use tracing::warn;
use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0};
use windows_sys::Win32::Media::{
    timeBeginPeriod, timeEndPeriod, timeGetDevCaps, TIMECAPS, TIMERR_NOERROR,
};
use windows_sys::Win32::System::Performance::{
    QueryPerformanceCounter, QueryPerformanceFrequency,
};
use windows_sys::Win32::System::Threading::{
    CreateWaitableTimerExW, SetWaitableTimer, Sleep, WaitForSingleObject,
    CREATE_WAITABLE_TIMER_HIGH_RESOLUTION, INFINITE, TIMER_ALL_ACCESS,
};

use crate::counter::CounterSource;
use crate::error::{Result, TimeError};

pub(crate) fn probe_counter() -> Result<(CounterSource, u64)> {
    let mut freq = 0i64;
    // Succeeds on everything since XP, but the contract stays explicit: an
    // absent counter is an initialization error, not a dead subsystem.
    if unsafe { QueryPerformanceFrequency(&mut freq) } == 0 || freq <= 0 {
        return Err(TimeError::CounterUnavailable);
    }
    Ok((CounterSource::PerformanceCounter, freq as u64))
}

#[inline]
pub(crate) fn raw_ticks() -> u64 {
    let mut count = 0i64;
    unsafe { QueryPerformanceCounter(&mut count) };
    count as u64
}

pub(crate) fn coarse_sleep() {
    // Really pauses the thread for 1-2 ms depending on the current global
    // timer period; raise_timer_resolution() keeps it near the nominal 1 ms.
    unsafe { Sleep(1) };
}

/// Waitable-timer handle that is closed on every exit path, including a
/// failed arm or wait.
struct OwnedTimer(HANDLE);

impl OwnedTimer {
    fn create_high_res() -> Option<Self> {
        // ~0.5 ms resolution, Win10 and later. This timer kind does not need
        // timeBeginPeriod(1) to reach its resolution.
        let handle = unsafe {
            CreateWaitableTimerExW(
                core::ptr::null(),
                core::ptr::null(),
                CREATE_WAITABLE_TIMER_HIGH_RESOLUTION,
                TIMER_ALL_ACCESS,
            )
        };
        if handle.is_null() {
            None
        } else {
            Some(Self(handle))
        }
    }
}

impl Drop for OwnedTimer {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.0) };
    }
}

pub(crate) fn high_res_timer_available() -> bool {
    OwnedTimer::create_high_res().is_some()
}

pub(crate) fn high_res_wait() -> bool {
    let Some(timer) = OwnedTimer::create_high_res() else {
        return false;
    };
    // Relative due time in 100 ns units: 500 us out. Requests much below
    // ~10 us degenerate to a kernel spin loop, so the engine never goes lower.
    let due: i64 = -10 * 500;
    let armed =
        unsafe { SetWaitableTimer(timer.0, &due, 0, None, core::ptr::null(), 0) };
    if armed == 0 {
        return false;
    }
    unsafe { WaitForSingleObject(timer.0, INFINITE) == WAIT_OBJECT_0 }
}

#[inline]
pub(crate) fn spin() {
    std::hint::spin_loop();
}

/// What `raise_timer_resolution` was granted, for the paired restore.
#[derive(Debug)]
pub(crate) struct ResolutionGrant {
    /// Multimedia-timer period passed to `timeBeginPeriod`, if it succeeded.
    mm_period: Option<u32>,
    /// Previous ntdll timer period in 100 ns units, if the low-level path
    /// changed it.
    #[cfg(feature = "ntdll-resolution")]
    nt_previous: Option<u32>,
}

pub(crate) fn grant_min_resolution() -> ResolutionGrant {
    // Crank the multimedia timer up to its finest period first; this gives
    // the scheduler 1-2 ms timeslices and makes Sleep(1) mean what it says.
    let mut caps = TIMECAPS {
        wPeriodMin: 0,
        wPeriodMax: 0,
    };
    let mm_period = unsafe {
        if timeGetDevCaps(&mut caps, core::mem::size_of::<TIMECAPS>() as u32) == TIMERR_NOERROR
            && timeBeginPeriod(caps.wPeriodMin) == TIMERR_NOERROR
        {
            Some(caps.wPeriodMin)
        } else {
            None
        }
    };
    if mm_period.is_none() {
        warn!("could not raise the multimedia timer resolution; coarse sleeps keep the scheduler default granularity");
    }
    ResolutionGrant {
        mm_period,
        #[cfg(feature = "ntdll-resolution")]
        nt_previous: ntdll::set_lowest_period(),
    }
}

pub(crate) fn revoke_min_resolution(grant: ResolutionGrant) {
    // Reverse order of the grant.
    #[cfg(feature = "ntdll-resolution")]
    if let Some(previous) = grant.nt_previous {
        ntdll::restore_period(previous);
    }
    if let Some(period) = grant.mm_period {
        unsafe { timeEndPeriod(period) };
    }
}

/// The even finer-sliced (usually 0.5 ms) period via undocumented ntdll
/// calls, resolved at runtime so their absence only disables the capability.
#[cfg(feature = "ntdll-resolution")]
mod ntdll {
    use windows_sys::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};

    type NtQueryTimerResolution =
        unsafe extern "system" fn(maximum: *mut u32, minimum: *mut u32, current: *mut u32) -> i32;
    type NtSetTimerResolution =
        unsafe extern "system" fn(desired: u32, set: u8, actual: *mut u32) -> i32;

    fn lookup() -> Option<(NtQueryTimerResolution, NtSetTimerResolution)> {
        // ntdll is mapped into every process; no LoadLibrary round trip.
        let name: Vec<u16> = "ntdll.dll".encode_utf16().chain([0]).collect();
        unsafe {
            let ntdll = GetModuleHandleW(name.as_ptr());
            if ntdll.is_null() {
                return None;
            }
            let query = GetProcAddress(ntdll, c"NtQueryTimerResolution".as_ptr().cast())?;
            let set = GetProcAddress(ntdll, c"NtSetTimerResolution".as_ptr().cast())?;
            Some((
                core::mem::transmute::<_, NtQueryTimerResolution>(query),
                core::mem::transmute::<_, NtSetTimerResolution>(set),
            ))
        }
    }

    /// Requests the finest period ntdll reports, returning the previous
    /// period (100 ns units) when one was actually set.
    pub(super) fn set_lowest_period() -> Option<u32> {
        let (query, set) = lookup()?;
        let mut max = 0u32;
        let mut min = 0u32;
        let mut current = 0u32;
        unsafe { query(&mut max, &mut min, &mut current) };
        // Some setups report values just under 0.45 ms; leave those at their
        // native rate instead of pushing further down.
        if min < 4_500 {
            min = 5_000;
        }
        // Coarser than 1 ms is already covered by timeBeginPeriod.
        if min >= 10_000 {
            return None;
        }
        let mut actual = 0u32;
        unsafe { set(min, 1, &mut actual) };
        Some(current)
    }

    pub(super) fn restore_period(previous: u32) {
        if let Some((_, set)) = lookup() {
            let mut actual = 0u32;
            unsafe { set(previous, 0, &mut actual) };
        }
    }
}
