//! Pluggable Time Subsystem (TS).
//!
//! Timer drivers register under a [`TimerRole`]; the subsystem selects one
//! MAIN driver for scheduler ticks and uptime accumulation, one RTC for
//! calendar queries, an optional LIFETIME for direct high-precision
//! monotonic reads, and any number of AUX drivers for driver-specific use.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use roos_core::cpu_local::CpuLocal;
use roos_core::sync::SpinLock;
use roos_driver_api::timer::{CalendarDate, DayTime, TickHandlerFn, TimerDriver, TimerRole};

/// Maximum number of AUX timers that may be registered simultaneously.
pub const MAX_AUX_TIMERS: usize = 8;

/// Errors returned by the time subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeError {
    /// No driver is registered under the role this query needs.
    RoleNotInstalled,
    /// The AUX timer table is full.
    AuxCapacityExceeded,
}

impl fmt::Display for TimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoleNotInstalled => f.write_str("no timer driver installed for this role"),
            Self::AuxCapacityExceeded => f.write_str("auxiliary timer table is full"),
        }
    }
}

struct Registry {
    main: Option<&'static dyn TimerDriver>,
    rtc: Option<&'static dyn TimerDriver>,
    lifetime: Option<&'static dyn TimerDriver>,
    aux: [Option<&'static dyn TimerDriver>; MAX_AUX_TIMERS],
    aux_len: usize,
    tick_callback: Option<TickHandlerFn>,
}

static REGISTRY: SpinLock<Registry> = SpinLock::new(Registry {
    main: None,
    rtc: None,
    lifetime: None,
    aux: [None; MAX_AUX_TIMERS],
    aux_len: 0,
    tick_callback: None,
});

static TICKS: CpuLocal<AtomicU64> = CpuLocal::new([const { AtomicU64::new(0) }; roos_core::cpu_local::MAX_CPUS]);

/// Registers `driver` under `role`.
///
/// Registering a new MAIN, RTC, or LIFETIME driver replaces any previous
/// one in that role. AUX drivers accumulate up to [`MAX_AUX_TIMERS`].
///
/// # Errors
///
/// Returns [`TimeError::AuxCapacityExceeded`] if `role` is
/// [`TimerRole::Aux`] and the AUX table is already full.
pub fn register(role: TimerRole, driver: &'static dyn TimerDriver) -> Result<(), TimeError> {
    let mut reg = REGISTRY.lock();
    match role {
        TimerRole::Main => reg.main = Some(driver),
        TimerRole::Rtc => reg.rtc = Some(driver),
        TimerRole::Lifetime => reg.lifetime = Some(driver),
        TimerRole::Aux => {
            if reg.aux_len >= MAX_AUX_TIMERS {
                return Err(TimeError::AuxCapacityExceeded);
            }
            let idx = reg.aux_len;
            reg.aux[idx] = Some(driver);
            reg.aux_len += 1;
        }
    }
    Ok(())
}

/// Installs the scheduler tick callback invoked once per MAIN timer tick.
pub fn set_tick_callback(callback: TickHandlerFn) {
    REGISTRY.lock().tick_callback = Some(callback);
}

/// Returns nanoseconds elapsed since initialization, monotonically
/// nondecreasing across any two observations on the same CPU.
///
/// Uses the LIFETIME driver's own counter directly when one is installed;
/// otherwise integrates MAIN ticks against MAIN's declared frequency.
#[must_use]
pub fn uptime_ns() -> u64 {
    let reg = REGISTRY.lock();
    if let Some(lifetime) = reg.lifetime {
        if let Some(ns) = lifetime.get_time_ns() {
            return ns;
        }
    }
    let Some(main) = reg.main else { return 0 };
    let freq = main.get_frequency();
    if freq == 0 {
        return 0;
    }
    let ticks = TICKS.get().load(Ordering::Acquire);
    (ticks as u128 * 1_000_000_000u128 / freq as u128) as u64
}

/// Returns the current CPU's tick count.
#[must_use]
pub fn ticks(cpu_id: u32) -> u64 {
    TICKS.get_for(cpu_id).load(Ordering::Acquire)
}

/// The MAIN timer's interrupt handler entry point.
///
/// Increments the local CPU's tick counter, invokes the scheduler tick
/// callback if one is installed, then lets the driver perform any
/// per-tick bookkeeping (EOI, match-register clear, ...).
pub fn on_main_tick(cpu: u32) {
    TICKS.get().fetch_add(1, Ordering::AcqRel);

    let reg = REGISTRY.lock();
    if let Some(callback) = reg.tick_callback {
        callback(cpu);
    }
    if let Some(main) = reg.main {
        main.tick_manager();
    }
}

/// Busy-waits until `uptime_ns()` reaches `deadline_ns`.
///
/// Does not yield or enable interrupts; intended for use before the
/// scheduler exists.
pub fn wait_no_sched(deadline_ns: u64) {
    while uptime_ns() < deadline_ns {
        core::hint::spin_loop();
    }
}

/// Attempts to retune the MAIN timer to `hz`.
///
/// Logs and returns without effect if no MAIN timer is installed or the
/// driver rejects the frequency as out of its supported range.
pub fn set_main_frequency(hz: u64) {
    let reg = REGISTRY.lock();
    match reg.main {
        Some(main) if main.set_frequency(hz) => {}
        Some(_) => crate::kerr!("timer: frequency {hz} Hz out of range for MAIN driver"),
        None => crate::kerr!("timer: no MAIN driver installed"),
    }
}

/// Increments the MAIN driver's disabled-nesting counter, masking its IRQ
/// on the transition into the disabled state.
pub fn disable_main() {
    if let Some(main) = REGISTRY.lock().main {
        main.disable();
    }
}

/// Decrements the MAIN driver's disabled-nesting counter, unmasking its IRQ
/// once it reaches zero.
pub fn enable_main() {
    if let Some(main) = REGISTRY.lock().main {
        main.enable();
    }
}

/// Reads the calendar date from the RTC driver.
///
/// # Errors
///
/// Returns [`TimeError::RoleNotInstalled`] if no RTC driver is registered.
pub fn get_date() -> Result<CalendarDate, TimeError> {
    REGISTRY
        .lock()
        .rtc
        .and_then(TimerDriver::get_date)
        .ok_or(TimeError::RoleNotInstalled)
}

/// Reads the time of day from the RTC driver.
///
/// # Errors
///
/// Returns [`TimeError::RoleNotInstalled`] if no RTC driver is registered.
pub fn get_daytime() -> Result<DayTime, TimeError> {
    REGISTRY
        .lock()
        .rtc
        .and_then(TimerDriver::get_daytime)
        .ok_or(TimeError::RoleNotInstalled)
}

/// Returns the number of AUX timers currently registered.
#[must_use]
pub fn aux_count() -> usize {
    REGISTRY.lock().aux_len
}
