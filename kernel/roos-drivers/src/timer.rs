//! Mock timer drivers, attached from `roos,mock-timer` device-tree nodes.
//!
//! Tracks frequency and enable/disable nesting in software rather than
//! programming PIT/RTC/HPET registers, which are out of scope here.

extern crate alloc;

use core::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use roos_driver_api::driver::DriverError;
use roos_driver_api::timer::{CalendarDate, DayTime, TickHandlerFn, TimerDriver, TimerRole};
use roos_fdt::DtNode;

/// A software timer with a settable frequency and an optional fixed
/// calendar reading, for exercising MAIN/RTC/AUX/LIFETIME registration.
///
/// Starts disabled: `disabled_nesting` is initialized to 1, matching every
/// other driver's convention of requiring an explicit first `enable()`
/// before it is live.
pub struct MockTimer {
    frequency: AtomicU64,
    min_hz: u64,
    max_hz: u64,
    disabled_nesting: AtomicU8,
    lifetime_ns: Option<AtomicU64>,
    calendar: Option<CalendarDate>,
    daytime: Option<DayTime>,
}

impl MockTimer {
    /// Creates a timer running at `default_hz`, retunable within
    /// `[min_hz, max_hz]`.
    #[must_use]
    pub const fn new(default_hz: u64, min_hz: u64, max_hz: u64) -> Self {
        Self {
            frequency: AtomicU64::new(default_hz),
            min_hz,
            max_hz,
            disabled_nesting: AtomicU8::new(1),
            lifetime_ns: None,
            calendar: None,
            daytime: None,
        }
    }

    /// Creates a LIFETIME-role timer exposing a free-running nanosecond
    /// counter instead of a frequency.
    #[must_use]
    pub const fn new_lifetime() -> Self {
        Self {
            frequency: AtomicU64::new(0),
            min_hz: 0,
            max_hz: 0,
            disabled_nesting: AtomicU8::new(1),
            lifetime_ns: Some(AtomicU64::new(0)),
            calendar: None,
            daytime: None,
        }
    }

    /// Creates an RTC-role timer with a fixed calendar reading.
    #[must_use]
    pub const fn new_rtc(calendar: CalendarDate, daytime: DayTime) -> Self {
        Self {
            frequency: AtomicU64::new(1),
            min_hz: 1,
            max_hz: 1,
            disabled_nesting: AtomicU8::new(1),
            lifetime_ns: None,
            calendar: Some(calendar),
            daytime: Some(daytime),
        }
    }

    /// Advances the LIFETIME counter by `ns`. No-op on a non-LIFETIME timer.
    pub fn advance_lifetime(&self, ns: u64) {
        if let Some(counter) = &self.lifetime_ns {
            counter.fetch_add(ns, Ordering::Relaxed);
        }
    }

    /// Current disabled-nesting depth, for asserting nesting is balanced.
    #[must_use]
    pub fn nesting_depth(&self) -> u8 {
        self.disabled_nesting.load(Ordering::Relaxed)
    }
}

impl TimerDriver for MockTimer {
    fn get_frequency(&self) -> u64 {
        self.frequency.load(Ordering::Relaxed)
    }

    fn set_frequency(&self, hz: u64) -> bool {
        if hz < self.min_hz || hz > self.max_hz {
            return false;
        }
        self.frequency.store(hz, Ordering::Relaxed);
        true
    }

    fn get_time_ns(&self) -> Option<u64> {
        self.lifetime_ns.as_ref().map(|c| c.load(Ordering::Relaxed))
    }

    fn set_time_ns(&self, ns: u64) -> bool {
        match &self.lifetime_ns {
            Some(counter) => {
                counter.store(ns, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    fn get_date(&self) -> Option<CalendarDate> {
        self.calendar
    }

    fn get_daytime(&self) -> Option<DayTime> {
        self.daytime
    }

    fn disable(&self) {
        self.disabled_nesting.fetch_add(1, Ordering::AcqRel);
    }

    fn enable(&self) {
        let prev = self.disabled_nesting.load(Ordering::Acquire);
        if prev > 0 {
            self.disabled_nesting.fetch_sub(1, Ordering::AcqRel);
        }
    }

    fn set_handler(&self, _handler: TickHandlerFn) {}

    fn remove_handler(&self) {}
}

static MAIN: MockTimer = MockTimer::new(1000, 100, 10_000);
static RTC: MockTimer = MockTimer::new_rtc(CalendarDate { year: 2026, month: 1, day: 1 }, DayTime { hour: 0, minute: 0, second: 0 });

/// Attaches a `roos,mock-timer` node, registering it under the role named
/// by its `roos,role` property (`"main"`, `"rtc"`, `"aux"`, or
/// `"lifetime"`; defaults to `"aux"` if absent or unrecognized).
///
/// # Errors
///
/// Returns [`DriverError::InvalidArgument`] if the time subsystem rejects
/// the registration (only possible for AUX, whose table has fixed
/// capacity).
pub fn attach(node: &DtNode) -> Result<(), DriverError> {
    let role_name = node.property("roos,role").and_then(|p| p.as_str()).unwrap_or("aux");
    let (role, driver): (TimerRole, &'static dyn TimerDriver) = match role_name {
        "main" => (TimerRole::Main, &MAIN),
        "rtc" => (TimerRole::Rtc, &RTC),
        "lifetime" => {
            let leaked: &'static MockTimer = alloc::boxed::Box::leak(alloc::boxed::Box::new(MockTimer::new_lifetime()));
            (TimerRole::Lifetime, leaked)
        }
        _ => {
            let leaked: &'static MockTimer = alloc::boxed::Box::leak(alloc::boxed::Box::new(MockTimer::new(1, 1, 1)));
            (TimerRole::Aux, leaked)
        }
    };
    roos_kernel::timer::register(role, driver).map_err(|_| DriverError::InvalidArgument)
}
