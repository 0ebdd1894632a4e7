//! The vtable a timer driver exposes to the time subsystem, and the role
//! under which it is registered.

/// The role a registered timer plays in the time subsystem.
///
/// At most one `Main` and one `Rtc` timer may be registered at a time;
/// `Lifetime` is optional and, when present, is preferred for high-precision
/// monotonic reads; any number of `Aux` timers may coexist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerRole {
    /// Drives scheduler ticks and uptime accumulation.
    Main,
    /// Provides wall-clock date and time-of-day queries.
    Rtc,
    /// Driver-specific auxiliary timer, unbounded in count.
    Aux,
    /// High-precision monotonic source, read directly for uptime when
    /// present.
    Lifetime,
}

/// A calendar date as read from an RTC driver.
///
/// BCD-to-binary and 12/24-hour conversion are the driver's responsibility;
/// by the time a value reaches this type it is already normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDate {
    /// Full year (e.g. `2026`).
    pub year: u16,
    /// Month, `1..=12`.
    pub month: u8,
    /// Day of month, `1..=31`.
    pub day: u8,
}

/// A time of day as read from an RTC driver, already normalized to 24-hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayTime {
    /// Hour, `0..=23`.
    pub hour: u8,
    /// Minute, `0..=59`.
    pub minute: u8,
    /// Second, `0..=59`.
    pub second: u8,
}

/// Tick handler invoked by a MAIN timer's interrupt handler once per tick.
pub type TickHandlerFn = fn(cpu: u32);

/// The driver contract a timer implements.
///
/// Slots that a given piece of hardware cannot support (e.g. `set_time_ns`
/// on a read-only counter) are left at their default `None`/`false`
/// implementation rather than guarded by a null-function-pointer check; the
/// time subsystem maps that into `NotSupported` without invoking anything.
pub trait TimerDriver: Send + Sync {
    /// Returns the timer's current operating frequency in Hz.
    fn get_frequency(&self) -> u64;

    /// Attempts to retune the timer to `hz`. Returns `false` if `hz` falls
    /// outside the driver's supported range or the timer cannot be retuned.
    fn set_frequency(&self, _hz: u64) -> bool {
        false
    }

    /// Reads the timer's own nanosecond counter, if it has one.
    fn get_time_ns(&self) -> Option<u64> {
        None
    }

    /// Sets the timer's own nanosecond counter, if supported.
    fn set_time_ns(&self, _ns: u64) -> bool {
        false
    }

    /// Reads the calendar date, for RTC-role timers.
    fn get_date(&self) -> Option<CalendarDate> {
        None
    }

    /// Reads the time of day, for RTC-role timers.
    fn get_daytime(&self) -> Option<DayTime> {
        None
    }

    /// Increments the disabled-nesting counter, masking the underlying IRQ
    /// on the transition into the disabled state.
    fn disable(&self);

    /// Decrements the disabled-nesting counter, unmasking the underlying
    /// IRQ once it reaches zero.
    fn enable(&self);

    /// Installs the tick handler invoked on every hardware interrupt.
    fn set_handler(&self, handler: TickHandlerFn);

    /// Removes the previously installed tick handler, if any.
    fn remove_handler(&self);

    /// Performs driver-specific per-tick bookkeeping (e.g. clearing a
    /// match register) after the tick handler has run.
    fn tick_manager(&self) {}
}
