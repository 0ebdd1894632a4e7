//! Fatal-error collaborator.
//!
//! A small number of conditions the rest of the core treats as
//! unrecoverable: a malformed device tree (bad magic) and double
//! registration of the single interrupt controller driver. Both call
//! through here instead of propagating a `Result` the caller cannot
//! meaningfully recover from.

/// Logs `msg` at [`crate::log::LogLevel::Fatal`] and halts.
///
/// Never returns. On a real kernel target this should be the last thing
/// that runs before the CPU halts; on host test builds it panics so the
/// test harness can still observe the failure.
pub fn panic_fatal(msg: &str) -> ! {
    crate::kfatal!("{msg}");
    #[cfg(not(test))]
    {
        loop {
            core::hint::spin_loop();
        }
    }
    #[cfg(test)]
    {
        panic!("fatal: {msg}");
    }
}
