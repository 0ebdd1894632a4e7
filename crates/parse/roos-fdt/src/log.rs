//! Minimal rebindable error sink.
//!
//! `roos-kernel` parses a DTB through this crate during boot, so this crate
//! cannot depend back on `roos-kernel::log` for its `kerr!` facade without a
//! cycle. Instead it holds its own single `AtomicPtr`-backed function
//! pointer, rebindable by whatever crate wires logging up before parsing
//! starts, the same shape `roos-kernel::log` uses for its print/log hooks.
//! Before anything rebinds it, it is a silent no-op.

use core::fmt;
use core::sync::atomic::{AtomicPtr, Ordering};

/// Signature of the error-sink function.
pub type ErrorFn = fn(fmt::Arguments<'_>);

fn null_error(_args: fmt::Arguments<'_>) {}

static ERROR_FN: AtomicPtr<()> = AtomicPtr::new(null_error as *mut ());

/// Registers the global error sink used by [`log_error!`].
///
/// # Safety
///
/// `f` must be callable from any context this crate's parser may run in.
pub unsafe fn set_error_fn(f: ErrorFn) {
    ERROR_FN.store(f as *mut (), Ordering::Release);
}

fn load_error_fn() -> ErrorFn {
    let ptr = ERROR_FN.load(Ordering::Acquire);
    // SAFETY: only valid `ErrorFn` pointers (or the initial no-op) are ever
    // stored into ERROR_FN.
    unsafe { core::mem::transmute(ptr) }
}

/// Implementation detail for [`log_error!`]. Not public API.
#[doc(hidden)]
pub fn _log_error(args: fmt::Arguments<'_>) {
    load_error_fn()(args);
}

/// Logs a recoverable parse-time error through the bound sink.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::log::_log_error(format_args!($($arg)*)) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicUsize;

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counting_error(_args: fmt::Arguments<'_>) {
        CALLS.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn default_error_sink_is_silent_noop() {
        log_error!("probe {}", 1);
    }

    #[test]
    fn rebinding_error_fn_is_observed() {
        unsafe { set_error_fn(counting_error) };
        let before = CALLS.load(Ordering::Relaxed);
        log_error!("truncated cells property");
        assert_eq!(CALLS.load(Ordering::Relaxed), before + 1);
    }
}
