//! Interrupt Controller Abstraction (ICA).
//!
//! Binds exactly one [`InterruptControllerDriver`] at a time and dispatches
//! arriving vectors to a flat handler table. Registration is independent of
//! binding: handlers may be registered before a controller is bound, they
//! simply have no effect on the hardware IRQ mask until one is.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use roos_core::cpu_local::CpuLocal;
use roos_core::sync::IrqSpinLock;
use roos_driver_api::interrupt::{InterruptControllerDriver, SpuriousResult};

/// Lowest interrupt vector a handler may be registered on.
pub const MIN_VEC: u8 = 0x20;
/// Highest interrupt vector a handler may be registered on.
pub const MAX_VEC: u8 = 0xFF;

const PIC_MASTER_SPURIOUS: u8 = 0x27;
const PIC_SLAVE_SPURIOUS: u8 = 0x2F;

/// Vectors that can never carry a registered handler, regardless of
/// `[MIN_VEC, MAX_VEC]`.
const RESERVED_VECTORS: &[u8] = &[0x20, PIC_MASTER_SPURIOUS, PIC_SLAVE_SPURIOUS, MAX_VEC];

fn is_reserved(vector: u8) -> bool {
    RESERVED_VECTORS.contains(&vector)
}

/// A registered interrupt handler, invoked with the local CPU id.
pub type IrqHandlerFn = fn(cpu: u32);

/// Errors returned by the interrupt controller abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcaError {
    /// `line` falls outside `[MIN_VEC, MAX_VEC]` or is in the reserved set.
    UnauthorizedLine,
    /// A handler is already registered on this line.
    AlreadyRegistered,
    /// No handler is registered on this line.
    NotRegistered,
    /// No interrupt controller driver is bound yet.
    ControllerNotBound,
}

impl fmt::Display for IcaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnauthorizedLine => f.write_str("interrupt line out of range or reserved"),
            Self::AlreadyRegistered => f.write_str("handler already registered on this line"),
            Self::NotRegistered => f.write_str("no handler registered on this line"),
            Self::ControllerNotBound => f.write_str("no interrupt controller driver is bound"),
        }
    }
}

const TABLE_LEN: usize = 256;

struct HandlerTable {
    handlers: [Option<IrqHandlerFn>; TABLE_LEN],
}

static HANDLERS: IrqSpinLock<HandlerTable> = IrqSpinLock::new(HandlerTable {
    handlers: [None; TABLE_LEN],
});

static CONTROLLER: IrqSpinLock<Option<&'static dyn InterruptControllerDriver>> =
    IrqSpinLock::new(None);

/// Per-CPU count of outstanding [`disable`] calls not yet matched by
/// [`restore`].
static NESTING: CpuLocal<AtomicU8> = CpuLocal::new([const { AtomicU8::new(0) }; roos_core::cpu_local::MAX_CPUS]);

/// Binds the single interrupt controller driver, replacing any previous
/// binding (used when an IOAPIC driver takes over from a PIC one).
pub fn bind_controller(driver: &'static dyn InterruptControllerDriver) {
    *CONTROLLER.lock() = Some(driver);
}

/// Registers `handler` on `line`.
///
/// # Errors
///
/// Returns [`IcaError::UnauthorizedLine`] if `line` is out of range or
/// reserved, or [`IcaError::AlreadyRegistered`] if a handler already
/// occupies this line.
pub fn register(line: u8, handler: IrqHandlerFn) -> Result<(), IcaError> {
    if line < MIN_VEC || is_reserved(line) {
        return Err(IcaError::UnauthorizedLine);
    }
    let mut table = HANDLERS.lock();
    if table.handlers[line as usize].is_some() {
        return Err(IcaError::AlreadyRegistered);
    }
    table.handlers[line as usize] = Some(handler);
    Ok(())
}

/// Removes the handler on `line`, the inverse of [`register`].
///
/// # Errors
///
/// Returns [`IcaError::UnauthorizedLine`] if `line` is out of range or
/// reserved, or [`IcaError::NotRegistered`] if no handler is present.
pub fn remove(line: u8) -> Result<(), IcaError> {
    if line < MIN_VEC || is_reserved(line) {
        return Err(IcaError::UnauthorizedLine);
    }
    let mut table = HANDLERS.lock();
    if table.handlers[line as usize].is_none() {
        return Err(IcaError::NotRegistered);
    }
    table.handlers[line as usize] = None;
    Ok(())
}

/// The CPU interrupt-enabled state captured by a [`disable`] call, to be
/// passed back to the matching [`restore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedIrqState(bool);

/// Disables interrupts on the local CPU, nesting safely with other callers.
///
/// The hardware IRQ-enable flag is only actually cleared on the transition
/// from zero to one outstanding `disable` call; nested calls just bump the
/// counter.
#[must_use]
pub fn disable() -> SavedIrqState {
    let counter = NESTING.get();
    let prev = counter.fetch_add(1, Ordering::AcqRel);
    if prev == 0 {
        let was_enabled = hw::interrupts_enabled();
        hw::disable_interrupts();
        SavedIrqState(was_enabled)
    } else {
        SavedIrqState(false)
    }
}

/// Reverses one [`disable`] call.
///
/// Only re-enables hardware interrupts when the nesting counter reaches
/// zero and `saved` indicates interrupts were enabled before the matching
/// `disable` call. A call with the counter already at zero is a no-op.
pub fn restore(saved: SavedIrqState) {
    let counter = NESTING.get();
    if counter.load(Ordering::Acquire) == 0 {
        return;
    }
    let now = counter.fetch_sub(1, Ordering::AcqRel) - 1;
    if now == 0 && saved.0 {
        hw::enable_interrupts();
    }
}

/// Dispatches an arriving interrupt vector.
///
/// Consults the bound controller for spuriousness, then the handler table,
/// then issues EOI. Runs with hardware interrupts masked at the CPU level.
pub fn dispatch(vector: u8, cpu: u32) {
    let controller = *CONTROLLER.lock();
    let Some(controller) = controller else {
        return;
    };

    if controller.handle_spurious(vector) == SpuriousResult::Spurious {
        return;
    }

    let handler = HANDLERS.lock().handlers[vector as usize];
    if let Some(handler) = handler {
        handler(cpu);
    }

    controller.set_eoi(vector);
}

mod hw {
    #[cfg(all(target_os = "none", target_arch = "x86_64"))]
    pub fn interrupts_enabled() -> bool {
        let flags: u64;
        // SAFETY: reading RFLAGS has no side effects.
        unsafe {
            core::arch::asm!("pushfq", "pop {}", out(reg) flags, options(nomem, preserves_flags));
        }
        flags & (1 << 9) != 0
    }

    #[cfg(all(target_os = "none", target_arch = "x86_64"))]
    pub fn disable_interrupts() {
        // SAFETY: CLI is always safe in kernel mode.
        unsafe { core::arch::asm!("cli", options(nomem, nostack)) };
    }

    #[cfg(all(target_os = "none", target_arch = "x86_64"))]
    pub fn enable_interrupts() {
        // SAFETY: STI is always safe in kernel mode.
        unsafe { core::arch::asm!("sti", options(nomem, nostack)) };
    }

    #[cfg(not(all(target_os = "none", target_arch = "x86_64")))]
    pub fn interrupts_enabled() -> bool {
        true
    }

    #[cfg(not(all(target_os = "none", target_arch = "x86_64")))]
    pub fn disable_interrupts() {}

    #[cfg(not(all(target_os = "none", target_arch = "x86_64")))]
    pub fn enable_interrupts() {}
}
