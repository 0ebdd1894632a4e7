//! Mock interrupt controller, attached from a `roos,mock-pic` node.
//!
//! Tracks masking and EOI in software instead of programming real PIC/IOAPIC
//! registers, which are out of scope here; it exists so the interrupt
//! controller abstraction has something to bind in integration tests and at
//! boot before a real controller driver is written.

extern crate alloc;

use core::sync::atomic::{AtomicU64, Ordering};

use roos_driver_api::driver::DriverError;
use roos_driver_api::interrupt::{InterruptControllerDriver, SpuriousResult};
use roos_fdt::DtNode;

/// A line whose bit is set in [`MockPic::spurious_lines`] always reports
/// [`SpuriousResult::Spurious`] from [`handle_spurious`](InterruptControllerDriver::handle_spurious).
pub struct MockPic {
    mask: AtomicU64,
    spurious_lines: AtomicU64,
    last_eoi: AtomicU64,
}

impl MockPic {
    /// Creates a controller with every line unmasked and none spurious.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mask: AtomicU64::new(0),
            spurious_lines: AtomicU64::new(0),
            last_eoi: AtomicU64::new(u64::MAX),
        }
    }

    /// Marks `line` as always-spurious, for exercising the ICA's
    /// spurious-detection path.
    pub fn mark_spurious(&self, line: u8) {
        self.spurious_lines.fetch_or(1 << (line % 64), Ordering::Relaxed);
    }

    /// Reports whether `line` is currently masked.
    #[must_use]
    pub fn is_masked(&self, line: u8) -> bool {
        self.mask.load(Ordering::Relaxed) & (1 << (line % 64)) != 0
    }

    /// The vector most recently passed to [`set_eoi`](InterruptControllerDriver::set_eoi),
    /// or `None` if none yet.
    #[must_use]
    pub fn last_eoi(&self) -> Option<u8> {
        let v = self.last_eoi.load(Ordering::Relaxed);
        if v == u64::MAX {
            None
        } else {
            Some(v as u8)
        }
    }
}

impl Default for MockPic {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptControllerDriver for MockPic {
    fn set_irq_mask(&self, line: u8, enabled: bool) {
        let bit = 1u64 << (line % 64);
        if enabled {
            self.mask.fetch_and(!bit, Ordering::Relaxed);
        } else {
            self.mask.fetch_or(bit, Ordering::Relaxed);
        }
    }

    fn set_eoi(&self, vector: u8) {
        self.last_eoi.store(u64::from(vector), Ordering::Relaxed);
    }

    fn handle_spurious(&self, line: u8) -> SpuriousResult {
        if self.spurious_lines.load(Ordering::Relaxed) & (1 << (line % 64)) != 0 {
            SpuriousResult::Spurious
        } else {
            SpuriousResult::Regular
        }
    }

    fn get_interrupt_line(&self, irq: u8) -> i32 {
        i32::from(roos_kernel::interrupt::MIN_VEC) + i32::from(irq)
    }
}

static CONTROLLER: MockPic = MockPic::new();

/// Attaches a `roos,mock-pic` node by binding the process-wide [`MockPic`]
/// instance into the interrupt controller abstraction.
///
/// # Errors
///
/// Never fails; returns `Ok(())` unconditionally. The signature matches
/// [`DriverRecord::attach`](roos_driver_api::registration::DriverRecord)
/// so this can be placed directly into a driver table.
pub fn attach(_node: &DtNode) -> Result<(), DriverError> {
    roos_kernel::interrupt::bind_controller(&CONTROLLER);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_toggles_independently_per_line() {
        let pic = MockPic::new();
        pic.set_irq_mask(3, false);
        assert!(pic.is_masked(3));
        assert!(!pic.is_masked(4));
        pic.set_irq_mask(3, true);
        assert!(!pic.is_masked(3));
    }

    #[test]
    fn spurious_marking_is_observed() {
        let pic = MockPic::new();
        assert_eq!(pic.handle_spurious(5), SpuriousResult::Regular);
        pic.mark_spurious(5);
        assert_eq!(pic.handle_spurious(5), SpuriousResult::Spurious);
    }

    #[test]
    fn eoi_records_last_vector() {
        let pic = MockPic::new();
        assert_eq!(pic.last_eoi(), None);
        pic.set_eoi(0x21);
        assert_eq!(pic.last_eoi(), Some(0x21));
    }
}
