//! The vtable an interrupt-controller driver exposes to the interrupt
//! controller abstraction.

/// Outcome of a controller's spurious-interrupt check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpuriousResult {
    /// The interrupt carries a real event and should be dispatched.
    Regular,
    /// The controller reports no real event occurred; dispatch stops here.
    Spurious,
}

/// The driver contract for the single bound interrupt controller (PIC,
/// IOAPIC, GIC, ...).
///
/// Exactly one implementor is bound at a time in the interrupt controller
/// abstraction; rebinding replaces the previous controller (used when an
/// IOAPIC driver takes over from a PIC one).
pub trait InterruptControllerDriver: Send + Sync {
    /// Masks or unmasks the IRQ line at the given controller-local index.
    fn set_irq_mask(&self, line: u8, enabled: bool);

    /// Sends an End-of-Interrupt signal for the given vector.
    fn set_eoi(&self, vector: u8);

    /// Determines whether the interrupt on `line` is spurious.
    ///
    /// The controller may silently issue its own EOI here for lines that
    /// require acknowledgement regardless of spuriousness.
    fn handle_spurious(&self, line: u8) -> SpuriousResult;

    /// Maps a controller-local IRQ index to its global interrupt vector.
    ///
    /// Returns a negative value if `irq` has no mapping on this controller.
    fn get_interrupt_line(&self, irq: u8) -> i32;
}
