//! Driver identity and the error taxonomy shared by attach callbacks.

use core::fmt;

use roos_fdt::DtNode;

/// Errors a driver's `attach` entry point may return.
///
/// This is the one error enum that crosses the driver-manager boundary;
/// individual subsystems (interrupt controller, timers, VFS) define their
/// own richer error types for operations past attach time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// The device described by the node does not match what this driver
    /// expects, despite the compatible-string match.
    DeviceNotFound,
    /// Hardware or software initialization failed.
    InitFailed,
    /// A hardware operation timed out during attach.
    Timeout,
    /// The requested operation is not supported by this driver.
    Unsupported,
    /// Attach could not allocate the state it needed.
    OutOfMemory,
    /// The node's properties were present but malformed.
    InvalidArgument,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceNotFound => f.write_str("device not found"),
            Self::InitFailed => f.write_str("driver initialization failed"),
            Self::Timeout => f.write_str("hardware operation timed out"),
            Self::Unsupported => f.write_str("operation not supported"),
            Self::OutOfMemory => f.write_str("out of memory"),
            Self::InvalidArgument => f.write_str("invalid argument"),
        }
    }
}

/// Base trait every driver implements to provide identity and an attach
/// entry point.
///
/// A driver does not implement this trait as a trait object in the
/// registry; instead its `attach` function pointer is carried directly in a
/// [`DriverRecord`](crate::registration::DriverRecord) so that the table can
/// be built at compile time without allocation. The trait exists for
/// drivers that want a typed identity to hand off to their own internal
/// bookkeeping.
pub trait Driver {
    /// Short name of the driver (e.g. `"x86-pit"`).
    fn name(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// Compatible string this driver matches against.
    fn compatible(&self) -> &'static str;

    /// Called once by the driver manager when a device-tree node's
    /// `compatible` property matches this driver.
    fn attach(&self, node: &DtNode) -> Result<(), DriverError>;
}
