//! Link-time driver registration.
//!
//! Driver crates place a [`DriverRecord`] into the `.roos_drivers` linker
//! section with [`driver_entry!`]. The driver manager walks that section as
//! a flat array at boot to discover and match drivers — no runtime registry
//! needed, and order of iteration equals link order.

use roos_fdt::DtNode;

use crate::driver::DriverError;

/// A compile-time-registered driver, as described in the device tree
/// driver-attachment model.
///
/// `attach` is a plain function pointer rather than a trait object so the
/// whole record can be built as a `const` and placed directly into the
/// linker section; drivers that need shared mutable state reach it through
/// statics or [`roos_core::cell::RacyCell`] of their own.
#[repr(C)]
pub struct DriverRecord {
    /// Short name of the driver (e.g. `"x86-pit"`), used in log output.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Compatible string this driver matches against device-tree nodes.
    pub compatible: &'static str,
    /// Driver version, opaque to the manager.
    pub version: u32,
    /// Called once when a node's `compatible` property matches.
    pub attach: fn(&DtNode) -> Result<(), DriverError>,
}

// SAFETY: DriverRecord holds only 'static references, a plain u32, and a
// function pointer, all of which are safe to share across threads.
unsafe impl Sync for DriverRecord {}

/// Registers a [`DriverRecord`] in the `.roos_drivers` linker section.
///
/// # Example
///
/// ```ignore
/// roos_driver_api::driver_entry!(PIT_DRIVER, DriverRecord {
///     name: "x86-pit",
///     description: "Intel 8253/8254 programmable interval timer",
///     compatible: "x86,x86-pit",
///     version: 1,
///     attach: pit_attach,
/// });
/// ```
#[macro_export]
macro_rules! driver_entry {
    ($name:ident, $entry:expr) => {
        #[used]
        #[unsafe(link_section = ".roos_drivers")]
        static $name: $crate::registration::DriverRecord = $entry;
    };
}
