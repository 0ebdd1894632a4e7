//! Boot-sequence glue.
//!
//! Wires the subsystems together in the one order that makes sense: the
//! device tree must parse before the driver manager can walk it, drivers
//! must attach (registering with ICA/TS/VFS as they go) before the VFS has
//! any mount points, and the VFS must be ready before the disk manager can
//! walk it looking for block devices.

extern crate alloc;

use roos_fdt::Fdt;

use crate::driver_manager;

/// Runs the boot-time sequence: parse `dtb`, walk it attaching drivers, then
/// scan `storage_root` for partitions.
///
/// Never returns on a malformed device tree; a bad magic or truncated blob
/// means nothing past this point can be trusted, so it calls
/// [`crate::panic_fatal`] rather than propagating a `Result` the caller has
/// no path to recover from.
pub fn boot(dtb: &[u8], storage_root: &str) {
    // SAFETY: fdt_error_sink is callable from any context boot() itself runs
    // in; it only ever forwards to the kerr! facade.
    unsafe { roos_fdt::log::set_error_fn(fdt_error_sink) };

    let fdt = match Fdt::parse(dtb) {
        Ok(fdt) => fdt,
        Err(e) => crate::panic_fatal(&alloc::format!("device tree parse failed: {e}")),
    };

    crate::kinfo!("boot: device tree parsed, walking driver attachment graph");
    driver_manager::attach_all(&fdt);

    crate::kinfo!("boot: scanning '{storage_root}' for partitions");
    match roos_diskmgr::scan(storage_root) {
        Ok(count) => crate::kinfo!("boot: disk manager published {count} partition(s)"),
        Err(e) => crate::kerr!("boot: disk manager scan of '{storage_root}' failed: {e}"),
    }
}

fn fdt_error_sink(args: core::fmt::Arguments<'_>) {
    crate::kerr!("device tree: {args}");
}
