//! Driver Manager (DM).
//!
//! Walks a parsed device tree depth-first pre-order starting at the root,
//! matching each node's `compatible` property against the link-time driver
//! table and calling the first match's `attach`. A node whose `status`
//! property is present and not `"okay"` is skipped along with its subtree.

use roos_driver_api::registration::DriverRecord;
use roos_fdt::{DtNode, Fdt};

#[cfg(not(test))]
mod linkset {
    use roos_driver_api::registration::DriverRecord;

    unsafe extern "C" {
        static __roos_drivers_start: u8;
        static __roos_drivers_end: u8;
    }

    /// Returns the driver records placed into the `.roos_drivers` linker
    /// section, in link order.
    pub fn driver_records() -> &'static [DriverRecord] {
        // SAFETY: the linker script defines these symbols bracketing a
        // densely packed array of `DriverRecord`s.
        unsafe {
            let start = core::ptr::addr_of!(__roos_drivers_start).cast::<DriverRecord>();
            let end = core::ptr::addr_of!(__roos_drivers_end).cast::<DriverRecord>();
            let count = end.offset_from(start) as usize;
            if count == 0 {
                return &[];
            }
            core::slice::from_raw_parts(start, count)
        }
    }
}


/// Walks `fdt` and attaches drivers from the link-time driver table.
pub fn attach_all(fdt: &Fdt) {
    attach_all_with(fdt, linkset::driver_records());
}

/// Walks `fdt` and attaches drivers from `records`, in registration order.
///
/// Exposed separately from [`attach_all`] so the matching logic can be
/// exercised without a linker-provided driver section.
pub fn attach_all_with(fdt: &Fdt, records: &[DriverRecord]) {
    walk(fdt.root(), records);
}

fn walk(node: DtNode, records: &[DriverRecord]) {
    if let Some(status) = node.property("status") {
        if status.as_str() != Some("okay") {
            return;
        }
    }

    if let Some(compatible) = node.property("compatible") {
        if let Some(name) = compatible.as_str() {
            try_attach(&node, name, records);
        }
    }

    for child in node.children() {
        walk(child, records);
    }
}

fn try_attach(node: &DtNode, compatible: &str, records: &[DriverRecord]) {
    match records.iter().find(|r| r.compatible == compatible) {
        Some(record) => match (record.attach)(node) {
            Ok(()) => crate::kinfo!("driver manager: '{}' attached to '{}'", record.name, node.name()),
            Err(e) => crate::kerr!(
                "driver manager: '{}' attach failed on '{}': {e}",
                record.name,
                node.name()
            ),
        },
        None => crate::kerr!(
            "driver manager: no driver matches compatible \"{compatible}\" on node '{}'",
            node.name()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};
    use roos_driver_api::driver::DriverError;

    extern crate alloc;
    use alloc::vec::Vec as StdVec;

    fn be32(val: u32) -> [u8; 4] {
        val.to_be_bytes()
    }

    const FDT_BEGIN_NODE: u32 = 1;
    const FDT_END_NODE: u32 = 2;
    const FDT_PROP: u32 = 3;
    const FDT_END: u32 = 9;
    const FDT_MAGIC: u32 = 0xd00d_feed;

    fn pad4(v: &mut StdVec<u8>) {
        while v.len() % 4 != 0 {
            v.push(0);
        }
    }

    fn emit_begin_node(v: &mut StdVec<u8>, name: &str) {
        v.extend_from_slice(&be32(FDT_BEGIN_NODE));
        v.extend_from_slice(name.as_bytes());
        v.push(0);
        pad4(v);
    }

    fn emit_end_node(v: &mut StdVec<u8>) {
        v.extend_from_slice(&be32(FDT_END_NODE));
    }

    fn emit_prop(v: &mut StdVec<u8>, name_offset: u32, data: &[u8]) {
        v.extend_from_slice(&be32(FDT_PROP));
        v.extend_from_slice(&be32(data.len() as u32));
        v.extend_from_slice(&be32(name_offset));
        v.extend_from_slice(data);
        pad4(v);
    }

    fn build_strings(names: &[&str]) -> (StdVec<u8>, StdVec<u32>) {
        let mut block = StdVec::new();
        let mut offsets = StdVec::new();
        for name in names {
            offsets.push(block.len() as u32);
            block.extend_from_slice(name.as_bytes());
            block.push(0);
        }
        (block, offsets)
    }

    fn build_dtb(struct_block: &[u8], strings_block: &[u8]) -> StdVec<u8> {
        let header_size = 40u32;
        let mem_rsv_off = header_size;
        let rsv_size = 16;
        let struct_off = mem_rsv_off as usize + rsv_size;
        let strings_off = struct_off + struct_block.len();
        let total_size = strings_off + strings_block.len();

        let mut dtb = StdVec::with_capacity(total_size);
        dtb.extend_from_slice(&be32(FDT_MAGIC));
        dtb.extend_from_slice(&be32(total_size as u32));
        dtb.extend_from_slice(&be32(struct_off as u32));
        dtb.extend_from_slice(&be32(strings_off as u32));
        dtb.extend_from_slice(&be32(mem_rsv_off));
        dtb.extend_from_slice(&be32(17));
        dtb.extend_from_slice(&be32(16));
        dtb.extend_from_slice(&be32(0));
        dtb.extend_from_slice(&be32(strings_block.len() as u32));
        dtb.extend_from_slice(&be32(struct_block.len() as u32));
        dtb.extend_from_slice(&0u64.to_be_bytes());
        dtb.extend_from_slice(&0u64.to_be_bytes());
        dtb.extend_from_slice(struct_block);
        dtb.extend_from_slice(strings_block);
        dtb
    }

    static ATTACH_COUNT: AtomicU32 = AtomicU32::new(0);

    fn ok_attach(_node: &DtNode) -> Result<(), DriverError> {
        ATTACH_COUNT.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn failing_attach(_node: &DtNode) -> Result<(), DriverError> {
        Err(DriverError::InitFailed)
    }

    #[test]
    fn attaches_first_matching_driver_once() {
        ATTACH_COUNT.store(0, Ordering::Relaxed);
        let (strings, off) = build_strings(&["compatible"]);
        let mut st = StdVec::new();
        emit_begin_node(&mut st, "");
        emit_begin_node(&mut st, "timer@0");
        emit_prop(&mut st, off[0], b"x86,x86-pit\0");
        emit_end_node(&mut st);
        emit_end_node(&mut st);
        st.extend_from_slice(&be32(FDT_END));
        let dtb = build_dtb(&st, &strings);
        let fdt = Fdt::parse(&dtb).unwrap();

        let records = [DriverRecord {
            name: "x86-pit",
            description: "test pit",
            compatible: "x86,x86-pit",
            version: 1,
            attach: ok_attach,
        }];
        attach_all_with(&fdt, &records);
        assert_eq!(ATTACH_COUNT.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn skips_node_with_non_okay_status() {
        ATTACH_COUNT.store(0, Ordering::Relaxed);
        let (strings, off) = build_strings(&["compatible", "status"]);
        let mut st = StdVec::new();
        emit_begin_node(&mut st, "");
        emit_begin_node(&mut st, "disabled-dev");
        emit_prop(&mut st, off[0], b"x86,x86-pit\0");
        emit_prop(&mut st, off[1], b"disabled\0");
        emit_end_node(&mut st);
        emit_end_node(&mut st);
        st.extend_from_slice(&be32(FDT_END));
        let dtb = build_dtb(&st, &strings);
        let fdt = Fdt::parse(&dtb).unwrap();

        let records = [DriverRecord {
            name: "x86-pit",
            description: "test pit",
            compatible: "x86,x86-pit",
            version: 1,
            attach: ok_attach,
        }];
        attach_all_with(&fdt, &records);
        assert_eq!(ATTACH_COUNT.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn attach_failure_does_not_stop_the_walk() {
        ATTACH_COUNT.store(0, Ordering::Relaxed);
        let (strings, off) = build_strings(&["compatible"]);
        let mut st = StdVec::new();
        emit_begin_node(&mut st, "");
        emit_begin_node(&mut st, "bad");
        emit_prop(&mut st, off[0], b"x86,bad\0");
        emit_end_node(&mut st);
        emit_begin_node(&mut st, "good");
        emit_prop(&mut st, off[0], b"x86,x86-pit\0");
        emit_end_node(&mut st);
        emit_end_node(&mut st);
        st.extend_from_slice(&be32(FDT_END));
        let dtb = build_dtb(&st, &strings);
        let fdt = Fdt::parse(&dtb).unwrap();

        let records = [
            DriverRecord {
                name: "x86-bad",
                description: "fails",
                compatible: "x86,bad",
                version: 1,
                attach: failing_attach,
            },
            DriverRecord {
                name: "x86-pit",
                description: "test pit",
                compatible: "x86,x86-pit",
                version: 1,
                attach: ok_attach,
            },
        ];
        attach_all_with(&fdt, &records);
        assert_eq!(ATTACH_COUNT.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn no_matching_driver_does_not_attach() {
        ATTACH_COUNT.store(0, Ordering::Relaxed);
        let (strings, off) = build_strings(&["compatible"]);
        let mut st = StdVec::new();
        emit_begin_node(&mut st, "");
        emit_begin_node(&mut st, "unknown");
        emit_prop(&mut st, off[0], b"vendor,unknown\0");
        emit_end_node(&mut st);
        emit_end_node(&mut st);
        st.extend_from_slice(&be32(FDT_END));
        let dtb = build_dtb(&st, &strings);
        let fdt = Fdt::parse(&dtb).unwrap();

        attach_all_with(&fdt, &[]);
        assert_eq!(ATTACH_COUNT.load(Ordering::Relaxed), 0);
    }
}
