//! `roos-fdt` — a flattened device tree (DTB) parser.
//!
//! Parses a DTB blob in one pass into an arena of nodes with inherited
//! `#address-cells`/`#size-cells` tracking, a phandle table, and memory /
//! reserved-memory region lists. Unlike a zero-copy parser, nodes are
//! arena-owned so that a driver's `attach` callback can stash an opaque
//! device-data pointer on the node it claimed and have later lookups (by
//! phandle or by direct reference) see it.
//!
//! ```ignore
//! let fdt = Fdt::parse(dtb_bytes)?;
//! let soc = fdt.lookup_node_by_name("soc").unwrap();
//! let freq = soc.property("freq").and_then(|p| p.as_u32());
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod error;
pub mod header;
pub mod log;
pub mod memory;
pub mod node;
pub mod property;

pub use error::FdtError;
pub use memory::MemRegion;
pub use node::{DtNode, NodeId};
pub use property::{FdtProperty, StrListIter};

use alloc::vec::Vec;
use roos_core::cell::RacyCell;

use header::{FDT_MAGIC, FdtHeader};
use memory::decode_reg;
use node::NodeData;

const FDT_BEGIN_NODE: u32 = 0x0000_0001;
const FDT_END_NODE: u32 = 0x0000_0002;
const FDT_PROP: u32 = 0x0000_0003;
const FDT_NOP: u32 = 0x0000_0004;
const FDT_END: u32 = 0x0000_0009;

fn read_be32_at(data: &[u8], offset: usize) -> Option<u32> {
    let bytes: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

fn read_be64_at(data: &[u8], offset: usize) -> Option<u64> {
    let bytes: [u8; 8] = data.get(offset..offset + 8)?.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

fn align4(offset: usize) -> usize {
    (offset + 3) & !3
}

fn str_from_offset(data: &[u8], offset: usize) -> Option<&str> {
    let bytes = data.get(offset..)?;
    let end = bytes.iter().position(|&b| b == 0)?;
    core::str::from_utf8(&bytes[..end]).ok()
}

/// A parsed flattened device tree, owning its node arena for the life of
/// the borrowed input buffer.
pub struct Fdt<'a> {
    nodes: Vec<NodeData<'a>>,
    phandles: Vec<(u32, NodeId)>,
    memory_regions: Vec<MemRegion>,
    reserved_regions: Vec<MemRegion>,
    boot_cpuid: u32,
}

struct StackEntry {
    id: NodeId,
    addr_cells: u32,
    size_cells: u32,
    last_child: Option<NodeId>,
}

impl<'a> Fdt<'a> {
    /// Parses a DTB blob from raw bytes.
    ///
    /// A bad magic number is the one condition the rest of the kernel
    /// treats as fatal; this function still returns it as an ordinary
    /// error so boot glue can choose how to report it before panicking.
    ///
    /// # Errors
    ///
    /// Returns [`FdtError`] if the blob is truncated, has an unrecognized
    /// magic, or its structure block is malformed.
    pub fn parse(data: &'a [u8]) -> Result<Self, FdtError> {
        let hdr = FdtHeader::read(data)?;
        if hdr.magic != FDT_MAGIC {
            return Err(FdtError::InvalidMagic);
        }

        let total_size = hdr.total_size as usize;
        if data.len() < total_size {
            return Err(FdtError::TruncatedData);
        }

        let struct_off = hdr.off_struct as usize;
        let struct_end = struct_off
            .checked_add(hdr.size_struct as usize)
            .ok_or(FdtError::InvalidStructure)?;
        let strings_off = hdr.off_strings as usize;
        let strings_end = strings_off
            .checked_add(hdr.size_strings as usize)
            .ok_or(FdtError::InvalidStructure)?;
        if struct_end > total_size || strings_end > total_size {
            return Err(FdtError::TruncatedData);
        }

        let struct_block = &data[struct_off..struct_end];
        let strings_block = &data[strings_off..strings_end];

        let mut fdt = Fdt {
            nodes: Vec::new(),
            phandles: Vec::new(),
            memory_regions: Vec::new(),
            reserved_regions: Vec::new(),
            boot_cpuid: hdr.boot_cpuid,
        };

        fdt.parse_structure(struct_block, strings_block)?;
        fdt.parse_mem_rsvmap(&data[hdr.off_mem_rsvmap as usize..struct_off.min(data.len())]);

        Ok(fdt)
    }

    fn parse_structure(&mut self, struct_block: &'a [u8], strings_block: &'a [u8]) -> Result<(), FdtError> {
        let mut stack: Vec<StackEntry> = Vec::new();
        let mut offset = 0usize;

        loop {
            let tag = read_be32_at(struct_block, offset).ok_or(FdtError::InvalidStructure)?;
            offset += 4;

            match tag {
                FDT_BEGIN_NODE => {
                    let name = str_from_offset(struct_block, offset).ok_or(FdtError::InvalidStructure)?;
                    offset = align4(offset + name.len() + 1);

                    let parent = stack.last().map(|e| e.id);
                    let (addr_cells, size_cells) = stack
                        .last()
                        .map(|e| (e.addr_cells, e.size_cells))
                        .unwrap_or((2, 1));

                    let id = NodeId(self.nodes.len() as u32);
                    self.nodes.push(NodeData {
                        name,
                        addr_cells,
                        size_cells,
                        parent,
                        first_child: None,
                        next_sibling: None,
                        properties: Vec::new(),
                        device_data: RacyCell::new(None),
                    });

                    if let Some(top) = stack.last_mut() {
                        if let Some(last) = top.last_child {
                            self.nodes[last.idx()].next_sibling = Some(id);
                        } else {
                            self.nodes[top.id.idx()].first_child = Some(id);
                        }
                        top.last_child = Some(id);
                    }

                    stack.push(StackEntry {
                        id,
                        addr_cells,
                        size_cells,
                        last_child: None,
                    });
                }
                FDT_END_NODE => {
                    stack.pop().ok_or(FdtError::InvalidStructure)?;
                    if stack.is_empty() {
                        // Root's END_NODE; only FDT_END may follow.
                    }
                }
                FDT_PROP => {
                    let len = read_be32_at(struct_block, offset).ok_or(FdtError::InvalidStructure)? as usize;
                    let nameoff = read_be32_at(struct_block, offset + 4).ok_or(FdtError::InvalidStructure)? as usize;
                    let data_start = offset + 8;
                    let data_end = data_start.checked_add(len).ok_or(FdtError::InvalidStructure)?;
                    let data = struct_block
                        .get(data_start..data_end)
                        .ok_or(FdtError::InvalidStructure)?;
                    offset = align4(data_end);

                    let name = str_from_offset(strings_block, nameoff).ok_or(FdtError::InvalidStructure)?;
                    let current = stack.last_mut().ok_or(FdtError::InvalidStructure)?;
                    let current_id = current.id;

                    if name == "#address-cells" {
                        if let Some(v) = read_be32_at(data, 0) {
                            current.addr_cells = v;
                            self.nodes[current_id.idx()].addr_cells = v;
                        } else {
                            crate::log_error!("truncated #address-cells property, keeping inherited value {}", current.addr_cells);
                        }
                    } else if name == "#size-cells" {
                        if let Some(v) = read_be32_at(data, 0) {
                            current.size_cells = v;
                            self.nodes[current_id.idx()].size_cells = v;
                        } else {
                            crate::log_error!("truncated #size-cells property, keeping inherited value {}", current.size_cells);
                        }
                    } else if name == "phandle" || name == "linux,phandle" {
                        if let Some(v) = read_be32_at(data, 0) {
                            self.phandles.push((v, current_id));
                        }
                    } else if name == "reg" {
                        self.collect_reg(&stack, current_id, data);
                    }

                    self.nodes[current_id.idx()].properties.push(FdtProperty::new(name, data));
                }
                FDT_NOP => {}
                FDT_END => {
                    if !stack.is_empty() {
                        return Err(FdtError::InvalidStructure);
                    }
                    return Ok(());
                }
                _ => return Err(FdtError::InvalidStructure),
            }
        }
    }

    /// Interprets a `reg` property as memory or reserved-memory regions if
    /// the owning node's name/parent-name match the special conventions.
    fn collect_reg(&mut self, stack: &[StackEntry], current_id: NodeId, data: &[u8]) {
        let Some(parent_entry) = stack.get(stack.len().wrapping_sub(2)) else {
            return;
        };
        let name = self.nodes[current_id.idx()].name;
        let is_memory = name == "memory" || name.starts_with("memory@");
        let parent_name = self.nodes[parent_entry.id.idx()].name;
        let is_reserved_child = parent_name == "reserved-memory";

        if !is_memory && !is_reserved_child {
            return;
        }

        let regions = decode_reg(data, parent_entry.addr_cells, parent_entry.size_cells);
        if is_memory {
            self.memory_regions.extend(regions);
        } else {
            self.reserved_regions.extend(regions);
        }
    }

    fn parse_mem_rsvmap(&mut self, data: &[u8]) {
        let mut offset = 0usize;
        loop {
            let Some(base) = read_be64_at(data, offset) else { return };
            let Some(size) = read_be64_at(data, offset + 8) else { return };
            if base == 0 && size == 0 {
                return;
            }
            self.reserved_regions.push(MemRegion { base, size });
            offset += 16;
        }
    }

    /// Returns the root node.
    #[must_use]
    pub fn root(&self) -> DtNode<'a, '_> {
        DtNode::new(self, NodeId(0))
    }

    /// Finds the first node (depth-first pre-order, root first) with the
    /// given exact name.
    ///
    /// Matches the driver manager's walk order, so "first match wins" is
    /// identical whether observed through this lookup or through the
    /// manager's own traversal.
    #[must_use]
    pub fn lookup_node_by_name(&self, name: &str) -> Option<DtNode<'a, '_>> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(|idx| DtNode::new(self, NodeId(idx as u32)))
    }

    /// Resolves a phandle value to its node.
    #[must_use]
    pub fn lookup_node_by_phandle(&self, phandle: u32) -> Option<DtNode<'a, '_>> {
        self.phandles
            .iter()
            .find(|(p, _)| *p == phandle)
            .map(|(_, id)| DtNode::new(self, *id))
    }

    /// Returns an iterator over the `memory@...` regions declared in the
    /// tree.
    #[must_use]
    pub fn memory_regions(&self) -> impl Iterator<Item = MemRegion> + '_ {
        self.memory_regions.iter().copied()
    }

    /// Returns an iterator over the reserved-memory regions, combining
    /// `reserved-memory` child-node entries and the header's
    /// memory-reservation block.
    #[must_use]
    pub fn reserved_regions(&self) -> impl Iterator<Item = MemRegion> + '_ {
        self.reserved_regions.iter().copied()
    }

    /// Returns the physical ID of the boot CPU.
    #[must_use]
    pub fn boot_cpuid(&self) -> u32 {
        self.boot_cpuid
    }

    /// Returns the total number of nodes parsed.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec as StdVec;

    fn be32(val: u32) -> [u8; 4] {
        val.to_be_bytes()
    }

    fn be64(val: u64) -> [u8; 8] {
        val.to_be_bytes()
    }

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

    fn emit_end(v: &mut StdVec<u8>) {
        v.extend_from_slice(&be32(FDT_END));
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

    fn build_dtb(
        struct_block: &[u8],
        strings_block: &[u8],
        reservations: &[(u64, u64)],
        boot_cpuid: u32,
    ) -> StdVec<u8> {
        let header_size = 40u32;
        let mem_rsv_off = header_size;
        let rsv_size = (reservations.len() + 1) * 16;
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
        dtb.extend_from_slice(&be32(boot_cpuid));
        dtb.extend_from_slice(&be32(strings_block.len() as u32));
        dtb.extend_from_slice(&be32(struct_block.len() as u32));

        for &(addr, size) in reservations {
            dtb.extend_from_slice(&be64(addr));
            dtb.extend_from_slice(&be64(size));
        }
        dtb.extend_from_slice(&be64(0));
        dtb.extend_from_slice(&be64(0));

        dtb.extend_from_slice(struct_block);
        dtb.extend_from_slice(strings_block);
        dtb
    }

    /// `/ { model="test-board"; soc { compatible="x86,x86-pit\0"; freq=<10000>; }; }`
    fn build_basic_dtb() -> StdVec<u8> {
        let (strings, off) = build_strings(&["model", "compatible", "freq"]);
        let mut st = StdVec::new();
        emit_begin_node(&mut st, "");
        emit_prop(&mut st, off[0], b"test-board\0");
        emit_begin_node(&mut st, "soc");
        emit_prop(&mut st, off[1], b"x86,x86-pit\0");
        emit_prop(&mut st, off[2], &be32(0x0000_2710));
        emit_end_node(&mut st);
        emit_end_node(&mut st);
        emit_end(&mut st);
        build_dtb(&st, &strings, &[], 0)
    }

    #[test]
    fn s1_property_retrieval() {
        let dtb = build_basic_dtb();
        let fdt = Fdt::parse(&dtb).unwrap();
        let soc = fdt.lookup_node_by_name("soc").unwrap();
        let freq = soc.property("freq").unwrap();
        assert_eq!(freq.data(), &[0x00, 0x00, 0x27, 0x10]);
        assert_eq!(freq.len(), 4);
        assert_eq!(freq.as_u32(), Some(10000));
    }

    #[test]
    fn bad_magic_rejected() {
        let mut dtb = build_basic_dtb();
        dtb[0] = 0;
        assert!(matches!(Fdt::parse(&dtb), Err(FdtError::InvalidMagic)));
    }

    #[test]
    fn truncated_rejected() {
        let dtb = build_basic_dtb();
        assert!(Fdt::parse(&dtb[..20]).is_err());
    }

    #[test]
    fn cells_inheritance_overrides_for_later_children_only() {
        let (strings, off) = build_strings(&["#address-cells", "#size-cells", "reg"]);
        let mut st = StdVec::new();
        emit_begin_node(&mut st, "");
        emit_begin_node(&mut st, "before");
        emit_end_node(&mut st);
        emit_prop(&mut st, off[0], &be32(2));
        emit_prop(&mut st, off[1], &be32(2));
        emit_begin_node(&mut st, "after");
        emit_end_node(&mut st);
        emit_end_node(&mut st);
        emit_end(&mut st);
        let dtb = build_dtb(&st, &strings, &[], 0);
        let fdt = Fdt::parse(&dtb).unwrap();

        let before = fdt.root().find_child("before").unwrap();
        let after = fdt.root().find_child("after").unwrap();
        assert_eq!(before.addr_cells(), 2);
        assert_eq!(after.addr_cells(), 2);
        assert_eq!(fdt.root().addr_cells(), 2);
    }

    #[test]
    fn phandle_bijection() {
        let (strings, off) = build_strings(&["phandle"]);
        let mut st = StdVec::new();
        emit_begin_node(&mut st, "");
        emit_begin_node(&mut st, "gic");
        emit_prop(&mut st, off[0], &be32(7));
        emit_end_node(&mut st);
        emit_end_node(&mut st);
        emit_end(&mut st);
        let dtb = build_dtb(&st, &strings, &[], 0);
        let fdt = Fdt::parse(&dtb).unwrap();
        let node = fdt.lookup_node_by_phandle(7).unwrap();
        assert_eq!(node.name(), "gic");
        assert!(fdt.lookup_node_by_phandle(8).is_none());
    }

    #[test]
    fn memory_node_regions() {
        let (strings, off) = build_strings(&["reg"]);
        let mut st = StdVec::new();
        emit_begin_node(&mut st, "");
        emit_begin_node(&mut st, "memory@80000000");
        let mut reg = StdVec::new();
        reg.extend_from_slice(&be32(0x8000_0000));
        reg.extend_from_slice(&be32(0x1000_0000));
        emit_prop(&mut st, off[0], &reg);
        emit_end_node(&mut st);
        emit_end_node(&mut st);
        emit_end(&mut st);
        let dtb = build_dtb(&st, &strings, &[], 0);
        let fdt = Fdt::parse(&dtb).unwrap();
        let regions: StdVec<MemRegion> = fdt.memory_regions().collect();
        assert_eq!(regions, [MemRegion { base: 0x8000_0000, size: 0x1000_0000 }]);
    }

    #[test]
    fn reserved_memory_child_regions() {
        let (strings, off) = build_strings(&["reg"]);
        let mut st = StdVec::new();
        emit_begin_node(&mut st, "");
        emit_begin_node(&mut st, "reserved-memory");
        emit_begin_node(&mut st, "framebuffer@a0000");
        let mut reg = StdVec::new();
        reg.extend_from_slice(&be32(0xa_0000));
        reg.extend_from_slice(&be32(0x1_0000));
        emit_prop(&mut st, off[0], &reg);
        emit_end_node(&mut st);
        emit_end_node(&mut st);
        emit_end_node(&mut st);
        emit_end(&mut st);
        let dtb = build_dtb(&st, &strings, &[], 0);
        let fdt = Fdt::parse(&dtb).unwrap();
        let regions: StdVec<MemRegion> = fdt.reserved_regions().collect();
        assert_eq!(regions, [MemRegion { base: 0xa_0000, size: 0x1_0000 }]);
    }

    #[test]
    fn header_reservations_merge_with_reserved_memory() {
        let dtb = build_dtb(&{
            let mut st = StdVec::new();
            emit_begin_node(&mut st, "");
            emit_end_node(&mut st);
            emit_end(&mut st);
            st
        }, &[], &[(0x1000, 0x2000)], 0);
        let fdt = Fdt::parse(&dtb).unwrap();
        let regions: StdVec<MemRegion> = fdt.reserved_regions().collect();
        assert_eq!(regions, [MemRegion { base: 0x1000, size: 0x2000 }]);
    }

    #[test]
    fn device_data_roundtrip() {
        let dtb = build_basic_dtb();
        let fdt = Fdt::parse(&dtb).unwrap();
        let soc = fdt.lookup_node_by_name("soc").unwrap();
        assert!(soc.device_data().is_none());
        let mut payload = 42u32;
        soc.set_device_data(core::ptr::addr_of_mut!(payload).cast());
        let got = soc.device_data().unwrap();
        assert_eq!(unsafe { *got.cast::<u32>() }, 42);
    }

    #[test]
    fn lookup_by_name_is_preorder() {
        let (strings, _) = build_strings(&[]);
        let mut st = StdVec::new();
        emit_begin_node(&mut st, "");
        emit_begin_node(&mut st, "a");
        emit_begin_node(&mut st, "target");
        emit_end_node(&mut st);
        emit_end_node(&mut st);
        emit_begin_node(&mut st, "target");
        emit_end_node(&mut st);
        emit_end_node(&mut st);
        emit_end(&mut st);
        let dtb = build_dtb(&st, &strings, &[], 0);
        let fdt = Fdt::parse(&dtb).unwrap();
        let found = fdt.lookup_node_by_name("target").unwrap();
        // The first "target" in preorder is the nested one under "a".
        assert_eq!(found.parent().unwrap().name(), "a");
    }
}
