//! Node identifiers and the borrowed node view returned by the public API.

use crate::Fdt;
use crate::property::FdtProperty;
use roos_core::cell::RacyCell;

extern crate alloc;
use alloc::vec::Vec;

/// Index of a node within an [`Fdt`]'s arena.
///
/// Node zero is always the root. Arena order is depth-first pre-order
/// (a node is inserted before any of its children or siblings), matching
/// the driver manager's walk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Owned storage for one node, held in the arena.
pub(crate) struct NodeData<'a> {
    pub(crate) name: &'a str,
    pub(crate) addr_cells: u32,
    pub(crate) size_cells: u32,
    pub(crate) parent: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
    pub(crate) properties: Vec<FdtProperty<'a>>,
    pub(crate) device_data: RacyCell<Option<*mut ()>>,
}

// SAFETY: device_data is only ever written once, by a single attach
// callback, before the node is shared across CPUs; all other fields are
// immutable after parse.
unsafe impl Send for NodeData<'_> {}
unsafe impl Sync for NodeData<'_> {}

/// A borrowed view of one device-tree node.
///
/// Cheap to copy; holds a reference back to the owning [`Fdt`] rather than
/// its own data.
#[derive(Clone, Copy)]
pub struct DtNode<'a, 'f> {
    pub(crate) fdt: &'f Fdt<'a>,
    pub(crate) id: NodeId,
}

impl<'a, 'f> DtNode<'a, 'f> {
    pub(crate) fn new(fdt: &'f Fdt<'a>, id: NodeId) -> Self {
        Self { fdt, id }
    }

    fn data(&self) -> &'f NodeData<'a> {
        &self.fdt.nodes[self.id.idx()]
    }

    /// This node's identifier, stable for the lifetime of the [`Fdt`].
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node's name, e.g. `"memory@80000000"`, or `""` for the root.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.data().name
    }

    /// `#address-cells` in effect for this node's own children.
    #[must_use]
    pub fn addr_cells(&self) -> u32 {
        self.data().addr_cells
    }

    /// `#size-cells` in effect for this node's own children.
    #[must_use]
    pub fn size_cells(&self) -> u32 {
        self.data().size_cells
    }

    /// Returns an iterator over this node's properties, in declaration
    /// order.
    #[must_use]
    pub fn properties(&self) -> impl Iterator<Item = FdtProperty<'a>> + 'f {
        self.data().properties.iter().copied()
    }

    /// Looks up a property by exact name.
    ///
    /// Returns `None` if the property is absent; returns
    /// `Some(property)` (possibly with zero-length data) if present, so
    /// callers can tell "absent" from "present but empty".
    #[must_use]
    pub fn property(&self, name: &str) -> Option<FdtProperty<'a>> {
        self.data().properties.iter().copied().find(|p| p.name() == name)
    }

    /// Returns this node's parent, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<DtNode<'a, 'f>> {
        self.data().parent.map(|id| DtNode::new(self.fdt, id))
    }

    /// Returns this node's first child, or `None` if it has none.
    #[must_use]
    pub fn first_child(&self) -> Option<DtNode<'a, 'f>> {
        self.data().first_child.map(|id| DtNode::new(self.fdt, id))
    }

    /// Returns this node's next sibling, or `None` if it is the last child
    /// of its parent.
    #[must_use]
    pub fn next_sibling(&self) -> Option<DtNode<'a, 'f>> {
        self.data().next_sibling.map(|id| DtNode::new(self.fdt, id))
    }

    /// Returns an iterator over this node's direct children.
    #[must_use]
    pub fn children(&self) -> ChildIter<'a, 'f> {
        ChildIter {
            next: self.first_child(),
        }
    }

    /// Finds a direct child by exact name.
    #[must_use]
    pub fn find_child(&self, name: &str) -> Option<DtNode<'a, 'f>> {
        self.children().find(|n| n.name() == name)
    }

    /// Stores an opaque, driver-defined payload pointer on this node.
    ///
    /// Intended to be called at most once, from a driver's `attach`
    /// callback. The node owner is responsible for the pointee's lifetime
    /// and for downcasting it back to the correct type on retrieval.
    pub fn set_device_data(&self, ptr: *mut ()) {
        // SAFETY: attach callbacks run single-threaded during the boot
        // walk; no concurrent access to this slot is possible yet.
        unsafe {
            *self.data().device_data.get() = Some(ptr);
        }
    }

    /// Retrieves the opaque payload pointer previously stored with
    /// [`set_device_data`](Self::set_device_data), if any.
    #[must_use]
    pub fn device_data(&self) -> Option<*mut ()> {
        // SAFETY: reads are only racy with a concurrent `set_device_data`,
        // which the boot-time attach contract forbids.
        unsafe { *self.data().device_data.get() }
    }
}

impl PartialEq for DtNode<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Iterator over the direct children of a [`DtNode`].
pub struct ChildIter<'a, 'f> {
    next: Option<DtNode<'a, 'f>>,
}

impl<'a, 'f> Iterator for ChildIter<'a, 'f> {
    type Item = DtNode<'a, 'f>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next;
        self.next = current.and_then(|n| n.next_sibling());
        current
    }
}
