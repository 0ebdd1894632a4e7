//! The mount tree: a path-segment tree rooted at `/`, where any node may
//! carry a driver.
//!
//! Grounded on the teacher's singleton-accessor idiom (a lazily-populated
//! global guarded by a spinning lock with explicit accessor functions) but
//! reshaped from a flat `path -> driver` map into a real tree of nodes, so
//! that unregistering a mount point can see whether descendant mounts are
//! still live.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use roos_core::sync::RwLock;

use crate::driver::VfsDriver;
use crate::error::VfsError;

const MAX_SEGMENT_LEN: usize = 255;

struct MountNode {
    children: BTreeMap<String, MountNode>,
    driver: Option<&'static dyn VfsDriver>,
}

impl MountNode {
    const fn new() -> Self {
        Self { children: BTreeMap::new(), driver: None }
    }

    fn subtree_has_driver(&self) -> bool {
        self.driver.is_some() || self.children.values().any(MountNode::subtree_has_driver)
    }
}

struct MountTree {
    root: MountNode,
}

static TREE: RwLock<MountTree> = RwLock::new(MountTree { root: MountNode::new() });

/// An opaque handle returned by [`register`].
///
/// Consumed by value in [`unregister`]; Rust's ownership rules are the
/// mechanism by which "the handle becomes invalid after unregister" is
/// enforced, rather than a runtime sentinel check on a reused value.
#[derive(Debug)]
pub struct MountHandle {
    path: String,
}

fn split_segments(path: &str) -> Result<Vec<&str>, VfsError> {
    if !path.starts_with('/') {
        return Err(VfsError::InvalidPath);
    }
    let mut segments = Vec::new();
    for seg in path.split('/') {
        if seg.is_empty() {
            continue;
        }
        if seg.len() > MAX_SEGMENT_LEN || seg.contains('\0') {
            return Err(VfsError::InvalidPath);
        }
        segments.push(seg);
    }
    Ok(segments)
}

/// Registers `driver` at `path`, creating any missing intermediate
/// directory nodes along the way.
///
/// # Errors
///
/// Returns [`VfsError::InvalidPath`] if `path` is not absolute or contains
/// an over-long or NUL-bearing segment, and [`VfsError::AlreadyMounted`]
/// if the terminal segment already carries a driver.
pub fn register(path: &str, driver: &'static dyn VfsDriver) -> Result<MountHandle, VfsError> {
    let segments = split_segments(path)?;
    let mut tree = TREE.write();
    let mut node = &mut tree.root;
    for seg in &segments {
        node = node.children.entry((*seg).to_string()).or_insert_with(MountNode::new);
    }
    if node.driver.is_some() {
        return Err(VfsError::AlreadyMounted);
    }
    node.driver = Some(driver);
    Ok(MountHandle { path: alloc::format!("/{}", segments.join("/")) })
}

fn navigate_mut<'a>(root: &'a mut MountNode, segments: &[&str]) -> Option<&'a mut MountNode> {
    let mut node = root;
    for seg in segments {
        node = node.children.get_mut(*seg)?;
    }
    Some(node)
}

/// Detaches the mount point identified by `handle`.
///
/// # Errors
///
/// Returns [`VfsError::NotFound`] if the path no longer carries a driver,
/// and [`VfsError::SubtreeNotEmpty`] if a descendant mount is still live.
pub fn unregister(handle: MountHandle) -> Result<(), VfsError> {
    let segments = split_segments(&handle.path)?;
    let mut tree = TREE.write();
    let node = navigate_mut(&mut tree.root, &segments).ok_or(VfsError::NotFound)?;
    if node.driver.is_none() {
        return Err(VfsError::NotFound);
    }
    if node.children.values().any(MountNode::subtree_has_driver) {
        return Err(VfsError::SubtreeNotEmpty);
    }
    node.driver = None;
    Ok(())
}

/// Resolves `path` to the nearest ancestor (or itself) that carries a
/// driver, returning that driver and the remaining path below it.
///
/// # Errors
///
/// Returns [`VfsError::InvalidPath`] if `path` is malformed and
/// [`VfsError::NotFound`] if no mount point covers it.
pub fn resolve(path: &str) -> Result<(&'static dyn VfsDriver, String), VfsError> {
    let segments = split_segments(path)?;
    let tree = TREE.read();

    let mut node = &tree.root;
    let mut best: Option<(&'static dyn VfsDriver, usize)> = tree.root.driver.map(|d| (d, 0));
    for (i, seg) in segments.iter().enumerate() {
        match node.children.get(*seg) {
            Some(child) => {
                node = child;
                if let Some(driver) = node.driver {
                    best = Some((driver, i + 1));
                }
            }
            None => break,
        }
    }

    let (driver, consumed) = best.ok_or(VfsError::NotFound)?;
    Ok((driver, segments[consumed..].join("/")))
}

/// Reports whether `path` itself carries a driver, as opposed to being a
/// bare directory node in the mount tree.
///
/// # Errors
///
/// Returns [`VfsError::NotFound`] if `path` does not exist in the tree.
pub fn is_mount_point(path: &str) -> Result<bool, VfsError> {
    let segments = split_segments(path)?;
    let tree = TREE.read();
    let mut node = &tree.root;
    for seg in &segments {
        node = node.children.get(*seg).ok_or(VfsError::NotFound)?;
    }
    Ok(node.driver.is_some())
}

/// Lists the names of `path`'s immediate children in the mount tree.
///
/// A tree-native operation distinct from `readdir`, which forwards through
/// a mounted driver; used by the disk manager to enumerate block-device
/// mount points under a directory like `/dev/storage` that is itself
/// unmounted.
///
/// # Errors
///
/// Returns [`VfsError::NotFound`] if `path` does not exist in the tree.
pub fn list_children(path: &str) -> Result<Vec<String>, VfsError> {
    let segments = split_segments(path)?;
    let tree = TREE.read();
    let mut node = &tree.root;
    for seg in &segments {
        node = node.children.get(*seg).ok_or(VfsError::NotFound)?;
    }
    Ok(node.children.keys().cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DirEntry, DriverHandle};
    use crate::ioctl::{IoctlArg, IoctlCode};

    struct StubDriver;
    impl VfsDriver for StubDriver {
        fn open(&self, _remainder: &str, _flags: u32, _mode: u32) -> Result<DriverHandle, VfsError> {
            Ok(DriverHandle::new(1))
        }
        fn close(&self, _handle: DriverHandle) -> Result<(), VfsError> {
            Ok(())
        }
        fn read(&self, _handle: DriverHandle, _buf: &mut [u8]) -> Result<usize, VfsError> {
            Ok(0)
        }
        fn write(&self, _handle: DriverHandle, _buf: &[u8]) -> Result<usize, VfsError> {
            Ok(0)
        }
        fn readdir(&self, _handle: DriverHandle, _index: usize) -> Result<Option<DirEntry>, VfsError> {
            Ok(None)
        }
        fn ioctl(&self, _handle: DriverHandle, _code: IoctlCode, _arg: IoctlArg) -> Result<i64, VfsError> {
            Ok(0)
        }
    }

    static STUB: StubDriver = StubDriver;

    #[test]
    fn register_rejects_relative_path() {
        assert_eq!(register("rel/path", &STUB), Err(VfsError::InvalidPath));
    }

    #[test]
    fn register_then_resolve_finds_exact_mount() {
        register("/tree-test/a", &STUB).unwrap();
        let (_, remainder) = resolve("/tree-test/a").unwrap();
        assert_eq!(remainder, "");
        let handle = register("/tree-test/a-again", &STUB).unwrap();
        unregister(handle).unwrap();
    }

    #[test]
    fn register_duplicate_terminal_segment_fails() {
        let handle = register("/tree-test/dup", &STUB).unwrap();
        assert_eq!(register("/tree-test/dup", &STUB), Err(VfsError::AlreadyMounted));
        unregister(handle).unwrap();
    }

    #[test]
    fn resolve_strips_prefix_into_remainder() {
        let handle = register("/tree-test/mnt", &STUB).unwrap();
        let (_, remainder) = resolve("/tree-test/mnt/sub/file").unwrap();
        assert_eq!(remainder, "sub/file");
        unregister(handle).unwrap();
    }

    #[test]
    fn resolve_with_no_mount_point_fails() {
        assert_eq!(resolve("/tree-test/nowhere-mounted"), Err(VfsError::NotFound));
    }

    #[test]
    fn unregister_fails_with_live_descendant() {
        let parent = register("/tree-test/parent", &STUB).unwrap();
        register("/tree-test/parent/child", &STUB).unwrap();
        assert_eq!(unregister(parent), Err(VfsError::SubtreeNotEmpty));
    }

    #[test]
    fn is_mount_point_distinguishes_driver_from_directory() {
        register("/tree-test/kind/leaf", &STUB).unwrap();
        assert_eq!(is_mount_point("/tree-test/kind/leaf"), Ok(true));
        assert_eq!(is_mount_point("/tree-test/kind"), Ok(false));
        assert_eq!(is_mount_point("/tree-test/kind/missing"), Err(VfsError::NotFound));
    }

    #[test]
    fn list_children_enumerates_mount_tree_siblings() {
        register("/tree-test/siblings/one", &STUB).unwrap();
        register("/tree-test/siblings/two", &STUB).unwrap();
        let mut names = list_children("/tree-test/siblings").unwrap();
        names.sort();
        assert_eq!(names, alloc::vec!["one".to_string(), "two".to_string()]);
    }
}
