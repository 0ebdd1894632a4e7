//! Virtual File System (VFS) core: a mount tree of path-segment nodes, a
//! file-descriptor table, and the flat ioctl namespace drivers are called
//! through.
//!
//! A mount point is a tree node carrying a `&'static dyn VfsDriver`. Path
//! resolution walks from the root, remembering the deepest node with a
//! driver, and strips that prefix before handing the remainder to the
//! driver's own `open`. The disk manager layers partition discovery on top
//! of this by mounting one driver per discovered partition under
//! `/dev/storage`.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod driver;
pub mod error;
pub mod fd;
pub mod ioctl;
pub mod tree;

pub use driver::{DirEntry, DriverHandle, EntryKind, VfsDriver};
pub use error::VfsError;
pub use fd::{O_RDONLY, O_RDWR};
pub use ioctl::{IoctlArg, IoctlCode, SeekDirection};
pub use tree::MountHandle;

/// Registers `driver` at `path`. See [`tree::register`].
///
/// # Errors
///
/// See [`tree::register`].
pub fn register(path: &str, driver: &'static dyn VfsDriver) -> Result<MountHandle, VfsError> {
    tree::register(path, driver)
}

/// Detaches a mount point. See [`tree::unregister`].
///
/// # Errors
///
/// See [`tree::unregister`].
pub fn unregister(handle: MountHandle) -> Result<(), VfsError> {
    tree::unregister(handle)
}

/// Lists the names of `path`'s immediate children. See [`tree::list_children`].
///
/// # Errors
///
/// See [`tree::list_children`].
pub fn list_children(path: &str) -> Result<alloc::vec::Vec<alloc::string::String>, VfsError> {
    tree::list_children(path)
}

/// Reports whether `path` itself carries a driver. See [`tree::is_mount_point`].
///
/// # Errors
///
/// See [`tree::is_mount_point`].
pub fn is_mount_point(path: &str) -> Result<bool, VfsError> {
    tree::is_mount_point(path)
}
