//! The contract a mounted driver implements.
//!
//! One implementor per driver instance, referenced polymorphically from the
//! mount tree — the same shape as [`roos_driver_api::interrupt::InterruptControllerDriver`]
//! and [`roos_driver_api::timer::TimerDriver`], rather than a struct of raw
//! function pointers.

extern crate alloc;

use alloc::string::String;

use crate::error::VfsError;
use crate::ioctl::{IoctlArg, IoctlCode};

/// An opaque per-open handle a driver hands back from `open` and receives
/// on every subsequent call for that descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct DriverHandle(u64);

impl DriverHandle {
    /// The sentinel value a driver returns from `open` to signal refusal.
    pub const INVALID: Self = Self(u64::MAX);

    /// Wraps a raw value as a `DriverHandle`.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns `false` for [`DriverHandle::INVALID`].
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

/// Whether a [`DirEntry`] names a plain file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file (or file-like device leaf).
    File,
    /// A directory, traversable for further entries.
    Dir,
}

/// One entry returned by `readdir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name, relative to the directory handle it was read from. At
    /// most 255 bytes.
    pub name: String,
    /// Whether this entry is a file or a directory.
    pub kind: EntryKind,
}

impl DirEntry {
    /// Builds an entry, truncating `name` to 255 bytes if longer.
    #[must_use]
    pub fn new(mut name: String, kind: EntryKind) -> Self {
        if name.len() > 255 {
            let mut end = 255;
            while !name.is_char_boundary(end) {
                end -= 1;
            }
            name.truncate(end);
        }
        Self { name, kind }
    }
}

/// The operations a mounted driver provides.
///
/// Implementors hold their own state (buffers, device registers, open
/// handle tables) behind `&self`; the VFS never reaches into driver
/// internals, it only routes calls to the right instance.
pub trait VfsDriver: Send + Sync {
    /// Opens `remainder` (the path below this mount point) with the given
    /// open flags and mode, returning a per-open handle.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::DriverRefused`] if the driver rejects the
    /// request (wrong flags, remainder not recognized, device busy, ...).
    fn open(&self, remainder: &str, flags: u32, mode: u32) -> Result<DriverHandle, VfsError>;

    /// Releases a handle previously returned by [`open`](Self::open).
    fn close(&self, handle: DriverHandle) -> Result<(), VfsError>;

    /// Reads into `buf`, returning the number of bytes actually read.
    fn read(&self, handle: DriverHandle, buf: &mut [u8]) -> Result<usize, VfsError>;

    /// Writes from `buf`, returning the number of bytes actually written.
    fn write(&self, handle: DriverHandle, buf: &[u8]) -> Result<usize, VfsError>;

    /// Returns the directory entry at `index`, or `None` past the end.
    ///
    /// Default implementation reports [`VfsError::NotSupported`]; only
    /// directory-like drivers need to override it.
    fn readdir(&self, _handle: DriverHandle, _index: usize) -> Result<Option<DirEntry>, VfsError> {
        Err(VfsError::NotSupported)
    }

    /// Services a control request identified by `code`.
    ///
    /// Default implementation reports [`VfsError::NotSupported`] for any
    /// code it does not recognize.
    fn ioctl(&self, handle: DriverHandle, code: IoctlCode, arg: IoctlArg) -> Result<i64, VfsError>;
}
