//! Error taxonomy for partition-table discovery.

use core::fmt;

/// Errors returned while discovering or proxying partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskError {
    /// The device's header does not match this parser's signature; try the
    /// next parser in the chain.
    NotThisFormat,
    /// A read or write against the underlying block device failed or
    /// returned fewer bytes than requested.
    Io,
    /// A VFS-level error occurred opening or addressing the device.
    Vfs(roos_vfs::VfsError),
}

impl fmt::Display for DiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotThisFormat => f.write_str("device header does not match this partition table format"),
            Self::Io => f.write_str("short or failed read/write against the underlying device"),
            Self::Vfs(e) => write!(f, "vfs error: {e}"),
        }
    }
}

impl From<roos_vfs::VfsError> for DiskError {
    fn from(e: roos_vfs::VfsError) -> Self {
        Self::Vfs(e)
    }
}
