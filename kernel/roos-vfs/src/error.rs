//! Error taxonomy for mount-tree and file-descriptor operations.

use core::fmt;

/// Errors returned by the VFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VfsError {
    /// Path is not absolute, contains an over-long segment, or an embedded
    /// NUL byte.
    InvalidPath,
    /// The terminal segment of a `register` path already carries a driver.
    AlreadyMounted,
    /// `unregister` was called on a mount point with live descendant
    /// mounts beneath it.
    SubtreeNotEmpty,
    /// No mount point covers the requested path, or no fd slot exists for
    /// the requested descriptor.
    NotFound,
    /// The fd is out of the valid range or not currently open.
    BadFd,
    /// The driver reported refusal by returning an invalid driver handle.
    DriverRefused,
    /// The driver does not implement the requested operation.
    NotSupported,
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPath => f.write_str("path is not well-formed"),
            Self::AlreadyMounted => f.write_str("a driver is already mounted at this path"),
            Self::SubtreeNotEmpty => f.write_str("mount point has live descendant mounts"),
            Self::NotFound => f.write_str("no mount point or fd matches this request"),
            Self::BadFd => f.write_str("file descriptor is not open"),
            Self::DriverRefused => f.write_str("driver refused the request"),
            Self::NotSupported => f.write_str("operation not supported by this driver"),
        }
    }
}
