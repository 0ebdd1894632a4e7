//! The flat ioctl namespace shared by every mounted driver.
//!
//! Codes are assigned concrete `u32` discriminants here rather than left as
//! bare integer literals scattered through call sites. The `CONS_*` codes
//! are reserved for a console driver this core does not implement; any
//! driver presented with one should return [`crate::error::VfsError::NotSupported`].

/// A flat-namespace ioctl request code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct IoctlCode(u32);

impl IoctlCode {
    /// Seek within an open handle. Argument: [`SeekDirection`] + offset.
    pub const FILE_SEEK: Self = Self(1);
    /// Query a block device's sector size in bytes.
    pub const DEV_GET_SECTOR_SIZE: Self = Self(2);
    /// Position a block device's cursor at an LBA multiple of the sector size.
    pub const DEV_SET_LBA: Self = Self(3);
    /// Reserved for a console driver; no implementor in this core.
    pub const CONS_CLEAR: Self = Self(100);
    /// Reserved for a console driver; no implementor in this core.
    pub const CONS_SCROLL: Self = Self(101);
    /// Reserved for a console driver; no implementor in this core.
    pub const CONS_SET_COLORSCHEME: Self = Self(102);
    /// Reserved for a console driver; no implementor in this core.
    pub const CONS_SAVE_COLORSCHEME: Self = Self(103);
    /// Reserved for a console driver; no implementor in this core.
    pub const CONS_SAVE_CURSOR: Self = Self(104);
    /// Reserved for a console driver; no implementor in this core.
    pub const CONS_RESTORE_CURSOR: Self = Self(105);
    /// Reserved for a console driver; no implementor in this core.
    pub const CONS_FLUSH: Self = Self(106);

    /// Wraps a raw code, for drivers that define codes of their own.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw discriminant.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Seek origin for [`IoctlCode::FILE_SEEK`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDirection {
    /// Offset is absolute.
    Set,
    /// Offset is relative to the current position.
    Cur,
    /// Offset is relative to the end of the handle's extent.
    End,
}

/// Argument payload for an ioctl call.
///
/// Only the fields a given code interprets are meaningful; unused fields
/// are ignored by drivers that do not need them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoctlArg {
    /// Seek origin, read by [`IoctlCode::FILE_SEEK`].
    pub direction: Option<SeekDirection>,
    /// Seek offset or LBA value, read by [`IoctlCode::FILE_SEEK`] and
    /// [`IoctlCode::DEV_SET_LBA`].
    pub value: i64,
}

impl IoctlArg {
    /// Builds an argument for [`IoctlCode::FILE_SEEK`].
    #[must_use]
    pub const fn seek(direction: SeekDirection, offset: i64) -> Self {
        Self { direction: Some(direction), value: offset }
    }

    /// Builds an argument for [`IoctlCode::DEV_SET_LBA`].
    #[must_use]
    pub const fn lba(lba: u64) -> Self {
        Self { direction: None, value: lba as i64 }
    }
}
