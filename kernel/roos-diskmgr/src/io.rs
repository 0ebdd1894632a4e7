//! Small read/seek helpers shared by the MBR and GPT parsers and the
//! partition-proxy driver, all expressed in terms of the VFS fd API.

use roos_core::id::Fd;
use roos_vfs::{fd, IoctlArg, IoctlCode, SeekDirection};

use crate::error::DiskError;

/// Reads exactly `buf.len()` bytes from `fd`, looping over short reads.
///
/// # Errors
///
/// Returns [`DiskError::Io`] on a read error or a zero-byte read before
/// `buf` is filled.
pub fn read_exact(fd: Fd, buf: &mut [u8]) -> Result<(), DiskError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = fd::read(fd, &mut buf[filled..]).map_err(DiskError::from)?;
        if n == 0 {
            return Err(DiskError::Io);
        }
        filled += n;
    }
    Ok(())
}

/// Issues `DEV_SET_LBA(lba)` against `fd`.
///
/// # Errors
///
/// Returns [`DiskError::Vfs`] if the driver does not implement the code.
pub fn set_lba(fd: Fd, lba: u64) -> Result<(), DiskError> {
    fd::ioctl(fd, IoctlCode::DEV_SET_LBA, IoctlArg::lba(lba)).map_err(DiskError::from)?;
    Ok(())
}

/// Queries `DEV_GET_SECTOR_SIZE` against `fd`.
///
/// # Errors
///
/// Returns [`DiskError::Vfs`] if the driver does not implement the code.
pub fn sector_size(fd: Fd) -> Result<u32, DiskError> {
    let size = fd::ioctl(fd, IoctlCode::DEV_GET_SECTOR_SIZE, IoctlArg::default()).map_err(DiskError::from)?;
    Ok(size as u32)
}

/// Seeks `fd` to an absolute byte offset via `ioctl(FILE_SEEK, SET, ...)`.
///
/// # Errors
///
/// Returns [`DiskError::Vfs`] if the driver rejects the request, or
/// [`DiskError::Io`] if it reports an out-of-bounds offset.
pub fn seek_absolute(fd: Fd, offset: i64) -> Result<(), DiskError> {
    let new_pos = fd::ioctl(fd, IoctlCode::FILE_SEEK, IoctlArg::seek(SeekDirection::Set, offset)).map_err(DiskError::from)?;
    if new_pos < 0 {
        return Err(DiskError::Io);
    }
    Ok(())
}
