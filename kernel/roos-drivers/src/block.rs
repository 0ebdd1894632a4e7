//! In-memory block device, attached from a `roos,ramdisk` device-tree node.
//!
//! Implements [`VfsDriver`] directly (open/close/read/write/ioctl) rather
//! than the sector-at-a-time async
//! [`BlockDevice`](roos_driver_api::block::BlockDevice) trait, since that is
//! the contract the disk manager's parsers and partition proxy speak.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use roos_core::sync::SpinLock;
use roos_driver_api::driver::DriverError;
use roos_fdt::DtNode;
use roos_vfs::{DirEntry, DriverHandle, IoctlArg, IoctlCode, SeekDirection, VfsDriver, VfsError, O_RDWR};

/// Sector size reported by every [`RamDisk`] instance.
pub const SECTOR_SIZE: u32 = 512;

/// Default capacity when a `roos,ramdisk` node carries no `roos,size-bytes`
/// property: 1 MiB.
pub const DEFAULT_SIZE_BYTES: u32 = 1 << 20;

struct OpenState {
    position: u64,
}

/// A block device backed by a heap-allocated buffer, with one independent
/// read/write cursor per open handle.
pub struct RamDisk {
    data: SpinLock<Vec<u8>>,
    opens: SpinLock<BTreeMap<u64, OpenState>>,
    next_handle: AtomicU64,
}

impl RamDisk {
    /// Creates a zeroed ramdisk of `size_bytes`.
    #[must_use]
    pub fn new(size_bytes: usize) -> Self {
        Self {
            data: SpinLock::new(vec![0u8; size_bytes]),
            opens: SpinLock::new(BTreeMap::new()),
            next_handle: AtomicU64::new(0),
        }
    }
}

impl VfsDriver for RamDisk {
    fn open(&self, remainder: &str, flags: u32, _mode: u32) -> Result<DriverHandle, VfsError> {
        if !remainder.is_empty() || flags != O_RDWR {
            return Err(VfsError::DriverRefused);
        }
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.opens.lock().insert(id, OpenState { position: 0 });
        Ok(DriverHandle::new(id))
    }

    fn close(&self, handle: DriverHandle) -> Result<(), VfsError> {
        self.opens.lock().remove(&handle.as_u64()).ok_or(VfsError::NotFound)?;
        Ok(())
    }

    fn read(&self, handle: DriverHandle, buf: &mut [u8]) -> Result<usize, VfsError> {
        let mut opens = self.opens.lock();
        let state = opens.get_mut(&handle.as_u64()).ok_or(VfsError::NotFound)?;
        let data = self.data.lock();
        let pos = state.position as usize;
        let n = buf.len().min(data.len().saturating_sub(pos));
        buf[..n].copy_from_slice(&data[pos..pos + n]);
        state.position += n as u64;
        Ok(n)
    }

    fn write(&self, handle: DriverHandle, buf: &[u8]) -> Result<usize, VfsError> {
        let mut opens = self.opens.lock();
        let state = opens.get_mut(&handle.as_u64()).ok_or(VfsError::NotFound)?;
        let mut data = self.data.lock();
        let pos = state.position as usize;
        if pos + buf.len() > data.len() {
            return Err(VfsError::DriverRefused);
        }
        data[pos..pos + buf.len()].copy_from_slice(buf);
        state.position += buf.len() as u64;
        Ok(buf.len())
    }

    fn readdir(&self, _handle: DriverHandle, _index: usize) -> Result<Option<DirEntry>, VfsError> {
        Err(VfsError::NotSupported)
    }

    fn ioctl(&self, handle: DriverHandle, code: IoctlCode, arg: IoctlArg) -> Result<i64, VfsError> {
        let mut opens = self.opens.lock();
        let state = opens.get_mut(&handle.as_u64()).ok_or(VfsError::NotFound)?;
        match code {
            IoctlCode::DEV_GET_SECTOR_SIZE => Ok(i64::from(SECTOR_SIZE)),
            IoctlCode::DEV_SET_LBA => {
                state.position = arg.value as u64 * u64::from(SECTOR_SIZE);
                Ok(0)
            }
            IoctlCode::FILE_SEEK => {
                let len = self.data.lock().len() as i64;
                let new_pos = match arg.direction {
                    Some(SeekDirection::Set) => arg.value,
                    Some(SeekDirection::Cur) => state.position as i64 + arg.value,
                    Some(SeekDirection::End) => len + arg.value,
                    None => return Err(VfsError::DriverRefused),
                };
                if new_pos < 0 || new_pos > len {
                    return Ok(-1);
                }
                state.position = new_pos as u64;
                Ok(new_pos)
            }
            _ => Err(VfsError::NotSupported),
        }
    }
}

/// Attaches a `roos,ramdisk` node: creates a [`RamDisk`] sized by its
/// `roos,size-bytes` property (or [`DEFAULT_SIZE_BYTES`]) and mounts it at
/// `/dev/storage/<node-name>`.
///
/// # Errors
///
/// Returns [`DriverError::InitFailed`] if the mount path is already taken.
pub fn attach(node: &DtNode) -> Result<(), DriverError> {
    let size = node
        .property("roos,size-bytes")
        .and_then(|p| p.as_u32())
        .unwrap_or(DEFAULT_SIZE_BYTES) as usize;

    let disk: &'static RamDisk = alloc::boxed::Box::leak(alloc::boxed::Box::new(RamDisk::new(size)));
    let path = alloc::format!("/dev/storage/{}", node.name());
    roos_vfs::register(&path, disk).map_err(|_| DriverError::InitFailed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_back_round_trips() {
        let disk = RamDisk::new(4096);
        let handle = disk.open("", O_RDWR, 0).unwrap();
        disk.write(handle, b"hello").unwrap();
        disk.ioctl(handle, IoctlCode::FILE_SEEK, IoctlArg::seek(SeekDirection::Set, 0)).unwrap();
        let mut buf = [0u8; 5];
        let n = disk.read(handle, &mut buf).unwrap();
        disk.close(handle).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn write_past_capacity_is_refused() {
        let disk = RamDisk::new(4);
        let handle = disk.open("", O_RDWR, 0).unwrap();
        assert_eq!(disk.write(handle, b"toolong"), Err(VfsError::DriverRefused));
    }

    #[test]
    fn set_lba_positions_by_sector() {
        let disk = RamDisk::new(4096);
        let handle = disk.open("", O_RDWR, 0).unwrap();
        disk.ioctl(handle, IoctlCode::DEV_SET_LBA, IoctlArg::lba(2)).unwrap();
        disk.write(handle, b"x").unwrap();
        disk.ioctl(handle, IoctlCode::FILE_SEEK, IoctlArg::seek(SeekDirection::Set, 1024)).unwrap();
        let mut buf = [0u8; 1];
        disk.read(handle, &mut buf).unwrap();
        assert_eq!(&buf, b"x");
    }

    #[test]
    fn operations_on_closed_handle_fail() {
        let disk = RamDisk::new(64);
        let handle = disk.open("", O_RDWR, 0).unwrap();
        disk.close(handle).unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(disk.read(handle, &mut buf), Err(VfsError::NotFound));
    }
}
