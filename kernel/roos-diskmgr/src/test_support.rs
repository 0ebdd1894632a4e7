//! Mock block device shared by the parser and scan tests.

extern crate alloc;

use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use roos_core::sync::SpinLock;
use roos_vfs::{DirEntry, DriverHandle, IoctlArg, IoctlCode, SeekDirection, VfsDriver, VfsError, O_RDWR};

/// Sector size this mock reports via `DEV_GET_SECTOR_SIZE`.
pub const MOCK_SECTOR_SIZE: u32 = 512;

/// A byte-buffer-backed block device implementing seek, LBA positioning,
/// and sector-size query, for exercising the parsers and the scan walk
/// without real hardware.
pub struct MockBlockDevice {
    data: SpinLock<Vec<u8>>,
    cursor: SpinLock<u64>,
    next_handle: AtomicU64,
}

impl MockBlockDevice {
    /// Creates a device backed by `data`.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data: SpinLock::new(data), cursor: SpinLock::new(0), next_handle: AtomicU64::new(0) }
    }

    /// Creates an empty device suitable for a `static`; fill it with
    /// [`MockBlockDevice::reset`] before use.
    #[must_use]
    pub const fn new_const() -> Self {
        Self { data: SpinLock::new(Vec::new()), cursor: SpinLock::new(0), next_handle: AtomicU64::new(0) }
    }

    /// Replaces the backing buffer and rewinds the cursor, for reusing a
    /// `static` mock across independent test bodies.
    pub fn reset(&self, data: Vec<u8>) {
        *self.data.lock() = data;
        *self.cursor.lock() = 0;
    }
}

impl VfsDriver for MockBlockDevice {
    fn open(&self, remainder: &str, flags: u32, _mode: u32) -> Result<DriverHandle, VfsError> {
        if !remainder.is_empty() || flags != O_RDWR {
            return Err(VfsError::DriverRefused);
        }
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        Ok(DriverHandle::new(id))
    }

    fn close(&self, _handle: DriverHandle) -> Result<(), VfsError> {
        Ok(())
    }

    fn read(&self, _handle: DriverHandle, buf: &mut [u8]) -> Result<usize, VfsError> {
        let mut cursor = self.cursor.lock();
        let data = self.data.lock();
        let pos = *cursor as usize;
        let n = buf.len().min(data.len().saturating_sub(pos));
        buf[..n].copy_from_slice(&data[pos..pos + n]);
        *cursor += n as u64;
        Ok(n)
    }

    fn write(&self, _handle: DriverHandle, buf: &[u8]) -> Result<usize, VfsError> {
        let mut cursor = self.cursor.lock();
        let mut data = self.data.lock();
        let pos = *cursor as usize;
        if pos + buf.len() > data.len() {
            data.resize(pos + buf.len(), 0);
        }
        data[pos..pos + buf.len()].copy_from_slice(buf);
        *cursor += buf.len() as u64;
        Ok(buf.len())
    }

    fn readdir(&self, _handle: DriverHandle, _index: usize) -> Result<Option<DirEntry>, VfsError> {
        Err(VfsError::NotSupported)
    }

    fn ioctl(&self, _handle: DriverHandle, code: IoctlCode, arg: IoctlArg) -> Result<i64, VfsError> {
        match code {
            IoctlCode::DEV_GET_SECTOR_SIZE => Ok(i64::from(MOCK_SECTOR_SIZE)),
            IoctlCode::DEV_SET_LBA => {
                let lba = arg.value as u64;
                *self.cursor.lock() = lba * u64::from(MOCK_SECTOR_SIZE);
                Ok(0)
            }
            IoctlCode::FILE_SEEK => {
                let mut cursor = self.cursor.lock();
                let new_pos = match arg.direction {
                    Some(SeekDirection::Set) => arg.value,
                    Some(SeekDirection::Cur) => *cursor as i64 + arg.value,
                    Some(SeekDirection::End) => self.data.lock().len() as i64 + arg.value,
                    None => return Err(VfsError::DriverRefused),
                };
                if new_pos < 0 {
                    return Ok(-1);
                }
                *cursor = new_pos as u64;
                Ok(new_pos)
            }
            _ => Err(VfsError::NotSupported),
        }
    }
}
