//! Partition geometry and the partition-proxy VFS driver published once per
//! discovered partition.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::String;

use core::sync::atomic::{AtomicU64, Ordering};

use roos_core::id::Fd;
use roos_core::sync::SpinLock;
use roos_vfs::{DirEntry, DriverHandle, IoctlArg, IoctlCode, SeekDirection, VfsDriver, VfsError, O_RDWR};

use crate::io::{seek_absolute, sector_size};

/// A discovered partition's geometry, independent of any open handle.
#[derive(Debug, Clone)]
pub struct PartitionSpec {
    /// Suffix appended to the parent disk path to form this partition's
    /// VFS path (`"0"`..`"3"` for MBR, `"a"`, `"b"`, ... for GPT).
    pub name_suffix: String,
    /// First LBA of the partition on the parent device.
    pub lba_start: u64,
    /// Length of the partition in sectors.
    pub sector_count: u64,
    /// MBR system-id byte. Always `0` for GPT partitions, which carry a
    /// type GUID instead.
    pub sys_type: u8,
    /// MBR "active" flag. Always `false` for GPT partitions.
    pub bootable: bool,
}

struct OpenState {
    parent_fd: Fd,
    start_byte: u64,
    position: u64,
    size_byte: u64,
}

/// Proxies I/O against one partition of a parent block device.
///
/// Bounds every access to `[0, size_byte)` and translates it into an
/// absolute byte offset on the parent fd. Each `open` call holds its own
/// parent fd and position, guarded by its own table slot, matching the
/// per-descriptor locking the mount tree itself does not provide.
pub struct PartitionDriver {
    disk_path: String,
    spec: PartitionSpec,
    opens: SpinLock<BTreeMap<u64, OpenState>>,
    next_handle: AtomicU64,
}

impl PartitionDriver {
    /// Creates a driver proxying `spec` on top of the block device at
    /// `disk_path`.
    #[must_use]
    pub fn new(disk_path: String, spec: PartitionSpec) -> Self {
        Self {
            disk_path,
            spec,
            opens: SpinLock::new(BTreeMap::new()),
            next_handle: AtomicU64::new(0),
        }
    }

    /// This partition's geometry.
    #[must_use]
    pub fn spec(&self) -> &PartitionSpec {
        &self.spec
    }
}

fn seek_parent(parent_fd: Fd, abs_offset: u64) -> Result<(), VfsError> {
    roos_vfs::fd::ioctl(
        parent_fd,
        IoctlCode::FILE_SEEK,
        IoctlArg::seek(SeekDirection::Set, abs_offset as i64),
    )?;
    Ok(())
}

impl VfsDriver for PartitionDriver {
    fn open(&self, remainder: &str, flags: u32, _mode: u32) -> Result<DriverHandle, VfsError> {
        if !remainder.is_empty() || flags != O_RDWR {
            return Err(VfsError::DriverRefused);
        }

        let parent_fd = roos_vfs::fd::open(&self.disk_path, O_RDWR, 0)?;
        let Ok(sector_bytes) = sector_size(parent_fd) else {
            let _ = roos_vfs::fd::close(parent_fd);
            return Err(VfsError::DriverRefused);
        };
        let start_byte = self.spec.lba_start * u64::from(sector_bytes);
        let size_byte = self.spec.sector_count * u64::from(sector_bytes);
        if seek_absolute(parent_fd, start_byte as i64).is_err() {
            let _ = roos_vfs::fd::close(parent_fd);
            return Err(VfsError::DriverRefused);
        }

        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.opens.lock().insert(id, OpenState { parent_fd, start_byte, position: 0, size_byte });
        Ok(DriverHandle::new(id))
    }

    fn close(&self, handle: DriverHandle) -> Result<(), VfsError> {
        let state = self.opens.lock().remove(&handle.as_u64()).ok_or(VfsError::NotFound)?;
        roos_vfs::fd::close(state.parent_fd)
    }

    fn read(&self, handle: DriverHandle, buf: &mut [u8]) -> Result<usize, VfsError> {
        let (parent_fd, abs_offset, n) = {
            let mut opens = self.opens.lock();
            let state = opens.get_mut(&handle.as_u64()).ok_or(VfsError::NotFound)?;
            let n = buf.len().min((state.size_byte - state.position) as usize);
            (state.parent_fd, state.start_byte + state.position, n)
        };
        seek_parent(parent_fd, abs_offset)?;
        let read = roos_vfs::fd::read(parent_fd, &mut buf[..n])?;
        if let Some(state) = self.opens.lock().get_mut(&handle.as_u64()) {
            state.position += read as u64;
        }
        Ok(read)
    }

    fn write(&self, handle: DriverHandle, buf: &[u8]) -> Result<usize, VfsError> {
        let (parent_fd, abs_offset, n) = {
            let mut opens = self.opens.lock();
            let state = opens.get_mut(&handle.as_u64()).ok_or(VfsError::NotFound)?;
            let n = buf.len().min((state.size_byte - state.position) as usize);
            (state.parent_fd, state.start_byte + state.position, n)
        };
        seek_parent(parent_fd, abs_offset)?;
        let written = roos_vfs::fd::write(parent_fd, &buf[..n])?;
        if let Some(state) = self.opens.lock().get_mut(&handle.as_u64()) {
            state.position += written as u64;
        }
        Ok(written)
    }

    fn readdir(&self, _handle: DriverHandle, _index: usize) -> Result<Option<DirEntry>, VfsError> {
        Err(VfsError::NotSupported)
    }

    fn ioctl(&self, handle: DriverHandle, code: IoctlCode, arg: IoctlArg) -> Result<i64, VfsError> {
        if code != IoctlCode::FILE_SEEK {
            return Err(VfsError::NotSupported);
        }
        let mut opens = self.opens.lock();
        let state = opens.get_mut(&handle.as_u64()).ok_or(VfsError::NotFound)?;
        let new_pos = match arg.direction {
            Some(SeekDirection::Set) => arg.value,
            Some(SeekDirection::Cur) => state.position as i64 + arg.value,
            Some(SeekDirection::End) => state.size_byte as i64 + arg.value,
            None => return Err(VfsError::DriverRefused),
        };
        if new_pos < 0 || new_pos as u64 > state.size_byte {
            return Ok(-1);
        }
        state.position = new_pos as u64;
        Ok(new_pos)
    }
}
