//! File-descriptor table: maps an integer fd to the (driver, driver-handle)
//! pair obtained from an `open` call, and forwards subsequent operations to
//! the stored driver.
//!
//! The mount tree's lock is only held long enough to resolve a path to a
//! driver; the fd table's lock is only held long enough to look up or
//! install a slot. Neither is held across the driver call itself, so two
//! fds on different drivers never serialize behind each other.

extern crate alloc;

use alloc::collections::BTreeMap;

use roos_core::id::Fd;
use roos_core::sync::SpinLock;

use crate::driver::{DirEntry, DriverHandle, VfsDriver};
use crate::error::VfsError;
use crate::ioctl::{IoctlArg, IoctlCode};
use crate::tree;

/// Recognized by most drivers as read-only.
pub const O_RDONLY: u32 = 0x4;
/// Recognized by most drivers as read-write; device drivers typically
/// reject anything else.
pub const O_RDWR: u32 = 0x6;

struct OpenFile {
    driver: &'static dyn VfsDriver,
    handle: DriverHandle,
}

struct FdTable {
    entries: BTreeMap<u32, OpenFile>,
    next: u32,
}

// Fd 0-2 are reserved (see `roos_core::id::Fd`) even though no console
// driver is wired up in this core.
static TABLE: SpinLock<FdTable> = SpinLock::new(FdTable { entries: BTreeMap::new(), next: 3 });

/// Resolves `path` to a mount point, opens it through the owning driver,
/// and returns a new fd bound to the resulting driver handle.
///
/// # Errors
///
/// Returns [`VfsError::InvalidPath`]/[`VfsError::NotFound`] from path
/// resolution, or [`VfsError::DriverRefused`] if the driver's `open`
/// returns [`DriverHandle::INVALID`] or an error.
pub fn open(path: &str, flags: u32, mode: u32) -> Result<Fd, VfsError> {
    let (driver, remainder) = tree::resolve(path)?;
    let handle = driver.open(&remainder, flags, mode)?;
    if !handle.is_valid() {
        return Err(VfsError::DriverRefused);
    }

    let mut table = TABLE.lock();
    let fd = table.next;
    table.next = table.next.checked_add(1).expect("fd space exhausted");
    table.entries.insert(fd, OpenFile { driver, handle });
    Ok(Fd::new(fd))
}

fn take(fd: Fd) -> Result<(&'static dyn VfsDriver, DriverHandle), VfsError> {
    TABLE
        .lock()
        .entries
        .get(&fd.as_u32())
        .map(|f| (f.driver, f.handle))
        .ok_or(VfsError::BadFd)
}

/// Releases `fd`'s slot and forwards to the owning driver's `close`.
///
/// # Errors
///
/// Returns [`VfsError::BadFd`] if `fd` is not open.
pub fn close(fd: Fd) -> Result<(), VfsError> {
    let entry = TABLE.lock().entries.remove(&fd.as_u32()).ok_or(VfsError::BadFd)?;
    entry.driver.close(entry.handle)
}

/// Forwards a read to the driver owning `fd`.
///
/// # Errors
///
/// Returns [`VfsError::BadFd`] if `fd` is not open.
pub fn read(fd: Fd, buf: &mut [u8]) -> Result<usize, VfsError> {
    let (driver, handle) = take(fd)?;
    driver.read(handle, buf)
}

/// Forwards a write to the driver owning `fd`.
///
/// # Errors
///
/// Returns [`VfsError::BadFd`] if `fd` is not open.
pub fn write(fd: Fd, buf: &[u8]) -> Result<usize, VfsError> {
    let (driver, handle) = take(fd)?;
    driver.write(handle, buf)
}

/// Forwards a directory read to the driver owning `fd`.
///
/// # Errors
///
/// Returns [`VfsError::BadFd`] if `fd` is not open.
pub fn readdir(fd: Fd, index: usize) -> Result<Option<DirEntry>, VfsError> {
    let (driver, handle) = take(fd)?;
    driver.readdir(handle, index)
}

/// Forwards a control request to the driver owning `fd`.
///
/// # Errors
///
/// Returns [`VfsError::BadFd`] if `fd` is not open.
pub fn ioctl(fd: Fd, code: IoctlCode, arg: IoctlArg) -> Result<i64, VfsError> {
    let (driver, handle) = take(fd)?;
    driver.ioctl(handle, code, arg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ioctl::SeekDirection;
    use roos_core::sync::SpinLock as Lock;

    struct RamBuf {
        state: Lock<([u8; 128], usize)>,
    }

    impl VfsDriver for RamBuf {
        fn open(&self, remainder: &str, flags: u32, _mode: u32) -> Result<DriverHandle, VfsError> {
            if !remainder.is_empty() || flags != O_RDWR {
                return Err(VfsError::DriverRefused);
            }
            Ok(DriverHandle::new(1))
        }

        fn close(&self, _handle: DriverHandle) -> Result<(), VfsError> {
            Ok(())
        }

        fn read(&self, _handle: DriverHandle, buf: &mut [u8]) -> Result<usize, VfsError> {
            let (data, pos) = &mut *self.state.lock();
            let n = buf.len().min(data.len() - *pos);
            buf[..n].copy_from_slice(&data[*pos..*pos + n]);
            *pos += n;
            Ok(n)
        }

        fn write(&self, _handle: DriverHandle, buf: &[u8]) -> Result<usize, VfsError> {
            let (data, pos) = &mut *self.state.lock();
            let n = buf.len().min(data.len() - *pos);
            data[*pos..*pos + n].copy_from_slice(&buf[..n]);
            *pos += n;
            Ok(n)
        }

        fn ioctl(&self, _handle: DriverHandle, code: IoctlCode, arg: IoctlArg) -> Result<i64, VfsError> {
            if code != IoctlCode::FILE_SEEK {
                return Err(VfsError::NotSupported);
            }
            let mut guard = self.state.lock();
            let new_pos = match arg.direction {
                Some(SeekDirection::Set) => arg.value,
                Some(SeekDirection::Cur) => guard.1 as i64 + arg.value,
                Some(SeekDirection::End) => guard.0.len() as i64 + arg.value,
                None => return Err(VfsError::DriverRefused),
            };
            if new_pos < 0 || new_pos as usize > guard.0.len() {
                return Ok(-1);
            }
            guard.1 = new_pos as usize;
            Ok(new_pos)
        }
    }

    static RAM: RamBuf = RamBuf { state: Lock::new(([0u8; 128], 0)) };

    #[test]
    fn vfs_round_trip_on_ram_driver() {
        let _mount = tree::register("/tmp/fd-test-buf", &RAM).unwrap();

        let fd = open("/tmp/fd-test-buf", O_RDWR, 0).unwrap();
        assert_eq!(write(fd, b"hello").unwrap(), 5);
        assert_eq!(ioctl(fd, IoctlCode::FILE_SEEK, IoctlArg::seek(SeekDirection::Set, 0)).unwrap(), 0);
        let mut out = [0u8; 5];
        assert_eq!(read(fd, &mut out).unwrap(), 5);
        assert_eq!(&out, b"hello");
        close(fd).unwrap();
    }

    #[test]
    fn open_on_unknown_path_fails_not_found() {
        assert_eq!(open("/tmp/fd-test-nonexistent", O_RDWR, 0), Err(VfsError::NotFound));
    }

    #[test]
    fn operations_on_closed_fd_fail_bad_fd() {
        let _mount = tree::register("/tmp/fd-test-lifecycle", &RAM).unwrap();
        let fd = open("/tmp/fd-test-lifecycle", O_RDWR, 0).unwrap();
        close(fd).unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(read(fd, &mut buf), Err(VfsError::BadFd));
        assert_eq!(close(fd), Err(VfsError::BadFd));
    }
}
