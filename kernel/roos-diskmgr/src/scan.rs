//! Recursive discovery walk: finds block devices under a directory of the
//! mount tree and publishes one [`PartitionDriver`] per partition found on
//! each.

extern crate alloc;

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use roos_vfs::O_RDWR;

use crate::error::DiskError;
use crate::partition::PartitionDriver;
use crate::{gpt, mbr};

/// Default directory the scan starts from.
pub const DEFAULT_ROOT: &str = "/dev/storage";

/// Walks the mount tree from `root`, recursing into plain directory nodes
/// and probing every mount-point leaf as a block device.
///
/// A leaf is tried as GPT first, falling back to MBR on
/// [`DiskError::NotThisFormat`]; an unrecognized leaf is skipped. Each
/// discovered partition is published at `<leaf-path>p<suffix>` via a
/// leaked, `'static` [`PartitionDriver`].
///
/// # Errors
///
/// Returns [`DiskError::Vfs`] if `root` itself does not exist in the mount
/// tree.
pub fn scan(root: &str) -> Result<usize, DiskError> {
    let mut published = 0;
    walk(root, &mut published)?;
    Ok(published)
}

fn walk(path: &str, published: &mut usize) -> Result<(), DiskError> {
    if roos_vfs::is_mount_point(path)? {
        probe_and_publish(path, published);
        return Ok(());
    }
    for name in roos_vfs::list_children(path)? {
        let child_path = format!("{path}/{name}");
        walk(&child_path, published)?;
    }
    Ok(())
}

fn probe_and_publish(disk_path: &str, published: &mut usize) {
    let specs = match probe(disk_path) {
        Ok(specs) => specs,
        Err(_) => return,
    };
    for spec in specs {
        let partition_path = format!("{disk_path}p{}", spec.name_suffix);
        let driver: &'static PartitionDriver = Box::leak(Box::new(PartitionDriver::new(String::from(disk_path), spec)));
        if roos_vfs::register(&partition_path, driver).is_ok() {
            *published += 1;
        }
    }
}

fn probe(disk_path: &str) -> Result<Vec<crate::partition::PartitionSpec>, DiskError> {
    let fd = roos_vfs::fd::open(disk_path, O_RDWR, 0).map_err(DiskError::from)?;
    let result = match gpt::parse(fd) {
        Ok(specs) => Ok(specs),
        Err(DiskError::NotThisFormat) => mbr::parse(fd),
        Err(e) => Err(e),
    };
    let _ = roos_vfs::fd::close(fd);
    result
}
