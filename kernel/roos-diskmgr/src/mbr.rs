//! MBR partition table parser.

extern crate alloc;

use alloc::vec::Vec;

use roos_core::id::Fd;

use crate::error::DiskError;
use crate::io::{read_exact, seek_absolute};
use crate::partition::PartitionSpec;

const SIGNATURE_OFFSET: usize = 510;
const ENTRY_OFFSET: usize = 446;
const ENTRY_SIZE: usize = 16;
const ENTRY_COUNT: usize = 4;

/// Reads the first 512 bytes of `fd` and extracts up to four MBR
/// partition entries.
///
/// # Errors
///
/// Returns [`DiskError::NotThisFormat`] if the `0xAA55` signature is
/// absent, or [`DiskError::Io`]/[`DiskError::Vfs`] on a read failure.
pub fn parse(fd: Fd) -> Result<Vec<PartitionSpec>, DiskError> {
    seek_absolute(fd, 0)?;
    let mut sector = [0u8; 512];
    read_exact(fd, &mut sector)?;

    if sector[SIGNATURE_OFFSET] != 0x55 || sector[SIGNATURE_OFFSET + 1] != 0xAA {
        return Err(DiskError::NotThisFormat);
    }

    let mut specs = Vec::new();
    for index in 0..ENTRY_COUNT {
        let base = ENTRY_OFFSET + index * ENTRY_SIZE;
        let entry = &sector[base..base + ENTRY_SIZE];
        let sys_type = entry[4];
        if sys_type == 0 {
            continue;
        }
        let bootable = entry[0] == 0x80;
        let lba_start = u32::from_le_bytes([entry[8], entry[9], entry[10], entry[11]]) as u64;
        let sector_count = u32::from_le_bytes([entry[12], entry[13], entry[14], entry[15]]) as u64;
        specs.push(PartitionSpec {
            name_suffix: alloc::format!("{index}"),
            lba_start,
            sector_count,
            sys_type,
            bootable,
        });
    }
    Ok(specs)
}
