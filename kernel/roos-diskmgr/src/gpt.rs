//! GPT partition table parser.

extern crate alloc;

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use roos_core::id::Fd;

use crate::error::DiskError;
use crate::io::{read_exact, seek_absolute, set_lba};
use crate::partition::PartitionSpec;

const HEADER_SIGNATURE: u64 = 0x5452_4150_2049_4645; // "EFI PART", little-endian
const HEADER_CRC_OFFSET: usize = 16;
const NUM_ENTRIES_OFFSET: usize = 80;
const ENTRY_SIZE_OFFSET: usize = 84;
const ARRAY_CRC_OFFSET: usize = 88;
const PARSED_ENTRY_SIZE: usize = 128;

/// Reads and validates a GPT header and partition array from `fd`,
/// extracting every entry whose type GUID is not all-zero.
///
/// Both the header CRC32 and the partition-array CRC32 are verified; a
/// mismatch on either rejects the disk so the caller falls through to the
/// MBR parser.
///
/// # Errors
///
/// Returns [`DiskError::NotThisFormat`] if the signature or either CRC32
/// fails to validate, and [`DiskError::Io`]/[`DiskError::Vfs`] on an
/// underlying read failure.
pub fn parse(fd: Fd) -> Result<Vec<PartitionSpec>, DiskError> {
    set_lba(fd, 1)?;
    let mut header = [0u8; 512];
    read_exact(fd, &mut header)?;

    let signature = u64::from_le_bytes(header[0..8].try_into().unwrap());
    if signature != HEADER_SIGNATURE {
        return Err(DiskError::NotThisFormat);
    }

    let declared_header_crc = u32::from_le_bytes(header[HEADER_CRC_OFFSET..HEADER_CRC_OFFSET + 4].try_into().unwrap());
    let mut crc_input = header[0..20].to_vec();
    crc_input[HEADER_CRC_OFFSET..HEADER_CRC_OFFSET + 4].fill(0);
    if crc32fast::hash(&crc_input) != declared_header_crc {
        return Err(DiskError::NotThisFormat);
    }

    let entry_count = u32::from_le_bytes(header[NUM_ENTRIES_OFFSET..NUM_ENTRIES_OFFSET + 4].try_into().unwrap()) as usize;
    let entry_size = u32::from_le_bytes(header[ENTRY_SIZE_OFFSET..ENTRY_SIZE_OFFSET + 4].try_into().unwrap()) as usize;
    let declared_array_crc = u32::from_le_bytes(header[ARRAY_CRC_OFFSET..ARRAY_CRC_OFFSET + 4].try_into().unwrap());

    if entry_count == 0 || entry_size < PARSED_ENTRY_SIZE {
        return Ok(Vec::new());
    }

    seek_absolute(fd, 2 * 512)?;
    let mut array = vec![0u8; entry_count * entry_size];
    read_exact(fd, &mut array)?;

    if crc32fast::hash(&array) != declared_array_crc {
        return Err(DiskError::NotThisFormat);
    }

    let mut specs = Vec::new();
    for index in 0..entry_count {
        let base = index * entry_size;
        if base + PARSED_ENTRY_SIZE > array.len() {
            break;
        }
        let entry = &array[base..base + PARSED_ENTRY_SIZE];
        if entry[0..16].iter().all(|&b| b == 0) {
            continue;
        }
        let starting_lba = u64::from_le_bytes(entry[32..40].try_into().unwrap());
        let ending_lba = u64::from_le_bytes(entry[40..48].try_into().unwrap());
        specs.push(PartitionSpec {
            name_suffix: index_to_suffix(index),
            lba_start: starting_lba,
            sector_count: ending_lba.saturating_sub(starting_lba),
            sys_type: 0,
            bootable: false,
        });
    }
    Ok(specs)
}

/// `a..z` for indices `0..25`, then a base-26 two-letter suffix beyond that.
fn index_to_suffix(index: usize) -> String {
    if index < 26 {
        alloc::format!("{}", (b'a' + index as u8) as char)
    } else {
        let rem = index - 26;
        let first = (b'a' + (rem / 26) as u8) as char;
        let second = (b'a' + (rem % 26) as u8) as char;
        alloc::format!("{first}{second}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockBlockDevice;

    fn build_disk(entries: &[(u128, u64, u64)]) -> Vec<u8> {
        let mut disk = vec![0u8; 3 * 512];

        let entry_size = PARSED_ENTRY_SIZE;
        let mut array = vec![0u8; entries.len() * entry_size];
        for (i, (type_guid, start, end)) in entries.iter().enumerate() {
            let base = i * entry_size;
            array[base..base + 16].copy_from_slice(&type_guid.to_le_bytes()[..16]);
            array[base + 32..base + 40].copy_from_slice(&start.to_le_bytes());
            array[base + 40..base + 48].copy_from_slice(&end.to_le_bytes());
        }
        let array_crc = crc32fast::hash(&array);

        let header = &mut disk[512..1024];
        header[0..8].copy_from_slice(&HEADER_SIGNATURE.to_le_bytes());
        header[NUM_ENTRIES_OFFSET..NUM_ENTRIES_OFFSET + 4].copy_from_slice(&(entries.len() as u32).to_le_bytes());
        header[ENTRY_SIZE_OFFSET..ENTRY_SIZE_OFFSET + 4].copy_from_slice(&(entry_size as u32).to_le_bytes());
        header[ARRAY_CRC_OFFSET..ARRAY_CRC_OFFSET + 4].copy_from_slice(&array_crc.to_le_bytes());

        let mut crc_input = header[0..20].to_vec();
        crc_input[HEADER_CRC_OFFSET..HEADER_CRC_OFFSET + 4].fill(0);
        let header_crc = crc32fast::hash(&crc_input);
        header[HEADER_CRC_OFFSET..HEADER_CRC_OFFSET + 4].copy_from_slice(&header_crc.to_le_bytes());

        disk.extend_from_slice(&array);
        disk
    }

    #[test]
    fn rejects_disk_without_efi_part_signature() {
        static DEV: MockBlockDevice = MockBlockDevice::new_const();
        DEV.reset(vec![0u8; 3 * 512]);
        let _mount = roos_vfs::register("/gpt-test/unsigned", &DEV).unwrap();
        let fd = roos_vfs::fd::open("/gpt-test/unsigned", roos_vfs::O_RDWR, 0).unwrap();
        assert_eq!(parse(fd), Err(DiskError::NotThisFormat));
        roos_vfs::fd::close(fd).unwrap();
    }

    #[test]
    fn bounds_partition_size_from_lba_range() {
        static DEV: MockBlockDevice = MockBlockDevice::new_const();
        DEV.reset(build_disk(&[(0x1234_5678, 34, 2047)]));
        let _mount = roos_vfs::register("/gpt-test/sized", &DEV).unwrap();
        let fd = roos_vfs::fd::open("/gpt-test/sized", roos_vfs::O_RDWR, 0).unwrap();
        let specs = parse(fd).unwrap();
        roos_vfs::fd::close(fd).unwrap();

        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].lba_start, 34);
        assert_eq!(specs[0].sector_count, 2047 - 34);
        assert_eq!(specs[0].name_suffix, "a");
    }

    #[test]
    fn rejects_disk_with_bad_array_crc() {
        static DEV: MockBlockDevice = MockBlockDevice::new_const();
        let mut disk = build_disk(&[(0x1234_5678, 34, 2047)]);
        let last = disk.len() - 1;
        disk[last] ^= 0xFF;
        DEV.reset(disk);
        let _mount = roos_vfs::register("/gpt-test/corrupt-array", &DEV).unwrap();
        let fd = roos_vfs::fd::open("/gpt-test/corrupt-array", roos_vfs::O_RDWR, 0).unwrap();
        assert_eq!(parse(fd), Err(DiskError::NotThisFormat));
        roos_vfs::fd::close(fd).unwrap();
    }

    #[test]
    fn zero_type_guid_entries_are_skipped() {
        static DEV: MockBlockDevice = MockBlockDevice::new_const();
        DEV.reset(build_disk(&[(0, 0, 0), (0xAB, 100, 200)]));
        let _mount = roos_vfs::register("/gpt-test/mixed", &DEV).unwrap();
        let fd = roos_vfs::fd::open("/gpt-test/mixed", roos_vfs::O_RDWR, 0).unwrap();
        let specs = parse(fd).unwrap();
        roos_vfs::fd::close(fd).unwrap();

        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name_suffix, "b");
    }

    #[test]
    fn suffix_naming_wraps_into_two_letters() {
        assert_eq!(index_to_suffix(0), "a");
        assert_eq!(index_to_suffix(25), "z");
        assert_eq!(index_to_suffix(26), "aa");
        assert_eq!(index_to_suffix(27), "ab");
    }
}
