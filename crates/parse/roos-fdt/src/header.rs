//! FDT header layout and big-endian field reading.
//!
//! Hand-rolled rather than derived: the header is ten fixed-offset
//! big-endian `u32` fields, and reading them directly keeps this crate free
//! of a derive-macro dependency for a shape this small.

use crate::error::FdtError;

/// FDT magic number: `0xd00dfeed`.
pub const FDT_MAGIC: u32 = 0xd00d_feed;

/// Byte size of the on-disk header.
pub const HEADER_LEN: usize = 40;

/// The flattened tree header, decoded to native endianness.
#[derive(Debug, Clone, Copy)]
pub struct FdtHeader {
    /// Must equal [`FDT_MAGIC`].
    pub magic: u32,
    /// Total size of the DTB blob in bytes.
    pub total_size: u32,
    /// Offset of the structure block from the start of the header.
    pub off_struct: u32,
    /// Offset of the strings block from the start of the header.
    pub off_strings: u32,
    /// Offset of the memory reservation block from the start of the header.
    pub off_mem_rsvmap: u32,
    /// DTB version.
    pub version: u32,
    /// Last version this blob is backward-compatible with.
    pub last_comp_version: u32,
    /// Physical ID of the boot CPU.
    pub boot_cpuid: u32,
    /// Length in bytes of the strings block.
    pub size_strings: u32,
    /// Length in bytes of the structure block.
    pub size_struct: u32,
}

fn read_be32_at(data: &[u8], offset: usize) -> Result<u32, FdtError> {
    let bytes: [u8; 4] = data
        .get(offset..offset + 4)
        .ok_or(FdtError::TruncatedData)?
        .try_into()
        .map_err(|_| FdtError::TruncatedData)?;
    Ok(u32::from_be_bytes(bytes))
}

impl FdtHeader {
    /// Reads and decodes the header from the start of `data`.
    ///
    /// Does not validate the magic or version; callers check those against
    /// the fields they need.
    pub fn read(data: &[u8]) -> Result<Self, FdtError> {
        if data.len() < HEADER_LEN {
            return Err(FdtError::TruncatedData);
        }
        Ok(Self {
            magic: read_be32_at(data, 0)?,
            total_size: read_be32_at(data, 4)?,
            off_struct: read_be32_at(data, 8)?,
            off_strings: read_be32_at(data, 12)?,
            off_mem_rsvmap: read_be32_at(data, 16)?,
            version: read_be32_at(data, 20)?,
            last_comp_version: read_be32_at(data, 24)?,
            boot_cpuid: read_be32_at(data, 28)?,
            size_strings: read_be32_at(data, 32)?,
            size_struct: read_be32_at(data, 36)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fixed_offsets() {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&FDT_MAGIC.to_be_bytes());
        buf[4..8].copy_from_slice(&100u32.to_be_bytes());
        buf[28..32].copy_from_slice(&3u32.to_be_bytes());
        let hdr = FdtHeader::read(&buf).unwrap();
        assert_eq!(hdr.magic, FDT_MAGIC);
        assert_eq!(hdr.total_size, 100);
        assert_eq!(hdr.boot_cpuid, 3);
    }

    #[test]
    fn truncated_header() {
        let buf = [0u8; 10];
        assert_eq!(FdtHeader::read(&buf), Err(FdtError::TruncatedData));
    }
}
