//! FDT parsing error type.

use core::fmt;

/// Errors that can occur while parsing a flattened device tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdtError {
    /// The header magic was not `0xd00dfeed`.
    InvalidMagic,
    /// The blob is shorter than the header or a declared block offset.
    TruncatedData,
    /// A structural invariant was violated (overlapping blocks, a token
    /// stream that ends mid-node, an unrecognized token).
    InvalidStructure,
}

impl fmt::Display for FdtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMagic => f.write_str("invalid FDT magic"),
            Self::TruncatedData => f.write_str("FDT data truncated"),
            Self::InvalidStructure => f.write_str("malformed FDT structure block"),
        }
    }
}
