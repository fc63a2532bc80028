//! Gzip member header (RFC 1952).
//!
//! ```text
//! +---+---+---+---+---+---+---+---+---+---+
//! |ID1|ID2|CM |FLG|     MTIME     |XFL|OS |
//! +---+---+---+---+---+---+---+---+---+---+
//! ```
//!
//! The fixed part may be followed by optional fields selected by FLG:
//! an extra field (2-byte little-endian length, then data), a
//! NUL-terminated file name, a NUL-terminated comment, and a 2-byte
//! header CRC. The inflator walks those fields itself; this module only
//! deals with the fixed ten bytes.

use pnglz_core::error::{PnglzError, Result};

/// Gzip magic bytes.
pub const MAGIC: [u8; 2] = [0x1F, 0x8B];

/// The DEFLATE compression method.
pub const CM_DEFLATE: u8 = 8;

/// Flag: the payload is probably text.
pub const FTEXT: u8 = 0x01;
/// Flag: a CRC-16 of the header precedes the compressed data.
pub const FHCRC: u8 = 0x02;
/// Flag: an extra field is present.
pub const FEXTRA: u8 = 0x04;
/// Flag: a NUL-terminated file name is present.
pub const FNAME: u8 = 0x08;
/// Flag: a NUL-terminated comment is present.
pub const FCOMMENT: u8 = 0x10;
/// Flag bits that must be zero.
pub const RESERVED: u8 = 0xE0;

/// OS byte for "unknown".
pub const OS_UNKNOWN: u8 = 0xFF;

/// The fixed part of a gzip header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipHeader {
    /// Flag byte.
    pub flags: u8,
    /// Modification time, seconds since the epoch (0 if unknown).
    pub mtime: u32,
    /// Extra flags.
    pub extra_flags: u8,
    /// Operating system that produced the stream.
    pub os: u8,
}

impl Default for GzipHeader {
    fn default() -> Self {
        Self {
            flags: 0,
            mtime: 0,
            extra_flags: 0,
            os: OS_UNKNOWN,
        }
    }
}

impl GzipHeader {
    /// Size of the fixed header in bytes.
    pub const SIZE: usize = 10;

    /// Serialize the fixed header.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..2].copy_from_slice(&MAGIC);
        bytes[2] = CM_DEFLATE;
        bytes[3] = self.flags;
        bytes[4..8].copy_from_slice(&self.mtime.to_le_bytes());
        bytes[8] = self.extra_flags;
        bytes[9] = self.os;
        bytes
    }

    /// Parse and validate the fixed header.
    pub fn decode(bytes: &[u8; Self::SIZE]) -> Result<Self> {
        if bytes[0..2] != MAGIC {
            return Err(PnglzError::InvalidGzipSigil);
        }
        if bytes[2] != CM_DEFLATE {
            return Err(PnglzError::InvalidCompressionMethod(bytes[2]));
        }
        let flags = bytes[3];
        if flags & RESERVED != 0 {
            return Err(PnglzError::InvalidGzipFlags(flags));
        }

        Ok(Self {
            flags,
            mtime: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            extra_flags: bytes[8],
            os: bytes[9],
        })
    }

    /// Whether an extra field follows.
    pub fn has_extra(&self) -> bool {
        self.flags & FEXTRA != 0
    }

    /// Whether a file name follows.
    pub fn has_name(&self) -> bool {
        self.flags & FNAME != 0
    }

    /// Whether a comment follows.
    pub fn has_comment(&self) -> bool {
        self.flags & FCOMMENT != 0
    }

    /// Whether a header CRC follows.
    pub fn has_header_crc(&self) -> bool {
        self.flags & FHCRC != 0
    }
}
