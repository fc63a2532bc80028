//! Zlib stream header (RFC 1950).
//!
//! # Format
//!
//! ```text
//! +---+---+============+---+---+---+---+
//! |CMF|FLG| compressed |    ADLER32    |
//! +---+---+============+---+---+---+---+
//! ```
//!
//! - CMF: Compression Method and Flags
//!   - Bits 0-3: CM (Compression Method) - must be 8 for DEFLATE
//!   - Bits 4-7: CINFO (Compression Info) - log2(window size) - 8
//! - FLG: Flags
//!   - Bits 0-4: FCHECK - check bits so (CMF*256 + FLG) mod 31 == 0
//!   - Bit 5: FDICT - preset dictionary present
//!   - Bits 6-7: FLEVEL - compression level (0-3)
//! - Compressed data (DEFLATE format)
//! - ADLER32: Adler-32 checksum of uncompressed data (big-endian)

use crate::level::{CompressionLevel, Search};
use pnglz_core::error::{PnglzError, Result};

/// The DEFLATE compression method.
pub const CM_DEFLATE: u8 = 8;

/// Largest window exponent a zlib header can declare.
pub const MAX_EXPONENT: u32 = 15;

/// Smallest window exponent a zlib header can declare.
pub const MIN_EXPONENT: u32 = 8;

/// Zlib compression level indicator in header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ZlibLevel {
    /// Fastest compression.
    Fastest = 0,
    /// Fast compression.
    Fast = 1,
    /// Default compression.
    Default = 2,
    /// Maximum compression.
    Maximum = 3,
}

impl From<CompressionLevel> for ZlibLevel {
    fn from(level: CompressionLevel) -> Self {
        match level.search() {
            Search::Greedy { attempts, .. } if attempts < 4 => Self::Fastest,
            Search::Greedy { .. } => Self::Fast,
            Search::Lazy { .. } => Self::Default,
            Search::Full { .. } => Self::Maximum,
        }
    }
}

impl ZlibLevel {
    fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => Self::Fastest,
            1 => Self::Fast,
            2 => Self::Default,
            _ => Self::Maximum,
        }
    }
}

/// A decoded or to-be-encoded zlib header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZlibHeader {
    /// Window size exponent, 8-15.
    pub exponent: u32,
    /// Informational compression level.
    pub level: ZlibLevel,
}

impl ZlibHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 2;

    /// Create a header for a compressor.
    pub fn new(exponent: u32, level: CompressionLevel) -> Self {
        Self {
            exponent,
            level: level.into(),
        }
    }

    /// Window size in bytes.
    pub fn window_size(&self) -> usize {
        1 << self.exponent
    }

    /// Serialize the header.
    pub fn encode(&self) -> [u8; 2] {
        let cmf = ((self.exponent - MIN_EXPONENT) as u8) << 4 | CM_DEFLATE;
        let flg = (self.level as u8) << 6;
        let remainder = (u16::from(cmf) << 8 | u16::from(flg)) % 31;
        let fcheck = if remainder == 0 {
            0
        } else {
            (31 - remainder) as u8
        };
        [cmf, flg | fcheck]
    }

    /// Parse and validate a header.
    pub fn decode(cmf: u8, flg: u8) -> Result<Self> {
        let method = cmf & 0x0F;
        if method != CM_DEFLATE {
            return Err(PnglzError::InvalidCompressionMethod(method));
        }

        let exponent = u32::from(cmf >> 4) + MIN_EXPONENT;
        if exponent > MAX_EXPONENT {
            return Err(PnglzError::InvalidWindowSize { exponent });
        }

        if (u16::from(cmf) << 8 | u16::from(flg)) % 31 != 0 {
            return Err(PnglzError::InvalidCheckBits);
        }

        if flg & 0x20 != 0 {
            return Err(PnglzError::UnexpectedDictionary);
        }

        Ok(Self {
            exponent,
            level: ZlibLevel::from_bits(flg >> 6),
        })
    }
}
