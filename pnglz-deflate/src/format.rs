//! Stream formats and their running checksums.

use pnglz_core::{Adler32, Checksum, Crc32};

/// The wrapper around the raw DEFLATE blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// zlib (RFC 1950): 2-byte header, big-endian Adler-32 trailer.
    #[default]
    Zlib,
    /// gzip (RFC 1952): 10-byte header, CRC-32 and size trailer.
    Gzip,
    /// Raw DEFLATE with a fixed 32 KiB window, no header or trailer.
    Ios,
}

impl Format {
    /// The running checksum this format's trailer carries.
    pub fn integral(self) -> Integral {
        match self {
            Self::Zlib => Integral::Adler32(Adler32::new()),
            Self::Gzip => Integral::Crc32(Crc32::new()),
            Self::Ios => Integral::Disabled,
        }
    }
}

/// A running checksum selected at runtime.
#[derive(Debug, Clone, Default)]
pub enum Integral {
    /// No checksum is kept.
    #[default]
    Disabled,
    /// Adler-32, for zlib streams.
    Adler32(Adler32),
    /// CRC-32, for gzip streams.
    Crc32(Crc32),
}

impl Checksum for Integral {
    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Disabled => {}
            Self::Adler32(adler) => adler.update(data),
            Self::Crc32(crc) => crc.update(data),
        }
    }

    fn value(&self) -> u32 {
        match self {
            Self::Disabled => 0,
            Self::Adler32(adler) => adler.value(),
            Self::Crc32(crc) => crc.value(),
        }
    }
}
