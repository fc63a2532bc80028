//! # pnglz Core
//!
//! Core components for the pnglz DEFLATE codec.
//!
//! This crate provides the plumbing that both stream directions share:
//!
//! - [`bitstream`]: LSB-first bit sink (compressor output) and bit cursor
//!   (decompressor input)
//! - [`adler`]: Adler-32, the zlib trailer checksum
//! - [`crc`]: CRC-32, the gzip trailer checksum
//! - [`traits`]: the [`Checksum`] trait unifying both checksums
//! - [`error`]: the decompression error taxonomy
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Stream formats                                      │
//! │     zlib, gzip and raw wrappers, push/pull/pop API      │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     match finding, Huffman coding, block state machines │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Bitstream (this crate)                              │
//! │     BitSink/BitCursor, Adler-32, CRC-32, errors         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use pnglz_core::adler::Adler32;
//! use pnglz_core::bitstream::BitSink;
//! use pnglz_core::crc::Crc32;
//!
//! let mut sink = BitSink::new(4096);
//! sink.append(0xCD, 8);
//! assert_eq!(sink.pull(), vec![0xCD]);
//!
//! assert_eq!(Crc32::compute(b"Hello, World!"), 0xEC4AC3D0);
//! assert_eq!(Adler32::checksum(b"Wikipedia"), 0x11E60398);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod adler;
pub mod bitstream;
pub mod crc;
pub mod error;
pub mod traits;

// Re-exports for convenience
pub use adler::Adler32;
pub use bitstream::{BitCursor, BitSink};
pub use crc::Crc32;
pub use error::{PnglzError, Result};
pub use traits::Checksum;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::adler::Adler32;
    pub use crate::bitstream::{BitCursor, BitSink};
    pub use crate::crc::Crc32;
    pub use crate::error::{PnglzError, Result};
    pub use crate::traits::Checksum;
}
