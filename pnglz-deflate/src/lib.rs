//! # pnglz Deflate
//!
//! Streaming DEFLATE (RFC 1951) compressor and decompressor, the codec
//! underneath a PNG encoder and decoder.
//!
//! Both directions are push/pull state machines over in-memory buffers:
//! the caller feeds byte chunks in and drains byte chunks out, and no call
//! ever blocks or performs I/O.
//!
//! ## Features
//!
//! - **Compression**: dynamic Huffman blocks over a hash-chain match finder
//!   - Greedy, lazy, and optimal (match graph shortest path) parsing
//!   - Window sizes from 256 bytes to 32 KiB
//!   - Output independent of how the input is split across pushes
//! - **Decompression**: all DEFLATE block types
//!   - Stored, fixed Huffman, and dynamic Huffman blocks
//!   - Resumable at any bit boundary
//!   - Bounded memory: only the back-reference window is retained
//! - **Formats**: zlib, gzip (single member), and raw DEFLATE (iOS)
//!
//! ## Example
//!
//! ```rust
//! use pnglz_deflate::{Format, compress, decompress};
//!
//! let original = b"Hello, World! Hello, World!";
//! let compressed = compress(original, Format::Zlib, 9);
//! let decompressed = decompress(&compressed, Format::Zlib).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! ## Compression Levels
//!
//! - Level 0-3: greedy matching
//! - Level 4-7: lazy matching
//! - Level 8-13: optimal parsing, with more refinement passes per level
//!   (default is 9)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod deflate;
pub mod depths;
pub mod format;
pub mod gzip;
pub mod huffman;
pub mod inflate;
pub mod level;
pub mod matches;
pub mod output;
pub mod tables;
pub mod window;
pub mod zlib;

// Re-exports
pub use deflate::{Deflator, compress};
pub use format::Format;
pub use huffman::{HuffmanBuilder, HuffmanCode, HuffmanTree};
pub use inflate::{Inflator, decompress};
pub use level::{CompressionLevel, Search};
pub use pnglz_core::{PnglzError, Result};
pub use zlib::{ZlibHeader, ZlibLevel};
