//! Error types for pnglz operations.
//!
//! Compression cannot fail once a compressor has been constructed, so almost
//! every variant here describes a malformed compressed stream. All of them
//! are fatal: a decompressor that has returned one of these errors will keep
//! returning it for every further call.
//!
//! Running out of input is *not* an error and has no variant here. It is
//! reported through the `Ok(Some(()))` return of the stream `push` methods.

use thiserror::Error;

/// The main error type for pnglz operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PnglzError {
    /// The zlib header declared a compression method other than 8 (DEFLATE).
    #[error("Invalid compression method: {0}")]
    InvalidCompressionMethod(u8),

    /// The zlib header declared a window larger than 32 KiB.
    #[error("Invalid window size: 2^{exponent} bytes")]
    InvalidWindowSize {
        /// The window size exponent (8 + CINFO).
        exponent: u32,
    },

    /// The zlib header check bits do not make the header a multiple of 31.
    #[error("Invalid stream header check bits")]
    InvalidCheckBits,

    /// The zlib header requested a preset dictionary.
    #[error("Unexpected preset dictionary in stream header")]
    UnexpectedDictionary,

    /// The gzip header did not start with `1f 8b`.
    #[error("Invalid gzip signature")]
    InvalidGzipSigil,

    /// The gzip header set reserved flag bits.
    #[error("Invalid gzip flag bits: {0:#010b}")]
    InvalidGzipFlags(u8),

    /// The gzip header CRC-16 (FHCRC) did not match the header bytes.
    #[error("Gzip header checksum mismatch: declared {declared:#06x}, computed {computed:#06x}")]
    InvalidGzipHeaderChecksum {
        /// Checksum stored in the header.
        declared: u16,
        /// Checksum computed over the header bytes.
        computed: u16,
    },

    /// A block header carried the reserved block type 3.
    #[error("Invalid block type code: {0}")]
    InvalidBlockTypeCode(u8),

    /// A stored block's length field is not the one's complement of its
    /// check field.
    #[error("Stored block length {0:#06x} does not match its complement {1:#06x}")]
    InvalidBlockElementCountParity(u16, u16),

    /// A dynamic block declared more than 286 run-literal symbols.
    #[error("Invalid run-literal symbol count: {0}")]
    InvalidHuffmanRunLiteralSymbolCount(usize),

    /// A dynamic block declared more than 30 distance symbols.
    #[error("Invalid distance symbol count: {0}")]
    InvalidHuffmanDistanceSymbolCount(usize),

    /// The codelength (meta) Huffman table was over- or under-subscribed.
    #[error("Invalid codelength Huffman table")]
    InvalidHuffmanCodelengthHuffmanTable,

    /// The codelength sequence was malformed, for example a repeat with no
    /// previous length or a run past the declared symbol count.
    #[error("Invalid codelength sequence")]
    InvalidHuffmanCodelengthSequence,

    /// The run-literal or distance Huffman table was over- or
    /// under-subscribed.
    #[error("Invalid run-literal or distance Huffman table")]
    InvalidHuffmanTable,

    /// The bitstream contained a code that maps to no symbol.
    #[error("Invalid Huffman code")]
    InvalidHuffmanCode,

    /// A back-reference pointed before the start of the available output.
    #[error("Invalid string reference: distance {distance} exceeds {available} available bytes")]
    InvalidStringReference {
        /// The decoded distance.
        distance: usize,
        /// Number of output bytes the distance may reach back over.
        available: usize,
    },

    /// The trailer checksum did not match the decompressed data.
    #[error("Stream checksum mismatch: declared {declared:#010x}, computed {computed:#010x}")]
    InvalidStreamChecksum {
        /// Checksum stored in the trailer.
        declared: u32,
        /// Checksum computed over the output.
        computed: u32,
    },

    /// The gzip trailer size did not match the decompressed length.
    #[error("Stream length mismatch: declared {declared}, computed {computed}")]
    InvalidStreamLength {
        /// Size (mod 2^32) stored in the trailer.
        declared: u32,
        /// Size (mod 2^32) of the output.
        computed: u32,
    },

    /// A compressor was configured with a window exponent outside `8..=15`.
    #[error("Invalid window exponent {0}: must be between 8 and 15")]
    InvalidWindowExponent(u32),

    /// A one-shot decompression ran out of input before the stream ended.
    #[error("Unexpected end of compressed stream")]
    UnexpectedEndOfStream,
}

/// Result type alias for pnglz operations.
pub type Result<T> = std::result::Result<T, PnglzError>;

impl PnglzError {
    /// Create a stream checksum mismatch error.
    pub fn checksum_mismatch(declared: u32, computed: u32) -> Self {
        Self::InvalidStreamChecksum { declared, computed }
    }

    /// Create a string reference error.
    pub fn string_reference(distance: usize, available: usize) -> Self {
        Self::InvalidStringReference {
            distance,
            available,
        }
    }

    /// Returns `true` if the error came from a stream header (zlib or gzip).
    pub fn is_header_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCompressionMethod(_)
                | Self::InvalidWindowSize { .. }
                | Self::InvalidCheckBits
                | Self::UnexpectedDictionary
                | Self::InvalidGzipSigil
                | Self::InvalidGzipFlags(_)
                | Self::InvalidGzipHeaderChecksum { .. }
        )
    }

    /// Returns `true` if the error came from a stream trailer.
    pub fn is_trailer_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidStreamChecksum { .. } | Self::InvalidStreamLength { .. }
        )
    }
}
