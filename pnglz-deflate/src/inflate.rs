//! DEFLATE decompression.
//!
//! [`Inflator`] is a resumable state machine. Each [`push`](Inflator::push)
//! appends input and advances as far as the buffered bits allow. A state
//! that runs out of input returns without committing anything, so the next
//! push retries it from the same bit.
//!
//! ```text
//! Header -> [gzip fields] -> Block -+-> Tables -> Compressed -+-> Block ...
//!                                   +-> Compressed -----------+
//!                                   +-> Stored ---------------+
//!                                                              \-> Checksum -> [Length] -> Done
//! ```

use crate::format::{Format, Integral};
use crate::gzip::{FCOMMENT, FEXTRA, FHCRC, FNAME, GzipHeader};
use crate::huffman::{HuffmanTree, MAX_CODE_LENGTH};
use crate::output::Output;
use crate::tables::{
    CODE_LENGTH_ORDER, DISTANCE_BASE, DISTANCE_EXTRA_BITS, DISTANCE_SYMBOLS, END_OF_BLOCK,
    LENGTH_BASE, LENGTH_EXTRA_BITS, RUNLITERAL_SYMBOLS, fixed_distance_lengths,
    fixed_runliteral_lengths,
};
use crate::zlib::{MAX_EXPONENT, ZlibHeader};
use pnglz_core::BitCursor;
use pnglz_core::crc::Crc32;
use pnglz_core::error::{PnglzError, Result};
use std::sync::OnceLock;

/// Decoders for one compressed block.
#[derive(Debug, Clone)]
enum Codes {
    /// The fixed codes of block type 1.
    Fixed,
    /// Codes transmitted in the block header.
    Dynamic {
        runliteral: HuffmanTree,
        distance: HuffmanTree,
    },
}

fn fixed_codes() -> &'static (HuffmanTree, HuffmanTree) {
    static FIXED: OnceLock<(HuffmanTree, HuffmanTree)> = OnceLock::new();
    FIXED.get_or_init(|| {
        (
            HuffmanTree::build(&fixed_runliteral_lengths()),
            HuffmanTree::build(&fixed_distance_lengths()),
        )
    })
}

#[derive(Debug, Clone)]
enum State {
    /// zlib or gzip header.
    Header,
    /// gzip XLEN. `pending` holds the optional-field flags still to handle.
    Extra { pending: u8 },
    /// gzip extra field payload.
    ExtraData { pending: u8, remaining: usize },
    /// gzip file name, up to its NUL.
    Name { pending: u8 },
    /// gzip comment, up to its NUL.
    Comment { pending: u8 },
    /// gzip header CRC-16.
    HeaderCrc,
    /// Block type and, for dynamic blocks, the codelength code.
    Block,
    /// Dynamic block code lengths.
    Tables {
        last: bool,
        metatree: HuffmanTree,
        runliteral_count: usize,
        distance_count: usize,
    },
    /// Huffman coded block data.
    Compressed { last: bool, codes: Codes },
    /// Stored block data.
    Stored { last: bool, remaining: usize },
    /// Adler-32 or CRC-32 trailer.
    Checksum,
    /// gzip ISIZE trailer.
    Length,
    Done,
}

/// What a state transition achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Moved on; keep going.
    Progress,
    /// Needs more input.
    Starved,
    /// The stream is complete.
    Finished,
}

/// Decode a Huffman symbol at bit `p`.
///
/// Returns `None` if the code runs past the valid input.
fn decode_at(input: &BitCursor, tree: &HuffmanTree, p: usize) -> Result<Option<(usize, usize)>> {
    let count = input.count();
    match tree.decode(input.read(p, 16)) {
        Ok((symbol, length)) => {
            let length = usize::from(length);
            Ok((p + length <= count).then_some((usize::from(symbol), length)))
        }
        Err(_) if p + usize::from(MAX_CODE_LENGTH) > count => Ok(None),
        Err(error) => Err(error),
    }
}

/// Streaming DEFLATE decompressor.
///
/// # Example
///
/// ```
/// use pnglz_deflate::{Format, Inflator};
///
/// let compressed = [
///     0x78, 0x9C, 0x4B, 0x4C, 0x4A, 0x06, 0x00, 0x02, 0x4D, 0x01, 0x27,
/// ];
/// let mut inflator = Inflator::new(Format::Zlib);
/// assert_eq!(inflator.push(&compressed[..5]), Ok(Some(())));
/// assert_eq!(inflator.push(&compressed[5..]), Ok(None));
/// assert_eq!(inflator.pull(), b"abc");
/// ```
#[derive(Debug, Clone)]
pub struct Inflator {
    format: Format,
    state: State,
    input: BitCursor,
    /// Bit offset of the next unread input bit.
    b: usize,
    output: Output<Integral>,
    /// Running CRC over the gzip header, for FHCRC.
    header_crc: Crc32,
    /// Bytes pushed so far.
    received: u64,
    error: Option<PnglzError>,
}

impl Inflator {
    /// Create a decompressor for the given format.
    pub fn new(format: Format) -> Self {
        Self {
            format,
            state: State::Header,
            input: BitCursor::new(),
            b: 0,
            output: Output::new(MAX_EXPONENT, format.integral()),
            header_crc: Crc32::new(),
            received: 0,
            error: None,
        }
    }

    /// The stream format.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Returns `true` once the trailer has been verified.
    pub fn is_finished(&self) -> bool {
        self.error.is_none() && matches!(self.state, State::Done)
    }

    /// Number of decoded bytes ready to be pulled.
    pub fn available(&self) -> usize {
        self.output.available()
    }

    /// Feed compressed input and decode as far as possible.
    ///
    /// Returns `Ok(Some(()))` if more input is needed and `Ok(None)` once the
    /// stream is complete; bytes after the end of the stream are ignored.
    /// Errors are fatal: every later call returns the same error.
    pub fn push(&mut self, data: &[u8]) -> Result<Option<()>> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if self.is_finished() {
            return Ok(None);
        }

        self.input.rebase(data, &mut self.b);
        self.received += data.len() as u64;

        loop {
            let state = std::mem::replace(&mut self.state, State::Done);
            match self.transition(state) {
                Ok((next, step)) => {
                    self.state = next;
                    match step {
                        Step::Progress => {}
                        Step::Starved => return Ok(Some(())),
                        Step::Finished => return Ok(None),
                    }
                }
                Err(error) => {
                    self.error = Some(error.clone());
                    return Err(error);
                }
            }
        }
    }

    /// Take exactly `count` decoded bytes, or `None` if fewer are available.
    pub fn pull_exact(&mut self, count: usize) -> Option<Vec<u8>> {
        self.output.release(count)
    }

    /// Take every decoded byte available.
    pub fn pull(&mut self) -> Vec<u8> {
        self.output.release_all()
    }

    fn transition(&mut self, state: State) -> Result<(State, Step)> {
        match state {
            State::Header => self.header(),
            State::Extra { pending } => self.extra(pending),
            State::ExtraData { pending, remaining } => self.extra_data(pending, remaining),
            State::Name { pending } => {
                let next = Self::gzip_field(pending);
                self.terminated(State::Name { pending }, next)
            }
            State::Comment { pending } => {
                let next = Self::gzip_field(pending);
                self.terminated(State::Comment { pending }, next)
            }
            State::HeaderCrc => self.header_crc(),
            State::Block => self.block(),
            State::Tables {
                last,
                metatree,
                runliteral_count,
                distance_count,
            } => self.tables(last, metatree, runliteral_count, distance_count),
            State::Compressed { last, codes } => self.compressed(last, codes),
            State::Stored { last, remaining } => self.stored(last, remaining),
            State::Checksum => self.checksum(),
            State::Length => self.length(),
            State::Done => Ok((State::Done, Step::Finished)),
        }
    }

    /// Returns `true` if `bits` more bits are buffered at `p`.
    #[inline]
    fn has(&self, p: usize, bits: usize) -> bool {
        p + bits <= self.input.count()
    }

    fn header(&mut self) -> Result<(State, Step)> {
        match self.format {
            Format::Zlib => {
                if !self.has(self.b, 16) {
                    return Ok((State::Header, Step::Starved));
                }
                let header = ZlibHeader::decode(self.input.byte(self.b), self.input.byte(self.b + 8))?;
                log::debug!(
                    "zlib header: window 2^{}, level {:?}",
                    header.exponent,
                    header.level
                );
                self.output.set_exponent(header.exponent);
                self.b += 16;
                Ok((State::Block, Step::Progress))
            }
            Format::Gzip => {
                if !self.has(self.b, GzipHeader::SIZE * 8) {
                    return Ok((State::Header, Step::Starved));
                }
                let mut bytes = [0u8; GzipHeader::SIZE];
                for (i, byte) in bytes.iter_mut().enumerate() {
                    *byte = self.input.byte(self.b + i * 8);
                }
                let header = GzipHeader::decode(&bytes)?;
                log::debug!(
                    "gzip header: flags {:#04x} (extra {}, name {}, comment {}, header crc {})",
                    header.flags,
                    header.has_extra(),
                    header.has_name(),
                    header.has_comment(),
                    header.has_header_crc()
                );
                self.header_crc.update(&bytes);
                self.b += GzipHeader::SIZE * 8;
                let pending = header.flags & (FEXTRA | FNAME | FCOMMENT | FHCRC);
                Ok((Self::gzip_field(pending), Step::Progress))
            }
            Format::Ios => Ok((State::Block, Step::Progress)),
        }
    }

    /// The state for the next optional gzip header field.
    fn gzip_field(pending: u8) -> State {
        if pending & FEXTRA != 0 {
            State::Extra {
                pending: pending & !FEXTRA,
            }
        } else if pending & FNAME != 0 {
            State::Name {
                pending: pending & !FNAME,
            }
        } else if pending & FCOMMENT != 0 {
            State::Comment {
                pending: pending & !FCOMMENT,
            }
        } else if pending & FHCRC != 0 {
            State::HeaderCrc
        } else {
            State::Block
        }
    }

    /// Consume one header byte into the header CRC.
    fn header_byte(&mut self) -> u8 {
        let byte = self.input.byte(self.b);
        self.header_crc.update(&[byte]);
        self.b += 8;
        byte
    }

    fn extra(&mut self, pending: u8) -> Result<(State, Step)> {
        if !self.has(self.b, 16) {
            return Ok((State::Extra { pending }, Step::Starved));
        }
        let low = self.header_byte();
        let high = self.header_byte();
        let remaining = usize::from(u16::from_le_bytes([low, high]));
        Ok((State::ExtraData { pending, remaining }, Step::Progress))
    }

    fn extra_data(&mut self, pending: u8, mut remaining: usize) -> Result<(State, Step)> {
        while remaining > 0 && self.has(self.b, 8) {
            self.header_byte();
            remaining -= 1;
        }
        if remaining > 0 {
            return Ok((State::ExtraData { pending, remaining }, Step::Starved));
        }
        Ok((Self::gzip_field(pending), Step::Progress))
    }

    /// Skip a NUL-terminated header field.
    fn terminated(&mut self, current: State, next: State) -> Result<(State, Step)> {
        while self.has(self.b, 8) {
            if self.header_byte() == 0 {
                return Ok((next, Step::Progress));
            }
        }
        Ok((current, Step::Starved))
    }

    fn header_crc(&mut self) -> Result<(State, Step)> {
        if !self.has(self.b, 16) {
            return Ok((State::HeaderCrc, Step::Starved));
        }
        let declared = self.input.read(self.b, 16);
        let computed = self.header_crc.value() as u16;
        if declared != computed {
            return Err(PnglzError::InvalidGzipHeaderChecksum { declared, computed });
        }
        self.b += 16;
        Ok((State::Block, Step::Progress))
    }

    fn block(&mut self) -> Result<(State, Step)> {
        let b = self.b;
        if !self.has(b, 3) {
            return Ok((State::Block, Step::Starved));
        }
        let header = self.input.read(b, 3);
        let last = header & 1 == 1;

        match header >> 1 {
            0 => {
                let q = (b + 3).next_multiple_of(8);
                if !self.has(q, 32) {
                    return Ok((State::Block, Step::Starved));
                }
                let length = self.input.read(q, 16);
                let complement = self.input.read(q + 16, 16);
                if length != !complement {
                    return Err(PnglzError::InvalidBlockElementCountParity(
                        length, complement,
                    ));
                }
                log::debug!("stored block: {length} bytes, final {last}");
                self.b = q + 32;
                Ok((
                    State::Stored {
                        last,
                        remaining: usize::from(length),
                    },
                    Step::Progress,
                ))
            }
            1 => {
                log::debug!("fixed block: final {last}");
                self.b = b + 3;
                Ok((
                    State::Compressed {
                        last,
                        codes: Codes::Fixed,
                    },
                    Step::Progress,
                ))
            }
            2 => {
                if !self.has(b, 17) {
                    return Ok((State::Block, Step::Starved));
                }
                let runliteral_count = usize::from(self.input.read(b + 3, 5)) + 257;
                let distance_count = usize::from(self.input.read(b + 8, 5)) + 1;
                let meta_count = usize::from(self.input.read(b + 13, 4)) + 4;
                if runliteral_count > RUNLITERAL_SYMBOLS {
                    return Err(PnglzError::InvalidHuffmanRunLiteralSymbolCount(
                        runliteral_count,
                    ));
                }
                if distance_count > DISTANCE_SYMBOLS {
                    return Err(PnglzError::InvalidHuffmanDistanceSymbolCount(
                        distance_count,
                    ));
                }
                if !self.has(b + 17, meta_count * 3) {
                    return Ok((State::Block, Step::Starved));
                }

                let mut lengths = [0u8; 19];
                for (i, &symbol) in CODE_LENGTH_ORDER.iter().take(meta_count).enumerate() {
                    lengths[symbol] = self.input.read(b + 17 + i * 3, 3) as u8;
                }
                let metatree = HuffmanTree::new(&lengths)
                    .ok_or(PnglzError::InvalidHuffmanCodelengthHuffmanTable)?;

                log::debug!(
                    "dynamic block: {runliteral_count} run-literal codes, \
                     {distance_count} distance codes, {meta_count} metacodes, final {last}"
                );
                self.b = b + 17 + meta_count * 3;
                Ok((
                    State::Tables {
                        last,
                        metatree,
                        runliteral_count,
                        distance_count,
                    },
                    Step::Progress,
                ))
            }
            kind => Err(PnglzError::InvalidBlockTypeCode(kind as u8)),
        }
    }

    fn tables(
        &mut self,
        last: bool,
        metatree: HuffmanTree,
        runliteral_count: usize,
        distance_count: usize,
    ) -> Result<(State, Step)> {
        let total = runliteral_count + distance_count;
        let mut lengths: Vec<u8> = Vec::with_capacity(total);
        let mut p = self.b;

        while lengths.len() < total {
            let Some((symbol, length)) = decode_at(&self.input, &metatree, p)? else {
                return Ok((
                    State::Tables {
                        last,
                        metatree,
                        runliteral_count,
                        distance_count,
                    },
                    Step::Starved,
                ));
            };
            p += length;

            let (value, extra_bits, base) = match symbol {
                0..=15 => {
                    lengths.push(symbol as u8);
                    continue;
                }
                16 => {
                    let &previous = lengths
                        .last()
                        .ok_or(PnglzError::InvalidHuffmanCodelengthSequence)?;
                    (previous, 2, 3)
                }
                17 => (0, 3, 3),
                _ => (0, 7, 11),
            };
            if !self.has(p, extra_bits) {
                return Ok((
                    State::Tables {
                        last,
                        metatree,
                        runliteral_count,
                        distance_count,
                    },
                    Step::Starved,
                ));
            }
            let count = base + usize::from(self.input.read(p, extra_bits as u32));
            p += extra_bits;

            if lengths.len() + count > total {
                return Err(PnglzError::InvalidHuffmanCodelengthSequence);
            }
            lengths.resize(lengths.len() + count, value);
        }

        let (runliteral, distance) = lengths.split_at(runliteral_count);
        if runliteral[usize::from(END_OF_BLOCK)] == 0 {
            return Err(PnglzError::InvalidHuffmanTable);
        }
        let runliteral =
            HuffmanTree::normalizing(runliteral).ok_or(PnglzError::InvalidHuffmanTable)?;
        let distance =
            HuffmanTree::normalizing(distance).ok_or(PnglzError::InvalidHuffmanTable)?;

        self.b = p;
        Ok((
            State::Compressed {
                last,
                codes: Codes::Dynamic {
                    runliteral,
                    distance,
                },
            },
            Step::Progress,
        ))
    }

    fn compressed(&mut self, last: bool, codes: Codes) -> Result<(State, Step)> {
        let (runliteral, distance) = match &codes {
            Codes::Fixed => {
                let (runliteral, distance) = fixed_codes();
                (runliteral, distance)
            }
            Codes::Dynamic {
                runliteral,
                distance,
            } => (runliteral, distance),
        };

        loop {
            let p = self.b;
            let Some((symbol, length)) = decode_at(&self.input, runliteral, p)? else {
                break;
            };

            match symbol {
                0..=255 => {
                    self.output.append(symbol as u8);
                    self.b = p + length;
                }
                256 => {
                    self.b = p + length;
                    return Ok(self.end_of_block(last));
                }
                257..=285 => {
                    let decade = symbol - 257;
                    let mut q = p + length;
                    let extra = usize::from(LENGTH_EXTRA_BITS[decade]);
                    let run = usize::from(LENGTH_BASE[decade])
                        + usize::from(self.input.read(q, extra as u32));
                    q += extra;

                    let Some((symbol, length)) = decode_at(&self.input, distance, q)? else {
                        break;
                    };
                    if symbol >= DISTANCE_SYMBOLS {
                        return Err(PnglzError::InvalidHuffmanCode);
                    }
                    q += length;
                    let extra = usize::from(DISTANCE_EXTRA_BITS[symbol]);
                    let offset = usize::from(DISTANCE_BASE[symbol])
                        + usize::from(self.input.read(q, extra as u32));
                    q += extra;

                    if !self.has(q, 0) {
                        break;
                    }
                    self.output.expand(offset, run)?;
                    self.b = q;
                }
                _ => return Err(PnglzError::InvalidHuffmanCode),
            }
        }

        Ok((State::Compressed { last, codes }, Step::Starved))
    }

    fn stored(&mut self, last: bool, mut remaining: usize) -> Result<(State, Step)> {
        let buffered = (self.input.count() - self.b) >> 3;
        let count = remaining.min(buffered);
        for i in 0..count {
            let byte = self.input.byte(self.b + i * 8);
            self.output.append(byte);
        }
        self.b += count * 8;
        remaining -= count;

        if remaining > 0 {
            return Ok((State::Stored { last, remaining }, Step::Starved));
        }
        Ok(self.end_of_block(last))
    }

    fn end_of_block(&mut self, last: bool) -> (State, Step) {
        match (last, self.format) {
            (false, _) => (State::Block, Step::Progress),
            (true, Format::Ios) => {
                self.log_completion();
                (State::Done, Step::Finished)
            }
            (true, _) => (State::Checksum, Step::Progress),
        }
    }

    /// Read the little-endian 32-bit word at byte-aligned bit `q`.
    fn word(&self, q: usize) -> u32 {
        u32::from_le_bytes([
            self.input.byte(q),
            self.input.byte(q + 8),
            self.input.byte(q + 16),
            self.input.byte(q + 24),
        ])
    }

    fn checksum(&mut self) -> Result<(State, Step)> {
        let q = self.b.next_multiple_of(8);
        if !self.has(q, 32) {
            return Ok((State::Checksum, Step::Starved));
        }
        let declared = match self.format {
            Format::Zlib => self.word(q).swap_bytes(),
            _ => self.word(q),
        };
        let computed = self.output.checksum();
        if declared != computed {
            return Err(PnglzError::checksum_mismatch(declared, computed));
        }
        self.b = q + 32;

        if self.format == Format::Gzip {
            return Ok((State::Length, Step::Progress));
        }
        self.log_completion();
        Ok((State::Done, Step::Finished))
    }

    fn length(&mut self) -> Result<(State, Step)> {
        if !self.has(self.b, 32) {
            return Ok((State::Length, Step::Starved));
        }
        let declared = self.word(self.b);
        let computed = self.output.total() as u32;
        if declared != computed {
            return Err(PnglzError::InvalidStreamLength { declared, computed });
        }
        self.b += 32;
        self.log_completion();
        Ok((State::Done, Step::Finished))
    }

    fn log_completion(&self) {
        log::debug!(
            "finished {:?} stream: {} bytes in, {} bytes out",
            self.format,
            self.received,
            self.output.total()
        );
    }
}

/// Decompress a complete stream in one call.
///
/// Returns [`PnglzError::UnexpectedEndOfStream`] if `data` ends before the
/// stream does.
pub fn decompress(data: &[u8], format: Format) -> Result<Vec<u8>> {
    let mut inflator = Inflator::new(format);
    match inflator.push(data)? {
        None => Ok(inflator.pull()),
        Some(()) => Err(PnglzError::UnexpectedEndOfStream),
    }
}
