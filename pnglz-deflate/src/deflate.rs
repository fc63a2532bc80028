//! DEFLATE compression.
//!
//! [`Deflator`] is a push/pull compressor. Input is queued by
//! [`push`](Deflator::push) and compressed in dynamic Huffman blocks as the
//! match buffer fills; finished bytes are collected with
//! [`pop`](Deflator::pop) or [`pull`](Deflator::pull). Nothing blocks and
//! nothing fails once the compressor is constructed.
//!
//! Compression runs only when more than [`HOLD_BACK`] bytes are queued, and
//! it always leaves the last [`Search::lookahead`] bytes alone until the
//! stream is finished. The output therefore depends on the data alone and
//! not on how it was split across calls.

use crate::format::{Format, Integral};
use crate::gzip::GzipHeader;
use crate::huffman::{Codeword, HuffmanCode, MAX_META_LENGTH};
use crate::level::{CompressionLevel, Search};
use crate::matches::{Block, Graph, MatchBuffer, Term, Terms};
use crate::tables::{CODE_LENGTH_ORDER, END_OF_BLOCK, distance_code, run_code};
use crate::window::{Head, Window};
use crate::zlib::{MAX_EXPONENT, MIN_EXPONENT, ZlibHeader};
use pnglz_core::BitSink;
use pnglz_core::error::{PnglzError, Result};
use pnglz_core::traits::Checksum;

/// Queued input size that triggers compression.
pub const HOLD_BACK: usize = 4096;

/// Default output chunk size.
pub const DEFAULT_HINT: usize = 4096;

/// Matches at least this long let full search skip the positions they
/// cover, minus this many.
const SKIP_MARGIN: usize = 100;

/// Input bytes queued but not yet inserted into the window.
#[derive(Debug, Clone, Default)]
struct Input {
    bytes: Vec<u8>,
    cursor: usize,
}

impl Input {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.cursor
    }

    /// The input starting `back` bytes before the cursor.
    fn rewound(&self, back: usize) -> &[u8] {
        &self.bytes[self.cursor - back..]
    }

    /// Insert the next byte into the window.
    fn feed(&mut self, window: &mut Window) -> (Head, u8) {
        let byte = self.bytes[self.cursor];
        let key = self
            .bytes
            .get(self.cursor..self.cursor + 4)
            .map(|s| u32::from_le_bytes([s[0], s[1], s[2], s[3]]));
        self.cursor += 1;
        (window.update(byte, key), byte)
    }

    fn skip(&mut self, window: &mut Window, count: usize) {
        for _ in 0..count {
            self.feed(window);
        }
    }

    fn compact(&mut self) {
        self.bytes.drain(..self.cursor);
        self.cursor = 0;
    }
}

/// Streaming DEFLATE compressor.
///
/// # Example
///
/// ```
/// use pnglz_deflate::{Deflator, Format};
///
/// let mut deflator = Deflator::with_level(Format::Zlib, 6);
/// deflator.push(b"Hello, ", false);
/// deflator.push(b"World!", true);
/// let mut compressed = Vec::new();
/// while let Some(chunk) = deflator.pop() {
///     compressed.extend(chunk);
/// }
/// compressed.extend(deflator.pull());
/// assert_eq!(&compressed[..2], &[0x78, 0x9C]);
/// ```
#[derive(Debug, Clone)]
pub struct Deflator {
    format: Format,
    search: Search,
    window: Window,
    input: Input,
    matches: MatchBuffer,
    integral: Integral,
    /// Input length modulo 2^32.
    size: u32,
    output: BitSink,
    finished: bool,
}

impl Deflator {
    /// Create a compressor.
    ///
    /// `exponent` is the base-2 logarithm of the window size and must lie in
    /// 8..=15; the iOS format always uses 15. `hint` is the size of the
    /// chunks handed out by [`pop`](Self::pop).
    pub fn new(
        format: Format,
        level: impl Into<CompressionLevel>,
        exponent: u32,
        hint: usize,
    ) -> Result<Self> {
        let exponent = if format == Format::Ios {
            MAX_EXPONENT
        } else {
            exponent
        };
        if !(MIN_EXPONENT..=MAX_EXPONENT).contains(&exponent) {
            return Err(PnglzError::InvalidWindowExponent(exponent));
        }
        Ok(Self::build(format, level.into(), exponent, hint))
    }

    /// Create a compressor with a 32 KiB window and the default chunk size.
    pub fn with_level(format: Format, level: impl Into<CompressionLevel>) -> Self {
        Self::build(format, level.into(), MAX_EXPONENT, DEFAULT_HINT)
    }

    fn build(format: Format, level: CompressionLevel, exponent: u32, hint: usize) -> Self {
        let search = level.search();
        let matches = match search {
            Search::Full { .. } => MatchBuffer::Graph(Graph::new()),
            Search::Greedy { .. } | Search::Lazy { .. } => MatchBuffer::Terms(Terms::new()),
        };

        let mut output = BitSink::new(hint);
        match format {
            Format::Zlib => output.append_bytes(&ZlibHeader::new(exponent, level).encode()),
            Format::Gzip => output.append_bytes(&GzipHeader::default().encode()),
            Format::Ios => {}
        }

        Self {
            format,
            search,
            window: Window::new(exponent),
            input: Input::default(),
            matches,
            integral: format.integral(),
            size: 0,
            output,
            finished: false,
        }
    }

    /// The stream format.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Returns `true` once the final block and trailer have been written.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Queue input. Set `last` on the final call to flush everything and
    /// write the trailer. Input pushed after that is ignored.
    pub fn push(&mut self, data: &[u8], last: bool) {
        if self.finished {
            return;
        }

        self.integral.update(data);
        self.size = self.size.wrapping_add(data.len() as u32);
        self.input.bytes.extend_from_slice(data);

        if last {
            self.finish();
        } else if self.input.remaining() > HOLD_BACK {
            self.compress(false);
        }
    }

    /// Take the oldest complete output chunk, if any.
    pub fn pop(&mut self) -> Option<Vec<u8>> {
        self.output.pop()
    }

    /// Take the oldest complete output chunk, or if there is none, all
    /// complete output bytes.
    pub fn pull(&mut self) -> Vec<u8> {
        self.output.pull()
    }

    /// Run the match search over the queued input, writing a block each time
    /// the match buffer fills. Unless `last` is set the lookahead is left
    /// queued.
    fn compress(&mut self, last: bool) {
        let reserve = if last { 0 } else { self.search.lookahead() };
        let (attempts, goal) = self.search.bounds();

        loop {
            let filled = match (&mut self.matches, self.search) {
                (MatchBuffer::Graph(graph), _) => {
                    full(&mut self.window, &mut self.input, graph, reserve, attempts, goal)
                }
                (MatchBuffer::Terms(terms), Search::Lazy { .. }) => {
                    lazy(&mut self.window, &mut self.input, terms, reserve, attempts, goal)
                }
                (MatchBuffer::Terms(terms), _) => {
                    greedy(&mut self.window, &mut self.input, terms, reserve, attempts, goal)
                }
            };
            if !filled {
                break;
            }
            self.write_block(false);
        }

        self.input.compact();
    }

    fn finish(&mut self) {
        if self.input.remaining() < 3 && self.matches.is_empty() {
            let tail = std::mem::take(&mut self.input.bytes);
            write_stored_block(&mut self.output, &tail, true);
        } else {
            self.compress(true);
            self.write_block(true);
        }

        self.output.pad();
        match self.format {
            Format::Zlib => self
                .output
                .append_bytes(&self.integral.value().to_be_bytes()),
            Format::Gzip => {
                self.output
                    .append_bytes(&self.integral.value().to_le_bytes());
                self.output.append_bytes(&self.size.to_le_bytes());
            }
            Format::Ios => {}
        }
        self.finished = true;

        log::debug!(
            "finished {:?} stream: {} bytes in, {} bytes out",
            self.format,
            self.size,
            self.output.bits_written() >> 3
        );
    }

    fn write_block(&mut self, last: bool) {
        let block = match &mut self.matches {
            MatchBuffer::Terms(terms) => terms.block(),
            MatchBuffer::Graph(graph) => graph.block(self.search.iterations()),
        };
        write_dynamic_block(&mut self.output, &block, last);
    }
}

/// Greedy search: take the longest match at every position.
///
/// Returns `true` if it stopped because the term vector is full.
fn greedy(
    window: &mut Window,
    input: &mut Input,
    terms: &mut Terms,
    reserve: usize,
    attempts: usize,
    goal: usize,
) -> bool {
    while input.remaining() > reserve {
        if terms.unfilled() == 0 {
            return true;
        }
        let (head, byte) = input.feed(window);
        match window.longest_match(head, input.rewound(1), attempts, goal) {
            Some(found) => {
                terms.push(Term::Match {
                    run: found.run as u16,
                    distance: found.distance as u16,
                });
                input.skip(window, found.run - 1);
            }
            None => terms.push(Term::Literal(byte)),
        }
    }
    false
}

/// Lazy search: before taking a match, check whether the match one byte
/// later is longer.
fn lazy(
    window: &mut Window,
    input: &mut Input,
    terms: &mut Terms,
    reserve: usize,
    attempts: usize,
    goal: usize,
) -> bool {
    while input.remaining() > reserve {
        if terms.unfilled() < 2 {
            return true;
        }
        let (head, first) = input.feed(window);
        let Some(eager) = window.longest_match(head, input.rewound(1), attempts, goal) else {
            terms.push(Term::Literal(first));
            continue;
        };

        // an eager match of at least 5 bytes guarantees a next byte
        let (head, _) = input.feed(window);
        match window.longest_match(head, input.rewound(1), attempts, goal) {
            Some(later) if later.run > eager.run => {
                terms.push(Term::Literal(first));
                terms.push(Term::Match {
                    run: later.run as u16,
                    distance: later.distance as u16,
                });
                input.skip(window, later.run - 1);
            }
            _ => {
                terms.push(Term::Match {
                    run: eager.run as u16,
                    distance: eager.distance as u16,
                });
                input.skip(window, eager.run - 2);
            }
        }
    }
    false
}

/// Full search: record every candidate run in the match graph.
fn full(
    window: &mut Window,
    input: &mut Input,
    graph: &mut Graph,
    reserve: usize,
    attempts: usize,
    goal: usize,
) -> bool {
    while input.remaining() > reserve {
        if graph.unfilled() == 0 {
            return true;
        }
        let (head, byte) = input.feed(window);
        let index = graph.push(byte);

        let mut extent = 0;
        window.match_runs(head, input.rewound(1), attempts, goal, |run, distance| {
            graph.set_edge(index, run, distance);
            extent = extent.max(run);
        });

        let skip = extent.saturating_sub(SKIP_MARGIN).min(graph.unfilled());
        for _ in 0..skip {
            let (_, byte) = input.feed(window);
            graph.push(byte);
        }
    }
    false
}

/// One entry of the run-length coded code length sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metaterm {
    /// A single code length, 0-15.
    Length(u8),
    /// Repeat the previous length 3-6 times.
    Repeat(u8),
    /// 3-138 zero lengths.
    Zeros(u8),
}

impl Metaterm {
    /// Metasymbol, extra bit count, and extra bit value.
    fn code(self) -> (usize, u32, u16) {
        match self {
            Self::Length(length) => (usize::from(length), 0, 0),
            Self::Repeat(count) => (16, 2, u16::from(count - 3)),
            Self::Zeros(count @ 3..=10) => (17, 3, u16::from(count - 3)),
            Self::Zeros(count) => (18, 7, u16::from(count - 11)),
        }
    }
}

/// Run-length code a code length sequence.
fn metaterms(lengths: &[u8]) -> Vec<Metaterm> {
    let mut metaterms = Vec::new();
    let mut i = 0;
    while i < lengths.len() {
        let length = lengths[i];
        let run = lengths[i..].iter().take_while(|&&l| l == length).count();
        i += run;

        let (cap, mut remaining) = if length == 0 {
            (138, run)
        } else {
            metaterms.push(Metaterm::Length(length));
            (6, run - 1)
        };
        while remaining > 0 {
            let chunk = remaining.min(cap);
            if chunk < 3 {
                metaterms.extend(std::iter::repeat_n(Metaterm::Length(length), chunk));
            } else if length == 0 {
                metaterms.push(Metaterm::Zeros(chunk as u8));
            } else {
                metaterms.push(Metaterm::Repeat(chunk as u8));
            }
            remaining -= chunk;
        }
    }
    metaterms
}

#[inline]
fn emit(sink: &mut BitSink, codeword: Codeword) {
    sink.append(codeword.bits, u32::from(codeword.length));
}

/// Write a block with dynamic Huffman codes.
fn write_dynamic_block(sink: &mut BitSink, block: &Block, last: bool) {
    let runliteral_count = block.runliteral.used_span().max(257);
    let distance_count = block.distance.used_span().max(1);

    let mut lengths = Vec::with_capacity(runliteral_count + distance_count);
    lengths.extend_from_slice(&block.runliteral.lengths()[..runliteral_count]);
    lengths.extend_from_slice(&block.distance.lengths()[..distance_count]);

    let metaterms = metaterms(&lengths);
    let mut frequencies = [0u32; 19];
    for metaterm in &metaterms {
        frequencies[metaterm.code().0] += 1;
    }
    let metatree = HuffmanCode::from_frequencies(&frequencies, MAX_META_LENGTH);
    let meta_count = CODE_LENGTH_ORDER
        .iter()
        .rposition(|&symbol| metatree.lengths()[symbol] > 0)
        .map_or(4, |last| (last + 1).max(4));

    sink.append(if last { 0b101 } else { 0b100 }, 3);
    sink.append((runliteral_count - 257) as u16, 5);
    sink.append((distance_count - 1) as u16, 5);
    sink.append((meta_count - 4) as u16, 4);
    for &symbol in &CODE_LENGTH_ORDER[..meta_count] {
        sink.append(u16::from(metatree.lengths()[symbol]), 3);
    }

    for metaterm in metaterms {
        let (symbol, extra_bits, extra) = metaterm.code();
        emit(sink, metatree.codeword(symbol));
        sink.append(extra, extra_bits);
    }

    for &term in &block.terms {
        match term {
            Term::Literal(byte) => emit(sink, block.runliteral.codeword(usize::from(byte))),
            Term::Match { run, distance } => {
                let (symbol, extra_bits, extra) = run_code(usize::from(run));
                emit(sink, block.runliteral.codeword(usize::from(symbol)));
                sink.append(extra, u32::from(extra_bits));

                let (symbol, extra_bits, extra) = distance_code(usize::from(distance));
                emit(sink, block.distance.codeword(usize::from(symbol)));
                sink.append(extra, u32::from(extra_bits));
            }
        }
    }
    emit(sink, block.runliteral.codeword(usize::from(END_OF_BLOCK)));

    log::debug!(
        "wrote {} dynamic block: {} terms, {} run-literal codes, {} distance codes, {} metacodes",
        if last { "final" } else { "non-final" },
        block.terms.len(),
        runliteral_count,
        distance_count,
        meta_count
    );
}

/// Write a stored block. `data` must fit in one block (65535 bytes).
fn write_stored_block(sink: &mut BitSink, data: &[u8], last: bool) {
    debug_assert!(data.len() <= usize::from(u16::MAX));

    let length = data.len() as u16;
    sink.append(u16::from(last), 3);
    sink.pad();
    sink.append(length, 16);
    sink.append(!length, 16);
    sink.append_bytes(data);

    log::debug!(
        "wrote {} stored block: {} bytes",
        if last { "final" } else { "non-final" },
        data.len()
    );
}

/// Compress `data` in one call.
///
/// # Example
///
/// ```
/// use pnglz_deflate::{Format, compress, decompress};
///
/// let data = b"Hello, Hello, Hello, Hello, World!";
/// let compressed = compress(data, Format::Gzip, 9);
/// assert_eq!(decompress(&compressed, Format::Gzip).unwrap(), data);
/// ```
pub fn compress(data: &[u8], format: Format, level: impl Into<CompressionLevel>) -> Vec<u8> {
    let mut deflator = Deflator::with_level(format, level);
    deflator.push(data, true);

    let mut compressed = Vec::new();
    while let Some(chunk) = deflator.pop() {
        compressed.extend(chunk);
    }
    compressed.extend(deflator.pull());
    compressed
}
