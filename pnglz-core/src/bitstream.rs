//! Bit-level buffers for the DEFLATE stream state machines.
//!
//! This module provides [`BitSink`], which the compressor appends codewords
//! to, and [`BitCursor`], which the decompressor reads codewords from. Neither
//! performs I/O: both are plain in-memory buffers that the caller feeds and
//! drains, so that the stream state machines never block.
//!
//! # Bit Ordering
//!
//! DEFLATE packs bits LSB-first. A field written with [`BitSink::append`]
//! starts at the lowest unused bit of the current byte and continues into
//! the low bits of the following bytes. [`BitCursor::read`] reads fields back
//! in the same order.
//!
//! # Example
//!
//! ```
//! use pnglz_core::bitstream::{BitCursor, BitSink};
//!
//! let mut sink = BitSink::new(4096);
//! sink.append(0b101, 3);
//! sink.append(0b1100, 4);
//! sink.pad();
//! let bytes = sink.pull();
//!
//! let mut cursor = BitCursor::new();
//! let mut b = 0;
//! cursor.rebase(&bytes, &mut b);
//! assert_eq!(cursor.read(b, 3), 0b101);
//! assert_eq!(cursor.read(b + 3, 4), 0b1100);
//! ```

use std::collections::VecDeque;

/// Smallest chunk size a [`BitSink`] will queue.
const MIN_CHUNK: usize = 16;

/// Number of zero atoms kept after the valid input of a [`BitCursor`].
///
/// Three atoms (48 bits) cover the longest speculative read the inflator
/// performs past the last bit it has validated.
const PADDING: usize = 3;

/// An append-only bit buffer with chunked release.
///
/// Completed bytes accumulate in a working buffer. Whenever the working
/// buffer reaches the chunk size it is moved to a queue, from which
/// [`pop`](Self::pop) hands chunks out without copying.
#[derive(Debug, Clone)]
pub struct BitSink {
    /// Size of a queued chunk in bytes.
    chunk: usize,
    /// Completed bytes not yet queued.
    buffer: Vec<u8>,
    /// Full chunks waiting to be popped.
    queue: VecDeque<Vec<u8>>,
    /// Pending bits of the partial byte (LSB-first).
    accumulator: u32,
    /// Number of valid bits in `accumulator`, always below 8 between calls.
    pending: u32,
    /// Total bits appended.
    written: u64,
}

impl BitSink {
    /// Create a new sink that queues output in chunks of `hint` bytes.
    pub fn new(hint: usize) -> Self {
        let chunk = hint.max(MIN_CHUNK);
        Self {
            chunk,
            buffer: Vec::with_capacity(chunk),
            queue: VecDeque::new(),
            accumulator: 0,
            pending: 0,
            written: 0,
        }
    }

    /// The chunk size in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk
    }

    /// Total number of bits appended so far, including padding.
    pub fn bits_written(&self) -> u64 {
        self.written
    }

    /// Returns `true` if the next bit starts a new byte.
    pub fn is_aligned(&self) -> bool {
        self.pending == 0
    }

    /// Number of completed bytes available to [`pull`](Self::pull) or
    /// [`pop`](Self::pop).
    pub fn available(&self) -> usize {
        self.queue.iter().map(Vec::len).sum::<usize>() + self.buffer.len()
    }

    /// Append the low `count` bits of `bits`.
    ///
    /// Bits above `count` are ignored. `count` must not exceed 16.
    #[inline]
    pub fn append(&mut self, bits: u16, count: u32) {
        debug_assert!(count <= 16, "cannot append {count} bits at once");

        let value = u32::from(bits) & ((1u32 << count) - 1);
        self.accumulator |= value << self.pending;
        self.pending += count;
        self.written += u64::from(count);

        while self.pending >= 8 {
            self.push_byte(self.accumulator as u8);
            self.accumulator >>= 8;
            self.pending -= 8;
        }
    }

    /// Append zero bits until the sink is byte-aligned.
    pub fn pad(&mut self) {
        if self.pending > 0 {
            self.append(0, 8 - self.pending);
        }
    }

    /// Append whole bytes. The sink should be byte-aligned.
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        if self.pending == 0 {
            self.written += (bytes.len() as u64) << 3;
            for &byte in bytes {
                self.push_byte(byte);
            }
        } else {
            for &byte in bytes {
                self.append(u16::from(byte), 8);
            }
        }
    }

    /// Remove and return the oldest full chunk, if one has been queued.
    pub fn pop(&mut self) -> Option<Vec<u8>> {
        self.queue.pop_front()
    }

    /// Remove and return the oldest full chunk, or if there is none, every
    /// completed byte currently buffered.
    ///
    /// Bits of an unfinished trailing byte stay in the sink, so pulling never
    /// breaks the bitstream. Call [`pad`](Self::pad) first to release them.
    pub fn pull(&mut self) -> Vec<u8> {
        if let Some(chunk) = self.pop() {
            return chunk;
        }
        std::mem::replace(&mut self.buffer, Vec::with_capacity(self.chunk))
    }

    #[inline]
    fn push_byte(&mut self, byte: u8) {
        self.buffer.push(byte);
        if self.buffer.len() >= self.chunk {
            let full = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.chunk));
            self.queue.push_back(full);
        }
    }
}

impl Default for BitSink {
    fn default() -> Self {
        Self::new(4096)
    }
}

/// A rolling, bit-addressable view over compressed input.
///
/// Input is stored as little-endian 16-bit atoms followed by zeroed padding
/// atoms, so a read of up to 16 bits at any offset below
/// [`count`](Self::count) + 32 is always in range. Callers must compare the
/// end of each field against `count` before trusting what they read.
#[derive(Debug, Clone)]
pub struct BitCursor {
    atoms: Vec<u16>,
    /// Number of valid input bytes held in `atoms`.
    bytes: usize,
}

impl BitCursor {
    /// Create an empty cursor.
    pub fn new() -> Self {
        Self {
            atoms: vec![0; PADDING],
            bytes: 0,
        }
    }

    /// Number of valid bits currently held.
    #[inline]
    pub fn count(&self) -> usize {
        self.bytes << 3
    }

    /// Discard the whole atoms before `pointer`, append `data`, and move
    /// `pointer` so it still addresses the same logical bit.
    ///
    /// `pointer` must not exceed [`count`](Self::count).
    pub fn rebase(&mut self, data: &[u8], pointer: &mut usize) {
        debug_assert!(*pointer <= self.count());

        let discard = (*pointer >> 4).min(self.bytes >> 1);
        self.atoms.truncate(self.bytes.div_ceil(2));
        self.atoms.drain(..discard);
        self.bytes -= discard << 1;
        *pointer -= discard << 4;

        let mut data = data;
        if self.bytes & 1 == 1 {
            if let Some((&first, rest)) = data.split_first() {
                if let Some(last) = self.atoms.last_mut() {
                    *last |= u16::from(first) << 8;
                }
                self.bytes += 1;
                data = rest;
            }
        }

        self.atoms.reserve(data.len().div_ceil(2) + PADDING);
        for pair in data.chunks(2) {
            let low = u16::from(pair[0]);
            let high = pair.get(1).map_or(0, |&byte| u16::from(byte));
            self.atoms.push(low | high << 8);
        }
        self.bytes += data.len();
        self.atoms.resize(self.atoms.len() + PADDING, 0);
    }

    /// Read `width` bits (at most 16) starting at bit `offset`.
    ///
    /// Bits past the end of the valid input read as zero.
    #[inline]
    pub fn read(&self, offset: usize, width: u32) -> u16 {
        debug_assert!(width <= 16, "cannot read {width} bits at once");

        let a = offset >> 4;
        let low = u32::from(self.atoms.get(a).copied().unwrap_or(0));
        let high = u32::from(self.atoms.get(a + 1).copied().unwrap_or(0));
        let window = (low | high << 16) >> (offset & 15);
        (window & ((1u32 << width) - 1)) as u16
    }

    /// Read the byte starting at bit `offset`.
    #[inline]
    pub fn byte(&self, offset: usize) -> u8 {
        self.read(offset, 8) as u8
    }
}

impl Default for BitCursor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_basic() {
        let mut sink = BitSink::new(64);
        sink.append(1, 1);
        sink.append(0, 1);
        sink.append(1, 1);
        sink.append(1, 1);
        sink.pad();
        assert_eq!(sink.pull(), vec![0b0000_1101]);
    }

    #[test]
    fn test_sink_multi_bits() {
        let mut sink = BitSink::new(64);
        sink.append(0b101, 3);
        sink.append(0b11001, 5);
        // 3 bits: 101, 5 bits: 11001 -> 11001_101 = 0xCD
        assert_eq!(sink.pull(), vec![0xCD]);
    }

    #[test]
    fn test_sink_ignores_high_bits() {
        let mut sink = BitSink::new(64);
        sink.append(0xFFFF, 4);
        sink.append(0, 4);
        assert_eq!(sink.pull(), vec![0x0F]);
    }

    #[test]
    fn test_sink_sixteen_bits() {
        let mut sink = BitSink::new(64);
        sink.append(0b1, 1);
        sink.append(0xABCD, 16);
        sink.pad();
        // 0xABCD << 1 | 1 = 0x1579B
        assert_eq!(sink.pull(), vec![0x9B, 0x57, 0x01]);
        assert_eq!(sink.bits_written(), 24);
    }

    #[test]
    fn test_sink_partial_byte_stays_pending() {
        let mut sink = BitSink::new(64);
        sink.append(0xFF, 8);
        sink.append(0b11, 2);
        assert_eq!(sink.pull(), vec![0xFF]);
        assert!(!sink.is_aligned());
        sink.append(0b1, 1);
        sink.pad();
        assert_eq!(sink.pull(), vec![0b111]);
    }

    #[test]
    fn test_sink_chunks() {
        let mut sink = BitSink::new(16);
        for i in 0..40u16 {
            sink.append(i, 8);
        }
        assert_eq!(sink.available(), 40);

        let first = sink.pop().unwrap();
        assert_eq!(first, (0..16).collect::<Vec<u8>>());
        let second = sink.pull();
        assert_eq!(second, (16..32).collect::<Vec<u8>>());
        assert!(sink.pop().is_none());
        let rest = sink.pull();
        assert_eq!(rest, (32..40).collect::<Vec<u8>>());
        assert!(sink.pull().is_empty());
    }

    #[test]
    fn test_sink_append_bytes() {
        let mut sink = BitSink::new(64);
        sink.append_bytes(b"abc");
        sink.append(0b1, 1);
        sink.append_bytes(&[0xFF]);
        sink.pad();
        assert_eq!(sink.pull(), vec![b'a', b'b', b'c', 0xFF, 0x01]);
    }

    #[test]
    fn test_cursor_read() {
        let mut cursor = BitCursor::new();
        let mut b = 0;
        cursor.rebase(&[0xCD, 0xAB, 0x34, 0x12], &mut b);
        assert_eq!(cursor.count(), 32);
        assert_eq!(cursor.read(0, 16), 0xABCD);
        assert_eq!(cursor.read(4, 16), 0x4ABC);
        assert_eq!(cursor.read(16, 16), 0x1234);
        assert_eq!(cursor.read(0, 3), 0b101);
        assert_eq!(cursor.byte(8), 0xAB);
        // over-read lands in the zero padding
        assert_eq!(cursor.read(24, 16), 0x0012);
        assert_eq!(cursor.read(1000, 16), 0);
    }

    #[test]
    fn test_cursor_rebase_keeps_position() {
        let mut cursor = BitCursor::new();
        let mut b = 0;
        cursor.rebase(&[0x11, 0x22, 0x33], &mut b);
        b = 20;
        cursor.rebase(&[0x44, 0x55], &mut b);
        // one whole atom was discarded
        assert_eq!(b, 4);
        assert_eq!(cursor.count(), 24);
        assert_eq!(cursor.read(b, 8), 0x43);
        assert_eq!(cursor.byte(8), 0x44);
        assert_eq!(cursor.byte(16), 0x55);
    }

    #[test]
    fn test_cursor_odd_byte_counts() {
        let mut cursor = BitCursor::new();
        let mut b = 0;
        for byte in 0..9u8 {
            cursor.rebase(&[byte], &mut b);
        }
        assert_eq!(cursor.count(), 72);
        for byte in 0..9u8 {
            assert_eq!(cursor.byte(usize::from(byte) * 8), byte);
        }

        b = 72;
        cursor.rebase(&[], &mut b);
        assert_eq!(b, 8);
        assert_eq!(cursor.count(), 8);
        cursor.rebase(&[0xAA], &mut b);
        assert_eq!(cursor.byte(b), 0xAA);
    }

    #[test]
    fn test_roundtrip() {
        let fields: Vec<(u16, u32)> = (0..200u32)
            .map(|i| ((i.wrapping_mul(2654435761) >> 7) as u16, i % 17))
            .collect();

        let mut sink = BitSink::new(32);
        for &(bits, count) in &fields {
            sink.append(bits, count);
        }
        sink.pad();
        let mut bytes = Vec::new();
        while let Some(chunk) = sink.pop() {
            bytes.extend(chunk);
        }
        bytes.extend(sink.pull());

        let mut cursor = BitCursor::new();
        let mut b = 0;
        cursor.rebase(&bytes, &mut b);
        for &(bits, count) in &fields {
            let mask = ((1u32 << count) - 1) as u16;
            assert_eq!(cursor.read(b, count), bits & mask);
            b += count as usize;
        }
    }
}
