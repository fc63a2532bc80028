//! Decompressed output with a retained back-reference window.
//!
//! ```text
//!  0        start              current              end
//!  |  dropped | released, kept   | not yet released   |
//!             |<------------- history ------------->|
//! ```
//!
//! Bytes are appended at the end and handed out from `current`. Released
//! bytes stay in the buffer while a back-reference could still reach them,
//! that is while they lie within the last `window` bytes. Everything is
//! fed to the running checksum before it is dropped.

use pnglz_core::error::{PnglzError, Result};
use pnglz_core::traits::Checksum;

/// Output buffer of the inflator.
#[derive(Debug, Clone)]
pub struct Output<C: Checksum> {
    buffer: Vec<u8>,
    window: usize,
    /// First byte not yet handed out.
    current: usize,
    /// First byte not yet fed to `checksum`.
    integrated: usize,
    /// Bytes appended over the lifetime of the stream.
    total: u64,
    checksum: C,
}

impl<C: Checksum> Output<C> {
    /// Create an output buffer that keeps `2^exponent` bytes of history and
    /// feeds everything to `checksum`.
    pub fn new(exponent: u32, checksum: C) -> Self {
        Self {
            buffer: Vec::new(),
            window: 1 << exponent,
            current: 0,
            integrated: 0,
            total: 0,
            checksum,
        }
    }

    /// Change the history size, as declared by a stream header.
    pub fn set_exponent(&mut self, exponent: u32) {
        self.window = 1 << exponent;
    }

    /// Number of bytes a back-reference may reach over.
    pub fn history(&self) -> usize {
        usize::try_from(self.total).map_or(self.window, |total| total.min(self.window))
    }

    /// Number of bytes appended and not yet released.
    pub fn available(&self) -> usize {
        self.buffer.len() - self.current
    }

    /// Total number of bytes appended.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Append one byte.
    #[inline]
    pub fn append(&mut self, byte: u8) {
        self.buffer.push(byte);
        self.total += 1;
    }

    /// Append a run of bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
        self.total += bytes.len() as u64;
    }

    /// Copy `count` bytes starting `distance` bytes back. The source may
    /// overlap the bytes being written.
    pub fn expand(&mut self, distance: usize, count: usize) -> Result<()> {
        if distance == 0 || distance > self.history() {
            return Err(PnglzError::string_reference(distance, self.history()));
        }

        let from = self.buffer.len() - distance;
        if distance >= count {
            self.buffer.extend_from_within(from..from + count);
        } else {
            self.buffer.reserve(count);
            for i in from..from + count {
                let byte = self.buffer[i];
                self.buffer.push(byte);
            }
        }
        self.total += count as u64;
        Ok(())
    }

    /// Release exactly `count` bytes, or nothing if fewer are available.
    pub fn release(&mut self, count: usize) -> Option<Vec<u8>> {
        if self.available() < count {
            return None;
        }
        let bytes = self.buffer[self.current..self.current + count].to_vec();
        self.current += count;
        self.compact();
        Some(bytes)
    }

    /// Release every available byte.
    pub fn release_all(&mut self) -> Vec<u8> {
        let bytes = self.buffer[self.current..].to_vec();
        self.current = self.buffer.len();
        self.compact();
        bytes
    }

    /// Checksum of every byte appended so far.
    pub fn checksum(&mut self) -> u32 {
        self.integrate(self.buffer.len());
        self.checksum.value()
    }

    fn integrate(&mut self, end: usize) {
        if end > self.integrated {
            self.checksum.update(&self.buffer[self.integrated..end]);
            self.integrated = end;
        }
    }

    /// Drop released bytes that fell out of the window once enough of them
    /// have piled up.
    fn compact(&mut self) {
        let cut = self
            .current
            .min(self.buffer.len().saturating_sub(self.window));
        if cut < self.window {
            return;
        }
        self.integrate(cut);
        self.buffer.drain(..cut);
        self.current -= cut;
        self.integrated -= cut;
    }
}
