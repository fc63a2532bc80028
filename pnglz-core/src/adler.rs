//! Adler-32 checksum (RFC 1950).
//!
//! The zlib trailer stores this checksum big-endian. It is the sum of the
//! input bytes plus one (`a`) and the sum of every intermediate `a` (`b`),
//! both modulo 65521.

use crate::traits::Checksum;

/// Largest prime smaller than 65536.
const ADLER_MOD: u32 = 65521;

/// Number of bytes that can be summed before `b` could overflow a `u32`.
const NMAX: usize = 5552;

/// Adler-32 checksum calculator.
///
/// # Example
///
/// ```
/// use pnglz_core::adler::Adler32;
///
/// assert_eq!(Adler32::checksum(b"Wikipedia"), 0x11E60398);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    /// Create a new Adler-32 calculator.
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Update the checksum with more data.
    pub fn update(&mut self, data: &[u8]) {
        let mut a = self.a;
        let mut b = self.b;

        for chunk in data.chunks(NMAX) {
            for &byte in chunk {
                a += u32::from(byte);
                b += a;
            }
            a %= ADLER_MOD;
            b %= ADLER_MOD;
        }

        self.a = a;
        self.b = b;
    }

    /// The checksum of everything seen so far.
    pub fn value(&self) -> u32 {
        (self.b << 16) | self.a
    }

    /// Compute the Adler-32 checksum of `data` in one shot.
    pub fn checksum(data: &[u8]) -> u32 {
        let mut adler = Self::new();
        adler.update(data);
        adler.value()
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Checksum for Adler32 {
    fn update(&mut self, data: &[u8]) {
        Adler32::update(self, data);
    }

    fn value(&self) -> u32 {
        Adler32::value(self)
    }
}
