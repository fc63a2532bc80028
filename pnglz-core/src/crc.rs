//! CRC-32 (ISO 3309), as used by the gzip trailer and header check.
//!
//! Inputs of 16 bytes or more go through a slicing-by-8 loop that consumes
//! eight bytes per step using eight derived lookup tables. Shorter inputs use
//! the single-table loop.

use crate::traits::Checksum;

/// Reflected CRC-32 polynomial.
const POLYNOMIAL: u32 = 0xEDB88320;

/// Slicing-by-8 tables. `TABLES[0]` is the classic byte-at-a-time table.
const TABLES: [[u32; 256]; 8] = {
    let mut tables = [[0u32; 256]; 8];

    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLYNOMIAL
            } else {
                crc >> 1
            };
            j += 1;
        }
        tables[0][i] = crc;
        i += 1;
    }

    let mut t = 1;
    while t < 8 {
        let mut i = 0usize;
        while i < 256 {
            let previous = tables[t - 1][i];
            tables[t][i] = tables[0][(previous & 0xFF) as usize] ^ (previous >> 8);
            i += 1;
        }
        t += 1;
    }

    tables
};

/// CRC-32 calculator.
///
/// - Polynomial: 0x04C11DB7 (reflected: 0xEDB88320)
/// - Initial value: 0xFFFFFFFF
/// - Final XOR: 0xFFFFFFFF
///
/// # Example
///
/// ```
/// use pnglz_core::crc::Crc32;
///
/// let mut crc = Crc32::new();
/// crc.update(b"Hello, World!");
/// assert_eq!(crc.value(), 0xEC4AC3D0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc32 {
    crc: u32,
}

impl Crc32 {
    /// Create a new CRC-32 calculator.
    pub fn new() -> Self {
        Self { crc: 0xFFFFFFFF }
    }

    /// Update the CRC with more data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        if data.len() >= 16 {
            slice8(&mut self.crc, data);
        } else {
            bytewise(&mut self.crc, data);
        }
    }

    /// The CRC of everything seen so far.
    pub fn value(&self) -> u32 {
        self.crc ^ 0xFFFFFFFF
    }

    /// Compute the CRC-32 of `data` in one shot.
    pub fn compute(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.value()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Checksum for Crc32 {
    fn update(&mut self, data: &[u8]) {
        Crc32::update(self, data);
    }

    fn value(&self) -> u32 {
        Crc32::value(self)
    }
}

#[inline]
fn bytewise(crc: &mut u32, data: &[u8]) {
    for &byte in data {
        let index = ((*crc ^ u32::from(byte)) & 0xFF) as usize;
        *crc = TABLES[0][index] ^ (*crc >> 8);
    }
}

fn slice8(crc: &mut u32, data: &[u8]) {
    let mut chunks = data.chunks_exact(8);
    for chunk in &mut chunks {
        let low = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) ^ *crc;
        let high = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);

        *crc = TABLES[7][(low & 0xFF) as usize]
            ^ TABLES[6][((low >> 8) & 0xFF) as usize]
            ^ TABLES[5][((low >> 16) & 0xFF) as usize]
            ^ TABLES[4][(low >> 24) as usize]
            ^ TABLES[3][(high & 0xFF) as usize]
            ^ TABLES[2][((high >> 8) & 0xFF) as usize]
            ^ TABLES[1][((high >> 16) & 0xFF) as usize]
            ^ TABLES[0][(high >> 24) as usize];
    }
    bytewise(crc, chunks.remainder());
}
