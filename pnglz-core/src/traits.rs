//! Core traits shared by the compressor and decompressor.

/// A running checksum over a byte stream.
///
/// Stream formats pick one implementation for their trailer: zlib uses
/// [`Adler32`](crate::adler::Adler32) and gzip uses
/// [`Crc32`](crate::crc::Crc32). Buffers that integrate their contents
/// lazily are generic over this trait.
pub trait Checksum: Default + Clone + std::fmt::Debug {
    /// Feed more bytes into the checksum.
    fn update(&mut self, data: &[u8]);

    /// The checksum of every byte fed so far.
    fn value(&self) -> u32;

    /// Compute the checksum of `data` in one shot.
    fn compute(data: &[u8]) -> u32 {
        let mut checksum = Self::default();
        checksum.update(data);
        checksum.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adler::Adler32;
    use crate::crc::Crc32;

    fn split_matches_whole<C: Checksum>(data: &[u8]) {
        let whole = C::compute(data);
        for split in [0, 1, data.len() / 2, data.len()] {
            let mut checksum = C::default();
            checksum.update(&data[..split]);
            checksum.update(&data[split..]);
            assert_eq!(checksum.value(), whole);
        }
    }

    #[test]
    fn test_checksums_are_incremental() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i * 31 % 251) as u8).collect();
        split_matches_whole::<Adler32>(&data);
        split_matches_whole::<Crc32>(&data);
    }
}
