//! Huffman coding for DEFLATE compression.
//!
//! DEFLATE uses canonical Huffman codes, where codes of the same length are
//! assigned consecutive values in symbol order, so a code is fully described
//! by its per-symbol lengths.
//!
//! # Alphabets
//!
//! DEFLATE uses three Huffman alphabets:
//! - **Run-literal**: 0-285 (0-255 literals, 256 EOB, 257-285 runs)
//! - **Distance**: 0-29 (back-reference distances)
//! - **Codelength**: 0-18 (the metatree used to transmit the other two)
//!
//! [`HuffmanBuilder`] turns symbol frequencies into length-limited code
//! lengths, [`HuffmanCode`] assigns the canonical codewords the compressor
//! emits, and [`HuffmanTree`] decodes them again.

use pnglz_core::error::{PnglzError, Result};

/// Maximum code length for run-literal and distance codes.
pub const MAX_CODE_LENGTH: u8 = 15;

/// Maximum code length for the codelength (meta) code.
pub const MAX_META_LENGTH: u8 = 7;

/// Number of bits resolved by the primary decoding table.
const PRIMARY_BITS: u8 = 8;

/// Reverse the low `length` bits of `code`.
///
/// Canonical codes are defined MSB-first but DEFLATE packs them LSB-first,
/// so every codeword is stored reversed.
#[inline]
pub fn reverse_bits(code: u16, length: u8) -> u16 {
    if length == 0 {
        return 0;
    }
    code.reverse_bits() >> (16 - u32::from(length))
}

/// Builder for length-limited Huffman code lengths.
#[derive(Debug, Clone)]
pub struct HuffmanBuilder {
    frequencies: Vec<u32>,
    limit: u8,
}

impl HuffmanBuilder {
    /// Create a builder over `alphabet_size` symbols with lengths capped at
    /// `limit` bits.
    pub fn new(alphabet_size: usize, limit: u8) -> Self {
        Self {
            frequencies: vec![0; alphabet_size],
            limit,
        }
    }

    /// Create a builder from existing frequencies.
    pub fn with_frequencies(frequencies: &[u32], limit: u8) -> Self {
        Self {
            frequencies: frequencies.to_vec(),
            limit,
        }
    }

    /// Add a symbol occurrence.
    pub fn add(&mut self, symbol: u16) {
        self.add_count(symbol, 1);
    }

    /// Add multiple occurrences of a symbol.
    pub fn add_count(&mut self, symbol: u16, count: u32) {
        if let Some(frequency) = self.frequencies.get_mut(usize::from(symbol)) {
            *frequency += count;
        }
    }

    /// Build code lengths from the frequencies.
    ///
    /// The result is deterministic for a given input. With two or more used
    /// symbols the lengths form a complete prefix code; a single used symbol
    /// gets length 1; no used symbols gives all zeros.
    pub fn build_lengths(&self) -> Vec<u8> {
        let mut lengths = vec![0u8; self.frequencies.len()];

        let mut leaves: Vec<(u32, usize)> = self
            .frequencies
            .iter()
            .enumerate()
            .filter(|&(_, &f)| f > 0)
            .map(|(symbol, &f)| (f, symbol))
            .collect();

        match leaves.len() {
            0 => return lengths,
            1 => {
                lengths[leaves[0].1] = 1;
                return lengths;
            }
            _ => {}
        }
        debug_assert!(leaves.len() <= 1 << self.limit);

        leaves.sort_unstable();
        let counts = self.level_counts(&leaves);

        // hand the shortest codes to the most frequent symbols
        leaves.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        let mut ranked = leaves.iter();
        for (length, &count) in counts.iter().enumerate().skip(1) {
            for (_, symbol) in ranked.by_ref().take(count as usize) {
                lengths[*symbol] = length as u8;
            }
        }

        lengths
    }

    /// Number of leaves at each depth of a Huffman tree over `leaves`
    /// (sorted by ascending frequency), rebalanced so no leaf is deeper than
    /// the limit.
    fn level_counts(&self, leaves: &[(u32, usize)]) -> Vec<u32> {
        let n = leaves.len();

        // two-queue construction: leaves in order, internal nodes as created
        let mut weights: Vec<u64> = leaves.iter().map(|&(f, _)| u64::from(f)).collect();
        let mut parent = vec![0usize; 2 * n - 1];
        let (mut leaf, mut internal) = (0usize, n);
        for node in n..2 * n - 1 {
            let a = smallest(&weights, &mut leaf, &mut internal, n, node);
            let b = smallest(&weights, &mut leaf, &mut internal, n, node);
            parent[a] = node;
            parent[b] = node;
            weights.push(weights[a] + weights[b]);
        }

        let mut depth = vec![0usize; 2 * n - 1];
        for node in (0..2 * n - 2).rev() {
            depth[node] = depth[parent[node]] + 1;
        }

        let limit = usize::from(self.limit);
        let deepest = depth[..n].iter().copied().max().unwrap_or(0);
        let mut counts = vec![0u32; deepest.max(limit) + 1];
        for &d in &depth[..n] {
            counts[d] += 1;
        }

        // move leaf pairs up from overlong levels, splitting a shallower leaf
        // to keep the code complete
        for level in (limit + 1..=deepest).rev() {
            while counts[level] > 0 {
                let mut donor = level - 2;
                while donor > 0 && counts[donor] == 0 {
                    donor -= 1;
                }
                if donor == 0 {
                    break;
                }
                counts[level] -= 2;
                counts[level - 1] += 1;
                counts[donor + 1] += 2;
                counts[donor] -= 1;
            }
        }

        counts.truncate(limit + 1);
        counts
    }
}

/// Take the lighter of the next unused leaf and the next unused internal
/// node. Ties go to the leaf.
fn smallest(
    weights: &[u64],
    leaf: &mut usize,
    internal: &mut usize,
    leaves: usize,
    created: usize,
) -> usize {
    if *leaf < leaves && (*internal >= created || weights[*leaf] <= weights[*internal]) {
        *leaf += 1;
        *leaf - 1
    } else {
        *internal += 1;
        *internal - 1
    }
}

/// A codeword ready to be appended to a bit sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Codeword {
    /// The code, bit-reversed for LSB-first packing.
    pub bits: u16,
    /// Code length in bits.
    pub length: u8,
}

/// Canonical Huffman codewords for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanCode {
    lengths: Vec<u8>,
    codewords: Vec<Codeword>,
}

impl HuffmanCode {
    /// Build a code from frequencies with lengths capped at `limit`.
    pub fn from_frequencies(frequencies: &[u32], limit: u8) -> Self {
        Self::from_lengths(&HuffmanBuilder::with_frequencies(frequencies, limit).build_lengths())
    }

    /// Assign canonical codewords to the given lengths.
    pub fn from_lengths(lengths: &[u8]) -> Self {
        Self {
            lengths: lengths.to_vec(),
            codewords: canonical_codewords(lengths),
        }
    }

    /// Per-symbol code lengths.
    pub fn lengths(&self) -> &[u8] {
        &self.lengths
    }

    /// The codeword for `symbol`.
    #[inline]
    pub fn codeword(&self, symbol: usize) -> Codeword {
        self.codewords[symbol]
    }

    /// Number of symbols up to and including the last one with a code.
    pub fn used_span(&self) -> usize {
        self.lengths
            .iter()
            .rposition(|&length| length > 0)
            .map_or(0, |last| last + 1)
    }
}

fn canonical_codewords(lengths: &[u8]) -> Vec<Codeword> {
    let mut counts = [0u32; MAX_CODE_LENGTH as usize + 1];
    for &length in lengths {
        if length > 0 {
            counts[usize::from(length)] += 1;
        }
    }

    let mut next = [0u32; MAX_CODE_LENGTH as usize + 1];
    let mut code = 0u32;
    for bits in 1..=usize::from(MAX_CODE_LENGTH) {
        code = (code + counts[bits - 1]) << 1;
        next[bits] = code;
    }

    lengths
        .iter()
        .map(|&length| {
            if length == 0 {
                return Codeword::default();
            }
            let code = next[usize::from(length)];
            next[usize::from(length)] += 1;
            Codeword {
                bits: reverse_bits(code as u16, length),
                length,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Invalid,
    Leaf { symbol: u16, length: u8 },
    Link { offset: u16, bits: u8 },
}

/// A table-driven Huffman decoder.
///
/// The low 8 bits of the lookahead index a primary table. Codes longer than
/// 8 bits go through a per-prefix secondary table sized for the longest
/// code sharing that prefix.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    primary: Vec<Entry>,
    secondary: Vec<Entry>,
}

impl HuffmanTree {
    /// Build a decoder for a complete code.
    ///
    /// Returns `None` if the lengths are over- or under-subscribed.
    pub fn new(lengths: &[u8]) -> Option<Self> {
        is_complete(lengths).then(|| Self::build(lengths))
    }

    /// Build a decoder for a run-literal or distance code.
    ///
    /// Like [`new`](Self::new), but also accepts the two degenerate codes an
    /// encoder may legitimately send: no symbols at all, or a single symbol
    /// of length 1. Decoding an unassigned code then fails at decode time.
    pub fn normalizing(lengths: &[u8]) -> Option<Self> {
        let mut used = lengths.iter().filter(|&&length| length > 0);
        match (used.next(), used.next()) {
            (None, _) | (Some(&1), None) => Some(Self::build(lengths)),
            _ => Self::new(lengths),
        }
    }

    /// Build a decoder without validating the lengths. Unassigned codes
    /// decode as errors. The lengths must not be over-subscribed.
    pub(crate) fn build(lengths: &[u8]) -> Self {
        let codewords = canonical_codewords(lengths);

        let mut primary = vec![Entry::Invalid; 1 << PRIMARY_BITS];
        let mut link_bits = [0u8; 1 << PRIMARY_BITS];
        for codeword in codewords.iter().filter(|c| c.length > PRIMARY_BITS) {
            let prefix = usize::from(codeword.bits & 0xFF);
            link_bits[prefix] = link_bits[prefix].max(codeword.length - PRIMARY_BITS);
        }

        let mut size = 0usize;
        for (prefix, &bits) in link_bits.iter().enumerate() {
            if bits > 0 {
                primary[prefix] = Entry::Link {
                    offset: size as u16,
                    bits,
                };
                size += 1 << bits;
            }
        }
        let mut secondary = vec![Entry::Invalid; size];

        for (symbol, codeword) in codewords.iter().enumerate() {
            let length = codeword.length;
            if length == 0 {
                continue;
            }
            let leaf = Entry::Leaf {
                symbol: symbol as u16,
                length,
            };
            if length <= PRIMARY_BITS {
                let mut index = usize::from(codeword.bits);
                while index < primary.len() {
                    primary[index] = leaf;
                    index += 1 << length;
                }
            } else if let Entry::Link { offset, bits } = primary[usize::from(codeword.bits & 0xFF)]
            {
                let mut index = usize::from(codeword.bits >> PRIMARY_BITS);
                while index < 1 << bits {
                    secondary[usize::from(offset) + index] = leaf;
                    index += 1 << (length - PRIMARY_BITS);
                }
            }
        }

        Self { primary, secondary }
    }

    /// Decode the symbol at the start of `bits` (at least 15 bits of
    /// LSB-first lookahead). Returns the symbol and its code length.
    #[inline]
    pub fn decode(&self, bits: u16) -> Result<(u16, u8)> {
        let entry = match self.primary[usize::from(bits & 0xFF)] {
            Entry::Link { offset, bits: width } => {
                let index = usize::from(bits >> PRIMARY_BITS) & ((1 << width) - 1);
                self.secondary[usize::from(offset) + index]
            }
            entry => entry,
        };
        match entry {
            Entry::Leaf { symbol, length } => Ok((symbol, length)),
            _ => Err(PnglzError::InvalidHuffmanCode),
        }
    }
}

/// Returns `true` if the lengths describe an exactly complete prefix code.
fn is_complete(lengths: &[u8]) -> bool {
    let mut counts = [0i32; MAX_CODE_LENGTH as usize + 1];
    for &length in lengths {
        if length > MAX_CODE_LENGTH {
            return false;
        }
        counts[usize::from(length)] += 1;
    }

    let mut left = 1i32;
    for &count in &counts[1..] {
        left = (left << 1) - count;
        if left < 0 {
            return false;
        }
    }
    left == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kraft(lengths: &[u8]) -> f64 {
        lengths
            .iter()
            .filter(|&&l| l > 0)
            .map(|&l| 2f64.powi(-i32::from(l)))
            .sum()
    }

    #[test]
    fn test_reverse_bits() {
        assert_eq!(reverse_bits(0b101, 3), 0b101);
        assert_eq!(reverse_bits(0b1100, 4), 0b0011);
        assert_eq!(reverse_bits(0b10101010, 8), 0b01010101);
        assert_eq!(reverse_bits(1, 15), 1 << 14);
        assert_eq!(reverse_bits(0, 0), 0);
    }

    #[test]
    fn test_builder_orders_by_frequency() {
        let mut builder = HuffmanBuilder::new(4, 15);
        builder.add_count(0, 100);
        builder.add_count(1, 50);
        builder.add_count(2, 25);
        builder.add_count(3, 25);

        let lengths = builder.build_lengths();
        assert_eq!(lengths, vec![1, 2, 3, 3]);
        assert_eq!(kraft(&lengths), 1.0);
    }

    #[test]
    fn test_builder_degenerate() {
        assert_eq!(HuffmanBuilder::new(5, 15).build_lengths(), vec![0; 5]);

        let mut builder = HuffmanBuilder::new(5, 15);
        builder.add(3);
        assert_eq!(builder.build_lengths(), vec![0, 0, 0, 1, 0]);

        let mut builder = HuffmanBuilder::new(5, 15);
        builder.add(0);
        builder.add(4);
        assert_eq!(builder.build_lengths(), vec![1, 0, 0, 0, 1]);
    }

    #[test]
    fn test_builder_respects_limit() {
        // fibonacci frequencies produce a maximally skewed tree
        let mut frequencies = vec![1u32, 1];
        while frequencies.len() < 30 {
            let n = frequencies.len();
            frequencies.push(frequencies[n - 1] + frequencies[n - 2]);
        }

        let unlimited = HuffmanBuilder::with_frequencies(&frequencies, 32).build_lengths();
        assert!(unlimited.iter().copied().max().unwrap() > 15);

        for limit in [7u8, 9, 15] {
            let lengths = HuffmanBuilder::with_frequencies(&frequencies, limit).build_lengths();
            assert!(lengths.iter().all(|&l| (1..=limit).contains(&l)));
            assert_eq!(kraft(&lengths), 1.0, "limit {limit}");
        }
    }

    #[test]
    fn test_builder_is_complete_for_wide_alphabets() {
        let frequencies: Vec<u32> = (0..286u32).map(|i| (i * 7919) % 1000 + 1).collect();
        let lengths = HuffmanBuilder::with_frequencies(&frequencies, 15).build_lengths();
        assert_eq!(kraft(&lengths), 1.0);
        assert!(HuffmanTree::new(&lengths).is_some());
    }

    #[test]
    fn test_canonical_codes() {
        // RFC 1951 section 3.2.2 example: lengths (3, 3, 3, 3, 3, 2, 4, 4)
        let code = HuffmanCode::from_lengths(&[3, 3, 3, 3, 3, 2, 4, 4]);
        let msb_first: Vec<u16> = (0..8)
            .map(|s| {
                let c = code.codeword(s);
                reverse_bits(c.bits, c.length)
            })
            .collect();
        assert_eq!(
            msb_first,
            vec![0b010, 0b011, 0b100, 0b101, 0b110, 0b00, 0b1110, 0b1111]
        );
        assert_eq!(code.used_span(), 8);
    }

    #[test]
    fn test_decode_simple() {
        // A=0, B=10, C=11 in MSB-first order
        let tree = HuffmanTree::new(&[1, 2, 2]).unwrap();
        assert_eq!(tree.decode(0b0).unwrap(), (0, 1));
        assert_eq!(tree.decode(0b01).unwrap(), (1, 2));
        assert_eq!(tree.decode(0b11).unwrap(), (2, 2));
    }

    #[test]
    fn test_decode_long_codes() {
        let frequencies: Vec<u32> = (0..286u32).map(|i| 1 + (i % 3) * 1000 * (i / 100)).collect();
        let code = HuffmanCode::from_frequencies(&frequencies, 15);
        assert!(code.lengths().iter().any(|&l| l > 8));

        let tree = HuffmanTree::new(code.lengths()).unwrap();
        for symbol in 0..286 {
            let codeword = code.codeword(symbol);
            // garbage above the codeword must not matter
            let bits = codeword.bits | (0xA5A5u16 << codeword.length);
            assert_eq!(
                tree.decode(bits).unwrap(),
                (symbol as u16, codeword.length)
            );
        }
    }

    #[test]
    fn test_validation() {
        // over-subscribed
        assert!(HuffmanTree::new(&[1, 1, 1]).is_none());
        // incomplete
        assert!(HuffmanTree::new(&[1, 2]).is_none());
        assert!(HuffmanTree::new(&[0, 0]).is_none());
        assert!(HuffmanTree::new(&[1]).is_none());

        assert!(HuffmanTree::normalizing(&[0, 0, 0]).is_some());
        assert!(HuffmanTree::normalizing(&[0, 1, 0]).is_some());
        assert!(HuffmanTree::normalizing(&[0, 2, 0]).is_none());
        assert!(HuffmanTree::normalizing(&[1, 2]).is_none());
    }

    #[test]
    fn test_stub_decoding() {
        let tree = HuffmanTree::normalizing(&[0, 1]).unwrap();
        assert_eq!(tree.decode(0).unwrap(), (1, 1));
        assert_eq!(tree.decode(1), Err(PnglzError::InvalidHuffmanCode));

        let empty = HuffmanTree::normalizing(&[0; 30]).unwrap();
        assert_eq!(empty.decode(0), Err(PnglzError::InvalidHuffmanCode));
    }
}
