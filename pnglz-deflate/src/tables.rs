//! Decade tables and fixed codes for DEFLATE (RFC 1951).
//!
//! Run lengths 3-258 and distances 1-32768 are transmitted as a symbol
//! naming a *decade* (a base value plus a count of extra bits) followed by
//! the extra bits themselves. This module holds those tables, constant-time
//! mappings from values to decades, and the fixed Huffman code lengths used
//! by block type 1.

/// Shortest run a match may encode.
pub const MIN_RUN: usize = 3;

/// Longest run a match may encode.
pub const MAX_RUN: usize = 258;

/// The end-of-block run-literal symbol.
pub const END_OF_BLOCK: u16 = 256;

/// Number of run-literal symbols a block may declare.
pub const RUNLITERAL_SYMBOLS: usize = 286;

/// Number of distance symbols a block may declare.
pub const DISTANCE_SYMBOLS: usize = 30;

/// Run-length base values for run-literal symbols 257-285.
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, // 257-264: 0 extra bits
    11, 13, 15, 17, // 265-268: 1 extra bit
    19, 23, 27, 31, // 269-272: 2 extra bits
    35, 43, 51, 59, // 273-276: 3 extra bits
    67, 83, 99, 115, // 277-280: 4 extra bits
    131, 163, 195, 227, // 281-284: 5 extra bits
    258, // 285: 0 extra bits
];

/// Number of extra bits for run-literal symbols 257-285.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, // 257-264
    1, 1, 1, 1, // 265-268
    2, 2, 2, 2, // 269-272
    3, 3, 3, 3, // 273-276
    4, 4, 4, 4, // 277-280
    5, 5, 5, 5, // 281-284
    0, // 285
];

/// Distance base values for distance symbols 0-29.
pub const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, // 0-3: 0 extra bits
    5, 7, // 4-5: 1 extra bit
    9, 13, // 6-7: 2 extra bits
    17, 25, // 8-9: 3 extra bits
    33, 49, // 10-11: 4 extra bits
    65, 97, // 12-13: 5 extra bits
    129, 193, // 14-15: 6 extra bits
    257, 385, // 16-17: 7 extra bits
    513, 769, // 18-19: 8 extra bits
    1025, 1537, // 20-21: 9 extra bits
    2049, 3073, // 22-23: 10 extra bits
    4097, 6145, // 24-25: 11 extra bits
    8193, 12289, // 26-27: 12 extra bits
    16385, 24577, // 28-29: 13 extra bits
];

/// Number of extra bits for distance symbols 0-29.
pub const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Order in which the metatree code lengths are transmitted.
pub const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Run decade (run-literal symbol minus 257) for every run 0-258.
/// Entries below [`MIN_RUN`] are unused.
const RUN_DECADES: [u8; MAX_RUN + 1] = {
    let mut table = [0u8; MAX_RUN + 1];
    let mut decade = 0;
    while decade < 29 {
        let base = LENGTH_BASE[decade] as usize;
        let mut run = base;
        while run < base + (1 << LENGTH_EXTRA_BITS[decade]) && run <= MAX_RUN {
            table[run] = decade as u8;
            run += 1;
        }
        decade += 1;
    }
    table
};

/// The run decade (0-28) for a run of `run` bytes.
///
/// A run of 258 maps to decade 28 (symbol 285), never to the 31 extra-bit
/// value of decade 27.
#[inline]
pub const fn run_decade(run: usize) -> usize {
    RUN_DECADES[run] as usize
}

/// The distance decade (0-29) for a distance of 1-32768.
#[inline]
pub const fn distance_decade(distance: usize) -> usize {
    if distance <= 4 {
        return distance - 1;
    }
    let x = (distance - 1) as u32;
    let bits = 31 - x.leading_zeros();
    (2 * bits + ((x >> (bits - 1)) & 1)) as usize
}

/// Run-literal symbol, extra bit count, and extra bit value for a run.
pub fn run_code(run: usize) -> (u16, u8, u16) {
    debug_assert!((MIN_RUN..=MAX_RUN).contains(&run), "run out of range: {run}");

    let decade = run_decade(run);
    (
        257 + decade as u16,
        LENGTH_EXTRA_BITS[decade],
        (run - LENGTH_BASE[decade] as usize) as u16,
    )
}

/// Distance symbol, extra bit count, and extra bit value for a distance.
pub fn distance_code(distance: usize) -> (u16, u8, u16) {
    debug_assert!(
        (1..=32768).contains(&distance),
        "distance out of range: {distance}"
    );

    let decade = distance_decade(distance);
    (
        decade as u16,
        DISTANCE_EXTRA_BITS[decade],
        (distance - DISTANCE_BASE[decade] as usize) as u16,
    )
}

/// Fixed run-literal code lengths (block type 1).
///
/// - Symbols 0-143: 8 bits
/// - Symbols 144-255: 9 bits
/// - Symbols 256-279: 7 bits
/// - Symbols 280-287: 8 bits
pub fn fixed_runliteral_lengths() -> [u8; 288] {
    let mut lengths = [8u8; 288];
    lengths[144..256].fill(9);
    lengths[256..280].fill(7);
    lengths
}

/// Fixed distance code lengths (block type 1).
///
/// All 32 codes use 5 bits. Symbols 30 and 31 complete the code but never
/// appear in valid data.
pub fn fixed_distance_lengths() -> [u8; 32] {
    [5u8; 32]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_code_roundtrip() {
        for run in MIN_RUN..=MAX_RUN {
            let (symbol, extra_bits, extra_value) = run_code(run);
            assert!((257..=285).contains(&symbol));
            assert!(u32::from(extra_value) < (1 << extra_bits).max(1));
            let decade = usize::from(symbol - 257);
            assert_eq!(LENGTH_BASE[decade] + extra_value, run as u16);
        }
    }

    #[test]
    fn test_distance_code_roundtrip() {
        for distance in 1..=32768usize {
            let (symbol, extra_bits, extra_value) = distance_code(distance);
            assert!(symbol < 30);
            assert!(u32::from(extra_value) < (1 << extra_bits).max(1));
            assert_eq!(
                usize::from(DISTANCE_BASE[usize::from(symbol)]) + usize::from(extra_value),
                distance
            );
        }
    }

    #[test]
    fn test_specific_codes() {
        assert_eq!(run_code(3), (257, 0, 0));
        assert_eq!(run_code(10), (264, 0, 0));
        assert_eq!(run_code(11), (265, 1, 0));
        assert_eq!(run_code(12), (265, 1, 1));
        assert_eq!(run_code(257), (284, 5, 30));
        assert_eq!(run_code(258), (285, 0, 0));

        assert_eq!(distance_code(1), (0, 0, 0));
        assert_eq!(distance_code(5), (4, 1, 0));
        assert_eq!(distance_code(6), (4, 1, 1));
        assert_eq!(distance_code(24577), (29, 13, 0));
        assert_eq!(distance_code(32768), (29, 13, 8191));
    }

    #[test]
    fn test_fixed_lengths_are_complete() {
        let kraft: f64 = fixed_runliteral_lengths()
            .iter()
            .map(|&l| 2f64.powi(-i32::from(l)))
            .sum();
        assert_eq!(kraft, 1.0);

        let kraft: f64 = fixed_distance_lengths()
            .iter()
            .map(|&l| 2f64.powi(-i32::from(l)))
            .sum();
        assert_eq!(kraft, 1.0);
    }
}
