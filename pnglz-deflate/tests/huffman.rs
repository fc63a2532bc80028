//! Property tests for Huffman code construction.

use pnglz_deflate::{HuffmanCode, HuffmanTree};
use proptest::prelude::*;

fn frequency() -> impl Strategy<Value = u32> {
    prop_oneof![Just(0u32), 1u32..10, 1u32..1_000_000]
}

fn check_code(frequencies: &[u32], limit: u8) -> Result<(), TestCaseError> {
    let code = HuffmanCode::from_frequencies(frequencies, limit);
    prop_assert_eq!(&code, &HuffmanCode::from_frequencies(frequencies, limit));

    let lengths = code.lengths();
    prop_assert_eq!(lengths.len(), frequencies.len());
    prop_assert!(lengths.iter().all(|&length| length <= limit));
    for (&length, &frequency) in lengths.iter().zip(frequencies) {
        prop_assert_eq!(length > 0, frequency > 0);
    }

    let used = lengths.iter().filter(|&&length| length > 0).count();
    let kraft: u32 = lengths
        .iter()
        .filter(|&&length| length > 0)
        .map(|&length| 1u32 << (15 - length))
        .sum();
    match used {
        0 => prop_assert_eq!(kraft, 0),
        1 => prop_assert_eq!(kraft, 1 << 14),
        _ => {
            prop_assert_eq!(kraft, 1 << 15);
            let tree = HuffmanTree::new(lengths).unwrap();
            for (symbol, &length) in lengths.iter().enumerate() {
                if length > 0 {
                    let codeword = code.codeword(symbol);
                    prop_assert_eq!(
                        tree.decode(codeword.bits).unwrap(),
                        (symbol as u16, length)
                    );
                }
            }
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_runliteral_codes(frequencies in prop::collection::vec(frequency(), 1..=286)) {
        check_code(&frequencies, 15)?;
    }

    #[test]
    fn prop_distance_codes(frequencies in prop::collection::vec(frequency(), 1..=30)) {
        check_code(&frequencies, 15)?;
    }

    #[test]
    fn prop_meta_codes(frequencies in prop::collection::vec(frequency(), 1..=19)) {
        check_code(&frequencies, 7)?;
    }
}

#[test]
fn test_fibonacci_frequencies_hit_the_limit() {
    // Fibonacci weights produce the deepest possible unlimited tree
    let mut frequencies = vec![1u32, 1];
    while frequencies.len() < 30 {
        let next = frequencies[frequencies.len() - 1] + frequencies[frequencies.len() - 2];
        frequencies.push(next);
    }
    let code = HuffmanCode::from_frequencies(&frequencies, 15);
    assert_eq!(code.lengths().iter().max(), Some(&15));
    assert!(HuffmanTree::new(code.lengths()).is_some());
}
