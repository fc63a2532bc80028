//! Incremental push/pull behavior of the compressor and decompressor.

use pnglz_deflate::{Deflator, Format, Inflator, PnglzError, compress, decompress};
use proptest::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};

fn sample(size: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut data = Vec::with_capacity(size);
    while data.len() < size {
        // short random runs separated by repeats of earlier content
        if data.len() > 64 && rng.gen_range(0..3) == 0 {
            let start = rng.gen_range(0..data.len() - 32);
            let len = rng.gen_range(3..32);
            data.extend_from_within(start..start + len);
        } else {
            let byte: u8 = rng.gen_range(b'a'..=b'z');
            data.push(byte);
        }
    }
    data.truncate(size);
    data
}

fn deflate_chunked(data: &[u8], format: Format, level: i32, sizes: &[usize]) -> Vec<u8> {
    let mut deflator = Deflator::with_level(format, level);
    let mut compressed = Vec::new();
    let mut rest = data;
    for &size in sizes.iter().cycle() {
        let size = size.min(rest.len());
        let (chunk, tail) = rest.split_at(size);
        rest = tail;
        deflator.push(chunk, rest.is_empty());
        while let Some(block) = deflator.pop() {
            compressed.extend(block);
        }
        if rest.is_empty() {
            break;
        }
    }
    loop {
        let bytes = deflator.pull();
        if bytes.is_empty() {
            break;
        }
        compressed.extend(bytes);
    }
    assert!(deflator.is_finished());
    compressed
}

fn inflate_chunked(data: &[u8], format: Format, size: usize) -> Result<Vec<u8>, PnglzError> {
    let mut inflator = Inflator::new(format);
    let mut output = Vec::new();
    for chunk in data.chunks(size) {
        let status = inflator.push(chunk)?;
        output.extend(inflator.pull());
        if status.is_none() {
            break;
        }
    }
    assert!(inflator.is_finished());
    output.extend(inflator.pull());
    Ok(output)
}

#[test]
fn test_chunking_does_not_change_output() {
    let input = sample(60_000);
    for level in [0, 5, 9] {
        let whole = compress(&input, Format::Zlib, level);
        for sizes in [&[1usize][..], &[7, 4096, 13], &[5000], &[4097, 1]] {
            if sizes == [1] && level == 9 {
                continue;
            }
            assert_eq!(
                deflate_chunked(&input, Format::Zlib, level, sizes),
                whole,
                "level {level} sizes {sizes:?}"
            );
        }
    }
}

#[test]
fn test_inflate_byte_at_a_time() {
    let input = sample(20_000);
    for format in [Format::Zlib, Format::Gzip, Format::Ios] {
        let compressed = compress(&input, format, 6);
        assert_eq!(inflate_chunked(&compressed, format, 1).unwrap(), input);
        assert_eq!(inflate_chunked(&compressed, format, 333).unwrap(), input);
    }
}

#[test]
fn test_pull_exact() {
    let input = sample(10_000);
    let compressed = compress(&input, Format::Zlib, 9);

    let mut inflator = Inflator::new(Format::Zlib);
    assert_eq!(inflator.push(&compressed), Ok(None));
    assert_eq!(inflator.available(), input.len());

    let mut output = Vec::new();
    while let Some(chunk) = inflator.pull_exact(1000) {
        assert_eq!(chunk.len(), 1000);
        output.extend(chunk);
    }
    assert!(inflator.pull_exact(1).is_none());
    assert_eq!(output, input);
}

#[test]
fn test_pull_exact_waits_for_data() {
    let input = sample(4_000);
    let compressed = compress(&input, Format::Ios, 3);

    let mut inflator = Inflator::new(Format::Ios);
    let mut output = Vec::new();
    for chunk in compressed.chunks(64) {
        inflator.push(chunk).unwrap();
        while let Some(bytes) = inflator.pull_exact(500) {
            output.extend(bytes);
        }
    }
    assert!(inflator.is_finished());
    output.extend(inflator.pull());
    assert_eq!(output, input);
}

#[test]
fn test_truncated_stream_is_starved() {
    let input = sample(5_000);
    let compressed = compress(&input, Format::Gzip, 6);

    let mut inflator = Inflator::new(Format::Gzip);
    assert_eq!(inflator.push(&compressed[..compressed.len() - 1]), Ok(Some(())));
    assert!(!inflator.is_finished());
    assert_eq!(
        decompress(&compressed[..compressed.len() / 2], Format::Gzip),
        Err(PnglzError::UnexpectedEndOfStream)
    );

    assert_eq!(inflator.push(&compressed[compressed.len() - 1..]), Ok(None));
    assert_eq!(inflator.pull(), input);
}

#[test]
fn test_corruption_never_yields_wrong_data() {
    let input = sample(3_000);
    let compressed = compress(&input, Format::Zlib, 6);

    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..50 {
        let mut corrupted = compressed.clone();
        let index = rng.gen_range(2..corrupted.len());
        corrupted[index] ^= 1 << rng.gen_range(0..8);
        // either rejected, or the flip landed in ignored padding bits
        if let Ok(output) = decompress(&corrupted, Format::Zlib) {
            assert_eq!(output, input);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_chunked_deflate_matches_one_shot(
        seed in any::<u64>(),
        size in 0usize..30_000,
        sizes in prop::collection::vec(1usize..6000, 1..8),
        level in prop::sample::select(vec![0i32, 2, 4, 7, 8]),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let alphabet = rng.gen_range(2u8..=255);
        let input: Vec<u8> = (0..size).map(|_| rng.gen_range(0..alphabet)).collect();

        let whole = compress(&input, Format::Gzip, level);
        prop_assert_eq!(deflate_chunked(&input, Format::Gzip, level, &sizes), whole.clone());
        prop_assert_eq!(inflate_chunked(&whole, Format::Gzip, sizes[0]).unwrap(), input);
    }
}
