//! Property tests for the bit buffers and checksums.

use pnglz_core::{Adler32, BitCursor, BitSink, Checksum, Crc32};
use proptest::prelude::*;

fn fields() -> impl Strategy<Value = Vec<(u16, u32)>> {
    prop::collection::vec(
        (1u32..=16).prop_flat_map(|width| {
            (0..=((1u32 << width) - 1) as u16, Just(width))
        }),
        0..200,
    )
}

proptest! {
    #[test]
    fn prop_fields_read_back(fields in fields(), hint in 16usize..64) {
        let mut sink = BitSink::new(hint);
        for &(value, width) in &fields {
            sink.append(value, width);
        }
        sink.pad();
        prop_assert!(sink.is_aligned());

        let mut bytes = Vec::new();
        while let Some(chunk) = sink.pop() {
            prop_assert_eq!(chunk.len(), sink.chunk_size());
            bytes.extend(chunk);
        }
        bytes.extend(sink.pull());

        let total: u32 = fields.iter().map(|&(_, width)| width).sum();
        prop_assert_eq!(bytes.len(), total.div_ceil(8) as usize);

        let mut cursor = BitCursor::new();
        let mut b = 0;
        cursor.rebase(&bytes, &mut b);
        for &(value, width) in &fields {
            prop_assert_eq!(cursor.read(b, width), value);
            b += width as usize;
        }
    }

    #[test]
    fn prop_rebase_preserves_position(
        data in prop::collection::vec(any::<u8>(), 1..512),
        splits in prop::collection::vec(1usize..40, 1..20),
    ) {
        // Consume the stream one byte at a time while feeding it in pieces
        let mut cursor = BitCursor::new();
        let mut b = 0;
        let mut fed = 0;
        let mut read = Vec::new();
        let mut splits = splits.iter().cycle();

        while read.len() < data.len() {
            if b + 8 > cursor.count() {
                let size = (*splits.next().unwrap_or(&1)).min(data.len() - fed);
                cursor.rebase(&data[fed..fed + size], &mut b);
                fed += size;
                continue;
            }
            read.push(cursor.byte(b));
            b += 8;
        }
        prop_assert_eq!(read, data);
    }

    #[test]
    fn prop_checksums_are_incremental(
        data in prop::collection::vec(any::<u8>(), 0..4096),
        chunk in 1usize..700,
    ) {
        let mut adler = Adler32::default();
        let mut crc = Crc32::default();
        for piece in data.chunks(chunk) {
            Checksum::update(&mut adler, piece);
            Checksum::update(&mut crc, piece);
        }
        prop_assert_eq!(Checksum::value(&adler), Adler32::checksum(&data));
        prop_assert_eq!(Checksum::value(&crc), Crc32::compute(&data));
    }
}

#[test]
fn test_unaligned_bytes() {
    let mut sink = BitSink::new(16);
    sink.append(1, 3);
    sink.append_bytes(&[0xAB, 0xCD]);
    sink.pad();
    let bytes = sink.pull();

    let mut cursor = BitCursor::new();
    let mut b = 0;
    cursor.rebase(&bytes, &mut b);
    assert_eq!(cursor.read(0, 3), 1);
    assert_eq!(cursor.byte(3), 0xAB);
    assert_eq!(cursor.byte(11), 0xCD);
    assert_eq!(sink.bits_written(), 24);
}
