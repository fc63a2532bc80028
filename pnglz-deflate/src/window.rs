//! Sliding window and hash-chain match finder.
//!
//! The window keeps the last `2^exponent` input bytes in a circular buffer.
//! Every slot also records the previous position whose 4-byte prefix hashed
//! to the same bucket, so the positions sharing a bucket form a chain that
//! runs from the newest occurrence to the oldest.
//!
//! # Eviction
//!
//! Inserting a byte overwrites the slot of the position falling out of the
//! window. If the head table still points at that slot it is cleared.
//! Chain links from newer slots into overwritten slots are left in place:
//! a search accumulates the distance of every hop and stops as soon as the
//! total leaves the window, so a stale link is never followed into data
//! that no longer belongs to its chain.

use crate::tables::MAX_RUN;

/// Number of buckets in the head table, as a power of two.
const HASH_BITS: u32 = 15;

/// Shortest run [`Window::longest_match`] will report.
pub const MIN_PROFITABLE_RUN: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    byte: u8,
    /// Slot of the previous position in the same bucket.
    next: Option<u16>,
    /// Bucket this slot was inserted into, if it had a key.
    bucket: Option<u16>,
}

/// Where a byte landed in the window, and the chain it joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Head {
    /// Slot of the inserted byte.
    pub index: u16,
    /// Slot of the most recent earlier position with the same bucket.
    pub next: Option<u16>,
}

/// A back-reference candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Number of matching bytes.
    pub run: usize,
    /// Distance back to the start of the match.
    pub distance: usize,
}

/// A circular window over recent input with hash chains.
#[derive(Debug, Clone)]
pub struct Window {
    slots: Vec<Slot>,
    head: Vec<Option<u16>>,
    mask: usize,
    /// Total number of bytes inserted.
    end: usize,
}

impl Window {
    /// Create a window of `2^exponent` bytes.
    pub fn new(exponent: u32) -> Self {
        let size = 1usize << exponent;
        Self {
            slots: vec![Slot::default(); size],
            head: vec![None; 1 << HASH_BITS],
            mask: size - 1,
            end: 0,
        }
    }

    /// Window size in bytes.
    pub fn size(&self) -> usize {
        self.mask + 1
    }

    /// Total number of bytes inserted so far.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Hash a 4-byte prefix into a head table bucket.
    #[inline]
    pub fn bucket(key: u32) -> usize {
        (key.wrapping_mul(0x9E37_79B1) >> (32 - HASH_BITS)) as usize
    }

    /// Insert `byte` at the next position.
    ///
    /// `key` is the little-endian 4-byte prefix starting at this byte, or
    /// `None` if fewer than 4 bytes remain in the stream. Positions without
    /// a key are not entered into any chain.
    pub fn update(&mut self, byte: u8, key: Option<u32>) -> Head {
        let index = self.end & self.mask;

        if self.end > self.mask {
            if let Some(bucket) = self.slots[index].bucket {
                let bucket = usize::from(bucket);
                if self.head[bucket] == Some(index as u16) {
                    self.head[bucket] = None;
                }
            }
        }

        let (bucket, next) = match key {
            Some(key) => {
                let bucket = Self::bucket(key);
                (Some(bucket as u16), self.head[bucket].replace(index as u16))
            }
            None => (None, None),
        };

        self.slots[index] = Slot { byte, next, bucket };
        self.end += 1;

        Head {
            index: index as u16,
            next,
        }
    }

    /// Walk the chain behind `head` and report every candidate to
    /// `delegate` as `(run, distance)`.
    ///
    /// `ahead` holds the input starting at the position `head` was returned
    /// for. Runs are capped at 258 and at `ahead.len()`, and may extend past
    /// the current position into `ahead` itself when the distance is shorter
    /// than the run. The walk stops after `attempts` candidates, after a run
    /// of at least `goal`, at the end of the chain, or when the next
    /// candidate would lie outside the window.
    pub fn match_runs<F>(
        &self,
        head: Head,
        ahead: &[u8],
        attempts: usize,
        goal: usize,
        mut delegate: F,
    ) where
        F: FnMut(usize, usize),
    {
        let Some(mut current) = head.next.map(usize::from) else {
            return;
        };
        let limit = ahead.len().min(MAX_RUN);
        let mut distance = usize::from(head.index).wrapping_sub(current) & self.mask;
        let mut remaining = attempts;

        while distance != 0 && distance <= self.mask {
            let mut run = 0;
            let stored = distance.min(limit);
            while run < stored && self.slots[(current + run) & self.mask].byte == ahead[run] {
                run += 1;
            }
            if run == distance {
                while run < limit && ahead[run - distance] == ahead[run] {
                    run += 1;
                }
            }

            delegate(run, distance);

            remaining = remaining.saturating_sub(1);
            if remaining == 0 || run >= goal {
                break;
            }
            let Some(next) = self.slots[current].next.map(usize::from) else {
                break;
            };
            distance += current.wrapping_sub(next) & self.mask;
            current = next;
        }
    }

    /// The longest run found by [`match_runs`](Self::match_runs), if it is at
    /// least [`MIN_PROFITABLE_RUN`] bytes. Ties keep the shortest distance.
    pub fn longest_match(
        &self,
        head: Head,
        ahead: &[u8],
        attempts: usize,
        goal: usize,
    ) -> Option<Match> {
        let mut best: Option<Match> = None;
        self.match_runs(head, ahead, attempts, goal, |run, distance| {
            if run >= MIN_PROFITABLE_RUN && best.is_none_or(|best| run > best.run) {
                best = Some(Match { run, distance });
            }
        });
        best
    }
}
