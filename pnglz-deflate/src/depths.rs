//! Estimated symbol costs for optimal parsing.
//!
//! Costs are in quarter bits. A literal, a run length, or a distance decade
//! costs its Huffman code length plus its extra bits. Before any block has
//! been coded the table holds generic defaults; afterwards it is refined from
//! the code lengths of the previous refinement pass.

use crate::tables::{
    DISTANCE_EXTRA_BITS, LENGTH_BASE, LENGTH_EXTRA_BITS, MAX_RUN, MIN_RUN, run_decade,
};

const LITERALS: usize = 0;
/// Run `r` lives at `RUNS + r`, so runs 3-258 occupy 256-511.
const RUNS: usize = 253;
const DISTANCES: usize = 512;
const SIZE: usize = DISTANCES + 30;

const DEFAULT_LITERAL: u8 = 33;
const DEFAULT_RUN: u8 = 30;
const DEFAULT_DISTANCE: u8 = 19;

const DEFAULTS: [u8; SIZE] = {
    let mut table = [0u8; SIZE];
    let mut i = 0;
    while i < 256 {
        table[LITERALS + i] = DEFAULT_LITERAL;
        i += 1;
    }
    let mut run = MIN_RUN;
    while run <= MAX_RUN {
        table[RUNS + run] = DEFAULT_RUN + (LENGTH_EXTRA_BITS[run_decade(run)] << 2);
        run += 1;
    }
    let mut decade = 0;
    while decade < 30 {
        table[DISTANCES + decade] = DEFAULT_DISTANCE + (DISTANCE_EXTRA_BITS[decade] << 2);
        decade += 1;
    }
    table
};

/// Per-symbol cost estimates.
#[derive(Debug, Clone)]
pub struct Depths {
    table: [u8; SIZE],
    generic: bool,
}

impl Depths {
    /// Create a table holding the generic defaults.
    pub fn new() -> Self {
        Self {
            table: DEFAULTS,
            generic: true,
        }
    }

    /// Returns `true` until the table has been refined from real codes.
    pub fn is_generic(&self) -> bool {
        self.generic
    }

    /// Cost of a literal byte.
    #[inline]
    pub fn literal(&self, byte: u8) -> u32 {
        u32::from(self.table[LITERALS + usize::from(byte)])
    }

    /// Cost of a run length, 3-258.
    #[inline]
    pub fn run(&self, run: usize) -> u32 {
        u32::from(self.table[RUNS + run])
    }

    /// Cost of a distance decade, 0-29.
    #[inline]
    pub fn distance(&self, decade: usize) -> u32 {
        u32::from(self.table[DISTANCES + decade])
    }

    /// Refine the table from run-literal and distance code lengths.
    ///
    /// Symbols without a code keep their previous cost.
    pub fn update(&mut self, runliteral: &[u8], distance: &[u8]) {
        for (byte, &length) in runliteral.iter().take(256).enumerate() {
            if length > 0 {
                self.table[LITERALS + byte] = length << 2;
            }
        }

        for (decade, &length) in runliteral.iter().skip(257).take(29).enumerate() {
            if length == 0 {
                continue;
            }
            let extra = LENGTH_EXTRA_BITS[decade];
            let base = usize::from(LENGTH_BASE[decade]);
            // decade 27 nominally reaches 258, which belongs to decade 28
            let end = (base + (1 << extra)).min(MAX_RUN + usize::from(decade == 28));
            for run in base..end {
                self.table[RUNS + run] = (length + extra) << 2;
            }
        }

        for (decade, &length) in distance.iter().take(30).enumerate() {
            if length > 0 {
                self.table[DISTANCES + decade] = (length + DISTANCE_EXTRA_BITS[decade]) << 2;
            }
        }

        self.generic = false;
    }

    /// Move every cost halfway back toward the defaults.
    pub fn generalize(&mut self) {
        for (cost, &default) in self.table.iter_mut().zip(DEFAULTS.iter()) {
            *cost = (*cost & default) + ((*cost ^ default) >> 1);
        }
    }
}

impl Default for Depths {
    fn default() -> Self {
        Self::new()
    }
}
