//! Compression levels and the match search strategies they select.

/// Longest goal any strategy uses.
const MAX_GOAL: usize = 258;

/// A compression level.
///
/// Any `i32` is accepted: levels at or below 0 behave like 0 and levels at
/// or above 13 behave like 13.
///
/// | level | strategy | attempts | goal | iterations |
/// |------:|----------|---------:|-----:|-----------:|
/// | ≤0    | greedy   | 1        | 6    |            |
/// | 1     | greedy   | 2        | 8    |            |
/// | 2     | greedy   | 4        | 10   |            |
/// | 3     | greedy   | 40       | 24   |            |
/// | 4     | lazy     | 20       | 32   |            |
/// | 5     | lazy     | 40       | 54   |            |
/// | 6     | lazy     | 64       | 80   |            |
/// | 7     | lazy     | 100      | 160  |            |
/// | 8     | full     | 14       | 20   | 1          |
/// | 9     | full     | 20       | 32   | 2          |
/// | 10    | full     | 30       | 50   | 3          |
/// | 11    | full     | 60       | 80   | 4          |
/// | 12    | full     | 100      | 133  | 5          |
/// | ≥13   | full     | no limit | 258  | 6          |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompressionLevel(i32);

impl CompressionLevel {
    /// Fastest setting: greedy matching with a single chain attempt.
    pub const FASTEST: Self = Self(0);
    /// The default setting.
    pub const DEFAULT: Self = Self(9);
    /// Slowest setting: optimal parsing with unbounded chain walks.
    pub const BEST: Self = Self(13);

    /// Create a compression level.
    pub const fn new(level: i32) -> Self {
        Self(level)
    }

    /// The raw level value.
    pub const fn level(self) -> i32 {
        self.0
    }

    /// The search strategy this level selects.
    pub fn search(self) -> Search {
        match self.0 {
            i32::MIN..=0 => Search::Greedy {
                attempts: 1,
                goal: 6,
            },
            1 => Search::Greedy {
                attempts: 2,
                goal: 8,
            },
            2 => Search::Greedy {
                attempts: 4,
                goal: 10,
            },
            3 => Search::Greedy {
                attempts: 40,
                goal: 24,
            },
            4 => Search::Lazy {
                attempts: 20,
                goal: 32,
            },
            5 => Search::Lazy {
                attempts: 40,
                goal: 54,
            },
            6 => Search::Lazy {
                attempts: 64,
                goal: 80,
            },
            7 => Search::Lazy {
                attempts: 100,
                goal: 160,
            },
            8 => Search::Full {
                attempts: 14,
                goal: 20,
                iterations: 1,
            },
            9 => Search::Full {
                attempts: 20,
                goal: 32,
                iterations: 2,
            },
            10 => Search::Full {
                attempts: 30,
                goal: 50,
                iterations: 3,
            },
            11 => Search::Full {
                attempts: 60,
                goal: 80,
                iterations: 4,
            },
            12 => Search::Full {
                attempts: 100,
                goal: 133,
                iterations: 5,
            },
            _ => Search::Full {
                attempts: usize::MAX,
                goal: MAX_GOAL,
                iterations: 6,
            },
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<i32> for CompressionLevel {
    fn from(level: i32) -> Self {
        Self(level)
    }
}

/// How the compressor looks for matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Search {
    /// Take the longest match at each position.
    Greedy {
        /// Chain candidates examined per position.
        attempts: usize,
        /// Run length that ends the chain walk early.
        goal: usize,
    },
    /// Defer each match by one position if the next one is longer.
    Lazy {
        /// Chain candidates examined per position.
        attempts: usize,
        /// Run length that ends the chain walk early.
        goal: usize,
    },
    /// Build a match graph and take its cheapest path.
    Full {
        /// Chain candidates examined per position.
        attempts: usize,
        /// Run length that ends the chain walk early.
        goal: usize,
        /// Cost refinement passes per block.
        iterations: usize,
    },
}

impl Search {
    /// Chain candidates examined per position and the early-exit run.
    pub fn bounds(self) -> (usize, usize) {
        match self {
            Self::Greedy { attempts, goal }
            | Self::Lazy { attempts, goal }
            | Self::Full { attempts, goal, .. } => (attempts, goal),
        }
    }

    /// Cost refinement passes per block. Only full search refines.
    pub fn iterations(self) -> usize {
        match self {
            Self::Full { iterations, .. } => iterations,
            _ => 0,
        }
    }

    /// Input bytes kept unprocessed until the stream is finished.
    ///
    /// Every decision then sees a full 258 bytes of lookahead whatever the
    /// push sizes were. Lazy matching looks one position further.
    pub fn lookahead(self) -> usize {
        match self {
            Self::Lazy { .. } => MAX_GOAL + 1,
            _ => MAX_GOAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamping() {
        assert_eq!(
            CompressionLevel::new(-5).search(),
            CompressionLevel::FASTEST.search()
        );
        assert_eq!(
            CompressionLevel::new(100).search(),
            CompressionLevel::BEST.search()
        );
    }

    #[test]
    fn test_strategy_bands() {
        for level in 0..=3 {
            assert!(matches!(
                CompressionLevel::new(level).search(),
                Search::Greedy { .. }
            ));
        }
        for level in 4..=7 {
            assert!(matches!(
                CompressionLevel::new(level).search(),
                Search::Lazy { .. }
            ));
        }
        for level in 8..=13 {
            assert!(matches!(
                CompressionLevel::new(level).search(),
                Search::Full { .. }
            ));
        }
    }

    #[test]
    fn test_default_level() {
        assert_eq!(CompressionLevel::default(), CompressionLevel::from(9));
        assert_eq!(
            CompressionLevel::default().search(),
            Search::Full {
                attempts: 20,
                goal: 32,
                iterations: 2
            }
        );
    }

    #[test]
    fn test_bounds() {
        assert_eq!(CompressionLevel::FASTEST.search().bounds(), (1, 6));
        assert_eq!(CompressionLevel::new(6).search().bounds(), (64, 80));
        assert_eq!(CompressionLevel::BEST.search().bounds(), (usize::MAX, 258));
        assert_eq!(CompressionLevel::new(4).search().iterations(), 0);
        assert_eq!(CompressionLevel::new(12).search().iterations(), 5);
    }

    #[test]
    fn test_lookahead() {
        assert_eq!(CompressionLevel::new(2).search().lookahead(), 258);
        assert_eq!(CompressionLevel::new(5).search().lookahead(), 259);
        assert_eq!(CompressionLevel::new(10).search().lookahead(), 258);
    }
}
