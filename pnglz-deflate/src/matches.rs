//! Match buffers: the per-block record of parse decisions.
//!
//! Greedy and lazy search commit to a [`Term`] at every position and append
//! it to a [`Terms`] vector. Full search instead records every candidate in
//! a [`Graph`] and chooses the path when the block is written.

use crate::depths::Depths;
use crate::huffman::{HuffmanCode, MAX_CODE_LENGTH};
use crate::tables::{
    DISTANCE_SYMBOLS, END_OF_BLOCK, MIN_RUN, RUNLITERAL_SYMBOLS, distance_decade, run_decade,
};

const TERMS_LIMIT: usize = 1 << 10;
const TERMS_CAPACITY: usize = 1 << 15;
const GRAPH_LIMIT: usize = 1 << 11;
const GRAPH_CAPACITY: usize = 1 << 16;

/// One parse decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    /// A literal byte.
    Literal(u8),
    /// A back-reference.
    Match {
        /// Number of bytes to copy (3-258).
        run: u16,
        /// Distance back into the window.
        distance: u16,
    },
}

impl Term {
    /// Number of input bytes the term covers.
    pub fn span(self) -> usize {
        match self {
            Self::Literal(_) => 1,
            Self::Match { run, .. } => usize::from(run),
        }
    }
}

/// Symbol counts for one block.
#[derive(Debug, Clone)]
pub struct Frequencies {
    /// Run-literal symbol counts.
    pub runliteral: [u32; RUNLITERAL_SYMBOLS],
    /// Distance symbol counts.
    pub distance: [u32; DISTANCE_SYMBOLS],
}

impl Frequencies {
    fn new() -> Self {
        Self {
            runliteral: [0; RUNLITERAL_SYMBOLS],
            distance: [0; DISTANCE_SYMBOLS],
        }
    }

    fn tally(&mut self, term: Term) {
        match term {
            Term::Literal(byte) => self.runliteral[usize::from(byte)] += 1,
            Term::Match { run, distance } => {
                self.runliteral[257 + run_decade(usize::from(run))] += 1;
                self.distance[distance_decade(usize::from(distance))] += 1;
            }
        }
    }

    /// Build both block codes. The end-of-block symbol always gets a code.
    fn codes(mut self) -> (HuffmanCode, HuffmanCode) {
        self.runliteral[usize::from(END_OF_BLOCK)] = 1;
        (
            HuffmanCode::from_frequencies(&self.runliteral, MAX_CODE_LENGTH),
            HuffmanCode::from_frequencies(&self.distance, MAX_CODE_LENGTH),
        )
    }
}

/// Everything the block writer needs.
#[derive(Debug, Clone)]
pub struct Block {
    /// Terms in stream order.
    pub terms: Vec<Term>,
    /// Run-literal code.
    pub runliteral: HuffmanCode,
    /// Distance code.
    pub distance: HuffmanCode,
}

/// A flat term vector for greedy and lazy search.
#[derive(Debug, Clone)]
pub struct Terms {
    terms: Vec<Term>,
    limit: usize,
}

impl Terms {
    /// Create an empty vector at the initial size limit.
    pub fn new() -> Self {
        Self {
            terms: Vec::with_capacity(TERMS_LIMIT),
            limit: TERMS_LIMIT,
        }
    }

    /// Terms that can still be stored before the block must be written.
    pub fn unfilled(&self) -> usize {
        (self.limit - 1).saturating_sub(self.terms.len())
    }

    /// Number of stored terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` if no terms are stored.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Append a term.
    pub fn push(&mut self, term: Term) {
        debug_assert!(
            !matches!(term, Term::Match { run, .. } if usize::from(run) < MIN_RUN),
            "match shorter than {MIN_RUN}"
        );
        self.terms.push(term);
    }

    /// Take the stored terms as a block and grow the limit.
    pub fn block(&mut self) -> Block {
        let terms = std::mem::take(&mut self.terms);
        let mut frequencies = Frequencies::new();
        for &term in &terms {
            frequencies.tally(term);
        }
        let (runliteral, distance) = frequencies.codes();

        self.limit = (self.limit * 2).min(TERMS_CAPACITY);
        self.terms.reserve(self.limit);

        Block {
            terms,
            runliteral,
            distance,
        }
    }
}

impl Default for Terms {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Edge {
    run: u16,
    distance: u16,
}

/// A step along the path: the edge length and the decade it came from.
/// A length of 1 is the literal edge.
#[derive(Debug, Clone, Copy, Default)]
struct Step {
    length: u16,
    decade: u8,
}

#[derive(Debug, Clone)]
struct Vertex {
    literal: u8,
    /// Cheapest known cost to reach this vertex, in quarter bits.
    depth: u32,
    /// Upstream step during minimization, downstream after the walk back.
    step: Step,
    /// Longest run found for each distance decade.
    edges: [Edge; DISTANCE_SYMBOLS],
}

impl Vertex {
    fn new(literal: u8) -> Self {
        Self {
            literal,
            depth: u32::MAX,
            step: Step::default(),
            edges: [Edge::default(); DISTANCE_SYMBOLS],
        }
    }
}

/// A match graph for optimal parsing.
///
/// Vertex `i` stands for the `i`th input byte of the block. Every vertex has
/// a literal edge to its successor and up to one match edge per distance
/// decade. Writing the block finds the cheapest path from the first vertex
/// to the one past the last under the current [`Depths`].
#[derive(Debug, Clone)]
pub struct Graph {
    vertices: Vec<Vertex>,
    limit: usize,
    depths: Depths,
}

impl Graph {
    /// Create an empty graph at the initial size limit.
    pub fn new() -> Self {
        Self {
            vertices: Vec::with_capacity(GRAPH_LIMIT + 1),
            limit: GRAPH_LIMIT,
            depths: Depths::new(),
        }
    }

    /// Vertices that can still be stored before the block must be written.
    pub fn unfilled(&self) -> usize {
        (self.limit - 1).saturating_sub(self.vertices.len())
    }

    /// Number of stored vertices.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Returns `true` if no vertices are stored.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Append a vertex for `literal` and return its index.
    pub fn push(&mut self, literal: u8) -> usize {
        self.vertices.push(Vertex::new(literal));
        self.vertices.len() - 1
    }

    /// Offer a match edge from vertex `index`. Only the longest run per
    /// distance decade is kept, and the first one offered wins ties.
    pub fn set_edge(&mut self, index: usize, run: usize, distance: usize) {
        let edge = &mut self.vertices[index].edges[distance_decade(distance)];
        if run > usize::from(edge.run) {
            *edge = Edge {
                run: run as u16,
                distance: distance as u16,
            };
        }
    }

    /// Find the cheapest path, take it as a block, and reset the graph.
    ///
    /// The path is refined `iterations` times, each pass re-costing edges
    /// with the code lengths of the previous one. The first block of a
    /// stream, when the costs are still generic, runs twice as many passes.
    pub fn block(&mut self, iterations: usize) -> Block {
        self.limit = (self.limit * 2).min(GRAPH_CAPACITY);

        if self.vertices.is_empty() {
            let (runliteral, distance) = Frequencies::new().codes();
            return Block {
                terms: Vec::new(),
                runliteral,
                distance,
            };
        }

        // sink
        self.vertices.push(Vertex::new(0));

        let iterations = iterations.max(1) as isize;
        let mut pass = if self.depths.is_generic() {
            -iterations
        } else {
            0
        };
        let (runliteral, distance) = loop {
            let codes = self.minimize().codes();
            pass += 1;
            if pass >= iterations {
                break codes;
            }
            log::trace!("refining match graph costs, pass {pass}");
            self.depths.update(codes.0.lengths(), codes.1.lengths());
            for vertex in &mut self.vertices {
                vertex.depth = u32::MAX;
            }
        };

        let terms = self.path();
        self.vertices.clear();
        self.depths.generalize();

        Block {
            terms,
            runliteral,
            distance,
        }
    }

    /// Compute the cheapest path into every vertex, then walk back from the
    /// sink reversing the steps so each path vertex points downstream.
    fn minimize(&mut self) -> Frequencies {
        let sink = self.vertices.len() - 1;
        self.vertices[0].depth = 0;
        self.vertices[sink].depth = u32::MAX;
        for index in 0..sink {
            self.explore(index, sink);
        }

        let mut frequencies = Frequencies::new();
        let mut current = sink;
        let mut step = self.vertices[sink].step;
        while current > 0 {
            let previous = current - usize::from(step.length);
            let upstream = self.vertices[previous].step;
            self.vertices[previous].step = step;

            if step.length == 1 {
                frequencies.runliteral[usize::from(self.vertices[previous].literal)] += 1;
            } else {
                frequencies.runliteral[257 + run_decade(usize::from(step.length))] += 1;
                frequencies.distance[usize::from(step.decade)] += 1;
            }

            current = previous;
            step = upstream;
        }
        frequencies
    }

    /// Relax every edge leaving `index`.
    fn explore(&mut self, index: usize, sink: usize) {
        let depth = self.vertices[index].depth;
        let edges = self.vertices[index].edges;

        let literal = depth + self.depths.literal(self.vertices[index].literal);
        self.relax(index + 1, literal, Step {
            length: 1,
            decade: 0,
        });

        let remaining = sink - index;
        if remaining < MIN_RUN {
            return;
        }
        for (decade, edge) in edges.iter().enumerate() {
            let longest = usize::from(edge.run).min(remaining);
            if longest < MIN_RUN {
                continue;
            }
            let base = depth + self.depths.distance(decade);
            for length in MIN_RUN..=longest {
                self.relax(index + length, base + self.depths.run(length), Step {
                    length: length as u16,
                    decade: decade as u8,
                });
            }
        }
    }

    #[inline]
    fn relax(&mut self, target: usize, depth: u32, step: Step) {
        let vertex = &mut self.vertices[target];
        if depth < vertex.depth {
            vertex.depth = depth;
            vertex.step = step;
        }
    }

    /// Read the minimized path forward from the source.
    fn path(&self) -> Vec<Term> {
        let sink = self.vertices.len() - 1;
        let mut terms = Vec::new();
        let mut index = 0;
        while index < sink {
            let vertex = &self.vertices[index];
            let step = vertex.step;
            if step.length == 1 {
                terms.push(Term::Literal(vertex.literal));
            } else {
                terms.push(Term::Match {
                    run: step.length,
                    distance: vertex.edges[usize::from(step.decade)].distance,
                });
            }
            index += usize::from(step.length);
        }
        terms
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

/// The match buffer of one compressor.
#[derive(Debug, Clone)]
pub enum MatchBuffer {
    /// Committed terms (greedy and lazy search).
    Terms(Terms),
    /// A match graph (full search).
    Graph(Graph),
}

impl MatchBuffer {
    /// Entries that can still be stored before the block must be written.
    pub fn unfilled(&self) -> usize {
        match self {
            Self::Terms(terms) => terms.unfilled(),
            Self::Graph(graph) => graph.unfilled(),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        match self {
            Self::Terms(terms) => terms.len(),
            Self::Graph(graph) => graph.len(),
        }
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(terms: &[Term]) -> Vec<u8> {
        let mut output = Vec::new();
        for &term in terms {
            match term {
                Term::Literal(byte) => output.push(byte),
                Term::Match { run, distance } => {
                    for _ in 0..run {
                        output.push(output[output.len() - usize::from(distance)]);
                    }
                }
            }
        }
        output
    }

    #[test]
    fn test_terms_limit_grows() {
        let mut terms = Terms::new();
        assert_eq!(terms.unfilled(), TERMS_LIMIT - 1);
        for _ in 0..TERMS_LIMIT - 1 {
            terms.push(Term::Literal(0));
        }
        assert_eq!(terms.unfilled(), 0);

        let block = terms.block();
        assert_eq!(block.terms.len(), TERMS_LIMIT - 1);
        assert_eq!(terms.len(), 0);
        assert_eq!(terms.unfilled(), 2 * TERMS_LIMIT - 1);

        for _ in 0..8 {
            terms.block();
        }
        assert_eq!(terms.unfilled(), TERMS_CAPACITY - 1);
    }

    #[test]
    fn test_terms_codes() {
        let mut terms = Terms::new();
        terms.push(Term::Literal(b'a'));
        terms.push(Term::Literal(b'b'));
        terms.push(Term::Match {
            run: 10,
            distance: 2,
        });
        let block = terms.block();

        let lengths = block.runliteral.lengths();
        assert!(lengths[usize::from(b'a')] > 0);
        assert!(lengths[usize::from(END_OF_BLOCK)] > 0);
        assert!(lengths[257 + run_decade(10)] > 0);
        assert_eq!(lengths.iter().filter(|&&l| l > 0).count(), 4);
        assert_eq!(block.distance.lengths()[1], 1);
    }

    #[test]
    fn test_empty_graph_block() {
        let mut graph = Graph::new();
        let block = graph.block(2);
        assert!(block.terms.is_empty());
        assert_eq!(block.runliteral.lengths()[256], 1);
    }

    #[test]
    fn test_graph_literals_only() {
        let mut graph = Graph::new();
        for &byte in b"xyz" {
            graph.push(byte);
        }
        let block = graph.block(1);
        assert_eq!(
            block.terms,
            vec![Term::Literal(b'x'), Term::Literal(b'y'), Term::Literal(b'z')]
        );
        assert_eq!(graph.len(), 0);
    }

    #[test]
    fn test_graph_takes_long_match() {
        let data = b"abcdefghij-abcdefghij";
        let mut graph = Graph::new();
        for (index, &byte) in data.iter().enumerate() {
            graph.push(byte);
            if index == 11 {
                graph.set_edge(index, 10, 11);
            }
        }
        let block = graph.block(2);
        assert_eq!(block.terms.len(), 12);
        assert_eq!(
            block.terms[11],
            Term::Match {
                run: 10,
                distance: 11
            }
        );
        assert_eq!(expand(&block.terms), data);
    }

    #[test]
    fn test_graph_uses_partial_edges() {
        // a 20-byte edge whose tail is cut off by the end of the block
        let mut data = b"0123456789".repeat(3);
        data.truncate(25);
        let mut graph = Graph::new();
        for (index, &byte) in data.iter().enumerate() {
            graph.push(byte);
            if index == 10 {
                graph.set_edge(index, 20, 10);
            }
        }
        let block = graph.block(1);
        assert_eq!(expand(&block.terms), data);
        assert!(block.terms.iter().any(|t| matches!(t, Term::Match { .. })));
        assert_eq!(block.terms.iter().map(|t| t.span()).sum::<usize>(), 25);
    }

    #[test]
    fn test_set_edge_keeps_longest_per_decade() {
        let mut graph = Graph::new();
        graph.push(0);
        graph.set_edge(0, 4, 5);
        graph.set_edge(0, 7, 6);
        graph.set_edge(0, 7, 5);
        graph.set_edge(0, 3, 100);
        let edges = graph.vertices[0].edges;
        assert_eq!(edges[4].run, 7);
        assert_eq!(edges[4].distance, 6);
        assert_eq!(edges[distance_decade(100)].run, 3);
    }

    #[test]
    fn test_graph_generalizes_after_block() {
        let mut graph = Graph::new();
        assert!(graph.depths.is_generic());
        for &byte in b"hello hello hello" {
            graph.push(byte);
        }
        graph.block(1);
        assert!(!graph.depths.is_generic());
        assert_eq!(graph.unfilled(), 2 * GRAPH_LIMIT - 1);
    }
}
