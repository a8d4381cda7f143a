//! Closest-first candidate queue for the HNSW beam search.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::topk::Candidate;

/// Min-heap of candidates (smallest distance on top). Used as the frontier
/// still to expand; the bounded result set is a `TopKSelector`.
#[derive(Debug, Default)]
pub struct CandidateQueue {
    heap: BinaryHeap<Reverse<Candidate>>,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, c: Candidate) {
        self.heap.push(Reverse(c));
    }

    pub fn peek(&self) -> Option<&Candidate> {
        self.heap.peek().map(|r| &r.0)
    }

    pub fn pop(&mut self) -> Option<Candidate> {
        self.heap.pop().map(|r| r.0)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
