//! Bounded top-k selection shared by every index.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A search hit: dataset id and its distance to the query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Candidate {
    pub id: usize,
    pub distance: f32,
}

impl Candidate {
    pub fn new(id: usize, distance: f32) -> Self {
        Self { id, distance }
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Ascending by distance, ties by ascending id. `total_cmp` sorts NaN last so a
// bad distance can never displace a real one.
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Keeps the `k` smallest candidates seen so far.
///
/// Backed by a max-heap of at most `k` entries: the current worst candidate
/// sits on top and is evicted when something better arrives.
#[derive(Debug, Clone)]
pub struct TopKSelector {
    k: usize,
    heap: BinaryHeap<Candidate>,
}

impl TopKSelector {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(4096)),
        }
    }

    /// Capacity of the selector.
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    /// The worst candidate currently kept.
    pub fn worst(&self) -> Option<&Candidate> {
        self.heap.peek()
    }

    /// Whether `candidate` would be kept if pushed now.
    pub fn accepts(&self, candidate: &Candidate) -> bool {
        if self.k == 0 {
            return false;
        }
        match self.heap.peek() {
            Some(worst) if self.is_full() => candidate < worst,
            _ => true,
        }
    }

    /// Offer a candidate; returns whether it was kept.
    pub fn push(&mut self, candidate: Candidate) -> bool {
        if !self.accepts(&candidate) {
            return false;
        }
        self.heap.push(candidate);
        if self.heap.len() > self.k {
            self.heap.pop();
        }
        true
    }

    /// Drain into a Vec sorted ascending by (distance, id).
    pub fn into_sorted_vec(self) -> Vec<Candidate> {
        self.heap.into_sorted_vec()
    }
}

impl Extend<Candidate> for TopKSelector {
    fn extend<T: IntoIterator<Item = Candidate>>(&mut self, iter: T) {
        for candidate in iter {
            self.push(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_keeps_k_smallest() {
        let mut sel = TopKSelector::new(2);
        sel.push(Candidate::new(0, 5.0));
        sel.push(Candidate::new(1, 1.0));
        sel.push(Candidate::new(2, 3.0));

        assert_eq!(sel.len(), 2);
        let sorted = sel.into_sorted_vec();
        assert_eq!(sorted[0].id, 1);
        assert_eq!(sorted[1].id, 2);
    }

    #[test]
    fn test_ties_break_by_id() {
        let mut sel = TopKSelector::new(2);
        sel.push(Candidate::new(7, 1.0));
        sel.push(Candidate::new(3, 1.0));
        sel.push(Candidate::new(5, 1.0));

        let ids: Vec<usize> = sel.into_sorted_vec().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 5]);
    }

    #[test]
    fn test_zero_k_keeps_nothing() {
        let mut sel = TopKSelector::new(0);
        assert!(!sel.push(Candidate::new(0, 0.0)));
        assert!(sel.is_empty());
    }

    #[test]
    fn test_worst_tracks_eviction_threshold() {
        let mut sel = TopKSelector::new(2);
        sel.extend([Candidate::new(0, 4.0), Candidate::new(1, 2.0)]);
        assert_eq!(sel.worst().map(|c| c.id), Some(0));
        assert!(!sel.accepts(&Candidate::new(9, 4.5)));
        assert!(sel.accepts(&Candidate::new(9, 3.0)));
    }

    #[test]
    fn test_nan_never_displaces_real_distance() {
        let mut sel = TopKSelector::new(1);
        sel.push(Candidate::new(0, 1.0));
        assert!(!sel.push(Candidate::new(1, f32::NAN)));
        assert_eq!(sel.into_sorted_vec()[0].id, 0);
    }

    proptest! {
        #[test]
        fn prop_matches_full_sort(
            distances in proptest::collection::vec(0u8..50, 0..200),
            k in 1usize..30,
        ) {
            let candidates: Vec<Candidate> = distances
                .iter()
                .enumerate()
                .map(|(id, &d)| Candidate::new(id, d as f32))
                .collect();

            let mut sel = TopKSelector::new(k);
            sel.extend(candidates.iter().copied());
            let got = sel.into_sorted_vec();

            let mut expected = candidates.clone();
            expected.sort();
            expected.truncate(k);

            let got_ids: Vec<usize> = got.iter().map(|c| c.id).collect();
            let expected_ids: Vec<usize> = expected.iter().map(|c| c.id).collect();
            prop_assert_eq!(got_ids, expected_ids);
        }
    }
}
