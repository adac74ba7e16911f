use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use num::Float;

/// One scored column of a join row.
///
/// `seq` is the order in which the accumulator first touched the column;
/// among equal scores the smaller `seq` ranks higher.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate<N> {
    pub score: N,
    pub seq: u32,
    pub col: u32,
}

impl<N: Float> PartialEq for Candidate<N> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<N: Float> Eq for Candidate<N> {}

impl<N: Float> PartialOrd for Candidate<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<N: Float> Ord for Candidate<N> {
    /// Greater means better. Scores reaching the heap are finite.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Bounded min-heap keeping the `cap` best candidates seen so far.
#[derive(Debug)]
pub(crate) struct TopNHeap<N> {
    cap: usize,
    heap: BinaryHeap<Reverse<Candidate<N>>>,
}

impl<N: Float> TopNHeap<N> {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            heap: BinaryHeap::with_capacity(cap.min(1024) + 1),
        }
    }

    #[inline]
    pub fn push(&mut self, cand: Candidate<N>) {
        if self.cap == 0 {
            return;
        }
        if self.heap.len() < self.cap {
            self.heap.push(Reverse(cand));
            return;
        }
        // 最小要素より良ければ入れ替え
        if let Some(mut worst) = self.heap.peek_mut() {
            if cand > worst.0 {
                *worst = Reverse(cand);
            }
        }
    }

    /// Best first.
    pub fn into_ranked(self) -> Vec<Candidate<N>> {
        // Reverse の昇順 = Candidate の降順
        self.heap.into_sorted_vec().into_iter().map(|Reverse(c)| c).collect()
    }
}
