use num::Float;

use super::heap::{Candidate, TopNHeap};

/// Dense scratch row reused across the rows one worker processes.
///
/// `touched` lists the columns hit since the last drain in first-touch order;
/// `sums` is only meaningful at those columns and is reset on drain.
#[derive(Debug)]
pub(crate) struct Accumulator<N> {
    sums: Vec<N>,
    seen: Vec<bool>,
    touched: Vec<u32>,
    allowed: Vec<bool>,
    allowed_cols: Vec<u32>,
    restricted: bool,
}

impl<N: Float> Accumulator<N> {
    pub fn new(cols: usize) -> Self {
        Self {
            sums: vec![N::zero(); cols],
            seen: vec![false; cols],
            touched: Vec::new(),
            allowed: Vec::new(),
            allowed_cols: Vec::new(),
            restricted: false,
        }
    }

    /// Only columns in `cols` are accumulated until the next drain.
    pub fn restrict(&mut self, cols: &[u32]) {
        if self.allowed.len() != self.sums.len() {
            self.allowed = vec![false; self.sums.len()];
        }
        for &c in cols {
            self.allowed[c as usize] = true;
        }
        self.allowed_cols.clear();
        self.allowed_cols.extend_from_slice(cols);
        self.restricted = true;
    }

    #[inline]
    pub fn add(&mut self, col: u32, value: N) {
        let c = col as usize;
        if self.restricted && !self.allowed[c] {
            return;
        }
        if !self.seen[c] {
            self.seen[c] = true;
            self.touched.push(col);
        }
        self.sums[c] = self.sums[c] + value;
    }

    /// Move qualifying columns into a heap of size `top_n`, skipping `skip`,
    /// and leave the accumulator clean for the next row.
    /// `first` wins every tie regardless of when it was touched.
    pub fn drain_top_n(
        &mut self,
        top_n: usize,
        lower_bound: N,
        skip: Option<u32>,
        first: Option<u32>,
    ) -> Vec<(u32, N)> {
        let mut heap = TopNHeap::new(top_n);
        for (seq, &col) in self.touched.iter().enumerate() {
            let c = col as usize;
            let score = self.sums[c];
            self.sums[c] = N::zero();
            self.seen[c] = false;
            if Some(col) == skip {
                continue;
            }
            if score > N::zero() && score >= lower_bound {
                let seq = if Some(col) == first { 0 } else { seq as u32 + 1 };
                heap.push(Candidate { score, seq, col });
            }
        }
        self.touched.clear();
        if self.restricted {
            for &c in &self.allowed_cols {
                self.allowed[c as usize] = false;
            }
            self.restricted = false;
        }
        heap.into_ranked().into_iter().map(|c| (c.col, c.score)).collect()
    }
}
