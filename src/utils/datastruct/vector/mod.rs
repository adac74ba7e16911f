use std::cmp::Ordering;
use std::fmt::Debug;
use std::iter::FusedIterator;

use num::Float;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::sort::sorted_by_index;

/// SparseVec は 0 要素を省略した疎ベクトル
/// indices と values を持ち、indices は常に昇順で重複しない
///
/// `dim` is the logical length (vocabulary size); indices are `< dim`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    try_from = "RawSparseVec<N>",
    bound(deserialize = "N: Float + Deserialize<'de>")
)]
pub struct SparseVec<N = f64> {
    dim: usize,
    inds: Vec<u32>,
    vals: Vec<N>,
}

#[derive(Deserialize)]
struct RawSparseVec<N> {
    dim: usize,
    inds: Vec<u32>,
    vals: Vec<N>,
}

impl<N: Float> TryFrom<RawSparseVec<N>> for SparseVec<N> {
    type Error = Error;

    fn try_from(raw: RawSparseVec<N>) -> Result<Self> {
        Self::from_sorted(raw.dim, raw.inds, raw.vals)
    }
}

impl<N> SparseVec<N>
where
    N: Float,
{
    /// Empty (all-zero) vector of the given dimension.
    #[inline]
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            inds: Vec::new(),
            vals: Vec::new(),
        }
    }

    /// Build from index/value pairs in any order.
    /// Indices must be unique and `< dim`.
    pub fn from_unsorted(dim: usize, inds: Vec<u32>, vals: Vec<N>) -> Self
    where
        N: Default,
    {
        let (inds, vals) = sorted_by_index(inds, vals);
        debug_assert!(inds.windows(2).all(|w| w[0] < w[1]), "duplicate index in SparseVec");
        debug_assert!(inds.last().map_or(true, |&i| (i as usize) < dim), "index out of dimension");
        Self { dim, inds, vals }
    }

    /// Build from indices that are already strictly ascending, checking them.
    pub fn from_sorted(dim: usize, inds: Vec<u32>, vals: Vec<N>) -> Result<Self> {
        if inds.len() != vals.len() {
            return Err(Error::MalformedMatrix(format!(
                "sparse vector has {} indices but {} values",
                inds.len(),
                vals.len()
            )));
        }
        if inds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::MalformedMatrix("sparse vector indices are not strictly ascending".into()));
        }
        if let Some(&bad) = inds.last().filter(|&&i| i as usize >= dim) {
            return Err(Error::MalformedMatrix(format!(
                "sparse vector index {bad} out of range for dimension {dim}"
            )));
        }
        Ok(Self { dim, inds, vals })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.inds.len()
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.inds.is_empty()
    }

    #[inline]
    pub fn as_ind_slice(&self) -> &[u32] {
        &self.inds
    }

    #[inline]
    pub fn as_val_slice(&self) -> &[N] {
        &self.vals
    }

    #[inline]
    pub fn raw_iter(&self) -> SparseIter<'_, N> {
        SparseIter::new(&self.inds, &self.vals)
    }

    /// Value at `index`, zero when not stored.
    pub fn get(&self, index: u32) -> N {
        match self.inds.binary_search(&index) {
            Ok(pos) => self.vals[pos],
            Err(_) => N::zero(),
        }
    }

    /// Euclidean norm
    pub fn norm_l2(&self) -> N {
        self.vals.iter().fold(N::zero(), |acc, &v| acc + v * v).sqrt()
    }

    /// Scale to unit L2 norm.
    /// A vector whose norm is zero is left as is.
    pub fn normalize_l2(&mut self) {
        let norm = self.norm_l2();
        if norm > N::zero() {
            let inv = norm.recip();
            self.vals.iter_mut().for_each(|v| *v = *v * inv);
        }
    }

    /// Dot product by merging the two index lists.
    pub fn dot(&self, other: &SparseVec<N>) -> N {
        merge_dot(self.raw_iter(), other.raw_iter())
    }

    pub(crate) fn into_parts(self) -> (Vec<u32>, Vec<N>) {
        (self.inds, self.vals)
    }
}

/// Σ a_i * b_i over the intersection of two index-sorted streams
pub(crate) fn merge_dot<N: Float>(
    a: impl Iterator<Item = (u32, N)>,
    b: impl Iterator<Item = (u32, N)>,
) -> N {
    let mut a_it = a.fuse();
    let mut b_it = b.fuse();
    let mut a_next = a_it.next();
    let mut b_next = b_it.next();
    let mut dot = N::zero();
    while let (Some((ia, va)), Some((ib, vb))) = (a_next, b_next) {
        match ia.cmp(&ib) {
            Ordering::Equal => {
                dot = dot + va * vb;
                a_next = a_it.next();
                b_next = b_it.next();
            }
            Ordering::Less => a_next = a_it.next(),
            Ordering::Greater => b_next = b_it.next(),
        }
    }
    dot
}

/// Iterator over `(index, value)` of a sparse row or vector
#[derive(Debug, Clone)]
pub struct SparseIter<'a, N> {
    inds: &'a [u32],
    vals: &'a [N],
    pos: usize,
}

impl<'a, N> SparseIter<'a, N> {
    #[inline]
    pub(crate) fn new(inds: &'a [u32], vals: &'a [N]) -> Self {
        debug_assert_eq!(inds.len(), vals.len());
        Self { inds, vals, pos: 0 }
    }
}

impl<'a, N: Copy> Iterator for SparseIter<'a, N> {
    type Item = (u32, N);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let i = self.pos;
        if i >= self.inds.len() {
            return None;
        }
        self.pos += 1;
        Some((self.inds[i], self.vals[i]))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.inds.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl<'a, N: Copy> ExactSizeIterator for SparseIter<'a, N> {}

impl<'a, N: Copy> FusedIterator for SparseIter<'a, N> {}
