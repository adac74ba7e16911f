use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};

use num::Float;
use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;

use crate::error::{Error, Result};
use crate::utils::datastruct::csr::CsrMatrix;

/// One scored pair of a join result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchPair {
    /// row of the left side
    pub left: usize,
    /// row of the right side
    pub right: usize,
    /// cosine similarity in `[0, 1]`
    pub score: f64,
}

assert_eq_size!(MatchPair, (usize, usize, f64));

/// A match with the texts it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledMatch {
    pub left: String,
    pub right: String,
    pub similarity: f64,
}

/// Options of [`assemble`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembleOptions {
    /// keep `(i, i)` pairs
    pub include_identity: bool,
    /// global cap, applied after identity filtering in row-major order
    pub top: Option<usize>,
}

/// Flatten a join result into [`MatchPair`]s.
///
/// Pairs are grouped by left row in row order and sorted by descending score
/// inside a group. The sort is stable, so rank-ordered rows from the join
/// keep their tie order.
pub fn assemble<N: Float>(result: &CsrMatrix<N>, opts: &AssembleOptions) -> Matches {
    let cap = opts.top.unwrap_or(usize::MAX);
    let mut list = Vec::with_capacity(result.nnz().min(cap));
    let mut group = Vec::new();
    'rows: for (left, row) in result.row_iter().enumerate() {
        group.clear();
        group.extend(
            row.iter()
                .filter(|&(right, _)| opts.include_identity || right as usize != left)
                .map(|(right, score)| MatchPair {
                    left,
                    right: right as usize,
                    score: score.to_f64().unwrap_or(0.0),
                }),
        );
        group.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        for pair in group.drain(..) {
            if list.len() >= cap {
                break 'rows;
            }
            list.push(pair);
        }
    }
    Matches::new(list)
}

/// Ranked match table.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Matches {
    /// grouped by `left` ascending, descending score inside a group
    pub list: Vec<MatchPair>,
}

impl Matches {
    pub fn new(list: Vec<MatchPair>) -> Self {
        Matches { list }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MatchPair> {
        self.list.iter()
    }

    /// Matches of one left row; empty when it has none.
    pub fn group(&self, left: usize) -> &[MatchPair] {
        let lo = self.list.partition_point(|p| p.left < left);
        let hi = self.list.partition_point(|p| p.left <= left);
        &self.list[lo..hi]
    }

    /// `(left, pairs)` for every left row that has at least one match.
    pub fn groups(&self) -> Groups<'_> {
        Groups { rest: &self.list }
    }

    /// Attach texts. `left_labels[p.left]` and `right_labels[p.right]` must exist.
    pub fn labeled<S, T>(&self, left_labels: &[S], right_labels: &[T]) -> Result<Vec<LabeledMatch>>
    where
        S: AsRef<str>,
        T: AsRef<str>,
    {
        self.list
            .iter()
            .map(|p| {
                let left = left_labels.get(p.left).ok_or(Error::LabelOutOfRange {
                    index: p.left,
                    len: left_labels.len(),
                })?;
                let right = right_labels.get(p.right).ok_or(Error::LabelOutOfRange {
                    index: p.right,
                    len: right_labels.len(),
                })?;
                Ok(LabeledMatch {
                    left: left.as_ref().to_string(),
                    right: right.as_ref().to_string(),
                    similarity: p.score,
                })
            })
            .collect()
    }

    pub fn into_vec(self) -> Vec<MatchPair> {
        self.list
    }
}

impl<'a> IntoIterator for &'a Matches {
    type Item = &'a MatchPair;
    type IntoIter = std::slice::Iter<'a, MatchPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

/// Iterator of [`Matches::groups`]
#[derive(Debug, Clone)]
pub struct Groups<'a> {
    rest: &'a [MatchPair],
}

impl<'a> Iterator for Groups<'a> {
    type Item = (usize, &'a [MatchPair]);

    fn next(&mut self) -> Option<Self::Item> {
        let left = self.rest.first()?.left;
        let len = self.rest.iter().take_while(|p| p.left == left).count();
        let (head, tail) = self.rest.split_at(len);
        self.rest = tail;
        Some((left, head))
    }
}

impl Debug for Matches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            // 1 行 1 ペア
            writeln!(f, "Matches [")?;
            for p in &self.list {
                writeln!(f, "    {} -> {}: {:.6}", p.left, p.right, p.score)?;
            }
            write!(f, "]")
        } else {
            f.debug_list().entries(&self.list).finish()
        }
    }
}

impl Display for Matches {
    /// Tab separated table with a header line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "left\tright\tsimilarity")?;
        for p in &self.list {
            writeln!(f, "{}\t{}\t{:.6}", p.left, p.right, p.score)?;
        }
        Ok(())
    }
}
