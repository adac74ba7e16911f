use std::ops::Range;

use num::{Float, NumCast};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::datastruct::vector::{merge_dot, SparseIter, SparseVec};

/// Compressed sparse row matrix.
///
/// Row `i` occupies `indices[indptr[i]..indptr[i + 1]]` / `data[..]`.
/// Column indices within a row are unique; rows built from [`SparseVec`]s are
/// ascending, rows produced by the top-N join are ordered by rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "RawCsr<N>",
    bound(deserialize = "N: Float + Deserialize<'de>")
)]
pub struct CsrMatrix<N = f64> {
    rows: usize,
    cols: usize,
    indptr: Vec<usize>,
    indices: Vec<u32>,
    data: Vec<N>,
}

/// Wire form of [`CsrMatrix`], checked by [`CsrMatrix::from_raw`] on the way in.
#[derive(Deserialize)]
struct RawCsr<N> {
    rows: usize,
    cols: usize,
    indptr: Vec<usize>,
    indices: Vec<u32>,
    data: Vec<N>,
}

impl<N: Float> TryFrom<RawCsr<N>> for CsrMatrix<N> {
    type Error = Error;

    fn try_from(raw: RawCsr<N>) -> Result<Self> {
        Self::from_raw(raw.rows, raw.cols, raw.indptr, raw.indices, raw.data)
    }
}

/// Borrowed view of one matrix row
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a, N> {
    indices: &'a [u32],
    data: &'a [N],
}

impl<'a, N> RowView<'a, N>
where
    N: Float,
{
    #[inline]
    pub fn iter(&self) -> SparseIter<'a, N> {
        SparseIter::new(self.indices, self.data)
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn indices(&self) -> &'a [u32] {
        self.indices
    }

    #[inline]
    pub fn data(&self) -> &'a [N] {
        self.data
    }

    /// Linear lookup; rows are short and may be rank ordered rather than index ordered.
    pub fn get(&self, col: u32) -> Option<N> {
        self.indices
            .iter()
            .position(|&c| c == col)
            .map(|pos| self.data[pos])
    }

    /// Dot product with another index-ascending row.
    #[inline]
    pub fn dot(&self, other: &RowView<'_, N>) -> N {
        merge_dot(self.iter(), other.iter())
    }
}

impl<N> CsrMatrix<N>
where
    N: Float,
{
    /// `rows x cols` matrix without stored entries.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            indptr: vec![0; rows + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Stack sparse vectors as rows. Every vector must have dimension `cols`.
    pub fn from_rows<I>(cols: usize, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = SparseVec<N>>,
    {
        let mut indptr = vec![0usize];
        let mut indices = Vec::new();
        let mut data = Vec::new();
        for (i, row) in rows.into_iter().enumerate() {
            if row.dim() != cols {
                return Err(Error::MalformedMatrix(format!(
                    "row {i} has dimension {}, expected {cols}",
                    row.dim()
                )));
            }
            let (inds, vals) = row.into_parts();
            indices.extend(inds);
            data.extend(vals);
            indptr.push(indices.len());
        }
        Ok(Self {
            rows: indptr.len() - 1,
            cols,
            indptr,
            indices,
            data,
        })
    }

    /// Stack rows already known to have dimension `cols`.
    pub(crate) fn stack(cols: usize, rows: Vec<SparseVec<N>>) -> Self {
        let nnz = rows.iter().map(SparseVec::nnz).sum();
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::with_capacity(nnz);
        let mut data = Vec::with_capacity(nnz);
        indptr.push(0);
        for row in rows {
            debug_assert_eq!(row.dim(), cols);
            let (inds, vals) = row.into_parts();
            indices.extend(inds);
            data.extend(vals);
            indptr.push(indices.len());
        }
        Self {
            rows: indptr.len() - 1,
            cols,
            indptr,
            indices,
            data,
        }
    }

    /// Build from raw CSR arrays, checking their consistency.
    pub fn from_raw(
        rows: usize,
        cols: usize,
        indptr: Vec<usize>,
        indices: Vec<u32>,
        data: Vec<N>,
    ) -> Result<Self> {
        if indptr.len() != rows + 1 {
            return Err(Error::MalformedMatrix(format!(
                "indptr has {} entries, expected {}",
                indptr.len(),
                rows + 1
            )));
        }
        if indices.len() != data.len() {
            return Err(Error::MalformedMatrix(format!(
                "{} indices but {} values",
                indices.len(),
                data.len()
            )));
        }
        if indptr[0] != 0 || indptr[rows] != indices.len() || indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::MalformedMatrix("indptr is not a monotone prefix sum".into()));
        }
        if let Some(&bad) = indices.iter().find(|&&c| c as usize >= cols) {
            return Err(Error::MalformedMatrix(format!(
                "column index {bad} out of range for {cols} columns"
            )));
        }
        Ok(Self {
            rows,
            cols,
            indptr,
            indices,
            data,
        })
    }

    /// Rows given as `(column, value)` lists, stored in the given order.
    pub(crate) fn from_row_entries(rows: usize, cols: usize, entries: Vec<Vec<(u32, N)>>) -> Self {
        debug_assert_eq!(rows, entries.len());
        let nnz = entries.iter().map(Vec::len).sum();
        let mut indptr = Vec::with_capacity(rows + 1);
        let mut indices = Vec::with_capacity(nnz);
        let mut data = Vec::with_capacity(nnz);
        indptr.push(0);
        for row in entries {
            for (c, v) in row {
                indices.push(c);
                data.push(v);
            }
            indptr.push(indices.len());
        }
        Self {
            rows,
            cols,
            indptr,
            indices,
            data,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn data(&self) -> &[N] {
        &self.data
    }

    /// Row `i`. Panics when `i >= rows`.
    #[inline]
    pub fn row(&self, i: usize) -> RowView<'_, N> {
        let span = self.indptr[i]..self.indptr[i + 1];
        RowView {
            indices: &self.indices[span.clone()],
            data: &self.data[span],
        }
    }

    pub fn row_iter(&self) -> impl ExactSizeIterator<Item = RowView<'_, N>> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }

    /// Stored value at `(i, j)`, `None` when the entry is structurally zero.
    pub fn get(&self, i: usize, j: usize) -> Option<N> {
        if i >= self.rows || j >= self.cols {
            return None;
        }
        self.row(i).get(j as u32)
    }

    /// Counting-sort transpose. Rows of the result list their columns
    /// (the original row numbers) in ascending order.
    pub fn transpose(&self) -> CsrMatrix<N> {
        let mut counts = vec![0usize; self.cols + 1];
        for &c in &self.indices {
            counts[c as usize + 1] += 1;
        }
        for j in 0..self.cols {
            counts[j + 1] += counts[j];
        }
        let indptr = counts.clone();
        let mut next = counts;
        let mut indices = vec![0u32; self.nnz()];
        let mut data = vec![N::zero(); self.nnz()];
        for i in 0..self.rows {
            for k in self.indptr[i]..self.indptr[i + 1] {
                let c = self.indices[k] as usize;
                let dst = next[c];
                next[c] += 1;
                indices[dst] = i as u32;
                data[dst] = self.data[k];
            }
        }
        CsrMatrix {
            rows: self.cols,
            cols: self.rows,
            indptr,
            indices,
            data,
        }
    }

    /// Copy of a contiguous band of rows.
    pub fn slice_rows(&self, range: Range<usize>) -> CsrMatrix<N> {
        assert!(range.start <= range.end && range.end <= self.rows, "row range out of bounds");
        let lo = self.indptr[range.start];
        let hi = self.indptr[range.end];
        CsrMatrix {
            rows: range.len(),
            cols: self.cols,
            indptr: self.indptr[range.start..=range.end].iter().map(|p| p - lo).collect(),
            indices: self.indices[lo..hi].to_vec(),
            data: self.data[lo..hi].to_vec(),
        }
    }

    /// Change the element type, e.g. to run a join in `f32`.
    pub fn cast<M: Float>(&self) -> CsrMatrix<M> {
        CsrMatrix {
            rows: self.rows,
            cols: self.cols,
            indptr: self.indptr.clone(),
            indices: self.indices.clone(),
            data: self
                .data
                .iter()
                .map(|&v| <M as NumCast>::from(v).unwrap_or_else(M::zero))
                .collect(),
        }
    }

    /// Dense copy, row major. Only meant for small matrices.
    pub fn to_dense(&self) -> Vec<Vec<N>> {
        let mut dense = vec![vec![N::zero(); self.cols]; self.rows];
        for (i, row) in self.row_iter().enumerate() {
            for (c, v) in row.iter() {
                dense[i][c as usize] = v;
            }
        }
        dense
    }
}
