mod accumulator;
mod heap;

use num::{Float, NumCast};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::blocking::CandidatePairSet;
use crate::error::{Error, Result};
use crate::utils::datastruct::csr::CsrMatrix;

use self::accumulator::Accumulator;

/// Sparse top-N matrix product.
///
/// For every row `i` of `A` (M×K) keeps at most `top_n` columns `j` of
/// `B` (K×N) with the largest `(A·B)[i, j]`, each strictly positive and
/// `>= lower_bound`. Only the columns reachable from the non-zeros of row `i`
/// are visited; the M×N product is never materialized.
///
/// Rows of the result are in rank order (best first). Among equal scores the
/// column the accumulator touched first wins.
///
/// ```
/// use tf_idf_join::{CsrMatrix, TopNJoin};
///
/// let a: CsrMatrix<f64> = CsrMatrix::from_raw(1, 2, vec![0, 2], vec![0, 1], vec![0.6, 0.8]).unwrap();
/// let b = a.transpose();
/// let c = TopNJoin::new(5, 0.5).run(&a, &b).unwrap();
/// assert_eq!(c.shape(), (1, 1));
/// assert!((c.data()[0] - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TopNJoin<'a> {
    top_n: usize,
    lower_bound: f64,
    exclude_diagonal: bool,
    prefer_diagonal: bool,
    parallel: bool,
    candidates: Option<&'a CandidatePairSet>,
}

/// `A·B` keeping the `n` best entries per row, see [`TopNJoin`].
pub fn top_n_join<N>(a: &CsrMatrix<N>, b: &CsrMatrix<N>, n: usize, lower_bound: f64) -> Result<CsrMatrix<N>>
where
    N: Float + Send + Sync,
{
    TopNJoin::new(n, lower_bound).run(a, b)
}

/// Dense reference of [`top_n_join`]. Quadratic, for cross-checking only.
pub fn brute_force_top_n<N>(a: &CsrMatrix<N>, b: &CsrMatrix<N>, n: usize, lower_bound: f64) -> Result<CsrMatrix<N>>
where
    N: Float + Send + Sync,
{
    TopNJoin::new(n, lower_bound).run_brute_force(a, b)
}

impl<'a> TopNJoin<'a> {
    pub fn new(top_n: usize, lower_bound: f64) -> Self {
        Self {
            top_n,
            lower_bound,
            exclude_diagonal: false,
            prefer_diagonal: false,
            parallel: true,
            candidates: None,
        }
    }

    /// Drop `(i, i)` before the top-N cut, so a self-join row still gets
    /// `top_n` neighbours other than itself.
    pub fn exclude_diagonal(mut self, exclude: bool) -> Self {
        self.exclude_diagonal = exclude;
        self
    }

    /// Rank `(i, i)` ahead of columns with the same score, so a self-join row
    /// keeps itself even when an exact duplicate exists. No effect while the
    /// diagonal is excluded.
    pub fn prefer_diagonal(mut self, prefer: bool) -> Self {
        self.prefer_diagonal = prefer;
        self
    }

    /// Toggle rayon. Output is identical either way.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Score only the `(row, column)` pairs in `candidates`.
    pub fn restrict_to(mut self, candidates: &'a CandidatePairSet) -> Self {
        self.candidates = Some(candidates);
        self
    }

    #[inline]
    pub fn top_n(&self) -> usize {
        self.top_n
    }

    #[inline]
    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    /// Checks shared by both join paths. `None` means the result is empty.
    fn prepare<N: Float>(&self, a: &CsrMatrix<N>, b: &CsrMatrix<N>) -> Result<Option<N>> {
        if self.lower_bound.is_nan() || self.lower_bound < 0.0 {
            return Err(Error::InvalidLowerBound(self.lower_bound));
        }
        if a.cols() != b.rows() {
            return Err(Error::DimensionMismatch {
                left_cols: a.cols(),
                right_rows: b.rows(),
            });
        }
        if let Some(candidates) = self.candidates {
            candidates.check_bounds(a.rows(), b.cols())?;
        }
        if self.top_n == 0 || self.lower_bound > 1.0 {
            return Ok(None);
        }
        let lb = <N as NumCast>::from(self.lower_bound).ok_or(Error::InvalidLowerBound(self.lower_bound))?;
        Ok(Some(lb))
    }

    /// Run the join. `A.cols()` must equal `B.rows()`.
    pub fn run<N>(&self, a: &CsrMatrix<N>, b: &CsrMatrix<N>) -> Result<CsrMatrix<N>>
    where
        N: Float + Send + Sync,
    {
        let (m, n) = (a.rows(), b.cols());
        let _span = tracing::debug_span!("top_n_join", rows = m, cols = n, top_n = self.top_n).entered();
        let Some(lb) = self.prepare(a, b)? else {
            debug!("nothing can qualify, returning an empty result");
            return Ok(CsrMatrix::zeros(m, n));
        };

        let allowed = self.candidates.map(|c| c.columns_by_row(m));
        let allowed = allowed.as_deref();

        let entries: Vec<Vec<(u32, N)>> = if self.parallel {
            (0..m)
                .into_par_iter()
                .map_init(
                    || Accumulator::new(n),
                    |acc, i| self.row_top_n(acc, a, b, i, lb, allowed),
                )
                .collect()
        } else {
            let mut acc = Accumulator::new(n);
            (0..m).map(|i| self.row_top_n(&mut acc, a, b, i, lb, allowed)).collect()
        };

        let result = CsrMatrix::from_row_entries(m, n, entries);
        debug!(nnz = result.nnz(), "join finished");
        Ok(result)
    }

    fn row_top_n<N: Float>(
        &self,
        acc: &mut Accumulator<N>,
        a: &CsrMatrix<N>,
        b: &CsrMatrix<N>,
        i: usize,
        lower_bound: N,
        allowed: Option<&[Vec<u32>]>,
    ) -> Vec<(u32, N)> {
        if let Some(allowed) = allowed {
            let cols = &allowed[i];
            if cols.is_empty() {
                return Vec::new();
            }
            acc.restrict(cols);
        }
        for (k, a_ik) in a.row(i).iter() {
            for (j, b_kj) in b.row(k as usize).iter() {
                acc.add(j, a_ik * b_kj);
            }
        }
        let diagonal = i as u32;
        let skip = self.exclude_diagonal.then_some(diagonal);
        let first = (self.prefer_diagonal && !self.exclude_diagonal).then_some(diagonal);
        let row = acc.drain_top_n(self.top_n, lower_bound, skip, first);
        trace!(row = i, kept = row.len());
        row
    }

    /// Same contract as [`TopNJoin::run`] through a dense product.
    /// Equal scores are ordered by ascending column, a preferred diagonal first.
    pub fn run_brute_force<N>(&self, a: &CsrMatrix<N>, b: &CsrMatrix<N>) -> Result<CsrMatrix<N>>
    where
        N: Float + Send + Sync,
    {
        let (m, n) = (a.rows(), b.cols());
        let Some(lb) = self.prepare(a, b)? else {
            return Ok(CsrMatrix::zeros(m, n));
        };
        let dense_b = b.to_dense();
        let entries = (0..m)
            .map(|i| {
                let mut scores = vec![N::zero(); n];
                for (k, a_ik) in a.row(i).iter() {
                    for (j, &b_kj) in dense_b[k as usize].iter().enumerate() {
                        scores[j] = scores[j] + a_ik * b_kj;
                    }
                }
                let mut row: Vec<(u32, N)> = scores
                    .into_iter()
                    .enumerate()
                    .filter(|&(j, s)| {
                        s > N::zero()
                            && s >= lb
                            && !(self.exclude_diagonal && i == j)
                            && self.candidates.map_or(true, |c| c.contains(i, j))
                    })
                    .map(|(j, s)| (j as u32, s))
                    .collect();
                let first = self.prefer_diagonal && !self.exclude_diagonal;
                // 安定ソートなので同点は列順のまま
                row.sort_by(|x, y| {
                    y.1.partial_cmp(&x.1)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| (first && y.0 as usize == i).cmp(&(first && x.0 as usize == i)))
                });
                row.truncate(self.top_n);
                row
            })
            .collect();
        Ok(CsrMatrix::from_row_entries(m, n, entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct XorShift(u64);

    impl XorShift {
        fn next(&mut self) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            self.0
        }

        fn unit(&mut self) -> f64 {
            (self.next() >> 11) as f64 / (1u64 << 53) as f64
        }
    }

    /// Random non-negative matrix with roughly `density` filled.
    fn random_matrix(rng: &mut XorShift, rows: usize, cols: usize, density: f64) -> CsrMatrix<f64> {
        let mut indptr = vec![0];
        let mut indices = Vec::new();
        let mut data = Vec::new();
        for _ in 0..rows {
            for c in 0..cols {
                if rng.unit() < density {
                    indices.push(c as u32);
                    data.push(rng.unit() + 0.01);
                }
            }
            indptr.push(indices.len());
        }
        CsrMatrix::from_raw(rows, cols, indptr, indices, data).unwrap()
    }

    fn dense(rows: &[&[f64]]) -> CsrMatrix<f64> {
        let cols = rows.first().map_or(0, |r| r.len());
        let mut indptr = vec![0];
        let mut indices = Vec::new();
        let mut data = Vec::new();
        for row in rows {
            for (c, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    indices.push(c as u32);
                    data.push(v);
                }
            }
            indptr.push(indices.len());
        }
        CsrMatrix::from_raw(rows.len(), cols, indptr, indices, data).unwrap()
    }

    #[test]
    fn caps_rows_and_applies_lower_bound() {
        let a = dense(&[&[1.0, 0.0], &[0.0, 1.0]]);
        let b = dense(&[&[0.9, 0.2, 0.5, 0.0], &[0.1, 0.0, 0.3, 0.7]]);
        let c = top_n_join(&a, &b, 2, 0.25).unwrap();
        assert_eq!(c.shape(), (2, 4));
        assert_eq!(c.row(0).indices(), &[0, 2]);
        assert_eq!(c.row(0).data(), &[0.9, 0.5]);
        assert_eq!(c.row(1).indices(), &[3, 2]);
        assert!(c.data().iter().all(|&v| v >= 0.25));
    }

    #[test]
    fn ties_go_to_the_first_touched_column() {
        let a = dense(&[&[0.5, 0.5]]);
        let b = dense(&[&[0.0, 0.0, 0.5], &[0.5, 0.5, 0.0]]);
        let two = top_n_join(&a, &b, 2, 0.0).unwrap();
        assert_eq!(two.row(0).indices(), &[2, 0]);
        let three = top_n_join(&a, &b, 3, 0.0).unwrap();
        assert_eq!(three.row(0).indices(), &[2, 0, 1]);
        assert!(three.row(0).data().iter().all(|&v| v == 0.25));
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let a = dense(&[&[1.0, 0.0, 0.0]]);
        let b = dense(&[&[1.0], &[1.0]]);
        assert_eq!(
            top_n_join(&a, &b, 1, 0.0),
            Err(Error::DimensionMismatch { left_cols: 3, right_rows: 2 })
        );
    }

    #[test]
    fn invalid_lower_bound_is_rejected() {
        let a = dense(&[&[1.0]]);
        assert_eq!(top_n_join(&a, &a, 1, -0.1), Err(Error::InvalidLowerBound(-0.1)));
        assert!(matches!(top_n_join(&a, &a, 1, f64::NAN), Err(Error::InvalidLowerBound(_))));
    }

    #[test]
    fn degenerate_parameters_give_an_empty_result() {
        let a = dense(&[&[1.0, 0.5], &[0.2, 0.0]]);
        let b = a.transpose();
        for c in [top_n_join(&a, &b, 0, 0.0).unwrap(), top_n_join(&a, &b, 3, 1.5).unwrap()] {
            assert_eq!(c.shape(), (2, 2));
            assert_eq!(c.nnz(), 0);
        }
        let empty = CsrMatrix::<f64>::zeros(0, 2);
        assert_eq!(top_n_join(&empty, &b, 3, 0.0).unwrap().shape(), (0, 2));
    }

    #[test]
    fn diagonal_is_excluded_before_the_cut() {
        let a = dense(&[&[1.0, 0.0], &[0.8, 0.6], &[0.0, 1.0]]);
        let b = a.transpose();
        let c = TopNJoin::new(1, 0.0).exclude_diagonal(true).run(&a, &b).unwrap();
        assert_eq!(c.row(0).indices(), &[1]);
        assert_eq!(c.row(1).indices(), &[0]);
        assert_eq!(c.row(2).indices(), &[1]);
    }

    #[test]
    fn preferred_diagonal_beats_an_exact_duplicate() {
        let a = dense(&[&[0.6, 0.8], &[0.6, 0.8]]);
        let b = a.transpose();
        let plain = TopNJoin::new(1, 0.0).run(&a, &b).unwrap();
        assert_eq!(plain.row(1).indices(), &[0]);

        let join = TopNJoin::new(1, 0.0).prefer_diagonal(true);
        let c = join.run(&a, &b).unwrap();
        assert_eq!(c.row(0).indices(), &[0]);
        assert_eq!(c.row(1).indices(), &[1]);
        assert_eq!(c, join.run_brute_force(&a, &b).unwrap());
        // 除外が優先より強い
        let c = join.exclude_diagonal(true).run(&a, &b).unwrap();
        assert_eq!(c.row(1).indices(), &[0]);
    }

    #[test]
    fn matches_brute_force_on_random_input() {
        let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
        let a = random_matrix(&mut rng, 40, 25, 0.2);
        let b = random_matrix(&mut rng, 25, 30, 0.2);
        for (n, lb) in [(1, 0.0), (5, 0.1), (50, 0.0), (3, 0.8)] {
            let fast = top_n_join(&a, &b, n, lb).unwrap();
            let slow = brute_force_top_n(&a, &b, n, lb).unwrap();
            assert_eq!(fast, slow, "n={n} lb={lb}");
        }
    }

    #[test]
    fn candidate_filter_matches_restricted_brute_force() {
        let mut rng = XorShift(42);
        let a = random_matrix(&mut rng, 30, 20, 0.25);
        let b = random_matrix(&mut rng, 20, 30, 0.25);
        let candidates: CandidatePairSet = (0..30)
            .flat_map(|i| (0..30).map(move |j| (i, j)))
            .filter(|&(i, j)| (i * 7 + j * 3) % 5 == 0)
            .collect();
        let join = TopNJoin::new(4, 0.05).restrict_to(&candidates);
        let fast = join.run(&a, &b).unwrap();
        assert_eq!(fast, join.run_brute_force(&a, &b).unwrap());
        for (i, row) in fast.row_iter().enumerate() {
            assert!(row.indices().iter().all(|&j| candidates.contains(i, j as usize)));
        }
    }

    #[test]
    fn candidate_out_of_range_is_an_error() {
        let a = dense(&[&[1.0]]);
        let candidates: CandidatePairSet = [(0, 3)].into_iter().collect();
        assert!(matches!(
            TopNJoin::new(1, 0.0).restrict_to(&candidates).run(&a, &a),
            Err(Error::CandidateOutOfRange { left: 0, right: 3, .. })
        ));
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let mut rng = XorShift(7);
        let a = random_matrix(&mut rng, 200, 60, 0.1);
        let b = a.transpose();
        let join = TopNJoin::new(7, 0.0).exclude_diagonal(true);
        assert_eq!(join.run(&a, &b).unwrap(), join.parallel(false).run(&a, &b).unwrap());
    }

    #[test]
    fn runs_in_f32() {
        let a = dense(&[&[0.6, 0.8], &[1.0, 0.0]]).cast::<f32>();
        let b = a.transpose();
        let c = top_n_join(&a, &b, 2, 0.5).unwrap();
        assert_eq!(c.row(0).indices(), &[0, 1]);
        assert!((c.row(0).data()[0] - 1.0).abs() < 1e-6);
        assert!((c.row(0).data()[1] - 0.6).abs() < 1e-6);
    }
}
