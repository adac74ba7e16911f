use rayon::prelude::*;
use tracing::debug;

use crate::blocking::CandidatePairSet;
use crate::config::MatchConfig;
use crate::error::{Error, Result};
use crate::join::TopNJoin;
use crate::matches::{assemble, AssembleOptions, Matches};
use crate::utils::datastruct::csr::CsrMatrix;
use crate::vectorizer::{
    tfidf::{DefaultTfIdfEngine, SublinearTfIdfEngine},
    NgramVectorizer,
};

/// Vectorize, join and assemble in one call.
///
/// Every run fits a fresh vocabulary on exactly the documents it is given,
/// so scores of different runs are not comparable.
///
/// ```
/// use tf_idf_join::{MatchConfig, Matcher};
///
/// let matcher = Matcher::new(MatchConfig::new(1).lower_bound(0.5)).unwrap();
/// let titles = ["harry potter", "harry poter", "lord of the rings"];
/// let matches = matcher.match_self(&titles).unwrap();
/// assert_eq!(matches.group(0)[0].right, 1);
/// assert!(matches.group(2).is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    /// Fails when `config` does not validate.
    pub fn new(config: MatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    fn vectorize<S>(&self, documents: &[S]) -> Result<CsrMatrix<f64>>
    where
        S: AsRef<str> + Sync,
    {
        let n = self.config.ngram_length;
        let parallel = self.config.parallel;
        let (_, matrix) = if self.config.sublinear_tf {
            NgramVectorizer::<SublinearTfIdfEngine>::with_ngram_length(n)?
                .parallel(parallel)
                .fit_transform(documents)
        } else {
            NgramVectorizer::<DefaultTfIdfEngine>::with_ngram_length(n)?
                .parallel(parallel)
                .fit_transform(documents)
        };
        Ok(matrix)
    }

    /// Both sides stacked into one corpus, then split back.
    fn vectorize_pair<L, R>(&self, left: &[L], right: &[R]) -> Result<(CsrMatrix<f64>, CsrMatrix<f64>)>
    where
        L: AsRef<str> + Sync,
        R: AsRef<str> + Sync,
    {
        let docs: Vec<&str> = left
            .iter()
            .map(|d| d.as_ref())
            .chain(right.iter().map(|d| d.as_ref()))
            .collect();
        let all = self.vectorize(&docs)?;
        let split = left.len();
        Ok((all.slice_rows(0..split), all.slice_rows(split..docs.len())))
    }

    fn join<'a>(&self) -> TopNJoin<'a> {
        TopNJoin::new(self.config.top_n, self.config.lower_bound).parallel(self.config.parallel)
    }

    /// Match a list against itself.
    pub fn match_self<S>(&self, documents: &[S]) -> Result<Matches>
    where
        S: AsRef<str> + Sync,
    {
        let _span = tracing::debug_span!("match_self", docs = documents.len()).entered();
        let a = self.vectorize(documents)?;
        let result = self
            .join()
            .exclude_diagonal(!self.config.include_identity)
            .prefer_diagonal(self.config.include_identity)
            .run(&a, &a.transpose())?;
        let matches = assemble(
            &result,
            &AssembleOptions {
                include_identity: self.config.include_identity,
                top: self.config.top,
            },
        );
        debug!(pairs = matches.len(), "self-join done");
        Ok(matches)
    }

    /// Match every `left` record against the `right` records.
    /// `(i, i)` pairs are kept: they are different records.
    pub fn match_between<L, R>(&self, left: &[L], right: &[R]) -> Result<Matches>
    where
        L: AsRef<str> + Sync,
        R: AsRef<str> + Sync,
    {
        let _span = tracing::debug_span!("match_between", left = left.len(), right = right.len()).entered();
        let (a, b) = self.vectorize_pair(left, right)?;
        let result = self.join().run(&a, &b.transpose())?;
        Ok(self.assemble_cross(&result))
    }

    /// Like [`Matcher::match_between`], scoring only the pairs in `candidates`.
    pub fn match_candidates<L, R>(&self, left: &[L], right: &[R], candidates: &CandidatePairSet) -> Result<Matches>
    where
        L: AsRef<str> + Sync,
        R: AsRef<str> + Sync,
    {
        let _span = tracing::debug_span!("match_candidates", candidates = candidates.len()).entered();
        // 語彙を作る前に範囲を確認
        candidates.check_bounds(left.len(), right.len())?;
        let (a, b) = self.vectorize_pair(left, right)?;
        let result = self.join().restrict_to(candidates).run(&a, &b.transpose())?;
        Ok(self.assemble_cross(&result))
    }

    fn assemble_cross(&self, result: &CsrMatrix<f64>) -> Matches {
        let matches = assemble(
            result,
            &AssembleOptions {
                include_identity: true,
                top: self.config.top,
            },
        );
        debug!(pairs = matches.len(), "cross-join done");
        matches
    }

    /// Cosine similarity of `left[i]` and `right[i]` for every `i`, over a
    /// vocabulary fitted on both lists.
    pub fn score_pairs<L, R>(&self, left: &[L], right: &[R]) -> Result<Vec<f64>>
    where
        L: AsRef<str> + Sync,
        R: AsRef<str> + Sync,
    {
        if left.len() != right.len() {
            return Err(Error::LengthMismatch {
                left: left.len(),
                right: right.len(),
            });
        }
        let (a, b) = self.vectorize_pair(left, right)?;
        let scores = if self.config.parallel {
            (0..a.rows()).into_par_iter().map(|i| a.row(i).dot(&b.row(i))).collect()
        } else {
            (0..a.rows()).map(|i| a.row(i).dot(&b.row(i))).collect()
        };
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(config: MatchConfig) -> Matcher {
        Matcher::new(config).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(matches!(
            Matcher::new(MatchConfig::default().ngram_length(0)),
            Err(Error::InvalidNgramLength(0))
        ));
    }

    #[test]
    fn self_join_identity_flag() {
        let docs = ["apple", "apples", "banana"];
        let without = matcher(MatchConfig::new(5)).match_self(&docs).unwrap();
        assert!(without.iter().all(|p| p.left != p.right));

        let with = matcher(MatchConfig::new(5).include_identity(true)).match_self(&docs).unwrap();
        for i in 0..3 {
            let first = with.group(i)[0];
            assert_eq!(first.right, i);
            assert!((first.score - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn identity_survives_an_exact_duplicate() {
        let m = matcher(MatchConfig::new(1).include_identity(true));
        let matches = m.match_self(&["the hobbit", "the hobbit"]).unwrap();
        assert_eq!(matches.len(), 2);
        for i in 0..2 {
            let own = matches.group(i)[0];
            assert_eq!(own.right, i);
            assert!((own.score - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn cross_join_keeps_same_position_pairs() {
        let m = matcher(MatchConfig::new(1));
        let matches = m.match_between(&["john smith"], &["jon smith", "mary jones"]).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!((matches.list[0].left, matches.list[0].right), (0, 0));
    }

    #[test]
    fn candidates_restrict_the_cross_join() {
        let m = matcher(MatchConfig::new(3));
        let left = ["john smith", "mary jones"];
        let right = ["jon smith", "mary jones"];
        let candidates: CandidatePairSet = [(0, 0)].into_iter().collect();
        let matches = m.match_candidates(&left, &right, &candidates).unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches.group(1).is_empty());

        let outside: CandidatePairSet = [(0, 9)].into_iter().collect();
        assert!(matches!(
            m.match_candidates(&left, &right, &outside),
            Err(Error::CandidateOutOfRange { .. })
        ));
    }

    #[test]
    fn score_pairs_is_aligned() {
        let m = matcher(MatchConfig::default());
        let scores = m.score_pairs(&["the hobbit", "dune"], &["the hobbit", "emma"]).unwrap();
        assert!((scores[0] - 1.0).abs() < 1e-9);
        assert_eq!(scores[1], 0.0);
        assert_eq!(
            m.score_pairs(&["a"], &["a", "b"]),
            Err(Error::LengthMismatch { left: 1, right: 2 })
        );
    }

    #[test]
    fn global_top_cap() {
        let docs = ["abc", "abd", "abe", "xyz"];
        let capped = matcher(MatchConfig::new(3).top(Some(2))).match_self(&docs).unwrap();
        assert_eq!(capped.len(), 2);
        assert!(capped.iter().all(|p| p.left == 0));
    }
}
