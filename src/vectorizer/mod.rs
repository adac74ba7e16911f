pub mod corpus;
pub mod ngram;
pub mod tfidf;
pub mod token;
pub mod vocab;

use std::marker::PhantomData;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::utils::datastruct::csr::CsrMatrix;
use crate::vectorizer::{
    corpus::Corpus,
    ngram::NgramTokenizer,
    tfidf::{DefaultTfIdfEngine, TfIdfEngine},
    token::TokenFrequency,
    vocab::Vocabulary,
};

/// Character n-gram TF-IDF vectorizer.
///
/// `NgramVectorizer<E>` is generic over the weighting engine `E`
/// (see [`TfIdfEngine`]). Vocabulary and IDF are rebuilt on every fit;
/// nothing is carried over between runs.
#[derive(Debug, Clone)]
pub struct NgramVectorizer<E = DefaultTfIdfEngine>
where
    E: TfIdfEngine,
{
    tokenizer: NgramTokenizer,
    parallel: bool,
    _marker: PhantomData<E>,
}

/// IDF cache of a fitted corpus
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdfVector {
    /// IDF Vector, dense because every vocabulary token has one
    pub idf_vec: Vec<f64>,
    /// document count
    pub doc_num: u64,
}

/// Vocabulary and IDF learned by [`NgramVectorizer::fit`].
#[derive(Debug, Clone)]
pub struct FittedVectorizer<E = DefaultTfIdfEngine>
where
    E: TfIdfEngine,
{
    tokenizer: NgramTokenizer,
    parallel: bool,
    vocabulary: Vocabulary,
    idf: IdfVector,
    _marker: PhantomData<E>,
}

impl Default for NgramVectorizer<DefaultTfIdfEngine> {
    fn default() -> Self {
        Self::new(NgramTokenizer::default())
    }
}

impl<E> NgramVectorizer<E>
where
    E: TfIdfEngine,
{
    pub fn new(tokenizer: NgramTokenizer) -> Self {
        Self {
            tokenizer,
            parallel: true,
            _marker: PhantomData,
        }
    }

    /// Shorthand for `new(NgramTokenizer::new(n)?)`.
    pub fn with_ngram_length(n: usize) -> Result<Self> {
        Ok(Self::new(NgramTokenizer::new(n)?))
    }

    /// Toggle rayon for tokenization and weighting. Output is identical either way.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[inline]
    pub fn tokenizer(&self) -> &NgramTokenizer {
        &self.tokenizer
    }

    /// Learn vocabulary and IDF from `documents`.
    pub fn fit<S>(&self, documents: &[S]) -> FittedVectorizer<E>
    where
        S: AsRef<str> + Sync,
    {
        let freqs = token_frequencies(&self.tokenizer, documents, self.parallel);
        self.fit_frequencies(&freqs)
    }

    /// Fit on `documents` and return their L2-normalized TF-IDF rows.
    /// Row `i` of the matrix is document `i`; columns are vocabulary indices.
    pub fn fit_transform<S>(&self, documents: &[S]) -> (Vocabulary, CsrMatrix<f64>)
    where
        S: AsRef<str> + Sync,
    {
        let _span = tracing::debug_span!("fit_transform", docs = documents.len()).entered();
        let freqs = token_frequencies(&self.tokenizer, documents, self.parallel);
        let fitted = self.fit_frequencies(&freqs);
        let matrix = fitted.weight_rows(&freqs);
        debug!(
            vocab = fitted.vocabulary.len(),
            nnz = matrix.nnz(),
            "vectorized corpus"
        );
        (fitted.vocabulary, matrix)
    }

    fn fit_frequencies(&self, freqs: &[TokenFrequency]) -> FittedVectorizer<E> {
        // 語彙は文書順に直列で構築 (index の決定性のため)
        let mut vocabulary = Vocabulary::new();
        for freq in freqs {
            vocabulary.absorb(freq);
        }

        let corpus = Corpus::new();
        if self.parallel {
            freqs.par_iter().for_each(|f| corpus.add_document(f));
        } else {
            freqs.iter().for_each(|f| corpus.add_document(f));
        }
        debug_assert_eq!(corpus.vocab_size(), vocabulary.len());

        let idf = IdfVector {
            idf_vec: E::idf_vec(&corpus, &vocabulary),
            doc_num: corpus.get_doc_num(),
        };
        FittedVectorizer {
            tokenizer: self.tokenizer,
            parallel: self.parallel,
            vocabulary,
            idf,
            _marker: PhantomData,
        }
    }
}

impl<E> FittedVectorizer<E>
where
    E: TfIdfEngine,
{
    #[inline]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    #[inline]
    pub fn idf(&self) -> &IdfVector {
        &self.idf
    }

    /// Project documents onto the fitted vocabulary.
    /// N-grams never seen during fitting are dropped.
    pub fn transform<S>(&self, documents: &[S]) -> CsrMatrix<f64>
    where
        S: AsRef<str> + Sync,
    {
        let freqs = token_frequencies(&self.tokenizer, documents, self.parallel);
        self.weight_rows(&freqs)
    }

    fn weight_rows(&self, freqs: &[TokenFrequency]) -> CsrMatrix<f64> {
        let idf = &self.idf.idf_vec;
        let rows: Vec<_> = if self.parallel {
            freqs
                .par_iter()
                .map(|f| E::weight_vec(f, &self.vocabulary, idf))
                .collect()
        } else {
            freqs
                .iter()
                .map(|f| E::weight_vec(f, &self.vocabulary, idf))
                .collect()
        };
        CsrMatrix::stack(self.vocabulary.len(), rows)
    }
}

fn token_frequencies<S>(tokenizer: &NgramTokenizer, documents: &[S], parallel: bool) -> Vec<TokenFrequency>
where
    S: AsRef<str> + Sync,
{
    if parallel {
        documents
            .par_iter()
            .map(|d| tokenizer.tokenize(d.as_ref()).collect())
            .collect()
    } else {
        documents
            .iter()
            .map(|d| tokenizer.tokenize(d.as_ref()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::tfidf::SublinearTfIdfEngine;

    /// 0/1 weights with a flat idf
    struct PresenceEngine;

    impl TfIdfEngine for PresenceEngine {
        fn tf(count: u32) -> f64 {
            if count > 0 {
                1.0
            } else {
                0.0
            }
        }

        fn idf(_doc_num: u64, _doc_freq: u64) -> f64 {
            1.0
        }
    }

    static_assertions::assert_impl_all!(FittedVectorizer<PresenceEngine>: Send, Sync);

    fn row_norm(m: &CsrMatrix<f64>, i: usize) -> f64 {
        m.row(i).data().iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    #[test]
    fn empty_corpus() {
        let docs: Vec<&str> = vec![];
        let (vocab, m) = NgramVectorizer::default().fit_transform(&docs);
        assert!(vocab.is_empty());
        assert_eq!(m.shape(), (0, 0));
    }

    #[test]
    fn rows_are_unit_length_and_empty_docs_are_zero() {
        let docs = ["john smith", "", "jon smith", "jane doe"];
        let tok = NgramTokenizer::new(4).unwrap();
        let (vocab, m) = NgramVectorizer::<DefaultTfIdfEngine>::new(tok).fit_transform(&docs);
        assert_eq!(m.shape(), (4, vocab.len()));
        for i in [0, 2, 3] {
            assert!((row_norm(&m, i) - 1.0).abs() < 1e-9);
        }
        // "" は 2 文字しかなく 4-gram が無い
        assert!(m.row(1).is_empty());
        assert!(m.data().iter().all(|&v| v > 0.0));
    }

    #[test]
    fn vocabulary_is_first_seen_order() {
        let (vocab, _) = NgramVectorizer::default().fit_transform(&["ab", "ba"]);
        let tokens: Vec<&str> = vocab.iter().map(|(_, t)| t).collect();
        assert_eq!(tokens, vec![" ab", "ab ", " ba", "ba "]);
    }

    #[test]
    fn shared_tokens_are_down_weighted() {
        // " ab" は両方に現れる -> idf が小さい
        let (vocab, m) = NgramVectorizer::default().fit_transform(&["abc", "abd"]);
        let shared = vocab.index_of(" ab").unwrap();
        let own = vocab.index_of("abc").unwrap();
        let w_shared = m.get(0, shared as usize).unwrap();
        let w_own = m.get(0, own as usize).unwrap();
        assert!(w_shared < w_own);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let docs: Vec<String> = (0..200).map(|i| format!("record number {i} of {}", i % 13)).collect();
        let par = NgramVectorizer::default().fit_transform(&docs);
        let seq = NgramVectorizer::default().parallel(false).fit_transform(&docs);
        assert_eq!(par.0, seq.0);
        assert_eq!(par.1, seq.1);
    }

    #[test]
    fn transform_projects_onto_fitted_vocabulary() {
        let fitted = NgramVectorizer::default().fit(&["harry potter", "the hobbit"]);
        let m = fitted.transform(&["harry", "zzzz"]);
        assert_eq!(m.cols(), fitted.vocabulary().len());
        assert!(!m.row(0).is_empty());
        assert!(m.row(1).is_empty());
        assert_eq!(fitted.idf().doc_num, 2);
        assert_eq!(fitted.idf().idf_vec.len(), fitted.vocabulary().len());
    }

    #[test]
    fn custom_engine_weights_rows_on_rayon() {
        let v = NgramVectorizer::<PresenceEngine>::with_ngram_length(2).unwrap();
        let (_, m) = v.fit_transform(&["aaaa", "ab"]);
        // " a", "aa", "a " の 3 種類
        assert_eq!(m.row(0).nnz(), 3);
        let w = 1.0 / 3.0f64.sqrt();
        assert!(m.row(0).data().iter().all(|v| (v - w).abs() < 1e-12));
        let seq = v.parallel(false).fit_transform(&["aaaa", "ab"]).1;
        assert_eq!(m, seq);
    }

    #[test]
    fn sublinear_engine_also_normalizes() {
        let v = NgramVectorizer::<SublinearTfIdfEngine>::with_ngram_length(2).unwrap();
        let (_, m) = v.fit_transform(&["aaaa", "aab"]);
        assert!((row_norm(&m, 0) - 1.0).abs() < 1e-9);
        assert!((row_norm(&m, 1) - 1.0).abs() < 1e-9);
    }
}
