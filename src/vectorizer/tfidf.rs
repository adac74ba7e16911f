use crate::utils::datastruct::vector::SparseVec;
use crate::vectorizer::{corpus::Corpus, token::TokenFrequency, vocab::Vocabulary};

/// TF-IDF weighting strategy.
///
/// Engines are stateless; [`crate::NgramVectorizer`] is generic over one and
/// calls these associated functions.
pub trait TfIdfEngine: Send + Sync {
    /// Weight of a token that occurs `count` times in its document.
    fn tf(count: u32) -> f64;

    /// Inverse document frequency of a token found in `doc_freq` of `doc_num` documents.
    fn idf(doc_num: u64, doc_freq: u64) -> f64;

    /// IDFベクトルを生成する
    /// one entry per vocabulary index
    fn idf_vec(corpus: &Corpus, vocab: &Vocabulary) -> Vec<f64> {
        let doc_num = corpus.get_doc_num();
        vocab
            .iter()
            .map(|(_, token)| Self::idf(doc_num, corpus.get_doc_freq(token)))
            .collect()
    }

    /// L2-normalized TF-IDF vector of one document.
    /// Tokens missing from `vocab` contribute nothing.
    fn weight_vec(freq: &TokenFrequency, vocab: &Vocabulary, idf: &[f64]) -> SparseVec<f64> {
        let mut inds = Vec::with_capacity(freq.token_num());
        let mut vals = Vec::with_capacity(freq.token_num());
        for (token, count) in freq.iter() {
            if let Some(idx) = vocab.index_of(token) {
                let w = Self::tf(count) * idf[idx as usize];
                if w > 0.0 {
                    inds.push(idx);
                    vals.push(w);
                }
            }
        }
        let mut vec = SparseVec::from_unsorted(vocab.len(), inds, vals);
        vec.normalize_l2();
        vec
    }
}

/// デフォルトのTF-IDFエンジン
/// raw counts and the smoothed idf `ln((1 + n) / (1 + df)) + 1`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTfIdfEngine;

impl TfIdfEngine for DefaultTfIdfEngine {
    #[inline]
    fn tf(count: u32) -> f64 {
        count as f64
    }

    #[inline]
    fn idf(doc_num: u64, doc_freq: u64) -> f64 {
        smoothed_idf(doc_num, doc_freq)
    }
}

/// Sublinear term frequency `1 + ln(count)`, same idf as the default engine.
/// Dampens repeated n-grams in long titles.
#[derive(Debug, Clone, Copy, Default)]
pub struct SublinearTfIdfEngine;

impl TfIdfEngine for SublinearTfIdfEngine {
    #[inline]
    fn tf(count: u32) -> f64 {
        if count == 0 {
            0.0
        } else {
            1.0 + (count as f64).ln()
        }
    }

    #[inline]
    fn idf(doc_num: u64, doc_freq: u64) -> f64 {
        smoothed_idf(doc_num, doc_freq)
    }
}

/// 0除算回避のため分子分母に 1 を足す; 結果は常に 1 以上
#[inline]
fn smoothed_idf(doc_num: u64, doc_freq: u64) -> f64 {
    ((1.0 + doc_num as f64) / (1.0 + doc_freq as f64)).ln() + 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothed_idf_values() {
        // token in every document -> ln(1) + 1
        assert_eq!(DefaultTfIdfEngine::idf(4, 4), 1.0);
        assert!((DefaultTfIdfEngine::idf(3, 1) - (2.0f64.ln() + 1.0)).abs() < 1e-15);
        // empty corpus is still finite
        assert_eq!(DefaultTfIdfEngine::idf(0, 0), 1.0);
    }

    #[test]
    fn sublinear_tf_dampens_counts() {
        assert_eq!(SublinearTfIdfEngine::tf(0), 0.0);
        assert_eq!(SublinearTfIdfEngine::tf(1), 1.0);
        assert!(SublinearTfIdfEngine::tf(4) < DefaultTfIdfEngine::tf(4));
    }

    #[test]
    fn weight_vec_skips_unknown_tokens_and_normalizes() {
        let mut vocab = Vocabulary::new();
        vocab.insert("ab");
        vocab.insert("bc");
        let idf = vec![1.0, 2.0];
        let freq: TokenFrequency = ["bc", "zz", "ab", "bc"].into_iter().collect();
        let v = DefaultTfIdfEngine::weight_vec(&freq, &vocab, &idf);
        assert_eq!(v.as_ind_slice(), &[0, 1]);
        // raw weights (1, 4) -> normalized by sqrt(17)
        let norm = 17.0f64.sqrt();
        assert!((v.get(0) - 1.0 / norm).abs() < 1e-12);
        assert!((v.get(1) - 4.0 / norm).abs() < 1e-12);
    }
}
