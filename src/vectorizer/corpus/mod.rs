use std::sync::atomic::{AtomicU64, Ordering};

use ahash::RandomState;
use dashmap::DashMap;

use crate::vectorizer::token::TokenFrequency;

/// keep document count and per-token document frequency in a thread-safe way
///
/// Documents are added concurrently from rayon workers while a corpus is
/// being fitted; afterwards it is only read.
#[derive(Debug, Default)]
pub struct Corpus {
    /// number of documents added
    doc_num: AtomicU64,
    /// token -> number of documents containing it
    doc_freq: DashMap<Box<str>, u64, RandomState>,
}

impl Clone for Corpus {
    fn clone(&self) -> Self {
        Self {
            doc_num: AtomicU64::new(self.doc_num.load(Ordering::Acquire)),
            doc_freq: self.doc_freq.clone(),
        }
    }
}

impl Corpus {
    pub fn new() -> Self {
        Self {
            doc_num: AtomicU64::new(0),
            doc_freq: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Count one document. Each distinct token is counted once.
    pub fn add_document(&self, freq: &TokenFrequency) {
        self.doc_num.fetch_add(1, Ordering::Relaxed);
        for (token, _) in freq.iter() {
            // 既存キーなら割り当て無しで加算
            if let Some(mut count) = self.doc_freq.get_mut(token) {
                *count += 1;
                continue;
            }
            *self.doc_freq.entry(Box::from(token)).or_insert(0) += 1;
        }
    }

    /// Get the number of documents in the corpus
    pub fn get_doc_num(&self) -> u64 {
        self.doc_num.load(Ordering::Relaxed)
    }

    /// Number of documents containing `token`
    pub fn get_doc_freq(&self, token: &str) -> u64 {
        self.doc_freq.get(token).map_or(0, |count| *count)
    }

    /// Get the current vocabulary size (number of unique tokens)
    #[inline]
    pub fn vocab_size(&self) -> usize {
        self.doc_freq.len()
    }
}
