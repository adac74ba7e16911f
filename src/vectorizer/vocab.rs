use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::token::TokenFrequency;

/// Token → column index, assigned in first-seen order.
///
/// Both sides of a join are projected through the same vocabulary, so equal
/// n-grams always land in the same column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    tokens: IndexSet<Box<str>>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self {
            tokens: IndexSet::new(),
        }
    }

    /// Index of `token`, inserting it at the end when unseen.
    pub fn insert(&mut self, token: &str) -> u32 {
        if let Some(idx) = self.tokens.get_index_of(token) {
            return idx as u32;
        }
        let (idx, _) = self.tokens.insert_full(Box::from(token));
        idx as u32
    }

    /// Add every token of a document, keeping the document's own order.
    pub fn absorb(&mut self, freq: &TokenFrequency) {
        for (token, _) in freq.iter() {
            self.insert(token);
        }
    }

    #[inline]
    pub fn index_of(&self, token: &str) -> Option<u32> {
        self.tokens.get_index_of(token).map(|i| i as u32)
    }

    #[inline]
    pub fn token(&self, index: u32) -> Option<&str> {
        self.tokens.get_index(index as usize).map(|t| t.as_ref())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (u32, &str)> + '_ {
        self.tokens.iter().enumerate().map(|(i, t)| (i as u32, t.as_ref()))
    }
}
