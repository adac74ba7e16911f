use std::collections::VecDeque;
use std::iter::{Chain, FusedIterator, Once};
use std::str::Chars;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_NGRAM_LENGTH: usize = 3;

/// Padding placed once before and once after every document.
pub const PAD: char = ' ';

/// Character n-gram tokenizer.
///
/// Text is padded with a single space on each side and cut into every
/// overlapping window of `n` characters (Unicode scalar values).
///
/// ```
/// use tf_idf_join::NgramTokenizer;
/// let tok = NgramTokenizer::new(3).unwrap();
/// let grams: Vec<String> = tok.tokenize("abc").collect();
/// assert_eq!(grams, vec![" ab", "abc", "bc "]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NgramTokenizer {
    n: usize,
}

impl Default for NgramTokenizer {
    fn default() -> Self {
        Self { n: DEFAULT_NGRAM_LENGTH }
    }
}

impl NgramTokenizer {
    /// Fails with [`Error::InvalidNgramLength`] when `n == 0`.
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidNgramLength(n));
        }
        Ok(Self { n })
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of n-grams `tokenize(text)` yields.
    #[inline]
    pub fn count(&self, text: &str) -> usize {
        (text.chars().count() + 2 + 1).saturating_sub(self.n)
    }

    /// Lazy sequence of the n-grams of `text`.
    pub fn tokenize<'a>(&self, text: &'a str) -> Ngrams<'a> {
        Ngrams {
            chars: std::iter::once(PAD)
                .chain(text.chars())
                .chain(std::iter::once(PAD)),
            window: VecDeque::with_capacity(self.n),
            n: self.n,
            remaining: self.count(text),
        }
    }
}

/// Iterator returned by [`NgramTokenizer::tokenize`]
#[derive(Debug, Clone)]
pub struct Ngrams<'a> {
    chars: Chain<Chain<Once<char>, Chars<'a>>, Once<char>>,
    window: VecDeque<char>,
    n: usize,
    remaining: usize,
}

impl Iterator for Ngrams<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.remaining == 0 {
            return None;
        }
        while self.window.len() < self.n {
            let c = self.chars.next()?;
            self.window.push_back(c);
        }
        let gram: String = self.window.iter().collect();
        self.window.pop_front();
        self.remaining -= 1;
        Some(gram)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Ngrams<'_> {}

impl FusedIterator for Ngrams<'_> {}
