//! This crate is a fuzzy record matching engine using character n-gram TF-IDF
//! vectors and a sparse top-N cosine join.
pub mod blocking;
pub mod clean;
pub mod config;
pub mod error;
pub mod join;
pub mod matcher;
pub mod matches;
pub mod person;
pub mod utils;
pub mod vectorizer;

/// Matcher
/// The top-level struct of this crate. It wires the vectorizer, the top-N join
/// and the match assembler together for the usual runs:
/// - self-join of one list (`match_self`)
/// - cross-join of two lists (`match_between`)
/// - cross-join restricted to blocking candidates (`match_candidates`)
/// - aligned pair scoring (`score_pairs`)
///
/// A fresh vocabulary is fitted per run on all documents of that run, so both
/// sides of a join share one vector space.
pub use matcher::Matcher;

/// Match Configuration
/// n-gram length, top-N cap, lower bound, identity flag and global cap of a run.
/// Deserializable from JSON; every field has a default.
pub use config::MatchConfig;

/// Error type of this crate and its `Result` alias.
/// Configuration errors are reported before any document is processed;
/// degenerate data (empty lists, empty strings) is never an error.
pub use error::{Error, NameParseError, Result};

/// N-gram Tokenizer
/// Splits a string, padded with one space on each side, into overlapping
/// character n-grams.
pub use vectorizer::ngram::NgramTokenizer;

/// N-gram TF-IDF Vectorizer
/// Builds the vocabulary and smoothed IDF of a corpus and produces
/// L2-normalized sparse rows.
///
/// `NgramVectorizer<E>` is generic over the weighting engine `E`.
pub use vectorizer::{FittedVectorizer, IdfVector, NgramVectorizer};

/// TF IDF Calculation Engine Trait
/// A trait that defines the behavior of a TF-IDF calculation engine.
///
/// By implementing this trait, you can plug different TF-IDF calculation strategies
/// into `NgramVectorizer<E>`.
/// `DefaultTfIdfEngine` uses raw counts, `SublinearTfIdfEngine` uses `1 + ln(tf)`.
pub use vectorizer::tfidf::{DefaultTfIdfEngine, SublinearTfIdfEngine, TfIdfEngine};

/// Token Frequency structure
/// Counts of the n-grams of one document, in first-seen order.
pub use vectorizer::token::TokenFrequency;

/// Vocabulary
/// Token to column index, assigned in first-seen order.
pub use vectorizer::vocab::Vocabulary;

/// Corpus
/// Document count and per-token document frequency.
///
/// # Thread Safety
/// Documents can be added concurrently. Implemented using DashMap and atomics.
pub use vectorizer::corpus::Corpus;

/// Sparse vector and CSR matrix
pub use utils::datastruct::csr::{CsrMatrix, RowView};
pub use utils::datastruct::vector::SparseVec;

/// Sparse Top-N Join
/// Per row of `A`, the `n` best columns of `A·B` above a lower bound,
/// without the full product.
pub use join::{brute_force_top_n, top_n_join, TopNJoin};

/// Match table
/// - `MatchPair`: one `(left, right, score)` entry
/// - `Matches`: all pairs grouped by left record, best first
pub use matches::{assemble, AssembleOptions, LabeledMatch, MatchPair, Matches};

/// Soundex blocking
/// Candidate pairs of records sharing the phonetic code of their key fields.
pub use blocking::{build_index, BlockingKeys, CandidatePairSet, KeyCombine, Record};
