mod soundex;

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{BuildHasher, Hash};

use ahash::RandomState;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub use self::soundex::{soundex, PhoneticCode};

/// Field access for records fed to [`build_index`].
///
/// `None` means the field is missing; such records never become candidates.
pub trait Record {
    fn field(&self, name: &str) -> Option<&str>;
}

impl<K, V, S> Record for HashMap<K, V, S>
where
    K: Borrow<str> + Hash + Eq,
    V: AsRef<str>,
    S: BuildHasher,
{
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(AsRef::as_ref)
    }
}

impl<K, V, S> Record for IndexMap<K, V, S>
where
    K: Borrow<str> + Hash + Eq,
    V: AsRef<str>,
    S: BuildHasher,
{
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(AsRef::as_ref)
    }
}

impl<K, V> Record for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: AsRef<str>,
{
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(AsRef::as_ref)
    }
}

/// How several key fields combine into a candidate condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCombine {
    /// Codes must agree on every field (composite key).
    #[default]
    All,
    /// Codes agreeing on any single field suffice (union over fields).
    Any,
}

/// Key fields of both sides. Position `k` of `left_on` is compared with
/// position `k` of `right_on`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingKeys {
    left_on: Vec<String>,
    right_on: Vec<String>,
    combine: KeyCombine,
}

impl BlockingKeys {
    /// Same field names on both sides.
    pub fn on<I, S>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let left_on: Vec<String> = fields.into_iter().map(Into::into).collect();
        let right_on = left_on.clone();
        Self::left_right(left_on, right_on)
    }

    pub fn left_right<L, R, S, T>(left_on: L, right_on: R) -> Result<Self>
    where
        L: IntoIterator<Item = S>,
        R: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let left_on: Vec<String> = left_on.into_iter().map(Into::into).collect();
        let right_on: Vec<String> = right_on.into_iter().map(Into::into).collect();
        if left_on.is_empty() {
            return Err(Error::InvalidConfig("blocking needs at least one key field".into()));
        }
        if left_on.len() != right_on.len() {
            return Err(Error::InvalidConfig(format!(
                "{} left key fields but {} right key fields",
                left_on.len(),
                right_on.len()
            )));
        }
        Ok(Self {
            left_on,
            right_on,
            combine: KeyCombine::All,
        })
    }

    pub fn combine(mut self, combine: KeyCombine) -> Self {
        self.combine = combine;
        self
    }

    #[inline]
    pub fn left_on(&self) -> &[String] {
        &self.left_on
    }

    #[inline]
    pub fn right_on(&self) -> &[String] {
        &self.right_on
    }

    #[inline]
    pub fn combine_mode(&self) -> KeyCombine {
        self.combine
    }
}

/// Pairs `(left id, right id)` allowed to be scored. Iterates in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePairSet {
    pairs: BTreeSet<(usize, usize)>,
}

impl CandidatePairSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when the pair was not present yet.
    pub fn insert(&mut self, left: usize, right: usize) -> bool {
        self.pairs.insert((left, right))
    }

    #[inline]
    pub fn contains(&self, left: usize, right: usize) -> bool {
        self.pairs.contains(&(left, right))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.pairs.iter().copied()
    }

    pub fn union(&self, other: &CandidatePairSet) -> CandidatePairSet {
        Self {
            pairs: self.pairs.union(&other.pairs).copied().collect(),
        }
    }

    /// Allowed columns of each of the first `rows` rows, ascending.
    pub(crate) fn columns_by_row(&self, rows: usize) -> Vec<Vec<u32>> {
        let mut by_row = vec![Vec::new(); rows];
        for &(left, right) in self.pairs.range(..(rows, 0)) {
            by_row[left].push(right as u32);
        }
        by_row
    }

    /// Every pair must address a cell of a `rows x cols` result.
    pub(crate) fn check_bounds(&self, rows: usize, cols: usize) -> Result<()> {
        match self.pairs.iter().find(|&&(l, r)| l >= rows || r >= cols) {
            Some(&(left, right)) => Err(Error::CandidateOutOfRange {
                left,
                right,
                rows,
                cols,
            }),
            None => Ok(()),
        }
    }
}

impl FromIterator<(usize, usize)> for CandidatePairSet {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

impl Extend<(usize, usize)> for CandidatePairSet {
    fn extend<I: IntoIterator<Item = (usize, usize)>>(&mut self, iter: I) {
        self.pairs.extend(iter);
    }
}

type Groups<K> = HashMap<K, Vec<usize>, RandomState>;

/// Group record positions by a key; records without a key are left out.
fn group_by<R, K, F>(records: &[R], key: F) -> Groups<K>
where
    K: Hash + Eq,
    F: Fn(&R) -> Option<K>,
{
    let mut groups: Groups<K> = HashMap::with_hasher(RandomState::new());
    for (pos, record) in records.iter().enumerate() {
        if let Some(k) = key(record) {
            groups.entry(k).or_default().push(pos);
        }
    }
    groups
}

/// Phonetic codes of `fields`, `None` if any is missing or has no letter.
fn composite_code<R: Record>(record: &R, fields: &[String]) -> Option<Vec<PhoneticCode>> {
    fields.iter().map(|f| record.field(f).and_then(soundex)).collect()
}

fn cross_groups<K: Hash + Eq>(left: &Groups<K>, right: &Groups<K>, out: &mut CandidatePairSet) {
    for (key, lefts) in left {
        if let Some(rights) = right.get(key) {
            for &l in lefts {
                out.extend(rights.iter().map(|&r| (l, r)));
            }
        }
    }
}

/// Candidate pairs of records whose Soundex codes agree on the key fields.
///
/// Each side is grouped by its code(s); pairs are the cross product of
/// groups with equal codes. See [`KeyCombine`] for several fields.
pub fn build_index<L, R>(left: &[L], right: &[R], keys: &BlockingKeys) -> CandidatePairSet
where
    L: Record,
    R: Record,
{
    let _span = tracing::debug_span!("build_index", left = left.len(), right = right.len()).entered();
    let mut pairs = CandidatePairSet::new();
    match keys.combine {
        KeyCombine::All => {
            let lg = group_by(left, |r| composite_code(r, &keys.left_on));
            let rg = group_by(right, |r| composite_code(r, &keys.right_on));
            debug!(left_groups = lg.len(), right_groups = rg.len(), "grouped by composite code");
            cross_groups(&lg, &rg, &mut pairs);
        }
        KeyCombine::Any => {
            for (lf, rf) in keys.left_on.iter().zip(&keys.right_on) {
                let lg = group_by(left, |r| r.field(lf).and_then(soundex));
                let rg = group_by(right, |r| r.field(rf).and_then(soundex));
                debug!(field = %lf, left_groups = lg.len(), right_groups = rg.len(), "grouped by field code");
                cross_groups(&lg, &rg, &mut pairs);
            }
        }
    }
    debug!(pairs = pairs.len(), "candidate pairs");
    pairs
}
