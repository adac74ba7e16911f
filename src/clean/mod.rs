mod title;

use std::collections::HashSet;

use ahash::RandomState;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub use self::title::base_name;

/// Value of one record field while it is being cleaned.
///
/// Serialized untagged: `null`, a string, or an array.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Missing,
    Text(String),
    List(Vec<FieldValue>),
}

impl FieldValue {
    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Texts of a list, or the text itself; missing values are skipped.
    pub fn texts(&self) -> Vec<&str> {
        match self {
            FieldValue::Missing => Vec::new(),
            FieldValue::Text(s) => vec![s.as_str()],
            FieldValue::List(items) => items.iter().flat_map(FieldValue::texts).collect(),
        }
    }

    /// Apply `f` to every text, descending into lists.
    fn map_text<F>(self, f: &F) -> FieldValue
    where
        F: Fn(String) -> FieldValue,
    {
        match self {
            FieldValue::Missing => FieldValue::Missing,
            FieldValue::Text(s) => f(s),
            FieldValue::List(items) => FieldValue::List(items.into_iter().map(|v| v.map_text(f)).collect()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Missing, Into::into)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// One cleaning operation. Pure `FieldValue -> FieldValue`.
///
/// Text operations map over lists element-wise and leave `Missing` alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum CleanStep {
    /// Replace `Missing` with a text.
    FillMissing { value: String },
    /// Replace texts that equal a key of `map` exactly.
    Substitute { map: IndexMap<String, String> },
    StripNonAscii,
    /// Runs of spaces become one space; the result is trimmed.
    CollapseWhitespace,
    /// Space after `.` and `,` when glued to the next character: `J.K.` -> `J. K.`
    PadPunctuation,
    Lowercase,
    /// Keep only `[A-Za-z0-9 ]`.
    StripPunctuation,
    /// Text -> list. `max_splits: None` splits on every separator.
    Split {
        separator: String,
        #[serde(default)]
        max_splits: Option<usize>,
    },
    /// One level of nested lists.
    Flatten,
    /// Author lists joined by ` and `, `&` or `,` -> one text per author.
    SplitCombinedNames,
    /// Truncate or pad a list to `length`; padding is `pad` or `Missing`.
    FixedLength {
        length: usize,
        #[serde(default)]
        pad: Option<String>,
    },
}

impl CleanStep {
    fn validate(&self) -> Result<()> {
        match self {
            CleanStep::Split { separator, .. } if separator.is_empty() => {
                Err(Error::InvalidConfig("split separator must not be empty".into()))
            }
            _ => Ok(()),
        }
    }

    pub fn apply(&self, value: FieldValue) -> FieldValue {
        match self {
            CleanStep::FillMissing { value: fill } => fill_missing(value, fill),
            CleanStep::Substitute { map } => value.map_text(&|s: String| match map.get(&s) {
                Some(sub) => FieldValue::Text(sub.clone()),
                None => FieldValue::Text(s),
            }),
            CleanStep::StripNonAscii => value.map_text(&|s: String| FieldValue::Text(s.chars().filter(char::is_ascii).collect())),
            CleanStep::CollapseWhitespace => value.map_text(&|s: String| FieldValue::Text(collapse_spaces(&s))),
            CleanStep::PadPunctuation => value.map_text(&|s: String| FieldValue::Text(pad_punctuation(&s))),
            CleanStep::Lowercase => value.map_text(&|s: String| FieldValue::Text(s.to_lowercase())),
            CleanStep::StripPunctuation => value.map_text(&|s: String| {
                FieldValue::Text(s.chars().filter(|c| c.is_ascii_alphanumeric() || *c == ' ').collect())
            }),
            CleanStep::Split {
                separator,
                max_splits,
            } => value.map_text(&|s: String| {
                let parts: Vec<FieldValue> = match max_splits {
                    Some(n) => s.splitn(n + 1, separator.as_str()).map(FieldValue::from).collect(),
                    None => s.split(separator.as_str()).map(FieldValue::from).collect(),
                };
                FieldValue::List(parts)
            }),
            CleanStep::Flatten => match value {
                FieldValue::List(items) => {
                    let mut flat = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            FieldValue::List(inner) => flat.extend(inner),
                            other => flat.push(other),
                        }
                    }
                    FieldValue::List(flat)
                }
                other => other,
            },
            CleanStep::SplitCombinedNames => match value {
                FieldValue::Missing => FieldValue::Missing,
                other => {
                    let mut names = Vec::new();
                    for text in other.texts() {
                        split_combined(text, &mut names);
                    }
                    FieldValue::List(names.into_iter().map(FieldValue::Text).collect())
                }
            },
            CleanStep::FixedLength { length, pad } => match value {
                FieldValue::Missing => FieldValue::Missing,
                FieldValue::Text(s) => fixed_length(vec![FieldValue::Text(s)], *length, pad),
                FieldValue::List(items) => fixed_length(items, *length, pad),
            },
        }
    }
}

fn fill_missing(value: FieldValue, fill: &str) -> FieldValue {
    match value {
        FieldValue::Missing => FieldValue::Text(fill.to_string()),
        FieldValue::List(items) => FieldValue::List(items.into_iter().map(|v| fill_missing(v, fill)).collect()),
        text => text,
    }
}

fn fixed_length(mut items: Vec<FieldValue>, length: usize, pad: &Option<String>) -> FieldValue {
    items.truncate(length);
    let filler = pad.as_deref().map_or(FieldValue::Missing, FieldValue::from);
    items.resize(length, filler);
    FieldValue::List(items)
}

/// `' +' -> ' '`, then trim
fn collapse_spaces(s: &str) -> String {
    let joined = s.split(' ').filter(|part| !part.is_empty()).collect::<Vec<_>>().join(" ");
    joined.trim().to_string()
}

fn pad_punctuation(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if matches!(c, '.' | ',') {
            if let Some(next) = chars.peek() {
                if !next.is_whitespace() {
                    out.push(' ');
                }
            }
        }
    }
    out.trim().to_string()
}

/// 再帰的に ` and ` / 末尾の ` and` / ` & ` / `,` で分割
fn split_combined(name: &str, out: &mut Vec<String>) {
    if name.is_empty() {
        return;
    }
    let parts: Option<Vec<&str>> = if name.contains(" and ") {
        Some(name.split(" and ").collect())
    } else if let Some(head) = name.strip_suffix(" and") {
        Some(vec![head])
    } else if name.contains(" & ") {
        Some(name.split(" & ").collect())
    } else if name.contains(',') {
        Some(name.split(',').collect())
    } else {
        None
    };
    match parts {
        Some(parts) => parts.into_iter().for_each(|p| split_combined(p, out)),
        None => {
            let trimmed = name.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        }
    }
}

/// Ordered list of [`CleanStep`]s.
///
/// Deserializes from a JSON array of steps and rejects invalid ones:
///
/// ```
/// use tf_idf_join::clean::{FieldValue, Pipeline};
///
/// let pipeline: Pipeline = serde_json::from_str(r#"[
///     {"step": "pad_punctuation"},
///     {"step": "split_combined_names"}
/// ]"#).unwrap();
/// let authors = pipeline.apply_text("J.K. Rowling & J.R.R. Tolkien");
/// assert_eq!(authors, FieldValue::from(vec!["J. K. Rowling", "J. R. R. Tolkien"]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CleanStep>", into = "Vec<CleanStep>")]
pub struct Pipeline {
    steps: Vec<CleanStep>,
}

impl TryFrom<Vec<CleanStep>> for Pipeline {
    type Error = Error;

    fn try_from(steps: Vec<CleanStep>) -> Result<Self> {
        Pipeline::with_steps(steps)
    }
}

impl From<Pipeline> for Vec<CleanStep> {
    fn from(p: Pipeline) -> Self {
        p.steps
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_steps(steps: Vec<CleanStep>) -> Result<Self> {
        for step in &steps {
            step.validate()?;
        }
        Ok(Self { steps })
    }

    pub fn push(&mut self, step: CleanStep) -> Result<&mut Self> {
        step.validate()?;
        self.steps.push(step);
        Ok(self)
    }

    #[inline]
    pub fn steps(&self) -> &[CleanStep] {
        &self.steps
    }

    /// Run every step in order.
    pub fn apply(&self, value: FieldValue) -> FieldValue {
        self.steps.iter().fold(value, |v, step| step.apply(v))
    }

    pub fn apply_text(&self, text: &str) -> FieldValue {
        self.apply(FieldValue::from(text))
    }

    /// Clean a whole column in parallel, keeping its order.
    pub fn apply_all(&self, values: Vec<FieldValue>) -> Vec<FieldValue> {
        debug!(values = values.len(), steps = self.steps.len(), "cleaning column");
        values.into_par_iter().map(|v| self.apply(v)).collect()
    }

    /// Positions of the values to keep: everything whose text is not one of
    /// `exclusions`. Lists and missing values are always kept.
    pub fn exclude<S: AsRef<str>>(values: &[FieldValue], exclusions: &[S]) -> Vec<usize> {
        let excluded: HashSet<&str, RandomState> = exclusions.iter().map(|s| s.as_ref()).collect();
        values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.as_text().map_or(true, |t| !excluded.contains(t)))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Normalization applied before n-gram tokenizing names and titles.
///
/// Drops non-ASCII and `)(.|[]{}'`, spells `&` as `and`, turns `,` `-`
/// into spaces, title-cases words and collapses spaces. `/` still splits words
/// for title-casing and is deleted last, so `AC/DC` becomes `AcDc`.
/// A ` BD` marker is never removed: title-casing has already turned it into `Bd`.
///
/// ```
/// use tf_idf_join::clean::ngram_analyzer_normalize;
///
/// assert_eq!(ngram_analyzer_normalize("  SMITH-JONES & co. (Ltd) "), "Smith Jones And Co Ltd");
/// ```
pub fn ngram_analyzer_normalize(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for c in text.chars().filter(char::is_ascii) {
        match c {
            ')' | '(' | '.' | '|' | '[' | ']' | '{' | '}' | '\'' => {}
            '&' => cleaned.push_str("and"),
            ',' | '-' => cleaned.push(' '),
            c => cleaned.push(c.to_ascii_lowercase()),
        }
    }
    // str.title() と同じ: 英字の連続の先頭だけ大文字
    let mut titled = String::with_capacity(cleaned.len());
    let mut in_word = false;
    for c in cleaned.chars() {
        if c.is_ascii_alphabetic() {
            titled.push(if in_word { c } else { c.to_ascii_uppercase() });
            in_word = true;
        } else {
            titled.push(c);
            in_word = false;
        }
    }
    collapse_spaces(&titled).replace('/', "")
}
