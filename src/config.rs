use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::vectorizer::ngram::DEFAULT_NGRAM_LENGTH;

/// Settings of a [`crate::Matcher`] run.
///
/// Every field has a default, so a JSON document only needs the ones it
/// changes. Unknown keys are rejected.
///
/// ```
/// use tf_idf_join::MatchConfig;
///
/// let config = MatchConfig::from_json_str(r#"{ "top_n": 1, "lower_bound": 0.5 }"#).unwrap();
/// assert_eq!(config.ngram_length, 3);
/// assert!(!config.include_identity);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchConfig {
    /// character n-gram length, at least 1
    pub ngram_length: usize,
    /// best matches kept per left record
    pub top_n: usize,
    /// minimum cosine similarity, in `[0, 1]`
    pub lower_bound: f64,
    /// keep `(i, i)` pairs of a self-join
    pub include_identity: bool,
    /// global cap on the number of pairs returned
    pub top: Option<usize>,
    /// use rayon
    pub parallel: bool,
    /// `1 + ln(tf)` instead of raw term frequency
    pub sublinear_tf: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            ngram_length: DEFAULT_NGRAM_LENGTH,
            top_n: 10,
            lower_bound: 0.0,
            include_identity: false,
            top: None,
            parallel: true,
            sublinear_tf: false,
        }
    }
}

impl MatchConfig {
    pub fn new(top_n: usize) -> Self {
        Self {
            top_n,
            ..Self::default()
        }
    }

    pub fn ngram_length(mut self, n: usize) -> Self {
        self.ngram_length = n;
        self
    }

    pub fn lower_bound(mut self, lower_bound: f64) -> Self {
        self.lower_bound = lower_bound;
        self
    }

    pub fn include_identity(mut self, include: bool) -> Self {
        self.include_identity = include;
        self
    }

    pub fn top(mut self, top: Option<usize>) -> Self {
        self.top = top;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn sublinear_tf(mut self, sublinear: bool) -> Self {
        self.sublinear_tf = sublinear;
        self
    }

    /// Reject settings no run could honour. `top_n == 0` and `top == Some(0)`
    /// are valid and give empty results.
    pub fn validate(&self) -> Result<()> {
        if self.ngram_length == 0 {
            return Err(Error::InvalidNgramLength(self.ngram_length));
        }
        if !(0.0..=1.0).contains(&self.lower_bound) {
            return Err(Error::InvalidLowerBound(self.lower_bound));
        }
        Ok(())
    }

    /// Parse and validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: MatchConfig = serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
