use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

///  TokenFrequency 構造体
/// Per-document n-gram counts.
///
/// Tokens keep their first-seen order, which is what makes vocabulary index
/// assignment deterministic.
///
/// # Examples
/// ```
/// use tf_idf_join::TokenFrequency;
/// let freq: TokenFrequency = ["ab", "bc", "ab"].into_iter().collect();
/// assert_eq!(freq.token_count("ab"), 2);
/// assert_eq!(freq.token_total_count(), 3);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TokenFrequency {
    #[serde(with = "indexmap::map::serde_seq")]
    token_count: IndexMap<Box<str>, u32>,
    total_token_count: u64,
}

/// Tokenの追加
impl TokenFrequency {
    pub fn new() -> Self {
        TokenFrequency {
            token_count: IndexMap::new(),
            total_token_count: 0,
        }
    }

    /// tokenを追加する
    #[inline]
    pub fn add_token(&mut self, token: &str) -> &mut Self {
        match self.token_count.get_mut(token) {
            Some(count) => *count += 1,
            None => {
                self.token_count.insert(Box::from(token), 1);
            }
        }
        self.total_token_count += 1;
        self
    }
}

impl<S> FromIterator<S> for TokenFrequency
where
    S: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut freq = TokenFrequency::new();
        for token in iter {
            freq.add_token(token.as_ref());
        }
        freq
    }
}

/// TokenFrequencyの情報を取得するための実装
impl TokenFrequency {
    /// あるtokenの出現回数を取得します
    #[inline]
    pub fn token_count(&self, token: &str) -> u32 {
        self.token_count.get(token).copied().unwrap_or(0)
    }

    /// 全tokenのカウントの合計
    #[inline]
    pub fn token_total_count(&self) -> u64 {
        self.total_token_count
    }

    /// 出現したユニークなtoken数
    #[inline]
    pub fn token_num(&self) -> usize {
        self.token_count.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.token_count.is_empty()
    }

    /// `(token, count)` in first-seen order
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, u32)> + '_ {
        self.token_count.iter().map(|(token, &count)| (token.as_ref(), count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_order() {
        let freq: TokenFrequency = ["the", "he ", "the", "e h"].into_iter().collect();
        assert_eq!(freq.token_num(), 3);
        assert_eq!(freq.token_total_count(), 4);
        assert_eq!(freq.token_count("the"), 2);
        assert_eq!(freq.token_count("zzz"), 0);
        let order: Vec<_> = freq.iter().collect();
        assert_eq!(order, vec![("the", 2), ("he ", 1), ("e h", 1)]);
    }

    #[test]
    fn add_token_counts_incrementally() {
        let mut freq = TokenFrequency::new();
        assert!(freq.is_empty());
        freq.add_token("a").add_token("b").add_token("a");
        assert_eq!(freq.token_count("a"), 2);
        assert_eq!(freq.token_total_count(), 3);
    }
}
