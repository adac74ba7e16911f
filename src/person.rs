use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NameParseError;

/// Structured human name.
///
/// Empty strings stand for absent parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Name {
    pub given_name: String,
    pub surname: String,
    #[serde(default)]
    pub middle_name: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
    #[serde(default)]
    pub nickname: String,
}

impl Name {
    pub fn new(given_name: impl Into<String>, surname: impl Into<String>) -> Self {
        Self {
            given_name: given_name.into(),
            surname: surname.into(),
            ..Self::default()
        }
    }

    pub fn with_middle_name(mut self, middle_name: impl Into<String>) -> Self {
        self.middle_name = middle_name.into();
        self
    }

    /// `given surname`, the form used for blocking and n-gram matching.
    pub fn short_form(&self) -> String {
        join_non_empty(&[self.given_name.as_str(), self.surname.as_str()])
    }
}

fn join_non_empty(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for Name {
    /// `given [middle ]surname`; the middle name only when present.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_non_empty(&[
            self.given_name.as_str(),
            self.middle_name.as_str(),
            self.surname.as_str(),
        ]))
    }
}

/// Turns raw text into a [`Name`].
pub trait NameParser {
    fn parse(&self, raw: &str) -> Result<Name, NameParseError>;
}

/// Whitespace split: first word given name, last word surname, the words in
/// between the middle name. A single word is taken as the surname.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceNameParser;

impl NameParser for WhitespaceNameParser {
    fn parse(&self, raw: &str) -> Result<Name, NameParseError> {
        let words: Vec<&str> = raw.split_whitespace().collect();
        match words.as_slice() {
            [] => Err(NameParseError {
                input: raw.to_string(),
                reason: "no words".to_string(),
            }),
            [surname] => Ok(Name::new("", *surname)),
            [given, middle @ .., surname] => Ok(Name::new(*given, *surname).with_middle_name(middle.join(" "))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_middle_name_only_when_present() {
        assert_eq!(Name::new("Joanne", "Rowling").to_string(), "Joanne Rowling");
        let full = Name::new("John", "Tolkien").with_middle_name("Ronald Reuel");
        assert_eq!(full.to_string(), "John Ronald Reuel Tolkien");
        assert_eq!(full.short_form(), "John Tolkien");
    }

    #[test]
    fn whitespace_parser() {
        let p = WhitespaceNameParser;
        assert_eq!(p.parse("  Terry   Pratchett ").unwrap(), Name::new("Terry", "Pratchett"));
        let n = p.parse("George R. R. Martin").unwrap();
        assert_eq!(n.middle_name, "R. R.");
        assert_eq!(n.surname, "Martin");
        assert_eq!(p.parse("Homer").unwrap().to_string(), "Homer");
        let err = p.parse("   ").unwrap_err();
        assert_eq!(err.input, "   ");
    }

    #[test]
    fn name_json() {
        let n: Name = serde_json::from_str(r#"{"given_name":"Ursula","surname":"Le Guin"}"#).unwrap();
        assert_eq!(n, Name::new("Ursula", "Le Guin"));
    }
}
