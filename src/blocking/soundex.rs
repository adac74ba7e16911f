use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

/// Four-character Soundex code, e.g. `S530`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhoneticCode([u8; 4]);

impl PhoneticCode {
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for PhoneticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            f.write_char(b as char)?;
        }
        Ok(())
    }
}

/// Digit class of a letter; `0` for vowels and `Y`, `None` for `H`/`W`.
#[inline]
fn digit(c: u8) -> Option<u8> {
    Some(match c {
        b'B' | b'F' | b'P' | b'V' => b'1',
        b'C' | b'G' | b'J' | b'K' | b'Q' | b'S' | b'X' | b'Z' => b'2',
        b'D' | b'T' => b'3',
        b'L' => b'4',
        b'M' | b'N' => b'5',
        b'R' => b'6',
        b'H' | b'W' => return None,
        _ => b'0',
    })
}

/// American Soundex of the ASCII letters in `word`.
///
/// First letter, then up to three digits. Letters with the same digit
/// collapse when adjacent or separated only by `H`/`W`; a vowel between them
/// keeps both. Short codes are padded with `0`. Returns `None` when `word`
/// has no ASCII letter.
///
/// ```
/// use tf_idf_join::blocking::soundex;
///
/// assert_eq!(soundex("Smith").unwrap().to_string(), "S530");
/// assert_eq!(soundex("Smyth"), soundex("Smith"));
/// assert_eq!(soundex("Jones").unwrap().to_string(), "J520");
/// assert_eq!(soundex("42"), None);
/// ```
pub fn soundex(word: &str) -> Option<PhoneticCode> {
    let mut letters = word
        .bytes()
        .filter(u8::is_ascii_alphabetic)
        .map(|b| b.to_ascii_uppercase());
    let first = letters.next()?;

    let mut code = [b'0'; 4];
    code[0] = first;
    let mut len = 1;
    let mut prev = digit(first);
    for c in letters {
        if len == 4 {
            break;
        }
        match digit(c) {
            // H/W は直前のコードを保持
            None => continue,
            Some(d) => {
                if d != b'0' && Some(d) != prev {
                    code[len] = d;
                    len += 1;
                }
                prev = Some(d);
            }
        }
    }
    Some(PhoneticCode(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(word: &str) -> String {
        soundex(word).map(|c| c.to_string()).unwrap_or_default()
    }

    #[test]
    fn classic_codes() {
        assert_eq!(code("Robert"), "R163");
        assert_eq!(code("Rupert"), "R163");
        assert_eq!(code("Rubin"), "R150");
        assert_eq!(code("Tymczak"), "T522");
        assert_eq!(code("Pfister"), "P236");
        assert_eq!(code("Lee"), "L000");
    }

    #[test]
    fn h_and_w_do_not_separate() {
        assert_eq!(code("Ashcraft"), "A261");
        assert_eq!(code("Ashcroft"), "A261");
    }

    #[test]
    fn case_and_non_letters_are_ignored() {
        assert_eq!(code("o'brien"), code("OBrien"));
        assert_eq!(code("  smith-jones "), code("SMITHJONES"));
        assert_eq!(soundex(""), None);
        assert_eq!(code("Łódź"), "D000");
    }
}
