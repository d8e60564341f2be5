//! Keyword-based success check for agent answers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// How expected keywords combine into one verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordMode {
    /// Every keyword must appear. No keywords passes.
    Strict,
    /// At least one keyword must appear. No keywords fails.
    Lenient,
}

impl KeywordMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordMode::Strict => "strict",
            KeywordMode::Lenient => "lenient",
        }
    }
}

impl fmt::Display for KeywordMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeywordMode {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(KeywordMode::Strict),
            "lenient" => Ok(KeywordMode::Lenient),
            _ => Err(EvalError::InvalidArgument(format!(
                "invalid keyword mode '{s}': choose 'strict' or 'lenient'"
            ))),
        }
    }
}

/// Case-insensitive substring check of `keywords` against `answer`.
pub fn matches<S: AsRef<str>>(answer: &str, keywords: &[S], mode: KeywordMode) -> bool {
    let answer = answer.to_lowercase();
    let mut found = keywords
        .iter()
        .map(|kw| answer.contains(&kw.as_ref().to_lowercase()));
    match mode {
        KeywordMode::Strict => found.all(|hit| hit),
        KeywordMode::Lenient => found.any(|hit| hit),
    }
}

/// [`matches`] with the mode given by name.
pub fn check_keywords_in_answer<S: AsRef<str>>(
    answer: &str,
    keywords: &[S],
    mode: &str,
) -> Result<bool, EvalError> {
    Ok(matches(answer, keywords, mode.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: &[&str] = &[];

    #[test]
    fn strict_needs_every_keyword() {
        let answer = "Paris is the capital";
        assert!(matches(answer, &["paris", "CAPITAL"], KeywordMode::Strict));
        assert!(!matches(answer, &["Paris", "France"], KeywordMode::Strict));
    }

    #[test]
    fn lenient_needs_any_keyword() {
        let answer = "Paris is the capital";
        assert!(matches(answer, &["Paris", "France"], KeywordMode::Lenient));
        assert!(!matches(answer, &["Berlin", "Germany"], KeywordMode::Lenient));
    }

    #[test]
    fn empty_keywords() {
        assert!(matches("anything", NONE, KeywordMode::Strict));
        assert!(!matches("anything", NONE, KeywordMode::Lenient));
    }

    #[test]
    fn case_folding_is_unicode_aware() {
        assert!(matches("Курс ДОЛЛАРА вырос", &["доллар"], KeywordMode::Strict));
    }

    #[test]
    fn mode_by_name() {
        assert!(check_keywords_in_answer("The answer is 2", &["2"], "strict").unwrap());
        assert!(check_keywords_in_answer("x", &["y", "x"], "Lenient").unwrap());
        let err = check_keywords_in_answer("x", &["x"], "bogus").unwrap_err();
        assert!(matches!(err, EvalError::InvalidArgument(_)));
    }

    #[test]
    fn mode_round_trips_through_display() {
        for mode in [KeywordMode::Strict, KeywordMode::Lenient] {
            assert_eq!(mode.to_string().parse::<KeywordMode>().unwrap(), mode);
        }
    }
}
