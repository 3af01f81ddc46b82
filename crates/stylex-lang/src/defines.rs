use std::collections::BTreeMap;

use itertools::Itertools;
use regex_lite::{Captures, Regex};
use serde::{Deserialize, Serialize};

// `${...}` references and quoted string literals, which substitution leaves alone.
const SKIPPED: &str = r#"(?s)(\$\{[^}]*\}|'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*")"#;

/// Named text fragments substituted into an expression before parsing.
///
/// A key mapped to `None` is defined but undefined; its occurrences are
/// removed from the text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Defines(BTreeMap<String, Option<String>>);

impl Defines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), Some(value.into()));
        self
    }

    pub fn undefine(&mut self, key: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), None);
        self
    }

    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.0.get(key).map(Option::as_deref)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Order-independent identity of the contents, used as a cache key.
    pub fn signature(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    /// Identity of the key set alone; the match pattern depends only on it.
    pub fn key_signature(&self) -> String {
        serde_json::to_string(&self.0.keys().collect_vec()).unwrap_or_default()
    }

    /// Builds the pattern matching every key as a whole word.
    ///
    /// Longer keys are tried first so that `ab` wins over `a`. The first group
    /// matches `${...}` references and string literals, which are left untouched.
    pub fn pattern(&self) -> Result<Regex, regex_lite::Error> {
        let alternatives = self
            .0
            .keys()
            .filter(|key| !key.is_empty())
            .sorted_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)))
            .map(|key| {
                format!(
                    "{}{}{}",
                    if starts_with_word_char(key) { r"\b" } else { "" },
                    regex_lite::escape(key),
                    if ends_with_word_char(key) { r"\b" } else { "" },
                )
            })
            .join("|");

        if alternatives.is_empty() {
            Regex::new(SKIPPED)
        } else {
            Regex::new(&format!("{}|{}", SKIPPED, alternatives))
        }
    }

    /// Replaces each key occurrence in `text` with `(value)`.
    pub fn substitute(&self, text: &str, pattern: &Regex) -> String {
        if self.is_empty() {
            return text.to_string();
        }

        pattern
            .replace_all(text, |caps: &Captures| {
                if let Some(skipped) = caps.get(1) {
                    return skipped.as_str().to_string();
                }

                match self.get(&caps[0]) {
                    Some(Some(value)) => format!("({})", value),
                    Some(None) => String::new(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

fn starts_with_word_char(key: &str) -> bool {
    key.chars().next().is_some_and(is_word_char)
}

fn ends_with_word_char(key: &str) -> bool {
    key.chars().last().is_some_and(is_word_char)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Defines {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Defines(
            iter.into_iter()
                .map(|(key, value)| (key.into(), Some(value.into())))
                .collect(),
        )
    }
}
