//! Field-name case conversion.
//!
//! An identifier is split into lowercase word tokens and re-joined under a target style. Words
//! break at `_`/`-`, at a lowercase-or-digit to uppercase transition, and before the last capital
//! of an uppercase run that is followed by a lowercase letter (`HTTPServer` -> `http`, `server`).

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Naming convention for field names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStyle {
    /// Names are used exactly as written.
    #[default]
    Identity,
    Camel,
    Snake,
    Pascal,
}

/// The casing of native field names (`source`) and of wire keys (`target`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseSettings {
    #[serde(default)]
    pub source: CaseStyle,
    #[serde(default)]
    pub target: CaseStyle,
}

impl CaseSettings {
    pub const IDENTITY: CaseSettings = CaseSettings {
        source: CaseStyle::Identity,
        target: CaseStyle::Identity,
    };

    pub fn new(source: CaseStyle, target: CaseStyle) -> Self {
        Self { source, target }
    }

    pub fn is_identity(&self) -> bool {
        is_identity(self.source, self.target)
    }

    /// Native field name to wire key.
    pub fn encode_key<'a>(&self, name: &'a str) -> Cow<'a, str> {
        convert(name, self.source, self.target)
    }

    /// Wire key to native field name.
    pub fn decode_key<'a>(&self, key: &'a str) -> Cow<'a, str> {
        convert(key, self.target, self.source)
    }
}

fn is_identity(source: CaseStyle, target: CaseStyle) -> bool {
    source == target || source == CaseStyle::Identity || target == CaseStyle::Identity
}

/// Re-cases `identifier` from `source` to `target`.
///
/// Identity conversions return the input untouched, without tokenizing it, so names that do not
/// follow any convention survive unchanged.
pub fn convert(identifier: &str, source: CaseStyle, target: CaseStyle) -> Cow<'_, str> {
    if is_identity(source, target) {
        return Cow::Borrowed(identifier);
    }
    Cow::Owned(from_words(&to_words(identifier), target))
}

/// Splits an identifier into lowercase word tokens.
pub fn to_words(identifier: &str) -> Vec<String> {
    let chars: Vec<char> = identifier.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' {
            flush(&mut current, &mut words);
            continue;
        }

        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let starts_word = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if starts_word {
                flush(&mut current, &mut words);
            }
        }

        current.extend(c.to_lowercase());
    }

    flush(&mut current, &mut words);
    words
}

fn flush(current: &mut String, words: &mut Vec<String>) {
    if !current.is_empty() {
        words.push(std::mem::take(current));
    }
}

/// Joins word tokens under `style`. `Identity` concatenates the tokens as given.
pub fn from_words<S: AsRef<str>>(words: &[S], style: CaseStyle) -> String {
    match style {
        CaseStyle::Identity => words.iter().map(|w| w.as_ref()).collect(),
        CaseStyle::Snake => words
            .iter()
            .map(|w| w.as_ref().to_lowercase())
            .collect::<Vec<_>>()
            .join("_"),
        CaseStyle::Pascal => words.iter().map(|w| capitalize(w.as_ref())).collect(),
        CaseStyle::Camel => words
            .iter()
            .enumerate()
            .map(|(i, w)| {
                if i == 0 {
                    w.as_ref().to_lowercase()
                } else {
                    capitalize(w.as_ref())
                }
            })
            .collect(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
