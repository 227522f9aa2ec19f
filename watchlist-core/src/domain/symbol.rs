//! Symbol: opaque identifier for one tradable security.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticker symbol as understood by the market-data provider (e.g. `BHP.AX`).
///
/// Never empty and never carries surrounding whitespace. Construction goes
/// through [`Symbol::parse`], so every `Symbol` in the system is well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Trim and validate a raw ticker. Returns `None` for blank input or
    /// embedded whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append a provider suffix (`.AX`) unless it is already present.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        if suffix.is_empty() || self.0.ends_with(suffix) {
            self.clone()
        } else {
            Self(format!("{}{suffix}", self.0))
        }
    }

    /// The ticker with a provider suffix removed, if present.
    pub fn without_suffix(&self, suffix: &str) -> &str {
        if suffix.is_empty() {
            return &self.0;
        }
        self.0.strip_suffix(suffix).unwrap_or(&self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Symbol {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Symbol::parse(&value).ok_or_else(|| format!("invalid symbol: {value:?}"))
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}
