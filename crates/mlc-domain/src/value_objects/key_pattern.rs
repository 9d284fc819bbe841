//! Key patterns
//!
//! Invalidation targets are either a single key or every key sharing a
//! prefix. Keeping the two apart in the type lets callers dispatch to point
//! deletion or scan deletion without inspecting strings.

use std::fmt;

/// Marker used by the string form of a prefix pattern
pub const WILDCARD: char = '*';

/// A cache key or a family of keys
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPattern {
    /// Exactly one key
    Literal(String),
    /// Every key starting with the prefix (an empty prefix matches everything)
    Prefix(String),
}

impl KeyPattern {
    /// Create a literal pattern
    pub fn literal<S: Into<String>>(key: S) -> Self {
        Self::Literal(key.into())
    }

    /// Create a prefix pattern
    pub fn prefix<S: Into<String>>(prefix: S) -> Self {
        Self::Prefix(prefix.into())
    }

    /// Pattern matching every key
    pub fn all() -> Self {
        Self::Prefix(String::new())
    }

    /// Parse the string convention: a trailing `*` means prefix
    ///
    /// ```
    /// use mlc_domain::value_objects::KeyPattern;
    ///
    /// assert_eq!(KeyPattern::parse("positions:0xabc:*"), KeyPattern::prefix("positions:0xabc:"));
    /// assert_eq!(KeyPattern::parse("price:ETH"), KeyPattern::literal("price:ETH"));
    /// ```
    pub fn parse(raw: &str) -> Self {
        match raw.strip_suffix(WILDCARD) {
            Some(prefix) => Self::Prefix(prefix.to_string()),
            None => Self::Literal(raw.to_string()),
        }
    }

    /// Whether this pattern covers more than one key
    pub fn is_prefix(&self) -> bool {
        matches!(self, Self::Prefix(_))
    }

    /// The literal key or the prefix, without the wildcard
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(key) | Self::Prefix(key) => key,
        }
    }

    /// Whether `key` is covered by this pattern
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == key,
            Self::Prefix(prefix) => key.starts_with(prefix.as_str()),
        }
    }

    /// Glob form understood by key-scanning backends
    ///
    /// Glob metacharacters inside the key text are escaped so that a literal
    /// `[` in a key never turns into a character class.
    pub fn to_glob(&self) -> String {
        let mut glob = escape_glob(self.as_str());
        if self.is_prefix() {
            glob.push(WILDCARD);
        }
        glob
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(key) => write!(f, "{key}"),
            Self::Prefix(prefix) => write!(f, "{prefix}{WILDCARD}"),
        }
    }
}

impl From<&str> for KeyPattern {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for KeyPattern {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

/// Escape glob metacharacters (`*`, `?`, `[`, `]`, `\`)
pub fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
