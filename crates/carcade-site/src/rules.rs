//! Pattern-keyed rule lists.
//!
//! Rules are `(pattern, value)` pairs tested in declaration order; the first
//! pattern matching the key wins. Patterns are globs where `*` never crosses
//! a `/`, so `blog/*` targets the children of `blog` only.

use glob::{MatchOptions, Pattern};

use crate::error::SiteError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Key addressing the children of the node at `path`.
///
/// The root's children use the bare `*`.
#[must_use]
pub fn children_key(path: &str) -> String {
    if path.is_empty() {
        "*".to_owned()
    } else {
        format!("{path}/*")
    }
}

/// Ordered list of glob-keyed rules.
#[derive(Debug, Clone)]
pub struct PatternRules<T> {
    rules: Vec<Rule<T>>,
}

#[derive(Debug, Clone)]
struct Rule<T> {
    raw: String,
    pattern: Pattern,
    value: T,
}

impl<T> Default for PatternRules<T> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<T> PatternRules<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule; it matches only if every earlier rule does not.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::InvalidPattern`] if `pattern` is not a valid glob.
    pub fn push(&mut self, pattern: &str, value: T) -> Result<(), SiteError> {
        let compiled = Pattern::new(pattern).map_err(|e| SiteError::InvalidPattern {
            pattern: pattern.to_owned(),
            message: e.msg.to_owned(),
        })?;
        self.rules.push(Rule {
            raw: pattern.to_owned(),
            pattern: compiled,
            value,
        });
        Ok(())
    }

    /// Builder-style [`Self::push`].
    pub fn with(mut self, pattern: &str, value: T) -> Result<Self, SiteError> {
        self.push(pattern, value)?;
        Ok(self)
    }

    /// First rule matching `key`, with the pattern as written.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<(&str, &T)> {
        self.rules
            .iter()
            .find(|rule| rule.raw == key || rule.pattern.matches_with(key, MATCH_OPTIONS))
            .map(|rule| (rule.raw.as_str(), &rule.value))
    }

    /// Value of the first rule matching `key`.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&T> {
        self.lookup(key).map(|(_, value)| value)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }
}
