//! Tokens: immutable bindings of symbolic variables to concrete values.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{BehaviorError, Result};
use crate::event::EventValue;

/// One partial match of a behavior: a mapping from symbolic variable names to
/// the concrete values they were unified with.
///
/// Tokens are value types. Mutating operations return a new token; equality
/// and hashing depend only on the binding set, never on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    bindings: HashMap<String, EventValue>,
}

impl Token {
    /// The empty token, the identity element of [`Token::merge`].
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&EventValue> {
        self.bindings.get(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &EventValue)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns a new token with the binding added, overwriting any previous
    /// value for the same variable.
    pub fn set(&self, name: impl Into<String>, value: impl Into<EventValue>) -> Token {
        let mut bindings = self.bindings.clone();
        bindings.insert(name.into(), value.into());
        Token { bindings }
    }

    /// True iff no variable bound by both tokens maps to differing values.
    /// Absent keys never conflict, so the relation is symmetric.
    pub fn is_compatible_with(&self, other: &Token) -> bool {
        self.bindings
            .iter()
            .all(|(name, value)| other.bindings.get(name).map_or(true, |v| v == value))
    }

    /// Attempts to union the bindings of both tokens, returning `None` on the
    /// first conflicting variable. This is the fast path used by the
    /// enablement enumeration to discard incompatible combinations.
    pub fn try_merge(&self, other: &Token) -> Option<Token> {
        let mut merged = self.bindings.clone();
        for (name, value) in &other.bindings {
            match merged.get(name) {
                Some(existing) if existing != value => return None,
                Some(_) => {}
                None => {
                    merged.insert(name.clone(), value.clone());
                }
            }
        }
        Some(Token { bindings: merged })
    }

    /// Unions the bindings of both tokens. Callers must have pre-validated
    /// compatibility; a conflicting variable is reported as an error.
    pub fn merge(&self, other: &Token) -> Result<Token> {
        let mut merged = self.bindings.clone();
        for (name, value) in &other.bindings {
            match merged.get(name) {
                Some(existing) if existing != value => {
                    return Err(BehaviorError::ConflictingVariable(name.clone()));
                }
                Some(_) => {}
                None => {
                    merged.insert(name.clone(), value.clone());
                }
            }
        }
        Ok(Token { bindings: merged })
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Order-independent: combine per-entry hashes with XOR so that two
        // tokens with the same binding set hash identically regardless of
        // map iteration order.
        let mut combined: u64 = 0;
        for entry in &self.bindings {
            let mut hasher = DefaultHasher::new();
            entry.hash(&mut hasher);
            combined ^= hasher.finish();
        }
        state.write_u64(combined);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.bindings.iter().collect();
        entries.sort_by_key(|(name, _)| name.as_str());

        f.write_str("{")?;
        for (i, (name, value)) in entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}
