//! Whitelist normalization and event filtering.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::trace;

use crate::error::{Error, Result};
use crate::events::{EventKind, RawEvent};

/// Token that expands to the full valid kind set.
const ALL_TOKEN: &str = "all";

/// Source for the event whitelist: a single token or an ordered sequence of
/// tokens, as found in configuration files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EventFilterSource {
    /// A single token, treated as a one-element sequence.
    Single(String),
    /// An ordered sequence of tokens.
    List(Vec<String>),
}

impl EventFilterSource {
    /// Build a source from a dynamic JSON value. Anything that is neither a
    /// string nor an array fails with [`Error::InvalidArgument`]; non-string
    /// array entries are silently dropped, like any other unknown token.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value;
        match value {
            Value::String(token) => Ok(Self::Single(token.clone())),
            Value::Array(entries) => Ok(Self::List(
                entries
                    .iter()
                    .filter_map(|entry| entry.as_str().map(str::to_owned))
                    .collect(),
            )),
            other => Err(Error::InvalidArgument(format!(
                "expected string or array, got {}",
                json_type_name(other)
            ))),
        }
    }

    /// View the source as a sequence of tokens.
    pub fn tokens(&self) -> &[String] {
        match self {
            Self::Single(token) => std::slice::from_ref(token),
            Self::List(tokens) => tokens,
        }
    }
}

impl From<&str> for EventFilterSource {
    fn from(token: &str) -> Self {
        Self::Single(token.to_owned())
    }
}

impl From<Vec<&str>> for EventFilterSource {
    fn from(tokens: Vec<&str>) -> Self {
        Self::List(tokens.into_iter().map(str::to_owned).collect())
    }
}

impl From<Vec<EventKind>> for EventFilterSource {
    fn from(kinds: Vec<EventKind>) -> Self {
        Self::List(kinds.into_iter().map(|k| k.as_str().to_owned()).collect())
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A normalized set of event kinds allowed through the filter stage.
///
/// An empty whitelist filters out every event; that is a legal configuration,
/// not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    allowed: BTreeSet<EventKind>,
}

impl Whitelist {
    /// Normalize a whitelist source into a canonical kind set.
    ///
    /// The token `all` anywhere in the source expands to the full valid set;
    /// otherwise the result is the intersection of the valid set with the
    /// source tokens. Duplicates and unknown tokens are dropped silently.
    pub fn normalize(source: &EventFilterSource) -> Self {
        let tokens = source.tokens();
        if tokens.iter().any(|t| t == ALL_TOKEN) {
            return Self::full();
        }
        Self {
            allowed: tokens
                .iter()
                .filter_map(|t| EventKind::from_token(t))
                .collect(),
        }
    }

    /// The full valid kind set.
    pub fn full() -> Self {
        Self {
            allowed: EventKind::ALL.into_iter().collect(),
        }
    }

    /// Check membership of a single kind.
    pub fn contains(&self, kind: EventKind) -> bool {
        self.allowed.contains(&kind)
    }

    /// Number of allowed kinds.
    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    /// Check if nothing is allowed through.
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Decide whether an event passes the filter stage.
    ///
    /// An event without an event tag bypasses filtering. That matches the
    /// observed behavior of the source this stage adapts; such events are
    /// dropped later at the branch split.
    pub fn allows(&self, event: &RawEvent) -> bool {
        match event.kind {
            Some(kind) => {
                let allowed = self.allowed.contains(&kind);
                if !allowed {
                    trace!(kind = kind.as_str(), path = %event.path.display(), "event filtered by whitelist");
                }
                allowed
            }
            None => true,
        }
    }
}
