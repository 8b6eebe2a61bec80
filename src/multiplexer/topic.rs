use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;

use crate::utils::error::MultiplexError;

/// Opaque, caller-chosen name of a logical real-time stream,
/// e.g. `notifications:<user-id>` or `events:global`.
///
/// Topics compare by exact value; there is no hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Longest accepted topic, in bytes.
    pub const MAX_LEN: usize = 255;

    /// Validates `raw` and wraps it.
    ///
    /// Rejects empty or blank names, names longer than [`Topic::MAX_LEN`]
    /// and names containing control characters.
    pub fn parse(raw: &str) -> Result<Self, MultiplexError> {
        if raw.trim().is_empty() {
            return Err(MultiplexError::InvalidTopic {
                reason: "topic must not be empty",
            });
        }
        if raw.len() > Self::MAX_LEN {
            return Err(MultiplexError::InvalidTopic {
                reason: "topic is longer than 255 bytes",
            });
        }
        if raw.chars().any(char::is_control) {
            return Err(MultiplexError::InvalidTopic {
                reason: "topic must not contain control characters",
            });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Topic {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Topic {
    type Error = MultiplexError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}
