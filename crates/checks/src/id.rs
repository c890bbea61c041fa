//! Check identifiers.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of every check id.
pub const ID_LEN: usize = 20;

// Ids are lowercase only: the inspection shell lowercases its input.
const HEAD_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const BODY_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Opaque, immutable check identifier.
///
/// Always [`ID_LEN`] characters, starting with a lowercase letter followed by
/// lowercase letters or digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CheckId(String);

impl CheckId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut id = String::with_capacity(ID_LEN);
        id.push(HEAD_CHARS[rng.gen_range(0..HEAD_CHARS.len())] as char);
        for _ in 1..ID_LEN {
            id.push(BODY_CHARS[rng.gen_range(0..BODY_CHARS.len())] as char);
        }
        Self(id)
    }

    /// Parse an id, rejecting anything outside the id format.
    pub fn parse(id: &str) -> Result<Self, InvalidId> {
        if is_valid_id(id) {
            Ok(Self(id.to_string()))
        } else {
            Err(InvalidId(id.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Check whether `id` has the id format.
pub fn is_valid_id(id: &str) -> bool {
    let bytes = id.as_bytes();
    bytes.len() == ID_LEN
        && HEAD_CHARS.contains(&bytes[0])
        && bytes[1..].iter().all(|b| BODY_CHARS.contains(b))
}

/// Error returned for a malformed id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("The id '{0}' is invalid")]
pub struct InvalidId(pub String);

impl TryFrom<String> for CheckId {
    type Error = InvalidId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_valid_id(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidId(value))
        }
    }
}

impl From<CheckId> for String {
    fn from(id: CheckId) -> Self {
        id.0
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CheckId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
