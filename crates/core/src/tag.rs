use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::CoreError;

/// Characters the game uses when minting player tags.
pub const TAG_ALPHABET: &str = "0289PYLQGRJCUV";

const MIN_TAG_LEN: usize = 3;
const MAX_TAG_LEN: usize = 14;

/// A normalized player tag: `#` followed by characters from [`TAG_ALPHABET`].
///
/// Two snapshots with the same tag describe the same account, so this is the
/// primary key of the record store.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerTag(String);

impl PlayerTag {
    /// Normalize user or API input into a tag.
    ///
    /// Surrounding whitespace is dropped, letters are uppercased, a missing
    /// leading `#` is added and the letter `O` is read as zero.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let trimmed = input.trim();
        let body = trimmed.strip_prefix('#').unwrap_or(trimmed);

        let mut normalized = String::with_capacity(body.len() + 1);
        normalized.push('#');
        for c in body.chars() {
            let c = match c.to_ascii_uppercase() {
                'O' => '0',
                other => other,
            };
            if !TAG_ALPHABET.contains(c) {
                return Err(CoreError::InvalidTag {
                    tag: input.to_string(),
                    reason: "contains a character outside the tag alphabet",
                });
            }
            normalized.push(c);
        }

        let len = normalized.len() - 1;
        if len < MIN_TAG_LEN {
            return Err(CoreError::InvalidTag {
                tag: input.to_string(),
                reason: "too short",
            });
        }
        if len > MAX_TAG_LEN {
            return Err(CoreError::InvalidTag {
                tag: input.to_string(),
                reason: "too long",
            });
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The tag without its leading `#`, as used in request paths.
    pub fn without_hash(&self) -> &str {
        &self.0[1..]
    }
}

impl fmt::Debug for PlayerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerTag({})", self.0)
    }
}

impl fmt::Display for PlayerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for PlayerTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PlayerTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: String = Deserialize::deserialize(deserializer)?;
        PlayerTag::parse(&raw).map_err(serde::de::Error::custom)
    }
}
