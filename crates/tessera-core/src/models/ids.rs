use std::fmt;
use std::str::FromStr;

use bson::oid::ObjectId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Store-native user identifier: a 12-byte ObjectId rendered as 24 lowercase hex chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(ObjectId);

impl UserId {
    /// Generates a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(ObjectId::new())
    }

    #[must_use]
    pub const fn from_object_id(oid: ObjectId) -> Self {
        Self(oid)
    }

    #[must_use]
    pub const fn as_object_id(&self) -> ObjectId {
        self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl From<ObjectId> for UserId {
    fn from(value: ObjectId) -> Self {
        Self(value)
    }
}

impl From<UserId> for ObjectId {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

impl FromStr for UserId {
    type Err = IdParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(value)
            .map(Self)
            .map_err(|_| IdParseError::new(value))
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdParseError {
    value: String,
}

impl IdParseError {
    fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid user id: {:?}", self.value)
    }
}

impl std::error::Error for IdParseError {}
