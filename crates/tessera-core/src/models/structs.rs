use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::UserId;

/// Keys that name the identifier and are never accepted from a client payload.
const RESERVED_KEYS: [&str; 2] = ["id", "_id"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(flatten)]
    pub fields: UserFields,
}

impl User {
    #[must_use]
    pub fn new(id: UserId, fields: UserFields) -> Self {
        Self { id, fields }
    }

    /// Builds a record from client fields under a freshly generated identifier.
    #[must_use]
    pub fn create(fields: UserFields) -> Self {
        Self::new(UserId::generate(), fields)
    }

    pub fn to_json_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Open set of user-defined attributes. Never contains an identifier key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UserFields(Map<String, Value>);

impl<'de> Deserialize<'de> for UserFields {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::from_map)
    }
}

impl UserFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a request body. The body must be a single JSON object; identifier
    /// keys supplied by the client are dropped. Integers must fit in an `i64`,
    /// the widest integer a stored document can hold.
    pub fn from_json_slice(body: &[u8]) -> Result<Self, PayloadError> {
        let map: Map<String, Value> = serde_json::from_slice(body).map_err(PayloadError::from)?;
        for (key, value) in &map {
            check_storable(key, value)?;
        }
        Ok(Self::from_map(map))
    }

    #[must_use]
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        for key in RESERVED_KEYS {
            map.remove(key);
        }
        Self(map)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if RESERVED_KEYS.contains(&key.as_str()) {
            return;
        }
        self.0.insert(key, value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

fn check_storable(path: &str, value: &Value) -> Result<(), PayloadError> {
    match value {
        Value::Number(number) if number.is_u64() && number.as_i64().is_none() => {
            Err(PayloadError::new(format!("{path}: integer {number} is out of range")))
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(index, item)| check_storable(&format!("{path}[{index}]"), item)),
        Value::Object(map) => map
            .iter()
            .try_for_each(|(key, item)| check_storable(&format!("{path}.{key}"), item)),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadError {
    message: String,
}

impl PayloadError {
    fn new(message: String) -> Self {
        Self { message }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for PayloadError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid user payload: {}", self.message)
    }
}

impl std::error::Error for PayloadError {}
