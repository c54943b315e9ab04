//! The tagged wire value.
//!
//! Serializing an [`AttributeValue`] with `serde_json` yields the store's native item
//! representation: an object with exactly one of `S`, `N`, `BOOL`, `NULL`, `B`, `L`, `M`, `SS`,
//! `NS`, `BS`. Binary payloads travel as standard base64 text.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A whole stored item: attribute name to tagged value.
pub type Item = HashMap<String, AttributeValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    #[serde(rename = "S")]
    S(String),
    /// Decimal text; never held as a float so no precision is lost in transit.
    #[serde(rename = "N")]
    N(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    #[serde(rename = "B", with = "base64_bytes")]
    B(Vec<u8>),
    #[serde(rename = "L")]
    L(Vec<AttributeValue>),
    #[serde(rename = "M")]
    M(Item),
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    #[serde(rename = "NS")]
    Ns(Vec<String>),
    #[serde(rename = "BS", with = "base64_list")]
    Bs(Vec<Vec<u8>>),
}

impl AttributeValue {
    /// The `{"NULL": true}` value.
    pub fn null() -> Self {
        Self::Null(true)
    }

    /// Builds an `N` value from anything with an exact decimal `Display`.
    pub fn number(value: impl std::fmt::Display) -> Self {
        Self::N(value.to_string())
    }

    /// Wire tag of this value (`"S"`, `"N"`, ...).
    pub fn tag(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::B(_) => "B",
            Self::L(_) => "L",
            Self::M(_) => "M",
            Self::Ss(_) => "SS",
            Self::Ns(_) => "NS",
            Self::Bs(_) => "BS",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    /// True for `SS`/`NS`/`BS` values with no members; such values are never written as fields.
    pub fn is_empty_set(&self) -> bool {
        match self {
            Self::Ss(v) | Self::Ns(v) => v.is_empty(),
            Self::Bs(v) => v.is_empty(),
            _ => false,
        }
    }

    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            Self::N(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_m(&self) -> Option<&Item> {
        match self {
            Self::M(m) => Some(m),
            _ => None,
        }
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text.trim()).map_err(de::Error::custom)
    }
}

mod base64_list {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&STANDARD.encode(item))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|text| STANDARD.decode(text.trim()).map_err(de::Error::custom))
            .collect()
    }
}
