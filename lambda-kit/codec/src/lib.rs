//! Typed codec for the tagged attribute-value wire format.
//!
//! Native values go through serde: any `Serialize` type encodes to an [`AttributeValue`], any
//! `Deserialize` type decodes from one. Struct field names are re-cased on the way out and on the
//! way back in according to a [`CaseSettings`] pair.
//!
//! ```
//! use lek_codec::{to_item, from_item, CaseSettings, CaseStyle};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct Person {
//!     first_name: String,
//!     age: u32,
//! }
//!
//! let case = CaseSettings::new(CaseStyle::Camel, CaseStyle::Snake);
//! let person = Person { first_name: "Jane".into(), age: 45 };
//! let item = to_item(&person, &case).unwrap();
//! assert_eq!(item["first_name"].as_s(), Some("Jane"));
//! assert_eq!(item["age"].as_n(), Some("45"));
//! assert_eq!(from_item::<Person>(&item, &case).unwrap(), person);
//! ```
//!
//! Modules:
//! - [`attribute`]: the wire value and its JSON form
//! - [`case`]: identifier tokenization and re-casing
//! - [`set`]: wrappers selecting `SS`/`NS`

pub mod attribute;
pub mod case;
mod de;
pub mod error;
mod ser;
pub mod set;

use serde::{Deserialize, Serialize};

pub use attribute::{AttributeValue, Item};
pub use case::{CaseSettings, CaseStyle};
pub use error::CodecError;
pub use set::{NumberSet, StringSet};

/// Encodes a single value without renaming fields.
pub fn to_attribute_value<T: ?Sized + Serialize>(value: &T) -> Result<AttributeValue, CodecError> {
    to_attribute_value_with(value, &CaseSettings::IDENTITY)
}

pub fn to_attribute_value_with<T: ?Sized + Serialize>(
    value: &T,
    case: &CaseSettings,
) -> Result<AttributeValue, CodecError> {
    value
        .serialize(ser::Serializer::new(case))
        .map(ser::standalone)
}

/// Decodes a single value without renaming fields.
pub fn from_attribute_value<'a, T: Deserialize<'a>>(
    value: &'a AttributeValue,
) -> Result<T, CodecError> {
    from_attribute_value_with(value, &CaseSettings::IDENTITY)
}

pub fn from_attribute_value_with<'a, T: Deserialize<'a>>(
    value: &'a AttributeValue,
    case: &CaseSettings,
) -> Result<T, CodecError> {
    T::deserialize(de::Deserializer::from_value(value, case))
}

/// Encodes a record-shaped value into a whole item.
pub fn to_item<T: ?Sized + Serialize>(value: &T, case: &CaseSettings) -> Result<Item, CodecError> {
    match to_attribute_value_with(value, case)? {
        AttributeValue::M(item) => Ok(item),
        other => Err(CodecError::NotAMap {
            found: other.tag().to_string(),
        }),
    }
}

/// Decodes a whole item into a record-shaped value.
pub fn from_item<'a, T: Deserialize<'a>>(item: &'a Item, case: &CaseSettings) -> Result<T, CodecError> {
    T::deserialize(de::Deserializer::from_item(item, case))
}
