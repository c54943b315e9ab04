//! Set wrappers that select the `SS` and `NS` tags.
//!
//! serde has no notion of a set distinct from a sequence, so plain `HashSet`/`BTreeSet` fields
//! encode as `L`. Wrapping them in [`StringSet`] or [`NumberSet`] marks them for set encoding.
//! Any other serde format sees a plain sequence.
//!
//! An empty `SS`/`NS` is never written. As a record field the set is left out, and reading
//! the struct back treats the missing field as empty. Anywhere else (list element, map value,
//! top level) it is written as `NULL`, which also reads back as empty.
//!
//! `Option<StringSet>` has no spelling for `Some` of an empty set: it is left out like any
//! empty set field and reads back as `None`.

use std::{
    collections::BTreeSet,
    fmt,
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

use serde::{
    de::{self, Deserializer, Visitor},
    Deserialize, Serialize, Serializer,
};

pub(crate) const STRING_SET_TOKEN: &str = "$lek_codec::StringSet";
pub(crate) const NUMBER_SET_TOKEN: &str = "$lek_codec::NumberSet";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StringSet(pub BTreeSet<String>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumberSet<T: Ord>(pub BTreeSet<T>);

impl Serialize for StringSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(STRING_SET_TOKEN, &self.0)
    }
}

impl<T: Ord + Serialize> Serialize for NumberSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(NUMBER_SET_TOKEN, &self.0)
    }
}

/// Reads a set through `deserialize_option` so that an absent field (which serde derive routes
/// to `visit_none`) yields an empty set instead of a missing-field error.
struct SetVisitor<T>(PhantomData<T>);

impl<'de, T> Visitor<'de> for SetVisitor<T>
where
    T: Ord + Deserialize<'de>,
{
    type Value = BTreeSet<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a set")
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(BTreeSet::new())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(BTreeSet::new())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        BTreeSet::deserialize(deserializer)
    }
}

impl<'de> Deserialize<'de> for StringSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_option(SetVisitor(PhantomData))
            .map(StringSet)
    }
}

impl<'de, T: Ord + Deserialize<'de>> Deserialize<'de> for NumberSet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_option(SetVisitor(PhantomData))
            .map(NumberSet)
    }
}

impl Deref for StringSet {
    type Target = BTreeSet<String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for StringSet {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T: Ord> Deref for NumberSet<T> {
    type Target = BTreeSet<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Ord> DerefMut for NumberSet<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<S: Into<String>> FromIterator<S> for StringSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<T: Ord> FromIterator<T> for NumberSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: Ord> Default for NumberSet<T> {
    fn default() -> Self {
        Self(BTreeSet::new())
    }
}
