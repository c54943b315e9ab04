//! serde `Deserializer` reading from a borrowed [`AttributeValue`] tree.

use std::{borrow::Cow, collections::hash_map, slice};

use serde::{
    de::{self, value::BorrowedStrDeserializer, DeserializeSeed, Visitor},
    forward_to_deserialize_any,
};

use crate::{
    attribute::{AttributeValue, Item},
    case::CaseSettings,
    error::CodecError,
};

/// A borrowed view of one wire value. Set members have no `AttributeValue` of their own, so
/// they are surfaced as bare scalars.
#[derive(Clone, Copy)]
enum Node<'a> {
    Str(&'a str),
    Num(&'a str),
    Bool(bool),
    Null,
    Bytes(&'a [u8]),
    List(&'a [AttributeValue]),
    Map(&'a Item),
    StrSet(&'a [String]),
    NumSet(&'a [String]),
    BytesSet(&'a [Vec<u8>]),
}

impl<'a> From<&'a AttributeValue> for Node<'a> {
    fn from(value: &'a AttributeValue) -> Self {
        match value {
            AttributeValue::S(s) => Node::Str(s),
            AttributeValue::N(n) => Node::Num(n),
            AttributeValue::Bool(b) => Node::Bool(*b),
            AttributeValue::Null(_) => Node::Null,
            AttributeValue::B(b) => Node::Bytes(b),
            AttributeValue::L(l) => Node::List(l),
            AttributeValue::M(m) => Node::Map(m),
            AttributeValue::Ss(s) => Node::StrSet(s),
            AttributeValue::Ns(n) => Node::NumSet(n),
            AttributeValue::Bs(b) => Node::BytesSet(b),
        }
    }
}

impl Node<'_> {
    fn tag(self) -> &'static str {
        match self {
            Node::Str(_) => "S",
            Node::Num(_) => "N",
            Node::Bool(_) => "BOOL",
            Node::Null => "NULL",
            Node::Bytes(_) => "B",
            Node::List(_) => "L",
            Node::Map(_) => "M",
            Node::StrSet(_) => "SS",
            Node::NumSet(_) => "NS",
            Node::BytesSet(_) => "BS",
        }
    }
}

pub(crate) struct Deserializer<'de, 'c> {
    node: Node<'de>,
    case: &'c CaseSettings,
}

impl<'de, 'c> Deserializer<'de, 'c> {
    pub(crate) fn from_value(value: &'de AttributeValue, case: &'c CaseSettings) -> Self {
        Self {
            node: Node::from(value),
            case,
        }
    }

    pub(crate) fn from_item(item: &'de Item, case: &'c CaseSettings) -> Self {
        Self {
            node: Node::Map(item),
            case,
        }
    }

    fn mismatch(&self, expected: &str) -> CodecError {
        CodecError::mismatch(expected, self.node.tag())
    }

    fn number_text(&self, expected: &str) -> Result<&'de str, CodecError> {
        match self.node {
            Node::Num(text) => Ok(text.trim()),
            _ => Err(self.mismatch(expected)),
        }
    }

    fn seq(&self) -> Option<Elements<'de>> {
        match self.node {
            Node::List(items) => Some(Elements::Values(items.iter())),
            Node::StrSet(items) => Some(Elements::Strings(items.iter())),
            Node::NumSet(items) => Some(Elements::Numbers(items.iter())),
            Node::BytesSet(items) => Some(Elements::Bytes(items.iter())),
            _ => None,
        }
    }

    fn map_access(&self, entries: &'de Item, fields: bool) -> MapAccess<'de, 'c> {
        MapAccess {
            entries: entries.iter(),
            value: None,
            case: self.case,
            fields,
        }
    }
}

fn invalid_number(text: &str, expected: &str) -> CodecError {
    CodecError::InvalidNumber {
        value: text.to_string(),
        expected: expected.to_string(),
    }
}

macro_rules! deserialize_number {
    ($($method:ident => $visit:ident($ty:ty),)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
                let text = self.number_text(stringify!($ty))?;
                let n = text
                    .parse::<$ty>()
                    .map_err(|_| invalid_number(text, stringify!($ty)))?;
                visitor.$visit(n)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for Deserializer<'de, '_> {
    type Error = CodecError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.node {
            Node::Str(s) => visitor.visit_borrowed_str(s),
            Node::Num(text) => {
                let text = text.trim();
                if let Ok(n) = text.parse::<i64>() {
                    visitor.visit_i64(n)
                } else if let Ok(n) = text.parse::<u64>() {
                    visitor.visit_u64(n)
                } else if let Ok(n) = text.parse::<f64>() {
                    visitor.visit_f64(n)
                } else {
                    Err(invalid_number(text, "a number"))
                }
            }
            Node::Bool(b) => visitor.visit_bool(b),
            Node::Null => visitor.visit_unit(),
            Node::Bytes(b) => visitor.visit_borrowed_bytes(b),
            Node::Map(entries) => visitor.visit_map(self.map_access(entries, false)),
            Node::List(_) | Node::StrSet(_) | Node::NumSet(_) | Node::BytesSet(_) => {
                self.deserialize_seq(visitor)
            }
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.node {
            Node::Bool(b) => visitor.visit_bool(b),
            _ => Err(self.mismatch("BOOL")),
        }
    }

    deserialize_number! {
        deserialize_i8 => visit_i8(i8),
        deserialize_i16 => visit_i16(i16),
        deserialize_i32 => visit_i32(i32),
        deserialize_i64 => visit_i64(i64),
        deserialize_i128 => visit_i128(i128),
        deserialize_u8 => visit_u8(u8),
        deserialize_u16 => visit_u16(u16),
        deserialize_u32 => visit_u32(u32),
        deserialize_u64 => visit_u64(u64),
        deserialize_u128 => visit_u128(u128),
        deserialize_f32 => visit_f32(f32),
        deserialize_f64 => visit_f64(f64),
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        if let Node::Str(s) = self.node {
            let mut chars = s.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return visitor.visit_char(c);
            }
        }
        Err(self.mismatch("S holding a single character"))
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.node {
            Node::Str(s) => visitor.visit_borrowed_str(s),
            _ => Err(self.mismatch("S")),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.node {
            Node::Bytes(b) => visitor.visit_borrowed_bytes(b),
            _ => Err(self.mismatch("B")),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.node {
            Node::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.node {
            Node::Null => visitor.visit_unit(),
            _ => Err(self.mismatch("NULL")),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.seq() {
            Some(elements) => visitor.visit_seq(SeqAccess {
                elements,
                case: self.case,
            }),
            None => Err(self.mismatch("L or a set")),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.node {
            Node::Map(entries) => visitor.visit_map(self.map_access(entries, false)),
            _ => Err(self.mismatch("M")),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        match self.node {
            Node::Map(entries) => visitor.visit_map(self.map_access(entries, true)),
            _ => Err(self.mismatch("M")),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        match self.node {
            Node::Str(variant) => visitor.visit_enum(EnumAccess {
                variant,
                value: None,
                case: self.case,
            }),
            Node::Map(entries) if entries.len() == 1 => {
                let Some((variant, value)) = entries.iter().next() else {
                    return Err(self.mismatch("a single-entry M"));
                };
                visitor.visit_enum(EnumAccess {
                    variant,
                    value: Some(Node::from(value)),
                    case: self.case,
                })
            }
            _ => Err(self.mismatch("S or a single-entry M")),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        visitor.visit_unit()
    }
}

enum Elements<'a> {
    Values(slice::Iter<'a, AttributeValue>),
    Strings(slice::Iter<'a, String>),
    Numbers(slice::Iter<'a, String>),
    Bytes(slice::Iter<'a, Vec<u8>>),
}

impl<'a> Elements<'a> {
    fn next_node(&mut self) -> Option<Node<'a>> {
        match self {
            Elements::Values(iter) => iter.next().map(Node::from),
            Elements::Strings(iter) => iter.next().map(|s| Node::Str(s)),
            Elements::Numbers(iter) => iter.next().map(|n| Node::Num(n)),
            Elements::Bytes(iter) => iter.next().map(|b| Node::Bytes(b)),
        }
    }

    fn remaining(&self) -> usize {
        match self {
            Elements::Values(iter) => iter.len(),
            Elements::Strings(iter) | Elements::Numbers(iter) => iter.len(),
            Elements::Bytes(iter) => iter.len(),
        }
    }
}

struct SeqAccess<'de, 'c> {
    elements: Elements<'de>,
    case: &'c CaseSettings,
}

impl<'de> de::SeqAccess<'de> for SeqAccess<'de, '_> {
    type Error = CodecError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, CodecError> {
        match self.elements.next_node() {
            Some(node) => seed
                .deserialize(Deserializer {
                    node,
                    case: self.case,
                })
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.elements.remaining())
    }
}

/// Walks map entries. With `fields` set every key is a field name; otherwise the key's
/// consumer decides (see [`KeyDeserializer`]).
struct MapAccess<'de, 'c> {
    entries: hash_map::Iter<'de, String, AttributeValue>,
    value: Option<&'de AttributeValue>,
    case: &'c CaseSettings,
    fields: bool,
}

impl<'de> de::MapAccess<'de> for MapAccess<'de, '_> {
    type Error = CodecError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, CodecError> {
        let Some((key, value)) = self.entries.next() else {
            return Ok(None);
        };
        self.value = Some(value);

        seed.deserialize(KeyDeserializer {
            key,
            case: self.case,
            field: self.fields,
        })
        .map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, CodecError> {
        let value = self
            .value
            .take()
            .ok_or_else(|| CodecError::Custom("map value requested before its key".into()))?;
        seed.deserialize(Deserializer::from_value(value, self.case))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

/// A wire key. Field-name requests (`deserialize_identifier`, and `deserialize_any` from
/// serde's buffered tagged/untagged/flattened content) read it in native spelling; string
/// requests from user maps read it as written.
struct KeyDeserializer<'de, 'c> {
    key: &'de str,
    case: &'c CaseSettings,
    field: bool,
}

impl<'de> KeyDeserializer<'de, '_> {
    fn visit_field_name<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.case.decode_key(self.key) {
            Cow::Borrowed(name) => visitor.visit_borrowed_str(name),
            Cow::Owned(name) => visitor.visit_string(name),
        }
    }
}

impl<'de> de::Deserializer<'de> for KeyDeserializer<'de, '_> {
    type Error = CodecError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.visit_field_name(visitor)
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.visit_field_name(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        if self.field {
            self.visit_field_name(visitor)
        } else {
            visitor.visit_borrowed_str(self.key)
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        visitor.visit_borrowed_str(self.key)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        de::Deserializer::deserialize_enum(
            BorrowedStrDeserializer::<CodecError>::new(self.key),
            name,
            variants,
            visitor,
        )
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct ignored_any
    }
}

struct EnumAccess<'de, 'c> {
    variant: &'de str,
    value: Option<Node<'de>>,
    case: &'c CaseSettings,
}

impl<'de, 'c> de::EnumAccess<'de> for EnumAccess<'de, 'c> {
    type Error = CodecError;
    type Variant = VariantAccess<'de, 'c>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, VariantAccess<'de, 'c>), CodecError> {
        let variant = seed.deserialize(BorrowedStrDeserializer::<CodecError>::new(self.variant))?;
        Ok((
            variant,
            VariantAccess {
                value: self.value,
                case: self.case,
            },
        ))
    }
}

struct VariantAccess<'de, 'c> {
    value: Option<Node<'de>>,
    case: &'c CaseSettings,
}

impl<'de> VariantAccess<'de, '_> {
    fn payload(&self, expected: &str) -> Result<Node<'de>, CodecError> {
        self.value
            .ok_or_else(|| CodecError::mismatch(expected, "S"))
    }
}

impl<'de> de::VariantAccess<'de> for VariantAccess<'de, '_> {
    type Error = CodecError;

    fn unit_variant(self) -> Result<(), CodecError> {
        match self.value {
            None | Some(Node::Null) => Ok(()),
            Some(other) => Err(CodecError::mismatch("a unit variant", other.tag())),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, CodecError> {
        let node = self.payload("a newtype variant payload")?;
        seed.deserialize(Deserializer {
            node,
            case: self.case,
        })
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, CodecError> {
        let node = self.payload("a tuple variant payload")?;
        de::Deserializer::deserialize_seq(
            Deserializer {
                node,
                case: self.case,
            },
            visitor,
        )
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        let node = self.payload("a struct variant payload")?;
        de::Deserializer::deserialize_struct(
            Deserializer {
                node,
                case: self.case,
            },
            "",
            fields,
            visitor,
        )
    }
}
