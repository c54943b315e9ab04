//! serde `Serializer` producing an [`AttributeValue`].

use serde::ser::{self, Serialize, Serializer as _};

use crate::{
    attribute::{AttributeValue, Item},
    case::CaseSettings,
    error::CodecError,
    set::{NUMBER_SET_TOKEN, STRING_SET_TOKEN},
};

pub(crate) struct Serializer<'c> {
    case: &'c CaseSettings,
}

impl<'c> Serializer<'c> {
    pub(crate) fn new(case: &'c CaseSettings) -> Self {
        Self { case }
    }
}

/// Shortest decimal text that parses back to the same float. `Display` for floats never uses
/// exponent notation, so the result is always a plain decimal.
fn float_text<F: std::fmt::Display>(value: F, finite: bool) -> Result<AttributeValue, CodecError> {
    if !finite {
        return Err(CodecError::NonFiniteNumber);
    }
    Ok(AttributeValue::N(value.to_string()))
}

/// An empty set outside a record field has nothing to be omitted from, so it is written as
/// `NULL`, which reads back as an empty set.
pub(crate) fn standalone(value: AttributeValue) -> AttributeValue {
    if value.is_empty_set() {
        AttributeValue::null()
    } else {
        value
    }
}

fn single_entry(key: &str, value: AttributeValue) -> AttributeValue {
    AttributeValue::M(Item::from([(key.to_string(), value)]))
}

fn into_set(value: AttributeValue, token: &'static str) -> Result<AttributeValue, CodecError> {
    let AttributeValue::L(items) = value else {
        return Err(CodecError::mismatch("a sequence", value.tag()));
    };

    if token == STRING_SET_TOKEN {
        let members = items
            .into_iter()
            .map(|item| match item {
                AttributeValue::S(s) => Ok(s),
                other => Err(CodecError::mismatch("S set member", other.tag())),
            })
            .collect::<Result<_, _>>()?;
        Ok(AttributeValue::Ss(members))
    } else {
        let members = items
            .into_iter()
            .map(|item| match item {
                AttributeValue::N(n) => Ok(n),
                other => Err(CodecError::mismatch("N set member", other.tag())),
            })
            .collect::<Result<_, _>>()?;
        Ok(AttributeValue::Ns(members))
    }
}

impl<'c> ser::Serializer for Serializer<'c> {
    type Ok = AttributeValue;
    type Error = CodecError;

    type SerializeSeq = SerializeList<'c>;
    type SerializeTuple = SerializeList<'c>;
    type SerializeTupleStruct = SerializeList<'c>;
    type SerializeTupleVariant = SerializeTupleVariant<'c>;
    type SerializeMap = SerializeMap<'c>;
    type SerializeStruct = SerializeStruct<'c>;
    type SerializeStructVariant = SerializeStructVariant<'c>;

    fn serialize_bool(self, v: bool) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::number(v))
    }

    fn serialize_i16(self, v: i16) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::number(v))
    }

    fn serialize_i32(self, v: i32) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::number(v))
    }

    fn serialize_i64(self, v: i64) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::number(v))
    }

    fn serialize_i128(self, v: i128) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::number(v))
    }

    fn serialize_u8(self, v: u8) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::number(v))
    }

    fn serialize_u16(self, v: u16) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::number(v))
    }

    fn serialize_u32(self, v: u32) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::number(v))
    }

    fn serialize_u64(self, v: u64) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::number(v))
    }

    fn serialize_u128(self, v: u128) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::number(v))
    }

    fn serialize_f32(self, v: f32) -> Result<AttributeValue, CodecError> {
        float_text(v, v.is_finite())
    }

    fn serialize_f64(self, v: f64) -> Result<AttributeValue, CodecError> {
        float_text(v, v.is_finite())
    }

    fn serialize_char(self, v: char) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::S(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::S(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::B(v.to_vec()))
    }

    fn serialize_none(self) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::null())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<AttributeValue, CodecError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::null())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::null())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::S(variant.to_string()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<AttributeValue, CodecError> {
        match name {
            STRING_SET_TOKEN | NUMBER_SET_TOKEN => into_set(value.serialize(self)?, name),
            _ => value.serialize(self),
        }
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<AttributeValue, CodecError> {
        Ok(single_entry(variant, standalone(value.serialize(self)?)))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeList<'c>, CodecError> {
        Ok(SerializeList {
            case: self.case,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeList<'c>, CodecError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SerializeList<'c>, CodecError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeTupleVariant<'c>, CodecError> {
        Ok(SerializeTupleVariant {
            variant,
            list: self.serialize_seq(Some(len))?,
        })
    }

    /// Collections always report their length. serde derive asks for a map of unknown length
    /// only for a struct with flattened fields, whose keys are field names.
    fn serialize_map(self, len: Option<usize>) -> Result<SerializeMap<'c>, CodecError> {
        Ok(SerializeMap {
            case: self.case,
            entries: Item::with_capacity(len.unwrap_or(0)),
            next_key: None,
            record: len.is_none(),
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SerializeStruct<'c>, CodecError> {
        Ok(SerializeStruct {
            case: self.case,
            fields: Item::with_capacity(len),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeStructVariant<'c>, CodecError> {
        Ok(SerializeStructVariant {
            variant,
            fields: self.serialize_struct(variant, len)?,
        })
    }
}

pub(crate) struct SerializeList<'c> {
    case: &'c CaseSettings,
    items: Vec<AttributeValue>,
}

impl<'c> SerializeList<'c> {
    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        self.items
            .push(standalone(value.serialize(Serializer::new(self.case))?));
        Ok(())
    }
}

impl ser::SerializeSeq for SerializeList<'_> {
    type Ok = AttributeValue;
    type Error = CodecError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        self.push(value)
    }

    fn end(self) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::L(self.items))
    }
}

impl ser::SerializeTuple for SerializeList<'_> {
    type Ok = AttributeValue;
    type Error = CodecError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        self.push(value)
    }

    fn end(self) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::L(self.items))
    }
}

impl ser::SerializeTupleStruct for SerializeList<'_> {
    type Ok = AttributeValue;
    type Error = CodecError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        self.push(value)
    }

    fn end(self) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::L(self.items))
    }
}

pub(crate) struct SerializeTupleVariant<'c> {
    variant: &'static str,
    list: SerializeList<'c>,
}

impl ser::SerializeTupleVariant for SerializeTupleVariant<'_> {
    type Ok = AttributeValue;
    type Error = CodecError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        self.list.push(value)
    }

    fn end(self) -> Result<AttributeValue, CodecError> {
        Ok(single_entry(self.variant, AttributeValue::L(self.list.items)))
    }
}

/// User maps keep their key spelling and write empty sets as `NULL`. A flattened record
/// (`record`) follows the struct field rules instead.
pub(crate) struct SerializeMap<'c> {
    case: &'c CaseSettings,
    entries: Item,
    next_key: Option<String>,
    record: bool,
}

impl ser::SerializeMap for SerializeMap<'_> {
    type Ok = AttributeValue;
    type Error = CodecError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), CodecError> {
        match key.serialize(Serializer::new(self.case))? {
            AttributeValue::S(key) if self.record => {
                self.next_key = Some(self.case.encode_key(&key).into_owned());
                Ok(())
            }
            AttributeValue::S(key) => {
                self.next_key = Some(key);
                Ok(())
            }
            _ => Err(CodecError::KeyMustBeString),
        }
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| CodecError::Custom("map value serialized before its key".into()))?;
        let value = value.serialize(Serializer::new(self.case))?;
        if !self.record {
            self.entries.insert(key, standalone(value));
        } else if !value.is_empty_set() {
            self.entries.insert(key, value);
        }
        Ok(())
    }

    fn end(self) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::M(self.entries))
    }
}

/// Record fields: names are re-cased with the active settings and empty sets are left out.
pub(crate) struct SerializeStruct<'c> {
    case: &'c CaseSettings,
    fields: Item,
}

impl ser::SerializeStruct for SerializeStruct<'_> {
    type Ok = AttributeValue;
    type Error = CodecError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        let value = value.serialize(Serializer::new(self.case))?;
        if !value.is_empty_set() {
            self.fields
                .insert(self.case.encode_key(key).into_owned(), value);
        }
        Ok(())
    }

    fn end(self) -> Result<AttributeValue, CodecError> {
        Ok(AttributeValue::M(self.fields))
    }
}

pub(crate) struct SerializeStructVariant<'c> {
    variant: &'static str,
    fields: SerializeStruct<'c>,
}

impl ser::SerializeStructVariant for SerializeStructVariant<'_> {
    type Ok = AttributeValue;
    type Error = CodecError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        ser::SerializeStruct::serialize_field(&mut self.fields, key, value)
    }

    fn end(self) -> Result<AttributeValue, CodecError> {
        Ok(single_entry(
            self.variant,
            AttributeValue::M(self.fields.fields),
        ))
    }
}
