use serde_json::Value;

use crate::{
    error::{ParseError, PayloadShapeError},
    record::Record,
};

/// Turns one raw record of a source into a [`Record`].
///
/// The provided [`EventParser::parse`] walks the payload's `Records` array and applies
/// `parse_record` to every entry. A record that fails is logged and skipped; a payload without
/// the array yields no records.
pub trait EventParser: Send + Sync + 'static {
    type Meta: ?Sized + Send + Sync + 'static;
    type Body: ?Sized + Send + Sync + 'static;

    fn parse_record(&self, raw: &Value) -> Result<Record<Self::Meta, Self::Body>, ParseError>;

    fn parse(&self, source: &str, payload: &Value) -> Vec<Record<Self::Meta, Self::Body>> {
        let raw_records = match records_array(payload) {
            Ok(raw_records) => raw_records,
            Err(err) => {
                tracing::debug!(source = %source, error = %err, "no records in payload");
                return Vec::new();
            }
        };

        raw_records
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| match self.parse_record(raw) {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!(source = %source, index, error = %err, "dropping malformed record");
                    None
                }
            })
            .collect()
    }
}

pub fn records_array(payload: &Value) -> Result<&[Value], PayloadShapeError> {
    payload
        .get("Records")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or(PayloadShapeError::MissingRecords)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn records_array_requires_an_array() {
        assert_eq!(records_array(&json!({"Records": [1, 2]})).unwrap().len(), 2);
        assert_eq!(
            records_array(&json!({"Records": {}})),
            Err(PayloadShapeError::MissingRecords)
        );
        assert_eq!(
            records_array(&json!("nope")),
            Err(PayloadShapeError::MissingRecords)
        );
    }
}
