//! Queue messages (`aws:sqs`).

use std::{collections::HashMap, marker::PhantomData, sync::Arc};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

use crate::{
    error::ParseError,
    parser::EventParser,
    record::{
        EventOrigin, GroupedRecords, MessageAttributeValue, MessageAttributes, Record,
        SentTimestamp, TextBody,
    },
    serde_ext::{de_epoch_millis, de_u64_or_string},
};

/// Delivery metadata of a queue message.
pub trait SqsRecordMeta: EventOrigin + SentTimestamp + Send + Sync {
    fn message_id(&self) -> &str;
    /// Handle needed to delete or change the visibility of the message.
    fn receipt_handle(&self) -> &str;
    fn sender_id(&self) -> &str;
    fn approximate_first_receive_at(&self) -> DateTime<Utc>;
    fn approximate_receive_count(&self) -> u64;
    fn md5_of_body(&self) -> Option<&str>;
    /// Set for FIFO queues only.
    fn message_group_id(&self) -> Option<&str>;
    fn message_deduplication_id(&self) -> Option<&str>;
    fn sequence_number(&self) -> Option<&str>;
}

pub trait SqsBodyAttributes: TextBody + MessageAttributes + Send + Sync {
    fn body(&self) -> &str {
        self.text()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsRecord {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    #[serde(default)]
    pub md5_of_body: Option<String>,
    pub event_source: String,
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,
    pub aws_region: String,
    pub attributes: SqsSystemAttributes,
    #[serde(default, deserialize_with = "de_message_attributes")]
    pub message_attributes: HashMap<String, MessageAttributeValue>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SqsSystemAttributes {
    pub sender_id: String,
    #[serde(deserialize_with = "de_epoch_millis")]
    pub sent_timestamp: DateTime<Utc>,
    #[serde(deserialize_with = "de_epoch_millis")]
    pub approximate_first_receive_timestamp: DateTime<Utc>,
    #[serde(deserialize_with = "de_u64_or_string")]
    pub approximate_receive_count: u64,
    #[serde(default)]
    pub message_group_id: Option<String>,
    #[serde(default)]
    pub message_deduplication_id: Option<String>,
    #[serde(default)]
    pub sequence_number: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessageAttribute {
    data_type: Option<String>,
    string_value: Option<String>,
    binary_value: Option<String>,
    #[serde(default)]
    string_list_values: Vec<String>,
    #[serde(default)]
    binary_list_values: Vec<String>,
}

/// Entries without a `dataType` are dropped, as are binary values that are not valid base64.
fn de_message_attributes<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, MessageAttributeValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<HashMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();

    Ok(raw
        .into_iter()
        .filter_map(|(name, value)| {
            let attr = RawMessageAttribute::deserialize(value).ok()?;
            let data_type = attr.data_type?;
            Some((
                name,
                MessageAttributeValue {
                    data_type,
                    string_value: attr.string_value,
                    binary_value: attr.binary_value.and_then(|b| STANDARD.decode(b).ok()),
                    string_list_values: attr.string_list_values,
                    binary_list_values: attr
                        .binary_list_values
                        .iter()
                        .filter_map(|b| STANDARD.decode(b).ok())
                        .collect(),
                },
            ))
        })
        .collect())
}

impl EventOrigin for SqsRecord {
    fn event_source(&self) -> &str {
        &self.event_source
    }

    fn aws_region(&self) -> Option<&str> {
        Some(&self.aws_region)
    }

    fn origin_arn(&self) -> Option<&str> {
        Some(&self.event_source_arn)
    }
}

impl SentTimestamp for SqsRecord {
    fn sent_at(&self) -> DateTime<Utc> {
        self.attributes.sent_timestamp
    }
}

impl SqsRecordMeta for SqsRecord {
    fn message_id(&self) -> &str {
        &self.message_id
    }

    fn receipt_handle(&self) -> &str {
        &self.receipt_handle
    }

    fn sender_id(&self) -> &str {
        &self.attributes.sender_id
    }

    fn approximate_first_receive_at(&self) -> DateTime<Utc> {
        self.attributes.approximate_first_receive_timestamp
    }

    fn approximate_receive_count(&self) -> u64 {
        self.attributes.approximate_receive_count
    }

    fn md5_of_body(&self) -> Option<&str> {
        self.md5_of_body.as_deref()
    }

    fn message_group_id(&self) -> Option<&str> {
        self.attributes.message_group_id.as_deref()
    }

    fn message_deduplication_id(&self) -> Option<&str> {
        self.attributes.message_deduplication_id.as_deref()
    }

    fn sequence_number(&self) -> Option<&str> {
        self.attributes.sequence_number.as_deref()
    }
}

impl TextBody for SqsRecord {
    fn text(&self) -> &str {
        &self.body
    }
}

impl MessageAttributes for SqsRecord {
    fn message_attributes(&self) -> &HashMap<String, MessageAttributeValue> {
        &self.message_attributes
    }
}

impl SqsBodyAttributes for SqsRecord {}

pub type SqsPayload<C> = GroupedRecords<C, dyn SqsRecordMeta, dyn SqsBodyAttributes>;

/// Queue records whose JSON body has been decoded into `T`.
pub type TypedSqsPayload<C, T> = GroupedRecords<C, dyn SqsRecordMeta, T>;

fn parse_sqs_record(raw: &Value) -> Result<SqsRecord, ParseError> {
    SqsRecord::deserialize(raw).map_err(ParseError::Malformed)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SqsParser;

impl EventParser for SqsParser {
    type Meta = dyn SqsRecordMeta;
    type Body = dyn SqsBodyAttributes;

    fn parse_record(&self, raw: &Value) -> Result<Record<Self::Meta, Self::Body>, ParseError> {
        let record = Arc::new(parse_sqs_record(raw)?);
        let meta: Arc<dyn SqsRecordMeta> = record.clone();
        let body: Arc<dyn SqsBodyAttributes> = record;
        Ok(Record::new(meta, body))
    }
}

/// Decodes each message body as JSON into `T`; messages whose body does not decode are dropped.
pub struct TypedSqsParser<T> {
    _body: PhantomData<fn() -> T>,
}

impl<T> TypedSqsParser<T> {
    pub fn new() -> Self {
        Self { _body: PhantomData }
    }
}

impl<T> Default for TypedSqsParser<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventParser for TypedSqsParser<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    type Meta = dyn SqsRecordMeta;
    type Body = T;

    fn parse_record(&self, raw: &Value) -> Result<Record<Self::Meta, T>, ParseError> {
        let record = parse_sqs_record(raw)?;
        let body: T = serde_json::from_str(&record.body).map_err(ParseError::Body)?;
        let meta: Arc<dyn SqsRecordMeta> = Arc::new(record);
        Ok(Record::new(meta, Arc::new(body)))
    }
}
