//! Pub/sub notifications (`aws:sns`).

use std::{collections::HashMap, sync::Arc};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{
    error::ParseError,
    parser::EventParser,
    record::{
        EventOrigin, GroupedRecords, MessageAttributeValue, MessageAttributes, Record,
        SentTimestamp, TextBody,
    },
};

pub trait SnsRecordMeta: EventOrigin + SentTimestamp + Send + Sync {
    fn event_subscription_arn(&self) -> &str;
    fn message_id(&self) -> &str;
    fn topic_arn(&self) -> &str;
    fn subject(&self) -> Option<&str>;
    fn unsubscribe_url(&self) -> &str;
    /// Usually `Notification`.
    fn notification_type(&self) -> Option<&str>;
}

pub trait SnsBodyAttributes: TextBody + MessageAttributes + Send + Sync {
    fn message(&self) -> &str {
        self.text()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnsRecord {
    pub event_source: String,
    #[serde(default)]
    pub event_version: Option<String>,
    pub event_subscription_arn: String,
    pub sns: SnsMessage,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnsMessage {
    #[serde(rename = "Type", default)]
    pub notification_type: Option<String>,
    pub message_id: String,
    pub topic_arn: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
    /// RFC 3339 with milliseconds, e.g. `2019-01-02T12:45:07.000Z`.
    pub timestamp: DateTime<Utc>,
    pub unsubscribe_url: String,
    #[serde(default, deserialize_with = "de_sns_attributes")]
    pub message_attributes: HashMap<String, MessageAttributeValue>,
}

#[derive(Deserialize)]
struct RawSnsAttribute {
    #[serde(rename = "Type")]
    data_type: String,
    #[serde(rename = "Value")]
    value: Option<String>,
}

/// SNS attributes are `{Type, Value}` pairs; they are normalized to the queue attribute shape.
fn de_sns_attributes<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, MessageAttributeValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<HashMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();

    Ok(raw
        .into_iter()
        .filter_map(|(name, value)| {
            let attr = RawSnsAttribute::deserialize(value).ok()?;
            let mut normalized = MessageAttributeValue {
                data_type: attr.data_type,
                ..Default::default()
            };
            if normalized.data_type == "Binary" {
                normalized.binary_value = attr.value.and_then(|v| STANDARD.decode(v).ok());
            } else {
                normalized.string_value = attr.value;
            }
            Some((name, normalized))
        })
        .collect())
}

impl EventOrigin for SnsRecord {
    fn event_source(&self) -> &str {
        &self.event_source
    }

    /// Region is the fourth segment of the topic ARN.
    fn aws_region(&self) -> Option<&str> {
        self.sns
            .topic_arn
            .split(':')
            .nth(3)
            .filter(|region| !region.is_empty())
    }

    fn origin_arn(&self) -> Option<&str> {
        Some(&self.sns.topic_arn)
    }
}

impl SentTimestamp for SnsRecord {
    fn sent_at(&self) -> DateTime<Utc> {
        self.sns.timestamp
    }
}

impl SnsRecordMeta for SnsRecord {
    fn event_subscription_arn(&self) -> &str {
        &self.event_subscription_arn
    }

    fn message_id(&self) -> &str {
        &self.sns.message_id
    }

    fn topic_arn(&self) -> &str {
        &self.sns.topic_arn
    }

    fn subject(&self) -> Option<&str> {
        self.sns.subject.as_deref()
    }

    fn unsubscribe_url(&self) -> &str {
        &self.sns.unsubscribe_url
    }

    fn notification_type(&self) -> Option<&str> {
        self.sns.notification_type.as_deref()
    }
}

impl TextBody for SnsRecord {
    fn text(&self) -> &str {
        &self.sns.message
    }
}

impl MessageAttributes for SnsRecord {
    fn message_attributes(&self) -> &HashMap<String, MessageAttributeValue> {
        &self.sns.message_attributes
    }
}

impl SnsBodyAttributes for SnsRecord {}

pub type SnsPayload<C> = GroupedRecords<C, dyn SnsRecordMeta, dyn SnsBodyAttributes>;

#[derive(Debug, Default, Clone, Copy)]
pub struct SnsParser;

impl EventParser for SnsParser {
    type Meta = dyn SnsRecordMeta;
    type Body = dyn SnsBodyAttributes;

    fn parse_record(&self, raw: &Value) -> Result<Record<Self::Meta, Self::Body>, ParseError> {
        let record = Arc::new(SnsRecord::deserialize(raw).map_err(ParseError::Malformed)?);
        let meta: Arc<dyn SnsRecordMeta> = record.clone();
        let body: Arc<dyn SnsBodyAttributes> = record;
        Ok(Record::new(meta, body))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw_record() -> Value {
        json!({
            "EventSource": "aws:sns",
            "EventVersion": "1.0",
            "EventSubscriptionArn": "arn:aws:sns:us-east-2:123456789012:topic:sub",
            "Sns": {
                "Type": "Notification",
                "MessageId": "95df01b4-ee98-5cb9-9903-4c221d41eb5e",
                "TopicArn": "arn:aws:sns:us-east-2:123456789012:topic",
                "Subject": null,
                "Message": "Hello from SNS!",
                "Timestamp": "2019-01-02T12:45:07.000Z",
                "UnsubscribeUrl": "https://sns.us-east-2.amazonaws.com/unsubscribe",
                "MessageAttributes": {
                    "Test": {"Type": "String", "Value": "TestString"},
                    "Raw": {"Type": "Binary", "Value": "aGk="}
                }
            }
        })
    }

    #[test]
    fn parses_a_notification() {
        let record = SnsParser.parse_record(&raw_record()).unwrap();

        assert_eq!(record.body().message(), "Hello from SNS!");
        assert_eq!(record.meta().subject(), None);
        assert_eq!(record.meta().aws_region(), Some("us-east-2"));
        assert_eq!(
            record.meta().sent_at(),
            "2019-01-02T12:45:07Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert_eq!(record.meta().notification_type(), Some("Notification"));
    }

    #[test]
    fn attributes_use_the_shared_shape() {
        let record = SnsParser.parse_record(&raw_record()).unwrap();

        let test = record.body().message_attribute("Test").unwrap();
        assert_eq!(test.string_value.as_deref(), Some("TestString"));
        let raw = record.body().message_attribute("Raw").unwrap();
        assert_eq!(raw.binary_value.as_deref(), Some(&b"hi"[..]));
    }

    #[test]
    fn unparseable_timestamp_is_malformed() {
        let mut raw = raw_record();
        raw["Sns"]["Timestamp"] = json!("yesterday");

        assert!(matches!(
            SnsParser.parse_record(&raw),
            Err(ParseError::Malformed(_))
        ));
    }
}
