//! Object-storage notifications (`aws:s3`).

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::ParseError,
    parser::EventParser,
    record::{EventOrigin, GroupedRecords, Record},
};

pub trait S3RecordMeta: EventOrigin + Send + Sync {
    /// e.g. `ObjectCreated:Put`.
    fn event_name(&self) -> &str;
    fn event_time(&self) -> DateTime<Utc>;
    fn event_version(&self) -> Option<&str>;
    fn principal_id(&self) -> Option<&str>;
    fn source_ip_address(&self) -> Option<&str>;
    fn response_elements(&self) -> &HashMap<String, String>;
}

/// The bucket and object a notification refers to.
pub trait S3ObjectBody: Send + Sync {
    fn configuration_id(&self) -> Option<&str>;
    fn bucket_name(&self) -> &str;
    fn bucket_arn(&self) -> Option<&str>;
    /// URL-encoded, as delivered.
    fn object_key(&self) -> &str;
    fn object_size(&self) -> Option<u64>;
    fn e_tag(&self) -> Option<&str>;
    fn version_id(&self) -> Option<&str>;
    fn sequencer(&self) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Record {
    #[serde(default)]
    pub event_version: Option<String>,
    pub event_source: String,
    pub aws_region: String,
    pub event_time: DateTime<Utc>,
    pub event_name: String,
    #[serde(default)]
    pub user_identity: Option<S3UserIdentity>,
    #[serde(default)]
    pub request_parameters: Option<S3RequestParameters>,
    #[serde(default)]
    pub response_elements: HashMap<String, String>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3UserIdentity {
    pub principal_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct S3RequestParameters {
    #[serde(rename = "sourceIPAddress")]
    pub source_ip_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Entity {
    #[serde(default)]
    pub configuration_id: Option<String>,
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct S3Bucket {
    pub name: String,
    #[serde(default)]
    pub arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Object {
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub e_tag: Option<String>,
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub sequencer: Option<String>,
}

impl EventOrigin for S3Record {
    fn event_source(&self) -> &str {
        &self.event_source
    }

    fn aws_region(&self) -> Option<&str> {
        Some(&self.aws_region)
    }

    fn origin_arn(&self) -> Option<&str> {
        self.s3.bucket.arn.as_deref()
    }
}

impl S3RecordMeta for S3Record {
    fn event_name(&self) -> &str {
        &self.event_name
    }

    fn event_time(&self) -> DateTime<Utc> {
        self.event_time
    }

    fn event_version(&self) -> Option<&str> {
        self.event_version.as_deref()
    }

    fn principal_id(&self) -> Option<&str> {
        self.user_identity.as_ref()?.principal_id.as_deref()
    }

    fn source_ip_address(&self) -> Option<&str> {
        self.request_parameters.as_ref()?.source_ip_address.as_deref()
    }

    fn response_elements(&self) -> &HashMap<String, String> {
        &self.response_elements
    }
}

impl S3ObjectBody for S3Record {
    fn configuration_id(&self) -> Option<&str> {
        self.s3.configuration_id.as_deref()
    }

    fn bucket_name(&self) -> &str {
        &self.s3.bucket.name
    }

    fn bucket_arn(&self) -> Option<&str> {
        self.s3.bucket.arn.as_deref()
    }

    fn object_key(&self) -> &str {
        &self.s3.object.key
    }

    fn object_size(&self) -> Option<u64> {
        self.s3.object.size
    }

    fn e_tag(&self) -> Option<&str> {
        self.s3.object.e_tag.as_deref()
    }

    fn version_id(&self) -> Option<&str> {
        self.s3.object.version_id.as_deref()
    }

    fn sequencer(&self) -> Option<&str> {
        self.s3.object.sequencer.as_deref()
    }
}

pub type S3Payload<C> = GroupedRecords<C, dyn S3RecordMeta, dyn S3ObjectBody>;

#[derive(Debug, Default, Clone, Copy)]
pub struct S3Parser;

impl EventParser for S3Parser {
    type Meta = dyn S3RecordMeta;
    type Body = dyn S3ObjectBody;

    fn parse_record(&self, raw: &Value) -> Result<Record<Self::Meta, Self::Body>, ParseError> {
        let record = Arc::new(S3Record::deserialize(raw).map_err(ParseError::Malformed)?);
        let meta: Arc<dyn S3RecordMeta> = record.clone();
        let body: Arc<dyn S3ObjectBody> = record;
        Ok(Record::new(meta, body))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_an_object_created_notification() {
        let raw = json!({
            "eventVersion": "2.1",
            "eventSource": "aws:s3",
            "awsRegion": "us-east-1",
            "eventTime": "1970-01-01T00:00:00.000Z",
            "eventName": "ObjectCreated:Put",
            "userIdentity": {"principalId": "EXAMPLE"},
            "requestParameters": {"sourceIPAddress": "127.0.0.1"},
            "responseElements": {"x-amz-request-id": "EXAMPLE123456789"},
            "s3": {
                "s3SchemaVersion": "1.0",
                "configurationId": "testConfigRule",
                "bucket": {
                    "name": "example-bucket",
                    "ownerIdentity": {"principalId": "EXAMPLE"},
                    "arn": "arn:aws:s3:::example-bucket"
                },
                "object": {
                    "key": "test%2Fkey",
                    "size": 1024,
                    "eTag": "0123456789abcdef0123456789abcdef",
                    "sequencer": "0A1B2C3D4E5F678901"
                }
            }
        });

        let record = S3Parser.parse_record(&raw).unwrap();
        assert_eq!(record.meta().event_name(), "ObjectCreated:Put");
        assert_eq!(record.meta().principal_id(), Some("EXAMPLE"));
        assert_eq!(record.meta().source_ip_address(), Some("127.0.0.1"));
        assert_eq!(record.meta().origin_arn(), Some("arn:aws:s3:::example-bucket"));
        assert_eq!(record.body().bucket_name(), "example-bucket");
        assert_eq!(record.body().object_key(), "test%2Fkey");
        assert_eq!(record.body().object_size(), Some(1024));
        assert_eq!(record.body().version_id(), None);
    }
}
