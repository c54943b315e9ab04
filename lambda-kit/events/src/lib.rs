//! Event-source normalization and dispatch.
//!
//! Raw invocation payloads from SQS, SNS, DynamoDB Streams, S3 and user-defined sources are
//! parsed into [`Record`]s, grouped per invocation together with the host's execution context,
//! and routed by source name to a registered async handler.
//!
//! ```
//! use lek_events::{EventRouter, SqsBodyAttributes, SqsPayload};
//! use serde_json::json;
//!
//! let mut router = EventRouter::<()>::new();
//! router
//!     .register_sqs("orders", |event: SqsPayload<()>| async move {
//!         for body in event.bodies() {
//!             println!("{}", body.body());
//!         }
//!         Ok::<_, std::convert::Infallible>(())
//!     })
//!     .unwrap();
//!
//! let ack = futures::executor::block_on(router.deliver("orders", json!({"Records": []}), ()));
//! assert_eq!(ack.unwrap(), json!({}));
//! ```
//!
//! Modules:
//! - [`record`]: `Record`, `GroupedRecords` and the shared capability traits
//! - [`sqs`], [`sns`], [`dynamo`], [`s3`], [`custom`]: per-source record types and parsers
//! - [`router`]: registration and delivery
//! - [`publish`]: outbound queue publishing

pub mod custom;
pub mod dynamo;
pub mod error;
pub mod parser;
pub mod publish;
pub mod record;
pub mod router;
pub mod s3;
pub mod serde_ext;
pub mod sns;
pub mod sqs;

pub use custom::CustomEvent;
pub use dynamo::{
    ChangeKind, ChangeSet, DynamoStreamParser, DynamoStreamPayload, DynamoStreamRecord,
    DynamoStreamRecordMeta, StreamChange,
};
pub use error::{BoxError, DispatchError, ParseError, PayloadShapeError, RegistrationError};
pub use parser::EventParser;
pub use publish::{publish_all, publish_json, MessagePublisher, PublishReceipt, SqsPublisher};
pub use record::{
    EventOrigin, GroupedRecords, MessageAttributeValue, MessageAttributes, Record, SentTimestamp,
    TextBody,
};
pub use router::{empty_ack, EventRouter};
pub use s3::{S3ObjectBody, S3Parser, S3Payload, S3Record, S3RecordMeta};
pub use sns::{SnsBodyAttributes, SnsParser, SnsPayload, SnsRecord, SnsRecordMeta};
pub use sqs::{
    SqsBodyAttributes, SqsParser, SqsPayload, SqsRecord, SqsRecordMeta, TypedSqsParser,
    TypedSqsPayload,
};
