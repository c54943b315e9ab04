//! Change-data-capture records (`aws:dynamodb`).
//!
//! Images arrive in the tagged attribute-value form. The untyped parser hands them over as
//! [`Item`]s; the typed parser runs them through the structured codec with the registration's
//! [`CaseSettings`].

use std::{ops::Deref, sync::Arc};

use chrono::{DateTime, Utc};
use lek_codec::{from_item, CaseSettings, CodecError, Item};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::{
    error::ParseError,
    parser::EventParser,
    record::{EventOrigin, GroupedRecords, Record},
    serde_ext::{de_option_epoch_seconds, de_option_u64_or_string},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Modify,
    Remove,
}

pub trait DynamoStreamRecordMeta: EventOrigin + Send + Sync {
    fn event_id(&self) -> &str;
    fn change_kind(&self) -> ChangeKind;
    fn event_version(&self) -> Option<&str>;
    fn approximate_creation_at(&self) -> Option<DateTime<Utc>>;
    fn sequence_number(&self) -> Option<&str>;
    fn size_bytes(&self) -> Option<u64>;
    /// `KEYS_ONLY`, `NEW_IMAGE`, `OLD_IMAGE` or `NEW_AND_OLD_IMAGES`.
    fn stream_view_type(&self) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStreamRecord {
    #[serde(rename = "eventID")]
    event_id: String,
    event_name: ChangeKind,
    #[serde(default)]
    event_version: Option<String>,
    event_source: String,
    #[serde(rename = "eventSourceARN", default)]
    event_source_arn: Option<String>,
    #[serde(default)]
    aws_region: Option<String>,
    dynamodb: RawStreamData,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawStreamData {
    #[serde(default, deserialize_with = "de_option_epoch_seconds")]
    approximate_creation_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    keys: Item,
    #[serde(default)]
    new_image: Option<Item>,
    #[serde(default)]
    old_image: Option<Item>,
    #[serde(default)]
    sequence_number: Option<String>,
    #[serde(default, deserialize_with = "de_option_u64_or_string")]
    size_bytes: Option<u64>,
    #[serde(default)]
    stream_view_type: Option<String>,
}

/// Delivery metadata of one stream record; the images live in [`StreamChange`].
#[derive(Debug, Clone, PartialEq)]
pub struct DynamoStreamRecord {
    pub event_id: String,
    pub kind: ChangeKind,
    pub event_version: Option<String>,
    pub event_source: String,
    pub event_source_arn: Option<String>,
    pub aws_region: Option<String>,
    pub approximate_creation_at: Option<DateTime<Utc>>,
    pub sequence_number: Option<String>,
    pub size_bytes: Option<u64>,
    pub stream_view_type: Option<String>,
}

impl EventOrigin for DynamoStreamRecord {
    fn event_source(&self) -> &str {
        &self.event_source
    }

    fn aws_region(&self) -> Option<&str> {
        self.aws_region.as_deref()
    }

    fn origin_arn(&self) -> Option<&str> {
        self.event_source_arn.as_deref()
    }
}

impl DynamoStreamRecordMeta for DynamoStreamRecord {
    fn event_id(&self) -> &str {
        &self.event_id
    }

    fn change_kind(&self) -> ChangeKind {
        self.kind
    }

    fn event_version(&self) -> Option<&str> {
        self.event_version.as_deref()
    }

    fn approximate_creation_at(&self) -> Option<DateTime<Utc>> {
        self.approximate_creation_at
    }

    fn sequence_number(&self) -> Option<&str> {
        self.sequence_number.as_deref()
    }

    fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }

    fn stream_view_type(&self) -> Option<&str> {
        self.stream_view_type.as_deref()
    }
}

/// The before/after images of one mutation. Which images are present depends on the change
/// kind and on the stream view type.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamChange<T> {
    pub kind: ChangeKind,
    pub keys: Item,
    pub old_image: Option<T>,
    pub new_image: Option<T>,
}

type DecodeImage<T> = fn(&Item, &CaseSettings) -> Result<T, CodecError>;

fn clone_image(item: &Item, _case: &CaseSettings) -> Result<Item, CodecError> {
    Ok(item.clone())
}

fn decode_image<T: DeserializeOwned>(item: &Item, case: &CaseSettings) -> Result<T, CodecError> {
    from_item(item, case)
}

pub struct DynamoStreamParser<T> {
    case: CaseSettings,
    decode: DecodeImage<T>,
}

impl DynamoStreamParser<Item> {
    /// Images stay in their tagged form.
    pub fn untyped() -> Self {
        Self {
            case: CaseSettings::IDENTITY,
            decode: clone_image,
        }
    }
}

impl<T: DeserializeOwned> DynamoStreamParser<T> {
    /// Images are decoded into `T`; a record with an image that does not decode is dropped.
    pub fn typed(case: CaseSettings) -> Self {
        Self {
            case,
            decode: decode_image::<T>,
        }
    }
}

impl<T> DynamoStreamParser<T> {
    fn image(&self, image: Option<&Item>) -> Result<Option<T>, ParseError> {
        image
            .map(|item| (self.decode)(item, &self.case))
            .transpose()
            .map_err(ParseError::Image)
    }
}

impl<T> EventParser for DynamoStreamParser<T>
where
    T: Send + Sync + 'static,
{
    type Meta = dyn DynamoStreamRecordMeta;
    type Body = StreamChange<T>;

    fn parse_record(&self, raw: &Value) -> Result<Record<Self::Meta, Self::Body>, ParseError> {
        let raw = RawStreamRecord::deserialize(raw).map_err(ParseError::Malformed)?;
        let data = raw.dynamodb;

        let change = StreamChange {
            kind: raw.event_name,
            old_image: self.image(data.old_image.as_ref())?,
            new_image: self.image(data.new_image.as_ref())?,
            keys: data.keys,
        };
        let meta: Arc<dyn DynamoStreamRecordMeta> = Arc::new(DynamoStreamRecord {
            event_id: raw.event_id,
            kind: raw.event_name,
            event_version: raw.event_version,
            event_source: raw.event_source,
            event_source_arn: raw.event_source_arn,
            aws_region: raw.aws_region,
            approximate_creation_at: data.approximate_creation_date_time,
            sequence_number: data.sequence_number,
            size_bytes: data.size_bytes,
            stream_view_type: data.stream_view_type,
        });
        Ok(Record::new(meta, Arc::new(change)))
    }
}

/// Stream changes partitioned by kind, each list in delivery order.
pub struct ChangeSet<T> {
    creates: Vec<Arc<StreamChange<T>>>,
    updates: Vec<Arc<StreamChange<T>>>,
    deletes: Vec<Arc<StreamChange<T>>>,
}

impl<T> ChangeSet<T> {
    pub fn classify<M: ?Sized>(records: &[Record<M, StreamChange<T>>]) -> Self {
        let mut set = Self {
            creates: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
        };
        for record in records {
            let change = record.shared_body();
            match change.kind {
                ChangeKind::Insert => set.creates.push(change),
                ChangeKind::Modify => set.updates.push(change),
                ChangeKind::Remove => set.deletes.push(change),
            }
        }
        set
    }

    pub fn creates(&self) -> &[Arc<StreamChange<T>>] {
        &self.creates
    }

    pub fn updates(&self) -> &[Arc<StreamChange<T>>] {
        &self.updates
    }

    pub fn deletes(&self) -> &[Arc<StreamChange<T>>] {
        &self.deletes
    }

    /// New images of inserted items.
    pub fn created_images(&self) -> impl Iterator<Item = &T> {
        self.creates.iter().filter_map(|c| c.new_image.as_ref())
    }

    /// `(old, new)` image pairs of modified items.
    pub fn updated_images(&self) -> impl Iterator<Item = (Option<&T>, Option<&T>)> {
        self.updates
            .iter()
            .map(|c| (c.old_image.as_ref(), c.new_image.as_ref()))
    }

    /// Old images of removed items.
    pub fn deleted_images(&self) -> impl Iterator<Item = &T> {
        self.deletes.iter().filter_map(|c| c.old_image.as_ref())
    }
}

/// A stream batch plus its [`ChangeSet`], computed once when the payload is built.
pub struct DynamoStreamPayload<C, T> {
    grouped: GroupedRecords<C, dyn DynamoStreamRecordMeta, StreamChange<T>>,
    changes: ChangeSet<T>,
}

impl<C, T> DynamoStreamPayload<C, T> {
    pub fn changes(&self) -> &ChangeSet<T> {
        &self.changes
    }

    pub fn into_parts(
        self,
    ) -> (
        GroupedRecords<C, dyn DynamoStreamRecordMeta, StreamChange<T>>,
        ChangeSet<T>,
    ) {
        (self.grouped, self.changes)
    }
}

impl<C, T> From<GroupedRecords<C, dyn DynamoStreamRecordMeta, StreamChange<T>>>
    for DynamoStreamPayload<C, T>
{
    fn from(grouped: GroupedRecords<C, dyn DynamoStreamRecordMeta, StreamChange<T>>) -> Self {
        let changes = ChangeSet::classify(grouped.records());
        Self { grouped, changes }
    }
}

impl<C, T> Deref for DynamoStreamPayload<C, T> {
    type Target = GroupedRecords<C, dyn DynamoStreamRecordMeta, StreamChange<T>>;

    fn deref(&self) -> &Self::Target {
        &self.grouped
    }
}
