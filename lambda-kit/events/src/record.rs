//! The common record model.
//!
//! Every source produces [`Record`]s whose meta and body are capability sets: trait objects for
//! the untyped sources, or a decoded user type for typed bodies. Handlers written against the
//! shared capability traits below work for any source that provides them.

use std::{collections::HashMap, slice, str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};

/// One delivered item. Meta and body usually point at the same concrete record, viewed through
/// two different capability sets.
pub struct Record<M: ?Sized, B: ?Sized> {
    meta: Arc<M>,
    body: Arc<B>,
}

impl<M: ?Sized, B: ?Sized> Record<M, B> {
    pub fn new(meta: Arc<M>, body: Arc<B>) -> Self {
        Self { meta, body }
    }

    pub fn meta(&self) -> &M {
        &self.meta
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    pub(crate) fn shared_body(&self) -> Arc<B> {
        Arc::clone(&self.body)
    }
}

impl<M: ?Sized, B: ?Sized> Clone for Record<M, B> {
    fn clone(&self) -> Self {
        Self {
            meta: Arc::clone(&self.meta),
            body: Arc::clone(&self.body),
        }
    }
}

/// All records of one invocation, in delivery order, plus the host's execution context.
pub struct GroupedRecords<C, M: ?Sized, B: ?Sized> {
    context: C,
    records: Vec<Record<M, B>>,
}

impl<C, M: ?Sized, B: ?Sized> GroupedRecords<C, M, B> {
    pub fn new(context: C, records: Vec<Record<M, B>>) -> Self {
        Self { context, records }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn records(&self) -> &[Record<M, B>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Record<M, B>> {
        self.records.iter()
    }

    pub fn metas(&self) -> impl Iterator<Item = &M> {
        self.records.iter().map(Record::meta)
    }

    pub fn bodies(&self) -> impl Iterator<Item = &B> {
        self.records.iter().map(Record::body)
    }

    pub fn into_parts(self) -> (C, Vec<Record<M, B>>) {
        (self.context, self.records)
    }
}

impl<'a, C, M: ?Sized, B: ?Sized> IntoIterator for &'a GroupedRecords<C, M, B> {
    type Item = &'a Record<M, B>;
    type IntoIter = slice::Iter<'a, Record<M, B>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Where a record came from.
pub trait EventOrigin {
    /// Source identifier such as `aws:sqs`.
    fn event_source(&self) -> &str;

    fn aws_region(&self) -> Option<&str>;

    /// ARN of the queue, topic, stream or bucket that emitted the record.
    fn origin_arn(&self) -> Option<&str>;
}

pub trait SentTimestamp {
    fn sent_at(&self) -> DateTime<Utc>;
}

/// A payload carried as text.
pub trait TextBody {
    fn text(&self) -> &str;
}

pub trait MessageAttributes {
    fn message_attributes(&self) -> &HashMap<String, MessageAttributeValue>;

    fn message_attribute(&self, name: &str) -> Option<&MessageAttributeValue> {
        self.message_attributes().get(name)
    }
}

/// A typed message attribute as attached by the producer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageAttributeValue {
    /// `String`, `Number`, `Binary`, optionally with a custom suffix (`Number.float`).
    pub data_type: String,
    pub string_value: Option<String>,
    pub binary_value: Option<Vec<u8>>,
    pub string_list_values: Vec<String>,
    pub binary_list_values: Vec<Vec<u8>>,
}

impl MessageAttributeValue {
    pub fn is_number(&self) -> bool {
        self.data_type == "Number" || self.data_type.starts_with("Number.")
    }

    /// Parses the string value when the attribute is declared numeric.
    pub fn number_value<T: FromStr>(&self) -> Option<T> {
        if !self.is_number() {
            return None;
        }
        self.string_value.as_deref()?.trim().parse().ok()
    }

    /// Numeric list members that parse; others are skipped.
    pub fn number_list_values<T: FromStr>(&self) -> Vec<T> {
        if !self.is_number() {
            return Vec::new();
        }
        self.string_list_values
            .iter()
            .filter_map(|v| v.trim().parse().ok())
            .collect()
    }
}
