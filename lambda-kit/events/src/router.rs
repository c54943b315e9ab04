//! Source-name routing.
//!
//! Every registered source owns a route: parser plus handler, erased behind one boxed closure so
//! the router can hold routes for unrelated record types. Routes are registered once at startup
//! and only read afterwards, so delivery needs no locking.

use std::{collections::HashMap, future::Future, sync::Arc};

use futures::{future::BoxFuture, FutureExt};
use lek_codec::{CaseSettings, Item};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{
    custom::CustomEvent,
    dynamo::{DynamoStreamParser, DynamoStreamPayload},
    error::{DispatchError, RegistrationError},
    parser::EventParser,
    record::GroupedRecords,
    s3::{S3Parser, S3Payload},
    sns::{SnsParser, SnsPayload},
    sqs::{SqsParser, SqsPayload, TypedSqsParser, TypedSqsPayload},
};

type RouteFuture = BoxFuture<'static, Result<Value, anyhow::Error>>;
type Route<C> = Arc<dyn Fn(Value, C) -> RouteFuture + Send + Sync>;

/// The acknowledgment returned for record sources.
pub fn empty_ack() -> Value {
    Value::Object(Map::new())
}

/// Maps source names to handlers. `C` is the host's execution context, handed to every handler
/// untouched.
pub struct EventRouter<C> {
    routes: HashMap<String, Route<C>>,
}

impl<C> Default for EventRouter<C> {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }
}

impl<C: Send + 'static> EventRouter<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, source_name: &str) -> bool {
        self.routes.contains_key(source_name)
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    fn insert(&mut self, source_name: String, route: Route<C>) -> Result<&mut Self, RegistrationError> {
        if self.routes.contains_key(&source_name) {
            return Err(RegistrationError::DuplicateSource(source_name));
        }
        tracing::debug!(source = %source_name, "registered handler");
        self.routes.insert(source_name, route);
        Ok(self)
    }

    /// Registers a record source. The parsed batch is converted into the handler's payload type
    /// `G`; any `G: From<GroupedRecords<..>>` works, including `GroupedRecords` itself.
    pub fn register<P, G, F, Fut, E>(
        &mut self,
        source_name: impl Into<String>,
        parser: P,
        handler: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        P: EventParser,
        G: From<GroupedRecords<C, P::Meta, P::Body>>,
        F: Fn(G) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<anyhow::Error>,
    {
        let source_name = source_name.into();
        let name = source_name.clone();

        let route: Route<C> = Arc::new(move |payload: Value, context: C| -> RouteFuture {
            tracing::debug!(source = %name, "parsing payload");
            let records = parser.parse(&name, &payload);
            tracing::debug!(source = %name, records = records.len(), "dispatching to handler");

            let pending = handler(G::from(GroupedRecords::new(context, records)));
            let name = name.clone();
            async move {
                pending.await.map_err(Into::<anyhow::Error>::into)?;
                tracing::debug!(source = %name, "handler resolved");
                Ok::<_, anyhow::Error>(empty_ack())
            }
            .boxed()
        });

        self.insert(source_name, route)
    }

    pub fn register_sqs<F, Fut, E>(
        &mut self,
        source_name: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(SqsPayload<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<anyhow::Error>,
    {
        self.register(source_name, SqsParser, handler)
    }

    /// Queue source whose message bodies are JSON documents of type `T`.
    pub fn register_sqs_typed<T, F, Fut, E>(
        &mut self,
        source_name: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
        F: Fn(TypedSqsPayload<C, T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<anyhow::Error>,
    {
        self.register(source_name, TypedSqsParser::<T>::new(), handler)
    }

    pub fn register_sns<F, Fut, E>(
        &mut self,
        source_name: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(SnsPayload<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<anyhow::Error>,
    {
        self.register(source_name, SnsParser, handler)
    }

    pub fn register_dynamo_stream<F, Fut, E>(
        &mut self,
        source_name: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(DynamoStreamPayload<C, Item>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<anyhow::Error>,
    {
        self.register(source_name, DynamoStreamParser::untyped(), handler)
    }

    /// Change-stream source whose images decode into `T` under `case`.
    pub fn register_dynamo_stream_typed<T, F, Fut, E>(
        &mut self,
        source_name: impl Into<String>,
        case: CaseSettings,
        handler: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
        F: Fn(DynamoStreamPayload<C, T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<anyhow::Error>,
    {
        self.register(source_name, DynamoStreamParser::<T>::typed(case), handler)
    }

    pub fn register_s3<F, Fut, E>(
        &mut self,
        source_name: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(S3Payload<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<anyhow::Error>,
    {
        self.register(source_name, S3Parser, handler)
    }

    /// Registers a source whose payload is not a record batch. The handler's value is returned
    /// to the host as the response.
    pub fn register_custom<F, Fut, E>(
        &mut self,
        source_name: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(CustomEvent<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
        E: Into<anyhow::Error>,
    {
        let source_name = source_name.into();
        let name = source_name.clone();

        let route: Route<C> = Arc::new(move |data: Value, context: C| -> RouteFuture {
            tracing::debug!(source = %name, "dispatching custom event");
            let pending = handler(CustomEvent { context, data });
            let name = name.clone();
            async move {
                let response = pending.await.map_err(Into::<anyhow::Error>::into)?;
                tracing::debug!(source = %name, "handler resolved");
                Ok::<_, anyhow::Error>(response)
            }
            .boxed()
        });

        self.insert(source_name, route)
    }

    /// Routes one raw payload.
    ///
    /// Unknown sources are acknowledged with `{}` without running anything, so a misrouted
    /// delivery is not retried forever. Handler failures are returned as [`DispatchError`].
    pub async fn deliver(
        &self,
        source_name: &str,
        payload: Value,
        context: C,
    ) -> Result<Value, DispatchError> {
        let Some(route) = self.routes.get(source_name) else {
            tracing::warn!(source = %source_name, "no handler registered for source; acknowledging");
            return Ok(empty_ack());
        };

        route(payload, context).await.map_err(|error| {
            tracing::error!(source = %source_name, error = %format!("{error:#}"), "handler failed");
            DispatchError::Handler {
                source_name: source_name.to_string(),
                error: error.into(),
            }
        })
    }
}
