//! Lambda Runtime API host for an [`EventRouter`].
//!
//! The host polls `/next`, builds an [`InvocationContext`] from the invocation headers, hands
//! the JSON payload to the router under the configured source name, and posts the outcome back:
//! the router's value to `/response`, a handler failure to `/error`.

pub mod config;
pub mod context;
pub mod runtime_api;

use lek_events::EventRouter;
use serde_json::Value;

pub use config::Config;
pub use context::InvocationContext;
pub use runtime_api::{NextInvocation, RuntimeApiClient};

/// Polls and serves invocations until the Runtime API fails.
pub async fn run(router: EventRouter<InvocationContext>) -> anyhow::Result<()> {
    let cfg = Config::from_env()?;
    init_tracing(cfg.json_logs);

    if !router.contains(&cfg.source_name) {
        tracing::warn!(
            source = %cfg.source_name,
            registered = ?router.sources().collect::<Vec<_>>(),
            "configured source has no handler; invocations will be acknowledged"
        );
    }

    let client = RuntimeApiClient::new(cfg.runtime_base_url())?;
    tracing::info!(source = %cfg.source_name, "starting runtime loop");
    loop {
        handle_next(&client, &router, &cfg.source_name).await?;
    }
}

/// Serves exactly one invocation.
pub async fn handle_next(
    client: &RuntimeApiClient,
    router: &EventRouter<InvocationContext>,
    source_name: &str,
) -> anyhow::Result<()> {
    let next = client.next_invocation().await?;
    let request_id = next.request_id.clone();

    let payload: Value = match serde_json::from_slice(&next.body) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(request_id = %request_id, error = %err, "invocation payload is not JSON");
            return client
                .post_error(&request_id, "InvalidPayload", &err.to_string())
                .await;
        }
    };

    let context = InvocationContext::from_headers(&request_id, &next.headers);
    let _deadline = context.arm_deadline();
    tracing::debug!(request_id = %request_id, source = %source_name, "invocation received");

    match router.deliver(source_name, payload, context).await {
        Ok(response) => client.post_response(&request_id, &response).await,
        Err(err) => {
            let message = format!("{:#}", anyhow::Error::from(err));
            client.post_error(&request_id, "HandlerError", &message).await
        }
    }
}

pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // A second init (tests, embedding) keeps the first subscriber.
    if json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}
