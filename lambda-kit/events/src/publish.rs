//! Outbound message publishing.
//!
//! Handlers that fan records out to a queue go through [`MessagePublisher`], which keeps them
//! testable without AWS. Retries are left to the client implementation.

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Serialize;

/// Acknowledgment of one published message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReceipt {
    pub message_id: Option<String>,
}

#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, message: String, destination: &str) -> anyhow::Result<PublishReceipt>;
}

/// SQS implementation of [`MessagePublisher`]; `destination` is the queue URL.
pub struct SqsPublisher {
    client: aws_sdk_sqs::Client,
}

impl SqsPublisher {
    /// Create a publisher using standard AWS credential resolution.
    pub async fn new(region: Option<String>) -> anyhow::Result<Self> {
        let mut loader = aws_config::from_env();
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let cfg = loader.load().await;
        Ok(Self::from_client(aws_sdk_sqs::Client::new(&cfg)))
    }

    pub fn from_client(client: aws_sdk_sqs::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessagePublisher for SqsPublisher {
    async fn publish(&self, message: String, destination: &str) -> anyhow::Result<PublishReceipt> {
        let out = self
            .client
            .send_message()
            .queue_url(destination)
            .message_body(message)
            .send()
            .await?;

        Ok(PublishReceipt {
            message_id: out.message_id().map(str::to_string),
        })
    }
}

/// Publishes `value` encoded as JSON.
pub async fn publish_json<P, T>(
    publisher: &P,
    value: &T,
    destination: &str,
) -> anyhow::Result<PublishReceipt>
where
    P: MessagePublisher + ?Sized,
    T: Serialize + ?Sized,
{
    let message = serde_json::to_string(value)?;
    publisher.publish(message, destination).await
}

/// Publishes every value concurrently. Succeeds only if every publish succeeds; the first
/// failure is returned and no partial result is reported.
pub async fn publish_all<'a, P, T, I>(
    publisher: &P,
    values: I,
    destination: &str,
) -> anyhow::Result<Vec<PublishReceipt>>
where
    P: MessagePublisher + ?Sized,
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let sends = values
        .into_iter()
        .map(|value| publish_json(publisher, value, destination));
    let receipts = try_join_all(sends).await?;
    tracing::debug!(destination = %destination, published = receipts.len(), "published messages");
    Ok(receipts)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl MessagePublisher for Recorder {
        async fn publish(&self, message: String, destination: &str) -> anyhow::Result<PublishReceipt> {
            let mut sent = self.sent.lock().unwrap();
            if message.contains("poison") {
                anyhow::bail!("rejected {message}");
            }
            sent.push((destination.to_string(), message));
            Ok(PublishReceipt {
                message_id: Some(format!("id-{}", sent.len())),
            })
        }
    }

    #[tokio::test]
    async fn publish_all_encodes_each_value() {
        let recorder = Recorder::default();

        let receipts = publish_all(&recorder, &["a", "b"], "queue").await.unwrap();

        assert_eq!(receipts.len(), 2);
        let sent = recorder.sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![
                ("queue".to_string(), "\"a\"".to_string()),
                ("queue".to_string(), "\"b\"".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn publish_all_fails_if_any_publish_fails() {
        let recorder = Recorder::default();

        let err = publish_all(&recorder, &["ok", "poison"], "queue")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("poison"));
    }
}
