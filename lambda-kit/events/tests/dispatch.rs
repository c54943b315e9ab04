use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use lek_codec::{CaseSettings, CaseStyle};
use lek_events::{
    publish_all, CustomEvent, DispatchError, DynamoStreamPayload, EventOrigin, EventRouter,
    GroupedRecords, MessagePublisher, PublishReceipt, Record, RegistrationError, SnsPayload,
    SqsBodyAttributes, SqsPayload, SqsRecordMeta, TypedSqsPayload,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
struct Invocation {
    request_id: String,
}

fn ctx(id: &str) -> Invocation {
    Invocation {
        request_id: id.to_string(),
    }
}

fn sqs_record(message_id: &str, body: &str) -> Value {
    json!({
        "body": body,
        "awsRegion": "us-east-1",
        "eventSource": "aws:sqs",
        "receiptHandle": format!("rh-{message_id}"),
        "messageId": message_id,
        "eventSourceARN": "arn:aws:sqs:us-east-1:123456789012:queue",
        "attributes": {
            "SenderId": "s1",
            "SentTimestamp": "1000",
            "ApproximateFirstReceiveTimestamp": "1001",
            "ApproximateReceiveCount": "1"
        }
    })
}

fn sns_record(message: &str) -> Value {
    json!({
        "EventSource": "aws:sns",
        "EventSubscriptionArn": "arn:aws:sns:us-east-1:123456789012:topic:sub",
        "Sns": {
            "MessageId": "n1",
            "TopicArn": "arn:aws:sns:us-east-1:123456789012:topic",
            "Message": message,
            "Timestamp": "2019-07-04T12:00:00.000Z",
            "UnsubscribeUrl": "https://example.com/unsubscribe"
        }
    })
}

fn stream_record(event_name: &str, user_id: &str, pet: &str) -> Value {
    let image = json!({"user_id": {"S": user_id}, "pet": {"S": pet}});
    let mut dynamodb = json!({
        "Keys": {"user_id": {"S": user_id}},
        "SequenceNumber": "1",
        "SizeBytes": 26,
        "StreamViewType": "NEW_AND_OLD_IMAGES"
    });
    match event_name {
        "INSERT" => dynamodb["NewImage"] = image,
        "MODIFY" => {
            dynamodb["OldImage"] = image.clone();
            dynamodb["NewImage"] = image;
        }
        _ => dynamodb["OldImage"] = image,
    }
    json!({
        "eventID": format!("{event_name}-{user_id}"),
        "eventName": event_name,
        "eventSource": "aws:dynamodb",
        "awsRegion": "us-east-1",
        "dynamodb": dynamodb
    })
}

#[tokio::test]
async fn queue_payload_reaches_handler() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut router = EventRouter::new();
    let sink = seen.clone();
    router
        .register_sqs("queue", move |event: SqsPayload<Invocation>| {
            let sink = sink.clone();
            async move {
                let mut sink = sink.lock().unwrap();
                for record in event.iter() {
                    sink.push((
                        event.context().request_id.clone(),
                        record.body().body().to_string(),
                        record.meta().approximate_receive_count(),
                    ));
                }
                Ok::<_, anyhow::Error>(())
            }
        })
        .unwrap();

    let ack = router
        .deliver("queue", json!({"Records": [sqs_record("m1", "hi")]}), ctx("r1"))
        .await
        .unwrap();

    assert_eq!(ack, json!({}));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![("r1".to_string(), "hi".to_string(), 1)]
    );
}

#[tokio::test]
async fn malformed_records_are_dropped_from_the_batch() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut router = EventRouter::new();
    let sink = seen.clone();
    router
        .register_sqs("queue", move |event: SqsPayload<()>| {
            let bodies: Vec<String> = event.bodies().map(|b| b.body().to_string()).collect();
            sink.lock().unwrap().extend(bodies);
            async { Ok::<_, anyhow::Error>(()) }
        })
        .unwrap();

    let mut broken = sqs_record("m2", "two");
    broken["attributes"]["ApproximateReceiveCount"] = json!("lots");
    let payload = json!({"Records": [
        sqs_record("m1", "one"),
        broken,
        {"unexpected": true},
        sqs_record("m3", "three")
    ]});

    router.deliver("queue", payload, ()).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["one", "three"]);
}

#[tokio::test]
async fn payload_without_records_is_an_empty_batch() {
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let mut router = EventRouter::new();
    let sink = sizes.clone();
    router
        .register_sns("topic", move |event: SnsPayload<()>| {
            sink.lock().unwrap().push(event.len());
            async { Ok::<_, anyhow::Error>(()) }
        })
        .unwrap();

    let ack = router.deliver("topic", json!({"detail": {}}), ()).await.unwrap();

    assert_eq!(ack, json!({}));
    assert_eq!(*sizes.lock().unwrap(), vec![0]);
}

#[tokio::test]
async fn unknown_source_is_acknowledged_without_a_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut router = EventRouter::new();
    let counter = calls.clone();
    router
        .register_sqs("queue", move |_event: SqsPayload<()>| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, anyhow::Error>(()) }
        })
        .unwrap();

    let ack = router
        .deliver("not-registered", json!({"Records": [sqs_record("m1", "hi")]}), ())
        .await
        .unwrap();

    assert_eq!(ack, json!({}));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn handler_failure_is_surfaced() {
    let mut router = EventRouter::new();
    router
        .register_sqs("queue", |_event: SqsPayload<()>| async {
            Err::<(), _>(anyhow::anyhow!("downstream unavailable"))
        })
        .unwrap();

    let err = router
        .deliver("queue", json!({"Records": []}), ())
        .await
        .unwrap_err();

    let DispatchError::Handler { source_name, error } = err;
    assert_eq!(source_name, "queue");
    assert_eq!(error.to_string(), "downstream unavailable");
}

#[test]
fn duplicate_source_names_are_rejected() {
    let mut router = EventRouter::<()>::new();
    router
        .register_sqs("queue", |_event: SqsPayload<()>| async {
            Ok::<_, anyhow::Error>(())
        })
        .unwrap();

    let err = router
        .register_custom("queue", |event: CustomEvent<()>| async move {
            Ok::<_, anyhow::Error>(event.data)
        })
        .err()
        .unwrap();

    assert_eq!(err, RegistrationError::DuplicateSource("queue".into()));
    assert_eq!(router.sources().collect::<Vec<_>>(), vec!["queue"]);
}

#[tokio::test]
async fn custom_source_echoes_its_payload() {
    let mut router = EventRouter::new();
    router
        .register_custom("echo", |event: CustomEvent<Invocation>| async move {
            Ok::<_, anyhow::Error>(json!({"from": event.context.request_id, "data": event.data}))
        })
        .unwrap();

    let response = router
        .deliver("echo", json!({"hello": "world"}), ctx("r7"))
        .await
        .unwrap();

    assert_eq!(response, json!({"from": "r7", "data": {"hello": "world"}}));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pet {
    user_id: String,
    pet: String,
}

#[tokio::test]
async fn typed_queue_bodies_skip_undecodable_messages() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut router = EventRouter::new();
    let sink = seen.clone();
    router
        .register_sqs_typed("pets", move |event: TypedSqsPayload<(), Pet>| {
            sink.lock().unwrap().extend(event.bodies().cloned());
            async { Ok::<_, anyhow::Error>(()) }
        })
        .unwrap();

    let payload = json!({"Records": [
        sqs_record("m1", r#"{"userId":"u1","pet":"cat"}"#),
        sqs_record("m2", "not json")
    ]});
    router.deliver("pets", payload, ()).await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![Pet {
            user_id: "u1".into(),
            pet: "cat".into()
        }]
    );
}

#[tokio::test]
async fn stream_batch_is_classified_by_change_kind() {
    let counts = Arc::new(Mutex::new(None));
    let mut router = EventRouter::new();
    let sink = counts.clone();
    router
        .register_dynamo_stream("table", move |event: DynamoStreamPayload<(), _>| {
            let changes = event.changes();
            *sink.lock().unwrap() = Some((
                changes.creates().len(),
                changes.updates().len(),
                changes.deletes().len(),
                event.len(),
            ));
            async { Ok::<_, anyhow::Error>(()) }
        })
        .unwrap();

    let payload = json!({"Records": [
        stream_record("INSERT", "u1", "cat"),
        stream_record("MODIFY", "u2", "dog"),
        stream_record("REMOVE", "u3", "fish")
    ]});
    router.deliver("table", payload, ()).await.unwrap();

    assert_eq!(*counts.lock().unwrap(), Some((1, 1, 1, 3)));
}

#[derive(Default)]
struct RecordingPublisher {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl MessagePublisher for RecordingPublisher {
    async fn publish(&self, message: String, destination: &str) -> anyhow::Result<PublishReceipt> {
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), message));
        Ok(PublishReceipt::default())
    }
}

#[tokio::test]
async fn created_images_fan_out_to_a_queue() {
    let publisher = Arc::new(RecordingPublisher::default());
    let mut router = EventRouter::new();
    let outbound = publisher.clone();
    router
        .register_dynamo_stream_typed(
            "pets",
            CaseSettings::new(CaseStyle::Camel, CaseStyle::Snake),
            move |event: DynamoStreamPayload<(), Pet>| {
                let outbound = outbound.clone();
                async move {
                    let created: Vec<&Pet> = event.changes().created_images().collect();
                    publish_all(outbound.as_ref(), created, "https://sqs/pets").await?;
                    Ok::<_, anyhow::Error>(())
                }
            },
        )
        .unwrap();

    let payload = json!({"Records": [
        stream_record("INSERT", "u1", "cat"),
        stream_record("REMOVE", "u2", "dog"),
        stream_record("INSERT", "u3", "owl")
    ]});
    router.deliver("pets", payload, ()).await.unwrap();

    let sent = publisher.sent.lock().unwrap();
    let bodies: Vec<Pet> = sent
        .iter()
        .map(|(_, message)| serde_json::from_str(message).unwrap())
        .collect();
    assert_eq!(
        bodies,
        vec![
            Pet {
                user_id: "u1".into(),
                pet: "cat".into()
            },
            Pet {
                user_id: "u3".into(),
                pet: "owl".into()
            }
        ]
    );
    assert!(sent.iter().all(|(queue, _)| queue == "https://sqs/pets"));
}

/// Works for any source whose meta provides an origin.
fn origins<C, M, B>(event: &GroupedRecords<C, M, B>) -> Vec<String>
where
    M: EventOrigin + ?Sized,
    B: ?Sized,
{
    event
        .iter()
        .map(Record::meta)
        .map(|meta| format!("{}@{}", meta.event_source(), meta.aws_region().unwrap_or("-")))
        .collect()
}

#[tokio::test]
async fn capability_handlers_work_across_sources() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut router = EventRouter::new();

    let sink = seen.clone();
    router
        .register_sqs("queue", move |event: SqsPayload<()>| {
            sink.lock().unwrap().extend(origins(&event));
            async { Ok::<_, anyhow::Error>(()) }
        })
        .unwrap();
    let sink = seen.clone();
    router
        .register_sns("topic", move |event: SnsPayload<()>| {
            sink.lock().unwrap().extend(origins(&event));
            async { Ok::<_, anyhow::Error>(()) }
        })
        .unwrap();

    router
        .deliver("queue", json!({"Records": [sqs_record("m1", "a")]}), ())
        .await
        .unwrap();
    router
        .deliver("topic", json!({"Records": [sns_record("b")]}), ())
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["aws:sqs@us-east-1", "aws:sns@us-east-1"]
    );
}
