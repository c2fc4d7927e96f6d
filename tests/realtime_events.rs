mod common;

use common::{fixture, user};
use marketplace_messaging::api::RequestContext;
use marketplace_messaging::common::realtime::Subscription;
use marketplace_messaging::events;
use marketplace_messaging::models::conversations::ConversationId;
use marketplace_messaging::usecases::conversations;
use serde_json::Value;

fn conversation(raw: &str) -> ConversationId {
    ConversationId::from_raw(raw)
}

async fn next_frame(subscription: &mut Subscription) -> Value {
    let frame = subscription.receiver.recv().await.unwrap();
    serde_json::from_str(&frame).unwrap()
}

#[tokio::test]
async fn malformed_frames_are_answered_with_an_error_event() {
    let fixture = fixture().await;
    let ctx = RequestContext {
        state: fixture.state.clone(),
        participant: user("u1"),
    };
    let mut connection = ctx.state.realtime.connect(user("u1")).await;

    events::handle_frame(&ctx, connection.connection_id, "not json").await;
    let frame = next_frame(&mut connection).await;
    assert_eq!(frame["event"], "error");
    assert_eq!(frame["payload"]["code"], "decoding_request_failed");

    events::handle_frame(
        &ctx,
        connection.connection_id,
        r#"{"event": "shout", "payload": "conversation_a1_u1"}"#,
    )
    .await;
    let frame = next_frame(&mut connection).await;
    assert_eq!(frame["payload"]["code"], "decoding_request_failed");
}

#[tokio::test]
async fn joining_a_foreign_conversation_is_answered_with_forbidden() {
    let fixture = fixture().await;
    conversations::send_message(&fixture.state, &user("u2"), None, "Private".to_owned(), vec![])
        .await
        .unwrap();
    let ctx = RequestContext {
        state: fixture.state.clone(),
        participant: user("u1"),
    };
    let mut connection = ctx.state.realtime.connect(user("u1")).await;

    events::handle_frame(
        &ctx,
        connection.connection_id,
        r#"{"event": "join_conversation", "payload": "conversation_a1_u2"}"#,
    )
    .await;
    let frame = next_frame(&mut connection).await;
    assert_eq!(frame["event"], "error");
    assert_eq!(frame["payload"]["code"], "forbidden");
    assert_eq!(
        ctx.state
            .realtime
            .subscriber_count(&conversation("conversation_a1_u2"))
            .await,
        0
    );
}

#[tokio::test]
async fn leaving_a_conversation_releases_the_subscription() {
    let fixture = fixture().await;
    conversations::send_message(&fixture.state, &user("u1"), None, "Hello".to_owned(), vec![])
        .await
        .unwrap();
    let ctx = RequestContext {
        state: fixture.state.clone(),
        participant: user("u1"),
    };
    let mut connection = ctx.state.realtime.connect(user("u1")).await;
    let conversation_id = conversation("conversation_a1_u1");

    events::handle_frame(
        &ctx,
        connection.connection_id,
        r#"{"event": "join_conversation", "payload": "conversation_a1_u1"}"#,
    )
    .await;
    assert_eq!(ctx.state.realtime.subscriber_count(&conversation_id).await, 1);

    events::handle_frame(
        &ctx,
        connection.connection_id,
        r#"{"event": "leave_conversation", "payload": "conversation_a1_u1"}"#,
    )
    .await;
    assert_eq!(ctx.state.realtime.subscriber_count(&conversation_id).await, 0);
    assert!(connection.receiver.try_recv().is_err());
}
