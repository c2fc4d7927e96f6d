mod common;

use common::{admin, fixture, fixture_with_channel, user};
use deadpool::Runtime;
use marketplace_messaging::common::error::AppError;
use marketplace_messaging::common::realtime::RealtimeChannel;
use marketplace_messaging::common::redis_pool::{RedisPool, RedisPoolManager};
use marketplace_messaging::models::conversations::ConversationId;
use marketplace_messaging::models::interests::InterestSubmitted;
use marketplace_messaging::models::messages::MessageOrigin;
use marketplace_messaging::models::participants::ParticipantId;
use marketplace_messaging::models::realtime::ServerEvent;
use marketplace_messaging::usecases::{conversations, interests, messages, realtime};
use marketplace_messaging::workers::daemons::domain_events;
use redis::AsyncConnectionConfig;
use std::time::Duration;

fn conversation(raw: &str) -> ConversationId {
    ConversationId::from_raw(raw)
}

fn id(raw: &str) -> ParticipantId {
    ParticipantId::from(raw)
}

#[tokio::test]
async fn user_message_reaches_admin_and_is_read_on_fetch() {
    let fixture = fixture().await;
    let ctx = &fixture.state;

    let sent = conversations::send_message(ctx, &user("u1"), None, "Hello".to_owned(), vec![])
        .await
        .unwrap();
    assert_eq!(sent.conversation_id.as_str(), "conversation_a1_u1");
    assert_eq!(sent.sender_id, Some(id("u1")));
    assert_eq!(sent.receiver_id, Some(id("a1")));
    assert_eq!(sent.origin, MessageOrigin::UserMessage);
    assert!(!sent.read);
    assert_eq!(sent.sender.as_ref().unwrap().name, "Ada");

    let fetched = conversations::get_messages(ctx, &admin(), conversation("conversation_a1_u1"))
        .await
        .unwrap();
    assert_eq!(fetched.messages.len(), 1);
    assert!(fetched.messages[0].read);

    let unread = messages::count_unread(ctx, &conversation("conversation_a1_u1"), &id("a1"))
        .await
        .unwrap();
    assert_eq!(unread, 0);
}

#[tokio::test]
async fn admin_reply_is_unread_until_the_user_fetches() {
    let fixture = fixture().await;
    let ctx = &fixture.state;

    conversations::send_message(ctx, &user("u1"), None, "Hello".to_owned(), vec![])
        .await
        .unwrap();
    let reply = conversations::reply(
        ctx,
        &admin(),
        conversation("conversation_a1_u1"),
        id("u1"),
        "How can I help?".to_owned(),
        vec![],
    )
    .await
    .unwrap();
    assert_eq!(reply.origin, MessageOrigin::AdminReply);
    assert_eq!(reply.receiver_id, Some(id("u1")));
    assert!(!reply.read);

    let unread = conversations::unread_count(ctx, &user("u1"), conversation("conversation_a1_u1"))
        .await
        .unwrap();
    assert_eq!(unread.unread_count, 1);

    let fetched = conversations::get_messages(ctx, &user("u1"), conversation("conversation_a1_u1"))
        .await
        .unwrap();
    let contents: Vec<&str> = fetched
        .messages
        .iter()
        .map(|message| message.content.as_str())
        .collect();
    assert_eq!(contents, vec!["Hello", "How can I help?"]);

    let unread = conversations::unread_count(ctx, &user("u1"), conversation("conversation_a1_u1"))
        .await
        .unwrap();
    assert_eq!(unread.unread_count, 0);
}

#[tokio::test]
async fn mark_read_only_updates_once() {
    let fixture = fixture().await;
    let ctx = &fixture.state;
    conversations::send_message(ctx, &user("u1"), None, "Hello".to_owned(), vec![])
        .await
        .unwrap();

    let conversation_id = conversation("conversation_a1_u1");
    assert_eq!(
        messages::mark_read(ctx, &conversation_id, &id("a1"))
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        messages::mark_read(ctx, &conversation_id, &id("a1"))
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn users_cannot_message_each_other() {
    let fixture = fixture().await;
    let ctx = &fixture.state;

    let result =
        conversations::send_message(ctx, &user("u1"), Some(id("u2")), "Hi".to_owned(), vec![])
            .await;
    assert_eq!(result.unwrap_err(), AppError::Forbidden);

    let result = conversations::get_or_create(ctx, &user("u1"), Some(id("u2"))).await;
    assert_eq!(result.unwrap_err(), AppError::Forbidden);
}

#[tokio::test]
async fn users_cannot_read_foreign_conversations() {
    let fixture = fixture().await;
    let ctx = &fixture.state;
    conversations::send_message(ctx, &user("u2"), None, "Private".to_owned(), vec![])
        .await
        .unwrap();

    let result =
        conversations::get_messages(ctx, &user("u1"), conversation("conversation_a1_u2")).await;
    assert_eq!(result.unwrap_err(), AppError::Forbidden);

    let result =
        conversations::unread_count(ctx, &user("u1"), conversation("conversation_a1_u2")).await;
    assert_eq!(result.unwrap_err(), AppError::Forbidden);
}

#[tokio::test]
async fn ids_with_underscores_cannot_reach_lookalike_conversations() {
    let fixture = fixture().await;
    let ctx = &fixture.state;
    for account in ["b_c", "a1_b"] {
        fixture
            .directory
            .insert_account(account, account, &format!("{account}@example.com"), "user")
            .await;
    }

    let sent = conversations::send_message(ctx, &user("b_c"), None, "Private".to_owned(), vec![])
        .await
        .unwrap();
    assert_eq!(sent.conversation_id.as_str(), "conversation_a1_b_c");

    let result =
        conversations::get_messages(ctx, &user("a1_b"), conversation("conversation_a1_b_c")).await;
    assert_eq!(result.unwrap_err(), AppError::Forbidden);

    let result =
        conversations::unread_count(ctx, &user("a1_b"), conversation("conversation_a1_b_c")).await;
    assert_eq!(result.unwrap_err(), AppError::Forbidden);

    let connection = ctx.realtime.connect(user("a1_b")).await;
    let result = realtime::join(
        ctx,
        &user("a1_b"),
        connection.connection_id,
        conversation("conversation_a1_b_c"),
    )
    .await;
    assert_eq!(result.unwrap_err(), AppError::Forbidden);

    let fetched =
        conversations::get_messages(ctx, &user("b_c"), conversation("conversation_a1_b_c"))
            .await
            .unwrap();
    assert_eq!(fetched.messages.len(), 1);
}

#[tokio::test]
async fn users_may_follow_their_own_empty_conversation() {
    let fixture = fixture().await;
    let ctx = &fixture.state;
    let connection = ctx.realtime.connect(user("u1")).await;

    realtime::join(
        ctx,
        &user("u1"),
        connection.connection_id,
        conversation("conversation_a1_u1"),
    )
    .await
    .unwrap();
    let unread = conversations::unread_count(ctx, &user("u1"), conversation("conversation_a1_u1"))
        .await
        .unwrap();
    assert_eq!(unread.unread_count, 0);

    let result =
        conversations::get_messages(ctx, &user("u1"), conversation("conversation_a1_u1")).await;
    assert_eq!(result.unwrap_err(), AppError::ConversationsNotFound);
}

#[tokio::test]
async fn admin_must_address_an_existing_receiver() {
    let fixture = fixture().await;
    let ctx = &fixture.state;

    let result = conversations::send_message(ctx, &admin(), None, "Hi".to_owned(), vec![]).await;
    assert_eq!(result.unwrap_err().code(), "messages.invalid");

    let result =
        conversations::send_message(ctx, &admin(), Some(id("u9")), "Hi".to_owned(), vec![]).await;
    assert_eq!(result.unwrap_err(), AppError::UsersNotFound);
}

#[tokio::test]
async fn reply_rejects_mismatched_conversation() {
    let fixture = fixture().await;
    let result = conversations::reply(
        &fixture.state,
        &admin(),
        conversation("conversation_a1_u2"),
        id("u1"),
        "Wrong thread".to_owned(),
        vec![],
    )
    .await;
    assert_eq!(result.unwrap_err().code(), "messages.invalid");

    let result = conversations::reply(
        &fixture.state,
        &user("u1"),
        conversation("conversation_a1_u1"),
        id("a1"),
        "Not an admin".to_owned(),
        vec![],
    )
    .await;
    assert_eq!(result.unwrap_err(), AppError::Forbidden);
}

#[tokio::test]
async fn unknown_sender_is_not_authenticated() {
    let fixture = fixture().await;
    let result =
        conversations::send_message(&fixture.state, &user("ghost"), None, "Hi".to_owned(), vec![])
            .await;
    assert_eq!(result.unwrap_err(), AppError::Unauthenticated);
}

#[tokio::test]
async fn blank_content_stores_nothing() {
    let fixture = fixture().await;
    let ctx = &fixture.state;
    let result = conversations::send_message(ctx, &user("u1"), None, "  ".to_owned(), vec![]).await;
    assert_eq!(result.unwrap_err().code(), "messages.invalid");

    let stored = messages::fetch_by_conversation(ctx, &conversation("conversation_a1_u1"))
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn opening_a_conversation_creates_one_welcome_message() {
    let fixture = fixture().await;
    let ctx = &fixture.state;

    let opened = conversations::get_or_create(ctx, &user("u1"), None)
        .await
        .unwrap();
    assert_eq!(opened.conversation_id.as_str(), "conversation_a1_u1");
    assert_eq!(opened.messages.len(), 1);
    assert_eq!(opened.messages[0].origin, MessageOrigin::SystemMessage);

    conversations::send_message(ctx, &user("u1"), None, "Hello".to_owned(), vec![])
        .await
        .unwrap();
    let reopened = conversations::get_or_create(ctx, &user("u1"), None)
        .await
        .unwrap();
    assert_eq!(reopened.messages.len(), 2);
    assert_eq!(reopened.messages[0], opened.messages[0]);
    let welcomes = reopened
        .messages
        .iter()
        .filter(|message| message.origin == MessageOrigin::SystemMessage)
        .count();
    assert_eq!(welcomes, 1);
}

#[tokio::test]
async fn welcome_text_depends_on_who_opens() {
    let fixture = fixture().await;
    let ctx = &fixture.state;

    let by_user = conversations::get_or_create(ctx, &user("u1"), None)
        .await
        .unwrap();
    let by_admin = conversations::get_or_create(ctx, &admin(), Some(id("u2")))
        .await
        .unwrap();
    assert_ne!(by_user.messages[0].content, by_admin.messages[0].content);
    assert_eq!(by_admin.conversation_id.as_str(), "conversation_a1_u2");
}

#[tokio::test]
async fn user_sees_a_single_conversation_with_the_admin() {
    let fixture = fixture().await;
    let ctx = &fixture.state;

    let listed = conversations::get_conversations(ctx, &user("u1"))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].conversation_id.as_str(), "conversation_a1_u1");
    assert!(listed[0].last_message.is_none());
    assert_eq!(listed[0].participant.as_ref().unwrap().name, "Support");

    conversations::send_message(ctx, &admin(), Some(id("u1")), "Welcome aboard".to_owned(), vec![])
        .await
        .unwrap();
    let listed = conversations::get_conversations(ctx, &user("u1"))
        .await
        .unwrap();
    assert_eq!(listed[0].unread_count, 1);
    assert_eq!(
        listed[0].last_message.as_ref().unwrap().content,
        "Welcome aboard"
    );
}

#[tokio::test]
async fn admin_sees_every_conversation_with_its_counterpart() {
    let fixture = fixture().await;
    let ctx = &fixture.state;

    conversations::send_message(ctx, &user("u1"), None, "First".to_owned(), vec![])
        .await
        .unwrap();
    conversations::send_message(ctx, &user("u1"), None, "Second".to_owned(), vec![])
        .await
        .unwrap();
    conversations::send_message(ctx, &user("u2"), None, "Other".to_owned(), vec![])
        .await
        .unwrap();

    let listed = conversations::get_conversations(ctx, &admin()).await.unwrap();
    assert_eq!(listed.len(), 2);

    let u1 = listed
        .iter()
        .find(|summary| summary.conversation_id.as_str() == "conversation_a1_u1")
        .unwrap();
    assert_eq!(u1.unread_count, 2);
    assert_eq!(u1.participant.as_ref().unwrap().id, id("u1"));
    assert_eq!(u1.last_message.as_ref().unwrap().content, "Second");

    let u2 = listed
        .iter()
        .find(|summary| summary.conversation_id.as_str() == "conversation_a1_u2")
        .unwrap();
    assert_eq!(u2.participant.as_ref().unwrap().name, "Grace");
}

#[tokio::test]
async fn missing_admin_is_reported() {
    let fixture = common::fixture_without_admin().await;
    let result = conversations::get_conversations(&fixture.state, &user("u1")).await;
    assert_eq!(result.unwrap_err(), AppError::UsersAdminNotFound);
}

#[tokio::test]
async fn sent_messages_are_pushed_to_conversation_subscribers() {
    let fixture = fixture().await;
    let ctx = &fixture.state;

    let mut admin_connection = ctx.realtime.connect(admin()).await;
    realtime::join(
        ctx,
        &admin(),
        admin_connection.connection_id,
        conversation("conversation_a1_u1"),
    )
    .await
    .unwrap();
    let mut bystander = ctx.realtime.connect(user("u2")).await;

    let sent = conversations::send_message(ctx, &user("u1"), None, "Hello".to_owned(), vec![])
        .await
        .unwrap();

    let frame = admin_connection.receiver.recv().await.unwrap();
    let event: ServerEvent = serde_json::from_str(&frame).unwrap();
    assert_eq!(event, ServerEvent::NewMessage(sent));
    assert!(bystander.receiver.try_recv().is_err());
}

#[tokio::test]
async fn users_cannot_join_foreign_conversations() {
    let fixture = fixture().await;
    let ctx = &fixture.state;
    let connection = ctx.realtime.connect(user("u1")).await;

    let result = realtime::join(
        ctx,
        &user("u1"),
        connection.connection_id,
        conversation("conversation_a1_u2"),
    )
    .await;
    assert_eq!(result.unwrap_err(), AppError::Forbidden);
    assert_eq!(
        ctx.realtime
            .subscriber_count(&conversation("conversation_a1_u2"))
            .await,
        0
    );
}

#[tokio::test]
async fn interest_submission_narrates_into_the_admin_conversation() {
    let fixture = fixture().await;
    let ctx = &fixture.state;
    let mut listener = ctx.realtime.connect(admin()).await;

    let message = interests::handle_submitted(
        ctx,
        InterestSubmitted {
            interest_id: "i42".to_owned(),
            submitter_id: id("u1"),
            title: Some("Two bedroom flat".to_owned()),
        },
    )
    .await
    .unwrap();
    assert_eq!(message.origin, MessageOrigin::SystemMessage);
    assert_eq!(message.interest_id.as_deref(), Some("i42"));
    assert_eq!(message.conversation_id.as_str(), "conversation_a1_u1");
    assert_eq!(message.receiver_id, Some(id("a1")));

    let frame = listener.receiver.recv().await.unwrap();
    let event: ServerEvent = serde_json::from_str(&frame).unwrap();
    match event {
        ServerEvent::NewInterest(summary) => {
            assert_eq!(summary.interest_id, "i42");
            assert_eq!(summary.message_id, message.id);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

fn unreachable_relay() -> RealtimeChannel {
    let client = redis::Client::open("redis://127.0.0.1:1/").unwrap();
    let config = AsyncConnectionConfig::new()
        .set_connection_timeout(Duration::from_millis(200))
        .set_response_timeout(Duration::from_millis(200));
    let pool = RedisPool::builder(RedisPoolManager::new(client, config))
        .max_size(1)
        .wait_timeout(Some(Duration::from_millis(200)))
        .create_timeout(Some(Duration::from_millis(500)))
        .runtime(Runtime::Tokio1)
        .build()
        .unwrap();
    RealtimeChannel::relayed(pool, 16)
}

#[tokio::test]
async fn interest_message_survives_a_failing_realtime_push() {
    let fixture = fixture_with_channel(unreachable_relay()).await;
    let ctx = &fixture.state;

    interests::handle_submitted(
        ctx,
        InterestSubmitted {
            interest_id: "i7".to_owned(),
            submitter_id: id("u1"),
            title: None,
        },
    )
    .await
    .unwrap();

    let stored = messages::fetch_by_conversation(ctx, &conversation("conversation_a1_u1"))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].origin, MessageOrigin::SystemMessage);
    assert_eq!(stored[0].interest_id.as_deref(), Some("i7"));
}

#[tokio::test]
async fn sending_survives_a_failing_realtime_push() {
    let fixture = fixture_with_channel(unreachable_relay()).await;
    let sent =
        conversations::send_message(&fixture.state, &user("u1"), None, "Hello".to_owned(), vec![])
            .await
            .unwrap();
    assert_eq!(sent.content, "Hello");
}

#[tokio::test]
async fn bridge_failures_are_swallowed() {
    let fixture = common::fixture_without_admin().await;
    interests::notify_submitted(
        &fixture.state,
        InterestSubmitted {
            interest_id: "i1".to_owned(),
            submitter_id: id("u1"),
            title: None,
        },
    )
    .await;
}

#[tokio::test]
async fn submitted_interests_flow_through_the_domain_event_bus() {
    let mut fixture = fixture().await;
    let receiver = fixture.domain_events.take().unwrap();
    tokio::spawn(domain_events::serve(fixture.state.clone(), receiver));

    interests::on_submitted(
        &fixture.state,
        InterestSubmitted {
            interest_id: "i9".to_owned(),
            submitter_id: id("u2"),
            title: None,
        },
    );

    let conversation_id = conversation("conversation_a1_u2");
    let mut stored = vec![];
    for _ in 0..50 {
        stored = messages::fetch_by_conversation(&fixture.state, &conversation_id)
            .await
            .unwrap();
        if !stored.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].interest_id.as_deref(), Some("i9"));
}
