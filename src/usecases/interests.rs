use crate::common::context::Context;
use crate::common::domain_events::DomainEvent;
use crate::common::error::ServiceResult;
use crate::models::conversations::ConversationId;
use crate::models::interests::{InterestSubmitted, InterestSummary};
use crate::models::messages::{MessageDraft, MessageOrigin, MessageResponse};
use crate::usecases::{messages, participants, realtime};
use tracing::{error, info, warn};

/// Hook for the interest service, called once a submission is persisted.
///
/// Only enqueues the event: the submission never waits on, or fails because
/// of, the messaging side effects.
pub fn on_submitted<C: Context>(ctx: &C, event: InterestSubmitted) {
    ctx.domain_events()
        .publish(DomainEvent::InterestSubmitted(event));
}

/// Runs [`handle_submitted`] and logs the outcome instead of returning it.
pub async fn notify_submitted<C: Context>(ctx: &C, event: InterestSubmitted) {
    let interest_id = event.interest_id.clone();
    let submitter_id = event.submitter_id.clone();
    match handle_submitted(ctx, event).await {
        Ok(message) => info!(
            interest_id,
            %submitter_id,
            message_id = message.id,
            conversation_id = %message.conversation_id,
            "Narrated interest submission"
        ),
        Err(e) => error!(
            interest_id,
            %submitter_id,
            "Failed to narrate interest submission: {}",
            e.code()
        ),
    }
}

/// Appends a system message about the submission to the submitter's
/// conversation with the admin, then pushes it to the conversation and
/// announces the interest globally. Push failures are logged only.
pub async fn handle_submitted<C: Context>(
    ctx: &C,
    event: InterestSubmitted,
) -> ServiceResult<MessageResponse> {
    let admin = participants::fetch_admin(ctx).await?;
    let conversation_id = ConversationId::resolve(&event.submitter_id, &admin.participant.id)?;

    let message = messages::append(
        ctx,
        MessageDraft {
            sender_id: Some(event.submitter_id.clone()),
            receiver_id: Some(admin.participant.id),
            content: event.summary_text(),
            origin: MessageOrigin::SystemMessage,
            conversation_id: Some(conversation_id.clone()),
            interest_id: Some(event.interest_id.clone()),
            attachments: vec![],
        },
    )
    .await?;
    let message = messages::present_one(ctx, message).await?;

    if let Err(e) = realtime::publish_message(ctx, message.clone()).await {
        warn!(
            interest_id = event.interest_id,
            %conversation_id,
            "Interest message not pushed in realtime: {}",
            e.code()
        );
    }

    let summary = InterestSummary {
        interest_id: event.interest_id,
        submitter_id: event.submitter_id,
        conversation_id,
        message_id: message.id,
        title: event.title,
    };
    if let Err(e) = realtime::publish_interest(ctx, summary).await {
        warn!(
            message_id = message.id,
            "Interest announcement not pushed in realtime: {}",
            e.code()
        );
    }
    Ok(message)
}
