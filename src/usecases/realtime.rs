use crate::common::context::Context;
use crate::common::error::{AppError, ServiceResult};
use crate::common::realtime::ConnectionId;
use crate::models::conversations::ConversationId;
use crate::models::interests::InterestSummary;
use crate::models::messages::MessageResponse;
use crate::models::participants::Participant;
use crate::models::realtime::{EventError, RealtimeTarget, ServerEvent};
use crate::usecases::conversations;
use tracing::{error, info};

pub async fn publish_message<C: Context>(ctx: &C, message: MessageResponse) -> ServiceResult<()> {
    let target = RealtimeTarget::Conversation(message.conversation_id.clone());
    publish(ctx, target, ServerEvent::NewMessage(message)).await
}

pub async fn publish_interest<C: Context>(ctx: &C, summary: InterestSummary) -> ServiceResult<()> {
    publish(ctx, RealtimeTarget::Global, ServerEvent::NewInterest(summary)).await
}

async fn publish<C: Context>(
    ctx: &C,
    target: RealtimeTarget,
    event: ServerEvent,
) -> ServiceResult<()> {
    match ctx.realtime().publish(target, event).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Failed to publish realtime event: {e:?}");
            Err(AppError::RealtimePublishFailed)
        }
    }
}

/// Subscribes a connection to a conversation's events.
///
/// Admins may follow any conversation, everybody else only the ones they are part of.
pub async fn join<C: Context>(
    ctx: &C,
    participant: &Participant,
    connection_id: ConnectionId,
    conversation_id: ConversationId,
) -> ServiceResult<()> {
    conversations::ensure_party(ctx, participant, &conversation_id).await?;
    if ctx.realtime().join(connection_id, conversation_id.clone()).await {
        info!(
            participant_id = %participant.id,
            %conversation_id,
            "Joined conversation"
        );
    }
    Ok(())
}

pub async fn leave<C: Context>(
    ctx: &C,
    connection_id: ConnectionId,
    conversation_id: &ConversationId,
) -> ServiceResult<()> {
    ctx.realtime().leave(connection_id, conversation_id).await;
    Ok(())
}

/// Reports a failed client action back to the connection that caused it.
pub async fn send_error<C: Context>(ctx: &C, connection_id: ConnectionId, e: &AppError) {
    let event = ServerEvent::Error(EventError {
        code: e.code().to_owned(),
        message: e.message().to_owned(),
    });
    if let Err(e) = ctx.realtime().send_to(connection_id, &event).await {
        error!(%connection_id, "Failed to send error event: {e:?}");
    }
}
