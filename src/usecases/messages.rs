use crate::common::context::Context;
use crate::common::error::{ServiceResult, unexpected};
use crate::models::conversations::{ConversationAggregate, ConversationId};
use crate::models::messages::{Message, MessageDraft, MessageResponse};
use crate::models::participants::ParticipantId;
use crate::usecases::participants;

/// Validates and persists a message, deriving its conversation id when absent.
pub async fn append<C: Context>(ctx: &C, draft: MessageDraft) -> ServiceResult<Message> {
    let message = draft.validate()?;
    match ctx.messages().insert(message.into()).await {
        Ok(message) => Message::try_from(message),
        Err(e) => unexpected(e),
    }
}

/// Like [`append`], but only when the conversation does not contain any message yet.
pub async fn append_first<C: Context>(
    ctx: &C,
    draft: MessageDraft,
) -> ServiceResult<Option<Message>> {
    let message = draft.validate()?;
    match ctx.messages().insert_if_conversation_empty(message.into()).await {
        Ok(Some(message)) => Ok(Some(Message::try_from(message)?)),
        Ok(None) => Ok(None),
        Err(e) => unexpected(e),
    }
}

pub async fn fetch_by_conversation<C: Context>(
    ctx: &C,
    conversation_id: &ConversationId,
) -> ServiceResult<Vec<Message>> {
    match ctx
        .messages()
        .fetch_by_conversation(conversation_id.as_str())
        .await
    {
        Ok(messages) => messages.into_iter().map(Message::try_from).collect(),
        Err(e) => unexpected(e),
    }
}

pub async fn fetch_latest<C: Context>(
    ctx: &C,
    conversation_id: &ConversationId,
) -> ServiceResult<Option<Message>> {
    match ctx.messages().fetch_latest(conversation_id.as_str()).await {
        Ok(message) => message.map(Message::try_from).transpose(),
        Err(e) => unexpected(e),
    }
}

pub async fn is_party<C: Context>(
    ctx: &C,
    conversation_id: &ConversationId,
    participant_id: &ParticipantId,
) -> ServiceResult<bool> {
    match ctx
        .messages()
        .is_party(conversation_id.as_str(), participant_id.as_str())
        .await
    {
        Ok(is_party) => Ok(is_party),
        Err(e) => unexpected(e),
    }
}

/// Flags every unread message addressed to `receiver_id` as read. Returns how many changed.
pub async fn mark_read<C: Context>(
    ctx: &C,
    conversation_id: &ConversationId,
    receiver_id: &ParticipantId,
) -> ServiceResult<u64> {
    match ctx
        .messages()
        .mark_read(conversation_id.as_str(), receiver_id.as_str())
        .await
    {
        Ok(updated) => Ok(updated),
        Err(e) => unexpected(e),
    }
}

pub async fn count_unread<C: Context>(
    ctx: &C,
    conversation_id: &ConversationId,
    receiver_id: &ParticipantId,
) -> ServiceResult<u64> {
    match ctx
        .messages()
        .count_unread(conversation_id.as_str(), receiver_id.as_str())
        .await
    {
        Ok(count) => Ok(count),
        Err(e) => unexpected(e),
    }
}

pub async fn list_conversations_for_admin<C: Context>(
    ctx: &C,
    admin_id: &ParticipantId,
) -> ServiceResult<Vec<ConversationAggregate>> {
    match ctx.messages().list_conversations(admin_id.as_str()).await {
        Ok(rows) => rows
            .into_iter()
            .map(ConversationAggregate::try_from)
            .collect(),
        Err(e) => unexpected(e),
    }
}

/// Attaches sender and receiver profiles to stored messages.
pub async fn present<C: Context>(
    ctx: &C,
    messages: Vec<Message>,
) -> ServiceResult<Vec<MessageResponse>> {
    let participant_ids: Vec<ParticipantId> = messages
        .iter()
        .flat_map(|message| message.sender_id.iter().chain(message.receiver_id.iter()))
        .cloned()
        .collect();
    let profiles = participants::fetch_profiles(ctx, participant_ids).await?;
    let responses = messages
        .into_iter()
        .map(|message| {
            let sender = message
                .sender_id
                .as_ref()
                .and_then(|id| profiles.get(id))
                .cloned();
            let receiver = message
                .receiver_id
                .as_ref()
                .and_then(|id| profiles.get(id))
                .cloned();
            MessageResponse::new(message, sender, receiver)
        })
        .collect();
    Ok(responses)
}

pub async fn present_one<C: Context>(ctx: &C, message: Message) -> ServiceResult<MessageResponse> {
    let mut responses = present(ctx, vec![message]).await?;
    match responses.pop() {
        Some(response) => Ok(response),
        None => unexpected(anyhow::anyhow!("presenting a message produced no response")),
    }
}
