use crate::api::{JsonBody, RequestContext};
use crate::common::error::ServiceResponse;
use crate::models::conversations::{
    ConversationId, ConversationMessages, ConversationSummary, UnreadCount,
};
use crate::models::messages::{Attachment, MessageResponse};
use crate::models::participants::ParticipantId;
use crate::usecases::conversations;
use axum::Json;
use axum::extract::Path;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct OpenConversationArgs {
    pub other_user_id: Option<ParticipantId>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyArgs {
    pub receiver_id: ParticipantId,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

pub async fn list(ctx: RequestContext) -> ServiceResponse<Vec<ConversationSummary>> {
    let conversations = conversations::get_conversations(&ctx, &ctx.participant).await?;
    Ok(Json(conversations))
}

pub async fn open(
    ctx: RequestContext,
    JsonBody(args): JsonBody<OpenConversationArgs>,
) -> ServiceResponse<ConversationMessages> {
    let conversation =
        conversations::get_or_create(&ctx, &ctx.participant, args.other_user_id).await?;
    Ok(Json(conversation))
}

pub async fn messages(
    ctx: RequestContext,
    Path(conversation_id): Path<String>,
) -> ServiceResponse<ConversationMessages> {
    let conversation_id = ConversationId::from_raw(conversation_id);
    let conversation = conversations::get_messages(&ctx, &ctx.participant, conversation_id).await?;
    Ok(Json(conversation))
}

pub async fn reply(
    ctx: RequestContext,
    Path(conversation_id): Path<String>,
    JsonBody(args): JsonBody<ReplyArgs>,
) -> ServiceResponse<MessageResponse> {
    let message = conversations::reply(
        &ctx,
        &ctx.participant,
        ConversationId::from_raw(conversation_id),
        args.receiver_id,
        args.content,
        args.attachments,
    )
    .await?;
    Ok(Json(message))
}

pub async fn unread(
    ctx: RequestContext,
    Path(conversation_id): Path<String>,
) -> ServiceResponse<UnreadCount> {
    let conversation_id = ConversationId::from_raw(conversation_id);
    let unread = conversations::unread_count(&ctx, &ctx.participant, conversation_id).await?;
    Ok(Json(unread))
}
