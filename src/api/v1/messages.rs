use crate::api::{JsonBody, RequestContext};
use crate::common::error::ServiceResponse;
use crate::models::messages::{Attachment, MessageResponse};
use crate::models::participants::ParticipantId;
use crate::usecases::conversations;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SendMessageArgs {
    /// Defaults to the admin for regular users.
    pub receiver_id: Option<ParticipantId>,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

pub async fn send(
    ctx: RequestContext,
    JsonBody(args): JsonBody<SendMessageArgs>,
) -> ServiceResponse<MessageResponse> {
    let message = conversations::send_message(
        &ctx,
        &ctx.participant,
        args.receiver_id,
        args.content,
        args.attachments,
    )
    .await?;
    Ok(Json(message))
}
