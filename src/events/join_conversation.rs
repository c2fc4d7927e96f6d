use crate::api::RequestContext;
use crate::common::realtime::ConnectionId;
use crate::events::EventResult;
use crate::models::conversations::ConversationId;
use crate::usecases::realtime;

pub async fn handle(
    ctx: &RequestContext,
    connection_id: ConnectionId,
    conversation_id: ConversationId,
) -> EventResult {
    realtime::join(ctx, &ctx.participant, connection_id, conversation_id).await
}
