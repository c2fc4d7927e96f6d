pub mod join_conversation;
pub mod leave_conversation;

use crate::api::RequestContext;
use crate::common::error::{AppError, ServiceResult};
use crate::common::realtime::ConnectionId;
use crate::models::realtime::ClientEvent;
use crate::usecases::realtime;
use tracing::warn;

pub type EventResult = ServiceResult<()>;

/// Handles one text frame sent by a realtime client.
///
/// Failures are reported back to the sending connection as an `error` event.
pub async fn handle_frame(ctx: &RequestContext, connection_id: ConnectionId, frame: &str) {
    let result = match serde_json::from_str::<ClientEvent>(frame) {
        Ok(event) => handle_event(ctx, connection_id, event).await,
        Err(e) => {
            warn!(%connection_id, "Invalid realtime frame: {e}");
            Err(AppError::DecodingRequestFailed)
        }
    };
    if let Err(e) = result {
        realtime::send_error(ctx, connection_id, &e).await;
    }
}

pub async fn handle_event(
    ctx: &RequestContext,
    connection_id: ConnectionId,
    event: ClientEvent,
) -> EventResult {
    match event {
        ClientEvent::JoinConversation(conversation_id) => {
            join_conversation::handle(ctx, connection_id, conversation_id).await
        }
        ClientEvent::LeaveConversation(conversation_id) => {
            leave_conversation::handle(ctx, connection_id, conversation_id).await
        }
    }
}
