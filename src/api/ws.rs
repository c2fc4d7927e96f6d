use crate::api::RequestContext;
use crate::events;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info};

/// Realtime endpoint. Authentication runs before the upgrade, so a bad
/// credential is answered with a plain 401 and no socket is opened.
pub async fn connect(ctx: RequestContext, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, ctx))
}

async fn handle_socket(socket: WebSocket, ctx: RequestContext) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let subscription = ctx.state.realtime.connect(ctx.participant.clone()).await;
    let connection_id = subscription.connection_id;
    let mut outbound = subscription.receiver;
    info!(
        %connection_id,
        participant_id = %ctx.participant.id,
        "Realtime client connected"
    );

    let sender_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => events::handle_frame(&ctx, connection_id, text.as_str()).await,
            Message::Close(_) => break,
            _ => debug!(%connection_id, "Ignoring non-text frame"),
        }
    }

    ctx.state.realtime.disconnect(connection_id).await;
    sender_task.abort();
    info!(
        %connection_id,
        participant_id = %ctx.participant.id,
        "Realtime client disconnected"
    );
}
