use crate::common::context::Context;
use crate::common::realtime::RELAY_CHANNEL;
use crate::common::redis_json::Json;
use crate::models::realtime::RelayEnvelope;
use futures::StreamExt;
use redis::Msg;
use std::pin::pin;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Delivers envelopes published by any instance to the subscribers of this one.
///
/// Reconnects after losing the redis subscription. Returns only when the
/// redis url cannot be parsed.
pub async fn serve<C: Context>(redis_url: &str, ctx: C) -> anyhow::Result<()> {
    let client = redis::Client::open(redis_url)?;
    loop {
        match listen(&client, &ctx).await {
            Ok(()) => warn!("Realtime relay subscription ended, reconnecting"),
            Err(e) => error!("Realtime relay subscription failed, reconnecting: {e:?}"),
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn listen<C: Context>(client: &redis::Client, ctx: &C) -> anyhow::Result<()> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(RELAY_CHANNEL).await?;
    info!(channel = RELAY_CHANNEL, "Realtime relay subscribed");

    let mut messages = pin!(pubsub.on_message());
    while let Some(msg) = messages.next().await {
        relay(ctx, msg).await;
    }
    Ok(())
}

async fn relay<C: Context>(ctx: &C, msg: Msg) {
    let envelope = match msg.get_payload::<Json<RelayEnvelope>>() {
        Ok(envelope) => envelope.into_inner(),
        Err(e) => {
            warn!("Dropping undecodable relay envelope: {e}");
            return;
        }
    };
    match ctx.realtime().deliver(&envelope).await {
        Ok(delivered) => debug!(delivered, "Relayed realtime event"),
        Err(e) => error!("Failed to deliver relayed realtime event: {e:?}"),
    }
}
