pub mod handlers;

use crate::common::init;
use crate::settings::AppSettings;
use crate::workers::daemons::domain_events;
use crate::workers::daemons::pubsub_consumer::handlers::interest_submitted;
use futures::StreamExt;
use std::pin::pin;
use tracing::{error, info, warn};

pub const INTEREST_SUBMITTED_CHANNEL: &str = "marketplace:interests:submitted";

pub async fn serve(settings: &AppSettings) -> anyhow::Result<()> {
    let (state, receiver) = init::initialize_state(settings).await?;
    tokio::spawn(domain_events::serve(state.clone(), receiver));

    let redis_client = redis::Client::open(settings.redis_url.as_str())?;
    let mut pubsub = redis_client.get_async_pubsub().await?;
    pubsub.subscribe(INTEREST_SUBMITTED_CHANNEL).await?;
    info!("Subscribed to business event channels");

    let mut messages = pin!(pubsub.on_message());
    while let Some(msg) = messages.next().await {
        let ctx = state.clone();
        tokio::spawn(async move {
            let channel_name = msg.get_channel_name().to_owned();
            let result = match channel_name.as_str() {
                INTEREST_SUBMITTED_CHANNEL => interest_submitted::handle(&ctx, msg).await,
                _ => {
                    warn!("Unknown pubsub channel message: {}", channel_name);
                    Ok(())
                }
            };
            if let Err(e) = result {
                error!("Failed to handle pubsub message: {}", e.code());
            }
        });
    }
    anyhow::bail!("redis pubsub connection closed")
}
