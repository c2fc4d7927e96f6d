use crate::common::context::Context;
use crate::common::domain_events::{DomainEvent, DomainEventReceiver};
use crate::usecases::interests;
use tracing::{debug, info};

/// Drains the domain-event bus until every publisher is gone.
///
/// Each event is handled in its own task so a slow or failing handler never
/// holds up the others.
pub async fn serve<C: Context + Clone + 'static>(ctx: C, mut receiver: DomainEventReceiver) {
    info!("Domain event dispatcher started");
    while let Some(event) = receiver.recv().await {
        debug!(event = event.name(), "Dispatching domain event");
        let ctx = ctx.clone();
        tokio::spawn(async move {
            match event {
                DomainEvent::InterestSubmitted(event) => {
                    interests::notify_submitted(&ctx, event).await
                }
            }
        });
    }
    info!("Domain event dispatcher stopped");
}
