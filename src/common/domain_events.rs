use crate::models::interests::InterestSubmitted;
use tokio::sync::mpsc;
use tracing::error;

/// Business events the messaging core reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    InterestSubmitted(InterestSubmitted),
}

impl DomainEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            DomainEvent::InterestSubmitted(_) => "interest_submitted",
        }
    }
}

pub type DomainEventReceiver = mpsc::UnboundedReceiver<DomainEvent>;

/// Fire-and-forget queue between business actions and their messaging side effects.
///
/// Publishing never blocks and never reports failure to the publisher; the
/// dispatcher on the receiving side handles each event independently.
#[derive(Clone)]
pub struct DomainEventBus {
    sender: mpsc::UnboundedSender<DomainEvent>,
}

impl DomainEventBus {
    pub fn new() -> (Self, DomainEventReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn publish(&self, event: DomainEvent) {
        if let Err(e) = self.sender.send(event) {
            error!(
                event = e.0.name(),
                "Domain event bus is closed, dropping event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::participants::ParticipantId;

    fn interest() -> DomainEvent {
        DomainEvent::InterestSubmitted(InterestSubmitted {
            interest_id: "i1".to_owned(),
            submitter_id: ParticipantId::from("u1"),
            title: None,
        })
    }

    #[tokio::test]
    async fn published_events_reach_the_receiver() {
        let (bus, mut receiver) = DomainEventBus::new();
        bus.publish(interest());
        assert_eq!(receiver.recv().await, Some(interest()));
    }

    #[test]
    fn publishing_to_a_closed_bus_does_not_panic() {
        let (bus, receiver) = DomainEventBus::new();
        drop(receiver);
        bus.publish(interest());
    }
}
