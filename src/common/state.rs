use crate::common::context::Context;
use crate::common::domain_events::DomainEventBus;
use crate::common::realtime::RealtimeChannel;
use crate::repositories::messages::MessageStore;
use crate::repositories::participants::ParticipantDirectory;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub messages: Arc<dyn MessageStore>,
    pub participants: Arc<dyn ParticipantDirectory>,
    pub realtime: RealtimeChannel,
    pub domain_events: DomainEventBus,
}

impl Context for AppState {
    fn messages(&self) -> &dyn MessageStore {
        self.messages.as_ref()
    }

    fn participants(&self) -> &dyn ParticipantDirectory {
        self.participants.as_ref()
    }

    fn realtime(&self) -> &RealtimeChannel {
        &self.realtime
    }

    fn domain_events(&self) -> &DomainEventBus {
        &self.domain_events
    }
}
