use crate::common::domain_events::DomainEventBus;
use crate::common::realtime::RealtimeChannel;
use crate::repositories::messages::MessageStore;
use crate::repositories::participants::ParticipantDirectory;

pub trait Context: Sync + Send {
    fn messages(&self) -> &dyn MessageStore;
    fn participants(&self) -> &dyn ParticipantDirectory;
    fn realtime(&self) -> &RealtimeChannel;
    fn domain_events(&self) -> &DomainEventBus;
}
