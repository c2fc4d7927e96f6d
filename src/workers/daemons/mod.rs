pub mod domain_events;
pub mod pubsub_consumer;
pub mod realtime_relay;
