pub mod messages;
pub mod participants;
