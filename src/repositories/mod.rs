pub mod memory;
pub mod messages;
pub mod participants;
