pub mod conversations;
pub mod interests;
pub mod messages;
pub mod participants;
pub mod realtime;
