pub mod context;
pub mod domain_events;
pub mod env;
pub mod error;
pub mod init;
pub mod realtime;
pub mod redis_json;
pub mod redis_pool;
pub mod state;
