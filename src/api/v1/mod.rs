pub mod conversations;
pub mod messages;

use crate::common::state::AppState;
use axum::Router;
use axum::routing::{get, post};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", post(messages::send))
        .route(
            "/conversations",
            get(conversations::list).post(conversations::open),
        )
        .route(
            "/conversations/{conversation_id}/messages",
            get(conversations::messages),
        )
        .route(
            "/conversations/{conversation_id}/reply",
            post(conversations::reply),
        )
        .route(
            "/conversations/{conversation_id}/unread",
            get(conversations::unread),
        )
}
