use crate::common::context::Context;
use crate::common::domain_events::{DomainEventBus, DomainEventReceiver};
use crate::common::error::AppError;
use crate::common::realtime::RealtimeChannel;
use crate::common::state::AppState;
use crate::models::participants::Participant;
use crate::repositories::messages::MessageStore;
use crate::repositories::participants::ParticipantDirectory;
use crate::settings::AppSettings;
use crate::usecases::participants;
use crate::workers::daemons::{domain_events, realtime_relay};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;
use tracing::{error, info};

pub mod v1;
pub mod ws;

/// An authenticated request.
pub struct RequestContext {
    pub state: AppState,
    pub participant: Participant,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws::connect))
        .nest("/api/v1", v1::router())
}

pub async fn index() -> &'static str {
    "Running marketplace-messaging v0.1"
}

pub async fn serve(settings: &AppSettings) -> anyhow::Result<()> {
    let (state, receiver) = crate::common::init::initialize_state(settings).await?;
    spawn_daemons(settings, &state, receiver);

    let listener = TcpListener::bind((settings.app_host, settings.app_port)).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router().with_state(state)).await?;
    Ok(())
}

fn spawn_daemons(settings: &AppSettings, state: &AppState, receiver: DomainEventReceiver) {
    let relay_state = state.clone();
    let redis_url = settings.redis_url.clone();
    tokio::spawn(async move {
        if let Err(e) = realtime_relay::serve(&redis_url, relay_state).await {
            error!("Realtime relay listener stopped: {e:?}");
        }
    });
    tokio::spawn(domain_events::serve(state.clone(), receiver));
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned());
    if header.is_some() {
        return header;
    }
    // websocket clients in browsers cannot set headers
    Query::<TokenQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(query)| query.token)
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthenticated)?;
        let participant = participants::authenticate(state, &token).await?;
        Ok(Self {
            state: state.clone(),
            participant,
        })
    }
}

impl Context for RequestContext {
    fn messages(&self) -> &dyn MessageStore {
        self.state.messages()
    }

    fn participants(&self) -> &dyn ParticipantDirectory {
        self.state.participants()
    }

    fn realtime(&self) -> &RealtimeChannel {
        self.state.realtime()
    }

    fn domain_events(&self) -> &DomainEventBus {
        self.state.domain_events()
    }
}

/// JSON request body whose rejection renders like every other api error.
pub struct JsonBody<T>(pub T);

impl<S: Send + Sync, T: DeserializeOwned> FromRequest<S> for JsonBody<T> {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(_) => Err(AppError::DecodingRequestFailed),
        }
    }
}
