#![allow(dead_code)]

use marketplace_messaging::common::domain_events::{DomainEventBus, DomainEventReceiver};
use marketplace_messaging::common::realtime::RealtimeChannel;
use marketplace_messaging::common::state::AppState;
use marketplace_messaging::models::participants::{Participant, ParticipantId, Role};
use marketplace_messaging::repositories::memory::{
    InMemoryMessageStore, InMemoryParticipantDirectory,
};
use std::sync::Arc;

pub struct Fixture {
    pub state: AppState,
    pub directory: Arc<InMemoryParticipantDirectory>,
    pub domain_events: Option<DomainEventReceiver>,
}

/// State with one admin (`a1`) and two users (`u1`, `u2`), each holding a
/// bearer token named `token-<id>`.
pub async fn fixture() -> Fixture {
    fixture_with_channel(RealtimeChannel::local(16)).await
}

pub async fn fixture_with_channel(realtime: RealtimeChannel) -> Fixture {
    let directory = Arc::new(InMemoryParticipantDirectory::new());
    for (id, name, role) in [
        ("a1", "Support", "admin"),
        ("u1", "Ada", "user"),
        ("u2", "Grace", "user"),
    ] {
        directory
            .insert_account(id, name, &format!("{id}@example.com"), role)
            .await;
        directory
            .insert_session(&format!("token-{id}"), id, role)
            .await;
    }

    let (domain_events, receiver) = DomainEventBus::new();
    let state = AppState {
        messages: Arc::new(InMemoryMessageStore::new()),
        participants: directory.clone(),
        realtime,
        domain_events,
    };
    Fixture {
        state,
        directory,
        domain_events: Some(receiver),
    }
}

pub fn admin() -> Participant {
    Participant {
        id: ParticipantId::from("a1"),
        role: Role::Admin,
    }
}

pub fn user(id: &str) -> Participant {
    Participant {
        id: ParticipantId::from(id),
        role: Role::User,
    }
}

/// Same participants as [`fixture`], minus the admin account.
pub async fn fixture_without_admin() -> Fixture {
    let directory = Arc::new(InMemoryParticipantDirectory::new());
    directory
        .insert_account("u1", "Ada", "u1@example.com", "user")
        .await;
    let (domain_events, receiver) = DomainEventBus::new();
    let state = AppState {
        messages: Arc::new(InMemoryMessageStore::new()),
        participants: directory.clone(),
        realtime: RealtimeChannel::local(16),
        domain_events,
    };
    Fixture {
        state,
        directory,
        domain_events: Some(receiver),
    }
}
