//! Server-sent event stream of committed ledger changes.
//!
//! Account holders only see events touching their own data. Administrators
//! see everything. A subscriber that falls behind the buffer receives a
//! `resync` event and should reload its state.

use std::convert::Infallible;

use axum::{
    Router,
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::get,
};
use futures::Stream;
use poolbank_core::ledger::CommittedEvent;
use poolbank_shared::types::UserId;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, warn};

use crate::{AppState, middleware::AuthUser};

/// Creates the event stream routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/events", get(stream_events))
}

/// Who is listening, and therefore which events pass.
#[derive(Debug, Clone, Copy)]
enum Audience {
    Admin,
    Holder(UserId),
}

impl Audience {
    fn admits(self, committed: &CommittedEvent) -> bool {
        match self {
            Self::Admin => true,
            Self::Holder(user) => committed.event.touches(user),
        }
    }
}

fn to_sse(committed: &CommittedEvent) -> Option<SseEvent> {
    match SseEvent::default()
        .event(committed.event.name())
        .id(committed.sequence.to_string())
        .json_data(committed)
    {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, sequence = committed.sequence, "Failed to encode ledger event");
            None
        }
    }
}

/// GET `/events` - Stream ledger events as they commit.
async fn stream_events(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let audience = if auth.is_admin() {
        Audience::Admin
    } else {
        Audience::Holder(auth.user_id())
    };
    debug!(user_id = %auth.user_id(), ?audience, "Event stream opened");

    let stream = BroadcastStream::new(state.store.subscribe()).filter_map(move |item| {
        let event = match item {
            Ok(committed) if audience.admits(&committed) => to_sse(&committed),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "Event subscriber lagged");
                Some(
                    SseEvent::default()
                        .event("resync")
                        .data(format!("{{\"skipped\":{skipped}}}")),
                )
            }
        };
        event.map(Ok)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
