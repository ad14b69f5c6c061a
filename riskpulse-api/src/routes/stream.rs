//! Live dashboard stats over server-sent events
//!
//! Each request opens its own hub session. The session lives exactly as
//! long as the response body: when the client goes away axum drops the
//! stream, which tears down both session loops.

use std::convert::Infallible;

use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, Sse},
        IntoResponse,
    },
    routing::get,
    Router,
};
use futures_util::StreamExt;
use riskpulse_core::SessionEvent;
use tracing::info;

use crate::AppState;

/// Create stream routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/stream", get(stream_stats))
}

async fn stream_stats(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.hub.open_session();
    info!("Client subscribed to live stats ({})", session.id());

    let events = session.map(|event| Ok::<_, Infallible>(to_sse(&event)));

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(events),
    )
}

fn to_sse(event: &SessionEvent) -> Event {
    Event::default()
        .event(event.event.kind().as_str())
        .id(event.seq.to_string())
        .data(event.event.data())
}
