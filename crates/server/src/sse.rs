//! JSON-RPC over Server-Sent Events.
//!
//! `GET /sse` opens a session: the first event names the endpoint the
//! client posts to, then every JSON-RPC response arrives as a `message`
//! event on the stream. `POST /messages?session=` carries the requests.

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;

use crate::state::SharedState;

pub async fn sse_connect(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (session_id, rx) = state.sessions.open().await;
    tracing::info!(session = %session_id, "SSE session opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?session={session_id}"));

    let responses = ReceiverStream::new(rx)
        .map(|msg| Event::default().event("message").data(msg));

    let stream = stream::once(async move { endpoint })
        .chain(responses)
        .map(Ok);

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Deserialize)]
pub struct MessageParams {
    pub session: String,
}

pub async fn post_message(
    State(state): State<SharedState>,
    Query(params): Query<MessageParams>,
    body: String,
) -> Result<StatusCode, (StatusCode, String)> {
    let sender = state.sessions.sender(&params.session).await.ok_or((
        StatusCode::NOT_FOUND,
        format!("unknown session '{}'", params.session),
    ))?;

    if let Some(response) = state.service.handle_line(&body).await {
        let json = serde_json::to_string(&response)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
        if sender.send(json).await.is_err() {
            // Client dropped the event stream; forget the session.
            state.sessions.close(&params.session).await;
            return Err((
                StatusCode::GONE,
                format!("session '{}' is closed", params.session),
            ));
        }
    }

    Ok(StatusCode::ACCEPTED)
}
