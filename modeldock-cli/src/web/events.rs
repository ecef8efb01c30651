//! Server-sent progress events.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use tracing::warn;

use super::AppState;

/// Stream the current progress record, then every change to it.
pub async fn status_events(
    State(app): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut updates = app.subscribe();
    updates.mark_changed();

    let stream = stream::unfold(updates, |mut updates| async move {
        updates.changed().await.ok()?;
        let state = updates.borrow_and_update().clone();
        let event = Event::default()
            .event("status")
            .json_data(&state)
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to encode status event");
                Event::default().event("status").data("{}")
            });
        Some((Ok(event), updates))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
