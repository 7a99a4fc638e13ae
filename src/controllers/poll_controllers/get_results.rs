use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use mongodb::bson::oid::ObjectId;
use tracing::info;

use crate::models::tally_models::TallySnapshot;
use crate::services::subscribers::{SubscriberId, SubscriberRegistry};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

pub async fn get_results(
    Path(poll_id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<TallySnapshot>> {
    let poll_id = ObjectId::parse_str(&poll_id)
        .map_err(|_| AppError::BadRequest("Invalid Poll id".to_string()))?;

    let snapshot = state.tally.compute_tally(poll_id).await?;

    Ok(Json(snapshot))
}

/// Unregisters the SSE subscriber once axum drops the response stream.
struct StreamGuard {
    registry: Arc<SubscriberRegistry>,
    id: SubscriberId,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if self.registry.unregister(self.id) {
            info!(subscriber = %self.id, "SSE client disconnected");
        }
    }
}

/// Server-sent events feed of every tally broadcast.
pub async fn results_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let registration = state.registry.register();
    info!(subscriber = %registration.id, "SSE client connected");

    let guard = StreamGuard {
        registry: state.registry.clone(),
        id: registration.id,
    };

    let stream = stream::unfold((registration.outbox, guard), |(mut outbox, guard)| async move {
        let payload = outbox.recv().await?;
        Some((Ok(Event::default().data(payload.as_ref())), (outbox, guard)))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
