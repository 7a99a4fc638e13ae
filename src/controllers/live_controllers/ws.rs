use std::{fmt::Display, time::Duration};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::services::subscribers::{Registration, SubscriberRegistry};
use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve_subscriber(socket, state))
}

async fn serve_subscriber(socket: WebSocket, state: AppState) {
    let registration = state.registry.register();
    info!(subscriber = %registration.id, "A new client connected");

    let (sender, receiver) = socket.split();
    pump(
        &state.registry,
        registration,
        state.config.delivery_timeout,
        sender,
        receiver,
    )
    .await;
}

/// Pumps broadcast payloads from the subscriber's outbox into `sender` until
/// either side goes away, then unregisters the subscriber. Every send is
/// bounded by `delivery_timeout`; a stalled client is treated as gone.
pub(crate) async fn pump<Tx, Rx, E>(
    registry: &SubscriberRegistry,
    registration: Registration,
    delivery_timeout: Duration,
    sender: Tx,
    receiver: Rx,
) where
    Tx: Sink<Message>,
    Tx::Error: Display,
    Rx: Stream<Item = Result<Message, E>>,
    E: Display,
{
    let Registration { id, mut outbox } = registration;
    tokio::pin!(sender);
    tokio::pin!(receiver);

    loop {
        tokio::select! {
            payload = outbox.recv() => {
                let payload = match payload {
                    Some(payload) => payload,
                    // Closed by the registry after a failed delivery.
                    None => break,
                };
                match timeout(delivery_timeout, sender.send(Message::Text(payload.to_string()))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!(subscriber = %id, "Send failed: {}", e);
                        break;
                    }
                    Err(_) => {
                        warn!(subscriber = %id, "Send timed out after {:?}", delivery_timeout);
                        break;
                    }
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(subscriber = %id, "Receive failed: {}", e);
                    break;
                }
            }
        }
    }

    registry.unregister(id);
    info!(subscriber = %id, "Client disconnected");
}
