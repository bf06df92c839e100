//! WebSocket transport for agents and the observer.

use std::sync::Arc;

use axum::{
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{Sink, SinkExt, Stream, StreamExt, future};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, warn};

use crate::{
    connections::Outbound,
    hub::Hub,
    router::{AgentConnection, Frame, MessageRouter, ObserverConnection},
};

/// Agent WebSocket upgrade handler, mounted at `/ws/{agent_name}`.
///
/// `Path` percent-decodes the segment, so the registry key is the plain name.
pub async fn agent_ws_handler(
    ws: WebSocketUpgrade,
    Path(agent_name): Path<String>,
    State(hub): State<Arc<Hub>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_agent_socket(socket, hub, agent_name))
}

/// Observer WebSocket upgrade handler, mounted at `/chatlist_ws`.
pub async fn observer_ws_handler(
    ws: WebSocketUpgrade,
    State(hub): State<Arc<Hub>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_observer_socket(socket, hub))
}

async fn handle_agent_socket(socket: WebSocket, hub: Arc<Hub>, agent_name: String) {
    let (sender, receiver) = socket.split();
    let (tx, send_task) = spawn_writer(sender, agent_name.clone());

    let connection = AgentConnection::new(MessageRouter::new(hub), agent_name, tx);
    connection.run(inbound_frames(receiver)).await;

    send_task.abort();
}

async fn handle_observer_socket(socket: WebSocket, hub: Arc<Hub>) {
    let (sender, receiver) = socket.split();
    let (tx, send_task) = spawn_writer(sender, "observer".to_string());

    ObserverConnection::new(hub, tx)
        .run(inbound_frames(receiver))
        .await;

    send_task.abort();
}

/// Spawn the task forwarding queued frames to the socket.
///
/// The task ends when the peer stops accepting writes, which drops the
/// queue's receiver and makes further sends fail.
fn spawn_writer<S>(mut sink: S, peer: String) -> (Outbound, JoinHandle<()>)
where
    S: Sink<Message> + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let send_task = tokio::spawn(async move {
        while let Some(json) = rx.recv().await {
            if sink.send(Message::Text(json.into())).await.is_err() {
                debug!(peer = %peer, "write loop closed");
                break;
            }
        }
    });

    (tx, send_task)
}

/// Map socket messages to transport-neutral frames.
fn inbound_frames<S>(receiver: S) -> impl Stream<Item = Frame>
where
    S: Stream<Item = Result<Message, axum::Error>>,
{
    receiver.filter_map(|msg| future::ready(to_frame(msg)))
}

fn to_frame(msg: Result<Message, axum::Error>) -> Option<Frame> {
    match msg {
        Ok(Message::Text(text)) => Some(Frame::Text(text.as_str().to_owned())),
        Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
            Ok(s) => Some(Frame::Text(s)),
            Err(_) => {
                warn!("Dropping non UTF-8 binary frame");
                None
            }
        },
        Ok(Message::Close(_)) => Some(Frame::Close),
        Ok(_) => None,
        Err(e) => {
            error!("WebSocket error: {e}");
            Some(Frame::Close)
        }
    }
}
