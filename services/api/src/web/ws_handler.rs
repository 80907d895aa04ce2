//! services/api/src/web/ws_handler.rs
//!
//! The live-synchronization WebSocket. Each connection carries one
//! chat-list feed for the whole session and at most one message-thread
//! feed, switched as the user moves between conversations. Feeds are
//! cancelled on switch and on disconnect; the underlying document watch
//! ends when its stream is dropped.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use samvaad_core::ports::AuthUser;
use samvaad_core::sync;
use std::sync::Arc;
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

type WsSink = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user: AuthUser) {
    info!("New WebSocket connection established for user: {}", user.uid);

    // The sender is shared between the feed tasks and this control loop.
    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSink = Arc::new(Mutex::new(sender));

    // --- 1. Chat-list feed, running for the whole connection ---
    let list_token = CancellationToken::new();
    let list_task = tokio::spawn(forward_chat_list(
        app_state.clone(),
        user.uid.clone(),
        ws_sender.clone(),
        list_token.clone(),
    ));

    // --- 2. Control loop: thread switching ---
    let mut thread_feed: Option<(CancellationToken, JoinHandle<()>)> = None;

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::WatchThread { chat_id }) => {
                    stop_thread_feed(&mut thread_feed);
                    let token = CancellationToken::new();
                    let task = tokio::spawn(forward_thread(
                        app_state.clone(),
                        chat_id,
                        ws_sender.clone(),
                        token.clone(),
                    ));
                    thread_feed = Some((token, task));
                }
                Ok(ClientMessage::StopThread) => {
                    stop_thread_feed(&mut thread_feed);
                }
                Err(e) => {
                    warn!("Failed to deserialize client message: {}", e);
                }
            },
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- 3. Cleanup ---
    list_token.cancel();
    list_task.abort();
    stop_thread_feed(&mut thread_feed);
    info!("WebSocket connection closed for user: {}", user.uid);
}

/// Tears down the current thread feed, if any. Dropping the feed task
/// drops its document watch, which is the unsubscribe.
fn stop_thread_feed(feed: &mut Option<(CancellationToken, JoinHandle<()>)>) {
    if let Some((token, task)) = feed.take() {
        token.cancel();
        task.abort();
    }
}

/// Forwards the joined, sorted chat list to the client on every change
/// notification until cancelled or the socket goes away.
async fn forward_chat_list(
    app_state: Arc<AppState>,
    uid: String,
    ws_sender: WsSink,
    token: CancellationToken,
) {
    let mut feed = match sync::watch_chat_list(app_state.store.clone(), &uid).await {
        Ok(feed) => feed,
        Err(e) => {
            warn!("Chat-list feed for {uid} failed to start: {e}");
            let _ = send_message(
                &ws_sender,
                &ServerMessage::Error {
                    message: "Failed to load your chats.".to_string(),
                },
            )
            .await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            item = feed.next() => {
                let Some(chats) = item else { break };
                if send_message(&ws_sender, &ServerMessage::ChatList { chats }).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Forwards one conversation's full message sequence to the client on
/// every change notification until cancelled.
async fn forward_thread(
    app_state: Arc<AppState>,
    chat_id: String,
    ws_sender: WsSink,
    token: CancellationToken,
) {
    let mut feed = match sync::watch_thread(app_state.store.clone(), &chat_id).await {
        Ok(feed) => feed,
        Err(e) => {
            warn!("Thread feed for {chat_id} failed to start: {e}");
            let _ = send_message(
                &ws_sender,
                &ServerMessage::Error {
                    message: "Failed to load this conversation.".to_string(),
                },
            )
            .await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            item = feed.next() => {
                let Some(messages) = item else { break };
                let out = ServerMessage::Thread {
                    chat_id: chat_id.clone(),
                    messages,
                };
                if send_message(&ws_sender, &out).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn send_message(ws_sender: &WsSink, msg: &ServerMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).expect("server messages always serialize");
    ws_sender.lock().await.send(Message::Text(json.into())).await
}
