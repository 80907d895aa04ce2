//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and
//! the API server for live chat synchronization.

use samvaad_core::domain::{ChatPreview, Message};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
/// The chat-list feed needs no request: it starts when the socket opens.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Start (or switch) the message-thread feed to one conversation.
    /// Any previously watched thread is torn down first.
    WatchThread { chat_id: String },

    /// Stop the message-thread feed, e.g. when the user leaves the chat
    /// view. The chat-list feed keeps running.
    StopThread,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
/// Both feeds replace the client's state wholesale; there is no diffing.
#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// The full, recency-sorted chat list after a change notification.
    ChatList { chats: Vec<ChatPreview> },

    /// The full message sequence of the watched thread after a change.
    Thread {
        chat_id: String,
        messages: Vec<Message>,
    },

    /// Reports an error to the client, which should display the message.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_from_tagged_json() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"watch_thread","chatId":"c1"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::WatchThread { chat_id } if chat_id == "c1"));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"stop_thread"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::StopThread));
    }
}
