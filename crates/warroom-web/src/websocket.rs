//! WebSocket push delivery.
//!
//! On connect the client supplies its message-id cursor (`?since=N`, default
//! 0); the server sends the backlog after that cursor, then live messages as
//! they are appended. Backlog and live stream are taken atomically from the
//! session, so nothing is skipped or duplicated across a reconnect. A client
//! that falls behind the delivery buffer receives a `lagged` frame and should
//! reconnect with its cursor.

use axum::{
    extract::{
        Path, Query, State, WebSocketUpgrade,
        ws::{Message as WsMessage, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use warroom_core::{Session, SessionId};
use warroom_proto::Message;

use crate::AppState;
use crate::models::SinceQuery;

/// Frames sent to WebSocket clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WsFrame {
    /// Connection accepted; `last_id` is the cursor the backlog starts from.
    Connected { session_id: SessionId, last_id: u64 },
    /// One transcript message, in id order, each delivered at most once.
    Message { message: Message },
    /// The client fell behind the delivery buffer and missed `missed`
    /// messages; it should reconnect with its last seen id as the cursor.
    Lagged { missed: u64 },
}

/// Returns true if a frame for `id` should be sent to a client whose last
/// delivered id is `last_id`.
fn is_new(last_id: u64, id: u64) -> bool {
    id > last_id
}

/// WebSocket route handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(id): Path<SessionId>,
    Query(query): Query<SinceQuery>,
    State(state): State<AppState>,
) -> Response {
    match state.manager.get(id) {
        Some(session) => ws.on_upgrade(move |socket| handle_socket(socket, session, query.since)),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Handle an individual WebSocket connection.
async fn handle_socket(socket: WebSocket, session: Session, since: u64) {
    let (mut sender, mut receiver) = socket.split();
    let (backlog, mut events) = session.subscribe(since);

    let connected = WsFrame::Connected {
        session_id: session.id(),
        last_id: since,
    };
    if send_frame(&mut sender, &connected).await.is_err() {
        return;
    }

    let mut last_id = since;
    for message in backlog {
        last_id = message.id;
        if send_frame(&mut sender, &WsFrame::Message { message })
            .await
            .is_err()
        {
            return;
        }
    }

    // Forward live messages until the client goes away.
    let send_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(message) => {
                    if !is_new(last_id, message.id) {
                        continue;
                    }
                    last_id = message.id;
                    if send_frame(&mut sender, &WsFrame::Message { message })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "WebSocket client lagged behind delivery buffer");
                    if send_frame(&mut sender, &WsFrame::Lagged { missed })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Process incoming messages (for ping/pong and close).
    while let Some(result) = receiver.next().await {
        match result {
            Ok(WsMessage::Close(_)) => break,
            Ok(WsMessage::Ping(data)) => {
                // Pong is handled automatically by axum
                tracing::debug!("Received ping: {:?}", data);
            }
            Err(_) => break,
            _ => {}
        }
    }

    send_task.abort();
}

async fn send_frame(
    sender: &mut (impl SinkExt<WsMessage> + Unpin),
    frame: &WsFrame,
) -> Result<(), ()> {
    let json = serde_json::to_string(frame).map_err(|_| ())?;
    sender.send(WsMessage::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use warroom_core::SessionConfig;
    use warroom_proto::{MessageDraft, MessageType, ParticipantId, Recipient};

    #[test]
    fn test_frame_serializes_with_event_tag() {
        let frame = WsFrame::Lagged { missed: 3 };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"event\":\"lagged\""));
        assert!(json.contains("\"missed\":3"));

        let parsed: WsFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_message_frame_roundtrip() {
        let session = Session::new(SessionConfig::default()).unwrap();
        let message = session
            .submit(MessageDraft::new(
                ParticipantId::Market,
                Recipient::All,
                MessageType::Introduction,
                "hello",
            ))
            .unwrap();

        let frame = WsFrame::Message { message };
        let json = serde_json::to_string(&frame).unwrap();
        let parsed: WsFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_cursor_dedup() {
        assert!(is_new(0, 1));
        assert!(!is_new(5, 5));
        assert!(!is_new(5, 4));
        assert!(is_new(5, 6));
    }

    #[tokio::test]
    async fn test_backlog_and_live_have_no_gap_or_overlap() {
        let session = Session::new(SessionConfig::default()).unwrap();
        session
            .submit(MessageDraft::new(
                ParticipantId::Market,
                Recipient::All,
                MessageType::Introduction,
                "one",
            ))
            .unwrap();

        let (backlog, mut events) = session.subscribe(0);
        assert_eq!(backlog.len(), 1);

        session
            .submit(MessageDraft::new(
                ParticipantId::Strategy,
                Recipient::All,
                MessageType::Introduction,
                "two",
            ))
            .unwrap();

        let live = events.recv().await.unwrap();
        assert_eq!(live.id, backlog.last().unwrap().id + 1);
    }
}
