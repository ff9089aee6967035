use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Display attributes of a user currently viewing a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUser {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
}

/// Advisory mutation notices relayed between clients of a board room.
///
/// The server forwards these verbatim: entity payloads stay loosely typed
/// (`Value`) and are never validated or persisted; the REST mutation that
/// preceded the event is the authoritative write. Routing fields (ids) are
/// typed so receivers can dispatch without inspecting the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BoardEvent {
    CardCreated { card: Value },
    CardUpdated { card: Value },
    CardMoved { card: Value, from_list_id: Uuid, to_list_id: Uuid },
    CardDeleted { card_id: Uuid, list_id: Uuid },
    ListCreated { list: Value },
    ListUpdated { list: Value },
    ListDeleted { list_id: Uuid },
    ListReordered { lists: Value },
}

/// Frames a client may send over the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    JoinBoard { board_id: Uuid },
    LeaveBoard { board_id: Uuid },
    Board { board_id: Uuid, event: BoardEvent },
}

/// Frames the server sends to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Full presence list of a room; sent to every member (including the
    /// client whose join/leave triggered it).
    UsersOnline {
        board_id: Uuid,
        users: Vec<PresenceUser>,
    },
    /// Join failure, delivered only to the offending connection.
    Error { message: String },
    /// A [`BoardEvent`] relayed from another room member.
    Board { board_id: Uuid, event: BoardEvent },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_id() -> Uuid {
        "0a0e8b9e-5f52-4c4b-93d8-5f1a2b3c4d5e".parse().unwrap()
    }

    #[test]
    fn join_frame_wire_shape() {
        let frame = ClientFrame::JoinBoard { board_id: board_id() };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            serde_json::json!({
                "type": "join_board",
                "board_id": "0a0e8b9e-5f52-4c4b-93d8-5f1a2b3c4d5e"
            })
        );
    }

    #[test]
    fn relay_event_keeps_payload_verbatim() {
        let raw = serde_json::json!({
            "type": "board",
            "board_id": "0a0e8b9e-5f52-4c4b-93d8-5f1a2b3c4d5e",
            "event": {
                "event": "card_moved",
                "card": {"id": "x", "anything": ["goes", 42]},
                "from_list_id": "a6e1b13a-2e3f-4ad2-8a30-55ab54bd8e1c",
                "to_list_id": "b7f2c24b-3f40-4be3-9b41-66bc65ce9f2d"
            }
        });
        let frame: ClientFrame = serde_json::from_value(raw.clone()).unwrap();
        let ClientFrame::Board { board_id, event } = frame else {
            panic!("expected board frame");
        };
        // Re-emitting the event as a server frame must not alter the payload.
        let out = ServerFrame::Board { board_id, event };
        assert_eq!(serde_json::to_value(&out).unwrap(), raw);
    }

    #[test]
    fn malformed_frame_fails_to_parse() {
        // Unknown event kinds and missing routing ids are both rejected;
        // the socket layer drops such frames silently.
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"shrug"}"#).is_err());
        assert!(
            serde_json::from_str::<ClientFrame>(
                r#"{"type":"board","board_id":"0a0e8b9e-5f52-4c4b-93d8-5f1a2b3c4d5e","event":{"event":"card_deleted"}}"#
            )
            .is_err()
        );
    }

    #[test]
    fn users_online_lists_presence() {
        let frame = ServerFrame::UsersOnline {
            board_id: board_id(),
            users: vec![PresenceUser {
                id: "7d5d2f3a-1b2c-4d5e-8f90-123456789abc".parse().unwrap(),
                name: "dana".into(),
                avatar: None,
            }],
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "users_online");
        assert_eq!(value["users"][0]["name"], "dana");
    }
}
