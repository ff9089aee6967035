//! Board rooms: who is connected where, and frame fan-out.
//!
//! A room exists only while it has members; the registry creates it on the
//! first join and drops it when the last member leaves. Membership is per
//! connection, not per user: one user with two tabs holds two memberships,
//! and the presence list collapses them to one entry. Delivery is
//! best-effort, at most once, with no ordering guarantee across senders; a
//! send to a connection that is going away is silently lost.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use api_types::{PresenceUser, ServerFrame};
use axum::extract::ws::{Message, Utf8Bytes};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// Identifies one websocket connection for the lifetime of the process.
pub type ConnId = u64;

struct RoomMember {
    user: PresenceUser,
    tx: mpsc::UnboundedSender<Message>,
}

#[derive(Default)]
struct BoardRoom {
    members: HashMap<ConnId, RoomMember>,
}

/// All live board rooms. Constructed once at startup and shared through
/// [`crate::AppState`]; nothing in here touches the database.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<Uuid, BoardRoom>>,
    next_conn_id: AtomicU64,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the id a connection keeps for its lifetime. Ids increase
    /// monotonically, which is what makes presence last-write-wins.
    pub fn register_conn(&self) -> ConnId {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Adds the connection to the board's room, creating the room if this
    /// is the first member, and announces the new presence list to every
    /// member including the joiner. Joining a room twice just refreshes the
    /// stored user attributes.
    pub async fn join(
        &self,
        board_id: Uuid,
        conn_id: ConnId,
        user: PresenceUser,
        tx: mpsc::UnboundedSender<Message>,
    ) {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(board_id).or_default();
        room.members.insert(conn_id, RoomMember { user, tx });
        announce_presence(board_id, room);
    }

    /// Removes the connection from one room. The remaining members get a
    /// fresh presence list; an emptied room is dropped.
    pub async fn leave(&self, board_id: Uuid, conn_id: ConnId) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get_mut(&board_id) {
            room.members.remove(&conn_id);
            if room.members.is_empty() {
                rooms.remove(&board_id);
            } else {
                announce_presence(board_id, room);
            }
        }
    }

    /// Removes the connection from every room it joined. Called when the
    /// socket closes for any reason.
    pub async fn disconnect(&self, conn_id: ConnId) {
        let mut rooms = self.rooms.write().await;
        rooms.retain(|board_id, room| {
            if room.members.remove(&conn_id).is_none() {
                return true;
            }
            if room.members.is_empty() {
                return false;
            }
            announce_presence(*board_id, room);
            true
        });
    }

    /// Sends `frame` to every member of the board's room except `origin`.
    /// Unknown rooms are a no-op.
    pub async fn broadcast(&self, board_id: Uuid, origin: Option<ConnId>, frame: &ServerFrame) {
        let rooms = self.rooms.read().await;
        if let Some(room) = rooms.get(&board_id) {
            send_to_room(room, origin, frame);
        }
    }

    /// Current presence list of a room, one entry per distinct user. For a
    /// user with several connections the most recent connection's display
    /// attributes win.
    pub async fn presence(&self, board_id: Uuid) -> Vec<PresenceUser> {
        let rooms = self.rooms.read().await;
        rooms.get(&board_id).map(presence_of).unwrap_or_default()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

fn announce_presence(board_id: Uuid, room: &BoardRoom) {
    let frame = ServerFrame::UsersOnline {
        board_id,
        users: presence_of(room),
    };
    send_to_room(room, None, &frame);
}

fn send_to_room(room: &BoardRoom, origin: Option<ConnId>, frame: &ServerFrame) {
    let text: Utf8Bytes = match serde_json::to_string(frame) {
        Ok(serialized) => serialized.into(),
        Err(error) => {
            tracing::warn!(?error, "dropping unserializable frame");
            return;
        }
    };
    for (conn_id, member) in &room.members {
        if Some(*conn_id) == origin {
            continue;
        }
        // A closed receiver means the connection is mid-teardown; the frame
        // is simply lost.
        let _ = member.tx.send(Message::Text(text.clone()));
    }
}

fn presence_of(room: &BoardRoom) -> Vec<PresenceUser> {
    let mut conns: Vec<(&ConnId, &RoomMember)> = room.members.iter().collect();
    conns.sort_by_key(|(conn_id, _)| **conn_id);

    let mut users: Vec<PresenceUser> = Vec::new();
    for (_, member) in conns {
        if let Some(existing) = users.iter_mut().find(|u| u.id == member.user.id) {
            *existing = member.user.clone();
        } else {
            users.push(member.user.clone());
        }
    }
    users
}

#[cfg(test)]
mod tests {
    use api_types::BoardEvent;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;

    fn presence_user(name: &str) -> PresenceUser {
        PresenceUser {
            id: Uuid::new_v4(),
            name: name.into(),
            avatar: None,
        }
    }

    fn conn(registry: &RoomRegistry) -> (ConnId, mpsc::UnboundedSender<Message>, UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (registry.register_conn(), tx, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<Message>) -> Vec<ServerFrame> {
        let mut frames = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let Message::Text(text) = message {
                frames.push(serde_json::from_str(text.as_str()).unwrap());
            }
        }
        frames
    }

    fn last_presence(frames: &[ServerFrame]) -> Vec<String> {
        let mut names = Vec::new();
        for frame in frames {
            if let ServerFrame::UsersOnline { users, .. } = frame {
                names = users.iter().map(|u| u.name.clone()).collect();
            }
        }
        names
    }

    #[tokio::test]
    async fn join_announces_presence_to_everyone() {
        let registry = RoomRegistry::new();
        let board = Uuid::new_v4();
        let (c1, tx1, mut rx1) = conn(&registry);
        let (c2, tx2, mut rx2) = conn(&registry);

        registry.join(board, c1, presence_user("ana"), tx1).await;
        registry.join(board, c2, presence_user("ben"), tx2).await;

        // Both members converge on the same two-user list, the joiner's
        // frame included.
        assert_eq!(last_presence(&drain(&mut rx1)), vec!["ana", "ben"]);
        assert_eq!(last_presence(&drain(&mut rx2)), vec!["ana", "ben"]);
    }

    #[tokio::test]
    async fn leave_announces_and_drops_empty_rooms() {
        let registry = RoomRegistry::new();
        let board = Uuid::new_v4();
        let (c1, tx1, _rx1) = conn(&registry);
        let (c2, tx2, mut rx2) = conn(&registry);

        registry.join(board, c1, presence_user("ana"), tx1).await;
        registry.join(board, c2, presence_user("ben"), tx2).await;
        registry.leave(board, c1).await;

        assert_eq!(last_presence(&drain(&mut rx2)), vec!["ben"]);
        assert_eq!(registry.room_count().await, 1);

        registry.leave(board, c2).await;
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn disconnect_sweeps_every_room() {
        let registry = RoomRegistry::new();
        let board_a = Uuid::new_v4();
        let board_b = Uuid::new_v4();
        let (c1, tx1, _rx1) = conn(&registry);
        let (c2, tx2, mut rx2) = conn(&registry);

        registry.join(board_a, c1, presence_user("ana"), tx1.clone()).await;
        registry.join(board_b, c1, presence_user("ana"), tx1).await;
        registry.join(board_a, c2, presence_user("ben"), tx2).await;

        registry.disconnect(c1).await;

        // board_b emptied out; board_a told the survivor.
        assert_eq!(registry.room_count().await, 1);
        assert_eq!(last_presence(&drain(&mut rx2)), vec!["ben"]);
        assert!(registry.presence(board_b).await.is_empty());
    }

    #[tokio::test]
    async fn broadcast_skips_the_origin_connection() {
        let registry = RoomRegistry::new();
        let board = Uuid::new_v4();
        let (c1, tx1, mut rx1) = conn(&registry);
        let (c2, tx2, mut rx2) = conn(&registry);

        registry.join(board, c1, presence_user("ana"), tx1).await;
        registry.join(board, c2, presence_user("ben"), tx2).await;
        drain(&mut rx1);
        drain(&mut rx2);

        let frame = ServerFrame::Board {
            board_id: board,
            event: BoardEvent::ListDeleted {
                list_id: Uuid::new_v4(),
            },
        };
        registry.broadcast(board, Some(c1), &frame).await;

        assert!(drain(&mut rx1).is_empty(), "origin must not hear its own event");
        assert_eq!(drain(&mut rx2).len(), 1);
    }

    #[tokio::test]
    async fn one_user_with_two_connections_is_one_presence_entry() {
        let registry = RoomRegistry::new();
        let board = Uuid::new_v4();
        let ana = presence_user("ana");
        let (c1, tx1, _rx1) = conn(&registry);
        let (c2, tx2, _rx2) = conn(&registry);
        let (c3, tx3, mut rx3) = conn(&registry);

        registry.join(board, c1, ana.clone(), tx1).await;
        registry.join(board, c2, ana.clone(), tx2).await;
        registry.join(board, c3, presence_user("ben"), tx3).await;

        assert_eq!(last_presence(&drain(&mut rx3)), vec!["ana", "ben"]);

        // Closing one of ana's tabs must not drop her from the list.
        registry.leave(board, c1).await;
        assert_eq!(last_presence(&drain(&mut rx3)), vec!["ana", "ben"]);

        registry.leave(board, c2).await;
        assert_eq!(last_presence(&drain(&mut rx3)), vec!["ben"]);
    }

    #[tokio::test]
    async fn newer_connection_wins_display_attributes() {
        let registry = RoomRegistry::new();
        let board = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let (c1, tx1, _rx1) = conn(&registry);
        let (c2, tx2, _rx2) = conn(&registry);

        let stale = PresenceUser {
            id: user_id,
            name: "ana".into(),
            avatar: None,
        };
        let fresh = PresenceUser {
            id: user_id,
            name: "ana".into(),
            avatar: Some("https://cdn.example/ana.png".into()),
        };
        registry.join(board, c1, stale, tx1).await;
        registry.join(board, c2, fresh.clone(), tx2).await;

        assert_eq!(registry.presence(board).await, vec![fresh]);
    }

    #[tokio::test]
    async fn rejoining_an_emptied_room_starts_fresh() {
        let registry = RoomRegistry::new();
        let board = Uuid::new_v4();
        let (c1, tx1, _rx1) = conn(&registry);

        registry.join(board, c1, presence_user("ana"), tx1).await;
        registry.leave(board, c1).await;
        assert_eq!(registry.room_count().await, 0);

        let (c2, tx2, mut rx2) = conn(&registry);
        registry.join(board, c2, presence_user("ben"), tx2).await;
        assert_eq!(last_presence(&drain(&mut rx2)), vec!["ben"]);
        assert_eq!(registry.room_count().await, 1);
    }

    #[tokio::test]
    async fn broadcast_to_unknown_room_is_a_no_op() {
        let registry = RoomRegistry::new();
        let frame = ServerFrame::Error {
            message: "nobody home".into(),
        };
        registry.broadcast(Uuid::new_v4(), None, &frame).await;
        assert_eq!(registry.room_count().await, 0);
    }
}
