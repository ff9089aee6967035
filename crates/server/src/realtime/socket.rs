//! Websocket endpoint: authentication, the per-connection read loop, and
//! the bridge between a connection and the room registry.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::instrument;
use uuid::Uuid;

use api_types::{ClientFrame, PresenceUser, ServerFrame, User};

use crate::{
    AppState,
    auth::authenticate_token,
    db::{boards::BoardRepository, workspaces::MembershipRepository},
    routes::error::ApiError,
};

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    token: Option<String>,
}

/// `GET /ws?token=...`. The token is checked before the upgrade completes,
/// so a bad one costs a plain 401 and never a socket.
#[instrument(name = "realtime.connect", skip_all)]
pub async fn connect(
    State(state): State<AppState>,
    Query(query): Query<ConnectQuery>,
    upgrade: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let token = query.token.ok_or(ApiError::Unauthenticated)?;
    let user = authenticate_token(&state, &token).await?;
    Ok(upgrade.on_upgrade(move |socket| handle_socket(state, socket, user)))
}

async fn handle_socket(state: AppState, socket: WebSocket, user: User) {
    let rooms = state.rooms();
    let conn_id = rooms.register_conn();
    let presence = PresenceUser {
        id: user.id,
        name: user.name.clone(),
        avatar: user.avatar.clone(),
    };

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Everything addressed to this connection funnels through one channel,
    // so a room broadcast never blocks on a slow socket.
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    tracing::debug!(user_id = %user.id, conn_id, "realtime connection open");

    while let Some(Ok(message)) = stream.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        // Frames that do not parse are dropped without an answer.
        let Ok(frame) = serde_json::from_str::<ClientFrame>(text.as_str()) else {
            continue;
        };
        match frame {
            ClientFrame::JoinBoard { board_id } => {
                match authorize_join(&state, user.id, board_id).await {
                    Ok(()) => {
                        rooms
                            .join(board_id, conn_id, presence.clone(), tx.clone())
                            .await;
                    }
                    Err(message) => {
                        let frame = ServerFrame::Error { message };
                        if let Ok(serialized) = serde_json::to_string(&frame) {
                            let _ = tx.send(Message::Text(serialized.into()));
                        }
                    }
                }
            }
            ClientFrame::LeaveBoard { board_id } => {
                rooms.leave(board_id, conn_id).await;
            }
            ClientFrame::Board { board_id, event } => {
                // Relayed verbatim and unvalidated; the REST write that
                // preceded the event is the authoritative change.
                let frame = ServerFrame::Board { board_id, event };
                rooms.broadcast(board_id, Some(conn_id), &frame).await;
            }
        }
    }

    rooms.disconnect(conn_id).await;
    drop(tx);
    let _ = writer.await;
    tracing::debug!(user_id = %user.id, conn_id, "realtime connection closed");
}

/// A join requires the board to exist and the user to belong to its
/// workspace. Any role is enough to watch a board.
async fn authorize_join(state: &AppState, user_id: Uuid, board_id: Uuid) -> Result<(), String> {
    let board = match BoardRepository::find_by_id(state.pool(), board_id).await {
        Ok(Some(board)) => board,
        Ok(None) => return Err("board not found".into()),
        Err(error) => {
            tracing::error!(?error, "join authorization failed");
            return Err("internal server error".into());
        }
    };
    match MembershipRepository::role_of(state.pool(), user_id, board.workspace_id).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err("not a member of this workspace".into()),
        Err(error) => {
            tracing::error!(?error, "join authorization failed");
            Err("internal server error".into())
        }
    }
}
