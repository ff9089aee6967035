use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ListWithCards, some_if_present};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Board {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub background: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Board with its lists and their cards, each level ordered by position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDetail {
    #[serde(flatten)]
    pub board: Board,
    pub lists: Vec<ListWithCards>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBoardRequest {
    pub workspace_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub background: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBoardRequest {
    #[serde(
        default,
        deserialize_with = "some_if_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "some_if_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "some_if_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub background: Option<Option<String>>,
}

/// Target index for reordering a board or a list among its siblings.
/// Out-of-range values clamp to the end of the collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub position: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListBoardsQuery {
    pub workspace_id: Uuid,
}
