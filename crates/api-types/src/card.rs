use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

use crate::some_if_present;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "card_priority", rename_all = "lowercase")]
pub enum CardPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Card {
    pub id: Uuid,
    pub list_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
    pub priority: CardPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub is_archived: bool,
    pub creator_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Card row plus the aggregate counts clients render on board tiles.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CardOverview {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub card: Card,
    pub comment_count: i64,
    pub checklist_count: i64,
    pub attachment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub card_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub comment: Comment,
    pub author_name: String,
    pub author_avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Checklist {
    pub id: Uuid,
    pub card_id: Uuid,
    pub title: String,
    pub is_completed: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Label {
    pub id: Uuid,
    pub card_id: Uuid,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attachment {
    pub id: Uuid,
    pub card_id: Uuid,
    pub filename: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Everything the card modal shows in one payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDetail {
    #[serde(flatten)]
    pub overview: CardOverview,
    pub comments: Vec<CommentWithAuthor>,
    pub checklists: Vec<Checklist>,
    pub labels: Vec<Label>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCardRequest {
    pub list_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<CardPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCardRequest {
    #[serde(
        default,
        deserialize_with = "some_if_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
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
    pub priority: Option<CardPriority>,
    #[serde(
        default,
        deserialize_with = "some_if_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        deserialize_with = "some_if_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub assignee_id: Option<Option<Uuid>>,
    #[serde(
        default,
        deserialize_with = "some_if_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_archived: Option<bool>,
}

/// Destination of a card move: target list plus target index within it.
/// The list may equal the card's current list for a same-list reorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveCardRequest {
    pub list_id: Uuid,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChecklistRequest {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateChecklistRequest {
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLabelRequest {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListCardsQuery {
    pub list_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_serializes_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&CardPriority::Medium).unwrap(),
            "\"MEDIUM\""
        );
        assert_eq!(
            serde_json::from_str::<CardPriority>("\"HIGH\"").unwrap(),
            CardPriority::High
        );
    }

    #[test]
    fn card_overview_flattens_card_fields() {
        let json = serde_json::json!({
            "id": "6d9f3a64-b33e-4b2e-9f2a-3a4f0a7b1c2d",
            "list_id": "a6e1b13a-2e3f-4ad2-8a30-55ab54bd8e1c",
            "title": "write release notes",
            "description": null,
            "position": 2,
            "priority": "LOW",
            "due_date": null,
            "is_archived": false,
            "creator_id": "7d5d2f3a-1b2c-4d5e-8f90-123456789abc",
            "assignee_id": null,
            "created_at": "2026-01-05T10:00:00Z",
            "updated_at": "2026-01-05T10:00:00Z",
            "comment_count": 3,
            "checklist_count": 0,
            "attachment_count": 1
        });
        let overview: CardOverview = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(overview.card.position, 2);
        assert_eq!(overview.comment_count, 3);
        assert_eq!(serde_json::to_value(&overview).unwrap(), json);
    }

    #[test]
    fn update_request_clears_assignee_with_null() {
        let req: UpdateCardRequest = serde_json::from_str(r#"{"assignee_id":null}"#).unwrap();
        assert_eq!(req.assignee_id, Some(None));
        assert!(req.title.is_none());
    }
}
