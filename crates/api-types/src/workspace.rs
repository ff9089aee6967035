use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

use crate::some_if_present;

/// Role of a user within a workspace. Board, list and card permissions all
/// derive from the role in the owning workspace; there are no per-board
/// overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "workspace_role", rename_all = "lowercase")]
pub enum WorkspaceRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl WorkspaceRole {
    /// Everyone but VIEWER may mutate boards, lists and cards.
    pub fn can_edit(self) -> bool {
        !matches!(self, WorkspaceRole::Viewer)
    }

    /// OWNER and ADMIN manage the workspace itself and its members.
    pub fn can_manage(self) -> bool {
        matches!(self, WorkspaceRole::Owner | WorkspaceRole::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkspaceMember {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: WorkspaceRole,
    pub joined_at: DateTime<Utc>,
}

/// Membership row joined with the member's display attributes.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemberWithUser {
    pub user_id: Uuid,
    pub role: WorkspaceRole,
    pub joined_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceDetail {
    #[serde(flatten)]
    pub workspace: Workspace,
    pub members: Vec<MemberWithUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkspaceRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateWorkspaceRequest {
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
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    /// Defaults to MEMBER when omitted.
    pub role: Option<WorkspaceRole>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&WorkspaceRole::Owner).unwrap(),
            "\"OWNER\""
        );
        assert_eq!(
            serde_json::from_str::<WorkspaceRole>("\"VIEWER\"").unwrap(),
            WorkspaceRole::Viewer
        );
    }

    #[test]
    fn role_permissions() {
        assert!(WorkspaceRole::Owner.can_manage());
        assert!(WorkspaceRole::Admin.can_manage());
        assert!(!WorkspaceRole::Member.can_manage());
        assert!(WorkspaceRole::Member.can_edit());
        assert!(!WorkspaceRole::Viewer.can_edit());
        assert!(!WorkspaceRole::Viewer.can_manage());
    }

    #[test]
    fn update_request_distinguishes_missing_from_null() {
        let req: UpdateWorkspaceRequest = serde_json::from_str(r#"{"name":"ops"}"#).unwrap();
        assert_eq!(req.name.as_deref(), Some("ops"));
        assert!(req.description.is_none());

        let req: UpdateWorkspaceRequest =
            serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert!(req.name.is_none());
        assert_eq!(req.description, Some(None));
    }
}
