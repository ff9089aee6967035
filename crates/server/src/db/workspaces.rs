use api_types::{MemberWithUser, Workspace, WorkspaceMember, WorkspaceRole};
use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

pub struct WorkspaceRepository;

impl WorkspaceRepository {
    /// Workspaces the user belongs to, oldest first.
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Workspace>, sqlx::Error> {
        sqlx::query_as::<_, Workspace>(
            r#"
            SELECT w.id, w.name, w.description, w.created_at, w.updated_at
            FROM workspaces w
            INNER JOIN workspace_members m ON m.workspace_id = w.id
            WHERE m.user_id = $1
            ORDER BY w.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Workspace>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Workspace>(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM workspaces
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        name: &str,
        description: Option<&str>,
    ) -> Result<Workspace, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Workspace>(
            r#"
            INSERT INTO workspaces (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(description)
        .fetch_one(executor)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        name: Option<String>,
        description: Option<Option<String>>,
    ) -> Result<Option<Workspace>, sqlx::Error> {
        let update_name = name.is_some();
        let update_description = description.is_some();
        let description_value = description.flatten();

        sqlx::query_as::<_, Workspace>(
            r#"
            UPDATE workspaces SET
                name = CASE WHEN $1 THEN $2 ELSE name END,
                description = CASE WHEN $3 THEN $4 ELSE description END,
                updated_at = NOW()
            WHERE id = $5
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(update_name)
        .bind(name)
        .bind(update_description)
        .bind(description_value)
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM workspaces WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Serializes board reorders within the workspace for the duration of
    /// the surrounding transaction.
    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT id FROM workspaces WHERE id = $1 FOR UPDATE")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

pub struct MembershipRepository;

impl MembershipRepository {
    pub async fn role_of<'e, E>(
        executor: E,
        user_id: Uuid,
        workspace_id: Uuid,
    ) -> Result<Option<WorkspaceRole>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_scalar::<_, WorkspaceRole>(
            r#"
            SELECT role
            FROM workspace_members
            WHERE user_id = $1 AND workspace_id = $2
            "#,
        )
        .bind(user_id)
        .bind(workspace_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find(
        pool: &PgPool,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<WorkspaceMember>, sqlx::Error> {
        sqlx::query_as::<_, WorkspaceMember>(
            r#"
            SELECT workspace_id, user_id, role, joined_at
            FROM workspace_members
            WHERE workspace_id = $1 AND user_id = $2
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_members(
        pool: &PgPool,
        workspace_id: Uuid,
    ) -> Result<Vec<MemberWithUser>, sqlx::Error> {
        sqlx::query_as::<_, MemberWithUser>(
            r#"
            SELECT m.user_id, m.role, m.joined_at, u.name, u.email, u.avatar
            FROM workspace_members m
            INNER JOIN users u ON u.id = m.user_id
            WHERE m.workspace_id = $1
            ORDER BY m.joined_at
            "#,
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await
    }

    pub async fn insert<'e, E>(
        executor: E,
        workspace_id: Uuid,
        user_id: Uuid,
        role: WorkspaceRole,
    ) -> Result<WorkspaceMember, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, WorkspaceMember>(
            r#"
            INSERT INTO workspace_members (workspace_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING workspace_id, user_id, role, joined_at
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(executor)
        .await
    }

    pub async fn remove(
        pool: &PgPool,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM workspace_members WHERE workspace_id = $1 AND user_id = $2")
                .bind(workspace_id)
                .bind(user_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }
}
