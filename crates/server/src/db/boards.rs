use api_types::Board;
use ordering::Reposition;
use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

pub struct CreateBoardParams {
    pub workspace_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub background: Option<String>,
    pub position: i32,
}

pub struct BoardRepository;

impl BoardRepository {
    pub async fn list_by_workspace(
        pool: &PgPool,
        workspace_id: Uuid,
    ) -> Result<Vec<Board>, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            r#"
            SELECT id, workspace_id, name, description, background, position,
                   created_at, updated_at
            FROM boards
            WHERE workspace_id = $1
            ORDER BY position
            "#,
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Board>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Board>(
            r#"
            SELECT id, workspace_id, name, description, background, position,
                   created_at, updated_at
            FROM boards
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn max_position<'e, E>(
        executor: E,
        workspace_id: Uuid,
    ) -> Result<Option<i32>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_scalar::<_, Option<i32>>(
            "SELECT MAX(position) FROM boards WHERE workspace_id = $1",
        )
        .bind(workspace_id)
        .fetch_one(executor)
        .await
    }

    pub async fn create(pool: &PgPool, params: CreateBoardParams) -> Result<Board, sqlx::Error> {
        let CreateBoardParams {
            workspace_id,
            name,
            description,
            background,
            position,
        } = params;
        sqlx::query_as::<_, Board>(
            r#"
            INSERT INTO boards (workspace_id, name, description, background, position)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, workspace_id, name, description, background, position,
                      created_at, updated_at
            "#,
        )
        .bind(workspace_id)
        .bind(name)
        .bind(description)
        .bind(background)
        .bind(position)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        name: Option<String>,
        description: Option<Option<String>>,
        background: Option<Option<String>>,
    ) -> Result<Option<Board>, sqlx::Error> {
        let update_name = name.is_some();
        let update_description = description.is_some();
        let description_value = description.flatten();
        let update_background = background.is_some();
        let background_value = background.flatten();

        sqlx::query_as::<_, Board>(
            r#"
            UPDATE boards SET
                name = CASE WHEN $1 THEN $2 ELSE name END,
                description = CASE WHEN $3 THEN $4 ELSE description END,
                background = CASE WHEN $5 THEN $6 ELSE background END,
                updated_at = NOW()
            WHERE id = $7
            RETURNING id, workspace_id, name, description, background, position,
                      created_at, updated_at
            "#,
        )
        .bind(update_name)
        .bind(name)
        .bind(update_description)
        .bind(description_value)
        .bind(update_background)
        .bind(background_value)
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Board ids in display order, the input every renumber plan starts from.
    pub async fn list_ids_ordered<'e, E>(
        executor: E,
        workspace_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM boards WHERE workspace_id = $1 ORDER BY position, id",
        )
        .bind(workspace_id)
        .fetch_all(executor)
        .await
    }

    pub async fn apply_positions(
        conn: &mut PgConnection,
        updates: &[Reposition],
    ) -> Result<(), sqlx::Error> {
        for update in updates {
            sqlx::query("UPDATE boards SET position = $1, updated_at = NOW() WHERE id = $2")
                .bind(update.position)
                .bind(update.id)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Serializes list reorders within the board for the duration of the
    /// surrounding transaction.
    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT id FROM boards WHERE id = $1 FOR UPDATE")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
