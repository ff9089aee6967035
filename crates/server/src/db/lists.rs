use std::collections::HashMap;

use api_types::{CardOverview, List, ListWithCards};
use ordering::Reposition;
use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

pub struct ListRepository;

impl ListRepository {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<List>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, List>(
            r#"
            SELECT id, board_id, name, position, created_at, updated_at
            FROM lists
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// All lists of a board in display order, each carrying its unarchived
    /// cards in display order.
    pub async fn list_by_board(
        pool: &PgPool,
        board_id: Uuid,
    ) -> Result<Vec<ListWithCards>, sqlx::Error> {
        let lists = sqlx::query_as::<_, List>(
            r#"
            SELECT id, board_id, name, position, created_at, updated_at
            FROM lists
            WHERE board_id = $1
            ORDER BY position
            "#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await?;

        let cards = sqlx::query_as::<_, CardOverview>(
            r#"
            SELECT c.id, c.list_id, c.title, c.description, c.position, c.priority,
                   c.due_date, c.is_archived, c.creator_id, c.assignee_id,
                   c.created_at, c.updated_at,
                   (SELECT COUNT(*) FROM card_comments x WHERE x.card_id = c.id) AS comment_count,
                   (SELECT COUNT(*) FROM card_checklists x WHERE x.card_id = c.id) AS checklist_count,
                   (SELECT COUNT(*) FROM card_attachments x WHERE x.card_id = c.id) AS attachment_count
            FROM cards c
            INNER JOIN lists l ON l.id = c.list_id
            WHERE l.board_id = $1 AND c.is_archived = FALSE
            ORDER BY c.position, c.id
            "#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await?;

        let mut by_list: HashMap<Uuid, Vec<CardOverview>> = HashMap::new();
        for card in cards {
            by_list.entry(card.card.list_id).or_default().push(card);
        }

        Ok(lists
            .into_iter()
            .map(|list| {
                let cards = by_list.remove(&list.id).unwrap_or_default();
                ListWithCards { list, cards }
            })
            .collect())
    }

    pub async fn max_position<'e, E>(
        executor: E,
        board_id: Uuid,
    ) -> Result<Option<i32>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_scalar::<_, Option<i32>>("SELECT MAX(position) FROM lists WHERE board_id = $1")
            .bind(board_id)
            .fetch_one(executor)
            .await
    }

    pub async fn create(
        pool: &PgPool,
        board_id: Uuid,
        name: &str,
        position: i32,
    ) -> Result<List, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            INSERT INTO lists (board_id, name, position)
            VALUES ($1, $2, $3)
            RETURNING id, board_id, name, position, created_at, updated_at
            "#,
        )
        .bind(board_id)
        .bind(name)
        .bind(position)
        .fetch_one(pool)
        .await
    }

    pub async fn rename(pool: &PgPool, id: Uuid, name: &str) -> Result<Option<List>, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            UPDATE lists SET name = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, board_id, name, position, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Deletes the list and, through the schema's cascade, its cards.
    /// Surviving lists keep their positions.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM lists WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn list_ids_ordered<'e, E>(
        executor: E,
        board_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM lists WHERE board_id = $1 ORDER BY position, id",
        )
        .bind(board_id)
        .fetch_all(executor)
        .await
    }

    pub async fn apply_positions(
        conn: &mut PgConnection,
        updates: &[Reposition],
    ) -> Result<(), sqlx::Error> {
        for update in updates {
            sqlx::query("UPDATE lists SET position = $1, updated_at = NOW() WHERE id = $2")
                .bind(update.position)
                .bind(update.id)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Locks the given list rows in ascending id order. Card moves touching
    /// two lists always acquire both locks through this, so concurrent moves
    /// cannot deadlock against each other.
    pub async fn lock_many(conn: &mut PgConnection, ids: &[Uuid]) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT id FROM lists WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(ids)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn workspace_id_of<'e, E>(
        executor: E,
        list_id: Uuid,
    ) -> Result<Option<Uuid>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT b.workspace_id
            FROM lists l
            INNER JOIN boards b ON b.id = l.board_id
            WHERE l.id = $1
            "#,
        )
        .bind(list_id)
        .fetch_optional(executor)
        .await
    }
}
