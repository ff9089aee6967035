use api_types::{
    Attachment, Card, CardOverview, CardPriority, Checklist, Comment, CommentWithAuthor, Label,
};
use chrono::{DateTime, Utc};
use ordering::Reposition;
use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

pub struct CreateCardParams {
    pub list_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: CardPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub creator_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub position: i32,
}

pub struct UpdateCardParams {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<CardPriority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub assignee_id: Option<Option<Uuid>>,
    pub is_archived: Option<bool>,
}

pub struct CardRepository;

impl CardRepository {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Card>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Card>(
            r#"
            SELECT id, list_id, title, description, position, priority, due_date,
                   is_archived, creator_id, assignee_id, created_at, updated_at
            FROM cards
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_overview(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<CardOverview>, sqlx::Error> {
        sqlx::query_as::<_, CardOverview>(
            r#"
            SELECT c.id, c.list_id, c.title, c.description, c.position, c.priority,
                   c.due_date, c.is_archived, c.creator_id, c.assignee_id,
                   c.created_at, c.updated_at,
                   (SELECT COUNT(*) FROM card_comments x WHERE x.card_id = c.id) AS comment_count,
                   (SELECT COUNT(*) FROM card_checklists x WHERE x.card_id = c.id) AS checklist_count,
                   (SELECT COUNT(*) FROM card_attachments x WHERE x.card_id = c.id) AS attachment_count
            FROM cards c
            WHERE c.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Unarchived cards of a list in display order.
    pub async fn list_by_list(
        pool: &PgPool,
        list_id: Uuid,
    ) -> Result<Vec<CardOverview>, sqlx::Error> {
        sqlx::query_as::<_, CardOverview>(
            r#"
            SELECT c.id, c.list_id, c.title, c.description, c.position, c.priority,
                   c.due_date, c.is_archived, c.creator_id, c.assignee_id,
                   c.created_at, c.updated_at,
                   (SELECT COUNT(*) FROM card_comments x WHERE x.card_id = c.id) AS comment_count,
                   (SELECT COUNT(*) FROM card_checklists x WHERE x.card_id = c.id) AS checklist_count,
                   (SELECT COUNT(*) FROM card_attachments x WHERE x.card_id = c.id) AS attachment_count
            FROM cards c
            WHERE c.list_id = $1 AND c.is_archived = FALSE
            ORDER BY c.position, c.id
            "#,
        )
        .bind(list_id)
        .fetch_all(pool)
        .await
    }

    /// Highest position in the list counting archived cards too, so an
    /// unarchived card never collides with an archived one's slot.
    pub async fn max_position<'e, E>(
        executor: E,
        list_id: Uuid,
    ) -> Result<Option<i32>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_scalar::<_, Option<i32>>("SELECT MAX(position) FROM cards WHERE list_id = $1")
            .bind(list_id)
            .fetch_one(executor)
            .await
    }

    pub async fn create(pool: &PgPool, params: CreateCardParams) -> Result<Card, sqlx::Error> {
        let CreateCardParams {
            list_id,
            title,
            description,
            priority,
            due_date,
            creator_id,
            assignee_id,
            position,
        } = params;
        sqlx::query_as::<_, Card>(
            r#"
            INSERT INTO cards (list_id, title, description, priority, due_date,
                               creator_id, assignee_id, position)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, list_id, title, description, position, priority, due_date,
                      is_archived, creator_id, assignee_id, created_at, updated_at
            "#,
        )
        .bind(list_id)
        .bind(title)
        .bind(description)
        .bind(priority)
        .bind(due_date)
        .bind(creator_id)
        .bind(assignee_id)
        .bind(position)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        params: UpdateCardParams,
    ) -> Result<Option<Card>, sqlx::Error> {
        let UpdateCardParams {
            title,
            description,
            priority,
            due_date,
            assignee_id,
            is_archived,
        } = params;

        let update_title = title.is_some();
        let update_description = description.is_some();
        let description_value = description.flatten();
        let update_priority = priority.is_some();
        let update_due_date = due_date.is_some();
        let due_date_value = due_date.flatten();
        let update_assignee = assignee_id.is_some();
        let assignee_value = assignee_id.flatten();
        let update_archived = is_archived.is_some();
        let archived_value = is_archived.unwrap_or(false);

        sqlx::query_as::<_, Card>(
            r#"
            UPDATE cards SET
                title = CASE WHEN $1 THEN $2 ELSE title END,
                description = CASE WHEN $3 THEN $4 ELSE description END,
                priority = CASE WHEN $5 THEN $6 ELSE priority END,
                due_date = CASE WHEN $7 THEN $8 ELSE due_date END,
                assignee_id = CASE WHEN $9 THEN $10 ELSE assignee_id END,
                is_archived = CASE WHEN $11 THEN $12 ELSE is_archived END,
                updated_at = NOW()
            WHERE id = $13
            RETURNING id, list_id, title, description, position, priority, due_date,
                      is_archived, creator_id, assignee_id, created_at, updated_at
            "#,
        )
        .bind(update_title)
        .bind(title)
        .bind(update_description)
        .bind(description_value)
        .bind(update_priority)
        .bind(priority)
        .bind(update_due_date)
        .bind(due_date_value)
        .bind(update_assignee)
        .bind(assignee_value)
        .bind(update_archived)
        .bind(archived_value)
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Deletes the card. Surviving cards keep their positions.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cards WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Unarchived card ids of a list in display order, optionally without
    /// one card. Move planning excludes the moving card from both sides.
    pub async fn list_ids_ordered<'e, E>(
        executor: E,
        list_id: Uuid,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM cards
            WHERE list_id = $1 AND is_archived = FALSE
              AND ($2::uuid IS NULL OR id <> $2)
            ORDER BY position, id
            "#,
        )
        .bind(list_id)
        .bind(exclude)
        .fetch_all(executor)
        .await
    }

    pub async fn apply_positions(
        conn: &mut PgConnection,
        updates: &[Reposition],
    ) -> Result<(), sqlx::Error> {
        for update in updates {
            sqlx::query("UPDATE cards SET position = $1, updated_at = NOW() WHERE id = $2")
                .bind(update.position)
                .bind(update.id)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Like [`Self::apply_positions`] but also re-homes every row onto
    /// `list_id`. Cross-list moves stamp the whole destination through this,
    /// which makes the moving card's list change part of the same renumber
    /// write.
    pub async fn apply_positions_with_list(
        conn: &mut PgConnection,
        list_id: Uuid,
        updates: &[Reposition],
    ) -> Result<(), sqlx::Error> {
        for update in updates {
            sqlx::query(
                "UPDATE cards SET position = $1, list_id = $2, updated_at = NOW() WHERE id = $3",
            )
            .bind(update.position)
            .bind(list_id)
            .bind(update.id)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    pub async fn comments_with_authors(
        pool: &PgPool,
        card_id: Uuid,
    ) -> Result<Vec<CommentWithAuthor>, sqlx::Error> {
        sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT cc.id, cc.card_id, cc.user_id, cc.content, cc.created_at,
                   u.name AS author_name, u.avatar AS author_avatar
            FROM card_comments cc
            INNER JOIN users u ON u.id = cc.user_id
            WHERE cc.card_id = $1
            ORDER BY cc.created_at
            "#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await
    }

    pub async fn insert_comment(
        pool: &PgPool,
        card_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<Comment, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO card_comments (card_id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, card_id, user_id, content, created_at
            "#,
        )
        .bind(card_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(pool)
        .await
    }

    pub async fn checklists(pool: &PgPool, card_id: Uuid) -> Result<Vec<Checklist>, sqlx::Error> {
        sqlx::query_as::<_, Checklist>(
            r#"
            SELECT id, card_id, title, is_completed, position, created_at
            FROM card_checklists
            WHERE card_id = $1
            ORDER BY position
            "#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await
    }

    pub async fn max_checklist_position(
        pool: &PgPool,
        card_id: Uuid,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<i32>>(
            "SELECT MAX(position) FROM card_checklists WHERE card_id = $1",
        )
        .bind(card_id)
        .fetch_one(pool)
        .await
    }

    pub async fn insert_checklist(
        pool: &PgPool,
        card_id: Uuid,
        title: &str,
        position: i32,
    ) -> Result<Checklist, sqlx::Error> {
        sqlx::query_as::<_, Checklist>(
            r#"
            INSERT INTO card_checklists (card_id, title, position)
            VALUES ($1, $2, $3)
            RETURNING id, card_id, title, is_completed, position, created_at
            "#,
        )
        .bind(card_id)
        .bind(title)
        .bind(position)
        .fetch_one(pool)
        .await
    }

    pub async fn set_checklist_completed(
        pool: &PgPool,
        card_id: Uuid,
        checklist_id: Uuid,
        is_completed: bool,
    ) -> Result<Option<Checklist>, sqlx::Error> {
        sqlx::query_as::<_, Checklist>(
            r#"
            UPDATE card_checklists SET is_completed = $1
            WHERE id = $2 AND card_id = $3
            RETURNING id, card_id, title, is_completed, position, created_at
            "#,
        )
        .bind(is_completed)
        .bind(checklist_id)
        .bind(card_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete_checklist(
        pool: &PgPool,
        card_id: Uuid,
        checklist_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM card_checklists WHERE id = $1 AND card_id = $2")
            .bind(checklist_id)
            .bind(card_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn labels(pool: &PgPool, card_id: Uuid) -> Result<Vec<Label>, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            r#"
            SELECT id, card_id, name, color
            FROM card_labels
            WHERE card_id = $1
            ORDER BY name
            "#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await
    }

    pub async fn insert_label(
        pool: &PgPool,
        card_id: Uuid,
        name: &str,
        color: &str,
    ) -> Result<Label, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            r#"
            INSERT INTO card_labels (card_id, name, color)
            VALUES ($1, $2, $3)
            RETURNING id, card_id, name, color
            "#,
        )
        .bind(card_id)
        .bind(name)
        .bind(color)
        .fetch_one(pool)
        .await
    }

    pub async fn delete_label(
        pool: &PgPool,
        card_id: Uuid,
        label_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM card_labels WHERE id = $1 AND card_id = $2")
            .bind(label_id)
            .bind(card_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn attachments(pool: &PgPool, card_id: Uuid) -> Result<Vec<Attachment>, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"
            SELECT id, card_id, filename, url, created_at
            FROM card_attachments
            WHERE card_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await
    }
}
