use api_types::User;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<User>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, avatar, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, avatar, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        name: Option<String>,
        avatar: Option<Option<String>>,
    ) -> Result<Option<User>, sqlx::Error> {
        let update_name = name.is_some();
        let update_avatar = avatar.is_some();
        let avatar_value = avatar.flatten();

        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = CASE WHEN $1 THEN $2 ELSE name END,
                avatar = CASE WHEN $3 THEN $4 ELSE avatar END,
                updated_at = NOW()
            WHERE id = $5
            RETURNING id, email, name, avatar, created_at, updated_at
            "#,
        )
        .bind(update_name)
        .bind(name)
        .bind(update_avatar)
        .bind(avatar_value)
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
