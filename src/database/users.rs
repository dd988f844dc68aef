use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use crate::store::{Group, StoreError, User, UserDirectory};

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: Option<String>,
}

#[derive(Debug, FromRow)]
struct GroupRow {
    id: i64,
    code: String,
    name: String,
}

/// Users from `users`, groups through `user_groups`.
///
/// Banned or deactivated users (`is_active = false`) never resolve.
#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_active(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email FROM users WHERE id = $1 AND is_active",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(user) = user else {
            return Ok(None);
        };

        let groups = sqlx::query_as::<_, GroupRow>(
            "SELECT g.id, g.code, g.name FROM groups g \
             JOIN user_groups ug ON ug.group_id = g.id \
             WHERE ug.user_id = $1 ORDER BY g.id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(User {
            id: user.id,
            name: user.name,
            email: user.email,
            groups: groups
                .into_iter()
                .map(|g| Group {
                    id: g.id,
                    code: g.code,
                    name: g.name,
                })
                .collect(),
        }))
    }
}
