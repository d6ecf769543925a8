use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{AddFavoriteParams, FavoritesRepo, FavoritesWriteRepo, RepoError},
    domain::entities::UserFavoriteRecord,
    domain::types::FavoriteTarget,
};

use super::PostgresRepositories;

#[derive(sqlx::FromRow)]
struct FavoriteRow {
    id: Uuid,
    user_name: String,
    target: FavoriteTarget,
    target_id: Uuid,
    sort_order: i32,
    created_at: OffsetDateTime,
}

impl From<FavoriteRow> for UserFavoriteRecord {
    fn from(row: FavoriteRow) -> Self {
        Self {
            id: row.id,
            user_name: row.user_name,
            target: row.target,
            target_id: row.target_id,
            sort_order: row.sort_order,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl FavoritesRepo for PostgresRepositories {
    async fn list_for_user(
        &self,
        user_name: &str,
    ) -> Result<Vec<UserFavoriteRecord>, RepoError> {
        let rows = sqlx::query_as::<_, FavoriteRow>(
            "SELECT id, user_name, target, target_id, sort_order, created_at \
             FROM user_favorites \
             WHERE user_name = $1 \
             ORDER BY sort_order, created_at",
        )
        .bind(user_name)
        .fetch_all(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(rows.into_iter().map(UserFavoriteRecord::from).collect())
    }
}

#[async_trait]
impl FavoritesWriteRepo for PostgresRepositories {
    async fn add_favorite(
        &self,
        params: AddFavoriteParams,
    ) -> Result<UserFavoriteRecord, RepoError> {
        let row = sqlx::query_as::<_, FavoriteRow>(
            "INSERT INTO user_favorites (id, user_name, target, target_id, sort_order, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, user_name, target, target_id, sort_order, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&params.user_name)
        .bind(params.target)
        .bind(params.target_id)
        .bind(params.sort_order)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(UserFavoriteRecord::from(row))
    }

    async fn remove_favorite(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM user_favorites WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(super::map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn reorder_favorites(
        &self,
        user_name: &str,
        ordered_ids: &[Uuid],
    ) -> Result<(), RepoError> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(super::map_sqlx_error)?;

        for (position, id) in ordered_ids.iter().enumerate() {
            sqlx::query(
                "UPDATE user_favorites SET sort_order = $3 \
                 WHERE id = $1 AND user_name = $2",
            )
            .bind(id)
            .bind(user_name)
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(super::map_sqlx_error)?;
        }

        tx.commit().await.map_err(super::map_sqlx_error)?;
        Ok(())
    }
}
