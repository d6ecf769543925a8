//! Per-user favorite shortcuts onto other entities.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::query::{CachePolicy, QueryDescriptor, QueryExecutor};
use crate::application::repos::{
    AddFavoriteParams, FavoritesRepo, FavoritesWriteRepo, RepoError,
};
use crate::cache::{CacheKey, CacheScope, EntityTag, hash_value};
use crate::domain::entities::UserFavoriteRecord;
use crate::domain::types::FavoriteTarget;

#[derive(Debug, Error)]
pub enum FavoriteError {
    #[error("constraint violation on `{0}`")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FavoriteDto {
    pub id: Uuid,
    pub user_name: String,
    pub target: FavoriteTarget,
    pub target_id: Uuid,
    pub sort_order: i32,
}

pub fn favorite_to_dto(record: &UserFavoriteRecord) -> FavoriteDto {
    FavoriteDto {
        id: record.id,
        user_name: record.user_name.clone(),
        target: record.target,
        target_id: record.target_id,
        sort_order: record.sort_order,
    }
}

pub fn favorite_from_dto(dto: &FavoriteDto) -> UserFavoriteRecord {
    UserFavoriteRecord {
        id: dto.id,
        user_name: dto.user_name.clone(),
        target: dto.target,
        target_id: dto.target_id,
        sort_order: dto.sort_order,
        created_at: OffsetDateTime::UNIX_EPOCH,
    }
}

struct FavoritesOfUser(String);

impl QueryDescriptor for FavoritesOfUser {
    type Output = Vec<FavoriteDto>;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::ForUser {
                tag: EntityTag::UserFavorite,
                user_hash: hash_value(&self.0.as_str()),
            },
            &[EntityTag::UserFavorite],
        )
    }
}

#[derive(Clone)]
pub struct FavoriteService {
    reader: Arc<dyn FavoritesRepo>,
    writer: Arc<dyn FavoritesWriteRepo>,
    executor: QueryExecutor,
    scope: CacheScope,
}

impl FavoriteService {
    pub fn new(
        reader: Arc<dyn FavoritesRepo>,
        writer: Arc<dyn FavoritesWriteRepo>,
        executor: QueryExecutor,
    ) -> Self {
        let scope = CacheScope::new(EntityTag::UserFavorite, executor.cache().clone());
        Self {
            reader,
            writer,
            executor,
            scope,
        }
    }

    /// A user's favorites in their chosen order.
    pub async fn list_for_user(
        &self,
        user_name: &str,
    ) -> Result<Arc<Vec<FavoriteDto>>, FavoriteError> {
        let reader = self.reader.clone();
        let owned = user_name.to_string();
        let descriptor = FavoritesOfUser(owned.clone());
        let dtos = self
            .executor
            .execute(&descriptor, || async move {
                let mut dtos: Vec<FavoriteDto> = reader
                    .list_for_user(&owned)
                    .await?
                    .iter()
                    .map(favorite_to_dto)
                    .collect();
                dtos.sort_by_key(|dto| dto.sort_order);
                Ok(dtos)
            })
            .await?;
        Ok(dtos)
    }

    pub async fn add_favorite(
        &self,
        params: AddFavoriteParams,
    ) -> Result<UserFavoriteRecord, FavoriteError> {
        if params.user_name.trim().is_empty() {
            return Err(FavoriteError::ConstraintViolation("user_name"));
        }
        let record = self.writer.add_favorite(params).await?;
        self.scope.refresh();
        Ok(record)
    }

    pub async fn remove_favorite(&self, id: Uuid) -> Result<(), FavoriteError> {
        self.writer.remove_favorite(id).await?;
        self.scope.refresh();
        Ok(())
    }

    pub async fn reorder_favorites(
        &self,
        user_name: &str,
        ordered_ids: &[Uuid],
    ) -> Result<(), FavoriteError> {
        if ordered_ids.is_empty() {
            return Err(FavoriteError::ConstraintViolation("ordered_ids"));
        }
        self.writer.reorder_favorites(user_name, ordered_ids).await?;
        self.scope.refresh();
        Ok(())
    }
}
