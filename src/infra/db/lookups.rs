use async_trait::async_trait;
use time::Time;
use uuid::Uuid;

use crate::{
    application::repos::{
        CreateCityParams, CreateShiftParams, LookupsRepo, LookupsWriteRepo, RepoError,
        UpdateCityParams, UpdateShiftParams,
    },
    domain::entities::{
        BloodGroupRecord, CityRecord, MaritalStatusRecord, NationalityRecord, ShiftRecord,
    },
};

use super::PostgresRepositories;

#[derive(sqlx::FromRow)]
struct NamedRow {
    id: Uuid,
    name: String,
    active: bool,
}

#[derive(sqlx::FromRow)]
struct OrderedRow {
    id: Uuid,
    name: String,
    display_order: i32,
    active: bool,
}

#[derive(sqlx::FromRow)]
struct BloodGroupRow {
    id: Uuid,
    name: String,
    display_order: i32,
}

#[derive(sqlx::FromRow)]
struct ShiftRow {
    id: Uuid,
    name: String,
    starts_at: Time,
    ends_at: Time,
    active: bool,
}

impl From<ShiftRow> for ShiftRecord {
    fn from(row: ShiftRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            active: row.active,
        }
    }
}

#[async_trait]
impl LookupsRepo for PostgresRepositories {
    async fn list_cities(&self, active_only: bool) -> Result<Vec<CityRecord>, RepoError> {
        let rows = sqlx::query_as::<_, NamedRow>(
            "SELECT id, name, active FROM cities WHERE active OR NOT $1 ORDER BY name",
        )
        .bind(active_only)
        .fetch_all(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| CityRecord {
                id: row.id,
                name: row.name,
                active: row.active,
            })
            .collect())
    }

    async fn find_city(&self, id: Uuid) -> Result<Option<CityRecord>, RepoError> {
        let row = sqlx::query_as::<_, NamedRow>(
            "SELECT id, name, active FROM cities WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(row.map(|row| CityRecord {
            id: row.id,
            name: row.name,
            active: row.active,
        }))
    }

    async fn list_nationalities(
        &self,
        active_only: bool,
    ) -> Result<Vec<NationalityRecord>, RepoError> {
        let rows = sqlx::query_as::<_, NamedRow>(
            "SELECT id, name, active FROM nationalities WHERE active OR NOT $1 ORDER BY name",
        )
        .bind(active_only)
        .fetch_all(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| NationalityRecord {
                id: row.id,
                name: row.name,
                active: row.active,
            })
            .collect())
    }

    async fn list_marital_statuses(
        &self,
        active_only: bool,
    ) -> Result<Vec<MaritalStatusRecord>, RepoError> {
        let rows = sqlx::query_as::<_, OrderedRow>(
            "SELECT id, name, display_order, active FROM marital_statuses \
             WHERE active OR NOT $1 ORDER BY display_order, name",
        )
        .bind(active_only)
        .fetch_all(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| MaritalStatusRecord {
                id: row.id,
                name: row.name,
                display_order: row.display_order,
                active: row.active,
            })
            .collect())
    }

    async fn list_blood_groups(&self) -> Result<Vec<BloodGroupRecord>, RepoError> {
        let rows = sqlx::query_as::<_, BloodGroupRow>(
            "SELECT id, name, display_order FROM blood_groups ORDER BY display_order, name",
        )
        .fetch_all(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| BloodGroupRecord {
                id: row.id,
                name: row.name,
                display_order: row.display_order,
            })
            .collect())
    }

    async fn list_shifts(&self, active_only: bool) -> Result<Vec<ShiftRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ShiftRow>(
            "SELECT id, name, starts_at, ends_at, active FROM shifts \
             WHERE active OR NOT $1 ORDER BY name",
        )
        .bind(active_only)
        .fetch_all(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(rows.into_iter().map(ShiftRecord::from).collect())
    }

    async fn find_shift(&self, id: Uuid) -> Result<Option<ShiftRecord>, RepoError> {
        let row = sqlx::query_as::<_, ShiftRow>(
            "SELECT id, name, starts_at, ends_at, active FROM shifts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(row.map(ShiftRecord::from))
    }
}

#[async_trait]
impl LookupsWriteRepo for PostgresRepositories {
    async fn create_city(&self, params: CreateCityParams) -> Result<CityRecord, RepoError> {
        let row = sqlx::query_as::<_, NamedRow>(
            "INSERT INTO cities (id, name, active) VALUES ($1, $2, $3) \
             RETURNING id, name, active",
        )
        .bind(Uuid::new_v4())
        .bind(&params.name)
        .bind(params.active)
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(CityRecord {
            id: row.id,
            name: row.name,
            active: row.active,
        })
    }

    async fn update_city(&self, params: UpdateCityParams) -> Result<CityRecord, RepoError> {
        let row = sqlx::query_as::<_, NamedRow>(
            "UPDATE cities SET name = $2, active = $3 WHERE id = $1 \
             RETURNING id, name, active",
        )
        .bind(params.id)
        .bind(&params.name)
        .bind(params.active)
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(CityRecord {
            id: row.id,
            name: row.name,
            active: row.active,
        })
    }

    async fn create_shift(&self, params: CreateShiftParams) -> Result<ShiftRecord, RepoError> {
        let row = sqlx::query_as::<_, ShiftRow>(
            "INSERT INTO shifts (id, name, starts_at, ends_at, active) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, name, starts_at, ends_at, active",
        )
        .bind(Uuid::new_v4())
        .bind(&params.name)
        .bind(params.starts_at)
        .bind(params.ends_at)
        .bind(params.active)
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(ShiftRecord::from(row))
    }

    async fn update_shift(&self, params: UpdateShiftParams) -> Result<ShiftRecord, RepoError> {
        let row = sqlx::query_as::<_, ShiftRow>(
            "UPDATE shifts SET name = $2, starts_at = $3, ends_at = $4, active = $5 \
             WHERE id = $1 \
             RETURNING id, name, starts_at, ends_at, active",
        )
        .bind(params.id)
        .bind(&params.name)
        .bind(params.starts_at)
        .bind(params.ends_at)
        .bind(params.active)
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(ShiftRecord::from(row))
    }
}
