use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        BedListRecord, BedQueryFilter, CreateBedParams, CreateDepartmentParams,
        CreateFacilityParams, CreateRoomParams, FacilitiesRepo, FacilitiesWriteRepo,
        FacilityListRecord, RepoError, UpdateBedParams, UpdateDepartmentParams,
        UpdateFacilityParams, UpdateRoomParams,
    },
    domain::entities::{BedRecord, DepartmentRecord, FacilityRecord, RoomRecord},
    domain::types::{BedStatus, RoomKind},
};

use super::PostgresRepositories;

#[derive(sqlx::FromRow)]
struct FacilityRow {
    id: Uuid,
    code: String,
    name: String,
    city_id: Option<Uuid>,
    address: Option<String>,
    active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<FacilityRow> for FacilityRecord {
    fn from(row: FacilityRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            name: row.name,
            city_id: row.city_id,
            address: row.address,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FacilityListRow {
    id: Uuid,
    code: String,
    name: String,
    city_id: Option<Uuid>,
    address: Option<String>,
    active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    city_name: Option<String>,
}

impl From<FacilityListRow> for FacilityListRecord {
    fn from(row: FacilityListRow) -> Self {
        Self {
            facility: FacilityRecord {
                id: row.id,
                code: row.code,
                name: row.name,
                city_id: row.city_id,
                address: row.address,
                active: row.active,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            city_name: row.city_name,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DepartmentRow {
    id: Uuid,
    facility_id: Uuid,
    code: String,
    name: String,
    floor: Option<i16>,
    active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<DepartmentRow> for DepartmentRecord {
    fn from(row: DepartmentRow) -> Self {
        Self {
            id: row.id,
            facility_id: row.facility_id,
            code: row.code,
            name: row.name,
            floor: row.floor,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RoomRow {
    id: Uuid,
    department_id: Uuid,
    name: String,
    kind: RoomKind,
    active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<RoomRow> for RoomRecord {
    fn from(row: RoomRow) -> Self {
        Self {
            id: row.id,
            department_id: row.department_id,
            name: row.name,
            kind: row.kind,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BedRow {
    id: Uuid,
    room_id: Uuid,
    label: String,
    status: BedStatus,
    active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<BedRow> for BedRecord {
    fn from(row: BedRow) -> Self {
        Self {
            id: row.id,
            room_id: row.room_id,
            label: row.label,
            status: row.status,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BedListRow {
    id: Uuid,
    room_id: Uuid,
    label: String,
    status: BedStatus,
    active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    room_name: String,
    department_name: String,
    facility_name: String,
}

impl From<BedListRow> for BedListRecord {
    fn from(row: BedListRow) -> Self {
        Self {
            bed: BedRecord {
                id: row.id,
                room_id: row.room_id,
                label: row.label,
                status: row.status,
                active: row.active,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            room_name: row.room_name,
            department_name: row.department_name,
            facility_name: row.facility_name,
        }
    }
}

const BED_LIST_SELECT: &str = "SELECT b.id, b.room_id, b.label, b.status, b.active, \
        b.created_at, b.updated_at, \
        r.name AS room_name, d.name AS department_name, f.name AS facility_name \
 FROM beds b \
 INNER JOIN rooms r ON r.id = b.room_id \
 INNER JOIN departments d ON d.id = r.department_id \
 INNER JOIN facilities f ON f.id = d.facility_id \
 WHERE 1=1 ";

#[async_trait]
impl FacilitiesRepo for PostgresRepositories {
    async fn list_facilities(
        &self,
        active_only: bool,
    ) -> Result<Vec<FacilityListRecord>, RepoError> {
        let rows = sqlx::query_as::<_, FacilityListRow>(
            "SELECT f.id, f.code, f.name, f.city_id, f.address, f.active, \
                    f.created_at, f.updated_at, c.name AS city_name \
             FROM facilities f \
             LEFT JOIN cities c ON c.id = f.city_id \
             WHERE f.active OR NOT $1 \
             ORDER BY f.name",
        )
        .bind(active_only)
        .fetch_all(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(rows.into_iter().map(FacilityListRecord::from).collect())
    }

    async fn find_facility(&self, id: Uuid) -> Result<Option<FacilityListRecord>, RepoError> {
        let row = sqlx::query_as::<_, FacilityListRow>(
            "SELECT f.id, f.code, f.name, f.city_id, f.address, f.active, \
                    f.created_at, f.updated_at, c.name AS city_name \
             FROM facilities f \
             LEFT JOIN cities c ON c.id = f.city_id \
             WHERE f.id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(row.map(FacilityListRecord::from))
    }

    async fn list_departments(
        &self,
        facility_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<DepartmentRecord>, RepoError> {
        let rows = sqlx::query_as::<_, DepartmentRow>(
            "SELECT id, facility_id, code, name, floor, active, created_at, updated_at \
             FROM departments \
             WHERE facility_id = $1 AND (active OR NOT $2) \
             ORDER BY name",
        )
        .bind(facility_id)
        .bind(active_only)
        .fetch_all(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(rows.into_iter().map(DepartmentRecord::from).collect())
    }

    async fn find_department(&self, id: Uuid) -> Result<Option<DepartmentRecord>, RepoError> {
        let row = sqlx::query_as::<_, DepartmentRow>(
            "SELECT id, facility_id, code, name, floor, active, created_at, updated_at \
             FROM departments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(row.map(DepartmentRecord::from))
    }

    async fn list_rooms(
        &self,
        department_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<RoomRecord>, RepoError> {
        let rows = sqlx::query_as::<_, RoomRow>(
            "SELECT id, department_id, name, kind, active, created_at, updated_at \
             FROM rooms \
             WHERE department_id = $1 AND (active OR NOT $2) \
             ORDER BY name",
        )
        .bind(department_id)
        .bind(active_only)
        .fetch_all(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(rows.into_iter().map(RoomRecord::from).collect())
    }

    async fn list_beds(&self, filter: &BedQueryFilter) -> Result<Vec<BedListRecord>, RepoError> {
        let mut qb = QueryBuilder::new(BED_LIST_SELECT);

        if let Some(room_id) = filter.room_id {
            qb.push(" AND b.room_id = ");
            qb.push_bind(room_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND b.status = ");
            qb.push_bind(status);
        }

        qb.push(" ORDER BY b.label");

        let rows = qb
            .build_query_as::<BedListRow>()
            .fetch_all(self.pool())
            .await
            .map_err(super::map_sqlx_error)?;

        Ok(rows.into_iter().map(BedListRecord::from).collect())
    }

    async fn find_bed(&self, id: Uuid) -> Result<Option<BedListRecord>, RepoError> {
        let mut qb = QueryBuilder::new(BED_LIST_SELECT);
        qb.push(" AND b.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<BedListRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(super::map_sqlx_error)?;

        Ok(row.map(BedListRecord::from))
    }
}

#[async_trait]
impl FacilitiesWriteRepo for PostgresRepositories {
    async fn create_facility(
        &self,
        params: CreateFacilityParams,
    ) -> Result<FacilityRecord, RepoError> {
        let row = sqlx::query_as::<_, FacilityRow>(
            "INSERT INTO facilities (id, code, name, city_id, address, active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) \
             RETURNING id, code, name, city_id, address, active, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&params.code)
        .bind(&params.name)
        .bind(params.city_id)
        .bind(&params.address)
        .bind(params.active)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(FacilityRecord::from(row))
    }

    async fn update_facility(
        &self,
        params: UpdateFacilityParams,
    ) -> Result<FacilityRecord, RepoError> {
        let row = sqlx::query_as::<_, FacilityRow>(
            "UPDATE facilities \
             SET code = $2, name = $3, city_id = $4, address = $5, active = $6, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, code, name, city_id, address, active, created_at, updated_at",
        )
        .bind(params.id)
        .bind(&params.code)
        .bind(&params.name)
        .bind(params.city_id)
        .bind(&params.address)
        .bind(params.active)
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(FacilityRecord::from(row))
    }

    async fn create_department(
        &self,
        params: CreateDepartmentParams,
    ) -> Result<DepartmentRecord, RepoError> {
        let row = sqlx::query_as::<_, DepartmentRow>(
            "INSERT INTO departments (id, facility_id, code, name, floor, active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) \
             RETURNING id, facility_id, code, name, floor, active, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(params.facility_id)
        .bind(&params.code)
        .bind(&params.name)
        .bind(params.floor)
        .bind(params.active)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(DepartmentRecord::from(row))
    }

    async fn update_department(
        &self,
        params: UpdateDepartmentParams,
    ) -> Result<DepartmentRecord, RepoError> {
        let row = sqlx::query_as::<_, DepartmentRow>(
            "UPDATE departments \
             SET code = $2, name = $3, floor = $4, active = $5, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, facility_id, code, name, floor, active, created_at, updated_at",
        )
        .bind(params.id)
        .bind(&params.code)
        .bind(&params.name)
        .bind(params.floor)
        .bind(params.active)
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(DepartmentRecord::from(row))
    }

    async fn create_room(&self, params: CreateRoomParams) -> Result<RoomRecord, RepoError> {
        let row = sqlx::query_as::<_, RoomRow>(
            "INSERT INTO rooms (id, department_id, name, kind, active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             RETURNING id, department_id, name, kind, active, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(params.department_id)
        .bind(&params.name)
        .bind(params.kind)
        .bind(params.active)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(RoomRecord::from(row))
    }

    async fn update_room(&self, params: UpdateRoomParams) -> Result<RoomRecord, RepoError> {
        let row = sqlx::query_as::<_, RoomRow>(
            "UPDATE rooms SET name = $2, kind = $3, active = $4, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, department_id, name, kind, active, created_at, updated_at",
        )
        .bind(params.id)
        .bind(&params.name)
        .bind(params.kind)
        .bind(params.active)
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(RoomRecord::from(row))
    }

    async fn create_bed(&self, params: CreateBedParams) -> Result<BedRecord, RepoError> {
        let row = sqlx::query_as::<_, BedRow>(
            "INSERT INTO beds (id, room_id, label, status, active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             RETURNING id, room_id, label, status, active, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(params.room_id)
        .bind(&params.label)
        .bind(params.status)
        .bind(params.active)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(BedRecord::from(row))
    }

    async fn update_bed(&self, params: UpdateBedParams) -> Result<BedRecord, RepoError> {
        let row = sqlx::query_as::<_, BedRow>(
            "UPDATE beds SET label = $2, status = $3, active = $4, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, room_id, label, status, active, created_at, updated_at",
        )
        .bind(params.id)
        .bind(&params.label)
        .bind(params.status)
        .bind(params.active)
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(BedRecord::from(row))
    }

    async fn set_bed_status(&self, id: Uuid, status: BedStatus) -> Result<BedRecord, RepoError> {
        let row = sqlx::query_as::<_, BedRow>(
            "UPDATE beds SET status = $2, updated_at = now() WHERE id = $1 \
             RETURNING id, room_id, label, status, active, created_at, updated_at",
        )
        .bind(id)
        .bind(status)
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(BedRecord::from(row))
    }
}
