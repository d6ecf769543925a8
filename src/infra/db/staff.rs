use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::pagination::{PageRequest, Paged},
    application::repos::{
        CreateStaffParams, RepoError, StaffListRecord, StaffQueryFilter, StaffRepo, StaffWriteRepo,
        UpdateStaffParams,
    },
    domain::entities::StaffRecord,
    domain::types::StaffRole,
};

use super::PostgresRepositories;

#[derive(sqlx::FromRow)]
struct StaffRow {
    id: Uuid,
    facility_id: Uuid,
    department_id: Option<Uuid>,
    full_name: String,
    role: StaffRole,
    shift_id: Option<Uuid>,
    active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<StaffRow> for StaffRecord {
    fn from(row: StaffRow) -> Self {
        Self {
            id: row.id,
            facility_id: row.facility_id,
            department_id: row.department_id,
            full_name: row.full_name,
            role: row.role,
            shift_id: row.shift_id,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StaffListRow {
    id: Uuid,
    facility_id: Uuid,
    department_id: Option<Uuid>,
    full_name: String,
    role: StaffRole,
    shift_id: Option<Uuid>,
    active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    facility_name: String,
    department_name: Option<String>,
    shift_name: Option<String>,
}

impl From<StaffListRow> for StaffListRecord {
    fn from(row: StaffListRow) -> Self {
        Self {
            staff: StaffRecord {
                id: row.id,
                facility_id: row.facility_id,
                department_id: row.department_id,
                full_name: row.full_name,
                role: row.role,
                shift_id: row.shift_id,
                active: row.active,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            facility_name: row.facility_name,
            department_name: row.department_name,
            shift_name: row.shift_name,
        }
    }
}

const STAFF_LIST_SELECT: &str = "SELECT s.id, s.facility_id, s.department_id, s.full_name, \
        s.role, s.shift_id, s.active, s.created_at, s.updated_at, \
        f.name AS facility_name, d.name AS department_name, sh.name AS shift_name \
 FROM staff s \
 INNER JOIN facilities f ON f.id = s.facility_id \
 LEFT JOIN departments d ON d.id = s.department_id \
 LEFT JOIN shifts sh ON sh.id = s.shift_id \
 WHERE 1=1 ";

fn apply_staff_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q StaffQueryFilter) {
    if let Some(facility_id) = filter.facility_id {
        qb.push(" AND s.facility_id = ");
        qb.push_bind(facility_id);
    }
    if let Some(role) = filter.role {
        qb.push(" AND s.role = ");
        qb.push_bind(role);
    }
    if let Some(search) = filter.search.as_ref() {
        qb.push(" AND s.full_name ILIKE ");
        qb.push_bind(super::like_pattern(search));
    }
}

#[async_trait]
impl StaffRepo for PostgresRepositories {
    async fn list_staff(
        &self,
        filter: &StaffQueryFilter,
        page: PageRequest,
    ) -> Result<Paged<StaffListRecord>, RepoError> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM staff s WHERE 1=1 ");
        apply_staff_filter(&mut count_qb, filter);

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(super::map_sqlx_error)?;

        let mut qb = QueryBuilder::new(STAFF_LIST_SELECT);
        apply_staff_filter(&mut qb, filter);
        qb.push(" ORDER BY s.full_name, s.id ");
        qb.push(" LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<StaffListRow>()
            .fetch_all(self.pool())
            .await
            .map_err(super::map_sqlx_error)?;

        Ok(Paged {
            items: rows.into_iter().map(StaffListRecord::from).collect(),
            page: page.page(),
            per_page: page.per_page(),
            total: Self::page_total(total)?,
        })
    }

    async fn find_staff(&self, id: Uuid) -> Result<Option<StaffListRecord>, RepoError> {
        let mut qb = QueryBuilder::new(STAFF_LIST_SELECT);
        qb.push(" AND s.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<StaffListRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(super::map_sqlx_error)?;

        Ok(row.map(StaffListRecord::from))
    }
}

#[async_trait]
impl StaffWriteRepo for PostgresRepositories {
    async fn create_staff(&self, params: CreateStaffParams) -> Result<StaffRecord, RepoError> {
        let row = sqlx::query_as::<_, StaffRow>(
            "INSERT INTO staff (id, facility_id, department_id, full_name, role, shift_id, active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
             RETURNING id, facility_id, department_id, full_name, role, shift_id, active, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(params.facility_id)
        .bind(params.department_id)
        .bind(&params.full_name)
        .bind(params.role)
        .bind(params.shift_id)
        .bind(params.active)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(StaffRecord::from(row))
    }

    async fn update_staff(&self, params: UpdateStaffParams) -> Result<StaffRecord, RepoError> {
        let row = sqlx::query_as::<_, StaffRow>(
            "UPDATE staff \
             SET facility_id = $2, department_id = $3, full_name = $4, role = $5, \
                 shift_id = $6, active = $7, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, facility_id, department_id, full_name, role, shift_id, active, created_at, updated_at",
        )
        .bind(params.id)
        .bind(params.facility_id)
        .bind(params.department_id)
        .bind(&params.full_name)
        .bind(params.role)
        .bind(params.shift_id)
        .bind(params.active)
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(StaffRecord::from(row))
    }
}
