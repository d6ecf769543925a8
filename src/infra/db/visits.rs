use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::pagination::{PageRequest, Paged},
    application::repos::{
        AddEncounterParams, EncounterListRecord, OpenVisitParams, RepoError, VisitListRecord,
        VisitQueryFilter, VisitsRepo, VisitsWriteRepo,
    },
    domain::entities::{EncounterRecord, VisitRecord},
    domain::types::{BedStatus, EncounterKind, VisitStatus},
};

use super::PostgresRepositories;

#[derive(sqlx::FromRow)]
struct VisitRow {
    id: Uuid,
    patient_id: Uuid,
    facility_id: Uuid,
    department_id: Option<Uuid>,
    bed_id: Option<Uuid>,
    status: VisitStatus,
    admitted_at: OffsetDateTime,
    discharged_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<VisitRow> for VisitRecord {
    fn from(row: VisitRow) -> Self {
        Self {
            id: row.id,
            patient_id: row.patient_id,
            facility_id: row.facility_id,
            department_id: row.department_id,
            bed_id: row.bed_id,
            status: row.status,
            admitted_at: row.admitted_at,
            discharged_at: row.discharged_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VisitListRow {
    id: Uuid,
    patient_id: Uuid,
    facility_id: Uuid,
    department_id: Option<Uuid>,
    bed_id: Option<Uuid>,
    status: VisitStatus,
    admitted_at: OffsetDateTime,
    discharged_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    patient_name: String,
    patient_mrn: String,
    facility_name: String,
    department_name: Option<String>,
    bed_label: Option<String>,
}

impl From<VisitListRow> for VisitListRecord {
    fn from(row: VisitListRow) -> Self {
        Self {
            visit: VisitRecord {
                id: row.id,
                patient_id: row.patient_id,
                facility_id: row.facility_id,
                department_id: row.department_id,
                bed_id: row.bed_id,
                status: row.status,
                admitted_at: row.admitted_at,
                discharged_at: row.discharged_at,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            patient_name: row.patient_name,
            patient_mrn: row.patient_mrn,
            facility_name: row.facility_name,
            department_name: row.department_name,
            bed_label: row.bed_label,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EncounterListRow {
    id: Uuid,
    visit_id: Uuid,
    staff_id: Option<Uuid>,
    kind: EncounterKind,
    notes: Option<String>,
    occurred_at: OffsetDateTime,
    created_at: OffsetDateTime,
    staff_name: Option<String>,
}

impl From<EncounterListRow> for EncounterListRecord {
    fn from(row: EncounterListRow) -> Self {
        Self {
            encounter: EncounterRecord {
                id: row.id,
                visit_id: row.visit_id,
                staff_id: row.staff_id,
                kind: row.kind,
                notes: row.notes,
                occurred_at: row.occurred_at,
                created_at: row.created_at,
            },
            staff_name: row.staff_name,
        }
    }
}

const VISIT_LIST_SELECT: &str = "SELECT v.id, v.patient_id, v.facility_id, v.department_id, \
        v.bed_id, v.status, v.admitted_at, v.discharged_at, v.created_at, v.updated_at, \
        p.full_name AS patient_name, p.mrn AS patient_mrn, f.name AS facility_name, \
        d.name AS department_name, b.label AS bed_label \
 FROM visits v \
 INNER JOIN patients p ON p.id = v.patient_id \
 INNER JOIN facilities f ON f.id = v.facility_id \
 LEFT JOIN departments d ON d.id = v.department_id \
 LEFT JOIN beds b ON b.id = v.bed_id \
 WHERE 1=1 ";

const VISIT_RETURNING: &str = "RETURNING id, patient_id, facility_id, department_id, bed_id, \
    status, admitted_at, discharged_at, created_at, updated_at";

fn apply_visit_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q VisitQueryFilter) {
    if let Some(patient_id) = filter.patient_id {
        qb.push(" AND v.patient_id = ");
        qb.push_bind(patient_id);
    }
    if let Some(facility_id) = filter.facility_id {
        qb.push(" AND v.facility_id = ");
        qb.push_bind(facility_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND v.status = ");
        qb.push_bind(status);
    }
}

#[async_trait]
impl VisitsRepo for PostgresRepositories {
    async fn list_visits(
        &self,
        filter: &VisitQueryFilter,
        page: PageRequest,
    ) -> Result<Paged<VisitListRecord>, RepoError> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM visits v WHERE 1=1 ");
        apply_visit_filter(&mut count_qb, filter);

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(super::map_sqlx_error)?;

        let mut qb = QueryBuilder::new(VISIT_LIST_SELECT);
        apply_visit_filter(&mut qb, filter);
        qb.push(" ORDER BY v.admitted_at DESC, v.id DESC ");
        qb.push(" LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<VisitListRow>()
            .fetch_all(self.pool())
            .await
            .map_err(super::map_sqlx_error)?;

        Ok(Paged {
            items: rows.into_iter().map(VisitListRecord::from).collect(),
            page: page.page(),
            per_page: page.per_page(),
            total: Self::page_total(total)?,
        })
    }

    async fn find_visit(&self, id: Uuid) -> Result<Option<VisitListRecord>, RepoError> {
        let mut qb = QueryBuilder::new(VISIT_LIST_SELECT);
        qb.push(" AND v.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<VisitListRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(super::map_sqlx_error)?;

        Ok(row.map(VisitListRecord::from))
    }

    async fn list_encounters(
        &self,
        visit_id: Uuid,
    ) -> Result<Vec<EncounterListRecord>, RepoError> {
        let rows = sqlx::query_as::<_, EncounterListRow>(
            "SELECT e.id, e.visit_id, e.staff_id, e.kind, e.notes, e.occurred_at, e.created_at, \
                    s.full_name AS staff_name \
             FROM encounters e \
             LEFT JOIN staff s ON s.id = e.staff_id \
             WHERE e.visit_id = $1 \
             ORDER BY e.occurred_at, e.id",
        )
        .bind(visit_id)
        .fetch_all(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(rows.into_iter().map(EncounterListRecord::from).collect())
    }
}

#[async_trait]
impl VisitsWriteRepo for PostgresRepositories {
    async fn open_visit(&self, params: OpenVisitParams) -> Result<VisitRecord, RepoError> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(super::map_sqlx_error)?;

        let row = sqlx::query_as::<_, VisitRow>(&format!(
            "INSERT INTO visits (id, patient_id, facility_id, department_id, bed_id, status, \
                 admitted_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, 'open', $6, $7, $7) {VISIT_RETURNING}"
        ))
        .bind(Uuid::new_v4())
        .bind(params.patient_id)
        .bind(params.facility_id)
        .bind(params.department_id)
        .bind(params.bed_id)
        .bind(params.admitted_at)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&mut *tx)
        .await
        .map_err(super::map_sqlx_error)?;

        if let Some(bed_id) = params.bed_id {
            occupy_bed(&mut tx, bed_id).await?;
        }

        tx.commit().await.map_err(super::map_sqlx_error)?;
        Ok(VisitRecord::from(row))
    }

    async fn assign_bed(&self, visit_id: Uuid, bed_id: Uuid) -> Result<VisitRecord, RepoError> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(super::map_sqlx_error)?;

        // Lock the visit row first: the bed it currently holds must be
        // released in the same transaction, or it stays occupied forever.
        let prior_bed: Option<Uuid> = sqlx::query_scalar(
            "SELECT bed_id FROM visits WHERE id = $1 AND status = 'open' FOR UPDATE",
        )
        .bind(visit_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(super::map_sqlx_error)?;

        let row = sqlx::query_as::<_, VisitRow>(&format!(
            "UPDATE visits SET bed_id = $2, updated_at = now() \
             WHERE id = $1 {VISIT_RETURNING}"
        ))
        .bind(visit_id)
        .bind(bed_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(super::map_sqlx_error)?;

        if prior_bed != Some(bed_id) {
            if let Some(prior) = prior_bed {
                release_bed(&mut tx, prior).await?;
            }
            occupy_bed(&mut tx, bed_id).await?;
        }

        tx.commit().await.map_err(super::map_sqlx_error)?;
        Ok(VisitRecord::from(row))
    }

    async fn close_visit(
        &self,
        id: Uuid,
        discharged_at: OffsetDateTime,
    ) -> Result<VisitRecord, RepoError> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(super::map_sqlx_error)?;

        let row = sqlx::query_as::<_, VisitRow>(&format!(
            "UPDATE visits SET status = 'closed', discharged_at = $2, updated_at = now() \
             WHERE id = $1 AND status = 'open' {VISIT_RETURNING}"
        ))
        .bind(id)
        .bind(discharged_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(super::map_sqlx_error)?;

        if let Some(bed_id) = row.bed_id {
            release_bed(&mut tx, bed_id).await?;
        }

        tx.commit().await.map_err(super::map_sqlx_error)?;
        Ok(VisitRecord::from(row))
    }

    async fn cancel_visit(&self, id: Uuid) -> Result<VisitRecord, RepoError> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(super::map_sqlx_error)?;

        let row = sqlx::query_as::<_, VisitRow>(&format!(
            "UPDATE visits SET status = 'cancelled', updated_at = now() \
             WHERE id = $1 AND status = 'open' {VISIT_RETURNING}"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(super::map_sqlx_error)?;

        if let Some(bed_id) = row.bed_id {
            release_bed(&mut tx, bed_id).await?;
        }

        tx.commit().await.map_err(super::map_sqlx_error)?;
        Ok(VisitRecord::from(row))
    }

    async fn add_encounter(
        &self,
        params: AddEncounterParams,
    ) -> Result<EncounterRecord, RepoError> {
        #[derive(sqlx::FromRow)]
        struct EncounterRow {
            id: Uuid,
            visit_id: Uuid,
            staff_id: Option<Uuid>,
            kind: EncounterKind,
            notes: Option<String>,
            occurred_at: OffsetDateTime,
            created_at: OffsetDateTime,
        }

        let row = sqlx::query_as::<_, EncounterRow>(
            "INSERT INTO encounters (id, visit_id, staff_id, kind, notes, occurred_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, visit_id, staff_id, kind, notes, occurred_at, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(params.visit_id)
        .bind(params.staff_id)
        .bind(params.kind)
        .bind(&params.notes)
        .bind(params.occurred_at)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(EncounterRecord {
            id: row.id,
            visit_id: row.visit_id,
            staff_id: row.staff_id,
            kind: row.kind,
            notes: row.notes,
            occurred_at: row.occurred_at,
            created_at: row.created_at,
        })
    }
}

async fn occupy_bed(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    bed_id: Uuid,
) -> Result<(), RepoError> {
    let updated = sqlx::query(
        "UPDATE beds SET status = $2, updated_at = now() WHERE id = $1 AND status = $3",
    )
    .bind(bed_id)
    .bind(BedStatus::Occupied)
    .bind(BedStatus::Available)
    .execute(&mut **tx)
    .await
    .map_err(super::map_sqlx_error)?;

    if updated.rows_affected() == 0 {
        return Err(RepoError::Integrity {
            message: format!("bed {bed_id} is not available"),
        });
    }
    Ok(())
}

async fn release_bed(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    bed_id: Uuid,
) -> Result<(), RepoError> {
    sqlx::query(
        "UPDATE beds SET status = $2, updated_at = now() WHERE id = $1 AND status = $3",
    )
    .bind(bed_id)
    .bind(BedStatus::Available)
    .bind(BedStatus::Occupied)
    .execute(&mut **tx)
    .await
    .map_err(super::map_sqlx_error)?;

    Ok(())
}
