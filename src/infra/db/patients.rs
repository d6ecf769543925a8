use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    application::pagination::{PageRequest, Paged},
    application::repos::{
        CreatePatientParams, PatientListRecord, PatientQueryFilter, PatientsRepo,
        PatientsWriteRepo, RepoError, UpdatePatientParams,
    },
    domain::entities::PatientRecord,
    domain::types::Gender,
};

use super::PostgresRepositories;

#[derive(sqlx::FromRow)]
struct PatientRow {
    id: Uuid,
    mrn: String,
    full_name: String,
    birth_date: Date,
    gender: Gender,
    city_id: Option<Uuid>,
    nationality_id: Option<Uuid>,
    marital_status_id: Option<Uuid>,
    blood_group_id: Option<Uuid>,
    phone: Option<String>,
    active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PatientRow> for PatientRecord {
    fn from(row: PatientRow) -> Self {
        Self {
            id: row.id,
            mrn: row.mrn,
            full_name: row.full_name,
            birth_date: row.birth_date,
            gender: row.gender,
            city_id: row.city_id,
            nationality_id: row.nationality_id,
            marital_status_id: row.marital_status_id,
            blood_group_id: row.blood_group_id,
            phone: row.phone,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PatientListRow {
    id: Uuid,
    mrn: String,
    full_name: String,
    birth_date: Date,
    gender: Gender,
    city_id: Option<Uuid>,
    nationality_id: Option<Uuid>,
    marital_status_id: Option<Uuid>,
    blood_group_id: Option<Uuid>,
    phone: Option<String>,
    active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    city_name: Option<String>,
    nationality_name: Option<String>,
    marital_status_name: Option<String>,
    blood_group_name: Option<String>,
}

impl From<PatientListRow> for PatientListRecord {
    fn from(row: PatientListRow) -> Self {
        Self {
            patient: PatientRecord {
                id: row.id,
                mrn: row.mrn,
                full_name: row.full_name,
                birth_date: row.birth_date,
                gender: row.gender,
                city_id: row.city_id,
                nationality_id: row.nationality_id,
                marital_status_id: row.marital_status_id,
                blood_group_id: row.blood_group_id,
                phone: row.phone,
                active: row.active,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            city_name: row.city_name,
            nationality_name: row.nationality_name,
            marital_status_name: row.marital_status_name,
            blood_group_name: row.blood_group_name,
        }
    }
}

const PATIENT_LIST_SELECT: &str = "SELECT p.id, p.mrn, p.full_name, p.birth_date, p.gender, \
        p.city_id, p.nationality_id, p.marital_status_id, p.blood_group_id, p.phone, p.active, \
        p.created_at, p.updated_at, \
        c.name AS city_name, n.name AS nationality_name, \
        ms.name AS marital_status_name, bg.name AS blood_group_name \
 FROM patients p \
 LEFT JOIN cities c ON c.id = p.city_id \
 LEFT JOIN nationalities n ON n.id = p.nationality_id \
 LEFT JOIN marital_statuses ms ON ms.id = p.marital_status_id \
 LEFT JOIN blood_groups bg ON bg.id = p.blood_group_id \
 WHERE 1=1 ";

fn apply_patient_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q PatientQueryFilter) {
    if let Some(search) = filter.search.as_ref() {
        let pattern = super::like_pattern(search);
        qb.push(" AND (p.full_name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR p.mrn ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
    if let Some(active) = filter.active {
        qb.push(" AND p.active = ");
        qb.push_bind(active);
    }
}

#[async_trait]
impl PatientsRepo for PostgresRepositories {
    async fn list_patients(
        &self,
        filter: &PatientQueryFilter,
        page: PageRequest,
    ) -> Result<Paged<PatientListRecord>, RepoError> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM patients p WHERE 1=1 ");
        apply_patient_filter(&mut count_qb, filter);

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(super::map_sqlx_error)?;

        let mut qb = QueryBuilder::new(PATIENT_LIST_SELECT);
        apply_patient_filter(&mut qb, filter);
        qb.push(" ORDER BY p.full_name, p.id ");
        qb.push(" LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<PatientListRow>()
            .fetch_all(self.pool())
            .await
            .map_err(super::map_sqlx_error)?;

        Ok(Paged {
            items: rows.into_iter().map(PatientListRecord::from).collect(),
            page: page.page(),
            per_page: page.per_page(),
            total: Self::page_total(total)?,
        })
    }

    async fn find_patient(&self, id: Uuid) -> Result<Option<PatientListRecord>, RepoError> {
        let mut qb = QueryBuilder::new(PATIENT_LIST_SELECT);
        qb.push(" AND p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PatientListRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(super::map_sqlx_error)?;

        Ok(row.map(PatientListRecord::from))
    }

    async fn find_patient_by_mrn(
        &self,
        mrn: &str,
    ) -> Result<Option<PatientListRecord>, RepoError> {
        let mut qb = QueryBuilder::new(PATIENT_LIST_SELECT);
        qb.push(" AND p.mrn = ");
        qb.push_bind(mrn);

        let row = qb
            .build_query_as::<PatientListRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(super::map_sqlx_error)?;

        Ok(row.map(PatientListRecord::from))
    }
}

#[async_trait]
impl PatientsWriteRepo for PostgresRepositories {
    async fn create_patient(
        &self,
        params: CreatePatientParams,
    ) -> Result<PatientRecord, RepoError> {
        let row = sqlx::query_as::<_, PatientRow>(
            "INSERT INTO patients (id, mrn, full_name, birth_date, gender, city_id, \
                 nationality_id, marital_status_id, blood_group_id, phone, active, \
                 created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12) \
             RETURNING id, mrn, full_name, birth_date, gender, city_id, nationality_id, \
                 marital_status_id, blood_group_id, phone, active, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&params.mrn)
        .bind(&params.full_name)
        .bind(params.birth_date)
        .bind(params.gender)
        .bind(params.city_id)
        .bind(params.nationality_id)
        .bind(params.marital_status_id)
        .bind(params.blood_group_id)
        .bind(&params.phone)
        .bind(params.active)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(PatientRecord::from(row))
    }

    async fn update_patient(
        &self,
        params: UpdatePatientParams,
    ) -> Result<PatientRecord, RepoError> {
        let row = sqlx::query_as::<_, PatientRow>(
            "UPDATE patients \
             SET full_name = $2, birth_date = $3, gender = $4, city_id = $5, \
                 nationality_id = $6, marital_status_id = $7, blood_group_id = $8, \
                 phone = $9, active = $10, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, mrn, full_name, birth_date, gender, city_id, nationality_id, \
                 marital_status_id, blood_group_id, phone, active, created_at, updated_at",
        )
        .bind(params.id)
        .bind(&params.full_name)
        .bind(params.birth_date)
        .bind(params.gender)
        .bind(params.city_id)
        .bind(params.nationality_id)
        .bind(params.marital_status_id)
        .bind(params.blood_group_id)
        .bind(&params.phone)
        .bind(params.active)
        .fetch_one(self.pool())
        .await
        .map_err(super::map_sqlx_error)?;

        Ok(PatientRecord::from(row))
    }
}
