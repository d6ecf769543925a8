//! Patient registry: demographics joined with their lookup display names.
//!
//! The paged patient list is cached per (filter, page) combination; any
//! lookup mutation that could change a displayed name evicts it through the
//! entry's tags.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::application::pagination::{PageRequest, Paged};
use crate::application::query::{CachePolicy, QueryDescriptor, QueryExecutor};
use crate::application::repos::{
    CreatePatientParams, PatientListRecord, PatientQueryFilter, PatientsRepo, PatientsWriteRepo,
    RepoError, UpdatePatientParams,
};
use crate::cache::{CacheKey, CacheScope, EntityTag, hash_value};
use crate::domain::entities::PatientRecord;
use crate::domain::types::Gender;

#[derive(Debug, Error)]
pub enum PatientError {
    #[error("constraint violation on `{0}`")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientDto {
    pub id: Uuid,
    pub mrn: String,
    pub full_name: String,
    pub birth_date: Date,
    pub gender: Gender,
    pub city_id: Option<Uuid>,
    pub city_name: Option<String>,
    pub nationality_id: Option<Uuid>,
    pub nationality_name: Option<String>,
    pub marital_status_id: Option<Uuid>,
    pub marital_status_name: Option<String>,
    pub blood_group_id: Option<Uuid>,
    pub blood_group_name: Option<String>,
    pub phone: Option<String>,
    pub active: bool,
}

pub fn patient_to_dto(record: &PatientListRecord) -> PatientDto {
    PatientDto {
        id: record.patient.id,
        mrn: record.patient.mrn.clone(),
        full_name: record.patient.full_name.clone(),
        birth_date: record.patient.birth_date,
        gender: record.patient.gender,
        city_id: record.patient.city_id,
        city_name: record.city_name.clone(),
        nationality_id: record.patient.nationality_id,
        nationality_name: record.nationality_name.clone(),
        marital_status_id: record.patient.marital_status_id,
        marital_status_name: record.marital_status_name.clone(),
        blood_group_id: record.patient.blood_group_id,
        blood_group_name: record.blood_group_name.clone(),
        phone: record.patient.phone.clone(),
        active: record.patient.active,
    }
}

/// Rebuild an entity from the fields a DTO carries; server-assigned
/// timestamps default to the epoch.
pub fn patient_from_dto(dto: &PatientDto) -> PatientRecord {
    PatientRecord {
        id: dto.id,
        mrn: dto.mrn.clone(),
        full_name: dto.full_name.clone(),
        birth_date: dto.birth_date,
        gender: dto.gender,
        city_id: dto.city_id,
        nationality_id: dto.nationality_id,
        marital_status_id: dto.marital_status_id,
        blood_group_id: dto.blood_group_id,
        phone: dto.phone.clone(),
        active: dto.active,
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

/// Overwrite the mutable fields of an entity with the command values. The
/// medical record number is immutable after registration.
pub fn patient_apply_update(record: &mut PatientRecord, params: &UpdatePatientParams) {
    record.full_name = params.full_name.clone();
    record.birth_date = params.birth_date;
    record.gender = params.gender;
    record.city_id = params.city_id;
    record.nationality_id = params.nationality_id;
    record.marital_status_id = params.marital_status_id;
    record.blood_group_id = params.blood_group_id;
    record.phone = params.phone.clone();
    record.active = params.active;
}

/// Derive a create command from an existing DTO, leaving out the identifier
/// so the store assigns a fresh one.
pub fn patient_clone_to_create(dto: &PatientDto) -> CreatePatientParams {
    CreatePatientParams {
        mrn: dto.mrn.clone(),
        full_name: dto.full_name.clone(),
        birth_date: dto.birth_date,
        gender: dto.gender,
        city_id: dto.city_id,
        nationality_id: dto.nationality_id,
        marital_status_id: dto.marital_status_id,
        blood_group_id: dto.blood_group_id,
        phone: dto.phone.clone(),
        active: dto.active,
    }
}

const PATIENT_JOIN_TAGS: &[EntityTag] = &[
    EntityTag::Patient,
    EntityTag::City,
    EntityTag::Nationality,
    EntityTag::MaritalStatus,
    EntityTag::BloodGroup,
];

struct PatientPage {
    filter: PatientQueryFilter,
    page: PageRequest,
}

impl QueryDescriptor for PatientPage {
    type Output = Paged<PatientDto>;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::Page {
                tag: EntityTag::Patient,
                filter_hash: hash_value(&self.filter),
                page: self.page.page(),
                per_page: self.page.per_page(),
            },
            PATIENT_JOIN_TAGS,
        )
    }
}

struct PatientById(Uuid);

impl QueryDescriptor for PatientById {
    type Output = PatientDto;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::ById {
                tag: EntityTag::Patient,
                id: self.0,
            },
            PATIENT_JOIN_TAGS,
        )
    }
}

struct PatientByMrn(String);

impl QueryDescriptor for PatientByMrn {
    type Output = PatientDto;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::Filtered {
                tag: EntityTag::Patient,
                filter_hash: hash_value(&self.0),
            },
            PATIENT_JOIN_TAGS,
        )
    }
}

#[derive(Clone)]
pub struct PatientService {
    reader: Arc<dyn PatientsRepo>,
    writer: Arc<dyn PatientsWriteRepo>,
    executor: QueryExecutor,
    scope: CacheScope,
}

impl PatientService {
    pub fn new(
        reader: Arc<dyn PatientsRepo>,
        writer: Arc<dyn PatientsWriteRepo>,
        executor: QueryExecutor,
    ) -> Self {
        let scope = CacheScope::new(EntityTag::Patient, executor.cache().clone());
        Self {
            reader,
            writer,
            executor,
            scope,
        }
    }

    /// One page of patients matching the filter, ordered by full name in the
    /// store.
    pub async fn list_patients(
        &self,
        filter: PatientQueryFilter,
        page: PageRequest,
    ) -> Result<Arc<Paged<PatientDto>>, PatientError> {
        let reader = self.reader.clone();
        let fetch_filter = filter.clone();
        let descriptor = PatientPage { filter, page };
        let result = self
            .executor
            .execute(&descriptor, || async move {
                let records = reader.list_patients(&fetch_filter, page).await?;
                Ok(records.map(|record| patient_to_dto(&record)))
            })
            .await?;
        Ok(result)
    }

    pub async fn find_patient(&self, id: Uuid) -> Result<Option<Arc<PatientDto>>, PatientError> {
        let reader = self.reader.clone();
        let dto = self
            .executor
            .execute_one(&PatientById(id), || async move {
                Ok(reader.find_patient(id).await?.as_ref().map(patient_to_dto))
            })
            .await?;
        Ok(dto)
    }

    pub async fn find_patient_by_mrn(
        &self,
        mrn: &str,
    ) -> Result<Option<Arc<PatientDto>>, PatientError> {
        let reader = self.reader.clone();
        let owned = mrn.to_string();
        let descriptor = PatientByMrn(owned.clone());
        let dto = self
            .executor
            .execute_one(&descriptor, || async move {
                Ok(reader
                    .find_patient_by_mrn(&owned)
                    .await?
                    .as_ref()
                    .map(patient_to_dto))
            })
            .await?;
        Ok(dto)
    }

    pub async fn register_patient(
        &self,
        params: CreatePatientParams,
    ) -> Result<PatientRecord, PatientError> {
        ensure_non_empty(&params.mrn, "mrn")?;
        ensure_non_empty(&params.full_name, "full_name")?;
        let record = self.writer.create_patient(params).await?;
        self.scope.refresh();
        Ok(record)
    }

    pub async fn update_patient(
        &self,
        params: UpdatePatientParams,
    ) -> Result<PatientRecord, PatientError> {
        ensure_non_empty(&params.full_name, "full_name")?;
        let record = self.writer.update_patient(params).await?;
        self.scope.refresh();
        Ok(record)
    }
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), PatientError> {
    if value.trim().is_empty() {
        return Err(PatientError::ConstraintViolation(field));
    }
    Ok(())
}
