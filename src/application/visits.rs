//! Admissions: visits and their clinical encounters.
//!
//! Visit state transitions also move beds between statuses, so every visit
//! mutation that touches a bed refreshes the bed scope alongside the visit
//! scope.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{PageRequest, Paged};
use crate::application::query::{CachePolicy, QueryDescriptor, QueryExecutor};
use crate::application::repos::{
    AddEncounterParams, EncounterListRecord, OpenVisitParams, RepoError, VisitListRecord,
    VisitQueryFilter, VisitsRepo, VisitsWriteRepo,
};
use crate::cache::{CacheKey, CacheScope, EntityTag, hash_value};
use crate::domain::entities::{EncounterRecord, VisitRecord};
use crate::domain::types::{EncounterKind, VisitStatus};

#[derive(Debug, Error)]
pub enum VisitError {
    #[error("constraint violation on `{0}`")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitDto {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub patient_mrn: String,
    pub facility_id: Uuid,
    pub facility_name: String,
    pub department_id: Option<Uuid>,
    pub department_name: Option<String>,
    pub bed_id: Option<Uuid>,
    pub bed_label: Option<String>,
    pub status: VisitStatus,
    pub admitted_at: OffsetDateTime,
    pub discharged_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncounterDto {
    pub id: Uuid,
    pub visit_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub staff_name: Option<String>,
    pub kind: EncounterKind,
    pub notes: Option<String>,
    pub occurred_at: OffsetDateTime,
}

pub fn visit_to_dto(record: &VisitListRecord) -> VisitDto {
    VisitDto {
        id: record.visit.id,
        patient_id: record.visit.patient_id,
        patient_name: record.patient_name.clone(),
        patient_mrn: record.patient_mrn.clone(),
        facility_id: record.visit.facility_id,
        facility_name: record.facility_name.clone(),
        department_id: record.visit.department_id,
        department_name: record.department_name.clone(),
        bed_id: record.visit.bed_id,
        bed_label: record.bed_label.clone(),
        status: record.visit.status,
        admitted_at: record.visit.admitted_at,
        discharged_at: record.visit.discharged_at,
    }
}

pub fn visit_from_dto(dto: &VisitDto) -> VisitRecord {
    VisitRecord {
        id: dto.id,
        patient_id: dto.patient_id,
        facility_id: dto.facility_id,
        department_id: dto.department_id,
        bed_id: dto.bed_id,
        status: dto.status,
        admitted_at: dto.admitted_at,
        discharged_at: dto.discharged_at,
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

pub fn encounter_to_dto(record: &EncounterListRecord) -> EncounterDto {
    EncounterDto {
        id: record.encounter.id,
        visit_id: record.encounter.visit_id,
        staff_id: record.encounter.staff_id,
        staff_name: record.staff_name.clone(),
        kind: record.encounter.kind,
        notes: record.encounter.notes.clone(),
        occurred_at: record.encounter.occurred_at,
    }
}

pub fn encounter_from_dto(dto: &EncounterDto) -> EncounterRecord {
    EncounterRecord {
        id: dto.id,
        visit_id: dto.visit_id,
        staff_id: dto.staff_id,
        kind: dto.kind,
        notes: dto.notes.clone(),
        occurred_at: dto.occurred_at,
        created_at: OffsetDateTime::UNIX_EPOCH,
    }
}

const VISIT_JOIN_TAGS: &[EntityTag] = &[
    EntityTag::Visit,
    EntityTag::Patient,
    EntityTag::Facility,
    EntityTag::Department,
    EntityTag::Bed,
];

struct VisitPage;

impl QueryDescriptor for VisitPage {
    type Output = Paged<VisitDto>;

    fn cache(&self) -> CachePolicy {
        CachePolicy::Bypass
    }
}

struct VisitById(Uuid);

impl QueryDescriptor for VisitById {
    type Output = VisitDto;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::ById {
                tag: EntityTag::Visit,
                id: self.0,
            },
            VISIT_JOIN_TAGS,
        )
    }
}

struct EncountersOfVisit(Uuid);

impl QueryDescriptor for EncountersOfVisit {
    type Output = Vec<EncounterDto>;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::Filtered {
                tag: EntityTag::Encounter,
                filter_hash: hash_value(&self.0),
            },
            &[EntityTag::Encounter, EntityTag::Staff],
        )
    }
}

#[derive(Clone)]
pub struct VisitService {
    reader: Arc<dyn VisitsRepo>,
    writer: Arc<dyn VisitsWriteRepo>,
    executor: QueryExecutor,
    visit_scope: CacheScope,
    encounter_scope: CacheScope,
    bed_scope: CacheScope,
}

impl VisitService {
    pub fn new(
        reader: Arc<dyn VisitsRepo>,
        writer: Arc<dyn VisitsWriteRepo>,
        executor: QueryExecutor,
    ) -> Self {
        let cache = executor.cache().clone();
        Self {
            reader,
            writer,
            visit_scope: CacheScope::new(EntityTag::Visit, cache.clone()),
            encounter_scope: CacheScope::new(EntityTag::Encounter, cache.clone()),
            bed_scope: CacheScope::new(EntityTag::Bed, cache),
            executor,
        }
    }

    /// One page of visits, most recent admissions first in the store.
    /// Always fetched fresh.
    pub async fn list_visits(
        &self,
        filter: VisitQueryFilter,
        page: PageRequest,
    ) -> Result<Arc<Paged<VisitDto>>, VisitError> {
        let reader = self.reader.clone();
        let result = self
            .executor
            .execute(&VisitPage, || async move {
                let records = reader.list_visits(&filter, page).await?;
                Ok(records.map(|record| visit_to_dto(&record)))
            })
            .await?;
        Ok(result)
    }

    pub async fn find_visit(&self, id: Uuid) -> Result<Option<Arc<VisitDto>>, VisitError> {
        let reader = self.reader.clone();
        let dto = self
            .executor
            .execute_one(&VisitById(id), || async move {
                Ok(reader.find_visit(id).await?.as_ref().map(visit_to_dto))
            })
            .await?;
        Ok(dto)
    }

    /// Encounters of one visit, oldest first.
    pub async fn list_encounters(
        &self,
        visit_id: Uuid,
    ) -> Result<Arc<Vec<EncounterDto>>, VisitError> {
        let reader = self.reader.clone();
        let dtos = self
            .executor
            .execute(&EncountersOfVisit(visit_id), || async move {
                let mut dtos: Vec<EncounterDto> = reader
                    .list_encounters(visit_id)
                    .await?
                    .iter()
                    .map(encounter_to_dto)
                    .collect();
                dtos.sort_by_key(|dto| dto.occurred_at);
                Ok(dtos)
            })
            .await?;
        Ok(dtos)
    }

    pub async fn open_visit(&self, params: OpenVisitParams) -> Result<VisitRecord, VisitError> {
        let assigns_bed = params.bed_id.is_some();
        let record = self.writer.open_visit(params).await?;
        self.visit_scope.refresh();
        if assigns_bed {
            self.bed_scope.refresh();
        }
        Ok(record)
    }

    pub async fn assign_bed(&self, visit_id: Uuid, bed_id: Uuid) -> Result<VisitRecord, VisitError> {
        let record = self.writer.assign_bed(visit_id, bed_id).await?;
        self.visit_scope.refresh();
        self.bed_scope.refresh();
        Ok(record)
    }

    pub async fn close_visit(
        &self,
        id: Uuid,
        discharged_at: OffsetDateTime,
    ) -> Result<VisitRecord, VisitError> {
        let record = self.writer.close_visit(id, discharged_at).await?;
        self.visit_scope.refresh();
        // Discharge frees the assigned bed, if any.
        self.bed_scope.refresh();
        Ok(record)
    }

    pub async fn cancel_visit(&self, id: Uuid) -> Result<VisitRecord, VisitError> {
        let record = self.writer.cancel_visit(id).await?;
        self.visit_scope.refresh();
        self.bed_scope.refresh();
        Ok(record)
    }

    pub async fn add_encounter(
        &self,
        params: AddEncounterParams,
    ) -> Result<EncounterRecord, VisitError> {
        if let Some(notes) = &params.notes
            && notes.trim().is_empty()
        {
            return Err(VisitError::ConstraintViolation("notes"));
        }
        let record = self.writer.add_encounter(params).await?;
        self.encounter_scope.refresh();
        Ok(record)
    }
}
