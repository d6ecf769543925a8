//! Staff roster. The paged roster changes often enough that it reads
//! straight from storage; only point lookups are cached.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{PageRequest, Paged};
use crate::application::query::{CachePolicy, QueryDescriptor, QueryExecutor};
use crate::application::repos::{
    CreateStaffParams, RepoError, StaffListRecord, StaffQueryFilter, StaffRepo, StaffWriteRepo,
    UpdateStaffParams,
};
use crate::cache::{CacheKey, CacheScope, EntityTag};
use crate::domain::entities::StaffRecord;
use crate::domain::types::StaffRole;

#[derive(Debug, Error)]
pub enum StaffError {
    #[error("constraint violation on `{0}`")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffDto {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub facility_name: String,
    pub department_id: Option<Uuid>,
    pub department_name: Option<String>,
    pub full_name: String,
    pub role: StaffRole,
    pub shift_id: Option<Uuid>,
    pub shift_name: Option<String>,
    pub active: bool,
}

pub fn staff_to_dto(record: &StaffListRecord) -> StaffDto {
    StaffDto {
        id: record.staff.id,
        facility_id: record.staff.facility_id,
        facility_name: record.facility_name.clone(),
        department_id: record.staff.department_id,
        department_name: record.department_name.clone(),
        full_name: record.staff.full_name.clone(),
        role: record.staff.role,
        shift_id: record.staff.shift_id,
        shift_name: record.shift_name.clone(),
        active: record.staff.active,
    }
}

pub fn staff_from_dto(dto: &StaffDto) -> StaffRecord {
    StaffRecord {
        id: dto.id,
        facility_id: dto.facility_id,
        department_id: dto.department_id,
        full_name: dto.full_name.clone(),
        role: dto.role,
        shift_id: dto.shift_id,
        active: dto.active,
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

pub fn staff_apply_update(record: &mut StaffRecord, params: &UpdateStaffParams) {
    record.facility_id = params.facility_id;
    record.department_id = params.department_id;
    record.full_name = params.full_name.clone();
    record.role = params.role;
    record.shift_id = params.shift_id;
    record.active = params.active;
}

pub fn staff_clone_to_create(dto: &StaffDto) -> CreateStaffParams {
    CreateStaffParams {
        facility_id: dto.facility_id,
        department_id: dto.department_id,
        full_name: dto.full_name.clone(),
        role: dto.role,
        shift_id: dto.shift_id,
        active: dto.active,
    }
}

const STAFF_JOIN_TAGS: &[EntityTag] = &[
    EntityTag::Staff,
    EntityTag::Facility,
    EntityTag::Department,
    EntityTag::Shift,
];

struct StaffPage;

impl QueryDescriptor for StaffPage {
    type Output = Paged<StaffDto>;

    fn cache(&self) -> CachePolicy {
        CachePolicy::Bypass
    }
}

struct StaffById(Uuid);

impl QueryDescriptor for StaffById {
    type Output = StaffDto;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::ById {
                tag: EntityTag::Staff,
                id: self.0,
            },
            STAFF_JOIN_TAGS,
        )
    }
}

#[derive(Clone)]
pub struct StaffService {
    reader: Arc<dyn StaffRepo>,
    writer: Arc<dyn StaffWriteRepo>,
    executor: QueryExecutor,
    scope: CacheScope,
}

impl StaffService {
    pub fn new(
        reader: Arc<dyn StaffRepo>,
        writer: Arc<dyn StaffWriteRepo>,
        executor: QueryExecutor,
    ) -> Self {
        let scope = CacheScope::new(EntityTag::Staff, executor.cache().clone());
        Self {
            reader,
            writer,
            executor,
            scope,
        }
    }

    /// One page of the roster, ordered by full name in the store. Always
    /// fetched fresh.
    pub async fn list_staff(
        &self,
        filter: StaffQueryFilter,
        page: PageRequest,
    ) -> Result<Arc<Paged<StaffDto>>, StaffError> {
        let reader = self.reader.clone();
        let result = self
            .executor
            .execute(&StaffPage, || async move {
                let records = reader.list_staff(&filter, page).await?;
                Ok(records.map(|record| staff_to_dto(&record)))
            })
            .await?;
        Ok(result)
    }

    pub async fn find_staff(&self, id: Uuid) -> Result<Option<Arc<StaffDto>>, StaffError> {
        let reader = self.reader.clone();
        let dto = self
            .executor
            .execute_one(&StaffById(id), || async move {
                Ok(reader.find_staff(id).await?.as_ref().map(staff_to_dto))
            })
            .await?;
        Ok(dto)
    }

    pub async fn create_staff(&self, params: CreateStaffParams) -> Result<StaffRecord, StaffError> {
        ensure_non_empty(&params.full_name, "full_name")?;
        let record = self.writer.create_staff(params).await?;
        self.scope.refresh();
        Ok(record)
    }

    pub async fn update_staff(&self, params: UpdateStaffParams) -> Result<StaffRecord, StaffError> {
        ensure_non_empty(&params.full_name, "full_name")?;
        let record = self.writer.update_staff(params).await?;
        self.scope.refresh();
        Ok(record)
    }
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), StaffError> {
    if value.trim().is_empty() {
        return Err(StaffError::ConstraintViolation(field));
    }
    Ok(())
}
