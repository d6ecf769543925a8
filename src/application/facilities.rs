//! Facility structure: facilities, departments, rooms and beds.
//!
//! Bed DTOs flatten the room → department → facility chain into display
//! names, so cached bed lists carry all four entity tags and a rename
//! anywhere in the chain evicts them.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::query::{CachePolicy, QueryDescriptor, QueryExecutor};
use crate::application::repos::{
    BedListRecord, BedQueryFilter, CreateBedParams, CreateDepartmentParams, CreateFacilityParams,
    CreateRoomParams, FacilitiesRepo, FacilitiesWriteRepo, FacilityListRecord, RepoError,
    UpdateBedParams, UpdateDepartmentParams, UpdateFacilityParams, UpdateRoomParams,
};
use crate::cache::{CacheKey, CacheScope, EntityTag, hash_value};
use crate::domain::entities::{BedRecord, DepartmentRecord, FacilityRecord, RoomRecord};
use crate::domain::types::{BedStatus, RoomKind};

#[derive(Debug, Error)]
pub enum FacilityError {
    #[error("constraint violation on `{0}`")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacilityDto {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub city_id: Option<Uuid>,
    pub city_name: Option<String>,
    pub address: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentDto {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub code: String,
    pub name: String,
    pub floor: Option<i16>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomDto {
    pub id: Uuid,
    pub department_id: Uuid,
    pub name: String,
    pub kind: RoomKind,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BedDto {
    pub id: Uuid,
    pub room_id: Uuid,
    pub label: String,
    pub status: BedStatus,
    pub active: bool,
    pub room_name: String,
    pub department_name: String,
    pub facility_name: String,
}

// ============================================================================
// Mappers
// ============================================================================

pub fn facility_to_dto(record: &FacilityListRecord) -> FacilityDto {
    FacilityDto {
        id: record.facility.id,
        code: record.facility.code.clone(),
        name: record.facility.name.clone(),
        city_id: record.facility.city_id,
        city_name: record.city_name.clone(),
        address: record.facility.address.clone(),
        active: record.facility.active,
    }
}

/// Rebuild an entity from the fields a DTO carries; server-assigned
/// timestamps default to the epoch.
pub fn facility_from_dto(dto: &FacilityDto) -> FacilityRecord {
    FacilityRecord {
        id: dto.id,
        code: dto.code.clone(),
        name: dto.name.clone(),
        city_id: dto.city_id,
        address: dto.address.clone(),
        active: dto.active,
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

pub fn facility_apply_update(record: &mut FacilityRecord, params: &UpdateFacilityParams) {
    record.code = params.code.clone();
    record.name = params.name.clone();
    record.city_id = params.city_id;
    record.address = params.address.clone();
    record.active = params.active;
}

pub fn facility_clone_to_create(dto: &FacilityDto) -> CreateFacilityParams {
    CreateFacilityParams {
        code: dto.code.clone(),
        name: dto.name.clone(),
        city_id: dto.city_id,
        address: dto.address.clone(),
        active: dto.active,
    }
}

pub fn department_to_dto(record: &DepartmentRecord) -> DepartmentDto {
    DepartmentDto {
        id: record.id,
        facility_id: record.facility_id,
        code: record.code.clone(),
        name: record.name.clone(),
        floor: record.floor,
        active: record.active,
    }
}

pub fn department_from_dto(dto: &DepartmentDto) -> DepartmentRecord {
    DepartmentRecord {
        id: dto.id,
        facility_id: dto.facility_id,
        code: dto.code.clone(),
        name: dto.name.clone(),
        floor: dto.floor,
        active: dto.active,
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

pub fn department_apply_update(record: &mut DepartmentRecord, params: &UpdateDepartmentParams) {
    record.code = params.code.clone();
    record.name = params.name.clone();
    record.floor = params.floor;
    record.active = params.active;
}

pub fn department_clone_to_create(dto: &DepartmentDto) -> CreateDepartmentParams {
    CreateDepartmentParams {
        facility_id: dto.facility_id,
        code: dto.code.clone(),
        name: dto.name.clone(),
        floor: dto.floor,
        active: dto.active,
    }
}

pub fn room_to_dto(record: &RoomRecord) -> RoomDto {
    RoomDto {
        id: record.id,
        department_id: record.department_id,
        name: record.name.clone(),
        kind: record.kind,
        active: record.active,
    }
}

pub fn room_from_dto(dto: &RoomDto) -> RoomRecord {
    RoomRecord {
        id: dto.id,
        department_id: dto.department_id,
        name: dto.name.clone(),
        kind: dto.kind,
        active: dto.active,
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

pub fn room_apply_update(record: &mut RoomRecord, params: &UpdateRoomParams) {
    record.name = params.name.clone();
    record.kind = params.kind;
    record.active = params.active;
}

pub fn room_clone_to_create(dto: &RoomDto) -> CreateRoomParams {
    CreateRoomParams {
        department_id: dto.department_id,
        name: dto.name.clone(),
        kind: dto.kind,
        active: dto.active,
    }
}

pub fn bed_to_dto(record: &BedListRecord) -> BedDto {
    BedDto {
        id: record.bed.id,
        room_id: record.bed.room_id,
        label: record.bed.label.clone(),
        status: record.bed.status,
        active: record.bed.active,
        room_name: record.room_name.clone(),
        department_name: record.department_name.clone(),
        facility_name: record.facility_name.clone(),
    }
}

pub fn bed_from_dto(dto: &BedDto) -> BedRecord {
    BedRecord {
        id: dto.id,
        room_id: dto.room_id,
        label: dto.label.clone(),
        status: dto.status,
        active: dto.active,
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

pub fn bed_apply_update(record: &mut BedRecord, params: &UpdateBedParams) {
    record.label = params.label.clone();
    record.status = params.status;
    record.active = params.active;
}

pub fn bed_clone_to_create(dto: &BedDto) -> CreateBedParams {
    CreateBedParams {
        room_id: dto.room_id,
        label: dto.label.clone(),
        status: dto.status,
        active: dto.active,
    }
}

// ============================================================================
// Query descriptors
// ============================================================================

const BED_JOIN_TAGS: &[EntityTag] = &[
    EntityTag::Bed,
    EntityTag::Room,
    EntityTag::Department,
    EntityTag::Facility,
];

struct ActiveFacilities;

impl QueryDescriptor for ActiveFacilities {
    type Output = Vec<FacilityDto>;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::All(EntityTag::Facility),
            &[EntityTag::Facility, EntityTag::City],
        )
    }
}

struct FacilityById(Uuid);

impl QueryDescriptor for FacilityById {
    type Output = FacilityDto;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::ById {
                tag: EntityTag::Facility,
                id: self.0,
            },
            &[EntityTag::Facility, EntityTag::City],
        )
    }
}

struct DepartmentsOfFacility(Uuid);

impl QueryDescriptor for DepartmentsOfFacility {
    type Output = Vec<DepartmentDto>;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::Filtered {
                tag: EntityTag::Department,
                filter_hash: hash_value(&self.0),
            },
            &[EntityTag::Department],
        )
    }
}

struct RoomsOfDepartment(Uuid);

impl QueryDescriptor for RoomsOfDepartment {
    type Output = Vec<RoomDto>;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::Filtered {
                tag: EntityTag::Room,
                filter_hash: hash_value(&self.0),
            },
            &[EntityTag::Room],
        )
    }
}

struct BedList(BedQueryFilter);

impl QueryDescriptor for BedList {
    type Output = Vec<BedDto>;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::Filtered {
                tag: EntityTag::Bed,
                filter_hash: hash_value(&self.0),
            },
            BED_JOIN_TAGS,
        )
    }
}

struct BedById(Uuid);

impl QueryDescriptor for BedById {
    type Output = BedDto;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::ById {
                tag: EntityTag::Bed,
                id: self.0,
            },
            BED_JOIN_TAGS,
        )
    }
}

// ============================================================================
// Service
// ============================================================================

#[derive(Clone)]
pub struct FacilityService {
    reader: Arc<dyn FacilitiesRepo>,
    writer: Arc<dyn FacilitiesWriteRepo>,
    executor: QueryExecutor,
    facility_scope: CacheScope,
    department_scope: CacheScope,
    room_scope: CacheScope,
    bed_scope: CacheScope,
}

impl FacilityService {
    pub fn new(
        reader: Arc<dyn FacilitiesRepo>,
        writer: Arc<dyn FacilitiesWriteRepo>,
        executor: QueryExecutor,
    ) -> Self {
        let cache = executor.cache().clone();
        Self {
            reader,
            writer,
            facility_scope: CacheScope::new(EntityTag::Facility, cache.clone()),
            department_scope: CacheScope::new(EntityTag::Department, cache.clone()),
            room_scope: CacheScope::new(EntityTag::Room, cache.clone()),
            bed_scope: CacheScope::new(EntityTag::Bed, cache),
            executor,
        }
    }

    /// Active facilities ordered by name.
    pub async fn list_facilities(&self) -> Result<Arc<Vec<FacilityDto>>, FacilityError> {
        let reader = self.reader.clone();
        let dtos = self
            .executor
            .execute(&ActiveFacilities, || async move {
                let mut dtos: Vec<FacilityDto> = reader
                    .list_facilities(true)
                    .await?
                    .iter()
                    .map(facility_to_dto)
                    .collect();
                dtos.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(dtos)
            })
            .await?;
        Ok(dtos)
    }

    pub async fn find_facility(&self, id: Uuid) -> Result<Option<Arc<FacilityDto>>, FacilityError> {
        let reader = self.reader.clone();
        let dto = self
            .executor
            .execute_one(&FacilityById(id), || async move {
                Ok(reader.find_facility(id).await?.as_ref().map(facility_to_dto))
            })
            .await?;
        Ok(dto)
    }

    /// Active departments of one facility, ordered by name.
    pub async fn list_departments(
        &self,
        facility_id: Uuid,
    ) -> Result<Arc<Vec<DepartmentDto>>, FacilityError> {
        let reader = self.reader.clone();
        let dtos = self
            .executor
            .execute(&DepartmentsOfFacility(facility_id), || async move {
                let mut dtos: Vec<DepartmentDto> = reader
                    .list_departments(facility_id, true)
                    .await?
                    .iter()
                    .map(department_to_dto)
                    .collect();
                dtos.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(dtos)
            })
            .await?;
        Ok(dtos)
    }

    pub async fn find_department(
        &self,
        id: Uuid,
    ) -> Result<Option<DepartmentDto>, FacilityError> {
        Ok(self
            .reader
            .find_department(id)
            .await?
            .as_ref()
            .map(department_to_dto))
    }

    /// Active rooms of one department, ordered by name.
    pub async fn list_rooms(
        &self,
        department_id: Uuid,
    ) -> Result<Arc<Vec<RoomDto>>, FacilityError> {
        let reader = self.reader.clone();
        let dtos = self
            .executor
            .execute(&RoomsOfDepartment(department_id), || async move {
                let mut dtos: Vec<RoomDto> = reader
                    .list_rooms(department_id, true)
                    .await?
                    .iter()
                    .map(room_to_dto)
                    .collect();
                dtos.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(dtos)
            })
            .await?;
        Ok(dtos)
    }

    /// Beds matching the filter, ordered by label.
    pub async fn list_beds(
        &self,
        filter: BedQueryFilter,
    ) -> Result<Arc<Vec<BedDto>>, FacilityError> {
        let reader = self.reader.clone();
        let fetch_filter = filter.clone();
        let dtos = self
            .executor
            .execute(&BedList(filter), || async move {
                let mut dtos: Vec<BedDto> = reader
                    .list_beds(&fetch_filter)
                    .await?
                    .iter()
                    .map(bed_to_dto)
                    .collect();
                dtos.sort_by(|a, b| a.label.cmp(&b.label));
                Ok(dtos)
            })
            .await?;
        Ok(dtos)
    }

    pub async fn find_bed(&self, id: Uuid) -> Result<Option<Arc<BedDto>>, FacilityError> {
        let reader = self.reader.clone();
        let dto = self
            .executor
            .execute_one(&BedById(id), || async move {
                Ok(reader.find_bed(id).await?.as_ref().map(bed_to_dto))
            })
            .await?;
        Ok(dto)
    }

    pub async fn create_facility(
        &self,
        params: CreateFacilityParams,
    ) -> Result<FacilityRecord, FacilityError> {
        ensure_non_empty(&params.name, "name")?;
        ensure_non_empty(&params.code, "code")?;
        let record = self.writer.create_facility(params).await?;
        self.facility_scope.refresh();
        Ok(record)
    }

    pub async fn update_facility(
        &self,
        params: UpdateFacilityParams,
    ) -> Result<FacilityRecord, FacilityError> {
        ensure_non_empty(&params.name, "name")?;
        ensure_non_empty(&params.code, "code")?;
        let record = self.writer.update_facility(params).await?;
        self.facility_scope.refresh();
        Ok(record)
    }

    pub async fn create_department(
        &self,
        params: CreateDepartmentParams,
    ) -> Result<DepartmentRecord, FacilityError> {
        ensure_non_empty(&params.name, "name")?;
        ensure_non_empty(&params.code, "code")?;
        let record = self.writer.create_department(params).await?;
        self.department_scope.refresh();
        Ok(record)
    }

    pub async fn update_department(
        &self,
        params: UpdateDepartmentParams,
    ) -> Result<DepartmentRecord, FacilityError> {
        ensure_non_empty(&params.name, "name")?;
        ensure_non_empty(&params.code, "code")?;
        let record = self.writer.update_department(params).await?;
        self.department_scope.refresh();
        Ok(record)
    }

    pub async fn create_room(&self, params: CreateRoomParams) -> Result<RoomRecord, FacilityError> {
        ensure_non_empty(&params.name, "name")?;
        let record = self.writer.create_room(params).await?;
        self.room_scope.refresh();
        Ok(record)
    }

    pub async fn update_room(&self, params: UpdateRoomParams) -> Result<RoomRecord, FacilityError> {
        ensure_non_empty(&params.name, "name")?;
        let record = self.writer.update_room(params).await?;
        self.room_scope.refresh();
        Ok(record)
    }

    pub async fn create_bed(&self, params: CreateBedParams) -> Result<BedRecord, FacilityError> {
        ensure_non_empty(&params.label, "label")?;
        let record = self.writer.create_bed(params).await?;
        self.bed_scope.refresh();
        Ok(record)
    }

    pub async fn update_bed(&self, params: UpdateBedParams) -> Result<BedRecord, FacilityError> {
        ensure_non_empty(&params.label, "label")?;
        let record = self.writer.update_bed(params).await?;
        self.bed_scope.refresh();
        Ok(record)
    }

    pub async fn set_bed_status(
        &self,
        id: Uuid,
        status: BedStatus,
    ) -> Result<BedRecord, FacilityError> {
        let record = self.writer.set_bed_status(id, status).await?;
        self.bed_scope.refresh();
        Ok(record)
    }
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), FacilityError> {
    if value.trim().is_empty() {
        return Err(FacilityError::ConstraintViolation(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::cache::QueryCache;
    use crate::config::CacheSettings;

    #[derive(Default)]
    struct StubFacilitiesRepo {
        beds: Vec<BedListRecord>,
        bed_fetches: AtomicUsize,
    }

    #[async_trait]
    impl FacilitiesRepo for StubFacilitiesRepo {
        async fn list_facilities(
            &self,
            _active_only: bool,
        ) -> Result<Vec<FacilityListRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn find_facility(
            &self,
            _id: Uuid,
        ) -> Result<Option<FacilityListRecord>, RepoError> {
            Ok(None)
        }

        async fn list_departments(
            &self,
            _facility_id: Uuid,
            _active_only: bool,
        ) -> Result<Vec<DepartmentRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn find_department(&self, _id: Uuid) -> Result<Option<DepartmentRecord>, RepoError> {
            Ok(None)
        }

        async fn list_rooms(
            &self,
            _department_id: Uuid,
            _active_only: bool,
        ) -> Result<Vec<RoomRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn list_beds(
            &self,
            filter: &BedQueryFilter,
        ) -> Result<Vec<BedListRecord>, RepoError> {
            self.bed_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .beds
                .iter()
                .filter(|record| {
                    filter
                        .status
                        .map(|status| record.bed.status == status)
                        .unwrap_or(true)
                        && filter
                            .room_id
                            .map(|room| record.bed.room_id == room)
                            .unwrap_or(true)
                })
                .cloned()
                .collect())
        }

        async fn find_bed(&self, id: Uuid) -> Result<Option<BedListRecord>, RepoError> {
            Ok(self.beds.iter().find(|record| record.bed.id == id).cloned())
        }
    }

    struct StubFacilitiesWriter;

    #[async_trait]
    impl FacilitiesWriteRepo for StubFacilitiesWriter {
        async fn create_facility(
            &self,
            params: CreateFacilityParams,
        ) -> Result<FacilityRecord, RepoError> {
            Ok(FacilityRecord {
                id: Uuid::new_v4(),
                code: params.code,
                name: params.name,
                city_id: params.city_id,
                address: params.address,
                active: params.active,
                created_at: OffsetDateTime::now_utc(),
                updated_at: OffsetDateTime::now_utc(),
            })
        }

        async fn update_facility(
            &self,
            params: UpdateFacilityParams,
        ) -> Result<FacilityRecord, RepoError> {
            Ok(FacilityRecord {
                id: params.id,
                code: params.code,
                name: params.name,
                city_id: params.city_id,
                address: params.address,
                active: params.active,
                created_at: OffsetDateTime::now_utc(),
                updated_at: OffsetDateTime::now_utc(),
            })
        }

        async fn create_department(
            &self,
            _params: CreateDepartmentParams,
        ) -> Result<DepartmentRecord, RepoError> {
            unreachable!("not used in these tests")
        }

        async fn update_department(
            &self,
            _params: UpdateDepartmentParams,
        ) -> Result<DepartmentRecord, RepoError> {
            unreachable!("not used in these tests")
        }

        async fn create_room(&self, _params: CreateRoomParams) -> Result<RoomRecord, RepoError> {
            unreachable!("not used in these tests")
        }

        async fn update_room(&self, _params: UpdateRoomParams) -> Result<RoomRecord, RepoError> {
            unreachable!("not used in these tests")
        }

        async fn create_bed(&self, params: CreateBedParams) -> Result<BedRecord, RepoError> {
            Ok(BedRecord {
                id: Uuid::new_v4(),
                room_id: params.room_id,
                label: params.label,
                status: params.status,
                active: params.active,
                created_at: OffsetDateTime::now_utc(),
                updated_at: OffsetDateTime::now_utc(),
            })
        }

        async fn update_bed(&self, _params: UpdateBedParams) -> Result<BedRecord, RepoError> {
            unreachable!("not used in these tests")
        }

        async fn set_bed_status(
            &self,
            id: Uuid,
            status: BedStatus,
        ) -> Result<BedRecord, RepoError> {
            Ok(BedRecord {
                id,
                room_id: Uuid::new_v4(),
                label: "B-1".to_string(),
                status,
                active: true,
                created_at: OffsetDateTime::now_utc(),
                updated_at: OffsetDateTime::now_utc(),
            })
        }
    }

    fn executor() -> QueryExecutor {
        let settings = CacheSettings {
            enabled: true,
            capacity: NonZeroUsize::new(64).expect("capacity"),
            ttl: Duration::from_secs(300),
        };
        QueryExecutor::new(Arc::new(QueryCache::new(&settings)))
    }

    fn bed_record(label: &str, status: BedStatus) -> BedListRecord {
        BedListRecord {
            bed: BedRecord {
                id: Uuid::new_v4(),
                room_id: Uuid::new_v4(),
                label: label.to_string(),
                status,
                active: true,
                created_at: OffsetDateTime::now_utc(),
                updated_at: OffsetDateTime::now_utc(),
            },
            room_name: "Room 1".to_string(),
            department_name: "Cardiology".to_string(),
            facility_name: "Central".to_string(),
        }
    }

    #[tokio::test]
    async fn bed_list_is_ordered_by_label() {
        let reader = Arc::new(StubFacilitiesRepo {
            beds: vec![
                bed_record("B-2", BedStatus::Available),
                bed_record("B-1", BedStatus::Available),
            ],
            ..Default::default()
        });
        let service = FacilityService::new(reader, Arc::new(StubFacilitiesWriter), executor());

        let beds = service
            .list_beds(BedQueryFilter::default())
            .await
            .expect("list succeeds");
        let labels: Vec<&str> = beds.iter().map(|dto| dto.label.as_str()).collect();
        assert_eq!(labels, vec!["B-1", "B-2"]);
    }

    #[tokio::test]
    async fn bed_filters_produce_distinct_cache_entries() {
        let reader = Arc::new(StubFacilitiesRepo {
            beds: vec![
                bed_record("B-1", BedStatus::Available),
                bed_record("B-2", BedStatus::Occupied),
            ],
            ..Default::default()
        });
        let service =
            FacilityService::new(reader.clone(), Arc::new(StubFacilitiesWriter), executor());

        let available = BedQueryFilter {
            status: Some(BedStatus::Available),
            ..Default::default()
        };
        let occupied = BedQueryFilter {
            status: Some(BedStatus::Occupied),
            ..Default::default()
        };

        let first = service.list_beds(available.clone()).await.expect("list");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].label, "B-1");

        let second = service.list_beds(occupied).await.expect("list");
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].label, "B-2");

        // Repeating the first filter hits its own entry.
        service.list_beds(available).await.expect("cached list");
        assert_eq!(reader.bed_fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn facility_rename_evicts_cached_bed_lists() {
        let reader = Arc::new(StubFacilitiesRepo {
            beds: vec![bed_record("B-1", BedStatus::Available)],
            ..Default::default()
        });
        let service =
            FacilityService::new(reader.clone(), Arc::new(StubFacilitiesWriter), executor());

        service
            .list_beds(BedQueryFilter::default())
            .await
            .expect("populate cache");
        service
            .list_beds(BedQueryFilter::default())
            .await
            .expect("cached");
        assert_eq!(reader.bed_fetches.load(Ordering::SeqCst), 1);

        // Bed DTOs carry the facility name, so a facility mutation must
        // refresh them even though no bed row changed.
        service
            .update_facility(UpdateFacilityParams {
                id: Uuid::new_v4(),
                code: "CEN".to_string(),
                name: "Central Renamed".to_string(),
                city_id: None,
                address: None,
                active: true,
            })
            .await
            .expect("update succeeds");

        service
            .list_beds(BedQueryFilter::default())
            .await
            .expect("refetched");
        assert_eq!(reader.bed_fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn bed_mapper_round_trip_preserves_dto_fields() {
        let record = bed_record("B-7", BedStatus::Maintenance);
        let dto = bed_to_dto(&record);
        let rebuilt = bed_from_dto(&dto);
        assert_eq!(rebuilt.id, record.bed.id);
        assert_eq!(rebuilt.room_id, record.bed.room_id);
        assert_eq!(rebuilt.label, record.bed.label);
        assert_eq!(rebuilt.status, record.bed.status);
        assert_eq!(rebuilt.active, record.bed.active);
    }

    #[test]
    fn bed_clone_to_create_excludes_identifier() {
        let record = bed_record("B-7", BedStatus::Available);
        let dto = bed_to_dto(&record);
        let params = bed_clone_to_create(&dto);
        assert_eq!(params.room_id, record.bed.room_id);
        assert_eq!(params.label, "B-7");
    }
}
