//! Lookup master data: cities, nationalities, marital statuses, blood groups
//! and shifts.
//!
//! These collections are small, read-heavy and change rarely, so every list
//! query is cacheable under its entity's `All` key. Mutations go through the
//! write repo and refresh the matching scope.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::Time;
use uuid::Uuid;

use crate::application::query::{CachePolicy, QueryDescriptor, QueryExecutor};
use crate::application::repos::{
    CreateCityParams, CreateShiftParams, LookupsRepo, LookupsWriteRepo, RepoError,
    UpdateCityParams, UpdateShiftParams,
};
use crate::cache::{CacheKey, CacheScope, EntityTag};
use crate::domain::entities::{
    BloodGroupRecord, CityRecord, MaritalStatusRecord, NationalityRecord, ShiftRecord,
};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("constraint violation on `{0}`")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityDto {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NationalityDto {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaritalStatusDto {
    pub id: Uuid,
    pub name: String,
    pub display_order: i32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BloodGroupDto {
    pub id: Uuid,
    pub name: String,
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftDto {
    pub id: Uuid,
    pub name: String,
    pub starts_at: Time,
    pub ends_at: Time,
    pub active: bool,
}

// ============================================================================
// Mappers: explicit pure functions per entity/DTO pair
// ============================================================================

pub fn city_to_dto(record: &CityRecord) -> CityDto {
    CityDto {
        id: record.id,
        name: record.name.clone(),
        active: record.active,
    }
}

pub fn city_from_dto(dto: &CityDto) -> CityRecord {
    CityRecord {
        id: dto.id,
        name: dto.name.clone(),
        active: dto.active,
    }
}

pub fn city_apply_update(record: &mut CityRecord, params: &UpdateCityParams) {
    record.name = params.name.clone();
    record.active = params.active;
}

/// Clone a city for re-creation; the generated identifier is excluded.
pub fn city_clone_to_create(dto: &CityDto) -> CreateCityParams {
    CreateCityParams {
        name: dto.name.clone(),
        active: dto.active,
    }
}

pub fn nationality_to_dto(record: &NationalityRecord) -> NationalityDto {
    NationalityDto {
        id: record.id,
        name: record.name.clone(),
        active: record.active,
    }
}

pub fn nationality_from_dto(dto: &NationalityDto) -> NationalityRecord {
    NationalityRecord {
        id: dto.id,
        name: dto.name.clone(),
        active: dto.active,
    }
}

pub fn marital_status_to_dto(record: &MaritalStatusRecord) -> MaritalStatusDto {
    MaritalStatusDto {
        id: record.id,
        name: record.name.clone(),
        display_order: record.display_order,
        active: record.active,
    }
}

pub fn marital_status_from_dto(dto: &MaritalStatusDto) -> MaritalStatusRecord {
    MaritalStatusRecord {
        id: dto.id,
        name: dto.name.clone(),
        display_order: dto.display_order,
        active: dto.active,
    }
}

pub fn blood_group_to_dto(record: &BloodGroupRecord) -> BloodGroupDto {
    BloodGroupDto {
        id: record.id,
        name: record.name.clone(),
        display_order: record.display_order,
    }
}

pub fn blood_group_from_dto(dto: &BloodGroupDto) -> BloodGroupRecord {
    BloodGroupRecord {
        id: dto.id,
        name: dto.name.clone(),
        display_order: dto.display_order,
    }
}

pub fn shift_to_dto(record: &ShiftRecord) -> ShiftDto {
    ShiftDto {
        id: record.id,
        name: record.name.clone(),
        starts_at: record.starts_at,
        ends_at: record.ends_at,
        active: record.active,
    }
}

pub fn shift_from_dto(dto: &ShiftDto) -> ShiftRecord {
    ShiftRecord {
        id: dto.id,
        name: dto.name.clone(),
        starts_at: dto.starts_at,
        ends_at: dto.ends_at,
        active: dto.active,
    }
}

pub fn shift_apply_update(record: &mut ShiftRecord, params: &UpdateShiftParams) {
    record.name = params.name.clone();
    record.starts_at = params.starts_at;
    record.ends_at = params.ends_at;
    record.active = params.active;
}

pub fn shift_clone_to_create(dto: &ShiftDto) -> CreateShiftParams {
    CreateShiftParams {
        name: dto.name.clone(),
        starts_at: dto.starts_at,
        ends_at: dto.ends_at,
        active: dto.active,
    }
}

// ============================================================================
// Query descriptors
// ============================================================================

struct ActiveCities;

impl QueryDescriptor for ActiveCities {
    type Output = Vec<CityDto>;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(CacheKey::All(EntityTag::City), &[EntityTag::City])
    }
}

struct ActiveNationalities;

impl QueryDescriptor for ActiveNationalities {
    type Output = Vec<NationalityDto>;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::All(EntityTag::Nationality),
            &[EntityTag::Nationality],
        )
    }
}

struct ActiveMaritalStatuses;

impl QueryDescriptor for ActiveMaritalStatuses {
    type Output = Vec<MaritalStatusDto>;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::All(EntityTag::MaritalStatus),
            &[EntityTag::MaritalStatus],
        )
    }
}

struct AllBloodGroups;

impl QueryDescriptor for AllBloodGroups {
    type Output = Vec<BloodGroupDto>;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::All(EntityTag::BloodGroup),
            &[EntityTag::BloodGroup],
        )
    }
}

struct ActiveShifts;

impl QueryDescriptor for ActiveShifts {
    type Output = Vec<ShiftDto>;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(CacheKey::All(EntityTag::Shift), &[EntityTag::Shift])
    }
}

struct CityById(Uuid);

impl QueryDescriptor for CityById {
    type Output = CityDto;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::ById {
                tag: EntityTag::City,
                id: self.0,
            },
            &[EntityTag::City],
        )
    }
}

struct ShiftById(Uuid);

impl QueryDescriptor for ShiftById {
    type Output = ShiftDto;

    fn cache(&self) -> CachePolicy {
        CachePolicy::cached(
            CacheKey::ById {
                tag: EntityTag::Shift,
                id: self.0,
            },
            &[EntityTag::Shift],
        )
    }
}

// ============================================================================
// Service
// ============================================================================

#[derive(Clone)]
pub struct LookupService {
    reader: Arc<dyn LookupsRepo>,
    writer: Arc<dyn LookupsWriteRepo>,
    executor: QueryExecutor,
    city_scope: CacheScope,
    shift_scope: CacheScope,
}

impl LookupService {
    pub fn new(
        reader: Arc<dyn LookupsRepo>,
        writer: Arc<dyn LookupsWriteRepo>,
        executor: QueryExecutor,
    ) -> Self {
        let city_scope = CacheScope::new(EntityTag::City, executor.cache().clone());
        let shift_scope = CacheScope::new(EntityTag::Shift, executor.cache().clone());
        Self {
            reader,
            writer,
            executor,
            city_scope,
            shift_scope,
        }
    }

    /// Active cities ordered by name.
    pub async fn list_cities(&self) -> Result<Arc<Vec<CityDto>>, LookupError> {
        let reader = self.reader.clone();
        let dtos = self
            .executor
            .execute(&ActiveCities, || async move {
                let mut dtos: Vec<CityDto> = reader
                    .list_cities(true)
                    .await?
                    .iter()
                    .map(city_to_dto)
                    .collect();
                dtos.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(dtos)
            })
            .await?;
        Ok(dtos)
    }

    /// Active nationalities ordered by name.
    pub async fn list_nationalities(&self) -> Result<Arc<Vec<NationalityDto>>, LookupError> {
        let reader = self.reader.clone();
        let dtos = self
            .executor
            .execute(&ActiveNationalities, || async move {
                let mut dtos: Vec<NationalityDto> = reader
                    .list_nationalities(true)
                    .await?
                    .iter()
                    .map(nationality_to_dto)
                    .collect();
                dtos.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(dtos)
            })
            .await?;
        Ok(dtos)
    }

    /// Active marital statuses in explicit display order.
    pub async fn list_marital_statuses(&self) -> Result<Arc<Vec<MaritalStatusDto>>, LookupError> {
        let reader = self.reader.clone();
        let dtos = self
            .executor
            .execute(&ActiveMaritalStatuses, || async move {
                let mut dtos: Vec<MaritalStatusDto> = reader
                    .list_marital_statuses(true)
                    .await?
                    .iter()
                    .map(marital_status_to_dto)
                    .collect();
                dtos.sort_by_key(|dto| dto.display_order);
                Ok(dtos)
            })
            .await?;
        Ok(dtos)
    }

    /// All blood groups in explicit display order; empty installations get an
    /// empty sequence, not an error.
    pub async fn list_blood_groups(&self) -> Result<Arc<Vec<BloodGroupDto>>, LookupError> {
        let reader = self.reader.clone();
        let dtos = self
            .executor
            .execute(&AllBloodGroups, || async move {
                let mut dtos: Vec<BloodGroupDto> = reader
                    .list_blood_groups()
                    .await?
                    .iter()
                    .map(blood_group_to_dto)
                    .collect();
                dtos.sort_by_key(|dto| dto.display_order);
                Ok(dtos)
            })
            .await?;
        Ok(dtos)
    }

    /// Active shifts ordered by name.
    pub async fn list_shifts(&self) -> Result<Arc<Vec<ShiftDto>>, LookupError> {
        let reader = self.reader.clone();
        let dtos = self
            .executor
            .execute(&ActiveShifts, || async move {
                let mut dtos: Vec<ShiftDto> = reader
                    .list_shifts(true)
                    .await?
                    .iter()
                    .map(shift_to_dto)
                    .collect();
                dtos.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(dtos)
            })
            .await?;
        Ok(dtos)
    }

    pub async fn find_city(&self, id: Uuid) -> Result<Option<Arc<CityDto>>, LookupError> {
        let reader = self.reader.clone();
        let dto = self
            .executor
            .execute_one(&CityById(id), || async move {
                Ok(reader.find_city(id).await?.as_ref().map(city_to_dto))
            })
            .await?;
        Ok(dto)
    }

    pub async fn find_shift(&self, id: Uuid) -> Result<Option<Arc<ShiftDto>>, LookupError> {
        let reader = self.reader.clone();
        let dto = self
            .executor
            .execute_one(&ShiftById(id), || async move {
                Ok(reader.find_shift(id).await?.as_ref().map(shift_to_dto))
            })
            .await?;
        Ok(dto)
    }

    pub async fn create_city(&self, params: CreateCityParams) -> Result<CityDto, LookupError> {
        ensure_non_empty(&params.name, "name")?;
        let record = self.writer.create_city(params).await?;
        self.city_scope.refresh();
        Ok(city_to_dto(&record))
    }

    pub async fn update_city(&self, params: UpdateCityParams) -> Result<CityDto, LookupError> {
        ensure_non_empty(&params.name, "name")?;
        let record = self.writer.update_city(params).await?;
        self.city_scope.refresh();
        Ok(city_to_dto(&record))
    }

    pub async fn create_shift(&self, params: CreateShiftParams) -> Result<ShiftDto, LookupError> {
        ensure_non_empty(&params.name, "name")?;
        if params.starts_at == params.ends_at {
            return Err(LookupError::ConstraintViolation("ends_at"));
        }
        let record = self.writer.create_shift(params).await?;
        self.shift_scope.refresh();
        Ok(shift_to_dto(&record))
    }

    pub async fn update_shift(&self, params: UpdateShiftParams) -> Result<ShiftDto, LookupError> {
        ensure_non_empty(&params.name, "name")?;
        if params.starts_at == params.ends_at {
            return Err(LookupError::ConstraintViolation("ends_at"));
        }
        let record = self.writer.update_shift(params).await?;
        self.shift_scope.refresh();
        Ok(shift_to_dto(&record))
    }
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), LookupError> {
    if value.trim().is_empty() {
        return Err(LookupError::ConstraintViolation(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use time::macros::time;

    use super::*;
    use crate::cache::QueryCache;
    use crate::config::CacheSettings;
    use crate::domain::entities::{MaritalStatusRecord, NationalityRecord};

    #[derive(Default)]
    struct StubLookupsRepo {
        cities: Mutex<Vec<CityRecord>>,
        blood_groups: Vec<BloodGroupRecord>,
        city_fetches: AtomicUsize,
    }

    #[async_trait]
    impl LookupsRepo for StubLookupsRepo {
        async fn list_cities(&self, active_only: bool) -> Result<Vec<CityRecord>, RepoError> {
            self.city_fetches.fetch_add(1, Ordering::SeqCst);
            let cities = self.cities.lock().unwrap();
            Ok(cities
                .iter()
                .filter(|city| !active_only || city.active)
                .cloned()
                .collect())
        }

        async fn find_city(&self, id: Uuid) -> Result<Option<CityRecord>, RepoError> {
            let cities = self.cities.lock().unwrap();
            Ok(cities.iter().find(|city| city.id == id).cloned())
        }

        async fn list_nationalities(
            &self,
            _active_only: bool,
        ) -> Result<Vec<NationalityRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn list_marital_statuses(
            &self,
            _active_only: bool,
        ) -> Result<Vec<MaritalStatusRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn list_blood_groups(&self) -> Result<Vec<BloodGroupRecord>, RepoError> {
            Ok(self.blood_groups.clone())
        }

        async fn list_shifts(&self, _active_only: bool) -> Result<Vec<ShiftRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn find_shift(&self, _id: Uuid) -> Result<Option<ShiftRecord>, RepoError> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct StubLookupsWriter;

    #[async_trait]
    impl LookupsWriteRepo for StubLookupsWriter {
        async fn create_city(&self, params: CreateCityParams) -> Result<CityRecord, RepoError> {
            Ok(CityRecord {
                id: Uuid::new_v4(),
                name: params.name,
                active: params.active,
            })
        }

        async fn update_city(&self, params: UpdateCityParams) -> Result<CityRecord, RepoError> {
            Ok(CityRecord {
                id: params.id,
                name: params.name,
                active: params.active,
            })
        }

        async fn create_shift(&self, params: CreateShiftParams) -> Result<ShiftRecord, RepoError> {
            Ok(ShiftRecord {
                id: Uuid::new_v4(),
                name: params.name,
                starts_at: params.starts_at,
                ends_at: params.ends_at,
                active: params.active,
            })
        }

        async fn update_shift(&self, params: UpdateShiftParams) -> Result<ShiftRecord, RepoError> {
            Ok(ShiftRecord {
                id: params.id,
                name: params.name,
                starts_at: params.starts_at,
                ends_at: params.ends_at,
                active: params.active,
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

    fn city(name: &str, active: bool) -> CityRecord {
        CityRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            active,
        }
    }

    fn service(reader: Arc<StubLookupsRepo>) -> LookupService {
        LookupService::new(reader, Arc::new(StubLookupsWriter), executor())
    }

    #[tokio::test]
    async fn cities_are_active_only_and_name_ordered() {
        let reader = Arc::new(StubLookupsRepo::default());
        *reader.cities.lock().unwrap() = vec![
            city("Beta", true),
            city("Alpha", true),
            city("Gamma", false),
        ];
        let service = service(reader);

        let cities = service.list_cities().await.expect("list succeeds");
        let names: Vec<&str> = cities.iter().map(|dto| dto.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
    }

    #[tokio::test]
    async fn city_list_is_served_from_cache_until_refreshed() {
        let reader = Arc::new(StubLookupsRepo::default());
        *reader.cities.lock().unwrap() = vec![city("Lyon", true)];
        let service = service(reader.clone());

        service.list_cities().await.expect("first list");
        service.list_cities().await.expect("second list");
        assert_eq!(reader.city_fetches.load(Ordering::SeqCst), 1);

        service
            .update_city(UpdateCityParams {
                id: Uuid::new_v4(),
                name: "Lyon".to_string(),
                active: true,
            })
            .await
            .expect("update succeeds");

        service.list_cities().await.expect("list after update");
        assert_eq!(reader.city_fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn identical_queries_are_deterministic() {
        let reader = Arc::new(StubLookupsRepo::default());
        *reader.cities.lock().unwrap() = vec![city("Beta", true), city("Alpha", true)];
        let service = service(reader);

        let first = service.list_cities().await.expect("first");
        let second = service.list_cities().await.expect("second");
        assert_eq!(*first, *second);
    }

    #[tokio::test]
    async fn empty_blood_groups_return_empty_sequence() {
        let service = service(Arc::new(StubLookupsRepo::default()));
        let groups = service.list_blood_groups().await.expect("list succeeds");
        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn shift_rejects_equal_start_and_end() {
        let service = service(Arc::new(StubLookupsRepo::default()));
        let result = service
            .create_shift(CreateShiftParams {
                name: "Day".to_string(),
                starts_at: time!(08:00),
                ends_at: time!(08:00),
                active: true,
            })
            .await;
        assert!(matches!(
            result,
            Err(LookupError::ConstraintViolation("ends_at"))
        ));
    }

    #[test]
    fn city_mapper_round_trip_preserves_dto_fields() {
        let record = city("Lyon", true);
        let dto = city_to_dto(&record);
        assert_eq!(city_from_dto(&dto), record);
    }

    #[test]
    fn clone_to_create_excludes_identifier() {
        let record = city("Lyon", true);
        let dto = city_to_dto(&record);
        let params = city_clone_to_create(&dto);
        assert_eq!(params.name, "Lyon");
        assert!(params.active);
        // CreateCityParams has no id field; re-creation always generates one.
    }

    #[test]
    fn apply_update_overwrites_fields_in_place() {
        let mut record = city("Lyon", true);
        let id = record.id;
        city_apply_update(
            &mut record,
            &UpdateCityParams {
                id,
                name: "Marseille".to_string(),
                active: false,
            },
        );
        assert_eq!(record.id, id);
        assert_eq!(record.name, "Marseille");
        assert!(!record.active);
    }
}
