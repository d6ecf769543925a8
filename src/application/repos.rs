//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::application::pagination::{PageRequest, Paged, PaginationError};
use crate::domain::entities::{
    BedRecord, BloodGroupRecord, CityRecord, DepartmentRecord, EncounterRecord, FacilityRecord,
    MaritalStatusRecord, NationalityRecord, PatientRecord, RoomRecord, ShiftRecord, StaffRecord,
    UserFavoriteRecord, VisitRecord,
};
use crate::domain::types::{
    BedStatus, EncounterKind, FavoriteTarget, Gender, RoomKind, StaffRole, VisitStatus,
};
use thiserror::Error;

/// Failure taxonomy shared by every repository trait.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("storage failure: {0}")]
    Persistence(String),
    #[error("unique constraint `{constraint}` violated")]
    Duplicate { constraint: String },
    #[error("record not found")]
    NotFound,
    #[error("rejected input: {message}")]
    InvalidInput { message: String },
    #[error("integrity violation: {message}")]
    Integrity { message: String },
    #[error("statement timed out")]
    Timeout,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

// ============================================================================
// Query filters
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BedQueryFilter {
    pub room_id: Option<Uuid>,
    pub status: Option<BedStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StaffQueryFilter {
    pub facility_id: Option<Uuid>,
    pub role: Option<StaffRole>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PatientQueryFilter {
    pub search: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VisitQueryFilter {
    pub patient_id: Option<Uuid>,
    pub facility_id: Option<Uuid>,
    pub status: Option<VisitStatus>,
}

// ============================================================================
// Joined read records (entity plus display names from related rows)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FacilityListRecord {
    pub facility: FacilityRecord,
    pub city_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BedListRecord {
    pub bed: BedRecord,
    pub room_name: String,
    pub department_name: String,
    pub facility_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaffListRecord {
    pub staff: StaffRecord,
    pub facility_name: String,
    pub department_name: Option<String>,
    pub shift_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatientListRecord {
    pub patient: PatientRecord,
    pub city_name: Option<String>,
    pub nationality_name: Option<String>,
    pub marital_status_name: Option<String>,
    pub blood_group_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisitListRecord {
    pub visit: VisitRecord,
    pub patient_name: String,
    pub patient_mrn: String,
    pub facility_name: String,
    pub department_name: Option<String>,
    pub bed_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncounterListRecord {
    pub encounter: EncounterRecord,
    pub staff_name: Option<String>,
}

// ============================================================================
// Write parameters
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreateCityParams {
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct UpdateCityParams {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct CreateShiftParams {
    pub name: String,
    pub starts_at: Time,
    pub ends_at: Time,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct UpdateShiftParams {
    pub id: Uuid,
    pub name: String,
    pub starts_at: Time,
    pub ends_at: Time,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct CreateFacilityParams {
    pub code: String,
    pub name: String,
    pub city_id: Option<Uuid>,
    pub address: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct UpdateFacilityParams {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub city_id: Option<Uuid>,
    pub address: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct CreateDepartmentParams {
    pub facility_id: Uuid,
    pub code: String,
    pub name: String,
    pub floor: Option<i16>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct UpdateDepartmentParams {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub floor: Option<i16>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct CreateRoomParams {
    pub department_id: Uuid,
    pub name: String,
    pub kind: RoomKind,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct UpdateRoomParams {
    pub id: Uuid,
    pub name: String,
    pub kind: RoomKind,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct CreateBedParams {
    pub room_id: Uuid,
    pub label: String,
    pub status: BedStatus,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct UpdateBedParams {
    pub id: Uuid,
    pub label: String,
    pub status: BedStatus,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct CreateStaffParams {
    pub facility_id: Uuid,
    pub department_id: Option<Uuid>,
    pub full_name: String,
    pub role: StaffRole,
    pub shift_id: Option<Uuid>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct UpdateStaffParams {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub department_id: Option<Uuid>,
    pub full_name: String,
    pub role: StaffRole,
    pub shift_id: Option<Uuid>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct CreatePatientParams {
    pub mrn: String,
    pub full_name: String,
    pub birth_date: Date,
    pub gender: Gender,
    pub city_id: Option<Uuid>,
    pub nationality_id: Option<Uuid>,
    pub marital_status_id: Option<Uuid>,
    pub blood_group_id: Option<Uuid>,
    pub phone: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct UpdatePatientParams {
    pub id: Uuid,
    pub full_name: String,
    pub birth_date: Date,
    pub gender: Gender,
    pub city_id: Option<Uuid>,
    pub nationality_id: Option<Uuid>,
    pub marital_status_id: Option<Uuid>,
    pub blood_group_id: Option<Uuid>,
    pub phone: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct OpenVisitParams {
    pub patient_id: Uuid,
    pub facility_id: Uuid,
    pub department_id: Option<Uuid>,
    pub bed_id: Option<Uuid>,
    pub admitted_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct AddEncounterParams {
    pub visit_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub kind: EncounterKind,
    pub notes: Option<String>,
    pub occurred_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct AddFavoriteParams {
    pub user_name: String,
    pub target: FavoriteTarget,
    pub target_id: Uuid,
    pub sort_order: i32,
}

// ============================================================================
// Repository traits
// ============================================================================

#[async_trait]
pub trait LookupsRepo: Send + Sync {
    async fn list_cities(&self, active_only: bool) -> Result<Vec<CityRecord>, RepoError>;

    async fn find_city(&self, id: Uuid) -> Result<Option<CityRecord>, RepoError>;

    async fn list_nationalities(&self, active_only: bool)
    -> Result<Vec<NationalityRecord>, RepoError>;

    async fn list_marital_statuses(
        &self,
        active_only: bool,
    ) -> Result<Vec<MaritalStatusRecord>, RepoError>;

    async fn list_blood_groups(&self) -> Result<Vec<BloodGroupRecord>, RepoError>;

    async fn list_shifts(&self, active_only: bool) -> Result<Vec<ShiftRecord>, RepoError>;

    async fn find_shift(&self, id: Uuid) -> Result<Option<ShiftRecord>, RepoError>;
}

#[async_trait]
pub trait LookupsWriteRepo: Send + Sync {
    async fn create_city(&self, params: CreateCityParams) -> Result<CityRecord, RepoError>;

    async fn update_city(&self, params: UpdateCityParams) -> Result<CityRecord, RepoError>;

    async fn create_shift(&self, params: CreateShiftParams) -> Result<ShiftRecord, RepoError>;

    async fn update_shift(&self, params: UpdateShiftParams) -> Result<ShiftRecord, RepoError>;
}

#[async_trait]
pub trait FacilitiesRepo: Send + Sync {
    async fn list_facilities(&self, active_only: bool)
    -> Result<Vec<FacilityListRecord>, RepoError>;

    async fn find_facility(&self, id: Uuid) -> Result<Option<FacilityListRecord>, RepoError>;

    async fn list_departments(
        &self,
        facility_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<DepartmentRecord>, RepoError>;

    async fn find_department(&self, id: Uuid) -> Result<Option<DepartmentRecord>, RepoError>;

    async fn list_rooms(
        &self,
        department_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<RoomRecord>, RepoError>;

    async fn list_beds(&self, filter: &BedQueryFilter) -> Result<Vec<BedListRecord>, RepoError>;

    async fn find_bed(&self, id: Uuid) -> Result<Option<BedListRecord>, RepoError>;
}

#[async_trait]
pub trait FacilitiesWriteRepo: Send + Sync {
    async fn create_facility(
        &self,
        params: CreateFacilityParams,
    ) -> Result<FacilityRecord, RepoError>;

    async fn update_facility(
        &self,
        params: UpdateFacilityParams,
    ) -> Result<FacilityRecord, RepoError>;

    async fn create_department(
        &self,
        params: CreateDepartmentParams,
    ) -> Result<DepartmentRecord, RepoError>;

    async fn update_department(
        &self,
        params: UpdateDepartmentParams,
    ) -> Result<DepartmentRecord, RepoError>;

    async fn create_room(&self, params: CreateRoomParams) -> Result<RoomRecord, RepoError>;

    async fn update_room(&self, params: UpdateRoomParams) -> Result<RoomRecord, RepoError>;

    async fn create_bed(&self, params: CreateBedParams) -> Result<BedRecord, RepoError>;

    async fn update_bed(&self, params: UpdateBedParams) -> Result<BedRecord, RepoError>;

    async fn set_bed_status(&self, id: Uuid, status: BedStatus) -> Result<BedRecord, RepoError>;
}

#[async_trait]
pub trait StaffRepo: Send + Sync {
    async fn list_staff(
        &self,
        filter: &StaffQueryFilter,
        page: PageRequest,
    ) -> Result<Paged<StaffListRecord>, RepoError>;

    async fn find_staff(&self, id: Uuid) -> Result<Option<StaffListRecord>, RepoError>;
}

#[async_trait]
pub trait StaffWriteRepo: Send + Sync {
    async fn create_staff(&self, params: CreateStaffParams) -> Result<StaffRecord, RepoError>;

    async fn update_staff(&self, params: UpdateStaffParams) -> Result<StaffRecord, RepoError>;
}

#[async_trait]
pub trait PatientsRepo: Send + Sync {
    async fn list_patients(
        &self,
        filter: &PatientQueryFilter,
        page: PageRequest,
    ) -> Result<Paged<PatientListRecord>, RepoError>;

    async fn find_patient(&self, id: Uuid) -> Result<Option<PatientListRecord>, RepoError>;

    async fn find_patient_by_mrn(&self, mrn: &str)
    -> Result<Option<PatientListRecord>, RepoError>;
}

#[async_trait]
pub trait PatientsWriteRepo: Send + Sync {
    async fn create_patient(&self, params: CreatePatientParams)
    -> Result<PatientRecord, RepoError>;

    async fn update_patient(&self, params: UpdatePatientParams)
    -> Result<PatientRecord, RepoError>;
}

#[async_trait]
pub trait VisitsRepo: Send + Sync {
    async fn list_visits(
        &self,
        filter: &VisitQueryFilter,
        page: PageRequest,
    ) -> Result<Paged<VisitListRecord>, RepoError>;

    async fn find_visit(&self, id: Uuid) -> Result<Option<VisitListRecord>, RepoError>;

    async fn list_encounters(&self, visit_id: Uuid)
    -> Result<Vec<EncounterListRecord>, RepoError>;
}

#[async_trait]
pub trait VisitsWriteRepo: Send + Sync {
    async fn open_visit(&self, params: OpenVisitParams) -> Result<VisitRecord, RepoError>;

    async fn assign_bed(&self, visit_id: Uuid, bed_id: Uuid) -> Result<VisitRecord, RepoError>;

    async fn close_visit(
        &self,
        id: Uuid,
        discharged_at: OffsetDateTime,
    ) -> Result<VisitRecord, RepoError>;

    async fn cancel_visit(&self, id: Uuid) -> Result<VisitRecord, RepoError>;

    async fn add_encounter(&self, params: AddEncounterParams)
    -> Result<EncounterRecord, RepoError>;
}

#[async_trait]
pub trait FavoritesRepo: Send + Sync {
    async fn list_for_user(&self, user_name: &str)
    -> Result<Vec<UserFavoriteRecord>, RepoError>;
}

#[async_trait]
pub trait FavoritesWriteRepo: Send + Sync {
    async fn add_favorite(&self, params: AddFavoriteParams)
    -> Result<UserFavoriteRecord, RepoError>;

    async fn remove_favorite(&self, id: Uuid) -> Result<(), RepoError>;

    async fn reorder_favorites(&self, user_name: &str, ordered_ids: &[Uuid])
    -> Result<(), RepoError>;
}
