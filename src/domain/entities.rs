//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::domain::types::{
    BedStatus, EncounterKind, FavoriteTarget, Gender, RoomKind, StaffRole, VisitStatus,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityRecord {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NationalityRecord {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaritalStatusRecord {
    pub id: Uuid,
    pub name: String,
    pub display_order: i32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BloodGroupRecord {
    pub id: Uuid,
    pub name: String,
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftRecord {
    pub id: Uuid,
    pub name: String,
    pub starts_at: Time,
    pub ends_at: Time,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacilityRecord {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub city_id: Option<Uuid>,
    pub address: Option<String>,
    pub active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentRecord {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub code: String,
    pub name: String,
    pub floor: Option<i16>,
    pub active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomRecord {
    pub id: Uuid,
    pub department_id: Uuid,
    pub name: String,
    pub kind: RoomKind,
    pub active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BedRecord {
    pub id: Uuid,
    pub room_id: Uuid,
    pub label: String,
    pub status: BedStatus,
    pub active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffRecord {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub department_id: Option<Uuid>,
    pub full_name: String,
    pub role: StaffRole,
    pub shift_id: Option<Uuid>,
    pub active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientRecord {
    pub id: Uuid,
    /// Medical record number, unique per installation.
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
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub facility_id: Uuid,
    pub department_id: Option<Uuid>,
    pub bed_id: Option<Uuid>,
    pub status: VisitStatus,
    pub admitted_at: OffsetDateTime,
    pub discharged_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncounterRecord {
    pub id: Uuid,
    pub visit_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub kind: EncounterKind,
    pub notes: Option<String>,
    pub occurred_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserFavoriteRecord {
    pub id: Uuid,
    pub user_name: String,
    pub target: FavoriteTarget,
    pub target_id: Uuid,
    pub sort_order: i32,
    pub created_at: OffsetDateTime,
}
