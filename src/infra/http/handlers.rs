use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::application::pagination::{DEFAULT_PER_PAGE, PageRequest};
use crate::application::repos::{
    AddEncounterParams, AddFavoriteParams, BedQueryFilter, CreateBedParams, CreateCityParams,
    CreateDepartmentParams, CreateFacilityParams, CreatePatientParams, CreateRoomParams,
    CreateShiftParams, CreateStaffParams, OpenVisitParams, PatientQueryFilter, StaffQueryFilter,
    UpdateBedParams, UpdateCityParams, UpdateDepartmentParams, UpdateFacilityParams,
    UpdatePatientParams, UpdateRoomParams, UpdateShiftParams, UpdateStaffParams, VisitQueryFilter,
};
use crate::domain::types::{
    BedStatus, EncounterKind, FavoriteTarget, Gender, RoomKind, StaffRole, VisitStatus,
};

use super::error::ApiError;
use super::state::AppState;

fn page_request(page: Option<u32>, per_page: Option<u32>) -> Result<PageRequest, ApiError> {
    PageRequest::new(page.unwrap_or(1), per_page.unwrap_or(DEFAULT_PER_PAGE))
        .map_err(|err| ApiError::bad_request("Invalid page request", Some(err.to_string())))
}

pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    match state.repos.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "database health check failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

// -------- Lookups --------

#[derive(Debug, Deserialize)]
pub struct CityBody {
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

pub async fn list_cities(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let cities = state.lookups.list_cities().await?;
    Ok(Json(cities.as_ref().clone()))
}

pub async fn get_city(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let city = state
        .lookups
        .find_city(id)
        .await?
        .ok_or_else(|| ApiError::not_found("City not found"))?;
    Ok(Json(city.as_ref().clone()))
}

pub async fn create_city(
    State(state): State<AppState>,
    Json(body): Json<CityBody>,
) -> Result<impl IntoResponse, ApiError> {
    let city = state
        .lookups
        .create_city(CreateCityParams {
            name: body.name,
            active: body.active,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(city)))
}

pub async fn update_city(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CityBody>,
) -> Result<impl IntoResponse, ApiError> {
    let city = state
        .lookups
        .update_city(UpdateCityParams {
            id,
            name: body.name,
            active: body.active,
        })
        .await?;
    Ok(Json(city))
}

pub async fn list_nationalities(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.lookups.list_nationalities().await?;
    Ok(Json(items.as_ref().clone()))
}

pub async fn list_marital_statuses(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.lookups.list_marital_statuses().await?;
    Ok(Json(items.as_ref().clone()))
}

pub async fn list_blood_groups(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.lookups.list_blood_groups().await?;
    Ok(Json(items.as_ref().clone()))
}

#[derive(Debug, Deserialize)]
pub struct ShiftBody {
    pub name: String,
    pub starts_at: Time,
    pub ends_at: Time,
    #[serde(default = "default_active")]
    pub active: bool,
}

pub async fn list_shifts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let shifts = state.lookups.list_shifts().await?;
    Ok(Json(shifts.as_ref().clone()))
}

pub async fn get_shift(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let shift = state
        .lookups
        .find_shift(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Shift not found"))?;
    Ok(Json(shift.as_ref().clone()))
}

pub async fn create_shift(
    State(state): State<AppState>,
    Json(body): Json<ShiftBody>,
) -> Result<impl IntoResponse, ApiError> {
    let shift = state
        .lookups
        .create_shift(CreateShiftParams {
            name: body.name,
            starts_at: body.starts_at,
            ends_at: body.ends_at,
            active: body.active,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(shift)))
}

pub async fn update_shift(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ShiftBody>,
) -> Result<impl IntoResponse, ApiError> {
    let shift = state
        .lookups
        .update_shift(UpdateShiftParams {
            id,
            name: body.name,
            starts_at: body.starts_at,
            ends_at: body.ends_at,
            active: body.active,
        })
        .await?;
    Ok(Json(shift))
}

// -------- Facilities --------

#[derive(Debug, Deserialize)]
pub struct FacilityBody {
    pub code: String,
    pub name: String,
    pub city_id: Option<Uuid>,
    pub address: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

pub async fn list_facilities(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let facilities = state.facilities.list_facilities().await?;
    Ok(Json(facilities.as_ref().clone()))
}

pub async fn get_facility(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let facility = state
        .facilities
        .find_facility(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Facility not found"))?;
    Ok(Json(facility.as_ref().clone()))
}

pub async fn create_facility(
    State(state): State<AppState>,
    Json(body): Json<FacilityBody>,
) -> Result<impl IntoResponse, ApiError> {
    let facility = state
        .facilities
        .create_facility(CreateFacilityParams {
            code: body.code,
            name: body.name,
            city_id: body.city_id,
            address: body.address,
            active: body.active,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(facility)))
}

pub async fn update_facility(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<FacilityBody>,
) -> Result<impl IntoResponse, ApiError> {
    let facility = state
        .facilities
        .update_facility(UpdateFacilityParams {
            id,
            code: body.code,
            name: body.name,
            city_id: body.city_id,
            address: body.address,
            active: body.active,
        })
        .await?;
    Ok(Json(facility))
}

#[derive(Debug, Deserialize)]
pub struct DepartmentBody {
    pub facility_id: Uuid,
    pub code: String,
    pub name: String,
    pub floor: Option<i16>,
    #[serde(default = "default_active")]
    pub active: bool,
}

pub async fn list_departments(
    State(state): State<AppState>,
    Path(facility_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let departments = state.facilities.list_departments(facility_id).await?;
    Ok(Json(departments.as_ref().clone()))
}

pub async fn get_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let department = state
        .facilities
        .find_department(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Department not found"))?;
    Ok(Json(department))
}

pub async fn create_department(
    State(state): State<AppState>,
    Json(body): Json<DepartmentBody>,
) -> Result<impl IntoResponse, ApiError> {
    let department = state
        .facilities
        .create_department(CreateDepartmentParams {
            facility_id: body.facility_id,
            code: body.code,
            name: body.name,
            floor: body.floor,
            active: body.active,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(department)))
}

pub async fn update_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<DepartmentBody>,
) -> Result<impl IntoResponse, ApiError> {
    let department = state
        .facilities
        .update_department(UpdateDepartmentParams {
            id,
            code: body.code,
            name: body.name,
            floor: body.floor,
            active: body.active,
        })
        .await?;
    Ok(Json(department))
}

#[derive(Debug, Deserialize)]
pub struct RoomBody {
    pub department_id: Uuid,
    pub name: String,
    pub kind: RoomKind,
    #[serde(default = "default_active")]
    pub active: bool,
}

pub async fn list_rooms(
    State(state): State<AppState>,
    Path(department_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let rooms = state.facilities.list_rooms(department_id).await?;
    Ok(Json(rooms.as_ref().clone()))
}

pub async fn create_room(
    State(state): State<AppState>,
    Json(body): Json<RoomBody>,
) -> Result<impl IntoResponse, ApiError> {
    let room = state
        .facilities
        .create_room(CreateRoomParams {
            department_id: body.department_id,
            name: body.name,
            kind: body.kind,
            active: body.active,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(room)))
}

pub async fn update_room(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RoomBody>,
) -> Result<impl IntoResponse, ApiError> {
    let room = state
        .facilities
        .update_room(UpdateRoomParams {
            id,
            name: body.name,
            kind: body.kind,
            active: body.active,
        })
        .await?;
    Ok(Json(room))
}

#[derive(Debug, Deserialize)]
pub struct BedListQuery {
    pub room_id: Option<Uuid>,
    pub status: Option<BedStatus>,
}

#[derive(Debug, Deserialize)]
pub struct BedBody {
    pub room_id: Uuid,
    pub label: String,
    #[serde(default = "default_bed_status")]
    pub status: BedStatus,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_bed_status() -> BedStatus {
    BedStatus::Available
}

#[derive(Debug, Deserialize)]
pub struct BedStatusBody {
    pub status: BedStatus,
}

pub async fn list_beds(
    State(state): State<AppState>,
    Query(query): Query<BedListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let beds = state
        .facilities
        .list_beds(BedQueryFilter {
            room_id: query.room_id,
            status: query.status,
        })
        .await?;
    Ok(Json(beds.as_ref().clone()))
}

pub async fn get_bed(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let bed = state
        .facilities
        .find_bed(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Bed not found"))?;
    Ok(Json(bed.as_ref().clone()))
}

pub async fn create_bed(
    State(state): State<AppState>,
    Json(body): Json<BedBody>,
) -> Result<impl IntoResponse, ApiError> {
    let bed = state
        .facilities
        .create_bed(CreateBedParams {
            room_id: body.room_id,
            label: body.label,
            status: body.status,
            active: body.active,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(bed)))
}

pub async fn update_bed(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<BedBody>,
) -> Result<impl IntoResponse, ApiError> {
    let bed = state
        .facilities
        .update_bed(UpdateBedParams {
            id,
            label: body.label,
            status: body.status,
            active: body.active,
        })
        .await?;
    Ok(Json(bed))
}

pub async fn set_bed_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<BedStatusBody>,
) -> Result<impl IntoResponse, ApiError> {
    let bed = state.facilities.set_bed_status(id, body.status).await?;
    Ok(Json(bed))
}

// -------- Staff --------

#[derive(Debug, Deserialize)]
pub struct StaffListQuery {
    pub facility_id: Option<Uuid>,
    pub role: Option<StaffRole>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StaffBody {
    pub facility_id: Uuid,
    pub department_id: Option<Uuid>,
    pub full_name: String,
    pub role: StaffRole,
    pub shift_id: Option<Uuid>,
    #[serde(default = "default_active")]
    pub active: bool,
}

pub async fn list_staff(
    State(state): State<AppState>,
    Query(query): Query<StaffListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request(query.page, query.per_page)?;
    let result = state
        .staff
        .list_staff(
            StaffQueryFilter {
                facility_id: query.facility_id,
                role: query.role,
                search: query.search,
            },
            page,
        )
        .await?;
    Ok(Json(result.as_ref().clone()))
}

pub async fn get_staff(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let staff = state
        .staff
        .find_staff(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Staff member not found"))?;
    Ok(Json(staff.as_ref().clone()))
}

pub async fn create_staff(
    State(state): State<AppState>,
    Json(body): Json<StaffBody>,
) -> Result<impl IntoResponse, ApiError> {
    let staff = state
        .staff
        .create_staff(CreateStaffParams {
            facility_id: body.facility_id,
            department_id: body.department_id,
            full_name: body.full_name,
            role: body.role,
            shift_id: body.shift_id,
            active: body.active,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(staff)))
}

pub async fn update_staff(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StaffBody>,
) -> Result<impl IntoResponse, ApiError> {
    let staff = state
        .staff
        .update_staff(UpdateStaffParams {
            id,
            facility_id: body.facility_id,
            department_id: body.department_id,
            full_name: body.full_name,
            role: body.role,
            shift_id: body.shift_id,
            active: body.active,
        })
        .await?;
    Ok(Json(staff))
}

// -------- Patients --------

#[derive(Debug, Deserialize)]
pub struct PatientListQuery {
    pub search: Option<String>,
    pub active: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePatientBody {
    pub mrn: String,
    pub full_name: String,
    pub birth_date: Date,
    pub gender: Gender,
    pub city_id: Option<Uuid>,
    pub nationality_id: Option<Uuid>,
    pub marital_status_id: Option<Uuid>,
    pub blood_group_id: Option<Uuid>,
    pub phone: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePatientBody {
    pub full_name: String,
    pub birth_date: Date,
    pub gender: Gender,
    pub city_id: Option<Uuid>,
    pub nationality_id: Option<Uuid>,
    pub marital_status_id: Option<Uuid>,
    pub blood_group_id: Option<Uuid>,
    pub phone: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

pub async fn list_patients(
    State(state): State<AppState>,
    Query(query): Query<PatientListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request(query.page, query.per_page)?;
    let result = state
        .patients
        .list_patients(
            PatientQueryFilter {
                search: query.search,
                active: query.active,
            },
            page,
        )
        .await?;
    Ok(Json(result.as_ref().clone()))
}

pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let patient = state
        .patients
        .find_patient(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Patient not found"))?;
    Ok(Json(patient.as_ref().clone()))
}

pub async fn get_patient_by_mrn(
    State(state): State<AppState>,
    Path(mrn): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let patient = state
        .patients
        .find_patient_by_mrn(&mrn)
        .await?
        .ok_or_else(|| ApiError::not_found("Patient not found"))?;
    Ok(Json(patient.as_ref().clone()))
}

pub async fn create_patient(
    State(state): State<AppState>,
    Json(body): Json<CreatePatientBody>,
) -> Result<impl IntoResponse, ApiError> {
    let patient = state
        .patients
        .register_patient(CreatePatientParams {
            mrn: body.mrn,
            full_name: body.full_name,
            birth_date: body.birth_date,
            gender: body.gender,
            city_id: body.city_id,
            nationality_id: body.nationality_id,
            marital_status_id: body.marital_status_id,
            blood_group_id: body.blood_group_id,
            phone: body.phone,
            active: body.active,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePatientBody>,
) -> Result<impl IntoResponse, ApiError> {
    let patient = state
        .patients
        .update_patient(UpdatePatientParams {
            id,
            full_name: body.full_name,
            birth_date: body.birth_date,
            gender: body.gender,
            city_id: body.city_id,
            nationality_id: body.nationality_id,
            marital_status_id: body.marital_status_id,
            blood_group_id: body.blood_group_id,
            phone: body.phone,
            active: body.active,
        })
        .await?;
    Ok(Json(patient))
}

// -------- Visits --------

#[derive(Debug, Deserialize)]
pub struct VisitListQuery {
    pub patient_id: Option<Uuid>,
    pub facility_id: Option<Uuid>,
    pub status: Option<VisitStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct OpenVisitBody {
    pub patient_id: Uuid,
    pub facility_id: Uuid,
    pub department_id: Option<Uuid>,
    pub bed_id: Option<Uuid>,
    pub admitted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct AssignBedBody {
    pub bed_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CloseVisitBody {
    pub discharged_at: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct EncounterBody {
    pub staff_id: Option<Uuid>,
    pub kind: EncounterKind,
    pub notes: Option<String>,
    pub occurred_at: Option<OffsetDateTime>,
}

pub async fn list_visits(
    State(state): State<AppState>,
    Query(query): Query<VisitListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request(query.page, query.per_page)?;
    let result = state
        .visits
        .list_visits(
            VisitQueryFilter {
                patient_id: query.patient_id,
                facility_id: query.facility_id,
                status: query.status,
            },
            page,
        )
        .await?;
    Ok(Json(result.as_ref().clone()))
}

pub async fn get_visit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let visit = state
        .visits
        .find_visit(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Visit not found"))?;
    Ok(Json(visit.as_ref().clone()))
}

pub async fn open_visit(
    State(state): State<AppState>,
    Json(body): Json<OpenVisitBody>,
) -> Result<impl IntoResponse, ApiError> {
    let visit = state
        .visits
        .open_visit(OpenVisitParams {
            patient_id: body.patient_id,
            facility_id: body.facility_id,
            department_id: body.department_id,
            bed_id: body.bed_id,
            admitted_at: body.admitted_at.unwrap_or_else(OffsetDateTime::now_utc),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(visit)))
}

pub async fn assign_bed(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignBedBody>,
) -> Result<impl IntoResponse, ApiError> {
    let visit = state.visits.assign_bed(id, body.bed_id).await?;
    Ok(Json(visit))
}

pub async fn close_visit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CloseVisitBody>,
) -> Result<impl IntoResponse, ApiError> {
    let visit = state
        .visits
        .close_visit(id, body.discharged_at.unwrap_or_else(OffsetDateTime::now_utc))
        .await?;
    Ok(Json(visit))
}

pub async fn cancel_visit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let visit = state.visits.cancel_visit(id).await?;
    Ok(Json(visit))
}

pub async fn list_encounters(
    State(state): State<AppState>,
    Path(visit_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let encounters = state.visits.list_encounters(visit_id).await?;
    Ok(Json(encounters.as_ref().clone()))
}

pub async fn add_encounter(
    State(state): State<AppState>,
    Path(visit_id): Path<Uuid>,
    Json(body): Json<EncounterBody>,
) -> Result<impl IntoResponse, ApiError> {
    let encounter = state
        .visits
        .add_encounter(AddEncounterParams {
            visit_id,
            staff_id: body.staff_id,
            kind: body.kind,
            notes: body.notes,
            occurred_at: body.occurred_at.unwrap_or_else(OffsetDateTime::now_utc),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(encounter)))
}

// -------- Favorites --------

#[derive(Debug, Deserialize)]
pub struct AddFavoriteBody {
    pub target: FavoriteTarget,
    pub target_id: Uuid,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Deserialize)]
pub struct ReorderFavoritesBody {
    pub ordered_ids: Vec<Uuid>,
}

pub async fn list_favorites(
    State(state): State<AppState>,
    Path(user_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let favorites = state.favorites.list_for_user(&user_name).await?;
    Ok(Json(favorites.as_ref().clone()))
}

pub async fn add_favorite(
    State(state): State<AppState>,
    Path(user_name): Path<String>,
    Json(body): Json<AddFavoriteBody>,
) -> Result<impl IntoResponse, ApiError> {
    let favorite = state
        .favorites
        .add_favorite(AddFavoriteParams {
            user_name,
            target: body.target,
            target_id: body.target_id,
            sort_order: body.sort_order,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(favorite)))
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.favorites.remove_favorite(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reorder_favorites(
    State(state): State<AppState>,
    Path(user_name): Path<String>,
    Json(body): Json<ReorderFavoritesBody>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .favorites
        .reorder_favorites(&user_name, &body.ordered_ids)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
