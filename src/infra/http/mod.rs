mod error;
mod handlers;
mod state;

pub use error::{ApiError, ApiErrorBody, ApiErrorMessage};
pub use state::AppState;

use axum::Router;
use axum::routing::{delete, get, post, put};

/// Build the full JSON API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/api/v1/cities",
            get(handlers::list_cities).post(handlers::create_city),
        )
        .route(
            "/api/v1/cities/{id}",
            get(handlers::get_city).put(handlers::update_city),
        )
        .route("/api/v1/nationalities", get(handlers::list_nationalities))
        .route(
            "/api/v1/marital-statuses",
            get(handlers::list_marital_statuses),
        )
        .route("/api/v1/blood-groups", get(handlers::list_blood_groups))
        .route(
            "/api/v1/shifts",
            get(handlers::list_shifts).post(handlers::create_shift),
        )
        .route(
            "/api/v1/shifts/{id}",
            get(handlers::get_shift).put(handlers::update_shift),
        )
        .route(
            "/api/v1/facilities",
            get(handlers::list_facilities).post(handlers::create_facility),
        )
        .route(
            "/api/v1/facilities/{id}",
            get(handlers::get_facility).put(handlers::update_facility),
        )
        .route(
            "/api/v1/facilities/{id}/departments",
            get(handlers::list_departments),
        )
        .route("/api/v1/departments", post(handlers::create_department))
        .route(
            "/api/v1/departments/{id}",
            get(handlers::get_department).put(handlers::update_department),
        )
        .route("/api/v1/departments/{id}/rooms", get(handlers::list_rooms))
        .route("/api/v1/rooms", post(handlers::create_room))
        .route("/api/v1/rooms/{id}", put(handlers::update_room))
        .route(
            "/api/v1/beds",
            get(handlers::list_beds).post(handlers::create_bed),
        )
        .route(
            "/api/v1/beds/{id}",
            get(handlers::get_bed).put(handlers::update_bed),
        )
        .route("/api/v1/beds/{id}/status", put(handlers::set_bed_status))
        .route(
            "/api/v1/staff",
            get(handlers::list_staff).post(handlers::create_staff),
        )
        .route(
            "/api/v1/staff/{id}",
            get(handlers::get_staff).put(handlers::update_staff),
        )
        .route(
            "/api/v1/patients",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route(
            "/api/v1/patients/{id}",
            get(handlers::get_patient).put(handlers::update_patient),
        )
        .route(
            "/api/v1/patients/mrn/{mrn}",
            get(handlers::get_patient_by_mrn),
        )
        .route(
            "/api/v1/visits",
            get(handlers::list_visits).post(handlers::open_visit),
        )
        .route("/api/v1/visits/{id}", get(handlers::get_visit))
        .route("/api/v1/visits/{id}/bed", put(handlers::assign_bed))
        .route("/api/v1/visits/{id}/close", post(handlers::close_visit))
        .route("/api/v1/visits/{id}/cancel", post(handlers::cancel_visit))
        .route(
            "/api/v1/visits/{id}/encounters",
            get(handlers::list_encounters).post(handlers::add_encounter),
        )
        .route(
            "/api/v1/users/{user}/favorites",
            get(handlers::list_favorites).post(handlers::add_favorite),
        )
        .route(
            "/api/v1/users/{user}/favorites/order",
            put(handlers::reorder_favorites),
        )
        .route("/api/v1/favorites/{id}", delete(handlers::remove_favorite))
        .with_state(state)
}
