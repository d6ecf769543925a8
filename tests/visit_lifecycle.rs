//! Visit/bed lifecycle coverage against a real Postgres database.
//!
//! - Each case gets a fresh schema via `#[sqlx::test(migrations = ...)]`.
//! - Marked `#[ignore]` so the suite only runs where `DATABASE_URL` points at
//!   a disposable Postgres instance.

use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use corsia::{
    application::repos::{OpenVisitParams, RepoError, VisitsWriteRepo},
    domain::types::{BedStatus, VisitStatus},
    infra::db::PostgresRepositories,
};

struct Ward {
    patient_id: Uuid,
    facility_id: Uuid,
    bed_a: Uuid,
    bed_b: Uuid,
}

async fn seed_ward(pool: &PgPool) -> Ward {
    let facility_id = Uuid::new_v4();
    sqlx::query("INSERT INTO facilities (id, code, name) VALUES ($1, 'GEN', 'General')")
        .bind(facility_id)
        .execute(pool)
        .await
        .expect("insert facility");

    let department_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO departments (id, facility_id, code, name) VALUES ($1, $2, 'IM', 'Internal Medicine')",
    )
    .bind(department_id)
    .bind(facility_id)
    .execute(pool)
    .await
    .expect("insert department");

    let room_id = Uuid::new_v4();
    sqlx::query("INSERT INTO rooms (id, department_id, name, kind) VALUES ($1, $2, '101', 'ward')")
        .bind(room_id)
        .bind(department_id)
        .execute(pool)
        .await
        .expect("insert room");

    let bed_a = Uuid::new_v4();
    let bed_b = Uuid::new_v4();
    for (id, label) in [(bed_a, "101-A"), (bed_b, "101-B")] {
        sqlx::query("INSERT INTO beds (id, room_id, label) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(room_id)
            .bind(label)
            .execute(pool)
            .await
            .expect("insert bed");
    }

    let patient_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO patients (id, mrn, full_name, birth_date, gender) \
         VALUES ($1, 'MRN-0001', 'Amina Hassan', '1980-04-02', 'female')",
    )
    .bind(patient_id)
    .execute(pool)
    .await
    .expect("insert patient");

    Ward {
        patient_id,
        facility_id,
        bed_a,
        bed_b,
    }
}

async fn bed_status(pool: &PgPool, bed_id: Uuid) -> BedStatus {
    sqlx::query_scalar("SELECT status FROM beds WHERE id = $1")
        .bind(bed_id)
        .fetch_one(pool)
        .await
        .expect("fetch bed status")
}

fn admission(ward: &Ward, bed_id: Option<Uuid>) -> OpenVisitParams {
    OpenVisitParams {
        patient_id: ward.patient_id,
        facility_id: ward.facility_id,
        department_id: None,
        bed_id,
        admitted_at: OffsetDateTime::now_utc(),
    }
}

#[ignore]
#[sqlx::test(migrations = "./migrations")]
async fn reassigning_a_bed_releases_the_previous_one(pool: PgPool) {
    let ward = seed_ward(&pool).await;
    let repos = PostgresRepositories::new(pool.clone());

    let visit = repos
        .open_visit(admission(&ward, Some(ward.bed_a)))
        .await
        .expect("open visit");
    assert_eq!(bed_status(&pool, ward.bed_a).await, BedStatus::Occupied);

    let moved = repos
        .assign_bed(visit.id, ward.bed_b)
        .await
        .expect("reassign bed");
    assert_eq!(moved.bed_id, Some(ward.bed_b));
    assert_eq!(bed_status(&pool, ward.bed_a).await, BedStatus::Available);
    assert_eq!(bed_status(&pool, ward.bed_b).await, BedStatus::Occupied);

    let closed = repos
        .close_visit(visit.id, OffsetDateTime::now_utc())
        .await
        .expect("close visit");
    assert_eq!(closed.status, VisitStatus::Closed);
    assert_eq!(bed_status(&pool, ward.bed_a).await, BedStatus::Available);
    assert_eq!(bed_status(&pool, ward.bed_b).await, BedStatus::Available);
}

#[ignore]
#[sqlx::test(migrations = "./migrations")]
async fn reassigning_the_same_bed_is_a_no_op(pool: PgPool) {
    let ward = seed_ward(&pool).await;
    let repos = PostgresRepositories::new(pool.clone());

    let visit = repos
        .open_visit(admission(&ward, Some(ward.bed_a)))
        .await
        .expect("open visit");

    let unchanged = repos
        .assign_bed(visit.id, ward.bed_a)
        .await
        .expect("reassign same bed");
    assert_eq!(unchanged.bed_id, Some(ward.bed_a));
    assert_eq!(bed_status(&pool, ward.bed_a).await, BedStatus::Occupied);
}

#[ignore]
#[sqlx::test(migrations = "./migrations")]
async fn assigning_a_first_bed_occupies_it(pool: PgPool) {
    let ward = seed_ward(&pool).await;
    let repos = PostgresRepositories::new(pool.clone());

    let visit = repos
        .open_visit(admission(&ward, None))
        .await
        .expect("open visit without bed");
    assert_eq!(visit.bed_id, None);

    let assigned = repos
        .assign_bed(visit.id, ward.bed_a)
        .await
        .expect("assign bed");
    assert_eq!(assigned.bed_id, Some(ward.bed_a));
    assert_eq!(bed_status(&pool, ward.bed_a).await, BedStatus::Occupied);
}

#[ignore]
#[sqlx::test(migrations = "./migrations")]
async fn assigning_a_bed_to_a_closed_visit_is_not_found(pool: PgPool) {
    let ward = seed_ward(&pool).await;
    let repos = PostgresRepositories::new(pool.clone());

    let visit = repos
        .open_visit(admission(&ward, Some(ward.bed_a)))
        .await
        .expect("open visit");
    repos
        .close_visit(visit.id, OffsetDateTime::now_utc())
        .await
        .expect("close visit");

    let result = repos.assign_bed(visit.id, ward.bed_b).await;
    assert!(matches!(result, Err(RepoError::NotFound)));
    assert_eq!(bed_status(&pool, ward.bed_b).await, BedStatus::Available);
}
