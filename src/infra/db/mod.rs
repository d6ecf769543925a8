//! Postgres-backed repository implementations.
//!
//! One module per aggregate; all of them hang read and write trait impls off
//! the shared [`PostgresRepositories`] handle so the pool is owned in exactly
//! one place.

mod facilities;
mod favorites;
mod lookups;
mod patients;
mod staff;
mod util;
mod visits;

pub use util::map_sqlx_error;
pub(crate) use util::like_pattern;

use std::{sync::Arc, time::Duration};

use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    query_scalar,
};

use crate::application::repos::RepoError;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    /// Round-trip probe used by the readiness endpoint.
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query_scalar::<_, i32>("SELECT 1")
            .fetch_one(self.pool())
            .await
            .map(|_| ())
    }

    fn page_total(count: i64) -> Result<u64, RepoError> {
        count
            .try_into()
            .map_err(|_| RepoError::from_persistence("row count exceeds supported range"))
    }
}
