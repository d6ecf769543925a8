use std::sync::Arc;

use crate::application::facilities::FacilityService;
use crate::application::favorites::FavoriteService;
use crate::application::lookups::LookupService;
use crate::application::patients::PatientService;
use crate::application::query::QueryExecutor;
use crate::application::staff::StaffService;
use crate::application::visits::VisitService;
use crate::cache::QueryCache;
use crate::config::CacheSettings;
use crate::infra::db::PostgresRepositories;

/// Shared handler state: one service per domain area plus the raw repository
/// handle for health checks.
#[derive(Clone)]
pub struct AppState {
    pub lookups: LookupService,
    pub facilities: FacilityService,
    pub patients: PatientService,
    pub staff: StaffService,
    pub visits: VisitService,
    pub favorites: FavoriteService,
    pub repos: PostgresRepositories,
}

impl AppState {
    pub fn new(repos: PostgresRepositories, cache_settings: &CacheSettings) -> Self {
        let cache = Arc::new(QueryCache::new(cache_settings));
        let executor = QueryExecutor::new(cache);

        let reader = Arc::new(repos.clone());
        let writer = Arc::new(repos.clone());

        Self {
            lookups: LookupService::new(reader.clone(), writer.clone(), executor.clone()),
            facilities: FacilityService::new(reader.clone(), writer.clone(), executor.clone()),
            patients: PatientService::new(reader.clone(), writer.clone(), executor.clone()),
            staff: StaffService::new(reader.clone(), writer.clone(), executor.clone()),
            visits: VisitService::new(reader.clone(), writer.clone(), executor.clone()),
            favorites: FavoriteService::new(reader, writer, executor),
            repos,
        }
    }
}
