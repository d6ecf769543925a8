//! Cross-service cache behavior.
//!
//! All services in one process share a single `QueryCache` through the
//! `QueryExecutor`, so a write in one service must evict cached reads held
//! by another whenever the entries carry the written entity's tag. These
//! tests wire two services to the same executor and count repository
//! fetches to observe evictions.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::{Date, Month, OffsetDateTime, Time};
use uuid::Uuid;

use corsia::application::facilities::FacilityService;
use corsia::application::lookups::LookupService;
use corsia::application::pagination::PageRequest;
use corsia::application::patients::PatientService;
use corsia::application::query::QueryExecutor;
use corsia::application::repos::{
    AddEncounterParams, BedQueryFilter, BedListRecord, CreateBedParams, CreateCityParams,
    CreateDepartmentParams, CreateFacilityParams, CreatePatientParams, CreateRoomParams,
    CreateShiftParams, FacilitiesRepo, FacilitiesWriteRepo, FacilityListRecord, LookupsRepo,
    LookupsWriteRepo, OpenVisitParams, PatientListRecord, PatientQueryFilter, PatientsRepo,
    PatientsWriteRepo, RepoError, UpdateBedParams, UpdateCityParams, UpdateDepartmentParams,
    UpdateFacilityParams, UpdatePatientParams, UpdateRoomParams, UpdateShiftParams,
    EncounterListRecord, VisitListRecord, VisitQueryFilter, VisitsRepo, VisitsWriteRepo,
};
use corsia::application::pagination::Paged;
use corsia::application::visits::VisitService;
use corsia::cache::QueryCache;
use corsia::config::CacheSettings;
use corsia::domain::entities::{
    BedRecord, BloodGroupRecord, CityRecord, DepartmentRecord, EncounterRecord, FacilityRecord,
    MaritalStatusRecord, NationalityRecord, PatientRecord, RoomRecord, ShiftRecord, VisitRecord,
};
use corsia::domain::types::{BedStatus, Gender, VisitStatus};

fn executor(enabled: bool) -> QueryExecutor {
    let settings = CacheSettings {
        enabled,
        capacity: NonZeroUsize::new(64).expect("capacity"),
        ttl: Duration::from_secs(300),
    };
    QueryExecutor::new(Arc::new(QueryCache::new(&settings)))
}

fn epoch() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

fn city_record() -> CityRecord {
    CityRecord {
        id: Uuid::new_v4(),
        name: "Lyon".into(),
        active: true,
    }
}

fn shift_record() -> ShiftRecord {
    ShiftRecord {
        id: Uuid::new_v4(),
        name: "Night".into(),
        starts_at: Time::from_hms(20, 0, 0).expect("time"),
        ends_at: Time::from_hms(8, 0, 0).expect("time"),
        active: true,
    }
}

fn patient_record(mrn: &str) -> PatientListRecord {
    PatientListRecord {
        patient: PatientRecord {
            id: Uuid::new_v4(),
            mrn: mrn.into(),
            full_name: "Nadia Aziz".into(),
            birth_date: Date::from_calendar_date(1980, Month::January, 1).expect("date"),
            gender: Gender::Female,
            city_id: None,
            nationality_id: None,
            marital_status_id: None,
            blood_group_id: None,
            phone: None,
            active: true,
            created_at: epoch(),
            updated_at: epoch(),
        },
        city_name: None,
        nationality_name: None,
        marital_status_name: None,
        blood_group_name: None,
    }
}

fn bed_record(label: &str) -> BedListRecord {
    BedListRecord {
        bed: BedRecord {
            id: Uuid::new_v4(),
            room_id: Uuid::new_v4(),
            label: label.into(),
            status: BedStatus::Available,
            active: true,
            created_at: epoch(),
            updated_at: epoch(),
        },
        room_name: "101".into(),
        department_name: "Cardiology".into(),
        facility_name: "Central".into(),
    }
}

fn visit_record(status: VisitStatus) -> VisitRecord {
    VisitRecord {
        id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        facility_id: Uuid::new_v4(),
        department_id: None,
        bed_id: Some(Uuid::new_v4()),
        status,
        admitted_at: epoch(),
        discharged_at: None,
        created_at: epoch(),
        updated_at: epoch(),
    }
}

// ---------------------------------------------------------------------------
// Stub repositories
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CountingPatientsRepo {
    list_calls: AtomicUsize,
    fail_first: bool,
}

#[async_trait]
impl PatientsRepo for CountingPatientsRepo {
    async fn list_patients(
        &self,
        _filter: &PatientQueryFilter,
        page: PageRequest,
    ) -> Result<Paged<PatientListRecord>, RepoError> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_first && call == 0 {
            return Err(RepoError::Timeout);
        }
        Ok(Paged {
            items: vec![patient_record("MRN-001")],
            page: page.page(),
            per_page: page.per_page(),
            total: 1,
        })
    }

    async fn find_patient(&self, _id: Uuid) -> Result<Option<PatientListRecord>, RepoError> {
        Ok(None)
    }

    async fn find_patient_by_mrn(
        &self,
        _mrn: &str,
    ) -> Result<Option<PatientListRecord>, RepoError> {
        Ok(None)
    }
}

struct NoPatientWrites;

#[async_trait]
impl PatientsWriteRepo for NoPatientWrites {
    async fn create_patient(
        &self,
        _params: CreatePatientParams,
    ) -> Result<PatientRecord, RepoError> {
        Err(RepoError::NotFound)
    }

    async fn update_patient(
        &self,
        _params: UpdatePatientParams,
    ) -> Result<PatientRecord, RepoError> {
        Err(RepoError::NotFound)
    }
}

struct CityDirectory;

#[async_trait]
impl LookupsRepo for CityDirectory {
    async fn list_cities(&self, _active_only: bool) -> Result<Vec<CityRecord>, RepoError> {
        Ok(vec![city_record()])
    }

    async fn find_city(&self, _id: Uuid) -> Result<Option<CityRecord>, RepoError> {
        Ok(Some(city_record()))
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
        Ok(Vec::new())
    }

    async fn list_shifts(&self, _active_only: bool) -> Result<Vec<ShiftRecord>, RepoError> {
        Ok(vec![shift_record()])
    }

    async fn find_shift(&self, _id: Uuid) -> Result<Option<ShiftRecord>, RepoError> {
        Ok(Some(shift_record()))
    }
}

struct AcceptingLookupWrites;

#[async_trait]
impl LookupsWriteRepo for AcceptingLookupWrites {
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

#[derive(Default)]
struct CountingBedsRepo {
    bed_list_calls: AtomicUsize,
}

#[async_trait]
impl FacilitiesRepo for CountingBedsRepo {
    async fn list_facilities(
        &self,
        _active_only: bool,
    ) -> Result<Vec<FacilityListRecord>, RepoError> {
        Ok(Vec::new())
    }

    async fn find_facility(&self, _id: Uuid) -> Result<Option<FacilityListRecord>, RepoError> {
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

    async fn list_beds(&self, _filter: &BedQueryFilter) -> Result<Vec<BedListRecord>, RepoError> {
        self.bed_list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![bed_record("ICU-1")])
    }

    async fn find_bed(&self, _id: Uuid) -> Result<Option<BedListRecord>, RepoError> {
        Ok(Some(bed_record("ICU-1")))
    }
}

struct NoFacilityWrites;

#[async_trait]
impl FacilitiesWriteRepo for NoFacilityWrites {
    async fn create_facility(
        &self,
        _params: CreateFacilityParams,
    ) -> Result<FacilityRecord, RepoError> {
        Err(RepoError::NotFound)
    }

    async fn update_facility(
        &self,
        _params: UpdateFacilityParams,
    ) -> Result<FacilityRecord, RepoError> {
        Err(RepoError::NotFound)
    }

    async fn create_department(
        &self,
        _params: CreateDepartmentParams,
    ) -> Result<DepartmentRecord, RepoError> {
        Err(RepoError::NotFound)
    }

    async fn update_department(
        &self,
        _params: UpdateDepartmentParams,
    ) -> Result<DepartmentRecord, RepoError> {
        Err(RepoError::NotFound)
    }

    async fn create_room(&self, _params: CreateRoomParams) -> Result<RoomRecord, RepoError> {
        Err(RepoError::NotFound)
    }

    async fn update_room(&self, _params: UpdateRoomParams) -> Result<RoomRecord, RepoError> {
        Err(RepoError::NotFound)
    }

    async fn create_bed(&self, _params: CreateBedParams) -> Result<BedRecord, RepoError> {
        Err(RepoError::NotFound)
    }

    async fn update_bed(&self, _params: UpdateBedParams) -> Result<BedRecord, RepoError> {
        Err(RepoError::NotFound)
    }

    async fn set_bed_status(
        &self,
        _id: Uuid,
        _status: BedStatus,
    ) -> Result<BedRecord, RepoError> {
        Err(RepoError::NotFound)
    }
}

struct EmptyVisitsRepo;

#[async_trait]
impl VisitsRepo for EmptyVisitsRepo {
    async fn list_visits(
        &self,
        _filter: &VisitQueryFilter,
        page: PageRequest,
    ) -> Result<Paged<VisitListRecord>, RepoError> {
        Ok(Paged::empty(page))
    }

    async fn find_visit(&self, _id: Uuid) -> Result<Option<VisitListRecord>, RepoError> {
        Ok(None)
    }

    async fn list_encounters(
        &self,
        _visit_id: Uuid,
    ) -> Result<Vec<EncounterListRecord>, RepoError> {
        Ok(Vec::new())
    }
}

struct DischargingVisitWrites;

#[async_trait]
impl VisitsWriteRepo for DischargingVisitWrites {
    async fn open_visit(&self, _params: OpenVisitParams) -> Result<VisitRecord, RepoError> {
        Ok(visit_record(VisitStatus::Open))
    }

    async fn assign_bed(&self, _visit_id: Uuid, _bed_id: Uuid) -> Result<VisitRecord, RepoError> {
        Ok(visit_record(VisitStatus::Open))
    }

    async fn close_visit(
        &self,
        id: Uuid,
        discharged_at: OffsetDateTime,
    ) -> Result<VisitRecord, RepoError> {
        let mut record = visit_record(VisitStatus::Closed);
        record.id = id;
        record.discharged_at = Some(discharged_at);
        Ok(record)
    }

    async fn cancel_visit(&self, _id: Uuid) -> Result<VisitRecord, RepoError> {
        Ok(visit_record(VisitStatus::Cancelled))
    }

    async fn add_encounter(
        &self,
        _params: AddEncounterParams,
    ) -> Result<EncounterRecord, RepoError> {
        Err(RepoError::NotFound)
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn city_rename_evicts_patient_pages_in_another_service() {
    let exec = executor(true);
    let patients_repo = Arc::new(CountingPatientsRepo::default());
    let patients = PatientService::new(
        patients_repo.clone(),
        Arc::new(NoPatientWrites),
        exec.clone(),
    );
    let lookups = LookupService::new(
        Arc::new(CityDirectory),
        Arc::new(AcceptingLookupWrites),
        exec,
    );

    let page = PageRequest::new(1, 25).expect("page");
    patients
        .list_patients(PatientQueryFilter::default(), page)
        .await
        .expect("first read");
    patients
        .list_patients(PatientQueryFilter::default(), page)
        .await
        .expect("cached read");
    assert_eq!(patients_repo.list_calls.load(Ordering::SeqCst), 1);

    // Patient pages join city names, so a city write must drop them.
    lookups
        .update_city(UpdateCityParams {
            id: Uuid::new_v4(),
            name: "Villeurbanne".into(),
            active: true,
        })
        .await
        .expect("city update");

    patients
        .list_patients(PatientQueryFilter::default(), page)
        .await
        .expect("read after eviction");
    assert_eq!(patients_repo.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn shift_update_leaves_patient_pages_cached() {
    let exec = executor(true);
    let patients_repo = Arc::new(CountingPatientsRepo::default());
    let patients = PatientService::new(
        patients_repo.clone(),
        Arc::new(NoPatientWrites),
        exec.clone(),
    );
    let lookups = LookupService::new(
        Arc::new(CityDirectory),
        Arc::new(AcceptingLookupWrites),
        exec,
    );

    let page = PageRequest::new(1, 25).expect("page");
    patients
        .list_patients(PatientQueryFilter::default(), page)
        .await
        .expect("first read");

    // Shifts are unrelated to patient projections.
    lookups
        .update_shift(UpdateShiftParams {
            id: Uuid::new_v4(),
            name: "Day".into(),
            starts_at: Time::from_hms(8, 0, 0).expect("time"),
            ends_at: Time::from_hms(20, 0, 0).expect("time"),
            active: true,
        })
        .await
        .expect("shift update");

    patients
        .list_patients(PatientQueryFilter::default(), page)
        .await
        .expect("still cached");
    assert_eq!(patients_repo.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn closing_a_visit_evicts_cached_bed_lists() {
    let exec = executor(true);
    let beds_repo = Arc::new(CountingBedsRepo::default());
    let facilities = FacilityService::new(
        beds_repo.clone(),
        Arc::new(NoFacilityWrites),
        exec.clone(),
    );
    let visits = VisitService::new(
        Arc::new(EmptyVisitsRepo),
        Arc::new(DischargingVisitWrites),
        exec,
    );

    facilities
        .list_beds(BedQueryFilter::default())
        .await
        .expect("first read");
    facilities
        .list_beds(BedQueryFilter::default())
        .await
        .expect("cached read");
    assert_eq!(beds_repo.bed_list_calls.load(Ordering::SeqCst), 1);

    // Discharge frees the bed, so occupancy views must be refetched.
    visits
        .close_visit(Uuid::new_v4(), epoch())
        .await
        .expect("close visit");

    facilities
        .list_beds(BedQueryFilter::default())
        .await
        .expect("read after discharge");
    assert_eq!(beds_repo.bed_list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn disabled_cache_fetches_on_every_read() {
    let exec = executor(false);
    let patients_repo = Arc::new(CountingPatientsRepo::default());
    let patients = PatientService::new(patients_repo.clone(), Arc::new(NoPatientWrites), exec);

    let page = PageRequest::new(1, 25).expect("page");
    for _ in 0..3 {
        patients
            .list_patients(PatientQueryFilter::default(), page)
            .await
            .expect("read");
    }
    assert_eq!(patients_repo.list_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn failed_fetches_are_not_cached() {
    let exec = executor(true);
    let patients_repo = Arc::new(CountingPatientsRepo {
        list_calls: AtomicUsize::new(0),
        fail_first: true,
    });
    let patients = PatientService::new(patients_repo.clone(), Arc::new(NoPatientWrites), exec);

    let page = PageRequest::new(1, 25).expect("page");
    assert!(
        patients
            .list_patients(PatientQueryFilter::default(), page)
            .await
            .is_err()
    );

    // The error must not poison the slot: the retry hits the repository and
    // its result is cached as usual.
    patients
        .list_patients(PatientQueryFilter::default(), page)
        .await
        .expect("retry succeeds");
    patients
        .list_patients(PatientQueryFilter::default(), page)
        .await
        .expect("cached read");
    assert_eq!(patients_repo.list_calls.load(Ordering::SeqCst), 2);
}
