//! Reconciler — the per-record decision engine.
//!
//! For each job row, in store order, exactly one of these applies (first
//! match wins): delete, update, create, already-synced. Validation and
//! enrichment failures are contained per record; actuation failures
//! propagate and abort the pass, leaving earlier mutations intact so a
//! re-run resumes where it stopped.

pub mod form;
pub mod notes;
pub mod validation;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::actuator::{ActuationError, DeleteOutcome, FormData, RemoteActuator};
use crate::geocode::{self, Geocoder};
use crate::store::{JobRecord, JobStore};

/// Per-pass tally. The six buckets partition every record processed
/// before a fatal abort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportCounts {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped_invalid: usize,
    pub failed_enrichment: usize,
    pub already_synced: usize,
}

impl ReportCounts {
    pub fn processed(&self) -> usize {
        self.created
            + self.updated
            + self.deleted
            + self.skipped_invalid
            + self.failed_enrichment
            + self.already_synced
    }
}

pub struct Reconciler<'a> {
    actuator: &'a dyn RemoteActuator,
    geocoder: &'a dyn Geocoder,
}

impl<'a> Reconciler<'a> {
    pub fn new(actuator: &'a dyn RemoteActuator, geocoder: &'a dyn Geocoder) -> Self {
        Self { actuator, geocoder }
    }

    /// Runs one full pass over the store, strictly sequential.
    pub async fn run(&self, store: &mut JobStore) -> Result<ReportCounts, ActuationError> {
        let total = store.job_count();
        info!(total, "processing jobs");

        let mut counts = ReportCounts::default();
        for idx in 0..total {
            self.reconcile_one(store, idx, &mut counts).await?;
        }

        info!(
            created = counts.created,
            updated = counts.updated,
            deleted = counts.deleted,
            skipped_invalid = counts.skipped_invalid,
            failed_enrichment = counts.failed_enrichment,
            already_synced = counts.already_synced,
            "reconciliation pass complete"
        );
        Ok(counts)
    }

    async fn reconcile_one(
        &self,
        store: &mut JobStore,
        idx: usize,
        counts: &mut ReportCounts,
    ) -> Result<(), ActuationError> {
        let record = store.job(idx).clone();

        // 1. Delete — terminal, never followed by create/update.
        if record.delete_requested() {
            match record.remote_id {
                Some(remote_id) => match self.actuator.delete(remote_id).await? {
                    DeleteOutcome::Deleted => {
                        info!(row = idx, remote_id, "deleted remote entry");
                        counts.deleted += 1;
                    }
                    DeleteOutcome::NotFound => {
                        info!(row = idx, remote_id, "remote entry already gone");
                        counts.already_synced += 1;
                    }
                },
                None => {
                    debug!(row = idx, "marked for deletion but never uploaded");
                    counts.already_synced += 1;
                }
            }
            return Ok(());
        }

        // 2. Update — known remotely and locally edited since the last sync.
        if let Some(remote_id) = record.remote_id {
            if record.is_stale() {
                let Some(form) = self.prepare_form(&record, idx, counts).await else {
                    return Ok(());
                };
                let pending = notes::select_pending(store.notes(), Some(remote_id));
                let texts = notes::pending_texts(store.notes(), &pending);
                self.actuator.edit(remote_id, &form, &texts).await?;

                store.job_mut(idx).last_uploaded = Some(now());
                notes::mark_uploaded(store, &pending);
                info!(row = idx, remote_id, notes = texts.len(), "updated remote entry");
                counts.updated += 1;
            } else {
                // 4. Already synced.
                debug!(
                    row = idx,
                    remote_id,
                    company = record.company.as_deref().unwrap_or(""),
                    "already uploaded"
                );
                counts.already_synced += 1;
            }
            return Ok(());
        }

        // 3. Create — no remote identity yet.
        let Some(form) = self.prepare_form(&record, idx, counts).await else {
            return Ok(());
        };
        // Notes are keyed by remote id, which does not exist yet, so none
        // can be selected here; they ride along after creation instead.
        let pending = notes::select_pending(store.notes(), record.remote_id);
        let texts = notes::pending_texts(store.notes(), &pending);
        let remote_id = self.actuator.create(&form, &texts).await?;

        {
            let job = store.job_mut(idx);
            job.remote_id = Some(remote_id);
            job.last_uploaded = Some(now());
        }
        info!(row = idx, remote_id, "created remote entry");

        // Sheet authors sometimes pre-fill note rows with the id they
        // expect; attach anything already keyed to the new id.
        let pending = notes::select_pending(store.notes(), Some(remote_id));
        if !pending.is_empty() {
            let texts = notes::pending_texts(store.notes(), &pending);
            self.actuator.attach_notes(remote_id, &texts).await?;
            notes::mark_uploaded(store, &pending);
        }
        counts.created += 1;
        Ok(())
    }

    /// Shared create/update guard: mandatory fields, then enrichment.
    /// Returns `None` when the record must be skipped (already counted).
    async fn prepare_form(
        &self,
        record: &JobRecord,
        idx: usize,
        counts: &mut ReportCounts,
    ) -> Option<FormData> {
        let missing = validation::validate(record);
        if !missing.is_valid() {
            warn!(
                row = idx,
                missing = %missing.joined(),
                "cannot submit entry with incomplete data"
            );
            counts.skipped_invalid += 1;
            return None;
        }

        let location_text = record.location.as_deref().unwrap_or_default();
        match geocode::enrich(self.geocoder, location_text).await {
            Ok(details) => Some(form::build_form_data(record, &details)),
            Err(e) => {
                warn!(row = idx, location = location_text, "enrichment failed: {e}");
                counts.failed_enrichment += 1;
                None
            }
        }
    }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::geocode::{
        AddressComponent, GeocodeError, LatLng, Place, TextSearchResponse,
    };
    use crate::store::NoteRecord;

    // ── mocks ──────────────────────────────────────────────────────────

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create { form: FormData, notes: Vec<String> },
        Edit { remote_id: i64, notes: Vec<String> },
        Delete { remote_id: i64 },
        AttachNotes { remote_id: i64, notes: Vec<String> },
    }

    struct MockActuator {
        calls: Mutex<Vec<Call>>,
        next_id: i64,
        delete_outcome: DeleteOutcome,
    }

    impl MockActuator {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                next_id: 101,
                delete_outcome: DeleteOutcome::Deleted,
            }
        }

        fn with_delete_outcome(outcome: DeleteOutcome) -> Self {
            Self {
                delete_outcome: outcome,
                ..Self::new()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteActuator for MockActuator {
        async fn create(&self, form: &FormData, notes: &[String]) -> Result<i64, ActuationError> {
            self.calls.lock().unwrap().push(Call::Create {
                form: form.clone(),
                notes: notes.to_vec(),
            });
            Ok(self.next_id)
        }

        async fn edit(
            &self,
            remote_id: i64,
            _form: &FormData,
            notes: &[String],
        ) -> Result<(), ActuationError> {
            self.calls.lock().unwrap().push(Call::Edit {
                remote_id,
                notes: notes.to_vec(),
            });
            Ok(())
        }

        async fn delete(&self, remote_id: i64) -> Result<DeleteOutcome, ActuationError> {
            self.calls.lock().unwrap().push(Call::Delete { remote_id });
            Ok(self.delete_outcome)
        }

        async fn attach_notes(
            &self,
            remote_id: i64,
            notes: &[String],
        ) -> Result<(), ActuationError> {
            self.calls.lock().unwrap().push(Call::AttachNotes {
                remote_id,
                notes: notes.to_vec(),
            });
            Ok(())
        }
    }

    struct FailingActuator;

    #[async_trait]
    impl RemoteActuator for FailingActuator {
        async fn create(&self, _: &FormData, _: &[String]) -> Result<i64, ActuationError> {
            Err(ActuationError::MissingResourceId)
        }
        async fn edit(&self, id: i64, _: &FormData, _: &[String]) -> Result<(), ActuationError> {
            Err(ActuationError::WrongResource(id))
        }
        async fn delete(&self, _: i64) -> Result<DeleteOutcome, ActuationError> {
            Err(ActuationError::UnexpectedStatus {
                action: "delete",
                status: 500,
            })
        }
        async fn attach_notes(&self, _: i64, _: &[String]) -> Result<(), ActuationError> {
            Ok(())
        }
    }

    struct StubGeocoder {
        response: TextSearchResponse,
    }

    impl StubGeocoder {
        /// "Remote" resolving to city=None/state=None/country=Worldwide, 0/0.
        fn worldwide() -> Self {
            Self {
                response: TextSearchResponse {
                    places: vec![Place {
                        formatted_address: Some("Worldwide".to_string()),
                        address_components: vec![AddressComponent {
                            short_text: Some("Worldwide".to_string()),
                            types: vec!["country".to_string()],
                        }],
                        location: Some(LatLng {
                            latitude: 0.0,
                            longitude: 0.0,
                        }),
                    }],
                },
            }
        }

        fn empty() -> Self {
            Self {
                response: TextSearchResponse::default(),
            }
        }
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn search_text(&self, _query: &str) -> Result<TextSearchResponse, GeocodeError> {
            Ok(self.response.clone())
        }
    }

    // ── fixtures ───────────────────────────────────────────────────────

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn complete_record() -> JobRecord {
        JobRecord {
            position: Some("Backend Engineer".to_string()),
            company: Some("Acme".to_string()),
            work_type: Some("Full Time".to_string()),
            employment_options: Some("Remote".to_string()),
            location: Some("Remote".to_string()),
            date_saved: Some(dt("2024-03-15 08:00:00")),
            ..Default::default()
        }
    }

    fn store_of(jobs: Vec<JobRecord>, notes: Vec<NoteRecord>) -> JobStore {
        JobStore::new(jobs, notes)
    }

    // ── create ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_assigns_identity_and_timestamp() {
        let actuator = MockActuator::new();
        let geocoder = StubGeocoder::worldwide();
        let mut store = store_of(vec![complete_record()], vec![]);
        let start = chrono::Local::now().naive_local();

        let counts = Reconciler::new(&actuator, &geocoder)
            .run(&mut store)
            .await
            .unwrap();

        assert_eq!(counts.created, 1);
        assert_eq!(counts.processed(), 1);
        assert_eq!(store.job(0).remote_id, Some(101));
        assert!(store.job(0).last_uploaded.unwrap() >= start);

        let calls = actuator.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            Call::Create { form, notes } => {
                assert_eq!(form.company.as_deref(), Some("Acme"));
                assert_eq!(form.title.as_deref(), Some("Backend Engineer"));
                assert_eq!(form.city, None);
                assert_eq!(form.state, None);
                assert_eq!(form.country.as_deref(), Some("Worldwide"));
                assert_eq!(form.latitude, Some(0.0));
                assert_eq!(form.longitude, Some(0.0));
                assert!(notes.is_empty());
            }
            other => panic!("expected create, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_second_pass_is_already_synced() {
        let actuator = MockActuator::new();
        let geocoder = StubGeocoder::worldwide();
        let mut store = store_of(vec![complete_record()], vec![]);
        let reconciler = Reconciler::new(&actuator, &geocoder);

        reconciler.run(&mut store).await.unwrap();
        let second = reconciler.run(&mut store).await.unwrap();

        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 0);
        assert_eq!(second.deleted, 0);
        assert_eq!(second.already_synced, 1);
        // no further actuator traffic on the second pass
        assert_eq!(actuator.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_create_attaches_notes_prekeyed_to_new_id() {
        let actuator = MockActuator::new(); // assigns 101
        let geocoder = StubGeocoder::worldwide();
        let notes = vec![
            NoteRecord {
                job_id: Some(101),
                text: Some("recruiter call".to_string()),
                uploaded: None,
            },
            NoteRecord {
                job_id: Some(999),
                text: Some("unrelated".to_string()),
                uploaded: None,
            },
        ];
        let mut store = store_of(vec![complete_record()], notes);

        Reconciler::new(&actuator, &geocoder)
            .run(&mut store)
            .await
            .unwrap();

        let calls = actuator.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1],
            Call::AttachNotes {
                remote_id: 101,
                notes: vec!["recruiter call".to_string()],
            }
        );
        assert_eq!(store.notes()[0].uploaded.as_deref(), Some("Yes"));
        assert!(store.notes()[1].is_pending());
    }

    // ── validation gate ────────────────────────────────────────────────

    #[tokio::test]
    async fn test_missing_company_never_reaches_actuator() {
        let actuator = MockActuator::new();
        let geocoder = StubGeocoder::worldwide();
        let mut record = complete_record();
        record.company = None;
        let mut store = store_of(vec![record], vec![]);

        let counts = Reconciler::new(&actuator, &geocoder)
            .run(&mut store)
            .await
            .unwrap();

        assert_eq!(counts.skipped_invalid, 1);
        assert_eq!(counts.created, 0);
        assert!(actuator.calls().is_empty());
        assert_eq!(store.job(0).remote_id, None);
    }

    #[tokio::test]
    async fn test_invalid_stale_record_skips_edit() {
        let actuator = MockActuator::new();
        let geocoder = StubGeocoder::worldwide();
        let mut record = complete_record();
        record.remote_id = Some(42);
        record.location = None;
        record.last_updated = Some(dt("2024-02-01 00:00:00"));
        record.last_uploaded = Some(dt("2024-01-01 00:00:00"));
        let mut store = store_of(vec![record], vec![]);

        let counts = Reconciler::new(&actuator, &geocoder)
            .run(&mut store)
            .await
            .unwrap();

        assert_eq!(counts.skipped_invalid, 1);
        assert!(actuator.calls().is_empty());
    }

    // ── enrichment failure ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_enrichment_failure_skips_record_and_run_continues() {
        let actuator = MockActuator::new();
        let geocoder = StubGeocoder::empty();
        let mut store = store_of(vec![complete_record(), complete_record()], vec![]);

        let counts = Reconciler::new(&actuator, &geocoder)
            .run(&mut store)
            .await
            .unwrap();

        assert_eq!(counts.failed_enrichment, 2);
        assert_eq!(counts.skipped_invalid, 0);
        assert_eq!(counts.processed(), 2);
        assert!(actuator.calls().is_empty());
    }

    // ── update ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_stale_record_triggers_edit_not_create() {
        let actuator = MockActuator::new();
        let geocoder = StubGeocoder::worldwide();
        let mut record = complete_record();
        record.remote_id = Some(42);
        record.last_updated = Some(dt("2024-02-01 00:00:00"));
        record.last_uploaded = Some(dt("2024-01-01 00:00:00"));
        let mut store = store_of(vec![record], vec![]);

        let counts = Reconciler::new(&actuator, &geocoder)
            .run(&mut store)
            .await
            .unwrap();

        assert_eq!(counts.updated, 1);
        assert_eq!(counts.created, 0);
        let calls = actuator.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0], Call::Edit { remote_id: 42, .. }));
        assert!(store.job(0).last_uploaded.unwrap() > dt("2024-01-01 00:00:00"));
    }

    #[tokio::test]
    async fn test_equal_timestamps_are_not_stale() {
        let actuator = MockActuator::new();
        let geocoder = StubGeocoder::worldwide();
        let mut record = complete_record();
        record.remote_id = Some(42);
        record.last_updated = Some(dt("2024-01-01 00:00:00"));
        record.last_uploaded = Some(dt("2024-01-01 00:00:00"));
        let mut store = store_of(vec![record], vec![]);

        let counts = Reconciler::new(&actuator, &geocoder)
            .run(&mut store)
            .await
            .unwrap();

        assert_eq!(counts.already_synced, 1);
        assert!(actuator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remote_id_without_upload_marker_is_stale() {
        let actuator = MockActuator::new();
        let geocoder = StubGeocoder::worldwide();
        let mut record = complete_record();
        record.remote_id = Some(42);
        record.last_updated = Some(dt("2024-02-01 00:00:00"));
        let mut store = store_of(vec![record], vec![]);

        let counts = Reconciler::new(&actuator, &geocoder)
            .run(&mut store)
            .await
            .unwrap();

        assert_eq!(counts.updated, 1);
        assert!(matches!(&actuator.calls()[0], Call::Edit { remote_id: 42, .. }));
    }

    // ── delete ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_delete_flag_invokes_delete_only() {
        let actuator = MockActuator::new();
        let geocoder = StubGeocoder::worldwide();
        let mut record = complete_record();
        record.remote_id = Some(42);
        record.delete = Some("Yes".to_string());
        // stale as well; delete must still win
        record.last_updated = Some(dt("2024-02-01 00:00:00"));
        record.last_uploaded = Some(dt("2024-01-01 00:00:00"));
        let mut store = store_of(vec![record], vec![]);

        let counts = Reconciler::new(&actuator, &geocoder)
            .run(&mut store)
            .await
            .unwrap();

        assert_eq!(counts.deleted, 1);
        assert_eq!(counts.updated, 0);
        assert_eq!(actuator.calls(), vec![Call::Delete { remote_id: 42 }]);
        // the row survives in the store, flag intact
        assert!(store.job(0).delete_requested());
    }

    #[tokio::test]
    async fn test_delete_already_gone_is_satisfied_not_retried_as_action() {
        let actuator = MockActuator::with_delete_outcome(DeleteOutcome::NotFound);
        let geocoder = StubGeocoder::worldwide();
        let mut record = complete_record();
        record.remote_id = Some(42);
        record.delete = Some("Yes".to_string());
        let mut store = store_of(vec![record], vec![]);

        let counts = Reconciler::new(&actuator, &geocoder)
            .run(&mut store)
            .await
            .unwrap();

        assert_eq!(counts.deleted, 0);
        assert_eq!(counts.already_synced, 1);
    }

    #[tokio::test]
    async fn test_delete_without_remote_id_skips_actuator() {
        let actuator = MockActuator::new();
        let geocoder = StubGeocoder::worldwide();
        let mut record = complete_record();
        record.delete = Some("Yes".to_string());
        let mut store = store_of(vec![record], vec![]);

        let counts = Reconciler::new(&actuator, &geocoder)
            .run(&mut store)
            .await
            .unwrap();

        assert!(actuator.calls().is_empty());
        assert_eq!(counts.already_synced, 1);
        // terminal: never recreated despite having no remote id
        assert_eq!(store.job(0).remote_id, None);
    }

    // ── notes exactly-once ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_notes_uploaded_exactly_once_across_runs() {
        let actuator = MockActuator::new();
        let geocoder = StubGeocoder::worldwide();
        let mut record = complete_record();
        record.remote_id = Some(7);
        record.last_updated = Some(dt("2024-02-01 00:00:00"));
        record.last_uploaded = Some(dt("2024-01-01 00:00:00"));
        let notes = vec![
            NoteRecord {
                job_id: Some(7),
                text: Some("first".to_string()),
                uploaded: None,
            },
            NoteRecord {
                job_id: Some(7),
                text: Some("second".to_string()),
                uploaded: None,
            },
            NoteRecord {
                job_id: Some(7),
                text: Some("old".to_string()),
                uploaded: Some("Yes".to_string()),
            },
        ];
        let mut store = store_of(vec![record], notes);
        let reconciler = Reconciler::new(&actuator, &geocoder);

        reconciler.run(&mut store).await.unwrap();
        assert_eq!(
            actuator.calls(),
            vec![Call::Edit {
                remote_id: 7,
                notes: vec!["first".to_string(), "second".to_string()],
            }]
        );
        assert!(store.notes().iter().all(|n| !n.is_pending()));

        // force a second update; the notes must not ride along again
        store.job_mut(0).last_updated =
            Some(store.job(0).last_uploaded.unwrap() + chrono::Duration::hours(1));
        reconciler.run(&mut store).await.unwrap();

        let calls = actuator.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1],
            Call::Edit {
                remote_id: 7,
                notes: vec![],
            }
        );
    }

    // ── aggregate & abort ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_counts_partition_the_store() {
        let actuator = MockActuator::new();
        let geocoder = StubGeocoder::worldwide();

        let create_me = complete_record();
        let mut invalid = complete_record();
        invalid.work_type = None;
        let mut synced = complete_record();
        synced.remote_id = Some(5);
        let mut doomed = complete_record();
        doomed.remote_id = Some(6);
        doomed.delete = Some("Yes".to_string());

        let mut store = store_of(vec![create_me, invalid, synced, doomed], vec![]);
        let counts = Reconciler::new(&actuator, &geocoder)
            .run(&mut store)
            .await
            .unwrap();

        assert_eq!(counts.created, 1);
        assert_eq!(counts.skipped_invalid, 1);
        assert_eq!(counts.already_synced, 1);
        assert_eq!(counts.deleted, 1);
        assert_eq!(counts.processed(), store.job_count());
    }

    #[tokio::test]
    async fn test_actuation_error_aborts_but_keeps_earlier_mutations() {
        let ok_actuator = MockActuator::new();
        let geocoder = StubGeocoder::worldwide();

        // first record syncs fine, second explodes
        let mut store = store_of(vec![complete_record(), complete_record()], vec![]);
        let reconciler = Reconciler::new(&ok_actuator, &geocoder);
        reconciler
            .reconcile_one(&mut store, 0, &mut ReportCounts::default())
            .await
            .unwrap();

        let failing = FailingActuator;
        let result = Reconciler::new(&failing, &geocoder)
            .reconcile_one(&mut store, 1, &mut ReportCounts::default())
            .await;

        assert!(matches!(result, Err(ActuationError::MissingResourceId)));
        // record 0 keeps its id and timestamp for the resumed run
        assert_eq!(store.job(0).remote_id, Some(101));
        assert!(store.job(0).last_uploaded.is_some());
        assert_eq!(store.job(1).remote_id, None);
    }
}
