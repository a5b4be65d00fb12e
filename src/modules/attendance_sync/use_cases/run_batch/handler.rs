use crate::modules::attendance_sync::core::attendance::{EmployeeProfile, UpstreamRecord};
use crate::modules::attendance_sync::core::board_columns::BoardColumns;
use crate::modules::attendance_sync::core::fingerprint::fingerprint;
use crate::modules::attendance_sync::core::identity::IdentityTable;
use crate::modules::attendance_sync::core::ports::{
    AttendanceSource, BoardClient, IdentityStore, UpstreamError,
};
use crate::modules::attendance_sync::use_cases::project_record::project::project;
use crate::modules::attendance_sync::use_cases::reconcile_record::decision::Outcome;
use crate::modules::attendance_sync::use_cases::reconcile_record::handler::Reconciler;
use crate::modules::attendance_sync::use_cases::run_batch::report::{
    BatchReport, RecordError, RunError,
};
use crate::modules::attendance_sync::use_cases::run_batch::window::SyncWindow;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

type EmployeeCache = Mutex<HashMap<String, Arc<OnceCell<EmployeeLookup>>>>;
type RecordResult = (usize, String, Result<Outcome, RecordError>);

#[derive(Debug, Clone)]
enum EmployeeLookup {
    Found(EmployeeProfile),
    /// The source does not know the employee.
    Missing,
    /// The lookup failed; the employee's fields are unknown for this run.
    Unavailable,
}

impl EmployeeLookup {
    fn profile(&self) -> Option<&EmployeeProfile> {
        match self {
            Self::Found(profile) => Some(profile),
            Self::Missing | Self::Unavailable => None,
        }
    }
}

struct LoadedTable {
    table: IdentityTable,
    dirty: bool,
}

/// Drives one reconciliation pass over a batch of attendances.
///
/// The identity table is loaded on the first run and kept in memory for
/// the lifetime of the runner; it is saved once per run when it holds
/// unsaved changes. A failed save is logged and retried after the next run.
///
/// Records sharing an external reference form one partition and are
/// always handled in order by a single worker. With a concurrency above
/// one, distinct partitions run side by side.
pub struct BatchRunner<TSource, TBoard, TStore>
where
    TSource: AttendanceSource + 'static,
    TBoard: BoardClient + 'static,
    TStore: IdentityStore + 'static,
{
    source: Arc<TSource>,
    store: Arc<TStore>,
    reconciler: Reconciler<TBoard>,
    columns: BoardColumns,
    concurrency: usize,
    loaded: tokio::sync::Mutex<Option<LoadedTable>>,
}

impl<TSource, TBoard, TStore> BatchRunner<TSource, TBoard, TStore>
where
    TSource: AttendanceSource + 'static,
    TBoard: BoardClient + 'static,
    TStore: IdentityStore + 'static,
{
    pub fn new(
        source: Arc<TSource>,
        board: Arc<TBoard>,
        store: Arc<TStore>,
        board_id: impl Into<String>,
        columns: BoardColumns,
    ) -> Self {
        Self {
            source,
            store,
            reconciler: Reconciler::new(board_id, board),
            columns,
            concurrency: 1,
            loaded: tokio::sync::Mutex::new(None),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Fetches the window's attendances and reconciles them.
    pub async fn sync_window(&self, window: SyncWindow) -> Result<BatchReport, RunError> {
        let records = self
            .source
            .fetch_attendance(window.start, window.end)
            .await?;
        info!(
            start = %window.start,
            end = %window.end,
            fetched = records.len(),
            "fetched attendances"
        );
        self.run_once(records).await
    }

    pub async fn run_once(&self, records: Vec<UpstreamRecord>) -> Result<BatchReport, RunError> {
        // Held for the whole run so two runs never interleave on the table.
        let mut loaded = self.loaded.lock().await;
        let mut state = match loaded.take() {
            Some(state) => state,
            None => {
                let table = self.store.load().await?;
                info!(mappings = table.len(), "loaded identity store");
                LoadedTable {
                    table,
                    dirty: false,
                }
            }
        };

        let table = Mutex::new(std::mem::take(&mut state.table));
        let report = self.process(records, &table).await;
        state.table = table.into_inner().unwrap_or_else(PoisonError::into_inner);
        state.dirty |= report.has_mutations();

        if state.dirty {
            match self.store.save(&state.table).await {
                Ok(()) => {
                    state.dirty = false;
                    debug!(mappings = state.table.len(), "persisted identity store");
                }
                Err(error) => warn!(
                    %error,
                    mappings = state.table.len(),
                    "persisting the identity store failed; keeping the in-memory table"
                ),
            }
        }
        *loaded = Some(state);

        info!(
            processed = report.processed,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            failed = report.failed.len(),
            "sync run finished"
        );
        Ok(report)
    }

    async fn process(&self, records: Vec<UpstreamRecord>, table: &Mutex<IdentityTable>) -> BatchReport {
        let employees = EmployeeCache::default();
        let employees = &employees;

        let mut results: Vec<RecordResult> = stream::iter(partition(records))
            .map(|records| self.process_partition(records, table, employees))
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect();
        results.sort_by_key(|(position, _, _)| *position);

        let mut report = BatchReport::default();
        for (_, external_reference, result) in results {
            report.record(&external_reference, result);
        }
        report
    }

    async fn process_partition(
        &self,
        records: Vec<(usize, UpstreamRecord)>,
        table: &Mutex<IdentityTable>,
        employees: &EmployeeCache,
    ) -> Vec<RecordResult> {
        let mut results = Vec::with_capacity(records.len());
        for (position, record) in records {
            let external_reference = record.external_reference().to_string();
            let result = self.process_record(&record, table, employees).await;
            if let Err(error) = &result {
                warn!(external_reference = %external_reference, %error, "attendance sync failed");
            }
            results.push((position, external_reference, result));
        }
        results
    }

    async fn process_record(
        &self,
        record: &UpstreamRecord,
        table: &Mutex<IdentityTable>,
        employees: &EmployeeCache,
    ) -> Result<Outcome, RecordError> {
        let employee = self.employee(&record.employee_id, employees).await;

        // Without the profile the email column would drop out of the
        // projection while the board keeps its old value.
        let degraded =
            matches!(employee, EmployeeLookup::Unavailable) && self.columns.email.is_some();
        if degraded && lock(table).get(record.external_reference()).is_some() {
            warn!(
                external_reference = record.external_reference(),
                employee_id = %record.employee_id,
                "employee unavailable; leaving the synced item for the next run"
            );
            return Ok(Outcome::Unchanged);
        }

        let projection = project(record, employee.profile(), &self.columns)?;
        let fingerprint = fingerprint(&projection);
        let outcome = self
            .reconciler
            .reconcile(record.external_reference(), &projection, &fingerprint, table)
            .await?;
        Ok(outcome)
    }

    /// Each employee is fetched at most once per run, failed lookups
    /// included. Concurrent partitions wait on the same lookup.
    async fn employee(&self, employee_id: &str, cache: &EmployeeCache) -> EmployeeLookup {
        let cell = lock(cache).entry(employee_id.to_string()).or_default().clone();
        cell.get_or_init(|| async {
            match self.source.fetch_employee(employee_id).await {
                Ok(profile) => EmployeeLookup::Found(profile),
                Err(UpstreamError::EmployeeNotFound(_)) => {
                    warn!(employee_id, "employee not found; using fallback name");
                    EmployeeLookup::Missing
                }
                Err(error) => {
                    warn!(employee_id, %error, "employee lookup failed; using fallback name");
                    EmployeeLookup::Unavailable
                }
            }
        })
        .await
        .clone()
    }
}

/// Groups records by external reference, keeping first-seen order and the
/// original position of every record.
fn partition(records: Vec<UpstreamRecord>) -> Vec<Vec<(usize, UpstreamRecord)>> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut partitions: Vec<Vec<(usize, UpstreamRecord)>> = Vec::new();
    for (position, record) in records.into_iter().enumerate() {
        let slot = *slots
            .entry(record.external_reference().to_string())
            .or_insert_with(|| {
                partitions.push(Vec::new());
                partitions.len() - 1
            });
        partitions[slot].push((position, record));
    }
    partitions
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
