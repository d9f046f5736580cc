mod db;
mod display;
mod errors;
mod models;
mod renewals;
mod storage;
mod tracker;
mod views;

pub use crate::db::Database;
pub use crate::display::{date_cell, external_link, mailto_href, to_display_date, to_storage_date};
pub use crate::errors::{AppError, AppResult};
pub use crate::models::{
    RenewalEntry, RenewalPartition, Row, RowPatch, SortDirection, SortKey, SortState, TabView, Tag,
    TrackerSettings, ViewCounts,
};
pub use crate::renewals::{next_renewal, partition_renewals, renewal_order, renewals_due_within};
pub use crate::storage::{demo_rows, migrate, CollectionStore, MemorySlots, SlotStore, DEFAULT_SLOT};
pub use crate::tracker::Tracker;
pub use crate::views::{counts, project, sort_rows};

use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

const DATABASE_FILE: &str = "tracker.db";

/// Everything a UI shell needs: the tracker, per-tab sort state and the
/// settings store.
pub struct AppState {
    db: Arc<Database>,
    tracker: Mutex<Tracker>,
    sorts: Mutex<HashMap<TabView, SortState>>,
    default_sort: SortState,
    renewal_alert_days: u32,
}

impl AppState {
    pub fn open(data_dir: &Path) -> AppResult<Self> {
        let db = Arc::new(Database::new(&data_dir.join(DATABASE_FILE))?);
        let settings = db.get_settings()?;
        let store = CollectionStore::new(db.clone(), settings.storage_slot.clone());
        let tracker = Tracker::open(store, settings.seed_demo_rows);

        Ok(Self {
            db,
            tracker: Mutex::new(tracker),
            sorts: Mutex::new(HashMap::new()),
            default_sort: settings.default_sort,
            renewal_alert_days: settings.renewal_alert_days,
        })
    }

    fn tracker(&self) -> AppResult<MutexGuard<'_, Tracker>> {
        self.tracker
            .lock()
            .map_err(|_| AppError::Internal("tracker mutex poisoned".to_string()))
    }

    fn sort_for(&self, tab: TabView) -> AppResult<SortState> {
        let sorts = self
            .sorts
            .lock()
            .map_err(|_| AppError::Internal("sort mutex poisoned".to_string()))?;
        Ok(sorts.get(&tab).copied().unwrap_or(self.default_sort))
    }
}

/// Creates the data directory, starts file logging and opens the state.
pub fn bootstrap(data_dir: &Path) -> AppResult<AppState> {
    std::fs::create_dir_all(data_dir)?;
    init_tracing(data_dir).map_err(AppError::Internal)?;
    let state = AppState::open(data_dir)?;
    tracing::info!(data_dir = %data_dir.to_string_lossy(), "tracker ready");
    Ok(state)
}

pub fn rows_list(state: &AppState, tab: TabView) -> Result<Vec<Row>, String> {
    let sort = state.sort_for(tab).map_err(to_client_error)?;
    let tracker = state.tracker().map_err(to_client_error)?;
    Ok(project(tracker.rows(), tab, Some(&sort)))
}

pub fn row_get(state: &AppState, row_id: String) -> Result<Option<Row>, String> {
    let tracker = state.tracker().map_err(to_client_error)?;
    Ok(tracker.get(&row_id).cloned())
}

pub fn row_add(state: &AppState) -> Result<Row, String> {
    let mut tracker = state.tracker().map_err(to_client_error)?;
    Ok(tracker.add_row())
}

pub fn row_update(state: &AppState, row_id: String, patch: RowPatch) -> Result<Option<Row>, String> {
    let mut tracker = state.tracker().map_err(to_client_error)?;
    Ok(tracker.update_row(&row_id, patch))
}

pub fn row_delete(state: &AppState, row_id: String) -> Result<bool, String> {
    let mut tracker = state.tracker().map_err(to_client_error)?;
    Ok(tracker.delete_row(&row_id))
}

pub fn row_toggle_tag(state: &AppState, row_id: String, tag: Tag) -> Result<Option<Row>, String> {
    let mut tracker = state.tracker().map_err(to_client_error)?;
    Ok(tracker.toggle_tag(&row_id, tag))
}

pub fn sort_column_click(state: &AppState, tab: TabView, key: SortKey) -> Result<SortState, String> {
    let mut sorts = state
        .sorts
        .lock()
        .map_err(|_| to_client_error(AppError::Internal("sort mutex poisoned".to_string())))?;
    let next = sorts.get(&tab).copied().unwrap_or(state.default_sort).click(key);
    sorts.insert(tab, next);
    Ok(next)
}

pub fn view_counts(state: &AppState) -> Result<ViewCounts, String> {
    let tracker = state.tracker().map_err(to_client_error)?;
    Ok(counts(tracker.rows()))
}

pub fn renewals_list(state: &AppState) -> Result<RenewalPartition, String> {
    let tracker = state.tracker().map_err(to_client_error)?;
    Ok(partition_renewals(tracker.rows()))
}

pub fn renewals_due(state: &AppState, today: NaiveDate) -> Result<Vec<RenewalEntry>, String> {
    let tracker = state.tracker().map_err(to_client_error)?;
    Ok(renewals_due_within(tracker.rows(), today, state.renewal_alert_days))
}

pub fn settings_get(state: &AppState) -> Result<TrackerSettings, String> {
    state.db.get_settings().map_err(to_client_error)
}

/// Stored for the next start; the open tracker keeps its current slot.
pub fn settings_update(state: &AppState, update: serde_json::Value) -> Result<TrackerSettings, String> {
    state.db.update_settings(update).map_err(to_client_error)
}

pub fn display_date(value: String) -> String {
    date_cell(&value)
}

fn init_tracing(data_dir: &Path) -> Result<(), String> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }
    let file_appender = tracing_appender::rolling::daily(log_dir, "tracker.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    if let Err(error) = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
    {
        tracing::debug!(error = %error, "global subscriber already installed");
    }
    Ok(())
}

fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}
