use crate::models::{Row, RowPatch, Tag};
use crate::storage::CollectionStore;

/// Owner of the master collection. Every effective change is written back
/// through the [`CollectionStore`]; reads hand out borrowed snapshots only.
pub struct Tracker {
    rows: Vec<Row>,
    store: CollectionStore,
    unsaved: bool,
}

impl Tracker {
    pub fn open(store: CollectionStore, seed_demo_rows: bool) -> Self {
        let rows = store.load_or_seed(seed_demo_rows);
        tracing::info!(slot = %store.slot(), rows = rows.len(), "tracker opened");
        Self {
            rows,
            store,
            unsaved: false,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn get(&self, id: &str) -> Option<&Row> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// True when the last write was rejected; the collection then only lives
    /// in memory until a later write succeeds.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    pub fn add_row(&mut self) -> Row {
        let mut row = Row::create();
        while self.get(&row.id).is_some() {
            row = Row::create();
        }
        self.rows.insert(0, row.clone());
        tracing::info!(row_id = %row.id, "row added");
        self.persist();
        row
    }

    pub fn update_row(&mut self, id: &str, patch: RowPatch) -> Option<Row> {
        let Some(row) = self.rows.iter_mut().find(|row| row.id == id) else {
            tracing::debug!(row_id = %id, "update for unknown row ignored");
            return None;
        };
        if patch.is_empty() {
            return Some(row.clone());
        }
        row.apply_patch(patch);
        let updated = row.clone();
        self.persist();
        Some(updated)
    }

    pub fn delete_row(&mut self, id: &str) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| row.id != id);
        if self.rows.len() == before {
            tracing::debug!(row_id = %id, "delete for unknown row ignored");
            return false;
        }
        tracing::info!(row_id = %id, "row deleted");
        self.persist();
        true
    }

    /// Adds `tag` when absent, otherwise removes every copy of it.
    pub fn toggle_tag(&mut self, id: &str, tag: Tag) -> Option<Row> {
        let mut tags = self.get(id)?.tags.clone();
        if tags.contains(&tag) {
            tags.retain(|existing| *existing != tag);
        } else {
            tags.push(tag);
        }
        self.update_row(id, RowPatch::tags(tags))
    }

    pub fn set_target(&mut self, id: &str, target: bool) -> Option<Row> {
        self.update_row(
            id,
            RowPatch {
                target: Some(target),
                ..RowPatch::default()
            },
        )
    }

    pub fn set_hide_renewal(&mut self, id: &str, hide: bool) -> Option<Row> {
        self.update_row(
            id,
            RowPatch {
                hide_renewal: Some(hide),
                ..RowPatch::default()
            },
        )
    }

    /// Replaces in-memory state with whatever the slot now holds.
    pub fn reload(&mut self) {
        self.rows = self.store.load();
        self.unsaved = false;
    }

    fn persist(&mut self) {
        self.unsaved = !self.store.save(&self.rows);
    }
}
