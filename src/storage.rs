use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{new_row_id, Row, Tag};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub const DEFAULT_SLOT: &str = "csw.book";

const TEXT_FIELDS: &[&str] = &[
    "company",
    "primaryContact",
    "phone",
    "email",
    "lastTouch",
    "lastContacted",
    "signedDate",
    "pipedriveUrl",
    "notes",
];
const FLAG_FIELDS: &[&str] = &["target", "hideRenewal"];

/// A named-slot string store, one blob per key.
pub trait SlotStore: Send + Sync {
    fn read_slot(&self, key: &str) -> AppResult<Option<String>>;
    fn write_slot(&self, key: &str, value: &str) -> AppResult<()>;
}

impl SlotStore for Database {
    fn read_slot(&self, key: &str) -> AppResult<Option<String>> {
        self.get_slot(key)
    }

    fn write_slot(&self, key: &str, value: &str) -> AppResult<()> {
        self.put_slot(key, value)
    }
}

#[derive(Debug, Default)]
pub struct MemorySlots {
    slots: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, like a browser store over quota.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl SlotStore for MemorySlots {
    fn read_slot(&self, key: &str) -> AppResult<Option<String>> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| AppError::Internal("slot mutex poisoned".to_string()))?;
        Ok(slots.get(key).cloned())
    }

    fn write_slot(&self, key: &str, value: &str) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Storage(format!("quota exceeded writing slot '{}'", key)));
        }
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| AppError::Internal("slot mutex poisoned".to_string()))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Persists the master collection as one JSON array under a single slot.
///
/// Reads never fail: anything unreadable is treated as no data. Writes never
/// fail either; a rejected write is logged and reported through the return
/// value so callers can keep working from memory.
#[derive(Clone)]
pub struct CollectionStore {
    slots: Arc<dyn SlotStore>,
    slot: String,
}

impl CollectionStore {
    pub fn new(slots: Arc<dyn SlotStore>, slot: impl Into<String>) -> Self {
        Self {
            slots,
            slot: slot.into(),
        }
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn load(&self) -> Vec<Row> {
        match self.read_raw() {
            Some(raw) => decode_collection(&raw, &self.slot),
            None => Vec::new(),
        }
    }

    /// First-run variant of [`load`](Self::load): a slot that was never
    /// written is filled with the demo book when `seed` is set.
    pub fn load_or_seed(&self, seed: bool) -> Vec<Row> {
        match self.slots.read_slot(&self.slot) {
            Ok(Some(raw)) => decode_collection(&raw, &self.slot),
            Ok(None) if seed => {
                let rows = demo_rows();
                tracing::info!(slot = %self.slot, rows = rows.len(), "seeding empty slot with demo rows");
                self.save(&rows);
                rows
            }
            Ok(None) => Vec::new(),
            Err(error) => {
                tracing::warn!(slot = %self.slot, error = %error, "slot read failed, starting empty");
                Vec::new()
            }
        }
    }

    pub fn save(&self, rows: &[Row]) -> bool {
        let encoded = match encode_collection(rows) {
            Ok(encoded) => encoded,
            Err(error) => {
                tracing::warn!(slot = %self.slot, error = %error, "collection encode failed");
                return false;
            }
        };

        match self.slots.write_slot(&self.slot, &encoded) {
            Ok(()) => {
                tracing::debug!(slot = %self.slot, rows = rows.len(), bytes = encoded.len(), "collection saved");
                true
            }
            Err(error) => {
                tracing::warn!(slot = %self.slot, error = %error, "collection write failed, keeping in-memory state");
                false
            }
        }
    }

    fn read_raw(&self) -> Option<String> {
        match self.slots.read_slot(&self.slot) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(slot = %self.slot, error = %error, "slot read failed, starting empty");
                None
            }
        }
    }
}

fn encode_collection(rows: &[Row]) -> serde_json::Result<String> {
    let values = rows.iter().map(encode_row).collect::<serde_json::Result<Vec<_>>>()?;
    serde_json::to_string(&values)
}

fn encode_row(row: &Row) -> serde_json::Result<Value> {
    let mut value = serde_json::to_value(row)?;
    if let Some(Value::Array(tags)) = value.get_mut("tags") {
        tags.extend(row.foreign_tags.iter().cloned());
    }
    Ok(value)
}

fn decode_collection(raw: &str, slot: &str) -> Vec<Row> {
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(slot = %slot, error = %error, "stored collection is not valid JSON, starting empty");
            return Vec::new();
        }
    };

    migrate(parsed)
        .into_iter()
        .filter_map(|mut value| {
            let foreign_tags = match value.as_object_mut() {
                Some(object) => split_foreign_tags(object),
                None => Vec::new(),
            };
            match serde_json::from_value::<Row>(value) {
                Ok(mut row) => {
                    row.foreign_tags = foreign_tags;
                    Some(row)
                }
                Err(error) => {
                    tracing::warn!(slot = %slot, error = %error, "skipping malformed row");
                    None
                }
            }
        })
        .collect()
}

fn split_foreign_tags(object: &mut Map<String, Value>) -> Vec<Value> {
    let Some(Value::Array(tags)) = object.get_mut("tags") else {
        return Vec::new();
    };
    let (known, foreign): (Vec<Value>, Vec<Value>) = std::mem::take(tags)
        .into_iter()
        .partition(|tag| tag.as_str().and_then(Tag::parse).is_some());
    *tags = known;
    foreign
}

/// Brings a raw stored collection up to the current row shape.
///
/// Fields introduced by later revisions are filled with their defaults;
/// values already present are kept. Scalars of the wrong JSON type are
/// coerced (numbers and booleans become text, flags take their truthiness)
/// and a lone tag becomes a one-element list. Unknown fields and unknown tag
/// labels pass through untouched. Rows that are not JSON objects are dropped.
/// A missing, blank or repeated id is replaced with a fresh one.
pub fn migrate(raw: Value) -> Vec<Value> {
    let Value::Array(items) = raw else {
        tracing::warn!("stored collection is not an array, starting empty");
        return Vec::new();
    };

    let mut seen_ids = HashSet::new();
    let mut migrated = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(mut object) = item else {
            tracing::warn!("skipping stored row that is not an object");
            continue;
        };

        migrate_id(&mut object, &mut seen_ids);
        for field in TEXT_FIELDS {
            migrate_text(&mut object, field);
        }
        for field in FLAG_FIELDS {
            migrate_flag(&mut object, field);
        }
        migrate_tags(&mut object);

        migrated.push(Value::Object(object));
    }
    migrated
}

fn migrate_text(object: &mut Map<String, Value>, field: &str) {
    let text = match object.get(field) {
        Some(Value::String(_)) => return,
        None | Some(Value::Null) => String::new(),
        Some(other) => {
            tracing::warn!(field = %field, "coercing non-text value to text");
            match other {
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                composite => composite.to_string(),
            }
        }
    };
    object.insert(field.to_string(), Value::String(text));
}

fn migrate_flag(object: &mut Map<String, Value>, field: &str) {
    let flag = match object.get(field) {
        Some(Value::Bool(_)) => return,
        None | Some(Value::Null) => false,
        Some(other) => {
            tracing::warn!(field = %field, "coercing non-boolean flag by truthiness");
            truthy(other)
        }
    };
    object.insert(field.to_string(), Value::Bool(flag));
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn migrate_id(object: &mut Map<String, Value>, seen_ids: &mut HashSet<String>) {
    let existing = match object.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    };

    let id = match existing {
        Some(id) if !seen_ids.contains(&id) => id,
        Some(id) => {
            let fresh = unique_id(seen_ids);
            tracing::warn!(duplicate = %id, replacement = %fresh, "duplicate row id reassigned");
            fresh
        }
        None => unique_id(seen_ids),
    };

    seen_ids.insert(id.clone());
    object.insert("id".to_string(), Value::String(id));
}

fn unique_id(seen_ids: &HashSet<String>) -> String {
    loop {
        let id = new_row_id();
        if !seen_ids.contains(&id) {
            return id;
        }
    }
}

fn migrate_tags(object: &mut Map<String, Value>) {
    let tags = match object.remove("tags") {
        Some(Value::Array(tags)) => tags,
        None | Some(Value::Null) => Vec::new(),
        Some(single) => vec![single],
    };
    let unknown = tags
        .iter()
        .filter(|tag| tag.as_str().and_then(Tag::parse).is_none())
        .count();
    if unknown > 0 {
        tracing::warn!(unknown, "keeping tag labels outside the vocabulary");
    }
    object.insert("tags".to_string(), Value::Array(tags));
}

/// The starter book shown on a fresh install.
pub fn demo_rows() -> Vec<Row> {
    let entries: [(&str, &str, &str, &str, &str, &str, &[Tag], bool); 4] = [
        (
            "Jamar Power",
            "Phil Edwards",
            "619-261-2262",
            "phil@jamarpower.com",
            "2025-10-21",
            "Asked about investing",
            &[Tag::Referral],
            false,
        ),
        (
            "Stardust",
            "Brennen Chaput",
            "705-507-0867",
            "brennen@stardustsolar.com",
            "2025-10-21",
            "",
            &[Tag::Referral],
            false,
        ),
        (
            "RME",
            "Erick Justesen",
            "",
            "erick@rmeinnovations.com",
            "2025-10-21",
            "",
            &[Tag::Referral, Tag::ChurnRisk],
            false,
        ),
        (
            "Homepal",
            "Jourdan Ochoa",
            "480-466-9773",
            "jourdan@custompro.us",
            "2025-10-22",
            "Great convo; she seemed excited. Told her to email intro to me and Walid.",
            &[Tag::Referral, Tag::Upsell],
            true,
        ),
    ];

    entries
        .into_iter()
        .map(|(company, contact, phone, email, touched, notes, tags, target)| {
            let mut row = Row::create();
            row.company = company.to_string();
            row.primary_contact = contact.to_string();
            row.phone = phone.to_string();
            row.email = email.to_string();
            row.last_touch = touched.to_string();
            row.last_contacted = touched.to_string();
            row.notes = notes.to_string();
            row.tags = tags.to_vec();
            row.target = target;
            row
        })
        .collect()
}
