use crate::errors::{AppError, AppResult};
use crate::models::TrackerSettings;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Local key-value store backing the tracker: named string slots plus the
/// settings document.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.ensure_default_settings()?;

        Ok(db)
    }

    pub fn get_slot(&self, key: &str) -> AppResult<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM slots WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn put_slot(&self, key: &str, value: &str) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO slots (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_settings(&self) -> AppResult<TrackerSettings> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                "SELECT value_json FROM settings WHERE key = 'app'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(serde_json::from_str::<TrackerSettings>(&raw).unwrap_or_else(|error| {
                tracing::warn!(error = %error, "stored settings unreadable, using defaults");
                TrackerSettings::default()
            })),
            None => Ok(TrackerSettings::default()),
        }
    }

    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<TrackerSettings> {
        let current = self.get_settings()?;
        let mut merged = serde_json::to_value(current)?;
        merge_json(&mut merged, update);
        let settings: TrackerSettings = serde_json::from_value(merged)
            .map_err(|error| AppError::Invalid(format!("settings update rejected: {}", error)))?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO settings (key, value_json, updated_at)
             VALUES ('app', ?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
            params![serde_json::to_string(&settings)?, Utc::now().to_rfc3339()],
        )?;

        tracing::info!(slot = %settings.storage_slot, "settings updated");
        Ok(settings)
    }

    fn ensure_default_settings(&self) -> AppResult<()> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(1) FROM settings WHERE key = 'app'", [], |row| row.get(0))?;
        if count == 0 {
            conn.execute(
                "INSERT INTO settings (key, value_json, updated_at) VALUES ('app', ?1, ?2)",
                params![
                    serde_json::to_string(&TrackerSettings::default())?,
                    Utc::now().to_rfc3339()
                ],
            )?;
        }
        Ok(())
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Database;
    use crate::models::{SortDirection, SortKey};

    #[test]
    fn slots_upsert_per_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");

        assert_eq!(db.get_slot("csw.book").expect("read"), None);
        db.put_slot("csw.book", "[]").expect("first write");
        db.put_slot("csw.book", "[{\"id\":\"a\"}]").expect("overwrite");
        assert_eq!(
            db.get_slot("csw.book").expect("read").as_deref(),
            Some("[{\"id\":\"a\"}]")
        );
        assert_eq!(db.get_slot("csw.demo").expect("read"), None);
    }

    #[test]
    fn settings_default_then_merge_updates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("test.db");
        let db = Database::new(&db_path).expect("db");

        let defaults = db.get_settings().expect("defaults");
        assert_eq!(defaults.storage_slot, "csw.book");
        assert!(!defaults.seed_demo_rows);

        let updated = db
            .update_settings(serde_json::json!({
                "seedDemoRows": true,
                "defaultSort": { "direction": "desc" }
            }))
            .expect("update");
        assert!(updated.seed_demo_rows);
        assert_eq!(updated.default_sort.key, SortKey::Company);
        assert_eq!(updated.default_sort.direction, SortDirection::Desc);

        drop(db);
        let reopened = Database::new(&db_path).expect("reopen");
        assert_eq!(reopened.get_settings().expect("settings"), updated);
    }

    #[test]
    fn settings_update_with_wrong_type_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        let result = db.update_settings(serde_json::json!({ "renewalAlertDays": "soon" }));
        assert!(result.is_err());
        assert_eq!(db.get_settings().expect("settings").renewal_alert_days, 60);
    }
}
