//! Legacy-data migrations
//!
//! Normalizes data written by older screen versions so the reconciliation
//! engine sees consistent shapes. Guarded by a one-shot flag key; safe to
//! run at every service startup. Best-effort: a record that cannot be
//! normalized is carried through unchanged.

use serde_json::Value;
use tracing::{debug, info};

use crate::schema::Record;
use crate::store::{keys, LocalStore};
use crate::time;
use crate::Result;

/// Run all migrations once per database.
pub async fn run_all_once(store: &LocalStore) -> Result<()> {
    if store.read_raw(keys::MIGRATIONS_FLAG).await?.as_deref() == Some("1") {
        return Ok(());
    }
    let changed = migrate_intake_dates(store).await?;
    if changed {
        info!("migrated legacy design-intake entries");
    }
    store.write_raw(keys::MIGRATIONS_FLAG, "1").await?;
    Ok(())
}

/// Normalize `antrian_input_desain`: coerce input dates to RFC 3339 and
/// force SPK ids to strings. Returns whether anything was rewritten.
pub async fn migrate_intake_dates(store: &LocalStore) -> Result<bool> {
    let mut list = store.read_list(keys::DESIGN_INTAKE).await?;
    let mut changed = false;

    for entry in &mut list {
        let Some(obj) = entry.as_object() else {
            continue;
        };

        let current = obj.get("tanggalInput").and_then(Value::as_str);
        if current.map(is_iso_millis) != Some(true) {
            let raw_date = Record(entry).intake_input_date().map(str::to_string);
            if let Some(iso) = raw_date.as_deref().and_then(time::parse_flexible) {
                if let Some(obj) = entry.as_object_mut() {
                    obj.insert("tanggalInput".to_string(), Value::String(time::to_iso(iso)));
                    changed = true;
                }
            }
        }

        if let Some(obj) = entry.as_object_mut() {
            if let Some(id) = obj.get("idSpk") {
                if !id.is_string() && !id.is_null() {
                    let as_string = match id {
                        Value::Number(n) => n.to_string(),
                        other => other.to_string(),
                    };
                    obj.insert("idSpk".to_string(), Value::String(as_string));
                    changed = true;
                }
            }
        }
    }

    if changed {
        store.write_list(keys::DESIGN_INTAKE, &list).await?;
    } else {
        debug!("design-intake entries already normalized");
    }
    Ok(changed)
}

/// Exact shape check for `YYYY-MM-DDTHH:MM:SS.mmmZ`
fn is_iso_millis(s: &str) -> bool {
    s.len() == 24
        && s.ends_with('Z')
        && s.as_bytes().get(19) == Some(&b'.')
        && chrono::DateTime::parse_from_rfc3339(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::init_database;
    use serde_json::json;

    async fn test_store() -> (LocalStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = init_database(&dir.path().join("spk.db"))
            .await
            .expect("init db");
        (LocalStore::new(pool), dir)
    }

    #[test]
    fn test_is_iso_millis() {
        assert!(is_iso_millis("2024-01-01T00:00:00.000Z"));
        assert!(!is_iso_millis("2024-01-01T00:00:00Z"));
        assert!(!is_iso_millis("01-02-2024"));
    }

    #[tokio::test]
    async fn test_migrates_legacy_dates_and_numeric_ids() {
        let (store, _dir) = test_store().await;
        store
            .write_list(
                keys::DESIGN_INTAKE,
                &[
                    json!({ "idSpk": 1001, "tanggalInput": "05-03-2024" }),
                    json!({ "idSpk": "SPK-2", "tanggalInput": "2024-01-01T00:00:00.000Z" }),
                    json!({ "idSpk": "SPK-3", "input_date": "2024-02-02" }),
                ],
            )
            .await
            .unwrap();

        assert!(migrate_intake_dates(&store).await.unwrap());

        let list = store.read_list(keys::DESIGN_INTAKE).await.unwrap();
        assert_eq!(list[0]["idSpk"], "1001");
        assert_eq!(list[0]["tanggalInput"], "2024-03-05T00:00:00.000Z");
        // Already-normalized entry untouched
        assert_eq!(list[1]["tanggalInput"], "2024-01-01T00:00:00.000Z");
        // Alternate key spellings feed the normalized field
        assert_eq!(list[2]["tanggalInput"], "2024-02-02T00:00:00.000Z");
    }

    #[tokio::test]
    async fn test_run_all_once_is_guarded() {
        let (store, _dir) = test_store().await;
        store
            .write_list(keys::DESIGN_INTAKE, &[json!({ "idSpk": 7 })])
            .await
            .unwrap();

        run_all_once(&store).await.unwrap();
        let after_first = store.read_list(keys::DESIGN_INTAKE).await.unwrap();
        assert_eq!(after_first[0]["idSpk"], "7");

        // Re-corrupt; the guard flag prevents a second pass
        store
            .write_list(keys::DESIGN_INTAKE, &[json!({ "idSpk": 8 })])
            .await
            .unwrap();
        run_all_once(&store).await.unwrap();
        let after_second = store.read_list(keys::DESIGN_INTAKE).await.unwrap();
        assert_eq!(after_second[0]["idSpk"], 8);
    }
}
