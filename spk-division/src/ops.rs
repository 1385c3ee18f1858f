//! Division work-queue operations
//!
//! All writes go through the shared collection store; multi-key moves run
//! inside one SQLite transaction so readers never observe a half-applied
//! queue move.

use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use spk_common::schema::Record;
use spk_common::store::{keys, read_list_tx, write_list_tx, LocalStore};
use spk_common::{time, Error, Result, Stage};

/// Work status set when an entry moves to the validation queue
pub const STATUS_AWAITING_VALIDATION: &str = "Menunggu validasi";
/// Work status of a finished design-queue entry
pub const STATUS_DONE: &str = "Selesai";
/// Work status selecting the revision view
pub const STATUS_REVISION: &str = "Antrian revisi";

/// Statuses hidden from the worklist view
const WORKLIST_EXCLUDED: [&str; 3] = [STATUS_REVISION, STATUS_DONE, "Desain di validasi"];

/// Design-queue view selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueView {
    /// Entries still to be worked on
    Worklist,
    /// Entries sent back for revision
    Revision,
}

impl QueueView {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "worklist" => Some(Self::Worklist),
            "revision" => Some(Self::Revision),
            _ => None,
        }
    }

    fn matches(self, status: &str) -> bool {
        match self {
            Self::Worklist => !WORKLIST_EXCLUDED.contains(&status),
            Self::Revision => status == STATUS_REVISION,
        }
    }
}

fn entry_status(entry: &Value) -> &str {
    entry.get("status").and_then(Value::as_str).unwrap_or("")
}

fn queue_id(entry: &Value) -> Option<&str> {
    entry
        .get("queueId")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Read the design queue for one view.
///
/// Entries without a `queueId` get one assigned and persisted back before
/// filtering, so clients can always address entries by a stable id.
pub async fn design_queue(store: &LocalStore, view: QueueView) -> Result<Vec<Value>> {
    let mut list = store.read_list(keys::DESIGN_QUEUE).await?;

    let mut mutated = false;
    for entry in &mut list {
        if queue_id(entry).is_none() {
            if let Some(obj) = entry.as_object_mut() {
                obj.insert(
                    "queueId".to_string(),
                    Value::String(Uuid::new_v4().to_string()),
                );
                mutated = true;
            }
        }
    }
    if mutated {
        store.write_list(keys::DESIGN_QUEUE, &list).await?;
    }

    Ok(list
        .into_iter()
        .filter(|entry| view.matches(entry_status(entry)))
        .collect())
}

/// Set a design-queue entry's work status, optionally attaching worksheet
/// data. Image payloads never reach the store.
pub async fn set_queue_status(
    store: &LocalStore,
    id: &str,
    status: &str,
    worksheet: Option<&Value>,
    note: Option<&str>,
) -> Result<()> {
    if status.trim().is_empty() {
        return Err(Error::InvalidInput("status must not be empty".to_string()));
    }

    let mut list = store.read_list(keys::DESIGN_QUEUE).await?;
    let entry = list
        .iter_mut()
        .find(|entry| queue_id(entry) == Some(id))
        .ok_or_else(|| Error::NotFound(format!("design queue entry {id}")))?;

    update_entry(entry, status, worksheet, note);
    store.write_list(keys::DESIGN_QUEUE, &list).await?;
    Ok(())
}

/// The finish-design queue move.
///
/// In one transaction: the entry is marked done in `design_queue`, a copy
/// with status "Menunggu validasi" is appended to the validation queue, and
/// the design-production stage is stamped on every pipeline and order-queue
/// record carrying the entry's SPK id. Returns the moved entry.
pub async fn finish_design(
    store: &LocalStore,
    id: &str,
    worksheet: Option<&Value>,
    note: Option<&str>,
) -> Result<Value> {
    let mut tx = store.begin().await?;

    let mut queue = read_list_tx(&mut tx, keys::DESIGN_QUEUE).await?;
    let pos = queue
        .iter()
        .position(|entry| queue_id(entry) == Some(id))
        .ok_or_else(|| Error::NotFound(format!("design queue entry {id}")))?;

    update_entry(&mut queue[pos], STATUS_DONE, worksheet, note);
    let spk_id = Record(&queue[pos])
        .spk_id()
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let mut moved = queue[pos].clone();
    if let Some(obj) = moved.as_object_mut() {
        obj.insert(
            "status".to_string(),
            Value::String(STATUS_AWAITING_VALIDATION.to_string()),
        );
    }

    let mut done = read_list_tx(&mut tx, keys::DESIGN_DONE_QUEUE).await?;
    done.push(moved.clone());
    write_list_tx(&mut tx, keys::DESIGN_DONE_QUEUE, &done).await?;
    write_list_tx(&mut tx, keys::DESIGN_QUEUE, &queue).await?;

    let ts = time::now_iso();
    let mut stamped = [false, false];
    if !spk_id.is_empty() {
        for (i, key) in [keys::PIPELINE, keys::ORDER_QUEUE].into_iter().enumerate() {
            let mut records = read_list_tx(&mut tx, key).await?;
            let changed = stamp_records(&mut records, &spk_id, Stage::DesainProduksi, &ts, true);
            if changed {
                write_list_tx(&mut tx, key, &records).await?;
                stamped[i] = true;
            }
        }
    }

    tx.commit().await?;

    store.notify(keys::DESIGN_QUEUE);
    store.notify(keys::DESIGN_DONE_QUEUE);
    if stamped[0] {
        store.notify(keys::PIPELINE);
    }
    if stamped[1] {
        store.notify(keys::ORDER_QUEUE);
    }

    debug!(queue_id = id, spk_id = %spk_id, "design finished and moved to validation queue");
    Ok(moved)
}

/// Set-once stage completion stamp.
///
/// Stamps now() on every pipeline record carrying `spk_id` whose stage field
/// is still unset. Records already stamped keep their original timestamp.
/// Returns whether anything was updated.
pub async fn mark_stage_complete(store: &LocalStore, spk_id: &str, stage: Stage) -> Result<bool> {
    let id = spk_id.trim();
    if id.is_empty() {
        return Err(Error::InvalidInput("spk id must not be empty".to_string()));
    }

    let mut list = store.read_list(keys::PIPELINE).await?;
    let ts = time::now_iso();
    let updated = stamp_records(&mut list, id, stage, &ts, false);
    if updated {
        store.write_list(keys::PIPELINE, &list).await?;
    }
    Ok(updated)
}

/// Normalize and append a design-intake entry.
///
/// The input date is coerced to RFC 3339 (falling back to now() when absent
/// or unparseable) and the SPK id is forced to a string, so downstream
/// lookups see one shape regardless of the submitting client.
pub async fn submit_intake(store: &LocalStore, mut entry: Value) -> Result<Value> {
    if !entry.is_object() {
        return Err(Error::InvalidInput(
            "intake entry must be a JSON object".to_string(),
        ));
    }

    let normalized_date = Record(&entry)
        .intake_input_date()
        .and_then(time::parse_flexible)
        .map(time::to_iso)
        .unwrap_or_else(time::now_iso);

    if let Some(obj) = entry.as_object_mut() {
        obj.insert("tanggalInput".to_string(), Value::String(normalized_date));
        if let Some(id) = obj.get("idSpk") {
            if !id.is_string() && !id.is_null() {
                let as_string = match id {
                    Value::Number(n) => n.to_string(),
                    other => other.to_string(),
                };
                obj.insert("idSpk".to_string(), Value::String(as_string));
            }
        }
    }

    let mut list = store.read_list(keys::DESIGN_INTAKE).await?;
    list.push(entry.clone());
    store.write_list(keys::DESIGN_INTAKE, &list).await?;
    Ok(entry)
}

/// Apply a status (and optional worksheet) to a queue entry in place
fn update_entry(entry: &mut Value, status: &str, worksheet: Option<&Value>, note: Option<&str>) {
    let existing_ws = entry.get("worksheet").cloned();
    let Some(obj) = entry.as_object_mut() else {
        return;
    };
    obj.insert("status".to_string(), Value::String(status.to_string()));

    let ws_source = worksheet.cloned().or(existing_ws);
    if let Some(ws) = ws_source {
        obj.insert("worksheet".to_string(), sanitize_worksheet(&ws, note));
    }
    let assets = sanitize_assets(obj.get("assets"));
    obj.insert("assets".to_string(), assets);
}

/// Stamp a stage timestamp on records matching an SPK id.
///
/// With `overwrite` false the stamp is set-once: records that already carry
/// a non-empty value are left alone.
fn stamp_records(
    records: &mut [Value],
    spk_id: &str,
    stage: Stage,
    ts: &str,
    overwrite: bool,
) -> bool {
    let field = stage.local_key();
    let mut changed = false;
    for record in records.iter_mut() {
        let matches = Record(record)
            .spk_id()
            .map(|s| s.trim() == spk_id)
            .unwrap_or(false);
        if !matches {
            continue;
        }
        let Some(obj) = record.as_object_mut() else {
            continue;
        };
        let already = obj
            .get(field)
            .and_then(Value::as_str)
            .map(|s| !s.is_empty())
            .unwrap_or(false);
        if already && !overwrite {
            continue;
        }
        obj.insert(field.to_string(), Value::String(ts.to_string()));
        changed = true;
    }
    changed
}

/// Null out every nested image payload in a worksheet object.
///
/// Worksheet asset blocks carry a `file` member holding a base64 image in
/// the client; only the textual metadata is persisted.
fn sanitize_worksheet(ws: &Value, note: Option<&str>) -> Value {
    let Some(obj) = ws.as_object() else {
        return Value::Null;
    };
    let mut out = Map::new();
    for (key, value) in obj {
        match value {
            Value::Object(block) if block.contains_key("file") => {
                let mut block = block.clone();
                block.insert("file".to_string(), Value::Null);
                out.insert(key.clone(), Value::Object(block));
            }
            other => {
                out.insert(key.clone(), other.clone());
            }
        }
    }
    if let Some(note) = note {
        out.insert("catatan".to_string(), json!(note));
    }
    Value::Object(out)
}

/// Null out the `file` member of every asset entry
fn sanitize_assets(assets: Option<&Value>) -> Value {
    let Some(items) = assets.and_then(Value::as_array) else {
        return json!([]);
    };
    Value::Array(
        items
            .iter()
            .map(|item| match item {
                Value::Object(o) => {
                    let mut o = o.clone();
                    o.insert("file".to_string(), Value::Null);
                    Value::Object(o)
                }
                other => other.clone(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> (LocalStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = spk_common::store::init_database(&dir.path().join("spk.db"))
            .await
            .unwrap();
        (LocalStore::new(pool), dir)
    }

    fn queue_entry(id: &str, spk: &str, status: &str) -> Value {
        json!({
            "queueId": id,
            "idRekapCustom": "RKP-1",
            "idSpk": spk,
            "namaDesain": "Jaket Uji",
            "status": status,
            "assets": [{"file": "data:image/png;base64,AAAA", "attribute": "logo"}],
        })
    }

    #[tokio::test]
    async fn worklist_excludes_finished_and_revision_entries() {
        let (store, _dir) = test_store().await;
        store
            .write_list(
                keys::DESIGN_QUEUE,
                &[
                    queue_entry("q1", "SPK-1", ""),
                    queue_entry("q2", "SPK-2", "Sedang dikerjakan"),
                    queue_entry("q3", "SPK-3", STATUS_REVISION),
                    queue_entry("q4", "SPK-4", STATUS_DONE),
                    queue_entry("q5", "SPK-5", "Desain di validasi"),
                ],
            )
            .await
            .unwrap();

        let worklist = design_queue(&store, QueueView::Worklist).await.unwrap();
        let ids: Vec<&str> = worklist.iter().filter_map(|e| queue_id(e)).collect();
        assert_eq!(ids, vec!["q1", "q2"]);

        let revision = design_queue(&store, QueueView::Revision).await.unwrap();
        let ids: Vec<&str> = revision.iter().filter_map(|e| queue_id(e)).collect();
        assert_eq!(ids, vec!["q3"]);
    }

    #[tokio::test]
    async fn missing_queue_ids_are_assigned_and_persisted() {
        let (store, _dir) = test_store().await;
        store
            .write_list(
                keys::DESIGN_QUEUE,
                &[json!({"idRekapCustom": "RKP-1", "namaDesain": "Tanpa Id"})],
            )
            .await
            .unwrap();

        let rows = design_queue(&store, QueueView::Worklist).await.unwrap();
        let assigned = queue_id(&rows[0]).unwrap().to_string();
        assert!(!assigned.is_empty());

        // Subsequent reads see the same id
        let rows = design_queue(&store, QueueView::Worklist).await.unwrap();
        assert_eq!(queue_id(&rows[0]), Some(assigned.as_str()));
    }

    #[tokio::test]
    async fn set_status_strips_image_payloads() {
        let (store, _dir) = test_store().await;
        store
            .write_list(keys::DESIGN_QUEUE, &[queue_entry("q1", "SPK-1", "")])
            .await
            .unwrap();

        let ws = json!({
            "mockup": {"file": "data:image/jpeg;base64,BBBB", "ukuran": "10cm"},
            "linkDriveAssetJadi": "https://drive.example/x",
        });
        set_queue_status(&store, "q1", "Sedang dikerjakan", Some(&ws), Some("catatan uji"))
            .await
            .unwrap();

        let list = store.read_list(keys::DESIGN_QUEUE).await.unwrap();
        let entry = &list[0];
        assert_eq!(entry["status"], "Sedang dikerjakan");
        assert_eq!(entry["worksheet"]["mockup"]["file"], Value::Null);
        assert_eq!(entry["worksheet"]["mockup"]["ukuran"], "10cm");
        assert_eq!(entry["worksheet"]["catatan"], "catatan uji");
        assert_eq!(entry["assets"][0]["file"], Value::Null);
    }

    #[tokio::test]
    async fn set_status_unknown_id_is_not_found() {
        let (store, _dir) = test_store().await;
        let err = set_queue_status(&store, "nope", "Selesai", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn finish_design_moves_marks_and_stamps_atomically() {
        let (store, _dir) = test_store().await;
        store
            .write_list(keys::DESIGN_QUEUE, &[queue_entry("q1", "SPK-1", "Sedang dikerjakan")])
            .await
            .unwrap();
        store
            .write_list(keys::PIPELINE, &[json!({"idSpk": "SPK-1"})])
            .await
            .unwrap();
        store
            .write_list(keys::ORDER_QUEUE, &[json!({"idSpk": "SPK-1"}), json!({"idSpk": "SPK-2"})])
            .await
            .unwrap();

        let moved = finish_design(&store, "q1", None, None).await.unwrap();
        assert_eq!(moved["status"], STATUS_AWAITING_VALIDATION);

        let queue = store.read_list(keys::DESIGN_QUEUE).await.unwrap();
        assert_eq!(queue[0]["status"], STATUS_DONE);

        let done = store.read_list(keys::DESIGN_DONE_QUEUE).await.unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0]["queueId"], "q1");

        let pipeline = store.read_list(keys::PIPELINE).await.unwrap();
        assert!(pipeline[0]["selesaiDesainProduksi"].as_str().is_some());

        let orders = store.read_list(keys::ORDER_QUEUE).await.unwrap();
        assert!(orders[0]["selesaiDesainProduksi"].as_str().is_some());
        assert!(orders[1].get("selesaiDesainProduksi").is_none());
    }

    #[tokio::test]
    async fn finish_design_unknown_id_leaves_everything_untouched() {
        let (store, _dir) = test_store().await;
        store
            .write_list(keys::DESIGN_QUEUE, &[queue_entry("q1", "SPK-1", "")])
            .await
            .unwrap();

        let err = finish_design(&store, "other", None, None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let done = store.read_list(keys::DESIGN_DONE_QUEUE).await.unwrap();
        assert!(done.is_empty());
        let queue = store.read_list(keys::DESIGN_QUEUE).await.unwrap();
        assert_eq!(queue[0]["status"], "");
    }

    #[tokio::test]
    async fn stage_completion_is_set_once() {
        let (store, _dir) = test_store().await;
        store
            .write_list(
                keys::PIPELINE,
                &[
                    json!({"idSpk": "SPK-1", "selesaiCuttingPola": "2026-01-01T00:00:00.000Z"}),
                    json!({"idSpk": "SPK-1"}),
                    json!({"idSpk": "SPK-9"}),
                ],
            )
            .await
            .unwrap();

        let updated = mark_stage_complete(&store, "SPK-1", Stage::CuttingPola)
            .await
            .unwrap();
        assert!(updated);

        let list = store.read_list(keys::PIPELINE).await.unwrap();
        // First record keeps its original stamp
        assert_eq!(list[0]["selesaiCuttingPola"], "2026-01-01T00:00:00.000Z");
        // Second record got stamped now
        assert!(list[1]["selesaiCuttingPola"].as_str().is_some());
        // Unrelated record untouched
        assert!(list[2].get("selesaiCuttingPola").is_none());

        // A second call finds nothing left to stamp
        let updated = mark_stage_complete(&store, "SPK-1", Stage::CuttingPola)
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn blank_spk_id_is_rejected() {
        let (store, _dir) = test_store().await;
        let err = mark_stage_complete(&store, "  ", Stage::Bordir).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn intake_submission_normalizes_date_and_id() {
        let (store, _dir) = test_store().await;

        let entry = json!({
            "idSpk": 7021,
            "namaDesain": "Jaket Komunitas",
            "tanggalInput": "05/01/2026",
            "quantity": "15 pcs",
        });
        let saved = submit_intake(&store, entry).await.unwrap();

        assert_eq!(saved["idSpk"], "7021");
        // dd/mm/yyyy form, normalized to midnight UTC
        assert_eq!(saved["tanggalInput"], "2026-01-05T00:00:00.000Z");

        let list = store.read_list(keys::DESIGN_INTAKE).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0], saved);
    }

    #[tokio::test]
    async fn intake_without_date_defaults_to_now() {
        let (store, _dir) = test_store().await;
        let saved = submit_intake(&store, json!({"idSpk": "SPK-3"})).await.unwrap();
        assert!(saved["tanggalInput"].as_str().unwrap().ends_with('Z'));
    }
}
