//! Multi-source queue reconciliation
//!
//! Folds the order queue and the pipeline into a single map keyed by SPK id
//! and computes the merged status rows.
//!
//! Merge semantics are last-writer-wins at record level: queue records are
//! applied first, pipeline records second, and a later upsert fully replaces
//! an earlier row for the same id. Downstream consumers depend on this
//! record-level overwrite; see DESIGN.md before changing it to a field
//! merge.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{StatusRow, PLACEHOLDER};
use crate::schema::{self, Record};
use crate::stage::{Stage, ALL_STAGES};

/// Auxiliary lookups built once per reconciliation pass
pub struct Lookups<'a> {
    /// SPK id -> bordir-recap batch creation timestamp
    pub recap_date: HashMap<String, &'a str>,
    /// SPK id -> design-intake entry
    pub intake: HashMap<String, Record<'a>>,
}

/// Build the SPK -> recap-creation-timestamp map from the bordir-recap log.
///
/// Batches are iterated in store order and every (item id, batch timestamp)
/// pair overwrites unconditionally, so the LAST-ITERATED batch wins, not
/// the chronologically latest one. Callers rely on this ordering.
pub fn build_recap_date_map(batches: &[Value]) -> HashMap<String, &str> {
    let mut map = HashMap::new();
    for batch in batches {
        let batch = Record(batch);
        let Some(created_at) = batch.created_at() else {
            continue;
        };
        for item in batch.items() {
            if let Some(spk_id) = Record(item).spk_id() {
                map.insert(spk_id.into_owned(), created_at);
            }
        }
    }
    map
}

/// Build the SPK -> intake-entry map; later entries win in store order
pub fn build_intake_map(intake_log: &[Value]) -> HashMap<String, Record<'_>> {
    let mut map = HashMap::new();
    for entry in intake_log {
        if let Some(spk_id) = Record(entry).spk_id() {
            map.insert(spk_id.into_owned(), Record(entry));
        }
    }
    map
}

impl<'a> Lookups<'a> {
    pub fn build(rekap_log: &'a [Value], intake_log: &'a [Value]) -> Self {
        Self {
            recap_date: build_recap_date_map(rekap_log),
            intake: build_intake_map(intake_log),
        }
    }
}

/// Format a recap-production id as 7 digits: take the first contiguous digit
/// run, parse it (dropping leading zeros), zero-pad to width 7. Empty when
/// no digits are present.
pub fn format_recap_id(raw: &Value) -> String {
    let s = match raw {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return String::new(),
    };
    let run: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    match run.parse::<u64>() {
        Ok(n) => format!("{:07}", n),
        Err(_) => String::new(),
    }
}

/// Display recap-production id for a record: an embedded id wins, else the
/// external `production_recap_map` is consulted, else empty.
pub fn recap_production_id(record: Record<'_>, recap_map: &Map<String, Value>) -> String {
    if let Some(own) = record.embedded_recap_id() {
        return format_recap_id(&Value::String(own.to_string()));
    }
    record
        .spk_id()
        .and_then(|id| recap_map.get(id.as_ref()))
        .map(format_recap_id)
        .unwrap_or_default()
}

/// Merge order-queue and pipeline records into status rows.
///
/// Rows come out in order of first appearance per SPK id; a pipeline record
/// replaces the queue-derived row for the same id wholesale.
pub fn reconcile(
    order_queue: &[Value],
    pipeline: &[Value],
    lookups: &Lookups<'_>,
    recap_map: &Map<String, Value>,
    terbit_map: &Map<String, Value>,
) -> Vec<StatusRow> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<StatusRow> = Vec::new();

    let mut upsert = |raw: &Value| {
        let record = Record(raw);
        // Records with no identity are silently dropped from the merge
        let Some(spk_id) = record.spk_id() else {
            return;
        };
        let row = build_row(&spk_id, record, lookups, recap_map, terbit_map);
        match index.get(spk_id.as_ref()) {
            Some(&i) => rows[i] = row,
            None => {
                index.insert(spk_id.into_owned(), rows.len());
                rows.push(row);
            }
        }
    };

    for record in order_queue {
        upsert(record);
    }
    for record in pipeline {
        upsert(record);
    }

    apply_sibling_counts(&mut rows);
    debug!(
        queue = order_queue.len(),
        pipeline = pipeline.len(),
        rows = rows.len(),
        "reconciled status view"
    );
    rows
}

fn build_row(
    spk_id: &str,
    record: Record<'_>,
    lookups: &Lookups<'_>,
    recap_map: &Map<String, Value>,
    terbit_map: &Map<String, Value>,
) -> StatusRow {
    let intake = lookups.intake.get(spk_id).copied();

    // Quantity: the record's own positive number wins, then the intake
    // entry's free-form quantity, then the intake item-list length.
    let mut quantity = record.quantity_number().unwrap_or_else(|| {
        intake
            .and_then(|i| i.intake_quantity_raw())
            .map(schema::normalize_quantity)
            .unwrap_or(0)
    });
    if quantity == 0 {
        if let Some(len) = intake.and_then(|i| i.items_len()) {
            quantity = len as i64;
        }
    }

    let input_date = schema::resolve_input_date(record, intake);
    let deadline = schema::compute_deadline(&input_date)
        .unwrap_or_else(|| PLACEHOLDER.to_string());
    let issued = record
        .issued_date()
        .map(str::to_string)
        .or_else(|| {
            terbit_map
                .get(spk_id)
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| PLACEHOLDER.to_string());

    let mut row = StatusRow {
        id_rekap_produksi: recap_production_id(record, recap_map),
        id_transaksi: record
            .transaction_id()
            .unwrap_or(PLACEHOLDER)
            .to_string(),
        jumlah_spk: 1,
        id_spk: spk_id.to_string(),
        id_rekap_custom: record.recap_custom_id().unwrap_or_default().to_string(),
        id_custom: record.custom_id().unwrap_or_default().to_string(),
        nama_desain: record.design_name().unwrap_or_default().to_string(),
        kuantity: quantity,
        status_desain: "Proses".to_string(),
        status_konten: intake
            .and_then(|i| i.content_note())
            .or_else(|| record.content_note())
            .unwrap_or(PLACEHOLDER)
            .to_string(),
        tgl_input_pesanan: input_date,
        deadline_konsumen: deadline,
        tgl_spk_terbit: issued,
        ..StatusRow::default()
    };

    for stage in ALL_STAGES {
        row.set_stage_timestamp(stage, record.stage_timestamp(stage).map(str::to_string));
    }
    // Plotting-embroidery completion is backfilled from the recap log when
    // the order was batched there, overriding the record's own stamp.
    if let Some(recap_ts) = lookups.recap_date.get(spk_id) {
        row.set_stage_timestamp(Stage::PlottingBordir, Some((*recap_ts).to_string()));
    }
    row
}

/// Group rows by transaction id (absent/empty -> "-") and write the group
/// cardinality onto every member.
fn apply_sibling_counts(rows: &mut [StatusRow]) {
    let mut by_trx: HashMap<&str, i64> = HashMap::new();
    for row in rows.iter() {
        let key = if row.id_transaksi.is_empty() {
            PLACEHOLDER
        } else {
            row.id_transaksi.as_str()
        };
        *by_trx.entry(key).or_insert(0) += 1;
    }
    // Second pass clones keys to release the borrow; group sizes are final.
    let counts: HashMap<String, i64> = by_trx
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    for row in rows.iter_mut() {
        let key = if row.id_transaksi.is_empty() {
            PLACEHOLDER
        } else {
            row.id_transaksi.as_str()
        };
        row.jumlah_spk = counts.get(key).copied().unwrap_or(1);
    }
}
