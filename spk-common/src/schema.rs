//! Record schema adapter
//!
//! Collection records are schemaless JSON in two naming conventions: the
//! legacy local shape (camelCase, e.g. `idSpk`) and the backend shape
//! (snake_case, e.g. `id_spk`), plus several historical spellings of the
//! intake date field. Every logical field is read through an explicit
//! priority list here so the fallback chains live in one place.

use std::borrow::Cow;

use serde_json::Value;

use crate::models::PLACEHOLDER;
use crate::stage::Stage;
use crate::time;

/// Milliseconds added to an input date to get the consumer deadline.
/// Plain millisecond arithmetic, deliberately not calendar-aware.
const DEADLINE_OFFSET_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// Read-only view over one raw collection record
#[derive(Debug, Clone, Copy)]
pub struct Record<'a>(pub &'a Value);

impl<'a> Record<'a> {
    /// First non-empty string among the given keys
    fn first_str(&self, keys: &[&str]) -> Option<&'a str> {
        keys.iter()
            .filter_map(|k| self.0.get(k).and_then(Value::as_str))
            .find(|s| !s.is_empty())
    }

    /// SPK id, the primary key across all stores.
    ///
    /// Older records sometimes carry the id as a bare number; those are
    /// accepted and stringified rather than dropped from the merge.
    pub fn spk_id(&self) -> Option<Cow<'a, str>> {
        if let Some(s) = self.first_str(&["idSpk", "id_spk"]) {
            return Some(Cow::Borrowed(s));
        }
        ["idSpk", "id_spk"].iter().find_map(|key| match self.0.get(*key) {
            Some(Value::Number(n)) => Some(Cow::Owned(n.to_string())),
            _ => None,
        })
    }

    pub fn transaction_id(&self) -> Option<&'a str> {
        self.first_str(&["idTransaksi", "id_transaksi"])
    }

    /// Recap-custom id; `idRekap` is an older local spelling
    pub fn recap_custom_id(&self) -> Option<&'a str> {
        self.first_str(&["idRekapCustom", "idRekap", "id_rekap_custom"])
    }

    pub fn custom_id(&self) -> Option<&'a str> {
        self.first_str(&["idCustom", "id_custom"])
    }

    pub fn design_name(&self) -> Option<&'a str> {
        self.first_str(&["namaDesain", "nama_desain"])
    }

    /// Recap-production id embedded on the record itself, if any
    pub fn embedded_recap_id(&self) -> Option<&'a str> {
        self.first_str(&["idRekapProduksi", "id_rekap_produksi"])
    }

    /// SPK issuance date carried on the record itself, if any
    pub fn issued_date(&self) -> Option<&'a str> {
        self.first_str(&["tglSpkTerbit", "tgl_spk_terbit"])
    }

    /// Content note carried on the record itself, if any
    pub fn content_note(&self) -> Option<&'a str> {
        self.first_str(&["content", "konten"])
    }

    /// Input date carried on the record itself (lowest-priority source)
    pub fn own_input_date(&self) -> Option<&'a str> {
        self.first_str(&["tglInputPesanan", "tanggalInput", "tanggal_input"])
    }

    /// Input date on an intake entry, across the historical key spellings
    pub fn intake_input_date(&self) -> Option<&'a str> {
        self.first_str(&["tanggalInput", "input_date", "inputDate", "createdAt"])
    }

    /// Quantity as recorded on the record, only when it is a strictly
    /// positive JSON number (legacy string quantities go through
    /// [`normalize_quantity`] instead)
    pub fn quantity_number(&self) -> Option<i64> {
        let n = self.0.get("kuantity")?;
        let v = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
        (v > 0).then_some(v)
    }

    /// Free-form quantity field on an intake entry (string or number)
    pub fn intake_quantity_raw(&self) -> Option<&'a Value> {
        self.0.get("quantity").or_else(|| self.0.get("spk_quantity"))
    }

    /// Length of an intake entry's nested item list, if present
    pub fn items_len(&self) -> Option<usize> {
        self.0.get("items").and_then(Value::as_array).map(Vec::len)
    }

    /// Completion timestamp for one stage
    pub fn stage_timestamp(&self, stage: Stage) -> Option<&'a str> {
        self.first_str(&[stage.local_key(), stage.remote_key()])
    }

    /// Batch creation timestamp (bordir-recap log entries)
    pub fn created_at(&self) -> Option<&'a str> {
        self.first_str(&["createdAt", "created_at"])
    }

    /// Item list of a bordir-recap batch
    pub fn items(&self) -> &'a [Value] {
        self.0
            .get("items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Defensive quantity coercion.
///
/// Strips everything except ASCII digits and `-`, parses, and keeps only a
/// successful, strictly positive result. `"12 pcs"` → 12, `"-5"` → 0,
/// `""` → 0. Accepts numbers and strings alike since the historical data
/// has both.
pub fn normalize_quantity(raw: &Value) -> i64 {
    let s = match raw {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return 0,
    };
    normalize_quantity_str(&s)
}

/// String form of [`normalize_quantity`]
pub fn normalize_quantity_str(raw: &str) -> i64 {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    digits.parse::<i64>().ok().filter(|n| *n > 0).unwrap_or(0)
}

/// Resolve the input date for a record.
///
/// Priority: the intake entry's date fields (across all historical
/// spellings), then the record's own fields, then the `"-"` placeholder.
/// The winning value is carried raw; parsing only happens for deadline
/// computation.
pub fn resolve_input_date(record: Record<'_>, intake: Option<Record<'_>>) -> String {
    intake
        .and_then(|i| i.intake_input_date())
        .or_else(|| record.own_input_date())
        .unwrap_or(PLACEHOLDER)
        .to_string()
}

/// Consumer deadline: input date + 30 days of milliseconds.
///
/// Returns `None` when the input date does not parse.
pub fn compute_deadline(input_date: &str) -> Option<String> {
    let dt = time::parse_flexible(input_date)?;
    Some(time::to_iso(dt + chrono::Duration::milliseconds(DEADLINE_OFFSET_MS)))
}
