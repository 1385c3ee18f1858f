//! Production stage definitions and order-status derivation
//!
//! An SPK moves through thirteen fixed stages. Each stage owns one
//! completion timestamp on the pipeline record, written exactly once by the
//! corresponding division and never cleared. The derived order status is the
//! display label of the latest completed stage; upstream writers are trusted
//! to stamp stages in order.

use serde::{Deserialize, Serialize};

use crate::models::StatusRow;

/// Production stages in pipeline order (first to last)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PlottingBordir,
    DesainProduksi,
    CuttingPola,
    StockBordir,
    Bordir,
    Setting,
    StockJahit,
    Jahit,
    Finishing,
    FotoProduk,
    StockNt,
    Pelunasan,
    Pengiriman,
}

/// All stages in pipeline order
pub const ALL_STAGES: [Stage; 13] = [
    Stage::PlottingBordir,
    Stage::DesainProduksi,
    Stage::CuttingPola,
    Stage::StockBordir,
    Stage::Bordir,
    Stage::Setting,
    Stage::StockJahit,
    Stage::Jahit,
    Stage::Finishing,
    Stage::FotoProduk,
    Stage::StockNt,
    Stage::Pelunasan,
    Stage::Pengiriman,
];

impl Stage {
    /// Display label used in derived status strings ("Selesai <label>")
    pub fn label(&self) -> &'static str {
        match self {
            Stage::PlottingBordir => "Plotting Bordir",
            Stage::DesainProduksi => "Desain Produksi",
            Stage::CuttingPola => "Cutting Pola",
            Stage::StockBordir => "Stock Bordir",
            Stage::Bordir => "Bordir",
            Stage::Setting => "Setting",
            Stage::StockJahit => "Stock Jahit",
            Stage::Jahit => "Jahit",
            Stage::Finishing => "Finishing",
            Stage::FotoProduk => "Foto Produk",
            Stage::StockNt => "Stock NT",
            Stage::Pelunasan => "Pelunasan",
            Stage::Pengiriman => "Pengiriman",
        }
    }

    /// Field name on legacy local records (camelCase shape)
    pub fn local_key(&self) -> &'static str {
        match self {
            Stage::PlottingBordir => "selesaiPlottingBordir",
            Stage::DesainProduksi => "selesaiDesainProduksi",
            Stage::CuttingPola => "selesaiCuttingPola",
            Stage::StockBordir => "selesaiStockBordir",
            Stage::Bordir => "selesaiBordir",
            Stage::Setting => "selesaiSetting",
            Stage::StockJahit => "selesaiStockJahit",
            Stage::Jahit => "selesaiJahit",
            Stage::Finishing => "selesaiFinishing",
            Stage::FotoProduk => "selesaiFotoProduk",
            Stage::StockNt => "selesaiStockNt",
            Stage::Pelunasan => "selesaiPelunasan",
            Stage::Pengiriman => "selesaiPengiriman",
        }
    }

    /// Field name on backend records (snake_case shape)
    pub fn remote_key(&self) -> &'static str {
        match self {
            Stage::PlottingBordir => "selesai_plotting_bordir",
            Stage::DesainProduksi => "selesai_desain_produksi",
            Stage::CuttingPola => "selesai_cutting_pola",
            Stage::StockBordir => "selesai_stock_bordir",
            Stage::Bordir => "selesai_bordir",
            Stage::Setting => "selesai_setting",
            Stage::StockJahit => "selesai_stock_jahit",
            Stage::Jahit => "selesai_jahit",
            Stage::Finishing => "selesai_finishing",
            Stage::FotoProduk => "selesai_foto_produk",
            Stage::StockNt => "selesai_stock_no_transaksi",
            Stage::Pelunasan => "selesai_pelunasan",
            Stage::Pengiriman => "selesai_pengiriman",
        }
    }

    /// Parse a stage from its snake_case API path segment
    pub fn from_path(s: &str) -> Option<Stage> {
        match s {
            "plotting_bordir" => Some(Stage::PlottingBordir),
            "desain_produksi" => Some(Stage::DesainProduksi),
            "cutting_pola" => Some(Stage::CuttingPola),
            "stock_bordir" => Some(Stage::StockBordir),
            "bordir" => Some(Stage::Bordir),
            "setting" => Some(Stage::Setting),
            "stock_jahit" => Some(Stage::StockJahit),
            "jahit" => Some(Stage::Jahit),
            "finishing" => Some(Stage::Finishing),
            "foto_produk" => Some(Stage::FotoProduk),
            "stock_nt" => Some(Stage::StockNt),
            "pelunasan" => Some(Stage::Pelunasan),
            "pengiriman" => Some(Stage::Pengiriman),
            _ => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Label for an order with no completed stage
pub const STATUS_IN_PROGRESS: &str = "Proses";

/// Derive the display status for a merged row.
///
/// Scans stage timestamps from the last stage backwards; the first populated
/// field wins. An order with no stamps at all is still "Proses".
pub fn derive_status(row: &StatusRow) -> String {
    for stage in ALL_STAGES.iter().rev() {
        if let Some(ts) = row.stage_timestamp(*stage) {
            if !ts.is_empty() {
                return format!("Selesai {}", stage.label());
            }
        }
    }
    STATUS_IN_PROGRESS.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_stamps_is_proses() {
        let row = StatusRow::default();
        assert_eq!(derive_status(&row), "Proses");
    }

    #[test]
    fn test_latest_stamp_wins() {
        let mut row = StatusRow::default();
        row.selesai_plotting_bordir = Some("2024-01-01T00:00:00.000Z".into());
        assert_eq!(derive_status(&row), "Selesai Plotting Bordir");

        row.selesai_cutting_pola = Some("2024-01-03T00:00:00.000Z".into());
        assert_eq!(derive_status(&row), "Selesai Cutting Pola");

        row.selesai_pengiriman = Some("2024-02-01T00:00:00.000Z".into());
        assert_eq!(derive_status(&row), "Selesai Pengiriman");
    }

    #[test]
    fn test_gap_in_stamps_still_reports_latest() {
        // Earlier stages unset: derivation only looks for the last populated
        // field, matching the trust assumption on upstream writers.
        let mut row = StatusRow::default();
        row.selesai_jahit = Some("2024-01-10T00:00:00.000Z".into());
        assert_eq!(derive_status(&row), "Selesai Jahit");
    }

    #[test]
    fn test_empty_string_stamp_ignored() {
        let mut row = StatusRow::default();
        row.selesai_pengiriman = Some(String::new());
        row.selesai_bordir = Some("2024-01-05T00:00:00.000Z".into());
        assert_eq!(derive_status(&row), "Selesai Bordir");
    }

    #[test]
    fn test_stage_from_path_round_trip() {
        for stage in ALL_STAGES {
            let path = stage.remote_key().trim_start_matches("selesai_");
            // Stock NT uses a shortened path segment
            let path = if stage == Stage::StockNt { "stock_nt" } else { path };
            assert_eq!(Stage::from_path(path), Some(stage));
        }
        assert_eq!(Stage::from_path("bogus"), None);
    }
}
