//! Merged status row: the output shape of one reconciliation pass
//!
//! Built fresh on every pass and never persisted; field names follow the
//! backend snake_case convention since this is the shape handed to the
//! display/export layer.

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// Placeholder used wherever the legacy data has no value
pub const PLACEHOLDER: &str = "-";

/// One SPK in the merged progress view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusRow {
    /// Recap-production id, 7-digit zero-padded (empty when unknown)
    pub id_rekap_produksi: String,
    pub id_transaksi: String,
    /// Number of sibling SPKs sharing this row's transaction id
    pub jumlah_spk: i64,
    pub id_spk: String,
    pub id_rekap_custom: String,
    pub id_custom: String,
    pub nama_desain: String,
    pub kuantity: i64,
    /// Currently a constant placeholder; carried for display parity
    pub status_desain: String,
    /// Content note from the intake entry
    pub status_konten: String,
    /// Raw input-date string as recorded at intake time ("-" when unknown)
    pub tgl_input_pesanan: String,
    /// Input date + 30 days, RFC 3339 ("-" when the input date is unparseable)
    pub deadline_konsumen: String,
    pub tgl_spk_terbit: String,
    pub selesai_plotting_bordir: Option<String>,
    pub selesai_desain_produksi: Option<String>,
    pub selesai_cutting_pola: Option<String>,
    pub selesai_stock_bordir: Option<String>,
    pub selesai_bordir: Option<String>,
    pub selesai_setting: Option<String>,
    pub selesai_stock_jahit: Option<String>,
    pub selesai_jahit: Option<String>,
    pub selesai_finishing: Option<String>,
    pub selesai_foto_produk: Option<String>,
    pub selesai_stock_nt: Option<String>,
    pub selesai_pelunasan: Option<String>,
    pub selesai_pengiriman: Option<String>,
}

impl StatusRow {
    /// Completion timestamp for one stage, if recorded
    pub fn stage_timestamp(&self, stage: Stage) -> Option<&str> {
        let field = match stage {
            Stage::PlottingBordir => &self.selesai_plotting_bordir,
            Stage::DesainProduksi => &self.selesai_desain_produksi,
            Stage::CuttingPola => &self.selesai_cutting_pola,
            Stage::StockBordir => &self.selesai_stock_bordir,
            Stage::Bordir => &self.selesai_bordir,
            Stage::Setting => &self.selesai_setting,
            Stage::StockJahit => &self.selesai_stock_jahit,
            Stage::Jahit => &self.selesai_jahit,
            Stage::Finishing => &self.selesai_finishing,
            Stage::FotoProduk => &self.selesai_foto_produk,
            Stage::StockNt => &self.selesai_stock_nt,
            Stage::Pelunasan => &self.selesai_pelunasan,
            Stage::Pengiriman => &self.selesai_pengiriman,
        };
        field.as_deref()
    }

    /// Set the completion timestamp for one stage
    pub fn set_stage_timestamp(&mut self, stage: Stage, ts: Option<String>) {
        let field = match stage {
            Stage::PlottingBordir => &mut self.selesai_plotting_bordir,
            Stage::DesainProduksi => &mut self.selesai_desain_produksi,
            Stage::CuttingPola => &mut self.selesai_cutting_pola,
            Stage::StockBordir => &mut self.selesai_stock_bordir,
            Stage::Bordir => &mut self.selesai_bordir,
            Stage::Setting => &mut self.selesai_setting,
            Stage::StockJahit => &mut self.selesai_stock_jahit,
            Stage::Jahit => &mut self.selesai_jahit,
            Stage::Finishing => &mut self.selesai_finishing,
            Stage::FotoProduk => &mut self.selesai_foto_produk,
            Stage::StockNt => &mut self.selesai_stock_nt,
            Stage::Pelunasan => &mut self.selesai_pelunasan,
            Stage::Pengiriman => &mut self.selesai_pengiriman,
        };
        *field = ts;
    }
}
