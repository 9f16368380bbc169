// src/models/laporan.rs
use crate::utils;
use serde::Deserialize;

/// Kosakata status laporan. Bukan graf transisi ketat, admin bebas
/// memindahkan status lewat update.
pub const STATUS_BELUM_DIPROSES: &str = "Belum diproses";
pub const STATUS_DATA_SESUAI: &str = "Diproses dan data sesuai";
pub const STATUS_DATA_TIDAK_SESUAI: &str = "Diproses dan data tidak sesuai";
pub const STATUS_BELUM_DITINDAKLANJUTI: &str = "Belum ditindaklanjuti";
pub const STATUS_SUDAH_DITINDAKLANJUTI: &str = "Sudah ditindaklanjuti";
pub const STATUS_SUDAH_PERBAIKAN_GIZI: &str = "Sudah perbaikan gizi";

/// Status yang mengizinkan pemeriksaan dicatat terhadap laporan.
pub const EXAMINABLE_STATUSES: [&str; 3] = [
    STATUS_DATA_SESUAI,
    STATUS_BELUM_DITINDAKLANJUTI,
    STATUS_SUDAH_DITINDAKLANJUTI,
];

/// Status yang dianggap masih "berjalan" dan mengunci data keluarga.
pub const ACTIVE_STATUSES: [&str; 3] = [
    STATUS_BELUM_DIPROSES,
    STATUS_DATA_SESUAI,
    STATUS_BELUM_DITINDAKLANJUTI,
];

/// Daftar status aktif sebagai isi klausa `IN (...)` di SQL.
pub fn active_statuses_sql() -> String {
    ACTIVE_STATUSES
        .iter()
        .map(|s| format!("'{}'", s))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Penjelasan status untuk pelapor.
pub fn status_keterangan(status: &str) -> &'static str {
    match status {
        STATUS_BELUM_DIPROSES => {
            "Laporan Anda sedang menunggu untuk diproses oleh petugas kesehatan"
        }
        STATUS_DATA_TIDAK_SESUAI => {
            "Laporan telah diproses, namun data yang dilaporkan tidak sesuai dengan kondisi aktual"
        }
        STATUS_DATA_SESUAI => {
            "Laporan telah diproses dan data yang dilaporkan sesuai dengan kondisi aktual"
        }
        STATUS_BELUM_DITINDAKLANJUTI => {
            "Laporan telah diverifikasi dan menunggu tindak lanjut dari petugas kesehatan"
        }
        STATUS_SUDAH_DITINDAKLANJUTI => {
            "Laporan telah ditindaklanjuti dengan pemeriksaan dan intervensi yang diperlukan"
        }
        STATUS_SUDAH_PERBAIKAN_GIZI => {
            "Balita telah menunjukkan perbaikan status gizi setelah intervensi yang diberikan"
        }
        _ => "Status laporan tidak dikenali",
    }
}

#[derive(Debug, Deserialize)]
pub struct LaporanRequest {
    #[serde(default)]
    pub id: String,
    /// NULL berarti laporan dibuat admin
    #[serde(default)]
    pub id_masyarakat: Option<String>,
    pub id_balita: String,
    #[serde(default)]
    pub id_status_laporan: String,
    pub tanggal_laporan: String,
    pub hubungan_dengan_balita: String,
    pub nomor_hp_pelapor: String,
    pub nomor_hp_keluarga_balita: String,
}

impl LaporanRequest {
    pub fn validate(&self, require_id: bool, require_status: bool) -> Result<(), String> {
        if require_id && self.id.trim().is_empty() {
            return Err("Laporan ID is required".to_string());
        }
        if self.id_balita.trim().is_empty() {
            return Err("ID balita is required".to_string());
        }
        if require_status && self.id_status_laporan.trim().is_empty() {
            return Err("ID status laporan is required".to_string());
        }
        utils::validate_report_date(&self.tanggal_laporan)?;
        if self.hubungan_dengan_balita.trim().chars().count() < 3 {
            return Err("hubungan dengan balita must be at least 3 characters".to_string());
        }
        if !utils::is_valid_phone(&self.nomor_hp_pelapor) {
            return Err("nomor HP pelapor is not a valid Indonesian phone number".to_string());
        }
        if !utils::is_valid_phone(&self.nomor_hp_keluarga_balita) {
            return Err(
                "nomor HP keluarga balita is not a valid Indonesian phone number".to_string(),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn base() -> LaporanRequest {
        LaporanRequest {
            id: String::new(),
            id_masyarakat: None,
            id_balita: "9".to_string(),
            id_status_laporan: "1".to_string(),
            tanggal_laporan: Local::now().date_naive().format("%Y-%m-%d").to_string(),
            hubungan_dengan_balita: "Tetangga".to_string(),
            nomor_hp_pelapor: "081234567890".to_string(),
            nomor_hp_keluarga_balita: "+6281298765432".to_string(),
        }
    }

    #[test]
    fn active_statuses_render_as_sql_list() {
        assert_eq!(
            active_statuses_sql(),
            "'Belum diproses', 'Diproses dan data sesuai', 'Belum ditindaklanjuti'"
        );
    }

    #[test]
    fn accepts_valid_request() {
        assert!(base().validate(false, true).is_ok());
    }

    #[test]
    fn rejects_foreign_phone() {
        let mut req = base();
        req.nomor_hp_pelapor = "+14155550100".to_string();
        assert!(req.validate(false, true).is_err());
    }

    #[test]
    fn status_optional_for_community_inserts() {
        let mut req = base();
        req.id_status_laporan = String::new();
        assert!(req.validate(false, false).is_ok());
        assert!(req.validate(false, true).is_err());
    }
}
