// src/models/riwayat.rs
use crate::utils;
use serde::Deserialize;

pub const ALLOWED_STATUS_GIZI: [&str; 3] = ["normal", "stunting", "gizi buruk"];

#[derive(Debug, Deserialize)]
pub struct RiwayatRequest {
    #[serde(default)]
    pub id: String,
    pub id_balita: String,
    pub id_intervensi: String,
    pub id_laporan_masyarakat: String,
    /// YYYY-MM-DD
    pub tanggal: String,
    /// kg
    pub berat_badan: f64,
    /// cm
    pub tinggi_badan: f64,
    pub status_gizi: String,
    #[serde(default)]
    pub keterangan: String,
}

impl RiwayatRequest {
    pub fn validate(&self, require_id: bool) -> Result<(), String> {
        if require_id && self.id.trim().is_empty() {
            return Err("Riwayat pemeriksaan ID is required".to_string());
        }
        if self.id_balita.trim().is_empty() {
            return Err("ID balita is required".to_string());
        }
        if self.id_intervensi.trim().is_empty() {
            return Err("ID intervensi is required".to_string());
        }
        if self.id_laporan_masyarakat.trim().is_empty() {
            return Err("ID laporan masyarakat is required".to_string());
        }
        let tanggal = utils::parse_date(&self.tanggal)
            .ok_or_else(|| "Invalid date format. Use YYYY-MM-DD".to_string())?;
        if tanggal > chrono::Local::now().date_naive() {
            return Err("tanggal pemeriksaan cannot be in the future".to_string());
        }
        if !(1.0..=50.0).contains(&self.berat_badan) {
            return Err("berat badan must be between 1.0-50.0 kg".to_string());
        }
        if !(30.0..=150.0).contains(&self.tinggi_badan) {
            return Err("tinggi badan must be between 30.0-150.0 cm".to_string());
        }
        if !ALLOWED_STATUS_GIZI.contains(&self.status_gizi.as_str()) {
            return Err(format!(
                "status gizi must be one of: {}",
                ALLOWED_STATUS_GIZI.join(", ")
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn base() -> RiwayatRequest {
        RiwayatRequest {
            id: String::new(),
            id_balita: "7".to_string(),
            id_intervensi: "2".to_string(),
            id_laporan_masyarakat: "5".to_string(),
            tanggal: Local::now().date_naive().format("%Y-%m-%d").to_string(),
            berat_badan: 9.4,
            tinggi_badan: 74.0,
            status_gizi: "stunting".to_string(),
            keterangan: "Berat di bawah kurva".to_string(),
        }
    }

    #[test]
    fn accepts_valid_request() {
        assert!(base().validate(false).is_ok());
    }

    #[test]
    fn rejects_weight_out_of_range() {
        let mut req = base();
        req.berat_badan = 0.4;
        assert!(req.validate(false).is_err());
        req.berat_badan = 60.0;
        assert!(req.validate(false).is_err());
    }

    #[test]
    fn rejects_unknown_status_gizi() {
        let mut req = base();
        req.status_gizi = "obesitas".to_string();
        assert!(req.validate(false).is_err());
    }
}
