// src/models/balita.rs
use crate::utils;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct BalitaRequest {
    #[serde(default)]
    pub id: String,
    pub id_keluarga: String,
    pub nama: String,
    /// YYYY-MM-DD
    pub tanggal_lahir: String,
    /// "L" atau "P"
    pub jenis_kelamin: String,
    /// gram
    pub berat_lahir: f64,
    /// cm
    pub tinggi_lahir: f64,
}

impl BalitaRequest {
    pub fn validate(&self, require_id: bool) -> Result<(), String> {
        if require_id && self.id.trim().is_empty() {
            return Err("Balita ID is required".to_string());
        }
        if self.id_keluarga.trim().is_empty() {
            return Err("ID keluarga is required".to_string());
        }
        if !utils::is_valid_name(&self.nama, 2, 100) {
            return Err("nama balita must be 2-100 letters and spaces".to_string());
        }
        utils::validate_birth_date(&self.tanggal_lahir)?;
        if self.jenis_kelamin != "L" && self.jenis_kelamin != "P" {
            return Err("jenis kelamin must be 'L' or 'P'".to_string());
        }
        if !(500.0..=6000.0).contains(&self.berat_lahir) {
            return Err("berat lahir must be between 500-6000 grams".to_string());
        }
        if !(25.0..=65.0).contains(&self.tinggi_lahir) {
            return Err("tinggi lahir must be between 25-65 cm".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local};

    fn base() -> BalitaRequest {
        let birth = (Local::now().date_naive() - Duration::days(400))
            .format("%Y-%m-%d")
            .to_string();
        BalitaRequest {
            id: String::new(),
            id_keluarga: "3".to_string(),
            nama: "Putri Ayu".to_string(),
            tanggal_lahir: birth,
            jenis_kelamin: "P".to_string(),
            berat_lahir: 3100.0,
            tinggi_lahir: 49.0,
        }
    }

    #[test]
    fn accepts_valid_request() {
        assert!(base().validate(false).is_ok());
    }

    #[test]
    fn rejects_five_year_old() {
        let mut req = base();
        req.tanggal_lahir = (Local::now().date_naive() - Duration::days(5 * 366))
            .format("%Y-%m-%d")
            .to_string();
        assert!(req.validate(false).is_err());
    }

    #[test]
    fn rejects_bad_gender_code() {
        let mut req = base();
        req.jenis_kelamin = "X".to_string();
        assert!(req.validate(false).is_err());
    }

    #[test]
    fn rejects_out_of_range_weight() {
        let mut req = base();
        req.berat_lahir = 250.0;
        assert!(req.validate(false).is_err());
        req.berat_lahir = 7000.0;
        assert!(req.validate(false).is_err());
    }
}
