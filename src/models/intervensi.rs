// src/models/intervensi.rs
use crate::utils;
use serde::Deserialize;

pub const ALLOWED_JENIS: [&str; 3] = ["gizi", "kesehatan", "sosial"];

#[derive(Debug, Deserialize)]
pub struct IntervensiRequest {
    #[serde(default)]
    pub id: String,
    pub id_balita: String,
    pub jenis: String,
    /// YYYY-MM-DD
    pub tanggal: String,
    pub deskripsi: String,
    #[serde(default)]
    pub hasil: String,
}

impl IntervensiRequest {
    pub fn validate(&self, require_id: bool) -> Result<(), String> {
        if require_id && self.id.trim().is_empty() {
            return Err("Intervensi ID is required".to_string());
        }
        if self.id_balita.trim().is_empty() {
            return Err("ID balita is required".to_string());
        }
        if !ALLOWED_JENIS.contains(&self.jenis.as_str()) {
            return Err(format!(
                "jenis intervensi must be one of: {}",
                ALLOWED_JENIS.join(", ")
            ));
        }
        let tanggal = utils::parse_date(&self.tanggal)
            .ok_or_else(|| "Invalid date format. Use YYYY-MM-DD".to_string())?;
        if tanggal > chrono::Local::now().date_naive() {
            return Err("tanggal intervensi cannot be in the future".to_string());
        }
        if self.deskripsi.trim().chars().count() < 5 {
            return Err("deskripsi must be at least 5 characters".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignPetugasRequest {
    pub id_intervensi: String,
    pub id_petugas_kesehatan: String,
}

impl AssignPetugasRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.id_intervensi.trim().is_empty() {
            return Err("ID intervensi is required".to_string());
        }
        if self.id_petugas_kesehatan.trim().is_empty() {
            return Err("ID petugas kesehatan is required".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn base() -> IntervensiRequest {
        IntervensiRequest {
            id: String::new(),
            id_balita: "7".to_string(),
            jenis: "gizi".to_string(),
            tanggal: Local::now().date_naive().format("%Y-%m-%d").to_string(),
            deskripsi: "Pemberian makanan tambahan".to_string(),
            hasil: String::new(),
        }
    }

    #[test]
    fn accepts_valid_request() {
        assert!(base().validate(false).is_ok());
    }

    #[test]
    fn rejects_unknown_jenis() {
        let mut req = base();
        req.jenis = "edukasi".to_string();
        assert!(req.validate(false).is_err());
    }

    #[test]
    fn rejects_future_date() {
        let mut req = base();
        req.tanggal = (Local::now().date_naive() + chrono::Duration::days(3))
            .format("%Y-%m-%d")
            .to_string();
        assert!(req.validate(false).is_err());
    }
}
