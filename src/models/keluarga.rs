// src/models/keluarga.rs
use crate::utils;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct KeluargaRequest {
    #[serde(default)]
    pub id: String,
    pub nomor_kk: String,
    pub nama_ayah: String,
    pub nama_ibu: String,
    pub nik_ayah: String,
    pub nik_ibu: String,
    pub alamat: String,
    pub rt: String,
    pub rw: String,
    pub id_kelurahan: String,
    /// [longitude, latitude]
    pub koordinat: [f64; 2],
}

impl KeluargaRequest {
    pub fn validate(&self, require_id: bool) -> Result<(), String> {
        if require_id && self.id.trim().is_empty() {
            return Err("Keluarga ID is required".to_string());
        }
        if !utils::is_digits(&self.nomor_kk, 16, 16) {
            return Err("nomor KK must be exactly 16 digits".to_string());
        }
        if !utils::is_valid_name(&self.nama_ayah, 2, 100) {
            return Err("nama ayah must be 2-100 letters and spaces".to_string());
        }
        if !utils::is_valid_name(&self.nama_ibu, 2, 100) {
            return Err("nama ibu must be 2-100 letters and spaces".to_string());
        }
        if !utils::is_digits(&self.nik_ayah, 16, 16) {
            return Err("NIK ayah must be exactly 16 digits".to_string());
        }
        if !utils::is_digits(&self.nik_ibu, 16, 16) {
            return Err("NIK ibu must be exactly 16 digits".to_string());
        }
        if self.nik_ayah == self.nik_ibu {
            return Err("NIK ayah and NIK ibu cannot be the same".to_string());
        }
        if self.alamat.trim().chars().count() < 5 {
            return Err("alamat must be at least 5 characters".to_string());
        }
        if !utils::is_digits(&self.rt, 1, 3) {
            return Err("RT must be 1-3 digits".to_string());
        }
        if !utils::is_digits(&self.rw, 1, 3) {
            return Err("RW must be 1-3 digits".to_string());
        }
        if self.id_kelurahan.trim().is_empty() {
            return Err("ID kelurahan is required".to_string());
        }
        if self.koordinat[0] == 0.0 && self.koordinat[1] == 0.0 {
            return Err("koordinat must be a valid [longitude, latitude] pair and cannot be [0, 0]"
                .to_string());
        }
        if !(-180.0..=180.0).contains(&self.koordinat[0])
            || !(-90.0..=90.0).contains(&self.koordinat[1])
        {
            return Err("koordinat out of range".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> KeluargaRequest {
        KeluargaRequest {
            id: String::new(),
            nomor_kk: "3175091203880001".to_string(),
            nama_ayah: "Ahmad Subagja".to_string(),
            nama_ibu: "Siti Rahayu".to_string(),
            nik_ayah: "3175091203880002".to_string(),
            nik_ibu: "3175094006900003".to_string(),
            alamat: "Jl. Kenanga No. 12".to_string(),
            rt: "03".to_string(),
            rw: "07".to_string(),
            id_kelurahan: "4".to_string(),
            koordinat: [106.8456, -6.2088],
        }
    }

    #[test]
    fn accepts_valid_request() {
        assert!(base().validate(false).is_ok());
    }

    #[test]
    fn rejects_short_nomor_kk() {
        let mut req = base();
        req.nomor_kk = "12345".to_string();
        assert!(req.validate(false).is_err());
    }

    #[test]
    fn rejects_identical_niks() {
        let mut req = base();
        req.nik_ibu = req.nik_ayah.clone();
        assert!(req.validate(false).is_err());
    }

    #[test]
    fn rejects_zero_coordinates() {
        let mut req = base();
        req.koordinat = [0.0, 0.0];
        assert!(req.validate(false).is_err());
    }

    #[test]
    fn rejects_out_of_range_longitude() {
        let mut req = base();
        req.koordinat = [200.0, -6.2];
        assert!(req.validate(false).is_err());
    }
}
