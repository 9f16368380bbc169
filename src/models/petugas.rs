// src/models/petugas.rs
use crate::utils;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PetugasRequest {
    #[serde(default)]
    pub id: String,
    pub id_skpd: String,
    pub nama: String,
    pub email: String,
    /// Wajib saat insert, opsional saat update (di-hash ulang jika diisi)
    #[serde(default)]
    pub password: Option<String>,
}

impl PetugasRequest {
    pub fn validate(&self, require_id: bool, require_password: bool) -> Result<(), String> {
        if require_id && self.id.trim().is_empty() {
            return Err("Petugas ID is required".to_string());
        }
        if self.id_skpd.trim().is_empty() {
            return Err("ID SKPD is required".to_string());
        }
        if !utils::is_valid_name(&self.nama, 2, 100) {
            return Err("nama petugas must be 2-100 letters and spaces".to_string());
        }
        if !utils::is_valid_email(&self.email) {
            return Err("invalid email format".to_string());
        }
        match &self.password {
            Some(password) => {
                if password.len() < 8 {
                    return Err("password must be at least 8 characters".to_string());
                }
                let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
                let has_number = password.chars().any(|c| c.is_ascii_digit());
                if !has_letter || !has_number {
                    return Err(
                        "password must contain at least one letter and one number".to_string()
                    );
                }
            }
            None if require_password => {
                return Err("password is required".to_string());
            }
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PetugasRequest {
        PetugasRequest {
            id: String::new(),
            id_skpd: "2".to_string(),
            nama: "Dewi Lestari".to_string(),
            email: "dewi@puskesmas.go.id".to_string(),
            password: Some("sehat1234".to_string()),
        }
    }

    #[test]
    fn insert_requires_password() {
        let mut req = base();
        req.password = None;
        assert!(req.validate(false, true).is_err());
        assert!(req.validate(false, false).is_ok());
    }

    #[test]
    fn accepts_valid_insert() {
        assert!(base().validate(false, true).is_ok());
    }

    #[test]
    fn rejects_numeric_name() {
        let mut req = base();
        req.nama = "Petugas 01".to_string();
        assert!(req.validate(false, true).is_err());
    }
}
