// src/models/skpd.rs
use serde::Deserialize;

pub const ALLOWED_JENIS: [&str; 3] = ["puskesmas", "kelurahan", "dinas"];

#[derive(Debug, Deserialize)]
pub struct SkpdRequest {
    #[serde(default)]
    pub id: String,
    pub skpd: String,
    pub jenis: String,
}

impl SkpdRequest {
    pub fn validate(&self, require_id: bool) -> Result<(), String> {
        if require_id && self.id.trim().is_empty() {
            return Err("SKPD ID is required".to_string());
        }
        if self.skpd.trim().is_empty() {
            return Err("nama SKPD is required".to_string());
        }
        let len = self.skpd.chars().count();
        if !(2..=100).contains(&len) {
            return Err("nama SKPD must be between 2-100 characters".to_string());
        }
        // Huruf, angka, spasi, dan tanda baca umum
        let valid = self.skpd.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '-' | ',' | '(' | ')' | '/')
        });
        if !valid {
            return Err("nama SKPD contains invalid characters".to_string());
        }
        if self.jenis.is_empty() {
            return Err("jenis SKPD is required".to_string());
        }
        if !ALLOWED_JENIS.contains(&self.jenis.as_str()) {
            return Err(format!(
                "jenis SKPD must be one of: {}",
                ALLOWED_JENIS.join(", ")
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> SkpdRequest {
        SkpdRequest {
            id: String::new(),
            skpd: "Puskesmas Cibadak".to_string(),
            jenis: "puskesmas".to_string(),
        }
    }

    #[test]
    fn accepts_valid_insert() {
        assert!(base().validate(false).is_ok());
    }

    #[test]
    fn update_requires_id() {
        assert!(base().validate(true).is_err());
    }

    #[test]
    fn rejects_unknown_jenis() {
        let mut req = base();
        req.jenis = "rumah sakit".to_string();
        assert!(req.validate(false).is_err());
    }

    #[test]
    fn rejects_invalid_characters() {
        let mut req = base();
        req.skpd = "Puskesmas <script>".to_string();
        assert!(req.validate(false).is_err());
    }
}
