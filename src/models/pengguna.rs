// src/models/pengguna.rs
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() {
            return Err("email is required".to_string());
        }
        if self.password.is_empty() {
            return Err("password is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub nama: String,
    pub password: String,
    pub alamat: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() {
            return Err("email is required".to_string());
        }
        if !crate::utils::is_valid_email(&self.email) {
            return Err("invalid email format".to_string());
        }
        if self.nama.trim().is_empty() {
            return Err("nama is required".to_string());
        }
        if !crate::utils::is_valid_name(&self.nama, 2, 100) {
            return Err(
                "nama must be at least 2 characters and contain only letters and spaces"
                    .to_string(),
            );
        }
        validate_password(&self.password)?;
        if self.alamat.trim().chars().count() < 5 {
            return Err("alamat must be at least 5 characters".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterAdminRequest {
    pub email: String,
    pub password: String,
}

impl RegisterAdminRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() {
            return Err("email is required".to_string());
        }
        if !crate::utils::is_valid_email(&self.email) {
            return Err("invalid email format".to_string());
        }
        validate_password(&self.password)
    }
}

/// Minimal 8 karakter, harus mengandung huruf dan angka.
fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("password is required".to_string());
    }
    if password.len() < 8 {
        return Err("password must be at least 8 characters".to_string());
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_number = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_number {
        return Err("password must contain at least one letter and one number".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_rejects_weak_password() {
        let req = RegisterRequest {
            email: "warga@example.com".to_string(),
            nama: "Budi Santoso".to_string(),
            password: "passwordonly".to_string(),
            alamat: "Jl. Melati No. 5".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn register_accepts_valid_request() {
        let req = RegisterRequest {
            email: "warga@example.com".to_string(),
            nama: "Budi Santoso".to_string(),
            password: "rahasia123".to_string(),
            alamat: "Jl. Melati No. 5".to_string(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn login_requires_both_fields() {
        let req = LoginRequest {
            email: "warga@example.com".to_string(),
            password: String::new(),
        };
        assert!(req.validate().is_err());
    }
}
