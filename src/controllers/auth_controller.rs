//auth_controller.rs
use crate::auth::{self, JwtConfig};
use crate::models::pengguna::{LoginRequest, RegisterAdminRequest, RegisterRequest};
use crate::models::response as resp;

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde_json::json;
use sqlx::MySqlPool;
use sqlx::Row;

#[post("/api/auth/login")]
pub async fn login(
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<LoginRequest>,
) -> HttpResponse {
    if let Err(e) = data.validate() {
        return resp::bad_request(e);
    }

    let row = sqlx::query(
        "SELECT CAST(id AS CHAR) AS id, email, password_hash, role FROM pengguna WHERE email = ?",
    )
    .bind(&data.email)
    .fetch_optional(pool.get_ref())
    .await;

    let row = match row {
        Ok(Some(row)) => row,
        Ok(None) => return resp::unauthorized("Invalid email or password"),
        Err(e) => {
            log::error!("Query login gagal: {:?}", e);
            return resp::internal("Database query error");
        }
    };

    let user_id: String = row.get("id");
    let password_hash: String = row.get("password_hash");
    let role: String = row.get("role");

    match bcrypt::verify(&data.password, &password_hash) {
        Ok(true) => {}
        Ok(false) => return resp::unauthorized("Invalid email or password"),
        Err(e) => {
            log::error!("Verifikasi bcrypt gagal: {:?}", e);
            return resp::internal("Failed to verify password");
        }
    }

    match auth::generate_jwt(&jwt, &user_id, &role) {
        Ok(token) => resp::ok("Login successful", Some(json!({ "token": token }))),
        Err(e) => {
            log::error!("Pembuatan token gagal: {:?}", e);
            resp::internal("Failed to generate token")
        }
    }
}

#[post("/api/auth/register")]
pub async fn register(
    pool: web::Data<MySqlPool>,
    data: web::Json<RegisterRequest>,
) -> HttpResponse {
    if let Err(e) = data.validate() {
        return resp::bad_request(e);
    }

    let exists = crate::db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM pengguna WHERE email = ?",
        &[&data.email],
    )
    .await;
    match exists {
        Ok(0) => {}
        Ok(_) => return resp::bad_request("Email sudah terdaftar"),
        Err(e) => {
            log::error!("Cek email gagal: {:?}", e);
            return resp::internal("Failed to check email");
        }
    }

    let hashed = match bcrypt::hash(&data.password, bcrypt::DEFAULT_COST) {
        Ok(h) => h,
        Err(e) => {
            log::error!("Hash password gagal: {:?}", e);
            return resp::internal("Failed to hash password");
        }
    };

    // Pengguna dan profil masyarakat dibuat dalam satu transaksi
    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            log::error!("Mulai transaksi gagal: {:?}", e);
            return resp::internal("Failed to register user");
        }
    };

    let result = sqlx::query("INSERT INTO pengguna (email, password_hash, role) VALUES (?, ?, ?)")
        .bind(&data.email)
        .bind(&hashed)
        .bind(auth::ROLE_MASYARAKAT)
        .execute(&mut *tx)
        .await;

    let pengguna_id = match result {
        Ok(res) => res.last_insert_id().to_string(),
        Err(e) => {
            log::error!("Insert pengguna gagal: {:?}", e);
            return resp::internal("Failed to register user");
        }
    };

    let result = sqlx::query("INSERT INTO masyarakat (id_pengguna, nama, alamat) VALUES (?, ?, ?)")
        .bind(&pengguna_id)
        .bind(data.nama.trim())
        .bind(data.alamat.trim())
        .execute(&mut *tx)
        .await;

    if let Err(e) = result {
        log::error!("Insert masyarakat gagal: {:?}", e);
        return resp::internal("Failed to register masyarakat");
    }

    if let Err(e) = tx.commit().await {
        log::error!("Commit registrasi gagal: {:?}", e);
        return resp::internal("Failed to register user");
    }

    resp::ok("User registered successfully", None)
}

#[post("/api/auth/register_admin")]
pub async fn register_admin(
    pool: web::Data<MySqlPool>,
    data: web::Json<RegisterAdminRequest>,
) -> HttpResponse {
    if let Err(e) = data.validate() {
        return resp::bad_request(e);
    }

    let exists = crate::db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM pengguna WHERE email = ?",
        &[&data.email],
    )
    .await;
    match exists {
        Ok(0) => {}
        Ok(_) => return resp::bad_request("Email already registered"),
        Err(e) => {
            log::error!("Cek email gagal: {:?}", e);
            return resp::internal("Failed to check email");
        }
    }

    let hashed = match bcrypt::hash(&data.password, bcrypt::DEFAULT_COST) {
        Ok(h) => h,
        Err(e) => {
            log::error!("Hash password gagal: {:?}", e);
            return resp::internal("Failed to hash password");
        }
    };

    let result = sqlx::query("INSERT INTO pengguna (email, password_hash, role) VALUES (?, ?, ?)")
        .bind(&data.email)
        .bind(&hashed)
        .bind(auth::ROLE_ADMIN)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) => resp::ok(
            "Admin registered successfully",
            Some(json!({ "admin_id": res.last_insert_id().to_string() })),
        ),
        Err(e) => {
            log::error!("Insert admin gagal: {:?}", e);
            resp::internal("Failed to register admin")
        }
    }
}

/// Isi `data` bergantung role: masyarakat dan petugas kesehatan punya
/// baris profil sendiri, admin hanya label statis.
#[get("/api/auth/profile")]
pub async fn profile(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
) -> HttpResponse {
    let claims = match auth::verify_jwt(&req, &jwt) {
        Ok(claims) => claims,
        Err(e) => return resp::unauthorized(e),
    };

    let row = sqlx::query("SELECT CAST(id AS CHAR) AS id, email, role FROM pengguna WHERE id = ?")
        .bind(&claims.user_id)
        .fetch_optional(pool.get_ref())
        .await;

    let row = match row {
        Ok(Some(row)) => row,
        Ok(None) => return resp::unauthorized("User not found"),
        Err(e) => {
            log::error!("Query profil gagal: {:?}", e);
            return resp::internal("Database query error");
        }
    };

    let mut profile = json!({
        "id": row.get::<String, _>("id"),
        "email": row.get::<String, _>("email"),
        "role": row.get::<String, _>("role"),
    });

    match claims.role.as_str() {
        auth::ROLE_MASYARAKAT => {
            let detail = sqlx::query(
                "SELECT CAST(id AS CHAR) AS id, nama, alamat FROM masyarakat WHERE id_pengguna = ?",
            )
            .bind(&claims.user_id)
            .fetch_optional(pool.get_ref())
            .await;

            match detail {
                Ok(Some(row)) => {
                    profile["data"] = json!({
                        "id": row.get::<String, _>("id"),
                        "nama": row.get::<String, _>("nama"),
                        "alamat": row.get::<String, _>("alamat"),
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    log::error!("Query masyarakat gagal: {:?}", e);
                    return resp::internal("Failed to get masyarakat data");
                }
            }
        }
        auth::ROLE_PETUGAS => {
            let detail = sqlx::query(
                "SELECT CAST(id AS CHAR) AS id, CAST(id_skpd AS CHAR) AS id_skpd, nama, \
                 DATE_FORMAT(created_date, '%Y-%m-%d %H:%i:%s') AS created_date \
                 FROM petugas_kesehatan WHERE id_pengguna = ?",
            )
            .bind(&claims.user_id)
            .fetch_optional(pool.get_ref())
            .await;

            match detail {
                Ok(Some(row)) => {
                    profile["data"] = json!({
                        "id": row.get::<String, _>("id"),
                        "id_skpd": row.get::<String, _>("id_skpd"),
                        "nama": row.get::<String, _>("nama"),
                        "created_date": row.get::<Option<String>, _>("created_date"),
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    log::error!("Query petugas gagal: {:?}", e);
                    return resp::internal("Failed to get petugas kesehatan data");
                }
            }
        }
        auth::ROLE_ADMIN => {
            profile["data"] = json!({ "nama": "Administrator" });
        }
        _ => return resp::forbidden("Invalid user role"),
    }

    resp::ok("User profile retrieved successfully", Some(profile))
}
