//petugas_controller.rs
use crate::auth::{self, JwtConfig};
use crate::db;
use crate::models::petugas::PetugasRequest;
use crate::models::response as resp;
use crate::utils;

use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use serde_json::{json, Value};
use sqlx::MySqlPool;
use sqlx::Row;

use super::skpd_controller::{IdBody, IdQuery};

const SELECT_PETUGAS: &str = "SELECT CAST(pk.id AS CHAR) AS id, \
    CAST(pk.id_pengguna AS CHAR) AS id_pengguna, CAST(pk.id_skpd AS CHAR) AS id_skpd, \
    pk.nama, p.email, s.skpd, s.jenis, \
    DATE_FORMAT(pk.created_date, '%Y-%m-%d %H:%i:%s') AS created_date, \
    DATE_FORMAT(pk.updated_date, '%Y-%m-%d %H:%i:%s') AS updated_date \
    FROM petugas_kesehatan pk \
    JOIN pengguna p ON pk.id_pengguna = p.id \
    JOIN skpd s ON pk.id_skpd = s.id";

fn petugas_row_to_json(row: &sqlx::mysql::MySqlRow) -> Value {
    json!({
        "id": row.get::<String, _>("id"),
        "id_pengguna": row.get::<String, _>("id_pengguna"),
        "id_skpd": row.get::<String, _>("id_skpd"),
        "nama": row.get::<String, _>("nama"),
        "email": row.get::<String, _>("email"),
        "skpd": row.get::<String, _>("skpd"),
        "jenis_skpd": row.get::<String, _>("jenis"),
        "created_date": row.get::<Option<String>, _>("created_date"),
        "updated_date": row.get::<Option<String>, _>("updated_date"),
    })
}

#[get("/api/admin/petugas-kesehatan/get")]
pub async fn get_petugas(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<IdQuery>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }

    if let Some(id) = query.id.as_deref().filter(|s| !s.is_empty()) {
        let sql = format!("{SELECT_PETUGAS} WHERE pk.id = ? AND pk.deleted_date IS NULL");
        return match sqlx::query(&sql).bind(id).fetch_optional(pool.get_ref()).await {
            Ok(Some(row)) => resp::ok(
                "Petugas kesehatan retrieved successfully",
                Some(json!({ "data": petugas_row_to_json(&row) })),
            ),
            Ok(None) => resp::not_found("Petugas kesehatan not found"),
            Err(e) => {
                log::error!("Query petugas gagal: {:?}", e);
                resp::internal("Failed to get petugas kesehatan")
            }
        };
    }

    let sql = format!(
        "{SELECT_PETUGAS} WHERE pk.deleted_date IS NULL ORDER BY s.skpd ASC, pk.nama ASC"
    );
    match sqlx::query(&sql).fetch_all(pool.get_ref()).await {
        Ok(rows) => {
            let list: Vec<Value> = rows.iter().map(petugas_row_to_json).collect();
            let total = list.len();
            resp::ok(
                "All petugas kesehatan retrieved successfully",
                Some(json!({ "data": list, "total": total })),
            )
        }
        Err(e) => {
            log::error!("Query daftar petugas gagal: {:?}", e);
            resp::internal("Failed to get petugas kesehatan list")
        }
    }
}

#[post("/api/admin/petugas-kesehatan/insert")]
pub async fn insert_petugas(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<PetugasRequest>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    if let Err(e) = data.validate(false, true) {
        return resp::bad_request(e);
    }

    let skpd = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM skpd WHERE id = ? AND deleted_date IS NULL",
        &[&data.id_skpd],
    )
    .await
    .unwrap_or(0);
    if skpd == 0 {
        return resp::bad_request("SKPD not found");
    }

    let email_taken = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM pengguna WHERE email = ?",
        &[&data.email],
    )
    .await
    .unwrap_or(0);
    if email_taken > 0 {
        return resp::bad_request("Email sudah terdaftar");
    }

    let duplicate = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM petugas_kesehatan WHERE nama = ? AND id_skpd = ? \
         AND deleted_date IS NULL",
        &[&data.nama, &data.id_skpd],
    )
    .await
    .unwrap_or(0);
    if duplicate > 0 {
        return resp::bad_request(
            "Petugas kesehatan with the same name already exists in this SKPD",
        );
    }

    let password = match &data.password {
        Some(p) => p,
        None => return resp::bad_request("password is required"),
    };
    let hashed = match bcrypt::hash(password, bcrypt::DEFAULT_COST) {
        Ok(h) => h,
        Err(e) => {
            log::error!("Hash password gagal: {:?}", e);
            return resp::internal("Failed to hash password");
        }
    };

    // Akun pengguna dan baris petugas dibuat dalam satu transaksi
    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            log::error!("Mulai transaksi gagal: {:?}", e);
            return resp::internal("Failed to insert petugas kesehatan");
        }
    };

    let result = sqlx::query("INSERT INTO pengguna (email, password_hash, role) VALUES (?, ?, ?)")
        .bind(&data.email)
        .bind(&hashed)
        .bind(auth::ROLE_PETUGAS)
        .execute(&mut *tx)
        .await;

    let pengguna_id = match result {
        Ok(res) => res.last_insert_id().to_string(),
        Err(e) => {
            log::error!("Insert pengguna petugas gagal: {:?}", e);
            return resp::internal("Failed to create pengguna account");
        }
    };

    let result = sqlx::query(
        "INSERT INTO petugas_kesehatan (id_pengguna, id_skpd, nama, created_id, created_date) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&pengguna_id)
    .bind(&data.id_skpd)
    .bind(data.nama.trim())
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .execute(&mut *tx)
    .await;

    let petugas_id = match result {
        Ok(res) => res.last_insert_id().to_string(),
        Err(e) => {
            log::error!("Insert petugas gagal: {:?}", e);
            return resp::internal("Failed to insert petugas kesehatan");
        }
    };

    if let Err(e) = tx.commit().await {
        log::error!("Commit insert petugas gagal: {:?}", e);
        return resp::internal("Failed to insert petugas kesehatan");
    }

    resp::ok(
        "Petugas kesehatan inserted successfully",
        Some(json!({ "id": petugas_id, "id_pengguna": pengguna_id })),
    )
}

#[put("/api/admin/petugas-kesehatan/update")]
pub async fn update_petugas(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<PetugasRequest>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    if let Err(e) = data.validate(true, false) {
        return resp::bad_request(e);
    }

    let row = sqlx::query(
        "SELECT CAST(id_pengguna AS CHAR) AS id_pengguna, CAST(id_skpd AS CHAR) AS id_skpd \
         FROM petugas_kesehatan WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(&data.id)
    .fetch_optional(pool.get_ref())
    .await;

    let (id_pengguna, current_skpd) = match row {
        Ok(Some(row)) => (
            row.get::<String, _>("id_pengguna"),
            row.get::<String, _>("id_skpd"),
        ),
        Ok(None) => return resp::not_found("Petugas kesehatan not found"),
        Err(e) => {
            log::error!("Cek petugas gagal: {:?}", e);
            return resp::internal("Failed to check petugas kesehatan existence");
        }
    };

    let skpd = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM skpd WHERE id = ? AND deleted_date IS NULL",
        &[&data.id_skpd],
    )
    .await
    .unwrap_or(0);
    if skpd == 0 {
        return resp::bad_request("SKPD not found");
    }

    // Pindah SKPD ditahan selama masih ada penugasan intervensi
    if current_skpd != data.id_skpd {
        let assignments = db::count(
            pool.get_ref(),
            "SELECT COUNT(*) FROM intervensi_petugas WHERE id_petugas_kesehatan = ?",
            &[&data.id],
        )
        .await
        .unwrap_or(0);
        if assignments > 0 {
            return resp::bad_request(format!(
                "Cannot change SKPD. Petugas has {} intervensi assignments",
                assignments
            ));
        }
    }

    let email_taken = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM pengguna WHERE email = ? AND id != ?",
        &[&data.email, &id_pengguna],
    )
    .await
    .unwrap_or(0);
    if email_taken > 0 {
        return resp::bad_request("Email sudah terdaftar");
    }

    let duplicate = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM petugas_kesehatan WHERE nama = ? AND id_skpd = ? AND id != ? \
         AND deleted_date IS NULL",
        &[&data.nama, &data.id_skpd, &data.id],
    )
    .await
    .unwrap_or(0);
    if duplicate > 0 {
        return resp::bad_request(
            "Petugas kesehatan with the same name already exists in this SKPD",
        );
    }

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            log::error!("Mulai transaksi gagal: {:?}", e);
            return resp::internal("Failed to update petugas kesehatan");
        }
    };

    // Password hanya di-hash ulang kalau dikirim
    let pengguna_update = match &data.password {
        Some(password) => {
            let hashed = match bcrypt::hash(password, bcrypt::DEFAULT_COST) {
                Ok(h) => h,
                Err(e) => {
                    log::error!("Hash password gagal: {:?}", e);
                    return resp::internal("Failed to hash password");
                }
            };
            sqlx::query("UPDATE pengguna SET email = ?, password_hash = ? WHERE id = ?")
                .bind(&data.email)
                .bind(hashed)
                .bind(&id_pengguna)
                .execute(&mut *tx)
                .await
        }
        None => sqlx::query("UPDATE pengguna SET email = ? WHERE id = ?")
            .bind(&data.email)
            .bind(&id_pengguna)
            .execute(&mut *tx)
            .await,
    };
    if let Err(e) = pengguna_update {
        log::error!("Update pengguna petugas gagal: {:?}", e);
        return resp::internal("Failed to update pengguna account");
    }

    let result = sqlx::query(
        "UPDATE petugas_kesehatan SET id_skpd = ?, nama = ?, updated_id = ?, updated_date = ? \
         WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(&data.id_skpd)
    .bind(data.nama.trim())
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(&mut *tx)
    .await;

    if let Err(e) = result {
        log::error!("Update petugas gagal: {:?}", e);
        return resp::internal("Failed to update petugas kesehatan");
    }

    if let Err(e) = tx.commit().await {
        log::error!("Commit update petugas gagal: {:?}", e);
        return resp::internal("Failed to update petugas kesehatan");
    }

    resp::ok(
        "Petugas kesehatan updated successfully",
        Some(json!({ "id": data.id })),
    )
}

#[delete("/api/admin/petugas-kesehatan/delete")]
pub async fn delete_petugas(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<IdBody>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    if data.id.trim().is_empty() {
        return resp::bad_request("Petugas ID is required");
    }

    let exists = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM petugas_kesehatan WHERE id = ? AND deleted_date IS NULL",
        &[&data.id],
    )
    .await;
    match exists {
        Ok(0) => return resp::not_found("Petugas kesehatan not found"),
        Ok(_) => {}
        Err(e) => {
            log::error!("Cek petugas gagal: {:?}", e);
            return resp::internal("Failed to check petugas kesehatan existence");
        }
    }

    let assignments = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM intervensi_petugas WHERE id_petugas_kesehatan = ?",
        &[&data.id],
    )
    .await
    .unwrap_or(0);
    if assignments > 0 {
        return resp::bad_request(format!(
            "Cannot delete petugas kesehatan. There are {} intervensi assignments for this petugas",
            assignments
        ));
    }

    let riwayat = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM riwayat_pemeriksaan WHERE created_id = \
         (SELECT id_pengguna FROM petugas_kesehatan WHERE id = ?) AND deleted_date IS NULL",
        &[&data.id],
    )
    .await
    .unwrap_or(0);
    if riwayat > 0 {
        return resp::bad_request(format!(
            "Cannot delete petugas kesehatan. There are {} active riwayat pemeriksaan written by this petugas",
            riwayat
        ));
    }

    let result = sqlx::query(
        "UPDATE petugas_kesehatan SET deleted_id = ?, deleted_date = ? \
         WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => resp::ok(
            "Petugas kesehatan deleted successfully",
            Some(json!({ "id": data.id })),
        ),
        Ok(_) => resp::not_found("Petugas kesehatan not found or already deleted"),
        Err(e) => {
            log::error!("Hapus petugas gagal: {:?}", e);
            resp::internal("Failed to delete petugas kesehatan")
        }
    }
}

#[post("/api/admin/petugas-kesehatan/restore")]
pub async fn restore_petugas(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<IdBody>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    if data.id.trim().is_empty() {
        return resp::bad_request("Petugas ID is required");
    }

    let row = sqlx::query(
        "SELECT pk.nama, CAST(pk.id_skpd AS CHAR) AS id_skpd, \
         (SELECT COUNT(*) FROM skpd s WHERE s.id = pk.id_skpd AND s.deleted_date IS NULL) \
         AS skpd_live \
         FROM petugas_kesehatan pk WHERE pk.id = ? AND pk.deleted_date IS NOT NULL",
    )
    .bind(&data.id)
    .fetch_optional(pool.get_ref())
    .await;

    let (nama, id_skpd) = match row {
        Ok(Some(row)) => {
            if row.get::<i64, _>("skpd_live") == 0 {
                return resp::bad_request(
                    "Cannot restore petugas kesehatan. The SKPD is deleted",
                );
            }
            (
                row.get::<String, _>("nama"),
                row.get::<String, _>("id_skpd"),
            )
        }
        Ok(None) => return resp::not_found("Petugas kesehatan not found or not deleted"),
        Err(e) => {
            log::error!("Cek petugas terhapus gagal: {:?}", e);
            return resp::internal("Failed to check petugas kesehatan existence");
        }
    };

    let duplicate = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM petugas_kesehatan WHERE nama = ? AND id_skpd = ? AND id != ? \
         AND deleted_date IS NULL",
        &[&nama, &id_skpd, &data.id],
    )
    .await
    .unwrap_or(0);
    if duplicate > 0 {
        return resp::conflict(
            "Cannot restore petugas kesehatan. An active petugas with the same name exists in this SKPD",
        );
    }

    let result = sqlx::query(
        "UPDATE petugas_kesehatan SET deleted_id = NULL, deleted_date = NULL, updated_id = ?, \
         updated_date = ? WHERE id = ? AND deleted_date IS NOT NULL",
    )
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => resp::ok(
            "Petugas kesehatan restored successfully",
            Some(json!({ "id": data.id })),
        ),
        Ok(_) => resp::not_found("Petugas kesehatan not found or not deleted"),
        Err(e) => {
            log::error!("Pulihkan petugas gagal: {:?}", e);
            resp::internal("Failed to restore petugas kesehatan")
        }
    }
}
