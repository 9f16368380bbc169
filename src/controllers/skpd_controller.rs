//skpd_controller.rs
use crate::auth::{self, JwtConfig};
use crate::db;
use crate::models::response as resp;
use crate::models::skpd::SkpdRequest;
use crate::utils;

use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::MySqlPool;
use sqlx::Row;

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdBody {
    pub id: String,
}

const SELECT_SKPD: &str = "SELECT CAST(s.id AS CHAR) AS id, s.skpd, s.jenis, \
    DATE_FORMAT(s.created_date, '%Y-%m-%d %H:%i:%s') AS created_date, \
    DATE_FORMAT(s.updated_date, '%Y-%m-%d %H:%i:%s') AS updated_date, \
    COALESCE(COUNT(pk.id), 0) AS petugas_count \
    FROM skpd s \
    LEFT JOIN petugas_kesehatan pk ON s.id = pk.id_skpd AND pk.deleted_date IS NULL";

fn skpd_row_to_json(row: &sqlx::mysql::MySqlRow) -> Value {
    json!({
        "id": row.get::<String, _>("id"),
        "skpd": row.get::<String, _>("skpd"),
        "jenis": row.get::<String, _>("jenis"),
        "petugas_count": row.get::<i64, _>("petugas_count"),
        "created_date": row.get::<Option<String>, _>("created_date"),
        "updated_date": row.get::<Option<String>, _>("updated_date"),
    })
}

#[get("/api/admin/skpd/get")]
pub async fn get_skpd(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<IdQuery>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }

    if let Some(id) = query.id.as_deref().filter(|s| !s.is_empty()) {
        let sql = format!(
            "{SELECT_SKPD} WHERE s.id = ? AND s.deleted_date IS NULL \
             GROUP BY s.id, s.skpd, s.jenis, s.created_date, s.updated_date"
        );
        return match sqlx::query(&sql).bind(id).fetch_optional(pool.get_ref()).await {
            Ok(Some(row)) => resp::ok(
                "SKPD retrieved successfully",
                Some(json!({ "data": skpd_row_to_json(&row) })),
            ),
            Ok(None) => resp::not_found("SKPD not found"),
            Err(e) => {
                log::error!("Query SKPD gagal: {:?}", e);
                resp::internal("Failed to get SKPD")
            }
        };
    }

    let sql = format!(
        "{SELECT_SKPD} WHERE s.deleted_date IS NULL \
         GROUP BY s.id, s.skpd, s.jenis, s.created_date, s.updated_date \
         ORDER BY s.jenis ASC, s.skpd ASC"
    );
    match sqlx::query(&sql).fetch_all(pool.get_ref()).await {
        Ok(rows) => {
            let list: Vec<Value> = rows.iter().map(skpd_row_to_json).collect();
            let total = list.len();
            resp::ok(
                "All SKPD retrieved successfully",
                Some(json!({ "data": list, "total": total })),
            )
        }
        Err(e) => {
            log::error!("Query daftar SKPD gagal: {:?}", e);
            resp::internal("Failed to get SKPD list")
        }
    }
}

#[post("/api/admin/skpd/insert")]
pub async fn insert_skpd(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<SkpdRequest>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    if let Err(e) = data.validate(false) {
        return resp::bad_request(e);
    }

    let exists = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM skpd WHERE skpd = ? AND jenis = ? AND deleted_date IS NULL",
        &[&data.skpd, &data.jenis],
    )
    .await;
    match exists {
        Ok(0) => {}
        Ok(_) => {
            return resp::bad_request(format!(
                "SKPD '{}' with jenis '{}' already exists",
                data.skpd, data.jenis
            ))
        }
        Err(e) => {
            log::error!("Cek duplikat SKPD gagal: {:?}", e);
            return resp::internal("Failed to check SKPD existence");
        }
    }

    // Nama mirip hanya catatan, bukan penolakan
    let pattern = format!("%{}%", data.skpd);
    let similar = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM skpd WHERE LOWER(skpd) LIKE LOWER(?) AND deleted_date IS NULL",
        &[&pattern],
    )
    .await
    .unwrap_or(0);

    let result = sqlx::query(
        "INSERT INTO skpd (skpd, jenis, created_id, created_date) VALUES (?, ?, ?, ?)",
    )
    .bind(&data.skpd)
    .bind(&data.jenis)
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            let mut message = "SKPD inserted successfully".to_string();
            if similar > 0 {
                message.push_str(&format!(" (Note: Found {} similar SKPD names)", similar));
            }
            resp::ok(
                message,
                Some(json!({ "id": res.last_insert_id().to_string() })),
            )
        }
        Err(e) => {
            log::error!("Insert SKPD gagal: {:?}", e);
            resp::internal("Failed to insert SKPD")
        }
    }
}

#[put("/api/admin/skpd/update")]
pub async fn update_skpd(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<SkpdRequest>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    if let Err(e) = data.validate(true) {
        return resp::bad_request(e);
    }

    let current = sqlx::query("SELECT jenis FROM skpd WHERE id = ? AND deleted_date IS NULL")
        .bind(&data.id)
        .fetch_optional(pool.get_ref())
        .await;
    let current_jenis: String = match current {
        Ok(Some(row)) => row.get("jenis"),
        Ok(None) => return resp::not_found("SKPD not found"),
        Err(e) => {
            log::error!("Cek SKPD gagal: {:?}", e);
            return resp::internal("Failed to check SKPD existence");
        }
    };

    let duplicate = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM skpd WHERE skpd = ? AND jenis = ? AND id != ? \
         AND deleted_date IS NULL",
        &[&data.skpd, &data.jenis, &data.id],
    )
    .await;
    match duplicate {
        Ok(0) => {}
        Ok(_) => {
            return resp::bad_request(format!(
                "SKPD '{}' with jenis '{}' already exists",
                data.skpd, data.jenis
            ))
        }
        Err(e) => {
            log::error!("Cek duplikat SKPD gagal: {:?}", e);
            return resp::internal("Failed to check SKPD existence");
        }
    }

    // Ganti jenis ditahan selama masih ada petugas aktif menempel
    if current_jenis != data.jenis {
        let petugas = db::count(
            pool.get_ref(),
            "SELECT COUNT(*) FROM petugas_kesehatan WHERE id_skpd = ? AND deleted_date IS NULL",
            &[&data.id],
        )
        .await
        .unwrap_or(0);
        if petugas > 0 {
            return resp::bad_request(format!(
                "Cannot change jenis. There are {} active petugas kesehatan attached to this SKPD",
                petugas
            ));
        }
    }

    let result = sqlx::query(
        "UPDATE skpd SET skpd = ?, jenis = ?, updated_id = ?, updated_date = ? \
         WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(&data.skpd)
    .bind(&data.jenis)
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => {
            resp::ok("SKPD updated successfully", Some(json!({ "id": data.id })))
        }
        Ok(_) => resp::not_found("SKPD not found"),
        Err(e) => {
            log::error!("Update SKPD gagal: {:?}", e);
            resp::internal("Failed to update SKPD")
        }
    }
}

#[delete("/api/admin/skpd/delete")]
pub async fn delete_skpd(
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
        return resp::bad_request("SKPD ID is required");
    }

    let row = sqlx::query(
        "SELECT skpd, jenis, DATE_FORMAT(deleted_date, '%Y-%m-%d %H:%i:%s') AS deleted_date \
         FROM skpd WHERE id = ?",
    )
    .bind(&data.id)
    .fetch_optional(pool.get_ref())
    .await;

    let (skpd_name, jenis) = match row {
        Ok(Some(row)) => {
            if row.get::<Option<String>, _>("deleted_date").is_some() {
                return resp::bad_request("SKPD already deleted");
            }
            (
                row.get::<String, _>("skpd"),
                row.get::<String, _>("jenis"),
            )
        }
        Ok(None) => return resp::not_found("SKPD not found"),
        Err(e) => {
            log::error!("Cek SKPD gagal: {:?}", e);
            return resp::internal("Failed to check SKPD existence");
        }
    };

    let petugas = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM petugas_kesehatan WHERE id_skpd = ? AND deleted_date IS NULL",
        &[&data.id],
    )
    .await;
    match petugas {
        Ok(0) => {}
        Ok(n) => {
            return resp::bad_request(format!(
                "Cannot delete SKPD '{}'. There are {} active petugas kesehatan records related to this SKPD",
                skpd_name, n
            ))
        }
        Err(e) => {
            log::error!("Cek petugas terkait gagal: {:?}", e);
            return resp::internal("Failed to check related petugas kesehatan");
        }
    }

    let deleted_petugas = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM petugas_kesehatan WHERE id_skpd = ? AND deleted_date IS NOT NULL",
        &[&data.id],
    )
    .await
    .unwrap_or(0);

    let result = sqlx::query(
        "UPDATE skpd SET deleted_id = ?, deleted_date = ? WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => {
            let mut message = format!("Data SKPD '{}' (jenis: {}) berhasil dihapus", skpd_name, jenis);
            if deleted_petugas > 0 {
                message.push_str(&format!(
                    " (Note: This SKPD had {} deleted petugas kesehatan)",
                    deleted_petugas
                ));
            }
            resp::ok(
                "SKPD deleted successfully",
                Some(json!({ "id": data.id, "message": message })),
            )
        }
        Ok(_) => resp::not_found("SKPD not found or already deleted"),
        Err(e) => {
            log::error!("Hapus SKPD gagal: {:?}", e);
            resp::internal("Failed to delete SKPD")
        }
    }
}

#[post("/api/admin/skpd/restore")]
pub async fn restore_skpd(
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
        return resp::bad_request("SKPD ID is required");
    }

    let row = sqlx::query("SELECT skpd, jenis FROM skpd WHERE id = ? AND deleted_date IS NOT NULL")
        .bind(&data.id)
        .fetch_optional(pool.get_ref())
        .await;

    let (skpd_name, jenis) = match row {
        Ok(Some(row)) => (
            row.get::<String, _>("skpd"),
            row.get::<String, _>("jenis"),
        ),
        Ok(None) => return resp::not_found("SKPD not found or not deleted"),
        Err(e) => {
            log::error!("Cek SKPD terhapus gagal: {:?}", e);
            return resp::internal("Failed to check SKPD existence");
        }
    };

    // Baris hidup dengan nama+jenis sama akan bertabrakan
    let conflict = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM skpd WHERE skpd = ? AND jenis = ? AND id != ? \
         AND deleted_date IS NULL",
        &[&skpd_name, &jenis, &data.id],
    )
    .await
    .unwrap_or(0);
    if conflict > 0 {
        return resp::conflict(format!(
            "Cannot restore SKPD '{}'. An active SKPD with the same name and jenis already exists",
            skpd_name
        ));
    }

    let result = sqlx::query(
        "UPDATE skpd SET deleted_id = NULL, deleted_date = NULL, updated_id = ?, \
         updated_date = ? WHERE id = ? AND deleted_date IS NOT NULL",
    )
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => resp::ok(
            "SKPD restored successfully",
            Some(json!({ "id": data.id })),
        ),
        Ok(_) => resp::not_found("SKPD not found or not deleted"),
        Err(e) => {
            log::error!("Pulihkan SKPD gagal: {:?}", e);
            resp::internal("Failed to restore SKPD")
        }
    }
}
