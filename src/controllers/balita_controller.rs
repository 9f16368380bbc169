//balita_controller.rs
use crate::auth::{self, JwtConfig};
use crate::db;
use crate::models::balita::BalitaRequest;
use crate::models::response as resp;
use crate::utils;

use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use serde_json::{json, Value};
use sqlx::MySqlPool;
use sqlx::Row;

use super::skpd_controller::{IdBody, IdQuery};

const SELECT_BALITA: &str = "SELECT CAST(b.id AS CHAR) AS id, \
    CAST(b.id_keluarga AS CHAR) AS id_keluarga, b.nama, \
    DATE_FORMAT(b.tanggal_lahir, '%Y-%m-%d') AS tanggal_lahir, b.jenis_kelamin, \
    CAST(b.berat_lahir AS DOUBLE) AS berat_lahir, \
    CAST(b.tinggi_lahir AS DOUBLE) AS tinggi_lahir, \
    k.nomor_kk, k.nama_ayah, k.nama_ibu, \
    DATE_FORMAT(b.created_date, '%Y-%m-%d %H:%i:%s') AS created_date, \
    DATE_FORMAT(b.updated_date, '%Y-%m-%d %H:%i:%s') AS updated_date \
    FROM balita b \
    JOIN keluarga k ON b.id_keluarga = k.id";

pub(super) fn balita_row_to_json(row: &sqlx::mysql::MySqlRow) -> Value {
    let tanggal_lahir: String = row.get("tanggal_lahir");
    let umur = utils::parse_date(&tanggal_lahir)
        .map(|b| utils::format_age(b, chrono::Local::now().date_naive()));
    json!({
        "id": row.get::<String, _>("id"),
        "id_keluarga": row.get::<String, _>("id_keluarga"),
        "nama": row.get::<String, _>("nama"),
        "tanggal_lahir": tanggal_lahir,
        "umur": umur,
        "jenis_kelamin": row.get::<String, _>("jenis_kelamin"),
        "berat_lahir": row.get::<f64, _>("berat_lahir"),
        "tinggi_lahir": row.get::<f64, _>("tinggi_lahir"),
        "nomor_kk": row.get::<String, _>("nomor_kk"),
        "nama_ayah": row.get::<String, _>("nama_ayah"),
        "nama_ibu": row.get::<String, _>("nama_ibu"),
        "created_date": row.get::<Option<String>, _>("created_date"),
        "updated_date": row.get::<Option<String>, _>("updated_date"),
    })
}

#[get("/api/admin/balita/get")]
pub async fn get_balita(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<IdQuery>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }

    if let Some(id) = query.id.as_deref().filter(|s| !s.is_empty()) {
        let sql = format!("{SELECT_BALITA} WHERE b.id = ? AND b.deleted_date IS NULL");
        return match sqlx::query(&sql).bind(id).fetch_optional(pool.get_ref()).await {
            Ok(Some(row)) => resp::ok(
                "Balita retrieved successfully",
                Some(json!({ "data": balita_row_to_json(&row) })),
            ),
            Ok(None) => resp::not_found("Balita not found"),
            Err(e) => {
                log::error!("Query balita gagal: {:?}", e);
                resp::internal("Failed to get balita")
            }
        };
    }

    let sql = format!(
        "{SELECT_BALITA} WHERE b.deleted_date IS NULL ORDER BY b.created_date DESC"
    );
    match sqlx::query(&sql).fetch_all(pool.get_ref()).await {
        Ok(rows) => {
            let list: Vec<Value> = rows.iter().map(balita_row_to_json).collect();
            let total = list.len();
            resp::ok(
                "All balita retrieved successfully",
                Some(json!({ "data": list, "total": total })),
            )
        }
        Err(e) => {
            log::error!("Query daftar balita gagal: {:?}", e);
            resp::internal("Failed to get balita list")
        }
    }
}

async fn keluarga_live(pool: &MySqlPool, id: &str) -> Result<bool, sqlx::Error> {
    db::count(
        pool,
        "SELECT COUNT(*) FROM keluarga WHERE id = ? AND deleted_date IS NULL",
        &[id],
    )
    .await
    .map(|n| n > 0)
}

#[post("/api/admin/balita/insert")]
pub async fn insert_balita(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<BalitaRequest>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    if let Err(e) = data.validate(false) {
        return resp::bad_request(e);
    }

    match keluarga_live(pool.get_ref(), &data.id_keluarga).await {
        Ok(true) => {}
        Ok(false) => return resp::bad_request("Keluarga not found"),
        Err(e) => {
            log::error!("Cek keluarga gagal: {:?}", e);
            return resp::internal("Failed to check keluarga");
        }
    }

    let duplicate = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM balita WHERE id_keluarga = ? AND nama = ? \
         AND tanggal_lahir = ? AND deleted_date IS NULL",
        &[&data.id_keluarga, &data.nama, &data.tanggal_lahir],
    )
    .await;
    match duplicate {
        Ok(0) => {}
        Ok(_) => {
            return resp::bad_request(
                "Balita with the same name and birth date already exists in this keluarga",
            )
        }
        Err(e) => {
            log::error!("Cek duplikat balita gagal: {:?}", e);
            return resp::internal("Failed to check balita uniqueness");
        }
    }

    let result = sqlx::query(
        "INSERT INTO balita (id_keluarga, nama, tanggal_lahir, jenis_kelamin, berat_lahir, \
         tinggi_lahir, created_id, created_date) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&data.id_keluarga)
    .bind(data.nama.trim())
    .bind(&data.tanggal_lahir)
    .bind(&data.jenis_kelamin)
    .bind(data.berat_lahir)
    .bind(data.tinggi_lahir)
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => resp::ok(
            "Balita inserted successfully",
            Some(json!({ "id": res.last_insert_id().to_string() })),
        ),
        Err(e) => {
            log::error!("Insert balita gagal: {:?}", e);
            resp::internal("Failed to insert balita")
        }
    }
}

#[put("/api/admin/balita/update")]
pub async fn update_balita(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<BalitaRequest>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    if let Err(e) = data.validate(true) {
        return resp::bad_request(e);
    }

    let exists = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM balita WHERE id = ? AND deleted_date IS NULL",
        &[&data.id],
    )
    .await;
    match exists {
        Ok(0) => return resp::not_found("Balita not found"),
        Ok(_) => {}
        Err(e) => {
            log::error!("Cek balita gagal: {:?}", e);
            return resp::internal("Failed to check balita existence");
        }
    }

    match keluarga_live(pool.get_ref(), &data.id_keluarga).await {
        Ok(true) => {}
        Ok(false) => return resp::bad_request("Keluarga not found"),
        Err(e) => {
            log::error!("Cek keluarga gagal: {:?}", e);
            return resp::internal("Failed to check keluarga");
        }
    }

    let duplicate = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM balita WHERE id_keluarga = ? AND nama = ? \
         AND tanggal_lahir = ? AND id != ? AND deleted_date IS NULL",
        &[&data.id_keluarga, &data.nama, &data.tanggal_lahir, &data.id],
    )
    .await
    .unwrap_or(0);
    if duplicate > 0 {
        return resp::bad_request(
            "Balita with the same name and birth date already exists in this keluarga",
        );
    }

    let result = sqlx::query(
        "UPDATE balita SET id_keluarga = ?, nama = ?, tanggal_lahir = ?, jenis_kelamin = ?, \
         berat_lahir = ?, tinggi_lahir = ?, updated_id = ?, updated_date = ? \
         WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(&data.id_keluarga)
    .bind(data.nama.trim())
    .bind(&data.tanggal_lahir)
    .bind(&data.jenis_kelamin)
    .bind(data.berat_lahir)
    .bind(data.tinggi_lahir)
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => {
            resp::ok("Balita updated successfully", Some(json!({ "id": data.id })))
        }
        Ok(_) => resp::not_found("Balita not found"),
        Err(e) => {
            log::error!("Update balita gagal: {:?}", e);
            resp::internal("Failed to update balita")
        }
    }
}

#[delete("/api/admin/balita/delete")]
pub async fn delete_balita(
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
        return resp::bad_request("Balita ID is required");
    }

    let exists = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM balita WHERE id = ? AND deleted_date IS NULL",
        &[&data.id],
    )
    .await;
    match exists {
        Ok(0) => return resp::not_found("Balita not found"),
        Ok(_) => {}
        Err(e) => {
            log::error!("Cek balita gagal: {:?}", e);
            return resp::internal("Failed to check balita existence");
        }
    }

    let laporan = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM laporan_masyarakat WHERE id_balita = ? AND deleted_date IS NULL",
        &[&data.id],
    )
    .await
    .unwrap_or(0);
    if laporan > 0 {
        return resp::bad_request(format!(
            "Cannot delete balita. There are {} active laporan records for this balita",
            laporan
        ));
    }

    let riwayat = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM riwayat_pemeriksaan WHERE id_balita = ? AND deleted_date IS NULL",
        &[&data.id],
    )
    .await
    .unwrap_or(0);
    if riwayat > 0 {
        return resp::bad_request(format!(
            "Cannot delete balita. There are {} active riwayat pemeriksaan records for this balita",
            riwayat
        ));
    }

    let result = sqlx::query(
        "UPDATE balita SET deleted_id = ?, deleted_date = ? \
         WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => {
            resp::ok("Balita deleted successfully", Some(json!({ "id": data.id })))
        }
        Ok(_) => resp::not_found("Balita not found or already deleted"),
        Err(e) => {
            log::error!("Hapus balita gagal: {:?}", e);
            resp::internal("Failed to delete balita")
        }
    }
}

#[post("/api/admin/balita/restore")]
pub async fn restore_balita(
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
        return resp::bad_request("Balita ID is required");
    }

    // Keluarga induk harus masih hidup supaya baris yang dipulihkan tidak
    // menggantung
    let row = sqlx::query(
        "SELECT CAST(b.id_keluarga AS CHAR) AS id_keluarga, b.nama, \
         DATE_FORMAT(b.tanggal_lahir, '%Y-%m-%d') AS tanggal_lahir, \
         (SELECT COUNT(*) FROM keluarga k WHERE k.id = b.id_keluarga \
          AND k.deleted_date IS NULL) AS keluarga_live \
         FROM balita b WHERE b.id = ? AND b.deleted_date IS NOT NULL",
    )
    .bind(&data.id)
    .fetch_optional(pool.get_ref())
    .await;

    let (id_keluarga, nama, tanggal_lahir) = match row {
        Ok(Some(row)) => {
            if row.get::<i64, _>("keluarga_live") == 0 {
                return resp::bad_request(
                    "Cannot restore balita. The parent keluarga is deleted",
                );
            }
            (
                row.get::<String, _>("id_keluarga"),
                row.get::<String, _>("nama"),
                row.get::<String, _>("tanggal_lahir"),
            )
        }
        Ok(None) => return resp::not_found("Balita not found or not deleted"),
        Err(e) => {
            log::error!("Cek balita terhapus gagal: {:?}", e);
            return resp::internal("Failed to check balita existence");
        }
    };

    let duplicate = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM balita WHERE id_keluarga = ? AND nama = ? \
         AND tanggal_lahir = ? AND id != ? AND deleted_date IS NULL",
        &[&id_keluarga, &nama, &tanggal_lahir, &data.id],
    )
    .await
    .unwrap_or(0);
    if duplicate > 0 {
        return resp::conflict(
            "Cannot restore balita. An active balita with the same name and birth date exists",
        );
    }

    let result = sqlx::query(
        "UPDATE balita SET deleted_id = NULL, deleted_date = NULL, updated_id = ?, \
         updated_date = ? WHERE id = ? AND deleted_date IS NOT NULL",
    )
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => resp::ok(
            "Balita restored successfully",
            Some(json!({ "id": data.id })),
        ),
        Ok(_) => resp::not_found("Balita not found or not deleted"),
        Err(e) => {
            log::error!("Pulihkan balita gagal: {:?}", e);
            resp::internal("Failed to restore balita")
        }
    }
}
