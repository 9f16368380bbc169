//laporan_controller.rs
use crate::auth::{self, JwtConfig};
use crate::db;
use crate::models::laporan::{self, LaporanRequest};
use crate::models::response as resp;
use crate::utils;

use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use serde_json::{json, Value};
use sqlx::MySqlPool;
use sqlx::Row;

use super::skpd_controller::{IdBody, IdQuery};

const SELECT_LAPORAN: &str = "SELECT CAST(lm.id AS CHAR) AS id, \
    CAST(lm.id_masyarakat AS CHAR) AS id_masyarakat, \
    CAST(lm.id_balita AS CHAR) AS id_balita, \
    CAST(lm.id_status_laporan AS CHAR) AS id_status_laporan, sl.status, \
    DATE_FORMAT(lm.tanggal_laporan, '%Y-%m-%d') AS tanggal_laporan, \
    lm.hubungan_dengan_balita, lm.nomor_hp_pelapor, lm.nomor_hp_keluarga_balita, \
    b.nama AS nama_balita, m.nama AS nama_pelapor, \
    DATE_FORMAT(lm.created_date, '%Y-%m-%d %H:%i:%s') AS created_date, \
    DATE_FORMAT(lm.updated_date, '%Y-%m-%d %H:%i:%s') AS updated_date \
    FROM laporan_masyarakat lm \
    JOIN status_laporan sl ON lm.id_status_laporan = sl.id \
    JOIN balita b ON lm.id_balita = b.id \
    LEFT JOIN masyarakat m ON lm.id_masyarakat = m.id";

pub(super) fn laporan_row_to_json(row: &sqlx::mysql::MySqlRow) -> Value {
    json!({
        "id": row.get::<String, _>("id"),
        "id_masyarakat": row.get::<Option<String>, _>("id_masyarakat"),
        "id_balita": row.get::<String, _>("id_balita"),
        "id_status_laporan": row.get::<String, _>("id_status_laporan"),
        "status": row.get::<String, _>("status"),
        "tanggal_laporan": row.get::<String, _>("tanggal_laporan"),
        "hubungan_dengan_balita": row.get::<String, _>("hubungan_dengan_balita"),
        "nomor_hp_pelapor": row.get::<String, _>("nomor_hp_pelapor"),
        "nomor_hp_keluarga_balita": row.get::<String, _>("nomor_hp_keluarga_balita"),
        "nama_balita": row.get::<String, _>("nama_balita"),
        "nama_pelapor": row.get::<Option<String>, _>("nama_pelapor"),
        "created_date": row.get::<Option<String>, _>("created_date"),
        "updated_date": row.get::<Option<String>, _>("updated_date"),
    })
}

#[get("/api/admin/laporan-masyarakat/get")]
pub async fn get_laporan(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<IdQuery>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }

    if let Some(id) = query.id.as_deref().filter(|s| !s.is_empty()) {
        let sql = format!("{SELECT_LAPORAN} WHERE lm.id = ? AND lm.deleted_date IS NULL");
        return match sqlx::query(&sql).bind(id).fetch_optional(pool.get_ref()).await {
            Ok(Some(row)) => resp::ok(
                "Laporan retrieved successfully",
                Some(json!({ "data": laporan_row_to_json(&row) })),
            ),
            Ok(None) => resp::not_found("Laporan not found"),
            Err(e) => {
                log::error!("Query laporan gagal: {:?}", e);
                resp::internal("Failed to get laporan")
            }
        };
    }

    let sql = format!(
        "{SELECT_LAPORAN} WHERE lm.deleted_date IS NULL ORDER BY lm.tanggal_laporan DESC"
    );
    match sqlx::query(&sql).fetch_all(pool.get_ref()).await {
        Ok(rows) => {
            let list: Vec<Value> = rows.iter().map(laporan_row_to_json).collect();
            let total = list.len();
            resp::ok(
                "All laporan retrieved successfully",
                Some(json!({ "data": list, "total": total })),
            )
        }
        Err(e) => {
            log::error!("Query daftar laporan gagal: {:?}", e);
            resp::internal("Failed to get laporan list")
        }
    }
}

/// Validasi referensi bersama insert/update admin: balita dan status harus
/// hidup, id_masyarakat (kalau diisi) harus ada.
async fn check_references(
    pool: &MySqlPool,
    data: &LaporanRequest,
) -> Result<(), HttpResponse> {
    let balita = db::count(
        pool,
        "SELECT COUNT(*) FROM balita WHERE id = ? AND deleted_date IS NULL",
        &[&data.id_balita],
    )
    .await
    .unwrap_or(0);
    if balita == 0 {
        return Err(resp::bad_request("Balita not found"));
    }

    let status = db::count(
        pool,
        "SELECT COUNT(*) FROM status_laporan WHERE id = ?",
        &[&data.id_status_laporan],
    )
    .await
    .unwrap_or(0);
    if status == 0 {
        return Err(resp::bad_request("Status laporan not found"));
    }

    if let Some(id_masyarakat) = data.id_masyarakat.as_deref().filter(|s| !s.is_empty()) {
        let masyarakat = db::count(
            pool,
            "SELECT COUNT(*) FROM masyarakat WHERE id = ?",
            &[id_masyarakat],
        )
        .await
        .unwrap_or(0);
        if masyarakat == 0 {
            return Err(resp::bad_request("Masyarakat not found"));
        }
    }

    Ok(())
}

#[post("/api/admin/laporan-masyarakat/insert")]
pub async fn insert_laporan(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<LaporanRequest>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    if let Err(e) = data.validate(false, true) {
        return resp::bad_request(e);
    }
    if let Err(resp) = check_references(pool.get_ref(), &data).await {
        return resp;
    }

    // Duplikat: balita + tanggal + pelapor yang sama
    let reporter = data.id_masyarakat.clone().unwrap_or_default();
    let duplicate = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM laporan_masyarakat WHERE id_balita = ? AND tanggal_laporan = ? \
         AND COALESCE(CAST(id_masyarakat AS CHAR), '') = ? AND deleted_date IS NULL",
        &[&data.id_balita, &data.tanggal_laporan, &reporter],
    )
    .await
    .unwrap_or(0);
    if duplicate > 0 {
        return resp::bad_request(
            "A laporan for this balita on this date by the same reporter already exists",
        );
    }

    let result = sqlx::query(
        "INSERT INTO laporan_masyarakat (id_masyarakat, id_balita, id_status_laporan, \
         tanggal_laporan, hubungan_dengan_balita, nomor_hp_pelapor, nomor_hp_keluarga_balita, \
         created_id, created_date) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(data.id_masyarakat.as_deref().filter(|s| !s.is_empty()))
    .bind(&data.id_balita)
    .bind(&data.id_status_laporan)
    .bind(&data.tanggal_laporan)
    .bind(data.hubungan_dengan_balita.trim())
    .bind(&data.nomor_hp_pelapor)
    .bind(&data.nomor_hp_keluarga_balita)
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => resp::ok(
            "Laporan inserted successfully",
            Some(json!({ "id": res.last_insert_id().to_string() })),
        ),
        Err(e) => {
            log::error!("Insert laporan gagal: {:?}", e);
            resp::internal("Failed to insert laporan")
        }
    }
}

#[put("/api/admin/laporan-masyarakat/update")]
pub async fn update_laporan(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<LaporanRequest>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    if let Err(e) = data.validate(true, true) {
        return resp::bad_request(e);
    }

    let exists = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM laporan_masyarakat WHERE id = ? AND deleted_date IS NULL",
        &[&data.id],
    )
    .await;
    match exists {
        Ok(0) => return resp::not_found("Laporan not found"),
        Ok(_) => {}
        Err(e) => {
            log::error!("Cek laporan gagal: {:?}", e);
            return resp::internal("Failed to check laporan existence");
        }
    }

    if let Err(resp) = check_references(pool.get_ref(), &data).await {
        return resp;
    }

    let reporter = data.id_masyarakat.clone().unwrap_or_default();
    let duplicate = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM laporan_masyarakat WHERE id_balita = ? AND tanggal_laporan = ? \
         AND COALESCE(CAST(id_masyarakat AS CHAR), '') = ? AND id != ? \
         AND deleted_date IS NULL",
        &[&data.id_balita, &data.tanggal_laporan, &reporter, &data.id],
    )
    .await
    .unwrap_or(0);
    if duplicate > 0 {
        return resp::bad_request(
            "A laporan for this balita on this date by the same reporter already exists",
        );
    }

    let result = sqlx::query(
        "UPDATE laporan_masyarakat SET id_masyarakat = ?, id_balita = ?, \
         id_status_laporan = ?, tanggal_laporan = ?, hubungan_dengan_balita = ?, \
         nomor_hp_pelapor = ?, nomor_hp_keluarga_balita = ?, updated_id = ?, \
         updated_date = ? WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(data.id_masyarakat.as_deref().filter(|s| !s.is_empty()))
    .bind(&data.id_balita)
    .bind(&data.id_status_laporan)
    .bind(&data.tanggal_laporan)
    .bind(data.hubungan_dengan_balita.trim())
    .bind(&data.nomor_hp_pelapor)
    .bind(&data.nomor_hp_keluarga_balita)
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => {
            resp::ok("Laporan updated successfully", Some(json!({ "id": data.id })))
        }
        Ok(_) => resp::not_found("Laporan not found"),
        Err(e) => {
            log::error!("Update laporan gagal: {:?}", e);
            resp::internal("Failed to update laporan")
        }
    }
}

#[delete("/api/admin/laporan-masyarakat/delete")]
pub async fn delete_laporan(
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
        return resp::bad_request("Laporan ID is required");
    }

    let row = sqlx::query(
        "SELECT sl.status FROM laporan_masyarakat lm \
         JOIN status_laporan sl ON lm.id_status_laporan = sl.id \
         WHERE lm.id = ? AND lm.deleted_date IS NULL",
    )
    .bind(&data.id)
    .fetch_optional(pool.get_ref())
    .await;

    let status: String = match row {
        Ok(Some(row)) => row.get("status"),
        Ok(None) => return resp::not_found("Laporan not found"),
        Err(e) => {
            log::error!("Cek laporan gagal: {:?}", e);
            return resp::internal("Failed to check laporan existence");
        }
    };

    // Laporan yang sudah diproses dan punya riwayat pemeriksaan tidak
    // boleh dihapus
    if status != laporan::STATUS_BELUM_DIPROSES {
        let riwayat = db::count(
            pool.get_ref(),
            "SELECT COUNT(*) FROM riwayat_pemeriksaan WHERE id_laporan_masyarakat = ? \
             AND deleted_date IS NULL",
            &[&data.id],
        )
        .await
        .unwrap_or(0);
        if riwayat > 0 {
            return resp::bad_request(format!(
                "Cannot delete laporan with status '{}'. There are {} related riwayat pemeriksaan records",
                status, riwayat
            ));
        }
    }

    let result = sqlx::query(
        "UPDATE laporan_masyarakat SET deleted_id = ?, deleted_date = ? \
         WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => resp::ok(
            "Laporan deleted successfully",
            Some(json!({ "id": data.id })),
        ),
        Ok(_) => resp::not_found("Laporan not found or already deleted"),
        Err(e) => {
            log::error!("Hapus laporan gagal: {:?}", e);
            resp::internal("Failed to delete laporan")
        }
    }
}

#[post("/api/admin/laporan-masyarakat/restore")]
pub async fn restore_laporan(
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
        return resp::bad_request("Laporan ID is required");
    }

    let row = sqlx::query(
        "SELECT (SELECT COUNT(*) FROM balita b WHERE b.id = lm.id_balita \
          AND b.deleted_date IS NULL) AS balita_live, \
         CAST(lm.id_masyarakat IS NOT NULL AS SIGNED) AS has_reporter, \
         (SELECT COUNT(*) FROM masyarakat m WHERE m.id = lm.id_masyarakat) AS reporter_live \
         FROM laporan_masyarakat lm WHERE lm.id = ? AND lm.deleted_date IS NOT NULL",
    )
    .bind(&data.id)
    .fetch_optional(pool.get_ref())
    .await;

    match row {
        Ok(Some(row)) => {
            if row.get::<i64, _>("balita_live") == 0 {
                return resp::bad_request("Cannot restore laporan. The balita is deleted");
            }
            let has_reporter: i64 = row.get("has_reporter");
            if has_reporter != 0 && row.get::<i64, _>("reporter_live") == 0 {
                return resp::bad_request(
                    "Cannot restore laporan. The reporting masyarakat no longer exists",
                );
            }
        }
        Ok(None) => return resp::not_found("Laporan not found or not deleted"),
        Err(e) => {
            log::error!("Cek laporan terhapus gagal: {:?}", e);
            return resp::internal("Failed to check laporan existence");
        }
    }

    let result = sqlx::query(
        "UPDATE laporan_masyarakat SET deleted_id = NULL, deleted_date = NULL, \
         updated_id = ?, updated_date = ? WHERE id = ? AND deleted_date IS NOT NULL",
    )
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => resp::ok(
            "Laporan restored successfully",
            Some(json!({ "id": data.id })),
        ),
        Ok(_) => resp::not_found("Laporan not found or not deleted"),
        Err(e) => {
            log::error!("Pulihkan laporan gagal: {:?}", e);
            resp::internal("Failed to restore laporan")
        }
    }
}
