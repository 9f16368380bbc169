//riwayat_controller.rs
use crate::auth::{self, JwtConfig};
use crate::db;
use crate::models::laporan::EXAMINABLE_STATUSES;
use crate::models::response as resp;
use crate::models::riwayat::RiwayatRequest;
use crate::utils;

use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use serde_json::{json, Value};
use sqlx::MySqlPool;
use sqlx::Row;

use super::skpd_controller::{IdBody, IdQuery};

const SELECT_RIWAYAT: &str = "SELECT CAST(rp.id AS CHAR) AS id, \
    CAST(rp.id_balita AS CHAR) AS id_balita, \
    CAST(rp.id_intervensi AS CHAR) AS id_intervensi, \
    CAST(rp.id_laporan_masyarakat AS CHAR) AS id_laporan_masyarakat, \
    DATE_FORMAT(rp.tanggal, '%Y-%m-%d') AS tanggal, \
    CAST(rp.berat_badan AS DOUBLE) AS berat_badan, \
    CAST(rp.tinggi_badan AS DOUBLE) AS tinggi_badan, \
    rp.status_gizi, rp.keterangan, b.nama AS nama_balita, \
    DATE_FORMAT(rp.created_date, '%Y-%m-%d %H:%i:%s') AS created_date, \
    DATE_FORMAT(rp.updated_date, '%Y-%m-%d %H:%i:%s') AS updated_date \
    FROM riwayat_pemeriksaan rp \
    JOIN balita b ON rp.id_balita = b.id";

fn riwayat_row_to_json(row: &sqlx::mysql::MySqlRow) -> Value {
    json!({
        "id": row.get::<String, _>("id"),
        "id_balita": row.get::<String, _>("id_balita"),
        "id_intervensi": row.get::<String, _>("id_intervensi"),
        "id_laporan_masyarakat": row.get::<String, _>("id_laporan_masyarakat"),
        "tanggal": row.get::<String, _>("tanggal"),
        "berat_badan": row.get::<f64, _>("berat_badan"),
        "tinggi_badan": row.get::<f64, _>("tinggi_badan"),
        "status_gizi": row.get::<String, _>("status_gizi"),
        "keterangan": row.get::<Option<String>, _>("keterangan"),
        "nama_balita": row.get::<String, _>("nama_balita"),
        "created_date": row.get::<Option<String>, _>("created_date"),
        "updated_date": row.get::<Option<String>, _>("updated_date"),
    })
}

#[get("/api/admin/riwayat-pemeriksaan/get")]
pub async fn get_riwayat(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<IdQuery>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }

    if let Some(id) = query.id.as_deref().filter(|s| !s.is_empty()) {
        let sql = format!("{SELECT_RIWAYAT} WHERE rp.id = ? AND rp.deleted_date IS NULL");
        return match sqlx::query(&sql).bind(id).fetch_optional(pool.get_ref()).await {
            Ok(Some(row)) => resp::ok(
                "Riwayat pemeriksaan retrieved successfully",
                Some(json!({ "data": riwayat_row_to_json(&row) })),
            ),
            Ok(None) => resp::not_found("Riwayat pemeriksaan not found"),
            Err(e) => {
                log::error!("Query riwayat gagal: {:?}", e);
                resp::internal("Failed to get riwayat pemeriksaan")
            }
        };
    }

    let sql = format!(
        "{SELECT_RIWAYAT} WHERE rp.deleted_date IS NULL ORDER BY rp.tanggal DESC"
    );
    match sqlx::query(&sql).fetch_all(pool.get_ref()).await {
        Ok(rows) => {
            let list: Vec<Value> = rows.iter().map(riwayat_row_to_json).collect();
            let total = list.len();
            resp::ok(
                "All riwayat pemeriksaan retrieved successfully",
                Some(json!({ "data": list, "total": total })),
            )
        }
        Err(e) => {
            log::error!("Query daftar riwayat gagal: {:?}", e);
            resp::internal("Failed to get riwayat pemeriksaan list")
        }
    }
}

/// Rangkaian cek sebelum insert/update: semua referensi hidup, laporan
/// milik balita yang sama, status laporan membolehkan pemeriksaan, dan
/// tanggal periksa tidak mendahului intervensi/laporan.
async fn check_exam_references(
    pool: &MySqlPool,
    data: &RiwayatRequest,
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

    let intervensi = sqlx::query(
        "SELECT DATE_FORMAT(tanggal, '%Y-%m-%d') AS tanggal FROM intervensi \
         WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(&data.id_intervensi)
    .fetch_optional(pool)
    .await;
    let tanggal_intervensi: String = match intervensi {
        Ok(Some(row)) => row.get("tanggal"),
        Ok(None) => return Err(resp::bad_request("Intervensi not found")),
        Err(e) => {
            log::error!("Cek intervensi gagal: {:?}", e);
            return Err(resp::internal("Failed to check intervensi"));
        }
    };

    let laporan = sqlx::query(
        "SELECT CAST(lm.id_balita AS CHAR) AS id_balita, sl.status, \
         DATE_FORMAT(lm.tanggal_laporan, '%Y-%m-%d') AS tanggal_laporan \
         FROM laporan_masyarakat lm \
         JOIN status_laporan sl ON lm.id_status_laporan = sl.id \
         WHERE lm.id = ? AND lm.deleted_date IS NULL",
    )
    .bind(&data.id_laporan_masyarakat)
    .fetch_optional(pool)
    .await;
    let (laporan_balita, status, tanggal_laporan) = match laporan {
        Ok(Some(row)) => (
            row.get::<String, _>("id_balita"),
            row.get::<String, _>("status"),
            row.get::<String, _>("tanggal_laporan"),
        ),
        Ok(None) => return Err(resp::bad_request("Laporan masyarakat not found")),
        Err(e) => {
            log::error!("Cek laporan gagal: {:?}", e);
            return Err(resp::internal("Failed to check laporan"));
        }
    };

    if laporan_balita != data.id_balita {
        return Err(resp::bad_request(
            "Laporan masyarakat does not belong to this balita",
        ));
    }

    if !EXAMINABLE_STATUSES.contains(&status.as_str()) {
        return Err(resp::bad_request(format!(
            "Cannot record examination while laporan status is '{}'",
            status
        )));
    }

    // Tanggal pembanding sudah divalidasi formatnya oleh validate()
    if let (Some(exam), Some(interv), Some(lapor)) = (
        utils::parse_date(&data.tanggal),
        utils::parse_date(&tanggal_intervensi),
        utils::parse_date(&tanggal_laporan),
    ) {
        if exam < interv {
            return Err(resp::bad_request(
                "Tanggal pemeriksaan cannot be before the intervensi date",
            ));
        }
        if exam < lapor {
            return Err(resp::bad_request(
                "Tanggal pemeriksaan cannot be before the laporan date",
            ));
        }
    }

    Ok(())
}

#[post("/api/admin/riwayat-pemeriksaan/insert")]
pub async fn insert_riwayat(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<RiwayatRequest>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    if let Err(e) = data.validate(false) {
        return resp::bad_request(e);
    }
    if let Err(resp) = check_exam_references(pool.get_ref(), &data).await {
        return resp;
    }

    let duplicate = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM riwayat_pemeriksaan WHERE id_balita = ? AND tanggal = ? \
         AND id_intervensi = ? AND id_laporan_masyarakat = ? AND deleted_date IS NULL",
        &[
            &data.id_balita,
            &data.tanggal,
            &data.id_intervensi,
            &data.id_laporan_masyarakat,
        ],
    )
    .await
    .unwrap_or(0);
    if duplicate > 0 {
        return resp::bad_request(
            "An examination for this balita, intervensi and laporan on this date already exists",
        );
    }

    let result = sqlx::query(
        "INSERT INTO riwayat_pemeriksaan (id_balita, id_intervensi, id_laporan_masyarakat, \
         tanggal, berat_badan, tinggi_badan, status_gizi, keterangan, created_id, \
         created_date) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&data.id_balita)
    .bind(&data.id_intervensi)
    .bind(&data.id_laporan_masyarakat)
    .bind(&data.tanggal)
    .bind(data.berat_badan)
    .bind(data.tinggi_badan)
    .bind(&data.status_gizi)
    .bind(&data.keterangan)
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => resp::ok(
            "Riwayat pemeriksaan inserted successfully",
            Some(json!({ "id": res.last_insert_id().to_string() })),
        ),
        Err(e) => {
            log::error!("Insert riwayat gagal: {:?}", e);
            resp::internal("Failed to insert riwayat pemeriksaan")
        }
    }
}

#[put("/api/admin/riwayat-pemeriksaan/update")]
pub async fn update_riwayat(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<RiwayatRequest>,
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
        "SELECT COUNT(*) FROM riwayat_pemeriksaan WHERE id = ? AND deleted_date IS NULL",
        &[&data.id],
    )
    .await;
    match exists {
        Ok(0) => return resp::not_found("Riwayat pemeriksaan not found"),
        Ok(_) => {}
        Err(e) => {
            log::error!("Cek riwayat gagal: {:?}", e);
            return resp::internal("Failed to check riwayat existence");
        }
    }

    if let Err(resp) = check_exam_references(pool.get_ref(), &data).await {
        return resp;
    }

    let duplicate = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM riwayat_pemeriksaan WHERE id_balita = ? AND tanggal = ? \
         AND id_intervensi = ? AND id_laporan_masyarakat = ? AND id != ? \
         AND deleted_date IS NULL",
        &[
            &data.id_balita,
            &data.tanggal,
            &data.id_intervensi,
            &data.id_laporan_masyarakat,
            &data.id,
        ],
    )
    .await
    .unwrap_or(0);
    if duplicate > 0 {
        return resp::bad_request(
            "An examination for this balita, intervensi and laporan on this date already exists",
        );
    }

    let result = sqlx::query(
        "UPDATE riwayat_pemeriksaan SET id_balita = ?, id_intervensi = ?, \
         id_laporan_masyarakat = ?, tanggal = ?, berat_badan = ?, tinggi_badan = ?, \
         status_gizi = ?, keterangan = ?, updated_id = ?, updated_date = ? \
         WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(&data.id_balita)
    .bind(&data.id_intervensi)
    .bind(&data.id_laporan_masyarakat)
    .bind(&data.tanggal)
    .bind(data.berat_badan)
    .bind(data.tinggi_badan)
    .bind(&data.status_gizi)
    .bind(&data.keterangan)
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => resp::ok(
            "Riwayat pemeriksaan updated successfully",
            Some(json!({ "id": data.id })),
        ),
        Ok(_) => resp::not_found("Riwayat pemeriksaan not found"),
        Err(e) => {
            log::error!("Update riwayat gagal: {:?}", e);
            resp::internal("Failed to update riwayat pemeriksaan")
        }
    }
}

#[delete("/api/admin/riwayat-pemeriksaan/delete")]
pub async fn delete_riwayat(
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
        return resp::bad_request("Riwayat pemeriksaan ID is required");
    }

    let result = sqlx::query(
        "UPDATE riwayat_pemeriksaan SET deleted_id = ?, deleted_date = ? \
         WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => resp::ok(
            "Riwayat pemeriksaan deleted successfully",
            Some(json!({ "id": data.id })),
        ),
        Ok(_) => resp::not_found("Riwayat pemeriksaan not found or already deleted"),
        Err(e) => {
            log::error!("Hapus riwayat gagal: {:?}", e);
            resp::internal("Failed to delete riwayat pemeriksaan")
        }
    }
}

#[post("/api/admin/riwayat-pemeriksaan/restore")]
pub async fn restore_riwayat(
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
        return resp::bad_request("Riwayat pemeriksaan ID is required");
    }

    let row = sqlx::query(
        "SELECT (SELECT COUNT(*) FROM balita b WHERE b.id = rp.id_balita \
          AND b.deleted_date IS NULL) AS balita_live, \
         (SELECT COUNT(*) FROM intervensi i WHERE i.id = rp.id_intervensi \
          AND i.deleted_date IS NULL) AS intervensi_live, \
         (SELECT COUNT(*) FROM laporan_masyarakat lm WHERE lm.id = rp.id_laporan_masyarakat \
          AND lm.deleted_date IS NULL) AS laporan_live \
         FROM riwayat_pemeriksaan rp WHERE rp.id = ? AND rp.deleted_date IS NOT NULL",
    )
    .bind(&data.id)
    .fetch_optional(pool.get_ref())
    .await;

    match row {
        Ok(Some(row)) => {
            if row.get::<i64, _>("balita_live") == 0
                || row.get::<i64, _>("intervensi_live") == 0
                || row.get::<i64, _>("laporan_live") == 0
            {
                return resp::bad_request(
                    "Cannot restore riwayat pemeriksaan. A referenced record is deleted",
                );
            }
        }
        Ok(None) => return resp::not_found("Riwayat pemeriksaan not found or not deleted"),
        Err(e) => {
            log::error!("Cek riwayat terhapus gagal: {:?}", e);
            return resp::internal("Failed to check riwayat existence");
        }
    }

    let result = sqlx::query(
        "UPDATE riwayat_pemeriksaan SET deleted_id = NULL, deleted_date = NULL, \
         updated_id = ?, updated_date = ? WHERE id = ? AND deleted_date IS NOT NULL",
    )
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => resp::ok(
            "Riwayat pemeriksaan restored successfully",
            Some(json!({ "id": data.id })),
        ),
        Ok(_) => resp::not_found("Riwayat pemeriksaan not found or not deleted"),
        Err(e) => {
            log::error!("Pulihkan riwayat gagal: {:?}", e);
            resp::internal("Failed to restore riwayat pemeriksaan")
        }
    }
}
