//keluarga_controller.rs
use crate::auth::{self, JwtConfig};
use crate::db;
use crate::models::geojson;
use crate::models::keluarga::KeluargaRequest;
use crate::models::response as resp;
use crate::utils;

use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use serde_json::{json, Value};
use sqlx::MySqlPool;
use sqlx::Row;

use super::skpd_controller::{IdBody, IdQuery};

const SELECT_KELUARGA: &str = "SELECT CAST(k.id AS CHAR) AS id, k.nomor_kk, k.nama_ayah, \
    k.nama_ibu, k.nik_ayah, k.nik_ibu, k.alamat, k.rt, k.rw, \
    CAST(k.id_kelurahan AS CHAR) AS id_kelurahan, kel.kelurahan, kec.kecamatan, \
    ST_AsText(k.koordinat) AS koordinat, \
    DATE_FORMAT(k.created_date, '%Y-%m-%d %H:%i:%s') AS created_date, \
    DATE_FORMAT(k.updated_date, '%Y-%m-%d %H:%i:%s') AS updated_date \
    FROM keluarga k \
    JOIN kelurahan kel ON k.id_kelurahan = kel.id \
    JOIN kecamatan kec ON kel.id_kecamatan = kec.id";

pub(super) fn keluarga_row_to_json(row: &sqlx::mysql::MySqlRow) -> Value {
    let wkt: Option<String> = row.get("koordinat");
    let (lon, lat) = geojson::parse_wkt_point(wkt.as_deref().unwrap_or(""));
    json!({
        "id": row.get::<String, _>("id"),
        "nomor_kk": row.get::<String, _>("nomor_kk"),
        "nama_ayah": row.get::<String, _>("nama_ayah"),
        "nama_ibu": row.get::<String, _>("nama_ibu"),
        "nik_ayah": row.get::<String, _>("nik_ayah"),
        "nik_ibu": row.get::<String, _>("nik_ibu"),
        "alamat": row.get::<String, _>("alamat"),
        "rt": row.get::<String, _>("rt"),
        "rw": row.get::<String, _>("rw"),
        "id_kelurahan": row.get::<String, _>("id_kelurahan"),
        "kelurahan": row.get::<String, _>("kelurahan"),
        "kecamatan": row.get::<String, _>("kecamatan"),
        "koordinat": [lon, lat],
        "created_date": row.get::<Option<String>, _>("created_date"),
        "updated_date": row.get::<Option<String>, _>("updated_date"),
    })
}

/// Cek duplikat nomor KK / NIK di antara baris hidup, opsional mengecualikan
/// satu id saat update.
pub(super) async fn check_identity_conflicts(
    pool: &MySqlPool,
    data: &KeluargaRequest,
    exclude_id: Option<&str>,
) -> Result<(), HttpResponse> {
    let checks = [
        ("nomor_kk", data.nomor_kk.as_str(), "nomor KK"),
        ("nik_ayah", data.nik_ayah.as_str(), "NIK ayah"),
        ("nik_ibu", data.nik_ibu.as_str(), "NIK ibu"),
    ];

    for (column, value, label) in checks {
        let (sql, binds): (String, Vec<&str>) = match exclude_id {
            Some(id) => (
                format!(
                    "SELECT COUNT(*) FROM keluarga WHERE {column} = ? AND id != ? \
                     AND deleted_date IS NULL"
                ),
                vec![value, id],
            ),
            None => (
                format!(
                    "SELECT COUNT(*) FROM keluarga WHERE {column} = ? AND deleted_date IS NULL"
                ),
                vec![value],
            ),
        };

        match db::count(pool, &sql, &binds).await {
            Ok(0) => {}
            Ok(_) => {
                return Err(resp::bad_request(format!(
                    "{} '{}' is already registered to another keluarga",
                    label, value
                )))
            }
            Err(e) => {
                log::error!("Cek duplikat {} gagal: {:?}", column, e);
                return Err(resp::internal("Failed to check keluarga uniqueness"));
            }
        }
    }

    Ok(())
}

pub(super) async fn kelurahan_exists(pool: &MySqlPool, id: &str) -> Result<bool, sqlx::Error> {
    db::count(pool, "SELECT COUNT(*) FROM kelurahan WHERE id = ?", &[id])
        .await
        .map(|n| n > 0)
}

#[get("/api/admin/keluarga/get")]
pub async fn get_keluarga(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<IdQuery>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }

    if let Some(id) = query.id.as_deref().filter(|s| !s.is_empty()) {
        let sql = format!("{SELECT_KELUARGA} WHERE k.id = ? AND k.deleted_date IS NULL");
        return match sqlx::query(&sql).bind(id).fetch_optional(pool.get_ref()).await {
            Ok(Some(row)) => resp::ok(
                "Keluarga retrieved successfully",
                Some(json!({ "data": keluarga_row_to_json(&row) })),
            ),
            Ok(None) => resp::not_found("Keluarga not found"),
            Err(e) => {
                log::error!("Query keluarga gagal: {:?}", e);
                resp::internal("Failed to get keluarga")
            }
        };
    }

    let sql = format!(
        "{SELECT_KELUARGA} WHERE k.deleted_date IS NULL ORDER BY k.created_date DESC"
    );
    match sqlx::query(&sql).fetch_all(pool.get_ref()).await {
        Ok(rows) => {
            let list: Vec<Value> = rows.iter().map(keluarga_row_to_json).collect();
            let total = list.len();
            resp::ok(
                "All keluarga retrieved successfully",
                Some(json!({ "data": list, "total": total })),
            )
        }
        Err(e) => {
            log::error!("Query daftar keluarga gagal: {:?}", e);
            resp::internal("Failed to get keluarga list")
        }
    }
}

#[post("/api/admin/keluarga/insert")]
pub async fn insert_keluarga(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<KeluargaRequest>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    if let Err(e) = data.validate(false) {
        return resp::bad_request(e);
    }

    match kelurahan_exists(pool.get_ref(), &data.id_kelurahan).await {
        Ok(true) => {}
        Ok(false) => return resp::bad_request("Kelurahan not found"),
        Err(e) => {
            log::error!("Cek kelurahan gagal: {:?}", e);
            return resp::internal("Failed to check kelurahan");
        }
    }

    if let Err(resp) = check_identity_conflicts(pool.get_ref(), &data, None).await {
        return resp;
    }

    let wkt = geojson::point_to_wkt(data.koordinat[0], data.koordinat[1]);
    let result = sqlx::query(
        "INSERT INTO keluarga (nomor_kk, nama_ayah, nama_ibu, nik_ayah, nik_ibu, alamat, \
         rt, rw, id_kelurahan, koordinat, created_id, created_date) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ST_GeomFromText(?), ?, ?)",
    )
    .bind(&data.nomor_kk)
    .bind(data.nama_ayah.trim())
    .bind(data.nama_ibu.trim())
    .bind(&data.nik_ayah)
    .bind(&data.nik_ibu)
    .bind(data.alamat.trim())
    .bind(&data.rt)
    .bind(&data.rw)
    .bind(&data.id_kelurahan)
    .bind(&wkt)
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => resp::ok(
            "Keluarga inserted successfully",
            Some(json!({ "id": res.last_insert_id().to_string() })),
        ),
        Err(e) => {
            log::error!("Insert keluarga gagal: {:?}", e);
            resp::internal("Failed to insert keluarga")
        }
    }
}

#[put("/api/admin/keluarga/update")]
pub async fn update_keluarga(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<KeluargaRequest>,
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
        "SELECT COUNT(*) FROM keluarga WHERE id = ? AND deleted_date IS NULL",
        &[&data.id],
    )
    .await;
    match exists {
        Ok(0) => return resp::not_found("Keluarga not found"),
        Ok(_) => {}
        Err(e) => {
            log::error!("Cek keluarga gagal: {:?}", e);
            return resp::internal("Failed to check keluarga existence");
        }
    }

    match kelurahan_exists(pool.get_ref(), &data.id_kelurahan).await {
        Ok(true) => {}
        Ok(false) => return resp::bad_request("Kelurahan not found"),
        Err(e) => {
            log::error!("Cek kelurahan gagal: {:?}", e);
            return resp::internal("Failed to check kelurahan");
        }
    }

    if let Err(resp) = check_identity_conflicts(pool.get_ref(), &data, Some(&data.id)).await {
        return resp;
    }

    let wkt = geojson::point_to_wkt(data.koordinat[0], data.koordinat[1]);
    let result = sqlx::query(
        "UPDATE keluarga SET nomor_kk = ?, nama_ayah = ?, nama_ibu = ?, nik_ayah = ?, \
         nik_ibu = ?, alamat = ?, rt = ?, rw = ?, id_kelurahan = ?, \
         koordinat = ST_GeomFromText(?), updated_id = ?, updated_date = ? \
         WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(&data.nomor_kk)
    .bind(data.nama_ayah.trim())
    .bind(data.nama_ibu.trim())
    .bind(&data.nik_ayah)
    .bind(&data.nik_ibu)
    .bind(data.alamat.trim())
    .bind(&data.rt)
    .bind(&data.rw)
    .bind(&data.id_kelurahan)
    .bind(&wkt)
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => resp::ok(
            "Keluarga updated successfully",
            Some(json!({ "id": data.id })),
        ),
        Ok(_) => resp::not_found("Keluarga not found"),
        Err(e) => {
            log::error!("Update keluarga gagal: {:?}", e);
            resp::internal("Failed to update keluarga")
        }
    }
}

#[delete("/api/admin/keluarga/delete")]
pub async fn delete_keluarga(
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
        return resp::bad_request("Keluarga ID is required");
    }

    let exists = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM keluarga WHERE id = ? AND deleted_date IS NULL",
        &[&data.id],
    )
    .await;
    match exists {
        Ok(0) => return resp::not_found("Keluarga not found"),
        Ok(_) => {}
        Err(e) => {
            log::error!("Cek keluarga gagal: {:?}", e);
            return resp::internal("Failed to check keluarga existence");
        }
    }

    let balita = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM balita WHERE id_keluarga = ? AND deleted_date IS NULL",
        &[&data.id],
    )
    .await
    .unwrap_or(0);
    if balita > 0 {
        return resp::bad_request(format!(
            "Cannot delete keluarga. There are {} active balita records in this keluarga",
            balita
        ));
    }

    let laporan = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM laporan_masyarakat lm \
         JOIN balita b ON lm.id_balita = b.id \
         WHERE b.id_keluarga = ? AND lm.deleted_date IS NULL",
        &[&data.id],
    )
    .await
    .unwrap_or(0);
    if laporan > 0 {
        return resp::bad_request(format!(
            "Cannot delete keluarga. There are {} active laporan records related to this keluarga",
            laporan
        ));
    }

    let result = sqlx::query(
        "UPDATE keluarga SET deleted_id = ?, deleted_date = ? \
         WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => resp::ok(
            "Keluarga deleted successfully",
            Some(json!({ "id": data.id })),
        ),
        Ok(_) => resp::not_found("Keluarga not found or already deleted"),
        Err(e) => {
            log::error!("Hapus keluarga gagal: {:?}", e);
            resp::internal("Failed to delete keluarga")
        }
    }
}

#[post("/api/admin/keluarga/restore")]
pub async fn restore_keluarga(
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
        return resp::bad_request("Keluarga ID is required");
    }

    let row = sqlx::query(
        "SELECT nomor_kk, nik_ayah, nik_ibu FROM keluarga \
         WHERE id = ? AND deleted_date IS NOT NULL",
    )
    .bind(&data.id)
    .fetch_optional(pool.get_ref())
    .await;

    let (nomor_kk, nik_ayah, nik_ibu) = match row {
        Ok(Some(row)) => (
            row.get::<String, _>("nomor_kk"),
            row.get::<String, _>("nik_ayah"),
            row.get::<String, _>("nik_ibu"),
        ),
        Ok(None) => return resp::not_found("Keluarga not found or not deleted"),
        Err(e) => {
            log::error!("Cek keluarga terhapus gagal: {:?}", e);
            return resp::internal("Failed to check keluarga existence");
        }
    };

    // Identitas harus tetap unik terhadap baris hidup sebelum dipulihkan
    let conflict = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM keluarga WHERE (nomor_kk = ? OR nik_ayah = ? OR nik_ibu = ?) \
         AND id != ? AND deleted_date IS NULL",
        &[&nomor_kk, &nik_ayah, &nik_ibu, &data.id],
    )
    .await
    .unwrap_or(0);
    if conflict > 0 {
        return resp::conflict(
            "Cannot restore keluarga. Another active keluarga already uses the same nomor KK or NIK",
        );
    }

    let result = sqlx::query(
        "UPDATE keluarga SET deleted_id = NULL, deleted_date = NULL, updated_id = ?, \
         updated_date = ? WHERE id = ? AND deleted_date IS NOT NULL",
    )
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => resp::ok(
            "Keluarga restored successfully",
            Some(json!({ "id": data.id })),
        ),
        Ok(_) => resp::not_found("Keluarga not found or not deleted"),
        Err(e) => {
            log::error!("Pulihkan keluarga gagal: {:?}", e);
            resp::internal("Failed to restore keluarga")
        }
    }
}
