//community_controller.rs
//Endpoint untuk akun masyarakat. Semua data dibatasi ke keluarga yang
//dibuat oleh pengguna yang sedang login (created_id di keluarga).
use crate::auth::{self, JwtConfig};
use crate::db;
use crate::models::balita::BalitaRequest;
use crate::models::geojson::{parse_wkt_point, point_to_wkt};
use crate::models::keluarga::KeluargaRequest;
use crate::models::laporan::{self, LaporanRequest};
use crate::models::response as resp;
use crate::utils;

use actix_web::{get, post, put, web, HttpRequest, HttpResponse};
use chrono::Local;
use serde_json::{json, Value};
use sqlx::MySqlPool;
use sqlx::Row;

use super::keluarga_controller::{check_identity_conflicts, kelurahan_exists};
use super::master_data_controller::{kecamatan_list, kelurahan_list, KelurahanQuery};
use super::skpd_controller::IdQuery;

const MAX_BALITA_PER_KELUARGA: i64 = 10;
const MAX_LAPORAN_PER_BULAN: i64 = 10;

/// Id masyarakat milik pengguna login. 401 kalau akun belum punya
/// profil masyarakat (misalnya baru register_admin).
async fn masyarakat_profile(pool: &MySqlPool, user_id: &str) -> Result<String, HttpResponse> {
    let row = sqlx::query(
        "SELECT CAST(m.id AS CHAR) AS id FROM masyarakat m \
         JOIN pengguna p ON m.id_pengguna = p.id WHERE p.id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await;

    match row {
        Ok(Some(row)) => Ok(row.get("id")),
        Ok(None) => Err(resp::unauthorized("Masyarakat profile not found")),
        Err(e) => {
            log::error!("Cek profil masyarakat gagal: {:?}", e);
            Err(resp::internal("Failed to check masyarakat profile"))
        }
    }
}

// MARK: keluarga

fn select_keluarga_warga() -> String {
    format!(
        "SELECT CAST(k.id AS CHAR) AS id, k.nomor_kk, \
         k.nama_ayah, k.nama_ibu, k.nik_ayah, k.nik_ibu, k.alamat, k.rt, k.rw, \
         CAST(k.id_kelurahan AS CHAR) AS id_kelurahan, kel.kelurahan, kec.kecamatan, \
         ST_AsText(k.koordinat) AS koordinat_wkt, \
         DATE_FORMAT(k.created_date, '%Y-%m-%d %H:%i:%s') AS created_date, \
         DATE_FORMAT(k.updated_date, '%Y-%m-%d %H:%i:%s') AS updated_date, \
         (SELECT COUNT(*) FROM balita b WHERE b.id_keluarga = k.id \
          AND b.deleted_date IS NULL) AS jumlah_balita, \
         (SELECT COUNT(*) FROM laporan_masyarakat lm \
          JOIN balita b ON lm.id_balita = b.id \
          WHERE b.id_keluarga = k.id AND lm.deleted_date IS NULL \
          AND b.deleted_date IS NULL) AS jumlah_laporan, \
         (SELECT GROUP_CONCAT(sl.status) FROM laporan_masyarakat lm \
          JOIN balita b ON lm.id_balita = b.id \
          JOIN status_laporan sl ON lm.id_status_laporan = sl.id \
          WHERE b.id_keluarga = k.id AND lm.deleted_date IS NULL \
          AND b.deleted_date IS NULL \
          AND sl.status IN ({aktif})) AS status_laporan_aktif \
         FROM keluarga k \
         LEFT JOIN kelurahan kel ON k.id_kelurahan = kel.id \
         LEFT JOIN kecamatan kec ON kel.id_kecamatan = kec.id",
        aktif = laporan::active_statuses_sql()
    )
}

fn keluarga_warga_row_to_json(row: &sqlx::mysql::MySqlRow) -> Value {
    let wkt: String = row.get("koordinat_wkt");
    let (lon, lat) = parse_wkt_point(&wkt);
    let aktif: Option<String> = row.get("status_laporan_aktif");
    let can_edit = aktif.as_deref().map_or(true, str::is_empty);
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
        "kelurahan": row.get::<Option<String>, _>("kelurahan"),
        "kecamatan": row.get::<Option<String>, _>("kecamatan"),
        "koordinat": [lon, lat],
        "created_date": row.get::<Option<String>, _>("created_date"),
        "updated_date": row.get::<Option<String>, _>("updated_date"),
        "jumlah_balita": row.get::<i64, _>("jumlah_balita"),
        "jumlah_laporan": row.get::<i64, _>("jumlah_laporan"),
        "status_laporan_aktif": aktif,
        "can_edit": can_edit,
    })
}

#[get("/api/community/keluarga/get")]
pub async fn get_keluarga_warga(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<IdQuery>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_MASYARAKAT) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };
    if let Err(resp) = masyarakat_profile(pool.get_ref(), &claims.user_id).await {
        return resp;
    }

    if let Some(id) = query.id.as_deref().filter(|s| !s.is_empty()) {
        let sql = format!(
            "{} WHERE k.id = ? AND k.created_id = ? AND k.deleted_date IS NULL",
            select_keluarga_warga()
        );
        return match sqlx::query(&sql)
            .bind(id)
            .bind(&claims.user_id)
            .fetch_optional(pool.get_ref())
            .await
        {
            Ok(Some(row)) => resp::ok(
                "Keluarga retrieved successfully",
                Some(json!({ "data": keluarga_warga_row_to_json(&row) })),
            ),
            Ok(None) => resp::not_found("Keluarga not found or not owned by you"),
            Err(e) => {
                log::error!("Query keluarga warga gagal: {:?}", e);
                resp::internal("Failed to get keluarga")
            }
        };
    }

    let sql = format!(
        "{} WHERE k.created_id = ? AND k.deleted_date IS NULL ORDER BY k.created_date DESC",
        select_keluarga_warga()
    );
    match sqlx::query(&sql)
        .bind(&claims.user_id)
        .fetch_all(pool.get_ref())
        .await
    {
        Ok(rows) => {
            let list: Vec<Value> = rows.iter().map(keluarga_warga_row_to_json).collect();
            let total = list.len();
            resp::ok(
                "All keluarga retrieved successfully",
                Some(json!({ "data": list, "total": total })),
            )
        }
        Err(e) => {
            log::error!("Query daftar keluarga warga gagal: {:?}", e);
            resp::internal("Failed to get keluarga list")
        }
    }
}

#[post("/api/community/keluarga/insert")]
pub async fn insert_keluarga_warga(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<KeluargaRequest>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_MASYARAKAT) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };
    if let Err(resp) = masyarakat_profile(pool.get_ref(), &claims.user_id).await {
        return resp;
    }

    if let Err(e) = data.validate(false) {
        return resp::bad_request(e);
    }
    if let Err(resp) = check_identity_conflicts(pool.get_ref(), &data, None).await {
        return resp;
    }
    match kelurahan_exists(pool.get_ref(), &data.id_kelurahan).await {
        Ok(true) => {}
        Ok(false) => return resp::bad_request("Kelurahan not found"),
        Err(e) => {
            log::error!("Cek kelurahan gagal: {:?}", e);
            return resp::internal("Failed to check kelurahan");
        }
    }

    let wkt = point_to_wkt(data.koordinat[0], data.koordinat[1]);
    let result = sqlx::query(
        "INSERT INTO keluarga (nomor_kk, nama_ayah, nama_ibu, nik_ayah, nik_ibu, \
         alamat, rt, rw, id_kelurahan, koordinat, created_id, created_date) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ST_GeomFromText(?), ?, ?)",
    )
    .bind(&data.nomor_kk)
    .bind(&data.nama_ayah)
    .bind(&data.nama_ibu)
    .bind(&data.nik_ayah)
    .bind(&data.nik_ibu)
    .bind(&data.alamat)
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
            log::error!("Insert keluarga warga gagal: {:?}", e);
            resp::internal("Failed to insert keluarga")
        }
    }
}

/// Jumlah laporan aktif yang menggantung di bawah satu keluarga.
async fn active_reports_for_keluarga(pool: &MySqlPool, id: &str) -> Result<i64, sqlx::Error> {
    let sql = format!(
        "SELECT COUNT(*) FROM laporan_masyarakat lm \
         JOIN balita b ON lm.id_balita = b.id \
         JOIN status_laporan sl ON lm.id_status_laporan = sl.id \
         WHERE b.id_keluarga = ? AND lm.deleted_date IS NULL \
         AND b.deleted_date IS NULL AND sl.status IN ({})",
        laporan::active_statuses_sql()
    );
    db::count(pool, &sql, &[id]).await
}

#[put("/api/community/keluarga/update")]
pub async fn update_keluarga_warga(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<KeluargaRequest>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_MASYARAKAT) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };
    if let Err(resp) = masyarakat_profile(pool.get_ref(), &claims.user_id).await {
        return resp;
    }

    if let Err(e) = data.validate(true) {
        return resp::bad_request(e);
    }

    let current = sqlx::query(
        "SELECT CAST(created_id AS CHAR) AS created_id, \
         DATE_FORMAT(deleted_date, '%Y-%m-%d %H:%i:%s') AS deleted_date \
         FROM keluarga WHERE id = ?",
    )
    .bind(&data.id)
    .fetch_optional(pool.get_ref())
    .await;
    match current {
        Ok(Some(row)) => {
            if row.get::<Option<String>, _>("deleted_date").is_some() {
                return resp::not_found("Keluarga has been deleted");
            }
            if row.get::<String, _>("created_id") != claims.user_id {
                return resp::forbidden(
                    "Access denied. You can only update your own keluarga data",
                );
            }
        }
        Ok(None) => return resp::not_found("Keluarga not found"),
        Err(e) => {
            log::error!("Cek keluarga gagal: {:?}", e);
            return resp::internal("Failed to check keluarga existence");
        }
    }

    match active_reports_for_keluarga(pool.get_ref(), &data.id).await {
        Ok(0) => {}
        Ok(n) => {
            return resp::conflict(format!(
                "Cannot update keluarga data. There are {} active reports that need to be processed first",
                n
            ))
        }
        Err(e) => {
            log::error!("Cek laporan aktif gagal: {:?}", e);
            return resp::internal("Failed to check active reports");
        }
    }

    if let Err(resp) = check_identity_conflicts(pool.get_ref(), &data, Some(&data.id)).await {
        return resp;
    }
    match kelurahan_exists(pool.get_ref(), &data.id_kelurahan).await {
        Ok(true) => {}
        Ok(false) => return resp::bad_request("Kelurahan not found"),
        Err(e) => {
            log::error!("Cek kelurahan gagal: {:?}", e);
            return resp::internal("Failed to check kelurahan");
        }
    }

    let wkt = point_to_wkt(data.koordinat[0], data.koordinat[1]);
    let result = sqlx::query(
        "UPDATE keluarga SET nomor_kk = ?, nama_ayah = ?, nama_ibu = ?, nik_ayah = ?, \
         nik_ibu = ?, alamat = ?, rt = ?, rw = ?, id_kelurahan = ?, \
         koordinat = ST_GeomFromText(?), updated_id = ?, updated_date = ? \
         WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(&data.nomor_kk)
    .bind(&data.nama_ayah)
    .bind(&data.nama_ibu)
    .bind(&data.nik_ayah)
    .bind(&data.nik_ibu)
    .bind(&data.alamat)
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
            log::error!("Update keluarga warga gagal: {:?}", e);
            resp::internal("Failed to update keluarga")
        }
    }
}

// MARK: balita

fn select_balita_warga() -> String {
    format!(
        "SELECT CAST(b.id AS CHAR) AS id, \
         CAST(b.id_keluarga AS CHAR) AS id_keluarga, b.nama, \
         DATE_FORMAT(b.tanggal_lahir, '%Y-%m-%d') AS tanggal_lahir, b.jenis_kelamin, \
         CAST(b.berat_lahir AS DOUBLE) AS berat_lahir, \
         CAST(b.tinggi_lahir AS DOUBLE) AS tinggi_lahir, \
         DATE_FORMAT(b.created_date, '%Y-%m-%d %H:%i:%s') AS created_date, \
         DATE_FORMAT(b.updated_date, '%Y-%m-%d %H:%i:%s') AS updated_date, \
         k.nomor_kk, k.nama_ayah, k.nama_ibu, kel.kelurahan, kec.kecamatan, \
         (SELECT COUNT(*) FROM laporan_masyarakat lm WHERE lm.id_balita = b.id \
          AND lm.deleted_date IS NULL) AS jumlah_laporan, \
         (SELECT GROUP_CONCAT(sl.status) FROM laporan_masyarakat lm \
          JOIN status_laporan sl ON lm.id_status_laporan = sl.id \
          WHERE lm.id_balita = b.id AND lm.deleted_date IS NULL \
          AND sl.status IN ({aktif})) AS status_laporan_aktif, \
         (SELECT rp.status_gizi FROM riwayat_pemeriksaan rp WHERE rp.id_balita = b.id \
          AND rp.deleted_date IS NULL ORDER BY rp.tanggal DESC, rp.created_date DESC LIMIT 1) \
          AS status_gizi_terakhir, \
         (SELECT DATE_FORMAT(rp.tanggal, '%Y-%m-%d') FROM riwayat_pemeriksaan rp \
          WHERE rp.id_balita = b.id AND rp.deleted_date IS NULL \
          ORDER BY rp.tanggal DESC, rp.created_date DESC LIMIT 1) \
          AS tanggal_pemeriksaan_terakhir \
         FROM balita b \
         JOIN keluarga k ON b.id_keluarga = k.id \
         LEFT JOIN kelurahan kel ON k.id_kelurahan = kel.id \
         LEFT JOIN kecamatan kec ON kel.id_kecamatan = kec.id",
        aktif = laporan::active_statuses_sql()
    )
}

fn balita_warga_row_to_json(row: &sqlx::mysql::MySqlRow) -> Value {
    let tanggal_lahir: String = row.get("tanggal_lahir");
    let umur = utils::parse_date(&tanggal_lahir)
        .map(|birth| utils::format_age(birth, Local::now().date_naive()))
        .unwrap_or_default();
    let aktif: Option<String> = row.get("status_laporan_aktif");
    let can_edit = aktif.as_deref().map_or(true, str::is_empty);
    let can_report = !aktif
        .as_deref()
        .unwrap_or("")
        .contains(laporan::STATUS_BELUM_DIPROSES);
    json!({
        "id": row.get::<String, _>("id"),
        "id_keluarga": row.get::<String, _>("id_keluarga"),
        "nama": row.get::<String, _>("nama"),
        "tanggal_lahir": tanggal_lahir,
        "jenis_kelamin": row.get::<String, _>("jenis_kelamin"),
        "berat_lahir": row.get::<f64, _>("berat_lahir"),
        "tinggi_lahir": row.get::<f64, _>("tinggi_lahir"),
        "umur": umur,
        "nomor_kk": row.get::<String, _>("nomor_kk"),
        "nama_ayah": row.get::<String, _>("nama_ayah"),
        "nama_ibu": row.get::<String, _>("nama_ibu"),
        "kelurahan": row.get::<Option<String>, _>("kelurahan"),
        "kecamatan": row.get::<Option<String>, _>("kecamatan"),
        "created_date": row.get::<Option<String>, _>("created_date"),
        "updated_date": row.get::<Option<String>, _>("updated_date"),
        "jumlah_laporan": row.get::<i64, _>("jumlah_laporan"),
        "status_laporan_aktif": aktif,
        "status_gizi_terakhir": row.get::<Option<String>, _>("status_gizi_terakhir"),
        "tanggal_pemeriksaan_terakhir": row.get::<Option<String>, _>("tanggal_pemeriksaan_terakhir"),
        "can_edit": can_edit,
        "can_report": can_report,
    })
}

#[get("/api/community/balita/get")]
pub async fn get_balita_warga(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<IdQuery>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_MASYARAKAT) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };
    if let Err(resp) = masyarakat_profile(pool.get_ref(), &claims.user_id).await {
        return resp;
    }

    if let Some(id) = query.id.as_deref().filter(|s| !s.is_empty()) {
        let sql = format!(
            "{} WHERE b.id = ? AND k.created_id = ? \
             AND b.deleted_date IS NULL AND k.deleted_date IS NULL",
            select_balita_warga()
        );
        return match sqlx::query(&sql)
            .bind(id)
            .bind(&claims.user_id)
            .fetch_optional(pool.get_ref())
            .await
        {
            Ok(Some(row)) => resp::ok(
                "Balita retrieved successfully",
                Some(json!({ "data": balita_warga_row_to_json(&row) })),
            ),
            Ok(None) => resp::not_found("Balita not found or not owned by you"),
            Err(e) => {
                log::error!("Query balita warga gagal: {:?}", e);
                resp::internal("Failed to get balita")
            }
        };
    }

    let sql = format!(
        "{} WHERE k.created_id = ? AND b.deleted_date IS NULL \
         AND k.deleted_date IS NULL ORDER BY b.created_date DESC",
        select_balita_warga()
    );
    match sqlx::query(&sql)
        .bind(&claims.user_id)
        .fetch_all(pool.get_ref())
        .await
    {
        Ok(rows) => {
            let list: Vec<Value> = rows.iter().map(balita_warga_row_to_json).collect();
            let total = list.len();
            resp::ok(
                "All balita retrieved successfully",
                Some(json!({ "data": list, "total": total })),
            )
        }
        Err(e) => {
            log::error!("Query daftar balita warga gagal: {:?}", e);
            resp::internal("Failed to get balita list")
        }
    }
}

#[put("/api/community/balita/update")]
pub async fn update_balita_warga(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<BalitaRequest>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_MASYARAKAT) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };
    if let Err(resp) = masyarakat_profile(pool.get_ref(), &claims.user_id).await {
        return resp;
    }

    if let Err(e) = data.validate(true) {
        return resp::bad_request(e);
    }

    let current = sqlx::query(
        "SELECT CAST(b.id_keluarga AS CHAR) AS id_keluarga, \
         CAST(k.created_id AS CHAR) AS created_id, \
         DATE_FORMAT(b.deleted_date, '%Y-%m-%d %H:%i:%s') AS deleted_date \
         FROM balita b JOIN keluarga k ON b.id_keluarga = k.id WHERE b.id = ?",
    )
    .bind(&data.id)
    .fetch_optional(pool.get_ref())
    .await;
    let current_keluarga = match current {
        Ok(Some(row)) => {
            if row.get::<Option<String>, _>("deleted_date").is_some() {
                return resp::not_found("Balita has been deleted");
            }
            if row.get::<String, _>("created_id") != claims.user_id {
                return resp::forbidden(
                    "Access denied. You can only update balita from your own keluarga",
                );
            }
            row.get::<String, _>("id_keluarga")
        }
        Ok(None) => return resp::not_found("Balita not found or keluarga has been deleted"),
        Err(e) => {
            log::error!("Cek balita gagal: {:?}", e);
            return resp::internal("Failed to check balita existence");
        }
    };

    // Laporan yang masih berjalan mengunci data balita
    let active_sql = format!(
        "SELECT COUNT(*) FROM laporan_masyarakat lm \
         JOIN status_laporan sl ON lm.id_status_laporan = sl.id \
         WHERE lm.id_balita = ? AND lm.deleted_date IS NULL \
         AND sl.status IN ({})",
        laporan::active_statuses_sql()
    );
    let active = db::count(pool.get_ref(), &active_sql, &[&data.id])
        .await
        .unwrap_or(0);
    if active > 0 {
        return resp::conflict(format!(
            "Cannot update balita data. There are {} active reports that need to be processed first",
            active
        ));
    }

    // Pindah keluarga hanya ke keluarga milik sendiri, dengan batas isi
    if data.id_keluarga != current_keluarga {
        let target = sqlx::query(
            "SELECT CAST(created_id AS CHAR) AS created_id FROM keluarga \
             WHERE id = ? AND deleted_date IS NULL",
        )
        .bind(&data.id_keluarga)
        .fetch_optional(pool.get_ref())
        .await;
        match target {
            Ok(Some(row)) => {
                if row.get::<String, _>("created_id") != claims.user_id {
                    return resp::forbidden(
                        "Access denied. You can only move balita to your own keluarga",
                    );
                }
            }
            Ok(None) => return resp::bad_request("New keluarga not found"),
            Err(e) => {
                log::error!("Cek keluarga tujuan gagal: {:?}", e);
                return resp::internal("Failed to check keluarga existence");
            }
        }

        let occupancy = db::count(
            pool.get_ref(),
            "SELECT COUNT(*) FROM balita WHERE id_keluarga = ? AND deleted_date IS NULL",
            &[&data.id_keluarga],
        )
        .await
        .unwrap_or(0);
        if occupancy >= MAX_BALITA_PER_KELUARGA {
            return resp::bad_request(format!(
                "Keluarga already has the maximum of {} balita",
                MAX_BALITA_PER_KELUARGA
            ));
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
            "Balita with same name and birth date already exists in this keluarga",
        );
    }

    let result = sqlx::query(
        "UPDATE balita SET id_keluarga = ?, nama = ?, tanggal_lahir = ?, \
         jenis_kelamin = ?, berat_lahir = ?, tinggi_lahir = ?, updated_id = ?, \
         updated_date = ? WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(&data.id_keluarga)
    .bind(&data.nama)
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
        Ok(res) if res.rows_affected() > 0 => resp::ok(
            "Balita updated successfully",
            Some(json!({ "id": data.id })),
        ),
        Ok(_) => resp::not_found("Balita not found or already deleted"),
        Err(e) => {
            log::error!("Update balita warga gagal: {:?}", e);
            resp::internal("Failed to update balita")
        }
    }
}

// MARK: laporan

const SELECT_LAPORAN_WARGA: &str = "SELECT CAST(lm.id AS CHAR) AS id, \
    CAST(lm.id_balita AS CHAR) AS id_balita, \
    CAST(lm.id_status_laporan AS CHAR) AS id_status_laporan, \
    DATE_FORMAT(lm.tanggal_laporan, '%Y-%m-%d') AS tanggal_laporan, \
    lm.hubungan_dengan_balita, lm.nomor_hp_pelapor, lm.nomor_hp_keluarga_balita, \
    DATE_FORMAT(lm.created_date, '%Y-%m-%d %H:%i:%s') AS created_date, \
    DATE_FORMAT(lm.updated_date, '%Y-%m-%d %H:%i:%s') AS updated_date, \
    b.nama AS nama_balita, k.nomor_kk, k.nama_ayah, k.nama_ibu, k.alamat, \
    kel.kelurahan, kec.kecamatan, sl.status AS status_laporan, \
    (SELECT COUNT(*) FROM riwayat_pemeriksaan rp WHERE rp.id_balita = lm.id_balita \
     AND rp.deleted_date IS NULL) AS riwayat_pemeriksaan, \
    (SELECT COUNT(*) FROM intervensi i WHERE i.id_balita = lm.id_balita \
     AND i.deleted_date IS NULL) AS intervensi_terkait, \
    CASE WHEN sl.status != 'Belum diproses' \
     THEN DATE_FORMAT(lm.updated_date, '%Y-%m-%d %H:%i:%s') END \
     AS tanggal_terakhir_diproses \
    FROM laporan_masyarakat lm \
    JOIN balita b ON lm.id_balita = b.id AND b.deleted_date IS NULL \
    JOIN keluarga k ON b.id_keluarga = k.id AND k.deleted_date IS NULL \
    LEFT JOIN kelurahan kel ON k.id_kelurahan = kel.id \
    LEFT JOIN kecamatan kec ON kel.id_kecamatan = kec.id \
    JOIN status_laporan sl ON lm.id_status_laporan = sl.id";

fn laporan_warga_row_to_json(row: &sqlx::mysql::MySqlRow) -> Value {
    let status: String = row.get("status_laporan");
    json!({
        "id": row.get::<String, _>("id"),
        "id_balita": row.get::<String, _>("id_balita"),
        "id_status_laporan": row.get::<String, _>("id_status_laporan"),
        "tanggal_laporan": row.get::<String, _>("tanggal_laporan"),
        "hubungan_dengan_balita": row.get::<String, _>("hubungan_dengan_balita"),
        "nomor_hp_pelapor": row.get::<String, _>("nomor_hp_pelapor"),
        "nomor_hp_keluarga_balita": row.get::<String, _>("nomor_hp_keluarga_balita"),
        "created_date": row.get::<Option<String>, _>("created_date"),
        "updated_date": row.get::<Option<String>, _>("updated_date"),
        "nama_balita": row.get::<String, _>("nama_balita"),
        "nomor_kk": row.get::<String, _>("nomor_kk"),
        "nama_ayah": row.get::<String, _>("nama_ayah"),
        "nama_ibu": row.get::<String, _>("nama_ibu"),
        "alamat": row.get::<String, _>("alamat"),
        "kelurahan": row.get::<Option<String>, _>("kelurahan"),
        "kecamatan": row.get::<Option<String>, _>("kecamatan"),
        "status_laporan": status,
        "status_keterangan": laporan::status_keterangan(&status),
        "can_edit": status == laporan::STATUS_BELUM_DIPROSES,
        "riwayat_pemeriksaan": row.get::<i64, _>("riwayat_pemeriksaan"),
        "intervensi_terkait": row.get::<i64, _>("intervensi_terkait"),
        "tanggal_terakhir_diproses": row.get::<Option<String>, _>("tanggal_terakhir_diproses"),
    })
}

#[get("/api/community/laporan/get")]
pub async fn get_laporan_warga(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<IdQuery>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_MASYARAKAT) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };
    let masyarakat_id = match masyarakat_profile(pool.get_ref(), &claims.user_id).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if let Some(id) = query.id.as_deref().filter(|s| !s.is_empty()) {
        let sql = format!(
            "{SELECT_LAPORAN_WARGA} WHERE lm.id = ? AND lm.id_masyarakat = ? \
             AND lm.deleted_date IS NULL"
        );
        return match sqlx::query(&sql)
            .bind(id)
            .bind(&masyarakat_id)
            .fetch_optional(pool.get_ref())
            .await
        {
            Ok(Some(row)) => resp::ok(
                "Laporan retrieved successfully",
                Some(json!({ "data": laporan_warga_row_to_json(&row) })),
            ),
            Ok(None) => resp::not_found("Laporan not found or not owned by you"),
            Err(e) => {
                log::error!("Query laporan warga gagal: {:?}", e);
                resp::internal("Failed to get laporan")
            }
        };
    }

    let sql = format!(
        "{SELECT_LAPORAN_WARGA} WHERE lm.id_masyarakat = ? AND lm.deleted_date IS NULL \
         ORDER BY lm.created_date DESC"
    );
    match sqlx::query(&sql)
        .bind(&masyarakat_id)
        .fetch_all(pool.get_ref())
        .await
    {
        Ok(rows) => {
            let list: Vec<Value> = rows.iter().map(laporan_warga_row_to_json).collect();
            let total = list.len();
            resp::ok(
                "All laporan retrieved successfully",
                Some(json!({ "data": list, "total": total })),
            )
        }
        Err(e) => {
            log::error!("Query daftar laporan warga gagal: {:?}", e);
            resp::internal("Failed to get laporan list")
        }
    }
}

#[post("/api/community/laporan/insert")]
pub async fn insert_laporan_warga(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<LaporanRequest>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_MASYARAKAT) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };
    let masyarakat_id = match masyarakat_profile(pool.get_ref(), &claims.user_id).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    // Status dipaksa "Belum diproses", jadi id_status_laporan tidak wajib
    if let Err(e) = data.validate(false, false) {
        return resp::bad_request(e);
    }

    let balita = sqlx::query(
        "SELECT CAST(k.created_id AS CHAR) AS created_id FROM balita b \
         JOIN keluarga k ON b.id_keluarga = k.id \
         WHERE b.id = ? AND b.deleted_date IS NULL AND k.deleted_date IS NULL",
    )
    .bind(&data.id_balita)
    .fetch_optional(pool.get_ref())
    .await;
    match balita {
        Ok(Some(row)) => {
            if row.get::<String, _>("created_id") != claims.user_id {
                return resp::forbidden(
                    "Access denied. You can only report balita from your own keluarga",
                );
            }
        }
        Ok(None) => return resp::not_found("Balita not found or keluarga has been deleted"),
        Err(e) => {
            log::error!("Cek balita gagal: {:?}", e);
            return resp::internal("Failed to check balita existence");
        }
    }

    let pending = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM laporan_masyarakat lm \
         JOIN status_laporan sl ON lm.id_status_laporan = sl.id \
         WHERE lm.id_balita = ? AND lm.deleted_date IS NULL \
         AND sl.status = 'Belum diproses'",
        &[&data.id_balita],
    )
    .await
    .unwrap_or(0);
    if pending > 0 {
        return resp::conflict(
            "Cannot create new report. There is already a pending report for this balita that needs to be processed first",
        );
    }

    let duplicate = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM laporan_masyarakat WHERE id_balita = ? \
         AND tanggal_laporan = ? AND id_masyarakat = ? AND deleted_date IS NULL",
        &[&data.id_balita, &data.tanggal_laporan, &masyarakat_id],
    )
    .await
    .unwrap_or(0);
    if duplicate > 0 {
        return resp::bad_request("You have already reported this balita on the same date");
    }

    let current_month = Local::now().format("%Y-%m").to_string();
    let monthly = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM laporan_masyarakat WHERE id_masyarakat = ? \
         AND DATE_FORMAT(tanggal_laporan, '%Y-%m') = ? AND deleted_date IS NULL",
        &[&masyarakat_id, &current_month],
    )
    .await
    .unwrap_or(0);
    if monthly >= MAX_LAPORAN_PER_BULAN {
        return resp::bad_request(format!(
            "Monthly report limit reached. You have already submitted {} reports this month (max: {})",
            monthly, MAX_LAPORAN_PER_BULAN
        ));
    }

    let status = sqlx::query(
        "SELECT CAST(id AS CHAR) AS id FROM status_laporan WHERE status = ?",
    )
    .bind(laporan::STATUS_BELUM_DIPROSES)
    .fetch_optional(pool.get_ref())
    .await;
    let status_id: String = match status {
        Ok(Some(row)) => row.get("id"),
        Ok(None) => {
            log::error!("Status laporan default tidak ditemukan");
            return resp::internal("Failed to get default status laporan");
        }
        Err(e) => {
            log::error!("Cek status laporan gagal: {:?}", e);
            return resp::internal("Failed to get default status laporan");
        }
    };

    let result = sqlx::query(
        "INSERT INTO laporan_masyarakat (id_masyarakat, id_balita, id_status_laporan, \
         tanggal_laporan, hubungan_dengan_balita, nomor_hp_pelapor, \
         nomor_hp_keluarga_balita, created_id, created_date) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&masyarakat_id)
    .bind(&data.id_balita)
    .bind(&status_id)
    .bind(&data.tanggal_laporan)
    .bind(&data.hubungan_dengan_balita)
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
            log::error!("Insert laporan warga gagal: {:?}", e);
            resp::internal("Failed to insert laporan")
        }
    }
}

// MARK: master data

#[get("/api/community/master-kecamatan")]
pub async fn get_kecamatan_warga(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
) -> HttpResponse {
    if let Err(resp) =
        auth::require_any_role(&req, &jwt, &[auth::ROLE_MASYARAKAT, auth::ROLE_ADMIN])
    {
        return resp;
    }
    kecamatan_list(pool.get_ref()).await
}

#[get("/api/community/master-kelurahan")]
pub async fn get_kelurahan_warga(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<KelurahanQuery>,
) -> HttpResponse {
    if let Err(resp) =
        auth::require_any_role(&req, &jwt, &[auth::ROLE_MASYARAKAT, auth::ROLE_ADMIN])
    {
        return resp;
    }
    kelurahan_list(
        pool.get_ref(),
        query.id_kecamatan.as_deref().filter(|s| !s.is_empty()),
    )
    .await
}

#[get("/api/community/master-status-laporan")]
pub async fn get_status_laporan_warga(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
) -> HttpResponse {
    if let Err(resp) =
        auth::require_any_role(&req, &jwt, &[auth::ROLE_MASYARAKAT, auth::ROLE_ADMIN])
    {
        return resp;
    }

    let rows = sqlx::query(
        "SELECT CAST(id AS CHAR) AS id, status FROM status_laporan ORDER BY id ASC",
    )
    .fetch_all(pool.get_ref())
    .await;
    match rows {
        Ok(rows) => {
            let list: Vec<Value> = rows
                .iter()
                .map(|row| {
                    json!({
                        "id": row.get::<String, _>("id"),
                        "status": row.get::<String, _>("status"),
                        "keterangan": laporan::status_keterangan(&row.get::<String, _>("status")),
                    })
                })
                .collect();
            let total = list.len();
            resp::ok(
                "Status laporan master data retrieved successfully",
                Some(json!({ "data": list, "total": total })),
            )
        }
        Err(e) => {
            log::error!("Query status laporan gagal: {:?}", e);
            resp::internal("Failed to get status laporan list")
        }
    }
}
