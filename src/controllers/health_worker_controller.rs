//health_worker_controller.rs
//Daftar penugasan intervensi untuk petugas kesehatan yang login.
use crate::auth::{self, JwtConfig};
use crate::models::laporan;
use crate::models::response as resp;
use crate::utils;

use actix_web::{get, web, HttpRequest, HttpResponse};
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::MySqlPool;
use sqlx::Row;

#[derive(Debug, Deserialize)]
pub struct AssignmentFilter {
    pub id: Option<String>,
    pub status: Option<String>,
}

/// Id petugas_kesehatan milik pengguna login.
async fn petugas_profile(pool: &MySqlPool, user_id: &str) -> Result<String, HttpResponse> {
    let row = sqlx::query(
        "SELECT CAST(pk.id AS CHAR) AS id FROM petugas_kesehatan pk \
         JOIN pengguna p ON pk.id_pengguna = p.id \
         WHERE p.id = ? AND pk.deleted_date IS NULL",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await;

    match row {
        Ok(Some(row)) => Ok(row.get("id")),
        Ok(None) => Err(resp::unauthorized("Health worker profile not found")),
        Err(e) => {
            log::error!("Cek profil petugas gagal: {:?}", e);
            Err(resp::internal("Failed to check health worker profile"))
        }
    }
}

fn select_assigned() -> String {
    format!(
        "SELECT CAST(ip.id AS CHAR) AS id, \
         CAST(i.id AS CHAR) AS id_intervensi, CAST(i.id_balita AS CHAR) AS id_balita, \
         i.jenis AS jenis_intervensi, \
         DATE_FORMAT(i.tanggal, '%Y-%m-%d') AS tanggal_intervensi, \
         i.deskripsi AS deskripsi_intervensi, i.hasil AS hasil_intervensi, \
         DATE_FORMAT(i.created_date, '%Y-%m-%d %H:%i:%s') AS tanggal_penugasan, \
         b.nama AS nama_balita, \
         DATE_FORMAT(b.tanggal_lahir, '%Y-%m-%d') AS tanggal_lahir_balita, \
         b.jenis_kelamin AS jenis_kelamin_balita, \
         k.nomor_kk, k.nama_ayah, k.nama_ibu, k.alamat, kel.kelurahan, kec.kecamatan, \
         (SELECT rp.status_gizi FROM riwayat_pemeriksaan rp WHERE rp.id_balita = i.id_balita \
          AND rp.deleted_date IS NULL ORDER BY rp.tanggal DESC, rp.created_date DESC LIMIT 1) \
          AS status_gizi_terakhir, \
         (SELECT DATE_FORMAT(rp.tanggal, '%Y-%m-%d') FROM riwayat_pemeriksaan rp \
          WHERE rp.id_balita = i.id_balita AND rp.deleted_date IS NULL \
          ORDER BY rp.tanggal DESC, rp.created_date DESC LIMIT 1) \
          AS tanggal_pemeriksaan_terakhir, \
         (SELECT CAST(rp.berat_badan AS DOUBLE) FROM riwayat_pemeriksaan rp \
          WHERE rp.id_balita = i.id_balita AND rp.deleted_date IS NULL \
          ORDER BY rp.tanggal DESC, rp.created_date DESC LIMIT 1) AS berat_badan_terakhir, \
         (SELECT CAST(rp.tinggi_badan AS DOUBLE) FROM riwayat_pemeriksaan rp \
          WHERE rp.id_balita = i.id_balita AND rp.deleted_date IS NULL \
          ORDER BY rp.tanggal DESC, rp.created_date DESC LIMIT 1) AS tinggi_badan_terakhir, \
         (SELECT COUNT(*) FROM laporan_masyarakat lm WHERE lm.id_balita = i.id_balita \
          AND lm.deleted_date IS NULL) AS jumlah_laporan_terkait, \
         (SELECT GROUP_CONCAT(sl.status) FROM laporan_masyarakat lm \
          JOIN status_laporan sl ON lm.id_status_laporan = sl.id \
          WHERE lm.id_balita = i.id_balita AND lm.deleted_date IS NULL \
          AND sl.status IN ({aktif})) AS status_laporan_aktif \
         FROM intervensi_petugas ip \
         JOIN intervensi i ON ip.id_intervensi = i.id \
         JOIN balita b ON i.id_balita = b.id AND b.deleted_date IS NULL \
         JOIN keluarga k ON b.id_keluarga = k.id AND k.deleted_date IS NULL \
         LEFT JOIN kelurahan kel ON k.id_kelurahan = kel.id \
         LEFT JOIN kecamatan kec ON kel.id_kecamatan = kec.id",
        aktif = laporan::active_statuses_sql()
    )
}

/// Status turunan dari kolom hasil: kosong = pending, "selesai" atau
/// "completed" = completed, selain itu in_progress.
fn derive_status(hasil: Option<&str>) -> &'static str {
    match hasil.map(str::trim) {
        None | Some("") => "pending",
        Some("selesai") | Some("completed") => "completed",
        Some(_) => "in_progress",
    }
}

fn status_filter_clause(status: &str) -> Option<&'static str> {
    match status {
        "pending" => Some(" AND (i.hasil IS NULL OR i.hasil = '')"),
        "in_progress" => Some(
            " AND i.hasil IS NOT NULL AND i.hasil != '' \
             AND i.hasil NOT LIKE '%selesai%' AND i.hasil NOT LIKE '%completed%'",
        ),
        "completed" => Some(" AND (i.hasil LIKE '%selesai%' OR i.hasil LIKE '%completed%')"),
        _ => None,
    }
}

fn assignment_row_to_json(row: &sqlx::mysql::MySqlRow) -> Value {
    let tanggal_lahir: String = row.get("tanggal_lahir_balita");
    let umur = utils::parse_date(&tanggal_lahir)
        .map(|birth| utils::format_age(birth, Local::now().date_naive()))
        .unwrap_or_default();
    let hasil: Option<String> = row.get("hasil_intervensi");
    let status = derive_status(hasil.as_deref());
    json!({
        "id": row.get::<String, _>("id"),
        "id_intervensi": row.get::<String, _>("id_intervensi"),
        "id_balita": row.get::<String, _>("id_balita"),
        "nama_balita": row.get::<String, _>("nama_balita"),
        "tanggal_lahir_balita": tanggal_lahir,
        "jenis_kelamin_balita": row.get::<String, _>("jenis_kelamin_balita"),
        "umur_balita": umur,
        "nomor_kk": row.get::<String, _>("nomor_kk"),
        "nama_ayah": row.get::<String, _>("nama_ayah"),
        "nama_ibu": row.get::<String, _>("nama_ibu"),
        "alamat": row.get::<String, _>("alamat"),
        "kelurahan": row.get::<Option<String>, _>("kelurahan"),
        "kecamatan": row.get::<Option<String>, _>("kecamatan"),
        "jenis_intervensi": row.get::<String, _>("jenis_intervensi"),
        "tanggal_intervensi": row.get::<String, _>("tanggal_intervensi"),
        "deskripsi_intervensi": row.get::<String, _>("deskripsi_intervensi"),
        "hasil_intervensi": hasil,
        "status_intervensi": status,
        "status_gizi_terakhir": row.get::<Option<String>, _>("status_gizi_terakhir"),
        "tanggal_pemeriksaan_terakhir": row.get::<Option<String>, _>("tanggal_pemeriksaan_terakhir"),
        "berat_badan_terakhir": row.get::<Option<f64>, _>("berat_badan_terakhir"),
        "tinggi_badan_terakhir": row.get::<Option<f64>, _>("tinggi_badan_terakhir"),
        "jumlah_laporan_terkait": row.get::<i64, _>("jumlah_laporan_terkait"),
        "status_laporan_aktif": row.get::<Option<String>, _>("status_laporan_aktif"),
        "tanggal_penugasan": row.get::<Option<String>, _>("tanggal_penugasan"),
        "can_add_medical_record": status != "pending",
        "can_update_status": status != "completed",
    })
}

#[get("/api/health-worker/assignment/get")]
pub async fn get_assignments(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<AssignmentFilter>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_PETUGAS) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };
    let petugas_id = match petugas_profile(pool.get_ref(), &claims.user_id).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if let Some(id) = query.id.as_deref().filter(|s| !s.is_empty()) {
        let sql = format!(
            "{} WHERE ip.id_petugas_kesehatan = ? AND i.id = ? AND i.deleted_date IS NULL",
            select_assigned()
        );
        return match sqlx::query(&sql)
            .bind(&petugas_id)
            .bind(id)
            .fetch_optional(pool.get_ref())
            .await
        {
            Ok(Some(row)) => resp::ok(
                "Assigned intervention retrieved successfully",
                Some(json!({ "data": assignment_row_to_json(&row) })),
            ),
            Ok(None) => resp::not_found("Intervention not found or not assigned to you"),
            Err(e) => {
                log::error!("Query penugasan gagal: {:?}", e);
                resp::internal("Failed to get intervention")
            }
        };
    }

    let status = query.status.as_deref().filter(|s| !s.is_empty());
    let mut sql = format!(
        "{} WHERE ip.id_petugas_kesehatan = ? AND i.deleted_date IS NULL",
        select_assigned()
    );
    if let Some(clause) = status.and_then(status_filter_clause) {
        sql.push_str(clause);
    }
    sql.push_str(" ORDER BY i.tanggal DESC, i.created_date DESC");

    match sqlx::query(&sql)
        .bind(&petugas_id)
        .fetch_all(pool.get_ref())
        .await
    {
        Ok(rows) => {
            let list: Vec<Value> = rows.iter().map(assignment_row_to_json).collect();
            let total = list.len();
            let message = if status.is_some() {
                "Filtered assigned interventions retrieved successfully"
            } else {
                "All assigned interventions retrieved successfully"
            };
            resp::ok(message, Some(json!({ "data": list, "total": total })))
        }
        Err(e) => {
            log::error!("Query daftar penugasan gagal: {:?}", e);
            resp::internal("Failed to get assigned interventions")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_derived_from_hasil() {
        assert_eq!(derive_status(None), "pending");
        assert_eq!(derive_status(Some("")), "pending");
        assert_eq!(derive_status(Some("selesai")), "completed");
        assert_eq!(derive_status(Some("pemberian vitamin berjalan")), "in_progress");
    }

    #[test]
    fn unknown_status_filter_is_ignored() {
        assert!(status_filter_clause("pending").is_some());
        assert!(status_filter_clause("whatever").is_none());
    }

    #[test]
    fn assignment_query_embeds_active_status_list() {
        assert!(select_assigned().contains(&laporan::active_statuses_sql()));
    }
}
