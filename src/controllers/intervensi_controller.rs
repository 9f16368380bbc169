//intervensi_controller.rs
use crate::auth::{self, JwtConfig};
use crate::db;
use crate::models::intervensi::{AssignPetugasRequest, IntervensiRequest};
use crate::models::response as resp;
use crate::utils;

use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::MySqlPool;
use sqlx::Row;

use super::skpd_controller::{IdBody, IdQuery};

const SELECT_INTERVENSI: &str = "SELECT CAST(i.id AS CHAR) AS id, \
    CAST(i.id_balita AS CHAR) AS id_balita, i.jenis, \
    DATE_FORMAT(i.tanggal, '%Y-%m-%d') AS tanggal, i.deskripsi, i.hasil, \
    b.nama AS nama_balita, \
    (SELECT COUNT(*) FROM intervensi_petugas ip WHERE ip.id_intervensi = i.id) \
    AS petugas_count, \
    DATE_FORMAT(i.created_date, '%Y-%m-%d %H:%i:%s') AS created_date, \
    DATE_FORMAT(i.updated_date, '%Y-%m-%d %H:%i:%s') AS updated_date \
    FROM intervensi i \
    JOIN balita b ON i.id_balita = b.id";

fn intervensi_row_to_json(row: &sqlx::mysql::MySqlRow) -> Value {
    json!({
        "id": row.get::<String, _>("id"),
        "id_balita": row.get::<String, _>("id_balita"),
        "jenis": row.get::<String, _>("jenis"),
        "tanggal": row.get::<String, _>("tanggal"),
        "deskripsi": row.get::<String, _>("deskripsi"),
        "hasil": row.get::<Option<String>, _>("hasil"),
        "nama_balita": row.get::<String, _>("nama_balita"),
        "petugas_count": row.get::<i64, _>("petugas_count"),
        "created_date": row.get::<Option<String>, _>("created_date"),
        "updated_date": row.get::<Option<String>, _>("updated_date"),
    })
}

#[get("/api/admin/intervensi/get")]
pub async fn get_intervensi(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<IdQuery>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }

    if let Some(id) = query.id.as_deref().filter(|s| !s.is_empty()) {
        let sql = format!("{SELECT_INTERVENSI} WHERE i.id = ? AND i.deleted_date IS NULL");
        return match sqlx::query(&sql).bind(id).fetch_optional(pool.get_ref()).await {
            Ok(Some(row)) => resp::ok(
                "Intervensi retrieved successfully",
                Some(json!({ "data": intervensi_row_to_json(&row) })),
            ),
            Ok(None) => resp::not_found("Intervensi not found"),
            Err(e) => {
                log::error!("Query intervensi gagal: {:?}", e);
                resp::internal("Failed to get intervensi")
            }
        };
    }

    let sql = format!(
        "{SELECT_INTERVENSI} WHERE i.deleted_date IS NULL ORDER BY i.tanggal DESC"
    );
    match sqlx::query(&sql).fetch_all(pool.get_ref()).await {
        Ok(rows) => {
            let list: Vec<Value> = rows.iter().map(intervensi_row_to_json).collect();
            let total = list.len();
            resp::ok(
                "All intervensi retrieved successfully",
                Some(json!({ "data": list, "total": total })),
            )
        }
        Err(e) => {
            log::error!("Query daftar intervensi gagal: {:?}", e);
            resp::internal("Failed to get intervensi list")
        }
    }
}

#[post("/api/admin/intervensi/insert")]
pub async fn insert_intervensi(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<IntervensiRequest>,
) -> HttpResponse {
    let claims = match auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        Ok(claims) => claims,
        Err(resp) => return resp,
    };

    if let Err(e) = data.validate(false) {
        return resp::bad_request(e);
    }

    let balita = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM balita WHERE id = ? AND deleted_date IS NULL",
        &[&data.id_balita],
    )
    .await
    .unwrap_or(0);
    if balita == 0 {
        return resp::bad_request("Balita not found");
    }

    let duplicate = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM intervensi WHERE id_balita = ? AND jenis = ? AND tanggal = ? \
         AND deskripsi = ? AND deleted_date IS NULL",
        &[&data.id_balita, &data.jenis, &data.tanggal, &data.deskripsi],
    )
    .await
    .unwrap_or(0);
    if duplicate > 0 {
        return resp::bad_request("An identical intervensi already exists for this balita");
    }

    let result = sqlx::query(
        "INSERT INTO intervensi (id_balita, jenis, tanggal, deskripsi, hasil, created_id, \
         created_date) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&data.id_balita)
    .bind(&data.jenis)
    .bind(&data.tanggal)
    .bind(data.deskripsi.trim())
    .bind(&data.hasil)
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => resp::ok(
            "Intervensi inserted successfully",
            Some(json!({ "id": res.last_insert_id().to_string() })),
        ),
        Err(e) => {
            log::error!("Insert intervensi gagal: {:?}", e);
            resp::internal("Failed to insert intervensi")
        }
    }
}

#[put("/api/admin/intervensi/update")]
pub async fn update_intervensi(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<IntervensiRequest>,
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
        "SELECT COUNT(*) FROM intervensi WHERE id = ? AND deleted_date IS NULL",
        &[&data.id],
    )
    .await;
    match exists {
        Ok(0) => return resp::not_found("Intervensi not found"),
        Ok(_) => {}
        Err(e) => {
            log::error!("Cek intervensi gagal: {:?}", e);
            return resp::internal("Failed to check intervensi existence");
        }
    }

    let balita = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM balita WHERE id = ? AND deleted_date IS NULL",
        &[&data.id_balita],
    )
    .await
    .unwrap_or(0);
    if balita == 0 {
        return resp::bad_request("Balita not found");
    }

    let duplicate = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM intervensi WHERE id_balita = ? AND jenis = ? AND tanggal = ? \
         AND deskripsi = ? AND id != ? AND deleted_date IS NULL",
        &[
            &data.id_balita,
            &data.jenis,
            &data.tanggal,
            &data.deskripsi,
            &data.id,
        ],
    )
    .await
    .unwrap_or(0);
    if duplicate > 0 {
        return resp::bad_request("An identical intervensi already exists for this balita");
    }

    let result = sqlx::query(
        "UPDATE intervensi SET id_balita = ?, jenis = ?, tanggal = ?, deskripsi = ?, \
         hasil = ?, updated_id = ?, updated_date = ? WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(&data.id_balita)
    .bind(&data.jenis)
    .bind(&data.tanggal)
    .bind(data.deskripsi.trim())
    .bind(&data.hasil)
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => resp::ok(
            "Intervensi updated successfully",
            Some(json!({ "id": data.id })),
        ),
        Ok(_) => resp::not_found("Intervensi not found"),
        Err(e) => {
            log::error!("Update intervensi gagal: {:?}", e);
            resp::internal("Failed to update intervensi")
        }
    }
}

#[delete("/api/admin/intervensi/delete")]
pub async fn delete_intervensi(
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
        return resp::bad_request("Intervensi ID is required");
    }

    let exists = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM intervensi WHERE id = ? AND deleted_date IS NULL",
        &[&data.id],
    )
    .await;
    match exists {
        Ok(0) => return resp::not_found("Intervensi not found"),
        Ok(_) => {}
        Err(e) => {
            log::error!("Cek intervensi gagal: {:?}", e);
            return resp::internal("Failed to check intervensi existence");
        }
    }

    let assigned = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM intervensi_petugas WHERE id_intervensi = ?",
        &[&data.id],
    )
    .await
    .unwrap_or(0);
    if assigned > 0 {
        return resp::bad_request(format!(
            "Cannot delete intervensi. There are {} petugas kesehatan assigned to it",
            assigned
        ));
    }

    let riwayat = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM riwayat_pemeriksaan WHERE id_intervensi = ? \
         AND deleted_date IS NULL",
        &[&data.id],
    )
    .await
    .unwrap_or(0);
    if riwayat > 0 {
        return resp::bad_request(format!(
            "Cannot delete intervensi. There are {} active riwayat pemeriksaan records for it",
            riwayat
        ));
    }

    let result = sqlx::query(
        "UPDATE intervensi SET deleted_id = ?, deleted_date = ? \
         WHERE id = ? AND deleted_date IS NULL",
    )
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => resp::ok(
            "Intervensi deleted successfully",
            Some(json!({ "id": data.id })),
        ),
        Ok(_) => resp::not_found("Intervensi not found or already deleted"),
        Err(e) => {
            log::error!("Hapus intervensi gagal: {:?}", e);
            resp::internal("Failed to delete intervensi")
        }
    }
}

#[post("/api/admin/intervensi/restore")]
pub async fn restore_intervensi(
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
        return resp::bad_request("Intervensi ID is required");
    }

    let row = sqlx::query(
        "SELECT CAST(i.id_balita AS CHAR) AS id_balita, i.jenis, \
         DATE_FORMAT(i.tanggal, '%Y-%m-%d') AS tanggal, i.deskripsi, \
         (SELECT COUNT(*) FROM balita b WHERE b.id = i.id_balita \
          AND b.deleted_date IS NULL) AS balita_live \
         FROM intervensi i WHERE i.id = ? AND i.deleted_date IS NOT NULL",
    )
    .bind(&data.id)
    .fetch_optional(pool.get_ref())
    .await;

    let (id_balita, jenis, tanggal, deskripsi) = match row {
        Ok(Some(row)) => {
            if row.get::<i64, _>("balita_live") == 0 {
                return resp::bad_request("Cannot restore intervensi. The balita is deleted");
            }
            (
                row.get::<String, _>("id_balita"),
                row.get::<String, _>("jenis"),
                row.get::<String, _>("tanggal"),
                row.get::<String, _>("deskripsi"),
            )
        }
        Ok(None) => return resp::not_found("Intervensi not found or not deleted"),
        Err(e) => {
            log::error!("Cek intervensi terhapus gagal: {:?}", e);
            return resp::internal("Failed to check intervensi existence");
        }
    };

    let duplicate = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM intervensi WHERE id_balita = ? AND jenis = ? AND tanggal = ? \
         AND deskripsi = ? AND id != ? AND deleted_date IS NULL",
        &[&id_balita, &jenis, &tanggal, &deskripsi, &data.id],
    )
    .await
    .unwrap_or(0);
    if duplicate > 0 {
        return resp::conflict(
            "Cannot restore intervensi. An identical active intervensi already exists",
        );
    }

    let result = sqlx::query(
        "UPDATE intervensi SET deleted_id = NULL, deleted_date = NULL, updated_id = ?, \
         updated_date = ? WHERE id = ? AND deleted_date IS NOT NULL",
    )
    .bind(&claims.user_id)
    .bind(utils::now_stamp())
    .bind(&data.id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => resp::ok(
            "Intervensi restored successfully",
            Some(json!({ "id": data.id })),
        ),
        Ok(_) => resp::not_found("Intervensi not found or not deleted"),
        Err(e) => {
            log::error!("Pulihkan intervensi gagal: {:?}", e);
            resp::internal("Failed to restore intervensi")
        }
    }
}

// MARK: intervensi_petugas (penugasan)

#[derive(Debug, Deserialize)]
pub struct AssignmentQuery {
    pub id: Option<String>,
    pub id_intervensi: Option<String>,
    pub id_petugas_kesehatan: Option<String>,
}

const SELECT_ASSIGNMENT: &str = "SELECT CAST(ip.id AS CHAR) AS id, \
    CAST(ip.id_intervensi AS CHAR) AS id_intervensi, \
    CAST(ip.id_petugas_kesehatan AS CHAR) AS id_petugas_kesehatan, \
    i.jenis, DATE_FORMAT(i.tanggal, '%Y-%m-%d') AS tanggal_intervensi, \
    b.nama AS nama_balita, pk.nama AS nama_petugas, s.skpd \
    FROM intervensi_petugas ip \
    JOIN intervensi i ON ip.id_intervensi = i.id \
    JOIN balita b ON i.id_balita = b.id \
    JOIN petugas_kesehatan pk ON ip.id_petugas_kesehatan = pk.id \
    JOIN skpd s ON pk.id_skpd = s.id";

fn assignment_row_to_json(row: &sqlx::mysql::MySqlRow) -> Value {
    json!({
        "id": row.get::<String, _>("id"),
        "id_intervensi": row.get::<String, _>("id_intervensi"),
        "id_petugas_kesehatan": row.get::<String, _>("id_petugas_kesehatan"),
        "jenis": row.get::<String, _>("jenis"),
        "tanggal_intervensi": row.get::<String, _>("tanggal_intervensi"),
        "nama_balita": row.get::<String, _>("nama_balita"),
        "nama_petugas": row.get::<String, _>("nama_petugas"),
        "skpd": row.get::<String, _>("skpd"),
    })
}

#[get("/api/admin/intervensi-petugas/get")]
pub async fn get_assignments(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<AssignmentQuery>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }

    let (filter, bind): (&str, Option<&str>) = if let Some(id) =
        query.id.as_deref().filter(|s| !s.is_empty())
    {
        (" WHERE ip.id = ?", Some(id))
    } else if let Some(id) = query.id_intervensi.as_deref().filter(|s| !s.is_empty()) {
        (" WHERE ip.id_intervensi = ?", Some(id))
    } else if let Some(id) = query
        .id_petugas_kesehatan
        .as_deref()
        .filter(|s| !s.is_empty())
    {
        (" WHERE ip.id_petugas_kesehatan = ?", Some(id))
    } else {
        ("", None)
    };

    let sql = format!("{SELECT_ASSIGNMENT}{filter} ORDER BY i.tanggal DESC");
    let mut q = sqlx::query(&sql);
    if let Some(bind) = bind {
        q = q.bind(bind);
    }

    match q.fetch_all(pool.get_ref()).await {
        Ok(rows) => {
            let list: Vec<Value> = rows.iter().map(assignment_row_to_json).collect();
            let total = list.len();
            resp::ok(
                "Intervensi petugas retrieved successfully",
                Some(json!({ "data": list, "total": total })),
            )
        }
        Err(e) => {
            log::error!("Query penugasan gagal: {:?}", e);
            resp::internal("Failed to get intervensi petugas list")
        }
    }
}

#[post("/api/admin/intervensi-petugas/assign")]
pub async fn assign_petugas(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<AssignPetugasRequest>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }

    if let Err(e) = data.validate() {
        return resp::bad_request(e);
    }

    let intervensi = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM intervensi WHERE id = ? AND deleted_date IS NULL",
        &[&data.id_intervensi],
    )
    .await
    .unwrap_or(0);
    if intervensi == 0 {
        return resp::bad_request("Intervensi not found");
    }

    let petugas = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM petugas_kesehatan WHERE id = ? AND deleted_date IS NULL",
        &[&data.id_petugas_kesehatan],
    )
    .await
    .unwrap_or(0);
    if petugas == 0 {
        return resp::bad_request("Petugas kesehatan not found");
    }

    let duplicate = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM intervensi_petugas WHERE id_intervensi = ? \
         AND id_petugas_kesehatan = ?",
        &[&data.id_intervensi, &data.id_petugas_kesehatan],
    )
    .await
    .unwrap_or(0);
    if duplicate > 0 {
        return resp::bad_request("Petugas kesehatan is already assigned to this intervensi");
    }

    let result = sqlx::query(
        "INSERT INTO intervensi_petugas (id_intervensi, id_petugas_kesehatan) VALUES (?, ?)",
    )
    .bind(&data.id_intervensi)
    .bind(&data.id_petugas_kesehatan)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => resp::ok(
            "Petugas kesehatan assigned successfully",
            Some(json!({ "id": res.last_insert_id().to_string() })),
        ),
        Err(e) => {
            log::error!("Insert penugasan gagal: {:?}", e);
            resp::internal("Failed to assign petugas kesehatan")
        }
    }
}

#[delete("/api/admin/intervensi-petugas/remove")]
pub async fn remove_petugas(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    data: web::Json<AssignPetugasRequest>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }

    if let Err(e) = data.validate() {
        return resp::bad_request(e);
    }

    // Penugasan yang sudah menghasilkan riwayat pemeriksaan untuk balita
    // intervensi ini tidak bisa dicabut
    let riwayat = db::count(
        pool.get_ref(),
        "SELECT COUNT(*) FROM riwayat_pemeriksaan rp \
         JOIN intervensi i ON rp.id_intervensi = i.id \
         JOIN petugas_kesehatan pk ON pk.id = ? \
         WHERE i.id = ? AND rp.created_id = pk.id_pengguna AND rp.deleted_date IS NULL",
        &[&data.id_petugas_kesehatan, &data.id_intervensi],
    )
    .await
    .unwrap_or(0);
    if riwayat > 0 {
        return resp::bad_request(format!(
            "Cannot remove assignment. The petugas has written {} riwayat pemeriksaan for this intervensi",
            riwayat
        ));
    }

    let result = sqlx::query(
        "DELETE FROM intervensi_petugas WHERE id_intervensi = ? AND id_petugas_kesehatan = ?",
    )
    .bind(&data.id_intervensi)
    .bind(&data.id_petugas_kesehatan)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) if res.rows_affected() > 0 => resp::ok(
            "Petugas kesehatan assignment removed successfully",
            None,
        ),
        Ok(_) => resp::not_found("Assignment not found"),
        Err(e) => {
            log::error!("Hapus penugasan gagal: {:?}", e);
            resp::internal("Failed to remove assignment")
        }
    }
}
