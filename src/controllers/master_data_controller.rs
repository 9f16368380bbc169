//master_data_controller.rs
//Data referensi (dropdown) dan layer GeoJSON untuk peta admin.
use crate::auth::{self, JwtConfig};
use crate::models::geojson::{wkt_to_geometry, Feature, FeatureCollection};
use crate::models::response as resp;

use actix_web::{get, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::MySqlPool;
use sqlx::Row;

#[derive(Debug, Deserialize)]
pub struct KelurahanQuery {
    pub id_kecamatan: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JenisQuery {
    pub jenis: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AreaQuery {
    pub id: Option<String>,
    pub id_kecamatan: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BalitaPointsQuery {
    pub status_laporan: Option<String>,
    pub id_kecamatan: Option<String>,
    pub id_kelurahan: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[get("/api/admin/master-status-laporan")]
pub async fn get_master_status_laporan(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
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

#[get("/api/admin/master-masyarakat")]
pub async fn get_master_masyarakat(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }

    let rows = sqlx::query(
        "SELECT CAST(m.id AS CHAR) AS id, m.nama, m.alamat, p.email \
         FROM masyarakat m \
         LEFT JOIN pengguna p ON m.id_pengguna = p.id \
         WHERE m.deleted_date IS NULL \
         ORDER BY m.nama ASC",
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
                        "nama": row.get::<String, _>("nama"),
                        "alamat": row.get::<String, _>("alamat"),
                        "email": row.get::<Option<String>, _>("email"),
                    })
                })
                .collect();
            let total = list.len();
            resp::ok(
                "Masyarakat master data retrieved successfully",
                Some(json!({ "data": list, "total": total })),
            )
        }
        Err(e) => {
            log::error!("Query masyarakat gagal: {:?}", e);
            resp::internal("Failed to get masyarakat list")
        }
    }
}

#[get("/api/admin/master-kecamatan")]
pub async fn get_master_kecamatan(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }
    kecamatan_list(pool.get_ref()).await
}

pub(super) async fn kecamatan_list(pool: &MySqlPool) -> HttpResponse {
    let rows = sqlx::query(
        "SELECT CAST(id AS CHAR) AS id, kecamatan FROM kecamatan ORDER BY kecamatan ASC",
    )
    .fetch_all(pool)
    .await;

    match rows {
        Ok(rows) => {
            let list: Vec<Value> = rows
                .iter()
                .map(|row| {
                    json!({
                        "id": row.get::<String, _>("id"),
                        "kecamatan": row.get::<String, _>("kecamatan"),
                    })
                })
                .collect();
            let total = list.len();
            resp::ok(
                "Kecamatan master data retrieved successfully",
                Some(json!({ "data": list, "total": total })),
            )
        }
        Err(e) => {
            log::error!("Query kecamatan gagal: {:?}", e);
            resp::internal("Failed to get kecamatan list")
        }
    }
}

#[get("/api/admin/master-kelurahan")]
pub async fn get_master_kelurahan(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<KelurahanQuery>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }
    kelurahan_list(pool.get_ref(), non_empty(&query.id_kecamatan)).await
}

pub(super) async fn kelurahan_list(pool: &MySqlPool, id_kecamatan: Option<&str>) -> HttpResponse {
    let base = "SELECT CAST(kel.id AS CHAR) AS id, \
         CAST(kel.id_kecamatan AS CHAR) AS id_kecamatan, \
         kel.kelurahan, kec.kecamatan \
         FROM kelurahan kel \
         LEFT JOIN kecamatan kec ON kel.id_kecamatan = kec.id";

    let rows = if let Some(id_kecamatan) = id_kecamatan {
        let sql = format!(
            "{base} WHERE kel.id_kecamatan = ? ORDER BY kel.kelurahan ASC"
        );
        sqlx::query(&sql).bind(id_kecamatan).fetch_all(pool).await
    } else {
        let sql = format!("{base} ORDER BY kec.kecamatan ASC, kel.kelurahan ASC");
        sqlx::query(&sql).fetch_all(pool).await
    };

    match rows {
        Ok(rows) => {
            let list: Vec<Value> = rows
                .iter()
                .map(|row| {
                    json!({
                        "id": row.get::<String, _>("id"),
                        "id_kecamatan": row.get::<String, _>("id_kecamatan"),
                        "kelurahan": row.get::<String, _>("kelurahan"),
                        "kecamatan": row.get::<Option<String>, _>("kecamatan"),
                    })
                })
                .collect();
            let total = list.len();
            let message = if id_kecamatan.is_some() {
                "Kelurahan data by kecamatan retrieved successfully"
            } else {
                "Kelurahan master data retrieved successfully"
            };
            resp::ok(message, Some(json!({ "data": list, "total": total })))
        }
        Err(e) => {
            log::error!("Query kelurahan gagal: {:?}", e);
            resp::internal("Failed to get kelurahan list")
        }
    }
}

#[get("/api/admin/master-skpd")]
pub async fn get_master_skpd(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<JenisQuery>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }

    let jenis = non_empty(&query.jenis);
    let rows = if let Some(jenis) = jenis {
        sqlx::query(
            "SELECT CAST(id AS CHAR) AS id, skpd, jenis FROM skpd \
             WHERE jenis = ? AND deleted_date IS NULL ORDER BY skpd ASC",
        )
        .bind(jenis)
        .fetch_all(pool.get_ref())
        .await
    } else {
        sqlx::query(
            "SELECT CAST(id AS CHAR) AS id, skpd, jenis FROM skpd \
             WHERE deleted_date IS NULL ORDER BY jenis ASC, skpd ASC",
        )
        .fetch_all(pool.get_ref())
        .await
    };

    match rows {
        Ok(rows) => {
            let list: Vec<Value> = rows
                .iter()
                .map(|row| {
                    json!({
                        "id": row.get::<String, _>("id"),
                        "skpd": row.get::<String, _>("skpd"),
                        "jenis": row.get::<String, _>("jenis"),
                    })
                })
                .collect();
            let total = list.len();
            let message = if jenis.is_some() {
                "SKPD data by jenis retrieved successfully"
            } else {
                "SKPD master data retrieved successfully"
            };
            resp::ok(message, Some(json!({ "data": list, "total": total })))
        }
        Err(e) => {
            log::error!("Query master SKPD gagal: {:?}", e);
            resp::internal("Failed to get SKPD list")
        }
    }
}

// MARK: layer GeoJSON

#[get("/api/admin/geojson-kecamatan")]
pub async fn get_geojson_kecamatan(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<AreaQuery>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }

    let id = non_empty(&query.id);
    let rows = if let Some(id) = id {
        sqlx::query(
            "SELECT CAST(id AS CHAR) AS id, kecamatan, ST_AsText(area) AS area_wkt \
             FROM kecamatan WHERE id = ? AND area IS NOT NULL",
        )
        .bind(id)
        .fetch_all(pool.get_ref())
        .await
    } else {
        sqlx::query(
            "SELECT CAST(id AS CHAR) AS id, kecamatan, ST_AsText(area) AS area_wkt \
             FROM kecamatan WHERE area IS NOT NULL ORDER BY kecamatan ASC",
        )
        .fetch_all(pool.get_ref())
        .await
    };

    match rows {
        Ok(rows) => {
            let mut features = Vec::new();
            for row in &rows {
                let wkt: String = row.get("area_wkt");
                // Baris dengan geometri rusak dilewati saja
                let Some(geometry) = wkt_to_geometry(&wkt) else {
                    continue;
                };
                features.push(Feature {
                    feature_type: "Feature".to_string(),
                    geometry,
                    properties: json!({
                        "id": row.get::<String, _>("id"),
                        "kecamatan": row.get::<String, _>("kecamatan"),
                        "type": "kecamatan",
                    }),
                });
            }
            let message = if id.is_some() {
                "Kecamatan GeoJSON by ID retrieved successfully"
            } else {
                "Kecamatan GeoJSON retrieved successfully"
            };
            let collection = FeatureCollection::new(features);
            resp::ok(message, serde_json::to_value(collection).ok())
        }
        Err(e) => {
            log::error!("Query area kecamatan gagal: {:?}", e);
            resp::internal("Failed to get kecamatan GeoJSON")
        }
    }
}

#[get("/api/admin/geojson-kelurahan")]
pub async fn get_geojson_kelurahan(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<AreaQuery>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }

    let base = "SELECT CAST(kel.id AS CHAR) AS id, kel.kelurahan, kec.kecamatan, \
         ST_AsText(kel.area) AS area_wkt \
         FROM kelurahan kel \
         LEFT JOIN kecamatan kec ON kel.id_kecamatan = kec.id";

    let id = non_empty(&query.id);
    let id_kecamatan = non_empty(&query.id_kecamatan);

    let rows = if let Some(id) = id {
        let sql = format!("{base} WHERE kel.id = ? AND kel.area IS NOT NULL");
        sqlx::query(&sql).bind(id).fetch_all(pool.get_ref()).await
    } else if let Some(id_kecamatan) = id_kecamatan {
        let sql = format!(
            "{base} WHERE kel.id_kecamatan = ? AND kel.area IS NOT NULL \
             ORDER BY kel.kelurahan ASC"
        );
        sqlx::query(&sql)
            .bind(id_kecamatan)
            .fetch_all(pool.get_ref())
            .await
    } else {
        let sql = format!(
            "{base} WHERE kel.area IS NOT NULL \
             ORDER BY kec.kecamatan ASC, kel.kelurahan ASC"
        );
        sqlx::query(&sql).fetch_all(pool.get_ref()).await
    };

    match rows {
        Ok(rows) => {
            let mut features = Vec::new();
            for row in &rows {
                let wkt: String = row.get("area_wkt");
                let Some(geometry) = wkt_to_geometry(&wkt) else {
                    continue;
                };
                features.push(Feature {
                    feature_type: "Feature".to_string(),
                    geometry,
                    properties: json!({
                        "id": row.get::<String, _>("id"),
                        "kelurahan": row.get::<String, _>("kelurahan"),
                        "kecamatan": row.get::<Option<String>, _>("kecamatan"),
                        "type": "kelurahan",
                    }),
                });
            }
            let message = if id.is_some() {
                "Kelurahan GeoJSON by ID retrieved successfully"
            } else if id_kecamatan.is_some() {
                "Kelurahan GeoJSON by kecamatan retrieved successfully"
            } else {
                "Kelurahan GeoJSON retrieved successfully"
            };
            let collection = FeatureCollection::new(features);
            resp::ok(message, serde_json::to_value(collection).ok())
        }
        Err(e) => {
            log::error!("Query area kelurahan gagal: {:?}", e);
            resp::internal("Failed to get kelurahan GeoJSON")
        }
    }
}

#[get("/api/admin/geojson-balita-points")]
pub async fn get_geojson_balita_points(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<BalitaPointsQuery>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }

    let mut sql = String::from(
        "SELECT DISTINCT CAST(b.id AS CHAR) AS id, b.nama, b.jenis_kelamin, \
         DATE_FORMAT(b.tanggal_lahir, '%Y-%m-%d') AS tanggal_lahir, \
         k.nomor_kk, k.nama_ayah, k.nama_ibu, kel.kelurahan, kec.kecamatan, \
         ST_AsText(k.koordinat) AS koordinat_wkt, \
         COALESCE(sl.status, 'Tidak ada laporan') AS status_laporan, \
         COALESCE(DATE_FORMAT(lm.tanggal_laporan, '%Y-%m-%d'), '') AS tanggal_laporan, \
         CASE \
             WHEN lm.id_masyarakat IS NOT NULL THEN 'masyarakat' \
             WHEN lm.id_masyarakat IS NULL AND lm.id IS NOT NULL THEN 'admin' \
             ELSE 'tidak ada' \
         END AS jenis_laporan, \
         COALESCE(rp_latest.status_gizi, 'Belum diperiksa') AS status_gizi_terakhir, \
         COALESCE(DATE_FORMAT(rp_latest.tanggal, '%Y-%m-%d'), '') AS tanggal_pemeriksaan_terakhir \
         FROM balita b \
         LEFT JOIN keluarga k ON b.id_keluarga = k.id AND k.deleted_date IS NULL \
         LEFT JOIN kelurahan kel ON k.id_kelurahan = kel.id \
         LEFT JOIN kecamatan kec ON kel.id_kecamatan = kec.id \
         LEFT JOIN laporan_masyarakat lm ON b.id = lm.id_balita AND lm.deleted_date IS NULL \
         LEFT JOIN status_laporan sl ON lm.id_status_laporan = sl.id \
         LEFT JOIN ( \
             SELECT rp.id_balita, rp.status_gizi, rp.tanggal, \
                    ROW_NUMBER() OVER (PARTITION BY rp.id_balita ORDER BY rp.tanggal DESC) AS rn \
             FROM riwayat_pemeriksaan rp \
             WHERE rp.deleted_date IS NULL \
         ) rp_latest ON b.id = rp_latest.id_balita AND rp_latest.rn = 1 \
         WHERE b.deleted_date IS NULL AND k.koordinat IS NOT NULL",
    );

    let mut binds: Vec<String> = Vec::new();
    if let Some(status) = non_empty(&query.status_laporan) {
        if status == "Tidak ada laporan" {
            sql.push_str(" AND lm.id IS NULL");
        } else {
            sql.push_str(" AND sl.status = ?");
            binds.push(status.to_string());
        }
    }
    if let Some(id_kecamatan) = non_empty(&query.id_kecamatan) {
        sql.push_str(" AND kec.id = ?");
        binds.push(id_kecamatan.to_string());
    }
    if let Some(id_kelurahan) = non_empty(&query.id_kelurahan) {
        sql.push_str(" AND kel.id = ?");
        binds.push(id_kelurahan.to_string());
    }
    sql.push_str(" ORDER BY kec.kecamatan ASC, kel.kelurahan ASC, b.nama ASC");

    let mut q = sqlx::query(&sql);
    for bind in &binds {
        q = q.bind(bind);
    }

    match q.fetch_all(pool.get_ref()).await {
        Ok(rows) => {
            let today = chrono::Local::now().date_naive();
            let mut features = Vec::new();
            for row in &rows {
                let wkt: String = row.get("koordinat_wkt");
                let (lon, lat) = crate::models::geojson::parse_wkt_point(&wkt);

                let tanggal_lahir: String = row.get("tanggal_lahir");
                let umur = utils_age(&tanggal_lahir, today);

                let status_gizi: String = row.get("status_gizi_terakhir");
                let status_laporan: String = row.get("status_laporan");
                let gizi_opt = if status_gizi == "Belum diperiksa" {
                    None
                } else {
                    Some(status_gizi.as_str())
                };
                let color = crate::utils::balita_point_color(
                    gizi_opt,
                    Some(status_laporan.as_str()),
                );

                features.push(Feature::point(
                    lon,
                    lat,
                    json!({
                        "id": row.get::<String, _>("id"),
                        "nama": row.get::<String, _>("nama"),
                        "jenis_kelamin": row.get::<String, _>("jenis_kelamin"),
                        "umur": umur,
                        "nomor_kk": row.get::<Option<String>, _>("nomor_kk"),
                        "nama_ayah": row.get::<Option<String>, _>("nama_ayah"),
                        "nama_ibu": row.get::<Option<String>, _>("nama_ibu"),
                        "kelurahan": row.get::<Option<String>, _>("kelurahan"),
                        "kecamatan": row.get::<Option<String>, _>("kecamatan"),
                        "status_laporan": status_laporan,
                        "tanggal_laporan": row.get::<String, _>("tanggal_laporan"),
                        "jenis_laporan": row.get::<String, _>("jenis_laporan"),
                        "status_gizi_terakhir": status_gizi,
                        "tanggal_pemeriksaan_terakhir": row.get::<String, _>("tanggal_pemeriksaan_terakhir"),
                        "color": color,
                        "type": "balita",
                    }),
                ));
            }
            let collection = FeatureCollection::new(features);
            resp::ok(
                "Balita points GeoJSON retrieved successfully",
                serde_json::to_value(collection).ok(),
            )
        }
        Err(e) => {
            log::error!("Query titik balita gagal: {:?}", e);
            resp::internal("Failed to get balita points GeoJSON")
        }
    }
}

fn utils_age(tanggal_lahir: &str, today: chrono::NaiveDate) -> String {
    match crate::utils::parse_date(tanggal_lahir) {
        Some(birth) => crate::utils::format_age(birth, today),
        None => String::new(),
    }
}
