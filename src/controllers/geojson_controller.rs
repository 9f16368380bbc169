//geojson_controller.rs
//Upload dan pengelolaan dokumen GeoJSON mentah, plus layer titik
//penderita untuk peta publik.
use crate::auth::{self, JwtConfig};
use crate::models::response as resp;
use crate::models::sufferer::{to_feature_collection, Sufferer};

use actix_multipart::Multipart;
use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use serde_json::{json, Value};
use sqlx::MySqlPool;
use sqlx::Row;
use std::path::Path;
use uuid::Uuid;

use super::skpd_controller::IdQuery;

const MAX_GEOJSON_BYTES: usize = 10 * 1024 * 1024;

#[post("/api/geojson/upload")]
pub async fn upload_geojson(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    mut payload: Multipart,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }

    let mut filename: Option<String> = None;
    let mut content = BytesMut::new();

    loop {
        let field = match payload.try_next().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return resp::bad_request(format!("Invalid multipart payload: {}", e)),
        };

        let name = field.name().unwrap_or_default().to_string();
        if name != "geojson" {
            continue;
        }

        let cd = field.content_disposition().cloned();
        filename = cd.and_then(|d| d.get_filename().map(|s| s.to_string()));

        let content_type = field
            .content_type()
            .map(|ct| ct.to_string())
            .unwrap_or_default();
        if content_type != "application/json" && content_type != "application/geo+json" {
            return resp::bad_request("Invalid file type. Only GeoJSON files are allowed.");
        }

        let mut field_stream = field;
        loop {
            match field_stream.try_next().await {
                Ok(Some(chunk)) => {
                    if content.len() + chunk.len() > MAX_GEOJSON_BYTES {
                        return resp::bad_request("File size exceeds 10 MB limit");
                    }
                    content.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(e) => {
                    return resp::bad_request(format!("Failed to read uploaded file: {}", e))
                }
            }
        }
    }

    let filename = match filename.filter(|f| !f.is_empty()) {
        Some(f) => f,
        None => return resp::bad_request("File name is missing"),
    };
    if content.is_empty() {
        return resp::bad_request("GeoJSON file is empty");
    }

    let text = match String::from_utf8(content.to_vec()) {
        Ok(text) => text,
        Err(_) => return resp::bad_request("GeoJSON file must be valid UTF-8"),
    };
    if serde_json::from_str::<Value>(&text).is_err() {
        return resp::bad_request("File does not contain valid JSON");
    }

    let id = Uuid::new_v4().to_string();
    let stem = Path::new(&filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename.as_str())
        .to_string();

    let result = sqlx::query("INSERT INTO stunting_geojson (id, name, geojson) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(&stem)
        .bind(&text)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(_) => resp::ok(
            "GeoJSON file uploaded successfully",
            Some(json!({ "id": id, "name": stem })),
        ),
        Err(e) => {
            log::error!("Insert geojson gagal: {:?}", e);
            resp::internal("Failed to store GeoJSON")
        }
    }
}

/// Isi dokumen tersimpan, dengan id dan name disuntikkan ke objek JSON.
fn hydrate_document(id: &str, name: &str, text: &str) -> Option<Value> {
    let mut doc: Value = serde_json::from_str(text).ok()?;
    if let Some(obj) = doc.as_object_mut() {
        obj.insert("id".to_string(), json!(id));
        obj.insert("name".to_string(), json!(name));
    }
    Some(doc)
}

#[get("/api/geojson")]
pub async fn get_geojson(
    pool: web::Data<MySqlPool>,
    query: web::Query<IdQuery>,
) -> HttpResponse {
    if let Some(id) = query.id.as_deref().filter(|s| !s.is_empty()) {
        return match sqlx::query("SELECT name, geojson FROM stunting_geojson WHERE id = ?")
            .bind(id)
            .fetch_optional(pool.get_ref())
            .await
        {
            Ok(Some(row)) => {
                let name: String = row.get("name");
                let text: String = row.get("geojson");
                match hydrate_document(id, &name, &text) {
                    Some(doc) => resp::ok("GeoJSON data retrieved successfully", Some(doc)),
                    None => {
                        log::error!("Dokumen geojson {} korup", id);
                        resp::internal("Failed to retrieve GeoJSON data")
                    }
                }
            }
            Ok(None) => resp::not_found("GeoJSON not found"),
            Err(e) => {
                log::error!("Query geojson gagal: {:?}", e);
                resp::internal("Failed to retrieve GeoJSON data")
            }
        };
    }

    match sqlx::query("SELECT id, name, geojson FROM stunting_geojson")
        .fetch_all(pool.get_ref())
        .await
    {
        Ok(rows) => {
            let list: Vec<Value> = rows
                .iter()
                .filter_map(|row| {
                    let id: String = row.get("id");
                    let name: String = row.get("name");
                    let text: String = row.get("geojson");
                    hydrate_document(&id, &name, &text)
                })
                .collect();
            resp::ok("All GeoJSON data retrieved successfully", Some(json!(list)))
        }
        Err(e) => {
            log::error!("Query daftar geojson gagal: {:?}", e);
            resp::internal("Failed to retrieve GeoJSON data")
        }
    }
}

#[delete("/api/geojson")]
pub async fn delete_geojson(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    jwt: web::Data<JwtConfig>,
    query: web::Query<IdQuery>,
) -> HttpResponse {
    if let Err(resp) = auth::require_role(&req, &jwt, auth::ROLE_ADMIN) {
        return resp;
    }

    let id = match query.id.as_deref().filter(|s| !s.is_empty()) {
        Some(id) => id,
        None => return resp::bad_request("Missing id parameter"),
    };

    match sqlx::query("DELETE FROM stunting_geojson WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
    {
        Ok(res) if res.rows_affected() > 0 => resp::ok("GeoJSON deleted successfully", None),
        Ok(_) => resp::not_found("GeoJSON not found"),
        Err(e) => {
            log::error!("Hapus geojson gagal: {:?}", e);
            resp::internal("Failed to delete GeoJSON")
        }
    }
}

#[get("/api/geojson/sufferers")]
pub async fn get_sufferers_geojson(pool: web::Data<MySqlPool>) -> HttpResponse {
    let rows = sqlx::query(
        "SELECT CAST(id AS CHAR) AS id, name, nik, \
         DATE_FORMAT(date_of_birth, '%Y-%m-%d') AS date_of_birth, \
         ST_AsText(coordinates) AS coordinates_wkt, status, \
         CAST(reported_by_id AS CHAR) AS reported_by_id \
         FROM sufferer",
    )
    .fetch_all(pool.get_ref())
    .await;

    match rows {
        Ok(rows) => {
            let sufferers: Vec<Sufferer> = rows
                .iter()
                .map(|row| {
                    let wkt: String = row.get("coordinates_wkt");
                    let (lon, lat) = crate::models::geojson::parse_wkt_point(&wkt);
                    Sufferer {
                        id: row.get("id"),
                        name: row.get("name"),
                        nik: row.get("nik"),
                        date_of_birth: row.get("date_of_birth"),
                        coordinates: [lon, lat],
                        status: row.get("status"),
                        reported_by_id: row.get("reported_by_id"),
                    }
                })
                .collect();
            let collection = to_feature_collection(&sufferers);
            resp::ok("Success", serde_json::to_value(collection).ok())
        }
        Err(e) => {
            log::error!("Query sufferer gagal: {:?}", e);
            resp::internal("Failed to retrieve sufferer data")
        }
    }
}
