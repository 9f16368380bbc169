// main.rs
use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::Logger;
use actix_web::web::JsonConfig;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;

use crate::models::response::ApiResponse;

mod auth;
mod controllers;
mod db;
mod models;
mod utils;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("starting up...");
    let pool = match db::establish_connection().await {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Gagal inisialisasi pool database: {:?}", e);
            std::process::exit(1);
        }
    };
    let jwt = auth::JwtConfig::from_env();

    let bind_addr =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:8000".to_string());

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://localhost:3000")
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
            .supports_credentials()
            .max_age(3600);

        let json_config = JsonConfig::default()
            .limit(10 * 1024 * 1024)
            .content_type_required(false) // Kadang header content-type tidak tepat
            .error_handler(|err, _req| {
                log::error!("JSON payload error: {}", err);
                let body = ApiResponse::new(400, format!("Invalid request body: {}", err), None);
                actix_web::error::InternalError::from_response(err, body.write()).into()
            });

        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(jwt.clone()))
            .app_data(json_config)
            .wrap(cors)
            .wrap(Logger::default())
            //auth
            .service(controllers::auth_controller::login)
            .service(controllers::auth_controller::register)
            .service(controllers::auth_controller::register_admin)
            .service(controllers::auth_controller::profile)
            //skpd
            .service(controllers::skpd_controller::get_skpd)
            .service(controllers::skpd_controller::insert_skpd)
            .service(controllers::skpd_controller::update_skpd)
            .service(controllers::skpd_controller::delete_skpd)
            .service(controllers::skpd_controller::restore_skpd)
            //petugas kesehatan
            .service(controllers::petugas_controller::get_petugas)
            .service(controllers::petugas_controller::insert_petugas)
            .service(controllers::petugas_controller::update_petugas)
            .service(controllers::petugas_controller::delete_petugas)
            .service(controllers::petugas_controller::restore_petugas)
            //keluarga
            .service(controllers::keluarga_controller::get_keluarga)
            .service(controllers::keluarga_controller::insert_keluarga)
            .service(controllers::keluarga_controller::update_keluarga)
            .service(controllers::keluarga_controller::delete_keluarga)
            .service(controllers::keluarga_controller::restore_keluarga)
            //balita
            .service(controllers::balita_controller::get_balita)
            .service(controllers::balita_controller::insert_balita)
            .service(controllers::balita_controller::update_balita)
            .service(controllers::balita_controller::delete_balita)
            .service(controllers::balita_controller::restore_balita)
            //laporan masyarakat
            .service(controllers::laporan_controller::get_laporan)
            .service(controllers::laporan_controller::insert_laporan)
            .service(controllers::laporan_controller::update_laporan)
            .service(controllers::laporan_controller::delete_laporan)
            .service(controllers::laporan_controller::restore_laporan)
            //intervensi + penugasan petugas
            .service(controllers::intervensi_controller::get_intervensi)
            .service(controllers::intervensi_controller::insert_intervensi)
            .service(controllers::intervensi_controller::update_intervensi)
            .service(controllers::intervensi_controller::delete_intervensi)
            .service(controllers::intervensi_controller::restore_intervensi)
            .service(controllers::intervensi_controller::get_assignments)
            .service(controllers::intervensi_controller::assign_petugas)
            .service(controllers::intervensi_controller::remove_petugas)
            //riwayat pemeriksaan
            .service(controllers::riwayat_controller::get_riwayat)
            .service(controllers::riwayat_controller::insert_riwayat)
            .service(controllers::riwayat_controller::update_riwayat)
            .service(controllers::riwayat_controller::delete_riwayat)
            .service(controllers::riwayat_controller::restore_riwayat)
            //master data + layer peta admin
            .service(controllers::master_data_controller::get_master_status_laporan)
            .service(controllers::master_data_controller::get_master_masyarakat)
            .service(controllers::master_data_controller::get_master_kecamatan)
            .service(controllers::master_data_controller::get_master_kelurahan)
            .service(controllers::master_data_controller::get_master_skpd)
            .service(controllers::master_data_controller::get_geojson_kecamatan)
            .service(controllers::master_data_controller::get_geojson_kelurahan)
            .service(controllers::master_data_controller::get_geojson_balita_points)
            //masyarakat (community)
            .service(controllers::community_controller::get_keluarga_warga)
            .service(controllers::community_controller::insert_keluarga_warga)
            .service(controllers::community_controller::update_keluarga_warga)
            .service(controllers::community_controller::get_balita_warga)
            .service(controllers::community_controller::update_balita_warga)
            .service(controllers::community_controller::get_laporan_warga)
            .service(controllers::community_controller::insert_laporan_warga)
            .service(controllers::community_controller::get_kecamatan_warga)
            .service(controllers::community_controller::get_kelurahan_warga)
            .service(controllers::community_controller::get_status_laporan_warga)
            //petugas kesehatan (panel petugas)
            .service(controllers::health_worker_controller::get_assignments)
            //dokumen geojson
            .service(controllers::geojson_controller::upload_geojson)
            .service(controllers::geojson_controller::get_geojson)
            .service(controllers::geojson_controller::delete_geojson)
            .service(controllers::geojson_controller::get_sufferers_geojson)
    })
    .bind(bind_addr)?
    .run()
    .await
}
