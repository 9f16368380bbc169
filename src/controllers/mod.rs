pub mod auth_controller;
pub mod balita_controller;
pub mod community_controller;
pub mod geojson_controller;
pub mod health_worker_controller;
pub mod intervensi_controller;
pub mod keluarga_controller;
pub mod laporan_controller;
pub mod master_data_controller;
pub mod petugas_controller;
pub mod riwayat_controller;
pub mod skpd_controller;
