pub mod balita;
pub mod geojson;
pub mod intervensi;
pub mod keluarga;
pub mod laporan;
pub mod pengguna;
pub mod petugas;
pub mod response;
pub mod riwayat;
pub mod skpd;
pub mod sufferer;
