#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Entry point for the crime hotspots API server.
//!
//! Configuration comes from the environment: `BIND_ADDR`, `PORT`,
//! `CORS_ORIGINS`, `MAX_UPLOAD_BYTES`, `KMEANS_SEED`, `FORECAST_YEARS` and
//! `RUST_LOG`.

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    crime_hotspots_server::run_server().await
}
