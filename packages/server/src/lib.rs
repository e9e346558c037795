#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for crime hotspot analysis.
//!
//! Accepts CSV uploads from the map front end on two endpoints,
//! `/hotspots-ml` and `/crime-trend`, and answers with the JSON produced by
//! [`crime_hotspots_analysis`]. Uploads are held in memory for the duration
//! of the request only; nothing is persisted between requests.

mod handlers;
pub mod upload;

use std::str::FromStr;

use actix_cors::Cors;
use actix_web::http::Uri;
use actix_web::http::header::HeaderValue;
use actix_web::{App, HttpServer, middleware, web};
use crime_hotspots_analysis::AnalysisConfig;

/// Default bind address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
/// Default port.
pub const DEFAULT_PORT: u16 = 8000;
/// Origins allowed by default: the front end's local dev servers.
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost,http://localhost:3000,http://127.0.0.1:3000";
/// Default cap on an uploaded file's size.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Server settings, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind (`BIND_ADDR`).
    pub bind_addr: String,
    /// Port to bind (`PORT`).
    pub port: u16,
    /// Origins allowed to call the API (`CORS_ORIGINS`, comma separated).
    pub cors_origins: Vec<String>,
    /// Largest accepted upload in bytes (`MAX_UPLOAD_BYTES`).
    pub max_upload_bytes: usize,
    /// Clustering and forecasting settings (`KMEANS_SEED`, `FORECAST_YEARS`).
    pub analysis: AnalysisConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            cors_origins: parse_origins(DEFAULT_CORS_ORIGINS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            analysis: AnalysisConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from environment variables, falling back to
    /// defaults for anything unset or invalid.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, which maps a variable name to
    /// its raw value.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let analysis = AnalysisConfig {
            seed: parse_or("KMEANS_SEED", lookup("KMEANS_SEED"), defaults.analysis.seed),
            forecast_years: parse_or(
                "FORECAST_YEARS",
                lookup("FORECAST_YEARS"),
                defaults.analysis.forecast_years,
            ),
            ..defaults.analysis
        };

        let cors_origins = match lookup("CORS_ORIGINS").map(|raw| parse_origins(&raw)) {
            Some(origins) if !origins.is_empty() => origins,
            Some(_) => {
                log::warn!("CORS_ORIGINS has no valid origin, using defaults");
                defaults.cors_origins
            }
            None => defaults.cors_origins,
        };

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: parse_or("PORT", lookup("PORT"), defaults.port),
            cors_origins,
            max_upload_bytes: parse_or(
                "MAX_UPLOAD_BYTES",
                lookup("MAX_UPLOAD_BYTES"),
                defaults.max_upload_bytes,
            ),
            analysis,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        log::warn!("Ignoring invalid {key}={raw:?}, using default");
        default
    })
}

/// Whether `origin` is `*` or an absolute URI with a scheme and host that
/// can be sent as a header value.
fn is_valid_origin(origin: &str) -> bool {
    origin == "*"
        || (HeaderValue::from_str(origin).is_ok()
            && origin
                .parse::<Uri>()
                .is_ok_and(|uri| uri.scheme().is_some() && uri.host().is_some()))
}

/// Splits a comma-separated origin list, dropping blanks and logging and
/// dropping entries that are not valid origins.
#[must_use]
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter(|o| {
            let valid = is_valid_origin(o);
            if !valid {
                log::warn!("Ignoring invalid CORS origin {o:?}");
            }
            valid
        })
        .map(ToOwned::to_owned)
        .collect()
}

/// Shared application state.
pub struct AppState {
    /// Clustering and forecasting settings applied to every upload.
    pub analysis: AnalysisConfig,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: usize,
}

impl From<&ServerConfig> for AppState {
    fn from(config: &ServerConfig) -> Self {
        Self {
            analysis: config.analysis.clone(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

/// Registers the API routes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health))
        .route("/hotspots-ml", web::post().to(handlers::hotspots_ml))
        .route("/crime-trend", web::post().to(handlers::crime_trend));
}

fn build_cors(origins: &[String]) -> Cors {
    let cors = if origins.iter().any(|o| o == "*") {
        Cors::default().allow_any_origin()
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    cors.allow_any_method()
        .allow_any_header()
        .supports_credentials()
}

/// Starts the API server.
///
/// Reads [`ServerConfig`] from the environment and runs the Actix-Web HTTP
/// server until it is shut down. The caller provides the async runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env();
    log::debug!("Server configuration: {config:?}");

    let state = web::Data::new(AppState::from(&config));
    let origins = config.cors_origins.clone();

    log::info!(
        "Starting server on {}:{} (CORS origins: {})",
        config.bind_addr,
        config.port,
        origins.join(", ")
    );

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&origins))
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(routes)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}
