//! HTTP handler functions for the crime hotspots API.
//!
//! Every analysis endpoint answers `200 OK`: either the success payload or
//! an `{"error": "..."}` body.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use crime_hotspots_analysis::{AnalysisConfig, AnalysisError};
use crime_hotspots_analysis_models::{ApiHealth, ApiResponse};
use serde::Serialize;

use crate::AppState;
use crate::upload::read_upload;

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /hotspots-ml`
///
/// Clusters the regions of the uploaded CSV into risk tiers.
pub async fn hotspots_ml(state: web::Data<AppState>, payload: Multipart) -> HttpResponse {
    analyze(&state, payload, "hotspots", crime_hotspots_analysis::hotspots).await
}

/// `POST /crime-trend`
///
/// Fits and extrapolates the yearly crime totals of the uploaded CSV.
pub async fn crime_trend(state: web::Data<AppState>, payload: Multipart) -> HttpResponse {
    analyze(&state, payload, "crime trend", crime_hotspots_analysis::crime_trend).await
}

/// Buffers the upload, runs `operation` on the blocking pool and wraps the
/// outcome in an [`ApiResponse`].
async fn analyze<T, F>(
    state: &AppState,
    payload: Multipart,
    label: &str,
    operation: F,
) -> HttpResponse
where
    T: Serialize + Send + 'static,
    F: FnOnce(&str, &[u8], &AnalysisConfig) -> Result<T, AnalysisError> + Send + 'static,
{
    let response = match read_upload(payload, state.max_upload_bytes).await {
        Ok(upload) => {
            let config = state.analysis.clone();
            match web::block(move || operation(&upload.file_name, &upload.bytes, &config)).await {
                Ok(result) => ApiResponse::from_result(result),
                Err(e) => ApiResponse::error(e),
            }
        }
        Err(e) => ApiResponse::error(e),
    };

    if let ApiResponse::Error(body) = &response {
        log::warn!("Failed to compute {label}: {}", body.error);
    }

    HttpResponse::Ok().json(response)
}

#[cfg(test)]
mod tests {
    use actix_web::http::header;
    use actix_web::{App, test, web};
    use serde_json::{Value, json};

    use crate::{AppState, ServerConfig, routes};

    const BOUNDARY: &str = "----crimehotspotsboundary";

    const REGIONS_CSV: &str = "\
State,Latitude,Longitude,Rate,Crime Type,2020,2021,2022
Alpha,10,70,1.5,theft,10,20,30
Beta,11,71,2.5,assault,15,25,35
Gamma,12,72,3.5,murder,500,600,700
Delta,13,73,4.5,fraud,200,210,220
";

    fn multipart_body(field: &str, file_name: &str, content: &str) -> String {
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        )
    }

    async fn post_with(state: AppState, uri: &str, content_type: &str, body: String) -> Value {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;
        let req = test::TestRequest::post()
            .uri(uri)
            .insert_header((header::CONTENT_TYPE, content_type.to_owned()))
            .set_payload(body)
            .to_request();
        test::call_and_read_body_json(&app, req).await
    }

    async fn post(uri: &str, body: String) -> Value {
        post_with(
            AppState::from(&ServerConfig::default()),
            uri,
            &format!("multipart/form-data; boundary={BOUNDARY}"),
            body,
        )
        .await
    }

    fn small_upload_state(max_upload_bytes: usize) -> AppState {
        AppState {
            max_upload_bytes,
            ..AppState::from(&ServerConfig::default())
        }
    }

    #[actix_web::test]
    async fn hotspots_returns_region_records() {
        let body = post("/hotspots-ml", multipart_body("file", "crimes.csv", REGIONS_CSV)).await;

        let records = body.as_array().expect("array response");
        assert_eq!(records.len(), 4);
        let gamma = &records[2];
        assert_eq!(gamma["state"], "Gamma");
        assert_eq!(gamma["risk"], "High");
        assert_eq!(gamma["top_crime"], "murder");
        assert_eq!(gamma["crime_color"], "DarkRed");
        assert_eq!(gamma["2022"], 700);
        assert_eq!(gamma["crime_breakdown"]["theft"], 0);
    }

    #[actix_web::test]
    async fn trend_returns_merged_timeline() {
        let body = post("/crime-trend", multipart_body("file", "crimes.csv", REGIONS_CSV)).await;

        let points = body.as_array().expect("array response");
        assert_eq!(points.len(), 6);
        assert_eq!(
            points[0],
            json!({ "year": 2020, "total_crimes": 725, "predicted_total_crimes": null })
        );
        assert_eq!(points[5]["year"], 2025);
        assert_eq!(points[5]["total_crimes"], Value::Null);
        assert!(points[5]["predicted_total_crimes"].is_u64());
    }

    #[actix_web::test]
    async fn rejects_non_csv_upload() {
        let body = post("/hotspots-ml", multipart_body("file", "data.txt", REGIONS_CSV)).await;
        assert_eq!(body, json!({ "error": "Please upload a valid CSV file" }));
    }

    #[actix_web::test]
    async fn reports_missing_file_part() {
        let body = post("/crime-trend", multipart_body("other", "crimes.csv", REGIONS_CSV)).await;
        assert_eq!(body, json!({ "error": "No file was uploaded" }));
    }

    #[actix_web::test]
    async fn reports_clustering_failure_as_error_body() {
        let csv = "State,Lat,Lon,Rate,CrimeType,2019,2020\nAlpha,1,2,3,theft,10,15\nBeta,1,2,3,theft,20,25\n";
        let body = post("/hotspots-ml", multipart_body("file", "crimes.csv", csv)).await;
        let object = body.as_object().expect("object response");
        assert_eq!(object.len(), 1);
        assert!(object["error"].as_str().is_some_and(|e| e.contains("regions")));
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let app = test::init_service(App::new().configure(routes)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], true);
    }

    #[actix_web::test]
    async fn rejects_upload_over_size_cap() {
        let body = post_with(
            small_upload_state(16),
            "/hotspots-ml",
            &format!("multipart/form-data; boundary={BOUNDARY}"),
            multipart_body("file", "crimes.csv", REGIONS_CSV),
        )
        .await;
        assert_eq!(body, json!({ "error": "Uploaded file exceeds the 16 byte limit" }));
    }

    #[actix_web::test]
    async fn checks_file_name_before_size_cap() {
        let body = post_with(
            small_upload_state(16),
            "/crime-trend",
            &format!("multipart/form-data; boundary={BOUNDARY}"),
            multipart_body("file", "data.txt", REGIONS_CSV),
        )
        .await;
        assert_eq!(body, json!({ "error": "Please upload a valid CSV file" }));
    }

    #[actix_web::test]
    async fn reports_malformed_multipart_as_error_body() {
        let body = post_with(
            AppState::from(&ServerConfig::default()),
            "/crime-trend",
            "multipart/form-data",
            multipart_body("file", "crimes.csv", REGIONS_CSV),
        )
        .await;
        let object = body.as_object().expect("object response");
        assert_eq!(object.len(), 1);
        assert!(
            object["error"]
                .as_str()
                .is_some_and(|e| e.starts_with("Failed to read upload")),
            "body {body}"
        );
    }
}
