//! End-to-end route tests against an in-process router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use exoscope_common::error::Result as ExoResult;
use exoscope_lightcurve::{BlsSearch, LightCurve, TransitSearch, TransitSignal};
use exoscope_test_utils::catalog::TempCatalog;
use exoscope_test_utils::lightcurves::SyntheticTransit;
use exoscope_test_utils::multipart::MultipartBody;
use exoscope_web::config::Config;
use exoscope_web::router::build_router;
use exoscope_web::state::AppState;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tower::ServiceExt;

struct PanickingSearch;

impl TransitSearch for PanickingSearch {
    fn search(&self, _lc: &LightCurve) -> ExoResult<TransitSignal> {
        panic!("detector exploded")
    }

    fn name(&self) -> &'static str {
        "panicking"
    }
}

fn app(catalog: &TempCatalog, search: Option<Arc<dyn TransitSearch>>) -> Router {
    let mut config = Config::default();
    config.catalog.path = catalog.path();
    config.server.static_dir = catalog.root();
    build_router(Arc::new(AppState::with_search(config, search)))
}

fn bls() -> Option<Arc<dyn TransitSearch>> {
    Some(Arc::new(BlsSearch::default()))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, MultipartBody::content_type())
        .body(Body::from(body))
        .unwrap()
}

fn good_csv() -> Vec<u8> {
    SyntheticTransit::default().to_csv().into_bytes()
}

#[tokio::test]
async fn test_index_and_explore_render() {
    let catalog = TempCatalog::missing();
    for uri in ["/", "/explore"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body) = send(app(&catalog, None), request).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert!(body.contains("<html"), "{uri}");
    }
}

#[tokio::test]
async fn test_predict_with_garbage_fields_returns_zero_probabilities() {
    let catalog = TempCatalog::missing();
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("orbital_period=abc&transit_duration=&planet_radius=1e"))
        .unwrap();

    let (status, body) = send(app(&catalog, None), request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Pending integration"));
    for label in ["Confirmed exoplanet", "Planet candidate", "False positive"] {
        assert!(body.contains(label), "missing {label}");
    }
    assert_eq!(body.matches(">0.0<").count(), 6, "three probabilities and three features should be 0.0");
    assert!(body.contains("No contributions available yet."));
}

#[tokio::test]
async fn test_predict_without_form_body_still_renders() {
    let catalog = TempCatalog::missing();
    let request = Request::builder().method("POST").uri("/predict").body(Body::empty()).unwrap();
    let (status, body) = send(app(&catalog, None), request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Pending integration"));
}

#[tokio::test]
async fn test_upload_without_file_leaves_catalog_alone() {
    let catalog = TempCatalog::missing();
    let body = MultipartBody::new().text("note", "nothing here").finish();

    let (status, html) = send(app(&catalog, bls()), upload_request(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("No file uploaded or empty filename."));
    assert!(catalog.raw().is_none());
}

#[tokio::test]
async fn test_upload_with_empty_filename() {
    let catalog = TempCatalog::seeded();
    let before = catalog.raw();
    let body = MultipartBody::new().file("lightcurve", "", b"").finish();

    let (_, html) = send(app(&catalog, bls()), upload_request(body)).await;
    assert!(html.contains("No file uploaded or empty filename."));
    assert_eq!(catalog.raw(), before);
}

#[tokio::test]
async fn test_upload_missing_flux_column_is_not_analysed() {
    let catalog = TempCatalog::seeded();
    let before = catalog.raw();
    let csv = b"time,brightness\n0.0,1.0\n0.1,1.0\n0.2,0.99\n";
    let body = MultipartBody::new().file("lightcurve", "bad.csv", csv).finish();

    let (status, html) = send(app(&catalog, bls()), upload_request(body)).await;
    assert_eq!(status, StatusCode::OK);
    let expected = format!("Received file: bad.csv (showing first {} bytes).", csv.len());
    assert!(html.contains(&expected), "{html}");
    assert!(html.contains("Unable to analyze"));
    assert_eq!(catalog.raw(), before);
}

#[tokio::test]
async fn test_upload_without_period_search_is_not_analysed() {
    let catalog = TempCatalog::seeded();
    let body = MultipartBody::new().file("lightcurve", "good.csv", &good_csv()).finish();

    let (_, html) = send(app(&catalog, None), upload_request(body)).await;
    assert!(html.contains("showing first 1024 bytes"));
    assert!(html.contains("Unable to analyze"));
    assert_eq!(catalog.custom_len(), 0);
}

#[tokio::test]
async fn test_upload_good_csv_appends_one_record() {
    let catalog = TempCatalog::seeded();
    let body = MultipartBody::new().file("lightcurve", "toi-123.csv", &good_csv()).finish();

    let (status, html) = send(app(&catalog, bls()), upload_request(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Analysis complete: period="), "{html}");
    assert!(html.contains("(R_star units)"));
    assert!(html.contains("Result for toi-123.csv"));

    let json = catalog.json();
    let custom = json["custom"].as_array().unwrap();
    assert_eq!(custom.len(), 1);
    assert_eq!(custom[0]["name"], "toi-123");
    let period = custom[0]["period"].as_f64().unwrap();
    let radius = custom[0]["radius"].as_f64().unwrap();
    assert!((0.2..=30.0).contains(&period), "period {period} out of range");
    assert!(radius >= 0.0);
    // Seeded datasets are untouched
    assert_eq!(json["kepler"][0]["name"], "Kepler-10b");
}

#[tokio::test]
async fn test_upload_over_corrupt_catalog_writes_valid_json() {
    let catalog = TempCatalog::with_contents("[[[ definitely not a catalog");
    let body = MultipartBody::new().file("lightcurve", "fresh.csv", &good_csv()).finish();

    let (_, html) = send(app(&catalog, bls()), upload_request(body)).await;
    assert!(html.contains("Analysis complete"));
    assert_eq!(catalog.custom_len(), 1);
}

#[tokio::test]
async fn test_unwritable_catalog_still_reports_analysis() {
    let catalog = TempCatalog::missing();
    // A directory where the catalog file should be makes both read and rename fail.
    std::fs::create_dir_all(catalog.path()).unwrap();
    let body = MultipartBody::new().file("lightcurve", "stuck.csv", &good_csv()).finish();

    let (status, html) = send(app(&catalog, bls()), upload_request(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Analysis complete: period="), "{html}");
    assert!(catalog.path().is_dir());

    let tmp = catalog.path().with_file_name("exoplanets.json.tmp");
    assert!(!tmp.exists(), "temp file left behind at {tmp:?}");
}

#[tokio::test]
async fn test_multi_year_upload_reports_grid_error() {
    let catalog = TempCatalog::seeded();
    let csv = SyntheticTransit {
        period: 12.3,
        depth: 0.002,
        noise: 5e-4,
        cadence: 0.5,
        baseline: 1400.0,
        ..SyntheticTransit::default()
    }
    .to_csv();
    let body = MultipartBody::new().file("lightcurve", "kepler-long.csv", csv.as_bytes()).finish();

    let (status, html) = send(app(&catalog, bls()), upload_request(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Error processing file:"), "{html}");
    assert!(html.contains("trial periods"));
    assert_eq!(catalog.custom_len(), 0);
}

#[tokio::test]
async fn test_repeated_uploads_accumulate() {
    let catalog = TempCatalog::missing();
    for _ in 0..2 {
        let body = MultipartBody::new().file("lightcurve", "same.csv", &good_csv()).finish();
        send(app(&catalog, bls()), upload_request(body)).await;
    }
    assert_eq!(catalog.custom_len(), 2);
}

#[tokio::test]
async fn test_unparseable_values_report_error() {
    let catalog = TempCatalog::seeded();
    let csv = b"time,flux\n0.0,1.0\n0.1,dim\n0.2,1.0\n0.3,1.0\n";
    let body = MultipartBody::new().file("lightcurve", "typo.csv", csv).finish();

    let (status, html) = send(app(&catalog, bls()), upload_request(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Error processing file:"), "{html}");
    assert_eq!(catalog.custom_len(), 0);
}

#[tokio::test]
async fn test_panicking_search_is_reported_not_fatal() {
    let catalog = TempCatalog::seeded();
    let body = MultipartBody::new().file("lightcurve", "boom.csv", &good_csv()).finish();

    let (status, html) = send(app(&catalog, Some(Arc::new(PanickingSearch))), upload_request(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Error processing file: analysis panicked: detector exploded"));
    assert_eq!(catalog.custom_len(), 0);
}

#[tokio::test]
async fn test_health_reports_period_search() {
    let catalog = TempCatalog::missing();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(&catalog, bls()), request).await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["period_search"], true);
    assert_eq!(json["search"], "bls");
}

#[tokio::test]
async fn test_catalog_served_as_static_file() {
    let catalog = TempCatalog::seeded();
    let request = Request::builder()
        .uri("/static/data/exoplanets.json")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&catalog, None), request).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["kepler"][0]["name"], "Kepler-10b");
}
