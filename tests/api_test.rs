#![cfg(feature = "web")]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use data_vision::app::{AppState, router};
use data_vision::config::Config;
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;

const BOUNDARY: &str = "data-vision-test-boundary";

const SALES_CSV: &str = "date,region,amount\n\
                         2024-01-05,north,10\n\
                         2024-01-20,south,5\n\
                         2024-02-01,north,3\n\
                         bad,east,99\n";

// Router without a front end build: the static dir does not exist
fn api_only() -> Router {
    let config = Config {
        static_dir: PathBuf::from("/nonexistent/data-vision/public"),
        ..Config::default()
    };
    router(Arc::new(AppState::new()), &config)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart(field: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn upload_sales(app: &Router) -> String {
    let (status, body) = send(app, multipart("file", "sales.csv", SALES_CSV.as_bytes())).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["datasetId"].as_str().unwrap().to_string()
}

// ===== Health and fallback =====

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&api_only(), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_banner_without_front_end() {
    let (status, body) = send(&api_only(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Data Vision API Server");
    assert_eq!(body["endpoints"]["calculate"], "/api/calculate");
}

#[tokio::test]
async fn test_front_end_fallback() {
    let dir: TempDir = tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<html>data vision</html>").unwrap();
    fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();

    let config = Config {
        static_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    let app = router(Arc::new(AppState::new()), &config);

    for uri in ["/app.js", "/charts/monthly"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        if uri == "/app.js" {
            assert_eq!(text, "console.log(1)");
        } else {
            assert!(text.contains("data vision"));
        }
    }

    // API routes still win over static files
    let (status, _) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
}

// ===== Upload and dataset management =====

#[tokio::test]
async fn test_upload_and_fetch() {
    let app = api_only();
    let (status, body) = send(&app, multipart("file", "sales.csv", SALES_CSV.as_bytes())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["fileName"], "sales.csv");
    assert_eq!(body["data"]["headers"], json!(["date", "region", "amount"]));
    assert_eq!(body["data"]["rows"][0]["amount"], 10.0);

    let id = body["datasetId"].as_str().unwrap();
    let (status, fetched) = send(&app, get(&format!("/api/datasets/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["rows"].as_array().unwrap().len(), 4);

    let (status, listing) = send(&app, get("/api/datasets")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        listing,
        json!([{
            "id": id,
            "fileName": "sales.csv",
            "uploadTime": body["data"]["uploadTime"],
            "rowCount": 4,
            "headers": ["date", "region", "amount"]
        }])
    );
}

#[tokio::test]
async fn test_upload_rejects_unsupported_file() {
    let app = api_only();
    let (status, body) = send(&app, multipart("file", "notes.txt", b"hello")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "only CSV, XLSX and XLS files are supported");

    let (_, listing) = send(&app, get("/api/datasets")).await;
    assert_eq!(listing, json!([]));
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let (status, body) = send(&api_only(), multipart("attachment", "sales.csv", b"a\n1\n")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "please select a file to upload");
}

#[tokio::test]
async fn test_upload_corrupt_workbook() {
    let (status, body) =
        send(&api_only(), multipart("file", "broken.xlsx", b"not a workbook")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("failed to parse file"));
}

#[tokio::test]
async fn test_delete_dataset() {
    let app = api_only();
    let id = upload_sales(&app).await;
    let uri = format!("/api/datasets/{}", id);

    let delete = || {
        Request::builder()
            .method(Method::DELETE)
            .uri(&uri)
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send(&app, delete()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (_, body) = send(&app, delete()).await;
    assert_eq!(body, json!({"success": false}));

    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "dataset not found");
}

// ===== Compute endpoints =====

#[tokio::test]
async fn test_calculate() {
    let app = api_only();
    let id = upload_sales(&app).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/calculate",
            json!({"datasetId": id, "formula": "sum", "columnX": "region", "columnY": "amount"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": true, "result": {"type": "single", "data": 117.0}})
    );

    let (_, body) = send(
        &app,
        post_json(
            "/api/calculate",
            json!({"datasetId": id, "formula": "groupSum", "columnX": "region", "columnY": "amount"}),
        ),
    )
    .await;
    assert_eq!(
        body["result"],
        json!({"type": "grouped", "data": [
            {"name": "north", "value": 13.0},
            {"name": "south", "value": 5.0},
            {"name": "east", "value": 99.0}
        ]})
    );
}

#[tokio::test]
async fn test_calculate_unknown_formula_returns_rows() {
    let app = api_only();
    let id = upload_sales(&app).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/calculate",
            json!({"datasetId": id, "formula": "percentile", "columnY": "amount"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["type"], "raw");
    assert_eq!(body["result"]["data"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_calculate_loosely_typed_request() {
    let app = api_only();
    let id = upload_sales(&app).await;

    for formula in [json!(null), json!(7), json!({"name": "sum"})] {
        let (status, body) = send(
            &app,
            post_json(
                "/api/calculate",
                json!({"datasetId": id, "formula": formula, "columnX": "region", "columnY": "amount"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["result"]["type"], "raw");
    }

    // A null column reads as a missing column
    let (status, body) = send(
        &app,
        post_json(
            "/api/calculate",
            json!({"datasetId": id, "formula": "sum", "columnX": null, "columnY": null}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["result"], json!({"type": "single", "data": 0.0}));

    let (_, body) = send(
        &app,
        post_json(
            "/api/calculate",
            json!({"datasetId": id, "formula": "groupSum", "columnX": null, "columnY": "amount"}),
        ),
    )
    .await;
    assert_eq!(
        body["result"]["data"],
        json!([{"name": "", "value": 117.0}])
    );
}

#[tokio::test]
async fn test_calculate_errors() {
    let app = api_only();

    let (status, body) = send(
        &app,
        post_json("/api/calculate", json!({"datasetId": "nope", "formula": "sum"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "dataset not found"}));

    let (status, body) = send(&app, post_json("/api/calculate", json!({"formula": "sum"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_aggregate() {
    let app = api_only();
    let id = upload_sales(&app).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/aggregate",
            json!({"datasetId": id, "dateColumn": "date", "valueColumn": "amount", "period": "month"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": true, "result": {"data": [
            {"period": "2024-01", "value": 15.0},
            {"period": "2024-02", "value": 3.0}
        ]}})
    );
}

#[tokio::test]
async fn test_aggregate_rejects_unknown_period() {
    let app = api_only();
    let id = upload_sales(&app).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/aggregate",
            json!({"datasetId": id, "dateColumn": "date", "valueColumn": "amount", "period": "quarter"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("quarter"));
}

#[tokio::test]
async fn test_compare_datasets() {
    let app = api_only();
    let first = upload_sales(&app).await;
    let (_, body) = send(
        &app,
        multipart("file", "later.csv", b"region,amount\nwest,1.5\nwest,2.5\n"),
    )
    .await;
    let second = body["datasetId"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        post_json(
            "/api/compare-datasets",
            json!({
                "datasetIds": [second, "missing", first],
                "valueColumn": "amount",
                "labelColumn": "region"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let results = body["result"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["datasetId"], second.as_str());
    assert_eq!(results[0]["fileName"], "later.csv");
    assert_eq!(results[0]["total"], 4.0);
    assert_eq!(results[0]["data"][0], json!({"label": "west", "value": 1.5}));
    assert_eq!(results[1]["datasetId"], first.as_str());
    assert_eq!(results[1]["total"], 117.0);
    assert_eq!(results[1]["rowCount"], 4);
}
