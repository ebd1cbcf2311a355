#![allow(dead_code)]

use axum::body::Body;
use axum::Router;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use bookshelf_core::trigger::CoverTrigger;
use bookshelf_server::{api_routes, config::ServerConfig, storage::Stores, AppState};

pub fn config(dir: &tempfile::TempDir) -> ServerConfig {
    ServerConfig {
        data_path: dir.path().to_path_buf(),
        bind: "127.0.0.1:0".to_string(),
    }
}

pub fn app_with(dir: &tempfile::TempDir, trigger: CoverTrigger) -> (Router, Stores) {
    let stores = Stores::open(dir.path()).unwrap();
    let state = AppState::new(config(dir), stores.clone(), trigger);
    (api_routes(state), stores)
}

pub fn app(dir: &tempfile::TempDir) -> Router {
    app_with(dir, CoverTrigger::disabled()).0
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            req = req.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// POST and return the created resource's id.
pub async fn create(app: &Router, uri: &str, body: serde_json::Value) -> String {
    let (status, json) = send(app, "POST", uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["id"].as_str().unwrap().to_string()
}
