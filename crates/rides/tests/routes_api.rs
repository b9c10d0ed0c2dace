//! End-to-end tests of the routes API against the in-memory store.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use rides::{
    auth::{AuthKeys, create_token},
    config::ServerConfig,
    create_router,
    store::MemoryStore,
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "routes-api-test-secret";

struct TestApp {
    app: Router,
    store: MemoryStore,
    token: String,
}

impl TestApp {
    fn new() -> Self {
        let store = MemoryStore::new();
        let config = ServerConfig {
            jwt_secret: SECRET.to_string(),
            ..ServerConfig::default()
        };
        let app = create_router(Arc::new(store.clone()), config);
        let token = create_token(&AuthKeys::from_secret(SECRET.as_bytes()), Uuid::new_v4())
            .expect("token");
        Self { app, store, token }
    }

    fn other_user_token(&self) -> String {
        create_token(&AuthKeys::from_secret(SECRET.as_bytes()), Uuid::new_v4()).expect("token")
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_as(&self.token, method, uri, body).await
    }

    async fn send_as(
        &self,
        token: &str,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {token}"));
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn start_route(&self) -> String {
        let (status, body) = self.send("POST", "/routes", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "recording");
        body["id"].as_str().unwrap().to_string()
    }
}

fn point(lat: f64, lon: f64, at: &str) -> Value {
    json!({ "latitude": lat, "longitude": lon, "recordedAt": at })
}

#[tokio::test]
async fn test_health_check_is_public() {
    let app = TestApp::new();
    let response = app
        .app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_routes_require_a_token() {
    let app = TestApp::new();
    let response = app
        .app
        .clone()
        .oneshot(Request::post("/routes").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, body) = app.send_as("not-a-jwt", "GET", "/routes", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_batch_upload_filters_inaccurate_points() {
    let app = TestApp::new();
    let id = app.start_route().await;

    let mut noisy = point(35.6815, 139.7675, "2026-01-01T00:00:05Z");
    noisy["accuracy"] = json!(999.0);
    let mut precise = point(35.6818, 139.7679, "2026-01-01T00:00:10Z");
    precise["accuracy"] = json!(12.0);

    let (status, body) = app
        .send(
            "POST",
            &format!("/routes/{id}/points"),
            Some(json!({
                "points": [point(35.6812, 139.7671, "2026-01-01T00:00:00Z"), noisy, precise]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "received": 3, "stored": 2 }));

    let route_id: Uuid = id.parse().unwrap();
    assert_eq!(app.store.point_count(route_id).await, 2);
}

#[tokio::test]
async fn test_batch_validation_errors() {
    let app = TestApp::new();
    let id = app.start_route().await;

    let (status, body) = app
        .send(
            "POST",
            &format!("/routes/{id}/points"),
            Some(json!({ "points": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .send(
            "POST",
            &format!("/routes/{id}/points"),
            Some(json!({ "points": [point(999.0, 139.0, "2026-01-01T00:00:00Z")] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"][0]["field"], "points[0].latitude");

    let too_many: Vec<Value> = (0..501)
        .map(|_| point(35.0, 139.0, "2026-01-01T00:00:00Z"))
        .collect();
    let (status, _) = app
        .send(
            "POST",
            &format!("/routes/{id}/points"),
            Some(json!({ "points": too_many })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stop_computes_summary_once() {
    let app = TestApp::new();
    let id = app.start_route().await;

    let mut points = Vec::new();
    for (i, speed) in [0.0, 10.0, 20.0].into_iter().enumerate() {
        let mut p = point(
            35.6812 + i as f64 * 0.0003,
            139.7671,
            &format!("2026-01-01T00:00:{:02}Z", i * 5),
        );
        p["speed"] = json!(speed);
        points.push(p);
    }
    let (status, _) = app
        .send(
            "POST",
            &format!("/routes/{id}/points"),
            Some(json!({ "points": points })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, stopped) = app.send("PATCH", &format!("/routes/{id}/stop"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stopped["status"], "completed");
    assert_eq!(stopped["maxSpeedKmh"], 72.0);
    assert!(stopped["distanceM"].as_f64().unwrap() > 0.0);

    let (status, body) = app.send("PATCH", &format!("/routes/{id}/stop"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_STATE");

    let (status, _) = app
        .send(
            "POST",
            &format!("/routes/{id}/points"),
            Some(json!({ "points": [point(35.0, 139.0, "2026-01-01T00:01:00Z")] })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, detail) = app.send("GET", &format!("/routes/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["distanceM"], stopped["distanceM"]);
    assert_eq!(detail["endedAt"], stopped["endedAt"]);
    assert_eq!(detail["points"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_title_update_and_delete() {
    let app = TestApp::new();
    let id = app.start_route().await;

    let (status, body) = app
        .send(
            "PATCH",
            &format!("/routes/{id}"),
            Some(json!({ "title": "Shibuya to Hakone" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Shibuya to Hakone");

    let (status, _) = app
        .send("PATCH", &format!("/routes/{id}"), Some(json!({ "title": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.send("DELETE", &format!("/routes/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let (status, _) = app.send("GET", &format!("/routes/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_routes_are_private_to_their_owner() {
    let app = TestApp::new();
    let id = app.start_route().await;
    let stranger = app.other_user_token();

    let (status, _) = app
        .send_as(&stranger, "GET", &format!("/routes/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send_as(&stranger, "PATCH", &format!("/routes/{id}/stop"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = app.send_as(&stranger, "GET", "/routes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list["data"].as_array().unwrap().is_empty());
    assert!(list["nextCursor"].is_null());
}

#[tokio::test]
async fn test_list_returns_newest_first() {
    let app = TestApp::new();
    let first = app.start_route().await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = app.start_route().await;

    let (status, list) = app.send("GET", "/routes?limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    let data = list["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], second.as_str());
    assert!(list["nextCursor"].is_string());

    let (_, all) = app.send("GET", "/routes", None).await;
    let ids: Vec<&str> = all["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);
}

#[tokio::test]
async fn test_undecodable_input_uses_the_error_envelope() {
    let app = TestApp::new();
    let id = app.start_route().await;

    // Point without a timestamp.
    let (status, body) = app
        .send(
            "POST",
            &format!("/routes/{id}/points"),
            Some(json!({ "points": [{ "latitude": 35.68, "longitude": 139.76 }] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"][0]["field"], "body");
    assert!(
        body["error"]["details"][0]["message"]
            .as_str()
            .unwrap()
            .contains("recordedAt")
    );

    let (status, body) = app
        .send("PATCH", &format!("/routes/{id}"), Some(json!({ "title": 7 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = app.send("GET", "/routes?limit=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"][0]["field"], "query");

    let (status, body) = app.send("PATCH", "/routes/not-a-uuid/stop", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"][0]["field"], "path");

    // Nothing was stored and the route is still recording.
    let route_id: Uuid = id.parse().unwrap();
    assert_eq!(app.store.point_count(route_id).await, 0);
}
