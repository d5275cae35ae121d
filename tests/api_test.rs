//! HTTP API integration tests
//!
//! Each test serves the real router on an ephemeral port with every
//! simulated delay set to zero and the scheduler off.

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crop_support::config::Config;
use crop_support::routes::create_router;
use crop_support::AppContext;

const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

struct TestServer {
    base: String,
    client: Client,
}

impl TestServer {
    async fn start() -> Self {
        let mut config = Config::default();
        config.detection.analysis_delay_ms = 0;
        config.detection.preprocess_delay_ms = 0;
        config.mandi.min_latency_ms = 0;
        config.mandi.max_latency_ms = 0;
        config.schemes.fetch_delay_ms = 0;
        config.scheduler.enabled = false;

        let ctx = Arc::new(AppContext::new(config).await.expect("context builds"));
        ctx.register_tasks().await;

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr: SocketAddr = listener.local_addr().expect("local addr");
        let app = create_router(ctx);
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server runs");
        });

        Self {
            base: format!("http://{addr}"),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.get(self.url(path)).send().await.expect("request");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("request");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }

    async fn upload(&self, form: Form) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.url("/api/disease-detection"))
            .multipart(form)
            .send()
            .await
            .expect("request");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }

    async fn register(&self, email: &str, farm_size: f64) -> Value {
        let (status, body) = self
            .post(
                "/api/auth",
                json!({
                    "action": "register",
                    "email": email,
                    "password": "kharif-season",
                    "name": "Test Farmer",
                    "farmSize": farm_size,
                    "crops": ["Wheat"],
                    "location": "Punjab",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }
}

fn leaf_image(len: usize) -> Vec<u8> {
    let mut bytes = PNG_HEADER.to_vec();
    bytes.resize(len, 0x42);
    bytes
}

fn image_form(bytes: Vec<u8>, mime: &str) -> Form {
    Form::new().part(
        "image",
        Part::bytes(bytes)
            .file_name("leaf.png")
            .mime_str(mime)
            .expect("valid mime"),
    )
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;
    let body = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_register_and_login() {
    let server = TestServer::start().await;

    let registered = server.register("farmer@example.com", 1.5).await;
    assert_eq!(registered["success"], true);
    assert_eq!(registered["user"]["role"], "farmer");
    assert!(registered["user"].get("passwordHash").is_none());
    assert!(registered["token"].as_str().is_some_and(|t| !t.is_empty()));

    let (status, body) = server
        .post(
            "/api/auth",
            json!({ "action": "login", "email": "farmer@example.com", "password": "kharif-season" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], registered["user"]["id"]);

    let (status, body) = server
        .post(
            "/api/auth",
            json!({ "action": "login", "email": "farmer@example.com", "password": "rabi" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = server
        .post(
            "/api/auth",
            json!({ "action": "register", "email": "farmer@example.com", "password": "x" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .post(
            "/api/auth",
            json!({ "action": "logout", "email": "farmer@example.com", "password": "x" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid action");
}

#[tokio::test]
async fn test_disease_detection_flow() {
    let server = TestServer::start().await;

    let form = image_form(leaf_image(4096), "image/png")
        .text("userId", "user_field_7")
        .text("cropType", "Tomato")
        .text("location", "");
    let (status, body) = server.upload(form).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);

    let result = &body["result"];
    let confidence = result["confidence"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&confidence));
    assert!(result["detectionId"].as_str().unwrap().starts_with("detect_"));
    assert!(result["lowConfidence"].is_boolean());
    assert!(result["imageQuality"].is_object());
    assert!(result["timestamp"].is_string());

    let (status, history) = server
        .get("/api/disease-detection?userId=user_field_7")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["total"], 1);
    assert_eq!(history["hasMore"], false);
    assert_eq!(history["detections"][0]["cropType"], "Tomato");
}

#[tokio::test]
async fn test_disease_detection_rejects_bad_input() {
    let server = TestServer::start().await;

    let (status, body) = server.upload(Form::new().text("userId", "u1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No image provided");

    let (status, body) = server
        .upload(image_form(leaf_image(1024), "image/gif"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("not supported"));

    let (status, body) = server.get("/api/disease-detection").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User ID is required");
}

#[tokio::test]
async fn test_disease_catalogue_lookup() {
    let server = TestServer::start().await;

    let (status, all) = server.get("/api/disease-detection?action=diseases").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["diseases"].as_array().unwrap().len(), 7);

    let (_, potato) = server
        .get("/api/disease-detection?action=diseases&crop=potato")
        .await;
    assert!(potato["diseases"]
        .as_array()
        .unwrap()
        .iter()
        .any(|d| d == "Potato Early Blight"));

    let (status, info) = server
        .get("/api/disease-detection?action=info&disease=wheat%20rust")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["disease"]["disease"], "Wheat Rust");

    let (status, _) = server
        .get("/api/disease-detection?action=info&disease=Leaf%20Curl")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mandi_update_and_views() {
    let server = TestServer::start().await;

    let (status, body) = server.post("/api/mandi-prices", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true, "{body}");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .ends_with("from 3 sources"));
    assert!(body["result"]["totalUpdated"].as_u64().unwrap() > 0);

    let (status, listing) = server.get("/api/mandi-prices?crop=wheat&state=all").await;
    assert_eq!(status, StatusCode::OK);
    let prices = listing["prices"].as_array().unwrap();
    assert!(!prices.is_empty());
    assert!(prices.iter().all(|p| p["crop"] == "Wheat"));
    assert!(listing["filters"]["crops"].as_array().unwrap().len() > 1);
    assert!(listing["lastUpdated"].is_string());

    let (status, trends) = server.get("/api/mandi-prices?action=trends&crop=Wheat&days=7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trends["trends"]["crop"], "Wheat");

    let (status, compare) = server.get("/api/mandi-prices?action=compare&crop=Wheat").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(compare["comparison"]["markets"][0]["rank"], 1);

    let (status, status_body) = server.get("/api/mandi-prices?action=status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(status_body["status"]["isUpdating"], false);
}

#[tokio::test]
async fn test_mandi_errors() {
    let server = TestServer::start().await;

    let (status, _) = server.get("/api/mandi-prices?action=trends").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.get("/api/mandi-prices?action=compare&crop=all").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server.get("/api/mandi-prices?action=trends&crop=Saffron").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No price data found for Saffron");
}

#[tokio::test]
async fn test_schemes_search_and_eligibility() {
    let server = TestServer::start().await;

    let (status, body) = server.get("/api/government-schemes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 4);

    let (_, categories) = server.get("/api/government-schemes?action=categories").await;
    assert_eq!(categories["categories"].as_array().unwrap().len(), 4);

    let (_, found) = server.get("/api/government-schemes?query=PM-KISAN").await;
    let scheme_id = found["schemes"][0]["id"].as_str().unwrap().to_string();

    let large = server.register("large@example.com", 3.0).await;
    let small = server.register("small@example.com", 1.5).await;

    let path = |user: &Value| {
        format!(
            "/api/government-schemes?action=eligibility&schemeId={scheme_id}&userId={}",
            user["user"]["id"].as_str().unwrap()
        )
    };
    let (status, verdict) = server.get(&path(&large)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verdict["eligibility"]["isEligible"], false);

    let (_, verdict) = server.get(&path(&small)).await;
    assert_eq!(verdict["eligibility"]["isEligible"], true);

    let (status, _) = server
        .get("/api/government-schemes?action=eligibility&userId=nobody")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .get(&format!(
            "/api/government-schemes?action=eligibility&schemeId={scheme_id}&userId=user_missing"
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, recs) = server
        .get(&format!(
            "/api/government-schemes?action=recommendations&userId={}",
            small["user"]["id"].as_str().unwrap()
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(recs["recommendations"]["highPriority"].is_array());
}

#[tokio::test]
async fn test_scheme_application_lifecycle() {
    let server = TestServer::start().await;

    let (_, found) = server.get("/api/government-schemes?query=Soil").await;
    let scheme_id = found["schemes"][0]["id"].clone();

    let (status, created) = server
        .post(
            "/api/government-schemes",
            json!({
                "action": "apply",
                "userId": "user_applicant",
                "schemeId": scheme_id,
                "documents": [
                    { "type": "aadhaar", "filename": "aadhaar.pdf", "url": "/uploads/aadhaar.pdf" }
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{created}");
    assert_eq!(created["application"]["status"], "draft");
    let application_id = created["application"]["id"].as_str().unwrap().to_string();

    let submit = json!({ "action": "submit", "applicationId": application_id });
    let (status, submitted) = server.post("/api/government-schemes", submit.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["application"]["status"], "submitted");

    let (status, _) = server.post("/api/government-schemes", submit).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, fetched) = server
        .get(&format!(
            "/api/government-schemes?action=application&applicationId={application_id}"
        ))
        .await;
    assert_eq!(fetched["application"]["id"], application_id.as_str());

    let (_, mine) = server
        .get("/api/government-schemes?action=applications&userId=user_applicant")
        .await;
    assert_eq!(mine["total"], 1);

    let (_, notifications) = server
        .get("/api/notifications?userId=user_applicant")
        .await;
    assert_eq!(notifications["total"], 1);
    assert_eq!(notifications["notifications"][0]["type"], "scheme_update");

    let notification_id = notifications["notifications"][0]["id"].as_str().unwrap();
    let (status, read) = server
        .post(&format!("/api/notifications/{notification_id}/read"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["notification"]["isRead"], true);

    let (_, unread) = server
        .get("/api/notifications?userId=user_applicant&unreadOnly=true")
        .await;
    assert_eq!(unread["total"], 0);
}

#[tokio::test]
async fn test_scheme_refresh_and_invalid_action() {
    let server = TestServer::start().await;

    let (status, body) = server
        .post("/api/government-schemes", json!({ "action": "update" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Updated 1 schemes");

    let (status, body) = server
        .post("/api/government-schemes", json!({ "action": "delete" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_notifications_validation() {
    let server = TestServer::start().await;

    let (status, _) = server.get("/api/notifications").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .post("/api/notifications/notif_missing/read", json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_weather_and_admin() {
    let server = TestServer::start().await;

    let (status, weather) = server.get("/api/weather?location=Nashik").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(weather["weather"]["location"], "Nashik");
    assert_eq!(weather["weather"]["forecast"].as_array().unwrap().len(), 3);

    let (status, analytics) = server.get("/api/admin/analytics?timeframe=7d").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analytics["days"], 7);
    assert!(analytics["data"]["live"]["stats"].is_object());

    let (status, section) = server.get("/api/admin/analytics?metric=overview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(section["data"]["totalFarmers"], 15420);

    let (status, _) = server.get("/api/admin/analytics?metric=revenue").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.get("/api/admin/analytics?timeframe=1y").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, tasks) = server.get("/api/admin/tasks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tasks["tasks"].as_array().unwrap().len(), 0);
}
