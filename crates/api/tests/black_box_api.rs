use reqwest::StatusCode;
use serde_json::{Value, json};

use tradeflow_api::app::Background;
use tradeflow_infra::AppConfig;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
    _background: Background,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over the in-memory store, bound to an ephemeral port.
        let config = AppConfig::from_lookup(|_| None).expect("default config");
        let (app, background) = tradeflow_api::app::build_app(&config)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            handle,
            _background: background,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> (StatusCode, Value) {
    let res = client.post(url).json(&body).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap_or(Value::Null))
}

async fn get(client: &reqwest::Client, url: String) -> (StatusCode, Value) {
    let res = client.get(url).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap_or(Value::Null))
}

/// u1 with 100.00; m1 selling sku1 "X" at 10.00 × 10.
async fn seed(client: &reqwest::Client, srv: &TestServer) {
    let (status, _) = post(client, srv.url("/users/u1/deposit"), json!({ "amount": "100.00" })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, product) = post(
        client,
        srv.url("/merchants/m1/products/sku1/stock"),
        json!({ "name": "X", "price": "10.00", "quantity": 10 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["stock_quantity"], 10);
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn order_lifecycle_deposit_stock_order_query() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    seed(&client, &srv).await;

    let (status, order) = post(
        &client,
        srv.url("/orders"),
        json!({ "username": "u1", "sku": "sku1", "quantity": 2 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "COMPLETED");
    assert_eq!(order["total_price"], "20.00");
    assert_eq!(order["unit_price"], "10.00");

    let id = order["id"].as_i64().unwrap();
    let (status, fetched) = get(&client, srv.url(&format!("/orders/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "COMPLETED");

    let (status, user) = get(&client, srv.url("/users/u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["balance"], "80.00");
}

#[tokio::test]
async fn business_rule_failures_are_400_with_a_code() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    seed(&client, &srv).await;

    let (status, body) = post(
        &client,
        srv.url("/orders"),
        json!({ "username": "u1", "sku": "sku1", "quantity": 11 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_stock");
    assert!(body["message"].as_str().is_some());

    let (status, body) = post(
        &client,
        srv.url("/merchants/m2/products/sku1/stock"),
        json!({ "name": "X", "price": "10.00", "quantity": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "product_belongs_to_another_merchant");
}

#[tokio::test]
async fn missing_amount_or_price_is_invalid_amount() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = post(&client, srv.url("/users/u1/deposit"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_amount");

    let (status, body) = post(
        &client,
        srv.url("/users/u1/deposit"),
        json!({ "amount": "79228162514264337593543950335" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_amount");

    let (status, body) = post(
        &client,
        srv.url("/merchants/m1/products/sku1/stock"),
        json!({ "name": "X", "quantity": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_amount");
}

#[tokio::test]
async fn unknown_resources_are_404() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = get(&client, srv.url("/users/nobody")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "user_not_found");

    let (status, body) = post(
        &client,
        srv.url("/orders"),
        json!({ "username": "ghost", "sku": "sku1", "quantity": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "user_not_found");

    let (status, body) = get(&client, srv.url("/orders/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "order_not_found");

    let (status, body) = get(&client, srv.url("/orders/not-a-number")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let (status, body) = post(
        &client,
        srv.url("/orders"),
        json!({ "username": "ghost", "sku": "sku1", "quantity": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "user_not_found");
}

#[tokio::test]
async fn settlement_run_then_latest() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, _) = get(&client, srv.url("/settlement/latest")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    seed(&client, &srv).await;
    let (status, _) = post(
        &client,
        srv.url("/orders"),
        json!({ "username": "u1", "sku": "sku1", "quantity": 2 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, report) = post(&client, srv.url("/settlement/run"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let m1 = &report["results"][0];
    assert_eq!(m1["merchant_name"], "m1");
    assert_eq!(m1["expected"], "20.00");
    assert_eq!(m1["actual"], "20.00");
    assert_eq!(m1["diff"], "0.00");

    let (status, latest) = get(&client, srv.url("/settlement/latest")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["run_id"], report["run_id"]);
}

#[tokio::test]
async fn order_activity_catches_up_with_the_bus() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    seed(&client, &srv).await;

    let (_, order) = post(
        &client,
        srv.url("/orders"),
        json!({ "username": "u1", "sku": "sku1", "quantity": 1 }),
    )
    .await;
    let id = order["id"].as_i64().unwrap();

    // The projection is fed asynchronously; poll briefly until it catches up.
    for _ in 0..100 {
        let (status, activity) = get(&client, srv.url(&format!("/orders/{id}/activity"))).await;
        if status == StatusCode::OK && !activity["completed_at"].is_null() {
            assert_eq!(activity["username"], "u1");
            assert_eq!(activity["sku"], "sku1");
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    panic!("order activity did not become visible within timeout");
}
