use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate, Utc};
use tokio::sync::broadcast;
use tower::ServiceExt;

use motorent::config::AppConfig;
use motorent::db;
use motorent::routes;
use motorent::services::email::EmailProvider;
use motorent::services::payments::stripe::sign_payload;
use motorent::services::payments::{CheckoutLink, CheckoutRequest, PaymentGateway};
use motorent::services::pricing::PricingConfig;
use motorent::state::AppState;

const ADMIN_TOKEN: &str = "test-token";
const STRIPE_SECRET: &str = "whsec_test";
const PAYLINK_SECRET: &str = "paylink-secret";

// ── Mock Providers ──

type Sent = Arc<Mutex<Vec<(String, String)>>>;

struct MockEmail {
    sent: Sent,
}

#[async_trait]
impl EmailProvider for MockEmail {
    async fn send_email(&self, to: &str, subject: &str, _body: &str) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

struct MockGateway {
    prefix: &'static str,
    fail: bool,
    requests: Arc<Mutex<Vec<CheckoutRequest>>>,
}

impl MockGateway {
    fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            fail: false,
            requests: Arc::new(Mutex::new(vec![])),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_checkout(&self, request: &CheckoutRequest) -> anyhow::Result<CheckoutLink> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            anyhow::bail!("provider unavailable");
        }
        Ok(CheckoutLink {
            id: format!("{}_{}", self.prefix, request.booking_id),
            url: format!("https://pay.example/{}/{}", self.prefix, request.booking_id),
        })
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: ADMIN_TOKEN.to_string(),
        site_url: "https://rent.example".to_string(),
        stripe_secret_key: "sk_test".to_string(),
        stripe_webhook_secret: STRIPE_SECRET.to_string(),
        stripe_api_base: "http://localhost".to_string(),
        paylink_api_url: "http://localhost".to_string(),
        paylink_api_key: "pl_key".to_string(),
        paylink_webhook_secret: PAYLINK_SECRET.to_string(),
        email_api_url: "http://localhost".to_string(),
        email_api_key: String::new(),
        email_from: "Motorent <bookings@rent.example>".to_string(),
        shop_email: "shop@rent.example".to_string(),
        pricing: PricingConfig::default(),
    }
}

struct TestApp {
    state: Arc<AppState>,
    sent: Sent,
    stripe_requests: Arc<Mutex<Vec<CheckoutRequest>>>,
}

fn build_app(stripe_fails: bool) -> TestApp {
    let conn = db::init_db(":memory:").unwrap();
    let sent: Sent = Arc::new(Mutex::new(vec![]));
    let mut stripe = MockGateway::new("cs");
    stripe.fail = stripe_fails;
    let stripe_requests = Arc::clone(&stripe.requests);
    let (events_tx, _) = broadcast::channel(16);

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: test_config(),
        email: Box::new(MockEmail {
            sent: Arc::clone(&sent),
        }),
        stripe: Box::new(stripe),
        paylink: Box::new(MockGateway::new("pl")),
        events_tx,
    });

    TestApp {
        state,
        sent,
        stripe_requests,
    }
}

fn test_app() -> TestApp {
    build_app(false)
}

impl TestApp {
    fn router(&self) -> Router {
        routes::router(Arc::clone(&self.state))
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = self.router().oneshot(req).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn admin(
        &self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {ADMIN_TOKEN}"));
        let req = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(req).await
    }

    async fn post_json(&self, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn checkout(&self, provider: &str, option: &str, quantity: u32) -> (StatusCode, serde_json::Value) {
        let (start, end) = future_range();
        self.post_json(
            "/api/checkout",
            serde_json::json!({
                "customer_name": "Alice Rider",
                "customer_email": "alice@example.com",
                "customer_phone": "+15550001111",
                "start_date": start,
                "end_date": end,
                "bike_quantity": quantity,
                "provider": provider,
                "payment_option": option,
            }),
        )
        .await
    }

    async fn stripe_webhook(&self, payload: &serde_json::Value, secret: &str) -> StatusCode {
        let body = payload.to_string();
        let signature = sign_payload(secret, Utc::now().timestamp(), body.as_bytes());
        let (status, _) = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/webhook/stripe")
                    .header("Content-Type", "application/json")
                    .header("Stripe-Signature", signature)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await;
        status
    }

    fn emails_sent(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

/// Three-day rental a month out, so checkout never sees a past date.
fn future_range() -> (NaiveDate, NaiveDate) {
    let start = Utc::now().date_naive() + Duration::days(30);
    (start, start + Duration::days(2))
}

fn stripe_event(event_type: &str, booking_id: &str, payment_status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "evt_1",
        "type": event_type,
        "data": {
            "object": {
                "id": format!("cs_{booking_id}"),
                "payment_status": payment_status,
                "payment_intent": "pi_123",
                "client_reference_id": booking_id,
                "metadata": { "booking_id": booking_id },
                "amount_total": 7200
            }
        }
    })
}

fn manual_booking(quantity: u32) -> serde_json::Value {
    let (start, end) = future_range();
    serde_json::json!({
        "customer_name": "Walk In",
        "customer_email": "walkin@example.com",
        "start_date": start,
        "end_date": end,
        "bike_quantity": quantity,
    })
}

// ── Public API Tests ──

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, json) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_quote() {
    let app = test_app();
    let (status, json) = app
        .get("/api/quote?start_date=2030-07-01&end_date=2030-07-03&quantity=2")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["days"], 3);
    assert_eq!(json["price_per_bike_cents"], 24_000);
    assert_eq!(json["total_cents"], 48_000);
    assert_eq!(json["down_payment_cents"], 14_400);
    assert_eq!(json["deposit_cents"], 100_000);
    assert_eq!(json["currency"], "eur");
}

#[tokio::test]
async fn test_quote_rejects_reversed_range() {
    let app = test_app();
    let (status, json) = app
        .get("/api/quote?start_date=2030-07-05&end_date=2030-07-01")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("end_date"));
}

#[tokio::test]
async fn test_quote_rejects_oversized_requests() {
    let app = test_app();
    let (status, json) = app
        .get("/api/quote?start_date=2025-01-01&end_date=9999-12-31&quantity=4000000000")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (status, _) = app
        .get("/api/quote?start_date=2030-07-01&end_date=2030-07-03&quantity=101")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .get("/api/quote?start_date=2030-01-01&end_date=2031-01-01&quantity=1")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .get("/api/availability?start_date=2030-07-01&end_date=2030-07-03&quantity=500")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_availability_full_fleet() {
    let app = test_app();
    let (status, json) = app
        .get("/api/availability?start_date=2030-07-01&end_date=2030-07-03&quantity=3")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["fleet_size"], 5);
    assert_eq!(json["available"], 5);
    assert_eq!(json["is_available"], true);
}

#[tokio::test]
async fn test_checkout_creates_pending_booking() {
    let app = test_app();
    let (status, json) = app.checkout("stripe", "down_payment", 1).await;
    assert_eq!(status, StatusCode::OK);

    let booking_id = json["booking_id"].as_str().unwrap().to_string();
    assert_eq!(json["amount_due_online_cents"], 7_200);
    assert_eq!(
        json["checkout_url"],
        format!("https://pay.example/cs/{booking_id}")
    );

    {
        let requests = app.stripe_requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].amount_cents, 7_200);
        assert_eq!(requests[0].customer_email, "alice@example.com");
        assert!(requests[0].success_url.contains(&booking_id));
    }

    let (status, json) = app.get(&format!("/api/bookings/{booking_id}/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "pending");
    assert_eq!(json["payment_status"], "unpaid");

    // Pending bookings don't block the fleet
    let (start, end) = future_range();
    let (_, json) = app
        .get(&format!("/api/availability?start_date={start}&end_date={end}"))
        .await;
    assert_eq!(json["available"], 5);
}

#[tokio::test]
async fn test_checkout_rejects_more_bikes_than_fleet() {
    let app = test_app();
    let (status, json) = app.checkout("stripe", "down_payment", 6).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("5"));
    assert!(app.stripe_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_rejects_manual_provider() {
    let app = test_app();
    let (status, _) = app.checkout("manual", "full", 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_rejects_past_dates() {
    let app = test_app();
    let (status, _) = app
        .post_json(
            "/api/checkout",
            serde_json::json!({
                "customer_name": "Alice",
                "customer_email": "alice@example.com",
                "start_date": "2020-01-01",
                "end_date": "2020-01-03",
                "bike_quantity": 1,
                "provider": "stripe",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_gateway_failure_marks_booking_failed() {
    let app = build_app(true);
    let (status, _) = app.checkout("stripe", "down_payment", 1).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, json) = app
        .admin("GET", "/api/admin/bookings?status=failed", None)
        .await;
    let bookings = json.as_array().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0]["customer_email"], "alice@example.com");
}

#[tokio::test]
async fn test_booking_status_unknown() {
    let app = test_app();
    let (status, _) = app.get("/api/bookings/nope/status").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Stripe Webhook Tests ──

#[tokio::test]
async fn test_stripe_webhook_confirms_and_assigns() {
    let app = test_app();
    let (_, json) = app.checkout("stripe", "down_payment", 2).await;
    let booking_id = json["booking_id"].as_str().unwrap().to_string();

    let event = stripe_event("checkout.session.completed", &booking_id, "paid");
    assert_eq!(app.stripe_webhook(&event, STRIPE_SECRET).await, StatusCode::OK);

    let (_, json) = app
        .admin("GET", &format!("/api/admin/bookings/{booking_id}"), None)
        .await;
    assert_eq!(json["booking"]["status"], "confirmed");
    assert_eq!(json["booking"]["payment_status"], "down_payment_paid");
    assert_eq!(json["booking"]["stripe_payment_intent"], "pi_123");
    assert_eq!(json["booking"]["webhook_received"], true);
    let motorcycles = json["motorcycles"].as_array().unwrap();
    assert_eq!(motorcycles.len(), 2);
    assert_eq!(motorcycles[0]["id"], 1);
    assert_eq!(motorcycles[1]["id"], 2);

    // Customer confirmation and shop notice
    {
        let sent = app.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().any(|(to, _)| to == "alice@example.com"));
        assert!(sent.iter().any(|(to, _)| to == "shop@rent.example"));
    }

    let (start, end) = future_range();
    let (_, json) = app
        .get(&format!("/api/availability?start_date={start}&end_date={end}"))
        .await;
    assert_eq!(json["available"], 3);
}

#[tokio::test]
async fn test_stripe_payment_without_free_bikes_alerts_shop() {
    let app = test_app();
    let (_, json) = app.checkout("stripe", "down_payment", 1).await;
    let booking_id = json["booking_id"].as_str().unwrap().to_string();

    // The pending checkout holds nothing, so a walk-in can take the whole fleet.
    let (status, _) = app
        .admin("POST", "/api/admin/bookings", Some(manual_booking(5)))
        .await;
    assert_eq!(status, StatusCode::OK);

    let event = stripe_event("checkout.session.completed", &booking_id, "paid");
    assert_eq!(app.stripe_webhook(&event, STRIPE_SECRET).await, StatusCode::OK);

    let (_, json) = app
        .admin("GET", &format!("/api/admin/bookings/{booking_id}"), None)
        .await;
    assert_eq!(json["booking"]["status"], "confirmed");
    assert_eq!(json["booking"]["payment_status"], "down_payment_paid");
    assert!(json["motorcycles"].as_array().unwrap().is_empty());

    let sent = app.sent.lock().unwrap();
    assert!(sent.iter().any(|(to, subject)| {
        to == "shop@rent.example"
            && subject == &format!("Action needed: assign motorcycles to booking {booking_id}")
    }));
    assert!(sent.iter().any(|(to, _)| to == "alice@example.com"));
}

#[tokio::test]
async fn test_stripe_webhook_is_idempotent() {
    let app = test_app();
    let (_, json) = app.checkout("stripe", "down_payment", 1).await;
    let booking_id = json["booking_id"].as_str().unwrap().to_string();

    let event = stripe_event("checkout.session.completed", &booking_id, "paid");
    assert_eq!(app.stripe_webhook(&event, STRIPE_SECRET).await, StatusCode::OK);
    assert_eq!(app.stripe_webhook(&event, STRIPE_SECRET).await, StatusCode::OK);

    assert_eq!(app.emails_sent(), 2);
    let (_, json) = app
        .admin("GET", &format!("/api/admin/bookings/{booking_id}"), None)
        .await;
    assert_eq!(json["motorcycles"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_stripe_webhook_falls_back_to_session_id() {
    let app = test_app();
    let (_, json) = app.checkout("stripe", "full", 1).await;
    let booking_id = json["booking_id"].as_str().unwrap().to_string();

    let mut event = stripe_event("checkout.session.completed", &booking_id, "paid");
    let object = event["data"]["object"].as_object_mut().unwrap();
    object.remove("metadata");
    object.remove("client_reference_id");
    assert_eq!(app.stripe_webhook(&event, STRIPE_SECRET).await, StatusCode::OK);

    let (_, json) = app.get(&format!("/api/bookings/{booking_id}/status")).await;
    assert_eq!(json["status"], "fully_paid");
    assert_eq!(json["payment_status"], "paid");
}

#[tokio::test]
async fn test_stripe_webhook_unpaid_session_waits() {
    let app = test_app();
    let (_, json) = app.checkout("stripe", "down_payment", 1).await;
    let booking_id = json["booking_id"].as_str().unwrap().to_string();

    let event = stripe_event("checkout.session.completed", &booking_id, "unpaid");
    assert_eq!(app.stripe_webhook(&event, STRIPE_SECRET).await, StatusCode::OK);

    let (_, json) = app.get(&format!("/api/bookings/{booking_id}/status")).await;
    assert_eq!(json["status"], "pending");
    assert_eq!(app.emails_sent(), 0);
}

#[tokio::test]
async fn test_stripe_webhook_bad_signature() {
    let app = test_app();
    let (_, json) = app.checkout("stripe", "down_payment", 1).await;
    let booking_id = json["booking_id"].as_str().unwrap().to_string();

    let event = stripe_event("checkout.session.completed", &booking_id, "paid");
    assert_eq!(
        app.stripe_webhook(&event, "whsec_wrong").await,
        StatusCode::BAD_REQUEST
    );

    let (_, json) = app.get(&format!("/api/bookings/{booking_id}/status")).await;
    assert_eq!(json["status"], "pending");
}

#[tokio::test]
async fn test_stripe_webhook_missing_signature() {
    let app = test_app();
    let (status, _) = app
        .post_json("/webhook/stripe", stripe_event("checkout.session.completed", "x", "paid"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stripe_webhook_expired_session_fails_booking() {
    let app = test_app();
    let (_, json) = app.checkout("stripe", "down_payment", 1).await;
    let booking_id = json["booking_id"].as_str().unwrap().to_string();

    let event = stripe_event("checkout.session.expired", &booking_id, "unpaid");
    assert_eq!(app.stripe_webhook(&event, STRIPE_SECRET).await, StatusCode::OK);

    let (_, json) = app.get(&format!("/api/bookings/{booking_id}/status")).await;
    assert_eq!(json["status"], "failed");
    assert_eq!(json["payment_status"], "expired");
}

#[tokio::test]
async fn test_stripe_late_expiry_does_not_undo_payment() {
    let app = test_app();
    let (_, json) = app.checkout("stripe", "down_payment", 1).await;
    let booking_id = json["booking_id"].as_str().unwrap().to_string();

    let paid = stripe_event("checkout.session.completed", &booking_id, "paid");
    app.stripe_webhook(&paid, STRIPE_SECRET).await;
    let expired = stripe_event("checkout.session.expired", &booking_id, "unpaid");
    assert_eq!(app.stripe_webhook(&expired, STRIPE_SECRET).await, StatusCode::OK);

    let (_, json) = app.get(&format!("/api/bookings/{booking_id}/status")).await;
    assert_eq!(json["status"], "confirmed");
}

#[tokio::test]
async fn test_stripe_webhook_unknown_booking_is_acknowledged() {
    let app = test_app();
    let event = stripe_event("checkout.session.completed", "does-not-exist", "paid");
    assert_eq!(app.stripe_webhook(&event, STRIPE_SECRET).await, StatusCode::OK);
}

#[tokio::test]
async fn test_stripe_webhook_ignores_other_events() {
    let app = test_app();
    let event = serde_json::json!({
        "id": "evt_2",
        "type": "customer.created",
        "data": { "object": { "id": "cus_1" } }
    });
    assert_eq!(app.stripe_webhook(&event, STRIPE_SECRET).await, StatusCode::OK);
}

// ── Payment Link Webhook Tests ──

#[tokio::test]
async fn test_paylink_webhook_wrong_secret() {
    let app = test_app();
    let (_, json) = app.checkout("paylink", "full", 1).await;
    let booking_id = json["booking_id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post_json(
            "/webhook/paylink",
            serde_json::json!({
                "order_id": booking_id,
                "status": "success",
                "secret_key": "guess",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, json) = app.get(&format!("/api/bookings/{booking_id}/status")).await;
    assert_eq!(json["status"], "pending");
}

#[tokio::test]
async fn test_paylink_webhook_full_payment() {
    let app = test_app();
    let (_, json) = app.checkout("paylink", "full", 1).await;
    let booking_id = json["booking_id"].as_str().unwrap().to_string();
    assert_eq!(json["amount_due_online_cents"], 24_000);

    let (status, json) = app
        .post_json(
            "/webhook/paylink",
            serde_json::json!({
                "order_id": booking_id,
                "transaction_id": "tx-77",
                "status": "success",
                "amount": 24_000,
                "secret_key": PAYLINK_SECRET,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);

    let (_, json) = app
        .admin("GET", &format!("/api/admin/bookings/{booking_id}"), None)
        .await;
    assert_eq!(json["booking"]["status"], "fully_paid");
    assert_eq!(json["booking"]["payment_status"], "paid");
    assert_eq!(json["booking"]["paylink_transaction_id"], "tx-77");
    assert_eq!(json["booking"]["paylink_order_id"], format!("pl_{booking_id}"));
    assert_eq!(json["motorcycles"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_paylink_webhook_declined() {
    let app = test_app();
    let (_, json) = app.checkout("paylink", "down_payment", 1).await;
    let booking_id = json["booking_id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post_json(
            "/webhook/paylink",
            serde_json::json!({
                "order_id": booking_id,
                "status": "declined",
                "secret_key": PAYLINK_SECRET,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = app.get(&format!("/api/bookings/{booking_id}/status")).await;
    assert_eq!(json["status"], "failed");
    assert_eq!(json["payment_status"], "failed");
}

#[tokio::test]
async fn test_paylink_webhook_ignores_stripe_booking() {
    let app = test_app();
    let (_, json) = app.checkout("stripe", "full", 1).await;
    let booking_id = json["booking_id"].as_str().unwrap().to_string();

    let (status, json) = app
        .post_json(
            "/webhook/paylink",
            serde_json::json!({
                "order_id": booking_id,
                "transaction_id": "tx-99",
                "status": "success",
                "amount": 24_000,
                "secret_key": PAYLINK_SECRET,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);

    let (_, json) = app
        .admin("GET", &format!("/api/admin/bookings/{booking_id}"), None)
        .await;
    assert_eq!(json["booking"]["status"], "pending");
    assert_eq!(json["booking"]["webhook_received"], false);
    assert!(json["booking"]["paylink_transaction_id"].is_null());
    assert!(json["motorcycles"].as_array().unwrap().is_empty());
    assert_eq!(app.emails_sent(), 0);

    // The real provider can still confirm it afterwards.
    let event = stripe_event("checkout.session.completed", &booking_id, "paid");
    assert_eq!(app.stripe_webhook(&event, STRIPE_SECRET).await, StatusCode::OK);
    let (_, json) = app.get(&format!("/api/bookings/{booking_id}/status")).await;
    assert_eq!(json["status"], "fully_paid");
}

// ── Calendar Tests ──

#[tokio::test]
async fn test_calendar_only_for_active_bookings() {
    let app = test_app();
    let (_, json) = app.checkout("stripe", "down_payment", 1).await;
    let booking_id = json["booking_id"].as_str().unwrap().to_string();

    let uri = format!("/calendar/{booking_id}.ics");
    let res = app
        .router()
        .oneshot(Request::builder().uri(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let event = stripe_event("checkout.session.completed", &booking_id, "paid");
    app.stripe_webhook(&event, STRIPE_SECRET).await;

    let res = app
        .router()
        .oneshot(Request::builder().uri(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/calendar"));
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let ics = String::from_utf8(body.to_vec()).unwrap();
    assert!(ics.contains("BEGIN:VEVENT"));
    assert!(ics.contains(&format!("UID:{booking_id}@motorent")));
    assert!(ics.contains("Honda Africa Twin #1"));
}

// ── Contact & Messages Tests ──

#[tokio::test]
async fn test_contact_message_flow() {
    let app = test_app();
    let (status, json) = app
        .post_json(
            "/api/contact",
            serde_json::json!({
                "name": "Bob",
                "email": "bob@example.com",
                "message": "Do you rent helmets?",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    let id = json["id"].as_i64().unwrap();
    assert_eq!(app.emails_sent(), 1);

    let (_, json) = app.admin("GET", "/api/admin/messages?status=new", None).await;
    let messages = json.as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["body"], "Do you rent helmets?");

    let (_, json) = app.admin("GET", "/api/admin/stats", None).await;
    assert_eq!(json["unread_messages"], 1);

    let (status, _) = app
        .admin(
            "POST",
            &format!("/api/admin/messages/{id}/status"),
            Some(serde_json::json!({"status": "replied"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = app.admin("GET", "/api/admin/messages?status=new", None).await;
    assert!(json.as_array().unwrap().is_empty());

    let (status, _) = app
        .admin("DELETE", &format!("/api/admin/messages/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .admin("DELETE", &format!("/api/admin/messages/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_contact_requires_valid_email() {
    let app = test_app();
    let (status, _) = app
        .post_json(
            "/api/contact",
            serde_json::json!({"name": "Bob", "email": "bob", "message": "hi"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.emails_sent(), 0);
}

// ── Admin API Tests ──

#[tokio::test]
async fn test_admin_requires_auth() {
    let app = test_app();
    let (status, _) = app.get("/api/admin/bookings").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            Request::builder()
                .uri("/api/admin/stats")
                .header("Authorization", "Bearer wrong-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/admin/events?token=wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_events_stream_opens() {
    let app = test_app();
    let res = app
        .router()
        .oneshot(
            Request::builder()
                .uri(format!("/api/admin/events?token={ADMIN_TOKEN}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
}

#[tokio::test]
async fn test_admin_manual_booking_blocks_fleet() {
    let app = test_app();
    let (status, json) = app
        .admin("POST", "/api/admin/bookings", Some(manual_booking(5)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking"]["status"], "confirmed");
    assert_eq!(json["booking"]["payment_provider"], "manual");
    assert_eq!(json["booking"]["total_price_cents"], 120_000);
    assert_eq!(json["motorcycles"].as_array().unwrap().len(), 5);

    let (status, _) = app.checkout("stripe", "down_payment", 1).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .admin("POST", "/api/admin/bookings", Some(manual_booking(1)))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_manual_booking_price_override() {
    let app = test_app();
    let mut body = manual_booking(1);
    body["total_price_cents"] = serde_json::json!(20_000);
    body["status"] = serde_json::json!("pending");

    let (status, json) = app.admin("POST", "/api/admin/bookings", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking"]["total_price_cents"], 20_000);
    assert_eq!(json["booking"]["down_payment_cents"], 6_000);
    assert!(json["motorcycles"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_update_booking_reassigns() {
    let app = test_app();
    let (_, json) = app
        .admin("POST", "/api/admin/bookings", Some(manual_booking(3)))
        .await;
    let id = json["booking"]["id"].as_str().unwrap().to_string();

    let (status, json) = app
        .admin(
            "PATCH",
            &format!("/api/admin/bookings/{id}"),
            Some(serde_json::json!({"bike_quantity": 5, "notes": "group tour"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking"]["bike_quantity"], 5);
    assert_eq!(json["booking"]["total_price_cents"], 120_000);
    assert_eq!(json["booking"]["notes"], "group tour");
    assert_eq!(json["motorcycles"].as_array().unwrap().len(), 5);

    let (status, _) = app
        .admin(
            "PATCH",
            &format!("/api/admin/bookings/{id}"),
            Some(serde_json::json!({"bike_quantity": 6})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = app
        .admin(
            "PATCH",
            &format!("/api/admin/bookings/{id}"),
            Some(serde_json::json!({"status": "cancelled"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["motorcycles"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_update_booking_rejects_bad_email() {
    let app = test_app();
    let (_, json) = app
        .admin("POST", "/api/admin/bookings", Some(manual_booking(1)))
        .await;
    let id = json["booking"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .admin(
            "PATCH",
            &format!("/api/admin/bookings/{id}"),
            Some(serde_json::json!({"customer_email": "not-an-email"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_extending_paid_booking_keeps_amount_paid_online() {
    let app = test_app();
    let (_, json) = app.checkout("stripe", "down_payment", 1).await;
    let booking_id = json["booking_id"].as_str().unwrap().to_string();
    assert_eq!(json["amount_due_online_cents"], 7_200);

    let event = stripe_event("checkout.session.completed", &booking_id, "paid");
    assert_eq!(app.stripe_webhook(&event, STRIPE_SECRET).await, StatusCode::OK);

    let (start, _) = future_range();
    let (status, json) = app
        .admin(
            "PATCH",
            &format!("/api/admin/bookings/{booking_id}"),
            Some(serde_json::json!({"end_date": start + Duration::days(6)})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking"]["total_price_cents"], 45_000);
    assert_eq!(json["booking"]["down_payment_cents"], 13_500);
    assert_eq!(json["paid_online_cents"], 7_200);
    assert_eq!(json["remaining_due_cents"], 37_800);

    let (_, json) = app
        .admin("GET", &format!("/api/admin/bookings/{booking_id}"), None)
        .await;
    assert_eq!(json["remaining_due_cents"], 37_800);
}

#[tokio::test]
async fn test_admin_update_rejected_when_bikes_cannot_be_assigned() {
    let app = test_app();
    let (_, json) = app.checkout("stripe", "down_payment", 1).await;
    let booking_id = json["booking_id"].as_str().unwrap().to_string();

    let (_, json) = app
        .admin("POST", "/api/admin/bookings", Some(manual_booking(5)))
        .await;
    let walk_in = json["booking"]["id"].as_str().unwrap().to_string();

    let event = stripe_event("checkout.session.completed", &booking_id, "paid");
    assert_eq!(app.stripe_webhook(&event, STRIPE_SECRET).await, StatusCode::OK);

    let (status, _) = app
        .admin(
            "PATCH",
            &format!("/api/admin/bookings/{booking_id}"),
            Some(serde_json::json!({"notes": "call before pickup"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, json) = app
        .admin("GET", &format!("/api/admin/bookings/{booking_id}"), None)
        .await;
    assert!(json["booking"]["notes"].is_null());
    assert!(json["motorcycles"].as_array().unwrap().is_empty());

    let (status, _) = app
        .admin("POST", &format!("/api/admin/bookings/{walk_in}/cancel"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app
        .admin(
            "PATCH",
            &format!("/api/admin/bookings/{booking_id}"),
            Some(serde_json::json!({"notes": "call before pickup"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking"]["notes"], "call before pickup");
    assert_eq!(json["motorcycles"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_cancel_releases_motorcycles() {
    let app = test_app();
    let (_, json) = app
        .admin("POST", "/api/admin/bookings", Some(manual_booking(4)))
        .await;
    let id = json["booking"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .admin("POST", &format!("/api/admin/bookings/{id}/cancel"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = app
        .admin("GET", &format!("/api/admin/bookings/{id}"), None)
        .await;
    assert_eq!(json["booking"]["status"], "cancelled");
    assert!(json["motorcycles"].as_array().unwrap().is_empty());

    let (start, end) = future_range();
    let (_, json) = app
        .get(&format!("/api/availability?start_date={start}&end_date={end}"))
        .await;
    assert_eq!(json["available"], 5);

    let (status, _) = app
        .admin("POST", "/api/admin/bookings/missing/cancel", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_assign_requires_active_booking() {
    let app = test_app();
    let (_, json) = app.checkout("stripe", "down_payment", 1).await;
    let booking_id = json["booking_id"].as_str().unwrap().to_string();

    let (status, _) = app
        .admin("POST", &format!("/api/admin/bookings/{booking_id}/assign"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, json) = app
        .admin("POST", "/api/admin/bookings", Some(manual_booking(2)))
        .await;
    let id = json["booking"]["id"].as_str().unwrap().to_string();
    let (status, json) = app
        .admin("POST", &format!("/api/admin/bookings/{id}/assign"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_admin_resend_confirmation() {
    let app = test_app();
    let (_, json) = app
        .admin("POST", "/api/admin/bookings", Some(manual_booking(1)))
        .await;
    let id = json["booking"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .admin("POST", &format!("/api/admin/bookings/{id}/email"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let sent = app.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "walkin@example.com");
}

#[tokio::test]
async fn test_admin_delete_booking() {
    let app = test_app();
    let (_, json) = app
        .admin("POST", "/api/admin/bookings", Some(manual_booking(2)))
        .await;
    let id = json["booking"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .admin("DELETE", &format!("/api/admin/bookings/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .admin("GET", &format!("/api/admin/bookings/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (start, end) = future_range();
    let (_, json) = app
        .get(&format!("/api/availability?start_date={start}&end_date={end}"))
        .await;
    assert_eq!(json["available"], 5);
}

#[tokio::test]
async fn test_admin_bookings_filter() {
    let app = test_app();
    app.admin("POST", "/api/admin/bookings", Some(manual_booking(1)))
        .await;
    app.checkout("stripe", "down_payment", 1).await;

    let (_, json) = app.admin("GET", "/api/admin/bookings", None).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (_, json) = app
        .admin("GET", "/api/admin/bookings?status=pending", None)
        .await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (status, _) = app
        .admin("GET", "/api/admin/bookings?status=bogus", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_stats() {
    let app = test_app();
    app.admin("POST", "/api/admin/bookings", Some(manual_booking(2)))
        .await;
    app.checkout("stripe", "down_payment", 1).await;

    let (status, json) = app.admin("GET", "/api/admin/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["fleet_size"], 5);
    assert_eq!(json["upcoming_bookings"], 1);
    assert_eq!(json["bookings_by_status"]["confirmed"], 1);
    assert_eq!(json["bookings_by_status"]["pending"], 1);
    assert_eq!(json["unread_messages"], 0);
}

// ── Fleet Tests ──

#[tokio::test]
async fn test_fleet_toggle_changes_availability() {
    let app = test_app();
    let (_, json) = app.admin("GET", "/api/admin/motorcycles", None).await;
    let fleet = json.as_array().unwrap();
    assert_eq!(fleet.len(), 5);
    assert_eq!(fleet[0]["name"], "Honda Africa Twin #1");
    assert_eq!(fleet[0]["currently_booked"], false);

    let (status, json) = app
        .admin(
            "PATCH",
            "/api/admin/motorcycles/2",
            Some(serde_json::json!({"is_available": false})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_available"], false);

    let (_, json) = app
        .get("/api/availability?start_date=2030-07-01&end_date=2030-07-03")
        .await;
    assert_eq!(json["fleet_size"], 4);
    assert_eq!(json["available"], 4);

    let (status, _) = app
        .admin(
            "PATCH",
            "/api/admin/motorcycles/99",
            Some(serde_json::json!({"is_available": true})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fleet_add_motorcycle() {
    let app = test_app();
    let (status, json) = app
        .admin(
            "POST",
            "/api/admin/motorcycles",
            Some(serde_json::json!({"name": "Triumph Tiger 900"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], 6);
    assert_eq!(json["is_available"], true);

    let (status, _) = app
        .admin(
            "POST",
            "/api/admin/motorcycles",
            Some(serde_json::json!({"name": "  "})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, json) = app
        .get("/api/availability?start_date=2030-07-01&end_date=2030-07-03")
        .await;
    assert_eq!(json["fleet_size"], 6);
}

#[tokio::test]
async fn test_fleet_marks_bikes_out_today() {
    let app = test_app();
    let today = Utc::now().date_naive();
    let (status, _) = app
        .admin(
            "POST",
            "/api/admin/bookings",
            Some(serde_json::json!({
                "customer_name": "Today Rider",
                "customer_email": "today@example.com",
                "start_date": today,
                "end_date": today + Duration::days(1),
                "bike_quantity": 1,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = app.admin("GET", "/api/admin/motorcycles", None).await;
    let fleet = json.as_array().unwrap();
    assert_eq!(fleet[0]["currently_booked"], true);
    assert_eq!(fleet[1]["currently_booked"], false);
}
