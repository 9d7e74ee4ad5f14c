//! End-to-end billing workflow tests: issuance, proof upload, verification
//! and the notification side effect, driven through the full router.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use pondok::api::{router, AppState};
use pondok::domain::{BillStatus, BillingPeriod};
use pondok::notify::{PaymentNotification, PaymentNotifier};
use pondok::store::{MemoryStore, Store};
use pondok::ConfigBuilder;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;
use uuid::Uuid;

// =============================================================================
// Harness
// =============================================================================

struct RecordingNotifier {
    sent: Mutex<Vec<PaymentNotification>>,
    deliver: bool,
}

impl RecordingNotifier {
    fn new(deliver: bool) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            deliver,
        }
    }

    fn sent(&self) -> Vec<PaymentNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentNotifier for RecordingNotifier {
    async fn payment_status_changed(&self, notification: &PaymentNotification) -> bool {
        self.sent.lock().unwrap().push(notification.clone());
        self.deliver
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
}

const SERVICE_KEY: &str = "test-service-key";

fn test_app(deliver_notifications: bool) -> TestApp {
    let upload_dir = std::env::temp_dir().join(format!("pondok-test-{}", Uuid::new_v4().simple()));
    let config = ConfigBuilder::new()
        .with_token_secret("test-secret-key-32-bytes-long!!")
        .with_service_key(SERVICE_KEY)
        .with_upload_dir(upload_dir.display().to_string())
        .build()
        .unwrap();

    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new(deliver_notifications));
    let state = AppState::new(Arc::new(config), store.clone(), notifier.clone());

    TestApp {
        router: router(state),
        store,
        notifier,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    /// Register a tenant through the API and issue a bill for them via the
    /// automation service credential. Returns (tenant token, bill id).
    async fn tenant_with_bill(&self, period: &str) -> (String, i64) {
        let (status, body) = self
            .send(post_json(
                "/auth/register",
                None,
                json!({
                    "email": format!("budi-{}@example.com", Uuid::new_v4().simple()),
                    "password": "rahasia-123",
                    "name": "Budi",
                    "phone": "+6281234567890",
                }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let token = body["token"].as_str().unwrap().to_string();
        let user_id = body["user"]["id"].as_str().unwrap().to_string();

        let tenant = self
            .store
            .find_tenant_by_user(&user_id)
            .await
            .unwrap()
            .unwrap();

        let (status, body) = self
            .send(post_json(
                "/admin/tagihan",
                Some(SERVICE_KEY),
                json!({ "tenantId": tenant.id, "period": period, "amount": 500000 }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "issue bill failed: {body}");
        let bill_id = body["bill"]["id"].as_i64().unwrap();
        assert_eq!(body["bill"]["status"], "UNPAID");

        (token, bill_id)
    }

    async fn submit_proof(&self, token: &str, bill_id: i64) -> (StatusCode, Value) {
        let boundary = "pondok-test-boundary";
        let body = multipart_file(boundary, "proof", "bukti.jpg", b"fake image bytes");
        let request = Request::builder()
            .method("POST")
            .uri(format!("/penghuni/tagihan/{bill_id}/bayar"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn confirm(&self, bill_id: i64, action: &str, reason: Option<&str>) -> (StatusCode, Value) {
        let mut payload = json!({ "action": action });
        if let Some(reason) = reason {
            payload["reason"] = json!(reason);
        }
        self.send(post_json(
            &format!("/admin/pembayaran/{bill_id}/confirm"),
            Some(SERVICE_KEY),
            payload,
        ))
        .await
    }
}

fn post_json(path: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get(path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn multipart_file(boundary: &str, field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

// =============================================================================
// The payment verification workflow
// =============================================================================

#[tokio::test]
async fn full_payment_flow_accept() {
    let app = test_app(true);
    let (token, bill_id) = app.tenant_with_bill("2024-06").await;

    // Tenant uploads proof: UNPAID -> AWAITING_VERIFICATION plus a payment row.
    let (status, body) = app.submit_proof(&token, bill_id).await;
    assert_eq!(status, StatusCode::OK, "submit failed: {body}");
    assert_eq!(body["bill"]["status"], "AWAITING_VERIFICATION");
    assert!(body["message"].as_str().unwrap().contains("verification"));

    let payment = app.store.find_payment(bill_id).await.unwrap().unwrap();
    assert!(payment.proof_url.starts_with("/uploads/"));

    // The bill shows up for admin verification.
    let (_, body) = app
        .send(get("/admin/pembayaran/pending", SERVICE_KEY))
        .await;
    let pending = body["payments"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["billId"].as_i64().unwrap(), bill_id);
    assert_eq!(pending[0]["tenantName"], "Budi");

    // Admin accepts: AWAITING_VERIFICATION -> PAID, notification delivered.
    let (status, body) = app.confirm(bill_id, "ACCEPT", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment confirmed");
    assert_eq!(body["decision"]["status"], "PAID");
    assert_eq!(body["decision"]["notified"], true);

    let bill = app.store.find_bill(bill_id).await.unwrap().unwrap();
    assert_eq!(bill.status, BillStatus::Paid);

    let payment = app.store.find_payment(bill_id).await.unwrap().unwrap();
    assert_eq!(payment.verified_by.as_deref(), Some("automation-service"));
    assert!(payment.rejection_reason.is_none());

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].message.contains("Budi"));
    assert!(sent[0].message.contains("PAID"));
    assert_eq!(sent[0].status, BillStatus::Paid);
}

#[tokio::test]
async fn reject_persists_reason() {
    let app = test_app(true);
    let (token, bill_id) = app.tenant_with_bill("2024-06").await;
    app.submit_proof(&token, bill_id).await;

    let (status, body) = app
        .confirm(bill_id, "REJECT", Some("foto tidak jelas"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment rejected");
    assert_eq!(body["decision"]["status"], "REJECTED");

    let bill = app.store.find_bill(bill_id).await.unwrap().unwrap();
    assert_eq!(bill.status, BillStatus::Rejected);

    let payment = app.store.find_payment(bill_id).await.unwrap().unwrap();
    assert_eq!(payment.rejection_reason.as_deref(), Some("foto tidak jelas"));

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].message.contains("foto tidak jelas"));
}

#[tokio::test]
async fn second_submission_and_second_decision_are_rejected() {
    let app = test_app(true);
    let (token, bill_id) = app.tenant_with_bill("2024-06").await;

    app.submit_proof(&token, bill_id).await;
    let (status, body) = app.submit_proof(&token, bill_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    app.confirm(bill_id, "ACCEPT", None).await;
    let (status, _) = app.confirm(bill_id, "ACCEPT", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Still PAID, and only one notification went out.
    let bill = app.store.find_bill(bill_id).await.unwrap().unwrap();
    assert_eq!(bill.status, BillStatus::Paid);
    assert_eq!(app.notifier.sent().len(), 1);
}

#[tokio::test]
async fn deciding_an_unpaid_bill_is_invalid_state() {
    let app = test_app(true);
    let (_token, bill_id) = app.tenant_with_bill("2024-06").await;

    let (status, body) = app.confirm(bill_id, "ACCEPT", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    // No state change, no notification.
    let bill = app.store.find_bill(bill_id).await.unwrap().unwrap();
    assert_eq!(bill.status, BillStatus::Unpaid);
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn unknown_bill_is_404_for_both_sides() {
    let app = test_app(true);
    let (token, _bill_id) = app.tenant_with_bill("2024-06").await;

    let (status, _) = app.submit_proof(&token, 9999).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.confirm(9999, "ACCEPT", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn another_tenants_bill_reads_as_missing() {
    let app = test_app(true);
    let (_owner_token, bill_id) = app.tenant_with_bill("2024-06").await;
    let (other_token, _other_bill) = app.tenant_with_bill("2024-07").await;

    let (status, _) = app.submit_proof(&other_token, bill_id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn notification_failure_does_not_fail_confirmation() {
    let app = test_app(false);
    let (token, bill_id) = app.tenant_with_bill("2024-06").await;
    app.submit_proof(&token, bill_id).await;

    let (status, body) = app.confirm(bill_id, "ACCEPT", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["decision"]["status"], "PAID");
    assert_eq!(body["decision"]["notified"], false);

    let bill = app.store.find_bill(bill_id).await.unwrap().unwrap();
    assert_eq!(bill.status, BillStatus::Paid);
}

#[tokio::test]
async fn missing_proof_file_is_a_validation_error() {
    let app = test_app(true);
    let (token, bill_id) = app.tenant_with_bill("2024-06").await;

    let boundary = "pondok-test-boundary";
    let request = Request::builder()
        .method("POST")
        .uri(format!("/penghuni/tagihan/{bill_id}/bayar"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(format!("--{boundary}--\r\n")))
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let bill = app.store.find_bill(bill_id).await.unwrap().unwrap();
    assert_eq!(bill.status, BillStatus::Unpaid);
}

// =============================================================================
// Tenant-facing bill views
// =============================================================================

#[tokio::test]
async fn active_bill_and_history_views() {
    let app = test_app(true);
    let current = BillingPeriod::current().to_string();
    let (token, bill_id) = app.tenant_with_bill(&current).await;

    let (status, body) = app.send(get("/penghuni/tagihan/active", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bill"]["id"].as_i64().unwrap(), bill_id);
    assert_eq!(body["bill"]["status"], "UNPAID");
    assert!(body["bill"]["proofUrl"].is_null());

    // History only lists settled bills.
    let (_, body) = app.send(get("/penghuni/tagihan/history", &token)).await;
    assert_eq!(body["history"].as_array().unwrap().len(), 0);

    app.submit_proof(&token, bill_id).await;
    app.confirm(bill_id, "ACCEPT", None).await;

    let (_, body) = app.send(get("/penghuni/tagihan/history", &token)).await;
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["status"], "PAID");
    assert!(history[0]["proofUrl"].as_str().unwrap().starts_with("/uploads/"));
}

#[tokio::test]
async fn rejected_period_can_be_rebilled_but_live_period_cannot() {
    let app = test_app(true);
    let (token, bill_id) = app.tenant_with_bill("2024-06").await;
    let tenant_id = app
        .store
        .find_bill(bill_id)
        .await
        .unwrap()
        .unwrap()
        .tenant_id;

    // A live bill blocks duplicate issuance.
    let (status, _) = app
        .send(post_json(
            "/admin/tagihan",
            Some(SERVICE_KEY),
            json!({ "tenantId": tenant_id, "period": "2024-06", "amount": 500000 }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.submit_proof(&token, bill_id).await;
    app.confirm(bill_id, "REJECT", Some("transfer tidak ditemukan"))
        .await;

    // After rejection the period may be billed afresh.
    let (status, body) = app
        .send(post_json(
            "/admin/tagihan",
            Some(SERVICE_KEY),
            json!({ "tenantId": tenant_id, "period": "2024-06", "amount": 500000 }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["bill"]["status"], "UNPAID");
    assert_ne!(body["bill"]["id"].as_i64().unwrap(), bill_id);
}
