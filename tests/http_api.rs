//! HTTP API tests.
//!
//! Sends requests through the full axum router with `tower::ServiceExt`
//! against an engine wired to in-memory stores and the mock gateway.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{FixedOffset, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use visit_engine::adapters::http::{visit_router, VisitAppState, PATIENT_HEADER, STAFF_HEADER};
use visit_engine::adapters::{
    InMemoryAppointmentRepository, InMemoryEventBus, InMemoryPaymentRepository,
    InMemorySlotLedger, InMemoryTokenRepository, ManualClock, MockPaymentGateway,
};
use visit_engine::application::{EngineConfig, VisitContext, VisitEngine};
use visit_engine::domain::appointment::{SlotGrid, TimeSlot};
use visit_engine::domain::foundation::Money;

// =============================================================================
// Test Infrastructure
// =============================================================================

fn app() -> (Router, MockPaymentGateway) {
    let gateway = MockPaymentGateway::new();
    let grid = SlotGrid::new(
        TimeSlot::from_hm(9, 0).unwrap(),
        TimeSlot::from_hm(17, 0).unwrap(),
        30,
    )
    .unwrap();
    let config = EngineConfig::new(grid, Money::new(50_000, "INR").unwrap())
        .with_utc_offset(FixedOffset::east_opt(330 * 60).unwrap());

    let engine = VisitEngine::new(VisitContext::new(
        Arc::new(InMemoryAppointmentRepository::new()),
        Arc::new(InMemoryPaymentRepository::new()),
        Arc::new(InMemoryTokenRepository::new()),
        Arc::new(InMemorySlotLedger::new()),
        Arc::new(gateway.clone()),
        Arc::new(InMemoryEventBus::new()),
        Arc::new(ManualClock::at(
            Utc.with_ymd_and_hms(2025, 1, 10, 3, 30, 0).unwrap(),
        )),
        config,
    ));

    let router = visit_router().with_state(VisitAppState::new(Arc::new(engine)));
    (router, gateway)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn book(app: &Router, patient: &str, slot: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/appointments",
        &[(PATIENT_HEADER, patient)],
        Some(json!({ "doctor_id": "D101", "date": "2025-01-10", "time_slot": slot })),
    )
    .await
}

// =============================================================================
// Appointments
// =============================================================================

#[tokio::test]
async fn health_is_ok() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::GET, "/health", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn booking_holds_the_slot_and_conflicts_are_409() {
    let (app, _) = app();

    let (status, body) = book(&app, "P-1", "10:00").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment"]["status"], "pending");
    assert!(body["hold_expires_at"].is_string());

    let (status, body) = book(&app, "P-2", "10:00").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "SLOT_UNAVAILABLE");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/doctors/D101/slots?date=2025-01-10",
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ten = body["slots"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["time_slot"] == "10:00")
        .unwrap();
    assert_eq!(ten["available"], false);
}

#[tokio::test]
async fn booking_requires_a_patient_identity() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/appointments",
        &[],
        Some(json!({ "doctor_id": "D101", "date": "2025-01-10", "time_slot": "10:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "AUTHENTICATION_REQUIRED");
}

#[tokio::test]
async fn off_grid_slot_is_a_bad_request() {
    let (app, _) = app();
    let (status, body) = book(&app, "P-1", "10:15").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn other_patients_appointments_are_not_found() {
    let (app, _) = app();
    let (_, booked) = book(&app, "P-1", "10:00").await;
    let uri = format!("/api/appointments/{}", booked["appointment"]["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::GET, &uri, &[(PATIENT_HEADER, "P-2")], None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, &uri, &[(STAFF_HEADER, "S-1")], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["patient_id"], "P-1");
}

#[tokio::test]
async fn malformed_appointment_id_is_a_bad_request() {
    let (app, _) = app();
    let (status, _) = send(
        &app,
        Method::GET,
        "/api/appointments/not-a-uuid",
        &[(STAFF_HEADER, "S-1")],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Payments
// =============================================================================

#[tokio::test]
async fn pay_then_confirm_confirms_the_appointment() {
    let (app, gateway) = app();
    let (_, booked) = book(&app, "P-1", "10:00").await;
    let appointment_id = booked["appointment"]["id"].as_str().unwrap().to_string();

    let (status, session) = send(
        &app,
        Method::POST,
        &format!("/api/appointments/{}/payment", appointment_id),
        &[(PATIENT_HEADER, "P-1")],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let payment_id = session["payment_id"].as_str().unwrap().to_string();
    let order_ref = session["payload"]["order_ref"].as_str().unwrap().to_string();

    let result = gateway.sign_success(&order_ref, "pay_1");
    let (status, confirmation) = send(
        &app,
        Method::POST,
        &format!("/api/payments/{}/confirm", payment_id),
        &[],
        Some(serde_json::to_value(&result).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmation["status"], "success");

    let (_, appointment) = send(
        &app,
        Method::GET,
        &format!("/api/appointments/{}", appointment_id),
        &[(PATIENT_HEADER, "P-1")],
        None,
    )
    .await;
    assert_eq!(appointment["status"], "confirmed");
    assert_eq!(appointment["payment_id"], payment_id.as_str());
}

#[tokio::test]
async fn forged_signature_is_401() {
    let (app, gateway) = app();
    let (_, booked) = book(&app, "P-1", "10:00").await;
    let (_, session) = send(
        &app,
        Method::POST,
        &format!(
            "/api/appointments/{}/payment",
            booked["appointment"]["id"].as_str().unwrap()
        ),
        &[(PATIENT_HEADER, "P-1")],
        None,
    )
    .await;
    let order_ref = session["payload"]["order_ref"].as_str().unwrap();
    let mut result = gateway.sign_success(order_ref, "pay_1");
    result.signature = Some("00".repeat(32));

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/payments/{}/confirm", session["payment_id"].as_str().unwrap()),
        &[],
        Some(serde_json::to_value(&result).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "VERIFICATION_FAILED");
}

#[tokio::test]
async fn non_positive_invoice_amount_is_rejected() {
    let (app, _) = app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/invoices/INV-1/payment",
        &[(PATIENT_HEADER, "P-1")],
        Some(json!({ "amount_minor": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Queue
// =============================================================================

#[tokio::test]
async fn staff_run_the_walk_in_queue() {
    let (app, _) = app();
    let staff = [(STAFF_HEADER, "S-1")];

    let (status, token) = send(
        &app,
        Method::POST,
        "/api/queue/tokens",
        &staff,
        Some(json!({ "patient_id": "P-1", "department_id": "OPD" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(token["queue_number"], 1);
    let token_uri = format!("/api/queue/tokens/{}", token["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("{}/advance", token_uri),
        &staff,
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["from"], "waiting");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("{}/advance", token_uri),
        &staff,
        Some(json!({ "status": "in_progress" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "in_progress");

    // Active tokens need an override to be removed.
    let (status, _) = send(&app, Method::DELETE, &token_uri, &staff, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("{}/cancel", token_uri),
        &staff,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, stats) = send(
        &app,
        Method::GET,
        "/api/queue/OPD/stats?date=2025-01-10",
        &staff,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["cancelled"], 1);
    assert_eq!(stats["last_issued"], 1);
}

#[tokio::test]
async fn queue_routes_require_staff() {
    let (app, _) = app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/queue/tokens",
        &[(PATIENT_HEADER, "P-1")],
        Some(json!({ "patient_id": "P-1", "department_id": "OPD" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
