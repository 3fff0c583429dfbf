//! Router tests against an in-memory SQLite store.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::NaiveDate;
use docket_core::{
  clock::FixedClock,
  credential::{CredentialKind, kinds},
  identifier::IdentifierFamily,
};
use docket_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::*;

fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 6, 15).unwrap() }

async fn make_state() -> ApiState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let mut families = BTreeMap::new();
  families.insert(
    CredentialKind::new(kinds::H2S_CARD).unwrap(),
    IdentifierFamily::new("SND-", 4).unwrap(),
  );
  ApiState::new(
    Arc::new(store),
    Arc::new(FixedClock(today())),
    Policy { warning_window_days: 30, families },
  )
}

async fn send(
  state: ApiState<SqliteStore>,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  let resp = api_router(state)
    .oneshot(builder.body(body).unwrap())
    .await
    .unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

async fn create(state: &ApiState<SqliteStore>, body: Value) -> Value {
  let (status, created) = send(state.clone(), "POST", "/credentials", Some(body)).await;
  assert_eq!(status, StatusCode::CREATED, "{created}");
  created
}

fn credential(name: &str, kind: &str, expires_on: Option<&str>) -> Value {
  json!({
    "subject_id": format!("E-{name}"),
    "subject_name": name,
    "subject_kind": "employee",
    "kind": kind,
    "expires_on": expires_on,
  })
}

// ── Credentials ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_returns_classified_credential() {
  let state = make_state().await;
  let created = create(&state, credential("Hamad", kinds::IQAMA, Some("2024-06-25"))).await;

  assert_eq!(created["kind"], "iqama");
  assert_eq!(created["expires_on"], "2024-06-25");
  assert_eq!(created["classification"]["status"], "expiring_soon");
  assert_eq!(created["classification"]["days_remaining"], 10);
}

#[tokio::test]
async fn create_rejects_blank_subject() {
  let state = make_state().await;
  let (status, body) =
    send(state, "POST", "/credentials", Some(credential("", kinds::IQAMA, None))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("subject_name"));
}

#[tokio::test]
async fn get_unknown_returns_404() {
  let state = make_state().await;
  let uri = format!("/credentials/{}", uuid::Uuid::new_v4());
  let (status, _) = send(state, "GET", &uri, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn first_read_assigns_serial_once() {
  let state = make_state().await;
  let created = create(&state, credential("Badr", kinds::H2S_CARD, Some("2025-01-01"))).await;
  assert_eq!(created["serial"], Value::Null);

  let uri = format!("/credentials/{}", created["credential_id"].as_str().unwrap());
  let (status, first) = send(state.clone(), "GET", &uri, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(first["serial"], "SND-0001");

  let (_, second) = send(state, "GET", &uri, None).await;
  assert_eq!(second["serial"], "SND-0001");
}

#[tokio::test]
async fn kinds_without_family_get_no_serial() {
  let state = make_state().await;
  let created = create(&state, credential("Lina", kinds::IQAMA, None)).await;
  let id = created["credential_id"].as_str().unwrap();

  let (_, fetched) = send(state.clone(), "GET", &format!("/credentials/{id}"), None).await;
  assert_eq!(fetched["serial"], Value::Null);
  assert_eq!(fetched["classification"]["status"], "missing");

  let (status, _) =
    send(state, "POST", &format!("/credentials/{id}/serial"), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ensure_serial_endpoint_is_idempotent() {
  let state = make_state().await;
  let a = create(&state, credential("a", kinds::H2S_CARD, None)).await;
  let b = create(&state, credential("b", kinds::H2S_CARD, None)).await;

  let uri_a = format!("/credentials/{}/serial", a["credential_id"].as_str().unwrap());
  let uri_b = format!("/credentials/{}/serial", b["credential_id"].as_str().unwrap());

  let (status, first) = send(state.clone(), "POST", &uri_a, None).await;
  assert_eq!(status, StatusCode::OK);
  let (_, other) = send(state.clone(), "POST", &uri_b, None).await;
  let (_, again) = send(state, "POST", &uri_a, None).await;

  assert_eq!(first["serial"], "SND-0001");
  assert_eq!(other["serial"], "SND-0002");
  assert_eq!(again["serial"], "SND-0001");
}

#[tokio::test]
async fn exhausted_family_reports_a_generic_503() {
  let mut state = make_state().await;
  state.policy = Arc::new(Policy {
    warning_window_days: 30,
    families: BTreeMap::from([(
      CredentialKind::new(kinds::GPS).unwrap(),
      IdentifierFamily::new("N-", 1).unwrap(),
    )]),
  });

  for n in 1..=9 {
    let created = create(&state, credential(&format!("gps-{n}"), kinds::GPS, None)).await;
    let uri = format!("/credentials/{}", created["credential_id"].as_str().unwrap());
    let (status, fetched) = send(state.clone(), "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["serial"], format!("N-{n}"));
  }

  let tenth = create(&state, credential("gps-10", kinds::GPS, None)).await;
  let uri = format!("/credentials/{}", tenth["credential_id"].as_str().unwrap());
  let (status, body) = send(state, "GET", &uri, None).await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

  let message = body["error"].as_str().unwrap();
  assert!(message.contains("please try again"), "{message}");
  assert!(!message.contains("N-"), "{message}");
  assert!(!message.contains("width"), "{message}");
}

#[tokio::test]
async fn renew_reclassifies() {
  let state = make_state().await;
  let created = create(&state, credential("Tariq", kinds::ISTIMARA, Some("2024-06-01"))).await;
  assert_eq!(created["classification"]["status"], "expired");
  assert_eq!(created["classification"]["days_remaining"], 14);

  let uri = format!("/credentials/{}/expiry", created["credential_id"].as_str().unwrap());
  let (status, renewed) = send(
    state,
    "PUT",
    &uri,
    Some(json!({ "expires_on": "2025-06-01", "number": "IST-77" })),
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(renewed["number"], "IST-77");
  assert_eq!(renewed["classification"]["status"], "active");
}

#[tokio::test]
async fn list_filters_by_subject_kind() {
  let state = make_state().await;
  create(&state, credential("Amin", kinds::IQAMA, None)).await;
  create(
    &state,
    json!({
      "subject_id": "EQ-3",
      "subject_name": "Loader 3",
      "subject_kind": "equipment",
      "kind": kinds::GPS,
      "expires_on": "2024-07-30",
    }),
  )
  .await;

  let (status, list) = send(state, "GET", "/credentials?subject_kind=equipment", None).await;
  assert_eq!(status, StatusCode::OK);
  let list = list.as_array().unwrap();
  assert_eq!(list.len(), 1);
  assert_eq!(list[0]["subject_name"], "Loader 3");
  assert_eq!(list[0]["classification"]["status"], "active");
}

// ── Compliance ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn compliance_summary_orders_and_counts() {
  let state = make_state().await;
  create(&state, credential("five", kinds::IQAMA, Some("2024-06-10"))).await;
  create(&state, credential("one", kinds::IQAMA, Some("2024-06-14"))).await;
  create(&state, credential("ten", kinds::IQAMA, Some("2024-06-05"))).await;
  create(&state, credential("soon", kinds::INSURANCE, Some("2024-06-15"))).await;
  create(&state, credential("broken", kinds::INSURANCE, Some("15.06.2024"))).await;

  let (status, summary) = send(state, "GET", "/compliance", None).await;
  assert_eq!(status, StatusCode::OK);

  assert_eq!(summary["reference_date"], "2024-06-15");
  assert_eq!(summary["total"], 5);
  assert_eq!(summary["totals"]["expired"], 3);
  assert_eq!(summary["totals"]["missing"], 1);
  assert_eq!(summary["by_kind"]["insurance"]["expiring_soon"], 1);

  let flagged: Vec<_> = summary["flagged"]
    .as_array()
    .unwrap()
    .iter()
    .map(|f| f["subject_name"].as_str().unwrap())
    .collect();
  assert_eq!(flagged, vec!["one", "five", "ten", "soon"]);

  assert_eq!(summary["diagnostics"][0]["kind"], "malformed_date");
  assert_eq!(summary["diagnostics"][0]["raw"], "15.06.2024");
}

#[tokio::test]
async fn compliance_accepts_reference_date_and_window() {
  let state = make_state().await;
  create(&state, credential("a", kinds::IQAMA, Some("2024-08-01"))).await;

  let (_, default_window) = send(state.clone(), "GET", "/compliance", None).await;
  assert_eq!(default_window["totals"]["active"], 1);

  let (_, wide) = send(state.clone(), "GET", "/compliance?window_days=60", None).await;
  assert_eq!(wide["totals"]["expiring_soon"], 1);
  assert_eq!(wide["warning_window_days"], 60);

  let (_, later) = send(state, "GET", "/compliance?as_of=2024-08-02", None).await;
  assert_eq!(later["totals"]["expired"], 1);
}
