//! Router tests against a [`MemoryLedger`].

use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use certreg_core::{
  Fingerprint, Identity, Ledger, MemoryLedger, Receipt, RegistryEngine,
  SingleAuthority, registry::Transition,
};
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{ApiSettings, api_router};

type Engine = Arc<RegistryEngine<MemoryLedger>>;

fn engine() -> Engine {
  Arc::new(RegistryEngine::new(MemoryLedger::new(SingleAuthority::new(
    "admin",
  ))))
}

fn app(engine: &Engine) -> Router {
  api_router(Arc::clone(engine), ApiSettings::default())
}

fn doc(name: &str) -> Fingerprint { Fingerprint::of_document(name.as_bytes()) }

async fn send(
  app: Router,
  method: &str,
  uri: &str,
  caller: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if body.is_some() {
    builder = builder.header(header::CONTENT_TYPE, "application/json");
  }
  let mut req = builder
    .body(match body {
      Some(v) => Body::from(v.to_string()),
      None => Body::empty(),
    })
    .unwrap();
  if let Some(id) = caller {
    req.extensions_mut().insert(Identity::new(id));
  }

  let resp = app.oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

async fn issue(engine: &Engine, fp: Fingerprint, label: &str) -> (StatusCode, Value) {
  send(
    app(engine),
    "POST",
    "/certificates",
    Some("admin"),
    Some(json!({ "fingerprint": fp.to_string(), "label": label })),
  )
  .await
}

// ─── Issue ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn issue_returns_201_with_receipt() {
  let e = engine();
  let fp = doc("a");

  let (status, body) = issue(&e, fp, "Diploma").await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["sequence"], 1);
  assert_eq!(body["notification"]["event"], "certificate_issued");
  assert_eq!(body["notification"]["label"], "Diploma");

  let (status, body) = send(app(&e), "GET", &format!("/certificates/{fp}"), None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["exists"], true);
  assert_eq!(body["status"], "active");
  assert_eq!(body["issuer"], "admin");
}

#[tokio::test]
async fn issue_without_caller_is_401() {
  let e = engine();
  let (status, body) = send(
    app(&e),
    "POST",
    "/certificates",
    None,
    Some(json!({ "fingerprint": doc("a").to_string(), "label": "Diploma" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["kind"], "unauthenticated");
}

#[tokio::test]
async fn error_kinds_map_to_distinct_statuses() {
  let e = engine();
  let fp = doc("a");
  issue(&e, fp, "Diploma").await;

  let (status, body) = issue(&e, fp, "Again").await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["kind"], "already_exists");

  let (status, body) = issue(&e, Fingerprint::ZERO, "Zero").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["kind"], "invalid_fingerprint");

  let (status, body) = issue(&e, doc("b"), "   ").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["kind"], "empty_label");

  let (status, body) = issue(&e, doc("b"), &"x".repeat(300)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["kind"], "label_too_long");

  let (status, body) = send(
    app(&e),
    "POST",
    "/certificates",
    Some("mallory"),
    Some(json!({ "fingerprint": doc("b").to_string(), "label": "Forged" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["kind"], "unauthorized");

  let (status, body) = send(app(&e), "GET", "/certificates/0x1234", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["kind"], "malformed_fingerprint");
}

#[tokio::test]
async fn undecodable_requests_use_the_json_error_shape() {
  let e = engine();
  let fp = doc("a");
  issue(&e, fp, "Diploma").await;

  let mut req = Request::builder()
    .method("POST")
    .uri("/certificates")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from("{\"fingerprint\": "))
    .unwrap();
  req.extensions_mut().insert(Identity::new("admin"));
  let resp = app(&e).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert_eq!(body["kind"], "bad_request");

  let (status, body) = send(
    app(&e),
    "POST",
    &format!("/certificates/{fp}/status"),
    Some("admin"),
    Some(json!({ "status": 300 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["kind"], "bad_request");
  assert!(body["error"].is_string());

  let (status, body) = send(app(&e), "GET", "/notifications?after=soon", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["kind"], "bad_request");
}

// ─── Status changes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn status_accepts_names_and_codes() {
  let e = engine();
  let fp = doc("a");
  issue(&e, fp, "Diploma").await;
  let uri = format!("/certificates/{fp}/status");

  let (status, body) = send(
    app(&e),
    "POST",
    &uri,
    Some("admin"),
    Some(json!({ "status": "revoked", "reason": "r1" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["notification"]["status"], "revoked");
  assert_eq!(body["notification"]["previous"], "active");

  let (status, _) = send(
    app(&e),
    "POST",
    &uri,
    Some("admin"),
    Some(json!({ "status": 2 })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (status, body) = send(
    app(&e),
    "POST",
    &uri,
    Some("admin"),
    Some(json!({ "status": "Updated" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["kind"], "status_unchanged");

  let (status, body) = send(
    app(&e),
    "POST",
    &uri,
    Some("admin"),
    Some(json!({ "status": 7 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["kind"], "unknown_status");

  let (_, history) =
    send(app(&e), "GET", &format!("/certificates/{fp}/history"), None, None).await;
  let history = history.as_array().unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[0]["status"], "revoked");
  assert_eq!(history[0]["reason"], "r1");
  assert_eq!(history[1]["status"], "updated");
  assert_eq!(history[1]["reason"], "");
}

#[tokio::test]
async fn status_change_on_unknown_fingerprint_is_404() {
  let e = engine();
  let (status, body) = send(
    app(&e),
    "POST",
    &format!("/certificates/{}/status", doc("ghost")),
    Some("admin"),
    Some(json!({ "status": "revoked" })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["kind"], "not_found");
}

// ─── Reads ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_fingerprint_reads_are_empty_not_errors() {
  let e = engine();
  let fp = doc("never");

  let (status, body) = send(app(&e), "GET", &format!("/certificates/{fp}"), None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["exists"], false);

  let (_, body) = send(app(&e), "GET", &format!("/certificates/{fp}/valid"), None, None).await;
  assert_eq!(body["valid"], false);

  let (_, body) = send(app(&e), "GET", &format!("/certificates/{fp}/history"), None, None).await;
  assert_eq!(body, json!([]));

  let (_, body) =
    send(app(&e), "GET", &format!("/certificates/{fp}/history/count"), None, None).await;
  assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn verify_reports_validity_and_history() {
  let e = engine();
  let fp = doc("a");
  issue(&e, fp, "Diploma").await;

  let (_, body) = send(app(&e), "GET", &format!("/verify/{fp}"), None, None).await;
  assert_eq!(body["valid"], true);
  assert_eq!(body["record"]["label"], "Diploma");
  assert_eq!(body["history"], json!([]));

  e.change_status(fp, certreg_core::Status::Revoked, "withdrawn", &Identity::new("admin"))
    .await
    .unwrap();
  let (_, body) = send(app(&e), "GET", &format!("/verify/{fp}"), None, None).await;
  assert_eq!(body["valid"], false);
  assert_eq!(body["history"][0]["reason"], "withdrawn");
}

#[tokio::test]
async fn notifications_replay_with_cursor_and_limit() {
  let e = engine();
  for name in ["a", "b", "c"] {
    issue(&e, doc(name), name).await;
  }

  let (_, body) = send(app(&e), "GET", "/notifications", None, None).await;
  let receipts: Vec<Receipt> = serde_json::from_value(body).unwrap();
  assert_eq!(receipts.len(), 3);

  let (_, body) = send(app(&e), "GET", "/notifications?after=1&limit=1", None, None).await;
  let receipts: Vec<Receipt> = serde_json::from_value(body).unwrap();
  assert_eq!(receipts.len(), 1);
  assert_eq!(receipts[0].sequence, 2);
  assert_eq!(receipts[0].notification.fingerprint(), doc("b"));
}

#[tokio::test]
async fn authority_and_fingerprint_helpers() {
  let e = engine();
  let (_, body) = send(app(&e), "GET", "/authority", None, None).await;
  assert_eq!(body["authority"], "admin");

  let req = Request::builder()
    .method("POST")
    .uri("/fingerprint")
    .body(Body::from("hello"))
    .unwrap();
  let resp = app(&e).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert_eq!(
    body["fingerprint"],
    "0x1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
  );
  assert_eq!(body["size"], 5);
}

#[tokio::test]
async fn fingerprint_accepts_documents_over_default_body_limit() {
  let e = engine();
  let document = vec![0x25u8; 5 * 1024 * 1024];
  let expected = Fingerprint::of_document(&document);

  let req = Request::builder()
    .method("POST")
    .uri("/fingerprint")
    .body(Body::from(document))
    .unwrap();
  let resp = app(&e).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert_eq!(body["fingerprint"], expected.to_string());
  assert_eq!(body["size"], 5 * 1024 * 1024);
}

// ─── Deadlines ───────────────────────────────────────────────────────────────

/// A ledger whose submissions never reach finality.
#[derive(Clone)]
struct StalledLedger(MemoryLedger);

impl Ledger for StalledLedger {
  type Error = certreg_core::Error;

  async fn submit(&self, _: Identity, _: Transition) -> certreg_core::Result<Receipt> {
    std::future::pending().await
  }

  async fn record(&self, fp: Fingerprint) -> certreg_core::Result<Option<certreg_core::CertificateRecord>> {
    self.0.record(fp).await
  }

  async fn history(&self, fp: Fingerprint) -> certreg_core::Result<Vec<certreg_core::StatusHistoryEntry>> {
    self.0.history(fp).await
  }

  async fn history_count(&self, fp: Fingerprint) -> certreg_core::Result<u64> {
    self.0.history_count(fp).await
  }

  async fn verification(&self, fp: Fingerprint) -> certreg_core::Result<certreg_core::Verification> {
    self.0.verification(fp).await
  }

  async fn notifications_since(&self, after: u64, limit: usize) -> certreg_core::Result<Vec<Receipt>> {
    self.0.notifications_since(after, limit).await
  }

  fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Receipt> { self.0.subscribe() }

  fn policy(&self) -> &dyn certreg_core::AuthorizationPolicy { self.0.policy() }
}

#[tokio::test]
async fn stalled_submission_reports_unknown_outcome() {
  let ledger = StalledLedger(MemoryLedger::new(SingleAuthority::new("admin")));
  let app = api_router(
    Arc::new(RegistryEngine::new(ledger)),
    ApiSettings {
      submit_timeout: Duration::from_millis(20),
    },
  );

  let (status, body) = send(
    app,
    "POST",
    "/certificates",
    Some("admin"),
    Some(json!({ "fingerprint": doc("a").to_string(), "label": "Diploma" })),
  )
  .await;
  assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
  assert_eq!(body["kind"], "outcome_unknown");
}
