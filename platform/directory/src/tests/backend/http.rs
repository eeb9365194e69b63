use std::convert::Infallible;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::StatusCode;
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::backend::http::{classify_error, HttpBackend};
use crate::backend::{AuthBackend, BackendError, DataBackend, Query, StorageBackend, Table};

#[derive(Debug)]
struct MockRequest {
	method: String,
	path_and_query: String,
	apikey: Option<String>,
	authorization: Option<String>,
	content_type: Option<String>,
	cache_control: Option<String>,
	upsert: Option<String>,
	raw: Bytes,
	body: Value,
}

/// Serves one canned response for every request and reports what it saw.
async fn mock_backend(status: StatusCode, response: Value) -> (mpsc::Receiver<MockRequest>, String) {
	let (tx, rx) = mpsc::channel(8);

	let listener = TcpListener::bind("127.0.0.1:0").await.expect("failed to bind");
	let addr = format!("http://{}", listener.local_addr().expect("failed to get addr"));

	tokio::spawn(async move {
		loop {
			let Ok((socket, _)) = listener.accept().await else {
				return;
			};

			let tx = tx.clone();
			let response = response.clone();
			tokio::spawn(async move {
				let service = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
					let tx = tx.clone();
					let response = response.clone();
					async move {
						let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);
						let method = req.method().to_string();
						let path_and_query = req.uri().path_and_query().map(|pq| pq.to_string()).unwrap_or_default();
						let apikey = header("apikey");
						let authorization = header("authorization");
						let content_type = header("content-type");
						let cache_control = header("cache-control");
						let upsert = header("x-upsert");

						let raw = req.into_body().collect().await.map(|b| b.to_bytes()).unwrap_or_default();
						let body = serde_json::from_slice(&raw).unwrap_or(Value::Null);

						let _ = tx
							.send(MockRequest {
								method,
								path_and_query,
								apikey,
								authorization,
								content_type,
								cache_control,
								upsert,
								raw,
								body,
							})
							.await;

						Ok::<_, Infallible>(
							hyper::Response::builder()
								.status(status)
								.header("content-type", "application/json")
								.body(Full::new(Bytes::from(response.to_string())))
								.expect("failed to build response"),
						)
					}
				});

				let _ = http1::Builder::new().serve_connection(TokioIo::new(socket), service).await;
			});
		}
	});

	(rx, addr)
}

fn client(addr: &str) -> HttpBackend {
	HttpBackend::new(addr, "anon-key", Duration::from_secs(5)).expect("failed to create client")
}

#[test]
fn test_classify_error() {
	let err = classify_error(StatusCode::BAD_REQUEST, br#"{"error_description":"Invalid login credentials"}"#);
	assert!(matches!(err, BackendError::Rejected { status, ref message } if status == StatusCode::BAD_REQUEST && message == "Invalid login credentials"));

	let err = classify_error(
		StatusCode::CONFLICT,
		br#"{"code":"23505","message":"duplicate key value violates unique constraint \"startups_slug_key\""}"#,
	);
	assert!(matches!(err, BackendError::Conflict(_)));

	let err = classify_error(StatusCode::BAD_REQUEST, br#"{"statusCode":"404","error":"Bucket not found"}"#);
	assert!(matches!(err, BackendError::BucketNotFound(_)));

	let err = classify_error(StatusCode::UNAUTHORIZED, br#"{"msg":"JWT expired"}"#);
	assert!(matches!(err, BackendError::Unauthorized(ref m) if m == "JWT expired"));

	let err = classify_error(StatusCode::NOT_FOUND, b"");
	assert!(matches!(err, BackendError::NotFound));

	let err = classify_error(StatusCode::INTERNAL_SERVER_ERROR, b"upstream exploded");
	assert!(matches!(err, BackendError::Rejected { ref message, .. } if message == "upstream exploded"));
}

#[test]
fn test_public_url() {
	let backend = client("https://xyz.supabase.co");
	assert_eq!(
		backend.public_url("startup-logos", "user/logo.png"),
		"https://xyz.supabase.co/storage/v1/object/public/startup-logos/user/logo.png"
	);
	assert_eq!(
		backend.object_path(
			"startup-logos",
			"https://xyz.supabase.co/storage/v1/object/public/startup-logos/user/logo.png?v=1"
		)
		.as_deref(),
		Some("user/logo.png")
	);
	assert!(HttpBackend::new("not a url", "key", Duration::from_secs(1)).is_err());
}

#[tokio::test]
async fn test_select_request_shape() {
	let (mut rx, addr) = mock_backend(StatusCode::OK, json!([{ "id": 1 }])).await;
	let backend = client(&addr);

	let rows = backend
		.select(Some("user-token"), &Query::new(Table::Startups).eq("slug", "acme").limit(1))
		.await
		.expect("failed to select");
	assert_eq!(rows, vec![json!({ "id": 1 })]);

	let req = rx.recv().await.expect("no request seen");
	assert_eq!(req.method, "GET");
	assert_eq!(req.path_and_query, "/rest/v1/startups?select=*&slug=eq.acme&limit=1");
	assert_eq!(req.apikey.as_deref(), Some("anon-key"));
	assert_eq!(req.authorization.as_deref(), Some("Bearer user-token"));
}

#[tokio::test]
async fn test_anonymous_requests_use_anon_key() {
	let (mut rx, addr) = mock_backend(StatusCode::OK, json!([])).await;
	let backend = client(&addr);

	backend
		.select(None, &Query::new(Table::Updates))
		.await
		.expect("failed to select");

	let req = rx.recv().await.expect("no request seen");
	assert_eq!(req.authorization.as_deref(), Some("Bearer anon-key"));
}

#[tokio::test]
async fn test_sign_in_error() {
	let (mut rx, addr) = mock_backend(
		StatusCode::BAD_REQUEST,
		json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" }),
	)
	.await;
	let backend = client(&addr);

	let err = backend
		.sign_in("founder@example.com", "hunter22")
		.await
		.expect_err("sign in should fail");
	assert_eq!(err.backend_message(), Some("Invalid login credentials"));

	let req = rx.recv().await.expect("no request seen");
	assert_eq!(req.method, "POST");
	assert_eq!(req.path_and_query, "/auth/v1/token?grant_type=password");
	assert_eq!(req.body, json!({ "email": "founder@example.com", "password": "hunter22" }));
}

#[tokio::test]
async fn test_update_sends_filters() {
	let (mut rx, addr) = mock_backend(StatusCode::OK, json!([])).await;
	let backend = client(&addr);

	let rows = backend
		.update(
			"user-token",
			Table::Updates,
			&[crate::backend::Filter::eq("id", "u1"), crate::backend::Filter::eq("startup_id", "s1")],
			json!({ "title": "New" }),
		)
		.await
		.expect("failed to update");
	assert!(rows.is_empty());

	let req = rx.recv().await.expect("no request seen");
	assert_eq!(req.method, "PATCH");
	assert_eq!(req.path_and_query, "/rest/v1/updates?id=eq.u1&startup_id=eq.s1");
	assert_eq!(req.body, json!({ "title": "New" }));
}

fn wire_user(confirmed: bool) -> Value {
	json!({
		"id": "6f1c3c2e-8a4b-4f7e-9d2a-0b5e1c7d9a11",
		"email": "founder@example.com",
		"email_confirmed_at": confirmed.then_some("2024-03-01T12:00:00Z"),
		"user_metadata": { "name": "Acme" },
	})
}

fn wire_session() -> Value {
	json!({
		"access_token": "access",
		"refresh_token": "refresh",
		"expires_in": 3600,
		"expires_at": 1_700_003_600,
		"user": wire_user(true),
	})
}

#[tokio::test]
async fn test_sign_up_with_session() {
	let (mut rx, addr) = mock_backend(StatusCode::OK, wire_session()).await;
	let backend = client(&addr);

	let outcome = backend
		.sign_up("founder@example.com", "hunter22", "Acme", Some("http://localhost:3000/auth/callback"))
		.await
		.expect("failed to sign up");
	let session = outcome.session.expect("sign up should return a session");
	assert_eq!(session.access_token, "access");
	assert_eq!(session.refresh_token, "refresh");
	assert_eq!(session.expires_at, 1_700_003_600);
	assert_eq!(outcome.user.email, "founder@example.com");
	assert!(outcome.user.email_confirmed);

	let req = rx.recv().await.expect("no request seen");
	assert_eq!(req.method, "POST");
	assert_eq!(
		req.path_and_query,
		"/auth/v1/signup?redirect_to=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback"
	);
	assert_eq!(req.authorization.as_deref(), Some("Bearer anon-key"));
	assert_eq!(
		req.body,
		json!({ "email": "founder@example.com", "password": "hunter22", "data": { "name": "Acme" } })
	);
}

#[tokio::test]
async fn test_sign_up_pending_confirmation() {
	let (mut rx, addr) = mock_backend(StatusCode::OK, wire_user(false)).await;
	let backend = client(&addr);

	let outcome = backend
		.sign_up("founder@example.com", "hunter22", "Acme", None)
		.await
		.expect("failed to sign up");
	assert!(outcome.session.is_none());
	assert!(!outcome.user.email_confirmed);
	assert_eq!(outcome.user.metadata["name"], json!("Acme"));

	let req = rx.recv().await.expect("no request seen");
	assert_eq!(req.path_and_query, "/auth/v1/signup");
}

#[tokio::test]
async fn test_refresh_and_session_calls() {
	let (mut rx, addr) = mock_backend(StatusCode::OK, wire_session()).await;
	let backend = client(&addr);

	let session = backend.refresh("refresh").await.expect("failed to refresh");
	assert_eq!(session.access_token, "access");

	let req = rx.recv().await.expect("no request seen");
	assert_eq!(req.method, "POST");
	assert_eq!(req.path_and_query, "/auth/v1/token?grant_type=refresh_token");
	assert_eq!(req.body, json!({ "refresh_token": "refresh" }));

	let (mut rx, addr) = mock_backend(StatusCode::OK, wire_user(true)).await;
	let backend = client(&addr);

	let user = backend.get_user("access").await.expect("failed to get user");
	assert_eq!(user.email, "founder@example.com");

	let req = rx.recv().await.expect("no request seen");
	assert_eq!(req.method, "GET");
	assert_eq!(req.path_and_query, "/auth/v1/user");
	assert_eq!(req.authorization.as_deref(), Some("Bearer access"));

	backend.sign_out("access").await.expect("failed to sign out");

	let req = rx.recv().await.expect("no request seen");
	assert_eq!(req.method, "POST");
	assert_eq!(req.path_and_query, "/auth/v1/logout");
	assert_eq!(req.authorization.as_deref(), Some("Bearer access"));
}

#[tokio::test]
async fn test_storage_request_shape() {
	let (mut rx, addr) = mock_backend(StatusCode::OK, json!({ "Key": "startup-logos/user/logo.png" })).await;
	let backend = client(&addr);

	let url = backend
		.upload(
			"user-token",
			"startup-logos",
			"user/logo.png",
			Bytes::from_static(b"\x89PNG"),
			"image/png",
			3600,
		)
		.await
		.expect("failed to upload");
	assert_eq!(url, format!("{addr}/storage/v1/object/public/startup-logos/user/logo.png"));

	let req = rx.recv().await.expect("no request seen");
	assert_eq!(req.method, "POST");
	assert_eq!(req.path_and_query, "/storage/v1/object/startup-logos/user/logo.png");
	assert_eq!(req.authorization.as_deref(), Some("Bearer user-token"));
	assert_eq!(req.content_type.as_deref(), Some("image/png"));
	assert_eq!(req.cache_control.as_deref(), Some("max-age=3600"));
	assert_eq!(req.upsert.as_deref(), Some("false"));
	assert_eq!(req.raw, Bytes::from_static(b"\x89PNG"));

	backend
		.remove("user-token", "startup-logos", &["user/logo.png".to_owned()])
		.await
		.expect("failed to remove");

	let req = rx.recv().await.expect("no request seen");
	assert_eq!(req.method, "DELETE");
	assert_eq!(req.path_and_query, "/storage/v1/object/startup-logos");
	assert_eq!(req.body, json!({ "prefixes": ["user/logo.png"] }));
}
