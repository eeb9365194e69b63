use reqwest::header;
use reqwest::StatusCode;
use serde_json::{json, Value};
use serial_test::serial;

use super::TestServer;
use crate::api::middleware::auth::{REFRESH_COOKIE, SESSION_COOKIE};
use crate::tests::global::memory_config;

fn cookie_value(resp: &reqwest::Response, name: &str) -> Option<String> {
	resp.headers()
		.get_all(header::SET_COOKIE)
		.iter()
		.filter_map(|v| v.to_str().ok())
		.find_map(|v| v.strip_prefix(&format!("{name}=")))
		.and_then(|v| v.split(';').next())
		.map(str::to_owned)
}

#[serial]
#[tokio::test]
async fn test_serial_sign_up_with_confirmation() {
	let (config, port) = memory_config(false, None);
	let server = TestServer::start(config, port).await;

	let resp = server
		.client
		.post(server.url("/auth/signup"))
		.json(&json!({ "email": "founder@example.com", "password": "hunter22", "name": "Acme" }))
		.send()
		.await
		.expect("failed to sign up");
	assert_eq!(resp.status(), StatusCode::OK);
	assert!(cookie_value(&resp, SESSION_COOKIE).is_none());
	let body: Value = resp.json().await.expect("failed to read body");
	assert_eq!(body["confirmation_required"], json!(true));
	assert_eq!(body["email"], json!("founder@example.com"));

	let sign_in = || {
		server
			.client
			.post(server.url("/auth/signin"))
			.json(&json!({ "email": "founder@example.com", "password": "hunter22" }))
			.send()
	};

	let resp = sign_in().await.expect("failed to sign in");
	assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
	let body: Value = resp.json().await.expect("failed to read body");
	assert_eq!(body["message"], json!("Email not confirmed"));

	assert!(server
		.global
		.memory
		.as_ref()
		.expect("memory backend")
		.confirm_email("founder@example.com"));

	let resp = sign_in().await.expect("failed to sign in");
	assert_eq!(resp.status(), StatusCode::OK);
	let session = cookie_value(&resp, SESSION_COOKIE).expect("session cookie");
	assert!(cookie_value(&resp, REFRESH_COOKIE).is_some());
	let body: Value = resp.json().await.expect("failed to read body");
	assert_eq!(body["redirect"], json!("/dashboard"));
	assert_eq!(body["session"]["access_token"], json!(session));

	let body: Value = server
		.client
		.get(server.url("/auth/session"))
		.header(header::COOKIE, format!("{SESSION_COOKIE}={session}"))
		.send()
		.await
		.expect("failed to get session")
		.json()
		.await
		.expect("failed to read body");
	assert_eq!(body["user"]["email"], json!("founder@example.com"));

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_sign_up_validation() {
	let (config, port) = memory_config(true, None);
	let server = TestServer::start(config, port).await;

	let resp = server
		.client
		.post(server.url("/auth/signup"))
		.json(&json!({ "email": "nope", "password": "123", "name": "Acme" }))
		.send()
		.await
		.expect("failed to sign up");
	assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
	let body: Value = resp.json().await.expect("failed to read body");
	assert_eq!(body["message"], json!("Invalid email address"));
	assert_eq!(body["errors"]["password"], json!("Password must be at least 6 characters"));

	let resp = server
		.client
		.post(server.url("/auth/signup"))
		.header(header::CONTENT_TYPE, "application/json")
		.body("{not json")
		.send()
		.await
		.expect("failed to sign up");
	assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

	server.sign_up("founder@example.com", "Acme").await;
	let resp = server
		.client
		.post(server.url("/auth/signup"))
		.json(&json!({ "email": "founder@example.com", "password": "hunter22", "name": "Acme" }))
		.send()
		.await
		.expect("failed to sign up");
	assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
	let body: Value = resp.json().await.expect("failed to read body");
	assert_eq!(body["message"], json!("User already registered"));

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_refresh_and_sign_out() {
	let (config, port) = memory_config(true, None);
	let server = TestServer::start(config, port).await;

	let resp = server
		.client
		.post(server.url("/auth/signup"))
		.json(&json!({ "email": "founder@example.com", "password": "hunter22", "name": "Acme" }))
		.send()
		.await
		.expect("failed to sign up");
	let refresh = cookie_value(&resp, REFRESH_COOKIE).expect("refresh cookie");

	let resp = server
		.client
		.post(server.url("/auth/refresh"))
		.header(header::COOKIE, format!("{REFRESH_COOKIE}={refresh}"))
		.send()
		.await
		.expect("failed to refresh");
	assert_eq!(resp.status(), StatusCode::OK);
	let token = cookie_value(&resp, SESSION_COOKIE).expect("session cookie");

	let resp = server
		.client
		.post(server.url("/auth/refresh"))
		.json(&json!({ "refresh_token": refresh }))
		.send()
		.await
		.expect("failed to refresh");
	assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

	let resp = server
		.client
		.post(server.url("/auth/refresh"))
		.send()
		.await
		.expect("failed to refresh");
	assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

	let resp = server
		.client
		.post(server.url("/auth/signout"))
		.bearer_auth(&token)
		.send()
		.await
		.expect("failed to sign out");
	assert_eq!(resp.status(), StatusCode::OK);
	assert_eq!(cookie_value(&resp, SESSION_COOKIE).as_deref(), Some(""));

	// the revoked token no longer authenticates
	let resp = server
		.client
		.get(server.url("/auth/session"))
		.bearer_auth(&token)
		.send()
		.await
		.expect("failed to get session");
	assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_bad_credentials_in_requests() {
	let (config, port) = memory_config(true, None);
	let server = TestServer::start(config, port).await;

	let resp = server
		.client
		.get(server.url("/health"))
		.header(header::AUTHORIZATION, "Basic abc")
		.send()
		.await
		.expect("failed to get");
	assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

	// a stale cookie is ignored
	let body: Value = server
		.client
		.get(server.url("/auth/session"))
		.header(header::COOKIE, format!("{SESSION_COOKIE}=stale"))
		.send()
		.await
		.expect("failed to get session")
		.json()
		.await
		.expect("failed to read body");
	assert_eq!(body, json!({ "user": null }));

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_local_jwt_verification() {
	let (config, port) = memory_config(true, Some("super-secret-jwt-token-with-at-least-32-characters"));
	let server = TestServer::start(config, port).await;

	let token = server.sign_up("founder@example.com", "Acme").await;
	assert_eq!(token.split('.').count(), 3);

	let body: Value = server
		.client
		.get(server.url("/auth/session"))
		.bearer_auth(&token)
		.send()
		.await
		.expect("failed to get session")
		.json()
		.await
		.expect("failed to read body");
	assert_eq!(body["user"]["email"], json!("founder@example.com"));

	let resp = server
		.client
		.get(server.url("/auth/session"))
		.bearer_auth("eyJhbGciOiJIUzI1NiJ9.e30.bad")
		.send()
		.await
		.expect("failed to get session");
	assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

	server.shutdown().await;
}
