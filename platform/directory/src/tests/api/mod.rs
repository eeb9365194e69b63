use std::sync::Arc;
use std::time::Duration;

use common::context::Handler;
use common::prelude::FutureTimeout;
use serde_json::Value;

use crate::api;
use crate::config::AppConfig;
use crate::tests::global::{mock_global_state, GlobalState};

mod auth;

/// A running API server on a free port.
struct TestServer {
	port: u16,
	global: Arc<GlobalState>,
	handler: Handler,
	handle: tokio::task::JoinHandle<anyhow::Result<()>>,
	client: reqwest::Client,
}

impl TestServer {
	async fn start(config: AppConfig, port: u16) -> Self {
		let (global, handler) = mock_global_state(config).await;

		let handle = tokio::spawn(api::run(global.clone()));

		// We need to wait for the server to start
		tokio::time::sleep(Duration::from_millis(300)).await;

		let client = reqwest::Client::builder()
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("failed to build client");

		Self {
			port,
			global,
			handler,
			handle,
			client,
		}
	}

	fn url(&self, path: &str) -> String {
		format!("http://localhost:{}{path}", self.port)
	}

	/// Signs up with auto confirmation and returns the access token.
	async fn sign_up(&self, email: &str, name: &str) -> String {
		let resp = self
			.client
			.post(self.url("/auth/signup"))
			.json(&serde_json::json!({ "email": email, "password": "hunter22", "name": name }))
			.send()
			.await
			.expect("failed to sign up");
		assert_eq!(resp.status(), reqwest::StatusCode::OK);

		let body: Value = resp.json().await.expect("failed to read body");
		body["session"]["access_token"]
			.as_str()
			.expect("sign up should return a session")
			.to_owned()
	}

	/// Signs in and returns the access token.
	async fn sign_in(&self, email: &str) -> String {
		let resp = self
			.client
			.post(self.url("/auth/signin"))
			.json(&serde_json::json!({ "email": email, "password": "hunter22" }))
			.send()
			.await
			.expect("failed to sign in");
		assert_eq!(resp.status(), reqwest::StatusCode::OK);

		let body: Value = resp.json().await.expect("failed to read body");
		body["session"]["access_token"]
			.as_str()
			.expect("sign in should return a session")
			.to_owned()
	}

	async fn shutdown(self) {
		// The client uses Keep-Alive, so we need to drop it to release the global context
		drop(self.global);
		drop(self.client);

		self.handler
			.cancel()
			.timeout(Duration::from_secs(1))
			.await
			.expect("failed to cancel context");

		self.handle
			.timeout(Duration::from_secs(1))
			.await
			.expect("api server did not stop")
			.expect("api server panicked")
			.expect("api server failed");
	}
}
