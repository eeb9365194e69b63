//! The seam between the directory and the hosted backend service.
//!
//! The service owns users, sessions, the `startups` and `updates` tables and
//! the storage buckets. [`http::HttpBackend`] talks to the real thing,
//! [`memory::MemoryBackend`] mimics it in-process.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

mod error;
pub mod http;
pub mod memory;
mod query;

pub use error::BackendError;
pub use query::{Filter, Order, Query, Table};

use crate::config::{BackendKind, DirectoryConfig};

pub type Result<T, E = BackendError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
	pub id: Uuid,
	pub email: String,
	pub email_confirmed: bool,
	/// Free-form metadata supplied at sign up, `{"name": ...}`
	pub metadata: Value,
}

impl User {
	pub fn display_name(&self) -> Option<&str> {
		self.metadata.get("name").and_then(Value::as_str)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
	pub access_token: String,
	pub refresh_token: String,
	/// Seconds until the access token expires
	pub expires_in: i64,
	/// Unix timestamp of the expiry
	pub expires_at: i64,
	pub user: User,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
	pub user: User,
	/// Present when the backend does not require email confirmation
	pub session: Option<Session>,
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
	async fn sign_up(&self, email: &str, password: &str, name: &str, redirect_to: Option<&str>) -> Result<SignUpOutcome>;

	async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

	async fn refresh(&self, refresh_token: &str) -> Result<Session>;

	async fn get_user(&self, access_token: &str) -> Result<User>;

	async fn sign_out(&self, access_token: &str) -> Result<()>;
}

#[async_trait]
pub trait DataBackend: Send + Sync {
	/// Reads rows visible to `token`, or to anonymous visitors without one.
	async fn select(&self, token: Option<&str>, query: &Query) -> Result<Vec<Value>>;

	async fn insert(&self, token: &str, table: Table, row: Value) -> Result<Value>;

	/// Patches every matching row the token may write and returns them.
	async fn update(&self, token: &str, table: Table, filters: &[Filter], patch: Value) -> Result<Vec<Value>>;

	/// Deletes every matching row the token may write and returns how many went.
	async fn delete(&self, token: &str, table: Table, filters: &[Filter]) -> Result<u64>;
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
	/// Stores an object without overwriting and returns its public URL.
	async fn upload(
		&self,
		token: &str,
		bucket: &str,
		path: &str,
		bytes: Bytes,
		content_type: &str,
		cache_control_seconds: u64,
	) -> Result<String>;

	async fn remove(&self, token: &str, bucket: &str, paths: &[String]) -> Result<()>;

	fn public_url(&self, bucket: &str, path: &str) -> String;

	/// Recovers the object path from a public URL of `bucket`.
	///
	/// URLs that do not point into the bucket fall back to their last path
	/// segment. `blob:` URLs never refer to a stored object.
	fn object_path(&self, bucket: &str, url: &str) -> Option<String> {
		if url.starts_with("blob:") {
			return None;
		}

		let marker = format!("/storage/v1/object/public/{bucket}/");
		if let Some((_, path)) = url.split_once(&marker) {
			let path = path.split(['?', '#']).next().unwrap_or_default();
			return (!path.is_empty()).then(|| path.to_owned());
		}

		url.split(['?', '#'])
			.next()
			.and_then(|u| u.rsplit('/').next())
			.filter(|s| !s.is_empty())
			.map(str::to_owned)
	}
}

pub trait Backend: AuthBackend + DataBackend + StorageBackend {}

impl<T: AuthBackend + DataBackend + StorageBackend> Backend for T {}

/// Builds the configured backend. `None` means the site runs without one and
/// public pages ask the operator to finish setup.
pub fn from_config(config: &DirectoryConfig) -> Result<Option<Arc<dyn Backend>>> {
	let backend = &config.backend;

	match backend.kind {
		BackendKind::Memory => {
			let memory = memory::MemoryBackend::new(config.api.site_url.trim_end_matches('/'))
				.with_bucket(&config.storage.logo_bucket)
				.with_bucket(&config.storage.update_image_bucket)
				.with_auto_confirm(backend.auto_confirm)
				.with_jwt_secret(backend.jwt_secret.clone());

			Ok(Some(Arc::new(memory)))
		}
		BackendKind::Http if backend.is_configured() => {
			let (Some(url), Some(anon_key)) = (backend.url.as_deref(), backend.anon_key.as_deref()) else {
				return Ok(None);
			};

			let http = http::HttpBackend::new(url, anon_key, Duration::from_secs(backend.timeout_secs))?;
			Ok(Some(Arc::new(http)))
		}
		BackendKind::Http => Ok(None),
	}
}
