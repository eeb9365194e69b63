use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use hyper::StatusCode;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

use super::query::filter_params;
use super::{AuthBackend, BackendError, DataBackend, Filter, Query, Result, Session, SignUpOutcome, StorageBackend, Table, User};

/// Talks to a Supabase-style hosted service: GoTrue under `/auth/v1`,
/// PostgREST under `/rest/v1` and storage under `/storage/v1`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
	client: reqwest::Client,
	base: Url,
	anon_key: String,
}

#[derive(Debug, Deserialize)]
struct WireUser {
	id: Uuid,
	#[serde(default)]
	email: Option<String>,
	#[serde(default)]
	email_confirmed_at: Option<String>,
	#[serde(default)]
	confirmed_at: Option<String>,
	#[serde(default)]
	user_metadata: Value,
}

impl From<WireUser> for User {
	fn from(user: WireUser) -> Self {
		Self {
			id: user.id,
			email: user.email.unwrap_or_default(),
			email_confirmed: user.email_confirmed_at.is_some() || user.confirmed_at.is_some(),
			metadata: if user.user_metadata.is_null() {
				json!({})
			} else {
				user.user_metadata
			},
		}
	}
}

#[derive(Debug, Deserialize)]
struct WireSession {
	access_token: String,
	refresh_token: String,
	expires_in: i64,
	#[serde(default)]
	expires_at: Option<i64>,
	user: WireUser,
}

impl From<WireSession> for Session {
	fn from(session: WireSession) -> Self {
		let expires_at = session
			.expires_at
			.unwrap_or_else(|| chrono::Utc::now().timestamp() + session.expires_in);

		Self {
			access_token: session.access_token,
			refresh_token: session.refresh_token,
			expires_in: session.expires_in,
			expires_at,
			user: session.user.into(),
		}
	}
}

impl HttpBackend {
	pub fn new(url: &str, anon_key: &str, timeout: Duration) -> Result<Self> {
		let base = Url::parse(url).map_err(|err| BackendError::Transport(format!("invalid backend url: {err}")))?;
		if base.cannot_be_a_base() {
			return Err(BackendError::Transport(format!("invalid backend url: {url}")));
		}

		let client = reqwest::Client::builder()
			.timeout(timeout)
			.user_agent(concat!("directory/", env!("CARGO_PKG_VERSION")))
			.build()?;

		Ok(Self {
			client,
			base,
			anon_key: anon_key.to_owned(),
		})
	}

	fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
		let mut url = self.base.clone();
		if let Ok(mut path) = url.path_segments_mut() {
			path.pop_if_empty().extend(segments);
		}
		url
	}

	fn request(&self, method: Method, url: Url, token: Option<&str>) -> RequestBuilder {
		self.client
			.request(method, url)
			.header("apikey", &self.anon_key)
			.bearer_auth(token.unwrap_or(&self.anon_key))
	}

	async fn send(&self, builder: RequestBuilder) -> Result<Response> {
		let res = builder.send().await?;
		if res.status().is_success() {
			return Ok(res);
		}

		let status = res.status();
		let body = res.bytes().await.unwrap_or_default();
		Err(classify_error(status, &body))
	}

	async fn send_json<T: serde::de::DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
		let res = self.send(builder).await?;
		let body = res.bytes().await?;
		Ok(serde_json::from_slice(&body)?)
	}

	async fn token(&self, grant_type: &str, body: Value) -> Result<Session> {
		let mut url = self.url(["auth", "v1", "token"]);
		url.query_pairs_mut().append_pair("grant_type", grant_type);

		let session: WireSession = self.send_json(self.request(Method::POST, url, None).json(&body)).await?;
		Ok(session.into())
	}
}

/// Maps an error response of any of the three APIs onto a [`BackendError`].
pub(crate) fn classify_error(status: StatusCode, body: &[u8]) -> BackendError {
	let parsed = serde_json::from_slice::<Value>(body).unwrap_or(Value::Null);

	let message = ["msg", "message", "error_description", "error"]
		.iter()
		.find_map(|key| parsed.get(key).and_then(Value::as_str))
		.map(str::to_owned)
		.unwrap_or_else(|| {
			let text = String::from_utf8_lossy(body).trim().to_owned();
			if text.is_empty() {
				status.canonical_reason().unwrap_or("unknown error").to_owned()
			} else {
				text
			}
		});

	let code = parsed.get("code").map(|c| match c {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	});

	let lower = message.to_lowercase();

	if lower.contains("bucket") && lower.contains("not found") {
		return BackendError::BucketNotFound(message);
	}

	if code.as_deref() == Some("23505") || status == StatusCode::CONFLICT || lower.contains("duplicate") {
		return BackendError::Conflict(message);
	}

	match status {
		StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
		StatusCode::NOT_FOUND => BackendError::NotFound,
		_ => BackendError::Rejected { status, message },
	}
}

#[async_trait]
impl AuthBackend for HttpBackend {
	async fn sign_up(&self, email: &str, password: &str, name: &str, redirect_to: Option<&str>) -> Result<SignUpOutcome> {
		let mut url = self.url(["auth", "v1", "signup"]);
		if let Some(redirect_to) = redirect_to {
			url.query_pairs_mut().append_pair("redirect_to", redirect_to);
		}

		let body = json!({
			"email": email,
			"password": password,
			"data": { "name": name },
		});

		let value: Value = self.send_json(self.request(Method::POST, url, None).json(&body)).await?;

		// With confirmations off the service answers with a full session,
		// otherwise with the bare user.
		if value.get("access_token").is_some() {
			let session: Session = serde_json::from_value::<WireSession>(value)?.into();
			Ok(SignUpOutcome {
				user: session.user.clone(),
				session: Some(session),
			})
		} else {
			let user = value.get("user").cloned().unwrap_or(value);
			Ok(SignUpOutcome {
				user: serde_json::from_value::<WireUser>(user)?.into(),
				session: None,
			})
		}
	}

	async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
		self.token("password", json!({ "email": email, "password": password })).await
	}

	async fn refresh(&self, refresh_token: &str) -> Result<Session> {
		self.token("refresh_token", json!({ "refresh_token": refresh_token })).await
	}

	async fn get_user(&self, access_token: &str) -> Result<User> {
		let url = self.url(["auth", "v1", "user"]);
		let user: WireUser = self.send_json(self.request(Method::GET, url, Some(access_token))).await?;
		Ok(user.into())
	}

	async fn sign_out(&self, access_token: &str) -> Result<()> {
		let url = self.url(["auth", "v1", "logout"]);
		self.send(self.request(Method::POST, url, Some(access_token))).await?;
		Ok(())
	}
}

#[async_trait]
impl DataBackend for HttpBackend {
	async fn select(&self, token: Option<&str>, query: &Query) -> Result<Vec<Value>> {
		let mut url = self.url(["rest", "v1", query.table.as_str()]);
		url.query_pairs_mut().extend_pairs(query.to_params());

		self.send_json(self.request(Method::GET, url, token)).await
	}

	async fn insert(&self, token: &str, table: Table, row: Value) -> Result<Value> {
		let url = self.url(["rest", "v1", table.as_str()]);

		let rows: Vec<Value> = self
			.send_json(
				self.request(Method::POST, url, Some(token))
					.header("Prefer", "return=representation")
					.json(&row),
			)
			.await?;

		rows.into_iter().next().ok_or(BackendError::NotFound)
	}

	async fn update(&self, token: &str, table: Table, filters: &[Filter], patch: Value) -> Result<Vec<Value>> {
		let mut url = self.url(["rest", "v1", table.as_str()]);
		url.query_pairs_mut().extend_pairs(filter_params(filters));

		self.send_json(
			self.request(Method::PATCH, url, Some(token))
				.header("Prefer", "return=representation")
				.json(&patch),
		)
		.await
	}

	async fn delete(&self, token: &str, table: Table, filters: &[Filter]) -> Result<u64> {
		let mut url = self.url(["rest", "v1", table.as_str()]);
		url.query_pairs_mut().extend_pairs(filter_params(filters));

		let rows: Vec<Value> = self
			.send_json(self.request(Method::DELETE, url, Some(token)).header("Prefer", "return=representation"))
			.await?;

		Ok(rows.len() as u64)
	}
}

#[async_trait]
impl StorageBackend for HttpBackend {
	async fn upload(
		&self,
		token: &str,
		bucket: &str,
		path: &str,
		bytes: Bytes,
		content_type: &str,
		cache_control_seconds: u64,
	) -> Result<String> {
		let url = self.url(["storage", "v1", "object", bucket].into_iter().chain(path.split('/')));

		self.send(
			self.request(Method::POST, url, Some(token))
				.header("content-type", content_type)
				.header("cache-control", format!("max-age={cache_control_seconds}"))
				.header("x-upsert", "false")
				.body(bytes),
		)
		.await?;

		Ok(self.public_url(bucket, path))
	}

	async fn remove(&self, token: &str, bucket: &str, paths: &[String]) -> Result<()> {
		let url = self.url(["storage", "v1", "object", bucket]);

		self.send(
			self.request(Method::DELETE, url, Some(token))
				.json(&json!({ "prefixes": paths })),
		)
		.await?;

		Ok(())
	}

	fn public_url(&self, bucket: &str, path: &str) -> String {
		self.url(
			["storage", "v1", "object", "public", bucket]
				.into_iter()
				.chain(path.split('/')),
		)
		.to_string()
	}
}
