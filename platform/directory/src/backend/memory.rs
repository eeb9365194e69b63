use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use hyper::StatusCode;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{
	AuthBackend, BackendError, DataBackend, Filter, Query, Result, Session, SignUpOutcome, StorageBackend, Table, User,
};
use crate::api::jwt::AccessClaims;

const TOKEN_TTL_SECS: i64 = 3600;
const SLUG_MAX: usize = 60;

/// An in-process stand-in for the hosted service.
///
/// It keeps the same row visibility rules as the hosted policies: public
/// startups and their published updates are readable by everyone, owners can
/// read and write their own rows. Sign up creates the owner's startup row.
pub struct MemoryBackend {
	base_url: String,
	auto_confirm: bool,
	jwt_secret: Option<String>,
	token_ttl: i64,
	state: Mutex<State>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
	pub bytes: Bytes,
	pub content_type: String,
	pub cache_control: String,
}

struct Account {
	user: User,
	password_hash: String,
}

#[derive(Default)]
struct State {
	accounts: HashMap<Uuid, Account>,
	access_tokens: HashMap<String, (Uuid, i64)>,
	refresh_tokens: HashMap<String, Uuid>,
	startups: Vec<Value>,
	updates: Vec<Value>,
	buckets: HashMap<String, HashMap<String, StoredObject>>,
	clock: Option<DateTime<Utc>>,
	#[cfg(test)]
	fail_updates: bool,
}

impl State {
	/// A strictly increasing timestamp, so rows created back to back still
	/// order deterministically.
	fn now(&mut self) -> String {
		let mut now = Utc::now();
		if let Some(last) = self.clock {
			if now <= last {
				now = last + Duration::microseconds(1);
			}
		}

		self.clock = Some(now);
		now.to_rfc3339_opts(SecondsFormat::Micros, true)
	}

	fn rows(&self, table: Table) -> &Vec<Value> {
		match table {
			Table::Startups => &self.startups,
			Table::Updates => &self.updates,
		}
	}

	fn rows_mut(&mut self, table: Table) -> &mut Vec<Value> {
		match table {
			Table::Startups => &mut self.startups,
			Table::Updates => &mut self.updates,
		}
	}

	fn resolve(&self, token: &str) -> Result<Uuid> {
		match self.access_tokens.get(token) {
			Some((user_id, expires_at)) if *expires_at > Utc::now().timestamp() => Ok(*user_id),
			Some(_) => Err(BackendError::Unauthorized("JWT expired".to_owned())),
			None => Err(BackendError::Unauthorized("invalid JWT".to_owned())),
		}
	}

	fn startup(&self, id: &str) -> Option<&Value> {
		self.startups.iter().find(|row| row["id"].as_str() == Some(id))
	}

	fn is_public_startup(&self, id: &str) -> bool {
		self.startup(id).is_some_and(|row| row["is_public"] == Value::Bool(true))
	}

	fn visible(&self, table: Table, row: &Value, user_id: Option<Uuid>) -> bool {
		let owner = user_id.map(|id| id.to_string());
		match table {
			Table::Startups => row["is_public"] == Value::Bool(true) || owner.as_deref() == row["id"].as_str(),
			Table::Updates => {
				let startup_id = row["startup_id"].as_str().unwrap_or_default();
				owner.as_deref() == Some(startup_id)
					|| (row["is_published"] == Value::Bool(true) && self.is_public_startup(startup_id))
			}
		}
	}

	fn owns(table: Table, row: &Value, user_id: Uuid) -> bool {
		let column = match table {
			Table::Startups => "id",
			Table::Updates => "startup_id",
		};

		row[column].as_str() == Some(user_id.to_string().as_str())
	}

	fn slug_taken(&self, slug: &str, except: Option<&str>) -> bool {
		self.startups
			.iter()
			.any(|row| row["slug"].as_str() == Some(slug) && row["id"].as_str() != except)
	}

	fn unique_slug(&self, name: &str) -> String {
		let base = slugify(name);
		if !self.slug_taken(&base, None) {
			return base;
		}

		(2..)
			.map(|n| {
				let suffix = format!("-{n}");
				let stem: String = base.chars().take(SLUG_MAX - suffix.len()).collect();
				format!("{}{suffix}", stem.trim_end_matches('-'))
			})
			.find(|slug| !self.slug_taken(slug, None))
			.unwrap_or(base)
	}
}

pub(crate) fn slugify(name: &str) -> String {
	let mut slug = String::new();
	for c in name.trim().chars().flat_map(char::to_lowercase) {
		if c.is_ascii_alphanumeric() {
			slug.push(c);
		} else if !slug.ends_with('-') && !slug.is_empty() {
			slug.push('-');
		}
	}

	let slug: String = slug.trim_end_matches('-').chars().take(SLUG_MAX).collect();
	let slug = slug.trim_end_matches('-').to_owned();

	if slug.chars().count() < 2 {
		"startup".to_owned()
	} else {
		slug
	}
}

/// An argon2 PHC string with a fresh salt.
pub(crate) fn hash_password(password: &str) -> Result<String> {
	let salt = SaltString::generate(&mut OsRng);

	Argon2::default()
		.hash_password(password.as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(|err| BackendError::Rejected {
			status: StatusCode::INTERNAL_SERVER_ERROR,
			message: format!("failed to hash password: {err}"),
		})
}

pub(crate) fn verify_password(hash: &str, password: &str) -> bool {
	let hash = match PasswordHash::new(hash) {
		Ok(hash) => hash,
		Err(err) => {
			tracing::error!("failed to parse password hash: {}", err);
			return false;
		}
	};

	Argon2::default().verify_password(password.as_bytes(), &hash).is_ok()
}

fn random_token() -> String {
	rand::thread_rng()
		.sample_iter(&Alphanumeric)
		.take(48)
		.map(char::from)
		.collect()
}

fn compare(a: &Value, b: &Value) -> Ordering {
	match (a, b) {
		(Value::String(a), Value::String(b)) => a.cmp(b),
		(Value::Number(a), Value::Number(b)) => a
			.as_f64()
			.unwrap_or_default()
			.partial_cmp(&b.as_f64().unwrap_or_default())
			.unwrap_or(Ordering::Equal),
		(Value::Bool(a), Value::Bool(b)) => a.cmp(b),
		(Value::Null, Value::Null) => Ordering::Equal,
		(Value::Null, _) => Ordering::Greater,
		(_, Value::Null) => Ordering::Less,
		_ => Ordering::Equal,
	}
}

fn rls_violation() -> BackendError {
	BackendError::Unauthorized("new row violates row-level security policy".to_owned())
}

fn slug_conflict() -> BackendError {
	BackendError::Conflict("duplicate key value violates unique constraint \"startups_slug_key\"".to_owned())
}

impl MemoryBackend {
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into().trim_end_matches('/').to_owned(),
			auto_confirm: false,
			jwt_secret: None,
			token_ttl: TOKEN_TTL_SECS,
			state: Mutex::new(State::default()),
		}
	}

	/// Skip the email confirmation step, sign up then returns a session.
	pub fn with_auto_confirm(mut self, auto_confirm: bool) -> Self {
		self.auto_confirm = auto_confirm;
		self
	}

	/// Issue HS256 access tokens signed with `secret` instead of opaque ones.
	pub fn with_jwt_secret(mut self, secret: Option<String>) -> Self {
		self.jwt_secret = secret;
		self
	}

	/// How long access tokens stay valid, in seconds.
	pub fn with_token_ttl(mut self, seconds: i64) -> Self {
		self.token_ttl = seconds;
		self
	}

	pub fn with_bucket(self, bucket: impl Into<String>) -> Self {
		if let Ok(mut state) = self.state.lock() {
			state.buckets.entry(bucket.into()).or_default();
		}
		self
	}

	fn state(&self) -> Result<MutexGuard<'_, State>> {
		self.state
			.lock()
			.map_err(|_| BackendError::Transport("memory backend state poisoned".to_owned()))
	}

	/// Marks the account as confirmed, as following the emailed link would.
	pub fn confirm_email(&self, email: &str) -> bool {
		let email = email.trim().to_lowercase();
		let Ok(mut state) = self.state() else {
			return false;
		};

		state
			.accounts
			.values_mut()
			.find(|account| account.user.email == email)
			.map(|account| account.user.email_confirmed = true)
			.is_some()
	}

	#[cfg(test)]
	pub(crate) fn access_token_count(&self) -> usize {
		self.state().map(|state| state.access_tokens.len()).unwrap_or_default()
	}

	/// Makes every row update fail as if the connection dropped.
	#[cfg(test)]
	pub(crate) fn fail_updates(&self, fail: bool) {
		if let Ok(mut state) = self.state() {
			state.fail_updates = fail;
		}
	}

	pub fn object(&self, bucket: &str, path: &str) -> Option<StoredObject> {
		self.state().ok()?.buckets.get(bucket)?.get(path).cloned()
	}

	fn issue_session(&self, state: &mut State, user: User) -> Result<Session> {
		let now = Utc::now().timestamp();
		let expires_at = now + self.token_ttl;

		state.access_tokens.retain(|_, (_, expires_at)| *expires_at > now);

		let access_token = match &self.jwt_secret {
			Some(secret) => AccessClaims {
				user_id: user.id,
				email: Some(user.email.clone()),
				issued_at: now,
				not_before: None,
				expires_at,
			}
			.sign(secret)
			.ok_or_else(|| BackendError::Transport("failed to sign access token".to_owned()))?,
			None => random_token(),
		};
		let refresh_token = random_token();

		state.access_tokens.insert(access_token.clone(), (user.id, expires_at));
		state.refresh_tokens.insert(refresh_token.clone(), user.id);

		Ok(Session {
			access_token,
			refresh_token,
			expires_in: self.token_ttl,
			expires_at,
			user,
		})
	}
}

#[async_trait]
impl AuthBackend for MemoryBackend {
	async fn sign_up(&self, email: &str, password: &str, name: &str, _redirect_to: Option<&str>) -> Result<SignUpOutcome> {
		let email = email.trim().to_lowercase();
		let password_hash = hash_password(password)?;
		let mut state = self.state()?;

		if state.accounts.values().any(|account| account.user.email == email) {
			return Err(BackendError::Rejected {
				status: StatusCode::UNPROCESSABLE_ENTITY,
				message: "User already registered".to_owned(),
			});
		}

		let user = User {
			id: Uuid::new_v4(),
			email: email.clone(),
			email_confirmed: self.auto_confirm,
			metadata: json!({ "name": name }),
		};

		let now = state.now();
		let slug = state.unique_slug(name);
		state.startups.push(json!({
			"id": user.id,
			"name": name,
			"slug": slug,
			"logo_url": null,
			"tagline": null,
			"description_md": null,
			"website_url": null,
			"location": null,
			"sectors": [],
			"stage": "idea",
			"is_public": true,
			"email": null,
			"twitter_url": null,
			"linkedin_url": null,
			"created_at": now,
			"updated_at": now,
		}));

		state.accounts.insert(
			user.id,
			Account {
				user: user.clone(),
				password_hash,
			},
		);

		let session = if self.auto_confirm {
			Some(self.issue_session(&mut state, user.clone())?)
		} else {
			None
		};

		Ok(SignUpOutcome { user, session })
	}

	async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
		let email = email.trim().to_lowercase();
		let mut state = self.state()?;

		let user = state
			.accounts
			.values()
			.find(|account| account.user.email == email && verify_password(&account.password_hash, password))
			.map(|account| account.user.clone())
			.ok_or_else(|| BackendError::Rejected {
				status: StatusCode::BAD_REQUEST,
				message: "Invalid login credentials".to_owned(),
			})?;

		if !user.email_confirmed {
			return Err(BackendError::Rejected {
				status: StatusCode::BAD_REQUEST,
				message: "Email not confirmed".to_owned(),
			});
		}

		self.issue_session(&mut state, user)
	}

	async fn refresh(&self, refresh_token: &str) -> Result<Session> {
		let mut state = self.state()?;

		let user_id = state.refresh_tokens.remove(refresh_token).ok_or_else(|| BackendError::Rejected {
			status: StatusCode::BAD_REQUEST,
			message: "Invalid Refresh Token: Refresh Token Not Found".to_owned(),
		})?;

		let user = state
			.accounts
			.get(&user_id)
			.map(|account| account.user.clone())
			.ok_or(BackendError::NotFound)?;

		self.issue_session(&mut state, user)
	}

	async fn get_user(&self, access_token: &str) -> Result<User> {
		let state = self.state()?;
		let user_id = state.resolve(access_token)?;

		state
			.accounts
			.get(&user_id)
			.map(|account| account.user.clone())
			.ok_or(BackendError::NotFound)
	}

	async fn sign_out(&self, access_token: &str) -> Result<()> {
		let mut state = self.state()?;
		let user_id = state.resolve(access_token)?;

		state.access_tokens.retain(|_, (id, _)| *id != user_id);
		state.refresh_tokens.retain(|_, id| *id != user_id);

		Ok(())
	}
}

#[async_trait]
impl DataBackend for MemoryBackend {
	async fn select(&self, token: Option<&str>, query: &Query) -> Result<Vec<Value>> {
		let state = self.state()?;
		let user_id = token.map(|token| state.resolve(token)).transpose()?;

		let mut rows = state
			.rows(query.table)
			.iter()
			.filter(|row| state.visible(query.table, row, user_id))
			.filter(|row| query.filters.iter().all(|f| f.matches(row)))
			.cloned()
			.collect::<Vec<_>>();

		if let Some(order) = &query.order {
			rows.sort_by(|a, b| {
				let ordering = compare(&a[&order.column], &b[&order.column]);
				if order.descending {
					ordering.reverse()
				} else {
					ordering
				}
			});
		}

		if let Some(limit) = query.limit {
			rows.truncate(limit);
		}

		if query.embed_startup && query.table == Table::Updates {
			for row in &mut rows {
				let startup = row["startup_id"]
					.as_str()
					.and_then(|id| state.startup(id))
					.filter(|startup| state.visible(Table::Startups, startup, user_id))
					.cloned()
					.unwrap_or(Value::Null);

				if let Value::Object(map) = row {
					map.insert("startup".to_owned(), startup);
				}
			}
		}

		Ok(rows)
	}

	async fn insert(&self, token: &str, table: Table, row: Value) -> Result<Value> {
		let mut state = self.state()?;
		let user_id = state.resolve(token)?;

		let Value::Object(mut row) = row else {
			return Err(BackendError::Rejected {
				status: StatusCode::BAD_REQUEST,
				message: "row must be an object".to_owned(),
			});
		};

		let now = state.now();
		let row = match table {
			Table::Updates => {
				if row.get("startup_id").and_then(Value::as_str) != Some(user_id.to_string().as_str()) {
					return Err(rls_violation());
				}

				row.entry("id").or_insert_with(|| json!(Uuid::new_v4()));
				row.entry("title").or_insert(Value::Null);
				row.entry("images").or_insert_with(|| json!([]));
				row.entry("is_published").or_insert(Value::Bool(true));
				for key in ["published_at", "created_at", "updated_at"] {
					if row.get(key).map_or(true, Value::is_null) {
						row.insert(key.to_owned(), json!(now));
					}
				}

				Value::Object(row)
			}
			Table::Startups => {
				let id = user_id.to_string();
				if row.get("id").and_then(Value::as_str) != Some(id.as_str()) {
					return Err(rls_violation());
				}

				if state.startup(&id).is_some() {
					return Err(BackendError::Conflict(
						"duplicate key value violates unique constraint \"startups_pkey\"".to_owned(),
					));
				}

				if let Some(slug) = row.get("slug").and_then(Value::as_str) {
					if state.slug_taken(slug, None) {
						return Err(slug_conflict());
					}
				}

				row.insert("created_at".to_owned(), json!(now));
				row.insert("updated_at".to_owned(), json!(now));
				Value::Object(row)
			}
		};

		state.rows_mut(table).push(row.clone());
		Ok(row)
	}

	async fn update(&self, token: &str, table: Table, filters: &[Filter], patch: Value) -> Result<Vec<Value>> {
		let mut state = self.state()?;
		let user_id = state.resolve(token)?;

		#[cfg(test)]
		if state.fail_updates {
			return Err(BackendError::Transport("connection reset".to_owned()));
		}

		let Value::Object(patch) = patch else {
			return Err(BackendError::Rejected {
				status: StatusCode::BAD_REQUEST,
				message: "patch must be an object".to_owned(),
			});
		};

		let targets = state
			.rows(table)
			.iter()
			.enumerate()
			.filter(|(_, row)| State::owns(table, row, user_id) && filters.iter().all(|f| f.matches(row)))
			.map(|(idx, _)| idx)
			.collect::<Vec<_>>();

		if table == Table::Startups {
			if let Some(slug) = patch.get("slug").and_then(Value::as_str) {
				let except = user_id.to_string();
				if !targets.is_empty() && state.slug_taken(slug, Some(except.as_str())) {
					return Err(slug_conflict());
				}
			}
		}

		let now = state.now();
		let protected: HashSet<&str> = ["id", "startup_id", "created_at"].into_iter().collect();

		let rows = state.rows_mut(table);
		let mut updated = Vec::with_capacity(targets.len());
		for idx in targets {
			if let Value::Object(row) = &mut rows[idx] {
				for (key, value) in &patch {
					if !protected.contains(key.as_str()) {
						row.insert(key.clone(), value.clone());
					}
				}
				row.insert("updated_at".to_owned(), json!(now));
			}
			updated.push(rows[idx].clone());
		}

		Ok(updated)
	}

	async fn delete(&self, token: &str, table: Table, filters: &[Filter]) -> Result<u64> {
		let mut state = self.state()?;
		let user_id = state.resolve(token)?;

		let rows = state.rows_mut(table);
		let before = rows.len();
		rows.retain(|row| !(State::owns(table, row, user_id) && filters.iter().all(|f| f.matches(row))));

		Ok((before - rows.len()) as u64)
	}
}

#[async_trait]
impl StorageBackend for MemoryBackend {
	async fn upload(
		&self,
		token: &str,
		bucket: &str,
		path: &str,
		bytes: Bytes,
		content_type: &str,
		cache_control_seconds: u64,
	) -> Result<String> {
		let mut state = self.state()?;
		state.resolve(token)?;

		let objects = state
			.buckets
			.get_mut(bucket)
			.ok_or_else(|| BackendError::BucketNotFound("Bucket not found".to_owned()))?;

		if objects.contains_key(path) {
			return Err(BackendError::Conflict("The resource already exists".to_owned()));
		}

		objects.insert(
			path.to_owned(),
			StoredObject {
				bytes,
				content_type: content_type.to_owned(),
				cache_control: format!("max-age={cache_control_seconds}"),
			},
		);

		Ok(self.public_url(bucket, path))
	}

	async fn remove(&self, token: &str, bucket: &str, paths: &[String]) -> Result<()> {
		let mut state = self.state()?;
		state.resolve(token)?;

		let objects = state
			.buckets
			.get_mut(bucket)
			.ok_or_else(|| BackendError::BucketNotFound("Bucket not found".to_owned()))?;

		for path in paths {
			objects.remove(path);
		}

		Ok(())
	}

	fn public_url(&self, bucket: &str, path: &str) -> String {
		format!("{}/storage/v1/object/public/{bucket}/{path}", self.base_url)
	}
}
