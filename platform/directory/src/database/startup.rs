use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{decode_first, Stage};
use crate::backend::{Backend, BackendError, Filter, Query, Table};

/// A row of the `startups` table. The id is the owning user's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Startup {
	pub id: Uuid,
	pub name: String,
	pub slug: String,
	#[serde(default)]
	pub logo_url: Option<String>,
	#[serde(default)]
	pub tagline: Option<String>,
	#[serde(default)]
	pub description_md: Option<String>,
	#[serde(default)]
	pub website_url: Option<String>,
	#[serde(default)]
	pub location: Option<String>,
	#[serde(default)]
	pub sectors: Option<Vec<String>>,
	#[serde(default)]
	pub stage: Stage,
	#[serde(default)]
	pub is_public: bool,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub twitter_url: Option<String>,
	#[serde(default)]
	pub linkedin_url: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// The columns the profile editor writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileChanges {
	pub name: String,
	pub slug: String,
	pub tagline: Option<String>,
	pub description_md: Option<String>,
	pub website_url: Option<String>,
	pub location: Option<String>,
	pub sectors: Vec<String>,
	pub stage: Stage,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub is_public: Option<bool>,
	pub email: Option<String>,
	pub twitter_url: Option<String>,
	pub linkedin_url: Option<String>,
}

impl Startup {
	pub fn sectors(&self) -> &[String] {
		self.sectors.as_deref().unwrap_or_default()
	}

	/// The owner's own row, visible regardless of `is_public`.
	pub async fn by_id(backend: &dyn Backend, token: &str, id: Uuid) -> Result<Option<Self>, BackendError> {
		let query = Query::new(Table::Startups).eq("id", id).limit(1);
		decode_first(backend.select(Some(token), &query).await?)
	}

	pub async fn public_by_slug(backend: &dyn Backend, slug: &str) -> Result<Option<Self>, BackendError> {
		let query = Query::new(Table::Startups)
			.eq("slug", slug)
			.eq("is_public", true)
			.limit(1);
		decode_first(backend.select(None, &query).await?)
	}

	pub async fn save_profile(
		backend: &dyn Backend,
		token: &str,
		id: Uuid,
		changes: &ProfileChanges,
	) -> Result<Self, BackendError> {
		let patch = serde_json::to_value(changes)?;
		Self::patch(backend, token, id, patch).await
	}

	pub async fn set_logo(
		backend: &dyn Backend,
		token: &str,
		id: Uuid,
		logo_url: Option<&str>,
	) -> Result<Self, BackendError> {
		Self::patch(backend, token, id, serde_json::json!({ "logo_url": logo_url })).await
	}

	async fn patch(backend: &dyn Backend, token: &str, id: Uuid, patch: serde_json::Value) -> Result<Self, BackendError> {
		let rows = backend
			.update(token, Table::Startups, &[Filter::eq("id", id)], patch)
			.await?;

		decode_first(rows)?.ok_or(BackendError::NotFound)
	}
}
