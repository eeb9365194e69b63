use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{decode_first, decode_rows, Startup};
use crate::backend::{Backend, BackendError, Filter, Query, Table};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateImage {
	pub url: String,
	pub w: u32,
	pub h: u32,
	#[serde(default)]
	pub alt: String,
}

/// A row of the `updates` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
	pub id: Uuid,
	pub startup_id: Uuid,
	#[serde(default)]
	pub title: Option<String>,
	pub content_md: String,
	#[serde(default)]
	pub images: Vec<UpdateImage>,
	#[serde(default = "published_default")]
	pub is_published: bool,
	pub published_at: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

fn published_default() -> bool {
	true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateWithStartup {
	#[serde(flatten)]
	pub update: Update,
	pub startup: Startup,
}

/// An update row as returned with an embedded startup. The embed is null
/// when the reader may not see the startup.
#[derive(Deserialize)]
struct EmbeddedRow {
	#[serde(flatten)]
	update: Update,
	#[serde(default)]
	startup: Option<Startup>,
}

impl EmbeddedRow {
	fn into_full(self) -> Option<UpdateWithStartup> {
		Some(UpdateWithStartup {
			update: self.update,
			startup: self.startup?,
		})
	}
}

/// The columns the update editor writes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateChanges {
	pub title: Option<String>,
	pub content_md: String,
	pub is_published: bool,
}

impl Update {
	/// The newest published updates across all public startups.
	pub async fn published_feed(backend: &dyn Backend, limit: usize) -> Result<Vec<UpdateWithStartup>, BackendError> {
		let query = Query::new(Table::Updates)
			.eq("is_published", true)
			.order_desc("published_at")
			.limit(limit)
			.with_startup();

		let rows: Vec<EmbeddedRow> = decode_rows(backend.select(None, &query).await?)?;
		Ok(rows.into_iter().filter_map(EmbeddedRow::into_full).collect())
	}

	pub async fn published_for_startup(
		backend: &dyn Backend,
		startup_id: Uuid,
		limit: usize,
	) -> Result<Vec<Self>, BackendError> {
		let query = Query::new(Table::Updates)
			.eq("startup_id", startup_id)
			.eq("is_published", true)
			.order_desc("published_at")
			.limit(limit);

		decode_rows(backend.select(None, &query).await?)
	}

	/// Every update of the owner, drafts included, newest first.
	pub async fn for_owner(
		backend: &dyn Backend,
		token: &str,
		owner: Uuid,
		limit: Option<usize>,
	) -> Result<Vec<Self>, BackendError> {
		let mut query = Query::new(Table::Updates).eq("startup_id", owner).order_desc("created_at");
		if let Some(limit) = limit {
			query = query.limit(limit);
		}

		decode_rows(backend.select(Some(token), &query).await?)
	}

	pub async fn by_id(backend: &dyn Backend, token: Option<&str>, id: Uuid) -> Result<Option<Self>, BackendError> {
		let query = Query::new(Table::Updates).eq("id", id).limit(1);
		decode_first(backend.select(token, &query).await?)
	}

	pub async fn with_startup_by_id(
		backend: &dyn Backend,
		token: Option<&str>,
		id: Uuid,
	) -> Result<Option<UpdateWithStartup>, BackendError> {
		let query = Query::new(Table::Updates).eq("id", id).limit(1).with_startup();
		let row: Option<EmbeddedRow> = decode_first(backend.select(token, &query).await?)?;
		Ok(row.and_then(EmbeddedRow::into_full))
	}

	pub async fn create(
		backend: &dyn Backend,
		token: &str,
		startup_id: Uuid,
		changes: &UpdateChanges,
	) -> Result<Self, BackendError> {
		let row = json!({
			"startup_id": startup_id,
			"title": changes.title,
			"content_md": changes.content_md,
			"images": [],
			"is_published": changes.is_published,
		});

		let row = backend.insert(token, Table::Updates, row).await?;
		Ok(serde_json::from_value(row)?)
	}

	pub async fn edit(
		backend: &dyn Backend,
		token: &str,
		owner: Uuid,
		id: Uuid,
		changes: &UpdateChanges,
	) -> Result<Option<Self>, BackendError> {
		Self::patch(backend, token, owner, id, serde_json::to_value(changes)?).await
	}

	pub async fn set_images(
		backend: &dyn Backend,
		token: &str,
		owner: Uuid,
		id: Uuid,
		images: &[UpdateImage],
	) -> Result<Option<Self>, BackendError> {
		Self::patch(backend, token, owner, id, json!({ "images": images })).await
	}

	/// Returns whether a row was removed.
	pub async fn delete(backend: &dyn Backend, token: &str, owner: Uuid, id: Uuid) -> Result<bool, BackendError> {
		let count = backend.delete(token, Table::Updates, &Self::owned(owner, id)).await?;
		Ok(count > 0)
	}

	async fn patch(
		backend: &dyn Backend,
		token: &str,
		owner: Uuid,
		id: Uuid,
		patch: serde_json::Value,
	) -> Result<Option<Self>, BackendError> {
		let rows = backend
			.update(token, Table::Updates, &Self::owned(owner, id), patch)
			.await?;
		decode_first(rows)
	}

	fn owned(owner: Uuid, id: Uuid) -> [Filter; 2] {
		[Filter::eq("id", id), Filter::eq("startup_id", owner)]
	}
}
