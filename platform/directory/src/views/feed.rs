use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{image_count_label, preview, short_date, StartupSummary};
use crate::database::UpdateWithStartup;

pub const FEED_PREVIEW_CHARS: usize = 200;
pub const EMPTY_FEED_MESSAGE: &str = "No updates yet. Be the first startup to share your progress!";
pub const SETUP_REQUIRED_MESSAGE: &str =
	"The directory is running! Now configure the backend service to enable the full functionality.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedCard {
	pub id: String,
	pub title: Option<String>,
	pub preview: String,
	pub published_at: DateTime<Utc>,
	pub date: String,
	pub image_count: usize,
	pub image_label: Option<String>,
	pub startup: StartupSummary,
	pub detail_url: String,
}

impl From<&UpdateWithStartup> for FeedCard {
	fn from(item: &UpdateWithStartup) -> Self {
		let update = &item.update;
		Self {
			id: update.id.to_string(),
			title: update.title.clone(),
			preview: preview(&update.content_md, FEED_PREVIEW_CHARS),
			published_at: update.published_at,
			date: short_date(&update.published_at),
			image_count: update.images.len(),
			image_label: image_count_label(update.images.len()),
			startup: StartupSummary::from(&item.startup),
			detail_url: format!("/updates/{}", update.id),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedView {
	pub setup_required: bool,
	pub message: Option<&'static str>,
	pub updates: Vec<FeedCard>,
}

impl FeedView {
	pub fn setup_required() -> Self {
		Self {
			setup_required: true,
			message: Some(SETUP_REQUIRED_MESSAGE),
			updates: Vec::new(),
		}
	}

	pub fn from_updates(updates: &[UpdateWithStartup]) -> Self {
		Self {
			setup_required: false,
			message: updates.is_empty().then_some(EMPTY_FEED_MESSAGE),
			updates: updates.iter().map(FeedCard::from).collect(),
		}
	}
}
