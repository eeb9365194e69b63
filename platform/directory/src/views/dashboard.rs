use serde::Serialize;

use super::{preview, profile_url, short_date, ProfileCompletion};
use crate::database::{Startup, Update};

pub const RECENT_PREVIEW_CHARS: usize = 150;
pub const LIST_PREVIEW_CHARS: usize = 300;
pub const MISSING_STARTUP_MESSAGE: &str = "Something went wrong loading your startup profile.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentUpdate {
	pub id: String,
	pub title: Option<String>,
	pub preview: String,
	pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewView {
	pub welcome: String,
	pub name: String,
	pub profile_url: String,
	pub completion: ProfileCompletion,
	pub published_count: usize,
	pub recent_updates: Vec<RecentUpdate>,
}

impl OverviewView {
	/// `updates` are the owner's updates newest first. Only the first
	/// `recent_limit` are listed.
	pub fn new(startup: &Startup, updates: &[Update], recent_limit: usize) -> Self {
		Self {
			welcome: format!("Welcome back, {}!", startup.name),
			name: startup.name.clone(),
			profile_url: profile_url(&startup.slug),
			completion: ProfileCompletion::of(startup),
			published_count: updates.iter().filter(|u| u.is_published).count(),
			recent_updates: updates
				.iter()
				.take(recent_limit)
				.map(|update| RecentUpdate {
					id: update.id.to_string(),
					title: update.title.clone(),
					preview: preview(&update.content_md, RECENT_PREVIEW_CHARS),
					date: short_date(&update.created_at),
				})
				.collect(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateListItem {
	pub id: String,
	pub title: Option<String>,
	pub status: &'static str,
	pub is_published: bool,
	pub date: String,
	pub preview: String,
	pub image_count: usize,
}

impl From<&Update> for UpdateListItem {
	fn from(update: &Update) -> Self {
		Self {
			id: update.id.to_string(),
			title: update.title.clone(),
			status: if update.is_published { "Published" } else { "Draft" },
			is_published: update.is_published,
			date: short_date(&update.created_at),
			preview: preview(&update.content_md, LIST_PREVIEW_CHARS),
			image_count: update.images.len(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatesListView {
	pub updates: Vec<UpdateListItem>,
	pub message: Option<&'static str>,
}

impl UpdatesListView {
	pub fn new(updates: &[Update]) -> Self {
		Self {
			message: updates
				.is_empty()
				.then_some("No updates yet. Share your first update to let people know what you're working on."),
			updates: updates.iter().map(UpdateListItem::from).collect(),
		}
	}
}
