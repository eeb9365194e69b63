use serde::Serialize;

use super::{long_date, paragraphs, render_markdown, StartupSummary};
use crate::database::{Startup, Update, UpdateImage};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileLink {
	pub label: &'static str,
	pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileUpdate {
	pub id: String,
	pub title: Option<String>,
	pub html: String,
	pub date: String,
	pub images: Vec<UpdateImage>,
}

impl From<&Update> for ProfileUpdate {
	fn from(update: &Update) -> Self {
		Self {
			id: update.id.to_string(),
			title: update.title.clone(),
			html: render_markdown(&update.content_md),
			date: long_date(&update.published_at),
			images: update.images.clone(),
		}
	}
}

/// A public profile page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
	pub startup: StartupSummary,
	pub tagline: Option<String>,
	pub location: Option<String>,
	pub description: Vec<String>,
	pub links: Vec<ProfileLink>,
	pub updates: Vec<ProfileUpdate>,
}

impl ProfileView {
	pub fn new(startup: &Startup, updates: &[Update]) -> Self {
		let links = [
			("Website", &startup.website_url),
			("Twitter", &startup.twitter_url),
			("LinkedIn", &startup.linkedin_url),
		]
		.into_iter()
		.filter_map(|(label, url)| {
			url.as_ref().filter(|u| !u.is_empty()).map(|url| ProfileLink {
				label,
				url: url.clone(),
			})
		})
		.collect();

		Self {
			startup: StartupSummary::from(startup),
			tagline: startup.tagline.clone(),
			location: startup.location.clone(),
			description: startup.description_md.as_deref().map(paragraphs).unwrap_or_default(),
			links,
			updates: updates.iter().map(ProfileUpdate::from).collect(),
		}
	}
}
