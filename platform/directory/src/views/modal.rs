use serde::Serialize;

use super::{render_markdown, short_date, StartupSummary};
use crate::database::{UpdateImage, UpdateWithStartup};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageView {
	pub url: String,
	pub alt: String,
	/// The author's alt text, shown under the image
	pub caption: Option<String>,
	/// CSS `aspect-ratio`, `w / h`
	pub aspect_ratio: String,
}

impl ImageView {
	pub fn new(index: usize, image: &UpdateImage) -> Self {
		let caption = (!image.alt.is_empty()).then(|| image.alt.clone());
		Self {
			url: image.url.clone(),
			alt: caption.clone().unwrap_or_else(|| format!("Update image {}", index + 1)),
			caption,
			aspect_ratio: format!("{} / {}", image.w, image.h),
		}
	}
}

/// A single update opened from the feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateDetailView {
	pub id: String,
	pub title: Option<String>,
	pub html: String,
	pub images: Vec<ImageView>,
	pub published_on: String,
	pub is_published: bool,
	pub startup: StartupSummary,
}

impl From<&UpdateWithStartup> for UpdateDetailView {
	fn from(item: &UpdateWithStartup) -> Self {
		let update = &item.update;
		Self {
			id: update.id.to_string(),
			title: update.title.clone(),
			html: render_markdown(&update.content_md),
			images: update
				.images
				.iter()
				.enumerate()
				.map(|(idx, image)| ImageView::new(idx, image))
				.collect(),
			published_on: short_date(&update.published_at),
			is_published: update.is_published,
			startup: StartupSummary::from(&item.startup),
		}
	}
}
