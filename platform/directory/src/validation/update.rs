use serde::{Deserialize, Serialize};

use super::{check_len, optional, ValidationErrors};
use crate::database::{Update, UpdateChanges};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateForm {
	pub title: Option<String>,
	pub content_md: String,
	pub is_published: Option<bool>,
}

impl UpdateForm {
	pub fn from_update(update: &Update) -> Self {
		Self {
			title: update.title.clone(),
			content_md: update.content_md.clone(),
			is_published: Some(update.is_published),
		}
	}

	pub fn validate(self) -> Result<UpdateChanges, ValidationErrors> {
		let mut errors = ValidationErrors::new();

		let title = optional(self.title);
		if let Some(title) = &title {
			check_len(
				&mut errors,
				"title",
				title,
				None,
				Some((80, "Title must be less than 80 characters")),
			);
		}

		check_len(
			&mut errors,
			"content_md",
			&self.content_md,
			Some((50, "Content must be at least 50 characters")),
			Some((2000, "Content must be less than 2000 characters")),
		);

		errors.into_result(UpdateChanges {
			title,
			content_md: self.content_md,
			is_published: self.is_published.unwrap_or(true),
		})
	}
}
