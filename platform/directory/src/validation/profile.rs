use serde::{Deserialize, Serialize};

use super::{check_len, is_email, is_url, optional, ValidationErrors};
use crate::database::{ProfileChanges, Stage, Startup};

pub const MAX_SECTORS: usize = 10;

/// Sectors arrive either as a list or as one comma separated string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectorsInput {
	List(Vec<String>),
	Text(String),
}

impl Default for SectorsInput {
	fn default() -> Self {
		Self::List(Vec::new())
	}
}

impl SectorsInput {
	/// Trimmed entries with blanks and repeats dropped, in input order.
	pub fn normalize(self) -> Vec<String> {
		let raw = match self {
			Self::List(list) => list,
			Self::Text(text) => text.split(',').map(str::to_owned).collect(),
		};

		let mut sectors: Vec<String> = Vec::with_capacity(raw.len());
		for sector in raw {
			let sector = sector.trim();
			if !sector.is_empty() && !sectors.iter().any(|s| s == sector) {
				sectors.push(sector.to_owned());
			}
		}

		sectors
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
	pub name: String,
	pub slug: String,
	pub tagline: Option<String>,
	pub description_md: Option<String>,
	pub website_url: Option<String>,
	pub location: Option<String>,
	pub sectors: Option<SectorsInput>,
	pub stage: Option<String>,
	pub is_public: Option<bool>,
	pub email: Option<String>,
	pub twitter_url: Option<String>,
	pub linkedin_url: Option<String>,
}

impl ProfileForm {
	/// The form prefilled from a stored profile.
	pub fn from_startup(startup: &Startup) -> Self {
		Self {
			name: startup.name.clone(),
			slug: startup.slug.clone(),
			tagline: startup.tagline.clone(),
			description_md: startup.description_md.clone(),
			website_url: startup.website_url.clone(),
			location: startup.location.clone(),
			sectors: Some(SectorsInput::List(startup.sectors().to_vec())),
			stage: Some(startup.stage.to_string()),
			is_public: Some(startup.is_public),
			email: startup.email.clone(),
			twitter_url: startup.twitter_url.clone(),
			linkedin_url: startup.linkedin_url.clone(),
		}
	}

	pub fn validate(self) -> Result<ProfileChanges, ValidationErrors> {
		let mut errors = ValidationErrors::new();

		let name = self.name.trim().to_owned();
		check_len(
			&mut errors,
			"name",
			&name,
			Some((2, "Name must be at least 2 characters")),
			Some((60, "Name must be less than 60 characters")),
		);

		let slug = self.slug.trim().to_owned();
		check_len(
			&mut errors,
			"slug",
			&slug,
			Some((2, "Slug must be at least 2 characters")),
			Some((60, "Slug must be less than 60 characters")),
		);
		if slug.is_empty() || !slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
			errors.push("slug", "Slug can only contain lowercase letters, numbers, and hyphens");
		}

		let tagline = optional(self.tagline);
		if let Some(tagline) = &tagline {
			check_len(
				&mut errors,
				"tagline",
				tagline,
				None,
				Some((120, "Tagline must be less than 120 characters")),
			);
		}

		let description_md = optional(self.description_md);
		if let Some(description) = &description_md {
			check_len(
				&mut errors,
				"description_md",
				description,
				None,
				Some((2000, "Description must be less than 2000 characters")),
			);
		}

		let website_url = optional(self.website_url);
		check_url(&mut errors, "website_url", website_url.as_deref());

		let location = optional(self.location);
		if let Some(location) = &location {
			check_len(
				&mut errors,
				"location",
				location,
				None,
				Some((100, "Location must be less than 100 characters")),
			);
		}

		let sectors = self.sectors.unwrap_or_default().normalize();
		if sectors.len() > MAX_SECTORS {
			errors.push("sectors", "Maximum 10 sectors allowed");
		}

		let stage = match optional(self.stage) {
			Some(stage) => stage.parse::<Stage>().unwrap_or_else(|err| {
				errors.push("stage", err.to_string());
				Stage::default()
			}),
			None => Stage::default(),
		};

		let email = optional(self.email);
		if let Some(email) = &email {
			if !is_email(email) {
				errors.push("email", "Must be a valid email address");
			}
		}

		let twitter_url = optional(self.twitter_url);
		check_url(&mut errors, "twitter_url", twitter_url.as_deref());

		let linkedin_url = optional(self.linkedin_url);
		check_url(&mut errors, "linkedin_url", linkedin_url.as_deref());

		errors.into_result(ProfileChanges {
			name,
			slug,
			tagline,
			description_md,
			website_url,
			location,
			sectors,
			stage,
			is_public: self.is_public,
			email,
			twitter_url,
			linkedin_url,
		})
	}
}

fn check_url(errors: &mut ValidationErrors, field: &'static str, value: Option<&str>) {
	if let Some(value) = value {
		if !is_url(value) {
			errors.push(field, "Must be a valid URL");
		}
	}
}
