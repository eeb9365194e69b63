//! JSON views built from records. Everything here is pure.

mod completion;
mod dashboard;
mod feed;
mod format;
mod markdown;
mod modal;
mod profile;
mod verify;

pub use completion::*;
pub use dashboard::*;
pub use feed::*;
pub use format::*;
pub use markdown::render_markdown;
pub use modal::*;
pub use profile::*;
pub use verify::*;

use serde::Serialize;

use crate::database::{Stage, Startup};

/// The startup header shown on cards, the modal and the profile page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartupSummary {
	pub id: String,
	pub name: String,
	pub slug: String,
	pub logo_url: Option<String>,
	pub tagline: Option<String>,
	pub initials: String,
	pub stage: Stage,
	pub stage_label: String,
	pub sectors: Vec<String>,
	pub profile_url: String,
}

impl From<&Startup> for StartupSummary {
	fn from(startup: &Startup) -> Self {
		Self {
			id: startup.id.to_string(),
			name: startup.name.clone(),
			slug: startup.slug.clone(),
			logo_url: startup.logo_url.clone(),
			tagline: startup.tagline.clone(),
			initials: initials(&startup.name),
			stage: startup.stage,
			stage_label: startup.stage.label(),
			sectors: startup.sectors().to_vec(),
			profile_url: profile_url(&startup.slug),
		}
	}
}

pub fn profile_url(slug: &str) -> String {
	format!("/s/{slug}")
}
