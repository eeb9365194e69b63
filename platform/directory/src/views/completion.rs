use serde::Serialize;

use crate::database::Startup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionTier {
	High,
	Medium,
	Low,
}

impl CompletionTier {
	pub fn for_percentage(percentage: u8) -> Self {
		if percentage >= 80 {
			Self::High
		} else if percentage >= 50 {
			Self::Medium
		} else {
			Self::Low
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionField {
	pub name: &'static str,
	pub filled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileCompletion {
	pub fields: Vec<CompletionField>,
	pub filled: usize,
	pub total: usize,
	pub percentage: u8,
	pub tier: CompletionTier,
	/// Nudges for the fields that matter most on the feed
	pub hints: Vec<&'static str>,
	pub summary: String,
}

fn present(value: &Option<String>) -> bool {
	value.as_deref().is_some_and(|v| !v.is_empty())
}

impl ProfileCompletion {
	pub fn of(startup: &Startup) -> Self {
		let fields = vec![
			CompletionField {
				name: "Logo",
				filled: present(&startup.logo_url),
			},
			CompletionField {
				name: "Tagline",
				filled: present(&startup.tagline),
			},
			CompletionField {
				name: "Description",
				filled: present(&startup.description_md),
			},
			CompletionField {
				name: "Website",
				filled: present(&startup.website_url),
			},
			CompletionField {
				name: "Location",
				filled: present(&startup.location),
			},
			CompletionField {
				name: "Sectors",
				filled: !startup.sectors().is_empty(),
			},
			CompletionField {
				name: "Email",
				filled: present(&startup.email),
			},
			CompletionField {
				name: "Twitter",
				filled: present(&startup.twitter_url),
			},
			CompletionField {
				name: "LinkedIn",
				filled: present(&startup.linkedin_url),
			},
		];

		let total = fields.len();
		let filled = fields.iter().filter(|f| f.filled).count();
		let percentage = (filled as f64 / total as f64 * 100.0).round() as u8;

		let mut hints = Vec::new();
		if !present(&startup.logo_url) {
			hints.push("Add a logo so your updates stand out in the feed");
		}
		if !present(&startup.tagline) {
			hints.push("Add a tagline that explains what you do in one line");
		}
		if startup.sectors().is_empty() {
			hints.push("Add sectors so people can find similar startups");
		}

		Self {
			summary: format!("{filled} of {total} fields completed"),
			fields,
			filled,
			total,
			percentage,
			tier: CompletionTier::for_percentage(percentage),
			hints,
		}
	}
}
