use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How far along a startup is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
	#[default]
	Idea,
	PreSeed,
	Seed,
	SeriesA,
	SeriesB,
	Growth,
	Public,
}

impl Stage {
	pub const ALL: [Stage; 7] = [
		Stage::Idea,
		Stage::PreSeed,
		Stage::Seed,
		Stage::SeriesA,
		Stage::SeriesB,
		Stage::Growth,
		Stage::Public,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Idea => "idea",
			Self::PreSeed => "pre-seed",
			Self::Seed => "seed",
			Self::SeriesA => "series-a",
			Self::SeriesB => "series-b",
			Self::Growth => "growth",
			Self::Public => "public",
		}
	}

	/// The badge text, `pre-seed` reads as `pre seed`.
	pub fn label(&self) -> String {
		self.as_str().replacen('-', " ", 1)
	}
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid enum value. Expected {expected}, received '{received}'")]
pub struct InvalidStage {
	expected: String,
	received: String,
}

impl FromStr for Stage {
	type Err = InvalidStage;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL.into_iter().find(|stage| stage.as_str() == s).ok_or_else(|| InvalidStage {
			expected: Self::ALL
				.iter()
				.map(|stage| format!("'{stage}'"))
				.collect::<Vec<_>>()
				.join(" | "),
			received: s.to_owned(),
		})
	}
}
