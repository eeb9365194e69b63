//! Form validation.
//!
//! Each form deserializes leniently and then checks every field, collecting
//! one message per failed rule in field order.

use std::collections::BTreeMap;
use std::fmt;

mod auth;
mod profile;
mod update;
mod upload;

pub use auth::*;
pub use profile::*;
pub use update::*;
pub use upload::*;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<(&'static str, String)>);

impl ValidationErrors {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn single(field: &'static str, message: impl Into<String>) -> Self {
		let mut errors = Self::new();
		errors.push(field, message);
		errors
	}

	pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
		self.0.push((field, message.into()));
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// The message shown above the form.
	pub fn first(&self) -> Option<&str> {
		self.0.first().map(|(_, message)| message.as_str())
	}

	/// The first message of every failing field.
	pub fn by_field(&self) -> BTreeMap<&'static str, &str> {
		let mut fields = BTreeMap::new();
		for (field, message) in &self.0 {
			fields.entry(*field).or_insert(message.as_str());
		}
		fields
	}

	fn into_result<T>(self, value: T) -> Result<T, Self> {
		if self.is_empty() {
			Ok(value)
		} else {
			Err(self)
		}
	}
}

impl fmt::Display for ValidationErrors {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.first().unwrap_or("invalid input"))
	}
}

impl std::error::Error for ValidationErrors {}

/// Length in Unicode scalar values.
pub fn char_len(value: &str) -> usize {
	value.chars().count()
}

/// Blank optional inputs are stored as absent.
fn optional(value: Option<String>) -> Option<String> {
	value
		.map(|v| v.trim().to_owned())
		.filter(|v| !v.is_empty())
}

fn check_len(
	errors: &mut ValidationErrors,
	field: &'static str,
	value: &str,
	min: Option<(usize, &str)>,
	max: Option<(usize, &str)>,
) {
	let len = char_len(value);
	if let Some((min, message)) = min {
		if len < min {
			errors.push(field, message);
		}
	}

	if let Some((max, message)) = max {
		if len > max {
			errors.push(field, message);
		}
	}
}

fn is_url(value: &str) -> bool {
	url::Url::parse(value).is_ok()
}

fn is_email(value: &str) -> bool {
	email_address::EmailAddress::is_valid(value)
}
