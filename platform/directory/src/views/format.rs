use chrono::{DateTime, Utc};

/// The first `limit` characters, with `...` appended when cut.
pub fn preview(text: &str, limit: usize) -> String {
	match text.char_indices().nth(limit) {
		Some((idx, _)) => format!("{}...", &text[..idx]),
		None => text.to_owned(),
	}
}

/// `Jan 5, 2025`
pub fn short_date(date: &DateTime<Utc>) -> String {
	date.format("%b %-d, %Y").to_string()
}

/// `January 5, 2025`
pub fn long_date(date: &DateTime<Utc>) -> String {
	date.format("%B %-d, %Y").to_string()
}

/// The avatar fallback, the first two characters upper-cased.
pub fn initials(name: &str) -> String {
	name.chars().take(2).flat_map(char::to_uppercase).collect()
}

/// `1 image`, `3 images`, nothing without images.
pub fn image_count_label(count: usize) -> Option<String> {
	match count {
		0 => None,
		1 => Some("1 image".to_owned()),
		n => Some(format!("{n} images")),
	}
}

/// Non-blank lines of a description, one paragraph each.
pub fn paragraphs(text: &str) -> Vec<String> {
	text.lines()
		.map(str::trim_end)
		.filter(|line| !line.trim().is_empty())
		.map(str::to_owned)
		.collect()
}
