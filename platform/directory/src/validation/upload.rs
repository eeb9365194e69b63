use file_format::FileFormat;
use serde::Deserialize;

use super::{check_len, ValidationErrors};

/// Checks an uploaded image. The declared content type and the sniffed
/// format must both be images.
pub fn validate_image(content_type: &str, bytes: &[u8], max_size: usize) -> Result<(), ValidationErrors> {
	if !content_type.starts_with("image/") || !FileFormat::from_bytes(bytes).media_type().starts_with("image/") {
		return Err(ValidationErrors::single("file", "Please select an image file"));
	}

	if bytes.len() > max_size {
		return Err(ValidationErrors::single(
			"file",
			format!("File size must be less than {}MB", max_size / (1024 * 1024)),
		));
	}

	Ok(())
}

/// The metadata part sent with an update image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImageMetadata {
	pub alt: String,
	pub width: u32,
	pub height: u32,
}

impl ImageMetadata {
	pub fn validate(mut self) -> Result<Self, ValidationErrors> {
		self.alt = self.alt.trim().to_owned();

		let mut errors = ValidationErrors::new();
		check_len(
			&mut errors,
			"alt",
			&self.alt,
			None,
			Some((200, "Alt text must be less than 200 characters")),
		);

		if self.width == 0 {
			errors.push("width", "Width must be greater than 0");
		}

		if self.height == 0 {
			errors.push("height", "Height must be greater than 0");
		}

		errors.into_result(self)
	}
}
