use bytes::Bytes;
use chrono::Utc;
use common::http::ext::{OptionExt, ResultExt};
use common::http::router::compat::BodyExt;
use common::http::RouteError;
use file_format::FileFormat;
use hyper::body::Incoming;
use hyper::{Request, StatusCode};
use multer::{Constraints, SizeLimit};
use rand::distributions::Alphanumeric;
use rand::Rng;

use super::error::{ApiError, Result};
use crate::validation::{validate_image, ValidationErrors};

/// Metadata parts are small JSON documents.
const MAX_METADATA_SIZE: u64 = 30 * 1024;

/// A validated image from a multipart body with a `file` part and an
/// optional `metadata` part.
#[derive(Debug)]
pub struct ImageUpload {
	pub file: Bytes,
	pub content_type: String,
	pub extension: String,
	pub metadata: Option<Bytes>,
}

pub async fn read_image(req: Request<Incoming>, max_size: usize) -> Result<ImageUpload> {
	let content_type = req
		.headers()
		.get("content-type")
		.map_err_route((StatusCode::BAD_REQUEST, "missing content-type header"))?;
	let content_type = content_type
		.to_str()
		.map_ignore_err_route((StatusCode::BAD_REQUEST, "invalid content-type header"))?;

	let boundary = multer::parse_boundary(content_type)
		.map_ignore_err_route((StatusCode::BAD_REQUEST, "invalid content-type header"))?;

	let constraints = Constraints::new().allowed_fields(vec!["metadata", "file"]).size_limit(
		SizeLimit::new()
			.for_field("metadata", MAX_METADATA_SIZE)
			.for_field("file", max_size as u64),
	);

	let mut multipart = multer::Multipart::with_constraints(req.into_body().into_stream(), boundary, constraints);

	let mut metadata = None;
	let mut file = None;
	let mut file_content_type = None;

	while let Some(field) = multipart.next_field().await.map_err(|err| multipart_error(err, max_size))? {
		let name = field
			.name()
			.map(str::to_owned)
			.map_err_route((StatusCode::BAD_REQUEST, "invalid multipart body"))?;

		match name.as_str() {
			"metadata" => {
				let data = field.bytes().await.map_err(|err| multipart_error(err, max_size))?;
				metadata = Some(data);
			}
			"file" => {
				let content_type = field
					.content_type()
					.map(|mime| mime.essence_str().to_owned())
					.unwrap_or_default();

				let data = field.bytes().await.map_err(|err| multipart_error(err, max_size))?;
				file_content_type = Some(content_type);
				file = Some(data);
			}
			_ => return Err((StatusCode::BAD_REQUEST, "invalid multipart body").into()),
		}
	}

	let file = file.map_err_route((StatusCode::BAD_REQUEST, "missing file field"))?;
	let content_type = file_content_type.unwrap_or_default();

	validate_image(&content_type, &file, max_size)?;

	let extension = FileFormat::from_bytes(&file).extension().to_owned();

	Ok(ImageUpload {
		file,
		content_type,
		extension,
		metadata,
	})
}

fn multipart_error(err: multer::Error, max_size: usize) -> RouteError<ApiError> {
	match err {
		multer::Error::FieldSizeExceeded { field_name, .. } if field_name.as_deref() == Some("metadata") => {
			ValidationErrors::single(
				"metadata",
				format!("Metadata must be less than {}KB", MAX_METADATA_SIZE / 1024),
			)
			.into()
		}
		multer::Error::FieldSizeExceeded { .. } | multer::Error::StreamSizeExceeded { .. } => {
			ValidationErrors::single(
				"file",
				format!("File size must be less than {}MB", max_size / (1024 * 1024)),
			)
			.into()
		}
		err => RouteError::from((StatusCode::BAD_REQUEST, "invalid multipart body", err)),
	}
}

/// A fresh object name under `dir`, never reused so uploads don't collide.
pub fn object_name(dir: &str, extension: &str) -> String {
	let suffix: String = rand::thread_rng()
		.sample_iter(&Alphanumeric)
		.take(10)
		.map(char::from)
		.collect::<String>()
		.to_lowercase();

	format!("{dir}/{}-{suffix}.{extension}", Utc::now().timestamp_millis())
}
