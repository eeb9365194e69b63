use bytes::Bytes;
use common::http::RouteError;
use common::make_response;
use hyper::StatusCode;
use serde_json::json;

use super::auth::AuthError;
use crate::backend::BackendError;
use crate::validation::ValidationErrors;

pub type Result<T, E = RouteError<ApiError>> = std::result::Result<T, E>;

pub const STORAGE_NOT_CONFIGURED: &str =
	"Storage not configured. Please set up storage buckets in your Supabase project.";
pub const NETWORK_ERROR: &str = "Network error. Please check your connection and try again.";
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
	#[error("backend: {0}")]
	Backend(#[from] BackendError),
	#[error("validation failed: {0}")]
	Validation(#[from] ValidationErrors),
	#[error("failed to parse json body: {0}")]
	ParseJson(#[from] serde_json::Error),
	#[error("failed to parse multipart body: {0}")]
	Multipart(#[from] multer::Error),
	#[error("auth: {0}")]
	Auth(#[from] AuthError),
}

impl From<ValidationErrors> for RouteError<ApiError> {
	#[track_caller]
	fn from(errors: ValidationErrors) -> Self {
		let res: hyper::Response<Bytes> = make_response!(
			StatusCode::UNPROCESSABLE_ENTITY,
			json!({
				"success": false,
				"message": errors.first().unwrap_or("invalid input"),
				"errors": errors.by_field(),
			})
		);

		RouteError::from(res).with_source(Some(ApiError::Validation(errors)))
	}
}

impl From<BackendError> for RouteError<ApiError> {
	#[track_caller]
	fn from(err: BackendError) -> Self {
		let route = match &err {
			BackendError::NotConfigured => RouteError::from((StatusCode::SERVICE_UNAVAILABLE, "Backend not configured")),
			BackendError::Unauthorized(_) => RouteError::from((StatusCode::UNAUTHORIZED, "unauthorized")),
			BackendError::NotFound => RouteError::from((StatusCode::NOT_FOUND, "not found")),
			BackendError::Conflict(message) => RouteError::from((StatusCode::CONFLICT, message.as_str())),
			BackendError::BucketNotFound(_) => RouteError::from((StatusCode::SERVICE_UNAVAILABLE, STORAGE_NOT_CONFIGURED)),
			BackendError::Rejected { status, message } if status.is_client_error() => {
				RouteError::from((*status, message.as_str()))
			}
			BackendError::Rejected { .. } | BackendError::Decode(_) => {
				RouteError::from((StatusCode::BAD_GATEWAY, UNEXPECTED_ERROR))
			}
			BackendError::Transport(_) => RouteError::from((StatusCode::BAD_GATEWAY, NETWORK_ERROR)),
		};

		route.with_source(Some(ApiError::Backend(err)))
	}
}
