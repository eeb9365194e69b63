use hyper::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
	#[error("backend is not configured")]
	NotConfigured,
	#[error("unauthorized: {0}")]
	Unauthorized(String),
	#[error("not found")]
	NotFound,
	#[error("conflict: {0}")]
	Conflict(String),
	#[error("storage bucket not found: {0}")]
	BucketNotFound(String),
	#[error("backend rejected the request ({status}): {message}")]
	Rejected { status: StatusCode, message: String },
	#[error("transport error: {0}")]
	Transport(String),
	#[error("failed to decode backend response: {0}")]
	Decode(String),
}

impl BackendError {
	/// The message the backend attached to a rejection, suitable for showing
	/// to the user.
	pub fn backend_message(&self) -> Option<&str> {
		match self {
			Self::Rejected { message, .. } | Self::Unauthorized(message) | Self::Conflict(message) => Some(message),
			_ => None,
		}
	}
}

impl From<reqwest::Error> for BackendError {
	fn from(err: reqwest::Error) -> Self {
		if err.is_decode() {
			Self::Decode(err.to_string())
		} else {
			Self::Transport(err.to_string())
		}
	}
}

impl From<serde_json::Error> for BackendError {
	fn from(err: serde_json::Error) -> Self {
		Self::Decode(err.to_string())
	}
}
