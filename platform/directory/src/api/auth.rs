use std::sync::Arc;

use common::http::RouteError;
use hyper::StatusCode;
use uuid::Uuid;

use super::error::ApiError;
use super::jwt::AccessClaims;
use crate::backend::BackendError;
use crate::config::BackendConfig;
use crate::global::DirectoryGlobal;

#[derive(thiserror::Error, Debug, Clone)]
pub enum AuthError {
	#[error("token must be ascii only")]
	HeaderToStr,
	#[error("token must be a bearer token")]
	NotBearerToken,
	#[error("not logged in")]
	NotLoggedIn,
	#[error("invalid token")]
	InvalidToken,
	#[error("backend not configured")]
	BackendUnavailable,
	#[error("failed to fetch user: {0}")]
	FetchUser(String),
}

impl From<AuthError> for RouteError<ApiError> {
	#[track_caller]
	fn from(value: AuthError) -> Self {
		RouteError::from(match &value {
			AuthError::HeaderToStr => (StatusCode::UNAUTHORIZED, "token must be ascii only"),
			AuthError::NotBearerToken => (StatusCode::UNAUTHORIZED, "token must be a bearer token"),
			AuthError::NotLoggedIn => (StatusCode::UNAUTHORIZED, "not logged in"),
			AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid token"),
			AuthError::BackendUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "Backend not configured"),
			AuthError::FetchUser(_) => (StatusCode::BAD_GATEWAY, "failed to fetch user"),
		})
		.with_source(Some(ApiError::Auth(value)))
	}
}

/// Where the access token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
	Header,
	Cookie,
}

#[derive(Debug, Clone)]
pub struct AuthData {
	pub user_id: Uuid,
	pub email: Option<String>,
	pub access_token: String,
	pub source: TokenSource,
}

impl AuthData {
	/// Resolves an access token. With a JWT secret configured the token is
	/// checked locally, otherwise the backend is asked who it belongs to.
	pub async fn from_token<G: DirectoryGlobal>(
		global: &Arc<G>,
		token: &str,
		source: TokenSource,
	) -> Result<Self, AuthError> {
		let config = global.config::<BackendConfig>();

		if let Some(secret) = config.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
			let claims = AccessClaims::verify(secret, token).ok_or(AuthError::InvalidToken)?;
			return Ok(Self {
				user_id: claims.user_id,
				email: claims.email,
				access_token: token.to_owned(),
				source,
			});
		}

		let backend = global.backend().ok_or(AuthError::BackendUnavailable)?;
		let user = backend.get_user(token).await.map_err(|err| match err {
			BackendError::Unauthorized(_) | BackendError::NotFound => AuthError::InvalidToken,
			BackendError::Rejected { status, .. } if status.is_client_error() => AuthError::InvalidToken,
			err => AuthError::FetchUser(err.to_string()),
		})?;

		Ok(Self {
			user_id: user.id,
			email: Some(user.email),
			access_token: token.to_owned(),
			source,
		})
	}
}
