use std::sync::Arc;

use common::http::router::ext::RequestExt;
use common::http::router::middleware::{middleware_fn, Middleware, NextFn};
use common::http::RouteError;
use common::make_response;
use hyper::body::Incoming;
use hyper::{header, StatusCode};
use serde_json::json;

use crate::api::auth::{AuthData, AuthError, TokenSource};
use crate::api::error::ApiError;
use crate::api::request_context::RequestContext;
use crate::api::{global, request_context, Body};
use crate::global::DirectoryGlobal;

pub const SESSION_COOKIE: &str = "directory_session";
pub const REFRESH_COOKIE: &str = "directory_refresh";

/// Attaches a [`RequestContext`] to every request and fills in the session
/// when one is presented.
///
/// A malformed or rejected `Authorization` header fails the request. A stale
/// session cookie is ignored and the request continues anonymously.
pub fn auth_middleware<G: DirectoryGlobal>(_: &Arc<G>) -> impl Middleware<Incoming, Body, RouteError<ApiError>> {
	middleware_fn(|mut req: hyper::Request<Incoming>, next: NextFn<Incoming, Body, RouteError<ApiError>>| async move {
		let context = RequestContext::default();
		req.provide(context.clone());

		let presented = match req.headers().get(header::AUTHORIZATION) {
			Some(value) => {
				let token = value
					.to_str()
					.map_err(|_| AuthError::HeaderToStr)?
					.strip_prefix("Bearer ")
					.ok_or(AuthError::NotBearerToken)?;

				Some((token.trim().to_owned(), TokenSource::Header))
			}
			None => req
				.cookie(SESSION_COOKIE)
				.filter(|t| !t.is_empty())
				.map(|t| (t.to_owned(), TokenSource::Cookie)),
		};

		if let Some((token, source)) = presented {
			let global = global::<G, _>(&req)?;

			match AuthData::from_token(&global, &token, source).await {
				Ok(data) => context.set_auth(data).await,
				Err(err) if source == TokenSource::Header => return Err(err.into()),
				Err(err) => tracing::debug!(error = %err, "ignoring session cookie"),
			}
		}

		next(req).await
	})
}

/// Sends visitors without a session to the sign in page.
pub fn dashboard_guard<G: DirectoryGlobal>(_: &Arc<G>) -> impl Middleware<Incoming, Body, RouteError<ApiError>> {
	middleware_fn(|req: hyper::Request<Incoming>, next: NextFn<Incoming, Body, RouteError<ApiError>>| async move {
		let authed = request_context(&req).auth().await.is_some();

		if authed {
			return next(req).await;
		}

		let target = req
			.uri()
			.path_and_query()
			.map(|pq| pq.as_str())
			.unwrap_or_else(|| req.uri().path());
		let location = format!(
			"/auth/signin?next={}",
			url::form_urlencoded::byte_serialize(target.as_bytes()).collect::<String>()
		);

		Ok(make_response!(
			StatusCode::SEE_OTHER,
			json!({
				"success": false,
				"message": "not logged in",
				"redirect": location,
			}),
			header::LOCATION => location.as_str(),
		))
	})
}
