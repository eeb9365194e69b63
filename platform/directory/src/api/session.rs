use std::sync::Arc;

use common::http::ext::OptionExt;
use common::http::router::builder::RouterBuilder;
use common::http::router::ext::RequestExt;
use common::http::router::Router;
use common::http::RouteError;
use common::make_response;
use hyper::body::Incoming;
use hyper::header::{self, HeaderValue};
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::error::{ApiError, Result};
use super::middleware::auth::{REFRESH_COOKIE, SESSION_COOKIE};
use super::{global, json_body, request_context, Body};
use crate::backend::{BackendError, Session};
use crate::config::ApiConfig;
use crate::global::DirectoryGlobal;
use crate::validation::{SignInForm, SignUpForm};
use crate::views::{CallbackParams, CallbackTarget, VerifyView};

/// Refresh tokens outlive the access token, the backend decides when they expire.
const REFRESH_COOKIE_MAX_AGE: i64 = 60 * 60 * 24 * 30;

pub fn routes<G: DirectoryGlobal>(_: &Arc<G>) -> RouterBuilder<Incoming, Body, RouteError<ApiError>> {
	Router::builder()
		.post("/signup", sign_up::<G>)
		.post("/signin", sign_in::<G>)
		.post("/signout", sign_out::<G>)
		.post("/refresh", refresh::<G>)
		.get("/session", session)
		.get("/callback", callback)
		.get("/verify", verify)
}

fn cookie(name: &str, value: &str, path: &str, max_age: i64, secure: bool) -> HeaderValue {
	let mut cookie = format!("{name}={value}; Path={path}; Max-Age={max_age}; HttpOnly; SameSite=Lax");
	if secure {
		cookie.push_str("; Secure");
	}

	HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

fn session_cookies(config: &ApiConfig, session: &Session) -> [HeaderValue; 2] {
	[
		cookie(
			SESSION_COOKIE,
			&session.access_token,
			"/",
			session.expires_in,
			config.secure_cookies,
		),
		cookie(
			REFRESH_COOKIE,
			&session.refresh_token,
			"/auth",
			REFRESH_COOKIE_MAX_AGE,
			config.secure_cookies,
		),
	]
}

fn cleared_cookies(config: &ApiConfig) -> [HeaderValue; 2] {
	[
		cookie(SESSION_COOKIE, "", "/", 0, config.secure_cookies),
		cookie(REFRESH_COOKIE, "", "/auth", 0, config.secure_cookies),
	]
}

fn session_response(config: &ApiConfig, session: &Session, mut body: serde_json::Value) -> Response<Body> {
	if let serde_json::Value::Object(map) = &mut body {
		map.insert(
			"session".to_owned(),
			json!({
				"access_token": session.access_token,
				"refresh_token": session.refresh_token,
				"expires_in": session.expires_in,
				"expires_at": session.expires_at,
			}),
		);
		map.insert(
			"user".to_owned(),
			json!({
				"id": session.user.id,
				"email": session.user.email,
				"name": session.user.display_name(),
			}),
		);
	}

	let [access, refresh] = session_cookies(config, session);
	make_response!(
		StatusCode::OK,
		body,
		header::SET_COOKIE => access,
		header::SET_COOKIE => refresh,
	)
}

async fn sign_up<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;
	let form = json_body::<SignUpForm>(req).await?.validate()?;

	let config = global.config::<ApiConfig>();
	let backend = global.require_backend()?;

	let redirect_to = form
		.redirect_to
		.clone()
		.unwrap_or_else(|| format!("{}/auth/callback", config.site_url.trim_end_matches('/')));

	let outcome = backend
		.sign_up(&form.email, &form.password, &form.name, Some(&redirect_to))
		.await?;

	tracing::info!(user_id = %outcome.user.id, "user signed up");

	match outcome.session {
		Some(session) => Ok(session_response(
			config,
			&session,
			json!({
				"success": true,
				"message": "Account created successfully!",
				"confirmation_required": false,
				"redirect": "/dashboard",
			}),
		)),
		None => Ok(make_response!(
			StatusCode::OK,
			json!({
				"success": true,
				"message": "Account created successfully!",
				"detail": format!(
					"We've sent a confirmation email to {}. Please check your inbox and click the confirmation link to activate your account.",
					form.email
				),
				"email": form.email,
				"confirmation_required": true,
			})
		)),
	}
}

async fn sign_in<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;
	let form = json_body::<SignInForm>(req).await?.validate()?;

	let backend = global.require_backend()?;
	let session = backend.sign_in(&form.email, &form.password).await?;

	tracing::debug!(user_id = %session.user.id, "user signed in");

	Ok(session_response(
		global.config::<ApiConfig>(),
		&session,
		json!({
			"success": true,
			"redirect": "/dashboard",
		}),
	))
}

/// Always clears the cookies. Revoking the session upstream is best effort.
async fn sign_out<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;

	if let (Some(auth), Some(backend)) = (request_context(&req).auth().await, global.backend()) {
		if let Err(err) = backend.sign_out(&auth.access_token).await {
			tracing::warn!(error = %err, user_id = %auth.user_id, "failed to revoke session");
		}
	}

	let [access, refresh] = cleared_cookies(global.config::<ApiConfig>());
	Ok(make_response!(
		StatusCode::OK,
		json!({
			"success": true,
			"redirect": "/",
		}),
		header::SET_COOKIE => access,
		header::SET_COOKIE => refresh,
	))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RefreshRequest {
	refresh_token: Option<String>,
}

async fn refresh<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;
	let cookie = req.cookie(REFRESH_COOKIE).map(str::to_owned);

	let body = json_body::<RefreshRequest>(req).await?;
	let token = body
		.refresh_token
		.filter(|t| !t.is_empty())
		.or(cookie.filter(|t| !t.is_empty()))
		.map_err_route((StatusCode::BAD_REQUEST, "missing refresh token"))?;

	let backend = global.require_backend()?;
	let session = backend.refresh(&token).await.map_err(|err| match err {
		BackendError::Rejected { status, .. } if status.is_client_error() => {
			RouteError::<ApiError>::from((StatusCode::UNAUTHORIZED, "invalid refresh token"))
				.with_source(Some(ApiError::Backend(err)))
		}
		err => RouteError::from(err),
	})?;

	Ok(session_response(
		global.config::<ApiConfig>(),
		&session,
		json!({ "success": true }),
	))
}

async fn session(req: Request<Incoming>) -> Result<Response<Body>> {
	let user = request_context(&req).auth().await.map(|auth| {
		json!({
			"id": auth.user_id,
			"email": auth.email,
		})
	});

	Ok(make_response!(StatusCode::OK, json!({ "user": user })))
}

async fn callback(req: Request<Incoming>) -> Result<Response<Body>> {
	let location = CallbackTarget::classify(&CallbackParams::from_pairs(req.query_pairs())).location();

	Ok(make_response!(
		StatusCode::SEE_OTHER,
		json!({ "success": true, "redirect": location }),
		header::LOCATION => location.as_str(),
	))
}

async fn verify(req: Request<Incoming>) -> Result<Response<Body>> {
	let params = CallbackParams::from_pairs(req.query_pairs());
	Ok(make_response!(StatusCode::OK, json!(VerifyView::new(&params))))
}
