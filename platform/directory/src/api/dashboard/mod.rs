use std::sync::Arc;

use common::http::ext::OptionExt;
use common::http::router::builder::RouterBuilder;
use common::http::router::Router;
use common::http::RouteError;
use common::make_response;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde_json::json;

use super::auth::{AuthData, AuthError};
use super::error::{ApiError, Result};
use super::middleware::auth::dashboard_guard;
use super::request_context::RequestContext;
use super::{global, request_context, Body};
use crate::backend::Backend;
use crate::config::FeedConfig;
use crate::database::{Startup, Update};
use crate::global::DirectoryGlobal;
use crate::views::{OverviewView, MISSING_STARTUP_MESSAGE};

mod profile;
mod updates;

pub fn routes<G: DirectoryGlobal>(global: &Arc<G>) -> RouterBuilder<Incoming, Body, RouteError<ApiError>> {
	Router::builder()
		.middleware(dashboard_guard(global))
		.get("/", overview::<G>)
		.scope("/profile", profile::routes(global))
		.scope("/updates", updates::routes(global))
}

async fn require_auth(context: RequestContext) -> Result<AuthData> {
	context.auth().await.map_err_route(AuthError::NotLoggedIn)
}

/// The signed in owner's startup row.
async fn owned_startup(backend: &dyn Backend, auth: &AuthData) -> Result<Startup> {
	Startup::by_id(backend, &auth.access_token, auth.user_id)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, MISSING_STARTUP_MESSAGE))
}

/// Removes a stored object, logging instead of failing.
async fn remove_object(backend: &dyn Backend, auth: &AuthData, bucket: &str, url: &str) {
	let Some(path) = backend.object_path(bucket, url) else {
		return;
	};

	if let Err(err) = backend.remove(&auth.access_token, bucket, &[path]).await {
		tracing::warn!(error = %err, bucket, url, "failed to delete file from storage");
	}
}

async fn overview<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;
	let auth = require_auth(request_context(&req)).await?;
	let backend = global.require_backend()?;

	let startup = owned_startup(backend, &auth).await?;
	let updates = Update::for_owner(backend, &auth.access_token, auth.user_id, None)
		.await
		.unwrap_or_else(|err| {
			tracing::error!(error = %err, user_id = %auth.user_id, "failed to fetch owner updates");
			Vec::new()
		});

	let limit = global.config::<FeedConfig>().dashboard_recent_limit;
	Ok(make_response!(
		StatusCode::OK,
		json!(OverviewView::new(&startup, &updates, limit))
	))
}
