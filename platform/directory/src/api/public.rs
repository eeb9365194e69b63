use common::http::ext::OptionExt;
use common::http::router::ext::RequestExt;
use common::make_response;
use hyper::body::Incoming;
use hyper::{header, Request, Response, StatusCode};
use serde_json::json;
use uuid::Uuid;

use super::error::Result;
use super::{global, request_context, Body};
use crate::config::FeedConfig;
use crate::database::{Startup, Update};
use crate::global::DirectoryGlobal;
use crate::views::{CallbackParams, CallbackTarget, FeedView, ProfileView, UpdateDetailView};

/// The landing feed. Confirmation links that land here are forwarded the
/// same way the auth callback forwards them.
pub async fn feed<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let target = CallbackTarget::classify(&CallbackParams::from_pairs(req.query_pairs()));
	if target != CallbackTarget::Home {
		let location = target.location();
		return Ok(make_response!(
			StatusCode::SEE_OTHER,
			json!({ "success": true, "redirect": location }),
			header::LOCATION => location.as_str(),
		));
	}

	let global = global::<G, _>(&req)?;

	let Some(backend) = global.backend() else {
		return Ok(make_response!(StatusCode::OK, json!(FeedView::setup_required())));
	};

	let limit = global.config::<FeedConfig>().limit;
	let updates = Update::published_feed(backend.as_ref(), limit)
		.await
		.unwrap_or_else(|err| {
			tracing::error!(error = %err, "failed to fetch feed updates");
			Vec::new()
		});

	Ok(make_response!(StatusCode::OK, json!(FeedView::from_updates(&updates))))
}

pub async fn profile<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;
	let slug = req.param("slug").unwrap_or_default().to_owned();

	let not_found = (StatusCode::NOT_FOUND, "Startup not found");

	let backend = global.backend().map_err_route(not_found)?;

	let startup = match Startup::public_by_slug(backend.as_ref(), &slug).await {
		Ok(startup) => startup,
		Err(err) => {
			tracing::error!(error = %err, slug = %slug, "failed to fetch startup");
			None
		}
	}
	.map_err_route(not_found)?;

	let limit = global.config::<FeedConfig>().profile_updates_limit;
	let updates = Update::published_for_startup(backend.as_ref(), startup.id, limit)
		.await
		.unwrap_or_else(|err| {
			tracing::error!(error = %err, slug = %slug, "failed to fetch startup updates");
			Vec::new()
		});

	Ok(make_response!(StatusCode::OK, json!(ProfileView::new(&startup, &updates))))
}

/// A single update. Drafts are only shown to their author.
pub async fn update_detail<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;
	let not_found = (StatusCode::NOT_FOUND, "Update not found");

	let id = req
		.param("id")
		.and_then(|id| Uuid::parse_str(id).ok())
		.map_err_route(not_found)?;

	let auth = request_context(&req).auth().await;

	let backend = global.require_backend()?;

	let item = Update::with_startup_by_id(backend, auth.as_ref().map(|a| a.access_token.as_str()), id)
		.await?
		.map_err_route(not_found)?;

	let is_owner = auth.is_some_and(|a| a.user_id == item.update.startup_id);
	if !item.update.is_published && !is_owner {
		return Err(not_found.into());
	}

	Ok(make_response!(StatusCode::OK, json!(UpdateDetailView::from(&item))))
}
