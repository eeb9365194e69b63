use std::sync::Arc;

use common::http::router::builder::RouterBuilder;
use common::http::router::Router;
use common::http::RouteError;
use common::make_response;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde_json::json;

use super::{owned_startup, remove_object, require_auth};
use crate::api::error::{ApiError, Result};
use crate::api::upload::{object_name, read_image};
use crate::api::{global, json_body, request_context, Body};
use crate::backend::BackendError;
use crate::config::{ApiConfig, StorageConfig};
use crate::database::{Stage, Startup};
use crate::global::DirectoryGlobal;
use crate::validation::ProfileForm;
use crate::views::ProfileCompletion;

const SLUG_TAKEN: &str = "That slug is already taken";

pub fn routes<G: DirectoryGlobal>(_: &Arc<G>) -> RouterBuilder<Incoming, Body, RouteError<ApiError>> {
	Router::builder()
		.get("/", show::<G>)
		.post("/", save::<G>)
		.post("/logo", upload_logo::<G>)
		.delete("/logo", remove_logo::<G>)
}

fn stages() -> serde_json::Value {
	Stage::ALL
		.iter()
		.map(|stage| json!({ "value": stage.as_str(), "label": stage.label() }))
		.collect()
}

fn profile_response(config: &ApiConfig, startup: &Startup, message: Option<&str>) -> Response<Body> {
	let public_url = format!("{}/s/{}", config.site_url.trim_end_matches('/'), startup.slug);

	make_response!(
		StatusCode::OK,
		json!({
			"success": true,
			"message": message,
			"form": ProfileForm::from_startup(startup),
			"logo_url": startup.logo_url,
			"public_url": public_url,
			"stages": stages(),
			"completion": ProfileCompletion::of(startup),
		})
	)
}

async fn show<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;
	let auth = require_auth(request_context(&req)).await?;
	let backend = global.require_backend()?;

	let startup = owned_startup(backend, &auth).await?;

	Ok(profile_response(global.config::<ApiConfig>(), &startup, None))
}

async fn save<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;
	let auth = require_auth(request_context(&req)).await?;
	let changes = json_body::<ProfileForm>(req).await?.validate()?;

	let backend = global.require_backend()?;

	let startup = match Startup::save_profile(backend, &auth.access_token, auth.user_id, &changes).await {
		Ok(startup) => startup,
		Err(err @ BackendError::Conflict(_)) => {
			return Err(RouteError::from((StatusCode::CONFLICT, SLUG_TAKEN, err)));
		}
		Err(err) => return Err(err.into()),
	};

	tracing::info!(user_id = %auth.user_id, slug = %startup.slug, "profile updated");

	Ok(profile_response(
		global.config::<ApiConfig>(),
		&startup,
		Some("Profile updated successfully"),
	))
}

async fn upload_logo<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;
	let auth = require_auth(request_context(&req)).await?;
	let storage = global.config::<StorageConfig>();

	let image = read_image(req, storage.max_logo_size).await?;

	let backend = global.require_backend()?;
	let current = owned_startup(backend, &auth).await?;

	let path = object_name(&auth.user_id.to_string(), &image.extension);
	let url = backend
		.upload(
			&auth.access_token,
			&storage.logo_bucket,
			&path,
			image.file,
			&image.content_type,
			storage.cache_control_seconds,
		)
		.await?;

	let startup = Startup::set_logo(backend, &auth.access_token, auth.user_id, Some(&url)).await?;

	if let Some(old) = current.logo_url.as_deref().filter(|old| *old != url) {
		remove_object(backend, &auth, &storage.logo_bucket, old).await;
	}

	tracing::info!(user_id = %auth.user_id, path = %path, "logo uploaded");

	Ok(profile_response(
		global.config::<ApiConfig>(),
		&startup,
		Some("Logo uploaded successfully"),
	))
}

async fn remove_logo<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;
	let auth = require_auth(request_context(&req)).await?;
	let backend = global.require_backend()?;
	let storage = global.config::<StorageConfig>();

	let current = owned_startup(backend, &auth).await?;
	let startup = Startup::set_logo(backend, &auth.access_token, auth.user_id, None).await?;

	if let Some(old) = current.logo_url.as_deref() {
		remove_object(backend, &auth, &storage.logo_bucket, old).await;
	}

	Ok(profile_response(global.config::<ApiConfig>(), &startup, Some("Logo removed")))
}
