use std::sync::Arc;

use common::http::ext::{OptionExt, ResultExt};
use common::http::router::builder::RouterBuilder;
use common::http::router::ext::RequestExt;
use common::http::router::Router;
use common::http::RouteError;
use common::make_response;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use uuid::Uuid;

use super::{remove_object, require_auth};
use crate::api::auth::AuthData;
use crate::api::error::{ApiError, Result};
use crate::api::upload::{object_name, read_image};
use crate::api::{global, json_body, request_context, Body};
use crate::backend::Backend;
use crate::config::StorageConfig;
use crate::database::{Update, UpdateImage};
use crate::global::DirectoryGlobal;
use crate::validation::{ImageMetadata, UpdateForm, ValidationErrors};
use crate::views::{ImageView, UpdateListItem, UpdatesListView};

const NOT_FOUND: (StatusCode, &str) = (StatusCode::NOT_FOUND, "Update not found");

pub fn routes<G: DirectoryGlobal>(_: &Arc<G>) -> RouterBuilder<Incoming, Body, RouteError<ApiError>> {
	Router::builder()
		.get("/", list::<G>)
		.post("/", create::<G>)
		.get("/:id", show::<G>)
		.post("/:id", edit::<G>)
		.delete("/:id", delete::<G>)
		.post("/:id/images", add_image::<G>)
		.delete("/:id/images/:index", remove_image::<G>)
}

fn update_id<I>(req: &Request<I>) -> Result<Uuid> {
	req.param("id")
		.and_then(|id| Uuid::parse_str(id).ok())
		.map_err_route(NOT_FOUND)
}

/// One of the owner's updates, drafts included.
async fn owned_update(backend: &dyn Backend, auth: &AuthData, id: Uuid) -> Result<Update> {
	Update::by_id(backend, Some(&auth.access_token), id)
		.await?
		.filter(|update| update.startup_id == auth.user_id)
		.map_err_route(NOT_FOUND)
}

fn update_response(status: StatusCode, update: &Update, message: Option<&str>) -> Response<Body> {
	let images = update
		.images
		.iter()
		.enumerate()
		.map(|(idx, image)| ImageView::new(idx, image))
		.collect::<Vec<_>>();

	make_response!(
		status,
		json!({
			"success": true,
			"message": message,
			"update": UpdateListItem::from(update),
			"form": UpdateForm::from_update(update),
			"images": images,
		})
	)
}

async fn list<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;
	let auth = require_auth(request_context(&req)).await?;
	let backend = global.require_backend()?;

	let updates = Update::for_owner(backend, &auth.access_token, auth.user_id, None).await?;

	Ok(make_response!(StatusCode::OK, json!(UpdatesListView::new(&updates))))
}

async fn create<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;
	let auth = require_auth(request_context(&req)).await?;
	let changes = json_body::<UpdateForm>(req).await?.validate()?;

	let backend = global.require_backend()?;
	let update = Update::create(backend, &auth.access_token, auth.user_id, &changes).await?;

	tracing::info!(user_id = %auth.user_id, update_id = %update.id, published = update.is_published, "update created");

	let message = if update.is_published {
		"Update published"
	} else {
		"Draft saved"
	};

	Ok(update_response(StatusCode::CREATED, &update, Some(message)))
}

async fn show<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;
	let id = update_id(&req)?;
	let auth = require_auth(request_context(&req)).await?;
	let backend = global.require_backend()?;

	let update = owned_update(backend, &auth, id).await?;

	Ok(update_response(StatusCode::OK, &update, None))
}

async fn edit<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;
	let id = update_id(&req)?;
	let auth = require_auth(request_context(&req)).await?;
	let changes = json_body::<UpdateForm>(req).await?.validate()?;

	let backend = global.require_backend()?;
	let update = Update::edit(backend, &auth.access_token, auth.user_id, id, &changes)
		.await?
		.map_err_route(NOT_FOUND)?;

	Ok(update_response(StatusCode::OK, &update, Some("Update saved")))
}

async fn delete<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;
	let id = update_id(&req)?;
	let auth = require_auth(request_context(&req)).await?;
	let backend = global.require_backend()?;
	let storage = global.config::<StorageConfig>();

	let update = owned_update(backend, &auth, id).await?;

	if !Update::delete(backend, &auth.access_token, auth.user_id, id).await? {
		return Err(NOT_FOUND.into());
	}

	for image in &update.images {
		remove_object(backend, &auth, &storage.update_image_bucket, &image.url).await;
	}

	tracing::info!(user_id = %auth.user_id, update_id = %id, "update deleted");

	Ok(make_response!(
		StatusCode::OK,
		json!({ "success": true, "message": "Update deleted" })
	))
}

async fn add_image<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;
	let id = update_id(&req)?;
	let auth = require_auth(request_context(&req)).await?;
	let storage = global.config::<StorageConfig>();
	let backend = global.require_backend()?;

	let update = owned_update(backend, &auth, id).await?;
	if update.images.len() >= storage.max_update_images {
		return Err(ValidationErrors::single(
			"file",
			format!("Maximum {} images allowed", storage.max_update_images),
		)
		.into());
	}

	let upload = read_image(req, storage.max_update_image_size).await?;

	let metadata = upload
		.metadata
		.as_deref()
		.map_err_route(ValidationErrors::single("metadata", "Image metadata is required"))?;
	let metadata = serde_json::from_slice::<ImageMetadata>(metadata)
		.map_err_route((StatusCode::BAD_REQUEST, "invalid image metadata"))?
		.validate()?;

	let path = object_name(&format!("{}/{}", auth.user_id, id), &upload.extension);
	let url = backend
		.upload(
			&auth.access_token,
			&storage.update_image_bucket,
			&path,
			upload.file,
			&upload.content_type,
			storage.cache_control_seconds,
		)
		.await?;

	let mut images = update.images;
	images.push(UpdateImage {
		url,
		w: metadata.width,
		h: metadata.height,
		alt: metadata.alt,
	});

	let update = Update::set_images(backend, &auth.access_token, auth.user_id, id, &images)
		.await?
		.map_err_route(NOT_FOUND)?;

	tracing::info!(user_id = %auth.user_id, update_id = %id, path = %path, "update image uploaded");

	Ok(update_response(StatusCode::OK, &update, Some("Image added")))
}

async fn remove_image<G: DirectoryGlobal>(req: Request<Incoming>) -> Result<Response<Body>> {
	let global = global::<G, _>(&req)?;
	let id = update_id(&req)?;
	let index = req
		.param("index")
		.and_then(|index| index.parse::<usize>().ok())
		.map_err_route((StatusCode::NOT_FOUND, "Image not found"))?;
	let auth = require_auth(request_context(&req)).await?;
	let storage = global.config::<StorageConfig>();
	let backend = global.require_backend()?;

	let mut images = owned_update(backend, &auth, id).await?.images;
	if index >= images.len() {
		return Err((StatusCode::NOT_FOUND, "Image not found").into());
	}

	let removed = images.remove(index);

	let update = Update::set_images(backend, &auth.access_token, auth.user_id, id, &images)
		.await?
		.map_err_route(NOT_FOUND)?;

	remove_object(backend, &auth, &storage.update_image_bucket, &removed.url).await;

	Ok(update_response(StatusCode::OK, &update, Some("Image removed")))
}
