use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde_json::json;

use super::error::Result;
use super::Body;

pub async fn health(_: Request<Incoming>) -> Result<Response<Body>> {
	Ok(common::make_response!(
		StatusCode::OK,
		json!({
			"status": "ok"
		})
	))
}
