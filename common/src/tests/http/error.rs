use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::StatusCode;

use crate::http::ext::{OptionExt, ResultExt};
use crate::http::{error_handler, RouteError, ShouldLog};

#[derive(Debug, thiserror::Error)]
#[error("backend said no")]
struct TestError;

async fn body_json(res: hyper::Response<Full<Bytes>>) -> serde_json::Value {
	let body = res.into_body().collect().await.unwrap().to_bytes();
	serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_route_error_response() {
	let err: RouteError<TestError> = (StatusCode::NOT_FOUND, "startup not found").into();
	assert_eq!(err.status(), StatusCode::NOT_FOUND);
	assert_eq!(err.should_log(), ShouldLog::No);

	let res = err.response();
	assert_eq!(res.headers()[hyper::header::CONTENT_TYPE], "application/json");
	assert_eq!(
		body_json(res).await,
		serde_json::json!({ "success": false, "message": "startup not found" })
	);
}

#[tokio::test]
async fn test_route_error_log_levels() {
	let err: RouteError<TestError> = (StatusCode::BAD_REQUEST, "bad", TestError).into();
	assert_eq!(err.should_log(), ShouldLog::Debug);

	let err: RouteError<TestError> = "exploded".into();
	assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(err.should_log(), ShouldLog::Yes);

	let req = hyper::Request::builder().uri("/x").body(()).unwrap();
	let res = error_handler(req, err).await;
	assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_result_ext() {
	let result: Result<(), TestError> = Err(TestError);
	let err: RouteError<TestError> = result.map_err_route((StatusCode::BAD_GATEWAY, "upstream failed")).unwrap_err();
	assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
	assert!(err.source_ref().is_some());

	let result: Result<(), TestError> = Err(TestError);
	let err: RouteError<TestError> = result.map_ignore_err_route((StatusCode::BAD_GATEWAY, "upstream failed")).unwrap_err();
	assert!(err.source_ref().is_none());

	let missing: Option<u32> = None;
	let err: RouteError<TestError> = missing.map_err_route((StatusCode::NOT_FOUND, "missing")).unwrap_err();
	assert_eq!(err.status(), StatusCode::NOT_FOUND);
}
