use crate::http::router::error::RouterError;
use crate::http::router::ext::RequestExt;
use crate::http::router::middleware::{middleware_fn, NextFn, SecurityHeadersMiddleware};
use crate::http::router::Router;

type TestRouter = Router<(), String, String>;

fn request(method: hyper::Method, uri: &str) -> hyper::Request<()> {
	hyper::Request::builder()
		.method(method)
		.uri(uri)
		.body(())
		.expect("failed to build request")
}

fn ok(body: impl Into<String>) -> Result<hyper::Response<String>, String> {
	Ok(hyper::Response::new(body.into()))
}

#[tokio::test]
async fn test_router_params_and_scopes() {
	let router = TestRouter::builder()
		.get("/", |_| async move { ok("home") })
		.get("/s/:slug", |req| async move { ok(format!("slug={}", req.param("slug").unwrap_or_default())) })
		.scope(
			"/dashboard",
			TestRouter::builder()
				.get("/", |_| async move { ok("overview") })
				.delete("/updates/:id/images/:index", |req| async move {
					ok(format!(
						"{}:{}",
						req.param("id").unwrap_or_default(),
						req.param("index").unwrap_or_default()
					))
				}),
		)
		.build();

	let res = router.handle(request(hyper::Method::GET, "/")).await.unwrap();
	assert_eq!(res.body(), "home");

	let res = router.handle(request(hyper::Method::GET, "/s/acme-labs")).await.unwrap();
	assert_eq!(res.body(), "slug=acme-labs");

	let res = router.handle(request(hyper::Method::GET, "/dashboard")).await.unwrap();
	assert_eq!(res.body(), "overview");

	let res = router
		.handle(request(hyper::Method::DELETE, "/dashboard/updates/abc/images/2"))
		.await
		.unwrap();
	assert_eq!(res.body(), "abc:2");

	assert!(matches!(
		router.handle(request(hyper::Method::POST, "/s/acme-labs")).await,
		Err(RouterError::NotFound)
	));
}

#[tokio::test]
async fn test_router_not_found() {
	let router = TestRouter::builder()
		.get("/health", |_| async move { ok("ok") })
		.not_found(|_| async move { ok("missing") })
		.build();

	let res = router.handle(request(hyper::Method::GET, "/health")).await.unwrap();
	assert_eq!(res.body(), "ok");

	let res = router.handle(request(hyper::Method::PATCH, "/nope/really")).await.unwrap();
	assert_eq!(res.body(), "missing");
}

#[tokio::test]
async fn test_router_middleware_order_and_errors() {
	let router = TestRouter::builder()
		.middleware(middleware_fn(|req: hyper::Request<()>, next: NextFn<(), String, String>| async move {
			let mut res = next(req).await?;
			res.body_mut().push_str("+outer");
			Ok(res)
		}))
		.data(String::from("provided"))
		.error_handler(|req, err: String| async move { hyper::Response::new(format!("{} failed: {err}", req.uri().path())) })
		.get("/data", |req| async move { ok(req.data::<String>().cloned().unwrap_or_default()) })
		.get("/fail", |_| async move { Err::<hyper::Response<String>, _>(String::from("boom")) })
		.build();

	let res = router.handle(request(hyper::Method::GET, "/data")).await.unwrap();
	assert_eq!(res.body(), "provided+outer");

	// error handlers wrap every generic middleware of their scope
	let res = router.handle(request(hyper::Method::GET, "/fail")).await.unwrap();
	assert_eq!(res.body(), "/fail failed: boom");
}

#[tokio::test]
async fn test_security_headers() {
	let router = TestRouter::builder()
		.middleware(SecurityHeadersMiddleware::default())
		.get("/", |_| async move {
			let mut res = hyper::Response::new(String::new());
			res.headers_mut()
				.insert(hyper::header::X_FRAME_OPTIONS, hyper::header::HeaderValue::from_static("SAMEORIGIN"));
			Ok(res)
		})
		.build();

	let res = router.handle(request(hyper::Method::GET, "/")).await.unwrap();
	assert_eq!(res.headers()[hyper::header::X_CONTENT_TYPE_OPTIONS], "nosniff");
	assert_eq!(res.headers()[hyper::header::X_FRAME_OPTIONS], "SAMEORIGIN");
	assert_eq!(res.headers()[hyper::header::REFERRER_POLICY], "origin-when-cross-origin");
	assert!(res.headers().contains_key(hyper::header::CONTENT_SECURITY_POLICY));
	assert!(res.headers().contains_key(hyper::header::STRICT_TRANSPORT_SECURITY));
}

#[test]
fn test_request_query_and_cookies() {
	let req = hyper::Request::builder()
		.uri("/auth/callback?type=signup&error_description=Email+link+is+invalid&next=%2Fdashboard")
		.header(hyper::header::COOKIE, "theme=dark; directory_session=abc.def.ghi")
		.body(())
		.unwrap();

	assert_eq!(req.query("type").as_deref(), Some("signup"));
	assert_eq!(req.query("error_description").as_deref(), Some("Email link is invalid"));
	assert_eq!(req.query("next").as_deref(), Some("/dashboard"));
	assert_eq!(req.query("missing"), None);
	assert_eq!(req.cookie("directory_session"), Some("abc.def.ghi"));
	assert_eq!(req.cookie("theme"), Some("dark"));
	assert_eq!(req.cookie("other"), None);
	assert!(req.params().is_none());
}
