use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use binary_helper::global::RequestGlobalExt;
use bytes::Bytes;
use common::http::ext::ResultExt;
use common::http::router::ext::RequestExt;
use common::http::router::middleware::SecurityHeadersMiddleware;
use common::http::router::Router;
use common::http::RouteError;
use common::make_response;
use common::prelude::FutureTimeout;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::StatusCode;
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::net::TcpSocket;
use tokio::select;

use self::error::{ApiError, Result};
use self::request_context::RequestContext;
use crate::config::ApiConfig;
use crate::global::DirectoryGlobal;

pub mod auth;
mod dashboard;
pub mod error;
mod health;
pub mod jwt;
pub mod middleware;
mod public;
pub mod request_context;
mod session;
mod upload;

pub type Body = Full<Bytes>;

/// JSON bodies larger than this are rejected.
const MAX_JSON_BODY: usize = 64 * 1024;

pub fn routes<G: DirectoryGlobal>(global: &Arc<G>) -> Router<Incoming, Body, RouteError<ApiError>> {
	let weak = Arc::downgrade(global);

	let api = Router::builder()
		.error_handler(common::http::error_handler::<ApiError, _>)
		// Resolves the session from the Authorization header or the session cookie. Requests
		// without one continue anonymously.
		.middleware(middleware::auth::auth_middleware(global))
		.get("/health", health::health)
		.get("/", public::feed::<G>)
		.get("/s/:slug", public::profile::<G>)
		.get("/updates/:id", public::update_detail::<G>)
		.scope("/auth", session::routes(global))
		.scope("/dashboard", dashboard::routes(global))
		.not_found(|_| async move {
			Ok(make_response!(
				StatusCode::NOT_FOUND,
				json!({
					"success": false,
					"message": "not found",
				})
			))
		});

	// The security headers sit outside the error handler so error responses carry them too.
	Router::builder()
		.data(weak)
		.middleware(SecurityHeadersMiddleware::default())
		.scope("/", api)
		.build()
}

/// The global state for a request.
pub(crate) fn global<G: DirectoryGlobal, I>(req: &hyper::Request<I>) -> Result<Arc<G>> {
	<hyper::Request<I> as RequestGlobalExt<ApiError>>::get_global::<G, Body>(req)
}

/// The context the auth middleware attached, or an empty one.
pub(crate) fn request_context<I>(req: &hyper::Request<I>) -> RequestContext {
	req.data::<RequestContext>().cloned().unwrap_or_default()
}

/// Reads a JSON request body. An empty body reads as `{}`.
pub(crate) async fn json_body<T: DeserializeOwned>(req: hyper::Request<Incoming>) -> Result<T> {
	let body = Limited::new(req.into_body(), MAX_JSON_BODY)
		.collect()
		.await
		.map_ignore_err_route((StatusCode::BAD_REQUEST, "failed to read request body"))?
		.to_bytes();

	let body = if body.iter().all(u8::is_ascii_whitespace) {
		Bytes::from_static(b"{}")
	} else {
		body
	};

	serde_json::from_slice(&body).map_err_route((StatusCode::BAD_REQUEST, "invalid json body"))
}

pub async fn run<G: DirectoryGlobal>(global: Arc<G>) -> anyhow::Result<()> {
	let config = global.config::<ApiConfig>();

	tracing::info!("Listening on {}", config.bind_address);
	let socket = if config.bind_address.is_ipv6() {
		TcpSocket::new_v6()?
	} else {
		TcpSocket::new_v4()?
	};

	socket.set_reuseaddr(true)?;
	socket.set_reuseport(true)?;
	socket.bind(config.bind_address)?;
	let listener = socket.listen(1024)?;

	let tls_acceptor = if let Some(tls) = &config.tls {
		tracing::info!("TLS enabled");
		let cert = tokio::fs::read(&tls.cert).await.context("failed to read directory ssl cert")?;
		let key = tokio::fs::read(&tls.key)
			.await
			.context("failed to read directory ssl private key")?;

		let key = rustls_pemfile::pkcs8_private_keys(&mut io::BufReader::new(io::Cursor::new(key)))
			.next()
			.ok_or_else(|| anyhow::anyhow!("failed to find private key in directory private key file"))??
			.into();

		let certs = rustls_pemfile::certs(&mut io::BufReader::new(io::Cursor::new(cert))).collect::<Result<Vec<_>, _>>()?;

		Some(Arc::new(tokio_rustls::TlsAcceptor::from(Arc::new(
			rustls::ServerConfig::builder()
				.with_no_client_auth()
				.with_single_cert(certs, key)?,
		))))
	} else {
		None
	};

	// Handlers only hold a Weak reference to the global state, so open
	// keep-alive connections do not keep it alive past shutdown.
	let router = Arc::new(routes(&global));
	let service = service_fn(move |req| {
		let this = router.clone();
		async move { this.handle(req).await }
	});

	loop {
		select! {
			_ = global.ctx().done() => {
				return Ok(());
			},
			r = listener.accept() => {
				let (socket, addr) = r?;

				let service = service.clone();
				let tls_acceptor = tls_acceptor.clone();

				tracing::debug!("Accepted connection from {}", addr);

				tokio::spawn(async move {
					let http = http1::Builder::new();

					if let Some(tls_acceptor) = tls_acceptor {
						let Ok(Ok(socket)) = tls_acceptor.accept(socket).timeout(Duration::from_secs(5)).await else {
							return;
						};
						tracing::debug!("TLS handshake complete");
						http.serve_connection(
							TokioIo::new(socket),
							service,
						).await.ok();
					} else {
						http.serve_connection(
							TokioIo::new(socket),
							service,
						).await.ok();
					}
				});
			},
		}
	}
}
