use http::header::{self, HeaderName, HeaderValue};

/// Stamps a fixed set of headers onto every response that does not already
/// carry them.
#[derive(Debug, Clone)]
pub struct SecurityHeadersMiddleware {
	headers: Vec<(HeaderName, HeaderValue)>,
}

impl Default for SecurityHeadersMiddleware {
	fn default() -> Self {
		Self::new()
			.with(header::X_DNS_PREFETCH_CONTROL, "on")
			.with(header::STRICT_TRANSPORT_SECURITY, "max-age=63072000; includeSubDomains; preload")
			.with(header::X_XSS_PROTECTION, "1; mode=block")
			.with(header::X_FRAME_OPTIONS, "DENY")
			.with(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
			.with(header::REFERRER_POLICY, "origin-when-cross-origin")
			.with(
				header::CONTENT_SECURITY_POLICY,
				"default-src 'self'; script-src 'self' 'unsafe-eval' 'unsafe-inline'; style-src 'self' 'unsafe-inline'; img-src 'self' data: https: blob:; font-src 'self' data:; connect-src 'self' https://*.supabase.co wss://*.supabase.co;",
			)
	}
}

impl SecurityHeadersMiddleware {
	/// An empty set. Use [`Default`] for the standard browser hardening headers.
	pub fn new() -> Self {
		Self { headers: Vec::new() }
	}

	pub fn with(mut self, name: HeaderName, value: &'static str) -> Self {
		self.headers.push((name, HeaderValue::from_static(value)));
		self
	}

	pub fn headers(&self) -> &[(HeaderName, HeaderValue)] {
		&self.headers
	}
}

#[async_trait::async_trait]
impl<I: Send + 'static, O: Send + 'static, E: Send + 'static> super::Middleware<I, O, E> for SecurityHeadersMiddleware {
	async fn handle(&self, req: hyper::Request<I>, next: super::NextFn<I, O, E>) -> Result<hyper::Response<O>, E> {
		let mut resp = next(req).await?;

		for (name, value) in &self.headers {
			if !resp.headers().contains_key(name) {
				resp.headers_mut().insert(name.clone(), value.clone());
			}
		}

		Ok(resp)
	}
}
