use std::borrow::Cow;

use super::types::RouteParams;

pub trait RequestExt {
	fn param(&self, key: &str) -> Option<&str> {
		self.params()?.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
	}

	fn params(&self) -> Option<&RouteParams>;

	fn provide<T: Send + Sync + Clone + 'static>(&mut self, data: T);

	fn data<T: Send + Sync + 'static>(&self) -> Option<&T>;

	/// Decoded query string pairs, in order.
	fn query_pairs(&self) -> Vec<(Cow<'_, str>, Cow<'_, str>)>;

	/// The first value for `key` in the query string.
	fn query(&self, key: &str) -> Option<String> {
		self.query_pairs()
			.into_iter()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v.into_owned())
	}

	/// The value of a cookie sent with the request.
	fn cookie(&self, name: &str) -> Option<&str>;
}

impl<I> RequestExt for hyper::Request<I> {
	fn params(&self) -> Option<&RouteParams> {
		self.extensions().get::<RouteParams>()
	}

	fn provide<T: Send + Sync + Clone + 'static>(&mut self, data: T) {
		self.extensions_mut().insert(data);
	}

	fn data<T: Send + Sync + 'static>(&self) -> Option<&T> {
		self.extensions().get::<T>()
	}

	fn query_pairs(&self) -> Vec<(Cow<'_, str>, Cow<'_, str>)> {
		self.uri()
			.query()
			.map(|q| url::form_urlencoded::parse(q.as_bytes()).collect())
			.unwrap_or_default()
	}

	fn cookie(&self, name: &str) -> Option<&str> {
		self.headers()
			.get_all(hyper::header::COOKIE)
			.iter()
			.filter_map(|v| v.to_str().ok())
			.flat_map(|v| v.split(';'))
			.filter_map(|pair| pair.trim().split_once('='))
			.find(|(k, _)| *k == name)
			.map(|(_, v)| v.trim_matches('"'))
	}
}
