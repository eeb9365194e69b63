use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::sync::Arc;

use super::middleware::{Middleware, NextFn};
use super::route::{Route, RouterItem};
use super::types::RouteInfo;
use super::Router;

#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Clone, Copy)]
enum MiddlewareKind {
	Data,
	Error,
	Generic,
}

pub struct RouterBuilder<I, O, E> {
	tree: Vec<(&'static str, RouterItem<I, O, E>)>,
	middlewares: Vec<(Arc<dyn Middleware<I, O, E>>, MiddlewareKind)>,
}

impl<I, O, E> Debug for RouterBuilder<I, O, E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RouterBuilder").field("tree", &self.tree).finish()
	}
}

impl<I: Send + 'static, O: Send + 'static, E: Send + 'static> Default for RouterBuilder<I, O, E> {
	fn default() -> Self {
		Self::new()
	}
}

macro_rules! method_routes {
	($($name:ident => $method:ident),+ $(,)?) => {
		$(
			pub fn $name<F: Future<Output = Result<hyper::Response<O>, E>> + Send + 'static>(
				self,
				path: &'static str,
				handler: impl Fn(hyper::Request<I>) -> F + Send + Sync + 'static,
			) -> Self {
				self.add_route(Some(hyper::Method::$method), path, handler)
			}
		)+
	};
}

impl<I: Send + 'static, O: Send + 'static, E: Send + 'static> RouterBuilder<I, O, E> {
	method_routes! {
		get => GET,
		post => POST,
		put => PUT,
		delete => DELETE,
		patch => PATCH,
		head => HEAD,
		options => OPTIONS,
	}

	pub fn new() -> Self {
		Self {
			tree: Vec::new(),
			middlewares: Vec::new(),
		}
	}

	pub fn middleware(mut self, middleware: impl Middleware<I, O, E> + 'static) -> Self {
		self.middlewares.push((Arc::new(middleware), MiddlewareKind::Generic));
		self
	}

	/// Inserts a clone of `data` into the extensions of every request routed
	/// through this builder.
	pub fn data<T: Clone + Send + Sync + 'static>(mut self, data: T) -> Self {
		self.middlewares.push((
			Arc::new(move |mut req: hyper::Request<I>, next: NextFn<I, O, E>| {
				req.extensions_mut().insert(data.clone());
				next(req)
			}),
			MiddlewareKind::Data,
		));

		self
	}

	/// Turns errors returned by routes or by later middlewares into responses.
	pub fn error_handler<F: Future<Output = hyper::Response<O>> + Send + 'static>(
		mut self,
		handler: impl Fn(hyper::Request<()>, E) -> F + Send + Sync + 'static,
	) -> Self {
		let handler = Arc::new(handler);
		self.middlewares.push((
			Arc::new(move |req: hyper::Request<I>, next: NextFn<I, O, E>| {
				let handler = handler.clone();
				async move {
					let (parts, body) = req.into_parts();

					match next(hyper::Request::from_parts(parts.clone(), body)).await {
						Ok(res) => Ok(res),
						Err(err) => Ok(handler(hyper::Request::from_parts(parts, ()), err).await),
					}
				}
			}),
			MiddlewareKind::Error,
		));

		self
	}

	pub fn any<F: Future<Output = Result<hyper::Response<O>, E>> + Send + 'static>(
		self,
		path: &'static str,
		handler: impl Fn(hyper::Request<I>) -> F + Send + Sync + 'static,
	) -> Self {
		self.add_route(None, path, handler)
	}

	pub fn add_route<F: Future<Output = Result<hyper::Response<O>, E>> + Send + 'static>(
		mut self,
		method: Option<hyper::Method>,
		path: &'static str,
		handler: impl Fn(hyper::Request<I>) -> F + Send + Sync + 'static,
	) -> Self {
		self.tree.push((
			path,
			RouterItem::Route(Route {
				method,
				handler: Arc::new(move |req| Box::pin(handler(req))),
			}),
		));
		self
	}

	pub fn scope(mut self, path: &'static str, router: RouterBuilder<I, O, E>) -> Self {
		self.tree.push((path, RouterItem::Router(router)));
		self
	}

	pub fn not_found<F: Future<Output = Result<hyper::Response<O>, E>> + Send + 'static>(
		self,
		handler: impl Fn(hyper::Request<I>) -> F + Send + Sync + 'static,
	) -> Self {
		self.add_route(None, "/*", handler)
	}

	fn build_scoped(mut self, parent_path: &str, target: &mut Router<I, O, E>, middlewares: &[usize]) {
		self.middlewares.sort_by_key(|(_, kind)| *kind);

		let middleware_idxs = middlewares
			.iter()
			.copied()
			.chain(self.middlewares.into_iter().map(|(handler, _)| {
				target.middlewares.push(handler);
				target.middlewares.len() - 1
			}))
			.collect::<Vec<_>>();

		let parent_path = parent_path.trim_matches('/');

		for (path, item) in self.tree.drain(..) {
			let path = path.trim_matches('/');
			let joined = join_path(parent_path, path);

			match item {
				RouterItem::Route(route) => {
					target.routes.push(route.handler);

					let info = RouteInfo {
						route: target.routes.len() - 1,
						middleware: middleware_idxs.clone(),
					};

					let method = route.method.as_ref().map(|m| m.as_str()).unwrap_or("*");
					let full_path = format!("/{method}/{joined}");

					tracing::debug!(parent_path, path, full_path, "adding route");

					let _ = target.tree.insert(&full_path, info);
				}
				RouterItem::Router(router) => router.build_scoped(&joined, target, &middleware_idxs),
			}
		}
	}

	pub fn build(self) -> Router<I, O, E> {
		let mut router = Router {
			routes: Vec::new(),
			middlewares: Vec::new(),
			tree: path_tree::PathTree::new(),
		};

		self.build_scoped("", &mut router, &[]);

		router
	}
}

fn join_path(parent: &str, path: &str) -> String {
	match (parent.is_empty(), path.is_empty()) {
		(true, _) => path.to_owned(),
		(false, true) => parent.to_owned(),
		(false, false) => format!("{parent}/{path}"),
	}
}
