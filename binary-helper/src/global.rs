use std::sync::{Arc, Weak};

use bytes::Bytes;
use common::context::Context;
use common::http::RouteError;
use hyper::StatusCode;

#[macro_export]
macro_rules! impl_global_traits {
	($struct:ty) => {
		impl binary_helper::global::GlobalCtx for $struct {
			#[inline(always)]
			fn ctx(&self) -> &common::context::Context {
				&self.ctx
			}
		}

		impl binary_helper::global::GlobalConfig for $struct {}
	};
}

pub trait GlobalCtx {
	fn ctx(&self) -> &Context;
}

pub trait GlobalConfig {
	#[inline(always)]
	fn config<C>(&self) -> &C
	where
		Self: GlobalConfigProvider<C>,
	{
		GlobalConfigProvider::provide_config(self)
	}
}

pub trait GlobalConfigProvider<C> {
	fn provide_config(&self) -> &C;
}

/// Fetches the global state the router stored as a [`Weak`] in the request
/// extensions.
pub trait RequestGlobalExt<E> {
	fn get_global<G: Sync + Send + 'static, B: From<Bytes>>(&self) -> std::result::Result<Arc<G>, RouteError<E, B>>;
}

impl<E, B> RequestGlobalExt<E> for hyper::Request<B> {
	fn get_global<G: Sync + Send + 'static, B2: From<Bytes>>(&self) -> std::result::Result<Arc<G>, RouteError<E, B2>> {
		Ok(self
			.extensions()
			.get::<Weak<G>>()
			.ok_or((StatusCode::INTERNAL_SERVER_ERROR, "global state not set"))?
			.upgrade()
			.ok_or((StatusCode::SERVICE_UNAVAILABLE, "server is shutting down"))?)
	}
}
