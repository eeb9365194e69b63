use std::sync::Arc;

use anyhow::Context as _;
use binary_helper::global::GlobalConfigProvider;
use binary_helper::{bootstrap, impl_global_traits};
use common::context::Context;
use platform_directory::backend::{self, Backend};
use platform_directory::config::{ApiConfig, AppConfig, BackendConfig, FeedConfig, StorageConfig};
use platform_directory::global::DirectoryState;

struct GlobalState {
	ctx: Context,
	config: AppConfig,
	backend: Option<Arc<dyn Backend>>,
}

impl_global_traits!(GlobalState);

impl GlobalConfigProvider<ApiConfig> for GlobalState {
	#[inline(always)]
	fn provide_config(&self) -> &ApiConfig {
		&self.config.extra.api
	}
}

impl GlobalConfigProvider<BackendConfig> for GlobalState {
	#[inline(always)]
	fn provide_config(&self) -> &BackendConfig {
		&self.config.extra.backend
	}
}

impl GlobalConfigProvider<StorageConfig> for GlobalState {
	#[inline(always)]
	fn provide_config(&self) -> &StorageConfig {
		&self.config.extra.storage
	}
}

impl GlobalConfigProvider<FeedConfig> for GlobalState {
	#[inline(always)]
	fn provide_config(&self) -> &FeedConfig {
		&self.config.extra.feed
	}
}

impl DirectoryState for GlobalState {
	#[inline(always)]
	fn backend(&self) -> Option<&Arc<dyn Backend>> {
		self.backend.as_ref()
	}
}

impl binary_helper::Global<AppConfig> for GlobalState {
	async fn new(ctx: Context, config: AppConfig) -> anyhow::Result<Self> {
		let backend = backend::from_config(&config.extra).context("failed to create backend client")?;

		match &backend {
			Some(_) => tracing::info!(kind = ?config.extra.backend.kind, "backend configured"),
			None => tracing::warn!("backend not configured, public pages will ask for setup"),
		}

		Ok(Self { ctx, config, backend })
	}
}

#[tokio::main]
pub async fn main() {
	if let Err(err) = bootstrap::<AppConfig, GlobalState, _>(|global| async move {
		platform_directory::api::run(global).await.context("api server stopped unexpectedly")
	})
	.await
	{
		tracing::error!("{:#}", err);
		std::process::exit(1);
	}
}
