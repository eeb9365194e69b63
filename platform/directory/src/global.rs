use std::sync::Arc;

use crate::backend::{Backend, BackendError};
use crate::config::{ApiConfig, BackendConfig, FeedConfig, StorageConfig};

pub trait DirectoryState {
	/// `None` until a backend is configured.
	fn backend(&self) -> Option<&Arc<dyn Backend>>;

	fn require_backend(&self) -> Result<&dyn Backend, BackendError> {
		self.backend().map(|b| b.as_ref()).ok_or(BackendError::NotConfigured)
	}
}

pub trait DirectoryGlobal:
	binary_helper::global::GlobalCtx
	+ binary_helper::global::GlobalConfigProvider<ApiConfig>
	+ binary_helper::global::GlobalConfigProvider<BackendConfig>
	+ binary_helper::global::GlobalConfigProvider<StorageConfig>
	+ binary_helper::global::GlobalConfigProvider<FeedConfig>
	+ binary_helper::global::GlobalConfig
	+ DirectoryState
	+ Send
	+ Sync
	+ 'static
{
}

impl<T> DirectoryGlobal for T where
	T: binary_helper::global::GlobalCtx
		+ binary_helper::global::GlobalConfigProvider<ApiConfig>
		+ binary_helper::global::GlobalConfigProvider<BackendConfig>
		+ binary_helper::global::GlobalConfigProvider<StorageConfig>
		+ binary_helper::global::GlobalConfigProvider<FeedConfig>
		+ binary_helper::global::GlobalConfig
		+ DirectoryState
		+ Send
		+ Sync
		+ 'static
{
}
