use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use binary_helper::config::TlsConfig;
use serde::{Deserialize, Serialize};

/// The directory extension of the application config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
	/// HTTP server configuration
	pub api: ApiConfig,

	/// Hosted backend configuration
	pub backend: BackendConfig,

	/// Object storage configuration
	pub storage: StorageConfig,

	/// Listing limits
	pub feed: FeedConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
	/// Bind address for the API
	pub bind_address: SocketAddr,

	/// If we should use TLS for the API server
	pub tls: Option<TlsConfig>,

	/// The public origin of the site, used for email confirmation redirects
	pub site_url: String,

	/// Mark session cookies as `Secure`
	pub secure_cookies: bool,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			bind_address: SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 4000),
			tls: None,
			site_url: "http://localhost:4000".to_owned(),
			secure_cookies: false,
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
	/// The hosted service over HTTP
	#[default]
	Http,
	/// An in-process store, for local development
	Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
	pub kind: BackendKind,

	/// Base URL of the hosted service, e.g. `https://xyz.supabase.co`
	pub url: Option<String>,

	/// The public (anon) API key
	pub anon_key: Option<String>,

	/// When set, access tokens are verified locally instead of asking the
	/// backend for the user on every request
	pub jwt_secret: Option<String>,

	/// Request timeout for backend calls
	pub timeout_secs: u64,

	/// Sign ups on the in-process backend start confirmed
	pub auto_confirm: bool,

	/// Refuse to start without a configured backend instead of serving empty
	/// public pages
	pub required: bool,
}

impl Default for BackendConfig {
	fn default() -> Self {
		Self {
			kind: BackendKind::Http,
			url: None,
			anon_key: None,
			jwt_secret: None,
			timeout_secs: 10,
			auto_confirm: true,
			required: false,
		}
	}
}

impl BackendConfig {
	/// Whether enough is configured to talk to a backend at all.
	pub fn is_configured(&self) -> bool {
		match self.kind {
			BackendKind::Memory => true,
			BackendKind::Http => {
				self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
					&& self.anon_key.as_deref().is_some_and(|k| !k.trim().is_empty())
			}
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
	pub logo_bucket: String,
	pub update_image_bucket: String,

	/// Maximum logo size in bytes
	pub max_logo_size: usize,

	/// Maximum size of a single update image in bytes
	pub max_update_image_size: usize,

	/// Maximum number of images attached to one update
	pub max_update_images: usize,

	pub cache_control_seconds: u64,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			logo_bucket: "startup-logos".to_owned(),
			update_image_bucket: "update-images".to_owned(),
			max_logo_size: 5 * 1024 * 1024,
			max_update_image_size: 5 * 1024 * 1024,
			max_update_images: 4,
			cache_control_seconds: 3600,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
	/// Number of updates on the landing feed
	pub limit: usize,

	/// Number of updates on a public profile page
	pub profile_updates_limit: usize,

	/// Number of recent updates on the dashboard overview
	pub dashboard_recent_limit: usize,
}

impl Default for FeedConfig {
	fn default() -> Self {
		Self {
			limit: 20,
			profile_updates_limit: 10,
			dashboard_recent_limit: 5,
		}
	}
}

impl binary_helper::config::ConfigExtention for DirectoryConfig {
	const APP_NAME: &'static str = "directory";
	const ENV_PREFIX: &'static str = "DIRECTORY";

	fn pre_hook(config: &mut AppConfig) -> anyhow::Result<()> {
		let backend = &config.extra.backend;

		if backend.required && !backend.is_configured() {
			anyhow::bail!("backend.url and backend.anon_key must be set when backend.required is true");
		}

		if let Some(url) = backend.url.as_deref().filter(|u| !u.trim().is_empty()) {
			url::Url::parse(url).map_err(|err| anyhow::anyhow!("invalid backend.url: {err}"))?;
		}

		if backend.timeout_secs == 0 {
			anyhow::bail!("backend.timeout_secs must be greater than zero");
		}

		Ok(())
	}
}

pub type AppConfig = binary_helper::config::AppConfig<DirectoryConfig>;
