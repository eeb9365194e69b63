use common::context::Context;

pub trait Config {
	fn parse() -> anyhow::Result<Self>
	where
		Self: Sized;

	fn logging(&self) -> &crate::config::LoggingConfig;

	fn name(&self) -> &str;

	/// Keys present in a config source that do not map onto any field.
	fn ignored_keys(&self) -> &[String] {
		&[]
	}

	fn pre_hook(&mut self) -> anyhow::Result<()> {
		Ok(())
	}
}

#[allow(async_fn_in_trait)]
pub trait Global<C: Config> {
	async fn new(ctx: Context, config: C) -> anyhow::Result<Self>
	where
		Self: Sized;
}
