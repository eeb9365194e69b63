use futures_util::future::select_all;
use futures_util::FutureExt;
use tokio::signal::unix::{Signal, SignalKind};

/// Waits on any number of unix signals at once.
#[derive(Default)]
pub struct SignalHandler {
	signals: Vec<(SignalKind, Signal)>,
}

impl SignalHandler {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_signal(mut self, kind: SignalKind) -> std::io::Result<Self> {
		let signal = tokio::signal::unix::signal(kind)?;
		self.signals.push((kind, signal));
		Ok(self)
	}

	/// Returns the kind of the next signal received. Pends forever when no
	/// signals are registered.
	pub async fn recv(&mut self) -> SignalKind {
		if self.signals.is_empty() {
			return std::future::pending().await;
		}

		let futures = self
			.signals
			.iter_mut()
			.map(|(kind, signal)| {
				let kind = *kind;
				async move {
					signal.recv().await;
					kind
				}
				.boxed()
			})
			.collect::<Vec<_>>();

		let (kind, _, _) = select_all(futures).await;
		kind
	}
}
