use std::sync::Arc;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

struct Inner {
	token: CancellationToken,
	_alive: oneshot::Sender<()>,
}

/// A cloneable cancellation scope.
///
/// Every clone keeps the scope alive. The matching [`Handler`] can cancel the
/// scope and then wait until every clone has been dropped, which is how the
/// process drains in-flight work on shutdown.
#[derive(Clone)]
pub struct Context(Arc<Inner>);

pub struct Handler {
	token: CancellationToken,
	alive: oneshot::Receiver<()>,
}

impl Context {
	#[must_use]
	pub fn new() -> (Self, Handler) {
		let token = CancellationToken::new();
		let (sender, alive) = oneshot::channel();

		(
			Self(Arc::new(Inner {
				token: token.clone(),
				_alive: sender,
			})),
			Handler { token, alive },
		)
	}

	pub async fn done(&self) {
		self.0.token.cancelled().await
	}

	pub fn is_done(&self) -> bool {
		self.0.token.is_cancelled()
	}
}

impl Handler {
	/// Resolves once every clone of the context has been dropped.
	pub async fn done(&mut self) {
		let _ = (&mut self.alive).await;
	}

	/// Cancels the context and waits for it to drain.
	pub async fn cancel(mut self) {
		self.token.cancel();
		self.done().await;
	}
}

impl Drop for Handler {
	fn drop(&mut self) {
		self.token.cancel();
	}
}
