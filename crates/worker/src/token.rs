use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Monotonic generation counter; every launched process gets a fresh one.
#[derive(Debug, Default)]
pub(crate) struct GenerationClock {
	last: AtomicU64,
}

impl GenerationClock {
	/// Returns the next generation, starting at 1.
	pub fn next(&self) -> u64 {
		self.last.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}
}

/// Kill switch and exit signal for one process generation.
#[derive(Debug, Clone)]
pub(crate) struct ExitToken {
	generation: u64,
	kill: CancellationToken,
	exited: watch::Receiver<bool>,
}

impl ExitToken {
	/// Creates a token and the sender that marks the process as exited.
	pub fn new(generation: u64) -> (Self, watch::Sender<bool>) {
		let (tx, exited) = watch::channel(false);
		let token = Self {
			generation,
			kill: CancellationToken::new(),
			exited,
		};
		(token, tx)
	}

	pub const fn generation(&self) -> u64 {
		self.generation
	}

	/// Asks the monitor task to kill the process.
	pub fn kill(&self) {
		self.kill.cancel();
	}

	/// Resolves once [`kill`](Self::kill) was called.
	pub async fn killed(&self) {
		self.kill.cancelled().await;
	}

	/// Resolves once the process has exited and the supervisor state reflects it.
	pub async fn exited(mut self) {
		let _ = self.exited.wait_for(|exited| *exited).await;
	}
}
