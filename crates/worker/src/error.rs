use std::io;
use std::time::Duration;

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Supervisor errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// No worker process is live.
	#[error("worker is not running")]
	NotRunning,
	/// The worker process could not be spawned.
	#[error("failed to launch worker: {0}")]
	Launch(#[source] io::Error),
	/// The configured request timeout elapsed.
	#[error("request timed out after {0:?}")]
	Timeout(Duration),
	/// The connection to the worker failed or the worker answered with an error.
	#[error(transparent)]
	Rpc(#[from] fmtkit_rpc::Error),
}
