use serde::{Deserialize, Serialize};

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum WorkerState {
	/// No process was ever launched.
	NotStarted,
	/// Process launched, handshake pending.
	Starting,
	/// `didStart` received.
	Ready,
	/// Stop requested, waiting for the process to exit.
	Stopping,
	/// Stopped on request or after a failed start.
	Stopped,
	/// Exited unexpectedly.
	Crashed,
}

/// Value of the readiness gate.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Readiness {
	/// A start is in progress.
	Pending,
	/// The worker completed its handshake.
	Ready,
	/// The worker is not running or failed to start.
	NotReady,
}

/// Payload of the `startDidFail` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{name}: {message}")]
pub struct StartFailure {
	/// Error class, e.g. `Error`.
	pub name: String,
	/// Human-readable message.
	pub message: String,
	/// Stack trace, if the worker has one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stack: Option<String>,
}

/// Lifecycle notification broadcast by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
	/// The worker of this generation completed its handshake.
	Ready {
		/// Process generation.
		generation: u64,
	},
	/// The worker could not start; it is not retried.
	StartFailed(StartFailure),
	/// The worker exited unexpectedly.
	Crashed {
		/// Process generation.
		generation: u64,
		/// Exit code, when the process exited normally.
		code: Option<i32>,
	},
	/// An automatic restart follows the crash of this generation.
	Restarting {
		/// Generation that crashed.
		generation: u64,
	},
	/// Crashed twice within the cooldown; automatic restarts are suspended
	/// until the user restarts the worker.
	NeedsRestart,
	/// The worker stopped on request.
	Stopped {
		/// Process generation.
		generation: u64,
	},
}
