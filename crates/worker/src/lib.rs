//! Supervision of a long-lived formatter worker process.
//!
//! A [`WorkerSupervisor`] owns at most one worker process at a time. It
//! launches the process through a [`WorkerLauncher`], talks JSON-RPC over the
//! process's stdio, tracks the `didStart` / `startDidFail` handshake behind a
//! readiness gate, and restarts the worker once after an unexpected exit. A
//! second crash inside the restart cooldown stops the automatic restarts and
//! reports [`WorkerEvent::NeedsRestart`] instead.

#![warn(missing_docs)]

mod error;
mod launcher;
mod state;
mod supervisor;
mod token;

pub use error::{Error, Result};
pub use launcher::{CommandLauncher, ProcessControl, WorkerLauncher, WorkerProcess};
pub use state::{Readiness, StartFailure, WorkerEvent, WorkerState};
pub use supervisor::{SupervisorConfig, WorkerSupervisor};
