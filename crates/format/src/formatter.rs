//! The formatter capability and its two implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use fmtkit_worker::{SupervisorConfig, WorkerEvent, WorkerLauncher, WorkerSupervisor};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::{FormatError, Result};
use crate::request::{FormatOutput, FormatParams, HasConfigParams};

/// Something that formats text.
#[async_trait]
pub trait Formatter: Send + Sync {
	/// Starts the formatter. A no-op when it is already running.
	///
	/// # Errors
	///
	/// Returns an error when the formatter cannot be launched.
	async fn start(&self, module_path: Option<PathBuf>) -> Result<()>;

	/// Stops the formatter.
	async fn stop(&self);

	/// Waits for any pending start and returns whether the formatter is ready.
	async fn is_ready(&self) -> bool;

	/// Asks whether the project at `params.path_for_config` has formatter
	/// configuration.
	///
	/// # Errors
	///
	/// Returns an error when the formatter cannot be reached.
	async fn has_config(&self, params: HasConfigParams) -> Result<bool>;

	/// Formats one document.
	///
	/// # Errors
	///
	/// Returns an error when the formatter cannot be reached; formatter
	/// failures are reported as [`FormatOutput::Error`].
	async fn format_once(&self, params: FormatParams) -> Result<FormatOutput>;

	/// Lifecycle events, for formatters that have a lifecycle worth reporting.
	fn events(&self) -> Option<broadcast::Receiver<WorkerEvent>> {
		None
	}
}

/// A [`Formatter`] backed by a supervised worker process.
#[derive(Debug, Clone)]
pub struct SubprocessFormatter {
	supervisor: WorkerSupervisor,
}

impl SubprocessFormatter {
	/// Creates a formatter that launches workers through `launcher`.
	pub fn new(launcher: Arc<dyn WorkerLauncher>, config: SupervisorConfig) -> Self {
		Self {
			supervisor: WorkerSupervisor::new(launcher, config),
		}
	}

	/// The underlying supervisor.
	pub fn supervisor(&self) -> &WorkerSupervisor {
		&self.supervisor
	}
}

#[async_trait]
impl Formatter for SubprocessFormatter {
	async fn start(&self, module_path: Option<PathBuf>) -> Result<()> {
		Ok(self.supervisor.start(module_path).await?)
	}

	async fn stop(&self) {
		self.supervisor.stop().await;
	}

	async fn is_ready(&self) -> bool {
		self.supervisor.ready().await
	}

	async fn has_config(&self, params: HasConfigParams) -> Result<bool> {
		let value = self.supervisor.request("hasConfig", serde_json::to_value(params)?).await?;
		Ok(serde_json::from_value(value)?)
	}

	async fn format_once(&self, params: FormatParams) -> Result<FormatOutput> {
		let value = self.supervisor.request("format", serde_json::to_value(params)?).await?;
		Ok(serde_json::from_value(value)?)
	}

	fn events(&self) -> Option<broadcast::Receiver<WorkerEvent>> {
		Some(self.supervisor.subscribe())
	}
}

/// Formats text inside the current process.
#[async_trait]
pub trait FormatEngine: Send + Sync + 'static {
	/// Formats one document.
	async fn format(&self, params: FormatParams) -> FormatOutput;

	/// Whether the project has formatter configuration.
	async fn has_config(&self, params: HasConfigParams) -> bool {
		let _ = params;
		false
	}
}

/// A [`Formatter`] running a [`FormatEngine`] in-process.
pub struct InProcessFormatter {
	engine: Arc<dyn FormatEngine>,
	running: AtomicBool,
}

impl std::fmt::Debug for InProcessFormatter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("InProcessFormatter")
			.field("running", &self.running.load(Ordering::Relaxed))
			.finish_non_exhaustive()
	}
}

impl InProcessFormatter {
	/// Wraps `engine`; call [`Formatter::start`] before formatting.
	pub fn new(engine: Arc<dyn FormatEngine>) -> Self {
		Self {
			engine,
			running: AtomicBool::new(false),
		}
	}

	fn ensure_running(&self) -> Result<()> {
		if self.running.load(Ordering::Acquire) { Ok(()) } else { Err(FormatError::NotReady) }
	}
}

#[async_trait]
impl Formatter for InProcessFormatter {
	async fn start(&self, module_path: Option<PathBuf>) -> Result<()> {
		if !self.running.swap(true, Ordering::AcqRel) {
			info!(module_path = ?module_path, "in-process formatter started");
		}
		Ok(())
	}

	async fn stop(&self) {
		if self.running.swap(false, Ordering::AcqRel) {
			debug!("in-process formatter stopped");
		}
	}

	async fn is_ready(&self) -> bool {
		self.running.load(Ordering::Acquire)
	}

	async fn has_config(&self, params: HasConfigParams) -> Result<bool> {
		self.ensure_running()?;
		Ok(self.engine.has_config(params).await)
	}

	async fn format_once(&self, params: FormatParams) -> Result<FormatOutput> {
		self.ensure_running()?;
		Ok(self.engine.format(params).await)
	}
}
