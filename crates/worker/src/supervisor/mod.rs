use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use fmtkit_rpc::{JsonValue, MainLoop, PeerSocket, Router};
use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use crate::launcher::{ProcessControl, WorkerLauncher, WorkerProcess};
use crate::state::{Readiness, StartFailure, WorkerEvent, WorkerState};
use crate::token::{ExitToken, GenerationClock};
use crate::{Error, Result};

/// Supervisor configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
	pub(crate) restart_cooldown: Duration,
	pub(crate) stop_timeout: Duration,
	pub(crate) request_timeout: Option<Duration>,
	pub(crate) event_buffer: usize,
}

impl SupervisorConfig {
	/// Sets the window in which a second crash suspends automatic restarts.
	#[must_use]
	pub fn restart_cooldown(mut self, cooldown: Duration) -> Self {
		self.restart_cooldown = cooldown;
		self
	}

	/// Sets how long [`WorkerSupervisor::stop`] waits for the process to exit.
	#[must_use]
	pub fn stop_timeout(mut self, timeout: Duration) -> Self {
		self.stop_timeout = timeout;
		self
	}

	/// Sets a deadline for every request; `None` waits indefinitely.
	#[must_use]
	pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.request_timeout = timeout;
		self
	}

	/// Sets the event broadcast buffer capacity.
	///
	/// # Panics
	///
	/// Panics if `size` is zero.
	#[must_use]
	pub fn event_buffer(mut self, size: usize) -> Self {
		assert!(size > 0, "event buffer size must be > 0");
		self.event_buffer = size;
		self
	}
}

impl Default for SupervisorConfig {
	fn default() -> Self {
		Self {
			restart_cooldown: Duration::from_secs(5),
			stop_timeout: Duration::from_secs(2),
			request_timeout: None,
			event_buffer: 64,
		}
	}
}

/// Owns one worker process at a time.
///
/// Cloning yields another handle to the same supervisor. Dropping the last
/// handle kills the live worker.
#[derive(Clone)]
pub struct WorkerSupervisor {
	inner: Arc<Inner>,
}

impl std::fmt::Debug for WorkerSupervisor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WorkerSupervisor")
			.field("state", &self.state())
			.field("readiness", &self.readiness())
			.finish_non_exhaustive()
	}
}

struct Inner {
	launcher: Arc<dyn WorkerLauncher>,
	config: SupervisorConfig,
	clock: GenerationClock,
	shared: Mutex<Shared>,
	ready: watch::Sender<Readiness>,
	events: broadcast::Sender<WorkerEvent>,
	/// Serializes launches.
	launching: tokio::sync::Mutex<()>,
}

struct Shared {
	state: WorkerState,
	module_path: Option<PathBuf>,
	live: Option<LiveWorker>,
	last_crash: Option<Instant>,
}

/// The process of the current generation.
struct LiveWorker {
	token: ExitToken,
	socket: PeerSocket,
	mainloop: Option<AbortHandle>,
	/// Set once the worker reported `startDidFail`; its exit is not a crash.
	start_failed: bool,
}

impl LiveWorker {
	/// Kills the process and drops its connection.
	fn teardown(&self) {
		self.token.kill();
		if let Some(mainloop) = &self.mainloop {
			mainloop.abort();
		}
	}
}

impl Drop for Inner {
	fn drop(&mut self) {
		if let Some(live) = self.shared.get_mut().live.take() {
			live.teardown();
		}
	}
}

impl WorkerSupervisor {
	/// Creates a supervisor; nothing is launched until [`start`](Self::start).
	pub fn new(launcher: Arc<dyn WorkerLauncher>, config: SupervisorConfig) -> Self {
		let (events, _) = broadcast::channel(config.event_buffer);
		let (ready, _) = watch::channel(Readiness::NotReady);
		Self {
			inner: Arc::new(Inner {
				launcher,
				config,
				clock: GenerationClock::default(),
				shared: Mutex::new(Shared {
					state: WorkerState::NotStarted,
					module_path: None,
					live: None,
					last_crash: None,
				}),
				ready,
				events,
				launching: tokio::sync::Mutex::new(()),
			}),
		}
	}

	/// Launches the worker unless one is already starting or running.
	///
	/// Waits for an in-flight [`stop`](Self::stop) first. Returns once the
	/// process is spawned; use [`ready`](Self::ready) to await the handshake.
	///
	/// # Errors
	///
	/// Returns `Error::Launch` when the process cannot be spawned.
	pub async fn start(&self, module_path: Option<PathBuf>) -> Result<()> {
		self.inner.shared.lock().module_path = module_path;
		self.inner.launch(false).await
	}

	/// Stops the worker and waits for it to exit.
	///
	/// Readiness flips to not-ready immediately. Calling `stop` again while a
	/// stop is in flight waits for the same exit.
	pub async fn stop(&self) {
		let token = {
			let mut shared = self.inner.shared.lock();
			match shared.live.as_ref() {
				Some(live) => {
					let token = live.token.clone();
					if shared.state != WorkerState::Stopping {
						info!(generation = token.generation(), "worker.stopping");
						shared.state = WorkerState::Stopping;
						token.kill();
					}
					Some(token)
				}
				None => {
					// Also cancels a pending automatic restart.
					if shared.state != WorkerState::NotStarted {
						shared.state = WorkerState::Stopped;
					}
					None
				}
			}
		};
		self.inner.ready.send_replace(Readiness::NotReady);

		let Some(token) = token else {
			return;
		};
		let generation = token.generation();
		if tokio::time::timeout(self.inner.config.stop_timeout, token.exited()).await.is_err() {
			warn!(generation, timeout = ?self.inner.config.stop_timeout, "worker.stop_timeout");
			self.inner.on_exit(generation, None);
		}
	}

	/// Stops and starts the worker with the current module path.
	///
	/// # Errors
	///
	/// Returns `Error::Launch` when the process cannot be spawned.
	pub async fn restart(&self) -> Result<()> {
		self.stop().await;
		self.inner.launch(false).await
	}

	/// Waits until no start is pending; returns whether the worker is ready.
	pub async fn ready(&self) -> bool {
		let mut rx = self.inner.ready.subscribe();
		match rx.wait_for(|readiness| *readiness != Readiness::Pending).await {
			Ok(readiness) => *readiness == Readiness::Ready,
			Err(_) => false,
		}
	}

	/// Current readiness without waiting.
	pub fn readiness(&self) -> Readiness {
		*self.inner.ready.borrow()
	}

	/// Returns true when the handshake completed.
	pub fn is_ready(&self) -> bool {
		self.readiness() == Readiness::Ready
	}

	/// Current lifecycle state.
	pub fn state(&self) -> WorkerState {
		self.inner.shared.lock().state
	}

	/// Subscribes to lifecycle events.
	pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
		self.inner.events.subscribe()
	}

	/// Sends a request to the live worker.
	///
	/// # Errors
	///
	/// - `Error::NotRunning` when no worker is live.
	/// - `Error::Timeout` when the configured request timeout elapses.
	/// - `Error::Rpc` when the connection stops or the worker answers with an error.
	pub async fn request(&self, method: &str, params: JsonValue) -> Result<JsonValue> {
		let socket = self
			.inner
			.shared
			.lock()
			.live
			.as_ref()
			.map(|live| live.socket.clone())
			.ok_or(Error::NotRunning)?;

		let response = socket.request(method, params);
		match self.inner.config.request_timeout {
			Some(timeout) => tokio::time::timeout(timeout, response)
				.await
				.map_err(|_| Error::Timeout(timeout))?
				.map_err(Error::from),
			None => Ok(response.await?),
		}
	}
}

impl Inner {
	fn emit(&self, event: WorkerEvent) {
		let _ = self.events.send(event);
	}

	async fn launch(self: &Arc<Self>, automatic: bool) -> Result<()> {
		let _guard = self.launching.lock().await;

		let stopping = {
			let shared = self.shared.lock();
			match (shared.state, shared.live.as_ref()) {
				(WorkerState::Stopping, Some(live)) => Some(live.token.clone()),
				_ => None,
			}
		};
		if let Some(token) = stopping {
			let generation = token.generation();
			if tokio::time::timeout(self.config.stop_timeout, token.exited()).await.is_err() {
				warn!(generation, timeout = ?self.config.stop_timeout, "worker.stop_timeout");
				self.on_exit(generation, None);
			}
		}

		let module_path = {
			let mut shared = self.shared.lock();
			if automatic && shared.state != WorkerState::Crashed {
				debug!(state = ?shared.state, "worker.restart_skipped");
				return Ok(());
			}
			if matches!(shared.state, WorkerState::Starting | WorkerState::Ready) {
				return Ok(());
			}
			shared.state = WorkerState::Starting;
			if !automatic {
				shared.last_crash = None;
			}
			shared.module_path.clone()
		};
		self.ready.send_replace(Readiness::Pending);

		let generation = self.clock.next();
		info!(generation, module_path = ?module_path, "worker.starting");

		let process = match self.launcher.launch(module_path.as_deref()).await {
			Ok(process) => process,
			Err(e) => {
				error!(generation, error = %e, "worker.launch_failed");
				self.shared.lock().state = WorkerState::Stopped;
				self.ready.send_replace(Readiness::NotReady);
				self.emit(WorkerEvent::StartFailed(StartFailure {
					name: "LaunchError".into(),
					message: e.to_string(),
					stack: None,
				}));
				return Err(Error::Launch(e));
			}
		};
		let WorkerProcess { stdin, stdout, mut control } = process;

		let (handshake_tx, handshake_rx) = oneshot::channel();
		let (mainloop, socket) = MainLoop::new(handshake_router(handshake_tx));
		let (token, exited_tx) = ExitToken::new(generation);

		{
			let mut shared = self.shared.lock();
			if shared.state != WorkerState::Starting {
				// Stopped while the process was spawning.
				drop(shared);
				debug!(generation, "worker.start_cancelled");
				let _ = control.start_kill();
				return Ok(());
			}
			let previous = shared.live.replace(LiveWorker {
				token: token.clone(),
				socket,
				mainloop: None,
				start_failed: false,
			});
			if let Some(previous) = previous {
				debug!(generation = previous.token.generation(), "worker.replaced");
				previous.teardown();
			}
		}

		let loop_token = token.clone();
		let mainloop = tokio::spawn(async move {
			match mainloop.run(stdout, stdin).await {
				Ok(()) => debug!(generation, "worker.connection_closed"),
				Err(e) => {
					// Protocol errors tear the process down; the exit takes the crash path.
					warn!(generation, error = %e, "worker.protocol_error");
					loop_token.kill();
				}
			}
		});
		if let Some(live) = self.shared.lock().live.as_mut() {
			live.mainloop = Some(mainloop.abort_handle());
		}

		tokio::spawn(monitor(Arc::downgrade(self), token, control, exited_tx));
		tokio::spawn(handshake(Arc::downgrade(self), generation, handshake_rx));
		Ok(())
	}

	fn on_handshake(&self, generation: u64, outcome: Result<(), StartFailure>) {
		let mut shared = self.shared.lock();
		let current = shared.live.as_ref().is_some_and(|live| live.token.generation() == generation);
		if !current {
			return;
		}

		match outcome {
			Ok(()) => {
				if shared.state != WorkerState::Starting {
					return;
				}
				shared.state = WorkerState::Ready;
				drop(shared);
				info!(generation, "worker.ready");
				self.ready.send_replace(Readiness::Ready);
				self.emit(WorkerEvent::Ready { generation });
			}
			Err(failure) => {
				let token = shared.live.as_mut().map(|live| {
					live.start_failed = true;
					live.token.clone()
				});
				drop(shared);
				error!(generation, name = %failure.name, message = %failure.message, "worker.start_failed");
				if let Some(stack) = &failure.stack {
					debug!(generation, stack = %stack, "worker.start_failed.stack");
				}
				self.ready.send_replace(Readiness::NotReady);
				self.emit(WorkerEvent::StartFailed(failure));
				// Not retried: the exit lands in `Stopped`.
				if let Some(token) = token {
					token.kill();
				}
			}
		}
	}

	fn on_exit(self: &Arc<Self>, generation: u64, code: Option<i32>) {
		let mut shared = self.shared.lock();
		let Some(live) = shared.live.take_if(|live| live.token.generation() == generation) else {
			debug!(generation, "worker.exit.stale");
			return;
		};
		if let Some(mainloop) = &live.mainloop {
			mainloop.abort();
		}
		self.ready.send_replace(Readiness::NotReady);

		if shared.state == WorkerState::Stopping || live.start_failed {
			shared.state = WorkerState::Stopped;
			drop(shared);
			info!(generation, ?code, "worker.stopped");
			self.emit(WorkerEvent::Stopped { generation });
			return;
		}

		shared.state = WorkerState::Crashed;
		let now = Instant::now();
		let crash_loop = shared
			.last_crash
			.is_some_and(|last| now.duration_since(last) < self.config.restart_cooldown);
		shared.last_crash = Some(now);
		drop(shared);

		warn!(generation, ?code, "worker.crashed");
		self.emit(WorkerEvent::Crashed { generation, code });
		if crash_loop {
			error!(generation, cooldown = ?self.config.restart_cooldown, "worker.crash_loop");
			self.emit(WorkerEvent::NeedsRestart);
			return;
		}

		self.emit(WorkerEvent::Restarting { generation });
		let this = Arc::clone(self);
		tokio::spawn(async move {
			if let Err(e) = this.launch(true).await {
				warn!(error = %e, "worker.restart_failed");
			}
		});
	}
}

/// Router for the worker's lifecycle notifications; the first of
/// `didStart` / `startDidFail` resolves `tx`.
fn handshake_router(tx: oneshot::Sender<Result<(), StartFailure>>) -> Router {
	let tx = Arc::new(Mutex::new(Some(tx)));
	let mut router = Router::new();

	let did_start = Arc::clone(&tx);
	router.notification("didStart", move |_| {
		if let Some(tx) = did_start.lock().take() {
			let _ = tx.send(Ok(()));
		}
	});
	router.notification("startDidFail", move |params| {
		let failure = serde_json::from_value(params).unwrap_or_else(|e| StartFailure {
			name: "Error".into(),
			message: format!("malformed startDidFail payload: {e}"),
			stack: None,
		});
		if let Some(tx) = tx.lock().take() {
			let _ = tx.send(Err(failure));
		}
	});
	router
}

async fn handshake(inner: Weak<Inner>, generation: u64, rx: oneshot::Receiver<Result<(), StartFailure>>) {
	// A dropped sender means the connection closed first; the exit path covers it.
	let Ok(outcome) = rx.await else {
		return;
	};
	if let Some(inner) = inner.upgrade() {
		inner.on_handshake(generation, outcome);
	}
}

async fn monitor(inner: Weak<Inner>, token: ExitToken, mut control: Box<dyn ProcessControl>, exited: watch::Sender<bool>) {
	let generation = token.generation();
	let status = tokio::select! {
		status = control.wait() => status,
		() = token.killed() => {
			if let Err(e) = control.start_kill() {
				debug!(generation, error = %e, "worker.kill_failed");
			}
			control.wait().await
		}
	};
	let code = status.unwrap_or_else(|e| {
		warn!(generation, error = %e, "worker.wait_failed");
		None
	});

	if let Some(inner) = inner.upgrade() {
		inner.on_exit(generation, code);
	}
	let _ = exited.send(true);
}

#[cfg(test)]
mod tests;
