//! Spawning worker processes.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};

/// Exit and kill control over a launched process.
#[async_trait]
pub trait ProcessControl: Send + 'static {
	/// Waits for the process to exit and returns its exit code, `None` when
	/// it was terminated by a signal.
	async fn wait(&mut self) -> io::Result<Option<i32>>;

	/// Starts killing the process without waiting for it to exit.
	fn start_kill(&mut self) -> io::Result<()>;

	/// OS process id, if there is one.
	fn id(&self) -> Option<u32> {
		None
	}
}

/// A launched worker: the pipes the protocol runs over and its control handle.
pub struct WorkerProcess {
	/// The worker's stdin.
	pub stdin: Box<dyn AsyncWrite + Send + Unpin>,
	/// The worker's stdout.
	pub stdout: Box<dyn AsyncRead + Send + Unpin>,
	/// Exit and kill control.
	pub control: Box<dyn ProcessControl>,
}

impl fmt::Debug for WorkerProcess {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WorkerProcess").field("pid", &self.control.id()).finish_non_exhaustive()
	}
}

/// Launches worker processes.
#[async_trait]
pub trait WorkerLauncher: Send + Sync + 'static {
	/// Launches a worker. `module_path` locates the formatter the worker
	/// should load, when configured.
	async fn launch(&self, module_path: Option<&Path>) -> io::Result<WorkerProcess>;
}

/// Launches the worker as a child process with piped stdio.
///
/// The module path, when given, is appended as the last argument.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
	program: PathBuf,
	args: Vec<OsString>,
	env: Vec<(OsString, OsString)>,
	current_dir: Option<PathBuf>,
	inherit_stderr: bool,
}

impl CommandLauncher {
	/// Creates a launcher for `program`.
	pub fn new(program: impl Into<PathBuf>) -> Self {
		Self {
			program: program.into(),
			args: Vec::new(),
			env: Vec::new(),
			current_dir: None,
			inherit_stderr: false,
		}
	}

	/// Appends an argument.
	#[must_use]
	pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
		self.args.push(arg.into());
		self
	}

	/// Appends arguments.
	#[must_use]
	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<OsString>,
	{
		self.args.extend(args.into_iter().map(Into::into));
		self
	}

	/// Sets an environment variable for the worker.
	#[must_use]
	pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
		self.env.push((key.into(), value.into()));
		self
	}

	/// Sets the worker's working directory.
	#[must_use]
	pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.current_dir = Some(dir.into());
		self
	}

	/// Passes the worker's stderr through instead of discarding it.
	#[must_use]
	pub fn inherit_stderr(mut self, inherit: bool) -> Self {
		self.inherit_stderr = inherit;
		self
	}

	/// The program this launcher runs.
	pub fn program(&self) -> &Path {
		&self.program
	}
}

#[async_trait]
impl WorkerLauncher for CommandLauncher {
	async fn launch(&self, module_path: Option<&Path>) -> io::Result<WorkerProcess> {
		let mut cmd = Command::new(&self.program);
		cmd.args(&self.args)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(if self.inherit_stderr { Stdio::inherit() } else { Stdio::null() })
			.kill_on_drop(true);
		if let Some(path) = module_path {
			cmd.arg(path);
		}
		for (key, value) in &self.env {
			cmd.env(key, value);
		}
		if let Some(dir) = &self.current_dir {
			cmd.current_dir(dir);
		}

		let mut child = cmd.spawn()?;
		let stdin = child.stdin.take().ok_or_else(|| io::Error::other("failed to capture worker stdin"))?;
		let stdout = child.stdout.take().ok_or_else(|| io::Error::other("failed to capture worker stdout"))?;
		tracing::debug!(program = %self.program.display(), pid = ?child.id(), "worker.spawned");

		Ok(WorkerProcess {
			stdin: Box::new(stdin),
			stdout: Box::new(stdout),
			control: Box::new(ChildControl(child)),
		})
	}
}

struct ChildControl(Child);

#[async_trait]
impl ProcessControl for ChildControl {
	async fn wait(&mut self) -> io::Result<Option<i32>> {
		Ok(self.0.wait().await?.code())
	}

	fn start_kill(&mut self) -> io::Result<()> {
		self.0.start_kill()
	}

	fn id(&self) -> Option<u32> {
		self.0.id()
	}
}
