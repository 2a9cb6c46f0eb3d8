//! End-to-end runs through a supervised worker speaking the stdio protocol
//! over in-memory pipes.

use std::io;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use fmtkit_format::{
	EditorHost, FormatError, FormatOutcome, FormatOutput, FormatParams, FormatSession, FormatTrigger, HasConfigParams,
	MemoryHost, Notice, Notifier, SelectionRange, Settings, SkipReason, SubprocessFormatter,
};
use fmtkit_rpc::{ErrorCode, JsonValue, MainLoop, ResponseError, Router};
use fmtkit_worker::{ProcessControl, SupervisorConfig, WorkerLauncher, WorkerProcess};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// Spaces out `=` and terminates the statement.
fn toy_format(text: &str) -> String {
	let spaced = text.replace('=', " = ");
	let trimmed = spaced.trim_end();
	if trimmed.ends_with(';') { format!("{trimmed}\n") } else { format!("{trimmed};\n") }
}

fn invalid_params(error: serde_json::Error) -> ResponseError {
	ResponseError::new(ErrorCode::INVALID_PARAMS, error.to_string())
}

async fn handle_format(params: JsonValue) -> Result<JsonValue, ResponseError> {
	let params: FormatParams = serde_json::from_value(params).map_err(invalid_params)?;
	let is_ignored = params
		.options
		.filepath
		.as_deref()
		.is_some_and(|p| p.ends_with("vendor.js"));
	let output = if params.ignore_path.is_some() && is_ignored {
		FormatOutput::ignored()
	} else {
		FormatOutput::formatted(toy_format(&params.original))
	};
	Ok(serde_json::to_value(output).expect("serialize output"))
}

async fn handle_has_config(params: JsonValue) -> Result<JsonValue, ResponseError> {
	let params: HasConfigParams = serde_json::from_value(params).map_err(invalid_params)?;
	let found = params.path_for_config.is_some_and(|p| p.starts_with("/configured"));
	Ok(JsonValue::Bool(found))
}

struct ToyLauncher;

#[async_trait]
impl WorkerLauncher for ToyLauncher {
	async fn launch(&self, _module_path: Option<&Path>) -> io::Result<WorkerProcess> {
		let (host, worker) = tokio::io::duplex(64 * 1024);
		let (host_read, host_write) = tokio::io::split(host);
		let (worker_read, worker_write) = tokio::io::split(worker);

		let mut router = Router::new();
		router.request("format", handle_format).request("hasConfig", handle_has_config);
		let (mainloop, socket) = MainLoop::new(router);
		let task = tokio::spawn(async move {
			let _ = socket.notify("didStart", JsonValue::Null);
			let _ = mainloop.run(worker_read, worker_write).await;
		});

		let (exit_tx, exit_rx) = mpsc::unbounded_channel();
		Ok(WorkerProcess {
			stdin: Box::new(host_write),
			stdout: Box::new(host_read),
			control: Box::new(ToyControl {
				exit_tx,
				exit_rx,
				worker: task.abort_handle(),
			}),
		})
	}
}

struct ToyControl {
	exit_tx: mpsc::UnboundedSender<Option<i32>>,
	exit_rx: mpsc::UnboundedReceiver<Option<i32>>,
	worker: AbortHandle,
}

#[async_trait]
impl ProcessControl for ToyControl {
	async fn wait(&mut self) -> io::Result<Option<i32>> {
		let code = self.exit_rx.recv().await.flatten();
		self.worker.abort();
		Ok(code)
	}

	fn start_kill(&mut self) -> io::Result<()> {
		let _ = self.exit_tx.send(None);
		Ok(())
	}
}

#[derive(Default)]
struct Notices(Mutex<Vec<&'static str>>);

impl Notifier for Notices {
	fn notify(&self, notice: Notice) {
		self.0.lock().push(notice.id);
	}
}

async fn started_session() -> (FormatSession, Arc<Notices>) {
	let formatter = SubprocessFormatter::new(Arc::new(ToyLauncher), SupervisorConfig::default());
	let notices = Arc::new(Notices::default());
	let session = FormatSession::new(Arc::new(formatter), Settings::default(), notices.clone());
	session.start().await.expect("start");
	(session, notices)
}

#[tokio::test]
async fn caret_survives_a_worker_round_trip() {
	let (session, _) = started_session().await;
	let host = MemoryHost::new("const x=1")
		.with_path("/configured/a.js")
		.with_selections(vec![SelectionRange::caret(6)]);

	let outcome = session.format_document(&host, FormatTrigger::Command).await.expect("format");
	assert!(matches!(outcome, FormatOutcome::Applied { tracked: true, .. }));
	assert_eq!(host.text(), "const x = 1;\n");
	assert_eq!(host.selections(), vec![SelectionRange::caret(6)]);

	session.stop().await;
}

#[tokio::test]
async fn multiple_selections_survive() {
	let (session, _) = started_session().await;
	let host = MemoryHost::new("a=1\nb=2").with_selections(vec![SelectionRange::new(0, 1), SelectionRange::new(4, 5)]);

	session.format_document(&host, FormatTrigger::Command).await.expect("format");
	assert_eq!(host.text(), "a = 1\nb = 2;\n");
	assert_eq!(host.selections(), vec![SelectionRange::new(0, 1), SelectionRange::new(6, 7)]);
}

#[tokio::test]
async fn ignore_file_only_applies_on_save() {
	let (session, _) = started_session().await;
	let host = MemoryHost::new("x=1").with_path("/configured/vendor.js");

	assert_eq!(
		session.format_document(&host, FormatTrigger::Save).await.expect("save"),
		FormatOutcome::Skipped(SkipReason::Ignored)
	);
	assert_eq!(host.text(), "x=1");

	session.format_document(&host, FormatTrigger::Command).await.expect("command");
	assert_eq!(host.text(), "x = 1;\n");
}

#[tokio::test]
async fn has_config_reaches_the_worker() {
	let (session, _) = started_session().await;
	let formatter = session.formatter();

	let configured = HasConfigParams {
		path_for_config: Some("/configured/a.js".into()),
	};
	assert!(formatter.has_config(configured).await.expect("hasConfig"));
	let bare = HasConfigParams {
		path_for_config: Some("/tmp/a.js".into()),
	};
	assert!(!formatter.has_config(bare).await.expect("hasConfig"));
}

#[tokio::test]
async fn stopped_worker_reports_not_running() {
	let (session, notices) = started_session().await;
	session.stop().await;

	let host = MemoryHost::new("a=1");
	let err = session.format_document(&host, FormatTrigger::Command).await;
	assert!(matches!(err, Err(FormatError::NotReady)));
	assert_eq!(*notices.0.lock(), vec!["fmtkit.not-running"]);

	session.restart().await.expect("restart");
	session.format_document(&host, FormatTrigger::Command).await.expect("format");
	assert_eq!(host.text(), "a = 1;\n");
}
