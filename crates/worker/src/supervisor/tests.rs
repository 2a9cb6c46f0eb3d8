use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use fmtkit_rpc::{ErrorCode, ResponseError};
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
	Start,
	FailStart,
	FailLaunch,
	/// Starts, but only exits when told to, not when killed.
	Stubborn,
	/// Starts, then sends a frame whose body is not JSON.
	Garbage,
}

struct FakeLauncher {
	behavior: Behavior,
	launches: AtomicUsize,
	kills: Arc<AtomicUsize>,
	exits: Mutex<Vec<mpsc::UnboundedSender<Option<i32>>>>,
	module_paths: Mutex<Vec<Option<PathBuf>>>,
	/// Worker-side tasks, one per launch.
	workers: Mutex<Vec<AbortHandle>>,
}

impl FakeLauncher {
	fn new(behavior: Behavior) -> Arc<Self> {
		Arc::new(Self {
			behavior,
			launches: AtomicUsize::new(0),
			kills: Arc::new(AtomicUsize::new(0)),
			exits: Mutex::new(Vec::new()),
			module_paths: Mutex::new(Vec::new()),
			workers: Mutex::new(Vec::new()),
		})
	}

	fn launches(&self) -> usize {
		self.launches.load(Ordering::SeqCst)
	}

	/// Makes the most recently launched worker exit with `code`.
	fn crash_latest(&self, code: Option<i32>) {
		let exits = self.exits.lock();
		let tx = exits.last().expect("no worker launched");
		tx.send(code).expect("worker already reaped");
	}
}

fn worker_router() -> Router {
	let mut router = Router::new();
	router
		.request("echo", |params| async move { Ok(params) })
		.request("hang", |_| std::future::pending::<Result<JsonValue, ResponseError>>())
		.request("boom", |_| async move { Err(ResponseError::new(ErrorCode(1), "formatter blew up")) });
	router
}

#[async_trait]
impl WorkerLauncher for FakeLauncher {
	async fn launch(&self, module_path: Option<&Path>) -> io::Result<WorkerProcess> {
		self.module_paths.lock().push(module_path.map(Path::to_path_buf));
		if self.behavior == Behavior::FailLaunch {
			return Err(io::Error::new(io::ErrorKind::NotFound, "no such worker"));
		}
		self.launches.fetch_add(1, Ordering::SeqCst);

		let (host, worker) = tokio::io::duplex(64 * 1024);
		let (host_read, host_write) = tokio::io::split(host);
		let (worker_read, worker_write) = tokio::io::split(worker);

		let behavior = self.behavior;
		let task = if behavior == Behavior::Garbage {
			tokio::spawn(async move {
				let mut out = worker_write;
				let did_start = r#"{"jsonrpc":"2.0","method":"didStart"}"#;
				let _ = out.write_all(format!("Content-Length: {}\r\n\r\n{did_start}", did_start.len()).as_bytes()).await;
				tokio::time::sleep(Duration::from_millis(20)).await;
				let _ = out.write_all(b"Content-Length: 3\r\n\r\n{x}").await;
				let _keep_open = worker_read;
				std::future::pending::<()>().await;
			})
		} else {
			let (mainloop, socket) = MainLoop::new(worker_router());
			tokio::spawn(async move {
				let _ = match behavior {
					Behavior::FailStart => socket.notify(
						"startDidFail",
						json!({ "name": "Error", "message": "cannot find module 'prettier'", "stack": "at load" }),
					),
					_ => socket.notify("didStart", JsonValue::Null),
				};
				let _ = mainloop.run(worker_read, worker_write).await;
			})
		};
		self.workers.lock().push(task.abort_handle());

		let (exit_tx, exit_rx) = mpsc::unbounded_channel();
		self.exits.lock().push(exit_tx.clone());
		Ok(WorkerProcess {
			stdin: Box::new(host_write),
			stdout: Box::new(host_read),
			control: Box::new(FakeControl {
				exit_tx,
				exit_rx,
				worker: task.abort_handle(),
				kills: Arc::clone(&self.kills),
				ignore_kill: behavior == Behavior::Stubborn,
			}),
		})
	}
}

struct FakeControl {
	exit_tx: mpsc::UnboundedSender<Option<i32>>,
	exit_rx: mpsc::UnboundedReceiver<Option<i32>>,
	worker: AbortHandle,
	kills: Arc<AtomicUsize>,
	ignore_kill: bool,
}

#[async_trait]
impl ProcessControl for FakeControl {
	async fn wait(&mut self) -> io::Result<Option<i32>> {
		let code = self.exit_rx.recv().await.flatten();
		self.worker.abort();
		Ok(code)
	}

	fn start_kill(&mut self) -> io::Result<()> {
		self.kills.fetch_add(1, Ordering::SeqCst);
		if !self.ignore_kill {
			let _ = self.exit_tx.send(None);
		}
		Ok(())
	}
}

async fn next_event(rx: &mut broadcast::Receiver<WorkerEvent>) -> WorkerEvent {
	tokio::time::timeout(Duration::from_secs(5), rx.recv())
		.await
		.expect("timed out waiting for a worker event")
		.expect("event channel closed")
}

fn supervisor(launcher: &Arc<FakeLauncher>, config: SupervisorConfig) -> WorkerSupervisor {
	WorkerSupervisor::new(Arc::clone(launcher) as Arc<dyn WorkerLauncher>, config)
}

#[tokio::test]
async fn start_completes_handshake() {
	let launcher = FakeLauncher::new(Behavior::Start);
	let sup = supervisor(&launcher, SupervisorConfig::default());
	let mut events = sup.subscribe();
	assert_eq!(sup.state(), WorkerState::NotStarted);
	assert_eq!(sup.readiness(), Readiness::NotReady);

	sup.start(Some(PathBuf::from("/opt/prettier"))).await.expect("start");
	assert!(sup.ready().await);
	assert_eq!(sup.state(), WorkerState::Ready);
	assert_eq!(next_event(&mut events).await, WorkerEvent::Ready { generation: 1 });
	assert_eq!(*launcher.module_paths.lock(), vec![Some(PathBuf::from("/opt/prettier"))]);

	// Already running: no second launch.
	sup.start(Some(PathBuf::from("/opt/prettier"))).await.expect("start");
	assert_eq!(launcher.launches(), 1);
}

#[tokio::test]
async fn second_crash_within_cooldown_needs_restart() {
	let launcher = FakeLauncher::new(Behavior::Start);
	let sup = supervisor(&launcher, SupervisorConfig::default().restart_cooldown(Duration::from_secs(60)));
	let mut events = sup.subscribe();

	sup.start(None).await.expect("start");
	assert_eq!(next_event(&mut events).await, WorkerEvent::Ready { generation: 1 });

	launcher.crash_latest(Some(1));
	assert_eq!(next_event(&mut events).await, WorkerEvent::Crashed { generation: 1, code: Some(1) });
	assert_eq!(next_event(&mut events).await, WorkerEvent::Restarting { generation: 1 });
	assert_eq!(next_event(&mut events).await, WorkerEvent::Ready { generation: 2 });
	assert!(sup.is_ready());

	launcher.crash_latest(Some(1));
	assert_eq!(next_event(&mut events).await, WorkerEvent::Crashed { generation: 2, code: Some(1) });
	assert_eq!(next_event(&mut events).await, WorkerEvent::NeedsRestart);

	tokio::time::sleep(Duration::from_millis(50)).await;
	assert_eq!(launcher.launches(), 2);
	assert_eq!(sup.state(), WorkerState::Crashed);
	assert!(!sup.ready().await);

	// A manual restart brings it back.
	sup.restart().await.expect("restart");
	assert!(sup.ready().await);
	assert_eq!(launcher.launches(), 3);
}

#[tokio::test]
async fn crashes_outside_cooldown_keep_restarting() {
	let launcher = FakeLauncher::new(Behavior::Start);
	let sup = supervisor(&launcher, SupervisorConfig::default().restart_cooldown(Duration::ZERO));
	let mut events = sup.subscribe();

	sup.start(None).await.expect("start");
	assert_eq!(next_event(&mut events).await, WorkerEvent::Ready { generation: 1 });

	for generation in 1..=3 {
		launcher.crash_latest(None);
		assert_eq!(next_event(&mut events).await, WorkerEvent::Crashed { generation, code: None });
		assert_eq!(next_event(&mut events).await, WorkerEvent::Restarting { generation });
		assert_eq!(next_event(&mut events).await, WorkerEvent::Ready { generation: generation + 1 });
	}
	assert_eq!(launcher.launches(), 4);
}

#[tokio::test]
async fn concurrent_stops_share_one_exit() {
	let launcher = FakeLauncher::new(Behavior::Start);
	let sup = supervisor(&launcher, SupervisorConfig::default());
	let mut events = sup.subscribe();

	sup.start(None).await.expect("start");
	assert!(sup.ready().await);
	assert_eq!(next_event(&mut events).await, WorkerEvent::Ready { generation: 1 });

	tokio::join!(sup.stop(), sup.stop());
	assert_eq!(sup.state(), WorkerState::Stopped);
	assert_eq!(sup.readiness(), Readiness::NotReady);
	assert_eq!(launcher.kills.load(Ordering::SeqCst), 1);
	assert_eq!(next_event(&mut events).await, WorkerEvent::Stopped { generation: 1 });

	sup.start(None).await.expect("start again");
	assert!(sup.ready().await);
	assert_eq!(next_event(&mut events).await, WorkerEvent::Ready { generation: 2 });
}

#[tokio::test]
async fn stop_without_worker_is_noop() {
	let launcher = FakeLauncher::new(Behavior::Start);
	let sup = supervisor(&launcher, SupervisorConfig::default());
	sup.stop().await;
	assert_eq!(sup.state(), WorkerState::NotStarted);
	assert_eq!(launcher.launches(), 0);
}

#[tokio::test]
async fn stop_times_out_on_stubborn_worker() {
	let launcher = FakeLauncher::new(Behavior::Stubborn);
	let sup = supervisor(&launcher, SupervisorConfig::default().stop_timeout(Duration::from_millis(50)));
	let mut events = sup.subscribe();

	sup.start(None).await.expect("start");
	assert!(sup.ready().await);
	assert_eq!(next_event(&mut events).await, WorkerEvent::Ready { generation: 1 });

	sup.stop().await;
	assert_eq!(sup.state(), WorkerState::Stopped);
	assert_eq!(next_event(&mut events).await, WorkerEvent::Stopped { generation: 1 });
	assert!(matches!(sup.request("echo", JsonValue::Null).await, Err(Error::NotRunning)));
}

#[tokio::test]
async fn start_did_fail_is_not_retried() {
	let launcher = FakeLauncher::new(Behavior::FailStart);
	let sup = supervisor(&launcher, SupervisorConfig::default());
	let mut events = sup.subscribe();

	sup.start(None).await.expect("start");
	assert!(!sup.ready().await);

	assert_eq!(
		next_event(&mut events).await,
		WorkerEvent::StartFailed(StartFailure {
			name: "Error".into(),
			message: "cannot find module 'prettier'".into(),
			stack: Some("at load".into()),
		})
	);
	assert_eq!(next_event(&mut events).await, WorkerEvent::Stopped { generation: 1 });

	tokio::time::sleep(Duration::from_millis(50)).await;
	assert_eq!(sup.state(), WorkerState::Stopped);
	assert_eq!(launcher.launches(), 1);
}

#[tokio::test]
async fn launch_failure_reports_start_failed() {
	let launcher = FakeLauncher::new(Behavior::FailLaunch);
	let sup = supervisor(&launcher, SupervisorConfig::default());
	let mut events = sup.subscribe();

	let err = sup.start(None).await.expect_err("launch must fail");
	assert!(matches!(err, Error::Launch(ref e) if e.kind() == io::ErrorKind::NotFound));
	assert!(!sup.ready().await);
	assert_eq!(sup.state(), WorkerState::Stopped);

	let WorkerEvent::StartFailed(failure) = next_event(&mut events).await else {
		panic!("expected StartFailed");
	};
	assert_eq!(failure.name, "LaunchError");
}

#[tokio::test]
async fn requests_reach_the_worker() {
	let launcher = FakeLauncher::new(Behavior::Start);
	let sup = supervisor(&launcher, SupervisorConfig::default());
	sup.start(None).await.expect("start");
	assert!(sup.ready().await);

	let params = json!({ "text": "const x=1", "options": { "semi": true } });
	assert_eq!(sup.request("echo", params.clone()).await.expect("echo"), params);

	let err = sup.request("boom", JsonValue::Null).await.expect_err("boom");
	let Error::Rpc(fmtkit_rpc::Error::Response(resp)) = err else {
		panic!("expected an error response, got {err:?}");
	};
	assert_eq!(resp.code, ErrorCode(1));
	assert_eq!(resp.message, "formatter blew up");

	let err = sup.request("nope", JsonValue::Null).await.expect_err("unknown method");
	assert!(matches!(err, Error::Rpc(fmtkit_rpc::Error::Response(ref r)) if r.code == ErrorCode::METHOD_NOT_FOUND));
}

#[tokio::test]
async fn request_without_worker_fails() {
	let launcher = FakeLauncher::new(Behavior::Start);
	let sup = supervisor(&launcher, SupervisorConfig::default());
	assert!(matches!(sup.request("echo", JsonValue::Null).await, Err(Error::NotRunning)));
}

#[tokio::test]
async fn request_timeout_applies() {
	let launcher = FakeLauncher::new(Behavior::Start);
	let sup = supervisor(
		&launcher,
		SupervisorConfig::default().request_timeout(Some(Duration::from_millis(50))),
	);
	sup.start(None).await.expect("start");
	assert!(sup.ready().await);

	let err = sup.request("hang", JsonValue::Null).await.expect_err("hang");
	assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(50)));
	// The worker is still usable afterwards.
	assert_eq!(sup.request("echo", json!(1)).await.expect("echo"), json!(1));
}

#[tokio::test]
async fn crash_fails_pending_requests() {
	let launcher = FakeLauncher::new(Behavior::Start);
	let sup = supervisor(&launcher, SupervisorConfig::default());
	sup.start(None).await.expect("start");
	assert!(sup.ready().await);

	let pending = tokio::spawn({
		let sup = sup.clone();
		async move { sup.request("hang", JsonValue::Null).await }
	});
	tokio::time::sleep(Duration::from_millis(20)).await;
	launcher.crash_latest(Some(137));

	let result = tokio::time::timeout(Duration::from_secs(5), pending)
		.await
		.expect("pending request must resolve")
		.expect("join");
	assert!(matches!(result, Err(Error::Rpc(fmtkit_rpc::Error::ServiceStopped))));
}

#[tokio::test]
async fn malformed_frame_kills_and_restarts_the_worker() {
	let launcher = FakeLauncher::new(Behavior::Garbage);
	let sup = supervisor(&launcher, SupervisorConfig::default().restart_cooldown(Duration::from_secs(60)));
	let mut events = sup.subscribe();

	sup.start(None).await.expect("start");
	assert_eq!(next_event(&mut events).await, WorkerEvent::Ready { generation: 1 });
	assert_eq!(next_event(&mut events).await, WorkerEvent::Crashed { generation: 1, code: None });
	assert_eq!(next_event(&mut events).await, WorkerEvent::Restarting { generation: 1 });
	assert_eq!(next_event(&mut events).await, WorkerEvent::Ready { generation: 2 });
	assert_eq!(next_event(&mut events).await, WorkerEvent::Crashed { generation: 2, code: None });
	assert_eq!(next_event(&mut events).await, WorkerEvent::NeedsRestart);

	assert_eq!(launcher.launches(), 2);
	assert_eq!(launcher.kills.load(Ordering::SeqCst), 2);
	assert_eq!(sup.state(), WorkerState::Crashed);
	assert!(matches!(sup.request("echo", JsonValue::Null).await, Err(Error::NotRunning)));
}

#[tokio::test]
async fn start_waits_for_an_in_flight_stop() {
	let launcher = FakeLauncher::new(Behavior::Stubborn);
	let sup = supervisor(&launcher, SupervisorConfig::default().stop_timeout(Duration::from_secs(10)));
	let mut events = sup.subscribe();

	sup.start(None).await.expect("start");
	assert_eq!(next_event(&mut events).await, WorkerEvent::Ready { generation: 1 });

	let stop = tokio::spawn({
		let sup = sup.clone();
		async move { sup.stop().await }
	});
	tokio::time::sleep(Duration::from_millis(20)).await;
	assert_eq!(sup.state(), WorkerState::Stopping);

	let start = tokio::spawn({
		let sup = sup.clone();
		async move { sup.start(None).await }
	});
	tokio::time::sleep(Duration::from_millis(50)).await;
	assert!(!start.is_finished());
	assert_eq!(launcher.launches(), 1);
	assert_eq!(sup.state(), WorkerState::Stopping);

	// The old process finally exits.
	launcher.crash_latest(None);
	stop.await.expect("join stop");
	start.await.expect("join start").expect("start");

	assert_eq!(next_event(&mut events).await, WorkerEvent::Stopped { generation: 1 });
	assert!(sup.ready().await);
	assert_eq!(next_event(&mut events).await, WorkerEvent::Ready { generation: 2 });
	assert_eq!(launcher.launches(), 2);
}

#[tokio::test]
async fn start_after_a_timed_out_stop_drops_the_old_connection() {
	let launcher = FakeLauncher::new(Behavior::Stubborn);
	let sup = supervisor(&launcher, SupervisorConfig::default().stop_timeout(Duration::from_millis(50)));
	let mut events = sup.subscribe();

	sup.start(None).await.expect("start");
	assert_eq!(next_event(&mut events).await, WorkerEvent::Ready { generation: 1 });

	let (_, started) = tokio::join!(sup.stop(), sup.start(None));
	started.expect("start");
	assert!(sup.ready().await);
	assert_eq!(next_event(&mut events).await, WorkerEvent::Stopped { generation: 1 });
	assert_eq!(next_event(&mut events).await, WorkerEvent::Ready { generation: 2 });
	assert_eq!(sup.state(), WorkerState::Ready);

	// Generation 1 never exited, but its connection is gone.
	tokio::time::timeout(Duration::from_secs(5), async {
		while !launcher.workers.lock()[0].is_finished() {
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
	})
	.await
	.expect("old connection still open");
	assert_eq!(sup.request("echo", json!(2)).await.expect("echo"), json!(2));
}
