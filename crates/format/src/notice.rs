//! User-facing notices.

use std::sync::Arc;

use fmtkit_worker::WorkerEvent;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What the user can do about a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeAction {
	/// Restart the formatter.
	Restart,
	/// Dismiss.
	Dismiss,
}

impl NoticeAction {
	/// Button label.
	pub const fn label(self) -> &'static str {
		match self {
			Self::Restart => "Restart Formatter",
			Self::Dismiss => "OK",
		}
	}
}

/// A message for the user, with at most a couple of choices.
///
/// Notices with the same `id` replace each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
	/// Stable identifier.
	pub id: &'static str,
	/// Title.
	pub title: String,
	/// Body text.
	pub body: String,
	/// Offered actions.
	pub actions: Vec<NoticeAction>,
}

impl Notice {
	pub(crate) const NOT_RUNNING: &'static str = "fmtkit.not-running";
	pub(crate) const START_FAILED: &'static str = "fmtkit.start-failed";
	pub(crate) const MISSING_PARSER: &'static str = "fmtkit.missing-parser";

	/// The formatter stopped and will not come back on its own.
	pub fn not_running() -> Self {
		Self {
			id: Self::NOT_RUNNING,
			title: "Formatter stopped running".into(),
			body: "The formatter service is not running. Restart it to keep formatting.".into(),
			actions: vec![NoticeAction::Restart],
		}
	}

	/// The formatter could not start.
	pub fn start_failed(name: &str, message: &str) -> Self {
		Self {
			id: Self::START_FAILED,
			title: "Formatter failed to start".into(),
			body: format!("{name}: {message}\n\nCheck the configured module path, then restart."),
			actions: vec![NoticeAction::Restart, NoticeAction::Dismiss],
		}
	}

	/// No parser is available for a syntax. Shown once per syntax.
	pub fn missing_parser(syntax: &str) -> Self {
		Self {
			id: Self::MISSING_PARSER,
			title: format!("No formatter parser for {syntax}"),
			body: format!("Documents with syntax `{syntax}` are left unformatted because the formatter has no parser for them."),
			actions: vec![NoticeAction::Dismiss],
		}
	}
}

/// Delivers notices to the user.
pub trait Notifier: Send + Sync {
	/// Shows a notice, replacing any notice with the same id.
	fn notify(&self, notice: Notice);

	/// Withdraws the notice with `id`, if shown.
	fn cancel(&self, id: &'static str) {
		let _ = id;
	}
}

/// Maps a supervisor event to the notice it warrants.
pub fn notice_for_event(event: &WorkerEvent) -> Option<Notice> {
	match event {
		WorkerEvent::StartFailed(failure) => Some(Notice::start_failed(&failure.name, &failure.message)),
		WorkerEvent::NeedsRestart => Some(Notice::not_running()),
		_ => None,
	}
}

/// Pumps supervisor events into `notifier` until the event channel closes.
///
/// A successful start withdraws earlier failure notices.
pub fn forward_worker_events(mut events: broadcast::Receiver<WorkerEvent>, notifier: Arc<dyn Notifier>) -> JoinHandle<()> {
	tokio::spawn(async move {
		loop {
			let event = match events.recv().await {
				Ok(event) => event,
				Err(broadcast::error::RecvError::Lagged(skipped)) => {
					warn!(skipped, "worker events dropped");
					continue;
				}
				Err(broadcast::error::RecvError::Closed) => break,
			};

			if let WorkerEvent::Ready { .. } = event {
				notifier.cancel(Notice::NOT_RUNNING);
				notifier.cancel(Notice::START_FAILED);
			}
			if let Some(notice) = notice_for_event(&event) {
				debug!(id = notice.id, "notice");
				notifier.notify(notice);
			}
		}
	})
}

#[cfg(test)]
mod tests {
	use fmtkit_worker::StartFailure;
	use parking_lot::Mutex;

	use super::*;

	#[derive(Default)]
	struct Recorder {
		shown: Mutex<Vec<&'static str>>,
		cancelled: Mutex<Vec<&'static str>>,
	}

	impl Notifier for Recorder {
		fn notify(&self, notice: Notice) {
			self.shown.lock().push(notice.id);
		}

		fn cancel(&self, id: &'static str) {
			self.cancelled.lock().push(id);
		}
	}

	#[test]
	fn only_failures_produce_notices() {
		assert_eq!(notice_for_event(&WorkerEvent::Ready { generation: 1 }), None);
		assert_eq!(notice_for_event(&WorkerEvent::Crashed { generation: 1, code: Some(1) }), None);
		assert_eq!(notice_for_event(&WorkerEvent::NeedsRestart), Some(Notice::not_running()));

		let failure = StartFailure {
			name: "Error".into(),
			message: "Cannot find module".into(),
			stack: None,
		};
		let notice = notice_for_event(&WorkerEvent::StartFailed(failure)).expect("notice");
		assert_eq!(notice.id, "fmtkit.start-failed");
		assert!(notice.body.starts_with("Error: Cannot find module"));
		assert_eq!(notice.actions[0].label(), "Restart Formatter");
	}

	#[tokio::test]
	async fn forwards_until_closed() {
		let (tx, rx) = broadcast::channel(8);
		let recorder = Arc::new(Recorder::default());
		let task = forward_worker_events(rx, recorder.clone());

		tx.send(WorkerEvent::NeedsRestart).expect("send");
		tx.send(WorkerEvent::Ready { generation: 2 }).expect("send");
		drop(tx);
		task.await.expect("join");

		assert_eq!(*recorder.shown.lock(), vec!["fmtkit.not-running"]);
		assert_eq!(*recorder.cancelled.lock(), vec!["fmtkit.not-running", "fmtkit.start-failed"]);
	}
}
