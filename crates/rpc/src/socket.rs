use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, oneshot};

use crate::message::Message;
use crate::types::{AnyNotification, AnyRequest, AnyResponse, RequestId};
use crate::{Error, Result};

/// Event sent from a [`PeerSocket`] to its main loop.
#[derive(Debug)]
pub enum MainLoopEvent {
	/// A message to write as is.
	Outgoing(Message),
	/// A request awaiting a response; the loop assigns the id.
	OutgoingRequest(AnyRequest, oneshot::Sender<AnyResponse>),
}

/// Cloneable handle for talking to the peer through a running main loop.
#[derive(Debug, Clone)]
pub struct PeerSocket {
	pub(crate) tx: mpsc::UnboundedSender<MainLoopEvent>,
}

impl PeerSocket {
	/// Creates a socket whose main loop is already gone.
	#[must_use]
	pub fn new_closed() -> Self {
		let (tx, _rx) = mpsc::unbounded_channel();
		Self { tx }
	}

	/// Returns true once the main loop has stopped.
	pub fn is_closed(&self) -> bool {
		self.tx.is_closed()
	}

	/// Sends a request and waits for its response.
	///
	/// Dropping the returned future abandons the request; its response is
	/// discarded when it arrives.
	///
	/// # Errors
	///
	/// - `Error::ServiceStopped` when the loop stops before the response arrives.
	/// - `Error::Response` when the peer answers with an error.
	pub async fn request(&self, method: impl Into<String>, params: JsonValue) -> Result<JsonValue> {
		let method = method.into();
		let (tx, rx) = oneshot::channel();
		let req = AnyRequest {
			id: RequestId::Number(0),
			method,
			params,
		};
		self.send(MainLoopEvent::OutgoingRequest(req, tx))?;
		let resp = rx.await.map_err(|_| Error::ServiceStopped)?;
		Ok(resp.into_result()?)
	}

	/// Sends a notification.
	///
	/// # Errors
	///
	/// Returns `Error::ServiceStopped` when the loop is gone.
	pub fn notify(&self, method: impl Into<String>, params: JsonValue) -> Result<()> {
		self.send(MainLoopEvent::Outgoing(Message::Notification(AnyNotification {
			method: method.into(),
			params,
		})))
	}

	fn send(&self, event: MainLoopEvent) -> Result<()> {
		self.tx.send(event).map_err(|_| Error::ServiceStopped)
	}
}
