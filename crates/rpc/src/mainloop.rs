//! Main loop driving one JSON-RPC connection.

use std::collections::HashMap;
use std::ops::ControlFlow;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, trace};

use crate::codec::{DEFAULT_BUFFER_SIZE, FrameDecoder, write_frame};
use crate::message::Message;
use crate::router::{Router, panic_message};
use crate::socket::{MainLoopEvent, PeerSocket};
use crate::types::{AnyResponse, RequestId};
use crate::{Error, Result};

/// Main loop pumping messages between a byte stream pair, a [`Router`] and
/// any number of [`PeerSocket`]s.
pub struct MainLoop {
	/// Handlers for inbound requests and notifications.
	router: Router,
	/// Receiver for events from sockets.
	rx: mpsc::UnboundedReceiver<MainLoopEvent>,
	/// Counter for outgoing request ids.
	next_id: i64,
	/// Outgoing requests awaiting responses.
	outgoing: HashMap<RequestId, oneshot::Sender<AnyResponse>>,
	/// Inbound request handlers in flight.
	tasks: JoinSet<AnyResponse>,
	/// Receive buffer.
	decoder: FrameDecoder,
}

impl std::fmt::Debug for MainLoop {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MainLoop")
			.field("router", &self.router)
			.field("next_id", &self.next_id)
			.field("pending", &self.outgoing.len())
			.field("tasks", &self.tasks.len())
			.finish_non_exhaustive()
	}
}

impl MainLoop {
	/// Creates a main loop and a socket connected to it.
	#[must_use]
	pub fn new(router: Router) -> (Self, PeerSocket) {
		Self::new_with(|_| router)
	}

	/// Creates a main loop whose router is built with access to the socket,
	/// so handlers can talk back to the peer.
	#[must_use]
	pub fn new_with(builder: impl FnOnce(PeerSocket) -> Router) -> (Self, PeerSocket) {
		let (tx, rx) = mpsc::unbounded_channel();
		let socket = PeerSocket { tx };
		let this = Self {
			router: builder(socket.clone()),
			rx,
			next_id: 0,
			outgoing: HashMap::new(),
			tasks: JoinSet::new(),
			decoder: FrameDecoder::new(),
		};
		(this, socket)
	}

	/// Drives the connection until the input reaches EOF, every socket is
	/// dropped, or a fatal error occurs.
	///
	/// Pending outgoing requests fail with `Error::ServiceStopped` once the
	/// loop returns.
	///
	/// # Errors
	///
	/// - `Error::Io` when `input` or `output` fails.
	/// - `Error::Deserialize` when the peer sends undecodable JSON.
	/// - `Error::Protocol` when the peer violates the framing or sends a
	///   request without an id to a request method.
	/// - `Error::Eof` when the input ends inside a frame.
	pub async fn run(mut self, mut input: impl AsyncRead + Unpin, mut output: impl AsyncWrite + Unpin) -> Result<()> {
		let mut chunk = vec![0u8; DEFAULT_BUFFER_SIZE];

		let ret = loop {
			let ctl = tokio::select! {
				biased;

				resp = self.tasks.join_next(), if !self.tasks.is_empty() => match resp {
					Some(Ok(resp)) => ControlFlow::Continue(vec![Message::Response(resp)]),
					Some(Err(e)) => {
						let panic = e.try_into_panic().ok();
						let message = panic.as_deref().and_then(panic_message).unwrap_or("<cancelled>");
						error!(error = message, "rpc handler task failed");
						ControlFlow::Continue(Vec::new())
					}
					None => ControlFlow::Continue(Vec::new()),
				},

				event = self.rx.recv() => match event {
					Some(event) => ControlFlow::Continue(self.dispatch_event(event)),
					None => break Ok(()),
				},

				read = input.read(&mut chunk) => match read {
					Ok(0) if self.decoder.buffered() > 0 => ControlFlow::Break(Err(Error::Eof)),
					Ok(0) => ControlFlow::Break(Ok(())),
					Ok(n) => match self.on_bytes(&chunk[..n]) {
						Ok(()) => ControlFlow::Continue(Vec::new()),
						Err(e) => ControlFlow::Break(Err(e)),
					},
					Err(e) => ControlFlow::Break(Err(e.into())),
				},
			};

			let messages = match ctl {
				ControlFlow::Continue(messages) => messages,
				ControlFlow::Break(ret) => break ret,
			};

			if let Err(e) = write_all(&mut output, &messages).await {
				break Err(e);
			}
		};

		if let Err(e) = &ret {
			debug!(error = %e, pending = self.outgoing.len(), "rpc main loop stopped");
		}
		// Dropping the senders fails every pending request.
		self.outgoing.clear();
		let _ = output.shutdown().await;
		ret
	}

	/// Feeds received bytes to the decoder and dispatches every complete message.
	fn on_bytes(&mut self, bytes: &[u8]) -> Result<()> {
		self.decoder.push(bytes);
		while let Some(message) = self.decoder.next_message()? {
			trace!(method = message.method(), "rpc.recv");
			self.dispatch_message(message)?;
		}
		Ok(())
	}

	/// Routes an inbound message.
	fn dispatch_message(&mut self, message: Message) -> Result<()> {
		match message {
			Message::Request(req) => {
				self.tasks.spawn(self.router.call(req));
			}
			Message::Response(resp) => match self.outgoing.remove(&resp.id) {
				// The waiter may have been dropped.
				Some(tx) => {
					let _ = tx.send(resp);
				}
				None => debug!(id = %resp.id, "rpc.response.unknown_id"),
			},
			Message::Notification(notif) => self.router.notify(notif)?,
		}
		Ok(())
	}

	/// Routes an event from a socket.
	fn dispatch_event(&mut self, event: MainLoopEvent) -> Vec<Message> {
		match event {
			MainLoopEvent::OutgoingRequest(mut req, resp_tx) => {
				req.id = RequestId::Number(self.next_id);
				self.next_id += 1;
				self.outgoing.insert(req.id.clone(), resp_tx);
				vec![Message::Request(req)]
			}
			MainLoopEvent::Outgoing(message) => vec![message],
		}
	}
}

async fn write_all(output: &mut (impl AsyncWrite + Unpin), messages: &[Message]) -> Result<()> {
	for message in messages {
		trace!(method = message.method(), "rpc.send");
		write_frame(output, message).await?;
	}
	Ok(())
}
