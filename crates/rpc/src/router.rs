//! Method-name dispatch for inbound messages.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value as JsonValue;

use crate::types::{AnyNotification, AnyRequest, AnyResponse, ResponseError};
use crate::{Error, Result};

type RequestHandler = Box<dyn Fn(JsonValue) -> BoxFuture<'static, Result<JsonValue, ResponseError>> + Send + Sync>;
type NotificationHandler = Box<dyn FnMut(JsonValue) + Send>;

/// Routes requests and notifications to handlers by method name.
///
/// Request handlers run concurrently on the main loop's task set; notification
/// handlers run synchronously and in arrival order.
#[derive(Default)]
pub struct Router {
	requests: HashMap<String, RequestHandler>,
	notifications: HashMap<String, NotificationHandler>,
}

impl std::fmt::Debug for Router {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Router")
			.field("requests", &self.requests.keys().collect::<Vec<_>>())
			.field("notifications", &self.notifications.keys().collect::<Vec<_>>())
			.finish()
	}
}

impl Router {
	/// Creates an empty router.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a request handler.
	///
	/// A handler error is sent back as the response error; a panic becomes a
	/// `-32603` response carrying the panic message.
	pub fn request<F, Fut>(&mut self, method: impl Into<String>, handler: F) -> &mut Self
	where
		F: Fn(JsonValue) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<JsonValue, ResponseError>> + Send + 'static,
	{
		self.requests.insert(method.into(), Box::new(move |params| handler(params).boxed()));
		self
	}

	/// Registers a notification handler.
	pub fn notification<F>(&mut self, method: impl Into<String>, handler: F) -> &mut Self
	where
		F: FnMut(JsonValue) + Send + 'static,
	{
		self.notifications.insert(method.into(), Box::new(handler));
		self
	}

	/// Returns the future answering `req`.
	pub(crate) fn call(&self, req: AnyRequest) -> BoxFuture<'static, AnyResponse> {
		let AnyRequest { id, method, params } = req;
		let Some(handler) = self.requests.get(&method) else {
			tracing::debug!(%id, method = %method, "rpc.request.method_not_found");
			let resp = AnyResponse::from_result(id, Err(ResponseError::method_not_found(&method)));
			return futures::future::ready(resp).boxed();
		};

		let fut = match std::panic::catch_unwind(AssertUnwindSafe(|| handler(params))) {
			Ok(fut) => fut,
			Err(payload) => {
				let resp = AnyResponse::from_result(id, Err(panic_error(&method, payload)));
				return futures::future::ready(resp).boxed();
			}
		};

		async move {
			let result = match AssertUnwindSafe(fut).catch_unwind().await {
				Ok(result) => result,
				Err(payload) => Err(panic_error(&method, payload)),
			};
			AnyResponse::from_result(id, result)
		}
		.boxed()
	}

	/// Delivers a notification.
	///
	/// # Errors
	///
	/// Returns `Error::Protocol` when the method names a request handler: the
	/// peer sent a request without an id and is waiting for a response that
	/// can never be correlated.
	pub(crate) fn notify(&mut self, notif: AnyNotification) -> Result<()> {
		if let Some(handler) = self.notifications.get_mut(&notif.method) {
			handler(notif.params);
			return Ok(());
		}
		if self.requests.contains_key(&notif.method) {
			return Err(Error::Protocol(format!("request `{}` arrived without an id", notif.method)));
		}
		tracing::debug!(method = %notif.method, "rpc.notification.unhandled");
		Ok(())
	}
}

fn panic_error(method: &str, payload: Box<dyn Any + Send>) -> ResponseError {
	let message = panic_message(payload.as_ref()).unwrap_or("<unknown panic>");
	tracing::error!(method, panic = message, "rpc.request.panicked");
	ResponseError::internal(message)
}

/// Extracts the message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> Option<&str> {
	payload
		.downcast_ref::<&'static str>()
		.copied()
		.or_else(|| payload.downcast_ref::<String>().map(String::as_str))
}
