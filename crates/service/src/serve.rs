//! The worker side of the stdio protocol.

use std::sync::Arc;

use fmtkit_format::{FormatEngine, FormatParams, FormatterError, HasConfigParams};
use fmtkit_rpc::{ErrorCode, JsonValue, MainLoop, ResponseError, Router};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{error, info};

fn decode<T: DeserializeOwned>(params: JsonValue) -> Result<T, ResponseError> {
	serde_json::from_value(params).map_err(|e| ResponseError::new(ErrorCode::INVALID_PARAMS, e.to_string()))
}

fn encode(value: impl serde::Serialize) -> Result<JsonValue, ResponseError> {
	serde_json::to_value(value).map_err(|e| ResponseError::new(ErrorCode::INTERNAL_ERROR, e.to_string()))
}

/// Routes `format` and `hasConfig` to `engine`.
pub fn router(engine: Arc<dyn FormatEngine>) -> Router {
	let mut router = Router::new();
	let format_engine = Arc::clone(&engine);
	router
		.request("format", move |params| {
			let engine = Arc::clone(&format_engine);
			async move {
				let params: FormatParams = decode(params)?;
				encode(engine.format(params).await)
			}
		})
		.request("hasConfig", move |params| {
			let engine = Arc::clone(&engine);
			async move {
				let params: HasConfigParams = decode(params)?;
				encode(engine.has_config(params).await)
			}
		});
	router
}

/// Serves one host connection until it closes.
///
/// With a working engine the worker announces `didStart` and answers
/// requests. Otherwise it sends `startDidFail` with the failure and answers
/// nothing, waiting for the host to close the connection.
///
/// # Errors
///
/// Returns transport and protocol errors from the connection.
pub async fn serve(
	startup: Result<Arc<dyn FormatEngine>, FormatterError>,
	input: impl AsyncRead + Unpin,
	output: impl AsyncWrite + Unpin,
) -> fmtkit_rpc::Result<()> {
	let (router, handshake) = match startup {
		Ok(engine) => (router(engine), None),
		Err(failure) => (Router::new(), Some(failure)),
	};

	let (mainloop, socket) = MainLoop::new(router);
	match handshake {
		None => {
			info!("worker.started");
			socket.notify("didStart", JsonValue::Null)?;
		}
		Some(failure) => {
			error!(name = %failure.name, message = %failure.message, "worker.start_failed");
			socket.notify("startDidFail", serde_json::to_value(&failure)?)?;
		}
	}

	let ret = mainloop.run(input, output).await;
	drop(socket);
	ret
}
