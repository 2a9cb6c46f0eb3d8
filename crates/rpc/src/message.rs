use serde_json::{Map, Value as JsonValue, json};

use crate::types::{AnyNotification, AnyRequest, AnyResponse, RequestId, ResponseError};
use crate::{Error, Result};

const JSONRPC_VERSION: &str = "2.0";

/// A decoded JSON-RPC message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
	/// `method` and `id`.
	Request(AnyRequest),
	/// `result` or `error`, correlated by `id`.
	Response(AnyResponse),
	/// `method` without `id`.
	Notification(AnyNotification),
}

impl Message {
	/// Serializes the message with the `jsonrpc` version member.
	pub fn to_value(&self) -> JsonValue {
		match self {
			Self::Request(req) => json!({
				"jsonrpc": JSONRPC_VERSION,
				"id": req.id,
				"method": req.method,
				"params": req.params,
			}),
			Self::Notification(notif) if notif.params.is_null() => json!({
				"jsonrpc": JSONRPC_VERSION,
				"method": notif.method,
			}),
			Self::Notification(notif) => json!({
				"jsonrpc": JSONRPC_VERSION,
				"method": notif.method,
				"params": notif.params,
			}),
			Self::Response(AnyResponse {
				id, error: Some(error), ..
			}) => json!({
				"jsonrpc": JSONRPC_VERSION,
				"id": id,
				"error": error,
			}),
			Self::Response(resp) => json!({
				"jsonrpc": JSONRPC_VERSION,
				"id": resp.id,
				"result": resp.result.clone().unwrap_or(JsonValue::Null),
			}),
		}
	}

	/// Classifies a decoded JSON value.
	///
	/// # Errors
	///
	/// - `Error::Protocol` when the value is not an object, has a non-string
	///   `method`, or carries neither `method` nor `result`/`error`.
	/// - `Error::Deserialize` when `id` or `error` are malformed.
	pub fn from_value(value: JsonValue) -> Result<Self> {
		let JsonValue::Object(mut obj) = value else {
			return Err(Error::Protocol("message is not a JSON object".into()));
		};
		let id = take_id(&mut obj)?;
		let params = obj.remove("params").unwrap_or(JsonValue::Null);

		match obj.remove("method") {
			Some(JsonValue::String(method)) => Ok(match id {
				Some(id) => Self::Request(AnyRequest { id, method, params }),
				None => Self::Notification(AnyNotification { method, params }),
			}),
			Some(other) => Err(Error::Protocol(format!("method must be a string, got {other}"))),
			None => {
				let error = obj
					.remove("error")
					.filter(|v| !v.is_null())
					.map(serde_json::from_value::<ResponseError>)
					.transpose()?;
				let result = obj.remove("result");
				if error.is_none() && result.is_none() {
					return Err(Error::Protocol("message has neither method nor result".into()));
				}
				let id = id.ok_or_else(|| Error::Protocol("response without id".into()))?;
				Ok(Self::Response(AnyResponse {
					id,
					result: if error.is_some() { None } else { result },
					error,
				}))
			}
		}
	}

	/// Method name of a request or notification.
	pub fn method(&self) -> Option<&str> {
		match self {
			Self::Request(req) => Some(&req.method),
			Self::Notification(notif) => Some(&notif.method),
			Self::Response(_) => None,
		}
	}
}

fn take_id(obj: &mut Map<String, JsonValue>) -> Result<Option<RequestId>> {
	match obj.remove("id") {
		None | Some(JsonValue::Null) => Ok(None),
		Some(id) => Ok(Some(serde_json::from_value(id)?)),
	}
}

impl From<AnyRequest> for Message {
	fn from(req: AnyRequest) -> Self {
		Self::Request(req)
	}
}

impl From<AnyResponse> for Message {
	fn from(resp: AnyResponse) -> Self {
		Self::Response(resp)
	}
}

impl From<AnyNotification> for Message {
	fn from(notif: AnyNotification) -> Self {
		Self::Notification(notif)
	}
}
