use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Identifier correlating a request with its response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
	/// Numeric identifier, the form this crate allocates.
	Number(i64),
	/// String identifier, accepted from peers.
	String(String),
}

impl fmt::Display for RequestId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Number(n) => write!(f, "{n}"),
			Self::String(s) => write!(f, "{s:?}"),
		}
	}
}

/// A request with untyped parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AnyRequest {
	/// Correlation id.
	pub id: RequestId,
	/// Method name.
	pub method: String,
	/// Parameters, `Null` when absent.
	pub params: JsonValue,
}

/// A notification with untyped parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AnyNotification {
	/// Method name.
	pub method: String,
	/// Parameters, `Null` when absent.
	pub params: JsonValue,
}

/// A response carrying either a result or an error.
#[derive(Debug, Clone, PartialEq)]
pub struct AnyResponse {
	/// Id of the request being answered.
	pub id: RequestId,
	/// Successful result.
	pub result: Option<JsonValue>,
	/// Failure.
	pub error: Option<ResponseError>,
}

impl AnyResponse {
	/// Builds a response from a handler outcome.
	pub fn from_result(id: RequestId, result: Result<JsonValue, ResponseError>) -> Self {
		match result {
			Ok(value) => Self {
				id,
				result: Some(value),
				error: None,
			},
			Err(error) => Self {
				id,
				result: None,
				error: Some(error),
			},
		}
	}

	/// Converts the response back into a handler outcome.
	pub fn into_result(self) -> Result<JsonValue, ResponseError> {
		match self.error {
			Some(error) => Err(error),
			None => Ok(self.result.unwrap_or(JsonValue::Null)),
		}
	}
}

/// JSON-RPC error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
	/// Invalid JSON was received.
	pub const PARSE_ERROR: Self = Self(-32700);
	/// The JSON sent is not a valid request object.
	pub const INVALID_REQUEST: Self = Self(-32600);
	/// The method does not exist or is not available.
	pub const METHOD_NOT_FOUND: Self = Self(-32601);
	/// Invalid method parameters.
	pub const INVALID_PARAMS: Self = Self(-32602);
	/// Internal JSON-RPC error, including handler failures.
	pub const INTERNAL_ERROR: Self = Self(-32603);
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// The `error` member of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct ResponseError {
	/// Error code.
	pub code: ErrorCode,
	/// Short description.
	pub message: String,
	/// Additional data.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<JsonValue>,
}

impl ResponseError {
	/// Creates an error without data.
	pub fn new(code: ErrorCode, message: impl fmt::Display) -> Self {
		Self {
			code,
			message: message.to_string(),
			data: None,
		}
	}

	/// `-32601 Method not found`.
	pub fn method_not_found(method: &str) -> Self {
		Self {
			data: Some(JsonValue::String(method.to_owned())),
			..Self::new(ErrorCode::METHOD_NOT_FOUND, "Method not found")
		}
	}

	/// `-32603` with the failure message.
	pub fn internal(message: impl fmt::Display) -> Self {
		Self::new(ErrorCode::INTERNAL_ERROR, message)
	}

	/// `-32602` with the failure message.
	pub fn invalid_params(message: impl fmt::Display) -> Self {
		Self::new(ErrorCode::INVALID_PARAMS, message)
	}
}
