use std::io;

use crate::types::ResponseError;

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// The main loop stopped.
	#[error("service stopped")]
	ServiceStopped,
	/// The peer sent undecodable JSON.
	#[error("deserialization failed: {0}")]
	Deserialize(#[from] serde_json::Error),
	/// The peer replied with an error.
	#[error("{0}")]
	Response(#[from] ResponseError),
	/// The peer violated the framing or message protocol.
	#[error("protocol error: {0}")]
	Protocol(String),
	/// Input/output errors from the underlying streams.
	#[error("{0}")]
	Io(#[from] io::Error),
	/// The input stream ended in the middle of a frame.
	#[error("the underlying channel reached EOF")]
	Eof,
}

impl Error {
	/// Returns true when the error ends the connection rather than a single request.
	pub fn is_fatal(&self) -> bool {
		!matches!(self, Self::Response(_))
	}
}
