use std::path::PathBuf;

use crate::request::FormatterError;

/// A convenient type alias for `Result` with `E` = [`FormatError`].
pub type Result<T, E = FormatError> = std::result::Result<T, E>;

/// Errors from formatting a document.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FormatError {
	/// The formatter is not running or failed its handshake.
	#[error("formatter is not ready")]
	NotReady,
	/// The worker process failed or the connection to it broke.
	#[error(transparent)]
	Worker(#[from] fmtkit_worker::Error),
	/// The formatter rejected the document.
	#[error("formatter error: {0}")]
	Formatter(#[from] FormatterError),
	/// The worker answered with an unexpected payload.
	#[error("failed to decode formatter response: {0}")]
	Decode(#[from] serde_json::Error),
	/// The host refused the edits.
	#[error(transparent)]
	Host(#[from] HostError),
}

/// Errors reported by an [`EditorHost`](crate::EditorHost).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HostError {
	/// The document is read-only.
	#[error("document is read-only")]
	ReadOnly,
	/// An edit range is outside the document.
	#[error("edit {start}..{end} is outside the document (length {len})")]
	OutOfBounds {
		/// Edit start.
		start: usize,
		/// Edit end.
		end: usize,
		/// Document length in host units.
		len: usize,
	},
	/// Any other host failure.
	#[error("{0}")]
	Other(String),
}

/// Errors loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	/// A settings file could not be read.
	#[error("failed to read {path}: {error}")]
	Io {
		/// Path of the file.
		path: PathBuf,
		/// The underlying error.
		#[source]
		error: std::io::Error,
	},
	/// A settings file is not valid TOML or has the wrong shape.
	#[error("failed to parse settings: {0}")]
	Parse(#[from] toml::de::Error),
	/// A value is out of range.
	#[error("invalid value for `{key}`: {reason}")]
	Invalid {
		/// Setting name.
		key: &'static str,
		/// What is wrong with it.
		reason: String,
	},
}
