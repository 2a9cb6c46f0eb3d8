//! `Content-Length` framing.

use std::collections::HashMap;

use memchr::memmem;
use serde_json::Value as JsonValue;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::message::Message;
use crate::{Error, Result};

/// Initial receive buffer size, and the minimum step by which it grows.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

const HEADER_DELIMITER: &[u8] = b"\r\n\r\n";
const CONTENT_LENGTH: &str = "Content-Length";

/// Encodes a message as `Content-Length: N\r\n\r\n` followed by the JSON body.
///
/// # Errors
///
/// Fails only when the message cannot be serialized.
pub fn encode_frame(message: &Message) -> Result<Vec<u8>> {
	let body = serde_json::to_vec(&message.to_value())?;
	let mut frame = format!("{CONTENT_LENGTH}: {}\r\n\r\n", body.len()).into_bytes();
	frame.extend_from_slice(&body);
	Ok(frame)
}

/// Encodes and writes one frame, flushing the stream.
///
/// # Errors
///
/// Returns `Error::Io` when the stream fails.
pub async fn write_frame(output: &mut (impl AsyncWrite + Unpin), message: &Message) -> Result<()> {
	let frame = encode_frame(message)?;
	output.write_all(&frame).await?;
	output.flush().await?;
	Ok(())
}

/// Incremental frame decoder over a single growable buffer.
///
/// Bytes are appended with [`push`](Self::push) in chunks of any size; complete
/// messages are taken out with [`next_message`](Self::next_message). Several
/// messages may be buffered at once.
#[derive(Debug)]
pub struct FrameDecoder {
	buffer: Vec<u8>,
	/// Start of the unconsumed region of `buffer`.
	start: usize,
	/// Body length of the frame whose headers were already consumed.
	content_length: Option<usize>,
}

impl Default for FrameDecoder {
	fn default() -> Self {
		Self::new()
	}
}

impl FrameDecoder {
	/// Creates a decoder with a [`DEFAULT_BUFFER_SIZE`] buffer.
	pub fn new() -> Self {
		Self::with_capacity(DEFAULT_BUFFER_SIZE)
	}

	/// Creates a decoder with a buffer of the given initial capacity.
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			buffer: Vec::with_capacity(capacity),
			start: 0,
			content_length: None,
		}
	}

	/// Appends received bytes.
	///
	/// Consumed bytes are discarded first; if the chunk still does not fit,
	/// the buffer grows by `max(DEFAULT_BUFFER_SIZE, chunk.len())`.
	pub fn push(&mut self, chunk: &[u8]) {
		if self.start > 0 {
			self.buffer.drain(..self.start);
			self.start = 0;
		}
		let free = self.buffer.capacity() - self.buffer.len();
		if chunk.len() > free {
			let grow = DEFAULT_BUFFER_SIZE.max(chunk.len());
			tracing::trace!(
				capacity = self.buffer.capacity(),
				grow,
				"rpc.decoder.grow"
			);
			self.buffer.reserve_exact(self.buffer.capacity() - self.buffer.len() + grow);
		}
		self.buffer.extend_from_slice(chunk);
	}

	/// Number of received bytes not yet consumed.
	pub fn buffered(&self) -> usize {
		self.buffer.len() - self.start
	}

	/// Current buffer capacity.
	pub fn capacity(&self) -> usize {
		self.buffer.capacity()
	}

	/// Takes the next complete message out of the buffer.
	///
	/// Returns `Ok(None)` when more bytes are needed.
	///
	/// # Errors
	///
	/// - `Error::Protocol` when the header block is not ASCII or lacks a valid
	///   `Content-Length`, or the body is not a JSON-RPC message.
	/// - `Error::Deserialize` when the body is not valid JSON.
	pub fn next_message(&mut self) -> Result<Option<Message>> {
		let len = match self.content_length {
			Some(len) => len,
			None => {
				let pending = &self.buffer[self.start..];
				let Some(end) = memmem::find(pending, HEADER_DELIMITER) else {
					return Ok(None);
				};
				let len = parse_content_length(&pending[..end])?;
				self.start += end + HEADER_DELIMITER.len();
				self.content_length = Some(len);
				len
			}
		};

		if self.buffered() < len {
			return Ok(None);
		}
		let body = &self.buffer[self.start..self.start + len];
		self.start += len;
		self.content_length = None;

		let value: JsonValue = serde_json::from_slice(body)?;
		Message::from_value(value).map(Some)
	}
}

fn parse_content_length(block: &[u8]) -> Result<usize> {
	let block = std::str::from_utf8(block).map_err(|_| Error::Protocol("header block is not valid UTF-8".into()))?;
	let headers: HashMap<&str, &str> = block
		.split("\r\n")
		.filter_map(|line| line.split_once(':'))
		.map(|(name, value)| (name, value.trim()))
		.collect();

	let value = headers
		.get(CONTENT_LENGTH)
		.ok_or_else(|| Error::Protocol(format!("missing {CONTENT_LENGTH} header")))?;
	value
		.parse()
		.map_err(|_| Error::Protocol(format!("invalid {CONTENT_LENGTH}: {value:?}")))
}
