//! The editor side of a format request.

use std::path::PathBuf;

use parking_lot::Mutex;
use ropey::Rope;

use crate::diagnostics::Diagnostic;
use crate::edit::TextEdit;
use crate::encoding::{OffsetEncoding, char_to_offset, offset_to_char};
use crate::error::HostError;
use crate::selection::SelectionRange;

/// An open document in the host editor.
///
/// Offsets exchanged with the host are measured in [`encoding`](Self::encoding).
/// Methods take `&self`: the user may keep typing while a format request is
/// in flight, so implementations read live state on every call.
pub trait EditorHost: Send + Sync {
	/// Current document text.
	fn text(&self) -> String;

	/// Current selections, ordered by start.
	fn selections(&self) -> Vec<SelectionRange>;

	/// File path, when the document is saved on disk.
	fn path(&self) -> Option<PathBuf>;

	/// Syntax identifier, e.g. `javascript`.
	fn syntax(&self) -> Option<String>;

	/// Root of the workspace the document belongs to.
	fn workspace_path(&self) -> Option<PathBuf> {
		None
	}

	/// Returns true for documents on a remote filesystem.
	fn is_remote(&self) -> bool {
		false
	}

	/// Offset unit of this host.
	fn encoding(&self) -> OffsetEncoding {
		OffsetEncoding::Utf16
	}

	/// Applies `edits` in order, then sets the selections.
	///
	/// # Errors
	///
	/// Returns a [`HostError`] when the document rejects the edits.
	fn apply(&self, edits: &[TextEdit], selections: &[SelectionRange]) -> Result<(), HostError>;

	/// Replaces the formatter diagnostics of this document.
	fn set_diagnostics(&self, diagnostics: Vec<Diagnostic>) {
		let _ = diagnostics;
	}
}

/// An in-memory [`EditorHost`].
#[derive(Debug)]
pub struct MemoryHost {
	path: Option<PathBuf>,
	syntax: Option<String>,
	workspace: Option<PathBuf>,
	remote: bool,
	encoding: OffsetEncoding,
	read_only: bool,
	state: Mutex<MemoryState>,
}

#[derive(Debug)]
struct MemoryState {
	text: Rope,
	selections: Vec<SelectionRange>,
	diagnostics: Vec<Diagnostic>,
}

impl MemoryHost {
	/// Creates a document with a caret at offset 0.
	pub fn new(text: &str) -> Self {
		Self {
			path: None,
			syntax: None,
			workspace: None,
			remote: false,
			encoding: OffsetEncoding::Utf16,
			read_only: false,
			state: Mutex::new(MemoryState {
				text: Rope::from_str(text),
				selections: vec![SelectionRange::caret(0)],
				diagnostics: Vec::new(),
			}),
		}
	}

	/// Sets the file path.
	#[must_use]
	pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.path = Some(path.into());
		self
	}

	/// Sets the syntax.
	#[must_use]
	pub fn with_syntax(mut self, syntax: impl Into<String>) -> Self {
		self.syntax = Some(syntax.into());
		self
	}

	/// Sets the workspace root.
	#[must_use]
	pub fn with_workspace(mut self, path: impl Into<PathBuf>) -> Self {
		self.workspace = Some(path.into());
		self
	}

	/// Marks the document as remote.
	#[must_use]
	pub fn remote(mut self, remote: bool) -> Self {
		self.remote = remote;
		self
	}

	/// Sets the offset encoding.
	#[must_use]
	pub fn with_encoding(mut self, encoding: OffsetEncoding) -> Self {
		self.encoding = encoding;
		self
	}

	/// Rejects every edit.
	#[must_use]
	pub fn read_only(mut self, read_only: bool) -> Self {
		self.read_only = read_only;
		self
	}

	/// Sets the selections.
	#[must_use]
	pub fn with_selections(self, selections: Vec<SelectionRange>) -> Self {
		self.state.lock().selections = selections;
		self
	}

	/// Replaces the whole text, as if the user typed.
	pub fn set_text(&self, text: &str) {
		self.state.lock().text = Rope::from_str(text);
	}

	/// Diagnostics last set by a format run.
	pub fn diagnostics(&self) -> Vec<Diagnostic> {
		self.state.lock().diagnostics.clone()
	}
}

impl EditorHost for MemoryHost {
	fn text(&self) -> String {
		self.state.lock().text.to_string()
	}

	fn selections(&self) -> Vec<SelectionRange> {
		self.state.lock().selections.clone()
	}

	fn path(&self) -> Option<PathBuf> {
		self.path.clone()
	}

	fn syntax(&self) -> Option<String> {
		self.syntax.clone()
	}

	fn workspace_path(&self) -> Option<PathBuf> {
		self.workspace.clone()
	}

	fn is_remote(&self) -> bool {
		self.remote
	}

	fn encoding(&self) -> OffsetEncoding {
		self.encoding
	}

	fn apply(&self, edits: &[TextEdit], selections: &[SelectionRange]) -> Result<(), HostError> {
		if self.read_only {
			return Err(HostError::ReadOnly);
		}

		let mut state = self.state.lock();
		let mut text = state.text.clone();
		for edit in edits {
			let (start, end) = to_chars(&text, edit, self.encoding)?;
			text.remove(start..end);
			text.insert(start, &edit.replacement);
		}
		state.text = text;
		state.selections = selections.to_vec();
		Ok(())
	}

	fn set_diagnostics(&self, diagnostics: Vec<Diagnostic>) {
		self.state.lock().diagnostics = diagnostics;
	}
}

fn to_chars(text: &Rope, edit: &TextEdit, encoding: OffsetEncoding) -> Result<(usize, usize), HostError> {
	let out_of_bounds = || HostError::OutOfBounds {
		start: edit.start,
		end: edit.end,
		len: char_to_offset(text, text.len_chars(), encoding).unwrap_or_default(),
	};
	let start = offset_to_char(text, edit.start, encoding).ok_or_else(out_of_bounds)?;
	let end = offset_to_char(text, edit.end, encoding).ok_or_else(out_of_bounds)?;
	if start > end {
		return Err(out_of_bounds());
	}
	Ok((start, end))
}
