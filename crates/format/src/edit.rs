use ropey::Rope;
use serde::{Deserialize, Serialize};

/// Replaces `start..end` with `replacement`.
///
/// Edits are produced as a sequence: each one's offsets refer to the document
/// after all earlier edits in the sequence were applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
	/// Start offset, inclusive.
	pub start: usize,
	/// End offset, exclusive.
	pub end: usize,
	/// Replacement text.
	pub replacement: String,
}

impl TextEdit {
	/// Creates an edit.
	pub fn new(start: usize, end: usize, replacement: impl Into<String>) -> Self {
		Self {
			start,
			end,
			replacement: replacement.into(),
		}
	}

	/// Returns true when the edit changes nothing.
	pub fn is_noop(&self) -> bool {
		self.start == self.end && self.replacement.is_empty()
	}
}

/// Applies char-offset edits in order to `rope`.
///
/// Out-of-range offsets are clamped to the end of the rope.
pub fn apply_edits_to_rope(rope: &mut Rope, edits: &[TextEdit]) {
	for edit in edits {
		let len = rope.len_chars();
		let start = edit.start.min(len);
		let end = edit.end.clamp(start, len);
		rope.remove(start..end);
		rope.insert(start, &edit.replacement);
	}
}

/// Applies char-offset edits in order to `text`.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
	let mut rope = Rope::from_str(text);
	apply_edits_to_rope(&mut rope, edits);
	rope.to_string()
}
