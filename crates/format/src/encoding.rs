//! Conversion between host offsets and char offsets.

use ropey::Rope;
use serde::{Deserialize, Serialize};

use crate::edit::TextEdit;
use crate::selection::SelectionRange;

/// The unit in which a host measures document offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OffsetEncoding {
	/// UTF-8 bytes.
	Utf8,
	/// UTF-16 code units.
	#[default]
	Utf16,
	/// Unicode scalar values.
	Utf32,
}

impl OffsetEncoding {
	/// Length of `text` in this encoding.
	pub fn len_of(self, text: &str) -> usize {
		match self {
			Self::Utf8 => text.len(),
			Self::Utf16 => text.encode_utf16().count(),
			Self::Utf32 => text.chars().count(),
		}
	}
}

/// Converts a host offset to a char offset.
///
/// An offset inside a code point (a byte inside a multi-byte sequence, or the
/// low half of a surrogate pair) snaps to the start of that code point.
/// Returns `None` past the end of the text.
pub fn offset_to_char(rope: &Rope, offset: usize, encoding: OffsetEncoding) -> Option<usize> {
	match encoding {
		OffsetEncoding::Utf8 => (offset <= rope.len_bytes()).then(|| rope.byte_to_char(offset)),
		OffsetEncoding::Utf16 => (offset <= rope.len_utf16_cu()).then(|| {
			let idx = rope.utf16_cu_to_char(offset);
			if rope.char_to_utf16_cu(idx) > offset { idx - 1 } else { idx }
		}),
		OffsetEncoding::Utf32 => (offset <= rope.len_chars()).then_some(offset),
	}
}

/// Converts a char offset to a host offset. Returns `None` past the end.
pub fn char_to_offset(rope: &Rope, char_idx: usize, encoding: OffsetEncoding) -> Option<usize> {
	if char_idx > rope.len_chars() {
		return None;
	}
	Some(match encoding {
		OffsetEncoding::Utf8 => rope.char_to_byte(char_idx),
		OffsetEncoding::Utf16 => rope.char_to_utf16_cu(char_idx),
		OffsetEncoding::Utf32 => char_idx,
	})
}

/// Converts host selections to char offsets, clamping past-the-end bounds.
pub(crate) fn selections_to_chars(rope: &Rope, selections: &[SelectionRange], encoding: OffsetEncoding) -> Vec<SelectionRange> {
	let len = rope.len_chars();
	let convert = |offset| offset_to_char(rope, offset, encoding).unwrap_or(len);
	selections
		.iter()
		.map(|sel| SelectionRange::new(convert(sel.start), convert(sel.end)))
		.collect()
}

/// Converts char selections in `rope` to host offsets.
pub(crate) fn selections_from_chars(rope: &Rope, selections: &[SelectionRange], encoding: OffsetEncoding) -> Vec<SelectionRange> {
	let end = char_to_offset(rope, rope.len_chars(), encoding).unwrap_or_default();
	let convert = |idx| char_to_offset(rope, idx, encoding).unwrap_or(end);
	selections
		.iter()
		.map(|sel| SelectionRange::new(convert(sel.start), convert(sel.end)))
		.collect()
}

/// Re-expresses a char-offset edit sequence for `text` in `encoding`.
///
/// Each edit is converted against the document as left by the edits before
/// it, so the result applies in the same order. Returns the converted edits
/// and the edited text.
pub fn encode_edits(text: &str, edits: &[TextEdit], encoding: OffsetEncoding) -> (Vec<TextEdit>, Rope) {
	let mut rope = Rope::from_str(text);
	let mut encoded = Vec::with_capacity(edits.len());
	for edit in edits {
		let len = rope.len_chars();
		let start = edit.start.min(len);
		let end = edit.end.clamp(start, len);
		let to_host = |idx| char_to_offset(&rope, idx, encoding).unwrap_or_default();
		encoded.push(TextEdit::new(to_host(start), to_host(end), edit.replacement.clone()));
		rope.remove(start..end);
		rope.insert(start, &edit.replacement);
	}
	(encoded, rope)
}
