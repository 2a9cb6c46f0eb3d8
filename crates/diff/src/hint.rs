//! Cursor-guided splice detection.
//!
//! When a change is a single insertion, deletion or replacement next to the
//! cursor, the script can be built directly and the ambiguity of where to put
//! an insertion inside repeated text is resolved in favour of the cursor.

use crate::types::{Chunk, Operation};

/// A span of chars: `index` is the start and `len` the length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HintRange {
	/// Start offset in chars.
	pub index: usize,
	/// Length in chars.
	pub len: usize,
}

impl HintRange {
	/// Creates a range.
	pub const fn new(index: usize, len: usize) -> Self {
		Self { index, len }
	}

	/// Creates an empty range at `index`.
	pub const fn caret(index: usize) -> Self {
		Self { index, len: 0 }
	}
}

/// Where the edit that produced the new text is believed to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorHint {
	/// Cursor offset in the old text.
	Offset(usize),
	/// Selection before and after the edit.
	Ranges {
		/// Selection in the old text.
		old: HintRange,
		/// Selection in the new text.
		new: HintRange,
	},
}

/// Returns a splice script when the change fits the hint, `None` otherwise.
pub(crate) fn splice(old: &[char], new: &[char], hint: CursorHint) -> Option<Vec<Chunk>> {
	let (old_range, new_range) = match hint {
		CursorHint::Offset(index) => (HintRange::caret(index), None),
		CursorHint::Ranges { old, new } => (old, Some(new)),
	};
	if old_range.index > old.len() || old_range.len > old.len() - old_range.index {
		return None;
	}

	if old_range.len == 0 && new_range.is_none_or(|range| range.len == 0) {
		let expected = new_range.map(|range| range.index);
		if let Some(chunks) = edit_before(old, new, old_range.index, expected) {
			return Some(chunks);
		}
		if let Some(chunks) = edit_after(old, new, old_range.index, expected) {
			return Some(chunks);
		}
	}

	if old_range.len > 0 && new_range.is_some_and(|range| range.len == 0) {
		return replace_range(old, new, old_range);
	}

	None
}

/// The edit ended at the cursor: the text after the cursor is untouched.
fn edit_before(old: &[char], new: &[char], old_cursor: usize, expected: Option<usize>) -> Option<Vec<Chunk>> {
	let new_cursor = (old_cursor + new.len()).checked_sub(old.len())?;
	if expected.is_some_and(|cursor| cursor != new_cursor) || new_cursor > new.len() {
		return None;
	}

	let (old_before, old_after) = old.split_at(old_cursor);
	let (new_before, new_after) = new.split_at(new_cursor);
	if new_after != old_after {
		return None;
	}

	let prefix_len = old_cursor.min(new_cursor);
	let (old_prefix, old_middle) = old_before.split_at(prefix_len);
	let (new_prefix, new_middle) = new_before.split_at(prefix_len);
	if old_prefix != new_prefix {
		return None;
	}
	Some(make_splice(old_prefix, old_middle, new_middle, old_after))
}

/// The edit started at the cursor: the text before the cursor is untouched.
fn edit_after(old: &[char], new: &[char], cursor: usize, expected: Option<usize>) -> Option<Vec<Chunk>> {
	if expected.is_some_and(|expected| expected != cursor) || cursor > new.len() {
		return None;
	}

	let (old_before, old_after) = old.split_at(cursor);
	let (new_before, new_after) = new.split_at(cursor);
	if new_before != old_before {
		return None;
	}

	let suffix_len = old_after.len().min(new_after.len());
	let (old_middle, old_suffix) = old_after.split_at(old_after.len() - suffix_len);
	let (new_middle, new_suffix) = new_after.split_at(new_after.len() - suffix_len);
	if old_suffix != new_suffix {
		return None;
	}
	Some(make_splice(old_before, old_middle, new_middle, old_suffix))
}

/// The selected text was replaced by something else.
fn replace_range(old: &[char], new: &[char], range: HintRange) -> Option<Vec<Chunk>> {
	let old_prefix = &old[..range.index];
	let old_suffix = &old[range.index + range.len..];
	if new.len() < old_prefix.len() + old_suffix.len() {
		return None;
	}

	let new_prefix = &new[..old_prefix.len()];
	let new_suffix = &new[new.len() - old_suffix.len()..];
	if old_prefix != new_prefix || old_suffix != new_suffix {
		return None;
	}

	let old_middle = &old[old_prefix.len()..old.len() - old_suffix.len()];
	let new_middle = &new[old_prefix.len()..new.len() - old_suffix.len()];
	Some(make_splice(old_prefix, old_middle, new_middle, old_suffix))
}

fn make_splice(before: &[char], old_middle: &[char], new_middle: &[char], after: &[char]) -> Vec<Chunk> {
	[
		(Operation::Equal, before),
		(Operation::Delete, old_middle),
		(Operation::Insert, new_middle),
		(Operation::Equal, after),
	]
	.into_iter()
	.filter(|(_, chars)| !chars.is_empty())
	.map(|(op, chars)| Chunk::new(op, chars))
	.collect()
}
