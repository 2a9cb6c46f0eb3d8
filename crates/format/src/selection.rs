use serde::{Deserialize, Serialize};

/// A selection as `start..end` offsets into a document; a caret when empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SelectionRange {
	/// Start offset, inclusive.
	pub start: usize,
	/// End offset, exclusive.
	pub end: usize,
}

impl SelectionRange {
	/// Creates a range, swapping the bounds when `start > end`.
	pub const fn new(start: usize, end: usize) -> Self {
		if start <= end { Self { start, end } } else { Self { start: end, end: start } }
	}

	/// A collapsed selection at `offset`.
	pub const fn caret(offset: usize) -> Self {
		Self { start: offset, end: offset }
	}

	/// Returns true for a caret.
	pub const fn is_empty(&self) -> bool {
		self.start == self.end
	}

	/// Length in offset units.
	pub const fn len(&self) -> usize {
		self.end - self.start
	}

	/// Clamps both bounds to `len`.
	#[must_use]
	pub fn clamp(self, len: usize) -> Self {
		Self {
			start: self.start.min(len),
			end: self.end.min(len),
		}
	}
}

/// Sorts, clamps and merges overlapping ranges so the result is ordered by
/// start and non-overlapping. Touching ranges stay separate.
pub(crate) fn normalize(selections: &[SelectionRange], len: usize) -> Vec<SelectionRange> {
	let mut sorted: Vec<_> = selections.iter().map(|sel| (*sel).clamp(len)).collect();
	sorted.sort_unstable();

	let mut merged: Vec<SelectionRange> = Vec::with_capacity(sorted.len());
	for sel in sorted {
		match merged.last_mut() {
			Some(last) if sel.start < last.end || (sel == *last) => last.end = last.end.max(sel.end),
			_ => merged.push(sel),
		}
	}
	merged
}
