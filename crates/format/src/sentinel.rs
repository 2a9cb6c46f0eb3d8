//! Tracking selections through a formatter run with sentinel characters.

use fmtkit_diff::{Edit, Operation};
use tracing::{debug, warn};

use crate::edit::TextEdit;
use crate::selection::{SelectionRange, normalize};

/// Sentinel candidates, tried in order. A candidate is usable only when it
/// occurs in neither the original nor the formatted text.
pub const SENTINEL_CANDIDATES: [char; 5] = ['\u{FFFD}', '\u{FFFF}', '\u{1F094}', '\u{1F08D}', '\u{E004}'];

/// Edits turning the original into the formatted text, plus the selections
/// relocated into the formatted text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionEdits {
	/// Char-offset edits, applied in order.
	pub edits: Vec<TextEdit>,
	/// Selections in char offsets of the formatted text.
	pub selections: Vec<SelectionRange>,
}

/// Returns the first candidate absent from both texts.
pub fn pick_sentinel(original: &str, formatted: &str) -> Option<char> {
	SENTINEL_CANDIDATES
		.into_iter()
		.find(|&c| !original.contains(c) && !formatted.contains(c))
}

/// Computes the edits from `original` to `formatted` and where `selections`
/// (char offsets into `original`) land afterwards.
///
/// Selections are sorted, clamped and overlapping ones merged first; the
/// returned selections correspond to that normalized list. Returns `None`
/// when every sentinel candidate occurs in one of the texts, in which case
/// the caller should replace the whole document instead.
pub fn build_edits_for_selections(original: &str, formatted: &str, selections: &[SelectionRange]) -> Option<SelectionEdits> {
	let selections = normalize(selections, original.chars().count());
	if selections.is_empty() {
		let (edits, _) = walk(&fmtkit_diff::diff(original, formatted), None);
		return Some(SelectionEdits { edits, selections });
	}

	let Some(sentinel) = pick_sentinel(original, formatted) else {
		debug!("no free sentinel character; selections cannot be tracked");
		return None;
	};

	let marked = insert_sentinels(original, &selections, sentinel);
	let script = fmtkit_diff::diff(&marked, formatted);
	let (edits, boundaries) = walk(&script, Some(sentinel));

	if boundaries.len() != selections.len() * 2 {
		warn!(
			expected = selections.len() * 2,
			found = boundaries.len(),
			"sentinel count mismatch; falling back to a full replace"
		);
		return None;
	}

	let selections = boundaries
		.chunks_exact(2)
		.map(|pair| SelectionRange::new(pair[0], pair[1]))
		.collect();
	Some(SelectionEdits { edits, selections })
}

/// Splices `sentinel` at every selection boundary. `selections` must be
/// normalized so the boundaries are non-decreasing.
fn insert_sentinels(text: &str, selections: &[SelectionRange], sentinel: char) -> String {
	let mut boundaries = selections.iter().flat_map(|sel| [sel.start, sel.end]).peekable();
	let mut out = String::with_capacity(text.len() + selections.len() * 2 * sentinel.len_utf8());

	for (idx, c) in text.chars().enumerate() {
		while boundaries.next_if(|&b| b == idx).is_some() {
			out.push(sentinel);
		}
		out.push(c);
	}
	for _ in boundaries {
		out.push(sentinel);
	}
	out
}

/// Turns a script into sequential replace edits, collecting the output
/// offset of every deleted sentinel.
fn walk(script: &[Edit], sentinel: Option<char>) -> (Vec<TextEdit>, Vec<usize>) {
	let mut edits = Vec::new();
	let mut boundaries = Vec::new();
	let mut offset = 0;
	let mut to_remove = 0;

	// The trailing empty Equal flushes a final pending delete.
	let flush = Edit::equal("");
	for edit in script.iter().chain(std::iter::once(&flush)) {
		let len = edit.char_len();
		match edit.op {
			Operation::Delete => {
				to_remove += len;
				if let Some(sentinel) = sentinel {
					for _ in edit.text.chars().filter(|&c| c == sentinel) {
						boundaries.push(offset);
						to_remove -= 1;
					}
				}
			}
			Operation::Equal => {
				if to_remove > 0 {
					edits.push(TextEdit::new(offset, offset + to_remove, ""));
				}
				to_remove = 0;
				offset += len;
			}
			Operation::Insert => {
				edits.push(TextEdit::new(offset, offset + to_remove, edit.text.as_str()));
				to_remove = 0;
				offset += len;
			}
		}
	}
	(edits, boundaries)
}
