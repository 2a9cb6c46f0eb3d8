//! Character-level text diffing.
//!
//! [`diff`] computes an edit script turning one string into another. The
//! algorithm is Myers' O(ND) middle-snake bisection, preceded by a handful of
//! cheap shortcuts (common prefix/suffix trimming, substring containment and
//! the half-match heuristic) and followed by a merge pass that leaves the
//! script in a canonical form.
//!
//! The unit of comparison is the Unicode scalar value, so no operation ever
//! starts or ends inside a code point. Offsets accepted and reported by this
//! crate are char indices.
//!
//! [`diff_with_hint`] additionally takes a [`CursorHint`]; when the change is a
//! simple splice around the hinted position the script is synthesized
//! directly instead of running the full diff.

#![warn(missing_docs)]

mod cleanup;
mod common;
mod compute;
mod hint;
mod types;

#[cfg(test)]
mod tests;

pub use hint::{CursorHint, HintRange};
pub use types::{Edit, Operation, source_text, target_text};

use crate::types::Chunk;

/// Computes the edit script turning `a` into `b`.
///
/// Returns an empty script when both texts are empty, and a single
/// [`Operation::Equal`] when they are identical.
pub fn diff(a: &str, b: &str) -> Vec<Edit> {
	if let Some(script) = trivial(a, b) {
		return script;
	}

	let a: Vec<char> = a.chars().collect();
	let b: Vec<char> = b.chars().collect();
	finish(compute::diff_main(&a, &b))
}

/// Computes the edit script turning `a` into `b`, trying the cursor splice
/// shortcut first.
///
/// The result is always a valid script for `(a, b)`; the hint only decides
/// where an ambiguous insertion or deletion is placed.
pub fn diff_with_hint(a: &str, b: &str, hint: CursorHint) -> Vec<Edit> {
	if let Some(script) = trivial(a, b) {
		return script;
	}

	let a: Vec<char> = a.chars().collect();
	let b: Vec<char> = b.chars().collect();
	if let Some(chunks) = hint::splice(&a, &b, hint) {
		return finish(chunks);
	}
	finish(compute::diff_main(&a, &b))
}

fn trivial(a: &str, b: &str) -> Option<Vec<Edit>> {
	if a != b {
		return None;
	}
	if a.is_empty() { Some(Vec::new()) } else { Some(vec![Edit::equal(a)]) }
}

fn finish(chunks: Vec<Chunk>) -> Vec<Edit> {
	chunks.into_iter().map(Chunk::into_edit).collect()
}
