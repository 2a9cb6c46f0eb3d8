//! Normalization of raw edit scripts.

use std::mem;

use crate::common::{common_prefix, common_suffix};
use crate::types::{Chunk, Operation};

/// Brings a script into canonical form.
///
/// Empty segments are dropped, runs of the same kind are coalesced, each edit
/// run becomes at most one delete followed by one insert, text shared by both
/// sides of a run is moved into the surrounding equalities, and single edits
/// are slid over neighbouring equalities when that removes an equality.
pub(crate) fn cleanup_merge(chunks: &mut Vec<Chunk>) {
	loop {
		merge_pass(chunks);
		if !shift_pass(chunks) {
			break;
		}
	}
}

fn merge_pass(chunks: &mut Vec<Chunk>) {
	chunks.retain(|chunk| !chunk.chars.is_empty());
	// Trailing equality flushes the last edit run.
	chunks.push(Chunk {
		op: Operation::Equal,
		chars: Vec::new(),
	});

	let mut pointer = 0;
	let mut count_delete = 0;
	let mut count_insert = 0;
	let mut text_delete: Vec<char> = Vec::new();
	let mut text_insert: Vec<char> = Vec::new();

	while pointer < chunks.len() {
		match chunks[pointer].op {
			Operation::Insert => {
				count_insert += 1;
				text_insert.extend_from_slice(&chunks[pointer].chars);
				pointer += 1;
			}
			Operation::Delete => {
				count_delete += 1;
				text_delete.extend_from_slice(&chunks[pointer].chars);
				pointer += 1;
			}
			Operation::Equal => {
				let run = count_delete + count_insert;
				if run > 1 {
					if count_delete != 0 && count_insert != 0 {
						let prefix = common_prefix(&text_insert, &text_delete);
						if prefix != 0 {
							let run_start = pointer - run;
							if run_start > 0 && chunks[run_start - 1].op == Operation::Equal {
								chunks[run_start - 1].chars.extend_from_slice(&text_insert[..prefix]);
							} else {
								chunks.insert(run_start, Chunk::new(Operation::Equal, &text_insert[..prefix]));
								pointer += 1;
							}
							text_insert.drain(..prefix);
							text_delete.drain(..prefix);
						}

						let suffix = common_suffix(&text_insert, &text_delete);
						if suffix != 0 {
							let tail = text_insert.split_off(text_insert.len() - suffix);
							text_delete.truncate(text_delete.len() - suffix);
							chunks[pointer].chars.splice(0..0, tail);
						}
					}

					pointer -= run;
					let mut merged = Vec::with_capacity(2);
					if !text_delete.is_empty() {
						merged.push(Chunk {
							op: Operation::Delete,
							chars: mem::take(&mut text_delete),
						});
					}
					if !text_insert.is_empty() {
						merged.push(Chunk {
							op: Operation::Insert,
							chars: mem::take(&mut text_insert),
						});
					}
					let len = merged.len();
					chunks.splice(pointer..pointer + run, merged);
					pointer += len;
				}

				if pointer != 0 && chunks[pointer - 1].op == Operation::Equal {
					let chars = chunks.remove(pointer).chars;
					chunks[pointer - 1].chars.extend(chars);
				} else {
					pointer += 1;
				}

				count_delete = 0;
				count_insert = 0;
				text_delete.clear();
				text_insert.clear();
			}
		}
	}

	if chunks.last().is_some_and(|chunk| chunk.chars.is_empty()) {
		chunks.pop();
	}
}

/// Slides single edits surrounded by equalities sideways when the edit ends
/// with the previous equality or starts with the next one.
///
/// `ABAC` with `BA` inserted becomes `AB` inserted before `AC`. Returns
/// whether anything moved.
fn shift_pass(chunks: &mut Vec<Chunk>) -> bool {
	let mut changed = false;
	let mut pointer = 1;
	while pointer + 1 < chunks.len() {
		if chunks[pointer - 1].op == Operation::Equal && chunks[pointer + 1].op == Operation::Equal {
			let prev_empty = chunks[pointer - 1].chars.is_empty();
			let next_empty = chunks[pointer + 1].chars.is_empty();
			if !prev_empty && chunks[pointer].chars.ends_with(&chunks[pointer - 1].chars) {
				let prev = chunks.remove(pointer - 1).chars;
				let edit = &mut chunks[pointer - 1].chars;
				edit.truncate(edit.len() - prev.len());
				edit.splice(0..0, prev.iter().copied());
				chunks[pointer].chars.splice(0..0, prev);
				changed = true;
			} else if !next_empty && chunks[pointer].chars.starts_with(&chunks[pointer + 1].chars) {
				let next = chunks.remove(pointer + 1).chars;
				chunks[pointer - 1].chars.extend_from_slice(&next);
				let edit = &mut chunks[pointer].chars;
				edit.drain(..next.len());
				edit.extend(next);
				changed = true;
			}
		}
		pointer += 1;
	}
	changed
}
