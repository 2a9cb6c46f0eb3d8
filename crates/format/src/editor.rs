//! Caller-facing entry point: format a text and get back the edits and
//! selections to apply.

use std::future::Future;

use tracing::debug;

use crate::edit::TextEdit;
use crate::error::Result;
use crate::selection::{SelectionRange, normalize};
use crate::sentinel::{SelectionEdits, build_edits_for_selections};

/// What to do with a document after formatting it. Offsets are chars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorOutcome {
	/// The formatter returned the text unchanged.
	NoChange,
	/// Minimal edits with selections tracked through them.
	Changed(SelectionEdits),
	/// Selections could not be tracked: one edit replacing the whole
	/// document, with the old selections clamped to the new length.
	Replaced(SelectionEdits),
}

impl EditorOutcome {
	/// Edits to apply, empty for [`NoChange`](Self::NoChange).
	pub fn edits(&self) -> &[TextEdit] {
		match self {
			Self::NoChange => &[],
			Self::Changed(plan) | Self::Replaced(plan) => &plan.edits,
		}
	}

	/// Selections to set afterwards, if any.
	pub fn selections(&self) -> Option<&[SelectionRange]> {
		match self {
			Self::NoChange => None,
			Self::Changed(plan) | Self::Replaced(plan) => Some(&plan.selections),
		}
	}
}

/// Plans the edits turning `original` into `formatted`, relocating
/// `selections` (char offsets into `original`).
pub fn plan_edits(original: &str, formatted: &str, selections: &[SelectionRange]) -> EditorOutcome {
	if original == formatted {
		return EditorOutcome::NoChange;
	}

	if let Some(plan) = build_edits_for_selections(original, formatted, selections) {
		return EditorOutcome::Changed(plan);
	}

	debug!("replacing the whole document");
	let original_len = original.chars().count();
	let formatted_len = formatted.chars().count();
	let selections = normalize(&normalize(selections, original_len), formatted_len);
	EditorOutcome::Replaced(SelectionEdits {
		edits: vec![TextEdit::new(0, original_len, formatted)],
		selections,
	})
}

/// Formats `text` through `request_format` and plans the resulting edits.
///
/// # Errors
///
/// Propagates the error of `request_format`.
pub async fn format_editor<F, Fut>(text: &str, selections: &[SelectionRange], request_format: F) -> Result<EditorOutcome>
where
	F: FnOnce(String) -> Fut,
	Fut: Future<Output = Result<String>>,
{
	let formatted = request_format(text.to_owned()).await?;
	Ok(plan_edits(text, &formatted, selections))
}
