//! Formatting documents through an external formatter without losing the
//! user's selections.
//!
//! The formatter only sees text. To find out where each selection ends up,
//! [`build_edits_for_selections`] splices a pair of sentinel characters around
//! every selection, diffs the sentinel-laden original against the formatted
//! output, and reads the selection boundaries back from the deleted
//! sentinels. The same diff yields a minimal list of [`TextEdit`]s, so the
//! document is patched in place instead of being replaced wholesale.
//!
//! [`FormatSession`] wires this to an [`EditorHost`] and a [`Formatter`]: it
//! resolves options and [`Settings`], talks to the formatter, classifies
//! formatter errors into [`Diagnostic`]s and reports lifecycle problems as
//! [`Notice`]s.

#![warn(missing_docs)]

mod diagnostics;
mod edit;
mod editor;
mod encoding;
mod error;
mod formatter;
mod host;
mod notice;
mod request;
mod selection;
mod sentinel;
mod session;
mod settings;

pub use diagnostics::{Diagnostic, ErrorClass, Severity, classify_error};
pub use edit::{TextEdit, apply_edits, apply_edits_to_rope};
pub use editor::{EditorOutcome, format_editor, plan_edits};
pub use encoding::{OffsetEncoding, char_to_offset, encode_edits, offset_to_char};
pub use error::{FormatError, HostError, Result, SettingsError};
pub use formatter::{FormatEngine, Formatter, InProcessFormatter, SubprocessFormatter};
pub use host::{EditorHost, MemoryHost};
pub use notice::{Notice, NoticeAction, Notifier, forward_worker_events, notice_for_event};
pub use request::{FormatOptions, FormatOutput, FormatParams, FormatterError, HasConfigParams};
pub use selection::SelectionRange;
pub use sentinel::{SENTINEL_CANDIDATES, SelectionEdits, build_edits_for_selections, pick_sentinel};
pub use session::{FormatOutcome, FormatSession, FormatTrigger, SkipReason, parser_for_syntax};
pub use settings::{FormatterKind, Settings, SettingsLayer};
