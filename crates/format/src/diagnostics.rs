//! Turning formatter errors into positioned diagnostics.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::request::FormatterError;

/// Error name reported when no parser can handle the document.
const UNDEFINED_PARSER: &str = "UndefinedParserError";

/// `Unexpected token (3:14)` followed by a newline.
static LINE_COL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d+):(\d+)\)\n").expect("invalid line:col regex"));

/// The highlighted line of a code frame: `> 12 | ...`.
static FRAME_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^>\s*?(\d+)\s\|\s").expect("invalid frame regex"));

/// The caret line under a code frame: `   |     ^^^`.
static FRAME_CARET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s+\|(\s+)\^+$").expect("invalid caret regex"));

/// A stack trace appended to a message.
static TRAILING_STACK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\n\s*?at\s+").expect("invalid stack regex"));

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
	/// The document could not be formatted.
	Error,
	/// Advisory.
	Warning,
}

/// A formatter error anchored to a document position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
	/// 1-based line.
	pub line: usize,
	/// 1-based column; 0 when the formatter gave none.
	pub column: usize,
	/// Message shown to the user.
	pub message: String,
	/// Severity.
	pub severity: Severity,
}

/// How a formatter error is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClass {
	/// No parser handles the document; a silent skip.
	MissingParser,
	/// A syntax error with a position.
	Diagnostic(Diagnostic),
	/// Anything else; logged and dropped.
	Unrecognized,
}

/// Classifies a formatter error.
pub fn classify_error(error: &FormatterError) -> ErrorClass {
	if error.name == UNDEFINED_PARSER {
		return ErrorClass::MissingParser;
	}

	let Some((line, column)) = position(&error.message) else {
		return ErrorClass::Unrecognized;
	};

	// A message without a separate stack usually has the trace appended.
	let message = match error.stack {
		Some(_) => error.message.as_str(),
		None => TRAILING_STACK.split(&error.message).next().unwrap_or_default(),
	};

	ErrorClass::Diagnostic(Diagnostic {
		line,
		column,
		message: message.to_owned(),
		severity: Severity::Error,
	})
}

fn position(message: &str) -> Option<(usize, usize)> {
	if let Some(caps) = LINE_COL.captures(message) {
		return Some((caps[1].parse().ok()?, caps[2].parse().ok()?));
	}

	let line = FRAME_LINE.captures(message)?[1].parse().ok()?;
	// The gutter ends in `| `, so the caret's whitespace width is its 1-based column.
	let column = FRAME_CARET
		.captures(message)
		.map_or(0, |caps| caps[1].chars().count());
	Some((line, column))
}
