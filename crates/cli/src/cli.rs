use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use fmtkit_format::{FormatTrigger, OffsetEncoding, SelectionRange};

#[derive(Parser, Debug)]
#[command(name = "fmtkit")]
#[command(about = "Format a file through the fmtkit worker, keeping selections in place")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// File to format
	pub file: PathBuf,

	/// Worker binary
	#[arg(long, value_name = "PATH", default_value = "fmtkit-service")]
	pub worker: PathBuf,

	/// Formatter program handed to the worker (overrides `module-path`)
	#[arg(long, value_name = "PROGRAM")]
	pub formatter: Option<PathBuf>,

	/// Argument for the formatter program; `{filepath}` and `{parser}` are
	/// substituted. Repeatable.
	#[arg(long = "formatter-arg", value_name = "ARG", allow_hyphen_values = true)]
	pub formatter_args: Vec<String>,

	/// Caret offset
	#[arg(long, value_name = "N")]
	pub cursor: Option<usize>,

	/// Selection as START:END. Repeatable.
	#[arg(long = "selection", value_name = "START:END", value_parser = parse_selection)]
	pub selections: Vec<SelectionRange>,

	/// Unit of the offsets given and printed
	#[arg(long, value_enum, default_value_t = Encoding::Utf16)]
	pub encoding: Encoding,

	/// Syntax used when the formatter cannot tell from the file name
	#[arg(long)]
	pub syntax: Option<String>,

	/// Global settings file (TOML)
	#[arg(long, value_name = "PATH")]
	pub settings: Option<PathBuf>,

	/// Workspace root; its `fmtkit.toml`, if any, overrides the global settings
	#[arg(long, value_name = "DIR")]
	pub workspace: Option<PathBuf>,

	/// Format as on save: honours the ignore file and the on-save exclusions
	#[arg(long)]
	pub save: bool,

	/// Format only the first selection; the formatter receives it as
	/// `rangeStart`/`rangeEnd`
	#[arg(long, conflicts_with = "save")]
	pub range: bool,

	/// Write the result back to the file
	#[arg(long, short)]
	pub write: bool,

	/// Verbose logging
	#[arg(short, long)]
	pub verbose: bool,
}

impl Cli {
	/// What the run stands for.
	pub fn trigger(&self) -> FormatTrigger {
		if self.save {
			FormatTrigger::Save
		} else if self.range {
			FormatTrigger::Selection
		} else {
			FormatTrigger::Command
		}
	}

	/// Selections to start from, in argument order.
	pub fn initial_selections(&self) -> Vec<SelectionRange> {
		let mut selections: Vec<_> = self.cursor.map(SelectionRange::caret).into_iter().collect();
		selections.extend(self.selections.iter().copied());
		if selections.is_empty() {
			selections.push(SelectionRange::caret(0));
		}
		selections.sort();
		selections
	}
}

/// Offset units accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Encoding {
	/// Bytes
	Utf8,
	/// UTF-16 code units
	Utf16,
	/// Code points
	Utf32,
}

impl From<Encoding> for OffsetEncoding {
	fn from(encoding: Encoding) -> Self {
		match encoding {
			Encoding::Utf8 => Self::Utf8,
			Encoding::Utf16 => Self::Utf16,
			Encoding::Utf32 => Self::Utf32,
		}
	}
}

fn parse_selection(arg: &str) -> Result<SelectionRange, String> {
	let (start, end) = arg.split_once(':').ok_or_else(|| format!("expected START:END, got `{arg}`"))?;
	let parse = |s: &str| s.trim().parse::<usize>().map_err(|e| format!("invalid offset `{s}`: {e}"));
	Ok(SelectionRange::new(parse(start)?, parse(end)?))
}
