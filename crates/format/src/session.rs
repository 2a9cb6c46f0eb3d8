//! Formatting an open document end to end.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use ropey::Rope;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::diagnostics::{Diagnostic, ErrorClass, classify_error};
use crate::edit::TextEdit;
use crate::editor::{EditorOutcome, plan_edits};
use crate::encoding::{encode_edits, selections_from_chars, selections_to_chars};
use crate::error::{FormatError, Result};
use crate::formatter::Formatter;
use crate::host::EditorHost;
use crate::notice::{Notice, Notifier, forward_worker_events};
use crate::request::{FormatOptions, FormatOutput, FormatParams, HasConfigParams};
use crate::selection::SelectionRange;
use crate::settings::Settings;

/// What asked for the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTrigger {
	/// An explicit command.
	Command,
	/// The document is being saved.
	Save,
	/// An explicit command limited to the primary selection.
	Selection,
}

/// Why a document was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
	/// The syntax is excluded from format-on-save.
	IgnoredSyntax,
	/// Remote documents are excluded from format-on-save.
	Remote,
	/// The project has no formatter configuration and that is required.
	NoConfig,
	/// The document matches the ignore file.
	Ignored,
	/// No parser handles the document.
	MissingParser,
	/// The document was flagged to be saved without formatting.
	SaveWithoutFormatting,
}

/// Result of [`FormatSession::format_document`]. Offsets are in host units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatOutcome {
	/// Nothing was sent to the formatter, or its answer was a skip.
	Skipped(SkipReason),
	/// The document was already formatted.
	NoChange,
	/// Edits and selections were applied.
	Applied {
		/// Edits in application order.
		edits: Vec<TextEdit>,
		/// Selections after the edits.
		selections: Vec<SelectionRange>,
		/// False when selections could not be tracked and the whole text was
		/// replaced.
		tracked: bool,
	},
	/// The document changed while the formatter ran; nothing was applied.
	Stale,
	/// The formatter reported a syntax error, now shown on the document.
	Diagnostics(Vec<Diagnostic>),
}

/// Maps an editor syntax name to a formatter parser.
pub fn parser_for_syntax(syntax: &str) -> &str {
	match syntax {
		"javascript" | "jsx" => "babel",
		"tsx" => "typescript",
		"flow" => "babel-flow",
		"html+erb" => "erb",
		other => other,
	}
}

/// Ties a [`Formatter`] to settings and user notices.
pub struct FormatSession {
	formatter: Arc<dyn Formatter>,
	settings: RwLock<Settings>,
	notifier: Arc<dyn Notifier>,
	advised: Mutex<HashSet<String>>,
	skip_next_save: Mutex<HashSet<PathBuf>>,
}

impl std::fmt::Debug for FormatSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FormatSession")
			.field("settings", &*self.settings.read())
			.finish_non_exhaustive()
	}
}

impl FormatSession {
	/// Creates a session. The formatter is not started.
	pub fn new(formatter: Arc<dyn Formatter>, settings: Settings, notifier: Arc<dyn Notifier>) -> Self {
		Self {
			formatter,
			settings: RwLock::new(settings),
			notifier,
			advised: Mutex::new(HashSet::new()),
			skip_next_save: Mutex::new(HashSet::new()),
		}
	}

	/// The formatter.
	pub fn formatter(&self) -> &Arc<dyn Formatter> {
		&self.formatter
	}

	/// A snapshot of the current settings.
	pub fn settings(&self) -> Settings {
		self.settings.read().clone()
	}

	/// Replaces the settings. A changed module path takes effect on the next
	/// [`restart`](Self::restart).
	pub fn set_settings(&self, settings: Settings) {
		*self.settings.write() = settings;
	}

	/// Starts the formatter with the configured module path.
	///
	/// # Errors
	///
	/// Returns an error when the formatter cannot be launched.
	pub async fn start(&self) -> Result<()> {
		let module_path = self.settings.read().module_path.clone();
		self.formatter.start(module_path).await
	}

	/// Stops the formatter.
	pub async fn stop(&self) {
		self.formatter.stop().await;
	}

	/// Stops and starts the formatter.
	///
	/// # Errors
	///
	/// Returns an error when the formatter cannot be launched.
	pub async fn restart(&self) -> Result<()> {
		info!("restarting formatter");
		self.formatter.stop().await;
		self.start().await
	}

	/// Makes the next save of the document in `host` skip formatting.
	///
	/// Returns false for documents without a path, which cannot be told
	/// apart between calls.
	pub fn save_without_formatting(&self, host: &dyn EditorHost) -> bool {
		let Some(path) = host.path() else {
			return false;
		};
		debug!(path = %path.display(), "next save skips formatting");
		self.skip_next_save.lock().insert(path);
		true
	}

	/// Forwards formatter lifecycle events to the notifier. Returns `None`
	/// for formatters without lifecycle events.
	pub fn watch_formatter(&self) -> Option<JoinHandle<()>> {
		let events = self.formatter.events()?;
		Some(forward_worker_events(events, self.notifier.clone()))
	}

	/// Formats the document open in `host` and applies the result.
	///
	/// # Errors
	///
	/// Returns [`FormatError::NotReady`] when the formatter is not running,
	/// [`FormatError::Formatter`] for formatter failures without a position,
	/// and transport or host errors as they occur.
	pub async fn format_document(&self, host: &dyn EditorHost, trigger: FormatTrigger) -> Result<FormatOutcome> {
		let settings = self.settings();
		let path = host.path();
		let syntax = host.syntax();
		let remote = host.is_remote();
		let on_save = trigger == FormatTrigger::Save;

		if on_save {
			if path.as_ref().is_some_and(|p| self.skip_next_save.lock().remove(p)) {
				debug!(path = ?path, "saved without formatting");
				return Ok(FormatOutcome::Skipped(SkipReason::SaveWithoutFormatting));
			}
			if syntax.as_deref().is_some_and(|s| settings.ignores_syntax_on_save(s)) {
				debug!(syntax = ?syntax, "syntax ignored on save");
				return Ok(FormatOutcome::Skipped(SkipReason::IgnoredSyntax));
			}
			if remote && settings.ignore_remote_on_save {
				debug!(path = ?path, "remote document ignored on save");
				return Ok(FormatOutcome::Skipped(SkipReason::Remote));
			}
		}

		if !self.formatter.is_ready().await {
			self.notifier.notify(Notice::not_running());
			return Err(FormatError::NotReady);
		}

		let text = host.text();
		let selections = host.selections();
		host.set_diagnostics(Vec::new());

		let mut options = FormatOptions::default();
		match &path {
			Some(path) => options.filepath = Some(path.clone()),
			None => options.parser = syntax.as_deref().map(|s| parser_for_syntax(s).to_owned()),
		}
		if trigger == FormatTrigger::Selection
			&& let Some(primary) = selections.first()
		{
			options.range_start = Some(primary.start);
			options.range_end = Some(primary.end);
		}

		let path_for_config = path.clone().or_else(|| host.workspace_path());
		let has_config = if remote {
			false
		} else {
			let params = HasConfigParams {
				path_for_config: path_for_config.clone(),
			};
			let has_config = self.formatter.has_config(params).await?;
			if !has_config && settings.ignore_without_config {
				debug!(path = ?path, "no formatter config");
				return Ok(FormatOutcome::Skipped(SkipReason::NoConfig));
			}
			has_config
		};
		if !has_config {
			options.merge_defaults(&settings.default_options);
		}

		let ignore_path = match (on_save, &path_for_config) {
			(true, Some(config_path)) => Some(ignore_path(host.workspace_path(), config_path, &settings.ignore_file_name)),
			_ => None,
		};

		let params = FormatParams {
			original: text.clone(),
			path_for_config,
			ignore_path,
			options,
		};
		let formatted = match self.formatter.format_once(params).await? {
			FormatOutput::Formatted { formatted } => formatted,
			FormatOutput::Ignored { .. } => {
				info!(path = ?path, "document ignored");
				return Ok(FormatOutcome::Skipped(SkipReason::Ignored));
			}
			FormatOutput::MissingParser { .. } => return Ok(self.missing_parser(syntax.as_deref())),
			FormatOutput::Error { error } => match classify_error(&error) {
				ErrorClass::MissingParser => return Ok(self.missing_parser(syntax.as_deref())),
				ErrorClass::Diagnostic(diagnostic) => {
					debug!(stack = ?error.stack, line = diagnostic.line, "formatter syntax error");
					let diagnostics = vec![diagnostic];
					host.set_diagnostics(diagnostics.clone());
					return Ok(FormatOutcome::Diagnostics(diagnostics));
				}
				ErrorClass::Unrecognized => {
					warn!(name = %error.name, message = %error.message, "formatter failed");
					debug!(stack = ?error.stack, "formatter stack");
					return Err(error.into());
				}
			},
		};

		let encoding = host.encoding();
		let rope = Rope::from_str(&text);
		let char_selections = selections_to_chars(&rope, &selections, encoding);
		let (plan, tracked) = match plan_edits(&text, &formatted, &char_selections) {
			EditorOutcome::NoChange => {
				info!(path = ?path, "no changes");
				return Ok(FormatOutcome::NoChange);
			}
			EditorOutcome::Changed(plan) => (plan, true),
			EditorOutcome::Replaced(plan) => (plan, false),
		};

		if host.text() != text {
			debug!(path = ?path, "document changed while formatting; discarding result");
			return Ok(FormatOutcome::Stale);
		}

		let (edits, edited) = encode_edits(&text, &plan.edits, encoding);
		let selections = selections_from_chars(&edited, &plan.selections, encoding);
		host.apply(&edits, &selections)?;
		info!(path = ?path, edits = edits.len(), tracked, "applied formatted changes");

		Ok(FormatOutcome::Applied {
			edits,
			selections,
			tracked,
		})
	}

	fn missing_parser(&self, syntax: Option<&str>) -> FormatOutcome {
		let syntax = syntax.unwrap_or("plain text");
		if self.advised.lock().insert(syntax.to_owned()) {
			self.notifier.notify(Notice::missing_parser(syntax));
		}
		info!(syntax, "no parser");
		FormatOutcome::Skipped(SkipReason::MissingParser)
	}
}

fn ignore_path(workspace: Option<PathBuf>, path_for_config: &Path, file_name: &str) -> PathBuf {
	let dir = workspace.unwrap_or_else(|| path_for_config.parent().map(Path::to_path_buf).unwrap_or_default());
	dir.join(file_name)
}
