//! A [`FormatEngine`] that pipes the document through an external program.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;

use async_trait::async_trait;
use fmtkit_format::{FormatEngine, FormatOutput, FormatParams, FormatterError, HasConfigParams};
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, trace};

use crate::project::{DEFAULT_CONFIG_FILES, find_config, infer_parser, is_ignored};

/// Environment variable carrying the formatter options as JSON.
pub const OPTIONS_ENV: &str = "FMTKIT_OPTIONS";

/// `<Name>Error: message` at the start of a line, after optional log prefixes.
static ERROR_HEAD: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?m)^(?:\[error\]\s*)?(?:[^:\n]*:\s*)?(\w*Error):\s*").expect("invalid error regex"));

/// Log prefixes the formatter puts on every stderr line.
static LINE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\[error\] ?").expect("invalid prefix regex"));

/// Stderr fragments meaning no parser handles the document.
const MISSING_PARSER_MARKERS: &[&str] = &["Couldn't resolve parser", "No parser could be inferred"];

/// Runs a formatter program once per request.
///
/// Arguments may contain `{filepath}` and `{parser}` placeholders, replaced
/// per request. The document is written to the program's stdin and the
/// formatted text read from its stdout.
#[derive(Debug, Clone)]
pub struct ProgramEngine {
	program: PathBuf,
	args: Vec<String>,
	config_files: Vec<String>,
}

impl ProgramEngine {
	/// Creates an engine for an already resolved program path.
	pub fn new(program: impl Into<PathBuf>) -> Self {
		Self {
			program: program.into(),
			args: Vec::new(),
			config_files: DEFAULT_CONFIG_FILES.iter().map(|s| (*s).to_owned()).collect(),
		}
	}

	/// Locates `program` and creates an engine for it.
	///
	/// Bare names are looked up on `PATH`; anything with a directory part
	/// must name an existing file.
	///
	/// # Errors
	///
	/// Returns the failure to report through the `startDidFail` handshake.
	pub fn locate(program: &Path) -> Result<Self, FormatterError> {
		let is_bare = program.components().count() == 1 && !program.is_absolute();
		let resolved = if is_bare {
			which::which(program).map_err(|e| FormatterError::new("NotFound", format!("{}: {e}", program.display())))?
		} else {
			program.to_path_buf()
		};

		match resolved.metadata() {
			Ok(meta) if meta.is_file() => Ok(Self::new(resolved)),
			Ok(_) => Err(FormatterError::new("NotAFile", format!("{} is not a file", resolved.display()))),
			Err(e) => Err(FormatterError::new("NotFound", format!("{}: {e}", resolved.display()))),
		}
	}

	/// Sets the argument template.
	#[must_use]
	pub fn args(mut self, args: Vec<String>) -> Self {
		self.args = args;
		self
	}

	/// Replaces the configuration file names `hasConfig` looks for.
	#[must_use]
	pub fn config_files(mut self, names: Vec<String>) -> Self {
		self.config_files = names;
		self
	}

	/// The program path.
	pub fn program(&self) -> &Path {
		&self.program
	}

	fn expand_args(&self, filepath: Option<&Path>, parser: &str) -> Vec<String> {
		let filepath = filepath.map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
		self.args
			.iter()
			.map(|arg| arg.replace("{filepath}", &filepath).replace("{parser}", parser))
			.collect()
	}

	async fn run(&self, params: &FormatParams, parser: &str) -> FormatOutput {
		let mut options = params.options.clone();
		options.parser = Some(parser.to_owned());
		let options = match serde_json::to_string(&options) {
			Ok(json) => json,
			Err(e) => return FormatterError::new("InvalidOptions", e.to_string()).into(),
		};

		let args = self.expand_args(params.options.filepath.as_deref(), parser);
		trace!(program = %self.program.display(), ?args, "formatter.spawn");
		let mut cmd = Command::new(&self.program);
		cmd.args(&args)
			.env(OPTIONS_ENV, options)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);
		if let Some(dir) = params.options.filepath.as_deref().and_then(Path::parent)
			&& dir.is_dir()
		{
			cmd.current_dir(dir);
		}

		let mut child = match cmd.spawn() {
			Ok(child) => child,
			Err(e) => return FormatterError::new("SpawnError", format!("{}: {e}", self.program.display())).into(),
		};

		// The formatter may start writing before it has read all input.
		if let Some(mut stdin) = child.stdin.take() {
			let original = params.original.clone();
			tokio::spawn(async move {
				if let Err(e) = stdin.write_all(original.as_bytes()).await {
					debug!(error = %e, "formatter closed stdin early");
				}
			});
		}

		let output = match child.wait_with_output().await {
			Ok(output) => output,
			Err(e) => return FormatterError::new("SpawnError", e.to_string()).into(),
		};

		if output.status.success() {
			return match String::from_utf8(output.stdout) {
				Ok(formatted) => FormatOutput::formatted(formatted),
				Err(e) => FormatterError::new("InvalidOutput", format!("formatter output is not UTF-8: {e}")).into(),
			};
		}

		let stderr = String::from_utf8_lossy(&output.stderr);
		if MISSING_PARSER_MARKERS.iter().any(|marker| stderr.contains(marker)) {
			return FormatOutput::missing_parser();
		}
		parse_failure(&stderr, output.status.code()).into()
	}
}

/// Builds a formatter error from the stderr of a failed run.
fn parse_failure(stderr: &str, code: Option<i32>) -> FormatterError {
	let stderr = LINE_PREFIX.replace_all(stderr.trim_end(), "");
	if stderr.is_empty() {
		let status = code.map_or_else(|| "a signal".to_owned(), |c| format!("status {c}"));
		return FormatterError::new("FormatterError", format!("formatter exited with {status}"));
	}

	match ERROR_HEAD.captures(&stderr) {
		Some(caps) => {
			let head = caps.get(0).map_or(0, |m| m.end());
			FormatterError::new(&caps[1], format!("{}\n", stderr[head..].trim_end()))
		}
		None => FormatterError::new("FormatterError", stderr.to_string()),
	}
}

#[async_trait]
impl FormatEngine for ProgramEngine {
	async fn format(&self, params: FormatParams) -> FormatOutput {
		let filepath = params.options.filepath.as_deref();
		if let (Some(path), Some(ignore_file)) = (filepath, params.ignore_path.as_deref())
			&& is_ignored(ignore_file, path)
		{
			info!(path = %path.display(), "formatter.ignored");
			return FormatOutput::ignored();
		}

		let parser = params.options.parser.clone().or_else(|| filepath.and_then(infer_parser).map(str::to_owned));
		let Some(parser) = parser else {
			debug!(path = ?filepath, "formatter.no_parser");
			return FormatOutput::missing_parser();
		};

		self.run(&params, &parser).await
	}

	async fn has_config(&self, params: HasConfigParams) -> bool {
		let Some(path) = params.path_for_config else {
			return false;
		};
		let found = find_config(&path, &self.config_files);
		debug!(path = %path.display(), config = ?found, "formatter.config");
		found.is_some()
	}
}
