//! `fmtkit`: format one file through the formatter worker.

mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use fmtkit_format::{
	EditorHost, FormatOutcome, FormatSession, Formatter, FormatterKind, InProcessFormatter, MemoryHost,
	Notice, Notifier, Settings, SettingsLayer, SubprocessFormatter,
};
use fmtkit_service::ProgramEngine;
use fmtkit_worker::CommandLauncher;
use tracing::{debug, info};

use crate::cli::Cli;

/// Workspace settings file looked up in `--workspace`.
const WORKSPACE_SETTINGS: &str = "fmtkit.toml";

/// Prints notices to stderr.
struct StderrNotifier;

impl Notifier for StderrNotifier {
	fn notify(&self, notice: Notice) {
		let actions: Vec<_> = notice.actions.iter().map(|a| a.label()).collect();
		eprintln!("{}: {}", notice.title, notice.body);
		if !actions.is_empty() {
			eprintln!("  [{}]", actions.join("] ["));
		}
	}
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	let args = Cli::parse();
	let settings = load_settings(&args)?;
	setup_tracing(if args.verbose { "debug" } else { settings.log_filter() });

	let file = std::path::absolute(&args.file).with_context(|| format!("invalid path {}", args.file.display()))?;
	let text = std::fs::read_to_string(&file).with_context(|| format!("failed to read {}", file.display()))?;

	let formatter = build_formatter(&args, &settings)?;
	let session = FormatSession::new(formatter, settings, Arc::new(StderrNotifier));
	let _events = session.watch_formatter();
	session.start().await.context("failed to start the formatter")?;

	let mut host = MemoryHost::new(&text)
		.with_path(&file)
		.with_encoding(args.encoding.into())
		.with_selections(args.initial_selections());
	if let Some(syntax) = &args.syntax {
		host = host.with_syntax(syntax);
	}
	if let Some(workspace) = &args.workspace {
		host = host.with_workspace(workspace);
	}

	let outcome = session.format_document(&host, args.trigger()).await;
	session.stop().await;
	let outcome = outcome.with_context(|| format!("failed to format {}", file.display()))?;

	report(&file, &host, &outcome);
	if args.write && matches!(outcome, FormatOutcome::Applied { .. }) {
		std::fs::write(&file, host.text()).with_context(|| format!("failed to write {}", file.display()))?;
		info!(path = %file.display(), "written");
	}
	Ok(())
}

fn load_settings(args: &Cli) -> anyhow::Result<Settings> {
	let global = match &args.settings {
		Some(path) => SettingsLayer::load(path)?,
		None => SettingsLayer::default(),
	};
	let workspace = match &args.workspace {
		Some(dir) if dir.join(WORKSPACE_SETTINGS).is_file() => SettingsLayer::load(&dir.join(WORKSPACE_SETTINGS))?,
		_ => SettingsLayer::default(),
	};

	let mut settings = Settings::resolve(&global, &workspace)?;
	if let Some(formatter) = &args.formatter {
		settings.module_path = Some(formatter.clone());
	}
	Ok(settings)
}

fn build_formatter(args: &Cli, settings: &Settings) -> anyhow::Result<Arc<dyn Formatter>> {
	let formatter: Arc<dyn Formatter> = match settings.formatter {
		FormatterKind::Subprocess => {
			if settings.module_path.is_none() {
				bail!("no formatter program: pass `--formatter` or set `module-path`");
			}
			let launcher = CommandLauncher::new(&args.worker)
				.args(args.formatter_args.iter().map(|arg| format!("--arg={arg}")))
				.args(args.verbose.then_some("--verbose"))
				.inherit_stderr(true);
			debug!(worker = %launcher.program().display(), "using worker process");
			Arc::new(SubprocessFormatter::new(Arc::new(launcher), settings.supervisor_config()))
		}
		FormatterKind::InProcess => {
			let Some(program) = &settings.module_path else {
				bail!("no formatter program: pass `--formatter` or set `module-path`");
			};
			let engine = ProgramEngine::locate(program)?.args(args.formatter_args.clone());
			debug!(program = %engine.program().display(), "using in-process formatter");
			Arc::new(InProcessFormatter::new(Arc::new(engine)))
		}
	};
	Ok(formatter)
}

fn report(file: &Path, host: &MemoryHost, outcome: &FormatOutcome) {
	match outcome {
		FormatOutcome::Applied {
			edits,
			selections,
			tracked,
		} => {
			println!("{}: {} edit(s){}", file.display(), edits.len(), if *tracked { "" } else { " (whole document)" });
			for selection in selections {
				println!("selection {}:{}", selection.start, selection.end);
			}
		}
		FormatOutcome::NoChange => println!("{}: already formatted", file.display()),
		FormatOutcome::Skipped(reason) => println!("{}: skipped ({reason:?})", file.display()),
		FormatOutcome::Stale => println!("{}: changed while formatting", file.display()),
		FormatOutcome::Diagnostics(diagnostics) => {
			for d in diagnostics {
				println!("{}:{}:{}: {}", file.display(), d.line, d.column, d.message.lines().next().unwrap_or_default());
			}
		}
	}
	debug!(selections = ?host.selections(), "final selections");
}

fn setup_tracing(default_filter: &str) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_env("FMTKIT_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
