//! Formatter worker binary.
//!
//! Speaks the framed JSON-RPC protocol on stdin/stdout; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use fmtkit_format::FormatEngine;
use fmtkit_service::ProgramEngine;
use tracing::info;

/// Worker command line arguments.
#[derive(Parser, Debug)]
#[command(name = "fmtkit-service")]
#[command(about = "Formatter worker speaking the fmtkit stdio protocol")]
struct Args {
	/// Argument passed to the formatter; `{filepath}` and `{parser}` are
	/// replaced per request. Repeat for several arguments.
	#[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
	args: Vec<String>,

	/// Configuration file name that makes `hasConfig` true. Repeat for
	/// several names; defaults to the prettier configuration files.
	#[arg(long = "config-file", value_name = "NAME")]
	config_files: Vec<String>,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,

	/// Formatter program: a path, or a name looked up on PATH.
	#[arg(value_name = "PROGRAM")]
	program: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	setup_tracing(args.verbose);

	let startup = ProgramEngine::locate(&args.program).map(|engine| {
		let mut engine = engine.args(args.args);
		if !args.config_files.is_empty() {
			engine = engine.config_files(args.config_files);
		}
		info!(program = %engine.program().display(), "formatter located");
		Arc::new(engine) as Arc<dyn FormatEngine>
	});

	fmtkit_service::serve(startup, tokio::io::stdin(), tokio::io::stdout()).await?;
	info!("host closed the connection");
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_env("FMTKIT_LOG").unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("fmtkit=debug,info")
		} else {
			EnvFilter::new("warn")
		}
	});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(false)
		.init();
}
