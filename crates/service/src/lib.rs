//! The formatter worker.
//!
//! Runs on the worker side of the stdio protocol spoken by
//! `fmtkit_worker::WorkerSupervisor`: it announces itself with `didStart`
//! (or `startDidFail`) and answers `format` and `hasConfig` requests by
//! piping documents through an external formatter program.

#![warn(missing_docs)]

mod program;
mod project;
mod serve;

pub use program::{OPTIONS_ENV, ProgramEngine};
pub use project::{DEFAULT_CONFIG_FILES, find_config, infer_parser, is_ignored};
pub use serve::{router, serve};
