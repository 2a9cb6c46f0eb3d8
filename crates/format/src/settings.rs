//! Layered settings: workspace values override global ones, and anything
//! neither layer sets falls back to the built-in default.
//!
//! Both layers share one TOML shape:
//!
//! ```toml
//! formatter = "subprocess"
//! module-path = "/usr/local/bin/prettier"
//! format-on-save = true
//! ignored-syntaxes-on-save = ["markdown"]
//! ignore-file-name = ".prettierignore"
//! request-timeout-ms = 10000
//!
//! [default-options]
//! semi = false
//! tabWidth = 4
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use fmtkit_worker::SupervisorConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SettingsError;

/// Which formatter implementation a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatterKind {
	/// A supervised worker process.
	#[default]
	Subprocess,
	/// A formatter engine running in the host process.
	InProcess,
}

/// One settings layer. Every field is optional; see [`Settings`] for meanings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct SettingsLayer {
	/// `formatter`
	pub formatter: Option<FormatterKind>,
	/// `module-path`
	pub module_path: Option<PathBuf>,
	/// `format-on-save`
	pub format_on_save: Option<bool>,
	/// `ignored-syntaxes-on-save`
	pub ignored_syntaxes_on_save: Option<Vec<String>>,
	/// `ignore-without-config`
	pub ignore_without_config: Option<bool>,
	/// `ignore-remote-on-save`
	pub ignore_remote_on_save: Option<bool>,
	/// `ignore-file-name`
	pub ignore_file_name: Option<String>,
	/// `debug-logging`
	pub debug_logging: Option<bool>,
	/// `default-options`, merged per key.
	pub default_options: Option<Map<String, Value>>,
	/// `restart-cooldown-ms`
	pub restart_cooldown_ms: Option<u64>,
	/// `request-timeout-ms`
	pub request_timeout_ms: Option<u64>,
}

impl SettingsLayer {
	/// Parses a layer from TOML.
	///
	/// # Errors
	///
	/// Returns `SettingsError::Parse` for invalid TOML or unknown keys.
	pub fn from_toml(source: &str) -> Result<Self, SettingsError> {
		Ok(toml::from_str(source)?)
	}

	/// Reads and parses a layer from a file.
	///
	/// # Errors
	///
	/// Returns `SettingsError::Io` when the file cannot be read and
	/// `SettingsError::Parse` when it does not parse.
	pub fn load(path: &Path) -> Result<Self, SettingsError> {
		let source = std::fs::read_to_string(path).map_err(|error| SettingsError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml(&source)
	}
}

/// Resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
	/// Formatter implementation.
	pub formatter: FormatterKind,
	/// Formatter location handed to the worker.
	pub module_path: Option<PathBuf>,
	/// Whether hosts should format on save.
	pub format_on_save: bool,
	/// Syntaxes never formatted on save.
	pub ignored_syntaxes_on_save: Vec<String>,
	/// Skip documents without project formatter configuration.
	pub ignore_without_config: bool,
	/// Skip remote documents on save.
	pub ignore_remote_on_save: bool,
	/// Ignore file looked up on save.
	pub ignore_file_name: String,
	/// Log at debug level.
	pub debug_logging: bool,
	/// Options used when the project has no formatter configuration.
	pub default_options: Map<String, Value>,
	/// Second crash inside this window stops automatic restarts.
	pub restart_cooldown: Duration,
	/// Deadline for a single worker request.
	pub request_timeout: Option<Duration>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			formatter: FormatterKind::default(),
			module_path: None,
			format_on_save: false,
			ignored_syntaxes_on_save: Vec::new(),
			ignore_without_config: false,
			ignore_remote_on_save: false,
			ignore_file_name: ".prettierignore".into(),
			debug_logging: false,
			default_options: Map::new(),
			restart_cooldown: Duration::from_secs(5),
			request_timeout: None,
		}
	}
}

impl Settings {
	/// Resolves `workspace` over `global` over the defaults.
	///
	/// `default-options` merge per key, with workspace keys winning.
	///
	/// # Errors
	///
	/// Returns `SettingsError::Invalid` for an empty ignore file name or a
	/// zero request timeout.
	pub fn resolve(global: &SettingsLayer, workspace: &SettingsLayer) -> Result<Self, SettingsError> {
		let defaults = Self::default();
		macro_rules! pick {
			($field:ident) => {
				workspace.$field.clone().or_else(|| global.$field.clone())
			};
		}

		let mut default_options = global.default_options.clone().unwrap_or_default();
		if let Some(overrides) = &workspace.default_options {
			default_options.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
		}

		let ignore_file_name = pick!(ignore_file_name).unwrap_or(defaults.ignore_file_name);
		if ignore_file_name.is_empty() {
			return Err(SettingsError::Invalid {
				key: "ignore-file-name",
				reason: "must not be empty".into(),
			});
		}

		let request_timeout = match pick!(request_timeout_ms) {
			Some(0) => {
				return Err(SettingsError::Invalid {
					key: "request-timeout-ms",
					reason: "must be greater than zero; omit it to wait indefinitely".into(),
				});
			}
			ms => ms.map(Duration::from_millis),
		};

		Ok(Self {
			formatter: pick!(formatter).unwrap_or(defaults.formatter),
			module_path: pick!(module_path),
			format_on_save: pick!(format_on_save).unwrap_or(defaults.format_on_save),
			ignored_syntaxes_on_save: pick!(ignored_syntaxes_on_save).unwrap_or_default(),
			ignore_without_config: pick!(ignore_without_config).unwrap_or(defaults.ignore_without_config),
			ignore_remote_on_save: pick!(ignore_remote_on_save).unwrap_or(defaults.ignore_remote_on_save),
			ignore_file_name,
			debug_logging: pick!(debug_logging).unwrap_or(defaults.debug_logging),
			default_options,
			restart_cooldown: pick!(restart_cooldown_ms).map_or(defaults.restart_cooldown, Duration::from_millis),
			request_timeout,
		})
	}

	/// Returns true when `syntax` is excluded from format-on-save.
	pub fn ignores_syntax_on_save(&self, syntax: &str) -> bool {
		self.ignored_syntaxes_on_save.iter().any(|s| s == syntax)
	}

	/// Supervisor configuration derived from these settings.
	pub fn supervisor_config(&self) -> SupervisorConfig {
		SupervisorConfig::default()
			.restart_cooldown(self.restart_cooldown)
			.request_timeout(self.request_timeout)
	}

	/// Default log filter directive.
	pub fn log_filter(&self) -> &'static str {
		if self.debug_logging { "debug" } else { "info" }
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	#[test]
	fn empty_layers_resolve_to_defaults() {
		let settings = Settings::resolve(&SettingsLayer::default(), &SettingsLayer::default()).expect("resolve");
		assert_eq!(settings, Settings::default());
		assert_eq!(settings.ignore_file_name, ".prettierignore");
		assert_eq!(settings.log_filter(), "info");
	}

	#[test]
	fn workspace_overrides_global() {
		let global = SettingsLayer::from_toml(
			r#"
			format-on-save = true
			ignored-syntaxes-on-save = ["markdown"]
			debug-logging = true
			restart-cooldown-ms = 1000

			[default-options]
			semi = false
			tabWidth = 4
			"#,
		)
		.expect("global");
		let workspace = SettingsLayer::from_toml(
			r#"
			formatter = "in-process"
			format-on-save = false
			request-timeout-ms = 2500

			[default-options]
			tabWidth = 2
			"#,
		)
		.expect("workspace");

		let settings = Settings::resolve(&global, &workspace).expect("resolve");
		assert_eq!(settings.formatter, FormatterKind::InProcess);
		assert!(!settings.format_on_save);
		assert!(settings.ignores_syntax_on_save("markdown"));
		assert!(!settings.ignores_syntax_on_save("javascript"));
		assert!(settings.debug_logging);
		assert_eq!(settings.restart_cooldown, Duration::from_secs(1));
		assert_eq!(settings.request_timeout, Some(Duration::from_millis(2500)));
		assert_eq!(
			Value::Object(settings.default_options),
			json!({ "semi": false, "tabWidth": 2 })
		);
	}

	#[test]
	fn unknown_keys_are_rejected() {
		assert!(matches!(SettingsLayer::from_toml("format_on_save = true"), Err(SettingsError::Parse(_))));
	}

	#[test]
	fn invalid_values_are_rejected() {
		let layer = SettingsLayer::from_toml("request-timeout-ms = 0").expect("parse");
		assert!(matches!(
			Settings::resolve(&layer, &SettingsLayer::default()),
			Err(SettingsError::Invalid { key: "request-timeout-ms", .. })
		));

		let layer = SettingsLayer::from_toml("ignore-file-name = \"\"").expect("parse");
		assert!(matches!(
			Settings::resolve(&SettingsLayer::default(), &layer),
			Err(SettingsError::Invalid { key: "ignore-file-name", .. })
		));
	}

	#[test]
	fn load_reads_files() {
		let dir = tempfile::tempdir().expect("tempdir");
		let path = dir.path().join("fmtkit.toml");
		std::fs::write(&path, "module-path = \"/opt/prettier\"\n").expect("write");
		let layer = SettingsLayer::load(&path).expect("load");
		assert_eq!(layer.module_path, Some(PathBuf::from("/opt/prettier")));

		let missing = SettingsLayer::load(&dir.path().join("nope.toml"));
		assert!(matches!(missing, Err(SettingsError::Io { .. })));
	}
}
