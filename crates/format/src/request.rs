//! Payloads of the worker's `format` and `hasConfig` methods.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Parameters of the `format` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatParams {
	/// The text to format.
	pub original: String,
	/// Where project configuration lookup starts.
	pub path_for_config: Option<PathBuf>,
	/// Ignore file to consult; serialized as `false` when absent.
	#[serde(serialize_with = "ignore_path::serialize", deserialize_with = "ignore_path::deserialize", default)]
	pub ignore_path: Option<PathBuf>,
	/// Formatter options.
	pub options: FormatOptions,
}

/// Formatter options: an open map plus the keys the core itself sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatOptions {
	/// Path of the document, used for parser inference and ignore matching.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub filepath: Option<PathBuf>,
	/// Explicit parser name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub parser: Option<String>,
	/// Start of the range to format, in host offset units.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub range_start: Option<usize>,
	/// End of the range to format, in host offset units.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub range_end: Option<usize>,
	/// Everything else, passed through to the formatter untouched.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl FormatOptions {
	/// Adds `defaults` for every key not already set.
	pub fn merge_defaults(&mut self, defaults: &Map<String, Value>) {
		for (key, value) in defaults {
			self.extra.entry(key.clone()).or_insert_with(|| value.clone());
		}
	}
}

/// Parameters of the `hasConfig` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HasConfigParams {
	/// Where project configuration lookup starts.
	pub path_for_config: Option<PathBuf>,
}

/// An error reported by the formatter itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{name}: {message}")]
pub struct FormatterError {
	/// Error class, e.g. `SyntaxError`.
	pub name: String,
	/// Message, possibly including a code frame.
	pub message: String,
	/// Stack trace, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stack: Option<String>,
}

impl FormatterError {
	/// Creates an error without a stack.
	pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			message: message.into(),
			stack: None,
		}
	}
}

/// Result of the `format` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormatOutput {
	/// The formatted text.
	Formatted {
		/// Formatted text.
		formatted: String,
	},
	/// The document matches the ignore file.
	Ignored {
		/// Always true.
		ignored: bool,
	},
	/// No parser is available for the document.
	MissingParser {
		/// Always true.
		#[serde(rename = "missingParser")]
		missing_parser: bool,
	},
	/// The formatter failed.
	Error {
		/// The failure.
		error: FormatterError,
	},
}

impl FormatOutput {
	/// A `{formatted}` result.
	pub fn formatted(text: impl Into<String>) -> Self {
		Self::Formatted { formatted: text.into() }
	}

	/// An `{ignored: true}` result.
	pub const fn ignored() -> Self {
		Self::Ignored { ignored: true }
	}

	/// A `{missingParser: true}` result.
	pub const fn missing_parser() -> Self {
		Self::MissingParser { missing_parser: true }
	}
}

impl From<FormatterError> for FormatOutput {
	fn from(error: FormatterError) -> Self {
		Self::Error { error }
	}
}

mod ignore_path {
	use super::*;

	pub fn serialize<S: Serializer>(path: &Option<PathBuf>, serializer: S) -> Result<S::Ok, S::Error> {
		match path {
			Some(path) => path.serialize(serializer),
			None => serializer.serialize_bool(false),
		}
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<PathBuf>, D::Error> {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Repr {
			Path(PathBuf),
			Flag(bool),
		}

		Ok(match Option::<Repr>::deserialize(deserializer)? {
			Some(Repr::Path(path)) => Some(path),
			Some(Repr::Flag(_)) | None => None,
		})
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	#[test]
	fn params_use_camel_case_and_false_ignore_path() {
		let mut options = FormatOptions {
			filepath: Some("/p/a.js".into()),
			..FormatOptions::default()
		};
		options.extra.insert("semi".into(), json!(false));
		let params = FormatParams {
			original: "a".into(),
			path_for_config: Some("/p/a.js".into()),
			ignore_path: None,
			options,
		};
		assert_eq!(
			serde_json::to_value(&params).expect("serialize"),
			json!({
				"original": "a",
				"pathForConfig": "/p/a.js",
				"ignorePath": false,
				"options": { "filepath": "/p/a.js", "semi": false },
			})
		);

		let with_ignore: FormatParams = serde_json::from_value(json!({
			"original": "",
			"pathForConfig": null,
			"ignorePath": "/p/.prettierignore",
			"options": { "parser": "babel", "rangeStart": 1, "tabWidth": 4 },
		}))
		.expect("deserialize");
		assert_eq!(with_ignore.ignore_path, Some(PathBuf::from("/p/.prettierignore")));
		assert_eq!(with_ignore.options.parser.as_deref(), Some("babel"));
		assert_eq!(with_ignore.options.range_start, Some(1));
		assert_eq!(with_ignore.options.extra.get("tabWidth"), Some(&json!(4)));
	}

	#[test]
	fn outputs_decode_by_shape() {
		let decode = |value| serde_json::from_value::<FormatOutput>(value).expect("decode");
		assert_eq!(decode(json!({ "formatted": "x;\n" })), FormatOutput::formatted("x;\n"));
		assert_eq!(decode(json!({ "ignored": true })), FormatOutput::ignored());
		assert_eq!(decode(json!({ "missingParser": true })), FormatOutput::missing_parser());
		assert_eq!(
			decode(json!({ "error": { "name": "SyntaxError", "message": "Unexpected token (1:3)\n" } })),
			FormatOutput::Error {
				error: FormatterError::new("SyntaxError", "Unexpected token (1:3)\n"),
			}
		);
		assert!(serde_json::from_value::<FormatOutput>(json!({ "nothing": 1 })).is_err());
	}

	#[test]
	fn defaults_do_not_override_explicit_options() {
		let mut options = FormatOptions::default();
		options.extra.insert("semi".into(), json!(true));
		let defaults = json!({ "semi": false, "tabWidth": 2 });
		options.merge_defaults(defaults.as_object().expect("object"));
		assert_eq!(options.extra.get("semi"), Some(&json!(true)));
		assert_eq!(options.extra.get("tabWidth"), Some(&json!(2)));
	}
}
