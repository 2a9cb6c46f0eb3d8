//! Project lookups on disk: formatter configuration, ignore files and parser
//! inference.

use std::path::{Path, PathBuf};

use ignore::gitignore::GitignoreBuilder;
use tracing::{debug, warn};

/// Configuration file names of the default formatter, looked up in every
/// ancestor directory.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
	".prettierrc",
	".prettierrc.json",
	".prettierrc.json5",
	".prettierrc.yaml",
	".prettierrc.yml",
	".prettierrc.toml",
	".prettierrc.js",
	".prettierrc.cjs",
	".prettierrc.mjs",
	"prettier.config.js",
	"prettier.config.cjs",
	"prettier.config.mjs",
];

/// Finds the nearest configuration file for `path`.
///
/// The search starts in `path` itself when it is a directory, otherwise in
/// its parent, and walks up to the filesystem root.
pub fn find_config(path: &Path, names: &[String]) -> Option<PathBuf> {
	let start = if path.is_dir() { path } else { path.parent()? };
	start
		.ancestors()
		.flat_map(|dir| names.iter().map(move |name| dir.join(name)))
		.find(|candidate| candidate.is_file())
}

/// Returns true when `ignore_file` (gitignore syntax, rooted at its own
/// directory) excludes `path`.
///
/// A missing ignore file, or a path outside its directory, ignores nothing.
pub fn is_ignored(ignore_file: &Path, path: &Path) -> bool {
	let Some(root) = ignore_file.parent() else {
		return false;
	};
	if !ignore_file.is_file() || !path.starts_with(root) {
		return false;
	}

	let mut builder = GitignoreBuilder::new(root);
	if let Some(err) = builder.add(ignore_file) {
		warn!(path = %ignore_file.display(), error = %err, "failed to read ignore file");
	}
	let matcher = match builder.build() {
		Ok(matcher) => matcher,
		Err(err) => {
			warn!(path = %ignore_file.display(), error = %err, "invalid ignore file");
			return false;
		}
	};

	let ignored = matcher.matched_path_or_any_parents(path, false).is_ignore();
	debug!(path = %path.display(), ignored, "ignore file checked");
	ignored
}

/// Infers a parser name from a file name.
pub fn infer_parser(path: &Path) -> Option<&'static str> {
	let file_name = path.file_name()?.to_str()?;
	match file_name {
		".prettierrc" | ".babelrc" | ".jsonrc" => return Some("json"),
		"package.json" | "package-lock.json" | "composer.json" => return Some("json-stringify"),
		_ => {}
	}

	let ext = path.extension()?.to_str()?.to_ascii_lowercase();
	let parser = match ext.as_str() {
		"js" | "mjs" | "cjs" | "jsx" => "babel",
		"ts" | "mts" | "cts" | "tsx" => "typescript",
		"json" | "jsonc" => "json",
		"json5" => "json5",
		"css" => "css",
		"scss" => "scss",
		"less" => "less",
		"md" | "markdown" => "markdown",
		"mdx" => "mdx",
		"yaml" | "yml" => "yaml",
		"html" | "htm" => "html",
		"vue" => "vue",
		"graphql" | "gql" => "graphql",
		"hbs" | "handlebars" => "glimmer",
		_ => return None,
	};
	Some(parser)
}
