use serde::ser::{Serialize, SerializeTuple, Serializer};

/// Kind of a single edit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Text present only in the source.
	Delete,
	/// Text shared by both sides.
	Equal,
	/// Text present only in the target.
	Insert,
}

impl Operation {
	/// Returns the numeric wire tag: `-1` delete, `0` equal, `1` insert.
	pub const fn tag(self) -> i8 {
		match self {
			Self::Delete => -1,
			Self::Equal => 0,
			Self::Insert => 1,
		}
	}

	/// Parses a numeric wire tag.
	pub const fn from_tag(tag: i8) -> Option<Self> {
		match tag {
			-1 => Some(Self::Delete),
			0 => Some(Self::Equal),
			1 => Some(Self::Insert),
			_ => None,
		}
	}
}

/// One operation of an edit script.
///
/// Serializes as the `[tag, text]` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
	/// What happens to `text`.
	pub op: Operation,
	/// The affected segment.
	pub text: String,
}

impl Edit {
	/// Creates an edit.
	pub fn new(op: Operation, text: impl Into<String>) -> Self {
		Self { op, text: text.into() }
	}

	/// Creates an [`Operation::Equal`] edit.
	pub fn equal(text: impl Into<String>) -> Self {
		Self::new(Operation::Equal, text)
	}

	/// Creates an [`Operation::Delete`] edit.
	pub fn delete(text: impl Into<String>) -> Self {
		Self::new(Operation::Delete, text)
	}

	/// Creates an [`Operation::Insert`] edit.
	pub fn insert(text: impl Into<String>) -> Self {
		Self::new(Operation::Insert, text)
	}

	/// Length of the segment in chars.
	pub fn char_len(&self) -> usize {
		self.text.chars().count()
	}
}

impl Serialize for Edit {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut tuple = serializer.serialize_tuple(2)?;
		tuple.serialize_element(&self.op.tag())?;
		tuple.serialize_element(&self.text)?;
		tuple.end()
	}
}

/// Rebuilds the source text from a script (equal and delete segments).
pub fn source_text(script: &[Edit]) -> String {
	script
		.iter()
		.filter(|edit| edit.op != Operation::Insert)
		.map(|edit| edit.text.as_str())
		.collect()
}

/// Rebuilds the target text from a script (equal and insert segments).
pub fn target_text(script: &[Edit]) -> String {
	script
		.iter()
		.filter(|edit| edit.op != Operation::Delete)
		.map(|edit| edit.text.as_str())
		.collect()
}

/// Working representation used while the script is being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Chunk {
	pub op: Operation,
	pub chars: Vec<char>,
}

impl Chunk {
	pub fn new(op: Operation, chars: &[char]) -> Self {
		Self { op, chars: chars.to_vec() }
	}

	pub fn into_edit(self) -> Edit {
		Edit {
			op: self.op,
			text: self.chars.into_iter().collect(),
		}
	}
}
