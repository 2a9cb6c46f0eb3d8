use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

fn d(text: &str) -> Edit {
	Edit::delete(text)
}

fn e(text: &str) -> Edit {
	Edit::equal(text)
}

fn i(text: &str) -> Edit {
	Edit::insert(text)
}

#[test]
fn trivial_inputs() {
	assert_eq!(diff("", ""), Vec::<Edit>::new());
	assert_eq!(diff("abc", "abc"), vec![e("abc")]);
	assert_eq!(diff("", "abc"), vec![i("abc")]);
	assert_eq!(diff("abc", ""), vec![d("abc")]);
}

#[test]
fn simple_insertions_and_deletions() {
	assert_eq!(diff("abc", "ab123c"), vec![e("ab"), i("123"), e("c")]);
	assert_eq!(diff("a123bc", "abc"), vec![e("a"), d("123"), e("bc")]);
	assert_eq!(diff("abc", "a123b456c"), vec![e("a"), i("123"), e("b"), i("456"), e("c")]);
	assert_eq!(diff("a123b456c", "abc"), vec![e("a"), d("123"), e("b"), d("456"), e("c")]);
}

#[test]
fn single_char_replacement() {
	assert_eq!(diff("a", "b"), vec![d("a"), i("b")]);
}

#[test]
fn words() {
	assert_eq!(
		diff("Apples are a fruit.", "Bananas are also fruit."),
		vec![d("Apple"), i("Banana"), e("s are a"), i("lso"), e(" fruit.")]
	);
}

#[test]
fn control_and_non_ascii_chars() {
	assert_eq!(
		diff("ax\t", "\u{0680}x\0"),
		vec![d("a"), i("\u{0680}"), e("x"), d("\t"), i("\0")]
	);
}

#[test]
fn overlaps() {
	assert_eq!(diff("1ayb2", "abxab"), vec![d("1"), e("a"), d("y"), e("b"), d("2"), i("xab")]);
	assert_eq!(diff("abcy", "xaxcxabc"), vec![i("xaxcx"), e("abc"), d("y")]);
}

#[test]
fn half_match_split() {
	assert_eq!(
		diff("ABCDa=bcd=efghijklmnopqrsEFGHIJKLMNOefg", "a-bcd-efghijklmnopqrs"),
		vec![
			d("ABCD"),
			e("a"),
			d("="),
			i("-"),
			e("bcd"),
			d("="),
			i("-"),
			e("efghijklmnopqrs"),
			d("EFGHIJKLMNOefg"),
		]
	);
}

#[test]
fn shared_tail_stays_equal() {
	let script = diff("Hello world.", "Goodbye world.");
	assert_eq!(script, vec![d("Hell"), i("G"), e("o"), i("odbye"), e(" world.")]);
	assert_eq!(source_text(&script), "Hello world.");
	assert_eq!(target_text(&script), "Goodbye world.");
}

#[test]
fn astral_chars_are_atomic() {
	// U+1F600 and U+1F601 share their UTF-16 high surrogate.
	assert_eq!(diff("\u{1F600}", "\u{1F601}"), vec![d("\u{1F600}"), i("\u{1F601}")]);
	assert_eq!(
		diff("x\u{1F600}y", "x\u{1F601}y"),
		vec![e("x"), d("\u{1F600}"), i("\u{1F601}"), e("y")]
	);
}

#[test]
fn hint_places_insertion_at_cursor() {
	assert_eq!(diff("aaa", "aaaa"), vec![e("aaa"), i("a")]);
	assert_eq!(diff_with_hint("aaa", "aaaa", CursorHint::Offset(1)), vec![e("a"), i("a"), e("aa")]);
	assert_eq!(diff_with_hint("abc", "abxc", CursorHint::Offset(2)), vec![e("ab"), i("x"), e("c")]);
}

#[test]
fn hint_places_deletion_before_cursor() {
	assert_eq!(diff_with_hint("abcd", "abd", CursorHint::Offset(3)), vec![e("ab"), d("c"), e("d")]);
}

#[test]
fn hint_places_edit_after_cursor() {
	assert_eq!(diff_with_hint("abcd", "abd", CursorHint::Offset(2)), vec![e("ab"), d("c"), e("d")]);
	assert_eq!(diff_with_hint("aaa", "aaaa", CursorHint::Offset(0)), vec![i("a"), e("aaa")]);
}

#[test]
fn hint_replaces_selected_range() {
	let hint = CursorHint::Ranges {
		old: HintRange::new(6, 5),
		new: HintRange::caret(9),
	};
	assert_eq!(diff_with_hint("hello world", "hello you", hint), vec![e("hello "), d("world"), i("you")]);
}

#[test]
fn unusable_hint_falls_back_to_full_diff() {
	assert_eq!(
		diff_with_hint("Apples are a fruit.", "Bananas are also fruit.", CursorHint::Offset(3)),
		diff("Apples are a fruit.", "Bananas are also fruit.")
	);
	assert_eq!(diff_with_hint("abc", "abxc", CursorHint::Offset(99)), diff("abc", "abxc"));
}

#[test]
fn serializes_as_tag_text_pairs() {
	let json = serde_json::to_value(diff("ab", "ac")).unwrap();
	assert_eq!(json, serde_json::json!([[0, "a"], [-1, "b"], [1, "c"]]));
}

#[test]
fn operation_tags() {
	for op in [Operation::Delete, Operation::Equal, Operation::Insert] {
		assert_eq!(Operation::from_tag(op.tag()), Some(op));
	}
	assert_eq!(Operation::from_tag(2), None);
}

fn assert_canonical(script: &[Edit]) {
	for edit in script {
		assert!(!edit.text.is_empty(), "empty segment in {script:?}");
	}
	for pair in script.windows(2) {
		assert_ne!(pair[0].op, pair[1].op, "adjacent segments of the same kind in {script:?}");
	}
}

proptest! {
	#[test]
	fn reconstructs_both_sides(a in "[abc ]{0,20}", b in "[abc ]{0,20}") {
		let script = diff(&a, &b);
		prop_assert_eq!(source_text(&script), a);
		prop_assert_eq!(target_text(&script), b);
		assert_canonical(&script);
	}

	#[test]
	fn reconstructs_arbitrary_unicode(a in "\\PC{0,12}", b in "\\PC{0,12}") {
		let script = diff(&a, &b);
		prop_assert_eq!(source_text(&script), a);
		prop_assert_eq!(target_text(&script), b);
		for edit in &script {
			let units: Vec<u16> = edit.text.encode_utf16().collect();
			prop_assert!(char::decode_utf16(units).all(|c| c.is_ok()));
		}
	}

	#[test]
	fn identical_inputs_are_one_equality(a in "\\PC{1,16}") {
		prop_assert_eq!(diff(&a, &a), vec![Edit::equal(a.clone())]);
	}

	#[test]
	fn hinted_scripts_stay_valid(a in "[ab]{0,12}", b in "[ab]{0,12}", cursor in 0usize..14) {
		let script = diff_with_hint(&a, &b, CursorHint::Offset(cursor));
		prop_assert_eq!(source_text(&script), a);
		prop_assert_eq!(target_text(&script), b);
		assert_canonical(&script);
	}
}
