//! Shared-prefix, shared-suffix and substring searches over char slices.

/// Length of the longest common prefix, found by binary search.
pub(crate) fn common_prefix(a: &[char], b: &[char]) -> usize {
	if a.is_empty() || b.is_empty() || a[0] != b[0] {
		return 0;
	}

	let mut min = 0;
	let mut max = a.len().min(b.len());
	let mut mid = max;
	let mut start = 0;
	while min < mid {
		if a[start..mid] == b[start..mid] {
			min = mid;
			start = min;
		} else {
			max = mid;
		}
		mid = (max - min) / 2 + min;
	}
	mid
}

/// Length of the longest common suffix, found by binary search.
pub(crate) fn common_suffix(a: &[char], b: &[char]) -> usize {
	if a.is_empty() || b.is_empty() || a[a.len() - 1] != b[b.len() - 1] {
		return 0;
	}

	let mut min = 0;
	let mut max = a.len().min(b.len());
	let mut mid = max;
	let mut end = 0;
	while min < mid {
		if a[a.len() - mid..a.len() - end] == b[b.len() - mid..b.len() - end] {
			min = mid;
			end = min;
		} else {
			max = mid;
		}
		mid = (max - min) / 2 + min;
	}
	mid
}

/// Position of the first occurrence of `needle` in `haystack` at or after `from`.
pub(crate) fn find(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
	if from > haystack.len() {
		return None;
	}
	if needle.is_empty() {
		return Some(from);
	}
	haystack[from..]
		.windows(needle.len())
		.position(|window| window == needle)
		.map(|pos| pos + from)
}
