//! Core diff recursion: trimming, shortcuts, half-match and Myers bisection.

use crate::cleanup::cleanup_merge;
use crate::common::{common_prefix, common_suffix, find};
use crate::types::{Chunk, Operation};

/// Diffs two char slices and returns a merged script.
pub(crate) fn diff_main(a: &[char], b: &[char]) -> Vec<Chunk> {
	if a == b {
		return if a.is_empty() { Vec::new() } else { vec![Chunk::new(Operation::Equal, a)] };
	}

	let prefix_len = common_prefix(a, b);
	let (prefix, a) = a.split_at(prefix_len);
	let b = &b[prefix_len..];

	let suffix_len = common_suffix(a, b);
	let (a, suffix) = a.split_at(a.len() - suffix_len);
	let b = &b[..b.len() - suffix_len];

	let mut chunks = Vec::new();
	if !prefix.is_empty() {
		chunks.push(Chunk::new(Operation::Equal, prefix));
	}
	chunks.extend(compute(a, b));
	if !suffix.is_empty() {
		chunks.push(Chunk::new(Operation::Equal, suffix));
	}

	cleanup_merge(&mut chunks);
	chunks
}

/// Diffs two texts that share no common prefix or suffix.
fn compute(a: &[char], b: &[char]) -> Vec<Chunk> {
	if a.is_empty() {
		return vec![Chunk::new(Operation::Insert, b)];
	}
	if b.is_empty() {
		return vec![Chunk::new(Operation::Delete, a)];
	}

	let a_longer = a.len() > b.len();
	let (long, short) = if a_longer { (a, b) } else { (b, a) };

	if let Some(i) = find(long, short, 0) {
		let op = if a_longer { Operation::Delete } else { Operation::Insert };
		return vec![
			Chunk::new(op, &long[..i]),
			Chunk::new(Operation::Equal, short),
			Chunk::new(op, &long[i + short.len()..]),
		];
	}

	if short.len() == 1 {
		// Not contained above, so the single char cannot be an equality.
		return vec![Chunk::new(Operation::Delete, a), Chunk::new(Operation::Insert, b)];
	}

	if let Some(split) = half_match(a, b) {
		let mut chunks = diff_main(split.a_head, split.b_head);
		chunks.push(Chunk::new(Operation::Equal, split.common));
		chunks.extend(diff_main(split.a_tail, split.b_tail));
		return chunks;
	}

	bisect(a, b)
}

/// A shared substring splitting both texts in two.
struct HalfMatch<'a> {
	a_head: &'a [char],
	a_tail: &'a [char],
	b_head: &'a [char],
	b_tail: &'a [char],
	common: &'a [char],
}

/// Looks for a substring shared by both texts that is at least half as long
/// as the longer text.
fn half_match<'a>(a: &'a [char], b: &'a [char]) -> Option<HalfMatch<'a>> {
	let a_longer = a.len() > b.len();
	let (long, short) = if a_longer { (a, b) } else { (b, a) };
	if long.len() < 4 || short.len() * 2 < long.len() {
		return None;
	}

	// Seeds at the second and third quarter of the longer text.
	let first = half_match_at(long, short, long.len().div_ceil(4));
	let second = half_match_at(long, short, long.len().div_ceil(2));
	let hm = match (first, second) {
		(None, None) => return None,
		(Some(hm), None) | (None, Some(hm)) => hm,
		(Some(first), Some(second)) => {
			if first.common.len() > second.common.len() {
				first
			} else {
				second
			}
		}
	};

	if a_longer {
		Some(hm)
	} else {
		Some(HalfMatch {
			a_head: hm.b_head,
			a_tail: hm.b_tail,
			b_head: hm.a_head,
			b_tail: hm.a_tail,
			common: hm.common,
		})
	}
}

/// Extends every occurrence of the quarter-length seed at `long[i..]` inside
/// `short` and keeps the longest result. Heads and tails are reported as
/// `a` = long, `b` = short.
fn half_match_at<'a>(long: &'a [char], short: &'a [char], i: usize) -> Option<HalfMatch<'a>> {
	let seed = &long[i..i + long.len() / 4];
	let mut best: Option<HalfMatch<'a>> = None;
	let mut best_len = 0;

	let mut from = 0;
	while let Some(j) = find(short, seed, from) {
		let prefix = common_prefix(&long[i..], &short[j..]);
		let suffix = common_suffix(&long[..i], &short[..j]);
		if best_len < prefix + suffix {
			best_len = prefix + suffix;
			best = Some(HalfMatch {
				a_head: &long[..i - suffix],
				a_tail: &long[i + prefix..],
				b_head: &short[..j - suffix],
				b_tail: &short[j + prefix..],
				common: &short[j - suffix..j + prefix],
			});
		}
		from = j + 1;
	}

	best.filter(|hm| hm.common.len() * 2 >= long.len())
}

/// Finds the middle snake of the Myers diff and recurses on both halves.
///
/// The forward and reverse searches advance one edit distance step at a
/// time; the first diagonal on which they overlap yields the split point.
fn bisect(a: &[char], b: &[char]) -> Vec<Chunk> {
	let a_len = a.len() as isize;
	let b_len = b.len() as isize;
	let max_d = (a_len + b_len + 1) / 2;
	let v_offset = max_d;
	let v_len = 2 * max_d;

	let mut v1 = vec![-1isize; v_len as usize];
	let mut v2 = vec![-1isize; v_len as usize];
	v1[(v_offset + 1) as usize] = 0;
	v2[(v_offset + 1) as usize] = 0;

	let delta = a_len - b_len;
	// With an odd delta the forward path detects the overlap, otherwise the reverse one.
	let front = delta % 2 != 0;

	// Trims the diagonals that ran off the edge of the grid.
	let mut k1_start = 0;
	let mut k1_end = 0;
	let mut k2_start = 0;
	let mut k2_end = 0;

	for d in 0..max_d {
		let mut k1 = -d + k1_start;
		while k1 <= d - k1_end {
			let k1_offset = (v_offset + k1) as usize;
			let mut x1 = if k1 == -d || (k1 != d && v1[k1_offset - 1] < v1[k1_offset + 1]) {
				v1[k1_offset + 1]
			} else {
				v1[k1_offset - 1] + 1
			};
			let mut y1 = x1 - k1;
			while x1 >= 0 && y1 >= 0 && x1 < a_len && y1 < b_len && a[x1 as usize] == b[y1 as usize] {
				x1 += 1;
				y1 += 1;
			}
			v1[k1_offset] = x1;

			if x1 > a_len {
				k1_end += 2;
			} else if y1 > b_len {
				k1_start += 2;
			} else if front {
				let k2_offset = v_offset + delta - k1;
				if (0..v_len).contains(&k2_offset) && v2[k2_offset as usize] != -1 {
					let x2 = a_len - v2[k2_offset as usize];
					if x1 >= x2 {
						return bisect_split(a, b, x1, y1);
					}
				}
			}
			k1 += 2;
		}

		let mut k2 = -d + k2_start;
		while k2 <= d - k2_end {
			let k2_offset = (v_offset + k2) as usize;
			let mut x2 = if k2 == -d || (k2 != d && v2[k2_offset - 1] < v2[k2_offset + 1]) {
				v2[k2_offset + 1]
			} else {
				v2[k2_offset - 1] + 1
			};
			let mut y2 = x2 - k2;
			while x2 >= 0
				&& y2 >= 0
				&& x2 < a_len
				&& y2 < b_len
				&& a[(a_len - x2 - 1) as usize] == b[(b_len - y2 - 1) as usize]
			{
				x2 += 1;
				y2 += 1;
			}
			v2[k2_offset] = x2;

			if x2 > a_len {
				k2_end += 2;
			} else if y2 > b_len {
				k2_start += 2;
			} else if !front {
				let k1_offset = v_offset + delta - k2;
				if (0..v_len).contains(&k1_offset) && v1[k1_offset as usize] != -1 {
					let x1 = v1[k1_offset as usize];
					let y1 = v_offset + x1 - k1_offset;
					if x1 >= a_len - x2 {
						return bisect_split(a, b, x1, y1);
					}
				}
			}
			k2 += 2;
		}
	}

	// No commonality at all.
	vec![Chunk::new(Operation::Delete, a), Chunk::new(Operation::Insert, b)]
}

fn bisect_split(a: &[char], b: &[char], x: isize, y: isize) -> Vec<Chunk> {
	let x = x.clamp(0, a.len() as isize) as usize;
	let y = y.clamp(0, b.len() as isize) as usize;
	let mut chunks = diff_main(&a[..x], &b[..y]);
	chunks.extend(diff_main(&a[x..], &b[y..]));
	chunks
}
