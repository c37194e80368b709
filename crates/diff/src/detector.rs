//! Alignment of two token streams.
//!
//! The detector works on normalized term strings, not positions, so a phrase
//! that moved is reported as deleted where it was and inserted where it is.
//! Alignment is a longest common subsequence computed with Hirschberg's
//! divide and conquer, which keeps memory linear in the shorter dimension
//! while staying O(n·m) in time. Common prefixes and suffixes are peeled off
//! first because most successive snapshots of a page differ in a small middle
//! section.
//!
//! When several maximal alignments exist, the split point chosen at each level
//! is the smallest index in the new sequence, and a single old token aligns to
//! its leftmost equal new token. Ties therefore lean left, and identical
//! inputs always produce identical output.

use std::collections::HashMap;

use ingest::Document;
use tracing::debug;

use crate::difference::{DiffEvent, Difference};

/// Differences between two snapshots of the same resource.
///
/// Both documents should have been tokenized with the same parse options.
/// The output walks the alignment front to back; within each gap the deleted
/// run (anchored in `old`) precedes the inserted run (anchored in `new`).
/// Identical token streams yield no differences.
pub fn detect(old: &Document, new: &Document) -> Vec<Difference> {
    let (a, b) = intern(old, new);
    let pairs = align(&a, &b);

    let mut differences = Vec::new();
    let (mut next_old, mut next_new) = (0, 0);
    for (i, j) in pairs.into_iter().chain(std::iter::once((a.len(), b.len()))) {
        if next_old < i {
            differences.push(run(DiffEvent::Deleted, old, next_old..i));
        }
        if next_new < j {
            differences.push(run(DiffEvent::Inserted, new, next_new..j));
        }
        next_old = i + 1;
        next_new = j + 1;
    }

    debug!(
        url = %new.url,
        old_terms = a.len(),
        new_terms = b.len(),
        differences = differences.len(),
        "differences_detected"
    );
    differences
}

fn run(event: DiffEvent, document: &Document, tokens: std::ops::Range<usize>) -> Difference {
    let occurrences = &document.occurrences[tokens];
    let start = occurrences.first().map_or(0, |o| o.start);
    let end = occurrences.last().map_or(start, |o| o.end);
    let terms = occurrences.iter().map(|o| o.text.clone()).collect();
    Difference::new(event, &document.raw_text, start, end, terms)
}

/// Map both streams' terms to dense ids so comparisons are integer compares.
fn intern(old: &Document, new: &Document) -> (Vec<u32>, Vec<u32>) {
    let mut ids: HashMap<&str, u32> = HashMap::new();
    let mut id_of = |term| {
        let next = ids.len() as u32;
        *ids.entry(term).or_insert(next)
    };
    let a = old.terms().map(&mut id_of).collect();
    let b = new.terms().map(&mut id_of).collect();
    (a, b)
}

/// Index pairs `(i, j)` with `a[i] == b[j]`, strictly increasing in both
/// coordinates, forming a longest common subsequence.
pub(crate) fn align(a: &[u32], b: &[u32]) -> Vec<(usize, usize)> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mut pairs: Vec<(usize, usize)> = (0..prefix).map(|i| (i, i)).collect();
    hirschberg(
        &a[prefix..a.len() - suffix],
        &b[prefix..b.len() - suffix],
        prefix,
        prefix,
        &mut pairs,
    );
    let (a_tail, b_tail) = (a.len() - suffix, b.len() - suffix);
    pairs.extend((0..suffix).map(|k| (a_tail + k, b_tail + k)));
    pairs
}

fn hirschberg(
    a: &[u32],
    b: &[u32],
    a_offset: usize,
    b_offset: usize,
    out: &mut Vec<(usize, usize)>,
) {
    if a.is_empty() || b.is_empty() {
        return;
    }
    if a.len() == 1 {
        if let Some(j) = b.iter().position(|&y| y == a[0]) {
            out.push((a_offset, b_offset + j));
        }
        return;
    }

    let mid = a.len() / 2;
    let forward = lcs_row(a[..mid].iter(), b.iter(), b.len());
    let backward = lcs_row(a[mid..].iter().rev(), b.iter().rev(), b.len());

    // forward[k] = LCS(a[..mid], b[..k]); backward[n - k] = LCS(a[mid..], b[k..]).
    let n = b.len();
    let mut split = 0;
    let mut best = 0;
    for k in 0..=n {
        let total = forward[k] + backward[n - k];
        if total > best {
            best = total;
            split = k;
        }
    }

    hirschberg(&a[..mid], &b[..split], a_offset, b_offset, out);
    hirschberg(&a[mid..], &b[split..], a_offset + mid, b_offset + split, out);
}

/// Last row of the LCS length table of `a` against every prefix of `b`.
fn lcs_row<'a, A, B>(a: A, b: B, b_len: usize) -> Vec<usize>
where
    A: Iterator<Item = &'a u32>,
    B: Iterator<Item = &'a u32> + Clone,
{
    let mut previous = vec![0usize; b_len + 1];
    let mut current = vec![0usize; b_len + 1];
    for x in a {
        for (j, y) in b.clone().enumerate() {
            current[j + 1] = if x == y {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous
}
