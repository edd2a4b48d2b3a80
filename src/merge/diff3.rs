//! Line-based three-way merge.
//!
//! Each side is diffed against the base (longest common subsequence over
//! lines). Change hunks from both sides are grouped when their base ranges
//! overlap or touch; a group changed on one side only takes that side, a
//! group changed identically on both sides is taken once, anything else is
//! emitted between conflict markers in the `git merge-file` layout.

use std::cmp::Ordering;

/// Largest LCS table (cells) computed before falling back to treating the
/// differing middle section as fully replaced.
const MAX_LCS_CELLS: usize = 16 * 1024 * 1024;

pub const MARKER_OURS: &[u8] = b"<<<<<<<";
pub const MARKER_SEP: &[u8] = b"=======";
pub const MARKER_THEIRS: &[u8] = b">>>>>>>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerLabels {
    pub ours: String,
    pub theirs: String,
}

impl Default for MarkerLabels {
    fn default() -> Self {
        Self {
            ours: "current".to_string(),
            theirs: "skill".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedText {
    pub content: Vec<u8>,
    pub conflicts: usize,
}

impl MergedText {
    pub const fn is_clean(&self) -> bool {
        self.conflicts == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Ours,
    Theirs,
}

/// A changed range: `base[base_start..base_end]` became
/// `side[side_start..side_end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Hunk {
    side: Side,
    base_start: usize,
    base_end: usize,
    side_start: usize,
    side_end: usize,
}

pub fn merge(base: &[u8], ours: &[u8], theirs: &[u8], labels: &MarkerLabels) -> MergedText {
    let base_lines = split_lines(base);
    let ours_lines = split_lines(ours);
    let theirs_lines = split_lines(theirs);

    let mut hunks = diff_hunks(&base_lines, &ours_lines, Side::Ours);
    hunks.extend(diff_hunks(&base_lines, &theirs_lines, Side::Theirs));
    hunks.sort_by(|a, b| match a.base_start.cmp(&b.base_start) {
        Ordering::Equal => a.base_end.cmp(&b.base_end),
        other => other,
    });

    let mut out = Vec::with_capacity(ours.len().max(theirs.len()));
    let mut conflicts = 0;
    let mut cursor = 0;
    let mut i = 0;

    while i < hunks.len() {
        let region_start = hunks[i].base_start;
        let mut region_end = hunks[i].base_end;
        let mut j = i + 1;
        while j < hunks.len() && hunks[j].base_start <= region_end {
            region_end = region_end.max(hunks[j].base_end);
            j += 1;
        }
        let group = &hunks[i..j];

        extend_lines(&mut out, &base_lines[cursor..region_start]);

        let has_ours = group.iter().any(|h| h.side == Side::Ours);
        let has_theirs = group.iter().any(|h| h.side == Side::Theirs);
        let ours_region = side_region(&base_lines, &ours_lines, group, Side::Ours, region_start, region_end);
        let theirs_region =
            side_region(&base_lines, &theirs_lines, group, Side::Theirs, region_start, region_end);

        if !has_theirs {
            extend_lines(&mut out, &ours_region);
        } else if !has_ours || ours_region == theirs_region {
            extend_lines(&mut out, &theirs_region);
        } else {
            write_conflict(&mut out, &ours_region, &theirs_region, labels);
            conflicts += 1;
        }

        cursor = region_end;
        i = j;
    }

    extend_lines(&mut out, &base_lines[cursor..]);

    MergedText {
        content: out,
        conflicts,
    }
}

/// True when any line starts a conflict marker.
pub fn has_conflict_markers(content: &[u8]) -> bool {
    split_lines(content).into_iter().any(|line| {
        let line = trim_newline(line);
        is_marker(line, MARKER_OURS) || is_marker(line, MARKER_THEIRS) || line == MARKER_SEP
    })
}

fn is_marker(line: &[u8], marker: &[u8]) -> bool {
    line.starts_with(marker) && (line.len() == marker.len() || line[marker.len()] == b' ')
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    data.split_inclusive(|&byte| byte == b'\n').collect()
}

fn extend_lines(out: &mut Vec<u8>, lines: &[&[u8]]) {
    for line in lines {
        out.extend_from_slice(line);
    }
}

/// The content one side has for `base[start..end]`. Base lines outside the
/// side's own hunks are unchanged on that side.
fn side_region<'a>(
    base: &[&'a [u8]],
    side: &[&'a [u8]],
    group: &[Hunk],
    which: Side,
    start: usize,
    end: usize,
) -> Vec<&'a [u8]> {
    let mut region = Vec::new();
    let mut pos = start;
    for hunk in group.iter().filter(|h| h.side == which) {
        region.extend_from_slice(&base[pos..hunk.base_start]);
        region.extend_from_slice(&side[hunk.side_start..hunk.side_end]);
        pos = hunk.base_end;
    }
    region.extend_from_slice(&base[pos..end]);
    region
}

fn write_conflict(out: &mut Vec<u8>, ours: &[&[u8]], theirs: &[&[u8]], labels: &MarkerLabels) {
    // Lines shared at either edge stay outside the markers.
    let prefix = ours
        .iter()
        .zip(theirs.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = ours[prefix..]
        .iter()
        .rev()
        .zip(theirs[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    extend_lines(out, &ours[..prefix]);

    out.extend_from_slice(MARKER_OURS);
    out.push(b' ');
    out.extend_from_slice(labels.ours.as_bytes());
    out.push(b'\n');
    write_terminated(out, &ours[prefix..ours.len() - suffix]);
    out.extend_from_slice(MARKER_SEP);
    out.push(b'\n');
    write_terminated(out, &theirs[prefix..theirs.len() - suffix]);
    out.extend_from_slice(MARKER_THEIRS);
    out.push(b' ');
    out.extend_from_slice(labels.theirs.as_bytes());
    out.push(b'\n');

    extend_lines(out, &ours[ours.len() - suffix..]);
}

fn write_terminated(out: &mut Vec<u8>, lines: &[&[u8]]) {
    extend_lines(out, lines);
    if lines.last().is_some_and(|line| !line.ends_with(b"\n")) {
        out.push(b'\n');
    }
}

fn diff_hunks(base: &[&[u8]], side: &[&[u8]], which: Side) -> Vec<Hunk> {
    let mut hunks = Vec::new();
    let (mut base_pos, mut side_pos) = (0, 0);

    for (base_idx, side_idx) in matching_lines(base, side)
        .into_iter()
        .chain(std::iter::once((base.len(), side.len())))
    {
        if base_idx > base_pos || side_idx > side_pos {
            hunks.push(Hunk {
                side: which,
                base_start: base_pos,
                base_end: base_idx,
                side_start: side_pos,
                side_end: side_idx,
            });
        }
        base_pos = base_idx + 1;
        side_pos = side_idx + 1;
    }

    hunks
}

/// Index pairs of an LCS between `a` and `b`, increasing in both.
fn matching_lines(a: &[&[u8]], b: &[&[u8]]) -> Vec<(usize, usize)> {
    let prefix = a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mut pairs: Vec<(usize, usize)> = (0..prefix).map(|i| (i, i)).collect();

    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];
    let (n, m) = (a_mid.len(), b_mid.len());

    if n > 0 && m > 0 && (n + 1).saturating_mul(m + 1) <= MAX_LCS_CELLS {
        let width = m + 1;
        let mut table = vec![0u32; (n + 1) * width];
        for i in (0..n).rev() {
            for j in (0..m).rev() {
                table[i * width + j] = if a_mid[i] == b_mid[j] {
                    table[(i + 1) * width + j + 1] + 1
                } else {
                    table[(i + 1) * width + j].max(table[i * width + j + 1])
                };
            }
        }

        let (mut i, mut j) = (0, 0);
        while i < n && j < m {
            if a_mid[i] == b_mid[j] {
                pairs.push((prefix + i, prefix + j));
                i += 1;
                j += 1;
            } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
                i += 1;
            } else {
                j += 1;
            }
        }
    }

    let a_tail = a.len() - suffix;
    let b_tail = b.len() - suffix;
    pairs.extend((0..suffix).map(|k| (a_tail + k, b_tail + k)));
    pairs
}
