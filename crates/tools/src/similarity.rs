//! Ratcliff/Obershelp sequence similarity over characters.
//!
//! `ratio` is `2 * M / T`, where `M` is the number of characters in the
//! matching blocks found by repeatedly taking the longest common substring
//! and recursing on both sides, and `T` the combined length. No junk
//! heuristics are applied, so scores are symmetric in practice.

use std::collections::HashMap;

/// Similarity in `[0, 1]` between two strings. Two empty strings score 1.0.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

/// Upper bound on `ratio` from character multiset intersection alone.
pub fn quick_ratio(a: &str, b: &str) -> f64 {
    let mut avail: HashMap<char, isize> = HashMap::new();
    for c in b.chars() {
        *avail.entry(c).or_insert(0) += 1;
    }
    let mut matches = 0usize;
    let mut a_len = 0usize;
    for c in a.chars() {
        a_len += 1;
        let n = avail.entry(c).or_insert(0);
        if *n > 0 {
            matches += 1;
        }
        *n -= 1;
    }
    let total = a_len + b.chars().count();
    if total == 0 {
        return 1.0;
    }
    2.0 * matches as f64 / total as f64
}

/// Up to `n` candidates whose `ratio` against `query` is at least `cutoff`,
/// best first. Returns `(index, score)` pairs into `candidates`; ties keep
/// input order.
pub fn close_matches<S: AsRef<str>>(
    query: &str,
    candidates: &[S],
    n: usize,
    cutoff: f64,
) -> Vec<(usize, f64)> {
    if n == 0 {
        return Vec::new();
    }
    let mut scored: Vec<(usize, f64)> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| quick_ratio(c.as_ref(), query) >= cutoff)
        .map(|(i, c)| (i, ratio(c.as_ref(), query)))
        .filter(|(_, score)| *score >= cutoff)
        .collect();
    scored.sort_by(|x, y| y.1.total_cmp(&x.1));
    scored.truncate(n);
    scored
}

/// Total size of all matching blocks between `a` and `b`.
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b2j.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common block in `a[alo..ahi]` / `b[blo..bhi]`, earliest in `a`
/// on ties. Returns `(i, j, size)`.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j.checked_sub(1).and_then(|p| j2len.get(&p)).copied().unwrap_or(0) + 1;
                next.insert(j, k);
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        j2len = next;
    }
    (best_i, best_j, best_size)
}
