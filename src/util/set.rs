//! Set arithmetic over string sequences
//!
//! Inputs may contain duplicates and arrive in any order. Every output is
//! deduplicated and sorted lexicographically so callers get a stable result.

use rustc_hash::FxHashSet;
use std::collections::BTreeSet;

/// Deduplicated combination of both sequences
pub fn union<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> Vec<String> {
    a.iter()
        .map(|s| s.as_ref())
        .chain(b.iter().map(|s| s.as_ref()))
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Elements of `a` that are not present in `b`
pub fn subtract<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> Vec<String> {
    let exclude: FxHashSet<&str> = b.iter().map(|s| s.as_ref()).collect();
    a.iter()
        .map(|s| s.as_ref())
        .filter(|s| !exclude.contains(s))
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Elements present in exactly one of `a` and `b`
pub fn symmetric_difference<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> Vec<String> {
    let left: BTreeSet<&str> = a.iter().map(|s| s.as_ref()).collect();
    let right: BTreeSet<&str> = b.iter().map(|s| s.as_ref()).collect();
    left.symmetric_difference(&right)
        .map(|s| (*s).to_owned())
        .collect()
}
