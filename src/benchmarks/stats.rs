// src/benchmarks/stats.rs
//! Small robust statistics. Empty (or all non-finite) input gives `None`,
//! never `NaN`.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    v
}

/// Linear-interpolation quantile (R type 7). `q` is clamped to `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if !q.is_finite() {
        return None;
    }
    let sorted = sorted_finite(values);
    if sorted.is_empty() {
        return None;
    }
    let h = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let v = sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]);
    v.is_finite().then_some(v)
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

pub fn max(values: &[f64]) -> Option<f64> {
    sorted_finite(values).last().copied()
}

/// `(value, count)` sorted by count desc, then value asc.
pub fn frequencies<T: Copy + Ord + Hash>(values: &[T]) -> Vec<(T, usize)> {
    let mut counts: HashMap<T, usize> = HashMap::new();
    for v in values {
        *counts.entry(*v).or_default() += 1;
    }
    let mut out: Vec<(T, usize)> = counts.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    out
}

/// Most frequent value; ties go to the smaller value.
pub fn mode<T: Copy + Ord + Hash>(values: &[T]) -> Option<T> {
    frequencies(values).first().map(|(v, _)| *v)
}

/// `num / den`, or `None` for an empty denominator.
pub fn share(num: usize, den: usize) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}
