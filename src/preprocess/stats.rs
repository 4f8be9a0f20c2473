//! Order statistics over the known (non-missing) values of a column.

use std::collections::BTreeMap;

/// Linear-interpolated quantile of an ascending slice; `None` when empty.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Known values, ascending.
pub fn sorted_known(values: &[Option<f64>]) -> Vec<f64> {
    let mut known: Vec<f64> = values.iter().flatten().copied().collect();
    known.sort_by(f64::total_cmp);
    known
}

pub fn median(values: &[Option<f64>]) -> Option<f64> {
    quantile_sorted(&sorted_known(values), 0.5)
}

/// Most frequent value; ties go to the lexicographically smallest.
pub fn mode<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.into_iter().flatten() {
        *counts.entry(value).or_default() += 1;
    }
    // BTreeMap iterates in key order; max_by_key keeps the last maximum, so
    // walk in reverse to let the smallest key win ties.
    counts
        .into_iter()
        .rev()
        .max_by_key(|&(_, n)| n)
        .map(|(value, _)| value.to_string())
}
