//! Label-stratified cross-validation folds and hold-out splits.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::common::error::{TitanicError, TitanicResult};

/// Indices of one train/test partition.
#[derive(Debug, Clone, PartialEq)]
pub struct CvSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

fn by_class(labels: &[u8]) -> BTreeMap<u8, Vec<usize>> {
    let mut classes: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        classes.entry(label).or_default().push(i);
    }
    classes
}

fn complement(n: usize, test: &[usize]) -> Vec<usize> {
    let mut in_test = vec![false; n];
    for &i in test {
        in_test[i] = true;
    }
    (0..n).filter(|&i| !in_test[i]).collect()
}

/// Unshuffled stratified k-fold: each class's rows, in input order, are cut
/// into `k` contiguous chunks (earlier chunks take the remainder) and fold `f`
/// tests on chunk `f` of every class.
pub fn stratified_k_fold(labels: &[u8], k: usize) -> TitanicResult<Vec<CvSplit>> {
    if k < 2 {
        return Err(TitanicError::invalid("cross-validation needs at least 2 folds"));
    }
    if labels.len() < k {
        return Err(TitanicError::invalid(format!(
            "cannot split {} rows into {k} folds",
            labels.len()
        )));
    }

    let mut tests: Vec<Vec<usize>> = vec![Vec::new(); k];
    for members in by_class(labels).values() {
        let (base, extra) = (members.len() / k, members.len() % k);
        let mut start = 0;
        for (fold, test) in tests.iter_mut().enumerate() {
            let size = base + usize::from(fold < extra);
            test.extend_from_slice(&members[start..start + size]);
            start += size;
        }
    }

    tests
        .into_iter()
        .map(|mut test| {
            test.sort_unstable();
            let train = complement(labels.len(), &test);
            if test.is_empty() || train.is_empty() {
                return Err(TitanicError::invalid("a cross-validation fold came out empty"));
            }
            Ok(CvSplit { train, test })
        })
        .collect()
}

/// Seeded stratified hold-out split: each class contributes
/// `round(test_ratio * class_size)` rows to the test side.
pub fn stratified_split(labels: &[u8], test_ratio: f64, seed: u64) -> TitanicResult<CvSplit> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(TitanicError::invalid(format!(
            "test ratio must be in (0, 1), got {test_ratio}"
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut test = Vec::new();
    for members in by_class(labels).values() {
        let mut shuffled = members.clone();
        shuffled.shuffle(&mut rng);
        let n_test = (members.len() as f64 * test_ratio).round() as usize;
        test.extend_from_slice(&shuffled[..n_test.min(shuffled.len())]);
    }
    test.sort_unstable();

    let train = complement(labels.len(), &test);
    if test.is_empty() || train.is_empty() {
        return Err(TitanicError::invalid(format!(
            "{} rows are too few for a {test_ratio} hold-out split",
            labels.len()
        )));
    }
    Ok(CvSplit { train, test })
}
