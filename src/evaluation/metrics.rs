//! Binary classification metrics.

/// Share of predictions equal to the label; `None` for empty input.
pub fn accuracy(labels: &[u8], predictions: &[u8]) -> Option<f64> {
    if labels.is_empty() || labels.len() != predictions.len() {
        return None;
    }
    let correct = labels.iter().zip(predictions).filter(|(l, p)| l == p).count();
    Some(correct as f64 / labels.len() as f64)
}

/// Recall of the positive class: true positives over actual positives.
/// `None` when the labels contain no positives.
pub fn recall(labels: &[u8], predictions: &[u8]) -> Option<f64> {
    if labels.len() != predictions.len() {
        return None;
    }
    let positives = labels.iter().filter(|&&l| l == 1).count();
    if positives == 0 {
        return None;
    }
    let hits = labels
        .iter()
        .zip(predictions)
        .filter(|(&l, &p)| l == 1 && p == 1)
        .count();
    Some(hits as f64 / positives as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_counts_matches() {
        assert_eq!(accuracy(&[1, 0, 1, 1], &[1, 0, 0, 1]), Some(0.75));
        assert_eq!(accuracy(&[], &[]), None);
    }

    #[test]
    fn recall_ignores_negatives() {
        assert_eq!(recall(&[1, 0, 1, 1], &[1, 1, 0, 1]), Some(2.0 / 3.0));
        assert_eq!(recall(&[0, 0], &[1, 0]), None);
    }
}
