//! Seeded stratified train/test split.
//!
//! - test size is `ceil(test_fraction * n)`
//! - each class receives `floor(n_c * n_test / n)` test rows; leftover slots go
//!   to the classes with the largest fractional remainder
//! - rows inside each class are shuffled with a seeded `StdRng`, so the same
//!   labels + seed always produce the same split

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::domain::DemandLabel;
use crate::error::AppError;

/// Row indices of each side of the split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StratifiedSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

pub fn stratified_split(labels: &[DemandLabel], test_fraction: f64, seed: u64) -> Result<StratifiedSplit, AppError> {
    if !(test_fraction.is_finite() && test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(AppError::InvalidInput(format!(
            "Test fraction must be in (0, 1), got {test_fraction}."
        )));
    }

    let n = labels.len();
    // Nudge below the product so float noise cannot round up a whole row.
    let n_test = (test_fraction * n as f64 - 1e-9).ceil().max(0.0) as usize;
    let n_train = n.saturating_sub(n_test);

    let mut by_class: BTreeMap<DemandLabel, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        by_class.entry(*label).or_default().push(i);
    }
    let n_classes = by_class.len();

    if let Some((label, rows)) = by_class.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(AppError::Training(format!(
            "Class '{label}' has only {} row(s); stratified splitting needs at least 2 per class.",
            rows.len()
        )));
    }
    if n_test < n_classes || n_train < n_classes {
        return Err(AppError::Training(format!(
            "A {n_train}/{n_test} split cannot hold all {n_classes} classes on both sides."
        )));
    }

    let counts: Vec<usize> = by_class.values().map(Vec::len).collect();
    let alloc = allocate_test_rows(&counts, n_test);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for (rows, take) in by_class.values().zip(alloc) {
        let mut rows = rows.clone();
        rows.shuffle(&mut rng);
        test.extend_from_slice(&rows[..take]);
        train.extend_from_slice(&rows[take..]);
    }

    // Interleave classes so neither side is ordered by label.
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok(StratifiedSplit { train, test })
}

/// Proportional allocation of `n_test` slots across classes of size `counts`.
///
/// Every class keeps at least one training row.
fn allocate_test_rows(counts: &[usize], n_test: usize) -> Vec<usize> {
    let n: usize = counts.iter().sum();
    let mut alloc: Vec<usize> = counts.iter().map(|c| c * n_test / n).collect();
    let mut remaining = n_test - alloc.iter().sum::<usize>();

    // Largest remainder first; larger classes win ties.
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = (counts[a] * n_test) % n;
        let rb = (counts[b] * n_test) % n;
        rb.cmp(&ra).then(counts[b].cmp(&counts[a])).then(a.cmp(&b))
    });

    while remaining > 0 {
        let mut progressed = false;
        for &i in &order {
            if remaining == 0 {
                break;
            }
            if alloc[i] + 1 < counts[i] {
                alloc[i] += 1;
                remaining -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    alloc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(low: usize, medium: usize, high: usize) -> Vec<DemandLabel> {
        let mut out = Vec::new();
        out.extend(std::iter::repeat_n(DemandLabel::Low, low));
        out.extend(std::iter::repeat_n(DemandLabel::Medium, medium));
        out.extend(std::iter::repeat_n(DemandLabel::High, high));
        out
    }

    fn count(rows: &[usize], y: &[DemandLabel], label: DemandLabel) -> usize {
        rows.iter().filter(|&&i| y[i] == label).count()
    }

    #[test]
    fn sizes_partition_the_dataset() {
        let y = labels(50, 30, 20);
        let split = stratified_split(&y, 0.2, 42).unwrap();
        assert_eq!(split.train.len() + split.test.len(), y.len());
        assert_eq!(split.test.len(), 20);

        let mut all: Vec<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..y.len()).collect::<Vec<_>>());
    }

    #[test]
    fn class_proportions_are_preserved() {
        let y = labels(50, 30, 20);
        let split = stratified_split(&y, 0.2, 42).unwrap();
        assert_eq!(count(&split.test, &y, DemandLabel::Low), 10);
        assert_eq!(count(&split.test, &y, DemandLabel::Medium), 6);
        assert_eq!(count(&split.test, &y, DemandLabel::High), 4);
    }

    #[test]
    fn leftover_slots_go_to_largest_remainders() {
        let y = labels(7, 5, 3);
        let split = stratified_split(&y, 0.2, 7).unwrap();
        assert_eq!(split.test.len(), 3);
        for label in DemandLabel::ALL {
            assert_eq!(count(&split.test, &y, label), 1);
        }
    }

    #[test]
    fn same_seed_same_split() {
        let y = labels(40, 40, 20);
        assert_eq!(stratified_split(&y, 0.2, 42).unwrap(), stratified_split(&y, 0.2, 42).unwrap());
        assert_ne!(stratified_split(&y, 0.2, 42).unwrap(), stratified_split(&y, 0.2, 43).unwrap());
    }

    #[test]
    fn singleton_class_is_rejected() {
        let y = labels(10, 10, 1);
        assert!(matches!(stratified_split(&y, 0.2, 42), Err(AppError::Training(_))));
    }
}
