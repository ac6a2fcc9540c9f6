//! Per-sample estimation of the negative binomial parameter `p`.
//!
//! Every cell contributes the mean `m` and variance `v` of its total counts over the good bins.
//! With the negative binomial variance `m / p`, the method of moments over all cells of a sample
//! gives `p = Σ m² / Σ (m · v)`.

// `error_chain!` can recurse deeply.
#![recursion_limit = "1024"]

#[macro_use]
extern crate error_chain;

#[macro_use]
extern crate slog;
use slog::Logger;

extern crate lib_counting;
extern crate lib_filter;
extern crate lib_shared;

#[cfg(test)]
extern crate lib_binning;

use std::collections::BTreeMap;

use lib_counting::Cell;
use lib_filter::GoodBins;
use lib_shared::stats::MeanVar;

mod errors {
    error_chain! {
        errors {
            Estimation(sample: String, p: f64) {
                description("could not estimate negative binomial parameter")
                display(
                    "estimated p = {} for sample {} is outside (0, 1); the counts of this \
                     sample are degenerate (too few cells, reads or good bins, or less \
                     variance than mean)",
                    p, sample
                )
            }
        }
    }
}

pub use errors::*;

/// Statistics of one sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleInfo {
    /// Ids of the member cells, in the order they were folded in.
    pub cells: Vec<usize>,
    /// Mean total count over good bins, per member cell.
    pub means: Vec<f64>,
    /// Variance of the total count over good bins, per member cell.
    pub vars: Vec<f64>,
    /// Estimated `p`, not necessarily valid.
    pub p: f64,
}

impl SampleInfo {
    /// Fold in the statistics of one cell.
    pub fn push(&mut self, cell: usize, mean: f64, var: f64) {
        self.cells.push(cell);
        self.means.push(mean);
        self.vars.push(var);
    }

    /// Method-of-moments estimate from the folded cells.
    pub fn estimate_p(&self) -> f64 {
        let num: f64 = self.means.iter().map(|m| m * m).sum();
        let denom: f64 = self
            .means
            .iter()
            .zip(self.vars.iter())
            .map(|(m, v)| m * v)
            .sum();
        num / denom
    }

    /// `p` if it lies in `(0, 1)`.
    pub fn checked_p(&self, sample: &str) -> Result<f64> {
        if self.p > 0.0 && self.p < 1.0 {
            Ok(self.p)
        } else {
            bail!(ErrorKind::Estimation(sample.to_string(), self.p))
        }
    }
}

/// Mean and population variance of the total counts of `cell` over `good`.
pub fn cell_mean_var(cell: &Cell, good: &GoodBins) -> (f64, f64) {
    let mut acc = MeanVar::new();
    for &bin in good.bins() {
        acc.push(cell.counts[bin].total() as f64);
    }
    (acc.mean(), acc.variance())
}

/// Group `cells` by sample and estimate `p` for every sample.
///
/// Every cell is folded in, including cells with a median bin count of zero.  Estimation
/// failures are logged; callers check with `SampleInfo::checked_p`.
pub fn estimate_samples(
    logger: &Logger,
    cells: &[Cell],
    good: &GoodBins,
) -> BTreeMap<String, SampleInfo> {
    info!(logger, "Estimating NB parameter p per sample...");
    let mut samples: BTreeMap<String, SampleInfo> = BTreeMap::new();
    for cell in cells {
        let (mean, var) = cell_mean_var(cell, good);
        samples
            .entry(cell.info.sample.clone())
            .or_insert_with(SampleInfo::default)
            .push(cell.info.id, mean, var);
    }

    for (name, info) in samples.iter_mut() {
        info.p = info.estimate_p();
        match info.checked_p(name) {
            Ok(p) => info!(logger, "Sample {}: {} cells, p = {}", name, info.cells.len(), p),
            Err(e) => error!(logger, "{}", e),
        }
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::Discard;

    use lib_binning::BinSet;
    use lib_counting::{CellInfo, Counter, EventTallies};
    use lib_shared::regions::{GenomeLayout, GenomeRegions};

    fn bin_set(n: usize) -> BinSet {
        let layout = GenomeLayout::from_name_and_length(&[("chr1".to_string(), n * 10)]);
        BinSet::fixed(&layout, 10, &GenomeRegions::new()).unwrap()
    }

    fn cell(id: usize, sample: &str, totals: &[u32]) -> Cell {
        let mut sorted = totals.to_vec();
        sorted.sort();
        Cell {
            info: CellInfo {
                id,
                name: format!("cell{}", id),
                path: format!("cell{}.bam", id),
                sample: sample.to_string(),
                median_bin_count: sorted[sorted.len() / 2] as f64,
                tallies: EventTallies::default(),
            },
            counts: totals.iter().map(|t| Counter::new(*t, 0)).collect(),
        }
    }

    fn logger() -> Logger {
        Logger::root(Discard, o!())
    }

    #[test]
    fn test_near_poisson_gives_p_close_to_one() {
        // mean 10, variance 10.83
        let totals = [4, 16, 7, 13, 6, 14, 8, 12, 10, 10, 10, 10];
        let bins = bin_set(totals.len());
        let good = GoodBins::new((0..totals.len()).collect(), &bins);
        let cells = vec![cell(0, "S", &totals)];
        let samples = estimate_samples(&logger(), &cells, &good);

        let p = samples["S"].checked_p("S").unwrap();
        assert!(p > 0.9 && p < 1.0, "p = {}", p);
        assert_eq!(vec![0], samples["S"].cells);
    }

    #[test]
    fn test_overdispersed_gives_small_p() {
        let totals = [0, 40, 2, 38, 1, 39, 20, 20];
        let bins = bin_set(totals.len());
        let good = GoodBins::new((0..totals.len()).collect(), &bins);
        let cells = vec![cell(0, "A", &totals), cell(1, "A", &totals)];
        let samples = estimate_samples(&logger(), &cells, &good);

        let info = &samples["A"];
        assert_eq!(2, info.means.len());
        let p = info.checked_p("A").unwrap();
        assert!(p < 0.2, "p = {}", p);
    }

    #[test]
    fn test_only_good_bins_count() {
        let totals = [10, 30, 10, 30, 1000];
        let bins = bin_set(totals.len());
        let good = GoodBins::new(vec![0, 1, 2, 3], &bins);
        let (mean, var) = cell_mean_var(&cell(0, "S", &totals), &good);
        assert!((mean - 20.0).abs() < 1e-9);
        assert!((var - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_median_cells_are_folded_in() {
        let bins = bin_set(6);
        let good = GoodBins::new((0..6).collect(), &bins);
        let cells = vec![
            cell(0, "S", &[10, 30, 10, 30, 20, 20]),
            cell(1, "S", &[0, 0, 0, 0, 6, 9]),
            cell(2, "T", &[0, 0, 0, 0, 0, 3]),
        ];
        assert_eq!(0.0, cells[1].info.median_bin_count);
        assert_eq!(0.0, cells[2].info.median_bin_count);
        let samples = estimate_samples(&logger(), &cells, &good);

        let s = &samples["S"];
        assert_eq!(vec![0, 1], s.cells);
        assert_eq!(2, s.means.len());
        assert!((s.means[1] - 2.5).abs() < 1e-9);
        let t = &samples["T"];
        assert_eq!(vec![2], t.cells);
        assert!((t.means[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_counts() {
        // constant counts: zero variance
        let totals = [5; 6];
        let bins = bin_set(totals.len());
        let good = GoodBins::new((0..totals.len()).collect(), &bins);
        let samples = estimate_samples(&logger(), &[cell(0, "S", &totals)], &good);
        match samples["S"].checked_p("S") {
            Err(Error(ErrorKind::Estimation(ref sample, _), _)) => assert_eq!("S", sample),
            other => panic!("unexpected {:?}", other),
        }

        // underdispersed: p > 1
        let totals = [9, 11, 9, 11];
        let bins = bin_set(totals.len());
        let good = GoodBins::new((0..totals.len()).collect(), &bins);
        let samples = estimate_samples(&logger(), &[cell(0, "S", &totals)], &good);
        assert!(samples["S"].p > 1.0);
        assert!(samples["S"].checked_p("S").is_err());
    }
}
