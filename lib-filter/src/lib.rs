//! Bin-quality filter based on population statistics across cells.

#[macro_use]
extern crate error_chain;

extern crate separator;
use separator::Separatable;

#[macro_use]
extern crate slog;
use slog::Logger;

extern crate strum;
#[macro_use]
extern crate strum_macros;

extern crate lib_binning;
extern crate lib_counting;
extern crate lib_shared;

use std::ops::Range;

use lib_binning::{build_chrom_index, BinSet};
use lib_counting::Cell;
use lib_shared::errors::*;
use lib_shared::stats::{MeanVar, Stats};

/// Bins with a normalized mean at or below this are considered empty.
pub const MIN_BIN_MEAN: f64 = 0.01;

/// Number of standard deviations above the mean of bin means that marks a bin as hot.
pub const MAX_BIN_SDS: f64 = 3.0;

/// Why a bin was removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, Display)]
pub enum BadBinReason {
    /// Mean at or below `MIN_BIN_MEAN`.
    #[strum(serialize = "l")]
    Low,
    /// Mean at or above `μ + 3σ`.
    #[strum(serialize = "h")]
    High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BadBin {
    /// Index into the bin set.
    pub bin: usize,
    pub reason: BadBinReason,
}

/// Indices of the bins kept, with their own chromosome index.
#[derive(Clone, Debug, PartialEq)]
pub struct GoodBins {
    bins: Vec<usize>,
    chrom_index: Vec<usize>,
}

impl GoodBins {
    /// Build from strictly increasing indices into `bin_set`.
    pub fn new(bins: Vec<usize>, bin_set: &BinSet) -> Self {
        debug_assert!(bins.windows(2).all(|w| w[0] < w[1]));
        let chrom_index = build_chrom_index(
            bin_set.num_chroms(),
            bins.iter().map(|&b| bin_set.bins()[b].chrom),
        );
        GoodBins { bins, chrom_index }
    }

    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn num_chroms(&self) -> usize {
        self.chrom_index.len() - 1
    }

    /// Range into `bins()` of the good bins on `chrom`.
    pub fn chrom_range(&self, chrom: usize) -> Range<usize> {
        self.chrom_index[chrom]..self.chrom_index[chrom + 1]
    }

    /// Good bin indices on `chrom`.
    pub fn chrom_bins(&self, chrom: usize) -> &[usize] {
        &self.bins[self.chrom_range(chrom)]
    }
}

/// Result of bin filtering.
#[derive(Clone, Debug, PartialEq)]
pub struct BinFilter {
    pub good: GoodBins,
    /// Removed bins in bin order.
    pub bad: Vec<BadBin>,
    /// Per-bin mean of normalized counts across cells.
    pub means: Vec<f64>,
    /// Per-bin population variance of normalized counts across cells.
    pub vars: Vec<f64>,
    /// Mean of `means`.
    pub mean_of_means: f64,
    /// Standard deviation of `means`.
    pub sd_of_means: f64,
}

/// Classify bins as good or bad from the median-normalized counts of `cells`.
///
/// Cells with a median bin count of zero do not contribute.
pub fn filter_bins(logger: &Logger, cells: &[Cell], bins: &BinSet) -> Result<BinFilter> {
    info!(logger, "Filtering {} bins...", bins.len().separated_string());

    let usable: Vec<&Cell> = cells
        .iter()
        .filter(|cell| {
            if cell.info.median_bin_count > 0.0 {
                true
            } else {
                warn!(
                    logger,
                    "Cell {} has a median bin count of 0, leaving it out of bin statistics",
                    cell.info.name
                );
                false
            }
        })
        .collect();
    if usable.is_empty() {
        bail!("no cell with a positive median bin count left for bin filtering");
    }

    let mut means = Vec::with_capacity(bins.len());
    let mut vars = Vec::with_capacity(bins.len());
    for bin in 0..bins.len() {
        let mut acc = MeanVar::new();
        for cell in &usable {
            let counter = &cell.counts[bin];
            let median = cell.info.median_bin_count;
            acc.push(counter.watson as f64 / median + counter.crick as f64 / median);
        }
        means.push(acc.mean());
        vars.push(acc.variance());
    }

    let mean_of_means = means.as_slice().mean();
    let sd_of_means = means.as_slice().std_dev();
    let max_mean = mean_of_means + MAX_BIN_SDS * sd_of_means;
    info!(logger, "Mean normalized bin count is {}", mean_of_means);
    info!(logger, "Normalized bin count SD is {}", sd_of_means);

    let mut good = Vec::new();
    let mut bad = Vec::new();
    for (bin, &mean) in means.iter().enumerate() {
        if mean > MIN_BIN_MEAN && mean < max_mean {
            good.push(bin);
        } else {
            let reason = if mean <= MIN_BIN_MEAN {
                BadBinReason::Low
            } else {
                BadBinReason::High
            };
            trace!(logger, "Removing bin {} ({}) with mean {}", bin, reason, mean);
            bad.push(BadBin { bin, reason });
        }
    }
    info!(
        logger,
        "Filtering {} bins, keeping {}",
        bad.len().separated_string(),
        good.len().separated_string()
    );

    Ok(BinFilter {
        good: GoodBins::new(good, bins),
        bad,
        means,
        vars,
        mean_of_means,
        sd_of_means,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::Discard;

    use lib_counting::{CellInfo, Counter, EventTallies};
    use lib_shared::regions::{GenomeLayout, GenomeRegions};
    use lib_shared::stats::Stats;

    fn bin_set() -> BinSet {
        let layout = GenomeLayout::from_name_and_length(&[
            ("chr1".to_string(), 1000),
            ("chr2".to_string(), 1000),
        ]);
        BinSet::fixed(&layout, 100, &GenomeRegions::new()).unwrap()
    }

    fn cell(id: usize, totals: &[u32]) -> Cell {
        let counts: Vec<Counter> = totals.iter().map(|t| Counter::new(t / 2, t - t / 2)).collect();
        let values: Vec<f64> = totals.iter().map(|t| *t as f64).collect();
        Cell {
            info: CellInfo {
                id,
                name: format!("cell{}", id),
                path: format!("cell{}.bam", id),
                sample: "S".to_string(),
                median_bin_count: values.as_slice().median(),
                tallies: EventTallies::default(),
            },
            counts,
        }
    }

    /// Bin 3 is empty in every cell and bin 17 is ten times as deep as the rest.
    fn cells() -> Vec<Cell> {
        let mut totals = vec![10; 20];
        totals[3] = 0;
        totals[17] = 100;
        vec![cell(0, &totals), cell(1, &totals), cell(2, &vec![0; 20])]
    }

    #[test]
    fn test_low_and_high_bins() {
        let logger = Logger::root(Discard, o!());
        let filter = filter_bins(&logger, &cells(), &bin_set()).unwrap();

        assert_eq!(
            vec![
                BadBin {
                    bin: 3,
                    reason: BadBinReason::Low
                },
                BadBin {
                    bin: 17,
                    reason: BadBinReason::High
                },
            ],
            filter.bad
        );
        assert_eq!(18, filter.good.len());
        assert!((filter.mean_of_means - 1.4).abs() < 1e-9);
        assert_eq!(1.0, filter.means[0]);
        assert_eq!(0.0, filter.vars[0]);
        assert_eq!(vec![0, 9, 18], filter.good.chrom_index.clone());
        assert_eq!(9, filter.good.chrom_bins(1).len());
        assert_eq!(10, filter.good.chrom_bins(1)[0]);
    }

    #[test]
    fn test_good_and_bad_partition_all_bins() {
        let logger = Logger::root(Discard, o!());
        let bins = bin_set();
        let filter = filter_bins(&logger, &cells(), &bins).unwrap();

        assert_eq!(bins.len(), filter.good.len() + filter.bad.len());
        let removed: Vec<usize> = filter.bad.iter().map(|b| b.bin).collect();
        let kept: Vec<usize> = (0..bins.len()).filter(|b| !removed.contains(b)).collect();
        assert_eq!(kept, filter.good.bins().to_vec());
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!("l", BadBinReason::Low.to_string());
        assert_eq!("h", BadBinReason::High.to_string());
    }

    #[test]
    fn test_no_usable_cell() {
        let logger = Logger::root(Discard, o!());
        assert!(filter_bins(&logger, &[cell(0, &vec![0; 20])], &bin_set()).is_err());
    }
}
