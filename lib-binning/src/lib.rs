//! Construction of the genomic bins that reads are counted in.
//!
//! Bins are half-open intervals, sorted by start within each chromosome, chromosomes in header
//! order.  Alongside the bins a chromosome index is kept: entry `c` is the index of the first bin
//! of chromosome `c` and a final sentinel entry equals the number of bins, so the bins of `c`
//! are `index[c]..index[c + 1]`.

#[macro_use]
extern crate error_chain;

extern crate separator;
use separator::Separatable;

#[macro_use]
extern crate slog;
use slog::Logger;

extern crate lib_shared;
use lib_shared::errors::*;
use lib_shared::regions::{GenomeLayout, GenomeRegions, BINS_BED, EXCLUDE_BED};
use lib_shared::stats::Stats;

use std::ops::Range;

/// One genomic bin, 0-based half-open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bin {
    /// Chromosome id in the genome layout.
    pub chrom: usize,
    pub start: usize,
    pub end: usize,
}

impl Bin {
    pub fn width(&self) -> usize {
        self.end - self.start
    }
}

/// How to construct the bins.
#[derive(Clone, Debug, PartialEq)]
pub enum BinningMode {
    /// Consecutive windows of `window` bp, omitting windows touching any region of `exclude`.
    Fixed {
        window: usize,
        exclude: Option<String>,
    },
    /// Bins read from the BED file at `path`.
    Variable { path: String },
}

/// Build chromosome index from the chromosome ids of a chromosome-sorted sequence.
///
/// The result has `num_chroms + 1` entries; chromosomes without any element get an empty range.
pub fn build_chrom_index<I>(num_chroms: usize, chroms: I) -> Vec<usize>
where
    I: IntoIterator<Item = usize>,
{
    let mut counts = vec![0; num_chroms];
    for chrom in chroms {
        counts[chrom] += 1;
    }

    let mut index = Vec::with_capacity(num_chroms + 1);
    let mut acc = 0;
    for count in counts {
        index.push(acc);
        acc += count;
    }
    index.push(acc);
    index
}

/// The ordered set of bins together with the chromosome index.
#[derive(Clone, Debug, PartialEq)]
pub struct BinSet {
    bins: Vec<Bin>,
    chrom_index: Vec<usize>,
}

impl BinSet {
    /// Wrap chromosome-sorted `bins`.
    fn from_sorted(num_chroms: usize, bins: Vec<Bin>) -> Self {
        let chrom_index = build_chrom_index(num_chroms, bins.iter().map(|b| b.chrom));
        BinSet { bins, chrom_index }
    }

    /// Partition every chromosome into windows of length `window`.
    ///
    /// Windows that overlap any region in `exclude` (fully or partially) are omitted.  The last
    /// window of a chromosome may be shorter.
    pub fn fixed(layout: &GenomeLayout, window: usize, exclude: &GenomeRegions) -> Result<Self> {
        if window == 0 {
            bail!(ErrorKind::Config("window size must be positive".to_string()));
        }

        let mut exclude = exclude.clone();
        exclude.sort_and_merge();
        let mut excl = exclude.regions.iter().peekable();

        let mut bins = Vec::new();
        for (chrom, _, chrom_len) in layout.iter() {
            // Skip exclusions of previous chromosomes.
            while excl.peek().map_or(false, |r| r.0 < chrom) {
                excl.next();
            }
            let mut chrom_excl: Vec<(usize, usize)> = Vec::new();
            while let Some(&&(c, start, end)) = excl.peek() {
                if c != chrom {
                    break;
                }
                if start < end {
                    chrom_excl.push((start, end));
                }
                excl.next();
            }

            let mut next_excl = 0;
            let mut start = 0;
            while start < chrom_len {
                let end = ::std::cmp::min(start + window, chrom_len);
                while next_excl < chrom_excl.len() && chrom_excl[next_excl].1 <= start {
                    next_excl += 1;
                }
                let overlaps = next_excl < chrom_excl.len() && chrom_excl[next_excl].0 < end;
                if !overlaps {
                    bins.push(Bin { chrom, start, end });
                }
                start = end;
            }
        }

        Ok(Self::from_sorted(layout.len(), bins))
    }

    /// Use the given bins, which must be sorted and non-overlapping within each chromosome.
    ///
    /// Chromosomes may appear in any order in `regions`; the bins are grouped by chromosome in
    /// header order.
    pub fn variable(layout: &GenomeLayout, regions: &GenomeRegions) -> Result<Self> {
        let mut bins: Vec<Bin> = regions
            .regions
            .iter()
            .map(|&(chrom, start, end)| Bin { chrom, start, end })
            .collect();
        // stable: keeps file order within a chromosome
        bins.sort_by_key(|b| b.chrom);

        for (i, bin) in bins.iter().enumerate() {
            if bin.start >= bin.end {
                bail!(ErrorKind::Config(format!(
                    "empty bin {}:{}-{}",
                    layout.name(bin.chrom),
                    bin.start,
                    bin.end
                )));
            }
            if i > 0 && bins[i - 1].chrom == bin.chrom {
                let prev = &bins[i - 1];
                if prev.start > bin.start {
                    bail!(ErrorKind::Config(format!(
                        "bins are not sorted: {}:{}-{} follows {}:{}-{}",
                        layout.name(bin.chrom),
                        bin.start,
                        bin.end,
                        layout.name(prev.chrom),
                        prev.start,
                        prev.end
                    )));
                }
                if prev.end > bin.start {
                    bail!(ErrorKind::Config(format!(
                        "bins overlap: {}:{}-{} and {}:{}-{}",
                        layout.name(prev.chrom),
                        prev.start,
                        prev.end,
                        layout.name(bin.chrom),
                        bin.start,
                        bin.end
                    )));
                }
            }
        }

        Ok(Self::from_sorted(layout.len(), bins))
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// The chromosome index including the sentinel entry.
    pub fn chrom_index(&self) -> &[usize] {
        &self.chrom_index
    }

    /// Number of chromosomes covered by the index.
    pub fn num_chroms(&self) -> usize {
        self.chrom_index.len() - 1
    }

    /// Range of bin indices on `chrom`.
    pub fn chrom_range(&self, chrom: usize) -> Range<usize> {
        self.chrom_index[chrom]..self.chrom_index[chrom + 1]
    }

    /// Index of the bin containing position `pos` on `chrom`, if any.
    pub fn find_bin(&self, chrom: usize, pos: usize) -> Option<usize> {
        if chrom >= self.num_chroms() {
            return None;
        }
        let range = self.chrom_range(chrom);
        let slice = &self.bins[range.clone()];
        let k = slice.partition_point(|b| b.start <= pos);
        if k == 0 {
            return None;
        }
        if pos < slice[k - 1].end {
            Some(range.start + k - 1)
        } else {
            None
        }
    }

    /// Median bin width.
    pub fn median_width(&self) -> f64 {
        let widths: Vec<f64> = self.bins.iter().map(|b| b.width() as f64).collect();
        widths.as_slice().median()
    }
}

/// Build the bins for `mode`, reading interval files as needed.
pub fn build_bins(logger: &mut Logger, layout: &GenomeLayout, mode: &BinningMode) -> Result<BinSet> {
    let bins = match mode {
        BinningMode::Fixed { window, exclude } => {
            let exclude = match exclude {
                Some(path) => {
                    debug!(logger, "Loading exclusion list {}", path);
                    GenomeRegions::from_bed_path(path, layout, EXCLUDE_BED, logger)?
                }
                None => GenomeRegions::new(),
            };
            info!(
                logger,
                "Creating {}kb bins with {} excluded regions",
                window / 1000,
                exclude.regions.len()
            );
            BinSet::fixed(layout, *window, &exclude)?
        }
        BinningMode::Variable { path } => {
            debug!(logger, "Loading variable-width bins {}", path);
            let regions = GenomeRegions::from_bed_path(path, layout, BINS_BED, logger)?;
            BinSet::variable(layout, &regions)?
        }
    };

    if bins.is_empty() {
        bail!(ErrorKind::Config("no bins left after binning".to_string()));
    }
    info!(
        logger,
        "Using {} bins with median bin size of {}kb",
        bins.len().separated_string(),
        (bins.median_width() / 1000.0).round()
    );

    Ok(bins)
}
