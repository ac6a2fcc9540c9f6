//! Counting and strand-state classification of Strand-seq cells.

// `error_chain!` can recurse deeply.
#![recursion_limit = "1024"]

extern crate chrono;

#[cfg_attr(test, macro_use)]
extern crate clap;

#[macro_use]
extern crate error_chain;

extern crate rayon;
use rayon::prelude::*;

extern crate separator;
use separator::Separatable;

extern crate shlex;

#[macro_use]
extern crate slog;
use slog::Logger;

#[cfg(test)]
extern crate tempdir;

extern crate lib_binning;
extern crate lib_counting;
extern crate lib_filter;
extern crate lib_model_nb;
extern crate lib_segment;
extern crate lib_shared;

use std::collections::{BTreeMap, BTreeSet};

use lib_binning::build_bins;
use lib_counting::bam::BamSource;
use lib_counting::{count_cells, scan_headers, AlignmentSource, Cell};
use lib_filter::{filter_bins, GoodBins};
use lib_model_nb::{estimate_samples, SampleInfo};
use lib_segment::StrandModel;

mod options;
pub use options::*;

pub mod report;

mod errors {
    error_chain! {
        links {
            Shared(lib_shared::errors::Error, lib_shared::errors::ErrorKind);
            Model(lib_model_nb::Error, lib_model_nb::ErrorKind);
            Segment(lib_segment::Error, lib_segment::ErrorKind);
        }

        errors {
            OutputWrite(path: String) {
                description("could not write output file")
                display("could not write output file {}", path)
            }
        }
    }
}

pub use errors::*;

/// Log `e` with its causes as errors.
fn log_error(logger: &Logger, e: &Error) {
    error!(logger, "{}", e);
    for e in e.iter().skip(1) {
        error!(logger, "caused by: {}", e);
    }
}

/// Decode one cell with the `p` of its sample.
fn decode_cell(
    model: &StrandModel,
    cell: &mut Cell,
    good: &GoodBins,
    samples: &BTreeMap<String, SampleInfo>,
) -> Result<()> {
    if cell.info.median_bin_count <= 0.0 {
        bail!("median bin count is 0");
    }
    let p = match samples.get(&cell.info.sample) {
        Some(info) => info.checked_p(&cell.info.sample)?,
        None => bail!("no parameters for sample {}", cell.info.sample),
    };
    model.decode_cell(cell, good, p)?;
    Ok(())
}

/// Decode all cells in parallel on a pool of `threads` threads (0 for the rayon default).
///
/// Cells that cannot be decoded keep their counts without labels; their ids are returned.
pub fn decode_cells(
    logger: &Logger,
    model: &StrandModel,
    cells: &mut [Cell],
    good: &GoodBins,
    samples: &BTreeMap<String, SampleInfo>,
    threads: usize,
) -> Result<BTreeSet<usize>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .chain_err(|| "could not create thread pool")?;
    info!(
        logger,
        "Classifying {} cells on {} threads...",
        cells.len(),
        pool.current_num_threads()
    );

    let undecoded: BTreeSet<usize> = pool.install(|| {
        cells
            .par_iter_mut()
            .filter_map(|cell| match decode_cell(model, cell, good, samples) {
                Ok(()) => None,
                Err(e) => {
                    warn!(logger, "Not classifying cell {}: {}", cell.info.name, e);
                    Some(cell.info.id)
                }
            })
            .collect()
    });
    info!(
        logger,
        "Classified {} of {} cells",
        cells.len() - undecoded.len(),
        cells.len()
    );
    Ok(undecoded)
}

/// Run the whole pipeline on the inputs opened through `source`.
pub fn run_with_source<S: AlignmentSource>(
    logger: &mut Logger,
    options: &ClassifyOptions,
    source: &S,
) -> Result<()> {
    let (layout, inputs) = scan_headers(logger, source, &options.inputs)?;
    let bins = build_bins(logger, &layout, &options.binning)?;
    let model = StrandModel::new(logger, options.model, bins.len())?;

    let mut cells = count_cells(logger, source, &inputs, &bins);
    if cells.is_empty() {
        bail!("none of the {} input files could be read", inputs.len());
    }

    let filter = filter_bins(logger, &cells, &bins)?;
    if let Some(ref path) = options.removed_bins {
        info!(logger, "Writing removed bins to {}", path);
        if let Err(e) = report::write_removed_bins(path, &layout, &bins, &filter) {
            log_error(logger, &e);
        }
    }

    let samples = estimate_samples(logger, &cells, &filter.good);
    if let Some(ref path) = options.sample_info {
        info!(logger, "Writing sample information to {}", path);
        if let Err(e) = report::write_sample_info(path, &samples) {
            log_error(logger, &e);
        }
    }

    let undecoded = decode_cells(
        logger,
        &model,
        &mut cells,
        &filter.good,
        &samples,
        options.threads,
    )?;
    if let Some(ref path) = options.cell_info {
        info!(logger, "Writing cell summary to {}", path);
        if let Err(e) = report::write_cell_info(path, &cells, &undecoded) {
            log_error(logger, &e);
        }
    }

    info!(
        logger,
        "Writing {} rows to {}",
        (cells.len() * bins.len()).separated_string(),
        options.output
    );
    report::write_counts(&options.output, &layout, &bins, &cells)?;

    Ok(())
}

/// Main entry point: count and classify the BAM files of `options`.
pub fn run(logger: &mut Logger, options: &ClassifyOptions) -> Result<()> {
    info!(logger, "Running: sscount");
    info!(logger, "Options: {:?}", options);

    let source = BamSource::new(options.min_mapq);
    run_with_source(logger, options, &source)?;

    info!(logger, "=> OK");
    Ok(())
}
