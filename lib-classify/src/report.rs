//! Writing of the count table and the summary reports.

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};

use lib_binning::BinSet;
use lib_counting::{Cell, CellInfo};
use lib_filter::BinFilter;
use lib_model_nb::SampleInfo;
use lib_shared::regions::GenomeLayout;

use super::errors::*;

/// Label written for bins without a decoded state.
pub const NO_LABEL: &str = "None";

/// Sample status when `p` lies in `(0, 1)`.
pub const STATUS_OK: &str = "ok";

/// Sample status when `p` is outside `(0, 1)`; the sample's cells are not decoded.
pub const STATUS_ESTIMATION_FAILED: &str = "estimation_failed";

/// Create `path` and hand a buffered writer to `f`, reporting failures as `OutputWrite`.
fn write_file<F>(path: &str, f: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let file = File::create(path).chain_err(|| ErrorKind::OutputWrite(path.to_string()))?;
    let mut out = BufWriter::new(file);
    f(&mut out)
        .and_then(|_| out.flush())
        .chain_err(|| ErrorKind::OutputWrite(path.to_string()))
}

/// The command line, quoted for a shell.
fn command_line() -> String {
    env::args()
        .map(|s| shlex::try_quote(&s).map(|q| q.to_string()).unwrap_or_else(|_| s.clone()))
        .collect::<Vec<String>>()
        .join(" ")
}

/// Write one row per cell and bin.
pub fn write_counts_to<W: Write>(
    out: &mut W,
    layout: &GenomeLayout,
    bins: &BinSet,
    cells: &[Cell],
) -> io::Result<()> {
    writeln!(out, "chrom\tstart\tend\tsample\tcell\tc\tw\tclass")?;
    for cell in cells {
        for (bin, counter) in bins.bins().iter().zip(cell.counts.iter()) {
            let label = match counter.label() {
                Some(state) => state.to_string(),
                None => NO_LABEL.to_string(),
            };
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                layout.name(bin.chrom),
                bin.start,
                bin.end,
                cell.info.sample,
                cell.info.name,
                counter.crick,
                counter.watson,
                label
            )?;
        }
    }
    Ok(())
}

pub fn write_counts(path: &str, layout: &GenomeLayout, bins: &BinSet, cells: &[Cell]) -> Result<()> {
    write_file(path, |out| write_counts_to(out, layout, bins, cells))
}

/// Write the per-cell summary, cells sorted by sample name and id.
pub fn write_cell_info_to<W: Write>(
    out: &mut W,
    cells: &[Cell],
    undecoded: &BTreeSet<usize>,
) -> io::Result<()> {
    writeln!(
        out,
        "# sscount {} on {}",
        env!("CARGO_PKG_VERSION"),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(out, "# command: {}", command_line())?;
    let legend = [
        "medbin:  Median total count (w+c) per bin",
        "mapped:  Total number of reads seen",
        "suppl:   Supplementary, secondary or QC-failed reads (filtered out)",
        "dupl:    Reads filtered out as PCR duplicates",
        "mapq:    Reads filtered out due to low mapping quality",
        "read2:   Reads filtered out as 2nd read of pair",
        "good:    Reads used for counting.",
        "status:  decoded, or undecoded if no states were assigned",
    ];
    for line in legend.iter() {
        writeln!(out, "# {}", line)?;
    }
    writeln!(out, "sample\tcell\tmedbin\tmapped\tsuppl\tdupl\tmapq\tread2\tgood\tstatus")?;

    let mut infos: Vec<&CellInfo> = cells.iter().map(|cell| &cell.info).collect();
    infos.sort_by(|a, b| (&a.sample, a.id).cmp(&(&b.sample, b.id)));
    for info in infos {
        let t = &info.tallies;
        let status = if undecoded.contains(&info.id) {
            "undecoded"
        } else {
            "decoded"
        };
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            info.sample,
            info.name,
            info.median_bin_count,
            t.mapped,
            t.supplementary,
            t.duplicate,
            t.low_mapq,
            t.read2,
            t.counted,
            status
        )?;
    }
    Ok(())
}

pub fn write_cell_info(path: &str, cells: &[Cell], undecoded: &BTreeSet<usize>) -> Result<()> {
    write_file(path, |out| write_cell_info_to(out, cells, undecoded))
}

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<String>>()
        .join(",")
}

/// Write the per-sample summary; `status` flags samples whose `p` is unusable.
pub fn write_sample_info_to<W: Write>(
    out: &mut W,
    samples: &BTreeMap<String, SampleInfo>,
) -> io::Result<()> {
    writeln!(out, "sample\tcells\tp\tmeans\tvars\tstatus")?;
    for (name, info) in samples {
        let status = match info.checked_p(name) {
            Ok(_) => STATUS_OK,
            Err(_) => STATUS_ESTIMATION_FAILED,
        };
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            name,
            info.means.len(),
            info.p,
            join(&info.means),
            join(&info.vars),
            status
        )?;
    }
    Ok(())
}

pub fn write_sample_info(path: &str, samples: &BTreeMap<String, SampleInfo>) -> Result<()> {
    write_file(path, |out| write_sample_info_to(out, samples))
}

/// Write the removed bins as BED with the reason code as fourth column.
pub fn write_removed_bins_to<W: Write>(
    out: &mut W,
    layout: &GenomeLayout,
    bins: &BinSet,
    filter: &BinFilter,
) -> io::Result<()> {
    for bad in &filter.bad {
        let bin = &bins.bins()[bad.bin];
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            layout.name(bin.chrom),
            bin.start,
            bin.end,
            bad.reason
        )?;
    }
    Ok(())
}

pub fn write_removed_bins(
    path: &str,
    layout: &GenomeLayout,
    bins: &BinSet,
    filter: &BinFilter,
) -> Result<()> {
    write_file(path, |out| write_removed_bins_to(out, layout, bins, filter))
}
