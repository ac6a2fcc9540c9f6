//! Counting of Watson and Crick reads per cell and bin.

#[macro_use]
extern crate error_chain;

extern crate separator;
use separator::Separatable;

#[macro_use]
extern crate slog;
use slog::Logger;

extern crate rust_htslib;

extern crate lib_binning;
extern crate lib_shared;

use std::path::Path;

use lib_binning::BinSet;
use lib_shared::errors::*;
use lib_shared::regions::GenomeLayout;
use lib_shared::stats::Stats;
use lib_shared::strand::{Strand, StrandState};

pub mod bam;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
mod source;
pub use source::*;

/// Read counts of one cell in one bin, plus the decoded strand state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Counter {
    pub watson: u32,
    pub crick: u32,
    label: Option<StrandState>,
}

impl Counter {
    pub fn new(watson: u32, crick: u32) -> Self {
        Counter {
            watson,
            crick,
            label: None,
        }
    }

    /// Watson plus Crick count.
    pub fn total(&self) -> u32 {
        self.watson + self.crick
    }

    /// Decoded state; `None` for filtered bins and undecoded cells.
    pub fn label(&self) -> Option<StrandState> {
        self.label
    }

    /// Set the decoded state; labels are written once.
    pub fn set_label(&mut self, state: StrandState) {
        debug_assert!(self.label.is_none(), "label written twice");
        self.label = Some(state);
    }
}

/// What happened to the records of one input file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventTallies {
    /// All mapped records seen.
    pub mapped: u64,
    /// Supplementary, secondary or QC-failed records.
    pub supplementary: u64,
    /// Duplicates.
    pub duplicate: u64,
    /// Records below the MAPQ threshold.
    pub low_mapq: u64,
    /// Second reads of pairs.
    pub read2: u64,
    /// Records counted in a bin.
    pub counted: u64,
}

/// Per-cell information.
#[derive(Clone, Debug, PartialEq)]
pub struct CellInfo {
    /// Position of the input file on the command line.
    pub id: usize,
    /// Cell name, the input file name without extension.
    pub name: String,
    /// Path to the input file.
    pub path: String,
    /// Sample name from the SM tag.
    pub sample: String,
    /// Median of Watson plus Crick over all bins.
    pub median_bin_count: f64,
    pub tallies: EventTallies,
}

/// One cell owning its counters, aligned with the bins.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub info: CellInfo,
    pub counts: Vec<Counter>,
}

/// An input file that passed the header pre-scan.
#[derive(Clone, Debug, PartialEq)]
pub struct InputFile {
    pub id: usize,
    pub path: String,
    pub sample: String,
}

/// Cell name for the file at `path`.
pub fn cell_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

/// Open every input once, reading its sample name; the first file defines the genome layout.
///
/// Any failure here is fatal.
pub fn scan_headers<S: AlignmentSource>(
    logger: &mut Logger,
    source: &S,
    paths: &[String],
) -> Result<(GenomeLayout, Vec<InputFile>)> {
    info!(logger, "Exploring headers of {} input files...", paths.len());
    if paths.is_empty() {
        bail!(ErrorKind::Config("no input files given".to_string()));
    }

    let mut layout: Option<GenomeLayout> = None;
    let mut inputs = Vec::with_capacity(paths.len());
    for (id, path) in paths.iter().enumerate() {
        let handle = source.open(path)?;
        let sample = handle.sample_name()?;
        let this_layout = handle.layout()?;
        match layout {
            None => layout = Some(this_layout),
            Some(ref layout) => {
                if *layout != this_layout {
                    bail!(ErrorKind::Config(format!(
                        "sequence dictionary of {} differs from the one of {}",
                        path, paths[0]
                    )));
                }
            }
        }
        debug!(logger, "{} => sample {}", path, sample);
        inputs.push(InputFile {
            id,
            path: path.clone(),
            sample,
        });
    }

    let layout = layout.ok_or_else(|| Error::from("no sequence dictionary read"))?;
    Ok((layout, inputs))
}

/// Count the events of `input` into a fresh cell.
pub fn count_cell<S: AlignmentSource>(source: &S, input: &InputFile, bins: &BinSet) -> Result<Cell> {
    let mut handle = source.open(&input.path)?;
    let sample = handle.sample_name()?;

    let mut counts = vec![Counter::default(); bins.len()];
    let mut tallies = EventTallies::default();
    for event in handle.events() {
        let event = event?;
        tallies.mapped += 1;
        match event {
            ReadEvent::Counted { chrom, pos, strand } => {
                if let Some(bin) = bins.find_bin(chrom, pos) {
                    match strand {
                        Strand::Watson => counts[bin].watson += 1,
                        Strand::Crick => counts[bin].crick += 1,
                    }
                    tallies.counted += 1;
                }
            }
            ReadEvent::LowMapq => tallies.low_mapq += 1,
            ReadEvent::Duplicate => tallies.duplicate += 1,
            ReadEvent::Supplementary => tallies.supplementary += 1,
            ReadEvent::Read2 => tallies.read2 += 1,
        }
    }

    let totals: Vec<f64> = counts.iter().map(|c| c.total() as f64).collect();
    Ok(Cell {
        info: CellInfo {
            id: input.id,
            name: cell_name(&input.path),
            path: input.path.clone(),
            sample,
            median_bin_count: totals.as_slice().median(),
            tallies,
        },
        counts,
    })
}

/// Count all inputs one after another.
///
/// Inputs that cannot be opened or read are dropped with a warning; they never show up in the
/// result.
pub fn count_cells<S: AlignmentSource>(
    logger: &mut Logger,
    source: &S,
    inputs: &[InputFile],
    bins: &BinSet,
) -> Vec<Cell> {
    info!(logger, "Reading {} alignment files...", inputs.len());
    let mut cells = Vec::with_capacity(inputs.len());
    for input in inputs {
        match count_cell(source, input, bins) {
            Ok(cell) => {
                debug!(
                    logger,
                    "{}: {} of {} reads counted, median bin count {}",
                    cell.info.name,
                    cell.info.tallies.counted.separated_string(),
                    cell.info.tallies.mapped.separated_string(),
                    cell.info.median_bin_count
                );
                cells.push(cell);
            }
            Err(e) => {
                warn!(logger, "Ignoring cell {}: {}", input.path, e);
                for e in e.iter().skip(1) {
                    warn!(logger, "caused by: {}", e);
                }
            }
        }
    }
    info!(logger, "Counted {} of {} cells", cells.len(), inputs.len());
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::Discard;

    use lib_shared::regions::GenomeRegions;

    use memory::{MemoryFile, MemorySource};

    fn counted(chrom: usize, pos: usize, strand: Strand) -> ReadEvent {
        ReadEvent::Counted { chrom, pos, strand }
    }

    fn setup() -> (MemorySource, BinSet) {
        let layout = GenomeLayout::from_name_and_length(&[
            ("chr1".to_string(), 300),
            ("chr2".to_string(), 200),
        ]);
        let exclude = GenomeRegions {
            regions: vec![(1, 150, 160)],
        };
        let bins = BinSet::fixed(&layout, 100, &exclude).unwrap();

        let mut source = MemorySource::new(layout);
        source.insert(
            "/data/cell_a.bam",
            MemoryFile::new(
                "S1",
                vec![
                    counted(0, 0, Strand::Watson),
                    counted(0, 99, Strand::Crick),
                    counted(0, 100, Strand::Crick),
                    counted(0, 250, Strand::Watson),
                    counted(0, 251, Strand::Watson),
                    counted(1, 10, Strand::Crick),
                    counted(1, 155, Strand::Crick),
                    ReadEvent::LowMapq,
                    ReadEvent::Duplicate,
                    ReadEvent::Duplicate,
                    ReadEvent::Supplementary,
                    ReadEvent::Read2,
                ],
            ),
        );
        source.insert(
            "/data/cell_b.bam",
            MemoryFile {
                samples: vec![],
                events: vec![counted(0, 0, Strand::Watson)],
                truncated: false,
            },
        );
        source.insert(
            "/data/cell_c.bam",
            MemoryFile {
                samples: vec!["S1".to_string()],
                events: vec![counted(0, 0, Strand::Watson)],
                truncated: true,
            },
        );
        (source, bins)
    }

    fn input(id: usize, path: &str) -> InputFile {
        InputFile {
            id,
            path: path.to_string(),
            sample: "S1".to_string(),
        }
    }

    #[test]
    fn test_count_cell() {
        let (source, bins) = setup();
        assert_eq!(4, bins.len());

        let cell = count_cell(&source, &input(0, "/data/cell_a.bam"), &bins).unwrap();
        assert_eq!("cell_a", cell.info.name);
        assert_eq!("S1", cell.info.sample);
        let counts: Vec<(u32, u32)> = cell.counts.iter().map(|c| (c.watson, c.crick)).collect();
        assert_eq!(vec![(1, 1), (0, 1), (2, 0), (0, 1)], counts);
        assert_eq!(
            EventTallies {
                mapped: 12,
                supplementary: 1,
                duplicate: 2,
                low_mapq: 1,
                read2: 1,
                counted: 6,
            },
            cell.info.tallies
        );
        // totals 2, 1, 2, 1
        assert_eq!(1.5, cell.info.median_bin_count);
        assert!(cell.counts.iter().all(|c| c.label().is_none()));
    }

    #[test]
    fn test_count_cells_drops_unreadable() {
        let (source, bins) = setup();
        let mut logger = Logger::root(Discard, o!());
        let inputs = vec![
            input(0, "/data/cell_a.bam"),
            input(1, "/data/missing.bam"),
            input(2, "/data/cell_b.bam"),
            input(3, "/data/cell_c.bam"),
        ];
        let cells = count_cells(&mut logger, &source, &inputs, &bins);
        assert_eq!(1, cells.len());
        assert_eq!(0, cells[0].info.id);
    }

    #[test]
    fn test_scan_headers() {
        let (source, _) = setup();
        let mut logger = Logger::root(Discard, o!());
        let (layout, inputs) =
            scan_headers(&mut logger, &source, &["/data/cell_a.bam".to_string()]).unwrap();
        assert_eq!(2, layout.len());
        assert_eq!(vec![input(0, "/data/cell_a.bam")], inputs);

        let paths = vec!["/data/cell_a.bam".to_string(), "/data/cell_b.bam".to_string()];
        match scan_headers(&mut logger, &source, &paths) {
            Err(Error(ErrorKind::MissingSampleTag(ref path, 0), _)) => {
                assert_eq!("/data/cell_b.bam", path)
            }
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
        match scan_headers(&mut logger, &source, &["/nope.bam".to_string()]) {
            Err(Error(ErrorKind::Open(_), _)) => (),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_counter_label() {
        let mut counter = Counter::new(3, 4);
        assert_eq!(7, counter.total());
        counter.set_label(StrandState::WC);
        assert_eq!(Some(StrandState::WC), counter.label());
    }

    #[test]
    fn test_cell_name() {
        assert_eq!("cell_a", cell_name("/data/cell_a.bam"));
        assert_eq!("x.sorted", cell_name("x.sorted.bam"));
    }
}
