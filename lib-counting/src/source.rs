//! Interface to the alignment file reader.
//!
//! The counting code only sees classified read events; how they are produced from an alignment
//! file is up to the implementation (see `bam::BamSource`).

use lib_shared::errors::*;
use lib_shared::regions::GenomeLayout;
use lib_shared::strand::Strand;

/// Outcome of looking at one mapped alignment record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadEvent {
    /// Record passed all filters and is counted at its leftmost position.
    Counted {
        chrom: usize,
        pos: usize,
        strand: Strand,
    },
    /// Mapping quality below threshold.
    LowMapq,
    /// PCR or optical duplicate.
    Duplicate,
    /// Supplementary, secondary, or QC-failed.
    Supplementary,
    /// Second read of a pair.
    Read2,
}

/// Opens alignment files.
pub trait AlignmentSource {
    type Handle: AlignmentHandle;

    /// Open the file at `path`, failing with `ErrorKind::Open`.
    fn open(&self, path: &str) -> Result<Self::Handle>;
}

/// An opened alignment file; the file is closed when the handle is dropped.
pub trait AlignmentHandle {
    /// The sequence dictionary of the file.
    fn layout(&self) -> Result<GenomeLayout>;

    /// The single sample name of the file, failing with `ErrorKind::MissingSampleTag`.
    fn sample_name(&self) -> Result<String>;

    /// Lazily classified events of all mapped records.
    fn events<'a>(&'a mut self) -> Box<dyn Iterator<Item = Result<ReadEvent>> + 'a>;
}
