//! `AlignmentSource` reading BAM/SAM/CRAM files through htslib.

use rust_htslib::bam::{self, Read};

use lib_shared::bam_utils;
use lib_shared::errors::*;
use lib_shared::regions::GenomeLayout;
use lib_shared::strand::Strand;

use super::source::{AlignmentHandle, AlignmentSource, ReadEvent};

/// Opens alignment files with `rust_htslib`, classifying records against `min_mapq`.
#[derive(Clone, Debug)]
pub struct BamSource {
    /// Minimal MAPQ of a read to count.
    pub min_mapq: u8,
}

impl BamSource {
    pub fn new(min_mapq: u8) -> Self {
        BamSource { min_mapq }
    }
}

/// An open BAM file.
pub struct BamHandle {
    path: String,
    reader: bam::Reader,
    min_mapq: u8,
}

impl AlignmentSource for BamSource {
    type Handle = BamHandle;

    fn open(&self, path: &str) -> Result<BamHandle> {
        let reader =
            bam::Reader::from_path(path).chain_err(|| ErrorKind::Open(path.to_string()))?;
        Ok(BamHandle {
            path: path.to_string(),
            reader,
            min_mapq: self.min_mapq,
        })
    }
}

impl AlignmentHandle for BamHandle {
    fn layout(&self) -> Result<GenomeLayout> {
        bam_utils::build_layout_bam(self.reader.header())
            .chain_err(|| format!("Problem getting contig-length list from {}", self.path))
    }

    fn sample_name(&self) -> Result<String> {
        bam_utils::sample_from_header(&self.path, self.reader.header().as_bytes())
    }

    fn events<'a>(&'a mut self) -> Box<dyn Iterator<Item = Result<ReadEvent>> + 'a> {
        let min_mapq = self.min_mapq;
        let path = self.path.clone();
        Box::new(
            self.reader
                .records()
                .filter_map(move |record| match record {
                    Ok(record) => classify_record(&record, min_mapq).map(Ok),
                    Err(e) => Some(Err(Error::with_chain(
                        e,
                        format!("Problem reading record from {}", path),
                    ))),
                }),
        )
    }
}

/// Classify `record`; unmapped records yield `None`.
///
/// The first matching rule wins: secondary/QC-failed/supplementary, duplicate, low MAPQ, second
/// read of pair.  Reverse-strand reads are Watson reads, forward-strand reads Crick reads.
pub fn classify_record(record: &bam::Record, min_mapq: u8) -> Option<ReadEvent> {
    if record.is_unmapped() || record.tid() < 0 || record.pos() < 0 {
        return None;
    }

    Some(
        if record.is_secondary() || record.is_quality_check_failed() || record.is_supplementary()
        {
            ReadEvent::Supplementary
        } else if record.is_duplicate() {
            ReadEvent::Duplicate
        } else if record.mapq() < min_mapq {
            ReadEvent::LowMapq
        } else if record.is_last_in_template() {
            ReadEvent::Read2
        } else {
            ReadEvent::Counted {
                chrom: record.tid() as usize,
                pos: record.pos() as usize,
                strand: if record.is_reverse() {
                    Strand::Watson
                } else {
                    Strand::Crick
                },
            }
        },
    )
}
