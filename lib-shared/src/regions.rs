//! Helper code for handling genome layouts and genomic regions.
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use slog::Logger;

use crate::errors::*;

/// Chromosome names and lengths, in the order of the alignment file header.
///
/// Built once at startup and passed explicitly to everything that needs to translate between
/// chromosome ids and names.
#[derive(Debug, Clone, PartialEq)]
pub struct GenomeLayout {
    names: Vec<String>,
    lengths: Vec<usize>,
    ids: HashMap<String, usize>,
}

impl GenomeLayout {
    /// Construct from list of names and lengths.
    pub fn from_name_and_length(pairs: &[(String, usize)]) -> Self {
        GenomeLayout {
            names: pairs.iter().map(|(name, _)| name.clone()).collect(),
            lengths: pairs.iter().map(|(_, len)| *len).collect(),
            ids: pairs
                .iter()
                .enumerate()
                .map(|(id, (name, _))| (name.clone(), id))
                .collect(),
        }
    }

    /// Number of chromosomes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, id: usize) -> &str {
        &self.names[id]
    }

    pub fn length(&self, id: usize) -> usize {
        self.lengths[id]
    }

    /// Translate chromosome name to id.
    pub fn id(&self, name: &str) -> Option<usize> {
        self.ids.get(name).cloned()
    }

    /// Iterate `(id, name, length)` in header order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, usize)> {
        self.names
            .iter()
            .zip(self.lengths.iter())
            .enumerate()
            .map(|(id, (name, len))| (id, name.as_str(), *len))
    }
}

/// Flavor of BED-like input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BedFlavor {
    /// Lines consisting of only a chromosome name cover the whole chromosome.
    pub allow_whole_contig: bool,
    /// Records on contigs missing from the layout are skipped with a warning instead of rejected.
    pub skip_unknown_contigs: bool,
}

/// Exclusion lists: `chrom` or `chrom start end`, foreign contigs are skipped.
pub const EXCLUDE_BED: BedFlavor = BedFlavor {
    allow_whole_contig: true,
    skip_unknown_contigs: true,
};

/// Variable-width bin lists: strict BED3.
pub const BINS_BED: BedFlavor = BedFlavor {
    allow_whole_contig: false,
    skip_unknown_contigs: false,
};

/// Representation of a list of genomic regions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenomeRegions {
    /// The region specification as (chromosome id, start, end), 0-based half-open.
    pub regions: Vec<(usize, usize, usize)>,
}

impl GenomeRegions {
    /// Create empty one.
    pub fn new() -> Self {
        GenomeRegions {
            regions: Vec::new(),
        }
    }

    /// Load from BED file at `path`.
    pub fn from_bed_path<P: AsRef<Path>>(
        path: P,
        layout: &GenomeLayout,
        flavor: BedFlavor,
        logger: &Logger,
    ) -> Result<Self> {
        let label = path.as_ref().display().to_string();
        let file = File::open(path.as_ref()).chain_err(|| {
            ErrorKind::Config(format!("could not open interval file {}", &label))
        })?;
        Self::from_bed_reader(BufReader::new(file), &label, layout, flavor, logger)
    }

    /// Parse BED-like records from `reader`; `label` names the source in messages.
    pub fn from_bed_reader<R: BufRead>(
        reader: R,
        label: &str,
        layout: &GenomeLayout,
        flavor: BedFlavor,
        logger: &Logger,
    ) -> Result<Self> {
        let mut regions = Vec::new();
        let mut skipped: Vec<String> = Vec::new();

        for (no, line) in reader.lines().enumerate() {
            let line = line.chain_err(|| format!("problem reading {}", label))?;
            let line = line.trim_end();
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with("track")
                || line.starts_with("browser")
            {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            let chrom = fields[0];
            let id = match layout.id(chrom) {
                Some(id) => id,
                None if flavor.skip_unknown_contigs => {
                    if !skipped.iter().any(|s| s == chrom) {
                        skipped.push(chrom.to_string());
                    }
                    continue;
                }
                None => bail!(ErrorKind::Config(format!(
                    "{}:{}: chromosome {} is not in the alignment header",
                    label,
                    no + 1,
                    chrom
                ))),
            };
            let chrom_len = layout.length(id);

            let (start, end) = match fields.len() {
                1 if flavor.allow_whole_contig => (0, chrom_len),
                n if n >= 3 => (
                    parse_coord(fields[1], label, no + 1)?,
                    parse_coord(fields[2], label, no + 1)?,
                ),
                _ => bail!(ErrorKind::Config(format!(
                    "{}:{}: expected at least 3 columns",
                    label,
                    no + 1
                ))),
            };
            if start > end || end > chrom_len {
                bail!(ErrorKind::Config(format!(
                    "{}:{}: interval {}:{}-{} is invalid for a chromosome of length {}",
                    label,
                    no + 1,
                    chrom,
                    start,
                    end,
                    chrom_len
                )));
            }
            regions.push((id, start, end));
        }

        for chrom in &skipped {
            warn!(
                logger,
                "Ignoring intervals on {} in {}: chromosome is not in the alignment header",
                chrom,
                label
            );
        }

        Ok(GenomeRegions { regions })
    }

    /// Sort by position and merge overlapping or adjacent regions.
    pub fn sort_and_merge(&mut self) {
        self.regions.sort();
        let mut merged: Vec<(usize, usize, usize)> = Vec::with_capacity(self.regions.len());
        for &(chrom, start, end) in &self.regions {
            match merged.last_mut() {
                Some(last) if last.0 == chrom && start <= last.2 => {
                    if end > last.2 {
                        last.2 = end;
                    }
                }
                _ => merged.push((chrom, start, end)),
            }
        }
        self.regions = merged;
    }
}

fn parse_coord(s: &str, label: &str, line_no: usize) -> Result<usize> {
    s.parse::<usize>().chain_err(|| {
        ErrorKind::Config(format!(
            "{}:{}: could not parse coordinate {:?}",
            label, line_no, s
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::Discard;

    fn layout() -> GenomeLayout {
        GenomeLayout::from_name_and_length(&[
            ("chr1".to_string(), 1000),
            ("chr2".to_string(), 500),
        ])
    }

    fn logger() -> Logger {
        Logger::root(Discard, o!())
    }

    #[test]
    fn test_layout_lookup() {
        let layout = layout();
        assert_eq!(2, layout.len());
        assert_eq!(Some(1), layout.id("chr2"));
        assert_eq!(None, layout.id("chrX"));
        assert_eq!("chr1", layout.name(0));
        assert_eq!(500, layout.length(1));
        let ids: Vec<usize> = layout.iter().map(|(id, _, _)| id).collect();
        assert_eq!(vec![0, 1], ids);
    }

    #[test]
    fn test_exclude_flavor() {
        let text = "# comment\nchr2\t10\t20\nchrUn\t0\t5\n\nchr1\n";
        let regions =
            GenomeRegions::from_bed_reader(text.as_bytes(), "x.bed", &layout(), EXCLUDE_BED, &logger())
                .unwrap();
        assert_eq!(vec![(1, 10, 20), (0, 0, 1000)], regions.regions);
    }

    #[test]
    fn test_bins_flavor_rejects_unknown_contig() {
        let text = "chr1\t0\t100\nchrUn\t0\t5\n";
        let err =
            GenomeRegions::from_bed_reader(text.as_bytes(), "b.bed", &layout(), BINS_BED, &logger())
                .unwrap_err();
        match *err.kind() {
            ErrorKind::Config(ref msg) => assert!(msg.contains("chrUn")),
            ref kind => panic!("unexpected error {:?}", kind),
        }
    }

    #[test]
    fn test_malformed_and_out_of_range() {
        for text in &["chr1\t0\n", "chr1\tzero\t10\n", "chr1\t20\t10\n", "chr2\t0\t501\n", "chr1\n"]
        {
            let res = GenomeRegions::from_bed_reader(
                text.as_bytes(),
                "b.bed",
                &layout(),
                BINS_BED,
                &logger(),
            );
            match res {
                Err(Error(ErrorKind::Config(_), _)) => (),
                other => panic!("expected config error for {:?}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_sort_and_merge() {
        let mut regions = GenomeRegions {
            regions: vec![(1, 5, 10), (0, 50, 60), (0, 10, 20), (0, 15, 30), (0, 30, 40)],
        };
        regions.sort_and_merge();
        assert_eq!(vec![(0, 10, 40), (0, 50, 60), (1, 5, 10)], regions.regions);
    }
}
