//! Options for `sscount`.

use std::fmt::Display;
use std::str::FromStr;

use clap::ArgMatches;

use lib_binning::BinningMode;
use lib_segment::StrandModelConfig;
use lib_shared::errors::*;

/// Default width of fixed bins.
pub const DEFAULT_WINDOW: usize = 1_000_000;

/// Default minimal MAPQ.
pub const DEFAULT_MIN_MAPQ: u8 = 10;

/// Default count table path.
pub const DEFAULT_OUTPUT: &str = "out.txt";

/// Options for counting and classification.
#[derive(Clone, Debug)]
pub struct ClassifyOptions {
    // I/O related
    /// Paths to the alignment files, one per cell.
    pub inputs: Vec<String>,
    /// Path to the count table.
    pub output: String,
    /// Optional path to the per-cell summary.
    pub cell_info: Option<String>,
    /// Optional path to the per-sample summary.
    pub sample_info: Option<String>,
    /// Optional path to the BED file of removed bins.
    pub removed_bins: Option<String>,

    // Counting-related
    /// Minimal MAPQ of a read to count.
    pub min_mapq: u8,
    /// How to build the bins.
    pub binning: BinningMode,

    // Model
    pub model: StrandModelConfig,
    /// Number of threads for decoding, 0 for rayon's default.
    pub threads: usize,
}

/// Parse value of argument `name`, if given.
fn parse_arg<T>(matches: &ArgMatches, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match matches.value_of(name) {
        Some(s) => s.parse::<T>().map(Some).map_err(|e| {
            Error::from(ErrorKind::Config(format!(
                "invalid value {:?} for {}: {}",
                s, name, e
            )))
        }),
        None => Ok(None),
    }
}

fn path_arg(matches: &ArgMatches, name: &str) -> Option<String> {
    matches.value_of(name).map(|s| s.to_string())
}

impl ClassifyOptions {
    /// Build options from ArgMatches, rejecting conflicting or invalid values.
    pub fn new(matches: &ArgMatches) -> Result<Self> {
        let binning = match (
            matches.value_of("bins"),
            parse_arg::<usize>(matches, "window")?,
        ) {
            (Some(_), Some(_)) => bail!(ErrorKind::Config(
                "--window and --bins are mutually exclusive".to_string()
            )),
            (Some(_), None) if matches.is_present("exclude") => bail!(ErrorKind::Config(
                "--exclude can only be used with fixed-width bins, not with --bins".to_string()
            )),
            (Some(path), None) => BinningMode::Variable {
                path: path.to_string(),
            },
            (None, window) => BinningMode::Fixed {
                window: window.unwrap_or(DEFAULT_WINDOW),
                exclude: path_arg(matches, "exclude"),
            },
        };
        if let BinningMode::Fixed { window: 0, .. } = binning {
            bail!(ErrorKind::Config("--window must be positive".to_string()));
        }

        let defaults = StrandModelConfig::default();
        let model = StrandModelConfig {
            expected_transitions: parse_arg(matches, "expected_transitions")?
                .unwrap_or(defaults.expected_transitions),
            zero_mean: parse_arg(matches, "zero_mean")?.unwrap_or(defaults.zero_mean),
        };
        if !(model.expected_transitions > 0.0) {
            bail!(ErrorKind::Config(
                "--expected-transitions must be positive".to_string()
            ));
        }
        if !(model.zero_mean > 0.0) {
            bail!(ErrorKind::Config("--zero-mean must be positive".to_string()));
        }

        let inputs: Vec<String> = match matches.values_of("input") {
            Some(values) => values.map(|s| s.to_string()).collect(),
            None => Vec::new(),
        };
        if inputs.is_empty() {
            bail!(ErrorKind::Config("no input files given".to_string()));
        }

        Ok(ClassifyOptions {
            inputs,
            output: path_arg(matches, "out").unwrap_or_else(|| DEFAULT_OUTPUT.to_string()),
            cell_info: path_arg(matches, "info"),
            sample_info: path_arg(matches, "sample_info"),
            removed_bins: path_arg(matches, "removed_bins"),

            min_mapq: parse_arg(matches, "mapq")?.unwrap_or(DEFAULT_MIN_MAPQ),
            binning,

            model,
            threads: parse_arg(matches, "threads")?.unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::App;

    fn parse(args: &[&str]) -> Result<ClassifyOptions> {
        let yaml = load_yaml!("../../sscount/src/cli.yaml");
        let mut argv = vec!["sscount"];
        argv.extend_from_slice(args);
        let matches = App::from_yaml(yaml).get_matches_from_safe(argv).unwrap();
        ClassifyOptions::new(&matches)
    }

    fn is_config_error(result: Result<ClassifyOptions>) -> bool {
        match result {
            Err(Error(ErrorKind::Config(_), _)) => true,
            _ => false,
        }
    }

    #[test]
    fn test_defaults() {
        let options = parse(&["a.bam", "b.bam"]).unwrap();
        assert_eq!(vec!["a.bam".to_string(), "b.bam".to_string()], options.inputs);
        assert_eq!("out.txt", options.output);
        assert_eq!(10, options.min_mapq);
        assert_eq!(
            BinningMode::Fixed {
                window: 1_000_000,
                exclude: None
            },
            options.binning
        );
        assert_eq!(StrandModelConfig::default(), options.model);
        assert_eq!(0, options.threads);
        assert_eq!(None, options.cell_info);
    }

    #[test]
    fn test_all_options() {
        let options = parse(&[
            "-q", "20", "-w", "200000", "-x", "excl.bed", "-o", "counts.tsv", "-i", "info.tsv",
            "-S", "samples.tsv", "-R", "removed.bed", "--expected-transitions", "4",
            "--zero-mean", "0.25", "-t", "2", "a.bam",
        ])
        .unwrap();
        assert_eq!(20, options.min_mapq);
        assert_eq!(
            BinningMode::Fixed {
                window: 200_000,
                exclude: Some("excl.bed".to_string())
            },
            options.binning
        );
        assert_eq!("counts.tsv", options.output);
        assert_eq!(Some("info.tsv".to_string()), options.cell_info);
        assert_eq!(Some("samples.tsv".to_string()), options.sample_info);
        assert_eq!(Some("removed.bed".to_string()), options.removed_bins);
        assert_eq!(4.0, options.model.expected_transitions);
        assert_eq!(0.25, options.model.zero_mean);
        assert_eq!(2, options.threads);
    }

    #[test]
    fn test_variable_bins() {
        let options = parse(&["-b", "bins.bed", "a.bam"]).unwrap();
        assert_eq!(
            BinningMode::Variable {
                path: "bins.bed".to_string()
            },
            options.binning
        );
    }

    #[test]
    fn test_conflicts_and_invalid_values() {
        assert!(is_config_error(parse(&["-b", "bins.bed", "-w", "100", "a.bam"])));
        assert!(is_config_error(parse(&["-b", "bins.bed", "-x", "x.bed", "a.bam"])));
        assert!(is_config_error(parse(&["-w", "0", "a.bam"])));
        assert!(is_config_error(parse(&["-w", "lots", "a.bam"])));
        assert!(is_config_error(parse(&["-q", "300", "a.bam"])));
        assert!(is_config_error(parse(&["--zero-mean", "0", "a.bam"])));
    }
}
