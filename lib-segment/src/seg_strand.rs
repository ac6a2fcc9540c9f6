//! Decoding of strand states CC, WC and WW per cell and chromosome.

use slog::Logger;

use lib_counting::Cell;
use lib_filter::GoodBins;
use lib_shared::strand::StrandState;

use super::dists::{MultiVariate, NegativeBinomial};
use super::errors::*;
use super::hmm::Hmm;

/// Upper bound for the probability of switching to one particular other state.
pub const MAX_TRANSITION_PROB: f64 = 1.0 / 3.0;

/// Tuning of the strand-state model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrandModelConfig {
    /// Expected number of state changes over the whole genome of one cell.
    pub expected_transitions: f64,
    /// NB shape parameter of a channel without template strand.
    pub zero_mean: f64,
}

impl Default for StrandModelConfig {
    fn default() -> Self {
        StrandModelConfig {
            expected_transitions: 10.0,
            zero_mean: 0.5,
        }
    }
}

/// HMM over (Crick, Watson) count observations.
pub type StrandHmm = Hmm<StrandState, MultiVariate<NegativeBinomial>>;

/// Shared, read-only parameters for decoding all cells.
#[derive(Clone, Debug, PartialEq)]
pub struct StrandModel {
    config: StrandModelConfig,
    p_trans: f64,
}

impl StrandModel {
    /// Set up the model for a genome of `num_bins` bins.
    pub fn new(logger: &Logger, config: StrandModelConfig, num_bins: usize) -> Result<Self> {
        if !(config.expected_transitions > 0.0 && config.expected_transitions.is_finite()) {
            bail!(ErrorKind::InvalidModel(format!(
                "expected number of transitions must be positive, is {}",
                config.expected_transitions
            )));
        }
        if !(config.zero_mean > 0.0 && config.zero_mean.is_finite()) {
            bail!(ErrorKind::InvalidModel(format!(
                "zero-channel mean must be positive, is {}",
                config.zero_mean
            )));
        }
        if num_bins == 0 {
            bail!(ErrorKind::InvalidModel("no bins".to_string()));
        }

        let mut p_trans = config.expected_transitions / num_bins as f64;
        if p_trans > MAX_TRANSITION_PROB {
            warn!(
                logger,
                "{} expected transitions in only {} bins, limiting transition probability to {}",
                config.expected_transitions,
                num_bins,
                MAX_TRANSITION_PROB
            );
            p_trans = MAX_TRANSITION_PROB;
        }
        debug!(logger, "Transition probability is {}", p_trans);

        Ok(StrandModel { config, p_trans })
    }

    pub fn config(&self) -> &StrandModelConfig {
        &self.config
    }

    /// Probability of switching from one state to a particular other one.
    pub fn p_trans(&self) -> f64 {
        self.p_trans
    }

    pub fn transition_matrix(&self) -> Vec<Vec<f64>> {
        let p = self.p_trans;
        vec![
            vec![1.0 - 2.0 * p, p, p],
            vec![p, 1.0 - 2.0 * p, p],
            vec![p, p, 1.0 - 2.0 * p],
        ]
    }

    /// Emissions in state order CC, WC, WW for a cell with the given median bin count.
    ///
    /// With `n = median / 2 · p / (1 - p)` a WC channel has mean `median / 2`; a state's channel
    /// carrying both homologs uses `2n`, an empty channel the configured zero mean.
    pub fn emissions(
        &self,
        p: f64,
        median_bin_count: f64,
    ) -> Result<Vec<MultiVariate<NegativeBinomial>>> {
        let n = median_bin_count / 2.0 * p / (1.0 - p);
        let z = self.config.zero_mean;
        let nb = |r: f64| NegativeBinomial::new(p, r);
        Ok(vec![
            MultiVariate::new(vec![nb(2.0 * n)?, nb(z)?]),
            MultiVariate::new(vec![nb(n)?, nb(n)?]),
            MultiVariate::new(vec![nb(z)?, nb(2.0 * n)?]),
        ])
    }

    /// The HMM for one cell.
    pub fn build_hmm(&self, p: f64, median_bin_count: f64) -> Result<StrandHmm> {
        let n = StrandState::ALL.len();
        Hmm::new(
            StrandState::ALL.to_vec(),
            &vec![1.0 / n as f64; n],
            &self.transition_matrix(),
            self.emissions(p, median_bin_count)?,
        )
    }

    /// Decode `cell` chromosome by chromosome over the good bins and label its counters.
    ///
    /// On error no label is set.
    pub fn decode_cell(&self, cell: &mut Cell, good: &GoodBins, p: f64) -> Result<()> {
        let hmm = self
            .build_hmm(p, cell.info.median_bin_count)
            .chain_err(|| format!("could not set up HMM for cell {}", cell.info.name))?;

        for chrom in 0..good.num_chroms() {
            let bins = good.chrom_bins(chrom);
            let observations: Vec<Vec<u32>> = bins
                .iter()
                .map(|&bin| vec![cell.counts[bin].crick, cell.counts[bin].watson])
                .collect();
            let path = hmm.decode(&observations);
            for (&bin, state) in bins.iter().zip(path.into_iter()) {
                cell.counts[bin].set_label(state);
            }
        }

        Ok(())
    }
}
