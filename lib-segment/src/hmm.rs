//! Discrete-time finite-state HMM with pluggable emissions, decoded with `bio`'s Viterbi.

use bio::stats::hmm::{viterbi, Model, State, StateIter, StateTransitionIter};
use bio::stats::LogProb;

use super::errors::*;

/// Tolerance for probability vectors summing to one.
const SUM_TOLERANCE: f64 = 1e-6;

/// Emission distribution of one state.
pub trait Emission {
    type Observation;

    /// Natural log of the likelihood of `observation`; must not be NaN.
    fn ln_likelihood(&self, observation: &Self::Observation) -> f64;
}

/// HMM with state labels `L` and emissions `E`, probabilities stored in log space.
#[derive(Clone, Debug)]
pub struct Hmm<L, E> {
    labels: Vec<L>,
    initials: Vec<LogProb>,
    transitions: Vec<Vec<LogProb>>,
    emissions: Vec<E>,
}

fn check_distribution(what: &str, probs: &[f64]) -> Result<()> {
    if probs.iter().any(|p| !(*p >= 0.0 && *p <= 1.0)) {
        bail!(ErrorKind::InvalidModel(format!(
            "{} contains values outside [0, 1]: {:?}",
            what, probs
        )));
    }
    let sum: f64 = probs.iter().sum();
    if (sum - 1.0).abs() > SUM_TOLERANCE {
        bail!(ErrorKind::InvalidModel(format!(
            "{} sums to {} instead of 1",
            what, sum
        )));
    }
    Ok(())
}

fn to_log(probs: &[f64]) -> Vec<LogProb> {
    probs.iter().map(|p| LogProb(p.ln())).collect()
}

impl<L, E> Hmm<L, E>
where
    L: Clone,
    E: Emission,
{
    /// Construct and validate.
    ///
    /// `transitions[i][j]` is the probability of going from state `i` to state `j`.
    pub fn new(
        labels: Vec<L>,
        initials: &[f64],
        transitions: &[Vec<f64>],
        emissions: Vec<E>,
    ) -> Result<Self> {
        let n = labels.len();
        if n == 0 {
            bail!(ErrorKind::InvalidModel("no states".to_string()));
        }
        if initials.len() != n || transitions.len() != n {
            bail!(ErrorKind::InvalidModel(format!(
                "{} states but {} initial probabilities and {} transition rows",
                n,
                initials.len(),
                transitions.len()
            )));
        }
        check_distribution("initial distribution", initials)?;
        for (i, row) in transitions.iter().enumerate() {
            if row.len() != n {
                bail!(ErrorKind::InvalidModel(format!(
                    "transition row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            check_distribution(&format!("transition row {}", i), row)?;
        }

        let mut result = Hmm {
            labels,
            initials: to_log(initials),
            transitions: transitions.iter().map(|row| to_log(row)).collect(),
            emissions: Vec::new(),
        };
        result.set_emissions(emissions)?;
        Ok(result)
    }

    /// Replace the emissions, one per state.
    pub fn set_emissions(&mut self, emissions: Vec<E>) -> Result<()> {
        if emissions.len() != self.labels.len() {
            bail!(ErrorKind::InvalidModel(format!(
                "{} emissions for {} states",
                emissions.len(),
                self.labels.len()
            )));
        }
        self.emissions = emissions;
        Ok(())
    }

    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    /// Most likely state labels for `observations`.
    pub fn decode(&self, observations: &[E::Observation]) -> Vec<L> {
        if observations.is_empty() {
            return Vec::new();
        }
        let (path, _) = viterbi(self, observations);
        path.iter().map(|state| self.labels[state.0].clone()).collect()
    }
}

impl<L, E> Model<E::Observation> for Hmm<L, E>
where
    E: Emission,
{
    fn num_states(&self) -> usize {
        self.labels.len()
    }

    fn states(&self) -> StateIter {
        StateIter::new(self.num_states())
    }

    fn transitions(&self) -> StateTransitionIter {
        StateTransitionIter::new(self.num_states())
    }

    fn transition_prob(&self, from: State, to: State) -> LogProb {
        self.transitions[from.0][to.0]
    }

    fn initial_prob(&self, state: State) -> LogProb {
        self.initials[state.0]
    }

    fn observation_prob(&self, state: State, observation: &E::Observation) -> LogProb {
        LogProb(self.emissions[state.0].ln_likelihood(observation))
    }
}
