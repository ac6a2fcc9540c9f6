//! Emission distributions for read counts.

use statrs::distribution::{self, Discrete};

use super::errors::*;
use super::hmm::Emission;

/// Negative binomial distribution `NB(p, r)` with pmf `Γ(k+r)/(k!Γ(r)) p^r (1-p)^k`.
#[derive(Clone, Debug)]
pub struct NegativeBinomial {
    p: f64,
    r: f64,
    dist: distribution::NegativeBinomial,
}

impl NegativeBinomial {
    /// Requires `0 < p < 1` and finite `r > 0`.
    pub fn new(p: f64, r: f64) -> Result<Self> {
        if !(p > 0.0 && p < 1.0) || !(r > 0.0 && r.is_finite()) {
            bail!(ErrorKind::InvalidModel(format!(
                "invalid negative binomial parameters p = {}, r = {}",
                p, r
            )));
        }
        let dist = distribution::NegativeBinomial::new(r, p)
            .map_err(|e| Error::from(ErrorKind::InvalidModel(e.to_string())))?;
        Ok(NegativeBinomial { p, r, dist })
    }

    pub fn p(&self) -> f64 {
        self.p
    }

    pub fn r(&self) -> f64 {
        self.r
    }

    /// Mean `r(1-p)/p`.
    pub fn mean(&self) -> f64 {
        self.r * (1.0 - self.p) / self.p
    }
}

impl Emission for NegativeBinomial {
    type Observation = u32;

    fn ln_likelihood(&self, k: &u32) -> f64 {
        self.dist.ln_pmf(u64::from(*k))
    }
}

/// Product of independent univariate distributions, one per channel.
#[derive(Clone, Debug)]
pub struct MultiVariate<D> {
    dists: Vec<D>,
}

impl<D> MultiVariate<D> {
    pub fn new(dists: Vec<D>) -> Self {
        MultiVariate { dists }
    }

    pub fn dists(&self) -> &[D] {
        &self.dists
    }
}

impl<D> Emission for MultiVariate<D>
where
    D: Emission<Observation = u32>,
{
    type Observation = Vec<u32>;

    fn ln_likelihood(&self, observation: &Vec<u32>) -> f64 {
        debug_assert_eq!(self.dists.len(), observation.len());
        self.dists
            .iter()
            .zip(observation.iter())
            .map(|(dist, k)| dist.ln_likelihood(k))
            .sum()
    }
}
