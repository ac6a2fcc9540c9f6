//! Segmentation of cells into strand-inheritance states with a hidden Markov model.

// `error_chain!` can recurse deeply.
#![recursion_limit = "1024"]

extern crate bio;

#[macro_use]
extern crate error_chain;

#[macro_use]
extern crate slog;

extern crate statrs;

extern crate lib_counting;
extern crate lib_filter;
extern crate lib_shared;

#[cfg(test)]
extern crate lib_binning;

mod errors {
    error_chain! {
        errors {
            InvalidModel(msg: String) {
                description("invalid HMM parameters")
                display("invalid HMM parameters: {}", msg)
            }
        }
    }
}

pub use errors::*;

pub mod dists;
pub mod hmm;
mod seg_strand;

pub use seg_strand::*;
