//! Module with shared code.
// `error_chain!` can recurse deeply.
#![recursion_limit = "1024"]

#[macro_use]
extern crate error_chain;

#[macro_use]
extern crate slog;

extern crate rust_htslib;

extern crate strum;
#[macro_use]
extern crate strum_macros;

pub mod bam_utils;
pub mod errors;
pub mod regions;
pub mod stats;
pub mod strand;
