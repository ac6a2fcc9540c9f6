//! Error kinds shared by all pipeline steps.
//!
//! `Config` errors abort the run before any processing.  `Open` and `MissingSampleTag` are raised
//! per input file; the caller decides whether they are fatal (header pre-scan) or whether the cell
//! is dropped (counting).

error_chain! {
    errors {
        Config(msg: String) {
            description("invalid configuration")
            display("configuration error: {}", msg)
        }
        Open(path: String) {
            description("could not open alignment file")
            display("could not open alignment file {}", path)
        }
        MissingSampleTag(path: String, found: usize) {
            description("alignment file must have exactly one sample tag")
            display(
                "{} has {} distinct SM tags in its @RG header lines, expected exactly one",
                path, found
            )
        }
    }
}
