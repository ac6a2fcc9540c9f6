//! Strands and strand-inheritance states.

/// The strand an aligned read was sequenced from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumString, Display)]
pub enum Strand {
    Watson,
    Crick,
}

/// Strand-inheritance state of one bin in one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumString, Display)]
pub enum StrandState {
    /// Both homologs carry Crick template strands.
    CC,
    /// One Watson and one Crick template strand.
    WC,
    /// Both homologs carry Watson template strands.
    WW,
}

impl StrandState {
    /// All states in HMM state order.
    pub const ALL: [StrandState; 3] = [StrandState::CC, StrandState::WC, StrandState::WW];

    /// Position of the state in `ALL`.
    pub fn index(self) -> usize {
        match self {
            StrandState::CC => 0,
            StrandState::WC => 1,
            StrandState::WW => 2,
        }
    }
}
