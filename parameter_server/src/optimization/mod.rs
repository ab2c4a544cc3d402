mod consensus;
mod dual;

pub use consensus::ConsensusUpdate;
pub use dual::dual_update;
