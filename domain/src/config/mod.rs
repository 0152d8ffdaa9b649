//! Configuration value objects shared across layers.

mod consensus_mode;
mod output_format;

pub use consensus_mode::ConsensusMode;
pub use output_format::OutputFormat;
