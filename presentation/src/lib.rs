//! Presentation layer for celltype-quorum
//!
//! This crate contains the CLI definition, marker file loading, report
//! formatters and progress reporters.

pub mod cli;
pub mod input;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, ConsensusModeArg, OutputFormat};
pub use input::{MarkerFileError, load_markers};
pub use output::console::{ConsoleFormatter, set_color_enabled};
pub use progress::reporter::{ProgressReporter, SimpleProgress};
