//! Reading run inputs from disk.

pub mod markers;

pub use markers::{MarkerFileError, load_markers, parse_markers_csv, parse_markers_json};
