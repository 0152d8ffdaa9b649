//! Progress display during a run.

pub mod reporter;
