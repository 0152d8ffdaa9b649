//! Orchestration value objects.

mod phase;

pub use phase::Phase;
