//! Report rendering.

pub mod console;
