//! Command line front end for the pantry recipe toolkit
//!
//! The binary lives in `main.rs`; this library holds the pieces it shares
//! with tests: where data is kept and how results are printed.

pub mod paths;
pub mod render;

pub use paths::DataPaths;
