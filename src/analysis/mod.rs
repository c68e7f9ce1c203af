//! Abstract interpreter (component E) and its supporting CFG construction.

pub mod cfg;
pub mod interp;

pub use interp::{analyze, AnalysisResult, State};
