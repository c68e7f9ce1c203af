//! Stack-effect compiler (component G) and its block-stack bookkeeping.

pub mod blocks;
pub mod emit;

pub use emit::compile_function;
