//! Error types for each stage of the compile pipeline.
//!
//! Compile-time failures never propagate as a Rust panic past [`crate::driver::compile`];
//! they are downgraded to [`crate::driver::CompileOutcome::NotCompilable`]. These types exist
//! so each stage can report *why* it gave up, for logging and tests.

use thiserror::Error;

use crate::bytecode::Opcode;

/// Failure while decoding a raw bytecode stream into [`crate::bytecode::DecodedInstr`]s.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid opcode byte {byte:#04x} at offset {offset}")]
    InvalidOpcode { byte: u8, offset: usize },
    #[error("unexpected end of bytecode at offset {0} (truncated operand)")]
    UnexpectedEnd(usize),
}

/// Fatal condition raised by the abstract interpreter. Per the design's error-handling
/// model these indicate a malformed code object, not a runtime failure; the driver
/// downgrades them to "not compilable" rather than letting them escape as panics.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("stack depth mismatch at join point, offset {offset}: {a} vs {b}")]
    StackDepthMismatch { offset: usize, a: usize, b: usize },
    #[error("block stack underflow at offset {offset}")]
    BlockUnderflow { offset: usize },
    #[error("unsupported opcode {opcode:?} at offset {offset}")]
    UnsupportedOpcode { opcode: Opcode, offset: usize },
}

/// Failure while emitting IL for an instruction the stack-effect compiler has
/// no representative helper family for, or whose block-stack nesting is
/// malformed. Like [`AnalysisError`] this downgrades to "not compilable"
/// rather than panicking.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmitError {
    #[error("opcode {opcode:?} at offset {offset} has no representative runtime helper")]
    NoRepresentativeHelper { opcode: Opcode, offset: usize },
    #[error("break outside of any enclosing loop block at offset {offset}")]
    BreakOutsideLoop { offset: usize },
    #[error("continue outside of any enclosing loop block at offset {offset}")]
    ContinueOutsideLoop { offset: usize },
    #[error("block stack underflow at offset {offset}")]
    BlockUnderflow { offset: usize },
}

/// Top-level compile error, wrapping whichever stage failed.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Emit(#[from] EmitError),
}
