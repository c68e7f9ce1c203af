//! A method-at-a-time just-in-time compiler for a dynamically-typed,
//! reference-counted, stack-based bytecode virtual machine.
//!
//! For each code object the host VM would otherwise interpret one opcode at a
//! time, [`driver::Driver::compile`] translates its bytecode into a sequence
//! of IL operations (via the [`il::IlBuilder`] seam) that is semantically
//! equivalent to the interpreter's dispatch loop, with opportunistic
//! unboxing of small integers (tagged pointers, [`tagged`]) and floats
//! (native register/VALUE-slot storage, decided by [`analysis`]).
//!
//! Three pieces do the core work and are specified together because they
//! share one invariant — the shape of the emulated operand stack and the
//! reference-count contract on every value flowing through it:
//!
//! - [`analysis`] — the abstract interpreter: a forward dataflow pass that
//!   infers, per program point, the abstract type of every stack slot and
//!   local, and decides whether an operation can run unboxed.
//! - [`compiler`] — the stack-effect compiler: translates each opcode into
//!   IL, threading the emulated operand stack, block stack, and exception
//!   landing pads.
//! - [`helpers`] — the runtime helper surface: the callable primitives
//!   emitted code invokes for everything not inlined.
//!
//! [`objrt`] and [`il`] are the two external collaborators this crate treats
//! as opaque: the host VM's object model/refcount runtime, and the
//! machine-code emitter/register allocator. Both are traits with one
//! concrete test-only implementation in this crate; a production backend for
//! either lives outside this crate's scope.

pub mod analysis;
pub mod bytecode;
pub mod compiler;
pub mod driver;
pub mod error;
pub mod helpers;
pub mod il;
pub mod lattice;
pub mod objrt;
pub mod tagged;

pub use driver::{CompileOutcome, CompiledFunction, Driver, JitConfig};
pub use error::CompileError;
