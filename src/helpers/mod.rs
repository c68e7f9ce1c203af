//! Runtime helper surface (component C).
//!
//! A flat set of callable primitives the emitted code invokes for every
//! operation not inlined by the stack-effect compiler. Per spec, one
//! representative of each helper family suffices to specify its shape; this
//! module implements exactly that — a representative per family, not
//! exhaustive coverage of every opcode.
//!
//! Every helper here "steals" the references to its object parameters (the
//! caller's ownership transfers in) and returns a new owned reference on
//! success or the documented failure sentinel (null/`None` for object
//! returns, -1 for int returns) on failure, setting the thread's current
//! error via [`crate::objrt::ObjectRuntime::err_set`].

pub mod call;
pub mod compare;
pub mod construct;
pub mod exc;
pub mod importing;
pub mod iterate;
pub mod numeric;
pub mod subscript;

/// Identifies which runtime helper an IL call site targets — the same role
/// the teacher's `RuntimeHelper` enum plays for its Cranelift backend
/// (`jit/backend/traits.rs`), naming the symbol a call instruction resolves
/// against instead of encoding a raw function pointer in the IL itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelperId {
    BinaryOp,
    InplaceBinaryOp,
    SubscrGet,
    SubscrSet,
    AttrGet,
    AttrSet,
    GlobalGet,
    GlobalSet,
    GlobalDel,
    RichCompare,
    /// The emitted call site for `COMPARE_OP (==)`, backed by a per-site
    /// [`compare::SpecializationCell`](crate::helpers::compare::SpecializationCell)
    /// the backend allocates alongside the compiled function.
    CompareEqSpecialized,
    Call0,
    /// The emitted call site for a zero-argument `CALL_FUNCTION`, backed by a
    /// per-site [`call::CallCell`](crate::helpers::call::CallCell).
    Call0Specialized,
    Call1,
    Call2,
    Call3,
    Call4,
    FancyCall,
    GetIter,
    IterNext,
    UnpackSequence,
    ImportName,
    ImportFrom,
    ImportStar,
    BuildClass,
    MakeFunction,
    PrepareException,
    UnwindEh,
    Raise,
    CompareExceptions,
    ErrRestore,
    DecRef,
}
