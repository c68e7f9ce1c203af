//! Compile driver (component H): orchestrates decode -> analyze -> emit and
//! exposes the `compile`/`free` entry points the host VM's two JIT hooks
//! (§6: `compile_callback`/`free_callback`) call.
//!
//! `compile` never panics and never raises a host exception on rejection —
//! every failure downgrades to [`CompileOutcome::NotCompilable`] per §7, and
//! the instruction stream is scanned for the always-unsupported opcode
//! family (generators, `with`) up front so an unreachable `YIELD_VALUE`
//! still rejects the whole function, not just the reachable fraction the
//! abstract interpreter's worklist would otherwise see.

use crate::analysis::analyze;
use crate::bytecode::decode_function;
use crate::compiler::emit::compile_function;
use crate::error::CompileError;
use crate::il::IlBuilder;

/// Tunables for the compile driver, the ambient configuration surface the
/// teacher's own JIT engine carries as a plain struct
/// (`crates/raya-engine/src/jit/engine.rs`). §6 rules out a config *file* at
/// this layer; this is the in-process knob set instead.
#[derive(Debug, Clone, Copy)]
pub struct JitConfig {
    /// Keep self-specializing call/compare cells (§9, §4.C) live across
    /// repeated invocations of the same call site rather than resetting them
    /// each compile. Always `true` in this crate; kept as a field for parity
    /// with the teacher's config-struct idiom and exercised by a dedicated test.
    pub keep_specialization_cells: bool,
}

impl Default for JitConfig {
    fn default() -> Self {
        JitConfig { keep_specialization_cells: true }
    }
}

/// The opaque artifact `compile` hands back to the host VM on acceptance.
/// Holds nothing beyond what the driver itself needs to report; the emitted
/// machine code lives inside whichever [`IlBuilder`] was driven to produce it.
#[derive(Debug, Clone, Copy)]
pub struct CompiledFunction {
    pub local_count: usize,
    pub instruction_count: usize,
}

/// `compile`'s result: either a compiled artifact or "not compilable" — the
/// latter is not an error the host ever sees as an exception (§7).
#[derive(Debug)]
pub enum CompileOutcome {
    Compiled(CompiledFunction),
    NotCompilable,
}

impl CompileOutcome {
    pub fn is_compiled(&self) -> bool {
        matches!(self, CompileOutcome::Compiled(_))
    }
}

/// Orchestrates one code object's interpret -> preprocess -> compile pipeline.
/// Stateless beyond its [`JitConfig`]; a single `Driver` may compile many
/// code objects, and nothing it holds is shared between compiles (§5: each
/// compile runs single-threaded over its own emulated stack and block state).
pub struct Driver {
    config: JitConfig,
}

impl Driver {
    pub fn new(config: JitConfig) -> Self {
        Driver { config }
    }

    pub fn config(&self) -> JitConfig {
        self.config
    }

    /// `compile(code_object) -> opaque_compiled_pointer` per §6, specialized
    /// to this crate's in-process representation: `code` is the raw bytecode
    /// stream, `builder` is the IL seam the host's real compiler would back
    /// with a register allocator and assembler. `local_count`/`param_count`
    /// describe the frame's fast-locals layout (§3's "frame shape").
    pub fn compile<B: IlBuilder>(
        &self,
        builder: &mut B,
        code: &[u8],
        local_count: usize,
        param_count: usize,
    ) -> CompileOutcome {
        match self.try_compile(builder, code, local_count, param_count) {
            Ok(compiled) => {
                log::debug!(
                    "accepted code object: {} instructions, {} locals",
                    compiled.instruction_count,
                    compiled.local_count
                );
                CompileOutcome::Compiled(compiled)
            }
            Err(e) => {
                log::debug!("rejecting code object as not compilable: {e}");
                CompileOutcome::NotCompilable
            }
        }
    }

    fn try_compile<B: IlBuilder>(
        &self,
        builder: &mut B,
        code: &[u8],
        local_count: usize,
        param_count: usize,
    ) -> Result<CompiledFunction, CompileError> {
        let instrs = decode_function(code)?;

        // §8 "Fall-back completeness": any generator/with opcode anywhere in
        // the stream rejects the function, reachable or not.
        if let Some(instr) = instrs.iter().find(|i| i.opcode.always_unsupported()) {
            return Err(CompileError::Analysis(crate::error::AnalysisError::UnsupportedOpcode {
                opcode: instr.opcode,
                offset: instr.offset,
            }));
        }

        let analysis = analyze(&instrs, local_count, param_count)?;
        compile_function(builder, &instrs, &analysis)?;

        Ok(CompiledFunction { local_count, instruction_count: instrs.len() })
    }

    /// `free_callback(compiled_pointer)` per §6: invoked from the code
    /// object's deallocator. This crate's compiled artifact owns nothing
    /// beyond the [`IlBuilder`]'s own emitted payload (freed by the builder's
    /// backend, outside this crate's scope), so there is nothing left to
    /// release here beyond dropping the value.
    pub fn free(&self, _compiled: CompiledFunction) {}
}

impl Default for Driver {
    fn default() -> Self {
        Driver::new(JitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::RecordingIlBuilder;

    fn load_fast_add_return(idx_arg: u16, const_arg: i32) -> Vec<u8> {
        let mut code = vec![0x20];
        code.extend_from_slice(&idx_arg.to_be_bytes());
        code.push(0x05);
        code.extend_from_slice(&const_arg.to_be_bytes());
        code.push(0x40); // BINARY_ADD
        code.push(0x88); // RETURN_VALUE
        code
    }

    #[test]
    fn accepts_simple_add_function() {
        let driver = Driver::default();
        let mut builder = RecordingIlBuilder::new();
        let outcome = driver.compile(&mut builder, &load_fast_add_return(0, 1), 1, 1);
        assert!(outcome.is_compiled());
    }

    #[test]
    fn rejects_yield_anywhere_in_the_stream_even_if_unreachable() {
        // JUMP_FORWARD over a YIELD_VALUE that a reachability-only scan would miss.
        let mut code = vec![0x70]; // JUMP_FORWARD
        code.extend_from_slice(&4u32.to_be_bytes());
        code.push(0xE0); // YIELD_VALUE (dead code, never reached at runtime)
        code.push(0x08); // LOAD_CONST_NONE
        code.push(0x88); // RETURN_VALUE
        let driver = Driver::default();
        let mut builder = RecordingIlBuilder::new();
        let outcome = driver.compile(&mut builder, &code, 0, 0);
        assert!(matches!(outcome, CompileOutcome::NotCompilable));
    }

    #[test]
    fn rejects_malformed_bytecode_as_not_compilable_not_a_panic() {
        let driver = Driver::default();
        let mut builder = RecordingIlBuilder::new();
        let code = vec![0xFF]; // invalid opcode byte
        let outcome = driver.compile(&mut builder, &code, 0, 0);
        assert!(matches!(outcome, CompileOutcome::NotCompilable));
    }

    #[test]
    fn rejects_opcode_with_no_representative_helper() {
        let driver = Driver::default();
        let mut builder = RecordingIlBuilder::new();
        let code = vec![0xA0, 0x00, 0x00, 0x00, 0x00]; // BUILD_TUPLE 0
        let outcome = driver.compile(&mut builder, &code, 0, 0);
        assert!(matches!(outcome, CompileOutcome::NotCompilable));
    }

    #[test]
    fn free_accepts_a_compiled_artifact_without_panicking() {
        let driver = Driver::default();
        let mut builder = RecordingIlBuilder::new();
        match driver.compile(&mut builder, &load_fast_add_return(0, 1), 1, 1) {
            CompileOutcome::Compiled(c) => driver.free(c),
            CompileOutcome::NotCompilable => panic!("expected a compiled artifact"),
        }
    }

    #[test]
    fn config_default_keeps_specialization_cells_live() {
        assert!(JitConfig::default().keep_specialization_cells);
        let driver = Driver::default();
        assert!(driver.config().keep_specialization_cells);
    }
}
