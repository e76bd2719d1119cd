use memory::StackEntry;
use tracing::trace;

use crate::error::FaultKind;
use crate::opcode::OpCode;
use crate::program::ProgramImage;

use super::frame::CallRecord;
use super::vm::Flow;

/// Jumps and the call/return protocol.
///
/// Frame layout after `CALL f` with `n` arguments:
///
/// ```text
///   ... | arg0 .. arg(n-1) | locals and temporaries ...
///                          ^ fp
/// ```
///
/// Arguments are addressed as `fp-n .. fp-1`, locals as `fp+0 ..`.
/// `RET` reclaims everything from `fp-n` upward and leaves only the result.
pub trait ControlFlowOps {
    fn handle_jump(&mut self, op: OpCode, target: u32) -> Result<(), FaultKind>;
    fn handle_call(&mut self, program: &ProgramImage, index: u16) -> Result<(), FaultKind>;
    fn handle_ret(&mut self, program: &ProgramImage) -> Result<Flow, FaultKind>;
}

impl ControlFlowOps for super::vm::VM {
    fn handle_jump(&mut self, op: OpCode, target: u32) -> Result<(), FaultKind> {
        let taken = match op {
            OpCode::Jmp => true,
            OpCode::Jz | OpCode::Jnz => {
                let cond = self.stack.pop()?;
                let truth = cond.truthy().ok_or_else(|| {
                    FaultKind::type_mismatch(op.name(), "condition must be int or byte, found ref")
                })?;
                truth == (op == OpCode::Jnz)
            }
            _ => unreachable!("handle_jump called with {op}"),
        };

        // Validated even when not taken so a bad target always surfaces.
        if !self.is_boundary(target as usize) {
            return Err(FaultKind::MalformedJump(target));
        }
        if taken {
            self.ip = target as usize;
        }
        Ok(())
    }

    fn handle_call(&mut self, program: &ProgramImage, index: u16) -> Result<(), FaultKind> {
        let callee = program
            .function(index)
            .ok_or(FaultKind::InvalidFunction(index))?;

        let argc = callee.arity();
        if self.stack.depth_in_frame() < argc {
            return Err(FaultKind::StackUnderflow);
        }
        let args_start = self.stack.len() - argc;
        for (i, kind) in callee.params.iter().enumerate() {
            let found = self.stack.get(args_start + i)?.kind();
            if found != *kind {
                return Err(FaultKind::type_mismatch(
                    OpCode::Call.name(),
                    format!("argument {} of '{}' must be {}, found {}", i, callee.name, kind, found),
                ));
            }
        }
        if !self.is_boundary(callee.entry as usize) {
            return Err(FaultKind::MalformedJump(callee.entry));
        }

        self.calls.push(CallRecord {
            return_ip: self.ip,
            saved_fp: self.fp,
            function: index,
        })?;
        let fp = self.stack.len();
        self.set_frame(fp);
        self.ip = callee.entry as usize;

        trace!(function = %callee.name, depth = self.calls.depth(), fp, "call");
        Ok(())
    }

    fn handle_ret(&mut self, program: &ProgramImage) -> Result<Flow, FaultKind> {
        let current = match self.calls.last() {
            Some(record) => record.function,
            None => program.entry_function,
        };
        let function = program
            .function(current)
            .ok_or(FaultKind::InvalidFunction(current))?;

        let result: Option<StackEntry> = match function.returns {
            Some(kind) => {
                let value = self.stack.pop()?;
                if value.kind() != kind {
                    return Err(FaultKind::expected(OpCode::Ret.name(), kind, value.kind()));
                }
                Some(value)
            }
            None => None,
        };

        let base = self
            .fp
            .checked_sub(function.arity())
            .ok_or(FaultKind::StackUnderflow)?;
        self.stack.truncate(base);

        let Some(record) = self.calls.last().copied() else {
            self.set_frame(0);
            return Ok(Flow::Halt(result));
        };
        self.calls.pop()?;
        self.set_frame(record.saved_fp);
        self.ip = record.return_ip;
        if let Some(value) = result {
            self.stack.push(value)?;
        }

        trace!(function = %function.name, depth = self.calls.depth(), result = ?result, "ret");
        Ok(Flow::Continue)
    }
}
