use std::sync::Arc;

use memory::{Bitmap, Heap, StackEntry};
use tracing::{debug, warn};

use crate::config::VmConfig;
use crate::error::{Fault, FaultKind};
use crate::opcode::instruction::{decode, Instruction, Operand};
use crate::opcode::OpCode;
use crate::program::{ImageError, ProgramImage};

use super::arithmetic::ArithmeticOps;
use super::control::ControlFlowOps;
use super::data::DataOps;
use super::frame::CallStack;
use super::stack::OperandStack;

/// Result of a single `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    /// The outermost frame returned; carries its result, if any.
    Halted(Option<StackEntry>),
}

/// What an opcode handler asks the dispatch loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt(Option<StackEntry>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Halted(Option<StackEntry>),
    Faulted(Fault),
}

/// The Virtual Machine.
///
/// Holds every piece of run state (operand stack, call stack, heap,
/// instruction and frame pointers) and is handed to each opcode handler
/// as `&mut self`. Independent instances share nothing.
pub struct VM {
    pub config: VmConfig,
    pub heap: Heap,
    pub stack: OperandStack,
    pub calls: CallStack,
    pub(super) program: Option<Arc<ProgramImage>>,
    /// Byte offsets where a decodable instruction starts.
    pub(super) boundaries: Bitmap,
    pub(super) ip: usize,
    pub(super) fp: usize,
    steps: u64,
    state: RunState,
}

impl Default for VM {
    fn default() -> Self {
        Self::new(VmConfig::default())
    }
}

impl VM {
    pub fn new(config: VmConfig) -> Self {
        Self {
            heap: Heap::with_config(config.heap()),
            stack: OperandStack::new(config.max_stack_slots),
            calls: CallStack::new(config.max_call_depth),
            program: None,
            boundaries: Bitmap::new(0),
            ip: 0,
            fp: 0,
            steps: 0,
            state: RunState::Idle,
            config,
        }
    }

    /// Drops all run state, including the heap.
    pub fn reset(&mut self) {
        self.heap = Heap::with_config(self.config.heap());
        self.stack = OperandStack::new(self.config.max_stack_slots);
        self.calls = CallStack::new(self.config.max_call_depth);
        self.program = None;
        self.boundaries = Bitmap::new(0);
        self.ip = 0;
        self.fp = 0;
        self.steps = 0;
        self.state = RunState::Idle;
    }

    /// Prepares a run of `program`'s entry function with `args`.
    ///
    /// The arguments become the outermost frame's parameters: they sit just
    /// below the frame pointer and are addressed with negative offsets.
    pub fn load(
        &mut self,
        program: impl Into<Arc<ProgramImage>>,
        args: &[StackEntry],
    ) -> Result<(), Fault> {
        self.reset();
        let program: Arc<ProgramImage> = program.into();

        program.validate().map_err(|e| {
            let kind = match e {
                ImageError::MissingEntry(index) => FaultKind::InvalidFunction(index),
                ImageError::Empty => FaultKind::InvalidFunction(program.entry_function),
                ImageError::EntryOutOfRange { entry, .. } => FaultKind::MalformedJump(entry),
            };
            Fault::new(kind, 0)
        })?;
        let entry = program
            .entry()
            .ok_or_else(|| Fault::new(FaultKind::InvalidFunction(program.entry_function), 0))?;

        let (starts, decoded) = instruction_starts(&program.code);
        self.boundaries = starts;
        // An undecodable entry faults when stepped; one inside an operand never runs.
        if (entry.entry as usize) < decoded && !self.is_boundary(entry.entry as usize) {
            return Err(Fault::new(
                FaultKind::MalformedJump(entry.entry),
                entry.entry as usize,
            ));
        }

        if entry.arity() != args.len() {
            return Err(Fault::new(
                FaultKind::ArgumentMismatch(format!(
                    "'{}' takes {} argument(s), {} given",
                    entry.name,
                    entry.arity(),
                    args.len()
                )),
                entry.entry as usize,
            ));
        }
        for (i, (want, got)) in entry.params.iter().zip(args).enumerate() {
            if *want != got.kind() {
                return Err(Fault::new(
                    FaultKind::ArgumentMismatch(format!(
                        "argument {} of '{}' must be {}, got {}",
                        i,
                        entry.name,
                        want,
                        got.kind()
                    )),
                    entry.entry as usize,
                ));
            }
        }

        for arg in args {
            self.stack
                .push(*arg)
                .map_err(|k| Fault::new(k, entry.entry as usize))?;
        }
        self.fp = args.len();
        self.stack.set_floor(self.fp);
        self.ip = entry.entry as usize;

        debug!(
            function = %entry.name,
            args = args.len(),
            code_len = program.code.len(),
            "run start"
        );

        self.program = Some(program);
        self.state = RunState::Running;
        Ok(())
    }

    /// Executes one instruction.
    ///
    /// After a halt or fault the same outcome is reported again without
    /// executing anything.
    pub fn step(&mut self) -> Result<StepOutcome, Fault> {
        match &self.state {
            RunState::Running => {}
            RunState::Halted(value) => return Ok(StepOutcome::Halted(*value)),
            RunState::Faulted(fault) => return Err(fault.clone()),
            RunState::Idle => {
                return Err(Fault::new(FaultKind::InvalidInstructionPointer(self.ip), self.ip))
            }
        }

        let ip = self.ip;
        match self.execute_one() {
            Ok(Flow::Continue) => Ok(StepOutcome::Continue),
            Ok(Flow::Halt(value)) => {
                debug!(steps = self.steps, result = ?value, "run finished");
                self.state = RunState::Halted(value);
                Ok(StepOutcome::Halted(value))
            }
            Err(kind) => {
                let fault = Fault::new(kind, ip);
                warn!(ip, depth = self.calls.depth(), %fault, "fault");
                self.state = RunState::Faulted(fault.clone());
                Err(fault)
            }
        }
    }

    /// Steps until the run halts or faults.
    pub fn resume(&mut self) -> Result<Option<StackEntry>, Fault> {
        loop {
            if let StepOutcome::Halted(value) = self.step()? {
                return Ok(value);
            }
        }
    }

    /// `load` + `resume`. Pass an `Arc` to run the same image repeatedly
    /// without copying its code.
    pub fn run(
        &mut self,
        program: impl Into<Arc<ProgramImage>>,
        args: &[StackEntry],
    ) -> Result<Option<StackEntry>, Fault> {
        self.load(program, args)?;
        self.resume()
    }

    // ===== Introspection =====

    #[inline]
    pub fn ip(&self) -> usize {
        self.ip
    }

    #[inline]
    pub fn frame_pointer(&self) -> usize {
        self.fp
    }

    #[inline]
    pub fn call_depth(&self) -> usize {
        self.calls.depth()
    }

    #[inline]
    pub fn stack(&self) -> &[StackEntry] {
        self.stack.as_slice()
    }

    #[inline]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    #[inline]
    pub fn steps_executed(&self) -> u64 {
        self.steps
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.state, RunState::Halted(_) | RunState::Faulted(_))
    }

    /// Moves the frame pointer; pops stop at the new frame base.
    #[inline]
    pub(super) fn set_frame(&mut self, fp: usize) {
        self.fp = fp;
        self.stack.set_floor(fp);
    }

    /// Whether `target` is the first byte of an instruction.
    pub(super) fn is_boundary(&self, target: usize) -> bool {
        self.boundaries.get(target).unwrap_or(false)
    }

    fn execute_one(&mut self) -> Result<Flow, FaultKind> {
        if let Some(limit) = self.config.max_steps {
            if self.steps >= limit {
                return Err(FaultKind::StepLimitExceeded(limit));
            }
        }
        let program = self
            .program
            .clone()
            .ok_or(FaultKind::InvalidInstructionPointer(self.ip))?;

        let instruction = decode(&program.code, self.ip)?;
        self.ip += instruction.size();
        self.steps += 1;

        self.dispatch(&program, instruction)
    }

    fn dispatch(&mut self, program: &ProgramImage, instruction: Instruction) -> Result<Flow, FaultKind> {
        let Instruction { op, operand } = instruction;

        match op {
            OpCode::Nop => {}

            OpCode::PushInt
            | OpCode::PushByte
            | OpCode::Pop
            | OpCode::Dup
            | OpCode::Swap
            | OpCode::Reserve => self.handle_stack(op, operand)?,

            OpCode::Load | OpCode::Store | OpCode::Addr | OpCode::LoadAt | OpCode::StoreAt => {
                self.handle_addressing(op, operand)?
            }

            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Mod | OpCode::Neg => {
                self.handle_arithmetic(op)?
            }

            OpCode::Eq
            | OpCode::Ne
            | OpCode::Lt
            | OpCode::Le
            | OpCode::Gt
            | OpCode::Ge
            | OpCode::Not => self.handle_comparison(op)?,

            OpCode::IntToByte | OpCode::ByteToInt => self.handle_conversion(op)?,

            OpCode::Jmp | OpCode::Jz | OpCode::Jnz => self.handle_jump(op, operand.as_u32())?,

            OpCode::Call => {
                let Operand::U16(index) = operand else {
                    return Err(FaultKind::TruncatedInstruction);
                };
                self.handle_call(program, index)?
            }
            OpCode::Ret => return self.handle_ret(program),

            OpCode::Alloc | OpCode::Free | OpCode::Copy => self.handle_heap(op)?,
        }

        Ok(Flow::Continue)
    }
}

/// Marks the start of every instruction reachable by a linear sweep and
/// returns the length of the decodable prefix.
fn instruction_starts(code: &[u8]) -> (Bitmap, usize) {
    let mut starts = Bitmap::new(code.len());
    let mut ip = 0;
    while let Ok(instruction) = decode(code, ip) {
        if starts.set(ip, true).is_err() {
            break;
        }
        ip += instruction.size();
    }
    (starts, ip)
}
