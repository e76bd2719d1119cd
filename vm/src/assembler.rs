//! In-process assembler: builds a [`ProgramImage`] instruction by instruction.
//!
//! Jumps may target labels bound later; calls may target functions whose body
//! is emitted later. Both are patched in [`Assembler::finish`].

use memory::SlotKind;
use thiserror::Error;

use crate::opcode::{instruction::*, OpCode};
use crate::program::{FunctionInfo, ProgramImage};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    #[error("label {0} used but never bound")]
    UnboundLabel(usize),
    #[error("label {0} bound twice")]
    LabelRebound(usize),
    #[error("function '{0}' declared but never given a body")]
    MissingBody(String),
    #[error("code section exceeds 4 GiB")]
    CodeTooLarge,
}

/// Jump target handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// Function table handle (the CALL operand).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FnId(pub u16);

#[derive(Debug, Default)]
pub struct Assembler {
    code: Vec<u8>,
    labels: Vec<Option<u32>>,
    /// (operand offset, label)
    fixups: Vec<(usize, Label)>,
    functions: Vec<FunctionInfo>,
    defined: Vec<bool>,
    entry_function: u16,
    rebound: Option<usize>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current byte offset in the code section.
    #[inline]
    pub fn position(&self) -> u32 {
        self.code.len() as u32
    }

    /// Adds a function table entry without a body yet.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        params: &[SlotKind],
        returns: Option<SlotKind>,
    ) -> FnId {
        let id = FnId(self.functions.len() as u16);
        self.functions
            .push(FunctionInfo::new(name, 0, params.to_vec(), returns));
        self.defined.push(false);
        id
    }

    /// Starts the body of a declared function at the current position.
    pub fn begin(&mut self, id: FnId) -> &mut Self {
        let pos = self.position();
        if let Some(f) = self.functions.get_mut(id.0 as usize) {
            f.entry = pos;
            self.defined[id.0 as usize] = true;
        }
        self
    }

    /// `declare` + `begin`.
    pub fn function(
        &mut self,
        name: impl Into<String>,
        params: &[SlotKind],
        returns: Option<SlotKind>,
    ) -> FnId {
        let id = self.declare(name, params, returns);
        self.begin(id);
        id
    }

    /// Selects the function a run starts in (defaults to the first).
    pub fn entry(&mut self, id: FnId) -> &mut Self {
        self.entry_function = id.0;
        self
    }

    pub fn label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    pub fn bind(&mut self, label: Label) -> &mut Self {
        let pos = self.position();
        match self.labels[label.0] {
            Some(_) => self.rebound = self.rebound.or(Some(label.0)),
            None => self.labels[label.0] = Some(pos),
        }
        self
    }

    /// Appends raw bytes, e.g. to build deliberately corrupt programs.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.code.extend_from_slice(bytes);
        self
    }

    /// Appends any operand-less instruction.
    pub fn op(&mut self, op: OpCode) -> &mut Self {
        encode(&mut self.code, op);
        self
    }

    pub fn nop(&mut self) -> &mut Self {
        self.op(OpCode::Nop)
    }

    pub fn push_int(&mut self, value: i32) -> &mut Self {
        encode_i32(&mut self.code, OpCode::PushInt, value);
        self
    }

    pub fn push_byte(&mut self, value: u8) -> &mut Self {
        encode_u8(&mut self.code, OpCode::PushByte, value);
        self
    }

    pub fn pop(&mut self) -> &mut Self {
        self.op(OpCode::Pop)
    }

    pub fn dup(&mut self) -> &mut Self {
        self.op(OpCode::Dup)
    }

    pub fn swap(&mut self) -> &mut Self {
        self.op(OpCode::Swap)
    }

    pub fn reserve(&mut self, slots: u32) -> &mut Self {
        encode_u32(&mut self.code, OpCode::Reserve, slots);
        self
    }

    pub fn load(&mut self, offset: i32) -> &mut Self {
        encode_i32(&mut self.code, OpCode::Load, offset);
        self
    }

    pub fn store(&mut self, offset: i32) -> &mut Self {
        encode_i32(&mut self.code, OpCode::Store, offset);
        self
    }

    pub fn addr(&mut self, offset: i32) -> &mut Self {
        encode_i32(&mut self.code, OpCode::Addr, offset);
        self
    }

    pub fn load_at(&mut self, kind: SlotKind) -> &mut Self {
        encode_u8(&mut self.code, OpCode::LoadAt, kind.as_u8());
        self
    }

    pub fn store_at(&mut self, kind: SlotKind) -> &mut Self {
        encode_u8(&mut self.code, OpCode::StoreAt, kind.as_u8());
        self
    }

    pub fn add(&mut self) -> &mut Self {
        self.op(OpCode::Add)
    }

    pub fn sub(&mut self) -> &mut Self {
        self.op(OpCode::Sub)
    }

    pub fn mul(&mut self) -> &mut Self {
        self.op(OpCode::Mul)
    }

    pub fn lt(&mut self) -> &mut Self {
        self.op(OpCode::Lt)
    }

    fn jump(&mut self, op: OpCode, target: Label) -> &mut Self {
        self.code.push(op.as_u8());
        self.fixups.push((self.code.len(), target));
        self.code.extend_from_slice(&0u32.to_le_bytes());
        self
    }

    pub fn jmp(&mut self, target: Label) -> &mut Self {
        self.jump(OpCode::Jmp, target)
    }

    pub fn jz(&mut self, target: Label) -> &mut Self {
        self.jump(OpCode::Jz, target)
    }

    pub fn jnz(&mut self, target: Label) -> &mut Self {
        self.jump(OpCode::Jnz, target)
    }

    /// Jump to an absolute offset, bypassing labels.
    pub fn jmp_to(&mut self, target: u32) -> &mut Self {
        encode_u32(&mut self.code, OpCode::Jmp, target);
        self
    }

    pub fn call(&mut self, id: FnId) -> &mut Self {
        encode_u16(&mut self.code, OpCode::Call, id.0);
        self
    }

    pub fn ret(&mut self) -> &mut Self {
        self.op(OpCode::Ret)
    }

    pub fn alloc(&mut self) -> &mut Self {
        self.op(OpCode::Alloc)
    }

    pub fn free(&mut self) -> &mut Self {
        self.op(OpCode::Free)
    }

    pub fn copy(&mut self) -> &mut Self {
        self.op(OpCode::Copy)
    }

    /// Resolves labels and produces the image.
    pub fn finish(self) -> Result<ProgramImage, AssembleError> {
        if let Some(label) = self.rebound {
            return Err(AssembleError::LabelRebound(label));
        }
        if u32::try_from(self.code.len()).is_err() {
            return Err(AssembleError::CodeTooLarge);
        }
        if let Some(i) = self.defined.iter().position(|d| !d) {
            return Err(AssembleError::MissingBody(self.functions[i].name.clone()));
        }

        let mut code = self.code;
        for (at, label) in self.fixups {
            let target = self.labels[label.0].ok_or(AssembleError::UnboundLabel(label.0))?;
            code[at..at + 4].copy_from_slice(&target.to_le_bytes());
        }

        Ok(ProgramImage {
            functions: self.functions,
            code,
            entry_function: self.entry_function,
        })
    }
}
