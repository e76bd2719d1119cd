//! Program image - the function table and code handed to the VM for one run.

use memory::SlotKind;
use thiserror::Error;

/// Entry in the function table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: String,
    /// Byte offset of the first instruction.
    pub entry: u32,
    /// Argument kinds, in push order.
    pub params: Vec<SlotKind>,
    /// Result kind, `None` for functions that return nothing.
    pub returns: Option<SlotKind>,
}

impl FunctionInfo {
    pub fn new(
        name: impl Into<String>,
        entry: u32,
        params: Vec<SlotKind>,
        returns: Option<SlotKind>,
    ) -> Self {
        Self {
            name: name.into(),
            entry,
            params,
            returns,
        }
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("program has no functions")]
    Empty,
    #[error("entry function {0} is not in the function table")]
    MissingEntry(u16),
    #[error("function '{name}' starts at {entry}, past the end of {len} code bytes")]
    EntryOutOfRange { name: String, entry: u32, len: usize },
}

/// Read-only input of a run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramImage {
    pub functions: Vec<FunctionInfo>,
    pub code: Vec<u8>,
    /// Index of the function a run starts in.
    pub entry_function: u16,
}

impl ProgramImage {
    pub fn new(functions: Vec<FunctionInfo>, code: Vec<u8>, entry_function: u16) -> Self {
        Self {
            functions,
            code,
            entry_function,
        }
    }

    #[inline]
    pub fn function(&self, index: u16) -> Option<&FunctionInfo> {
        self.functions.get(index as usize)
    }

    pub fn find_function(&self, name: &str) -> Option<(u16, &FunctionInfo)> {
        self.functions
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == name)
            .map(|(i, f)| (i as u16, f))
    }

    pub fn entry(&self) -> Option<&FunctionInfo> {
        self.function(self.entry_function)
    }

    /// Checks the table against the code section.
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.functions.is_empty() {
            return Err(ImageError::Empty);
        }
        if self.entry().is_none() {
            return Err(ImageError::MissingEntry(self.entry_function));
        }
        for f in &self.functions {
            if f.entry as usize >= self.code.len() {
                return Err(ImageError::EntryOutOfRange {
                    name: f.name.clone(),
                    entry: f.entry,
                    len: self.code.len(),
                });
            }
        }
        Ok(())
    }
}
