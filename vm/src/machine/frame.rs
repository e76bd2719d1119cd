use crate::error::FaultKind;

/// What `ret` needs to resume the caller.
///
/// Each record tracks:
/// - `return_ip`: byte offset of the instruction after the `call`
/// - `saved_fp`: the caller's frame pointer
/// - `function`: the callee's function table index (its argument count
///   decides how many slots `ret` reclaims)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallRecord {
    pub return_ip: usize,
    pub saved_fp: usize,
    pub function: u16,
}

/// Stack of unreturned calls, bounded by the configured depth.
#[derive(Debug, Clone)]
pub struct CallStack {
    records: Vec<CallRecord>,
    max_depth: usize,
}

impl CallStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            records: Vec::with_capacity(max_depth.min(64)),
            max_depth,
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: CallRecord) -> Result<(), FaultKind> {
        if self.records.len() >= self.max_depth {
            return Err(FaultKind::StackOverflow);
        }
        self.records.push(record);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<CallRecord, FaultKind> {
        self.records.pop().ok_or(FaultKind::StackUnderflow)
    }

    #[inline]
    pub fn last(&self) -> Option<&CallRecord> {
        self.records.last()
    }
}
