//! Human-readable listing of a program image.

use std::fmt;

use memory::SlotKind;

use crate::opcode::instruction::{decode, Instruction, Operand};
use crate::opcode::OpCode;
use crate::program::ProgramImage;

/// One line of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisasmLine {
    /// Function header emitted before the function's first instruction.
    Function {
        index: u16,
        name: String,
        params: Vec<SlotKind>,
        returns: Option<SlotKind>,
    },
    Instruction { offset: usize, instruction: Instruction },
    /// Undecodable byte; the listing stops here.
    Bad { offset: usize, byte: u8 },
}

impl fmt::Display for DisasmLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisasmLine::Function {
                index,
                name,
                params,
                returns,
            } => {
                let params: Vec<&str> = params.iter().map(|p| p.name()).collect();
                let returns = returns.map_or("void", |r| r.name());
                write!(f, "fn #{} {}({}) -> {}:", index, name, params.join(", "), returns)
            }
            DisasmLine::Instruction {
                offset,
                instruction,
            } => {
                let name = instruction.op.name();
                match (instruction.op, instruction.operand) {
                    (_, Operand::None) => write!(f, "  {:04} {}", offset, name),
                    (OpCode::LoadAt | OpCode::StoreAt, Operand::U8(k)) => {
                        let kind = SlotKind::from_u8(k).map_or("?", |k| k.name());
                        write!(f, "  {:04} {:<10} {}", offset, name, kind)
                    }
                    (OpCode::Load | OpCode::Store | OpCode::Addr, Operand::I32(off)) => {
                        write!(f, "  {:04} {:<10} fp{:+}", offset, name, off)
                    }
                    (OpCode::Call, Operand::U16(idx)) => {
                        write!(f, "  {:04} {:<10} #{}", offset, name, idx)
                    }
                    (op, Operand::U32(target)) if op.is_jump() => {
                        write!(f, "  {:04} {:<10} @{:04}", offset, name, target)
                    }
                    (_, operand) => {
                        write!(f, "  {:04} {:<10} {}", offset, name, operand.as_i32())
                    }
                }
            }
            DisasmLine::Bad { offset, byte } => {
                write!(f, "  {:04} <bad> {:#04x}", offset, byte)
            }
        }
    }
}

/// Decodes the whole code section, interleaving function headers.
pub fn disassemble(image: &ProgramImage) -> Vec<DisasmLine> {
    let mut headers: Vec<(usize, u16)> = image
        .functions
        .iter()
        .enumerate()
        .map(|(i, f)| (f.entry as usize, i as u16))
        .collect();
    headers.sort();
    let mut headers = headers.into_iter().peekable();

    let mut lines = Vec::new();
    let mut ip = 0;
    while ip < image.code.len() {
        while let Some(&(entry, index)) = headers.peek() {
            if entry > ip {
                break;
            }
            let f = &image.functions[index as usize];
            lines.push(DisasmLine::Function {
                index,
                name: f.name.clone(),
                params: f.params.clone(),
                returns: f.returns,
            });
            headers.next();
        }

        match decode(&image.code, ip) {
            Ok(instruction) => {
                lines.push(DisasmLine::Instruction {
                    offset: ip,
                    instruction,
                });
                ip += instruction.size();
            }
            Err(_) => {
                lines.push(DisasmLine::Bad {
                    offset: ip,
                    byte: image.code[ip],
                });
                break;
            }
        }
    }
    lines
}

/// Function table only, one line per entry.
pub fn function_table(image: &ProgramImage) -> Vec<String> {
    image
        .functions
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let params: Vec<&str> = f.params.iter().map(|p| p.name()).collect();
            let marker = if i as u16 == image.entry_function { "*" } else { " " };
            format!(
                "{}#{:<3} {:<16} @{:04}  ({}) -> {}",
                marker,
                i,
                f.name,
                f.entry,
                params.join(", "),
                f.returns.map_or("void", |r| r.name())
            )
        })
        .collect()
}

/// Full listing as text.
pub fn render(image: &ProgramImage) -> String {
    let mut out = String::new();
    for line in disassemble(image) {
        out.push_str(&line.to_string());
        out.push('\n');
    }
    out
}
