//! Bytecode chunks and compiled functions.

pub mod rle;

use std::fmt;

use crate::core::value::Value;
use crate::vm::opcode::OpCode;

use rle::Rle;

/// Constant-pool indices are single operand bytes.
pub const MAX_CONSTANTS: usize = 256;

/// A chunk of bytecode: a flat byte stream of opcodes and inline operand
/// bytes, the constant pool they index, and a line table with one entry per
/// code byte.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub constants: Vec<Value>,
    pub lines: Rle,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw byte with its source line.
    pub fn write(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.add(line);
    }

    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write(op as u8, line);
    }

    /// Append a constant and return its index, or `None` when the pool is
    /// full.
    pub fn add_constant(&mut self, value: Value) -> Option<u8> {
        if self.constants.len() >= MAX_CONSTANTS {
            return None;
        }
        self.constants.push(value);
        Some((self.constants.len() - 1) as u8)
    }

    /// Overwrite the operand byte at `index`, used for jump backpatching.
    pub fn patch(&mut self, index: usize, byte: u8) {
        self.code[index] = byte;
    }

    /// Source line of the code byte at `offset`.
    pub fn line_at(&self, offset: usize) -> Option<u32> {
        self.lines.at(offset)
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut last_line = None;
        let mut i = 0;
        while i < self.code.len() {
            write!(f, "{:04}", i)?;

            let line = self.line_at(i);
            if line != last_line {
                write!(f, "{:4} ", line.unwrap_or(0))?;
                last_line = line;
            } else {
                write!(f, "   | ")?;
            }

            match OpCode::from_byte(self.code[i]) {
                Some(op) => {
                    write!(f, "{}", op)?;
                    if op.constant_operand() {
                        i += 1;
                        let index = self.code.get(i).copied().unwrap_or(0) as usize;
                        match self.constants.get(index) {
                            Some(value) => write!(f, " '{}'", value)?,
                            None => write!(f, " <bad constant {}>", index)?,
                        }
                    } else if op.plain_operand() {
                        i += 1;
                        write!(f, " {}", self.code.get(i).copied().unwrap_or(0))?;
                    }
                }
                None => write!(f, "OP_UNKNOWN {}", self.code[i])?,
            }

            writeln!(f)?;
            i += 1;
        }
        Ok(())
    }
}

/// A compiled function: its name, parameter count and bytecode. Immutable
/// once compilation finishes; the VM shares it behind `Rc`.
#[derive(Debug, Clone, Default)]
pub struct Function {
    pub name: String,
    pub arity: u8,
    pub chunk: Chunk,
}

impl Function {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            arity: 0,
            chunk: Chunk::new(),
        }
    }

    /// Human-readable dump of this function and, depth-first, every function
    /// stored in its constant pool.
    pub fn disassemble(&self) -> String {
        let mut text = self.to_string();
        for constant in &self.chunk.constants {
            if let Value::Function(inner) = constant {
                text.push_str(&inner.disassemble());
            }
        }
        text
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "__{}__", self.name)?;
        write!(f, "{}", self.chunk)
    }
}
