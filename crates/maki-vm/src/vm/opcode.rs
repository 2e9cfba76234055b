use std::fmt;

/// One-byte opcodes. Where noted in the table below, inline operand bytes
/// follow the opcode in the code stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Value, // constant index
    Nil,
    Add,
    Subtract,
    Multiply,
    Divide,
    Minus,
    Not,
    EqualEqual,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Print,
    Assert,
    Pop,
    DefineGlobal,   // name constant index
    GetGlobal,      // name constant index
    SetGlobal,      // name constant index
    GetGlobalIndex, // name constant index; pops the element index
    SetGlobalIndex, // name constant index; pops the value and element index
    GetLocal,       // stack slot
    SetLocal,       // stack slot
    GetLocalIndex,  // stack slot; pops the element index
    SetLocalIndex,  // stack slot; pops the value and element index
    Jump,           // forward offset
    JumpIfFalse,    // forward offset; leaves the tested value on the stack
    Loop,           // backward offset
    Array,          // element count
    Call,           // argument count
    Return,
    Terminate,
}

/// Decode order must match the declaration order above.
const OPCODES: [OpCode; 33] = [
    OpCode::Value,
    OpCode::Nil,
    OpCode::Add,
    OpCode::Subtract,
    OpCode::Multiply,
    OpCode::Divide,
    OpCode::Minus,
    OpCode::Not,
    OpCode::EqualEqual,
    OpCode::NotEqual,
    OpCode::Greater,
    OpCode::GreaterEqual,
    OpCode::Less,
    OpCode::LessEqual,
    OpCode::Print,
    OpCode::Assert,
    OpCode::Pop,
    OpCode::DefineGlobal,
    OpCode::GetGlobal,
    OpCode::SetGlobal,
    OpCode::GetGlobalIndex,
    OpCode::SetGlobalIndex,
    OpCode::GetLocal,
    OpCode::SetLocal,
    OpCode::GetLocalIndex,
    OpCode::SetLocalIndex,
    OpCode::Jump,
    OpCode::JumpIfFalse,
    OpCode::Loop,
    OpCode::Array,
    OpCode::Call,
    OpCode::Return,
    OpCode::Terminate,
];

impl OpCode {
    pub fn from_byte(byte: u8) -> Option<OpCode> {
        OPCODES.get(byte as usize).copied()
    }

    /// Whether the operand byte indexes the constant pool.
    pub fn constant_operand(self) -> bool {
        matches!(
            self,
            OpCode::Value
                | OpCode::DefineGlobal
                | OpCode::GetGlobal
                | OpCode::SetGlobal
                | OpCode::GetGlobalIndex
                | OpCode::SetGlobalIndex
        )
    }

    /// Whether the operand byte is a slot, offset or count.
    pub fn plain_operand(self) -> bool {
        matches!(
            self,
            OpCode::GetLocal
                | OpCode::SetLocal
                | OpCode::GetLocalIndex
                | OpCode::SetLocalIndex
                | OpCode::Jump
                | OpCode::JumpIfFalse
                | OpCode::Loop
                | OpCode::Array
                | OpCode::Call
        )
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpCode::Value => "OP_VALUE",
            OpCode::Nil => "OP_NIL",
            OpCode::Add => "OP_ADD",
            OpCode::Subtract => "OP_SUBTRACT",
            OpCode::Multiply => "OP_MULTIPLY",
            OpCode::Divide => "OP_DIVIDE",
            OpCode::Minus => "OP_MINUS",
            OpCode::Not => "OP_NOT",
            OpCode::EqualEqual => "OP_EQUAL_EQUAL",
            OpCode::NotEqual => "OP_NOT_EQUAL",
            OpCode::Greater => "OP_GREATER",
            OpCode::GreaterEqual => "OP_GREATER_EQUAL",
            OpCode::Less => "OP_LESS",
            OpCode::LessEqual => "OP_LESS_EQUAL",
            OpCode::Print => "OP_PRINT",
            OpCode::Assert => "OP_ASSERT",
            OpCode::Pop => "OP_POP",
            OpCode::DefineGlobal => "OP_DEFINE_GLOBAL",
            OpCode::GetGlobal => "OP_GET_GLOBAL",
            OpCode::SetGlobal => "OP_SET_GLOBAL",
            OpCode::GetGlobalIndex => "OP_GET_GLOBAL_INDEX",
            OpCode::SetGlobalIndex => "OP_SET_GLOBAL_INDEX",
            OpCode::GetLocal => "OP_GET_LOCAL",
            OpCode::SetLocal => "OP_SET_LOCAL",
            OpCode::GetLocalIndex => "OP_GET_LOCAL_INDEX",
            OpCode::SetLocalIndex => "OP_SET_LOCAL_INDEX",
            OpCode::Jump => "OP_JUMP",
            OpCode::JumpIfFalse => "OP_JUMP_IF_FALSE",
            OpCode::Loop => "OP_LOOP",
            OpCode::Array => "OP_ARRAY",
            OpCode::Call => "OP_CALL",
            OpCode::Return => "OP_RETURN",
            OpCode::Terminate => "OP_TERMINATE",
        };
        write!(f, "{}", name)
    }
}
