pub mod engine;
pub mod frame;
pub mod opcode;
pub mod stack;

pub use engine::{VM, FRAMES_SIZE, STACK_SIZE};
