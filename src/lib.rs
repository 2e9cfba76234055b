//! maki: a small dynamically typed scripting language. The compiler fuses
//! scanning, Pratt parsing and code generation into a single pass over the
//! source; the emitted bytecode runs on the stack VM in `maki_vm`.

pub mod compiler;
pub mod scanner;

pub use compiler::Compiler;
