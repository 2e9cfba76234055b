#![allow(dead_code)]

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use maki::Compiler;
use maki_vm::error::Error;
use maki_vm::vm::VM;

/// An output sink the test can keep reading after handing a clone to the VM.
#[derive(Clone, Default)]
pub struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A compiler/VM pair sharing output, for REPL-style multi-round tests.
pub struct Session {
    pub compiler: Compiler,
    pub vm: VM,
    output: SharedOutput,
}

impl Session {
    pub fn new() -> Self {
        let output = SharedOutput::default();
        Self {
            compiler: Compiler::new(),
            vm: VM::with_output(Box::new(output.clone())),
            output,
        }
    }

    pub fn interpret(&mut self, source: &str) -> Result<(), Error> {
        let function = self.compiler.compile(source)?;
        self.vm.run(function)
    }

    pub fn output(&self) -> String {
        self.output.contents()
    }
}

/// Compile and run `source` on a fresh session, returning captured output.
pub fn run(source: &str) -> Result<String, Error> {
    let mut session = Session::new();
    session.interpret(source)?;
    Ok(session.output())
}

pub fn run_ok(source: &str) -> String {
    match run(source) {
        Ok(output) => output,
        Err(err) => panic!("unexpected error for {:?}: {}", source, err),
    }
}

pub fn run_err(source: &str) -> Error {
    match run(source) {
        Ok(output) => panic!("expected an error for {:?}, got output {:?}", source, output),
        Err(err) => err,
    }
}
