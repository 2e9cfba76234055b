use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use maki::Compiler;
use maki_vm::vm::VM;

const HISTORY_FILE: &str = ".maki_history";

#[derive(Parser)]
#[command(name = "maki")]
#[command(about = "The maki programming language", version)]
struct Cli {
    /// Dump the compiled bytecode before running
    #[arg(long)]
    debug: bool,

    /// Script file to run; omit for an interactive session
    #[arg(name = "PATH")]
    paths: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.paths.as_slice() {
        [] => run_repl(cli.debug),
        [path] => run_file(path, cli.debug),
        _ => {
            eprintln!("Usage: maki [path]");
            process::exit(64);
        }
    }
}

fn run_file(path: &PathBuf, debug: bool) -> anyhow::Result<()> {
    let source = fs::read_to_string(path)?;

    let mut compiler = Compiler::new();
    let mut vm = VM::new();
    if let Err(err) = interpret(&mut compiler, &mut vm, &source, debug) {
        eprintln!("{}", err);
        process::exit(1);
    }
    Ok(())
}

fn run_repl(debug: bool) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let _ = editor.load_history(HISTORY_FILE);

    // One compiler and one VM for the whole session, so globals persist
    // across lines.
    let mut compiler = Compiler::new();
    let mut vm = VM::new();

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());
                if let Err(err) = interpret(&mut compiler, &mut vm, &line, debug) {
                    println!("maki :: {}", err);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    let _ = editor.save_history(HISTORY_FILE);
    Ok(())
}

fn interpret(
    compiler: &mut Compiler,
    vm: &mut VM,
    source: &str,
    debug: bool,
) -> maki_vm::error::Result<()> {
    let function = compiler.compile(source)?;
    if debug {
        print!("{}", function.disassemble());
    }
    vm.run(function)
}
