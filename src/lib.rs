//! Descent: a small statically-typed language compiled to bytecode and run
//! on a two-register stack virtual machine.
//!
//! Pipeline: source text → tokens → AST → bytecode + constants → VM.

pub mod ast;
pub mod bytecode;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod types;

use error::DescentError;

/// Parse source code into an AST without compiling.
pub fn parse(source: &str) -> Result<ast::Program, DescentError> {
    let tokens = lexer::Scanner::new(source).scan_tokens()?;
    let program = parser::Parser::new(tokens).parse()?;
    Ok(program)
}

/// Compile source code to bytecode without executing.
pub fn compile(source: &str) -> Result<bytecode::CompiledProgram, DescentError> {
    let program = parse(source)?;
    let compiled = bytecode::Compiler::new().compile(&program)?;
    Ok(compiled)
}

/// Compile and execute; the returned VM exposes its final register and
/// stack state for inspection.
pub fn run(source: &str) -> Result<bytecode::Vm, DescentError> {
    let compiled = compile(source)?;
    let mut vm = bytecode::Vm::new(compiled.bytes);
    vm.run()?;
    Ok(vm)
}

/// Disassemble compiled bytecode to a string.
pub fn disassemble(program: &bytecode::CompiledProgram) -> String {
    bytecode::disassemble(program)
}
