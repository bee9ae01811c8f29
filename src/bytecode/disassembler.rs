//! Bytecode disassembler for debugging.

use std::fmt::Write;

use crate::bytecode::compiler::CompiledProgram;
use crate::bytecode::opcode::{reg_offset, reg_width, OpCode};
use crate::types::prim_name;

/// Render the instruction region as a listing, followed by a hex dump of
/// the constant-pool region.
pub fn disassemble(program: &CompiledProgram) -> String {
    let mut output = String::new();
    let code = &program.bytes[..program.code_size];

    let mut offset = 0;
    while offset < code.len() {
        offset = disassemble_instruction(code, offset, &mut output);
    }

    let pool = &program.bytes[program.code_size..];
    if !pool.is_empty() {
        writeln!(&mut output, "-- constants ({} bytes) --", pool.len()).ok();
        for (i, chunk) in pool.chunks(8).enumerate() {
            write!(&mut output, "{:04} ", program.code_size + i * 8).ok();
            for byte in chunk {
                write!(&mut output, "{:02x} ", byte).ok();
            }
            writeln!(&mut output).ok();
        }
    }

    output
}

/// Disassemble a single instruction, returning the offset of the next one.
pub fn disassemble_instruction(code: &[u8], offset: usize, output: &mut String) -> usize {
    write!(output, "{:04} ", offset).ok();

    let byte = code[offset];
    let Some(opcode) = OpCode::from_u8(byte) else {
        writeln!(output, "??({:#04x})", byte).ok();
        return offset + 1;
    };

    let operands = &code[offset + 1..];
    if operands.len() < opcode.operand_size() {
        writeln!(output, "{} <truncated>", opcode.name()).ok();
        return code.len();
    }

    match opcode {
        OpCode::Return | OpCode::Swap | OpCode::BAnd | OpCode::BOr | OpCode::BNot => {
            writeln!(output, "{}", opcode.name()).ok();
        }

        OpCode::Call | OpCode::Spp | OpCode::Fpp | OpCode::Jmp | OpCode::Jmpz | OpCode::Jmpnz => {
            writeln!(output, "{:<8}{}", opcode.name(), read_i32(operands)).ok();
        }

        OpCode::Store | OpCode::Load => {
            writeln!(output, "{:<8}{}", opcode.name(), operands[0]).ok();
        }

        OpCode::LoadC => {
            writeln!(
                output,
                "{:<8}{} @{}",
                opcode.name(),
                operands[0],
                read_i32(&operands[1..])
            )
            .ok();
        }

        OpCode::Conv => {
            writeln!(
                output,
                "{:<8}{} -> {}",
                opcode.name(),
                prim_name(operands[0]),
                prim_name(operands[1])
            )
            .ok();
        }

        OpCode::CmpE
        | OpCode::CmpL
        | OpCode::CmpG
        | OpCode::Add
        | OpCode::Sub
        | OpCode::Mul
        | OpCode::Div
        | OpCode::Neg
        | OpCode::And
        | OpCode::Or
        | OpCode::Xor
        | OpCode::Not => {
            writeln!(output, "{:<8}{}", opcode.name(), prim_name(operands[0])).ok();
        }

        OpCode::Push | OpCode::Pop => {
            let packed = operands[0];
            let reg = if reg_offset(packed) == 0 { "left" } else { "right" };
            writeln!(output, "{:<8}{}:{}", opcode.name(), reg, reg_width(packed)).ok();
        }

        OpCode::Reserve | OpCode::Release => {
            let value = i16::from_le_bytes([operands[0], operands[1]]);
            writeln!(output, "{:<8}{}", opcode.name(), value).ok();
        }

        OpCode::SpecCall => {
            writeln!(output, "{:<9}{}", opcode.name(), operands[0]).ok();
        }
    }

    offset + 1 + opcode.operand_size()
}

fn read_i32(bytes: &[u8]) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    i32::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Compiler;
    use crate::lexer::Scanner;
    use crate::parser::Parser;

    fn compile(source: &str) -> CompiledProgram {
        let tokens = Scanner::new(source).scan_tokens().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        Compiler::new().compile(&program).unwrap()
    }

    #[test]
    fn test_compiled_program_listing() {
        let program = compile(
            "let u32 x = 1 + 250;\n\
             let f32 y = 1 + 2.0;\n\
             let u8 r = 0;\n\
             if (1 == 2) r = 9; else r = 4;\n\
             let u8 z = u8 : { yield 6; };",
        );
        let listing = disassemble(&program);

        for mnemonic in ["LOADC", "PUSH", "POP", "SWAP", "ADD", "CONV", "CMPE", "JMPZ", "JMP", "STORE", "RETURN"] {
            assert!(
                listing.contains(mnemonic),
                "missing {} in:\n{}",
                mnemonic,
                listing
            );
        }
        assert!(listing.contains("-- constants"));
        assert!(!listing.contains("??"));
    }

    #[test]
    fn test_every_opcode_disassembles() {
        use crate::bytecode::opcode::{pack_reg, REG_RIGHT};
        use crate::types;

        // One instruction per opcode, with representative operands.
        let mut bytes = Vec::new();
        for raw in 0..=OpCode::SpecCall as u8 {
            let opcode = OpCode::from_u8(raw).expect("valid opcode");
            bytes.push(raw);
            match opcode {
                OpCode::Conv => bytes.extend_from_slice(&[types::U8, types::F32]),
                OpCode::Push | OpCode::Pop => bytes.push(pack_reg(REG_RIGHT, 4)),
                OpCode::CmpE
                | OpCode::CmpL
                | OpCode::CmpG
                | OpCode::Add
                | OpCode::Sub
                | OpCode::Mul
                | OpCode::Div
                | OpCode::Neg
                | OpCode::And
                | OpCode::Or
                | OpCode::Xor
                | OpCode::Not => bytes.push(types::U16),
                _ => bytes.extend(std::iter::repeat(0).take(opcode.operand_size())),
            }
        }

        let program = CompiledProgram {
            code_size: bytes.len(),
            bytes,
        };
        let listing = disassemble(&program);

        // Every line is "<offset> <mnemonic> <operands...>"
        let mnemonics: Vec<&str> = listing
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .collect();
        for raw in 0..=OpCode::SpecCall as u8 {
            let opcode = OpCode::from_u8(raw).expect("valid opcode");
            assert!(
                mnemonics.contains(&opcode.name()),
                "missing {} in:\n{}",
                opcode.name(),
                listing
            );
        }
        assert!(!listing.contains("??"));
    }

    #[test]
    fn test_unknown_byte_renders_placeholder() {
        let program = CompiledProgram {
            bytes: vec![0xEE],
            code_size: 1,
        };
        assert!(disassemble(&program).contains("??"));
    }
}
