//! Descent CLI: compile a script, execute it, and dump the registers.

use std::env;
use std::fs;
use std::process;

use descent::bytecode::{self, Vm};
use descent::error::DescentError;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI command to execute.
enum Command {
    /// Run a script file
    Run { file: String },
    /// Evaluate a string
    Eval { code: String },
}

/// CLI options parsed from arguments.
struct Options {
    command: Command,
    disassemble: bool,
    no_exec: bool,
}

fn print_usage() {
    eprintln!("dcs {} - Descent compiler and VM", VERSION);
    eprintln!();
    eprintln!("Usage: dcs [options] <script.dcs>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -e, --eval <code>   Evaluate a string instead of a file");
    eprintln!("  -d, --disassemble   Print the compiled bytecode listing");
    eprintln!("      --no-exec       Compile only, skip execution");
    eprintln!("  -h, --help          Show this help");
    eprintln!("  -v, --version       Show the version");
}

fn parse_args() -> Option<Options> {
    let args: Vec<String> = env::args().skip(1).collect();

    let mut file = None;
    let mut eval = None;
    let mut disassemble = false;
    let mut no_exec = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-v" | "--version" => {
                println!("dcs {}", VERSION);
                process::exit(0);
            }
            "-d" | "--disassemble" => disassemble = true,
            "--no-exec" => no_exec = true,
            "-e" | "--eval" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Missing argument for {}", args[i - 1]);
                    return None;
                }
                eval = Some(args[i].clone());
            }
            arg if arg.starts_with('-') => {
                eprintln!("Unknown option: {}", arg);
                return None;
            }
            arg => {
                if file.is_some() {
                    eprintln!("Multiple script files given");
                    return None;
                }
                file = Some(arg.to_string());
            }
        }
        i += 1;
    }

    let command = match (file, eval) {
        (_, Some(code)) => Command::Eval { code },
        (Some(file), None) => Command::Run { file },
        (None, None) => {
            print_usage();
            return None;
        }
    };

    Some(Options {
        command,
        disassemble,
        no_exec,
    })
}

fn main() {
    let Some(options) = parse_args() else {
        process::exit(2);
    };

    let source = match &options.command {
        Command::Run { file } => match fs::read_to_string(file) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("Cannot read '{}': {}", file, err);
                process::exit(2);
            }
        },
        Command::Eval { code } => code.clone(),
    };

    let compiled = match descent::compile(&source) {
        Ok(compiled) => compiled,
        Err(err) => {
            // Compile-time diagnostics go to stdout with their line numbers
            println!("{}", err);
            process::exit(1);
        }
    };

    if options.disassemble {
        print!("{}", bytecode::disassemble(&compiled));
        println!("---");
    }

    if options.no_exec {
        return;
    }

    let mut vm = Vm::new(compiled.bytes);
    if let Err(err) = vm.run() {
        let code = err.exit_code();
        eprintln!("{}", DescentError::Runtime(err));
        process::exit(code);
    }

    dump_registers(&vm);
}

/// Print both registers in several renderings, the way the language's
/// numeric model overlays them.
fn dump_registers(vm: &Vm) {
    println!("Results:");
    dump_register("Left", vm.left_bytes());
    dump_register("Right", vm.right_bytes());
}

fn dump_register(name: &str, bytes: [u8; 8]) {
    let raw = u64::from_le_bytes(bytes);
    println!("  {:>5}: 0b{:064b}", name, raw);
    println!("  {:>5}: {}", name, i64::from_le_bytes(bytes));
    print!("  {:>5}:", name);
    for byte in bytes.iter().rev() {
        print!(" {:03}", byte);
    }
    println!();
    println!(
        "  {:>5}: {}f",
        name,
        f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    );
    println!("  {:>5}: {}d", name, f64::from_le_bytes(bytes));
}
