//! Compiler CLI.
//!
//! One fixed mode: `compiler <input> <asm-out> [<unparse-out>]`. Unlike the
//! teacher binary's subcommand CLI, this driver has exactly one operation,
//! so a `Commands` enum would be over-engineering for a spec that defines
//! one fixed positional signature.

use clap::Parser as ClapParser;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "compiler")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile a source file to MIPS-style assembly", long_about = None)]
struct Cli {
    /// Input source file
    input: PathBuf,

    /// Output assembly file
    asm_out: PathBuf,

    /// Optional path to write a structural unparse of the bound/typed AST
    unparse_out: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    match compiler::compile_file(&cli.input, &cli.asm_out, cli.unparse_out.as_deref()) {
        Ok(()) => {
            println!("Compiled {} -> {}", cli.input.display(), cli.asm_out.display());
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}
