//! Nebula compiler CLI.
//!
//! Command-line interface for compiling Whitespace/Brainfuck source to
//! either a dumped IR listing or an LLVM IR module — the shape of the
//! teacher's `seqc` driver (`clap` derive, a handful of subcommands,
//! `eprintln!` + `process::exit` for errors rather than a `tracing` setup).

use clap::{Parser, Subcommand, ValueEnum};
use nebula_compiler::{CompilerConfig, Lang};
use std::fs;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "nebulac")]
#[command(about = "Nebula compiler - optimizes Whitespace and Brainfuck into LLVM IR", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a source file, emitting optimized IR or LLVM IR text.
    Build {
        /// Input source file.
        input: PathBuf,

        /// Source language.
        #[arg(long, value_enum)]
        lang: LangArg,

        /// What to emit.
        #[arg(long, value_enum, default_value = "llvm")]
        emit: EmitArg,

        /// Output file; defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable constant folding / algebraic identities / strength reduction.
        #[arg(long)]
        no_fold: bool,

        /// Disable print-string coalescing.
        #[arg(long)]
        no_coalesce_strings: bool,

        /// Disable single-entry block joining.
        #[arg(long)]
        no_join_blocks: bool,
    },
    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LangArg {
    Ws,
    Bf,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmitArg {
    Ir,
    Llvm,
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Command::Build {
            input,
            lang,
            emit,
            output,
            no_fold,
            no_coalesce_strings,
            no_join_blocks,
        } => build(input, lang, emit, output, no_fold, no_coalesce_strings, no_join_blocks),
        Command::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build(
    input: PathBuf,
    lang: LangArg,
    emit: EmitArg,
    output: Option<PathBuf>,
    no_fold: bool,
    no_coalesce_strings: bool,
    no_join_blocks: bool,
) {
    let source = fs::read_to_string(&input).unwrap_or_else(|e| {
        eprintln!("Error: failed to read {}: {e}", input.display());
        process::exit(1);
    });

    let lang = match lang {
        LangArg::Ws => Lang::Whitespace,
        LangArg::Bf => Lang::Brainfuck,
    };
    let config = CompilerConfig::new()
        .with_fold(!no_fold)
        .with_coalesce_strings(!no_coalesce_strings)
        .with_join_blocks(!no_join_blocks);

    let (program, errors) = nebula_compiler::compile(&source, lang, &config);
    if !errors.is_empty() {
        for err in &errors {
            eprintln!("error: {err}");
        }
        process::exit(1);
    }

    let rendered = match emit {
        EmitArg::Ir => nebula_compiler::dump_ir(&program),
        EmitArg::Llvm => nebula_compiler::llvm::emit_module(&program, &config),
    };

    match output {
        Some(path) => {
            if let Err(e) = fs::write(&path, rendered) {
                eprintln!("Error: failed to write {}: {e}", path.display());
                process::exit(1);
            }
            println!("Compiled {} -> {}", input.display(), path.display());
        }
        None => print!("{rendered}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn build_writes_llvm_ir_to_the_requested_output_file() {
        let temp = tempdir().unwrap();
        let input = temp.path().join("hello.ws");
        // Push 65 ('A'), Printc, End.
        fs::write(&input, "   \t     \t\n\n\n  \n\n \n").unwrap();
        let output = temp.path().join("hello.ll");

        build(
            input.clone(),
            LangArg::Ws,
            EmitArg::Llvm,
            Some(output.clone()),
            false,
            false,
            false,
        );

        let ir = fs::read_to_string(&output).unwrap();
        assert!(ir.contains("define void @main()"));
        assert!(ir.contains("declare void @printc(i64)"));
    }

    #[test]
    fn build_emits_ir_dump_for_brainfuck() {
        let temp = tempdir().unwrap();
        let input = temp.path().join("hello.bf");
        fs::write(&input, "++.").unwrap();
        let output = temp.path().join("hello.ir");

        build(
            input.clone(),
            LangArg::Bf,
            EmitArg::Ir,
            Some(output.clone()),
            false,
            false,
            false,
        );

        let dump = fs::read_to_string(&output).unwrap();
        assert!(dump.contains("Print"));
    }
}
