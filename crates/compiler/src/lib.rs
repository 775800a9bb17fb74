//! Nebula compiler: Whitespace/Brainfuck front-ends, the SSA IR builder,
//! machine-independent analyses, and the LLVM lowering interface, built on
//! top of the [`nebula_ir`] core.
//!
//! # Modules
//!
//! - `token`/`frontend`: front-end token contracts and minimal tokenizers (§6)
//! - `error`: recoverable build errors (§7)
//! - `builder`: the IR builder, one module per front-end (§4.E)
//! - `analysis`: constant folding, print-string coalescing, dependence and
//!   control-flow graphs, single-entry block joining (§4.F)
//! - `llvm`: the LLVM lowering interface (§4.G)
//! - `config`: the optimization pipeline's toggles

pub mod analysis;
pub mod builder;
pub mod config;
pub mod error;
pub mod frontend;
pub mod llvm;
pub mod token;

pub use analysis::run_default_pipeline;
pub use config::CompilerConfig;
pub use error::{BuildError, BuildErrorKind};

use nebula_ir::Program;

/// Which front-end language a source file is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    Whitespace,
    Brainfuck,
}

/// Tokenizes, builds, and optimizes `source` in one call — the shape the
/// CLI driver (and any other embedder) wants: front-end-specific lexing is
/// a collaborator's concern (spec.md §1), but a one-shot "give me the
/// optimized program" entry point is exactly what `seqc::compile_file`
/// plays in the teacher.
pub fn compile(source: &str, lang: Lang, config: &CompilerConfig) -> (Program, Vec<BuildError>) {
    let (mut program, errors) = match lang {
        Lang::Whitespace => {
            let (tokens, mut lex_errors) = frontend::tokenize_whitespace(source);
            let (program, mut build_errors) = builder::build_whitespace(&tokens);
            lex_errors.append(&mut build_errors);
            (program, lex_errors)
        }
        Lang::Brainfuck => {
            let tokens = frontend::tokenize_brainfuck(source);
            builder::build_brainfuck(&tokens)
        }
    };
    run_default_pipeline(&mut program, config);
    (program, errors)
}

/// Renders the built program's IR as a human-readable dump — one line per
/// instruction/terminator, grouped by block. Not part of any external
/// contract; a debugging aid for `nebulac --emit=ir`, in the spirit of the
/// teacher's IR text dumps.
pub fn dump_ir(program: &Program) -> String {
    use std::fmt::Write as _;
    let mut out = String::new();
    for block in program.blocks() {
        writeln!(out, "{}:", block.name()).unwrap();
        for &inst_id in &block.nodes {
            writeln!(out, "  {}", format_inst(program, inst_id)).unwrap();
        }
        writeln!(out, "  {}", format_terminator(program, block)).unwrap();
    }
    out
}

fn format_inst(program: &Program, inst_id: nebula_ir::InstId) -> String {
    use nebula_ir::InstKind;
    let inst = program.inst(inst_id);
    match &inst.kind {
        InstKind::Binary { op, lhs, rhs, result } => {
            format!("{:?} = {:?} {}, {}", result, op, fmt_val(program, *lhs), fmt_val(program, *rhs))
        }
        InstKind::Unary { op, val, result } => {
            format!("{:?} = {:?} {}", result, op, fmt_val(program, *val))
        }
        InstKind::LoadStack { position, result } => {
            format!("{:?} = LoadStack({position})", result)
        }
        InstKind::LoadHeap { addr, result } => {
            format!("{:?} = LoadHeap[{}]", result, fmt_val(program, *addr))
        }
        InstKind::StoreHeap { addr, val } => {
            format!("StoreHeap[{}] = {}", fmt_val(program, *addr), fmt_val(program, *val))
        }
        InstKind::Print { mode, val } => format!("Print({:?}, {})", mode, fmt_val(program, *val)),
        InstKind::Read { mode, result } => format!("{:?} = Read({:?})", result, mode),
        InstKind::Flush => "Flush".to_string(),
        InstKind::CheckStack { access } => format!("CheckStack({access})"),
    }
}

fn fmt_val(program: &Program, v: nebula_ir::ValueId) -> String {
    use nebula_ir::ValueKind;
    match program.value(v) {
        ValueKind::ConstInt(n) => n.to_string(),
        ValueKind::ConstString(bytes) => format!("{:?}", String::from_utf8_lossy(bytes)),
        ValueKind::Ssa { .. } => format!("{:?}", v),
        ValueKind::StackLoad { position, .. } => format!("{:?}@{position}", v),
    }
}

fn format_terminator(program: &Program, block: &nebula_ir::BasicBlock) -> String {
    use nebula_ir::Terminator;
    match &block.terminator {
        Some(Terminator::Jmp(t)) => format!("Jmp {}", program.block(*t).name()),
        Some(Terminator::JmpCond { op, cond, then_blk, else_blk }) => format!(
            "JmpCond({:?}, {}) then {} else {}",
            op,
            fmt_val(program, *cond),
            program.block(*then_blk).name(),
            program.block(*else_blk).name()
        ),
        Some(Terminator::Call(dest)) => format!("Call {}", program.block(*dest).name()),
        Some(Terminator::Ret) => "Ret".to_string(),
        Some(Terminator::Exit) => "Exit".to_string(),
        None => "<no terminator>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_whitespace_folds_a_trivial_program() {
        // Push 2, Push 3, Add, Printi, End ("SS SSS\tSST\n" in canonical
        // Whitespace encoding isn't worth hand-writing here; compile
        // through the token builder directly like the builder's own tests).
        let tokens = vec![
            crate::token::WsToken::new(
                crate::token::WsKind::Push,
                Some(nebula_ir::BigInt::new(2)),
                nebula_ir::SourcePos::default(),
            ),
            crate::token::WsToken::new(
                crate::token::WsKind::Push,
                Some(nebula_ir::BigInt::new(3)),
                nebula_ir::SourcePos::default(),
            ),
            crate::token::WsToken::new(
                crate::token::WsKind::Add,
                None,
                nebula_ir::SourcePos::default(),
            ),
            crate::token::WsToken::new(
                crate::token::WsKind::Printi,
                None,
                nebula_ir::SourcePos::default(),
            ),
            crate::token::WsToken::new(
                crate::token::WsKind::End,
                None,
                nebula_ir::SourcePos::default(),
            ),
        ];
        let (mut program, build_errors) = builder::build_whitespace(&tokens);
        assert!(build_errors.is_empty());
        run_default_pipeline(&mut program, &CompilerConfig::default());
        let dump = dump_ir(&program);
        assert!(dump.contains("Print(PrintInt, 5)"));
    }

    #[test]
    fn compile_dispatches_brainfuck_through_the_bracket_builder() {
        let (program, errors) = compile("++.", Lang::Brainfuck, &CompilerConfig::default());
        assert!(errors.is_empty());
        let dump = dump_ir(&program);
        assert!(dump.contains("Print"));
        let _ = program;
    }
}
