//! Analyses and optimizations over a built [`nebula_ir::Program`] (§4.F).

pub mod cfg;
pub mod dependence;
pub mod fold;
pub mod join;
pub mod strings;

pub use cfg::Cfg;

use crate::builder::insert_stack_checks;
use crate::config::CompilerConfig;
use nebula_ir::Program;

/// Runs the configured optimization pipeline to a fixpoint. Order matters:
/// folding first so `strings` sees the maximum number of instructions
/// already reduced to constants, then joining (which can only expose more
/// foldable/coalescable material once blocks merge), re-running fold/strings
/// after each join pass since a join can turn a cross-block constant into
/// a same-block one, and finally re-deriving `CheckStack` since joining
/// changes a surviving block's `access`.
pub fn run_default_pipeline(program: &mut Program, config: &CompilerConfig) {
    if config.fold {
        fold::run_to_fixpoint(program);
    }
    if config.coalesce_strings {
        strings::coalesce_strings(program);
    }
    if config.join_blocks {
        loop {
            let joined = join::join_simple_entries(program);
            if config.fold {
                fold::run_to_fixpoint(program);
            }
            if config.coalesce_strings {
                strings::coalesce_strings(program);
            }
            if !joined {
                break;
            }
        }
    }
    if config.canonicalize_tail_calls {
        program.canonicalize_tail_calls();
    }
    recompute_stack_checks(program);
}

/// `join_simple_entries` can change a surviving block's `access`, and
/// `canonicalize_tail_calls` can remove a block whose own `CheckStack` this
/// block's old checks didn't account for — rebuild them all from the
/// current (possibly stale, possibly zero) `access` values rather than try
/// to patch existing `CheckStack` instructions in place.
fn recompute_stack_checks(program: &mut Program) {
    for id in program.block_ids() {
        let stale: Vec<_> = program
            .block(id)
            .nodes
            .iter()
            .copied()
            .filter(|&n| matches!(program.inst(n).kind, nebula_ir::InstKind::CheckStack { .. }))
            .collect();
        for n in stale {
            program.remove_inst(n);
        }
    }
    insert_stack_checks(program);
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebula_ir::{BigInt, InstKind, SourcePos, Terminator};

    #[test]
    fn default_pipeline_folds_and_joins_a_trivial_program() {
        let mut program = Program::new("t");
        let entry = program.entry();
        let next = program.create_block();
        let pos = SourcePos::default();
        let a = program.lookup_const(BigInt::new(2));
        let b = program.lookup_const(BigInt::new(3));
        let id = program.peek_next_inst_id();
        let result = program.new_ssa_value(id);
        program.push_inst(
            entry,
            pos,
            InstKind::Binary { op: nebula_ir::BinOp::Add, lhs: a, rhs: b, result },
        );
        program.set_terminator(entry, Terminator::Jmp(next));
        program.push_inst(
            next,
            pos,
            InstKind::Print { mode: nebula_ir::PrintMode::PrintInt, val: result },
        );
        program.set_terminator(next, Terminator::Exit);

        run_default_pipeline(&mut program, &CompilerConfig::default());

        assert_eq!(program.block_ids(), vec![entry]);
        let nodes = &program.block(entry).nodes;
        assert_eq!(nodes.len(), 1);
        match &program.inst(nodes[0]).kind {
            InstKind::Print { val, .. } => {
                assert_eq!(program.value(*val).as_const_int(), Some(&BigInt::new(5)));
            }
            other => panic!("expected folded Print, got {other:?}"),
        }
    }
}
