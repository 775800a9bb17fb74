//! Single-entry block joining (§4.F).
//!
//! Whenever a block `B` has exactly one predecessor `A` and `A`'s
//! terminator is a bare `Jmp(B)`, the two are only separate blocks because
//! of how the label/bracket pre-pass handed out ids — nothing in the CFG
//! actually branches between them. Folding `B` into `A` removes that
//! artifact: `B`'s placeholders are reconciled against `A`'s final stack via
//! [`nebula_ir::Stack::lookup_underflow`], `B`'s nodes move onto the end of
//! `A`'s, and `A` inherits `B`'s terminator and outgoing edges.
//!
//! Runs to a fixpoint — joining can expose a fresh single-entry pair (`A`
//! joined with `B` may now be the sole predecessor of what used to be `B`'s
//! successor), and the spec's testable property is that joining twice
//! equals joining once.

use nebula_ir::{BlockId, Program, SourcePos, Terminator};

/// Joins every eligible single-entry block pair, repeating until no more
/// apply. Returns whether anything changed.
pub fn join_simple_entries(program: &mut Program) -> bool {
    let mut changed = false;
    loop {
        let candidate = program.block_ids().into_iter().find(|&b| is_joinable(program, b));
        let Some(b) = candidate else {
            return changed;
        };
        join_one(program, b);
        changed = true;
    }
}

fn is_joinable(program: &Program, b: BlockId) -> bool {
    let entries = &program.block(b).entries;
    if entries.len() != 1 {
        return false;
    }
    let a = entries[0];
    if a == b {
        return false; // a self-loop is vacuously "single-entry" but must not be joined into itself
    }
    matches!(program.block(a).terminator, Some(Terminator::Jmp(t)) if t == b)
}

fn join_one(program: &mut Program, b: BlockId) {
    let a = program.block(b).entries[0];
    let pos = SourcePos::default();

    // Reconcile B's underflow placeholders against A's stack before A's
    // own `vals` are touched — `lookup_underflow` needs A's vals as they
    // stood at the end of A alone.
    let b_stack = program.block(b).stack.clone();
    let mut a_stack = std::mem::take(&mut program.block_mut(a).stack);
    let replacements = b_stack.lookup_underflow(&mut a_stack, program, a, pos);
    for (old, new) in replacements {
        program.replace_uses(old, new);
        // `old` was B's own `LoadStack` placeholder; once every operand use
        // of it has been rewritten to `new`, the `LoadStack` that defined
        // it is dead weight in the merged block (unless B's own `vals`
        // still held the placeholder directly, e.g. via a `Dup`/`Copy`
        // that never got consumed — that path survives the join un-rewritten
        // and must keep its definer).
        if !b_stack.vals.contains(&old) && program.uses(old).is_empty() {
            if let Some(definer) = program.value(old).definer() {
                program.remove_inst(definer);
            }
        }
    }

    // Compose the two stacks' net effect: whatever of A's vals B's own
    // pops didn't consume survives underneath B's pushes; anything B dug
    // past that digs further into A's own caller.
    let len_a = a_stack.vals.len() as u32;
    if b_stack.pops <= len_a {
        let keep = (len_a - b_stack.pops) as usize;
        a_stack.vals.truncate(keep);
        a_stack.vals.extend(b_stack.vals);
    } else {
        a_stack.pops += b_stack.pops - len_a;
        a_stack.vals = b_stack.vals;
    }
    program.block_mut(a).stack = a_stack;

    // Move B's body onto the end of A's, and give A B's terminator.
    let b_nodes = program.block(b).nodes.clone();
    program.block_mut(a).nodes.extend(b_nodes);
    let b_terminator = program.block(b).terminator;

    // Relink B's direct successors' `entries` (and, for a nested Call, the
    // callee's `callers`) to point at A instead of the about-to-vanish B.
    if let Some(term) = b_terminator {
        for succ in term.direct_successors() {
            for e in program.block_mut(succ).entries.iter_mut() {
                if *e == b {
                    *e = a;
                }
            }
        }
        if let Terminator::Call(dest) = term {
            for c in program.block_mut(dest).callers.iter_mut() {
                if *c == b {
                    *c = a;
                }
            }
        }
        // `entries`/`callers` were just relinked by hand above, so assign
        // the terminator directly rather than going through
        // `set_terminator` (which would try to push `a` again).
        program.block_mut(a).terminator = Some(term);
    }

    program.remove_block(b);
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebula_ir::{BigInt, InstKind};

    #[test]
    fn a_bare_fallthrough_pair_joins_into_one_block() {
        let mut program = Program::new("t");
        let a = program.entry();
        let b = program.create_block();
        let pos = SourcePos::default();
        let v = program.lookup_const(BigInt::new(1));
        program.push_inst(
            a,
            pos,
            InstKind::Print {
                mode: nebula_ir::PrintMode::PrintInt,
                val: v,
            },
        );
        program.set_terminator(a, Terminator::Jmp(b));
        program.push_inst(b, pos, InstKind::Flush);
        program.set_terminator(b, Terminator::Exit);

        assert!(join_simple_entries(&mut program));
        assert_eq!(program.block_ids(), vec![a]);
        assert_eq!(program.block(a).nodes.len(), 2);
        assert_eq!(program.block(a).terminator, Some(Terminator::Exit));
    }

    #[test]
    fn underflow_in_the_joined_block_resolves_against_the_predecessors_stack() {
        let mut program = Program::new("t");
        let a = program.entry();
        let b = program.create_block();
        let pos = SourcePos::default();
        let pushed = program.lookup_const(BigInt::new(7));
        program.block_mut(a).stack.push(pushed);
        program.set_terminator(a, Terminator::Jmp(b));

        // B pops one value with nothing of its own pushed — an underflow
        // that should resolve against A's `pushed` once joined.
        let popped = crate::builder::stack_pop(&mut program, b, pos);
        program.push_inst(
            b,
            pos,
            InstKind::Print { mode: nebula_ir::PrintMode::PrintInt, val: popped },
        );
        program.set_terminator(b, Terminator::Exit);

        join_simple_entries(&mut program);
        assert_eq!(program.block_ids(), vec![a]);
        match &program.inst(program.block(a).nodes.last().copied().unwrap()).kind {
            InstKind::Print { val, .. } => assert_eq!(*val, pushed),
            other => panic!("expected Print, got {other:?}"),
        }
        assert!(program.block(a).stack.vals.is_empty());
    }

    #[test]
    fn a_block_with_two_entries_is_not_joined() {
        let mut program = Program::new("t");
        let a = program.entry();
        let b = program.create_block();
        let c = program.create_block();
        program.set_terminator(a, Terminator::Jmp(b));
        program.set_terminator(c, Terminator::Jmp(b));
        program.set_terminator(b, Terminator::Exit);

        assert!(!join_simple_entries(&mut program));
        assert_eq!(program.block_ids().len(), 3);
    }
}
