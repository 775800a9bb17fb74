//! IR builder (§4.E): lowers a front-end token stream into an SSA
//! [`nebula_ir::Program`].
//!
//! Both front-ends share the same shape — a label/bracket pre-pass, then a
//! main sweep driven by a "current block" pointer — but differ enough in
//! their token vocabularies that each gets its own module. What they share
//! lives here: stack-op helpers that route around the borrow-checker
//! friction of a `Stack` living inside the `BasicBlock` it needs a `&mut
//! Program` alongside.

pub mod brainfuck;
pub mod whitespace;

pub use brainfuck::build_brainfuck;
pub use whitespace::build_whitespace;

use nebula_ir::{BlockId, Program, SourcePos, Stack, Terminator, ValueId};
use std::collections::HashSet;

/// Lends a block's `Stack` out for the duration of `f`, so `f` can hold a
/// `&mut Stack` and a `&mut Program` at the same time without aliasing the
/// `Program` that owns the block the stack lives in.
fn with_stack<R>(
    program: &mut Program,
    block: BlockId,
    f: impl FnOnce(&mut Stack, &mut Program, BlockId) -> R,
) -> R {
    let mut stack = std::mem::take(&mut program.block_mut(block).stack);
    let result = f(&mut stack, program, block);
    program.block_mut(block).stack = stack;
    result
}

pub(crate) fn stack_push(program: &mut Program, block: BlockId, v: ValueId) {
    program.block_mut(block).stack.push(v);
}

pub(crate) fn stack_pop(program: &mut Program, block: BlockId, pos: SourcePos) -> ValueId {
    with_stack(program, block, |s, p, b| s.pop(p, b, pos))
}

pub(crate) fn stack_dup(program: &mut Program, block: BlockId, pos: SourcePos) {
    with_stack(program, block, |s, p, b| s.dup(p, b, pos))
}

pub(crate) fn stack_copy(program: &mut Program, block: BlockId, pos: SourcePos, n: u32) {
    with_stack(program, block, |s, p, b| s.copy(p, b, pos, n))
}

pub(crate) fn stack_swap(program: &mut Program, block: BlockId, pos: SourcePos) {
    with_stack(program, block, |s, p, b| s.swap(p, b, pos))
}

pub(crate) fn stack_drop(program: &mut Program, block: BlockId, pos: SourcePos) {
    with_stack(program, block, |s, p, b| s.drop(p, b, pos))
}

pub(crate) fn stack_slide(program: &mut Program, block: BlockId, pos: SourcePos, n: u32) {
    with_stack(program, block, |s, p, b| s.slide(p, b, pos, n))
}

/// Propagates `callers` through a subroutine's body so that every block
/// that might terminate in `Ret` — not just a `Call`'s immediate
/// destination — knows who to return to (§4.C, `BasicBlock::exits`).
/// Walks `Jmp`/`JmpCond` successors and, for a nested `Call`, only its own
/// fallthrough continuation (not its callee, which gets its own callers
/// when that call site is visited in turn); stops at `Ret`/`Exit`.
pub(crate) fn propagate_callers(program: &mut Program) {
    let call_sites: Vec<(BlockId, BlockId)> = program
        .block_ids()
        .into_iter()
        .filter_map(|id| match program.block(id).terminator {
            Some(Terminator::Call(dest)) => Some((id, dest)),
            _ => None,
        })
        .collect();
    for (caller, dest) in call_sites {
        mark_callers(program, dest, caller, &mut HashSet::new());
    }
}

fn mark_callers(program: &mut Program, block: BlockId, caller: BlockId, visited: &mut HashSet<BlockId>) {
    if !visited.insert(block) {
        return;
    }
    if !program.block(block).callers.contains(&caller) {
        program.block_mut(block).callers.push(caller);
    }
    match program.block(block).terminator {
        Some(Terminator::Jmp(t)) => mark_callers(program, t, caller, visited),
        Some(Terminator::JmpCond { then_blk, else_blk, .. }) => {
            mark_callers(program, then_blk, caller, visited);
            mark_callers(program, else_blk, caller, visited);
        }
        Some(Terminator::Call(_)) => {
            if let Some(next) = program.block(block).next {
                mark_callers(program, next, caller, visited);
            }
        }
        Some(Terminator::Ret) | Some(Terminator::Exit) | None => {}
    }
}

/// Prepends `CheckStackStmt(access)` to every block whose symbolic stack
/// recorded a nonzero peak read depth. Shared by both front-ends' final
/// build step (§4.E, end) — the join pass may later re-run this after
/// `lookup_underflow` changes a surviving block's `access`.
pub(crate) fn insert_stack_checks(program: &mut Program) {
    for id in program.block_ids() {
        let access = program.block(id).stack.access;
        if access > 0 {
            program.prepend_inst(
                id,
                SourcePos::default(),
                nebula_ir::InstKind::CheckStack { access },
            );
        }
    }
}
