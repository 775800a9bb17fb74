//! Per-block dependence graph (§4.F).
//!
//! Two instructions are dependent — must not be reordered past each other
//! by a transform that cares about observable behavior — iff any of:
//!
//! 1. both are I/O (`Print`/`Read`/`Flush`),
//! 2. one is I/O and the other can trap (`Div`/`Mod` with a non-constant or
//!    zero rhs),
//! 3. one transitively reads the other's defined value.
//!
//! The relation is reflexive and symmetric by construction. No pass in this
//! crate currently reorders instructions within a block — `fold` and
//! `strings` replace/delete in place, `join` only concatenates two blocks'
//! node lists — so this module exists as the infrastructure a future
//! reordering transform would consult, exercised here by its own tests.

use nebula_ir::{BinOp, InstId, InstKind, Instruction, Program, ValueId};
use std::collections::HashSet;

pub fn depends(program: &Program, a: InstId, b: InstId) -> bool {
    if a == b {
        return true;
    }
    let ia = program.inst(a);
    let ib = program.inst(b);
    if ia.is_io() && ib.is_io() {
        return true;
    }
    if (ia.is_io() && can_trap(program, ib)) || (ib.is_io() && can_trap(program, ia)) {
        return true;
    }
    references(program, ia, ib) || references(program, ib, ia)
}

fn can_trap(program: &Program, inst: &Instruction) -> bool {
    matches!(
        &inst.kind,
        InstKind::Binary { op: BinOp::Div | BinOp::Mod, rhs, .. }
            if !is_const_nonzero(program, *rhs)
    )
}

fn is_const_nonzero(program: &Program, v: ValueId) -> bool {
    program
        .value(v)
        .as_const_int()
        .map(|n| !n.is_zero())
        .unwrap_or(false)
}

/// Whether `consumer` transitively reads `producer`'s defined value, by
/// walking `consumer`'s operands back through their definers.
fn references(program: &Program, consumer: &Instruction, producer: &Instruction) -> bool {
    let Some(defined) = producer.defined_value() else {
        return false;
    };
    let mut frontier: Vec<ValueId> = consumer.operands().into_iter().map(|(_, v)| v).collect();
    let mut seen = HashSet::new();
    while let Some(v) = frontier.pop() {
        if v == defined {
            return true;
        }
        if !seen.insert(v) {
            continue;
        }
        if let Some(definer) = program.value(v).definer() {
            let di = program.inst(definer);
            frontier.extend(di.operands().into_iter().map(|(_, v)| v));
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebula_ir::{BigInt, PrintMode, ReadMode, SourcePos};

    #[test]
    fn two_prints_are_dependent() {
        let mut program = Program::new("t");
        let block = program.entry();
        let a = program.lookup_const(BigInt::new(1));
        let p1 = program.push_inst(
            block,
            SourcePos::default(),
            InstKind::Print {
                mode: PrintMode::PrintInt,
                val: a,
            },
        );
        let p2 = program.push_inst(
            block,
            SourcePos::default(),
            InstKind::Print {
                mode: PrintMode::PrintInt,
                val: a,
            },
        );
        assert!(depends(&program, p1, p2));
        assert!(depends(&program, p2, p1));
    }

    #[test]
    fn division_by_non_constant_traps_and_depends_on_a_read() {
        let mut program = Program::new("t");
        let block = program.entry();
        let pos = SourcePos::default();
        let read_id = program.peek_next_inst_id();
        let rhs = program.new_ssa_value(read_id);
        program.push_inst(
            block,
            pos,
            InstKind::Read {
                mode: ReadMode::ReadInt,
                result: rhs,
            },
        );
        let lhs = program.lookup_const(BigInt::new(10));
        let div_id = program.peek_next_inst_id();
        let result = program.new_ssa_value(div_id);
        let div = program.push_inst(
            block,
            pos,
            InstKind::Binary {
                op: BinOp::Div,
                lhs,
                rhs,
                result,
            },
        );
        assert!(depends(&program, read_id, div));
    }

    #[test]
    fn unrelated_pure_instructions_are_independent() {
        let mut program = Program::new("t");
        let block = program.entry();
        let pos = SourcePos::default();
        let a = program.lookup_const(BigInt::new(1));
        let b = program.lookup_const(BigInt::new(2));
        let id1 = program.peek_next_inst_id();
        let r1 = program.new_ssa_value(id1);
        let add = program.push_inst(
            block,
            pos,
            InstKind::Binary {
                op: BinOp::Add,
                lhs: a,
                rhs: b,
                result: r1,
            },
        );
        let id2 = program.peek_next_inst_id();
        let r2 = program.new_ssa_value(id2);
        let mul = program.push_inst(
            block,
            pos,
            InstKind::Binary {
                op: BinOp::Mul,
                lhs: a,
                rhs: b,
                result: r2,
            },
        );
        assert!(!depends(&program, add, mul));
    }
}
