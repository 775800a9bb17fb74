//! Constant folding, algebraic identities and strength reduction (§4.F).
//!
//! Runs per block, in node order, in place. Eliminated instructions are
//! detached via `replace_self`/`remove_inst`; in-place rewrites (`0-x ->
//! Neg(x)`, `x*8 -> x<<3`) go through [`rewrite_kind`] so operand use
//! records stay correct even though the instruction's shape changes.

use nebula_ir::{BigInt, BinOp, InstId, InstKind, Program, UnOp, ValueId};

/// Runs [`fold_once`] until it reports no change — the fixpoint the spec's
/// testable property requires (folding twice == folding once).
pub fn run_to_fixpoint(program: &mut Program) {
    while fold_once(program) {}
}

/// A single pass over every block's nodes. Returns whether anything changed.
pub fn fold_once(program: &mut Program) -> bool {
    let mut changed = false;
    for block in program.block_ids() {
        let nodes = program.block(block).nodes.clone();
        for inst_id in nodes {
            if fold_inst(program, inst_id) {
                changed = true;
            }
        }
    }
    changed
}

fn fold_inst(program: &mut Program, inst_id: InstId) -> bool {
    match program.inst(inst_id).kind.clone() {
        InstKind::Binary { op, lhs, rhs, result } => fold_binary(program, inst_id, op, lhs, rhs, result),
        InstKind::Unary { op: UnOp::Neg, val, result } => fold_neg(program, inst_id, val, result),
        _ => false,
    }
}

fn const_of(program: &Program, v: ValueId) -> Option<BigInt> {
    program.value(v).as_const_int().cloned()
}

fn eliminate(program: &mut Program, inst_id: InstId, with: ValueId) {
    program.replace_self(inst_id, with);
    program.remove_inst(inst_id);
}

fn rewrite_kind(program: &mut Program, inst_id: InstId, new_kind: InstKind) {
    program.clear_operands(inst_id);
    program.inst_mut(inst_id).kind = new_kind;
    let operands = program.inst(inst_id).operands();
    for (idx, v) in operands {
        program.add_use(v, inst_id, idx);
    }
}

fn fold_neg(program: &mut Program, inst_id: InstId, val: ValueId, _result: ValueId) -> bool {
    let Some(n) = const_of(program, val) else {
        return false;
    };
    let folded = program.lookup_const(n.neg());
    eliminate(program, inst_id, folded);
    true
}

fn fold_binary(
    program: &mut Program,
    inst_id: InstId,
    op: BinOp,
    lhs: ValueId,
    rhs: ValueId,
    result: ValueId,
) -> bool {
    let lhs_const = const_of(program, lhs);
    let rhs_const = const_of(program, rhs);

    if let (Some(l), Some(r)) = (&lhs_const, &rhs_const) {
        if matches!(op, BinOp::Div | BinOp::Mod) && r.is_zero() {
            return false; // runtime trap, never folded away
        }
        let computed = apply(op, l, r);
        let folded = program.lookup_const(computed);
        eliminate(program, inst_id, folded);
        return true;
    }

    if let Some(l) = &lhs_const {
        if fold_lhs_const(program, inst_id, op, l, rhs) {
            return true;
        }
    }

    if let Some(r) = &rhs_const {
        if fold_rhs_const(program, inst_id, op, lhs, r, result) {
            return true;
        }
    }

    if lhs == rhs {
        return fold_equal_operands(program, inst_id, op);
    }

    false
}

fn apply(op: BinOp, l: &BigInt, r: &BigInt) -> BigInt {
    match op {
        BinOp::Add => l.add(r),
        BinOp::Sub => l.sub(r),
        BinOp::Mul => l.mul(r),
        BinOp::Div => l.div(r),
        BinOp::Mod => l.rem(r),
        BinOp::And => l.and(r),
        BinOp::Or => l.or(r),
        BinOp::Xor => l.xor(r),
        BinOp::Shl => l.shl(r.to_shift_amount().expect("shift overflow")),
        BinOp::AShr | BinOp::LShr => l.ashr(r.to_shift_amount().expect("shift overflow")),
    }
}

fn fold_lhs_const(program: &mut Program, inst_id: InstId, op: BinOp, l: &BigInt, rhs: ValueId) -> bool {
    let sign = l.sign();
    match op {
        BinOp::Add if sign == 0 => eliminate_with(program, inst_id, rhs),
        BinOp::Sub if sign == 0 => {
            rewrite_kind(
                program,
                inst_id,
                InstKind::Unary {
                    op: UnOp::Neg,
                    val: rhs,
                    result: program.inst(inst_id).defined_value().unwrap(),
                },
            );
            true
        }
        BinOp::Mul if sign == 0 => eliminate_with_zero(program, inst_id),
        BinOp::Div if sign == 0 => eliminate_with_zero(program, inst_id),
        BinOp::Mod if sign == 0 => eliminate_with_zero(program, inst_id),
        BinOp::Mul if *l == BigInt::new(1) => eliminate_with(program, inst_id, rhs),
        BinOp::Div if *l == BigInt::new(1) => eliminate_with(program, inst_id, rhs),
        BinOp::Mul if *l == BigInt::new(-1) => negate_in_place(program, inst_id, rhs),
        _ => false,
    }
}

fn fold_rhs_const(
    program: &mut Program,
    inst_id: InstId,
    op: BinOp,
    lhs: ValueId,
    r: &BigInt,
    result: ValueId,
) -> bool {
    match op {
        BinOp::Add if r.is_zero() => eliminate_with(program, inst_id, lhs),
        BinOp::Sub if r.is_zero() => eliminate_with(program, inst_id, lhs),
        BinOp::Div if *r == BigInt::new(1) => eliminate_with(program, inst_id, lhs),
        BinOp::Mul if *r == BigInt::new(1) => eliminate_with(program, inst_id, lhs),
        BinOp::Mul if r.is_zero() => eliminate_with_zero(program, inst_id),
        BinOp::Mod if *r == BigInt::new(1) => eliminate_with_zero(program, inst_id),
        BinOp::Mod if *r == BigInt::new(-1) => eliminate_with_zero(program, inst_id),
        BinOp::Mul if *r == BigInt::new(-1) => negate_in_place(program, inst_id, lhs),
        BinOp::Div if *r == BigInt::new(-1) => negate_in_place(program, inst_id, lhs),
        BinOp::Div | BinOp::Mod if r.is_zero() => false, // runtime trap, preserved
        BinOp::Mul if r.sign() > 0 && r.is_power_of_two() => {
            let shift = program.lookup_const(BigInt::from_u64(r.trailing_zero_bits()));
            rewrite_kind(
                program,
                inst_id,
                InstKind::Binary {
                    op: BinOp::Shl,
                    lhs,
                    rhs: shift,
                    result,
                },
            );
            true
        }
        BinOp::Div if r.sign() > 0 && r.is_power_of_two() => {
            let shift = program.lookup_const(BigInt::from_u64(r.trailing_zero_bits()));
            rewrite_kind(
                program,
                inst_id,
                InstKind::Binary {
                    op: BinOp::AShr,
                    lhs,
                    rhs: shift,
                    result,
                },
            );
            true
        }
        BinOp::Mod if r.sign() > 0 && r.is_power_of_two() => {
            let mask = program.lookup_const(r.sub(&BigInt::new(1)));
            rewrite_kind(
                program,
                inst_id,
                InstKind::Binary {
                    op: BinOp::And,
                    lhs,
                    rhs: mask,
                    result,
                },
            );
            true
        }
        _ => false,
    }
}

fn fold_equal_operands(program: &mut Program, inst_id: InstId, op: BinOp) -> bool {
    match op {
        BinOp::Sub => eliminate_with_zero(program, inst_id),
        BinOp::Mod => eliminate_with_zero(program, inst_id),
        BinOp::Div => {
            let one = program.lookup_const(BigInt::new(1));
            eliminate(program, inst_id, one);
            true
        }
        _ => false,
    }
}

fn eliminate_with(program: &mut Program, inst_id: InstId, with: ValueId) -> bool {
    eliminate(program, inst_id, with);
    true
}

fn eliminate_with_zero(program: &mut Program, inst_id: InstId) -> bool {
    let zero = program.lookup_const(BigInt::zero());
    eliminate(program, inst_id, zero);
    true
}

fn negate_in_place(program: &mut Program, inst_id: InstId, val: ValueId) -> bool {
    let result = program.inst(inst_id).defined_value().unwrap();
    rewrite_kind(
        program,
        inst_id,
        InstKind::Unary {
            op: UnOp::Neg,
            val,
            result,
        },
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebula_ir::{BinOp, SourcePos};

    fn emit_binary(program: &mut Program, block: nebula_ir::BlockId, op: BinOp, lhs: ValueId, rhs: ValueId) -> (InstId, ValueId) {
        let id = program.peek_next_inst_id();
        let result = program.new_ssa_value(id);
        let pushed = program.push_inst(
            block,
            SourcePos::default(),
            InstKind::Binary { op, lhs, rhs, result },
        );
        (pushed, result)
    }

    #[test]
    fn both_constant_folds_to_a_single_const() {
        let mut program = Program::new("t");
        let block = program.entry();
        let a = program.lookup_const(BigInt::new(3));
        let b = program.lookup_const(BigInt::new(4));
        let (id, _result) = emit_binary(&mut program, block, BinOp::Add, a, b);
        run_to_fixpoint(&mut program);
        assert!(!program.block(block).nodes.contains(&id));
        assert!(program.block(block).nodes.is_empty());
    }

    #[test]
    fn multiply_by_power_of_two_becomes_a_shift() {
        let mut program = Program::new("t");
        let block = program.entry();
        let pos = SourcePos::default();
        let read_id = program.peek_next_inst_id();
        let x = program.new_ssa_value(read_id);
        program.push_inst(
            block,
            pos,
            InstKind::Read {
                mode: nebula_ir::ReadMode::ReadInt,
                result: x,
            },
        );
        let eight = program.lookup_const(BigInt::new(8));
        let (id, _) = emit_binary(&mut program, block, BinOp::Mul, x, eight);
        run_to_fixpoint(&mut program);
        match &program.inst(id).kind {
            InstKind::Binary { op: BinOp::Shl, rhs, .. } => {
                assert_eq!(program.value(*rhs).as_const_int(), Some(&BigInt::new(3)));
            }
            other => panic!("expected Shl, got {other:?}"),
        }
    }

    #[test]
    fn divide_by_zero_constant_is_preserved() {
        let mut program = Program::new("t");
        let block = program.entry();
        let pos = SourcePos::default();
        let read_id = program.peek_next_inst_id();
        let x = program.new_ssa_value(read_id);
        program.push_inst(
            block,
            pos,
            InstKind::Read {
                mode: nebula_ir::ReadMode::ReadInt,
                result: x,
            },
        );
        let zero = program.lookup_const(BigInt::zero());
        let (id, _) = emit_binary(&mut program, block, BinOp::Div, x, zero);
        run_to_fixpoint(&mut program);
        assert!(program.block(block).nodes.contains(&id));
        assert!(matches!(program.inst(id).kind, InstKind::Binary { op: BinOp::Div, .. }));
    }

    #[test]
    fn x_minus_x_folds_to_zero() {
        let mut program = Program::new("t");
        let block = program.entry();
        let pos = SourcePos::default();
        let read_id = program.peek_next_inst_id();
        let x = program.new_ssa_value(read_id);
        program.push_inst(
            block,
            pos,
            InstKind::Read {
                mode: nebula_ir::ReadMode::ReadInt,
                result: x,
            },
        );
        let (id, _) = emit_binary(&mut program, block, BinOp::Sub, x, x);
        run_to_fixpoint(&mut program);
        assert!(!program.block(block).nodes.contains(&id));
    }
}
