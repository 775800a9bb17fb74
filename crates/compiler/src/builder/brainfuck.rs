//! Brainfuck IR builder (§4.E) — same shape as the Whitespace builder, but
//! with no symbolic stack: the data pointer and tape are two heap regions,
//! and each of the 8 tokens lowers into a fixed instruction sequence.
//!
//! Heap layout: address `0` holds the data pointer's current value; the
//! tape itself starts at address `1` (`cell addr = 1 + ptr`), so every
//! cell access costs one extra `LoadHeap`/`Add` over the pointer register —
//! a direct reading of "the data-pointer cell and tape are modeled as two
//! heap locations", not the cheapest possible lowering.

use super::insert_stack_checks;
use crate::error::{BuildError, BuildErrorKind};
use crate::token::{BfKind, BfToken};
use nebula_ir::{
    BigInt, BinOp, BlockId, CondOp, InstKind, PrintMode, Program, ReadMode, SourcePos, Terminator,
    ValueId,
};

struct OpenBracket {
    loop_end: BlockId,
    body_start: BlockId,
    pos: SourcePos,
}

pub fn build_brainfuck(tokens: &[BfToken]) -> (Program, Vec<BuildError>) {
    let mut program = Program::new("brainfuck");
    let mut errors = Vec::new();
    let mut current = program.entry();
    let mut open: Vec<OpenBracket> = Vec::new();

    for tok in tokens {
        let pos = tok.pos;
        match tok.kind {
            BfKind::IncPtr | BfKind::DecPtr => {
                let ptr = load_ptr(&mut program, current, pos);
                let one = program.lookup_const(BigInt::new(1));
                let op = if tok.kind == BfKind::IncPtr {
                    BinOp::Add
                } else {
                    BinOp::Sub
                };
                let updated = emit_binary(&mut program, current, pos, op, ptr, one);
                store_ptr(&mut program, current, pos, updated);
            }
            BfKind::IncData | BfKind::DecData => {
                let addr = cell_addr(&mut program, current, pos);
                let val = emit_load_heap(&mut program, current, pos, addr);
                let one = program.lookup_const(BigInt::new(1));
                let op = if tok.kind == BfKind::IncData {
                    BinOp::Add
                } else {
                    BinOp::Sub
                };
                let updated = emit_binary(&mut program, current, pos, op, val, one);
                program.push_inst(
                    current,
                    pos,
                    InstKind::StoreHeap {
                        addr,
                        val: updated,
                    },
                );
            }
            BfKind::Print => {
                let addr = cell_addr(&mut program, current, pos);
                let val = emit_load_heap(&mut program, current, pos, addr);
                program.push_inst(
                    current,
                    pos,
                    InstKind::Print {
                        mode: PrintMode::PrintChar,
                        val,
                    },
                );
                program.push_inst(current, pos, InstKind::Flush);
            }
            BfKind::Read => {
                let addr = cell_addr(&mut program, current, pos);
                let inst_id = program.peek_next_inst_id();
                let result = program.new_ssa_value(inst_id);
                program.push_inst(
                    current,
                    pos,
                    InstKind::Read {
                        mode: ReadMode::ReadChar,
                        result,
                    },
                );
                program.push_inst(current, pos, InstKind::StoreHeap { addr, val: result });
            }
            BfKind::Bracket => {
                let addr = cell_addr(&mut program, current, pos);
                let val = emit_load_heap(&mut program, current, pos, addr);
                let body_start = program.create_block();
                let loop_end = program.reserve_block();
                program.set_terminator(
                    current,
                    Terminator::JmpCond {
                        op: CondOp::Jz,
                        cond: val,
                        then_blk: loop_end,
                        else_blk: body_start,
                    },
                );
                open.push(OpenBracket {
                    loop_end,
                    body_start,
                    pos,
                });
                current = body_start;
            }
            BfKind::EndBracket => match open.pop() {
                Some(bracket) => {
                    let addr = cell_addr(&mut program, current, pos);
                    let val = emit_load_heap(&mut program, current, pos, addr);
                    program.set_terminator(
                        current,
                        Terminator::JmpCond {
                            op: CondOp::Jz,
                            cond: val,
                            then_blk: bracket.loop_end,
                            else_blk: bracket.body_start,
                        },
                    );
                    program.activate_block(bracket.loop_end);
                    current = bracket.loop_end;
                }
                None => errors.push(BuildError::new(BuildErrorKind::UnmatchedBracket, pos)),
            },
        }
    }

    for bracket in open {
        errors.push(BuildError::new(BuildErrorKind::UnmatchedBracket, bracket.pos));
    }

    if program.block(current).terminator.is_none() {
        program.set_terminator(current, Terminator::Exit);
    }

    insert_stack_checks(&mut program);
    (program, errors)
}

fn load_ptr(program: &mut Program, block: BlockId, pos: SourcePos) -> ValueId {
    let zero = program.lookup_const(BigInt::zero());
    emit_load_heap(program, block, pos, zero)
}

fn store_ptr(program: &mut Program, block: BlockId, pos: SourcePos, val: ValueId) {
    let zero = program.lookup_const(BigInt::zero());
    program.push_inst(block, pos, InstKind::StoreHeap { addr: zero, val });
}

/// `1 + ptr` — the heap address of the cell currently under the pointer.
fn cell_addr(program: &mut Program, block: BlockId, pos: SourcePos) -> ValueId {
    let ptr = load_ptr(program, block, pos);
    let one = program.lookup_const(BigInt::new(1));
    emit_binary(program, block, pos, BinOp::Add, ptr, one)
}

fn emit_load_heap(program: &mut Program, block: BlockId, pos: SourcePos, addr: ValueId) -> ValueId {
    let inst_id = program.peek_next_inst_id();
    let result = program.new_ssa_value(inst_id);
    program.push_inst(block, pos, InstKind::LoadHeap { addr, result });
    result
}

fn emit_binary(
    program: &mut Program,
    block: BlockId,
    pos: SourcePos,
    op: BinOp,
    lhs: ValueId,
    rhs: ValueId,
) -> ValueId {
    let inst_id = program.peek_next_inst_id();
    let result = program.new_ssa_value(inst_id);
    program.push_inst(
        block,
        pos,
        InstKind::Binary {
            op,
            lhs,
            rhs,
            result,
        },
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: BfKind) -> BfToken {
        BfToken::new(kind, SourcePos::default())
    }

    #[test]
    fn increment_and_print_lowers_to_heap_ops_and_a_print() {
        let tokens = vec![tok(BfKind::IncData), tok(BfKind::Print)];
        let (program, errors) = build_brainfuck(&tokens);
        assert!(errors.is_empty());
        let entry = program.entry();
        let kinds: Vec<_> = program
            .block(entry)
            .nodes
            .iter()
            .map(|id| std::mem::discriminant(&program.inst(*id).kind))
            .collect();
        // load ptr, load ptr, add 1, load cell, add 1, store cell,
        // load ptr, add 1, load cell, print, flush
        assert!(kinds.len() >= 8);
        assert!(matches!(
            program.block(entry).nodes.last().map(|id| &program.inst(*id).kind),
            Some(InstKind::Flush)
        ));
    }

    #[test]
    fn balanced_loop_produces_two_conditional_branches() {
        let tokens = vec![
            tok(BfKind::Bracket),
            tok(BfKind::DecData),
            tok(BfKind::EndBracket),
        ];
        let (program, errors) = build_brainfuck(&tokens);
        assert!(errors.is_empty());
        let entry = program.entry();
        assert!(matches!(
            program.block(entry).terminator,
            Some(Terminator::JmpCond { .. })
        ));
        // three blocks: entry (check), body, loop end
        assert_eq!(program.block_ids().len(), 3);
    }

    #[test]
    fn unmatched_open_bracket_is_reported() {
        let tokens = vec![tok(BfKind::Bracket), tok(BfKind::IncData)];
        let (_program, errors) = build_brainfuck(&tokens);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, BuildErrorKind::UnmatchedBracket);
    }

    #[test]
    fn unmatched_close_bracket_is_reported() {
        let tokens = vec![tok(BfKind::EndBracket)];
        let (_program, errors) = build_brainfuck(&tokens);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, BuildErrorKind::UnmatchedBracket);
    }
}
