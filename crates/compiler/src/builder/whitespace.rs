//! Whitespace IR builder (§4.E, the richer case).

use super::{
    insert_stack_checks, propagate_callers, stack_copy, stack_drop, stack_dup, stack_pop,
    stack_push, stack_slide, stack_swap,
};
use crate::error::{BuildError, BuildErrorKind};
use crate::token::{WsKind, WsToken};
use nebula_ir::{
    BigInt, BinOp, BlockId, CondOp, InstKind, PrintMode, Program, ReadMode, SourcePos, Terminator,
};
use std::collections::HashMap;

/// Builds an SSA program from a Whitespace token stream. Never aborts on a
/// malformed token — it records a [`BuildError`] and keeps going, so the
/// returned program may be partial; callers decide what to do with a
/// non-empty error list.
pub fn build_whitespace(tokens: &[WsToken]) -> (Program, Vec<BuildError>) {
    let mut program = Program::new("whitespace");
    let mut errors = Vec::new();

    let labels = label_prepass(&mut program, tokens, &mut errors);
    let mut current = program.entry();

    for tok in tokens {
        let pos = tok.pos;
        match tok.kind {
            WsKind::Push => match &tok.arg {
                Some(n) => {
                    let c = program.lookup_const(n.clone());
                    stack_push(&mut program, current, c);
                }
                None => errors.push(BuildError::new(BuildErrorKind::InvalidArgument, pos)),
            },
            WsKind::Dup => stack_dup(&mut program, current, pos),
            WsKind::Copy => {
                if let Some(n) = resolve_u32(&tok.arg, pos, &mut errors) {
                    stack_copy(&mut program, current, pos, n);
                }
            }
            WsKind::Swap => stack_swap(&mut program, current, pos),
            WsKind::Drop => stack_drop(&mut program, current, pos),
            WsKind::Slide => {
                if let Some(n) = resolve_u32(&tok.arg, pos, &mut errors) {
                    stack_slide(&mut program, current, pos, n);
                }
            }
            WsKind::Add | WsKind::Sub | WsKind::Mul | WsKind::Div | WsKind::Mod => {
                let op = match tok.kind {
                    WsKind::Add => BinOp::Add,
                    WsKind::Sub => BinOp::Sub,
                    WsKind::Mul => BinOp::Mul,
                    WsKind::Div => BinOp::Div,
                    WsKind::Mod => BinOp::Mod,
                    _ => unreachable!(),
                };
                let rhs = stack_pop(&mut program, current, pos);
                let lhs = stack_pop(&mut program, current, pos);
                let inst_id = program.peek_next_inst_id();
                let result = program.new_ssa_value(inst_id);
                program.push_inst(
                    current,
                    pos,
                    InstKind::Binary {
                        op,
                        lhs,
                        rhs,
                        result,
                    },
                );
                stack_push(&mut program, current, result);
            }
            WsKind::Store => {
                let val = stack_pop(&mut program, current, pos);
                let addr = stack_pop(&mut program, current, pos);
                program.push_inst(current, pos, InstKind::StoreHeap { addr, val });
            }
            WsKind::Retrieve => {
                let addr = stack_pop(&mut program, current, pos);
                let inst_id = program.peek_next_inst_id();
                let result = program.new_ssa_value(inst_id);
                program.push_inst(current, pos, InstKind::LoadHeap { addr, result });
                stack_push(&mut program, current, result);
            }
            WsKind::Label => {
                if let Some(target) = resolve_label_target(&labels, &tok.arg, pos, &mut errors) {
                    if program.block(current).terminator.is_none() {
                        program.set_terminator(current, Terminator::Jmp(target));
                    }
                    program.activate_block(target);
                    current = target;
                }
            }
            WsKind::Call => {
                if let Some(dest) = resolve_label_target(&labels, &tok.arg, pos, &mut errors) {
                    let fallthrough = program.create_block();
                    program.set_terminator(current, Terminator::Call(dest));
                    current = fallthrough;
                }
            }
            WsKind::Jmp => {
                if let Some(dest) = resolve_label_target(&labels, &tok.arg, pos, &mut errors) {
                    program.set_terminator(current, Terminator::Jmp(dest));
                    current = program.create_block();
                }
            }
            WsKind::Jz | WsKind::Jn => {
                let cond = stack_pop(&mut program, current, pos);
                if let Some(dest) = resolve_label_target(&labels, &tok.arg, pos, &mut errors) {
                    let op = if tok.kind == WsKind::Jz {
                        CondOp::Jz
                    } else {
                        CondOp::Jn
                    };
                    let fallthrough = program.create_block();
                    program.set_terminator(
                        current,
                        Terminator::JmpCond {
                            op,
                            cond,
                            then_blk: dest,
                            else_blk: fallthrough,
                        },
                    );
                    current = fallthrough;
                }
            }
            WsKind::Ret => {
                program.set_terminator(current, Terminator::Ret);
                current = program.create_block();
            }
            WsKind::End => {
                program.set_terminator(current, Terminator::Exit);
                current = program.create_block();
            }
            WsKind::Printc | WsKind::Printi => {
                let mode = if tok.kind == WsKind::Printc {
                    PrintMode::PrintChar
                } else {
                    PrintMode::PrintInt
                };
                let val = stack_pop(&mut program, current, pos);
                program.push_inst(current, pos, InstKind::Print { mode, val });
                program.push_inst(current, pos, InstKind::Flush);
            }
            WsKind::Readc | WsKind::Readi => {
                let mode = if tok.kind == WsKind::Readc {
                    ReadMode::ReadChar
                } else {
                    ReadMode::ReadInt
                };
                let inst_id = program.peek_next_inst_id();
                let result = program.new_ssa_value(inst_id);
                program.push_inst(current, pos, InstKind::Read { mode, result });
                stack_push(&mut program, current, result);
            }
        }
    }

    if program.block(current).terminator.is_none() {
        program.set_terminator(current, Terminator::Exit);
    }

    propagate_callers(&mut program);
    insert_stack_checks(&mut program);
    (program, errors)
}

/// Scans the token stream once, allocating (but not yet linking) a block
/// for every distinct `Label`. The main sweep links each such block into
/// `program`'s source order the moment it actually reaches that label's
/// token, so `prev`/`next` still reflect true textual adjacency even though
/// blocks for forward-referenced labels are allocated up front.
fn label_prepass(
    program: &mut Program,
    tokens: &[WsToken],
    errors: &mut Vec<BuildError>,
) -> HashMap<BigInt, BlockId> {
    let mut labels = HashMap::new();
    for tok in tokens {
        if tok.kind != WsKind::Label {
            continue;
        }
        match &tok.arg {
            Some(n) => {
                if labels.contains_key(n) {
                    errors.push(BuildError::new(
                        BuildErrorKind::DuplicateLabel(n.to_string()),
                        tok.pos,
                    ));
                } else {
                    let block = program.reserve_block();
                    labels.insert(n.clone(), block);
                }
            }
            None => errors.push(BuildError::new(BuildErrorKind::InvalidArgument, tok.pos)),
        }
    }
    labels
}

fn resolve_label_target(
    labels: &HashMap<BigInt, BlockId>,
    arg: &Option<BigInt>,
    pos: SourcePos,
    errors: &mut Vec<BuildError>,
) -> Option<BlockId> {
    match arg {
        Some(n) => match labels.get(n) {
            Some(&block) => Some(block),
            None => {
                errors.push(BuildError::new(
                    BuildErrorKind::UndefinedLabel(n.to_string()),
                    pos,
                ));
                None
            }
        },
        None => {
            errors.push(BuildError::new(BuildErrorKind::InvalidArgument, pos));
            None
        }
    }
}

fn resolve_u32(arg: &Option<BigInt>, pos: SourcePos, errors: &mut Vec<BuildError>) -> Option<u32> {
    let n = match arg {
        Some(n) => n,
        None => {
            errors.push(BuildError::new(BuildErrorKind::InvalidArgument, pos));
            return None;
        }
    };
    match n.to_i64().and_then(|v| u32::try_from(v).ok()) {
        Some(v) => Some(v),
        None => {
            errors.push(BuildError::new(BuildErrorKind::InvalidArgument, pos));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::WsToken;

    fn tok(kind: WsKind, arg: Option<i64>) -> WsToken {
        WsToken::new(kind, arg.map(BigInt::new), SourcePos::default())
    }

    #[test]
    fn push_add_printi_produces_a_single_block() {
        // Push 2, Push 3, Add, Printi, End
        let tokens = vec![
            tok(WsKind::Push, Some(2)),
            tok(WsKind::Push, Some(3)),
            tok(WsKind::Add, None),
            tok(WsKind::Printi, None),
            tok(WsKind::End, None),
        ];
        let (program, errors) = build_whitespace(&tokens);
        assert!(errors.is_empty());
        assert_eq!(program.block_ids().len(), 2); // entry + the dead post-End block
        let entry = program.entry();
        let kinds: Vec<_> = program
            .block(entry)
            .nodes
            .iter()
            .map(|id| &program.inst(*id).kind)
            .collect();
        assert!(matches!(kinds[0], InstKind::Binary { op: BinOp::Add, .. }));
        assert!(matches!(kinds[1], InstKind::Print { .. }));
        assert!(matches!(kinds[2], InstKind::Flush));
        assert_eq!(program.block(entry).terminator, Some(Terminator::Exit));
    }

    #[test]
    fn undefined_label_reference_is_collected_as_an_error() {
        let tokens = vec![tok(WsKind::Jmp, Some(99)), tok(WsKind::End, None)];
        let (_program, errors) = build_whitespace(&tokens);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].kind, BuildErrorKind::UndefinedLabel(_)));
    }

    #[test]
    fn duplicate_label_is_collected_as_an_error() {
        let tokens = vec![
            tok(WsKind::Label, Some(1)),
            tok(WsKind::Label, Some(1)),
            tok(WsKind::End, None),
        ];
        let (_program, errors) = build_whitespace(&tokens);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].kind, BuildErrorKind::DuplicateLabel(_)));
    }

    #[test]
    fn call_splits_the_block_and_registers_the_caller() {
        let tokens = vec![
            tok(WsKind::Call, Some(1)),
            tok(WsKind::End, None),
            tok(WsKind::Label, Some(1)),
            tok(WsKind::Ret, None),
        ];
        let (program, errors) = build_whitespace(&tokens);
        assert!(errors.is_empty());
        let entry = program.entry();
        let label_block = match program.block(entry).terminator {
            Some(Terminator::Call(dest)) => dest,
            other => panic!("expected Call terminator, got {other:?}"),
        };
        assert!(program.block(label_block).callers.contains(&entry));
    }

    #[test]
    fn callers_propagate_through_branches_inside_a_called_subroutine() {
        // A called subroutine that branches before returning: both arms'
        // Ret blocks must resolve back to the call site, not just the
        // subroutine's entry block.
        let tokens = vec![
            tok(WsKind::Call, Some(1)),
            tok(WsKind::End, None),
            tok(WsKind::Label, Some(1)),
            tok(WsKind::Push, Some(0)),
            tok(WsKind::Jz, Some(2)),
            tok(WsKind::Ret, None),
            tok(WsKind::Label, Some(2)),
            tok(WsKind::Ret, None),
        ];
        let (program, errors) = build_whitespace(&tokens);
        assert!(errors.is_empty());
        let entry = program.entry();
        let ret_blocks: Vec<BlockId> = program
            .block_ids()
            .into_iter()
            .filter(|&id| program.block(id).terminator == Some(Terminator::Ret))
            .collect();
        assert_eq!(ret_blocks.len(), 2);
        for id in ret_blocks {
            assert!(
                program.block(id).callers.contains(&entry),
                "block {id:?} should resolve its Ret back to the call site"
            );
        }
    }

    #[test]
    fn underflowing_pop_emits_a_check_stack() {
        // Swap with nothing pushed: both slots underflow.
        let tokens = vec![tok(WsKind::Swap, None), tok(WsKind::End, None)];
        let (program, errors) = build_whitespace(&tokens);
        assert!(errors.is_empty());
        let entry = program.entry();
        match &program.inst(program.block(entry).nodes[0]).kind {
            InstKind::CheckStack { access } => assert_eq!(*access, 2),
            other => panic!("expected CheckStack, got {other:?}"),
        }
    }
}
