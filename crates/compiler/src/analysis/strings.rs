//! Print-string coalescing (§4.F).
//!
//! Collapses a maximal run of constant `Print`s (optionally interleaved
//! with their own `Flush`) into one `Print(PrintString, ConstString(..))`
//! followed by a single `Flush`. Only constant prints participate — a
//! `Print` of a non-constant value (or any other instruction) breaks the
//! run.

use nebula_ir::{InstId, InstKind, Program, PrintMode};

pub fn coalesce_strings(program: &mut Program) {
    for block in program.block_ids() {
        coalesce_block(program, block);
    }
}

fn coalesce_block(program: &mut Program, block: nebula_ir::BlockId) {
    loop {
        let nodes = program.block(block).nodes.clone();
        let Some(run) = find_constant_print_run(program, &nodes) else {
            return;
        };
        if run.len() < 2 {
            return;
        }
        replace_run(program, block, &run);
    }
}

/// A run member: the `Print` instruction id and (if present, immediately
/// following it) its paired `Flush` id.
struct RunMember {
    print: InstId,
    flush: Option<InstId>,
}

fn find_constant_print_run(program: &Program, nodes: &[InstId]) -> Option<Vec<RunMember>> {
    let mut i = 0;
    while i < nodes.len() {
        if is_constant_print(program, nodes[i]) {
            let mut run = Vec::new();
            while i < nodes.len() && is_constant_print(program, nodes[i]) {
                let print = nodes[i];
                let flush = nodes.get(i + 1).copied().filter(|&id| is_flush(program, id));
                if flush.is_some() {
                    i += 2;
                } else {
                    i += 1;
                }
                run.push(RunMember { print, flush });
            }
            if run.len() >= 2 {
                return Some(run);
            }
        } else {
            i += 1;
        }
    }
    None
}

fn is_constant_print(program: &Program, id: InstId) -> bool {
    match &program.inst(id).kind {
        InstKind::Print { mode, val } => match mode {
            PrintMode::PrintChar | PrintMode::PrintInt => {
                program.value(*val).as_const_int().is_some()
            }
            PrintMode::PrintString => program.value(*val).as_const_string().is_some(),
        },
        _ => false,
    }
}

fn is_flush(program: &Program, id: InstId) -> bool {
    matches!(program.inst(id).kind, InstKind::Flush)
}

fn replace_run(program: &mut Program, block: nebula_ir::BlockId, run: &[RunMember]) {
    let mut bytes = Vec::new();
    for member in run {
        let InstKind::Print { mode, val } = program.inst(member.print).kind else {
            unreachable!("find_constant_print_run only selects Print instructions");
        };
        match mode {
            PrintMode::PrintChar => {
                let n = program.value(val).as_const_int().unwrap().clone();
                let ch = n
                    .to_rune()
                    .expect("PrintChar folding only ever sees valid scalar values");
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            PrintMode::PrintInt => {
                let n = program.value(val).as_const_int().unwrap().clone();
                bytes.extend_from_slice(n.to_string().as_bytes());
            }
            PrintMode::PrintString => {
                bytes.extend_from_slice(program.value(val).as_const_string().unwrap());
            }
        }
    }

    let first = run[0].print;
    let pos = program.inst(first).pos;
    let start_index = program
        .block(block)
        .nodes
        .iter()
        .position(|&n| n == first)
        .expect("run's first Print is in this block's node list");
    let combined = program.new_string_const(bytes);
    for member in run {
        program.remove_inst(member.print);
        if let Some(flush) = member.flush {
            program.remove_inst(flush);
        }
    }
    // `push_inst` appends at the tail; splice the pair back to where the
    // run used to start so instructions after it keep their relative order.
    let print_id = program.push_inst(
        block,
        pos,
        InstKind::Print {
            mode: PrintMode::PrintString,
            val: combined,
        },
    );
    let flush_id = program.push_inst(block, pos, InstKind::Flush);
    let nodes = &mut program.block_mut(block).nodes;
    nodes.retain(|&n| n != print_id && n != flush_id);
    nodes.insert(start_index, print_id);
    nodes.insert(start_index + 1, flush_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebula_ir::{BigInt, SourcePos};

    #[test]
    fn three_constant_prints_coalesce_into_one_string() {
        let mut program = Program::new("t");
        let block = program.entry();
        let pos = SourcePos::default();
        for ch in [b'A', b'B', b'C'] {
            let v = program.lookup_const(BigInt::new(ch as i64));
            program.push_inst(
                block,
                pos,
                InstKind::Print {
                    mode: PrintMode::PrintChar,
                    val: v,
                },
            );
            program.push_inst(block, pos, InstKind::Flush);
        }
        coalesce_strings(&mut program);
        let nodes = &program.block(block).nodes;
        assert_eq!(nodes.len(), 2);
        match &program.inst(nodes[0]).kind {
            InstKind::Print { mode: PrintMode::PrintString, val } => {
                assert_eq!(program.value(*val).as_const_string(), Some(b"ABC".as_slice()));
            }
            other => panic!("expected coalesced PrintString, got {other:?}"),
        }
        assert!(matches!(program.inst(nodes[1]).kind, InstKind::Flush));
    }

    #[test]
    fn a_non_constant_print_breaks_the_run() {
        let mut program = Program::new("t");
        let block = program.entry();
        let pos = SourcePos::default();
        let a = program.lookup_const(BigInt::new(b'A' as i64));
        program.push_inst(block, pos, InstKind::Print { mode: PrintMode::PrintChar, val: a });
        program.push_inst(block, pos, InstKind::Flush);
        let read_id = program.peek_next_inst_id();
        let dyn_val = program.new_ssa_value(read_id);
        program.push_inst(
            block,
            pos,
            InstKind::Read {
                mode: nebula_ir::ReadMode::ReadInt,
                result: dyn_val,
            },
        );
        program.push_inst(block, pos, InstKind::Print { mode: PrintMode::PrintInt, val: dyn_val });
        program.push_inst(block, pos, InstKind::Flush);
        coalesce_strings(&mut program);
        assert_eq!(program.block(block).nodes.len(), 5); // unchanged: no run of >=2 consts
    }
}
