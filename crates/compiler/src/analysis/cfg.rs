//! Control-flow graph construction (§4.F).
//!
//! A thin read-only view over [`nebula_ir::Program`]: nodes are blocks,
//! edges are each block's [`nebula_ir::BasicBlock::exits`]. `Ret` edges are
//! resolved through `callers`, not `entries` — mirroring the same split
//! `exits()` itself makes, since a `Ret`'s real successors aren't knowable
//! from its own block alone.

use nebula_ir::{BlockId, Program};
use smallvec::SmallVec;
use std::collections::HashMap;

pub struct Cfg {
    successors: HashMap<BlockId, SmallVec<[BlockId; 4]>>,
}

impl Cfg {
    pub fn build(program: &Program) -> Self {
        let mut successors = HashMap::new();
        for id in program.block_ids() {
            successors.insert(id, program.block(id).exits(program));
        }
        Cfg { successors }
    }

    pub fn successors(&self, block: BlockId) -> &[BlockId] {
        self.successors
            .get(&block)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Every block with an edge (direct or via `Ret`) into `block`.
    pub fn predecessors(&self, block: BlockId) -> Vec<BlockId> {
        self.successors
            .iter()
            .filter(|(_, succs)| succs.contains(&block))
            .map(|(&id, _)| id)
            .collect()
    }
}

/// Checks the CFG-soundness invariant (§8) for every *direct* terminator
/// edge (`Jmp`/`JmpCond`/`Call` — the ones `Program::set_terminator` records
/// in `entries`). `Ret` edges are exempted: they're tracked via `callers`,
/// a deliberately separate mechanism (see module docs).
pub fn direct_edges_are_sound(program: &Program) -> bool {
    for id in program.block_ids() {
        let block = program.block(id);
        let Some(term) = &block.terminator else {
            continue;
        };
        for succ in term.direct_successors() {
            if !program.block(succ).entries.contains(&id) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebula_ir::Terminator;

    #[test]
    fn cfg_tracks_a_simple_jump_chain() {
        let mut program = Program::new("t");
        let entry = program.entry();
        let next = program.create_block();
        program.set_terminator(entry, Terminator::Jmp(next));
        program.set_terminator(next, Terminator::Exit);

        let cfg = Cfg::build(&program);
        assert_eq!(cfg.successors(entry), &[next]);
        assert_eq!(cfg.predecessors(next), vec![entry]);
        assert!(direct_edges_are_sound(&program));
    }
}
