//! Basic blocks (§4.C).

use crate::ids::{BlockId, InstId};
use crate::inst::Terminator;
use crate::program::Program;
use crate::stack::Stack;
use smallvec::SmallVec;

#[derive(Clone, Debug)]
pub struct BasicBlock {
    pub id: BlockId,
    /// Non-terminator instructions, in source order.
    pub nodes: Vec<InstId>,
    pub terminator: Option<Terminator>,
    pub stack: Stack,
    /// Control-flow predecessors. Empty only for the program entry block.
    pub entries: Vec<BlockId>,
    /// Blocks that may reach this one via a `Call`/`Ret` pair — used to
    /// resolve `Ret`'s successors in [`BasicBlock::exits`].
    pub callers: Vec<BlockId>,
    pub prev: Option<BlockId>,
    pub next: Option<BlockId>,
}

impl BasicBlock {
    pub(crate) fn new(id: BlockId) -> Self {
        BasicBlock {
            id,
            nodes: Vec::new(),
            terminator: None,
            stack: Stack::new(),
            entries: Vec::new(),
            callers: Vec::new(),
            prev: None,
            next: None,
        }
    }

    /// Deterministic LLVM label name, derived from the block id.
    pub fn name(&self) -> String {
        format!("block_{}", self.id.0)
    }

    /// Terminator successors. `Ret`'s successors are each caller's implicit
    /// return block (its textual `next`), since `Ret` cannot resolve its own
    /// target without knowing who called in.
    pub fn exits(&self, program: &Program) -> SmallVec<[BlockId; 4]> {
        match &self.terminator {
            Some(Terminator::Ret) => self
                .callers
                .iter()
                .filter_map(|c| program.block(*c).next)
                .collect(),
            Some(other) => other.direct_successors().into_iter().collect(),
            None => SmallVec::new(),
        }
    }
}
