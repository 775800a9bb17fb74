//! Program container and the use-def machinery (§4.B / §4.C).

use crate::bigint::BigInt;
use crate::block::BasicBlock;
use crate::ids::{BlockId, InstId, ValueId};
use crate::inst::{InstKind, Instruction, SourcePos, Terminator};
use crate::value::{UseSet, ValueKind};
use std::collections::HashMap;

/// A single compilation unit's SSA program: a linked list (and, via `order`,
/// a vector) of basic blocks, an arena of instructions, an arena of values
/// with bidirectional def-use edges, and a table uniquing integer constants.
///
/// Owns every value/instruction it has ever allocated; there is no
/// per-value deallocation contract — a `Program` is discarded as a whole
/// when compilation ends (§5).
pub struct Program {
    pub name: String,
    blocks: Vec<Option<BasicBlock>>,
    /// Current block order — the "vector" half of "linked list + vector".
    order: Vec<BlockId>,
    entry: BlockId,
    insts: Vec<Option<Instruction>>,
    values: Vec<ValueKind>,
    uses: Vec<UseSet>,
    const_table: HashMap<BigInt, ValueId>,
}

impl Program {
    pub fn new(name: impl Into<String>) -> Self {
        let mut program = Program {
            name: name.into(),
            blocks: Vec::new(),
            order: Vec::new(),
            entry: BlockId(0),
            insts: Vec::new(),
            values: Vec::new(),
            uses: Vec::new(),
            const_table: HashMap::new(),
        };
        let entry = program.create_block();
        program.entry = entry;
        program
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    // ---- blocks -----------------------------------------------------

    pub fn create_block(&mut self) -> BlockId {
        let id = self.reserve_block();
        self.activate_block(id);
        id
    }

    /// Allocates a block without linking it into `order`/`prev`/`next` yet.
    /// Used by the IR builder's label pre-pass, which must hand out a
    /// `BlockId` for every label before it knows where in the final
    /// textual order that label will actually fall — [`Program::activate_block`]
    /// does the linking once the main sweep actually reaches the label.
    pub fn reserve_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Some(BasicBlock::new(id)));
        id
    }

    /// Links a reserved (or already-active) block at the tail of `order`,
    /// the first time it is reached. A no-op if the block is already linked,
    /// so callers don't need to track which blocks were pre-reserved.
    pub fn activate_block(&mut self, id: BlockId) {
        if self.order.contains(&id) {
            return;
        }
        if let Some(&tail) = self.order.last() {
            self.block_mut(id).prev = Some(tail);
            self.block_mut(tail).next = Some(id);
        }
        self.order.push(id);
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        self.blocks[id.index()]
            .as_ref()
            .expect("dangling BlockId: block was removed")
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        self.blocks[id.index()]
            .as_mut()
            .expect("dangling BlockId: block was removed")
    }

    /// Blocks in current source/link order.
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.order.iter().map(move |id| self.block(*id))
    }

    pub fn block_ids(&self) -> Vec<BlockId> {
        self.order.clone()
    }

    /// Detaches and drops a block: unlinks `prev`/`next`, removes it from
    /// `order`. Callers must have already relinked every `entries`/`callers`
    /// reference and terminator successor that pointed at it (the join pass
    /// in `analysis::join` does this before calling `remove_block`).
    pub fn remove_block(&mut self, id: BlockId) {
        let (prev, next) = {
            let b = self.block(id);
            (b.prev, b.next)
        };
        if let Some(p) = prev {
            self.block_mut(p).next = next;
        }
        if let Some(n) = next {
            self.block_mut(n).prev = prev;
        }
        self.order.retain(|&b| b != id);
        self.blocks[id.index()] = None;
    }

    // ---- values -------------------------------------------------------

    fn alloc_value(&mut self, kind: ValueKind) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(kind);
        self.uses.push(UseSet::new());
        id
    }

    pub fn value(&self, id: ValueId) -> &ValueKind {
        &self.values[id.index()]
    }

    /// Uniques integer constants through `const_table`: the same `BigInt`
    /// always yields the same `ValueId`.
    pub fn lookup_const(&mut self, n: BigInt) -> ValueId {
        if let Some(&v) = self.const_table.get(&n) {
            return v;
        }
        let v = self.alloc_value(ValueKind::ConstInt(n.clone()));
        self.const_table.insert(n, v);
        v
    }

    /// String constants are uniqued only by identity — every call mints a
    /// fresh value even for identical bytes.
    pub fn new_string_const(&mut self, bytes: Vec<u8>) -> ValueId {
        self.alloc_value(ValueKind::ConstString(bytes))
    }

    // ---- instructions ---------------------------------------------------

    fn alloc_inst_id(&mut self) -> InstId {
        InstId(self.insts.len() as u32)
    }

    /// The `InstId` the next `push_inst`/`prepend_inst` call will allocate,
    /// without allocating it — lets a builder mint a defining value (whose
    /// `ValueKind` must name its definer) before the instruction exists.
    pub fn peek_next_inst_id(&self) -> InstId {
        InstId(self.insts.len() as u32)
    }

    /// Appends a new instruction to `block`'s node list, registering uses
    /// for every operand slot the instruction's kind carries.
    pub fn push_inst(&mut self, block: BlockId, pos: SourcePos, kind: InstKind) -> InstId {
        let id = self.alloc_inst_id();
        let inst = Instruction {
            id,
            block,
            pos,
            kind,
        };
        for (idx, operand) in inst.operands() {
            self.add_use(operand, id, idx);
        }
        self.insts.push(Some(inst));
        self.block_mut(block).nodes.push(id);
        id
    }

    /// Like [`Program::push_inst`] but inserts at the head of the block's
    /// node list — used for the `CheckStack` the builder/join pass prepend.
    pub fn prepend_inst(&mut self, block: BlockId, pos: SourcePos, kind: InstKind) -> InstId {
        let id = self.alloc_inst_id();
        let inst = Instruction {
            id,
            block,
            pos,
            kind,
        };
        for (idx, operand) in inst.operands() {
            self.add_use(operand, id, idx);
        }
        self.insts.push(Some(inst));
        self.block_mut(block).nodes.insert(0, id);
        id
    }

    /// Convenience wrapper used by [`crate::stack::Stack`]: allocates a
    /// `StackLoad` value and its defining `LoadStack` instruction in one
    /// step, appended to `block`.
    pub fn emit_load_stack(&mut self, block: BlockId, position: u32, pos: SourcePos) -> ValueId {
        let inst_id = self.alloc_inst_id();
        let result = self.alloc_value(ValueKind::StackLoad {
            position,
            definer: inst_id,
        });
        let inst = Instruction {
            id: inst_id,
            block,
            pos,
            kind: InstKind::LoadStack { position, result },
        };
        self.insts.push(Some(inst));
        self.block_mut(block).nodes.push(inst_id);
        result
    }

    /// Allocates a fresh SSA value defined by `definer` — callers build the
    /// instruction around the returned id (the instruction's `result` field
    /// and the value's `definer` must agree).
    pub fn new_ssa_value(&mut self, definer: InstId) -> ValueId {
        self.alloc_value(ValueKind::Ssa { definer })
    }

    pub fn inst(&self, id: InstId) -> &Instruction {
        self.insts[id.index()]
            .as_ref()
            .expect("dangling InstId: instruction was removed")
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut Instruction {
        self.insts[id.index()]
            .as_mut()
            .expect("dangling InstId: instruction was removed")
    }

    // ---- use-def machinery (§4.B) --------------------------------------

    pub fn add_use(&mut self, value: ValueId, user: InstId, operand_index: u32) {
        self.uses[value.index()].insert((user, operand_index));
    }

    pub fn remove_use(&mut self, value: ValueId, user: InstId, operand_index: u32) {
        self.uses[value.index()].remove(&(user, operand_index));
    }

    pub fn uses(&self, value: ValueId) -> &UseSet {
        &self.uses[value.index()]
    }

    /// Rewrites every operand slot referencing `old` to reference `new`
    /// instead, moving use records across. After this call `old`'s use set
    /// is empty.
    pub fn replace_uses(&mut self, old: ValueId, new: ValueId) {
        if old == new {
            return;
        }
        let users: Vec<(InstId, u32)> = self.uses[old.index()].iter().copied().collect();
        for (user, idx) in users {
            *self.inst_mut(user).operand_mut(idx) = new;
            self.uses[old.index()].remove(&(user, idx));
            self.uses[new.index()].insert((user, idx));
        }
    }

    /// Removes every use record this instruction holds on its operands.
    /// Must be called before the instruction is detached from its block.
    pub fn clear_operands(&mut self, inst_id: InstId) {
        let operands = self.inst(inst_id).operands();
        for (idx, value) in operands {
            self.remove_use(value, inst_id, idx);
        }
    }

    /// Replaces every use of `inst`'s defined value with `value`, then
    /// clears `inst`'s own operand uses. The caller still has to remove
    /// `inst` from its block's node list (see [`Program::remove_inst`]).
    pub fn replace_self(&mut self, inst_id: InstId, value: ValueId) {
        if let Some(defined) = self.inst(inst_id).defined_value() {
            self.replace_uses(defined, value);
        }
        self.clear_operands(inst_id);
    }

    /// Detaches `inst` from its block and drops it from the arena. Callers
    /// must have already redirected every use of its defined value (if
    /// any) — an instruction whose defined value still has uses may not be
    /// removed (use-def integrity, §8).
    pub fn remove_inst(&mut self, inst_id: InstId) {
        let inst = self.inst(inst_id);
        if let Some(defined) = inst.defined_value() {
            assert!(
                self.uses(defined).is_empty(),
                "remove_inst: {:?} still has uses of its defined value",
                inst_id
            );
        }
        self.clear_operands(inst_id);
        let block = inst.block;
        self.block_mut(block).nodes.retain(|&n| n != inst_id);
        self.insts[inst_id.index()] = None;
    }

    // ---- terminators ----------------------------------------------------

    pub fn set_terminator(&mut self, block: BlockId, term: Terminator) {
        for succ in term.direct_successors() {
            let exists = self.block(succ).entries.contains(&block);
            if !exists {
                self.block_mut(succ).entries.push(block);
            }
        }
        self.block_mut(block).terminator = Some(term);
    }

    /// Optional post-join canonicalization (open question in spec.md §9):
    /// a block ending `Call(L)` whose only successor (the implicit return
    /// block) immediately `Ret`s is rewritten to `Jmp(L)`. Not run by
    /// default — callers opt in explicitly.
    pub fn canonicalize_tail_calls(&mut self) {
        for id in self.block_ids() {
            let (dest, ret_block) = match self.block(id).terminator {
                Some(Terminator::Call(dest)) => (dest, self.block(id).next),
                _ => continue,
            };
            let Some(ret_block) = ret_block else { continue };
            let is_bare_ret = matches!(self.block(ret_block).terminator, Some(Terminator::Ret))
                && self.block(ret_block).nodes.is_empty();
            if is_bare_ret {
                self.block_mut(ret_block).entries.retain(|&e| e != id);
                self.set_terminator(id, Terminator::Jmp(dest));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inst::{BinOp, InstKind};

    #[test]
    fn lookup_const_uniques_by_value() {
        let mut program = Program::new("t");
        let a = program.lookup_const(BigInt::new(42));
        let b = program.lookup_const(BigInt::new(42));
        let c = program.lookup_const(BigInt::new(7));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn replace_uses_updates_operand_and_clears_old() {
        let mut program = Program::new("t");
        let block = program.entry();
        let a = program.lookup_const(BigInt::new(1));
        let b = program.lookup_const(BigInt::new(2));
        let pos = SourcePos::default();
        let inst_id = program.peek_next_inst_id();
        let result = program.new_ssa_value(inst_id);
        let pushed = program.push_inst(
            block,
            pos,
            InstKind::Binary {
                op: BinOp::Add,
                lhs: a,
                rhs: b,
                result,
            },
        );
        assert_eq!(inst_id, pushed);

        let replacement = program.lookup_const(BigInt::new(99));
        program.replace_uses(a, replacement);
        assert!(program.uses(a).is_empty());
        assert!(program.uses(replacement).contains(&(inst_id, 0)));
        match &program.inst(inst_id).kind {
            InstKind::Binary { lhs, .. } => assert_eq!(*lhs, replacement),
            _ => unreachable!(),
        }
    }

    #[test]
    fn remove_inst_detaches_from_block() {
        let mut program = Program::new("t");
        let block = program.entry();
        let a = program.lookup_const(BigInt::new(1));
        let inst_id = program.push_inst(
            block,
            SourcePos::default(),
            InstKind::Print {
                mode: crate::inst::PrintMode::PrintInt,
                val: a,
            },
        );
        assert!(program.block(block).nodes.contains(&inst_id));
        program.remove_inst(inst_id);
        assert!(!program.block(block).nodes.contains(&inst_id));
    }
}
