//! Instructions and terminators (§4.B / §3 of the design).
//!
//! `Instruction`/`Terminator` are closed sum types: every variant's operand
//! slots and defined value (if any) are enumerated exhaustively by
//! [`Instruction::operands`]/[`Instruction::operands_mut`] and
//! [`Instruction::defined_value`], so adding a variant without updating
//! those match arms is a compile error, not a silent gap in the use-def
//! invariant.

use crate::ids::{BlockId, InstId, ValueId};
use smallvec::SmallVec;

/// Source position attached once at IR-construction time; never
/// recomputed by later transforms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourcePos {
    pub line: u32,
    pub col: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Neg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrintMode {
    PrintChar,
    PrintInt,
    PrintString,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadMode {
    ReadChar,
    ReadInt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CondOp {
    Jz,
    Jn,
}

/// A basic block's sole terminating instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terminator {
    Jmp(BlockId),
    JmpCond {
        op: CondOp,
        cond: ValueId,
        then_blk: BlockId,
        else_blk: BlockId,
    },
    /// Pushes an implicit return address (the block's own `next` in source
    /// order) onto the call stack, then transfers to `dest`.
    Call(BlockId),
    Ret,
    Exit,
}

impl Terminator {
    /// Direct control-flow successors. `Ret`'s true successors depend on
    /// the matching `Call` sites and are resolved by the caller (the CFG
    /// builder) via `callers`/`entries`, not by this method — see
    /// `BasicBlock::exits` in `block.rs`.
    pub fn direct_successors(&self) -> SmallVec<[BlockId; 2]> {
        match self {
            Terminator::Jmp(target) => SmallVec::from_slice(&[*target]),
            Terminator::JmpCond {
                then_blk, else_blk, ..
            } => SmallVec::from_slice(&[*then_blk, *else_blk]),
            Terminator::Call(dest) => SmallVec::from_slice(&[*dest]),
            Terminator::Ret | Terminator::Exit => SmallVec::new(),
        }
    }

    pub fn retarget(&mut self, old: BlockId, new: BlockId) {
        let retarget_one = |b: &mut BlockId| {
            if *b == old {
                *b = new;
            }
        };
        match self {
            Terminator::Jmp(target) => retarget_one(target),
            Terminator::JmpCond {
                then_blk, else_blk, ..
            } => {
                retarget_one(then_blk);
                retarget_one(else_blk);
            }
            Terminator::Call(dest) => retarget_one(dest),
            Terminator::Ret | Terminator::Exit => {}
        }
    }
}

/// A non-terminator node in a basic block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstKind {
    Binary {
        op: BinOp,
        lhs: ValueId,
        rhs: ValueId,
        result: ValueId,
    },
    Unary {
        op: UnOp,
        val: ValueId,
        result: ValueId,
    },
    /// Synthesized on underflow only — see `Stack::pop`.
    LoadStack { position: u32, result: ValueId },
    LoadHeap { addr: ValueId, result: ValueId },
    StoreHeap { addr: ValueId, val: ValueId },
    Print { mode: PrintMode, val: ValueId },
    Read { mode: ReadMode, result: ValueId },
    /// Emitted after every print to force I/O ordering with reads.
    Flush,
    /// Asserts at least `access` items are available on the caller stack;
    /// prepended to a block's node list by the IR builder / join pass.
    CheckStack { access: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub id: InstId,
    pub block: BlockId,
    pub pos: SourcePos,
    pub kind: InstKind,
}

impl Instruction {
    /// Every operand slot, paired with its index — the enumeration
    /// `add_use`/`remove_use`/`replace_uses` drive off of.
    pub fn operands(&self) -> SmallVec<[(u32, ValueId); 2]> {
        match &self.kind {
            InstKind::Binary { lhs, rhs, .. } => {
                SmallVec::from_slice(&[(0, *lhs), (1, *rhs)])
            }
            InstKind::Unary { val, .. } => SmallVec::from_slice(&[(0, *val)]),
            InstKind::LoadStack { .. } => SmallVec::new(),
            InstKind::LoadHeap { addr, .. } => SmallVec::from_slice(&[(0, *addr)]),
            InstKind::StoreHeap { addr, val } => {
                SmallVec::from_slice(&[(0, *addr), (1, *val)])
            }
            InstKind::Print { val, .. } => SmallVec::from_slice(&[(0, *val)]),
            InstKind::Read { .. } => SmallVec::new(),
            InstKind::Flush => SmallVec::new(),
            InstKind::CheckStack { .. } => SmallVec::new(),
        }
    }

    /// Mutable access to a single operand slot by index, for rewrites.
    pub fn operand_mut(&mut self, index: u32) -> &mut ValueId {
        match &mut self.kind {
            InstKind::Binary { lhs, rhs, .. } => {
                if index == 0 {
                    lhs
                } else {
                    rhs
                }
            }
            InstKind::Unary { val, .. } => val,
            InstKind::LoadHeap { addr, .. } => addr,
            InstKind::StoreHeap { addr, val } => {
                if index == 0 {
                    addr
                } else {
                    val
                }
            }
            InstKind::Print { val, .. } => val,
            InstKind::LoadStack { .. }
            | InstKind::Read { .. }
            | InstKind::Flush
            | InstKind::CheckStack { .. } => {
                panic!("operand_mut: {:?} has no operand slot {}", self.kind, index)
            }
        }
    }

    pub fn defined_value(&self) -> Option<ValueId> {
        match &self.kind {
            InstKind::Binary { result, .. }
            | InstKind::Unary { result, .. }
            | InstKind::LoadStack { result, .. }
            | InstKind::LoadHeap { result, .. }
            | InstKind::Read { result, .. } => Some(*result),
            InstKind::StoreHeap { .. }
            | InstKind::Print { .. }
            | InstKind::Flush
            | InstKind::CheckStack { .. } => None,
        }
    }

    /// Whether this instruction is I/O for dependence-graph purposes
    /// (`Print`/`Read`/`Flush` — see §4.F).
    pub fn is_io(&self) -> bool {
        matches!(
            self.kind,
            InstKind::Print { .. } | InstKind::Read { .. } | InstKind::Flush
        )
    }
}
