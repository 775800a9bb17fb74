//! Front-end token contracts (§6).
//!
//! The Whitespace/Brainfuck lexers that turn source bytes into these tokens
//! are a collaborator's concern (spec.md §1 puts them out of scope for this
//! core); this module just fixes the shape the IR builder consumes. A
//! minimal tokenizer for each language lives in `frontend.rs` — enough to
//! drive `nebulac` end-to-end, not the interesting engineering this crate
//! is about.

use nebula_ir::{BigInt, SourcePos};

/// A Whitespace token kind. `Push`, `Copy`, `Slide`, `Label`, `Call`, `Jmp`,
/// `Jz`, `Jn` carry a bigint argument; the rest don't.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsKind {
    Push,
    Dup,
    Copy,
    Swap,
    Drop,
    Slide,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Store,
    Retrieve,
    Label,
    Call,
    Jmp,
    Jz,
    Jn,
    Ret,
    End,
    Printc,
    Printi,
    Readc,
    Readi,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsToken {
    pub kind: WsKind,
    /// Present for `Push`, `Copy`, `Slide`, `Label`, `Call`, `Jmp`, `Jz`, `Jn`.
    /// Label values are compared by value (see `BigInt`'s `Eq`), not as text.
    pub arg: Option<BigInt>,
    pub pos: SourcePos,
}

impl WsToken {
    pub fn new(kind: WsKind, arg: Option<BigInt>, pos: SourcePos) -> Self {
        WsToken { kind, arg, pos }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BfKind {
    IncPtr,
    DecPtr,
    IncData,
    DecData,
    Print,
    Read,
    Bracket,
    EndBracket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BfToken {
    pub kind: BfKind,
    pub pos: SourcePos,
}

impl BfToken {
    pub fn new(kind: BfKind, pos: SourcePos) -> Self {
        BfToken { kind, pos }
    }
}
