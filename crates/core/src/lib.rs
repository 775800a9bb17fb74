//! Nebula IR core: a typed, SSA-form intermediate representation shared by
//! the Whitespace and Brainfuck front-ends.
//!
//! # Modules
//!
//! - `bigint`: arbitrary-precision integer arithmetic (§4.A)
//! - `ids`: stable arena handles for values, instructions and blocks
//! - `value`: SSA value variants and the def-use `uses` side table (§4.B)
//! - `inst`: instructions and terminators (§4.B / §3)
//! - `block`: basic blocks (§4.C)
//! - `program`: the program container and use-def machinery (§4.B / §4.C)
//! - `stack`: the per-block symbolic stack (§4.D)

pub mod bigint;
pub mod block;
pub mod ids;
pub mod inst;
pub mod program;
pub mod stack;
pub mod value;

pub use bigint::BigInt;
pub use block::BasicBlock;
pub use ids::{BlockId, InstId, ValueId};
pub use inst::{
    BinOp, CondOp, InstKind, Instruction, PrintMode, ReadMode, SourcePos, Terminator, UnOp,
};
pub use program::Program;
pub use stack::Stack;
pub use value::ValueKind;
