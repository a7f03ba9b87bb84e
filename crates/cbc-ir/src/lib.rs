//! Shared IR for the cbc compiler: the [`Fragment`] algebra, [`SymbolId`]
//! identities, and the [`Opcode`] set. Depended on by both the
//! parser/emitter and the linker so neither has to depend on the other.

mod fragment;
mod opcode;
mod symbol;

pub use fragment::{Fragment, FragmentError};
pub use opcode::Opcode;
pub use symbol::{SymbolId, SymbolMinter};
