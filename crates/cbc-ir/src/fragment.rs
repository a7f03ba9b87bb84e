//! The linkable [`Fragment`]: the unit the parser/emitter builds and the
//! linker consumes.

use rustc_hash::FxHashMap;

use crate::opcode::Opcode;
use crate::symbol::SymbolId;

/// Failure to compose two fragments.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FragmentError {
    /// Both operands of an `append` defined the same symbol. For
    /// [`SymbolId::Named`] this means a source-level duplicate label.
    #[error("duplicate label `{0:?}`")]
    DuplicateSymbol(SymbolId),
}

/// A partially linked chunk of bytecode.
///
/// See the data model section of the spec for the full contract. In
/// short: `bytecode` is kept as a list of segments rather than one
/// buffer so `append` can move segments in O(1) amortized time instead
/// of copying bytes; `symbols` records where *this* fragment defines
/// jump targets; `relocations` records where this fragment still owes a
/// 4-byte little-endian offset once some symbol (maybe defined in an
/// enclosing fragment, maybe not yet defined at all) is known.
#[derive(Debug, Default, Clone)]
pub struct Fragment {
    bytecode: Vec<Vec<u8>>,
    symbols: FxHashMap<SymbolId, usize>,
    relocations: FxHashMap<usize, SymbolId>,
    len: usize,
}

impl Fragment {
    /// The empty fragment: the identity element of `append`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A fragment consisting of exactly these raw bytes, no symbols or
    /// relocations.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let len = bytes.len();
        let bytecode = if len == 0 { Vec::new() } else { vec![bytes] };
        Self { bytecode, symbols: FxHashMap::default(), relocations: FxHashMap::default(), len }
    }

    /// A fragment consisting of a single opcode byte.
    pub fn op(op: Opcode) -> Self {
        Self::bytes(vec![op.as_u8()])
    }

    /// A fragment that defines `symbol` at its own offset 0. Used for
    /// `label:` statements and for the `start` symbol of a loop (which
    /// sits at the very beginning of the loop's fragment).
    pub fn label(symbol: SymbolId) -> Self {
        let mut symbols = FxHashMap::default();
        symbols.insert(symbol, 0);
        Self { bytecode: Vec::new(), symbols, relocations: FxHashMap::default(), len: 0 }
    }

    /// A fragment holding a single opcode followed by a 4-byte
    /// placeholder relocation targeting `symbol` (used for `JUMP`,
    /// `JUMP_IF`, `TRY`).
    pub fn jump(op: Opcode, symbol: SymbolId) -> Self {
        let mut relocations = FxHashMap::default();
        relocations.insert(1, symbol);
        Self { bytecode: vec![vec![op.as_u8(), 0, 0, 0, 0]], symbols: FxHashMap::default(), relocations, len: 5 }
    }

    /// Unsigned LEB128 encoding of `value`, as a standalone fragment.
    pub fn uleb(value: u64) -> Self {
        let mut buf = Vec::new();
        leb128::write::unsigned(&mut buf, value).expect("writing to a Vec never fails");
        Self::bytes(buf)
    }

    /// Signed LEB128 encoding of `value`, as a standalone fragment.
    pub fn sleb(value: i64) -> Self {
        let mut buf = Vec::new();
        leb128::write::signed(&mut buf, value).expect("writing to a Vec never fails");
        Self::bytes(buf)
    }

    /// `LIT_INT` + signed-LEB128(value).
    pub fn lit_int(value: i64) -> Self {
        Self::op(Opcode::LitInt).concat(Self::sleb(value))
    }

    /// `LIT_FLOAT` + 8-byte little-endian IEEE-754 double.
    pub fn lit_float(value: f64) -> Self {
        Self::op(Opcode::LitFloat).concat(Self::bytes(value.to_le_bytes().to_vec()))
    }

    /// `LIT_BYTES` + unsigned-LEB128(len) + the raw bytes.
    pub fn lit_bytes(data: &[u8]) -> Self {
        Self::op(Opcode::LitBytes).concat(Self::uleb(data.len() as u64)).concat(Self::bytes(data.to_vec()))
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `other` after `self`, shifting all of `other`'s symbols
    /// and relocations by `self.len()`. Fails if both operands define
    /// the same symbol.
    pub fn concat(self, other: Self) -> Self {
        self.append(other).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Fallible form of [`Fragment::concat`], surfacing duplicate-label
    /// errors instead of panicking. This is the form the parser uses for
    /// anything that might carry a user-chosen label name.
    pub fn append(mut self, mut other: Self) -> Result<Self, FragmentError> {
        let base = self.len;

        for key in other.symbols.keys() {
            if self.symbols.contains_key(key) {
                return Err(FragmentError::DuplicateSymbol(key.clone()));
            }
        }

        for (symbol, offset) in other.symbols.drain() {
            self.symbols.insert(symbol, offset + base);
        }
        for (offset, symbol) in other.relocations.drain() {
            self.relocations.insert(offset + base, symbol);
        }

        self.bytecode.append(&mut other.bytecode);
        self.len += other.len;
        Ok(self)
    }

    /// Retargets every relocation currently pointing at `from` to point
    /// at `to` instead. Used by loop lowering to rewrite the
    /// [`SymbolId::LoopContinue`]/[`SymbolId::LoopBreak`] sentinels to
    /// the loop's own `start`/`end` symbols. This only touches this
    /// fragment's own relocation map (a "shallow" rewrite): a nested
    /// loop's sentinels have already been retargeted by that inner loop
    /// before its fragment was appended here, so they are untouched.
    pub fn retarget(&mut self, from: &SymbolId, to: &SymbolId) {
        let offsets: Vec<usize> =
            self.relocations.iter().filter(|(_, sym)| *sym == from).map(|(offset, _)| *offset).collect();
        for offset in offsets {
            self.relocations.insert(offset, to.clone());
        }
    }

    /// Defines `symbol` at the fragment's *current* end (i.e. the next
    /// byte that will be emitted). Used to mint a loop's `end` symbol as
    /// a label appended after the loop body.
    pub fn define_here(self, symbol: SymbolId) -> Self {
        self.concat(Self::label(symbol))
    }

    pub fn symbols(&self) -> &FxHashMap<SymbolId, usize> {
        &self.symbols
    }

    pub fn relocations(&self) -> &FxHashMap<usize, SymbolId> {
        &self.relocations
    }

    /// Flattens the segment list into one contiguous buffer. Relocation
    /// placeholders are left as zero; resolving them is the linker's job.
    pub fn flatten(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.len);
        for segment in &self.bytecode {
            buf.extend_from_slice(segment);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_law_holds_for_append() {
        let a = Fragment::op(Opcode::LitNone);
        let b = Fragment::op(Opcode::StPop);
        let a_len = a.len();
        let b_len = b.len();
        let ab = a.concat(b);
        assert_eq!(ab.len(), a_len + b_len);
    }

    #[test]
    fn append_is_associative_in_bytes_and_symbols() {
        let mk = || {
            (
                Fragment::op(Opcode::LitTrue),
                Fragment::label(SymbolId::Fresh(1)),
                Fragment::jump(Opcode::Jump, SymbolId::Fresh(1)),
            )
        };
        let (a1, b1, c1) = mk();
        let left = a1.concat(b1).concat(c1);

        let (a2, b2, c2) = mk();
        let right = a2.concat(b2.concat(c2));

        assert_eq!(left.flatten(), right.flatten());
        assert_eq!(left.symbols(), right.symbols());
        assert_eq!(left.relocations(), right.relocations());
    }

    #[test]
    fn duplicate_label_is_a_hard_error() {
        let a = Fragment::label(SymbolId::Named("l".into()));
        let b = Fragment::label(SymbolId::Named("l".into()));
        assert_eq!(a.append(b), Err(FragmentError::DuplicateSymbol(SymbolId::Named("l".into()))));
    }

    #[test]
    fn unresolved_references_carry_through_append() {
        let a = Fragment::jump(Opcode::Jump, SymbolId::Named("later".into()));
        let b = Fragment::op(Opcode::StPop).concat(Fragment::label(SymbolId::Named("later".into())));
        let whole = a.concat(b);
        assert_eq!(whole.symbols().get(&SymbolId::Named("later".into())), Some(&6));
        assert_eq!(whole.relocations().get(&1), Some(&SymbolId::Named("later".into())));
    }

    #[test]
    fn retarget_only_touches_matching_relocations() {
        let mut frag = Fragment::jump(Opcode::Jump, SymbolId::LoopBreak)
            .concat(Fragment::jump(Opcode::Jump, SymbolId::LoopContinue));
        frag.retarget(&SymbolId::LoopBreak, &SymbolId::Fresh(9));
        assert_eq!(frag.relocations().get(&1), Some(&SymbolId::Fresh(9)));
        assert_eq!(frag.relocations().get(&6), Some(&SymbolId::LoopContinue));
    }
}
