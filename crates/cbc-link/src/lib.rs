//! Resolves a [`Fragment`]'s symbolic forward references into a flat
//! byte array.

use cbc_ir::Fragment;
use cbc_util::CompileError;

/// Failure to link a fragment.
#[derive(thiserror::Error, Debug, Clone)]
pub enum LinkError {
    /// A relocation's symbol is not defined anywhere in the fragment
    /// (e.g. `goto nosuch;`, or `continue;` outside any loop — both
    /// surface as an unresolved [`cbc_ir::SymbolId::LoopContinue`] or
    /// [`cbc_ir::SymbolId::LoopBreak`]).
    #[error("unresolved reference to {0:?}")]
    UnresolvedSymbol(cbc_ir::SymbolId),
}

impl From<LinkError> for CompileError {
    fn from(e: LinkError) -> Self {
        CompileError::link(e.to_string())
    }
}

/// Flattens `frag`'s segments and patches every relocation with its
/// resolved absolute offset, as a 4-byte little-endian integer.
///
/// Performs no bounds checking on resolved offsets: targets beyond
/// `u32::MAX` would silently wrap. Source programs are bounded in
/// practice, so this is not treated as a defect.
pub fn link(frag: &Fragment) -> Result<Vec<u8>, LinkError> {
    let mut buffer = frag.flatten();

    for (&offset, symbol) in frag.relocations() {
        let target = frag
            .symbols()
            .get(symbol)
            .copied()
            .ok_or_else(|| LinkError::UnresolvedSymbol(symbol.clone()))?;
        let target = target as u32;
        buffer[offset..offset + 4].copy_from_slice(&target.to_le_bytes());
    }

    Ok(buffer)
}
