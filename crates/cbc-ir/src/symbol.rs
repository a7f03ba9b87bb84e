//! Symbol identities: opaque targets for forward/backward references.
//!
//! Most symbols are minted fresh, one per syntactic construct that needs
//! a jump target (an `if`'s `end`, a loop's `start`/`end`, ...). Two
//! identities are process-wide sentinels rather than fresh mints:
//! `LoopContinue` and `LoopBreak`, used by `continue`/`break` so that the
//! *innermost enclosing loop* (not the parser, which doesn't know yet
//! which loop that will be) decides where they ultimately point.
//! `Named` symbols back source-level `label:`/`goto label;` pairs and
//! compare by name rather than by mint order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymbolId {
    /// A unique identity minted during parsing. Two `Fresh` values are
    /// equal only if they share the same counter value.
    Fresh(u64),
    /// Sentinel target for `continue;` until the enclosing loop retargets it.
    LoopContinue,
    /// Sentinel target for `break;` until the enclosing loop retargets it.
    LoopBreak,
    /// A source-level label name (`label:` / `goto label;`).
    Named(String),
}

/// Mints fresh, unique [`SymbolId`]s. Each parser (and each nested
/// function-body parser) owns one of these.
#[derive(Default, Debug)]
pub struct SymbolMinter {
    next: u64,
}

impl SymbolMinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self) -> SymbolId {
        let id = self.next;
        self.next += 1;
        SymbolId::Fresh(id)
    }
}
