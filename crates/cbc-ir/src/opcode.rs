//! The bytecode opcode set.
//!
//! Numeric values are part of the external contract (see the bytecode
//! format section of the spec) and must not be renumbered.

/// A single bytecode instruction opcode.
///
/// Operand shapes:
/// - `LitInt` is followed by a signed LEB128 integer.
/// - `LitFloat` is followed by 8 little-endian IEEE-754 bytes.
/// - `LitBytes` is followed by an unsigned LEB128 length and that many raw bytes.
/// - `Jump`/`JumpIf`/`Try` are followed by a 4-byte little-endian absolute offset.
/// - `TupleN`/`ClosureBind` are followed by an unsigned LEB128 arity;
///   `ClosureBind` is additionally followed by that many length-prefixed names.
/// - All other opcodes have no operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Error = 0,
    StSwap = 1,
    StPop = 2,
    StDup = 3,
    StDup2 = 4,

    LitBytes = 10,
    LitInt = 11,
    LitFloat = 12,
    LitSlice = 13,
    LitNone = 14,
    LitTrue = 15,
    LitFalse = 16,

    Tuple0 = 17,
    Tuple1 = 18,
    Tuple2 = 19,
    Tuple3 = 20,
    Tuple4 = 21,
    TupleN = 22,

    Closure = 23,
    ClosureBind = 24,
    EmptyDict = 25,
    Class = 26,

    GetAttr = 40,
    SetAttr = 41,
    DelAttr = 42,

    GetItem = 43,
    SetItem = 44,
    DelItem = 45,

    GetLocal = 46,
    SetLocal = 47,
    DelLocal = 48,
    LoadArgs = 49,

    Jump = 60,
    JumpIf = 61,
    Try = 62,
    TryEnd = 63,

    Call = 64,
    Spawn = 65,
    Raise = 66,
    Return = 67,
    Yield = 68,
    RaiseIfNotStop = 69,

    OpAdd = 80,
    OpSub = 81,
    OpMul = 82,
    OpDiv = 83,
    OpMod = 84,
    OpBitAnd = 85,
    OpBitOr = 86,
    OpBitXor = 87,
    OpNeg = 88,
    OpNot = 89,
    OpInv = 90,
    OpEq = 91,
    OpNe = 92,
    OpGt = 93,
    OpLt = 94,
    OpGe = 95,
    OpLe = 96,
    OpShl = 97,
    OpShr = 98,
}

impl Opcode {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}
