//! Unifies "produces a value" and "is an assignable place" so a single
//! expression-parsing pass can build both.

use cbc_ir::{Fragment, Opcode};

/// Which opcode triple (GET/SET/DEL) and which duplication opcode a
/// place uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PlaceKind {
    /// A bare name; the prefix pushes just the name (arity 1).
    Local,
    /// `container.name`; the prefix pushes container and name (arity 2).
    Attr,
    /// `container[key]` or a slice thereof; same arity and opcodes as `Attr`.
    Item,
}

/// An assignable place: a prefix fragment that leaves the place's
/// context values on the stack, plus which opcode triple applies.
///
/// Consumed by value — each of [`LValue::get`], [`LValue::set`],
/// [`LValue::set_update`], [`LValue::delete`] takes `self`, matching the
/// rule that a place is used exactly once per statement.
#[derive(Clone, Debug)]
pub struct LValue {
    prefix: Fragment,
    kind: PlaceKind,
}

impl LValue {
    /// `x` — the prefix pushes the name itself.
    pub fn local(name: &str) -> Self {
        LValue { prefix: Fragment::lit_bytes(name.as_bytes()), kind: PlaceKind::Local }
    }

    /// `obj.name` — the prefix pushes the already-evaluated container
    /// then the attribute name.
    pub fn attr(obj: Fragment, name: &str) -> Self {
        LValue { prefix: obj.concat(Fragment::lit_bytes(name.as_bytes())), kind: PlaceKind::Attr }
    }

    /// `obj[key]` — the prefix pushes the already-evaluated container
    /// then the already-evaluated key.
    pub fn item(obj: Fragment, key: Fragment) -> Self {
        LValue { prefix: obj.concat(key), kind: PlaceKind::Item }
    }

    /// `obj[a:b]` — same opcode triple as `item`, keyed by a slice value
    /// built from two optional bounds (missing bounds push `LIT_NONE`).
    pub fn slice(obj: Fragment, start: Option<Fragment>, stop: Option<Fragment>) -> Self {
        let bound = |b: Option<Fragment>| b.unwrap_or_else(|| Fragment::op(Opcode::LitNone));
        let prefix = obj.concat(bound(start)).concat(bound(stop)).concat(Fragment::op(Opcode::LitSlice));
        LValue { prefix, kind: PlaceKind::Item }
    }

    fn get_op(&self) -> Opcode {
        match self.kind {
            PlaceKind::Local => Opcode::GetLocal,
            PlaceKind::Attr => Opcode::GetAttr,
            PlaceKind::Item => Opcode::GetItem,
        }
    }

    fn set_op(&self) -> Opcode {
        match self.kind {
            PlaceKind::Local => Opcode::SetLocal,
            PlaceKind::Attr => Opcode::SetAttr,
            PlaceKind::Item => Opcode::SetItem,
        }
    }

    fn del_op(&self) -> Opcode {
        match self.kind {
            PlaceKind::Local => Opcode::DelLocal,
            PlaceKind::Attr => Opcode::DelAttr,
            PlaceKind::Item => Opcode::DelItem,
        }
    }

    fn dup_op(&self) -> Opcode {
        match self.kind {
            PlaceKind::Local => Opcode::StDup,
            PlaceKind::Attr | PlaceKind::Item => Opcode::StDup2,
        }
    }

    /// Reads the place: prefix, then GET. Net stack effect +1.
    pub fn get(self) -> Fragment {
        let op = self.get_op();
        self.prefix.concat(Fragment::op(op))
    }

    /// Writes `value` into the place: prefix, then the value fragment,
    /// then SET. Net stack effect -1.
    pub fn set(self, value: Fragment) -> Fragment {
        let op = self.set_op();
        self.prefix.concat(value).concat(Fragment::op(op))
    }

    /// Compound assignment (`+=` and friends), atomic w.r.t. stack
    /// discipline: prefix, DUP/DUP2, GET, value, binary op, SET.
    pub fn set_update(self, value: Fragment, op: Opcode) -> Fragment {
        let dup = self.dup_op();
        let get = self.get_op();
        let set = self.set_op();
        self.prefix
            .concat(Fragment::op(dup))
            .concat(Fragment::op(get))
            .concat(value)
            .concat(Fragment::op(op))
            .concat(Fragment::op(set))
    }

    /// Deletes the place: prefix, then DEL.
    pub fn delete(self) -> Fragment {
        let op = self.del_op();
        self.prefix.concat(Fragment::op(op))
    }
}

/// The result of parsing any expression production: either a pushed
/// value, or an assignable place that can still be turned into one with
/// [`LValue::get`].
#[derive(Clone, Debug)]
pub enum Expr {
    Value(Fragment),
    Place(LValue),
}

impl Expr {
    /// Forces this expression to a value-producing fragment.
    pub fn get(self) -> Fragment {
        match self {
            Expr::Value(f) => f,
            Expr::Place(lv) => lv.get(),
        }
    }

    /// Narrows this expression to an [`LValue`], for assignment/`del`
    /// targets. Only identifier, attribute, and item/slice productions
    /// produce `Expr::Place`; anything else is a semantic error.
    pub fn into_lvalue(self) -> Option<LValue> {
        match self {
            Expr::Place(lv) => Some(lv),
            Expr::Value(_) => None,
        }
    }
}
