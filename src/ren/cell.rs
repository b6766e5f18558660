// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/cell.rs

// The uniform value cell: kind, per-kind flags, binding, payload

// <>

use std::rc::Rc;

use bitflags::bitflags;

use super::context::Context;
use super::func::{Archetype, Func};
use super::kinds::{Kind, TypeBits};
use super::map::MapRef;
use super::paramlist::ParamClass;
use super::series::{Array, Binary, Text};
use super::symtab::Sym;

bitflags! {
    /// Per-cell flags; `applies_to` says which kinds may carry each
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellFlags: u16 {
        const PROTECTED = 1 << 0;
        const UNEVALUATED = 1 << 1;
        const THROWN = 1 << 2;
        /// a newline preceded this cell in source
        const LINE = 1 << 3;
        const RELATIVE = 1 << 4;
        const ENFIXED = 1 << 5;
        const ENDABLE = 1 << 8;
        const VARIADIC = 1 << 9;
        const DURABLE = 1 << 10;
        const HIDDEN = 1 << 11;
    }
}

impl CellFlags {
    /// Type-specific flag mask
    pub fn applies_to(self, kind: Kind) -> bool {
        let mut allowed =
            CellFlags::PROTECTED | CellFlags::UNEVALUATED | CellFlags::THROWN | CellFlags::LINE;
        if kind.bindable() {
            allowed |= CellFlags::RELATIVE;
        }
        if kind == Kind::Function {
            allowed |= CellFlags::ENFIXED;
        }
        if kind == Kind::Typeset {
            allowed |= CellFlags::ENDABLE
                | CellFlags::VARIADIC
                | CellFlags::DURABLE
                | CellFlags::HIDDEN;
        }
        allowed.contains(self)
    }
}

/// What a bindable cell is attached to
#[derive(Clone, Default)]
pub enum Binding {
    #[default]
    Unbound,
    /// A context (object, module, error, port, or frame varlist)
    Specific(Context),
    /// A function identity (its paramlist); needs a specifier
    Relative(Array),
}

impl Binding {
    pub fn context(&self) -> Option<&Context> {
        match self {
            Binding::Specific(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(self, Binding::Relative(_))
    }

    pub fn same(&self, other: &Binding) -> bool {
        match (self, other) {
            (Binding::Unbound, Binding::Unbound) => true,
            (Binding::Specific(a), Binding::Specific(b)) => a.same(b),
            (Binding::Relative(a), Binding::Relative(b)) => a.same(b),
            _ => false,
        }
    }
}

#[derive(Clone)]
pub enum Payload {
    Empty,
    Logic(bool),
    Integer(i64),
    Decimal(f64),
    Char(char),
    Pair(f64, f64),
    Tuple(Rc<[u8]>),
    Word {
        sym: Sym,
        index: usize,
    },
    Array {
        array: Array,
        index: usize,
    },
    Text {
        text: Text,
        index: usize,
    },
    Bytes {
        bin: Binary,
        index: usize,
    },
    Function(Func),
    Context {
        varlist: Context,
        phase: Option<Func>,
    },
    Typeset {
        sym: Option<Sym>,
        bits: TypeBits,
        class: ParamClass,
    },
    Datatype(Kind),
    Varargs {
        facade: Option<Array>,
        param_offset: usize,
        feed: Array,
    },
    Map(MapRef),
    Handle(usize),
    Archetype(Archetype),
}

/// Uniform value cell
#[derive(Clone)]
pub struct Cell {
    pub(crate) kind: Kind,
    pub(crate) flags: CellFlags,
    pub(crate) binding: Binding,
    pub(crate) payload: Payload,
}

impl Default for Cell {
    fn default() -> Self {
        Cell::trash()
    }
}

impl Cell {
    fn make(kind: Kind, payload: Payload) -> Cell {
        Cell {
            kind,
            flags: CellFlags::empty(),
            binding: Binding::Unbound,
            payload,
        }
    }

    /// Internal "nothing written yet" marker
    pub fn trash() -> Cell {
        Cell::make(Kind::Trash, Payload::Empty)
    }

    pub fn void() -> Cell {
        Cell::make(Kind::Void, Payload::Empty)
    }

    pub fn blank() -> Cell {
        Cell::make(Kind::Blank, Payload::Empty)
    }

    pub fn bar() -> Cell {
        Cell::make(Kind::Bar, Payload::Empty)
    }

    pub fn lit_bar() -> Cell {
        Cell::make(Kind::LitBar, Payload::Empty)
    }

    pub fn logic(b: bool) -> Cell {
        Cell::make(Kind::Logic, Payload::Logic(b))
    }

    pub fn integer(i: i64) -> Cell {
        Cell::make(Kind::Integer, Payload::Integer(i))
    }

    pub fn decimal(d: f64) -> Cell {
        Cell::make(Kind::Decimal, Payload::Decimal(d))
    }

    pub fn percent(d: f64) -> Cell {
        Cell::make(Kind::Percent, Payload::Decimal(d))
    }

    pub fn money(d: f64) -> Cell {
        Cell::make(Kind::Money, Payload::Decimal(d))
    }

    pub fn char(c: char) -> Cell {
        Cell::make(Kind::Char, Payload::Char(c))
    }

    pub fn pair(x: f64, y: f64) -> Cell {
        Cell::make(Kind::Pair, Payload::Pair(x, y))
    }

    pub fn tuple(bytes: &[u8]) -> Cell {
        Cell::make(Kind::Tuple, Payload::Tuple(Rc::from(bytes)))
    }

    /// Unbound word of any ANY-WORD! kind
    pub fn word(kind: Kind, sym: Sym) -> Cell {
        debug_assert!(kind.any_word());
        Cell::make(kind, Payload::Word { sym, index: 0 })
    }

    pub fn bound_word(kind: Kind, sym: Sym, ctx: &Context, index: usize) -> Cell {
        let mut cell = Cell::make(kind, Payload::Word { sym, index });
        cell.binding = Binding::Specific(ctx.clone());
        cell
    }

    pub fn relative_word(kind: Kind, sym: Sym, paramlist: &Array, index: usize) -> Cell {
        let mut cell = Cell::make(kind, Payload::Word { sym, index });
        cell.binding = Binding::Relative(paramlist.clone());
        cell.flags |= CellFlags::RELATIVE;
        cell
    }

    pub fn array(kind: Kind, array: Array, index: usize) -> Cell {
        debug_assert!(kind.any_array());
        Cell::make(kind, Payload::Array { array, index })
    }

    pub fn block(array: Array) -> Cell {
        Cell::array(Kind::Block, array, 0)
    }

    pub fn group(array: Array) -> Cell {
        Cell::array(Kind::Group, array, 0)
    }

    pub fn text(kind: Kind, text: Text, index: usize) -> Cell {
        debug_assert!(kind.any_string());
        Cell::make(kind, Payload::Text { text, index })
    }

    pub fn string(s: &str) -> Cell {
        Cell::text(Kind::String, Text::from_str(s), 0)
    }

    pub fn string_of(kind: Kind, s: &str) -> Cell {
        Cell::text(kind, Text::from_str(s), 0)
    }

    pub fn binary(bin: Binary, index: usize) -> Cell {
        Cell::make(Kind::Binary, Payload::Bytes { bin, index })
    }

    pub fn bytes(bytes: &[u8]) -> Cell {
        Cell::binary(Binary::from_bytes(bytes), 0)
    }

    pub fn function(func: Func) -> Cell {
        Cell::make(Kind::Function, Payload::Function(func))
    }

    /// Function value carrying a per-value binding, as definitional
    /// returns do
    pub fn bound_function(func: Func, binding: Binding) -> Cell {
        let mut cell = Cell::function(func);
        cell.binding = binding;
        cell
    }

    pub fn context(kind: Kind, varlist: Context) -> Cell {
        debug_assert!(kind.any_context());
        Cell::make(
            kind,
            Payload::Context {
                varlist,
                phase: None,
            },
        )
    }

    pub fn object(ctx: Context) -> Cell {
        Cell::context(Kind::Object, ctx)
    }

    pub fn frame(varlist: Context, phase: Option<Func>) -> Cell {
        Cell::make(Kind::Frame, Payload::Context { varlist, phase })
    }

    pub fn typeset(bits: TypeBits) -> Cell {
        Cell::make(
            Kind::Typeset,
            Payload::Typeset {
                sym: None,
                bits,
                class: ParamClass::Normal,
            },
        )
    }

    /// Parameter key: a typeset with a name and a class
    pub fn param(sym: Sym, class: ParamClass, bits: TypeBits) -> Cell {
        Cell::make(
            Kind::Typeset,
            Payload::Typeset {
                sym: Some(sym),
                bits,
                class,
            },
        )
    }

    pub fn datatype(kind: Kind) -> Cell {
        Cell::make(Kind::Datatype, Payload::Datatype(kind))
    }

    pub fn varargs(facade: Option<Array>, param_offset: usize, feed: Array) -> Cell {
        Cell::make(
            Kind::Varargs,
            Payload::Varargs {
                facade,
                param_offset,
                feed,
            },
        )
    }

    pub fn map(map: MapRef) -> Cell {
        Cell::make(Kind::Map, Payload::Map(map))
    }

    pub fn handle(data: usize) -> Cell {
        Cell::make(Kind::Handle, Payload::Handle(data))
    }

    /// Head cell of a paramlist
    pub fn archetype(arch: Archetype) -> Cell {
        Cell::make(Kind::Function, Payload::Archetype(arch))
    }

    /// Head cell of a varlist
    pub fn varlist_archetype(kind: Kind) -> Cell {
        Cell::make(kind, Payload::Empty)
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn flags(&self) -> CellFlags {
        self.flags
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Change the kind in place, keeping payload and binding; only the
    /// LINE flag survives
    pub fn reset_header(&mut self, kind: Kind) {
        self.kind = kind;
        self.flags &= CellFlags::LINE;
    }

    pub fn with_kind(&self, kind: Kind) -> Cell {
        let mut cell = self.clone();
        cell.kind = kind;
        cell
    }

    pub fn set_flag(&mut self, flag: CellFlags) {
        debug_assert!(flag.applies_to(self.kind), "{:?} on {}", flag, self.kind);
        self.flags |= flag
    }

    pub fn clear_flag(&mut self, flag: CellFlags) {
        self.flags -= flag
    }

    pub fn get_flag(&self, flag: CellFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn with_flag(mut self, flag: CellFlags) -> Cell {
        self.set_flag(flag);
        self
    }

    pub fn with_binding(mut self, binding: Binding) -> Cell {
        if let Binding::Relative(_) = binding {
            self.flags |= CellFlags::RELATIVE;
        } else {
            self.flags -= CellFlags::RELATIVE;
        }
        self.binding = binding;
        self
    }

    /// Same series value at a different index
    pub fn with_index(&self, index: usize) -> Cell {
        let mut cell = self.clone();
        match &mut cell.payload {
            Payload::Array { index: i, .. }
            | Payload::Text { index: i, .. }
            | Payload::Bytes { index: i, .. } => *i = index,
            _ => (),
        }
        cell
    }

    /// Same kind, flags and binding over a different array
    pub fn with_array(&self, array: Array, index: usize) -> Cell {
        let mut cell = self.clone();
        cell.payload = Payload::Array { array, index };
        cell
    }

    /// Cell suitable for storing in an array or variable
    pub fn stored(mut self) -> Cell {
        self.flags -= CellFlags::UNEVALUATED | CellFlags::THROWN;
        self
    }

    pub fn is_trash(&self) -> bool {
        self.kind == Kind::Trash
    }

    pub fn is_void(&self) -> bool {
        self.kind == Kind::Void
    }

    pub fn is_blank(&self) -> bool {
        self.kind == Kind::Blank
    }

    pub fn is_bar(&self) -> bool {
        self.kind == Kind::Bar
    }

    pub fn is_logic(&self) -> bool {
        self.kind == Kind::Logic
    }

    pub fn is_function(&self) -> bool {
        self.kind == Kind::Function && matches!(self.payload, Payload::Function(_))
    }

    pub fn is_enfixed(&self) -> bool {
        self.is_function() && self.get_flag(CellFlags::ENFIXED)
    }

    pub fn any_word(&self) -> bool {
        self.kind.any_word()
    }

    pub fn any_array(&self) -> bool {
        self.kind.any_array()
    }

    pub fn any_string(&self) -> bool {
        self.kind.any_string()
    }

    pub fn any_path(&self) -> bool {
        self.kind.any_path()
    }

    pub fn any_context(&self) -> bool {
        self.kind.any_context()
    }

    /// Conditional truth: only FALSE and BLANK! are falsey
    pub fn is_truthy(&self) -> bool {
        !matches!(
            (self.kind, &self.payload),
            (Kind::Logic, Payload::Logic(false)) | (Kind::Blank, _)
        )
    }

    pub fn as_logic(&self) -> Option<bool> {
        match self.payload {
            Payload::Logic(b) if self.kind == Kind::Logic => Some(b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self.payload {
            Payload::Integer(i) if self.kind == Kind::Integer => Some(i),
            _ => None,
        }
    }

    /// Any number, widened to a float
    pub fn as_number(&self) -> Option<f64> {
        match self.payload {
            Payload::Integer(i) => Some(i as f64),
            Payload::Decimal(d) if self.kind.any_number() => Some(d),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self.payload {
            Payload::Char(c) => Some(c),
            _ => None,
        }
    }

    pub fn word_sym(&self) -> Option<Sym> {
        match self.payload {
            Payload::Word { sym, .. } => Some(sym),
            _ => None,
        }
    }

    pub fn word_index(&self) -> usize {
        match self.payload {
            Payload::Word { index, .. } => index,
            _ => 0,
        }
    }

    pub fn array_parts(&self) -> Option<(Array, usize)> {
        match &self.payload {
            Payload::Array { array, index } => Some((array.clone(), *index)),
            _ => None,
        }
    }

    pub fn text_parts(&self) -> Option<(Text, usize)> {
        match &self.payload {
            Payload::Text { text, index } => Some((text.clone(), *index)),
            _ => None,
        }
    }

    pub fn bytes_parts(&self) -> Option<(Binary, usize)> {
        match &self.payload {
            Payload::Bytes { bin, index } => Some((bin.clone(), *index)),
            _ => None,
        }
    }

    pub fn series_index(&self) -> Option<usize> {
        match &self.payload {
            Payload::Array { index, .. }
            | Payload::Text { index, .. }
            | Payload::Bytes { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Characters of an ANY-STRING! from its index
    pub fn as_text(&self) -> Option<String> {
        self.text_parts().map(|(t, i)| t.to_string_from(i))
    }

    pub fn as_func(&self) -> Option<Func> {
        match &self.payload {
            Payload::Function(f) => Some(f.clone()),
            _ => None,
        }
    }

    pub fn as_context(&self) -> Option<Context> {
        match &self.payload {
            Payload::Context { varlist, .. } => Some(varlist.clone()),
            _ => None,
        }
    }

    pub fn frame_phase(&self) -> Option<Func> {
        match &self.payload {
            Payload::Context { phase, .. } => phase.clone(),
            _ => None,
        }
    }

    pub fn typeset_bits(&self) -> Option<TypeBits> {
        match self.payload {
            Payload::Typeset { bits, .. } => Some(bits),
            _ => None,
        }
    }

    pub fn param_sym(&self) -> Option<Sym> {
        match self.payload {
            Payload::Typeset { sym, .. } => sym,
            _ => None,
        }
    }

    pub fn param_class(&self) -> Option<ParamClass> {
        match self.payload {
            Payload::Typeset { class, .. } => Some(class),
            _ => None,
        }
    }

    /// Same parameter with a different class
    pub fn with_param_class(&self, class: ParamClass) -> Cell {
        let mut cell = self.clone();
        if let Payload::Typeset { class: c, .. } = &mut cell.payload {
            *c = class;
        }
        cell
    }

    pub fn datatype_kind(&self) -> Option<Kind> {
        match self.payload {
            Payload::Datatype(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<MapRef> {
        match &self.payload {
            Payload::Map(m) => Some(m.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_masks() {
        assert!(CellFlags::ENFIXED.applies_to(Kind::Function));
        assert!(!CellFlags::ENFIXED.applies_to(Kind::Integer));
        assert!(CellFlags::VARIADIC.applies_to(Kind::Typeset));
        assert!(CellFlags::RELATIVE.applies_to(Kind::Block));
        assert!(!CellFlags::RELATIVE.applies_to(Kind::Decimal));
        assert!(CellFlags::LINE.applies_to(Kind::Decimal));
    }

    #[test]
    fn truthiness() {
        assert!(!Cell::logic(false).is_truthy());
        assert!(!Cell::blank().is_truthy());
        assert!(Cell::integer(0).is_truthy());
        assert!(Cell::logic(true).is_truthy());
        assert!(Cell::block(Array::empty()).is_truthy());
    }

    #[test]
    fn kind_changes_keep_payload() {
        let sym = Sym::intern("foo");
        let lit = Cell::word(Kind::LitWord, sym);
        let word = lit.with_kind(Kind::Word);
        assert_eq!(Kind::Word, word.kind());
        assert_eq!(Some(sym), word.word_sym());
    }

    #[test]
    fn stored_drops_transient_flags() {
        let cell = Cell::integer(3).with_flag(CellFlags::UNEVALUATED);
        assert!(cell.get_flag(CellFlags::UNEVALUATED));
        assert!(!cell.stored().get_flag(CellFlags::UNEVALUATED));
    }

    #[test]
    fn reset_header_keeps_only_line() {
        let mut cell = Cell::word(Kind::LitWord, Sym::intern("bar"))
            .with_flag(CellFlags::LINE)
            .with_flag(CellFlags::UNEVALUATED);
        cell.reset_header(Kind::Word);
        assert_eq!(Kind::Word, cell.kind());
        assert!(cell.get_flag(CellFlags::LINE));
        assert!(!cell.get_flag(CellFlags::UNEVALUATED));
    }

    #[test]
    fn path_kinds_are_paths() {
        let parts = Array::from_cells(vec![Cell::word(Kind::Word, Sym::intern("a"))]);
        assert!(Cell::array(Kind::SetPath, parts.clone(), 0).any_path());
        assert!(!Cell::block(parts).any_path());
        assert_eq!(Ok(Kind::Error), Kind::try_from(Kind::Error as u8));
        assert_eq!(Err(()), Kind::try_from(crate::ren::kinds::KIND_COUNT));
    }

    #[test]
    fn numbers_widen() {
        assert_eq!(Some(2.0), Cell::integer(2).as_number());
        assert_eq!(Some(0.5), Cell::percent(0.5).as_number());
        assert_eq!(None, Cell::char('a').as_number());
    }
}
