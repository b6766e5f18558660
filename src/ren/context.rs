// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/context.rs

// Contexts: a varlist whose head is the archetype, plus a parallel
// keylist of typesets naming each variable. Objects, modules, errors,
// ports and frames all share this shape.

// <>

use super::cell::{Cell, CellFlags};
use super::error::{fail, ErrId};
use super::frame::FrameMeta;
use super::kinds::{Kind, TypeBits};
use super::paramlist::ParamClass;
use super::series::{Array, Link, Misc, SeriesFlags};
use super::symtab::Sym;
use super::throws::Flow;

#[derive(Clone)]
pub struct Context(Array);

impl Context {
    /// Empty context owning a fresh keylist
    pub fn new(kind: Kind) -> Context {
        let keylist = Array::from_cells(vec![Cell::blank()]);
        let varlist = Array::from_vec(
            vec![Cell::varlist_archetype(kind)],
            SeriesFlags::ARRAY | SeriesFlags::VARLIST,
        );
        varlist.set_link(Link::Keylist(keylist));
        Context(varlist)
    }

    /// Context over an existing keylist, every variable void
    ///
    /// Frames made this way share the keylist with a function facade.
    pub fn from_keylist(kind: Kind, keylist: &Array) -> Context {
        let len = keylist.len().max(1);
        let mut cells = Vec::with_capacity(len);
        cells.push(Cell::varlist_archetype(kind));
        cells.resize(len, Cell::void());
        let varlist = Array::from_vec(cells, SeriesFlags::ARRAY | SeriesFlags::VARLIST);
        varlist.set_link(Link::Keylist(keylist.clone()));
        Context(varlist)
    }

    /// Context made from names, in order
    pub fn from_names(kind: Kind, names: &[Sym]) -> Context {
        let ctx = Context::new(kind);
        for sym in names {
            ctx.append_key(*sym);
        }
        ctx
    }

    /// Context over a varlist already made, as found in varargs cells
    pub(crate) fn from_varlist(varlist: Array) -> Context {
        Context(varlist)
    }

    pub fn varlist(&self) -> &Array {
        &self.0
    }

    pub fn keylist(&self) -> Array {
        match self.0.link() {
            Link::Keylist(keys) => keys,
            _ => Array::from_cells(vec![Cell::blank()]),
        }
    }

    pub fn kind(&self) -> Kind {
        self.0.get(0).map_or(Kind::Object, |c| c.kind())
    }

    pub fn is_frame(&self) -> bool {
        self.kind() == Kind::Frame
    }

    /// Number of variables, not counting the archetype
    pub fn len(&self) -> usize {
        self.keylist().len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn key(&self, index: usize) -> Option<Cell> {
        if index == 0 {
            return None;
        }
        self.keylist().get(index)
    }

    pub fn key_sym(&self, index: usize) -> Option<Sym> {
        self.key(index).and_then(|k| k.param_sym())
    }

    pub fn is_accessible(&self) -> bool {
        !self.0.has_flag(SeriesFlags::INACCESSIBLE)
    }

    /// Read a variable by 1-based index
    pub fn var(&self, index: usize) -> Result<Cell, Flow> {
        if !self.is_accessible() {
            return Err(fail(ErrId::ExpiredFrame, &[]));
        }
        match self.0.get(index) {
            Some(cell) if index > 0 => Ok(cell),
            _ => Err(fail(ErrId::NotInContext, &[Cell::integer(index as i64)])),
        }
    }

    /// Write a variable, honoring protection of the context and slot
    pub fn set_var(&self, index: usize, value: Cell) -> Result<(), Flow> {
        if !self.is_accessible() {
            return Err(fail(ErrId::ExpiredFrame, &[]));
        }
        if self.0.has_flag(SeriesFlags::FROZEN) || self.0.has_flag(SeriesFlags::PROTECTED) {
            return Err(fail(ErrId::Protected, &[]));
        }
        match self.0.get(index) {
            Some(old) if index > 0 => {
                if old.get_flag(CellFlags::PROTECTED) {
                    let name = self.key_sym(index).map(|s| Cell::word(Kind::Word, s));
                    return Err(fail(ErrId::LockedWord, &[name.unwrap_or_else(Cell::blank)]));
                }
                self.0.set_unchecked(index, value.stored());
                Ok(())
            }
            _ => Err(fail(ErrId::NotInContext, &[Cell::integer(index as i64)])),
        }
    }

    /// Unchecked write used while a frame is being fulfilled
    pub fn init_var(&self, index: usize, value: Cell) {
        self.0.set_unchecked(index, value.stored())
    }

    /// Set or clear per-variable write protection
    pub fn protect_var(&self, index: usize, on: bool) -> Result<(), Flow> {
        let mut cell = self.var(index)?;
        if on {
            cell.flags |= CellFlags::PROTECTED;
        } else {
            cell.flags -= CellFlags::PROTECTED;
        }
        self.0.set_unchecked(index, cell);
        Ok(())
    }

    /// 1-based index of the variable spelled `sym`, case-insensitively
    pub fn find(&self, sym: Sym) -> Option<usize> {
        let canon = sym.canon();
        let keys = self.keylist();
        let keys = keys.borrow();
        let found = keys
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, k)| k.param_sym().map(|s| s.canon()) == Some(canon))
            .map(|(i, _)| i);
        found
    }

    /// Add a variable; the context must own its keylist
    pub fn append_key(&self, sym: Sym) -> usize {
        let keys = self.keylist();
        keys.push_unchecked(Cell::param(
            sym,
            ParamClass::Normal,
            TypeBits::any_value().with(Kind::Void),
        ));
        self.0.push_unchecked(Cell::void());
        keys.len() - 1
    }

    /// Find `sym`, adding it when missing
    pub fn find_or_append(&self, sym: Sym) -> usize {
        match self.find(sym) {
            Some(i) => i,
            None => self.append_key(sym),
        }
    }

    pub fn same(&self, other: &Context) -> bool {
        self.0.same(&other.0)
    }

    pub fn frame_meta(&self) -> Option<FrameMeta> {
        match self.0.misc() {
            Misc::Frame(meta) => Some(meta),
            _ => None,
        }
    }

    pub fn set_frame_meta(&self, meta: FrameMeta) {
        self.0.set_misc(Misc::Frame(meta))
    }

    pub fn to_cell(&self) -> Cell {
        match self.kind() {
            Kind::Frame => Cell::frame(self.clone(), self.frame_meta().map(|m| m.phase)),
            kind => Cell::context(kind, self.clone()),
        }
    }

    /// Ends the life of a running frame's varlist; later reads fail
    pub fn expire(&self) {
        if self.0.has_flag(SeriesFlags::STACK) {
            self.0.clear_flags(SeriesFlags::STACK);
            self.0.set_flags(SeriesFlags::INACCESSIBLE | SeriesFlags::SINGULAR);
            self.0.term_len(1);
        }
    }

    /// Variables as (name, value) pairs, skipping hidden keys
    pub fn pairs(&self) -> Result<Vec<(Sym, Cell)>, Flow> {
        let mut out = Vec::with_capacity(self.len());
        for i in 1..=self.len() {
            let Some(key) = self.key(i) else { continue };
            if key.get_flag(CellFlags::HIDDEN) {
                continue;
            }
            if let Some(sym) = key.param_sym() {
                out.push((sym, self.var(i)?));
            }
        }
        Ok(out)
    }

    /// Copy sharing nothing but the values' referents; frames keep
    /// their facade keylist
    pub fn copy_shallow(&self) -> Result<Context, Flow> {
        let keys = if self.is_frame() {
            self.keylist()
        } else {
            self.keylist().copy_shallow(0)
        };
        let copy = Context::from_keylist(self.kind(), &keys);
        for i in 1..=self.len() {
            copy.init_var(i, self.var(i)?);
        }
        if let Some(meta) = self.frame_meta() {
            copy.set_frame_meta(FrameMeta {
                feed: None,
                ..meta
            });
        }
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_and_vars() {
        let a = Sym::intern("alpha");
        let b = Sym::intern("Beta");
        let ctx = Context::from_names(Kind::Object, &[a, b]);
        assert_eq!(2, ctx.len());
        assert_eq!(Some(2), ctx.find(Sym::intern("beta")));
        assert!(ctx.var(1).map_or(false, |v| v.is_void()));
        assert!(ctx.set_var(2, Cell::integer(10)).is_ok());
        assert_eq!(Some(10), ctx.var(2).ok().and_then(|v| v.as_integer()));
        assert!(ctx.var(3).is_err());
    }

    #[test]
    fn protected_slot() {
        let ctx = Context::from_names(Kind::Object, &[Sym::intern("locked")]);
        assert!(ctx.protect_var(1, true).is_ok());
        assert!(ctx.set_var(1, Cell::blank()).is_err());
        assert!(ctx.protect_var(1, false).is_ok());
        assert!(ctx.set_var(1, Cell::blank()).is_ok());
    }

    #[test]
    fn expired_frame_fails() {
        let ctx = Context::from_names(Kind::Frame, &[Sym::intern("arg")]);
        ctx.varlist().set_flags(SeriesFlags::STACK);
        ctx.expire();
        assert!(!ctx.is_accessible());
        assert_eq!(1, ctx.varlist().len());
        assert!(ctx.var(1).is_err());
    }

    #[test]
    fn shallow_copy_is_independent() {
        let ctx = Context::from_names(Kind::Object, &[Sym::intern("v")]);
        ctx.init_var(1, Cell::integer(1));
        let copy = ctx.copy_shallow().unwrap();
        copy.init_var(1, Cell::integer(2));
        assert_eq!(Some(1), ctx.var(1).ok().and_then(|v| v.as_integer()));
        copy.append_key(Sym::intern("w"));
        assert_eq!(1, ctx.len());
    }
}
