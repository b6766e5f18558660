// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/binding.rs

// Word binding. Words are bound either to a specific context or,
// inside function bodies, relatively to the function's paramlist; a
// relative word needs the running frame (the specifier) to be looked
// up. Also the deep binders and copiers built on top of that.

// <>

use super::cell::{Binding, Cell, CellFlags};
use super::context::Context;
use super::error::{fail, ErrId};
use super::kinds::Kind;
use super::series::Array;
use super::symtab::Sym;
use super::throws::Flow;

/// Resolve a relative cell against a specifier
///
/// Specific and unbound cells come back unchanged. The result never
/// carries the RELATIVE flag when a specifier was supplied.
pub fn derelativize(cell: &Cell, specifier: Option<&Context>) -> Cell {
    match (cell.binding(), specifier) {
        (Binding::Relative(_), Some(ctx)) => {
            cell.clone().with_binding(Binding::Specific(ctx.clone()))
        }
        _ => cell.clone(),
    }
}

/// Specifier for the contents of an array cell found under `parent`
pub fn derive_specifier(parent: Option<&Context>, cell: &Cell) -> Option<Context> {
    match cell.binding() {
        Binding::Specific(ctx) => Some(ctx.clone()),
        _ => parent.cloned(),
    }
}

fn unbound(word: &Cell) -> Flow {
    fail(ErrId::NotBound, &[word.with_kind(Kind::Word)])
}

/// A relative word may only be resolved through a frame of the
/// function it is relative to, or of one built on it
fn check_relative(ctx: &Context, paramlist: &Array) -> Result<(), Flow> {
    if ctx.keylist().same(paramlist) {
        return Ok(());
    }
    if let Some(meta) = ctx.frame_meta() {
        let phase = meta.phase;
        if phase.paramlist().same(paramlist)
            || phase.underlying().paramlist().same(paramlist)
            || phase.facade().same(paramlist)
            || meta.original.underlying().paramlist().same(paramlist)
        {
            return Ok(());
        }
    }
    Err(fail(
        ErrId::Misc,
        &[Cell::string("relative word resolved through a foreign frame")],
    ))
}

/// Context and index a word's variable lives at
pub fn var_location(word: &Cell, specifier: Option<&Context>) -> Result<(Context, usize), Flow> {
    let sym = word.word_sym().ok_or_else(|| unbound(word))?;
    let ctx = match word.binding() {
        Binding::Unbound => return Err(unbound(word)),
        Binding::Specific(ctx) => ctx.clone(),
        Binding::Relative(paramlist) => {
            let ctx = specifier.ok_or_else(|| unbound(word))?;
            check_relative(ctx, paramlist)?;
            ctx.clone()
        }
    };
    let index = word.word_index();
    if ctx.key_sym(index).map_or(false, |k| k.same_canon(sym)) {
        return Ok((ctx, index));
    }
    match ctx.find(sym) {
        Some(i) => Ok((ctx, i)),
        None => Err(fail(ErrId::NotInContext, &[word.with_kind(Kind::Word)])),
    }
}

/// Current value of a word's variable (possibly void)
pub fn get_var(word: &Cell, specifier: Option<&Context>) -> Result<Cell, Flow> {
    let (ctx, index) = var_location(word, specifier)?;
    ctx.var(index)
}

pub fn set_var(word: &Cell, specifier: Option<&Context>, value: Cell) -> Result<(), Flow> {
    let (ctx, index) = var_location(word, specifier)?;
    ctx.set_var(index, value)
}

/// Context a word resolves in, if any
pub fn binding_of(word: &Cell, specifier: Option<&Context>) -> Option<Context> {
    var_location(word, specifier).ok().map(|(ctx, _)| ctx)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    /// only words already in the context
    Existing,
    /// add set-words that are missing
    AddSetWords,
    /// add every missing word
    AddAll,
}

fn rebound(cell: &Cell, sym: Sym, ctx: &Context, index: usize) -> Cell {
    let mut word = Cell::bound_word(cell.kind(), sym, ctx, index);
    word.flags = cell.flags() - CellFlags::RELATIVE;
    word
}

/// Bind the words of `array` from `index`, and of nested arrays, to
/// `ctx`
pub fn bind_deep(array: &Array, index: usize, ctx: &Context, mode: BindMode) {
    if array.is_frozen() {
        return;
    }
    for (i, cell) in array.slice(index).into_iter().enumerate() {
        let at = index + i;
        if let Some(sym) = cell.word_sym().filter(|_| cell.any_word()) {
            let found = match ctx.find(sym) {
                Some(found) => Some(found),
                None if mode == BindMode::AddAll => Some(ctx.append_key(sym)),
                None if mode == BindMode::AddSetWords && cell.kind() == Kind::SetWord => {
                    Some(ctx.append_key(sym))
                }
                None => None,
            };
            if let Some(found) = found {
                array.set_unchecked(at, rebound(&cell, sym, ctx, found));
            }
        } else if let Some((inner, _)) = cell.array_parts() {
            bind_deep(&inner, 0, ctx, mode);
        }
    }
}

/// Remove bindings from every word, deeply
pub fn unbind_deep(array: &Array, index: usize) {
    if array.is_frozen() {
        return;
    }
    for (i, cell) in array.slice(index).into_iter().enumerate() {
        if cell.any_word() {
            if let Some(sym) = cell.word_sym() {
                let mut word = Cell::word(cell.kind(), sym);
                word.flags = cell.flags() - CellFlags::RELATIVE;
                array.set_unchecked(index + i, word);
            }
        } else if let Some((inner, _)) = cell.array_parts() {
            unbind_deep(&inner, 0);
        }
    }
}

/// Index of the parameter spelled `sym` in a paramlist
fn param_index(paramlist: &Array, sym: Sym) -> Option<usize> {
    let canon = sym.canon();
    let params = paramlist.borrow();
    let found = params
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, p)| p.param_sym().map(|s| s.canon()) == Some(canon))
        .map(|(i, _)| i);
    found
}

/// Deep copy of a function body with the parameter words made
/// relative to `paramlist`; other relative words are resolved through
/// `specifier`
pub fn copy_and_bind_relative_deep(
    array: &Array,
    index: usize,
    paramlist: &Array,
    specifier: Option<&Context>,
) -> Array {
    let mut cells = Vec::with_capacity(array.len().saturating_sub(index));
    for cell in array.slice(index) {
        if let Some(sym) = cell.word_sym().filter(|_| cell.any_word()) {
            match param_index(paramlist, sym) {
                Some(i) => {
                    let mut word = Cell::relative_word(cell.kind(), sym, paramlist, i);
                    word.flags |= cell.flags() - CellFlags::RELATIVE;
                    cells.push(word);
                }
                None => cells.push(derelativize(&cell, specifier)),
            }
        } else if let Some((inner, at)) = cell.array_parts() {
            let inner_spec = derive_specifier(specifier, &cell);
            let copy = copy_and_bind_relative_deep(&inner, 0, paramlist, inner_spec.as_ref());
            cells.push(
                cell.with_array(copy, at)
                    .with_binding(Binding::Relative(paramlist.clone())),
            );
        } else {
            cells.push(cell);
        }
    }
    Array::from_cells(cells)
}

/// Deep copy in which every relative cell is resolved, so the copy
/// no longer needs a specifier
pub fn copy_deep_specific(array: &Array, index: usize, specifier: Option<&Context>) -> Array {
    let mut cells = Vec::with_capacity(array.len().saturating_sub(index));
    for cell in array.slice(index) {
        if let Some((inner, at)) = cell.array_parts() {
            let inner_spec = derive_specifier(specifier, &cell);
            let copy = copy_deep_specific(&inner, 0, inner_spec.as_ref());
            cells.push(cell.with_array(copy, at).with_binding(Binding::Unbound));
        } else {
            cells.push(derelativize(&cell, specifier));
        }
    }
    Array::from_cells(cells)
}

/// Set-words of a block in order of first appearance
pub fn collect_set_words(array: &Array, index: usize, deep: bool) -> Vec<Sym> {
    fn walk(array: &Array, index: usize, deep: bool, out: &mut Vec<Sym>) {
        for cell in array.slice(index) {
            if cell.kind() == Kind::SetWord {
                if let Some(sym) = cell.word_sym() {
                    if !out.iter().any(|s| s.same_canon(sym)) {
                        out.push(sym);
                    }
                }
            } else if deep {
                if let Some((inner, _)) = cell.array_parts() {
                    walk(&inner, 0, deep, out);
                }
            }
        }
    }
    let mut out = Vec::new();
    walk(array, index, deep, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(names: &[(&str, Kind)]) -> Array {
        Array::from_cells(
            names
                .iter()
                .map(|(n, k)| Cell::word(*k, Sym::intern(n)))
                .collect(),
        )
    }

    #[test]
    fn bind_adds_set_words_only() {
        let ctx = Context::new(Kind::Object);
        let block = words(&[("a", Kind::SetWord), ("b", Kind::Word)]);
        bind_deep(&block, 0, &ctx, BindMode::AddSetWords);
        assert_eq!(1, ctx.len());
        let a = block.get(0).unwrap();
        assert!(matches!(a.binding(), Binding::Specific(_)));
        let b = block.get(1).unwrap();
        assert!(matches!(b.binding(), Binding::Unbound));
        assert!(get_var(&b, None).is_err());
    }

    #[test]
    fn get_and_set_through_binding() {
        let ctx = Context::new(Kind::Object);
        let block = words(&[("x", Kind::Word)]);
        bind_deep(&block, 0, &ctx, BindMode::AddAll);
        let x = block.get(0).unwrap();
        set_var(&x, None, Cell::integer(5)).unwrap();
        assert_eq!(Some(5), get_var(&x, None).unwrap().as_integer());
    }

    #[test]
    fn relative_words_need_a_specifier() {
        let paramlist = Array::from_cells(vec![
            Cell::blank(),
            Cell::param(
                Sym::intern("n"),
                super::super::paramlist::ParamClass::Normal,
                crate::ren::kinds::TypeBits::any_value(),
            ),
        ]);
        let body = Array::from_cells(vec![
            Cell::word(Kind::Word, Sym::intern("n")),
            Cell::block(words(&[("n", Kind::Word), ("other", Kind::Word)])),
        ]);
        let copy = copy_and_bind_relative_deep(&body, 0, &paramlist, None);
        let n = copy.get(0).unwrap();
        assert!(n.get_flag(CellFlags::RELATIVE));
        assert!(get_var(&n, None).is_err());

        let nested = copy.get(1).unwrap();
        assert!(nested.binding().is_relative());
        let (inner, _) = nested.array_parts().unwrap();
        assert!(inner.get(0).unwrap().binding().is_relative());
        assert!(!inner.get(1).unwrap().binding().is_relative());

        let frame = Context::from_keylist(Kind::Frame, &paramlist);
        frame.init_var(1, Cell::integer(9));
        assert_eq!(Some(9), get_var(&n, Some(&frame)).unwrap().as_integer());
        assert!(!derelativize(&n, Some(&frame)).get_flag(CellFlags::RELATIVE));
    }

    #[test]
    fn set_words_collected_once() {
        let block = words(&[("a", Kind::SetWord), ("A", Kind::SetWord), ("b", Kind::SetWord)]);
        let syms = collect_set_words(&block, 0, false);
        assert_eq!(2, syms.len());
    }
}
